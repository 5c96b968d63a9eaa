#![deny(clippy::string_slice)]

//! Client side of the tube video site: the REST client, the session, and the
//! view models the UI renders from.
//!
//! Everything is single-threaded. Components share the [`SessionStore`] through an `Rc`,
//! and engagement actions (likes, dislikes, subscriptions) go through an
//! [`optimist::SyncEngine`] owned by the view that shows them.

mod api;
mod config;
mod engagement;
mod error;
mod session;
mod spawn;
pub mod storage;
mod utils;
pub mod validate;
pub mod views;

pub use api::RemoteClient;
pub use config::{ClientConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT};
pub use engagement::{EngagementEngine, EngagementKey, ToggleKind};
pub use error::ClientError;
pub use session::{SessionError, SessionPhase, SessionStore};
pub use spawn::RuntimeSpawner;
pub use utils::set_panic_hook;
#[cfg(target_arch = "wasm32")]
pub use utils::init_browser_logging;

pub use optimist::{EngagementState, PendingToggle, SyncMode, ToggleError};

/// A session backed by the browser's `localStorage`, for the web build.
#[cfg(target_arch = "wasm32")]
pub fn browser_session(
    config: &ClientConfig,
) -> Result<std::rc::Rc<SessionStore>, ClientError> {
    init_browser_logging();
    let api = RemoteClient::new(config)?;
    Ok(SessionStore::open(
        api,
        std::rc::Rc::new(storage::LocalStorage),
    ))
}
