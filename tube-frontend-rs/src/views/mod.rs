//! Headless view models. Each one fetches what its screen shows, keeps it in `RefCell`s,
//! and exposes the screen's actions. Rendering is the caller's business.
//!
//! After `dispose()` a view stops writing its own state, so answers that arrive after
//! the screen went away are dropped.

mod auth;
mod channel;
mod feed;
mod video;

pub use auth::{AuthError, AuthForm};
pub use channel::ChannelView;
pub use feed::{FeedView, MIN_SEARCH_LEN};
pub use video::VideoView;

use std::rc::Rc;

use optimist::{EngagementState, PendingToggle, SyncEngine, ToggleError, TokenSource};

use crate::{EngagementEngine, EngagementKey, RuntimeSpawner, SessionStore};

fn engine_for(session: &Rc<SessionStore>) -> EngagementEngine {
    let tokens: Rc<dyn TokenSource> = session.clone();
    SyncEngine::new(session.api().clone(), tokens, Rc::new(RuntimeSpawner))
}

/// Toggle through `engine`, reporting a missing session before a missing target.
fn toggle(
    engine: &EngagementEngine,
    session: &SessionStore,
    key: Option<EngagementKey>,
) -> Result<PendingToggle, ToggleError> {
    if engine.is_disposed() {
        return Err(ToggleError::Disposed);
    }
    if session.token().is_none() {
        return Err(ToggleError::Unauthenticated);
    }
    engine.toggle(key.ok_or(ToggleError::TargetMissing)?)
}

/// The state to reconcile with after a status lookup. Keys with flips still in flight are
/// skipped: the lookup may or may not have seen them, and the toggle's own answer settles them.
/// Without a count from the server, the displayed count is kept.
fn status_state(
    engine: &EngagementEngine,
    key: &EngagementKey,
    active: bool,
    count: Option<u64>,
) -> Option<EngagementState> {
    if engine.is_pending(key) {
        return None;
    }
    match count {
        Some(count) => Some(EngagementState::new(active, count)),
        None => engine
            .state(key)
            .map(|current| EngagementState::new(active, current.count)),
    }
}
