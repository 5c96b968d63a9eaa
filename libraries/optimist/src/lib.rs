//! This is a library for optimistic toggles that are reconciled against a server.
//! It was created for the tube client, so it only covers boolean+counter pairs (likes, subscriptions).
//!
//! Strategy:
//! 1. Every toggleable thing is identified by a key and is seeded with the state the server last reported.
//! 2. When the user toggles, the displayed state flips immediately (the "optimistic" phase), and exactly one request is sent.
//! 3. Each key remembers the last server-confirmed state and how many flips are still unacknowledged.
//!    The displayed state is always the confirmed state flipped that many times.
//! 4. When a request succeeds, the server's answer becomes the confirmed state. When it fails, the flip is simply dropped.
//!
//! Because of 3 and 4, a failed toggle restores the exact pre-toggle state, and a successful one shows exactly
//! what the server said, no matter how the optimistic guess compared.

mod engine;

pub use engine::{ListenerKey, PendingToggle, SyncEngine};

use std::{cell::RefCell, future::Future, rc::Rc};

/// One toggle dimension on one target: e.g. "liked" plus the like count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EngagementState {
    pub active: bool,
    pub count: u64,
}

impl EngagementState {
    pub fn new(active: bool, count: u64) -> Self {
        Self { active, count }
    }

    /// The state after one toggle: the flag flips and the count follows it.
    pub fn flipped(self) -> Self {
        if self.active {
            Self {
                active: false,
                count: self.count.saturating_sub(1),
            }
        } else {
            Self {
                active: true,
                count: self.count + 1,
            }
        }
    }
}

/// How toggles on the same key interact while requests are in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SyncMode {
    /// Requests for the key go out one at a time, in call order.
    #[default]
    Serialized,
    /// Requests race; whichever answer arrives last is what the key shows.
    LastWriteWins,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToggleError {
    #[error("you must be logged in to do that")]
    Unauthenticated,

    #[error("the toggle target could not be resolved")]
    TargetMissing,

    #[error("server rejected the request ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    RemoteRejected { status: u16, message: Option<String> },

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("the toggle was abandoned before the server answered")]
    Cancelled,

    #[error("the engine has been disposed")]
    Disposed,
}

/// What a [`ToggleRemote`] reports when the server did not accept a toggle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteFailure {
    #[error("rejected with status {status}")]
    Rejected { status: u16, message: Option<String> },

    #[error("network unavailable: {0}")]
    Network(String),
}

impl From<RemoteFailure> for ToggleError {
    fn from(failure: RemoteFailure) -> Self {
        match failure {
            RemoteFailure::Rejected { status, message } => {
                ToggleError::RemoteRejected { status, message }
            }
            RemoteFailure::Network(reason) => ToggleError::NetworkUnavailable(reason),
        }
    }
}

/// Where the engine gets the bearer token from. The engine never writes it.
pub trait TokenSource {
    fn bearer_token(&self) -> Option<String>;
}

impl TokenSource for RefCell<Option<String>> {
    fn bearer_token(&self) -> Option<String> {
        self.borrow().clone()
    }
}

impl<T: TokenSource + ?Sized> TokenSource for Rc<T> {
    fn bearer_token(&self) -> Option<String> {
        (**self).bearer_token()
    }
}

/// The authoritative toggle endpoint for keys of type `K`.
pub trait ToggleRemote<K> {
    /// Toggle `key` on the server.
    ///
    /// `Ok(Some(state))` is the server's authoritative state after the toggle.
    /// `Ok(None)` means the server accepted the toggle but did not say what the new state is.
    fn toggle(
        &self,
        key: &K,
        token: &str,
    ) -> impl Future<Output = Result<Option<EngagementState>, RemoteFailure>>;
}

impl<K, T: ToggleRemote<K>> ToggleRemote<K> for Rc<T> {
    fn toggle(
        &self,
        key: &K,
        token: &str,
    ) -> impl Future<Output = Result<Option<EngagementState>, RemoteFailure>> {
        (**self).toggle(key, token)
    }
}
