//! # SessionStore
//! The single owner of the bearer token, the logged-in user and the user's channel.
//!
//! Only the token is persisted. The user and channel are looked up again from the token
//! every time the session is resolved (at startup and after each login).
//!
//! Phases:
//! `Anonymous` -> `login` -> `Resolving` -> `NoChannel` -> (channel created) -> `WithChannel`.
//! A failed profile or channel lookup while resolving sends the session back to `Anonymous`.
//! "No channel yet" is not a failure.

use std::{cell::RefCell, future::Future, rc::Rc};

use optimist::TokenSource;
use tube_types::{Channel, User};

use crate::{ClientError, RemoteClient, storage::TokenStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Anonymous,
    /// A token is held but the user behind it is not known yet.
    Resolving,
    NoChannel,
    WithChannel,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("profile lookup failed: {0}")]
    Profile(#[source] ClientError),

    #[error("channel lookup failed: {0}")]
    Channel(#[source] ClientError),

    #[error("the session changed while it was being resolved")]
    Superseded,
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    user: Option<User>,
    channel: Option<Channel>,
    // bumped by every login and logout so that stale lookups can tell they are stale
    generation: u64,
}

pub struct SessionStore {
    api: RemoteClient,
    storage: Rc<dyn TokenStorage>,
    // never hold a borrow across an .await
    state: RefCell<SessionState>,
}

impl SessionStore {
    /// Restore the persisted token, if any. The session stays `Resolving` until [`SessionStore::resolve`] runs.
    pub fn open(api: RemoteClient, storage: Rc<dyn TokenStorage>) -> Rc<Self> {
        let token = storage
            .load()
            .inspect_err(|e| log::error!("Could not read the stored token: {e}"))
            .ok()
            .flatten();
        if token.is_some() {
            log::info!("Restored a stored session token");
        }

        Rc::new(Self {
            api,
            storage,
            state: RefCell::new(SessionState {
                token,
                ..Default::default()
            }),
        })
    }

    pub fn api(&self) -> &RemoteClient {
        &self.api
    }

    /// Adopt `token`: persist it, forget the previous identity, and return the lookup
    /// of the user and channel behind it. The token is in effect as soon as this returns;
    /// the lookup only runs when the returned future is polled.
    pub fn login(
        self: &Rc<Self>,
        token: impl Into<String>,
    ) -> impl Future<Output = Result<SessionPhase, SessionError>> + 'static {
        let token = token.into();
        if let Err(e) = self.storage.store(&token) {
            log::error!("Could not persist the session token: {e}");
        }
        {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.token = Some(token);
            state.user = None;
            state.channel = None;
        }

        let this = Rc::clone(self);
        async move { this.resolve().await }
    }

    /// Look up the user and channel behind the current token.
    ///
    /// Answers that arrive after a logout or a newer login are dropped and
    /// reported as [`SessionError::Superseded`].
    pub async fn resolve(&self) -> Result<SessionPhase, SessionError> {
        let (token, generation) = {
            let state = self.state.borrow();
            match &state.token {
                Some(token) => (token.clone(), state.generation),
                None => return Ok(SessionPhase::Anonymous),
            }
        };

        let user = match self.api.profile(&token).await {
            Ok(user) => user,
            Err(e) => return Err(self.abandon(generation, SessionError::Profile(e))),
        };
        let user_id = user.id.clone();
        {
            let mut state = self.state.borrow_mut();
            if state.generation != generation {
                return Err(SessionError::Superseded);
            }
            state.user = Some(user);
        }

        let channel = match self.api.channel_for_user(&token, &user_id).await {
            Ok(channel) => channel,
            Err(e) => return Err(self.abandon(generation, SessionError::Channel(e))),
        };
        {
            let mut state = self.state.borrow_mut();
            if state.generation != generation {
                return Err(SessionError::Superseded);
            }
            state.channel = channel;
        }

        let phase = self.phase();
        log::info!("Session resolved for {user_id} ({phase:?})");
        Ok(phase)
    }

    fn abandon(&self, generation: u64, error: SessionError) -> SessionError {
        if self.state.borrow().generation != generation {
            return SessionError::Superseded;
        }
        log::error!("Logging out: {error}");
        self.logout();
        error
    }

    /// Forget the token, user and channel, in memory and in storage. Safe to call when logged out.
    pub fn logout(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.token = None;
            state.user = None;
            state.channel = None;
        }
        if let Err(e) = self.storage.clear() {
            log::error!("Could not clear the stored session token: {e}");
        }
    }

    /// Record a channel the user just created, or `None` after deleting it.
    pub fn set_channel(&self, channel: Option<Channel>) {
        let mut state = self.state.borrow_mut();
        if state.user.is_none() {
            log::warn!("Ignoring channel update without a resolved user");
            return;
        }
        state.channel = channel;
    }

    pub fn phase(&self) -> SessionPhase {
        let state = self.state.borrow();
        match (&state.token, &state.user, &state.channel) {
            (None, _, _) => SessionPhase::Anonymous,
            (Some(_), None, _) => SessionPhase::Resolving,
            (Some(_), Some(_), None) => SessionPhase::NoChannel,
            (Some(_), Some(_), Some(_)) => SessionPhase::WithChannel,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.state.borrow().user.as_ref().map(|user| user.id.clone())
    }

    pub fn channel(&self) -> Option<Channel> {
        self.state.borrow().channel.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.borrow().token.is_some()
    }
}

impl TokenSource for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.token()
    }
}
