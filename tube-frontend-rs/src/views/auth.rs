use std::rc::Rc;

use tube_types::{AuthResponse, LoginRequest, RegisterRequest};

use crate::{ClientError, SessionError, SessionPhase, SessionStore, validate};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The sign-up / sign-in form. A successful answer logs the session in.
pub struct AuthForm {
    session: Rc<SessionStore>,
}

impl AuthForm {
    pub fn new(session: Rc<SessionStore>) -> Self {
        Self { session }
    }

    pub async fn register(&self, form: &RegisterRequest) -> Result<SessionPhase, AuthError> {
        validate::register(form).map_err(ClientError::from)?;
        let response = self
            .session
            .api()
            .register(form)
            .await
            .inspect_err(|e| log::error!("Registration failed: {e}"))?;
        self.adopt(response).await
    }

    pub async fn login(&self, form: &LoginRequest) -> Result<SessionPhase, AuthError> {
        validate::login(form).map_err(ClientError::from)?;
        let response = self
            .session
            .api()
            .login(form)
            .await
            .inspect_err(|e| log::error!("Login failed: {e}"))?;
        self.adopt(response).await
    }

    async fn adopt(&self, response: AuthResponse) -> Result<SessionPhase, AuthError> {
        if let Some(message) = &response.message {
            log::info!("{message}");
        }
        Ok(self.session.login(response.token).await?)
    }
}
