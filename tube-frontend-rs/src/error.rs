use optimist::RemoteFailure;

use crate::validate::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("you must be logged in to do that")]
    Unauthenticated,

    #[error(transparent)]
    ValidationFailed(#[from] ValidationError),

    #[error("server rejected the request ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    RemoteRejected { status: u16, message: Option<String> },

    #[error("not found: {}", .message.as_deref().unwrap_or("no message"))]
    NotFound { message: Option<String> },

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("could not decode the server's response: {0}")]
    Decode(String),

    #[error("invalid API URL {url:?}: {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

impl ClientError {
    /// Build the error for a non-2xx answer, keeping the server's message verbatim.
    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        let message = server_message(body);
        match status {
            404 => ClientError::NotFound { message },
            _ => ClientError::RemoteRejected { status, message },
        }
    }

    pub(crate) fn transport(error: reqwest::Error) -> Self {
        ClientError::NetworkUnavailable(error.to_string())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::RemoteRejected { status, .. } => Some(*status),
            ClientError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// `{"message": "..."}` bodies yield the message, anything else non-blank is taken as is.
fn server_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(fields)) => match fields.get("message") {
            Some(serde_json::Value::String(message)) => Some(message.clone()),
            _ => Some(body.to_string()),
        },
        _ => Some(body.to_string()),
    }
}

impl From<ClientError> for RemoteFailure {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::NetworkUnavailable(reason) => RemoteFailure::Network(reason),
            ClientError::RemoteRejected { status, message } => {
                RemoteFailure::Rejected { status, message }
            }
            ClientError::NotFound { message } => RemoteFailure::Rejected {
                status: 404,
                message,
            },
            ClientError::Unauthenticated => RemoteFailure::Rejected {
                status: 401,
                message: None,
            },
            other => RemoteFailure::Network(other.to_string()),
        }
    }
}
