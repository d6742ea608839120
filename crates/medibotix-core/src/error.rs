use thiserror::Error;

/// Failure talking to the backend: connection fault, timeout, non-2xx status
/// or a body that could not be decoded.
#[derive(Debug, Clone, Error)]
#[error("{detail}")]
pub struct TransportError {
    /// Human-readable message supplied by the server, if it sent one
    pub server_message: Option<String>,
    /// Status code for non-2xx responses
    pub status: Option<u16>,
    detail: String,
}

impl TransportError {
    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            server_message: None,
            status: None,
            detail: detail.into(),
        }
    }

    pub fn status(status: u16, server_message: Option<String>) -> Self {
        let detail = match &server_message {
            Some(msg) => format!("Backend returned HTTP {}: {}", status, msg),
            None => format!("Backend returned HTTP {}", status),
        };
        Self {
            server_message,
            status: Some(status),
            detail,
        }
    }

    pub fn decode(detail: impl Into<String>) -> Self {
        Self {
            server_message: None,
            status: None,
            detail: format!("Unreadable backend response: {}", detail.into()),
        }
    }
}

/// Client-side error taxonomy for uploads and questions
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Rejected locally, before any network call
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The backend answered but flagged a logical failure
    #[error("Backend error: {0}")]
    Application(String),
}

impl ClientError {
    /// Message fit for showing to the user, or `None` when only a generic
    /// fallback makes sense.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            ClientError::Validation(msg) => Some(msg),
            ClientError::Transport(err) => err.server_message.as_deref(),
            ClientError::Application(msg) if msg.trim().is_empty() => None,
            ClientError::Application(msg) => Some(msg),
        }
    }
}
