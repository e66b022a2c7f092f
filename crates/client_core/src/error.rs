use shared::error::ErrorCode;
use thiserror::Error;

/// Fallback shown when a failure carries no server-supplied text.
pub const GENERIC_ERROR_MESSAGE: &str = "Ocorreu um erro.";
pub const TRANSPORT_ERROR_MESSAGE: &str = "Não foi possível comunicar com o servidor.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected request with status {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Rejected {
        status: u16,
        code: ErrorCode,
        message: Option<String>,
    },
    #[error("session expired")]
    SessionExpired,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("invalid api base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("session store failure: {0}")]
    SessionStore(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn rejected(status: u16, message: Option<String>) -> Self {
        Self::Rejected {
            status,
            code: ErrorCode::from_status(status),
            message,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::SessionExpired)
    }

    /// Text suitable for a notification banner.
    pub fn user_message(&self) -> String {
        self.user_message_or(GENERIC_ERROR_MESSAGE)
    }

    pub fn user_message_or(&self, fallback: &str) -> String {
        match self {
            ClientError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            ClientError::AccessDenied(message) => message.clone(),
            ClientError::Transport(_) => TRANSPORT_ERROR_MESSAGE.to_string(),
            _ => fallback.to_string(),
        }
    }
}
