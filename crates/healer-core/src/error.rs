use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("token is missing or empty")]
    InvalidToken,
}

/// Failure of a single user-initiated request. Every variant is terminal for
/// that attempt; nothing here is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("session expired, please log in again")]
    SessionExpired,
    #[error("network failure: check if the backend is running at {base_url}")]
    NetworkUnreachable { base_url: String },
    #[error("{detail}")]
    ServerRejected { status: u16, detail: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Validation(_) => "validation",
            ClientError::SessionExpired => "session_expired",
            ClientError::NetworkUnreachable { .. } => "network",
            ClientError::ServerRejected { .. } => "server_rejected",
            ClientError::Decode(_) => "decode",
        }
    }

    pub fn requires_login(&self) -> bool {
        matches!(self, ClientError::SessionExpired)
    }
}

impl From<SessionError> for ClientError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidToken => ClientError::Validation(err.to_string()),
        }
    }
}
