use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failure of a single call to the hosted service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message} (status {status})")]
    Status { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("realtime: {0}")]
    Socket(#[from] Box<tungstenite::Error>),
    #[error("{0}")]
    Rejected(String),
}

impl From<tungstenite::Error> for RemoteError {
    fn from(err: tungstenite::Error) -> Self {
        RemoteError::Socket(Box::new(err))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("auth request failed: {0}")]
    AuthRequest(RemoteError),
    #[error("query failed: {0}")]
    Query(RemoteError),
    #[error("write failed: {0}")]
    Write(RemoteError),
    #[error("not signed in")]
    NoSession,
    #[error("configuration: {0}")]
    Config(String),
}
