use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Remote rejected the write: {0}")]
    Rejected(String),

    #[error("Local cache error: {0}")]
    LocalCache(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Invalid export: {0}")]
    InvalidExport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Save queue closed before the write was attempted")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        SyncError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Json(e.to_string())
    }
}

impl SyncError {
    /// Network failures and non-2xx answers: the cases worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transport(_) | SyncError::Status { .. })
    }

    /// Errors that originate from the remote authority, as opposed to local I/O.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(_)
                | SyncError::Status { .. }
                | SyncError::MalformedPayload(_)
                | SyncError::Rejected(_)
        )
    }
}
