use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine capability not available: {0}")]
    NotAvailable(String),

    #[error("Unknown media handle: {0}")]
    UnknownHandle(crate::playback::MediaHandle),

    #[error("Media load failed: {0}")]
    LoadFailed(String),

    #[error("Engine operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Returns `true` when the error refers to a handle the engine no
    /// longer (or never) tracked, which callers usually treat as benign
    /// during teardown.
    pub fn is_unknown_handle(&self) -> bool {
        matches!(self, EngineError::UnknownHandle(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
