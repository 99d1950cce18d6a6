use core_volume::VolumeError;
use engine_traits::EngineError;
use thiserror::Error;

/// Errors surfaced by sessions and their pooled playable objects.
#[derive(Error, Debug)]
pub enum SessionError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Session configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    /// The playback engine rejected an operation.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// A volume operation failed.
    #[error("Volume error: {0}")]
    Volume(#[from] VolumeError),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Playback rate outside the supported range.
    #[error("Playback rate {0} is out of range (0.5 to 2.0)")]
    InvalidRate(f32),

    /// Operation on an object that was already released.
    #[error("Object has been released")]
    UseAfterRelease,
}

impl SessionError {
    /// Returns true if the error originated in the playback engine.
    pub fn is_engine_error(&self) -> bool {
        matches!(self, SessionError::Engine(_))
    }

    /// Returns true if the error is an out-of-range numeric input.
    pub fn is_range_error(&self) -> bool {
        match self {
            SessionError::InvalidRate(_) => true,
            SessionError::Volume(error) => error.is_range_error(),
            _ => false,
        }
    }

    /// Returns true if the error is a use-after-release violation.
    pub fn is_use_after_release(&self) -> bool {
        matches!(self, SessionError::UseAfterRelease)
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
