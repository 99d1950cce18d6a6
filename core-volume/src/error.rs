use thiserror::Error;

#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("Invalid channel level: {0} (must be between 0.0 and 1.0)")]
    InvalidLevel(f32),

    #[error("Invalid channel offset: {0} (must be between 0.0 and 1.0)")]
    InvalidOffset(f32),

    #[error("Invalid balance: {0} (must be between -1.0 and 1.0)")]
    InvalidBalance(f32),

    #[error("No async runtime available to drive the fade timer")]
    NoRuntime,
}

impl VolumeError {
    /// Returns `true` for rejected out-of-range input, as opposed to a
    /// missing-runtime environment problem.
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            VolumeError::InvalidLevel(_)
                | VolumeError::InvalidOffset(_)
                | VolumeError::InvalidBalance(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VolumeError>;
