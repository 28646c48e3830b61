use thiserror::Error;

#[derive(Error, Debug)]
pub enum FieldError {
    /// A request factor was NaN or infinite.
    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    /// The blocking generation task panicked or was cancelled.
    #[error("generation worker failed: {0}")]
    Worker(String),

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FieldError>;

impl From<tokio::task::JoinError> for FieldError {
    fn from(e: tokio::task::JoinError) -> Self {
        FieldError::Worker(e.to_string())
    }
}
