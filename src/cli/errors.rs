use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid report size: {size}. Must be a positive integer or 'original'")]
    InvalidSize { size: String },

    #[error("Report size must be greater than 0, got: {size}")]
    ZeroSize { size: usize },

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Quality(#[from] waterquality::Error),
}
