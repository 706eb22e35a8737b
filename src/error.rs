//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Covers band resolution and loading, user inversion functions, display-range
//! computation, configuration and the underlying I/O, GDAL and JSON errors.
use thiserror::Error;

use crate::types::Product;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Band {band} not available in product {product}")]
    BandNotAvailable { band: String, product: Product },

    #[error("Failed to load band {band}: {reason}")]
    BandLoad { band: String, reason: String },

    #[error("Band {band} requested before it was loaded")]
    BandNotLoaded { band: String },

    #[error("Inversion function {function} failed: {reason}")]
    InversionFunction { function: String, reason: String },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("No valid pixels to compute display range of {parameter}")]
    NoValidData { parameter: String },

    #[error("No inversion section found in configuration")]
    MissingInversionConfig,

    #[error("Parameter {name} is already registered")]
    DuplicateParameter { name: String },

    #[error("Parameter {name} is not registered")]
    UnknownParameter { name: String },

    #[error("Formula error: {0}")]
    Formula(String),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Report error: {0}")]
    Report(String),

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }

    pub fn report<E: std::fmt::Display>(e: E) -> Self {
        Error::Report(e.to_string())
    }
}
