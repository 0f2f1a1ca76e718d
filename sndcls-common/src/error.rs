//! Common error types for sndcls

use thiserror::Error;

/// Common result type for sndcls operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds shared by the loader, extractor, classifier and service layer
#[derive(Error, Debug)]
pub enum Error {
    /// Audio source (or another resource) could not be read at all
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input bytes could not be parsed as audio
    #[error("Decode error: {0}")]
    Decode(String),

    /// Malformed or unrecognized configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Computed feature shape incompatible with the configured padding or model input
    #[error("Shape error: {0}")]
    Shape(String),

    /// Class registry unreadable or inconsistent with the model output
    #[error("Registry error: {0}")]
    Registry(String),

    /// Model artifact loading or inference failure
    #[error("Model error: {0}")]
    Model(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
