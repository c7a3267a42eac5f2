//! Error types for the E-Key core

use thiserror::Error;

/// Result type alias using EkeyError
pub type Result<T> = std::result::Result<T, EkeyError>;

/// Errors that can occur in the E-Key core
#[derive(Error, Debug)]
pub enum EkeyError {
    /// Signature creation or verification failed
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// JSON encoding/decoding error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Token or proof does not have the expected structure
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Key type or algorithm outside the supported set
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

impl From<serde_json::Error> for EkeyError {
    fn from(err: serde_json::Error) -> Self {
        EkeyError::Serialization(err.to_string())
    }
}

impl From<base64::DecodeError> for EkeyError {
    fn from(err: base64::DecodeError) -> Self {
        EkeyError::Malformed(format!("invalid base64url segment: {}", err))
    }
}

impl From<url::ParseError> for EkeyError {
    fn from(err: url::ParseError) -> Self {
        EkeyError::Malformed(format!("invalid URL: {}", err))
    }
}
