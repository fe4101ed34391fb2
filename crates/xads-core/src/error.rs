//! Error types for XADS

use thiserror::Error;

/// Core error type for XADS operations
#[derive(Error, Debug)]
pub enum XadsError {
    /// The XA data source could not produce a physical connection
    #[error("Connection acquisition failed: {0}")]
    ConnectionAcquisitionFailed(String),

    /// The transaction manager refused to wrap a physical connection
    #[error("Enlistment error: {0}")]
    Enlistment(String),

    /// A digest algorithm needed for node identifier shortening is unavailable
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),

    #[error("Connection closed: {0}")]
    Closed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl XadsError {
    /// Returns true for errors raised while validating or applying configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            XadsError::InvalidConfiguration(_) | XadsError::UnsupportedAlgorithm(_)
        )
    }
}

/// Result type alias for XADS operations
pub type Result<T> = std::result::Result<T, XadsError>;
