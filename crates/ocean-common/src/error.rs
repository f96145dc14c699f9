//! Error types shared across the ocean-ingest crates.

use thiserror::Error;

/// Result type alias using OceanError.
pub type OceanResult<T> = Result<T, OceanError>;

/// Primary error type for dataset, codec, and storage operations.
#[derive(Debug, Error)]
pub enum OceanError {
    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown time unit: {0}")]
    UnknownTimeUnit(String),

    // === Data Errors ===
    #[error("Missing coordinate: {0}")]
    MissingCoordinate(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Dimension '{dim}' has length {expected} but variable '{variable}' has length {actual}")]
    ShapeMismatch {
        dim: String,
        variable: String,
        expected: usize,
        actual: usize,
    },

    // === Codec Errors ===
    #[error("Failed to encode variable '{variable}': {message}")]
    EncodeVariable { variable: String, message: String },

    #[error("Failed to encode dataset: {0}")]
    Encode(String),

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OceanError {
    /// Name of the variable the error is attached to, if any.
    pub fn variable(&self) -> Option<&str> {
        match self {
            OceanError::EncodeVariable { variable, .. }
            | OceanError::ShapeMismatch { variable, .. } => Some(variable),
            _ => None,
        }
    }

    /// Whether this error stems from bad configuration rather than bad data or I/O.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            OceanError::InvalidConfig(_) | OceanError::UnknownTimeUnit(_)
        )
    }
}

impl From<serde_json::Error> for OceanError {
    fn from(err: serde_json::Error) -> Self {
        OceanError::InvalidData(format!("JSON error: {}", err))
    }
}
