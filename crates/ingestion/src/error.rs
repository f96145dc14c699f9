//! Error types for the ingestion crate.

use ocean_common::{OceanError, TimeWindow};
use thiserror::Error;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse CSV data: {0}")]
    CsvParse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Missing coordinate: {0}")]
    MissingCoordinate(String),

    #[error("Window {window}: 'time' has samples but 'time_b5' has none")]
    BeamGap { window: TimeWindow },

    #[error("Window {window}: failed to serialize{}: {message}", variable_suffix(.variable))]
    Serialization {
        window: TimeWindow,
        variable: Option<String>,
        message: String,
    },

    #[error("Window {window}: storage hand-off failed: {source}")]
    StorageHandoff {
        window: TimeWindow,
        #[source]
        source: OceanError,
    },

    #[error("Derived filename '{0}' collides with a file already written in this call")]
    NameCollision(String),

    #[error("Unknown file type: {0}")]
    UnknownFileType(String),

    #[error("Missing required metadata: {0}")]
    MissingMetadata(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

fn variable_suffix(variable: &Option<String>) -> String {
    match variable {
        Some(v) => format!(" variable '{}'", v),
        None => String::new(),
    }
}

impl IngestionError {
    /// Serialization failure for `window`, keeping the variable name when the
    /// encoder reported one.
    pub fn serialization(window: TimeWindow, err: OceanError) -> Self {
        match err {
            OceanError::EncodeVariable { variable, message } => IngestionError::Serialization {
                window,
                variable: Some(variable),
                message,
            },
            // configuration problems surface as such even when found by the encoder
            OceanError::InvalidConfig(msg) => IngestionError::InvalidConfig(msg),
            other => IngestionError::Serialization {
                window,
                variable: other.variable().map(str::to_string),
                message: other.to_string(),
            },
        }
    }

    /// Whether this error was raised before any file was written.
    pub fn is_config_error(&self) -> bool {
        matches!(self, IngestionError::InvalidConfig(_))
    }

    /// Whether the input data, rather than configuration or I/O, was at fault.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            IngestionError::InvalidData(_)
                | IngestionError::MissingCoordinate(_)
                | IngestionError::BeamGap { .. }
                | IngestionError::CsvParse(_)
        )
    }

    /// Time range of the window being processed when the error occurred.
    pub fn window(&self) -> Option<&TimeWindow> {
        match self {
            IngestionError::BeamGap { window }
            | IngestionError::Serialization { window, .. }
            | IngestionError::StorageHandoff { window, .. } => Some(window),
            _ => None,
        }
    }
}

impl From<OceanError> for IngestionError {
    fn from(err: OceanError) -> Self {
        match err {
            OceanError::InvalidConfig(msg) => IngestionError::InvalidConfig(msg),
            OceanError::UnknownTimeUnit(unit) => {
                IngestionError::InvalidConfig(format!("unknown time unit '{}'", unit))
            }
            OceanError::MissingCoordinate(name) => IngestionError::MissingCoordinate(name),
            OceanError::InvalidData(msg) => IngestionError::InvalidData(msg),
            e @ OceanError::ShapeMismatch { .. } => IngestionError::InvalidData(e.to_string()),
            OceanError::Io(e) => IngestionError::FileRead(e),
            other => IngestionError::Other(anyhow::Error::new(other)),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
