//! Error types for NetCDF writing operations.

use ocean_common::OceanError;
use thiserror::Error;

/// Result type for NetCDF writer operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF writing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The library rejected a variable
    #[error("variable '{variable}': {message}")]
    Variable { variable: String, message: String },

    /// The library rejected a file-level operation
    #[error("{0}")]
    Library(String),

    /// Unsupported write option
    #[error("Invalid write option: {0}")]
    InvalidOption(String),
}

impl NetCdfError {
    pub(crate) fn variable(variable: &str, err: impl std::fmt::Display) -> Self {
        NetCdfError::Variable {
            variable: variable.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<netcdf::Error> for NetCdfError {
    fn from(err: netcdf::Error) -> Self {
        NetCdfError::Library(err.to_string())
    }
}

impl From<NetCdfError> for OceanError {
    fn from(err: NetCdfError) -> Self {
        match err {
            NetCdfError::IoError(e) => OceanError::Io(e),
            NetCdfError::Variable { variable, message } => {
                OceanError::EncodeVariable { variable, message }
            }
            NetCdfError::InvalidOption(msg) => OceanError::InvalidConfig(msg),
            NetCdfError::Library(msg) => OceanError::Encode(msg),
        }
    }
}
