//! NetCDF-4 serialization for ocean datasets.
//!
//! [`NetCdfEncoder`] implements [`ocean_common::DatasetEncoder`] so it can be
//! plugged into the chunked writer. Timestamps are stored as float seconds
//! since the Unix epoch with CF `units`/`calendar` attributes.
//!
//! # Requirements
//!
//! This crate requires the NetCDF and HDF5 C libraries to be installed:
//! - Ubuntu/Debian: `apt install libnetcdf-dev libhdf5-dev`
//! - macOS: `brew install netcdf hdf5`

pub mod error;
pub mod native;

use std::path::Path;

use ocean_common::{Dataset, DatasetEncoder, EncodingMap, OceanResult, WriteOptions};

pub use error::{NetCdfError, NetCdfResult};
pub use native::{silence_hdf5_errors, write_dataset, NetCdfFormat, TIME_UNITS};

/// Encoder producing `.nc` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfEncoder;

impl NetCdfEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl DatasetEncoder for NetCdfEncoder {
    fn extension(&self) -> &str {
        "nc"
    }

    fn encode(
        &self,
        dataset: &Dataset,
        path: &Path,
        encoding: &EncodingMap,
        options: &WriteOptions,
    ) -> OceanResult<()> {
        write_dataset(dataset, path, encoding, options).map_err(Into::into)
    }
}
