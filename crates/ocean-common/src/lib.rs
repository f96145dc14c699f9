//! Common types and utilities shared across the ocean-ingest crates.

pub mod dataset;
pub mod encoding;
pub mod error;
pub mod time;

pub use dataset::{AttrValue, Dataset, Values, Variable};
pub use encoding::{DatasetEncoder, EncodingMap, FillValue, VariableEncoding, WriteOptions};
pub use error::{OceanError, OceanResult};
pub use time::{from_epoch_seconds, to_epoch_seconds, TimeUnit, TimeWindow};
