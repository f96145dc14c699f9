//! Ocean instrument data ingestion library.
//!
//! Provides the core logic for turning raw instrument output into
//! time-chunked datastream files.
//!
//! # Architecture
//!
//! This crate is used by the `ingester` service. It handles:
//!
//! - Reading Sofar Spotter displacement and GPS CSV files
//! - Detecting file types from their names
//! - Splitting a dataset into time windows and writing one file per window
//! - Naming files after their datastream and first timestamp
//! - Handing finished files to a [`storage::Storage`]

pub mod chunked;
pub mod config;
pub mod error;
pub mod filename;
mod ingester;
pub mod metadata;
pub mod spotter;

// Re-exports
pub use chunked::{effective_encoding, ChunkedDatasetWriter, WriteSummary, WrittenWindow, TIME, TIME_B5};
pub use config::{WriterConfig, DEFAULT_COMPRESSION_LEVEL};
pub use error::{IngestionError, Result};
pub use filename::{datastream_name, derive_filename, filename_for, DATASTREAM_ATTR};
pub use ingester::{IngestSpec, Ingester, IngestionResult};
pub use metadata::{detect_file_type, FileType};
