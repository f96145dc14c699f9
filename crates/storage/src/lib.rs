//! Storage abstractions for ocean-ingest pipelines.
//!
//! Provides:
//! - The [`Storage`] capability used by writers to hand off finished files
//! - A filesystem-backed implementation laid out by datastream
//! - Helpers for the `{datastream}.{YYYYMMDD}.{HHMMSS}.{ext}` naming convention

pub mod filesystem;
pub mod layout;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ocean_common::OceanResult;

pub use filesystem::{FilesystemStorage, StorageStats};
pub use layout::{datastream_of, StoragePath};

/// Places locally written artifacts into permanent storage.
///
/// Implementations own the final placement of every file handed to them. A
/// file may be handed off again under the same name; the later call replaces
/// the earlier artifact.
pub trait Storage {
    /// Move or copy the file at `local_path` into storage as `new_filename`,
    /// returning the stored location.
    fn save_local_path(&self, local_path: &Path, new_filename: &str) -> OceanResult<PathBuf>;
}

impl<T: Storage + ?Sized> Storage for &T {
    fn save_local_path(&self, local_path: &Path, new_filename: &str) -> OceanResult<PathBuf> {
        (**self).save_local_path(local_path, new_filename)
    }
}

impl<T: Storage + ?Sized> Storage for Arc<T> {
    fn save_local_path(&self, local_path: &Path, new_filename: &str) -> OceanResult<PathBuf> {
        (**self).save_local_path(local_path, new_filename)
    }
}
