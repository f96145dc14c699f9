//! Filesystem storage for finished datastream files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

use ocean_common::{OceanError, OceanResult};

use crate::layout::StoragePath;
use crate::Storage;

/// Stores files under `{root}/{datastream}/{filename}`.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    /// Create a storage rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> OceanResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            OceanError::StorageError(format!(
                "Failed to create storage root {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where a file named `filename` ends up once stored.
    pub fn path_for(&self, filename: &str) -> OceanResult<PathBuf> {
        StoragePath::stored_file(&self.root, filename)
    }

    /// Check if a file with this name has been stored.
    pub fn exists(&self, filename: &str) -> OceanResult<bool> {
        Ok(self.path_for(filename)?.is_file())
    }

    /// List stored files of a datastream, sorted by name (and therefore by time).
    pub fn list(&self, datastream: &str) -> OceanResult<Vec<PathBuf>> {
        let dir = StoragePath::datastream_dir(&self.root, datastream);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| {
            OceanError::StorageError(format!("List failed for {}: {}", dir.display(), e))
        })? {
            let path = entry?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Get storage statistics (total size and file count) across all datastreams.
    pub fn stats(&self) -> OceanResult<StorageStats> {
        let mut total_size: u64 = 0;
        let mut file_count: u64 = 0;

        for entry in walkdir::WalkDir::new(&self.root) {
            let entry =
                entry.map_err(|e| OceanError::StorageError(format!("Walk failed: {}", e)))?;
            if entry.file_type().is_file() {
                let meta = entry
                    .metadata()
                    .map_err(|e| OceanError::StorageError(format!("Stat failed: {}", e)))?;
                total_size += meta.len();
                file_count += 1;
            }
        }

        Ok(StorageStats {
            total_size,
            file_count,
            root: self.root.display().to_string(),
        })
    }
}

impl Storage for FilesystemStorage {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn save_local_path(&self, local_path: &Path, new_filename: &str) -> OceanResult<PathBuf> {
        if !local_path.is_file() {
            return Err(OceanError::StorageError(format!(
                "Local file {} does not exist",
                local_path.display()
            )));
        }

        let dest = self.path_for(new_filename)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                OceanError::StorageError(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        if dest.exists() {
            debug!(path = %dest.display(), "Replacing stored file");
            fs::remove_file(&dest).map_err(|e| {
                OceanError::StorageError(format!(
                    "Failed to replace {}: {}",
                    dest.display(),
                    e
                ))
            })?;
        }

        if let Err(rename_err) = fs::rename(local_path, &dest) {
            // rename cannot cross filesystems; fall back to copy + remove
            warn!(error = %rename_err, "Rename failed, copying instead");
            fs::copy(local_path, &dest).map_err(|e| {
                OceanError::StorageError(format!(
                    "Failed to copy {} to {}: {}",
                    local_path.display(),
                    dest.display(),
                    e
                ))
            })?;
            if let Err(e) = fs::remove_file(local_path) {
                warn!(path = %local_path.display(), error = %e, "Could not remove local copy");
            }
        }

        debug!(path = %dest.display(), "Stored file");
        Ok(dest)
    }
}

/// Storage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStats {
    /// Total size in bytes
    pub total_size: u64,
    /// Number of stored files
    pub file_count: u64,
    /// Storage root
    pub root: String,
}
