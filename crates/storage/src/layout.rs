//! Path layout for stored datastream files.

use std::path::{Path, PathBuf};

use ocean_common::{OceanError, OceanResult};

/// Datastream prefix of a stored filename.
///
/// Filenames follow `{location}.{dataset}.{level}.{YYYYMMDD}.{HHMMSS}[.fff].{ext}`;
/// everything before the first all-digit date component is the datastream.
pub fn datastream_of(filename: &str) -> Option<&str> {
    let mut offset = 0;
    for part in filename.split('.') {
        if part.len() == 8 && part.bytes().all(|b| b.is_ascii_digit()) {
            return match offset {
                0 => None,
                _ => Some(&filename[..offset - 1]),
            };
        }
        offset += part.len() + 1;
    }
    None
}

/// Path builder for consistent storage layout.
pub struct StoragePath;

impl StoragePath {
    /// Directory holding every file of a datastream.
    /// Format: {root}/{datastream}
    pub fn datastream_dir(root: &Path, datastream: &str) -> PathBuf {
        root.join(datastream)
    }

    /// Final location of a stored file.
    /// Format: {root}/{datastream}/{filename}
    pub fn stored_file(root: &Path, filename: &str) -> OceanResult<PathBuf> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(OceanError::StorageError(format!(
                "'{}' is not a plain file name",
                filename
            )));
        }

        let datastream = datastream_of(filename).ok_or_else(|| {
            OceanError::StorageError(format!(
                "cannot determine datastream of '{}'",
                filename
            ))
        })?;

        Ok(Self::datastream_dir(root, datastream).join(filename))
    }
}
