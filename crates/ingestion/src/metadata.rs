//! File type detection for raw instrument files.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Detected file type based on the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Spotter displacement CSV (`NNNN_FLT.CSV`)
    SpotterFlt,
    /// Spotter GPS CSV (`NNNN_LOC.CSV`)
    SpotterLoc,
    /// NetCDF file (previously processed data)
    NetCdf,
    /// Unknown format
    Unknown,
}

static SPOTTER_FLT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d{4}_FLT\.CSV$").unwrap_or_else(|e| panic!("invalid FLT pattern: {}", e))
});

static SPOTTER_LOC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d{4}_LOC\.CSV$").unwrap_or_else(|e| panic!("invalid LOC pattern: {}", e))
});

/// Detect file type from path.
pub fn detect_file_type(path: impl AsRef<Path>) -> FileType {
    let name = match path.as_ref().file_name().and_then(|s| s.to_str()) {
        Some(name) => name,
        None => return FileType::Unknown,
    };

    if SPOTTER_FLT.is_match(name) {
        FileType::SpotterFlt
    } else if SPOTTER_LOC.is_match(name) {
        FileType::SpotterLoc
    } else {
        let lower = name.to_lowercase();
        if lower.ends_with(".nc") || lower.ends_with(".nc4") || lower.ends_with(".netcdf") {
            FileType::NetCdf
        } else {
            FileType::Unknown
        }
    }
}
