//! Locating the Spotter sample files and scratch directories for tests.
//!
//! The samples live in `crates/ingestion/testdata/`. Setting `TEST_DATA_DIR`
//! points the lookup at another directory first, e.g. a full day of
//! deployment files.

use std::path::PathBuf;

/// Environment variable naming an extra sample directory.
pub const TEST_DATA_DIR_ENV: &str = "TEST_DATA_DIR";

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or(manifest_dir)
}

/// Directory of the committed Spotter samples.
pub fn sample_dir() -> PathBuf {
    workspace_root().join("crates/ingestion/testdata")
}

/// Path of sample `name`, preferring `TEST_DATA_DIR` over [`sample_dir`].
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let override_dir = std::env::var_os(TEST_DATA_DIR_ENV).map(PathBuf::from);

    override_dir
        .into_iter()
        .chain(std::iter::once(sample_dir()))
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Scratch directory removed when dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("ocean-test-")
        .tempdir()
        .expect("Failed to create temporary test directory")
}
