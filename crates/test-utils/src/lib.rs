//! Test support for the ocean-ingest workspace.
//!
//! - [`generators`]: synthetic wave datasets on hourly or custom time axes
//! - [`fixtures`]: Spotter CSV text, datastream names and writer configs
//! - [`paths`]: the committed Spotter samples and scratch directories
//!
//! Pulled in as a dev-dependency; everything is re-exported at the root, so
//! `use test_utils::{hourly_dataset, require_test_file};` is enough.

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Path of a Spotter sample, or an early return from the test when it is
/// missing (e.g. `TEST_DATA_DIR` points at a directory without it).
///
/// ```ignore
/// let path = test_utils::require_test_file!("0001_FLT.CSV");
/// let dataset = ingestion::spotter::read_flt(&path)?;
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Spotter sample '{}' not found under {} or ${}",
                    $name,
                    $crate::sample_dir().display(),
                    $crate::TEST_DATA_DIR_ENV
                );
                return;
            }
        }
    }};
}

/// Assert two numbers are within `epsilon` of each other.
///
/// ```ignore
/// assert_approx_eq!(lat[[1]], 48.2001, 1e-9);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff.is_nan() || diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert a GPS fix `(lat, lon)` matches another within `epsilon` degrees.
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($lat1:expr, $lon1:expr), ($lat2:expr, $lon2:expr), $epsilon:expr) => {{
        $crate::assert_approx_eq!($lat1, $lat2, $epsilon);
        $crate::assert_approx_eq!($lon1, $lon2, $epsilon);
    }};
}
