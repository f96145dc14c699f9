//! Filenames of written datastream files.
//!
//! A file is named after its datastream and the first timestamp it holds:
//! `{datastream}.{YYYYMMDD}.{HHMMSS}.{ext}`. Timestamps with a non-zero
//! sub-second part get a fractional suffix, in milliseconds (`HHMMSS.mmm`)
//! when that is exact and in micro- or nanoseconds otherwise, so distinct
//! start times always give distinct names.

use chrono::{DateTime, Timelike, Utc};

use ocean_common::Dataset;

use crate::error::{IngestionError, Result};

/// Global attribute holding the datastream name.
pub const DATASTREAM_ATTR: &str = "datastream";

/// Name of the file holding `dataset`, derived from its `datastream`
/// attribute and first `time` value.
pub fn derive_filename(dataset: &Dataset, extension: &str) -> Result<String> {
    let datastream = dataset.attr_str(DATASTREAM_ATTR).ok_or_else(|| {
        IngestionError::MissingMetadata(format!(
            "global attribute '{}' is required to name output files",
            DATASTREAM_ATTR
        ))
    })?;

    let first = dataset
        .time_values("time")?
        .first()
        .copied()
        .ok_or_else(|| IngestionError::InvalidData("cannot name an empty dataset".to_string()))?;

    Ok(filename_for(datastream, first, extension))
}

/// `{datastream}.{YYYYMMDD}.{HHMMSS}[.fff].{ext}` for a file starting at `start`.
pub fn filename_for(datastream: &str, start: DateTime<Utc>, extension: &str) -> String {
    // chrono carries a leap second as nanosecond >= 1e9
    let nanos = start.nanosecond() % 1_000_000_000;
    let hms = start.format("%H%M%S");
    let time = if nanos == 0 {
        hms.to_string()
    } else if nanos % 1_000_000 == 0 {
        format!("{}.{:03}", hms, nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{}.{:06}", hms, nanos / 1_000)
    } else {
        format!("{}.{:09}", hms, nanos)
    };

    format!(
        "{}.{}.{}.{}",
        datastream,
        start.format("%Y%m%d"),
        time,
        extension.trim_start_matches('.')
    )
}

/// Assemble a datastream name: `{location}.{dataset}[-{qualifier}].{level}`.
///
/// e.g. `clallam.wave.a1` or `mcrl.current-up.b1`.
pub fn datastream_name(
    location_id: &str,
    dataset_name: &str,
    qualifier: Option<&str>,
    data_level: &str,
) -> String {
    match qualifier.filter(|q| !q.is_empty()) {
        Some(q) => format!("{}.{}-{}.{}", location_id, dataset_name, q, data_level),
        None => format!("{}.{}.{}", location_id, dataset_name, data_level),
    }
}
