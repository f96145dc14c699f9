//! Behaviour of the time-chunked writer, checked against recording fakes.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use ingestion::{ChunkedDatasetWriter, IngestionError, WriterConfig};
use ocean_common::{
    Dataset, DatasetEncoder, EncodingMap, FillValue, OceanError, OceanResult, TimeUnit,
    TimeWindow, Values, VariableEncoding, WriteOptions,
};
use storage::Storage;
use test_utils::{hourly_dataset, t0, time_index_of, wave_dataset, with_beam5};

// ============================================================================
// Fakes
// ============================================================================

struct EncodeCall {
    path: PathBuf,
    dataset: Dataset,
    encoding: EncodingMap,
    options: WriteOptions,
}

/// Records every dataset it is asked to encode and leaves a small file behind.
#[derive(Default)]
struct RecordingEncoder {
    calls: Mutex<Vec<EncodeCall>>,
    /// Fail the n-th call (0-based) with a variable error
    fail_at: Option<usize>,
}

impl RecordingEncoder {
    fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Self::default()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn times(&self, call: usize) -> Vec<DateTime<Utc>> {
        self.calls.lock().unwrap()[call]
            .dataset
            .time_values("time")
            .unwrap()
            .to_vec()
    }

    fn encoding(&self, call: usize) -> EncodingMap {
        self.calls.lock().unwrap()[call].encoding.clone()
    }
}

impl DatasetEncoder for RecordingEncoder {
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
        let mut calls = self.calls.lock().unwrap();
        if self.fail_at == Some(calls.len()) {
            return Err(OceanError::EncodeVariable {
                variable: "displacement".to_string(),
                message: "codec rejected variable".to_string(),
            });
        }
        std::fs::write(path, b"window")?;
        calls.push(EncodeCall {
            path: path.to_path_buf(),
            dataset: dataset.clone(),
            encoding: encoding.clone(),
            options: options.clone(),
        });
        Ok(())
    }
}

/// Records every hand-off; optionally fails them all.
#[derive(Default)]
struct RecordingStorage {
    saved: Mutex<Vec<(PathBuf, String)>>,
    fail: bool,
}

impl RecordingStorage {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn names(&self) -> Vec<String> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    fn local_paths(&self) -> Vec<PathBuf> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }
}

impl Storage for RecordingStorage {
    fn save_local_path(&self, local_path: &Path, new_filename: &str) -> OceanResult<PathBuf> {
        assert!(local_path.is_file(), "handed a missing file");
        self.saved
            .lock()
            .unwrap()
            .push((local_path.to_path_buf(), new_filename.to_string()));
        if self.fail {
            return Err(OceanError::StorageError("archive unavailable".to_string()));
        }
        Ok(PathBuf::from("/archive").join(new_filename))
    }
}

fn daily() -> WriterConfig {
    WriterConfig::new(1, TimeUnit::Day)
}

fn hours(n: i64) -> DateTime<Utc> {
    t0() + Duration::hours(n)
}

// ============================================================================
// Window boundaries
// ============================================================================

#[test]
fn test_two_and_a_half_days_gives_three_windows() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.nc");
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    // samples every hour from t0 through t0 + 60h
    let summary = writer.write(&hourly_dataset(61), &first, &daily()).unwrap();

    assert_eq!(summary.window_count(), 3);
    assert_eq!(
        summary.windows.iter().map(|w| w.window).collect::<Vec<_>>(),
        vec![
            TimeWindow::new(hours(0), hours(24)),
            TimeWindow::new(hours(24), hours(48)),
            TimeWindow::new(hours(48), hours(72)),
        ]
    );
    assert_eq!(
        summary.windows.iter().map(|w| w.samples).collect::<Vec<_>>(),
        vec![24, 24, 13]
    );
    assert_eq!(encoder.call_count(), 3);
    assert_eq!(
        storage.names(),
        vec![
            "clallam.wave.a1.20210802.000000.nc",
            "clallam.wave.a1.20210803.000000.nc",
        ]
    );
    assert_eq!(summary.windows[0].path, first);
    assert_eq!(
        summary.windows[2].path,
        PathBuf::from("/archive/clallam.wave.a1.20210803.000000.nc")
    );
}

#[test]
fn test_windows_cover_every_sample_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);
    let config = WriterConfig::new(7, TimeUnit::Hour);

    let dataset = hourly_dataset(50);
    let summary = writer
        .write(&dataset, &dir.path().join("first.nc"), &config)
        .unwrap();

    let mut seen = Vec::new();
    for (call, written) in summary.windows.iter().enumerate() {
        let times = encoder.times(call);
        assert!(times.iter().all(|t| written.window.contains(*t)));
        seen.extend(times);
    }
    assert_eq!(seen, dataset.time_values("time").unwrap().to_vec());

    // windows are written in increasing order and touch end-to-start
    for pair in summary.windows.windows(2) {
        assert_eq!(pair[0].window.end, pair[1].window.start);
    }
}

#[test]
fn test_displacement_rows_follow_their_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    writer
        .write(&hourly_dataset(30), &dir.path().join("first.nc"), &daily())
        .unwrap();

    let calls = encoder.calls.lock().unwrap();
    let second = &calls[1].dataset;
    match &second.var("displacement").unwrap().values {
        Values::Float64(arr) => {
            assert_eq!(arr.shape(), &[3, 6]);
            assert_eq!(time_index_of(arr[[0, 0]]), 24);
            assert_eq!(arr[[2, 5]], 2029.0);
        }
        other => panic!("unexpected dtype {}", other.dtype()),
    }
    // variables without a time dimension are carried whole
    assert_eq!(second.dim_len("dir"), Some(3));
}

#[test]
fn test_span_shorter_than_interval_writes_only_first_file() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.nc");
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    let summary = writer.write(&hourly_dataset(10), &first, &daily()).unwrap();

    assert_eq!(summary.window_count(), 1);
    assert!(summary.derived_filenames().is_empty());
    assert_eq!(encoder.call_count(), 1);
    assert_eq!(encoder.calls.lock().unwrap()[0].path, first);
    assert!(storage.names().is_empty());
    assert!(first.is_file());
}

#[test]
fn test_tail_sample_on_boundary_gets_its_own_window() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    // t0 .. t0 + 24h inclusive: the last sample sits exactly on the boundary
    let summary = writer
        .write(&hourly_dataset(25), &dir.path().join("first.nc"), &daily())
        .unwrap();

    assert_eq!(summary.window_count(), 2);
    assert_eq!(summary.windows[1].samples, 1);
    assert_eq!(encoder.times(1), vec![hours(24)]);
    assert_eq!(storage.names(), vec!["clallam.wave.a1.20210802.000000.nc"]);
}

#[test]
fn test_empty_interior_window_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    let dataset = wave_dataset(vec![hours(0), hours(1), hours(50), hours(51)]);
    let summary = writer
        .write(&dataset, &dir.path().join("first.nc"), &daily())
        .unwrap();

    assert_eq!(summary.window_count(), 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(storage.names(), vec!["clallam.wave.a1.20210803.020000.nc"]);
}

// ============================================================================
// Naming
// ============================================================================

#[test]
fn test_derived_names_are_deterministic() {
    let dataset = hourly_dataset(100);
    let config = WriterConfig::new(12, TimeUnit::Hour);

    let mut runs = Vec::new();
    for _ in 0..2 {
        let dir = tempfile::tempdir().unwrap();
        let encoder = RecordingEncoder::default();
        let storage = RecordingStorage::default();
        let writer = ChunkedDatasetWriter::new(&encoder, &storage);
        writer
            .write(&dataset, &dir.path().join("first.nc"), &config)
            .unwrap();
        runs.push(storage.names());
    }

    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[0].len(), 8);
    assert_eq!(runs[0][0], "clallam.wave.a1.20210801.120000.nc");
}

#[test]
fn test_windows_starting_in_the_same_millisecond_get_distinct_names() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    // windows start at .0004 s; the first samples of windows 1 and 2 are 300 µs apart
    let us = Duration::microseconds;
    let times = vec![
        t0() + us(400),
        t0() + Duration::seconds(2) + us(100),
        t0() + Duration::seconds(2) + us(400),
    ];
    let summary = writer
        .write(
            &wave_dataset(times),
            &dir.path().join("first.nc"),
            &WriterConfig::new(1, TimeUnit::Second),
        )
        .unwrap();

    assert_eq!(summary.skipped, 0);
    assert_eq!(
        storage.names(),
        vec![
            "clallam.wave.a1.20210801.000002.000100.nc",
            "clallam.wave.a1.20210801.000002.000400.nc",
        ]
    );
}

#[test]
fn test_first_filename_is_never_reused() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("clallam.wave.a1.20210802.000000.nc");
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    let err = writer.write(&hourly_dataset(30), &first, &daily()).unwrap_err();
    assert!(matches!(err, IngestionError::NameCollision(ref n) if n == "clallam.wave.a1.20210802.000000.nc"));
    assert!(storage.names().is_empty());
    // the first window was written and is left in place
    assert!(first.is_file());
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_text_fill_value_is_not_passed_to_encoder() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    let mut dataset = hourly_dataset(30);
    if let Some(var) = dataset.variable_mut("dir") {
        var.encoding.fill_value = Some(FillValue::Text(String::new()));
    }
    let mut config = daily();
    config.encoding.insert(
        "dir".to_string(),
        VariableEncoding {
            fill_value: Some(FillValue::Text("NA".to_string())),
            ..Default::default()
        },
    );

    writer
        .write(&dataset, &dir.path().join("first.nc"), &config)
        .unwrap();

    for call in 0..encoder.call_count() {
        assert_eq!(encoder.encoding(call)["dir"].fill_value, None);
    }
}

#[test]
fn test_caller_encoding_wins_over_compression_default() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    let mut config = daily().with_compression(true);
    config.encoding.insert(
        "displacement".to_string(),
        VariableEncoding {
            zlib: Some(true),
            complevel: Some(7),
            shuffle: Some(false),
            ..Default::default()
        },
    );
    config
        .options
        .insert("format".to_string(), serde_json::json!("NETCDF4"));

    writer
        .write(&hourly_dataset(30), &dir.path().join("first.nc"), &config)
        .unwrap();

    // every window sees the same merged map
    for call in 0..encoder.call_count() {
        let enc = encoder.encoding(call);
        assert_eq!(enc["displacement"].complevel, Some(7));
        assert_eq!(enc["displacement"].shuffle, Some(false));
        for other in ["time", "dir", "t_elapsed"] {
            assert_eq!(enc[other], VariableEncoding::compressed(1), "{}", other);
        }
        assert_eq!(
            encoder.calls.lock().unwrap()[call].options["format"],
            "NETCDF4"
        );
    }
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_non_positive_interval_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    for interval in [0, -1] {
        let err = writer
            .write(
                &hourly_dataset(30),
                &dir.path().join("first.nc"),
                &WriterConfig::new(interval, TimeUnit::Day),
            )
            .unwrap_err();
        assert!(err.is_config_error(), "{:?}", err);
    }
    assert_eq!(encoder.call_count(), 0);
}

#[test]
fn test_window_past_timestamp_range_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    // about 150,000 years: valid on its own, but two windows overrun chrono's range
    let config = WriterConfig::new(7_826_000, TimeUnit::Week);
    assert!(config.validate().is_ok());

    let err = writer
        .write(&hourly_dataset(3), &dir.path().join("first.nc"), &config)
        .unwrap_err();
    assert!(err.is_config_error(), "{:?}", err);
    assert_eq!(encoder.call_count(), 0);
    assert!(!dir.path().join("first.nc").exists());
}

#[test]
fn test_unordered_time_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    let dataset = wave_dataset(vec![hours(0), hours(2), hours(1)]);
    let err = writer
        .write(&dataset, &dir.path().join("first.nc"), &daily())
        .unwrap_err();
    assert!(err.is_data_error(), "{:?}", err);
    assert_eq!(encoder.call_count(), 0);
}

#[test]
fn test_missing_time_is_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    let err = writer
        .write(&Dataset::new(), &dir.path().join("first.nc"), &daily())
        .unwrap_err();
    assert!(matches!(err, IngestionError::MissingCoordinate(_)));
}

#[test]
fn test_beam_gap_inside_window_is_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    // the fifth beam only reports during the first day
    let beam_times: Vec<_> = (0..24).map(|h| hours(h) + Duration::minutes(30)).collect();
    let dataset = with_beam5(hourly_dataset(48), beam_times);

    let err = writer
        .write(&dataset, &dir.path().join("first.nc"), &daily())
        .unwrap_err();

    match err {
        IngestionError::BeamGap { window } => {
            assert_eq!(window, TimeWindow::new(hours(24), hours(48)));
        }
        other => panic!("expected a beam gap, got {:?}", other),
    }
    // only the first window made it out
    assert_eq!(encoder.call_count(), 1);
    assert!(storage.names().is_empty());
}

#[test]
fn test_beam_coordinate_is_sliced_with_time() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    // two beam samples per hour, offset from the main clock
    let beam_times: Vec<_> = (0..96).map(|i| t0() + Duration::minutes(15 + 30 * i)).collect();
    let dataset = with_beam5(hourly_dataset(48), beam_times);

    writer
        .write(&dataset, &dir.path().join("first.nc"), &daily())
        .unwrap();

    let calls = encoder.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    for call in calls.iter() {
        assert_eq!(call.dataset.dim_len("time"), Some(24));
        assert_eq!(call.dataset.dim_len("time_b5"), Some(48));
    }
}

#[test]
fn test_serialization_error_names_window_and_variable() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::failing_at(1);
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    let err = writer
        .write(&hourly_dataset(61), &dir.path().join("first.nc"), &daily())
        .unwrap_err();

    match &err {
        IngestionError::Serialization {
            window, variable, ..
        } => {
            assert_eq!(*window, TimeWindow::new(hours(24), hours(48)));
            assert_eq!(variable.as_deref(), Some("displacement"));
        }
        other => panic!("expected a serialization error, got {:?}", other),
    }
    assert!(err.to_string().contains("displacement"));
    // the loop stops at the failing window
    assert!(storage.names().is_empty());
}

#[test]
fn test_storage_failure_propagates_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::failing();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    let err = writer
        .write(&hourly_dataset(61), &dir.path().join("first.nc"), &daily())
        .unwrap_err();

    match &err {
        IngestionError::StorageHandoff { window, source } => {
            assert_eq!(*window, TimeWindow::new(hours(24), hours(48)));
            assert!(matches!(source, OceanError::StorageError(_)));
        }
        other => panic!("expected a storage error, got {:?}", other),
    }

    // exactly one hand-off was attempted, and its scratch file is gone
    let handed = storage.local_paths();
    assert_eq!(handed.len(), 1);
    assert!(!handed[0].exists());
    assert!(!handed[0].parent().unwrap().exists());
}

#[test]
fn test_scratch_files_are_removed_after_handoff() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = RecordingEncoder::default();
    let storage = RecordingStorage::default();
    let writer = ChunkedDatasetWriter::new(&encoder, &storage);

    writer
        .write(&hourly_dataset(61), &dir.path().join("first.nc"), &daily())
        .unwrap();

    for path in storage.local_paths() {
        assert!(!path.exists(), "{} was left behind", path.display());
    }
}
