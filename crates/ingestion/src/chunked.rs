//! Time-chunked dataset writer.
//!
//! Splits one time-indexed dataset into consecutive half-open windows
//! `[t1, t1 + span)` and writes one self-contained file per window. The first
//! window goes to the path the caller asked for; every later window is named
//! from its own content, written to a scratch directory and handed to a
//! [`Storage`] for permanent placement.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use ocean_common::{Dataset, DatasetEncoder, EncodingMap, TimeWindow, VariableEncoding};
use storage::Storage;

use crate::config::{WriterConfig, DEFAULT_COMPRESSION_LEVEL};
use crate::error::{IngestionError, Result};
use crate::filename::derive_filename;

/// Primary time coordinate; defines the chunking axis.
pub const TIME: &str = "time";

/// Secondary time coordinate of the fifth beam, sliced in lock-step with `time`.
pub const TIME_B5: &str = "time_b5";

/// One window written by [`ChunkedDatasetWriter::write`].
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenWindow {
    pub window: TimeWindow,
    /// Number of `time` samples in the window
    pub samples: usize,
    /// File name of the artifact
    pub filename: String,
    /// Where the artifact ended up
    pub path: PathBuf,
}

/// Outcome of a chunked write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSummary {
    /// Windows in write order; the first is the caller's file
    pub windows: Vec<WrittenWindow>,
    /// Interior windows with no samples
    pub skipped: usize,
}

impl WriteSummary {
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Names derived for windows after the first.
    pub fn derived_filenames(&self) -> Vec<&str> {
        self.windows
            .iter()
            .skip(1)
            .map(|w| w.filename.as_str())
            .collect()
    }

    /// Time span covered from the first to the last written window.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.windows.first()?;
        let last = self.windows.last()?;
        Some((first.window.start, last.window.end))
    }
}

/// Writes a dataset as a series of time-windowed files.
pub struct ChunkedDatasetWriter<E, S> {
    encoder: E,
    storage: S,
}

impl<E: DatasetEncoder, S: Storage> ChunkedDatasetWriter<E, S> {
    pub fn new(encoder: E, storage: S) -> Self {
        Self { encoder, storage }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Write `dataset` split into windows of `config.time_interval`
    /// `config.time_unit`s.
    ///
    /// The window starting at the first timestamp is written to `filename`.
    /// Each later window is written under a name derived from its content and
    /// handed to storage. Windows without any `time` sample are skipped.
    ///
    /// Any failure aborts the remaining windows; windows already written stay
    /// in place.
    #[instrument(skip(self, dataset, filename, config), fields(filename = %filename.display()))]
    pub fn write(
        &self,
        dataset: &Dataset,
        filename: &Path,
        config: &WriterConfig,
    ) -> Result<WriteSummary> {
        let span = config.window_span()?;
        check_time_coordinates(dataset)?;

        let times = dataset.time_values(TIME)?;
        let (first, last) = match (times.first(), times.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(IngestionError::InvalidData(
                    "coordinate 'time' is empty".to_string(),
                ))
            }
        };

        let encoding = effective_encoding(dataset, config);
        let mut summary = WriteSummary::default();

        // the window after window 0 must be representable before anything is written
        let mut window = TimeWindow::starting_at(first, span)?;
        let upcoming = window.next()?;
        let selected = select_window(dataset, &window)?;
        self.encoder
            .encode(&selected, filename, &encoding, &config.options)
            .map_err(|e| IngestionError::serialization(window, e))?;

        let first_name = filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let samples = selected.dim_len(TIME).unwrap_or(0);
        debug!(window = %window, samples, "Wrote first window");
        summary.windows.push(WrittenWindow {
            window,
            samples,
            filename: first_name.clone(),
            path: filename.to_path_buf(),
        });

        let mut seen = HashSet::new();
        window = upcoming;
        while window.start <= last {
            let selected = select_window(dataset, &window)?;
            let samples = selected.dim_len(TIME).unwrap_or(0);
            if samples == 0 {
                debug!(window = %window, "Skipping window without samples");
                summary.skipped += 1;
                window = window.next()?;
                continue;
            }

            let name = derive_filename(&selected, self.encoder.extension())?;
            if name == first_name || !seen.insert(name.clone()) {
                return Err(IngestionError::NameCollision(name));
            }

            let path = self.write_derived(&selected, &window, &name, &encoding, config)?;
            debug!(window = %window, samples, filename = %name, "Wrote window");
            summary.windows.push(WrittenWindow {
                window,
                samples,
                filename: name,
                path,
            });

            window = window.next()?;
        }

        info!(
            windows = summary.window_count(),
            skipped = summary.skipped,
            start = %first,
            end = %last,
            "Chunked write complete"
        );
        Ok(summary)
    }

    /// Encode one derived window into a scratch directory and hand it off.
    /// The scratch directory is removed on return, whatever the outcome.
    fn write_derived(
        &self,
        dataset: &Dataset,
        window: &TimeWindow,
        name: &str,
        encoding: &EncodingMap,
        config: &WriterConfig,
    ) -> Result<PathBuf> {
        let scratch = tempfile::Builder::new().prefix("chunk-").tempdir()?;
        let local = scratch.path().join(name);

        self.encoder
            .encode(dataset, &local, encoding, &config.options)
            .map_err(|e| IngestionError::serialization(*window, e))?;

        self.storage
            .save_local_path(&local, name)
            .map_err(|source| IngestionError::StorageHandoff {
                window: *window,
                source,
            })
    }
}

/// `time` must be present, non-empty and strictly increasing; `time_b5`, when
/// present, must be strictly increasing.
fn check_time_coordinates(dataset: &Dataset) -> Result<()> {
    if dataset.time_values(TIME)?.is_empty() {
        return Err(IngestionError::InvalidData(
            "coordinate 'time' is empty".to_string(),
        ));
    }
    dataset.check_monotonic(TIME)?;

    if dataset.has_coord(TIME_B5) {
        dataset.check_monotonic(TIME_B5)?;
    }
    Ok(())
}

/// Narrow `dataset` to `window` on `time` and, independently, on `time_b5`.
fn select_window(dataset: &Dataset, window: &TimeWindow) -> Result<Dataset> {
    let mut selected = dataset.select_time_range(TIME, window.start, window.end)?;

    if dataset.has_coord(TIME_B5) {
        let samples = selected.dim_len(TIME).unwrap_or(0);
        selected = selected.select_time_range(TIME_B5, window.start, window.end)?;
        if samples > 0 && selected.dim_len(TIME_B5).unwrap_or(0) == 0 {
            return Err(IngestionError::BeamGap { window: *window });
        }
    }

    Ok(selected)
}

/// Codec options for every variable of `dataset`.
///
/// With `compression` set, every variable starts from the default deflate
/// entry; caller entries then replace the default for their variable. The
/// result is laid over each variable's own encoding, and fill values are
/// dropped from text variables, which cannot carry one.
pub fn effective_encoding(dataset: &Dataset, config: &WriterConfig) -> EncodingMap {
    let mut merged = EncodingMap::new();
    if config.compression {
        for (name, _) in dataset.variables() {
            merged.insert(
                name.clone(),
                VariableEncoding::compressed(DEFAULT_COMPRESSION_LEVEL),
            );
        }
    }
    for (name, enc) in &config.encoding {
        if dataset.variable(name).is_none() {
            warn!(variable = %name, "Encoding given for a variable not in the dataset");
            continue;
        }
        merged.insert(name.clone(), enc.clone());
    }

    let mut effective = EncodingMap::new();
    for (name, var) in dataset.variables() {
        let mut enc = match merged.get(name) {
            Some(entry) => var.encoding.overlay(entry),
            None => var.encoding.clone(),
        };
        if var.values.is_text() && enc.fill_value.take().is_some() {
            debug!(variable = %name, "Dropping _FillValue from string variable");
        }
        effective.insert(name.clone(), enc);
    }
    effective
}
