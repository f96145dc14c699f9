//! Main Ingester struct for instrument data ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

use ocean_common::{AttrValue, Dataset, DatasetEncoder, TimeWindow};
use storage::Storage;

use crate::chunked::ChunkedDatasetWriter;
use crate::config::WriterConfig;
use crate::error::{IngestionError, Result};
use crate::filename::{derive_filename, DATASTREAM_ATTR};
use crate::metadata::{detect_file_type, FileType};
use crate::spotter;

/// Attributes whose key contains this fragment are dropped before writing.
const CONFIG_ATTR_FRAGMENT: &str = "config";

/// What to produce from the files of one pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestSpec {
    /// Datastream the output belongs to, e.g. `clallam.wave.a1`
    pub datastream: String,
    /// Global attributes stamped onto every output file
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,
    #[serde(default)]
    pub writer: WriterConfig,
}

/// Result of an ingestion operation.
#[derive(Debug, Clone)]
pub struct IngestionResult {
    pub datastream: String,
    pub file_type: FileType,
    /// First timestamp of the data
    pub start: DateTime<Utc>,
    /// Last timestamp of the data
    pub end: DateTime<Utc>,
    /// Number of files written
    pub windows: usize,
    /// Stored locations, in time order
    pub stored: Vec<PathBuf>,
}

/// Core ingester for instrument data.
///
/// Reads a raw file, stamps the datastream metadata and hands the dataset
/// to a [`ChunkedDatasetWriter`]. Every file, including the first window,
/// ends up in storage.
pub struct Ingester<E, S> {
    writer: ChunkedDatasetWriter<E, S>,
    spec: IngestSpec,
}

impl<E: DatasetEncoder, S: Storage> Ingester<E, S> {
    /// Create a new Ingester.
    pub fn new(encoder: E, storage: S, spec: IngestSpec) -> Self {
        Self {
            writer: ChunkedDatasetWriter::new(encoder, storage),
            spec,
        }
    }

    pub fn spec(&self) -> &IngestSpec {
        &self.spec
    }

    /// Read a raw instrument file into a dataset.
    pub fn read(&self, path: &Path) -> Result<(FileType, Dataset)> {
        let file_type = detect_file_type(path);
        let dataset = match file_type {
            FileType::SpotterFlt => spotter::read_flt(path)?,
            FileType::SpotterLoc => spotter::read_loc(path)?,
            FileType::NetCdf | FileType::Unknown => {
                return Err(IngestionError::UnknownFileType(format!(
                    "no reader for {} ({:?})",
                    path.display(),
                    file_type
                )))
            }
        };
        Ok((file_type, dataset))
    }

    /// Ingest a file from the filesystem.
    ///
    /// Auto-detects file type from the file name and routes to the matching reader.
    #[instrument(skip(self), fields(datastream = %self.spec.datastream))]
    pub fn ingest_file(&self, path: &Path) -> Result<IngestionResult> {
        let (file_type, dataset) = self.read(path)?;
        let mut result = self.ingest_dataset(dataset)?;
        result.file_type = file_type;
        Ok(result)
    }

    /// Write an already assembled dataset.
    pub fn ingest_dataset(&self, mut dataset: Dataset) -> Result<IngestionResult> {
        self.prepare(&mut dataset);

        let first_name = derive_filename(&dataset, self.writer.encoder().extension())?;
        let scratch = tempfile::Builder::new().prefix("ingest-").tempdir()?;
        let local = scratch.path().join(&first_name);

        let summary = match self.writer.write(&dataset, &local, &self.spec.writer) {
            Ok(summary) => summary,
            Err(e) => {
                // later windows already handed off stay in storage; window 0 joins them
                if local.is_file() {
                    match self.store_first(&dataset, &local, &first_name) {
                        Ok(path) => warn!(
                            stored = %path.display(),
                            error = %e,
                            "Stored first window of a partially written dataset"
                        ),
                        Err(handoff) => error!(error = %handoff, "Could not store first window"),
                    }
                }
                return Err(e);
            }
        };

        // the writer leaves the first window where it was asked to; placing it is ours
        let first_stored = self.store_first(&dataset, &local, &first_name)?;

        let mut stored = vec![first_stored];
        stored.extend(summary.windows.iter().skip(1).map(|w| w.path.clone()));

        let times = dataset.time_values("time")?;
        let (start, end) = match (times.first(), times.last()) {
            (Some(s), Some(e)) => (*s, *e),
            _ => return Err(IngestionError::InvalidData("coordinate 'time' is empty".to_string())),
        };

        info!(
            windows = summary.window_count(),
            start = %start,
            end = %end,
            "Ingested dataset"
        );

        Ok(IngestionResult {
            datastream: self.spec.datastream.clone(),
            file_type: FileType::Unknown,
            start,
            end,
            windows: summary.window_count(),
            stored,
        })
    }

    /// Hand the locally written first window to storage.
    fn store_first(&self, dataset: &Dataset, local: &Path, name: &str) -> Result<PathBuf> {
        let first = dataset
            .time_values("time")?
            .first()
            .copied()
            .ok_or_else(|| IngestionError::InvalidData("coordinate 'time' is empty".to_string()))?;
        let window = TimeWindow::starting_at(first, self.spec.writer.window_span()?)?;

        self.writer
            .storage()
            .save_local_path(local, name)
            .map_err(|source| IngestionError::StorageHandoff { window, source })
    }

    /// Drop reader configuration attributes, then stamp the pipeline's own.
    fn prepare(&self, dataset: &mut Dataset) {
        let removed = dataset.remove_attrs_containing(CONFIG_ATTR_FRAGMENT);
        if !removed.is_empty() {
            debug!(?removed, "Dropped configuration attributes");
        }

        for (key, value) in &self.spec.attrs {
            dataset.attrs.insert(key.clone(), value.clone());
        }
        dataset.attrs.insert(
            DATASTREAM_ATTR.to_string(),
            AttrValue::from(self.spec.datastream.as_str()),
        );
    }
}
