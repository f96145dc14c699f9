//! Ingestion pipeline for processing raw instrument files.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use walkdir::WalkDir;

use ingestion::{Ingester, IngestionResult};
use netcdf_writer::NetCdfEncoder;
use ocean_common::TimeWindow;
use storage::FilesystemStorage;

use crate::config::IngesterConfig;

/// A configured pipeline ready to run.
struct Route {
    name: String,
    pattern: Regex,
    ingester: Ingester<NetCdfEncoder, Arc<FilesystemStorage>>,
}

/// An input that could not be ingested.
#[derive(Debug)]
pub struct FailedInput {
    pub path: PathBuf,
    /// Window being written when the failure happened, if any
    pub window: Option<TimeWindow>,
    pub message: String,
}

/// Outcome of one run over a set of input files.
#[derive(Debug, Default)]
pub struct RunReport {
    pub ingested: Vec<(PathBuf, IngestionResult)>,
    /// Inputs no pipeline matched
    pub unmatched: Vec<PathBuf>,
    pub failed: Vec<FailedInput>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn files_written(&self) -> usize {
        self.ingested.iter().map(|(_, r)| r.stored.len()).sum()
    }
}

/// Main ingestion pipeline.
pub struct IngestionPipeline {
    routes: Vec<Route>,
    storage: Arc<FilesystemStorage>,
}

impl IngestionPipeline {
    /// Create a new ingestion pipeline.
    pub fn new(config: &IngesterConfig) -> Result<Self> {
        let storage = Arc::new(
            FilesystemStorage::new(&config.storage.root).with_context(|| {
                format!("Failed to open storage at {}", config.storage.root.display())
            })?,
        );

        let routes = config
            .pipelines
            .iter()
            .map(|p| {
                Ok(Route {
                    name: p.name.clone(),
                    pattern: p.compile_pattern()?,
                    ingester: Ingester::new(NetCdfEncoder::new(), Arc::clone(&storage), p.ingest_spec()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { routes, storage })
    }

    pub fn storage(&self) -> &FilesystemStorage {
        &self.storage
    }

    /// Name of the first pipeline whose pattern matches `path`.
    pub fn pipeline_for(&self, path: &Path) -> Option<&str> {
        self.route_for(path).map(|r| r.name.as_str())
    }

    fn route_for(&self, path: &Path) -> Option<&Route> {
        let text = path.to_string_lossy();
        self.routes.iter().find(|r| r.pattern.is_match(&text))
    }

    /// Ingest every input, continuing past failures.
    pub fn run(&self, inputs: &[PathBuf]) -> RunReport {
        let mut report = RunReport::default();

        for path in inputs {
            let route = match self.route_for(path) {
                Some(route) => route,
                None => {
                    warn!(file = %path.display(), "No pipeline matches file, skipping");
                    report.unmatched.push(path.clone());
                    continue;
                }
            };

            match self.ingest_one(route, path) {
                Ok(result) => report.ingested.push((path.clone(), result)),
                Err(e) => {
                    let window = e.window().copied();
                    error!(
                        file = %path.display(),
                        pipeline = %route.name,
                        window = window.map(tracing::field::display),
                        error = %e,
                        "Ingestion failed"
                    );
                    report.failed.push(FailedInput {
                        path: path.clone(),
                        window,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            ingested = report.ingested.len(),
            unmatched = report.unmatched.len(),
            failed = report.failed.len(),
            files_written = report.files_written(),
            "Run complete"
        );
        report
    }

    #[instrument(skip(self, route), fields(pipeline = %route.name))]
    fn ingest_one(&self, route: &Route, path: &Path) -> ingestion::Result<IngestionResult> {
        let result = route.ingester.ingest_file(path)?;
        info!(
            datastream = %result.datastream,
            windows = result.windows,
            start = %result.start,
            end = %result.end,
            "Ingested file"
        );
        Ok(result)
    }
}

/// Explicit input files plus every file found under `input_dir`, in path order.
pub fn collect_inputs(files: &[PathBuf], input_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut inputs: Vec<PathBuf> = files.to_vec();

    if let Some(dir) = input_dir {
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
            if entry.file_type().is_file() {
                inputs.push(entry.into_path());
            }
        }
    }

    inputs.sort();
    inputs.dedup();
    Ok(inputs)
}
