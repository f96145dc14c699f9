//! Ingester configuration.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use ingestion::{datastream_name, IngestSpec, WriterConfig};
use ocean_common::AttrValue;

/// Top-level ingester configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngesterConfig {
    pub storage: StorageConfig,

    /// Pipelines, tried in order; the first whose pattern matches a file wins
    pub pipelines: Vec<PipelineConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per datastream
    pub root: PathBuf,
}

/// Parts of a datastream name, e.g. `clallam` + `wave` + `a1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastreamConfig {
    pub location_id: String,
    pub dataset_name: String,
    #[serde(default)]
    pub qualifier: Option<String>,
    pub data_level: String,
}

/// One input-to-datastream mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,

    /// Regex matched against the full input path
    pub pattern: String,

    pub datastream: DatastreamConfig,

    /// Global attributes stamped on every output file
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,

    #[serde(default)]
    pub writer: WriterConfig,
}

impl IngesterConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::config_loader::load_ingester_config(path)
    }

    /// Check everything that can be checked before touching any input.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.storage.root.as_os_str().is_empty(),
            "storage.root cannot be empty"
        );
        anyhow::ensure!(!self.pipelines.is_empty(), "No pipelines configured");

        let mut names = HashSet::new();
        for pipeline in &self.pipelines {
            anyhow::ensure!(!pipeline.name.is_empty(), "Pipeline name cannot be empty");
            anyhow::ensure!(
                names.insert(pipeline.name.as_str()),
                "Duplicate pipeline name '{}'",
                pipeline.name
            );
            pipeline.compile_pattern()?;
            pipeline
                .writer
                .validate()
                .with_context(|| format!("Pipeline '{}'", pipeline.name))?;

            let ds = &pipeline.datastream;
            anyhow::ensure!(
                !ds.location_id.is_empty() && !ds.dataset_name.is_empty() && !ds.data_level.is_empty(),
                "Pipeline '{}': datastream parts cannot be empty",
                pipeline.name
            );
            anyhow::ensure!(
                [&ds.location_id, &ds.dataset_name, &ds.data_level]
                    .iter()
                    .all(|p| !p.contains('.')),
                "Pipeline '{}': datastream parts cannot contain '.'",
                pipeline.name
            );
        }
        Ok(())
    }
}

impl PipelineConfig {
    pub fn compile_pattern(&self) -> Result<Regex> {
        Regex::new(&self.pattern)
            .with_context(|| format!("Pipeline '{}': invalid pattern", self.name))
    }

    /// Full datastream name, e.g. `clallam.wave.a1`.
    pub fn datastream_name(&self) -> String {
        let ds = &self.datastream;
        datastream_name(
            &ds.location_id,
            &ds.dataset_name,
            ds.qualifier.as_deref(),
            &ds.data_level,
        )
    }

    pub fn ingest_spec(&self) -> IngestSpec {
        IngestSpec {
            datastream: self.datastream_name(),
            attrs: self.attrs.clone(),
            writer: self.writer.clone(),
        }
    }
}
