//! Writer configuration.
//!
//! Controls how a dataset is split into time windows and how each window is
//! encoded. Every key not listed here is kept as a passthrough option and
//! handed verbatim to the encoder.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

use ocean_common::{EncodingMap, TimeUnit, WriteOptions};

use crate::error::{IngestionError, Result};

/// Deflate level applied to every variable when `compression` is enabled.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 1;

fn default_time_interval() -> i64 {
    1
}

/// Configuration for [`crate::ChunkedDatasetWriter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Window length, in `time_unit`s
    #[serde(default = "default_time_interval")]
    pub time_interval: i64,

    #[serde(default)]
    pub time_unit: TimeUnit,

    /// Compress every variable with lossless deflate
    #[serde(default)]
    pub compression: bool,

    /// Per-variable codec overrides
    #[serde(default)]
    pub encoding: EncodingMap,

    /// Options forwarded to the encoder
    #[serde(flatten)]
    pub options: WriteOptions,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            time_interval: default_time_interval(),
            time_unit: TimeUnit::default(),
            compression: false,
            encoding: EncodingMap::new(),
            options: WriteOptions::new(),
        }
    }
}

impl WriterConfig {
    pub fn new(time_interval: i64, time_unit: TimeUnit) -> Self {
        Self {
            time_interval,
            time_unit,
            ..Self::default()
        }
    }

    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: WriterConfig = serde_yaml::from_str(yaml)
            .map_err(|e| IngestionError::InvalidConfig(format!("writer config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text).map_err(|e| match e {
            IngestionError::InvalidConfig(msg) => {
                IngestionError::InvalidConfig(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Reject configurations that cannot produce windows.
    pub fn validate(&self) -> Result<()> {
        self.window_span().map(|_| ())
    }

    /// Length of one window.
    pub fn window_span(&self) -> Result<Duration> {
        Ok(self.time_unit.span(self.time_interval)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocean_common::FillValue;

    #[test]
    fn test_defaults() {
        let config = WriterConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, WriterConfig::default());
        assert_eq!(config.window_span().unwrap(), Duration::days(1));
        assert!(!config.compression);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
time_interval: 6
time_unit: H
compression: true
format: NETCDF4_CLASSIC
encoding:
  displacement:
    complevel: 4
  dir:
    _FillValue: ""
"#;
        let config = WriterConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.time_unit, TimeUnit::Hour);
        assert_eq!(config.window_span().unwrap(), Duration::hours(6));
        assert!(config.compression);
        assert_eq!(config.encoding["displacement"].complevel, Some(4));
        assert_eq!(
            config.encoding["dir"].fill_value,
            Some(FillValue::Text(String::new()))
        );
        assert_eq!(config.options["format"], "NETCDF4_CLASSIC");
        assert!(!config.options.contains_key("time_unit"));
    }

    #[test]
    fn test_non_positive_interval_is_rejected() {
        for yaml in ["time_interval: 0", "time_interval: -2"] {
            let err = WriterConfig::from_yaml_str(yaml).unwrap_err();
            assert!(err.is_config_error(), "{}: {:?}", yaml, err);
        }
    }

    #[test]
    fn test_unknown_unit_is_rejected() {
        let err = WriterConfig::from_yaml_str("time_unit: fortnight").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_validate_programmatic_config() {
        assert!(WriterConfig::new(0, TimeUnit::Day).validate().is_err());
        assert!(WriterConfig::new(30, TimeUnit::Minute).validate().is_ok());
    }
}
