//! Storage codec directives and the serialization seam.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::dataset::Dataset;
use crate::error::OceanResult;

/// Fill value requested for a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

/// Codec options for a single variable.
///
/// Fields left as `None` defer to whatever the encoder does by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableEncoding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zlib: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complevel: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle: Option<bool>,

    #[serde(
        default,
        rename = "_FillValue",
        alias = "fill_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub fill_value: Option<FillValue>,

    /// Codec keys this crate does not interpret, forwarded to the encoder.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl VariableEncoding {
    /// Lossless deflate at `level`.
    pub fn compressed(level: u8) -> Self {
        Self {
            zlib: Some(true),
            complevel: Some(level),
            ..Self::default()
        }
    }

    /// Copy of `self` with every field set in `other` taking precedence.
    pub fn overlay(&self, other: &VariableEncoding) -> VariableEncoding {
        let mut extra = self.extra.clone();
        extra.extend(other.extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        VariableEncoding {
            zlib: other.zlib.or(self.zlib),
            complevel: other.complevel.or(self.complevel),
            shuffle: other.shuffle.or(self.shuffle),
            fill_value: other.fill_value.clone().or_else(|| self.fill_value.clone()),
            extra,
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &VariableEncoding::default()
    }
}

/// Per-variable codec options keyed by variable name.
pub type EncodingMap = BTreeMap<String, VariableEncoding>;

/// Options forwarded verbatim to the serialization call.
pub type WriteOptions = BTreeMap<String, serde_json::Value>;

/// Serializes a dataset into one self-contained file.
pub trait DatasetEncoder {
    /// File extension (without the dot) of the files this encoder produces.
    fn extension(&self) -> &str;

    /// Write `dataset` to `path`.
    ///
    /// `encoding` holds the final per-variable codec options; variables absent
    /// from it are written with the encoder's defaults. Failures specific to one
    /// variable should be reported as [`crate::OceanError::EncodeVariable`].
    fn encode(
        &self,
        dataset: &Dataset,
        path: &Path,
        encoding: &EncodingMap,
        options: &WriteOptions,
    ) -> OceanResult<()>;
}

impl<T: DatasetEncoder + ?Sized> DatasetEncoder for &T {
    fn extension(&self) -> &str {
        (**self).extension()
    }

    fn encode(
        &self,
        dataset: &Dataset,
        path: &Path,
        encoding: &EncodingMap,
        options: &WriteOptions,
    ) -> OceanResult<()> {
        (**self).encode(dataset, path, encoding, options)
    }
}

impl<T: DatasetEncoder + ?Sized> DatasetEncoder for Box<T> {
    fn extension(&self) -> &str {
        (**self).extension()
    }

    fn encode(
        &self,
        dataset: &Dataset,
        path: &Path,
        encoding: &EncodingMap,
        options: &WriteOptions,
    ) -> OceanResult<()> {
        (**self).encode(dataset, path, encoding, options)
    }
}
