//! In-memory labeled dataset model.
//!
//! A [`Dataset`] is a set of named n-dimensional [`Variable`]s that share
//! dimensions. One-dimensional variables indexed by their own dimension are
//! coordinates; everything else is a data variable. Every variable that
//! carries a given dimension agrees on its length.

use chrono::{DateTime, Utc};
use ndarray::{Array1, ArrayD, Axis, Slice};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

use crate::encoding::VariableEncoding;
use crate::error::{OceanError, OceanResult};

/// Attribute value attached to a dataset or a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

/// Typed array storage for a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Float64(ArrayD<f64>),
    Float32(ArrayD<f32>),
    Int64(ArrayD<i64>),
    Int32(ArrayD<i32>),
    /// Variable-length strings.
    Text(ArrayD<String>),
    Time(ArrayD<DateTime<Utc>>),
}

macro_rules! each_values {
    ($values:expr, $arr:ident => $body:expr) => {
        match $values {
            Values::Float64($arr) => $body,
            Values::Float32($arr) => $body,
            Values::Int64($arr) => $body,
            Values::Int32($arr) => $body,
            Values::Text($arr) => $body,
            Values::Time($arr) => $body,
        }
    };
}

macro_rules! map_values {
    ($values:expr, $arr:ident => $body:expr) => {
        match $values {
            Values::Float64($arr) => Values::Float64($body),
            Values::Float32($arr) => Values::Float32($body),
            Values::Int64($arr) => Values::Int64($body),
            Values::Int32($arr) => Values::Int32($body),
            Values::Text($arr) => Values::Text($body),
            Values::Time($arr) => Values::Time($body),
        }
    };
}

impl Values {
    pub fn shape(&self) -> &[usize] {
        each_values!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        each_values!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type name, as used in log and error messages.
    pub fn dtype(&self) -> &'static str {
        match self {
            Values::Float64(_) => "float64",
            Values::Float32(_) => "float32",
            Values::Int64(_) => "int64",
            Values::Int32(_) => "int32",
            Values::Text(_) => "str",
            Values::Time(_) => "datetime64",
        }
    }

    /// True for variable-length element types, which cannot carry a fill value.
    pub fn is_text(&self) -> bool {
        matches!(self, Values::Text(_))
    }

    /// Copy of the elements in `range` along `axis`.
    pub fn slice_axis(&self, axis: usize, range: Range<usize>) -> Values {
        map_values!(self, a => a.slice_axis(Axis(axis), Slice::from(range.clone())).to_owned())
    }
}

impl From<Vec<f64>> for Values {
    fn from(v: Vec<f64>) -> Self {
        Values::Float64(Array1::from(v).into_dyn())
    }
}

impl From<Vec<f32>> for Values {
    fn from(v: Vec<f32>) -> Self {
        Values::Float32(Array1::from(v).into_dyn())
    }
}

impl From<Vec<i64>> for Values {
    fn from(v: Vec<i64>) -> Self {
        Values::Int64(Array1::from(v).into_dyn())
    }
}

impl From<Vec<i32>> for Values {
    fn from(v: Vec<i32>) -> Self {
        Values::Int32(Array1::from(v).into_dyn())
    }
}

impl From<Vec<String>> for Values {
    fn from(v: Vec<String>) -> Self {
        Values::Text(Array1::from(v).into_dyn())
    }
}

impl From<Vec<DateTime<Utc>>> for Values {
    fn from(v: Vec<DateTime<Utc>>) -> Self {
        Values::Time(Array1::from(v).into_dyn())
    }
}

/// A named array with dimension labels, attributes, and codec hints.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub values: Values,
    pub attrs: BTreeMap<String, AttrValue>,
    /// Codec hints set upstream, e.g. a `_FillValue` carried over from the raw file.
    pub encoding: VariableEncoding,
}

impl Variable {
    /// Create a variable, checking that one label is given per array axis.
    pub fn new<S: AsRef<str>>(dims: &[S], values: Values) -> OceanResult<Self> {
        if dims.len() != values.ndim() {
            return Err(OceanError::InvalidData(format!(
                "{} dimension labels given for a {}-dimensional array",
                dims.len(),
                values.ndim()
            )));
        }

        Ok(Self {
            dims: dims.iter().map(|d| d.as_ref().to_string()).collect(),
            values,
            attrs: BTreeMap::new(),
            encoding: VariableEncoding::default(),
        })
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn with_encoding(mut self, encoding: VariableEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Axis index of `dim`, if this variable carries it.
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.axis_of(dim).map(|axis| self.values.shape()[axis])
    }
}

/// A time-indexed collection of named arrays sharing dimensions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub attrs: BTreeMap<String, AttrValue>,
    coords: BTreeMap<String, Variable>,
    data_vars: BTreeMap<String, Variable>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Dataset::insert_coord`].
    pub fn with_coord(mut self, name: &str, variable: Variable) -> OceanResult<Self> {
        self.insert_coord(name, variable)?;
        Ok(self)
    }

    /// Builder-style [`Dataset::insert_var`].
    pub fn with_var(mut self, name: &str, variable: Variable) -> OceanResult<Self> {
        self.insert_var(name, variable)?;
        Ok(self)
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// Add a coordinate. Coordinates are one-dimensional and indexed by their own name.
    pub fn insert_coord(&mut self, name: &str, variable: Variable) -> OceanResult<()> {
        if variable.dims.len() != 1 || variable.dims[0] != name {
            return Err(OceanError::InvalidData(format!(
                "coordinate '{}' must be one-dimensional along '{}', got dims {:?}",
                name, name, variable.dims
            )));
        }
        self.check_dims(name, &variable)?;
        self.data_vars.remove(name);
        self.coords.insert(name.to_string(), variable);
        Ok(())
    }

    /// Add or replace a data variable.
    pub fn insert_var(&mut self, name: &str, variable: Variable) -> OceanResult<()> {
        if self.coords.contains_key(name) {
            return Err(OceanError::InvalidData(format!(
                "'{}' is already a coordinate",
                name
            )));
        }
        self.check_dims(name, &variable)?;
        self.data_vars.insert(name.to_string(), variable);
        Ok(())
    }

    fn check_dims(&self, name: &str, variable: &Variable) -> OceanResult<()> {
        for (axis, dim) in variable.dims.iter().enumerate() {
            let actual = variable.values.shape()[axis];
            let existing = self
                .variables()
                .filter(|(other, _)| other.as_str() != name)
                .find_map(|(_, v)| v.dim_len(dim));

            if let Some(expected) = existing {
                if expected != actual {
                    return Err(OceanError::ShapeMismatch {
                        dim: dim.clone(),
                        variable: name.to_string(),
                        expected,
                        actual,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn coord(&self, name: &str) -> Option<&Variable> {
        self.coords.get(name)
    }

    pub fn var(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name)
    }

    /// Look up a coordinate or data variable by name.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.coord(name).or_else(|| self.var(name))
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        match self.coords.get_mut(name) {
            Some(v) => Some(v),
            None => self.data_vars.get_mut(name),
        }
    }

    pub fn has_coord(&self, name: &str) -> bool {
        self.coords.contains_key(name)
    }

    pub fn coords(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.coords.iter()
    }

    pub fn data_vars(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.data_vars.iter()
    }

    /// Coordinates first, then data variables.
    pub fn variables(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.coords.iter().chain(self.data_vars.iter())
    }

    pub fn variables_mut(&mut self) -> impl Iterator<Item = (&String, &mut Variable)> {
        self.coords.iter_mut().chain(self.data_vars.iter_mut())
    }

    /// Length of every dimension used in the dataset.
    pub fn dims(&self) -> BTreeMap<String, usize> {
        let mut dims = BTreeMap::new();
        for (_, var) in self.variables() {
            for (axis, dim) in var.dims.iter().enumerate() {
                dims.entry(dim.clone()).or_insert(var.values.shape()[axis]);
            }
        }
        dims
    }

    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.variables().find_map(|(_, v)| v.dim_len(dim))
    }

    /// Timestamps of the time coordinate `coord`.
    pub fn time_values(&self, coord: &str) -> OceanResult<&[DateTime<Utc>]> {
        let variable = self
            .coord(coord)
            .ok_or_else(|| OceanError::MissingCoordinate(coord.to_string()))?;

        match &variable.values {
            Values::Time(times) => times.as_slice().ok_or_else(|| {
                OceanError::InvalidData(format!("coordinate '{}' is not contiguous", coord))
            }),
            other => Err(OceanError::InvalidData(format!(
                "coordinate '{}' has element type {}, expected datetime64",
                coord,
                other.dtype()
            ))),
        }
    }

    /// Fail unless the time coordinate `coord` is strictly increasing.
    pub fn check_monotonic(&self, coord: &str) -> OceanResult<()> {
        let times = self.time_values(coord)?;
        if let Some(i) = times.windows(2).position(|w| w[0] >= w[1]) {
            return Err(OceanError::InvalidData(format!(
                "coordinate '{}' is not strictly increasing at index {} ({} >= {})",
                coord,
                i + 1,
                times[i],
                times[i + 1]
            )));
        }
        Ok(())
    }

    /// Index range of samples of the sorted time coordinate `coord` in `[start, end)`.
    pub fn time_index_range(
        &self,
        coord: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OceanResult<Range<usize>> {
        let times = self.time_values(coord)?;
        let lo = times.partition_point(|t| *t < start);
        let hi = times.partition_point(|t| *t < end).max(lo);
        Ok(lo..hi)
    }

    /// Narrow every variable carrying dimension `coord` to the samples whose
    /// `coord` value falls in `[start, end)`.
    ///
    /// The coordinate must be sorted (see [`Dataset::check_monotonic`]).
    /// Variables without the dimension are copied unchanged.
    pub fn select_time_range(
        &self,
        coord: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OceanResult<Dataset> {
        let range = self.time_index_range(coord, start, end)?;
        Ok(self.slice_dim(coord, range))
    }

    /// Copy of the dataset narrowed to `range` along `dim`.
    pub fn slice_dim(&self, dim: &str, range: Range<usize>) -> Dataset {
        let slice = |var: &Variable| match var.axis_of(dim) {
            Some(axis) => Variable {
                dims: var.dims.clone(),
                values: var.values.slice_axis(axis, range.clone()),
                attrs: var.attrs.clone(),
                encoding: var.encoding.clone(),
            },
            None => var.clone(),
        };

        Dataset {
            attrs: self.attrs.clone(),
            coords: self.coords.iter().map(|(k, v)| (k.clone(), slice(v))).collect(),
            data_vars: self
                .data_vars
                .iter()
                .map(|(k, v)| (k.clone(), slice(v)))
                .collect(),
        }
    }

    /// Remove global attributes whose key contains `fragment`, returning the removed keys.
    pub fn remove_attrs_containing(&mut self, fragment: &str) -> Vec<String> {
        let removed: Vec<String> = self
            .attrs
            .keys()
            .filter(|k| k.contains(fragment))
            .cloned()
            .collect();
        for key in &removed {
            self.attrs.remove(key);
        }
        removed
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(AttrValue::as_str)
    }
}
