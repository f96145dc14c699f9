//! Native NetCDF writing using the netcdf library.
//!
//! Each call produces one self-describing NetCDF-4 file. The file is first
//! written next to its destination under a unique `.partial` name and only
//! renamed into place once every variable has been written, so a failed write
//! never leaves a truncated file at the requested path.

use ndarray::{ArrayD, Dimension};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;
use tracing::{debug, warn};

use ocean_common::{
    to_epoch_seconds, AttrValue, Dataset, EncodingMap, FillValue, Values, Variable,
    VariableEncoding, WriteOptions,
};

use crate::error::{NetCdfError, NetCdfResult};

/// Units written on every timestamp variable.
pub const TIME_UNITS: &str = "seconds since 1970-01-01 00:00:00 UTC";

/// Deflate level used when `zlib` is requested without a `complevel`.
const DEFAULT_COMPLEVEL: u8 = 4;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose diagnostics to stderr even when the
/// resulting error is handled by the Rust code. This disables that output by
/// calling H5Eset_auto2 with null handlers. It only needs to be called once per
/// process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// On-disk flavour of the NetCDF-4 container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetCdfFormat {
    #[default]
    Netcdf4,
    Netcdf4Classic,
}

impl NetCdfFormat {
    pub fn parse(s: &str) -> NetCdfResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NETCDF4" => Ok(NetCdfFormat::Netcdf4),
            "NETCDF4_CLASSIC" => Ok(NetCdfFormat::Netcdf4Classic),
            other => Err(NetCdfError::InvalidOption(format!(
                "unsupported NetCDF format '{}'",
                other
            ))),
        }
    }

    fn options(&self) -> netcdf::Options {
        match self {
            NetCdfFormat::Netcdf4 => netcdf::Options::NETCDF4,
            NetCdfFormat::Netcdf4Classic => netcdf::Options::NETCDF4 | netcdf::Options::CLASSIC,
        }
    }
}

/// Resolve the passthrough options this writer understands.
fn parse_options(options: &WriteOptions) -> NetCdfResult<NetCdfFormat> {
    let mut format = NetCdfFormat::default();
    for (key, value) in options {
        match key.as_str() {
            "format" => {
                let s = value.as_str().ok_or_else(|| {
                    NetCdfError::InvalidOption(format!("format must be a string, got {}", value))
                })?;
                format = NetCdfFormat::parse(s)?;
            }
            other => warn!(option = other, "Ignoring unsupported NetCDF write option"),
        }
    }
    Ok(format)
}

/// Write `dataset` to `path` as a NetCDF-4 file.
///
/// `encoding` entries take the place of a variable's own encoding; variables
/// without an entry use [`Variable::encoding`].
pub fn write_dataset(
    dataset: &Dataset,
    path: &Path,
    encoding: &EncodingMap,
    options: &WriteOptions,
) -> NetCdfResult<()> {
    // Silence HDF5's verbose stderr output before touching the library
    silence_hdf5_errors();

    let format = parse_options(options)?;
    let partial = partial_path(path);

    match write_to(dataset, &partial, encoding, format) {
        Ok(()) => {
            std::fs::rename(&partial, path)?;
            debug!(path = %path.display(), "Wrote NetCDF file");
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn write_to(
    dataset: &Dataset,
    path: &Path,
    encoding: &EncodingMap,
    format: NetCdfFormat,
) -> NetCdfResult<()> {
    let mut file = netcdf::create_with(path, format.options())?;

    for (key, value) in &dataset.attrs {
        put_global_attr(&mut file, key, value)?;
    }

    for (dim, len) in dataset.dims() {
        file.add_dimension(&dim, len)?;
    }

    for (name, variable) in dataset.variables() {
        let enc = encoding.get(name).unwrap_or(&variable.encoding);
        write_variable(&mut file, name, variable, enc)?;
    }

    Ok(())
}

macro_rules! write_numeric {
    ($file:expr, $name:expr, $variable:expr, $dims:expr, $arr:expr, $ty:ty, $enc:expr, $fill:expr) => {{
        let mut var = $file
            .add_variable::<$ty>($name, $dims)
            .map_err(|e| NetCdfError::variable($name, e))?;
        apply_compression(&mut var, $name, $enc)?;
        if let Some(fill) = $fill {
            var.set_fill_value::<$ty>(fill)
                .map_err(|e| NetCdfError::variable($name, e))?;
        }
        put_var_attrs(&mut var, $name, &$variable.attrs)?;
        let values: Vec<$ty> = $arr.iter().copied().collect();
        if !values.is_empty() {
            var.put_values(&values, ..)
                .map_err(|e| NetCdfError::variable($name, e))?;
        }
    }};
}

fn write_variable(
    file: &mut netcdf::FileMut,
    name: &str,
    variable: &Variable,
    enc: &VariableEncoding,
) -> NetCdfResult<()> {
    let dims: Vec<&str> = variable.dims.iter().map(String::as_str).collect();
    let dims = dims.as_slice();

    match &variable.values {
        Values::Float64(arr) => {
            let fill = numeric_fill(name, enc, |v| Some(v))?;
            write_numeric!(file, name, variable, dims, arr, f64, enc, fill);
        }
        Values::Float32(arr) => {
            let fill = numeric_fill(name, enc, |v| Some(v as f32))?;
            write_numeric!(file, name, variable, dims, arr, f32, enc, fill);
        }
        Values::Int64(arr) => {
            let fill = numeric_fill(name, enc, as_i64)?;
            write_numeric!(file, name, variable, dims, arr, i64, enc, fill);
        }
        Values::Int32(arr) => {
            let fill = numeric_fill(name, enc, as_i32)?;
            write_numeric!(file, name, variable, dims, arr, i32, enc, fill);
        }
        Values::Time(arr) => write_time(file, name, variable, dims, arr, enc)?,
        Values::Text(arr) => write_text(file, name, variable, dims, arr, enc)?,
    }

    debug!(
        variable = name,
        dtype = variable.values.dtype(),
        shape = ?variable.values.shape(),
        "Wrote variable"
    );
    Ok(())
}

fn write_time(
    file: &mut netcdf::FileMut,
    name: &str,
    variable: &Variable,
    dims: &[&str],
    arr: &ArrayD<chrono::DateTime<chrono::Utc>>,
    enc: &VariableEncoding,
) -> NetCdfResult<()> {
    let fill = numeric_fill(name, enc, Some)?;

    let mut var = file
        .add_variable::<f64>(name, dims)
        .map_err(|e| NetCdfError::variable(name, e))?;
    apply_compression(&mut var, name, enc)?;
    if let Some(fill) = fill {
        var.set_fill_value::<f64>(fill)
            .map_err(|e| NetCdfError::variable(name, e))?;
    }

    // stored values are epoch seconds regardless of what the source declared
    for (key, value) in &variable.attrs {
        if key == "units" || key == "calendar" {
            continue;
        }
        put_var_attr(&mut var, name, key, value)?;
    }
    var.put_attribute("units", TIME_UNITS)
        .map_err(|e| NetCdfError::variable(name, e))?;
    var.put_attribute("calendar", "standard")
        .map_err(|e| NetCdfError::variable(name, e))?;

    let values: Vec<f64> = arr.iter().map(|t| to_epoch_seconds(*t)).collect();
    if !values.is_empty() {
        var.put_values(&values, ..)
            .map_err(|e| NetCdfError::variable(name, e))?;
    }
    Ok(())
}

fn write_text(
    file: &mut netcdf::FileMut,
    name: &str,
    variable: &Variable,
    dims: &[&str],
    arr: &ArrayD<String>,
    enc: &VariableEncoding,
) -> NetCdfResult<()> {
    if enc.fill_value.is_some() {
        return Err(NetCdfError::variable(
            name,
            "fill values are not supported for variable-length strings",
        ));
    }
    if enc.zlib == Some(true) {
        debug!(variable = name, "Skipping compression for string variable");
    }

    let mut var = file
        .add_string_variable(name, dims)
        .map_err(|e| NetCdfError::variable(name, e))?;
    put_var_attrs(&mut var, name, &variable.attrs)?;

    for (index, value) in arr.indexed_iter() {
        var.put_string(value, index.slice())
            .map_err(|e| NetCdfError::variable(name, e))?;
    }
    Ok(())
}

fn apply_compression(
    var: &mut netcdf::VariableMut,
    name: &str,
    enc: &VariableEncoding,
) -> NetCdfResult<()> {
    if enc.zlib != Some(true) {
        return Ok(());
    }

    let level = enc.complevel.unwrap_or(DEFAULT_COMPLEVEL);
    if level > 9 {
        return Err(NetCdfError::variable(
            name,
            format!("complevel must be between 0 and 9, got {}", level),
        ));
    }

    var.set_compression(level as i32, enc.shuffle.unwrap_or(true))
        .map_err(|e| NetCdfError::variable(name, e))
}

/// Cast a requested fill value to the variable type, rejecting values that
/// cannot be represented.
fn numeric_fill<T>(
    name: &str,
    enc: &VariableEncoding,
    cast: impl Fn(f64) -> Option<T>,
) -> NetCdfResult<Option<T>> {
    match &enc.fill_value {
        None => Ok(None),
        Some(FillValue::Number(v)) => cast(*v).map(Some).ok_or_else(|| {
            NetCdfError::variable(name, format!("fill value {} does not fit the variable type", v))
        }),
        Some(FillValue::Text(s)) => Err(NetCdfError::variable(
            name,
            format!("text fill value '{}' on a numeric variable", s),
        )),
    }
}

fn integral(v: f64) -> Option<f64> {
    (v.is_finite() && v.fract() == 0.0).then_some(v)
}

fn as_i32(v: f64) -> Option<i32> {
    integral(v)
        .filter(|i| *i >= i32::MIN as f64 && *i <= i32::MAX as f64)
        .map(|i| i as i32)
}

// i64::MAX is not representable as f64; 2^63 itself is out of range
fn as_i64(v: f64) -> Option<i64> {
    integral(v)
        .filter(|i| *i >= i64::MIN as f64 && *i < i64::MAX as f64)
        .map(|i| i as i64)
}

fn put_global_attr(file: &mut netcdf::FileMut, key: &str, value: &AttrValue) -> NetCdfResult<()> {
    let result = match value {
        AttrValue::Int(v) => file.add_attribute(key, *v),
        AttrValue::Float(v) => file.add_attribute(key, *v),
        AttrValue::Text(v) => file.add_attribute(key, v.as_str()),
        AttrValue::IntList(v) => file.add_attribute(key, v.clone()),
        AttrValue::FloatList(v) => file.add_attribute(key, v.clone()),
    };
    result
        .map(|_| ())
        .map_err(|e| NetCdfError::Library(format!("global attribute '{}': {}", key, e)))
}

fn put_var_attrs(
    var: &mut netcdf::VariableMut,
    name: &str,
    attrs: &std::collections::BTreeMap<String, AttrValue>,
) -> NetCdfResult<()> {
    for (key, value) in attrs {
        put_var_attr(var, name, key, value)?;
    }
    Ok(())
}

fn put_var_attr(
    var: &mut netcdf::VariableMut,
    name: &str,
    key: &str,
    value: &AttrValue,
) -> NetCdfResult<()> {
    let result = match value {
        AttrValue::Int(v) => var.put_attribute(key, *v),
        AttrValue::Float(v) => var.put_attribute(key, *v),
        AttrValue::Text(v) => var.put_attribute(key, v.as_str()),
        AttrValue::IntList(v) => var.put_attribute(key, v.clone()),
        AttrValue::FloatList(v) => var.put_attribute(key, v.clone()),
    };
    result
        .map(|_| ())
        .map_err(|e| NetCdfError::variable(name, format!("attribute '{}': {}", key, e)))
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Unique sibling path used while a file is being written.
/// Uses process ID and a counter to ensure uniqueness.
fn partial_path(path: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let pid = std::process::id();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset.nc".to_string());

    path.with_file_name(format!(".{}.{}_{}.partial", file_name, pid, count))
}
