//! Readers for Sofar Spotter wave buoy CSV telemetry.
//!
//! Two file types are produced by the buoy's SD card logger:
//! - `NNNN_FLT.CSV`: surface displacement in millimetres, sampled at 2.5 Hz
//! - `NNNN_LOC.CSV`: GPS fixes, with minutes stored as integers scaled by 1e5
//!
//! Both are turned into a [`Dataset`] on a `time` coordinate taken from the
//! `GPS_Epoch_Time(s)` column.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use ndarray::Array2;
use tracing::debug;

use ocean_common::{from_epoch_seconds, Dataset, Values, Variable};

use crate::error::{IngestionError, Result};

pub const COL_MILLIS: &str = "millis";
pub const COL_EPOCH: &str = "GPS_Epoch_Time(s)";
pub const COL_OUTX: &str = "outx(mm)";
pub const COL_OUTY: &str = "outy(mm)";
pub const COL_OUTZ: &str = "outz(mm)";
pub const COL_LAT_DEG: &str = "lat(deg)";
pub const COL_LAT_MIN: &str = "lat(min*1e5)";
pub const COL_LON_DEG: &str = "long(deg)";
pub const COL_LON_MIN: &str = "long(min*1e5)";

/// Displacement directions, in `outx`, `outy`, `outz` order.
pub const DIRECTIONS: [&str; 3] = ["x", "y", "z"];

/// Read a displacement (`_FLT.CSV`) file.
pub fn read_flt(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    read_flt_from(file, &path.display().to_string())
}

/// Parse displacement CSV held in memory; `source` names it in errors.
pub fn read_flt_bytes(data: &[u8], source: &str) -> Result<Dataset> {
    read_flt_from(data, source)
}

/// Read a GPS (`_LOC.CSV`) file.
pub fn read_loc(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    read_loc_from(file, &path.display().to_string())
}

/// Parse GPS CSV held in memory; `source` names it in errors.
pub fn read_loc_bytes(data: &[u8], source: &str) -> Result<Dataset> {
    read_loc_from(data, source)
}

fn read_flt_from<R: Read>(reader: R, source: &str) -> Result<Dataset> {
    let table = Table::read(reader, source)?;
    let millis = table.column(COL_MILLIS)?;
    let time = table.times()?;
    let x = table.column(COL_OUTX)?;
    let y = table.column(COL_OUTY)?;
    let z = table.column(COL_OUTZ)?;

    let n = time.len();
    let data: Vec<f64> = x.into_iter().chain(y).chain(z).collect();
    let displacement = Array2::from_shape_vec((3, n), data)
        .map_err(|e| IngestionError::InvalidData(format!("{}: {}", source, e)))?
        .into_dyn();
    let t_elapsed: Vec<i64> = millis.iter().map(|m| m.round() as i64).collect();

    debug!(source, rows = n, "Read Spotter displacement file");

    let dataset = Dataset::new()
        .with_coord("time", Variable::new(&["time"], time.into())?)?
        .with_coord(
            "dir",
            Variable::new(
                &["dir"],
                DIRECTIONS
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .into(),
            )?,
        )?
        .with_var(
            "displacement",
            Variable::new(&["dir", "time"], Values::Float64(displacement))?,
        )?
        .with_var("t_elapsed", Variable::new(&["time"], t_elapsed.into())?)?;
    Ok(dataset)
}

fn read_loc_from<R: Read>(reader: R, source: &str) -> Result<Dataset> {
    let table = Table::read(reader, source)?;
    let time = table.times()?;
    let lat = degrees(table.column(COL_LAT_DEG)?, table.column(COL_LAT_MIN)?);
    let lon = degrees(table.column(COL_LON_DEG)?, table.column(COL_LON_MIN)?);

    debug!(source, rows = time.len(), "Read Spotter GPS file");

    let dataset = Dataset::new()
        .with_coord("time", Variable::new(&["time"], time.into())?)?
        .with_var("lat", Variable::new(&["time"], lat.into())?)?
        .with_var("lon", Variable::new(&["time"], lon.into())?)?;
    Ok(dataset)
}

/// Whole degrees plus minutes scaled by 1e5.
fn degrees(deg: Vec<f64>, scaled_minutes: Vec<f64>) -> Vec<f64> {
    deg.into_iter()
        .zip(scaled_minutes)
        .map(|(d, m)| d + m * 1e-5 / 60.0)
        .collect()
}

/// CSV contents with headers resolved to column indices.
struct Table {
    source: String,
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    fn read<R: Read>(reader: R, source: &str) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| IngestionError::CsvParse(format!("{}: {}", source, e)))?
            .clone();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| IngestionError::CsvParse(format!("{}: {}", source, e)))?;
            // blank trailing lines
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(record);
        }

        Ok(Self {
            source: source.to_string(),
            headers,
            rows,
        })
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.headers.iter().position(|h| h == name).ok_or_else(|| {
            IngestionError::CsvParse(format!("{}: missing column '{}'", self.source, name))
        })
    }

    fn column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.index_of(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let field = record.get(idx).unwrap_or("");
                field.parse::<f64>().map_err(|_| {
                    IngestionError::CsvParse(format!(
                        "{}: row {} column '{}': cannot parse '{}' as a number",
                        self.source,
                        row + 1,
                        name,
                        field
                    ))
                })
            })
            .collect()
    }

    fn times(&self) -> Result<Vec<DateTime<Utc>>> {
        self.column(COL_EPOCH)?
            .into_iter()
            .enumerate()
            .map(|(row, secs)| {
                from_epoch_seconds(secs).map_err(|e| {
                    IngestionError::CsvParse(format!(
                        "{}: row {} column '{}': {}",
                        self.source,
                        row + 1,
                        COL_EPOCH,
                        e
                    ))
                })
            })
            .collect()
    }
}
