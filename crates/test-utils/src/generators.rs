//! Test data generators for creating synthetic instrument time series.
//!
//! These generators create predictable, verifiable datasets that can be
//! used across the test suite. Values encode their own position so a test
//! can tell exactly which samples ended up in which window.

use chrono::{DateTime, Duration, TimeZone, Utc};
use ndarray::Array2;

use ocean_common::{Dataset, Values, Variable};

use crate::fixtures::datastreams::CLALLAM_WAVE;

/// First timestamp of every generated dataset: 2021-08-01T00:00:00Z.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 8, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// `n` timestamps spaced `step` apart starting at [`t0`].
pub fn regular_times(n: usize, step: Duration) -> Vec<DateTime<Utc>> {
    (0..n).map(|i| t0() + step * i as i32).collect()
}

/// `n` hourly timestamps starting at [`t0`].
pub fn hourly_times(n: usize) -> Vec<DateTime<Utc>> {
    regular_times(n, Duration::hours(1))
}

/// Creates a Spotter-like displacement dataset over the given timestamps.
///
/// Contents:
/// - coordinate `time` (the given timestamps)
/// - coordinate `dir` = `["x", "y", "z"]`
/// - `displacement[dir, time]` where each value is `dir_index * 1000 + time_index`
/// - `t_elapsed[time]` = `time_index * 1000` (milliseconds)
/// - global attribute `datastream` = `clallam.wave.a1`
///
/// # Panics
///
/// Never for well-formed input; the shapes are built to match.
pub fn wave_dataset(times: Vec<DateTime<Utc>>) -> Dataset {
    let n = times.len();
    let displacement: Vec<f64> = (0..3)
        .flat_map(|d| (0..n).map(move |i| (d * 1000 + i) as f64))
        .collect();
    let displacement = Array2::from_shape_vec((3, n), displacement)
        .expect("displacement shape")
        .into_dyn();
    let elapsed: Vec<i64> = (0..n as i64).map(|i| i * 1000).collect();

    Dataset::new()
        .with_attr("datastream", CLALLAM_WAVE)
        .with_coord("time", Variable::new(&["time"], times.into()).expect("time"))
        .expect("time coordinate")
        .with_coord(
            "dir",
            Variable::new(
                &["dir"],
                vec!["x".to_string(), "y".to_string(), "z".to_string()].into(),
            )
            .expect("dir"),
        )
        .expect("dir coordinate")
        .with_var(
            "displacement",
            Variable::new(&["dir", "time"], Values::Float64(displacement))
                .expect("displacement")
                .with_attr("units", "mm"),
        )
        .expect("displacement variable")
        .with_var(
            "t_elapsed",
            Variable::new(&["time"], elapsed.into()).expect("t_elapsed"),
        )
        .expect("t_elapsed variable")
}

/// [`wave_dataset`] with `n` hourly samples.
pub fn hourly_dataset(n: usize) -> Dataset {
    wave_dataset(hourly_times(n))
}

/// Adds a fifth-beam clock `time_b5` and a `vel_b5[time_b5]` variable whose
/// values are the sample indices.
pub fn with_beam5(dataset: Dataset, times_b5: Vec<DateTime<Utc>>) -> Dataset {
    let n = times_b5.len();
    let velocity: Vec<f64> = (0..n).map(|i| i as f64).collect();
    dataset
        .with_coord(
            "time_b5",
            Variable::new(&["time_b5"], times_b5.into()).expect("time_b5"),
        )
        .expect("time_b5 coordinate")
        .with_var(
            "vel_b5",
            Variable::new(&["time_b5"], velocity.into()).expect("vel_b5"),
        )
        .expect("vel_b5 variable")
}

/// Index of the `time` sample a displacement value came from.
pub fn time_index_of(displacement_value: f64) -> usize {
    (displacement_value as usize) % 1000
}
