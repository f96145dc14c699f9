//! Time handling utilities for instrument time series.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{OceanError, OceanResult};

/// Unit used to express a window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    #[default]
    Day,
    Week,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 3_600,
            TimeUnit::Day => 86_400,
            TimeUnit::Week => 604_800,
        }
    }

    /// Duration of `interval` units.
    ///
    /// Fails with a configuration error when `interval` is not positive or
    /// the resulting span cannot be represented.
    pub fn span(&self, interval: i64) -> OceanResult<Duration> {
        if interval <= 0 {
            return Err(OceanError::InvalidConfig(format!(
                "time_interval must be positive, got {}",
                interval
            )));
        }

        let secs = interval
            .checked_mul(self.seconds())
            .filter(|s| *s <= i64::MAX / 1_000)
            .ok_or_else(|| {
                OceanError::InvalidConfig(format!(
                    "time_interval {} {} is too large",
                    interval, self
                ))
            })?;

        Ok(Duration::seconds(secs))
    }

    /// Short pandas-style alias.
    pub fn alias(&self) -> &'static str {
        match self {
            TimeUnit::Second => "S",
            TimeUnit::Minute => "min",
            TimeUnit::Hour => "H",
            TimeUnit::Day => "D",
            TimeUnit::Week => "W",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = OceanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim() {
            "S" | "s" | "sec" | "secs" | "second" | "seconds" => TimeUnit::Second,
            "T" | "min" | "mins" | "minute" | "minutes" => TimeUnit::Minute,
            "H" | "h" | "hr" | "hour" | "hours" => TimeUnit::Hour,
            "D" | "d" | "day" | "days" => TimeUnit::Day,
            "W" | "w" | "week" | "weeks" => TimeUnit::Week,
            other => return Err(OceanError::UnknownTimeUnit(other.to_string())),
        };
        Ok(unit)
    }
}

impl TryFrom<String> for TimeUnit {
    type Error = OceanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeUnit> for String {
    fn from(unit: TimeUnit) -> Self {
        unit.alias().to_string()
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of length `span` beginning at `start`.
    ///
    /// Fails with a configuration error when the end is past the range of
    /// representable timestamps.
    pub fn starting_at(start: DateTime<Utc>, span: Duration) -> OceanResult<Self> {
        let end = start.checked_add_signed(span).ok_or_else(|| {
            OceanError::InvalidConfig(format!(
                "window of {}s starting at {} ends out of range",
                span.num_seconds(),
                start.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            ))
        })?;
        Ok(Self { start, end })
    }

    /// The window immediately following this one, with the same length.
    pub fn next(&self) -> OceanResult<Self> {
        Self::starting_at(self.end, self.end - self.start)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.end.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )
    }
}

/// Convert fractional seconds since the Unix epoch into a UTC timestamp.
pub fn from_epoch_seconds(value: f64) -> OceanResult<DateTime<Utc>> {
    if !value.is_finite() {
        return Err(OceanError::InvalidData(format!(
            "epoch seconds must be finite, got {}",
            value
        )));
    }

    let mut secs = value.floor();
    let mut nanos = ((value - secs) * 1e9).round();
    if nanos >= 1e9 {
        secs += 1.0;
        nanos = 0.0;
    }

    if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return Err(OceanError::InvalidData(format!(
            "epoch seconds out of range: {}",
            value
        )));
    }

    DateTime::from_timestamp(secs as i64, nanos as u32).ok_or_else(|| {
        OceanError::InvalidData(format!("epoch seconds out of range: {}", value))
    })
}

/// Fractional seconds since the Unix epoch.
pub fn to_epoch_seconds(t: DateTime<Utc>) -> f64 {
    t.timestamp() as f64 + t.timestamp_subsec_nanos() as f64 * 1e-9
}
