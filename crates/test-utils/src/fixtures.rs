//! Common test fixtures for ocean-ingest tests.
//!
//! This module provides pre-defined test data that represents common
//! scenarios in instrument data ingestion.

/// Datastream names used throughout the tests.
pub mod datastreams {
    /// Spotter displacement data at Clallam Bay
    pub const CLALLAM_WAVE: &str = "clallam.wave.a1";

    /// Spotter GPS data at Clallam Bay
    pub const CLALLAM_GPS: &str = "clallam.gps.a1";

    /// Upward-looking ADCP with a qualifier
    pub const MCRL_CURRENT_UP: &str = "mcrl.current-up.b1";
}

/// Reference times.
pub mod time {
    /// First sample of the generated datasets
    pub const START: &str = "2021-08-01T00:00:00Z";

    /// `START` as seconds since the Unix epoch
    pub const START_EPOCH: f64 = 1_627_776_000.0;

    pub const SECONDS_PER_HOUR: i64 = 3_600;
    pub const SECONDS_PER_DAY: i64 = 86_400;
}

/// Sofar Spotter CSV samples.
pub mod spotter {
    /// Displacement (`_FLT.CSV`) sample with four rows, the last with a
    /// trailing empty field as written by some firmware versions.
    pub const FLT_CSV: &str = "\
millis,GPS_Epoch_Time(s),outx(mm),outy(mm),outz(mm)
1000,1627776000.0,10,-20,300
1400,1627776000.4,11,-21,301
1800,1627776000.8,12,-22,302
2200,1627776001.2,13,-23,303,
";

    /// GPS (`_LOC.CSV`) sample with three rows.
    pub const LOC_CSV: &str = "\
GPS_Epoch_Time(s), lat(deg), lat(min*1e5), long(deg), long(min*1e5)
1627776000,48,1200000,-124,-1500000
1627776060,48,1200600,-124,-1500600
1627776120,48,1201200,-124,-1501200
";

    /// Displacement sample missing the `outz(mm)` column.
    pub const FLT_MISSING_COLUMN: &str = "\
millis,GPS_Epoch_Time(s),outx(mm),outy(mm)
1000,1627776000.0,10,-20
";

    /// Displacement sample with an unparseable value in row 2.
    pub const FLT_BAD_NUMBER: &str = "\
millis,GPS_Epoch_Time(s),outx(mm),outy(mm),outz(mm)
1000,1627776000.0,10,-20,300
1400,1627776000.4,eleven,-21,301
";
}

/// Writer configurations in YAML form.
pub mod configs {
    /// One file per day, default encoding
    pub const DAILY: &str = "time_interval: 1\ntime_unit: D\n";

    /// Six-hour files with compression and a caller override
    pub const SIX_HOURLY_COMPRESSED: &str = "\
time_interval: 6
time_unit: H
compression: true
encoding:
  displacement:
    zlib: true
    complevel: 5
";

    /// Rejected before any write
    pub const ZERO_INTERVAL: &str = "time_interval: 0\n";
}
