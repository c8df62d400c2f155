//! Common test fixtures for ensemble forecaster tests.
//!
//! The standard fixture is a 5x5 rotated grid centred on the origin, a site
//! at the grid centre, and model files whose fields have known constant
//! values so derived quantities can be checked exactly.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, TimeZone, Utc};

use met_common::{TimeWindow, Units, ValidTime};
use met_derive::{stash, GridGeometry, SiteContext, SitePoint, SourceFile};

use crate::generators::{hourly_times, standard_levels, stepped_times, SourceFileBuilder};

/// Name used for the synthetic candidate site.
pub const SITE_NAME: &str = "Test Site";

/// Model surface altitude at the synthetic site (m).
pub const OROGRAPHY_M: f32 = 100.0;

/// Constant field values in native units.
pub mod values {
    pub const U_WIND_MS: f32 = 3.0;
    pub const V_WIND_MS: f32 = 4.0;
    pub const SPECIFIC_HUMIDITY: f32 = 0.008;
    /// Pressure at level n is `SURFACE_PRESSURE_PA - PRESSURE_LAPSE_PA * n`.
    pub const SURFACE_PRESSURE_PA: f32 = 100_000.0;
    pub const PRESSURE_LAPSE_PA: f32 = 250.0;
    /// Model temperature at level n is `MODEL_TEMP_K - 0.5 * n`.
    pub const MODEL_TEMP_K: f32 = 288.15;
    pub const SCREEN_TEMP_K: f32 = 289.15;
    pub const SURFACE_TEMP_K: f32 = 285.15;
    pub const VISIBILITY_M: f32 = 8000.0;
    /// kg m-2 s-1, i.e. 0.36 mm/hr
    pub const RAIN_FLUX: f32 = 1.0e-4;
}

/// Number of model levels in the standard model file.
pub const MODEL_LEVELS: u32 = 5;

/// Fixed issue time used across tests (2024-01-15T00:00Z).
pub fn issue_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
}

/// 5x5 grid, 0.5 degree spacing, centred on the rotated origin.
pub fn test_grid() -> GridGeometry {
    GridGeometry::new(-1.0, -1.0, 0.5, 0.5, 5, 5)
}

/// Window of `hours` hours starting `offset_hours` after the issue time.
pub fn window(offset_hours: i64, hours: i64) -> TimeWindow {
    TimeWindow::hours_from(issue_time() + Duration::hours(offset_hours), hours).unwrap()
}

/// Site context at the grid centre over `window`.
pub fn site_context(window: TimeWindow) -> SiteContext {
    SiteContext::new(SITE_NAME, SitePoint::new(0.0, 0.0), OROGRAPHY_M as f64, window)
}

/// Model-level file (`pe`) for one member covering `times`.
pub fn model_file(name: &str, realization: Option<u32>, times: &[DateTime<Utc>]) -> SourceFile {
    use self::values::*;
    let levels = standard_levels(MODEL_LEVELS);
    SourceFileBuilder::new(name, issue_time(), realization)
        .level_field(stash::U_WIND, Units::MetresPerSecond, times, &levels, |_| U_WIND_MS)
        .level_field(stash::V_WIND, Units::MetresPerSecond, times, &levels, |_| V_WIND_MS)
        .level_field(stash::SPECIFIC_HUMIDITY, Units::KgPerKg, times, &levels, |_| SPECIFIC_HUMIDITY)
        .level_field(stash::PRESSURE, Units::Pascal, times, &levels, |n| {
            SURFACE_PRESSURE_PA - PRESSURE_LAPSE_PA * n as f32
        })
        .level_field(stash::MODEL_TEMPERATURE, Units::Kelvin, times, &levels, |n| {
            MODEL_TEMP_K - 0.5 * n as f32
        })
        .surface_field(stash::SURFACE_TEMPERATURE, Units::Kelvin, times, SURFACE_TEMP_K)
        .build()
}

/// Surface file (`pd`) for one member: orography, screen temperature and
/// visibility at `times`, rain rate every five minutes across the same span
/// plus one hour.
pub fn surface_file(name: &str, realization: Option<u32>, times: &[DateTime<Utc>]) -> SourceFile {
    use self::values::*;
    let rain_times = match (times.first(), times.last()) {
        (Some(first), Some(last)) => stepped_times(*first, *last + Duration::hours(1), 5),
        _ => Vec::new(),
    };
    SourceFileBuilder::new(name, issue_time(), realization)
        .surface_field(stash::OROGRAPHY, Units::Metres, &times[..times.len().min(1)], OROGRAPHY_M)
        .surface_field(stash::SCREEN_TEMPERATURE, Units::Kelvin, times, SCREEN_TEMP_K)
        .surface_field(stash::VISIBILITY, Units::Metres, times, VISIBILITY_M)
        .surface_field(stash::RAIN_RATE, Units::KgPerM2PerSecond, &rain_times, RAIN_FLUX)
        .build()
}

/// Model and surface files for `members` realizations over `hours` hours.
pub fn ensemble_files(members: u32, hours: i64) -> Vec<(SourceFile, SourceFile)> {
    let times = hourly_times(issue_time(), hours);
    (1..=members)
        .map(|m| {
            (
                surface_file("enukaa_pd000", Some(m), &times),
                model_file("enukaa_pe000", Some(m), &times),
            )
        })
        .collect()
}

/// Write `file` as JSON into the local source-tree layout
/// `<root>/<issue stamp>/enuk_um_<member>/<name>.json`.
pub fn write_source_file(root: &Path, member: u32, file: &SourceFile) -> PathBuf {
    let dir = root
        .join(ValidTime::issue_stamp(&file.issue_time))
        .join(format!("enuk_um_{:03}", member));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{}.json", file.name));
    std::fs::write(&path, serde_json::to_vec(file).unwrap()).unwrap();
    path
}

/// A temporary directory that is removed when dropped.
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}
