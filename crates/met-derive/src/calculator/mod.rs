//! Derived-quantity calculators.
//!
//! Each public function derives one quantity from one source file (or a
//! surface/model file pair for the same member and lead) and returns every
//! site-point value inside the context's valid-time window. Failures are
//! returned, never logged here; the collector decides what to record.

pub mod humidity;
pub mod precipitation;
pub mod surface;
pub mod temperature;
pub mod wind;

pub use humidity::{relative_humidity, relative_humidity_from};
pub use precipitation::precipitation_rate;
pub use surface::{surface_temperature, visibility};
pub use temperature::spliced_temperature;
pub use wind::wind_speed;

use chrono::{DateTime, Utc};
use tracing::trace;

use met_common::{LevelDescriptor, TimeWindow, Units, Variable};

use crate::error::{DeriveError, Result};
use crate::interpolation::bilinear_interpolate;
use crate::stash;
use crate::types::{GridSlice, QualityFlag, RawField, SiteContext, SitePoint, SourceField, SourceFile};
use crate::vertical;

/// One slice of a field sampled at the site point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SiteSample {
    pub valid_time: DateTime<Utc>,
    pub level: LevelDescriptor,
    pub height_agl_ft: f64,
    pub value: f64,
}

/// Interpolate one slice of `field` to `point`.
fn sample_slice(field: &SourceField, slice: &GridSlice, point: &SitePoint) -> Result<f64> {
    let grid = &field.grid;
    if slice.data.len() != grid.len() {
        return Err(DeriveError::shape_mismatch(format!(
            "{} slice at {} has {} values, grid is {}x{}",
            field.code,
            slice.valid_time,
            slice.data.len(),
            grid.nx,
            grid.ny
        )));
    }

    let (col, row) = grid
        .fractional_index(point)
        .ok_or_else(|| DeriveError::OutsideGrid {
            code: field.code.clone(),
            x: point.x,
            y: point.y,
        })?;

    let value = bilinear_interpolate(&slice.data, grid.nx, grid.ny, col, row);
    if value.is_nan() {
        return Err(DeriveError::malformed(format!(
            "{} is missing at the site point for {} {}",
            field.code, slice.valid_time, slice.level
        )));
    }
    Ok(value as f64)
}

/// Sample every slice of `field` valid inside `window`, converting to `units`.
pub(crate) fn sample_field(
    field: &SourceField,
    ctx: &SiteContext,
    window: &TimeWindow,
    units: Units,
) -> Result<Vec<SiteSample>> {
    let mut samples = Vec::new();
    for slice in field.slices.iter().filter(|s| window.contains(&s.valid_time)) {
        let value = sample_slice(field, slice, &ctx.point)?;
        samples.push(SiteSample {
            valid_time: slice.valid_time,
            level: slice.level,
            height_agl_ft: vertical::height_agl_ft(
                slice.level_height_m,
                slice.sigma,
                ctx.surface_altitude_m,
            ),
            value: field.units.convert(value, units)?,
        });
    }

    if samples.is_empty() {
        return Err(DeriveError::EmptyWindow {
            code: field.code.clone(),
        });
    }
    samples.sort_by(|a, b| (a.valid_time, a.level).cmp(&(b.valid_time, b.level)));
    trace!(code = %field.code, site = %ctx.site, samples = samples.len(), "Sampled field");
    Ok(samples)
}

/// Build the output value for one sample.
pub(crate) fn to_raw_field(
    file: &SourceFile,
    ctx: &SiteContext,
    variable: Variable,
    sample: &SiteSample,
    flag: Option<QualityFlag>,
) -> RawField {
    RawField {
        variable,
        value: sample.value,
        units: variable.output_units(),
        level: sample.level,
        height_agl_ft: sample.height_agl_ft,
        site: ctx.site.clone(),
        realization: file.realization,
        source: file.name.clone(),
        issue_time: file.issue_time,
        valid_time: sample.valid_time,
        flag,
    }
}

/// Model surface altitude (m) at a point, from the orography field.
pub fn orography_at(file: &SourceFile, point: &SitePoint) -> Result<f64> {
    let field = file.field(stash::OROGRAPHY)?;
    let slice = field
        .slices
        .first()
        .ok_or_else(|| DeriveError::missing_level(stash::OROGRAPHY, "orography has no slices"))?;
    let metres = sample_slice(field, slice, point)?;
    Ok(field.units.convert(metres, Units::Metres)?)
}
