//! Precipitation rate.

use met_common::{Units, Variable};

use super::{sample_field, to_raw_field};
use crate::error::Result;
use crate::stash;
use crate::types::{RawField, SiteContext, SourceFile};

/// Precipitation rate in mm/hr.
///
/// Only five-minute samples inside the half-open window are kept, so the last
/// hour is `end - 1h` and all of its samples are already inside. The
/// flux-to-rate factor is applied by unit conversion, so a value already in
/// mm/hr passes through unchanged.
pub fn precipitation_rate(file: &SourceFile, ctx: &SiteContext) -> Result<Vec<RawField>> {
    let samples = sample_field(file.field(stash::RAIN_RATE)?, ctx, &ctx.window, Units::MmPerHour)?;

    Ok(samples
        .iter()
        .map(|s| to_raw_field(file, ctx, Variable::PrecipitationRate, s, None))
        .collect())
}
