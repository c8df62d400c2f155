//! Single-level surface quantities.

use met_common::{Units, Variable};

use super::{sample_field, to_raw_field};
use crate::error::Result;
use crate::stash;
use crate::types::{RawField, SiteContext, SourceFile};

fn single_level(
    file: &SourceFile,
    ctx: &SiteContext,
    code: &str,
    variable: Variable,
    units: Units,
) -> Result<Vec<RawField>> {
    let samples = sample_field(file.field(code)?, ctx, &ctx.window, units)?;
    Ok(samples
        .iter()
        .map(|s| to_raw_field(file, ctx, variable, s, None))
        .collect())
}

/// Screen-level visibility in metres.
pub fn visibility(file: &SourceFile, ctx: &SiteContext) -> Result<Vec<RawField>> {
    single_level(file, ctx, stash::VISIBILITY, Variable::Visibility, Units::Metres)
}

/// Surface (skin) temperature in °C.
pub fn surface_temperature(file: &SourceFile, ctx: &SiteContext) -> Result<Vec<RawField>> {
    single_level(
        file,
        ctx,
        stash::SURFACE_TEMPERATURE,
        Variable::SurfaceTemperature,
        Units::Celsius,
    )
}
