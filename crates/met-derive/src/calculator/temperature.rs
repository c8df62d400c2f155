//! Temperature profile spliced from screen level and model levels.

use std::collections::HashMap;

use met_common::{LevelDescriptor, Units, Variable};

use super::{sample_field, to_raw_field, SiteSample};
use crate::error::{DeriveError, Result};
use crate::stash;
use crate::types::{RawField, SiteContext, SourceFile};
use crate::vertical;

/// Temperature (°C) from 1.5 m up to the top model level.
///
/// The screen-level value becomes model level 0 with level height 1.5 m and
/// sigma 1.0, and is placed under the model-level profile at every valid
/// time the profile has. Both files must belong to the same member.
pub fn spliced_temperature(
    surface_file: &SourceFile,
    model_file: &SourceFile,
    ctx: &SiteContext,
) -> Result<Vec<RawField>> {
    if surface_file.realization != model_file.realization {
        return Err(DeriveError::shape_mismatch(format!(
            "{} is member {} but {} is member {}",
            surface_file.name,
            surface_file.member(),
            model_file.name,
            model_file.member()
        )));
    }

    let screen = sample_field(
        surface_file.field(stash::SCREEN_TEMPERATURE)?,
        ctx,
        &ctx.window,
        Units::Celsius,
    )?;
    let profile = sample_field(
        model_file.field(stash::MODEL_TEMPERATURE)?,
        ctx,
        &ctx.window,
        Units::Celsius,
    )?;

    let screen_by_time: HashMap<_, f64> = screen.iter().map(|s| (s.valid_time, s.value)).collect();
    let screen_height_ft = vertical::height_agl_ft(stash::SCREEN_HEIGHT_M, 1.0, ctx.surface_altitude_m);

    let mut out = Vec::with_capacity(profile.len() + screen.len());
    let mut last_time = None;
    for sample in &profile {
        if sample.level == LevelDescriptor::ModelLevel(0) {
            return Err(DeriveError::shape_mismatch(
                "model-level temperature already has a level 0",
            ));
        }
        if last_time != Some(sample.valid_time) {
            let value = screen_by_time.get(&sample.valid_time).ok_or_else(|| {
                DeriveError::shape_mismatch(format!(
                    "no screen temperature at {} to splice under {}",
                    sample.valid_time, model_file.name
                ))
            })?;
            let screen_sample = SiteSample {
                valid_time: sample.valid_time,
                level: LevelDescriptor::ModelLevel(0),
                height_agl_ft: screen_height_ft,
                value: *value,
            };
            out.push(to_raw_field(model_file, ctx, Variable::Temperature, &screen_sample, None));
            last_time = Some(sample.valid_time);
        }
        out.push(to_raw_field(model_file, ctx, Variable::Temperature, sample, None));
    }
    Ok(out)
}
