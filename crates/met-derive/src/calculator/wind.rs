//! Wind speed from eastward and northward components.

use std::collections::HashMap;

use met_common::units::MS_TO_KTS;
use met_common::{Units, Variable};

use super::{sample_field, to_raw_field, SiteSample};
use crate::error::{DeriveError, Result};
use crate::stash;
use crate::types::{RawField, SiteContext, SourceFile};

/// Wind speed in knots on every model level inside the window.
///
/// Components are combined in m/s and the magnitude converted to knots
/// before the height coordinate is attached.
pub fn wind_speed(file: &SourceFile, ctx: &SiteContext) -> Result<Vec<RawField>> {
    let u = sample_field(file.field(stash::U_WIND)?, ctx, &ctx.window, Units::MetresPerSecond)?;
    let v = sample_field(file.field(stash::V_WIND)?, ctx, &ctx.window, Units::MetresPerSecond)?;

    let v_by_key: HashMap<_, f64> = v.iter().map(|s| ((s.valid_time, s.level), s.value)).collect();

    u.iter()
        .map(|us| {
            let vs = v_by_key.get(&(us.valid_time, us.level)).ok_or_else(|| {
                DeriveError::missing_level(
                    stash::V_WIND,
                    format!("no component at {} {}", us.valid_time, us.level),
                )
            })?;
            let speed = SiteSample {
                value: us.value.hypot(*vs) * MS_TO_KTS,
                ..*us
            };
            Ok(to_raw_field(file, ctx, Variable::WindSpeed, &speed, None))
        })
        .collect()
}
