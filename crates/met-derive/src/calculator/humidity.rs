//! Relative humidity from specific humidity, pressure and temperature.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use met_common::{Units, Variable};

use super::{sample_field, to_raw_field, SiteSample};
use crate::config::{DeriveConfig, OutOfRangePolicy};
use crate::error::{DeriveError, Result};
use crate::interpolation::linear_interpolate;
use crate::stash;
use crate::types::{QualityFlag, RawField, SiteContext, SourceFile};

/// Relative humidity (%) from specific humidity `q` (kg/kg), pressure (hPa)
/// and dry-bulb temperature (°C).
///
/// Vapour pressure is `q·P / (ε + (1 − ε)·q)`. Saturation vapour pressure
/// uses the Magnus form with an enhancement factor for moist air.
pub fn relative_humidity_from(q: f64, pressure_hpa: f64, temp_c: f64, epsilon: f64) -> f64 {
    let vapour = q * pressure_hpa / (epsilon + (1.0 - epsilon) * q);
    let corr = 1.0016 + 3.15e-6 * pressure_hpa - 0.074 / pressure_hpa;
    let saturation = corr * 6.112 * (17.62 * temp_c / (temp_c + 243.12)).exp();
    100.0 * vapour / saturation
}

/// Apply the out-of-range policy to one humidity value.
fn check_range(value: f64, policy: OutOfRangePolicy) -> (f64, Option<QualityFlag>) {
    const MIN: f64 = 0.0;
    const MAX: f64 = 100.0;
    if (MIN..=MAX).contains(&value) {
        return (value, None);
    }
    let flag = QualityFlag::OutOfRange {
        original: value,
        min: MIN,
        max: MAX,
    };
    match policy {
        OutOfRangePolicy::Flag => (value, Some(flag)),
        OutOfRangePolicy::Clip => (value.clamp(MIN, MAX), Some(flag)),
    }
}

/// Relative humidity on the temperature's model levels inside the window.
///
/// Pressure is held on a different set of levels from temperature and
/// humidity, so it is interpolated linearly in model level number onto the
/// temperature levels first.
pub fn relative_humidity(
    file: &SourceFile,
    ctx: &SiteContext,
    config: &DeriveConfig,
) -> Result<Vec<RawField>> {
    let q = sample_field(file.field(stash::SPECIFIC_HUMIDITY)?, ctx, &ctx.window, Units::KgPerKg)?;
    let pressure = sample_field(file.field(stash::PRESSURE)?, ctx, &ctx.window, Units::HectoPascal)?;
    let temp = sample_field(file.field(stash::MODEL_TEMPERATURE)?, ctx, &ctx.window, Units::Celsius)?;

    let q_by_key: HashMap<_, f64> = q.iter().map(|s| ((s.valid_time, s.level), s.value)).collect();

    let mut pressure_by_time: BTreeMap<DateTime<Utc>, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for s in &pressure {
        if let Some(n) = s.level.model_level_number() {
            let entry = pressure_by_time.entry(s.valid_time).or_default();
            entry.0.push(n as f64);
            entry.1.push(s.value);
        }
    }

    temp.iter()
        .map(|ts| {
            let level_number = ts.level.model_level_number().ok_or_else(|| {
                DeriveError::missing_level(stash::MODEL_TEMPERATURE, "temperature is not on model levels")
            })?;
            let q = q_by_key.get(&(ts.valid_time, ts.level)).ok_or_else(|| {
                DeriveError::missing_level(
                    stash::SPECIFIC_HUMIDITY,
                    format!("no value at {} {}", ts.valid_time, ts.level),
                )
            })?;
            let p = pressure_by_time
                .get(&ts.valid_time)
                .and_then(|(levels, values)| linear_interpolate(levels, values, level_number as f64))
                .ok_or_else(|| {
                    DeriveError::missing_level(stash::PRESSURE, format!("no levels at {}", ts.valid_time))
                })?;
            if p <= 0.0 {
                return Err(DeriveError::malformed(format!(
                    "non-positive pressure {:.3} hPa at {}",
                    p, ts.valid_time
                )));
            }

            let (value, flag) = check_range(
                relative_humidity_from(*q, p, ts.value, config.epsilon),
                config.out_of_range,
            );
            let sample = SiteSample { value, ..*ts };
            Ok(to_raw_field(file, ctx, Variable::RelativeHumidity, &sample, flag))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.62198;

    #[test]
    fn test_reference_case() {
        let rh = relative_humidity_from(0.008, 1000.0, 15.0, EPSILON);
        assert!(rh > 0.0 && rh < 100.0);
        assert!((rh - 74.9).abs() < 0.5, "rh = {}", rh);
    }

    #[test]
    fn test_saturated_air_near_hundred() {
        // q at saturation for 20 °C, 1000 hPa is ~0.0147
        let rh = relative_humidity_from(0.0147, 1000.0, 20.0, EPSILON);
        assert!((rh - 100.0).abs() < 3.0, "rh = {}", rh);
    }

    #[test]
    fn test_supersaturation_is_flagged_not_clipped() {
        let (value, flag) = check_range(104.0, OutOfRangePolicy::Flag);
        assert_eq!(value, 104.0);
        assert!(matches!(flag, Some(QualityFlag::OutOfRange { original, .. }) if original == 104.0));
    }

    #[test]
    fn test_clip_policy() {
        let (value, flag) = check_range(-2.0, OutOfRangePolicy::Clip);
        assert_eq!(value, 0.0);
        assert!(flag.is_some());
    }

    #[test]
    fn test_in_range_unflagged() {
        assert_eq!(check_range(55.0, OutOfRangePolicy::Flag), (55.0, None));
    }
}
