//! Physical units and conversions.

use serde::{Deserialize, Serialize};

use crate::error::{MetError, MetResult};

/// Metres per second to knots.
pub const MS_TO_KTS: f64 = 1.94384;
/// Miles per hour to knots.
pub const MPH_TO_KTS: f64 = 0.86897423357831;
/// Metres to feet.
pub const M_TO_FT: f64 = 3.280839895;
/// Offset between Kelvin and Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;
/// Precipitation flux (kg m-2 s-1) to rate (mm hr-1).
pub const FLUX_TO_MM_PER_HR: f64 = 3600.0;

/// Units carried by field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    MetresPerSecond,
    Knots,
    Kelvin,
    Celsius,
    Pascal,
    HectoPascal,
    /// kg/kg
    KgPerKg,
    Percent,
    /// kg m-2 s-1
    KgPerM2PerSecond,
    MmPerHour,
    Metres,
    Feet,
    Degrees,
    Oktas,
    Dimensionless,
}

impl Units {
    /// Short label used in captions.
    pub fn label(&self) -> &'static str {
        match self {
            Units::MetresPerSecond => "m/s",
            Units::Knots => "knots",
            Units::Kelvin => "K",
            Units::Celsius => "Celsius",
            Units::Pascal => "Pa",
            Units::HectoPascal => "hPa",
            Units::KgPerKg => "kg/kg",
            Units::Percent => "%",
            Units::KgPerM2PerSecond => "kg m-2 s-1",
            Units::MmPerHour => "mm hr-1",
            Units::Metres => "m",
            Units::Feet => "ft",
            Units::Degrees => "degrees",
            Units::Oktas => "oktas",
            Units::Dimensionless => "1",
        }
    }

    /// Convert a value from `self` into `to`.
    pub fn convert(&self, value: f64, to: Units) -> MetResult<f64> {
        if *self == to {
            return Ok(value);
        }
        let converted = match (self, to) {
            (Units::MetresPerSecond, Units::Knots) => value * MS_TO_KTS,
            (Units::Knots, Units::MetresPerSecond) => value / MS_TO_KTS,
            (Units::Kelvin, Units::Celsius) => value - KELVIN_OFFSET,
            (Units::Celsius, Units::Kelvin) => value + KELVIN_OFFSET,
            (Units::Pascal, Units::HectoPascal) => value / 100.0,
            (Units::HectoPascal, Units::Pascal) => value * 100.0,
            (Units::Metres, Units::Feet) => value * M_TO_FT,
            (Units::Feet, Units::Metres) => value / M_TO_FT,
            (Units::KgPerM2PerSecond, Units::MmPerHour) => value * FLUX_TO_MM_PER_HR,
            _ => {
                return Err(MetError::UnsupportedConversion {
                    from: self.label().to_string(),
                    to: to.label().to_string(),
                })
            }
        };
        Ok(converted)
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Metres to feet.
pub fn metres_to_feet(m: f64) -> f64 {
    m * M_TO_FT
}
