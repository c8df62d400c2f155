//! Forecast variables handled by the engine.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::MetError;
use crate::units::Units;

/// A derived or observed forecast variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    WindSpeed,
    WindGust,
    WindDirection,
    Temperature,
    SurfaceTemperature,
    RelativeHumidity,
    PrecipitationRate,
    Visibility,
    LowCloud,
    MediumCloud,
    HighCloud,
}

impl Variable {
    /// Variables derived from ensemble model output.
    pub const ENSEMBLE: [Variable; 6] = [
        Variable::WindSpeed,
        Variable::Temperature,
        Variable::SurfaceTemperature,
        Variable::RelativeHumidity,
        Variable::PrecipitationRate,
        Variable::Visibility,
    ];

    /// Stable identifier used in file names and config keys.
    pub fn code(&self) -> &'static str {
        match self {
            Variable::WindSpeed => "wind",
            Variable::WindGust => "wind_gust",
            Variable::WindDirection => "wind_direction",
            Variable::Temperature => "temp",
            Variable::SurfaceTemperature => "sfc_temp",
            Variable::RelativeHumidity => "relative_humidity",
            Variable::PrecipitationRate => "rain",
            Variable::Visibility => "vis",
            Variable::LowCloud => "low_cloud",
            Variable::MediumCloud => "medium_cloud",
            Variable::HighCloud => "high_cloud",
        }
    }

    /// Human-readable name for captions.
    pub fn label(&self) -> &'static str {
        match self {
            Variable::WindSpeed => "wind speed",
            Variable::WindGust => "wind gust",
            Variable::WindDirection => "wind direction",
            Variable::Temperature => "temperature",
            Variable::SurfaceTemperature => "surface temperature",
            Variable::RelativeHumidity => "relative humidity",
            Variable::PrecipitationRate => "precipitation rate",
            Variable::Visibility => "1.5m visibility",
            Variable::LowCloud => "low cloud",
            Variable::MediumCloud => "medium cloud",
            Variable::HighCloud => "high cloud",
        }
    }

    /// Units values carry once they leave the calculator.
    pub fn output_units(&self) -> Units {
        match self {
            Variable::WindSpeed | Variable::WindGust => Units::Knots,
            Variable::WindDirection => Units::Degrees,
            Variable::Temperature | Variable::SurfaceTemperature => Units::Celsius,
            Variable::RelativeHumidity => Units::Percent,
            Variable::PrecipitationRate => Units::MmPerHour,
            Variable::Visibility => Units::Metres,
            Variable::LowCloud | Variable::MediumCloud | Variable::HighCloud => Units::Oktas,
        }
    }

    /// Precipitation is bucketed into five-minute maxima before hourly grouping.
    pub fn uses_sub_hourly_maxima(&self) -> bool {
        matches!(self, Variable::PrecipitationRate)
    }

    /// Whether the variable is a vertical profile rather than a single level.
    pub fn is_profile(&self) -> bool {
        matches!(
            self,
            Variable::WindSpeed | Variable::Temperature | Variable::RelativeHumidity
        )
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Variable {
    type Err = MetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let variable = match s.to_lowercase().as_str() {
            "wind" | "wind_speed" => Variable::WindSpeed,
            "wind_gust" | "gust" => Variable::WindGust,
            "wind_direction" => Variable::WindDirection,
            "temp" | "temperature" => Variable::Temperature,
            "sfc_temp" | "surface_temperature" => Variable::SurfaceTemperature,
            "relative_humidity" | "rh" => Variable::RelativeHumidity,
            "rain" | "precipitation_rate" => Variable::PrecipitationRate,
            "vis" | "visibility" => Variable::Visibility,
            "low_cloud" => Variable::LowCloud,
            "medium_cloud" => Variable::MediumCloud,
            "high_cloud" => Variable::HighCloud,
            other => return Err(MetError::UnknownVariable(other.to_string())),
        };
        Ok(variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trips_through_from_str() {
        for variable in Variable::ENSEMBLE {
            assert_eq!(variable.code().parse::<Variable>().unwrap(), variable);
        }
    }

    #[test]
    fn test_unknown_variable() {
        assert!("cape".parse::<Variable>().is_err());
    }

    #[test]
    fn test_only_precipitation_uses_sub_hourly_maxima() {
        assert!(Variable::PrecipitationRate.uses_sub_hourly_maxima());
        assert!(!Variable::WindSpeed.uses_sub_hourly_maxima());
    }
}
