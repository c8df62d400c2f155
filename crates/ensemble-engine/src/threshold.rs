//! Threshold parameter objects and traffic-light banding.
//!
//! A [`ThresholdSet`] is built fresh for each use and never mutated by the
//! aggregator. Its lower and upper bounds close the outermost bands so the
//! reporting side can shade every threshold interval.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use met_common::Variable;

use crate::error::{EngineError, Result};

/// How a member value is tested against a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `value >= threshold`
    AtOrAbove,
    /// `value <= threshold`
    AtOrBelow,
}

impl Comparison {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::AtOrAbove => value >= threshold,
            Comparison::AtOrBelow => value <= threshold,
        }
    }

    fn phrase(&self) -> &'static str {
        match self {
            Comparison::AtOrAbove => "exceeding",
            Comparison::AtOrBelow => "less than",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    pub comparison: Comparison,
}

impl Threshold {
    pub fn above(value: f64) -> Self {
        Self {
            value,
            comparison: Comparison::AtOrAbove,
        }
    }

    pub fn below(value: f64) -> Self {
        Self {
            value,
            comparison: Comparison::AtOrBelow,
        }
    }

    /// Caption such as "Probability of wind speed exceeding 12 knots".
    pub fn label(&self, variable: Variable) -> String {
        format!(
            "Probability of {} {} {} {}",
            variable.label(),
            self.comparison.phrase(),
            self.value,
            variable.output_units().label()
        )
    }
}

/// Ascending thresholds for one variable, bounded below and above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub variable: Variable,
    pub thresholds: Vec<Threshold>,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ThresholdSet {
    pub fn new(variable: Variable, thresholds: Vec<Threshold>, lower_bound: f64, upper_bound: f64) -> Result<Self> {
        let set = Self {
            variable,
            thresholds,
            lower_bound,
            upper_bound,
        };
        set.validate().map_err(EngineError::invalid_thresholds)?;
        Ok(set)
    }

    /// Check ordering and bounds.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let (Some(first), Some(last)) = (self.thresholds.first(), self.thresholds.last()) else {
            return Err(format!("{}: threshold list is empty", self.variable));
        };
        if self.thresholds.iter().any(|t| !t.value.is_finite()) {
            return Err(format!("{}: thresholds must be finite", self.variable));
        }
        if self.thresholds.windows(2).any(|w| w[0].value >= w[1].value) {
            return Err(format!("{}: thresholds must be strictly ascending", self.variable));
        }
        if self.lower_bound > first.value || self.upper_bound < last.value {
            return Err(format!(
                "{}: bounds [{}, {}] must enclose thresholds [{}, {}]",
                self.variable, self.lower_bound, self.upper_bound, first.value, last.value
            ));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Band edges: lower bound, every threshold, upper bound.
    pub fn boundaries(&self) -> Vec<f64> {
        std::iter::once(self.lower_bound)
            .chain(self.thresholds.iter().map(|t| t.value))
            .chain(std::iter::once(self.upper_bound))
            .collect()
    }

    pub fn wind() -> Self {
        Self::preset(Variable::WindSpeed, [12.0, 15.0, 20.0, 25.0].map(Threshold::above).to_vec(), 0.0, 100.0)
    }

    /// Frost threshold counts members at or below freezing.
    pub fn temperature() -> Self {
        Self::preset(
            Variable::Temperature,
            vec![
                Threshold::below(0.0),
                Threshold::above(20.0),
                Threshold::above(25.0),
                Threshold::above(30.0),
            ],
            -30.0,
            50.0,
        )
    }

    pub fn surface_temperature() -> Self {
        Self::preset(
            Variable::SurfaceTemperature,
            [-3.0, 0.0, 3.0].map(Threshold::below).to_vec(),
            -30.0,
            40.0,
        )
    }

    pub fn relative_humidity() -> Self {
        Self::preset(Variable::RelativeHumidity, [40.0, 95.0].map(Threshold::above).to_vec(), 0.0, 100.0)
    }

    pub fn precipitation() -> Self {
        Self::preset(Variable::PrecipitationRate, [0.2, 1.0, 4.0].map(Threshold::above).to_vec(), 0.0, 50.0)
    }

    pub fn visibility() -> Self {
        Self::preset(
            Variable::Visibility,
            [200.0, 500.0, 1000.0, 5000.0, 10000.0].map(Threshold::below).to_vec(),
            0.0,
            50000.0,
        )
    }

    fn preset(variable: Variable, thresholds: Vec<Threshold>, lower_bound: f64, upper_bound: f64) -> Self {
        Self {
            variable,
            thresholds,
            lower_bound,
            upper_bound,
        }
    }
}

/// Threshold sets keyed by variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdCatalogue {
    sets: BTreeMap<Variable, ThresholdSet>,
}

impl Default for ThresholdCatalogue {
    fn default() -> Self {
        Self::from_sets([
            ThresholdSet::wind(),
            ThresholdSet::temperature(),
            ThresholdSet::surface_temperature(),
            ThresholdSet::relative_humidity(),
            ThresholdSet::precipitation(),
            ThresholdSet::visibility(),
        ])
    }
}

impl ThresholdCatalogue {
    pub fn from_sets(sets: impl IntoIterator<Item = ThresholdSet>) -> Self {
        Self {
            sets: sets.into_iter().map(|s| (s.variable, s)).collect(),
        }
    }

    pub fn get(&self, variable: Variable) -> Option<&ThresholdSet> {
        self.sets.get(&variable)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThresholdSet> {
        self.sets.values()
    }

    /// Validate every set, and that each is filed under its own variable.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (variable, set) in &self.sets {
            if *variable != set.variable {
                return Err(format!("thresholds for {} are keyed under {}", set.variable, variable));
            }
            set.validate()?;
        }
        Ok(())
    }
}

/// Traffic-light band of a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Green,
    Amber,
    Red,
}

/// Which side of the thresholds is worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandScheme {
    /// Green below the first threshold, red above the last.
    HigherWorse,
    /// Green above the last threshold, red below the first.
    LowerWorse,
    /// Green from the first to the second threshold, amber up to the last,
    /// red outside.
    OutsideRangeWorse,
}

/// Banding rule for observed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banding {
    pub scheme: BandScheme,
    pub thresholds: Vec<f64>,
}

impl Banding {
    pub fn new(scheme: BandScheme, thresholds: Vec<f64>) -> Self {
        Self { scheme, thresholds }
    }

    /// Band of `value`; `None` for a missing value or an empty rule.
    pub fn band(&self, value: f64) -> Option<Band> {
        if value.is_nan() {
            return None;
        }
        let (first, last) = (*self.thresholds.first()?, *self.thresholds.last()?);
        let band = match self.scheme {
            BandScheme::HigherWorse if value < first => Band::Green,
            BandScheme::HigherWorse if value <= last => Band::Amber,
            BandScheme::HigherWorse => Band::Red,
            BandScheme::LowerWorse if value > last => Band::Green,
            BandScheme::LowerWorse if value >= first => Band::Amber,
            BandScheme::LowerWorse => Band::Red,
            BandScheme::OutsideRangeWorse => {
                let upper_green = self.thresholds.get(1).copied().unwrap_or(last);
                if value < first || value > last {
                    Band::Red
                } else if value < upper_green {
                    Band::Green
                } else {
                    Band::Amber
                }
            }
        };
        Some(band)
    }

    /// Default rule for an observed variable, if it has one.
    pub fn for_observation(variable: Variable) -> Option<Self> {
        let (scheme, thresholds) = match variable {
            Variable::Temperature => (BandScheme::OutsideRangeWorse, vec![0.0, 25.0, 30.0]),
            Variable::WindSpeed => (BandScheme::HigherWorse, vec![12.0, 16.0]),
            Variable::WindGust => (BandScheme::HigherWorse, vec![15.0, 20.0]),
            Variable::RelativeHumidity => (BandScheme::HigherWorse, vec![40.0, 95.0]),
            Variable::Visibility => (BandScheme::LowerWorse, vec![200.0, 1000.0]),
            Variable::PrecipitationRate => (BandScheme::HigherWorse, vec![0.01, 0.2]),
            _ => return None,
        };
        Some(Self::new(scheme, thresholds))
    }
}
