//! Configuration for quantity derivation.

use serde::{Deserialize, Serialize};

/// How derived values outside their physical range are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    /// Keep the computed value and attach a quality flag.
    #[default]
    Flag,
    /// Clamp into range and attach a quality flag carrying the original value.
    Clip,
}

impl OutOfRangePolicy {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "clip" | "clamp" => Self::Clip,
            _ => Self::Flag,
        }
    }
}

/// Configuration for the derived-quantity calculators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeriveConfig {
    /// Handling of relative humidity outside [0, 100].
    pub out_of_range: OutOfRangePolicy,

    /// Ratio of the gas constants of dry air and water vapour.
    pub epsilon: f64,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        Self {
            out_of_range: OutOfRangePolicy::Flag,
            epsilon: 0.62198,
        }
    }
}

impl DeriveConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("DERIVE_OUT_OF_RANGE") {
            config.out_of_range = OutOfRangePolicy::from_str(&val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.epsilon > 0.0 && self.epsilon < 1.0) {
            return Err("epsilon must be in (0, 1)".to_string());
        }

        Ok(())
    }
}
