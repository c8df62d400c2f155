//! Forecaster configuration.
//!
//! Loaded from YAML with `${VAR}` / `${VAR:-default}` substitution, then
//! overridden by `FORECASTER_*` environment variables.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use ensemble_engine::{BatchConfig, ThresholdCatalogue};
use met_common::TrialSite;
use met_derive::{DeriveConfig, RotatedPole};

use crate::sites::CatalogueSite;

/// Top-level forecaster configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecasterConfig {
    /// Root of the local source tree
    pub input_dir: PathBuf,

    /// Directory site reports are written to
    pub output_dir: PathBuf,

    /// Requested forecast window length (hours from now)
    pub window_hours: i64,

    /// Site-selection search radius (km)
    pub radius_km: f64,

    pub trial_sites: Vec<TrialSite>,

    /// Sites known to the site-forecast feed
    pub site_catalogue: Vec<CatalogueSite>,

    /// Model grid rotated pole
    pub rotated_pole: RotatedPole,

    pub batches: BatchConfig,

    pub thresholds: ThresholdCatalogue,

    pub derive: DeriveConfig,

    /// Members fetched concurrently per batch
    pub fetch_concurrency: usize,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./data/ensemble"),
            output_dir: PathBuf::from("./reports"),
            window_hours: 48,
            radius_km: 5.0,
            trial_sites: Vec::new(),
            site_catalogue: Vec::new(),
            rotated_pole: RotatedPole::default(),
            batches: BatchConfig::default(),
            thresholds: ThresholdCatalogue::default(),
            derive: DeriveConfig::default(),
            fetch_concurrency: 4,
        }
    }
}

impl ForecasterConfig {
    /// Load a YAML file, apply environment overrides and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
        let expanded = expand_env_vars(&content)?;
        let mut config: Self = serde_yaml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config from {:?}", path.as_ref()))?;
        config.apply_env();
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid config {:?}: {}", path.as_ref(), e))?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(val) = env::var("FORECASTER_INPUT_DIR") {
            self.input_dir = PathBuf::from(val);
        }

        if let Ok(val) = env::var("FORECASTER_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(val);
        }

        if let Ok(val) = env::var("FORECASTER_WINDOW_HOURS") {
            if let Ok(hours) = val.parse() {
                self.window_hours = hours;
            }
        }

        if let Ok(val) = env::var("FORECASTER_RADIUS_KM") {
            if let Ok(km) = val.parse() {
                self.radius_km = km;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_hours <= 0 {
            return Err("window_hours must be > 0".to_string());
        }
        if self.radius_km.is_nan() || self.radius_km <= 0.0 {
            return Err("radius_km must be > 0".to_string());
        }
        if self.fetch_concurrency == 0 {
            return Err("fetch_concurrency must be > 0".to_string());
        }
        for site in &self.trial_sites {
            TrialSite::new(site.name.clone(), site.lat, site.lon, site.elevation_m)
                .map_err(|e| format!("trial site {}: {}", site.name, e))?;
        }
        self.batches.validate()?;
        self.thresholds.validate()?;
        self.derive.validate()?;
        Ok(())
    }

    /// Trial sites, optionally restricted to one name.
    pub fn selected_sites(&self, only: Option<&str>) -> Vec<TrialSite> {
        self.trial_sites
            .iter()
            .filter(|s| only.map_or(true, |name| s.name.eq_ignore_ascii_case(name)))
            .cloned()
            .collect()
    }
}

/// Expand `${VAR}` and `${VAR:-default}` in YAML content.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }
            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ForecasterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_hours, 48);
        assert_eq!(config.radius_km, 5.0);
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = ForecasterConfig {
            window_hours: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("FORECASTER_TEST_UNSET");
        let result = expand_env_vars("dir: ${FORECASTER_TEST_UNSET:-/tmp/in}").unwrap();
        assert_eq!(result, "dir: /tmp/in");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        std::env::remove_var("FORECASTER_TEST_REQUIRED");
        assert!(expand_env_vars("${FORECASTER_TEST_REQUIRED}").is_err());
    }

    #[test]
    fn test_expand_env_vars_set() {
        std::env::set_var("FORECASTER_TEST_SET", "/data");
        assert_eq!(expand_env_vars("${FORECASTER_TEST_SET}/x").unwrap(), "/data/x");
    }

    #[test]
    fn test_yaml_partial_config() {
        let yaml = r#"
window_hours: 24
trial_sites:
  - name: Leeming
    lat: 54.2925
    lon: -1.535556
    elevation_m: 40.0
thresholds:
  wind_speed:
    variable: wind_speed
    thresholds:
      - { value: 10.0, comparison: at_or_above }
      - { value: 20.0, comparison: at_or_above }
    lower_bound: 0.0
    upper_bound: 80.0
"#;
        let config: ForecasterConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_hours, 24);
        assert_eq!(config.trial_sites[0].name, "Leeming");
        assert_eq!(config.batches, BatchConfig::default());
        let wind = config.thresholds.get(met_common::Variable::WindSpeed).unwrap();
        assert_eq!(wind.len(), 2);
        assert!(config.thresholds.get(met_common::Variable::Visibility).is_none());
    }

    #[test]
    fn test_selected_sites() {
        let config = ForecasterConfig {
            trial_sites: vec![
                TrialSite::new("Leeming", 54.2925, -1.535556, 40.0).unwrap(),
                TrialSite::new("Waddington", 53.1725, -0.530833, 70.0).unwrap(),
            ],
            ..Default::default()
        };
        assert_eq!(config.selected_sites(None).len(), 2);
        assert_eq!(config.selected_sites(Some("waddington"))[0].name, "Waddington");
    }
}
