//! Trial sites and candidate forecast sites.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MetError, MetResult};

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A location of interest that forecasts are produced for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSite {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Ground elevation in metres.
    pub elevation_m: f64,
}

impl TrialSite {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64, elevation_m: f64) -> MetResult<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(MetError::InvalidCoordinate {
                field: "lat".to_string(),
                value: lat,
            });
        }
        if !(-180.0..=360.0).contains(&lon) {
            return Err(MetError::InvalidCoordinate {
                field: "lon".to_string(),
                value: lon,
            });
        }
        Ok(Self {
            name: name.into(),
            lat,
            lon,
            elevation_m,
        })
    }

    /// Name with spaces replaced, for file and directory names.
    pub fn file_stem(&self) -> String {
        self.name.replace(' ', "_")
    }
}

/// A nearby site returned by site selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteCandidate {
    pub code: String,
    pub distance_km: f64,
    pub elevation_m: f64,
    pub preferred: bool,
}

/// Candidate site name to candidate details.
pub type SiteCandidates = BTreeMap<String, SiteCandidate>;

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
