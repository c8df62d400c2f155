//! Site selection.
//!
//! Maps a trial site to nearby candidate forecast sites. The engine only uses
//! the result for labelling, so the lookup is a plain trait.

use serde::{Deserialize, Serialize};
use tracing::debug;

use ensemble_engine::EngineError;
use met_common::{haversine_km, SiteCandidate, SiteCandidates, TrialSite};

/// A site known to the site-forecast feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueSite {
    /// Code used in the feed's first column
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub elevation_m: f64,
}

/// Candidate lookup contract.
pub trait SiteSelector: Send + Sync {
    /// Candidates within `radius_km` of `trial`, exactly one of them preferred.
    ///
    /// No candidate at all is an error for that trial site.
    fn candidates(&self, trial: &TrialSite, radius_km: f64) -> Result<SiteCandidates, EngineError>;
}

/// Selector over a fixed catalogue, by great-circle distance.
#[derive(Debug, Clone, Default)]
pub struct CatalogueSelector {
    sites: Vec<CatalogueSite>,
}

impl CatalogueSelector {
    pub fn new(sites: Vec<CatalogueSite>) -> Self {
        Self { sites }
    }
}

impl SiteSelector for CatalogueSelector {
    fn candidates(&self, trial: &TrialSite, radius_km: f64) -> Result<SiteCandidates, EngineError> {
        let mut nearby: Vec<(&CatalogueSite, f64)> = self
            .sites
            .iter()
            .map(|s| (s, haversine_km(trial.lat, trial.lon, s.lat, s.lon)))
            .filter(|(_, d)| *d <= radius_km)
            .collect();

        if nearby.is_empty() {
            return Err(EngineError::NoSiteCandidates {
                site: trial.name.clone(),
            });
        }

        // closest first, then closest in elevation
        nearby.sort_by(|(a, da), (b, db)| {
            da.total_cmp(db).then_with(|| {
                let ea = (a.elevation_m - trial.elevation_m).abs();
                let eb = (b.elevation_m - trial.elevation_m).abs();
                ea.total_cmp(&eb)
            })
        });

        let candidates: SiteCandidates = nearby
            .iter()
            .enumerate()
            .map(|(i, (site, distance))| {
                (
                    site.name.clone(),
                    SiteCandidate {
                        code: site.code.clone(),
                        distance_km: *distance,
                        elevation_m: site.elevation_m,
                        preferred: i == 0,
                    },
                )
            })
            .collect();

        debug!(trial = %trial.name, candidates = candidates.len(), "Selected sites");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(code: &str, name: &str, lat: f64, lon: f64, elevation_m: f64) -> CatalogueSite {
        CatalogueSite {
            code: code.to_string(),
            name: name.to_string(),
            lat,
            lon,
            elevation_m,
        }
    }

    fn leeming() -> TrialSite {
        TrialSite::new("Leeming", 54.2925, -1.535556, 40.0).unwrap()
    }

    #[test]
    fn test_closest_is_preferred() {
        let selector = CatalogueSelector::new(vec![
            site("03257", "Leeming", 54.2925, -1.535556, 32.0),
            site("03265", "Topcliffe", 54.2058, -1.3822, 28.0),
            site("03162", "Eskdalemuir", 55.3115, -3.2059, 242.0),
        ]);

        let candidates = selector.candidates(&leeming(), 15.0).unwrap();

        assert_eq!(candidates.len(), 2);
        assert!(candidates["Leeming"].preferred);
        assert!(!candidates["Topcliffe"].preferred);
        assert!(candidates["Topcliffe"].distance_km > 10.0);
    }

    #[test]
    fn test_distance_tie_broken_by_elevation() {
        let selector = CatalogueSelector::new(vec![
            site("A", "Hill", 54.2925, -1.535556, 300.0),
            site("B", "Valley", 54.2925, -1.535556, 45.0),
        ]);

        let candidates = selector.candidates(&leeming(), 5.0).unwrap();

        assert!(candidates["Valley"].preferred);
        assert!(!candidates["Hill"].preferred);
    }

    #[test]
    fn test_no_candidates_is_an_error() {
        let selector = CatalogueSelector::new(vec![site("03162", "Eskdalemuir", 55.3115, -3.2059, 242.0)]);
        let result = selector.candidates(&leeming(), 5.0);
        assert!(matches!(result, Err(EngineError::NoSiteCandidates { site }) if site == "Leeming"));
    }
}
