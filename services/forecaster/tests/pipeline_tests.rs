//! End-to-end runs over a local source tree written to a temp directory.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ensemble_engine::{Band, BatchConfig, EngineError, ReportSink, SiteReport};
use forecaster::{
    CatalogueSelector, CatalogueSite, Forecaster, ForecasterConfig, JsonReportSink, LocalJsonSource,
    ObservationFeed,
};
use met_common::{TrialSite, Variable};
use met_derive::{RotatedPole, SitePoint};
use test_utils::fixtures;

const CATALOGUE_CODE: &str = "03999";

/// Trial site at the centre of the fixture grid.
fn trial() -> TrialSite {
    let (lat, lon) = RotatedPole::default().rotated_to_geo(&SitePoint::new(0.0, 0.0));
    TrialSite::new("Test Trial", lat, lon, 90.0).unwrap()
}

fn far_away() -> TrialSite {
    TrialSite::new("Nowhere", 0.0, 0.0, 0.0).unwrap()
}

fn catalogue() -> Vec<CatalogueSite> {
    let site = trial();
    vec![CatalogueSite {
        code: CATALOGUE_CODE.to_string(),
        name: "Test Catalogue".to_string(),
        lat: site.lat,
        lon: site.lon,
        elevation_m: 95.0,
    }]
}

fn now() -> DateTime<Utc> {
    fixtures::issue_time() + Duration::minutes(30)
}

fn write_members(root: &Path, members: u32) {
    for (i, (surface, model)) in fixtures::ensemble_files(members, 4).iter().enumerate() {
        let member = i as u32 + 1;
        fixtures::write_source_file(root, member, surface);
        fixtures::write_source_file(root, member, model);
    }
}

fn config(input: &Path, output: &Path) -> ForecasterConfig {
    ForecasterConfig {
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        window_hours: 3,
        trial_sites: vec![trial(), far_away()],
        site_catalogue: catalogue(),
        batches: BatchConfig {
            recency_offsets_hours: vec![0],
            ..Default::default()
        },
        ..Default::default()
    }
}

fn forecaster(config: ForecasterConfig) -> Forecaster {
    let source = Arc::new(LocalJsonSource::new(config.input_dir.clone()));
    let selector = Arc::new(CatalogueSelector::new(config.site_catalogue.clone()));
    let sink = Arc::new(JsonReportSink::new(config.output_dir.clone()));
    Forecaster::new(config, source, selector, sink)
}

fn read_report(output: &Path) -> SiteReport {
    let path = output.join("Test_Trial").join("Test_Trial_20240115T0000Z.json");
    let bytes = std::fs::read(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e));
    serde_json::from_slice(&bytes).unwrap()
}

fn feed_line(hour: u32) -> String {
    let mut cols = vec![String::new(); 35];
    cols[0] = CATALOGUE_CODE.to_string();
    cols[1] = format!("15-01-2024 {:02}:00", hour);
    cols[3] = "1.5".to_string();
    cols[4] = "10".to_string();
    cols[7] = "4000".to_string();
    cols.join(",")
}

// ============================================================================
// Full run
// ============================================================================

#[tokio::test]
async fn test_run_writes_report_for_selected_site() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_members(input.path(), 3);

    let forecaster = forecaster(config(input.path(), output.path()));
    let sites = forecaster.config().trial_sites.clone();
    let summary = forecaster.run(now(), &sites).await.unwrap();

    assert_eq!(summary.sites_reported, 1);
    assert_eq!(summary.sites_failed, 1);
    assert_eq!(summary.batches_completed, 1);
    assert_eq!(summary.batches_lost, 0);
    assert!(summary.fragments > 0);
    assert!(summary.buckets > 0);
    assert!(summary.probability_fields > 0);

    let report = read_report(output.path());
    assert_eq!(report.site.name, "Test Trial");
    assert_eq!(report.window, fixtures::window(0, 3));
    assert!(report.series.is_empty());

    let configured: usize = forecaster.config().thresholds.iter().map(|s| s.len()).sum();
    assert_eq!(report.probabilities.len(), configured);

    let wind: Vec<_> = report
        .probabilities
        .iter()
        .filter(|p| p.variable == Variable::WindSpeed)
        .collect();
    assert!(!wind.is_empty());
    for p in &wind {
        assert_eq!(p.points.len(), 3 * fixtures::MODEL_LEVELS as usize);
        assert!(p.points.iter().all(|pt| pt.members == 3 && pt.probability == 0.0));
        assert!(p.caption.ends_with("Distance from Test Trial: 0.00km"));
    }
}

#[tokio::test]
async fn test_run_without_source_tree_still_publishes() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let forecaster = forecaster(config(input.path(), output.path()));
    let summary = forecaster.run(now(), &[trial()]).await.unwrap();

    assert_eq!(summary.sites_reported, 1);
    assert_eq!(summary.fragments, 0);
    let report = read_report(output.path());
    assert!(report.probabilities.iter().all(|p| p.points.is_empty()));
    assert!(report.failures.iter().any(|f| f.source.as_deref() == Some("20240115T0000Z")));
}

// ============================================================================
// Site isolation
// ============================================================================

#[tokio::test]
async fn test_no_selected_sites_skips_collection() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_members(input.path(), 2);

    let forecaster = forecaster(config(input.path(), output.path()));
    let summary = forecaster.run(now(), &[far_away()]).await.unwrap();

    assert_eq!(summary.sites_failed, 1);
    assert_eq!(summary.sites_reported, 0);
    assert_eq!(summary.batches_completed, 0);
    assert!(!output.path().join("Nowhere").exists());
}

struct RejectingSink;

#[async_trait]
impl ReportSink for RejectingSink {
    async fn publish(&self, _report: &SiteReport) -> ensemble_engine::Result<()> {
        Err(EngineError::sink("disk full"))
    }
}

#[tokio::test]
async fn test_sink_failure_counts_site_as_failed() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_members(input.path(), 2);

    let config = config(input.path(), output.path());
    let forecaster = Forecaster::new(
        config.clone(),
        Arc::new(LocalJsonSource::new(config.input_dir.clone())),
        Arc::new(CatalogueSelector::new(config.site_catalogue.clone())),
        Arc::new(RejectingSink),
    );
    let summary = forecaster.run(now(), &[trial()]).await.unwrap();

    assert_eq!(summary.sites_reported, 0);
    assert_eq!(summary.sites_failed, 1);
    assert_eq!(summary.batches_completed, 1);
}

// ============================================================================
// Site-forecast feed
// ============================================================================

#[tokio::test]
async fn test_feed_series_for_candidates() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_members(input.path(), 2);

    let csv = [feed_line(1), feed_line(2), feed_line(5)].join("\n");
    let feed = ObservationFeed::from_reader(csv.as_bytes()).unwrap();
    let forecaster = forecaster(config(input.path(), output.path())).with_observations(feed);
    forecaster.run(now(), &[trial()]).await.unwrap();

    let report = read_report(output.path());
    assert_eq!(report.series.len(), 10);
    assert!(report.series.iter().all(|s| s.points.len() == 2));
    assert!(report.series.iter().all(|s| s.site.name == "Test Catalogue" && s.site.preferred));

    let wind = report
        .series
        .iter()
        .find(|s| s.variable == Variable::WindSpeed)
        .unwrap();
    // 10 m/s is about 19.4 kt
    assert_eq!(wind.points[0].band, Some(Band::Red));
    assert!(wind.caption.starts_with("Wind means. Elevation of site: 95 m."));

    let visibility = report
        .series
        .iter()
        .find(|s| s.variable == Variable::Visibility)
        .unwrap();
    assert_eq!(visibility.points[0].band, Some(Band::Green));
}
