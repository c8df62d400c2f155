//! One forecasting run over a set of trial sites.
//!
//! Site selection and publishing are isolated per site: a site that fails
//! either step is counted and skipped while the others carry on. Collection
//! and reduction run once for every surviving site together.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use ensemble_engine::{
    plan_batches, plan_window, reduce, Collector, CollectorOutput, FailureRecord, FieldSource,
    ProbabilityField, ProbabilityReport, Reduction, ReportSink, RunSummary, SiteLabel, SiteReport,
    SiteTarget,
};
use met_common::{truncate_to_hour, SiteCandidates, TimeWindow, TrialSite};

use crate::config::ForecasterConfig;
use crate::observations::ObservationFeed;
use crate::sites::SiteSelector;

/// Wires a field source, a site selector and a report sink together.
pub struct Forecaster {
    config: ForecasterConfig,
    source: Arc<dyn FieldSource>,
    selector: Arc<dyn SiteSelector>,
    sink: Arc<dyn ReportSink>,
    feed: Option<ObservationFeed>,
}

/// A trial site that passed selection.
struct SelectedSite {
    trial: TrialSite,
    candidates: SiteCandidates,
}

impl Forecaster {
    pub fn new(
        config: ForecasterConfig,
        source: Arc<dyn FieldSource>,
        selector: Arc<dyn SiteSelector>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            config,
            source,
            selector,
            sink,
            feed: None,
        }
    }

    /// Attach a site-forecast feed; candidate sites then get plain series.
    pub fn with_observations(mut self, feed: ObservationFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    /// Plan the window for a run starting at `now`.
    pub fn window(&self, now: DateTime<Utc>) -> Result<TimeWindow> {
        let requested = TimeWindow::hours_from(truncate_to_hour(now), self.config.window_hours)
            .context("Invalid requested window")?;
        plan_window(now, &requested, &self.config.batches).context("Failed to plan window")
    }

    /// Run once for `sites` and publish one report per site.
    #[instrument(skip_all, fields(now = %now, sites = sites.len()))]
    pub async fn run(&self, now: DateTime<Utc>, sites: &[TrialSite]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let selected = self.select_sites(sites, &mut summary);
        if selected.is_empty() {
            warn!("No trial sites survived selection");
            return Ok(summary);
        }

        let window = self.window(now)?;
        let batches = plan_batches(now, &window, &self.config.batches);
        info!(
            start = %window.start,
            end = %window.end,
            batches = batches.len(),
            "Planned run"
        );

        let targets: Vec<SiteTarget> = selected
            .iter()
            .map(|s| {
                let point = self.config.rotated_pole.geo_to_rotated(s.trial.lat, s.trial.lon);
                SiteTarget::new(s.trial.name.clone(), point)
            })
            .collect();

        let collector = Collector::new(self.source.clone(), self.config.derive.clone())
            .with_fetch_concurrency(self.config.fetch_concurrency);
        let mut collected = collector.collect(&batches, &targets, window).await;
        summary.batches_completed = collected.batches_completed;
        summary.batches_lost = collected.batches_lost;
        summary.fragments = collected.fragments.len();

        // Site reports only need the failures once the fragments are reduced
        let fragments = std::mem::take(&mut collected.fragments);
        let catalogue = self.config.thresholds.clone();
        let reduction = tokio::task::spawn_blocking(move || reduce(&fragments, &catalogue))
            .await
            .context("Reducer stopped")?;

        summary.buckets = reduction.buckets.len();
        summary.probability_fields = reduction.fields.len();
        summary.add_failures(&collected.failures);
        summary.add_failures(&reduction.failures);

        for site in &selected {
            let report = self.site_report(site, now, window, &collected, &reduction);
            match self.publish(&report).await {
                Ok(()) => summary.sites_reported += 1,
                Err(e) => {
                    error!(site = %site.trial.name, error = %e, "Failed to publish site report");
                    summary.sites_failed += 1;
                }
            }
        }

        summary.log();
        Ok(summary)
    }

    fn select_sites(&self, sites: &[TrialSite], summary: &mut RunSummary) -> Vec<SelectedSite> {
        sites
            .iter()
            .filter_map(|trial| match self.selector.candidates(trial, self.config.radius_km) {
                Ok(candidates) => Some(SelectedSite {
                    trial: trial.clone(),
                    candidates,
                }),
                Err(e) => {
                    warn!(site = %trial.name, error = %e, "Skipping trial site");
                    summary.sites_failed += 1;
                    None
                }
            })
            .collect()
    }

    #[instrument(skip_all, fields(site = %site.trial.name))]
    fn site_report(
        &self,
        site: &SelectedSite,
        now: DateTime<Utc>,
        window: TimeWindow,
        collected: &CollectorOutput,
        reduction: &Reduction,
    ) -> SiteReport {
        let name = &site.trial.name;
        let label = SiteLabel {
            name: name.clone(),
            trial: name.clone(),
            elevation_m: site.trial.elevation_m,
            distance_km: 0.0,
            preferred: true,
        };

        let fields: Vec<ProbabilityField> = reduction.fields_for(name).cloned().collect();
        let probabilities: Vec<ProbabilityReport> = self
            .config
            .thresholds
            .iter()
            .flat_map(|set| ProbabilityReport::from_fields(&label, set, &fields))
            .collect();

        let series = match &self.feed {
            Some(feed) => site
                .candidates
                .iter()
                .flat_map(|(candidate_name, candidate)| {
                    let candidate_label = SiteLabel {
                        name: candidate_name.clone(),
                        trial: name.clone(),
                        elevation_m: candidate.elevation_m,
                        distance_km: candidate.distance_km,
                        preferred: candidate.preferred,
                    };
                    feed.series(&candidate.code, &window, &candidate_label)
                })
                .collect(),
            None => Vec::new(),
        };

        let failures: Vec<FailureRecord> = collected
            .failures
            .records()
            .iter()
            .chain(reduction.failures.records())
            .filter(|r| r.site.as_deref().map_or(true, |s| s == name))
            .cloned()
            .collect();

        info!(
            probabilities = probabilities.len(),
            series = series.len(),
            failures = failures.len(),
            "Built site report"
        );

        SiteReport {
            site: label,
            generated_at: now,
            window,
            probabilities,
            series,
            failures,
        }
    }

    #[instrument(skip_all, fields(site = %report.site.name))]
    async fn publish(&self, report: &SiteReport) -> ensemble_engine::Result<()> {
        self.sink.publish(report).await
    }
}
