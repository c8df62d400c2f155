//! Reporting boundary.
//!
//! The engine hands finished, labelled data to a [`ReportSink`]; plotting and
//! page assembly happen on the other side.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use met_common::{LevelDescriptor, TimeWindow, Units, Variable};

use crate::error::Result;
use crate::failure::{FailureKind, FailureLog, FailureRecord};
use crate::probability::ProbabilityField;
use crate::threshold::{Band, Comparison, ThresholdSet};

/// Who a series or probability field describes, for captions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteLabel {
    pub name: String,
    /// Trial site the report is for
    pub trial: String,
    pub elevation_m: f64,
    pub distance_km: f64,
    pub preferred: bool,
}

impl SiteLabel {
    /// e.g. "Wind speed. Elevation of site: 132 m. Distance from Larkhill: 0.00km"
    pub fn caption(&self, param: &str) -> String {
        format!(
            "{}. Elevation of site: {} m. Distance from {}: {:.2}km",
            param, self.elevation_m as i64, self.trial, self.distance_km
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityPoint {
    pub hour: DateTime<Utc>,
    pub level: LevelDescriptor,
    pub height_agl_ft: f64,
    pub probability: f64,
    pub members: usize,
}

/// One threshold's probabilities over hours and levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityReport {
    pub variable: Variable,
    pub threshold: f64,
    pub comparison: Comparison,
    pub units: Units,
    pub label: String,
    pub caption: String,
    /// Sorted by hour, then level
    pub points: Vec<ProbabilityPoint>,
}

impl ProbabilityReport {
    /// One report per threshold of `set`, from one site's fields.
    ///
    /// Thresholds with no fields still produce an empty report so every
    /// configured threshold is accounted for.
    pub fn from_fields(site: &SiteLabel, set: &ThresholdSet, fields: &[ProbabilityField]) -> Vec<Self> {
        set.thresholds
            .iter()
            .map(|threshold| {
                let mut points: Vec<ProbabilityPoint> = fields
                    .iter()
                    .filter(|f| {
                        f.variable == set.variable
                            && f.threshold == threshold.value
                            && f.comparison == threshold.comparison
                    })
                    .map(|f| ProbabilityPoint {
                        hour: f.hour,
                        level: f.level,
                        height_agl_ft: f.height_agl_ft,
                        probability: f.probability,
                        members: f.members,
                    })
                    .collect();
                points.sort_by(|a, b| a.hour.cmp(&b.hour).then(a.level.cmp(&b.level)));

                let label = threshold.label(set.variable);
                Self {
                    variable: set.variable,
                    threshold: threshold.value,
                    comparison: threshold.comparison,
                    units: set.variable.output_units(),
                    caption: site.caption(&label),
                    label,
                    points,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPoint {
    pub time: DateTime<Utc>,
    /// `None` where the feed had no usable value
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<Band>,
}

/// A plain series with no probability transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesReport {
    pub site: SiteLabel,
    pub variable: Variable,
    pub units: Units,
    pub caption: String,
    pub points: Vec<ReportPoint>,
}

/// Everything published for one trial site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteReport {
    pub site: SiteLabel,
    pub generated_at: DateTime<Utc>,
    pub window: TimeWindow,
    pub probabilities: Vec<ProbabilityReport>,
    pub series: Vec<SeriesReport>,
    pub failures: Vec<FailureRecord>,
}

/// Consumer of finished site reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn publish(&self, report: &SiteReport) -> Result<()>;
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub sites_reported: usize,
    pub sites_failed: usize,
    pub batches_completed: usize,
    pub batches_lost: usize,
    pub fragments: usize,
    pub buckets: usize,
    pub probability_fields: usize,
    pub failures: BTreeMap<FailureKind, usize>,
}

impl RunSummary {
    pub fn add_failures(&mut self, log: &FailureLog) {
        for (kind, count) in log.counts() {
            *self.failures.entry(kind).or_insert(0) += count;
        }
    }

    pub fn failure_count(&self, kind: FailureKind) -> usize {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    pub fn log(&self) {
        info!(
            sites_reported = self.sites_reported,
            sites_failed = self.sites_failed,
            batches_completed = self.batches_completed,
            batches_lost = self.batches_lost,
            fragments = self.fragments,
            buckets = self.buckets,
            probability_fields = self.probability_fields,
            fetch_gaps = self.failure_count(FailureKind::FetchGap),
            compute_failures = self.failure_count(FailureKind::ComputeFailure),
            empty_buckets = self.failure_count(FailureKind::EmptyBucket),
            out_of_range = self.failure_count(FailureKind::OutOfRangeResult),
            "Run complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::Threshold;
    use chrono::TimeZone;

    fn label() -> SiteLabel {
        SiteLabel {
            name: "Boscombe Down".to_string(),
            trial: "Larkhill".to_string(),
            elevation_m: 125.7,
            distance_km: 3.4567,
            preferred: true,
        }
    }

    #[test]
    fn test_caption() {
        assert_eq!(
            label().caption("Wind gust"),
            "Wind gust. Elevation of site: 125 m. Distance from Larkhill: 3.46km"
        );
    }

    #[test]
    fn test_reports_group_by_threshold() {
        let hour = |h| Utc.with_ymd_and_hms(2024, 1, 15, h, 0, 0).unwrap();
        let field = |h, threshold, probability| ProbabilityField {
            site: "Larkhill".to_string(),
            variable: Variable::WindSpeed,
            threshold,
            comparison: Comparison::AtOrAbove,
            hour: hour(h),
            level: LevelDescriptor::ModelLevel(1),
            height_agl_ft: 65.6,
            probability,
            members: 3,
        };
        let set = ThresholdSet::new(
            Variable::WindSpeed,
            vec![Threshold::above(12.0), Threshold::above(25.0)],
            0.0,
            100.0,
        )
        .unwrap();
        let fields = vec![field(2, 12.0, 50.0), field(1, 12.0, 100.0), field(1, 25.0, 0.0)];

        let reports = ProbabilityReport::from_fields(&label(), &set, &fields);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].points.len(), 2);
        assert_eq!(reports[0].points[0].hour, hour(1));
        assert_eq!(reports[0].label, "Probability of wind speed exceeding 12 knots");
        assert!(reports[0].caption.ends_with("Distance from Larkhill: 3.46km"));
        assert_eq!(reports[1].points.len(), 1);
    }

    #[test]
    fn test_summary_failure_counts() {
        let mut log = FailureLog::new();
        log.record(FailureRecord::new(FailureKind::FetchGap, "missing"));
        let mut summary = RunSummary::default();
        summary.add_failures(&log);
        summary.add_failures(&log);
        assert_eq!(summary.failure_count(FailureKind::FetchGap), 2);
        assert_eq!(summary.failure_count(FailureKind::EmptyBucket), 0);
    }
}
