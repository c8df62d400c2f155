//! Threshold probability aggregation.
//!
//! For each bucket level and threshold, the probability is the percentage of
//! members with a value there that satisfy the comparison. A level no member
//! reaches yields no field at all, never a zero.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use met_common::{LevelDescriptor, Variable};

use crate::alignment::AlignedHourBucket;
use crate::failure::{FailureKind, FailureLog, FailureRecord};
use crate::threshold::{Comparison, ThresholdCatalogue, ThresholdSet};

/// Probability of one threshold at one site, hour and level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityField {
    pub site: String,
    pub variable: Variable,
    pub threshold: f64,
    pub comparison: Comparison,
    pub hour: DateTime<Utc>,
    pub level: LevelDescriptor,
    pub height_agl_ft: f64,
    /// Percentage in `[0, 100]`
    pub probability: f64,
    /// Members contributing at this level
    pub members: usize,
}

/// Percentage of `values` satisfying `comparison` against `threshold`.
///
/// `None` when there are no values.
pub fn member_fraction(values: &[f64], threshold: f64, comparison: Comparison) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let hits = values.iter().filter(|v| comparison.holds(**v, threshold)).count();
    Some(100.0 * hits as f64 / values.len() as f64)
}

/// Probability fields for one bucket, one per (threshold, level).
///
/// The denominator is counted per level: a member with no value at a level
/// (its profile does not reach that height) is left out of that level rather
/// than counted as missing the threshold. `members` on each field records the
/// count actually used, which can be below `bucket.member_count()`.
pub fn probabilities(bucket: &AlignedHourBucket, set: &ThresholdSet) -> (Vec<ProbabilityField>, FailureLog) {
    let mut fields = Vec::with_capacity(set.len() * bucket.levels.len());
    let mut failures = FailureLog::new();

    for (idx, level) in bucket.levels.iter().enumerate() {
        let values = bucket.values_at(idx);
        if values.is_empty() {
            failures.record(
                FailureRecord::new(
                    FailureKind::EmptyBucket,
                    format!("no member values at {}", level.level),
                )
                .site(&bucket.site)
                .variable(bucket.variable)
                .hour(bucket.hour),
            );
            continue;
        }

        for threshold in &set.thresholds {
            let Some(probability) = member_fraction(&values, threshold.value, threshold.comparison) else {
                continue;
            };
            fields.push(ProbabilityField {
                site: bucket.site.clone(),
                variable: bucket.variable,
                threshold: threshold.value,
                comparison: threshold.comparison,
                hour: bucket.hour,
                level: level.level,
                height_agl_ft: level.height_agl_ft,
                probability,
                members: values.len(),
            });
        }
    }
    (fields, failures)
}

/// Aggregated fields across many buckets.
#[derive(Debug, Clone, Default)]
pub struct AggregateOutput {
    pub fields: Vec<ProbabilityField>,
    pub failures: FailureLog,
}

/// Compute fields for every bucket whose variable has thresholds.
///
/// Buckets are independent, so they are evaluated in parallel and merged
/// in bucket order.
pub fn aggregate(buckets: &[AlignedHourBucket], catalogue: &ThresholdCatalogue) -> AggregateOutput {
    let per_bucket: Vec<(Vec<ProbabilityField>, FailureLog)> = buckets
        .par_iter()
        .filter_map(|bucket| catalogue.get(bucket.variable).map(|set| probabilities(bucket, set)))
        .collect();

    let mut output = AggregateOutput::default();
    for (fields, failures) in per_bucket {
        output.fields.extend(fields);
        output.failures.extend(failures);
    }
    debug!(
        buckets = buckets.len(),
        fields = output.fields.len(),
        "Aggregated probabilities"
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_fraction() {
        let values = [10.0, 16.0, 20.0];
        let p = member_fraction(&values, 12.0, Comparison::AtOrAbove).unwrap();
        assert!((p - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(member_fraction(&values, 25.0, Comparison::AtOrAbove), Some(0.0));
        assert_eq!(member_fraction(&values, 10.0, Comparison::AtOrAbove), Some(100.0));
    }

    #[test]
    fn test_no_values_no_fraction() {
        assert_eq!(member_fraction(&[], 12.0, Comparison::AtOrAbove), None);
    }
}
