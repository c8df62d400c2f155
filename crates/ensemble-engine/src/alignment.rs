//! Time alignment and merge.
//!
//! Series are reduced to one value set per hour, grouped by
//! `(site, variable, hour)` and merged across members onto the levels of a
//! reference contribution:
//!
//! ```text
//!   VariableSeries (member A) ──┐  hourly reduction   ┌─> AlignedHourBucket
//!   VariableSeries (member B) ──┼─────────────────────┤    (site, var, hour)
//!   VariableSeries (member C) ──┘  level matching     └─> ...
//! ```
//!
//! Hourly reduction keeps the earliest valid time in each hour. Precipitation
//! instead takes the maximum of each five-minute sub-window, then the maximum
//! of those per hour.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use met_common::{truncate_to_hour, truncate_to_minutes, LevelDescriptor, LevelValue, MemberId, Variable};
use met_derive::linear_interpolate;

use crate::error::EngineError;
use crate::failure::{FailureKind, FailureLog, FailureRecord};
use crate::series::{SeriesSet, VariableSeries};

/// Width of the precipitation sub-windows.
pub const SUB_HOURLY_MINUTES: i64 = 5;

/// One member run's contribution: cycles are distinct contributors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContributionKey {
    pub member: MemberId,
    pub issue_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct BucketKey {
    site: String,
    variable: Variable,
    hour: DateTime<Utc>,
}

/// A level of the reference contribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketLevel {
    pub level: LevelDescriptor,
    pub height_agl_ft: f64,
}

/// All member contributions for one site, variable and hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedHourBucket {
    pub site: String,
    pub variable: Variable,
    pub hour: DateTime<Utc>,
    pub levels: Vec<BucketLevel>,
    /// One entry per level of `levels`; `None` where the member has no value there
    pub members: BTreeMap<ContributionKey, Vec<Option<f64>>>,
}

impl AlignedHourBucket {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Values of every member with data at level index `idx`.
    pub fn values_at(&self, idx: usize) -> Vec<f64> {
        self.members
            .values()
            .filter_map(|values| values.get(idx).copied().flatten())
            .collect()
    }
}

/// Buckets plus the failures met while matching levels.
#[derive(Debug, Clone, Default)]
pub struct AlignmentOutput {
    pub buckets: Vec<AlignedHourBucket>,
    pub failures: FailureLog,
}

/// Reduce a series to one level set per hour.
pub fn hourly_values(series: &VariableSeries) -> BTreeMap<DateTime<Utc>, Vec<LevelValue>> {
    if series.key.variable.uses_sub_hourly_maxima() {
        let sub_hourly = max_by_window(
            series
                .points
                .iter()
                .map(|(t, p)| (truncate_to_minutes(*t, SUB_HOURLY_MINUTES), p.levels.as_slice())),
        );
        let hourly = max_by_window(
            sub_hourly
                .iter()
                .map(|(t, levels)| (truncate_to_hour(*t), levels.as_slice())),
        );
        return hourly;
    }

    let mut hourly: BTreeMap<DateTime<Utc>, Vec<LevelValue>> = BTreeMap::new();
    for (valid_time, point) in &series.points {
        hourly
            .entry(truncate_to_hour(*valid_time))
            .or_insert_with(|| point.levels.clone());
    }
    hourly
}

/// Per-level maximum of every entry sharing a window start.
fn max_by_window<'a>(
    entries: impl Iterator<Item = (DateTime<Utc>, &'a [LevelValue])>,
) -> BTreeMap<DateTime<Utc>, Vec<LevelValue>> {
    let mut windows: BTreeMap<DateTime<Utc>, BTreeMap<LevelDescriptor, LevelValue>> = BTreeMap::new();
    for (start, levels) in entries {
        let window = windows.entry(start).or_default();
        for lv in levels {
            window
                .entry(lv.level)
                .and_modify(|cur| {
                    if lv.value > cur.value {
                        *cur = *lv;
                    }
                })
                .or_insert(*lv);
        }
    }
    windows
        .into_iter()
        .map(|(start, levels)| (start, levels.into_values().collect()))
        .collect()
}

/// Value of `levels` at a reference level: same descriptor, else linear in height.
fn value_at(levels: &[LevelValue], target: &BucketLevel) -> Option<f64> {
    if let Some(lv) = levels.iter().find(|lv| lv.level == target.level) {
        return Some(lv.value);
    }
    if levels.len() < 2 {
        return None;
    }
    let heights: Vec<f64> = levels.iter().map(|lv| lv.height_agl_ft).collect();
    let lo = heights.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = heights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if target.height_agl_ft < lo || target.height_agl_ft > hi {
        return None;
    }
    let values: Vec<f64> = levels.iter().map(|lv| lv.value).collect();
    linear_interpolate(&heights, &values, target.height_agl_ft)
}

/// Merge one key's contributions onto the reference (smallest key) levels.
fn merge_bucket(
    key: BucketKey,
    contributions: BTreeMap<ContributionKey, Vec<LevelValue>>,
    failures: &mut FailureLog,
) -> Option<AlignedHourBucket> {
    let mut iter = contributions.into_iter();
    let (reference_key, reference) = iter.next()?;
    let levels: Vec<BucketLevel> = reference
        .iter()
        .map(|lv| BucketLevel {
            level: lv.level,
            height_agl_ft: lv.height_agl_ft,
        })
        .collect();

    let mut members = BTreeMap::new();
    members.insert(reference_key, reference.iter().map(|lv| Some(lv.value)).collect());

    for (contribution, values) in iter {
        let matched: Vec<Option<f64>> = levels.iter().map(|target| value_at(&values, target)).collect();
        if matched.iter().all(Option::is_none) {
            let err = EngineError::LevelMismatch {
                member: contribution.member.to_string(),
                detail: format!(
                    "{} levels, none within {} reference levels",
                    values.len(),
                    levels.len()
                ),
            };
            failures.record(
                FailureRecord::new(FailureKind::ComputeFailure, err.to_string())
                    .site(&key.site)
                    .variable(key.variable)
                    .member(contribution.member)
                    .hour(key.hour),
            );
            continue;
        }
        members.insert(contribution, matched);
    }

    Some(AlignedHourBucket {
        site: key.site,
        variable: key.variable,
        hour: key.hour,
        levels,
        members,
    })
}

/// Build every hour bucket from a run's series.
pub fn align(series: &SeriesSet) -> AlignmentOutput {
    let mut groups: BTreeMap<BucketKey, BTreeMap<ContributionKey, Vec<LevelValue>>> = BTreeMap::new();

    for s in series.iter() {
        let contribution = ContributionKey {
            member: s.key.member,
            issue_time: s.key.issue_time,
        };
        for (hour, levels) in hourly_values(s) {
            if levels.is_empty() {
                continue;
            }
            groups
                .entry(BucketKey {
                    site: s.key.site.clone(),
                    variable: s.key.variable,
                    hour,
                })
                .or_default()
                .insert(contribution, levels);
        }
    }

    let mut output = AlignmentOutput::default();
    for (key, contributions) in groups {
        if let Some(bucket) = merge_bucket(key, contributions, &mut output.failures) {
            output.buckets.push(bucket);
        }
    }
    debug!(buckets = output.buckets.len(), "Aligned hour buckets");
    output
}
