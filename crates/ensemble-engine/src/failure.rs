//! Isolated failure records.
//!
//! Every local degradation (a missing file, a failed derivation, an hour with
//! no members, an out-of-range value) becomes one [`FailureRecord`]. Nothing
//! here aborts processing; the log is reported with the run summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use met_common::{MemberId, Variable};

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An expected source file is absent.
    FetchGap,
    /// A derivation's inputs were malformed or a level/constraint match failed.
    ComputeFailure,
    /// An hour or level had no surviving member contributions.
    EmptyBucket,
    /// A derived value fell outside its physical range.
    OutOfRangeResult,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::FetchGap => "fetch_gap",
            FailureKind::ComputeFailure => "compute_failure",
            FailureKind::EmptyBucket => "empty_bucket",
            FailureKind::OutOfRangeResult => "out_of_range_result",
        };
        write!(f, "{}", s)
    }
}

/// One isolated failure, scoped to the smallest unit it affects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: FailureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<Variable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberId>,
    /// Source file name, or issue stamp for batch-level gaps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<DateTime<Utc>>,
    pub reason: String,
}

impl FailureRecord {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            site: None,
            variable: None,
            member: None,
            source: None,
            hour: None,
            reason: reason.into(),
        }
    }

    pub fn site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn variable(mut self, variable: Variable) -> Self {
        self.variable = Some(variable);
        self
    }

    pub fn member(mut self, member: MemberId) -> Self {
        self.member = Some(member);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn hour(mut self, hour: DateTime<Utc>) -> Self {
        self.hour = Some(hour);
        self
    }
}

/// Append-only collection of failure records owned by one worker or stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureLog {
    records: Vec<FailureRecord>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and emit a warning event for it.
    pub fn record(&mut self, record: FailureRecord) {
        warn!(
            kind = %record.kind,
            site = record.site.as_deref().unwrap_or("-"),
            variable = record.variable.map(|v| v.code()).unwrap_or("-"),
            member = %record.member.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string()),
            source = record.source.as_deref().unwrap_or("-"),
            hour = ?record.hour,
            reason = %record.reason,
            "Isolated failure"
        );
        self.records.push(record);
    }

    /// Merge another log into this one.
    pub fn extend(&mut self, other: FailureLog) {
        self.records.extend(other.records);
    }

    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, kind: FailureKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// Number of records of each kind.
    pub fn counts(&self) -> BTreeMap<FailureKind, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.kind).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut log = FailureLog::new();
        log.record(FailureRecord::new(FailureKind::FetchGap, "missing pd003").member(MemberId::Control));
        log.record(FailureRecord::new(FailureKind::FetchGap, "missing pe003"));
        log.record(
            FailureRecord::new(FailureKind::ComputeFailure, "no pressure")
                .variable(Variable::RelativeHumidity),
        );

        assert_eq!(log.len(), 3);
        assert_eq!(log.count(FailureKind::FetchGap), 2);
        assert_eq!(log.counts().get(&FailureKind::ComputeFailure), Some(&1));
        assert_eq!(log.count(FailureKind::EmptyBucket), 0);
    }

    #[test]
    fn test_extend() {
        let mut a = FailureLog::new();
        let mut b = FailureLog::new();
        b.record(FailureRecord::new(FailureKind::EmptyBucket, "no members").site("Leeming"));
        a.extend(b);
        assert_eq!(a.records()[0].site.as_deref(), Some("Leeming"));
    }
}
