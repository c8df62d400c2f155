//! Per-member variable series.
//!
//! Fragments arrive unordered from every worker. The reducer here files each
//! one under `(site, variable, member, issue time)` and keeps valid times
//! unique: when two files cover the same valid time, the file that sorts
//! first by name (the earlier lead file) wins, whatever order they arrived in.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use met_common::{LevelValue, MemberId, Units, Variable};
use met_derive::RawField;

/// Identity of one series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub site: String,
    pub variable: Variable,
    pub member: MemberId,
    pub issue_time: DateTime<Utc>,
}

impl SeriesKey {
    pub fn of(field: &RawField) -> Self {
        Self {
            site: field.site.clone(),
            variable: field.variable,
            member: field.member(),
            issue_time: field.issue_time,
        }
    }
}

/// All levels of one valid time, from a single source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub source: String,
    /// Sorted by level descriptor
    pub levels: Vec<LevelValue>,
}

impl SeriesPoint {
    fn new(field: &RawField) -> Self {
        Self {
            source: field.source.clone(),
            levels: vec![LevelValue::new(field.level, field.height_agl_ft, field.value)],
        }
    }

    fn insert_level(&mut self, field: &RawField) {
        match self.levels.binary_search_by(|l| l.level.cmp(&field.level)) {
            Ok(_) => {}
            Err(pos) => self
                .levels
                .insert(pos, LevelValue::new(field.level, field.height_agl_ft, field.value)),
        }
    }
}

/// Valid-time ordered values of one variable for one member and site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSeries {
    pub key: SeriesKey,
    pub units: Units,
    pub points: BTreeMap<DateTime<Utc>, SeriesPoint>,
}

impl VariableSeries {
    pub fn new(key: SeriesKey, units: Units) -> Self {
        Self {
            key,
            units,
            points: BTreeMap::new(),
        }
    }

    /// Append one fragment. Returns `false` when it lost to an earlier file.
    pub fn append(&mut self, field: &RawField) -> bool {
        let Some(point) = self.points.get_mut(&field.valid_time) else {
            self.points.insert(field.valid_time, SeriesPoint::new(field));
            return true;
        };

        match field.source.cmp(&point.source) {
            std::cmp::Ordering::Equal => {
                point.insert_level(field);
                true
            }
            std::cmp::Ordering::Less => {
                *point = SeriesPoint::new(field);
                true
            }
            std::cmp::Ordering::Greater => false,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn valid_times(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.points.keys()
    }
}

/// Every series built from a run's fragments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSet {
    series: BTreeMap<SeriesKey, VariableSeries>,
    superseded: usize,
}

impl SeriesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce an unordered fragment collection into series.
    pub fn from_fragments<'a>(fragments: impl IntoIterator<Item = &'a RawField>) -> Self {
        let mut set = Self::new();
        for field in fragments {
            set.append(field);
        }
        set
    }

    pub fn append(&mut self, field: &RawField) {
        let key = SeriesKey::of(field);
        let accepted = self
            .series
            .entry(key.clone())
            .or_insert_with(|| VariableSeries::new(key, field.units))
            .append(field);
        if !accepted {
            self.superseded += 1;
        }
    }

    pub fn get(&self, key: &SeriesKey) -> Option<&VariableSeries> {
        self.series.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableSeries> {
        self.series.values()
    }

    /// Series for one site.
    pub fn for_site<'a>(&'a self, site: &'a str) -> impl Iterator<Item = &'a VariableSeries> + 'a {
        self.series.values().filter(move |s| s.key.site == site)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Fragments dropped because an earlier file covered the same valid time.
    pub fn superseded(&self) -> usize {
        self.superseded
    }
}
