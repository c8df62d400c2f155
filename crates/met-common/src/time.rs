//! Time handling utilities for ensemble forecast data.

use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MetError, MetResult};

/// A forecast valid time expressed as issue time plus lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValidTime {
    /// Model run (issue) time
    pub issue_time: DateTime<Utc>,
    /// Lead time in minutes from the issue time
    pub lead_minutes: i64,
}

impl ValidTime {
    pub fn new(issue_time: DateTime<Utc>, lead_minutes: i64) -> Self {
        Self { issue_time, lead_minutes }
    }

    /// Build from a whole number of lead hours.
    pub fn from_lead_hours(issue_time: DateTime<Utc>, lead_hours: i64) -> Self {
        Self::new(issue_time, lead_hours * 60)
    }

    /// Recover the lead from an absolute valid datetime.
    pub fn between(issue_time: DateTime<Utc>, valid: DateTime<Utc>) -> Self {
        Self::new(issue_time, (valid - issue_time).num_minutes())
    }

    /// The actual valid time (issue + lead).
    pub fn valid_datetime(&self) -> DateTime<Utc> {
        self.issue_time + Duration::minutes(self.lead_minutes)
    }

    /// Lead time in whole hours (truncated).
    pub fn lead_hours(&self) -> i64 {
        self.lead_minutes / 60
    }

    /// Parse an ISO 8601 timestamp, assuming UTC when no offset is given.
    pub fn parse_datetime(s: &str) -> MetResult<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Utc.from_utc_datetime(&ndt));
        }

        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%MZ") {
            return Ok(Utc.from_utc_datetime(&ndt));
        }

        Err(MetError::InvalidTime(s.to_string()))
    }

    /// Directory-style stamp used for issue batches, e.g. `20240115T1200Z`.
    pub fn issue_stamp(issue_time: &DateTime<Utc>) -> String {
        issue_time.format("%Y%m%dT%H00Z").to_string()
    }
}

/// Truncate a timestamp to the top of its hour.
pub fn truncate_to_hour(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.duration_trunc(Duration::hours(1))
        .unwrap_or_else(|_| dt.with_minute(0).and_then(|d| d.with_second(0)).unwrap_or(dt))
}

/// Truncate a timestamp to the start of its `minutes`-wide sub-window.
pub fn truncate_to_minutes(dt: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    let minutes = minutes.max(1);
    dt.duration_trunc(Duration::minutes(minutes)).unwrap_or(dt)
}

/// A half-open valid-time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> MetResult<Self> {
        if start >= end {
            return Err(MetError::InvalidWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Window of `hours` hours beginning at `start`.
    pub fn hours_from(start: DateTime<Utc>, hours: i64) -> MetResult<Self> {
        Self::new(start, start + Duration::hours(hours))
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt < &self.end
    }

    pub fn duration_hours(&self) -> i64 {
        (self.end - self.start).num_hours()
    }

    /// Every top-of-hour instant inside the window.
    pub fn hours(&self) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        let mut hour = truncate_to_hour(self.start);
        if hour < self.start {
            hour += Duration::hours(1);
        }
        while hour < self.end {
            out.push(hour);
            hour += Duration::hours(1);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_truncate_to_hour() {
        assert_eq!(truncate_to_hour(at(12, 47)), at(12, 0));
        assert_eq!(truncate_to_hour(at(12, 0)), at(12, 0));
    }

    #[test]
    fn test_truncate_to_five_minutes() {
        assert_eq!(truncate_to_minutes(at(12, 47), 5), at(12, 45));
        assert_eq!(truncate_to_minutes(at(12, 50), 5), at(12, 50));
    }

    #[test]
    fn test_window_is_half_open() {
        let window = TimeWindow::hours_from(at(0, 0), 3).unwrap();
        assert!(window.contains(&at(0, 0)));
        assert!(window.contains(&at(2, 59)));
        assert!(!window.contains(&at(3, 0)));
        assert_eq!(window.hours(), vec![at(0, 0), at(1, 0), at(2, 0)]);
    }

    #[test]
    fn test_window_rejects_empty_range() {
        assert!(TimeWindow::new(at(3, 0), at(3, 0)).is_err());
    }

    #[test]
    fn test_valid_time_lead() {
        let vt = ValidTime::from_lead_hours(at(6, 0), 4);
        assert_eq!(vt.valid_datetime(), at(10, 0));
        assert_eq!(ValidTime::between(at(6, 0), at(10, 30)).lead_minutes, 270);
    }

    #[test]
    fn test_parse_issue_stamp() {
        let dt = ValidTime::parse_datetime("20240115T1200Z").unwrap();
        assert_eq!(dt, at(12, 0));
        assert_eq!(ValidTime::issue_stamp(&dt), "20240115T1200Z");
    }
}
