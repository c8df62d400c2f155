//! Issue-batch planning.
//!
//! A run combines several recent model cycles. Each cycle (issue time) is one
//! batch, processed by one worker. Within a batch, lead times are spread over
//! numbered files: file `NNN` holds leads `NNN+1..=NNN+3`, and file `000`
//! additionally holds lead 0.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use met_common::{truncate_to_hour, MetResult, TimeWindow, ValidTime};

/// Batch planning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Issue offsets (hours before the current hour), oldest first.
    pub recency_offsets_hours: Vec<i64>,
    /// Longest lead time produced by each cycle.
    pub max_lead_hours: i64,
    /// Hours of lead time per numbered file.
    pub file_step_hours: u32,
    /// Highest file number in a cycle.
    pub last_file_number: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            recency_offsets_hours: vec![8, 7, 6, 5, 4, 3],
            max_lead_hours: 126,
            file_step_hours: 3,
            last_file_number: 123,
        }
    }
}

impl BatchConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.recency_offsets_hours.is_empty() {
            return Err("recency_offsets_hours must not be empty".to_string());
        }
        if self.recency_offsets_hours.iter().any(|h| *h < 0) {
            return Err("recency_offsets_hours must be >= 0".to_string());
        }
        if self.file_step_hours == 0 {
            return Err("file_step_hours must be > 0".to_string());
        }
        if self.max_lead_hours <= 0 {
            return Err("max_lead_hours must be > 0".to_string());
        }
        Ok(())
    }

    fn oldest_offset(&self) -> i64 {
        self.recency_offsets_hours.iter().copied().max().unwrap_or(0)
    }

    fn newest_offset(&self) -> i64 {
        self.recency_offsets_hours.iter().copied().min().unwrap_or(0)
    }

    /// All file numbers of a cycle: 0, 3, 6, ...
    pub fn file_numbers(&self) -> Vec<u32> {
        (0..=self.last_file_number)
            .step_by(self.file_step_hours.max(1) as usize)
            .collect()
    }

    /// Lead hours stored in one numbered file.
    pub fn leads_in_file(&self, file_number: u32) -> Vec<i64> {
        let first = file_number as i64 + 1;
        let mut leads: Vec<i64> = (first..first + self.file_step_hours as i64).collect();
        if file_number == 0 {
            leads.insert(0, 0);
        }
        leads
    }

    /// Files of the cycle issued at `issue_time` with any lead valid in `window`.
    pub fn files_for_window(&self, issue_time: DateTime<Utc>, window: &TimeWindow) -> Vec<u32> {
        self.file_numbers()
            .into_iter()
            .filter(|n| {
                self.leads_in_file(*n).iter().any(|lead| {
                    window.contains(&ValidTime::from_lead_hours(issue_time, *lead).valid_datetime())
                })
            })
            .collect()
    }
}

/// One model cycle to process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueBatch {
    pub issue_time: DateTime<Utc>,
    /// Hours between the issue time and the current hour
    pub offset_hours: i64,
    /// Numbered files holding leads inside the window
    pub file_numbers: Vec<u32>,
}

impl IssueBatch {
    /// Directory-style issue stamp, e.g. `20240115T0600Z`.
    pub fn stamp(&self) -> String {
        ValidTime::issue_stamp(&self.issue_time)
    }
}

/// Fit the requested window to what the configured cycles can cover.
///
/// When the oldest cycle's last lead falls before the end of the requested
/// window, the window keeps its length but slides back to end with that lead.
/// Otherwise it ends where requested and starts no earlier than the newest
/// cycle's issue time.
pub fn plan_window(
    now: DateTime<Utc>,
    requested: &TimeWindow,
    config: &BatchConfig,
) -> MetResult<TimeWindow> {
    let now_hour = truncate_to_hour(now);
    let newest_issue = now_hour - Duration::hours(config.newest_offset());
    let latest_lead_vdt =
        now_hour - Duration::hours(config.oldest_offset()) + Duration::hours(config.max_lead_hours);

    if latest_lead_vdt < requested.end {
        let end = latest_lead_vdt + Duration::hours(1);
        TimeWindow::new(end - (requested.end - requested.start), end)
    } else {
        TimeWindow::new(requested.start.max(newest_issue), requested.end)
    }
}

/// One batch per recency offset, oldest first, each with the files it needs.
pub fn plan_batches(now: DateTime<Utc>, window: &TimeWindow, config: &BatchConfig) -> Vec<IssueBatch> {
    let now_hour = truncate_to_hour(now);
    let mut offsets = config.recency_offsets_hours.clone();
    offsets.sort_unstable_by(|a, b| b.cmp(a));
    offsets.dedup();

    offsets
        .into_iter()
        .map(|offset| {
            let issue_time = now_hour - Duration::hours(offset);
            IssueBatch {
                issue_time,
                offset_hours: offset,
                file_numbers: config.files_for_window(issue_time, window),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_file_numbers() {
        let numbers = BatchConfig::default().file_numbers();
        assert_eq!(numbers.first(), Some(&0));
        assert_eq!(numbers.last(), Some(&123));
        assert_eq!(numbers.len(), 42);
    }

    #[test]
    fn test_leads_in_file() {
        let config = BatchConfig::default();
        assert_eq!(config.leads_in_file(0), vec![0, 1, 2, 3]);
        assert_eq!(config.leads_in_file(6), vec![7, 8, 9]);
    }

    #[test]
    fn test_files_for_window() {
        let config = BatchConfig::default();
        // leads 5..=9 from a 00Z issue
        let window = TimeWindow::new(at(15, 5), at(15, 10)).unwrap();
        assert_eq!(config.files_for_window(at(15, 0), &window), vec![3, 6]);
    }

    #[test]
    fn test_window_start_clamped_to_newest_issue() {
        let config = BatchConfig::default();
        let now = at(15, 12);
        let requested = TimeWindow::new(at(15, 0), at(16, 0)).unwrap();
        let window = plan_window(now, &requested, &config).unwrap();
        assert_eq!(window.start, at(15, 9));
        assert_eq!(window.end, at(16, 0));
    }

    #[test]
    fn test_window_slides_back_when_out_of_reach() {
        let config = BatchConfig::default();
        let now = at(15, 12);
        // oldest cycle 04Z + 126 h = 20th 10Z
        let requested = TimeWindow::hours_from(at(20, 0), 24).unwrap();
        let window = plan_window(now, &requested, &config).unwrap();
        assert_eq!(window.end, at(20, 11));
        assert_eq!(window.duration_hours(), 24);
    }

    #[test]
    fn test_batches_oldest_first() {
        let config = BatchConfig::default();
        let now = at(15, 12);
        let window = TimeWindow::hours_from(at(15, 12), 6).unwrap();
        let batches = plan_batches(now, &window, &config);
        assert_eq!(batches.len(), 6);
        assert_eq!(batches[0].issue_time, at(15, 4));
        assert_eq!(batches[5].issue_time, at(15, 9));
        // 04Z cycle: leads 8..=13 -> files 6, 9, 12
        assert_eq!(batches[0].file_numbers, vec![6, 9, 12]);
        assert_eq!(batches[0].stamp(), "20240115T0400Z");
    }
}
