//! Site-forecast feed reader.
//!
//! The feed is a headerless CSV with one row per site and hour. Only the
//! columns below are used; anything that does not parse as a number is
//! treated as missing.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use ensemble_engine::{Banding, ReportPoint, SeriesReport, SiteLabel};
use met_common::units::MS_TO_KTS;
use met_common::{TimeWindow, Variable};

/// Day-first timestamp format of the feed.
pub const TIME_FORMAT: &str = "%d-%m-%Y %H:%M";

mod column {
    pub const SITE: usize = 0;
    pub const TIME: usize = 1;
    pub const DRY_BULB: usize = 3;
    pub const WIND_SPEED: usize = 4;
    pub const WIND_DIRECTION: usize = 5;
    pub const WIND_GUST: usize = 6;
    pub const VISIBILITY: usize = 7;
    pub const RELATIVE_HUMIDITY: usize = 8;
    pub const LOW_CLOUD: usize = 23;
    pub const MEDIUM_CLOUD: usize = 24;
    pub const HIGH_CLOUD: usize = 25;
    pub const PRECIP_RATE: usize = 31;
}

/// Variables reported from the feed, in report order.
pub const FEED_VARIABLES: [Variable; 10] = [
    Variable::Temperature,
    Variable::PrecipitationRate,
    Variable::WindSpeed,
    Variable::WindGust,
    Variable::WindDirection,
    Variable::RelativeHumidity,
    Variable::Visibility,
    Variable::LowCloud,
    Variable::MediumCloud,
    Variable::HighCloud,
];

/// One hour of one site. Winds are in knots.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub site: String,
    pub time: DateTime<Utc>,
    pub dry_bulb_c: Option<f64>,
    pub wind_speed_kt: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub wind_gust_kt: Option<f64>,
    pub visibility_m: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub low_cloud: Option<f64>,
    pub medium_cloud: Option<f64>,
    pub high_cloud: Option<f64>,
    pub precip_rate: Option<f64>,
}

impl ObservationRow {
    pub fn value(&self, variable: Variable) -> Option<f64> {
        match variable {
            Variable::Temperature => self.dry_bulb_c,
            Variable::WindSpeed => self.wind_speed_kt,
            Variable::WindDirection => self.wind_direction_deg,
            Variable::WindGust => self.wind_gust_kt,
            Variable::Visibility => self.visibility_m,
            Variable::RelativeHumidity => self.relative_humidity,
            Variable::LowCloud => self.low_cloud,
            Variable::MediumCloud => self.medium_cloud,
            Variable::HighCloud => self.high_cloud,
            Variable::PrecipitationRate => self.precip_rate,
            Variable::SurfaceTemperature => None,
        }
    }
}

fn number(record: &csv::StringRecord, idx: usize) -> Option<f64> {
    record
        .get(idx)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_row(record: &csv::StringRecord) -> Option<ObservationRow> {
    let site = record.get(column::SITE)?.trim().to_string();
    let time = NaiveDateTime::parse_from_str(record.get(column::TIME)?.trim(), TIME_FORMAT)
        .ok()?
        .and_utc();
    Some(ObservationRow {
        site,
        time,
        dry_bulb_c: number(record, column::DRY_BULB),
        wind_speed_kt: number(record, column::WIND_SPEED).map(|v| v * MS_TO_KTS),
        wind_direction_deg: number(record, column::WIND_DIRECTION),
        wind_gust_kt: number(record, column::WIND_GUST).map(|v| v * MS_TO_KTS),
        visibility_m: number(record, column::VISIBILITY),
        relative_humidity: number(record, column::RELATIVE_HUMIDITY),
        low_cloud: number(record, column::LOW_CLOUD),
        medium_cloud: number(record, column::MEDIUM_CLOUD),
        high_cloud: number(record, column::HIGH_CLOUD),
        precip_rate: number(record, column::PRECIP_RATE),
    })
}

/// Parsed site-forecast feed.
#[derive(Debug, Clone, Default)]
pub struct ObservationFeed {
    rows: Vec<ObservationRow>,
}

impl ObservationFeed {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for (line, record) in csv_reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read feed line {}", line + 1))?;
            match parse_row(&record) {
                Some(row) => rows.push(row),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "Skipped feed rows without a site or valid time");
        }
        debug!(rows = rows.len(), "Parsed site-forecast feed");
        Ok(Self { rows })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())
            .with_context(|| format!("Failed to open site-forecast feed {:?}", path.as_ref()))?;
        Self::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one site inside `window`, in time order.
    pub fn rows_for(&self, site_code: &str, window: &TimeWindow) -> Vec<&ObservationRow> {
        let mut rows: Vec<&ObservationRow> = self
            .rows
            .iter()
            .filter(|r| r.site == site_code && window.contains(&r.time))
            .collect();
        rows.sort_by_key(|r| r.time);
        rows
    }

    /// One banded series per feed variable for a candidate site.
    pub fn series(&self, site_code: &str, window: &TimeWindow, label: &SiteLabel) -> Vec<SeriesReport> {
        let rows = self.rows_for(site_code, window);
        if rows.is_empty() {
            return Vec::new();
        }

        FEED_VARIABLES
            .iter()
            .map(|variable| {
                let banding = Banding::for_observation(*variable);
                let points = rows
                    .iter()
                    .map(|row| {
                        let value = row.value(*variable);
                        ReportPoint {
                            time: row.time,
                            value,
                            band: value.zip(banding.as_ref()).and_then(|(v, b)| b.band(v)),
                        }
                    })
                    .collect();
                SeriesReport {
                    site: label.clone(),
                    variable: *variable,
                    units: variable.output_units(),
                    caption: label.caption(caption_name(*variable)),
                    points,
                }
            })
            .collect()
    }
}

fn caption_name(variable: Variable) -> &'static str {
    match variable {
        Variable::Temperature => "Dry bulb temperature",
        Variable::PrecipitationRate => "Precipitation rate",
        Variable::WindSpeed => "Wind means",
        Variable::WindGust => "Wind gusts",
        Variable::WindDirection => "Wind directions",
        Variable::RelativeHumidity => "Relative humidity",
        Variable::Visibility => "Visibility",
        Variable::LowCloud => "Low cloud",
        Variable::MediumCloud => "Medium cloud",
        Variable::HighCloud => "High cloud",
        Variable::SurfaceTemperature => "Surface temperature",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// A 35-column feed line with site, time and the given cells filled.
    fn line(site: &str, time: &str, cells: &[(usize, &str)]) -> String {
        let mut cols = vec![String::new(); 35];
        cols[column::SITE] = site.to_string();
        cols[column::TIME] = time.to_string();
        for (idx, value) in cells {
            cols[*idx] = value.to_string();
        }
        cols.join(",")
    }

    #[test]
    fn test_parses_day_first_times_and_converts_winds() {
        let csv = line("03257", "15-01-2024 06:00", &[(column::WIND_SPEED, "10"), (column::DRY_BULB, "4.5")]);
        let feed = ObservationFeed::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(feed.len(), 1);
        let row = &feed.rows[0];
        assert_eq!(row.time, Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap());
        assert!((row.wind_speed_kt.unwrap() - 19.4384).abs() < 1e-9);
        assert_eq!(row.dry_bulb_c, Some(4.5));
    }

    #[test]
    fn test_unparseable_values_are_missing() {
        let csv = line("03257", "15-01-2024 06:00", &[(column::VISIBILITY, "n/a"), (column::PRECIP_RATE, "nan")]);
        let feed = ObservationFeed::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(feed.rows[0].visibility_m, None);
        assert_eq!(feed.rows[0].precip_rate, None);
    }

    #[test]
    fn test_bad_time_row_skipped() {
        let csv = [
            line("03257", "2024-01-15T06:00", &[]),
            line("03257", "15-01-2024 07:00", &[]),
        ]
        .join("\n");
        let feed = ObservationFeed::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(feed.len(), 1);
    }
}
