//! Core types for quantity derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use met_common::{LevelDescriptor, MemberId, TimeWindow, Units, ValidTime, Variable};

use crate::error::{DeriveError, Result};

/// A point in the model's native (rotated-pole) grid coordinates, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SitePoint {
    /// Rotated longitude
    pub x: f64,
    /// Rotated latitude
    pub y: f64,
}

impl SitePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Regular horizontal grid in native coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Coordinate of column 0
    pub origin_x: f64,
    /// Coordinate of row 0
    pub origin_y: f64,
    /// Spacing between columns
    pub dx: f64,
    /// Spacing between rows
    pub dy: f64,
    pub nx: usize,
    pub ny: usize,
}

impl GridGeometry {
    pub fn new(origin_x: f64, origin_y: f64, dx: f64, dy: f64, nx: usize, ny: usize) -> Self {
        Self {
            origin_x,
            origin_y,
            dx,
            dy,
            nx,
            ny,
        }
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fractional (column, row) index of a point, if it lies on the grid.
    ///
    /// Longitudes are retried a full turn either side so grids stored on
    /// 0..360 and -180..180 conventions both resolve.
    pub fn fractional_index(&self, point: &SitePoint) -> Option<(f64, f64)> {
        if self.nx == 0 || self.ny == 0 || self.dx == 0.0 || self.dy == 0.0 {
            return None;
        }
        let row = (point.y - self.origin_y) / self.dy;
        if row < 0.0 || row > (self.ny - 1) as f64 {
            return None;
        }
        [point.x, point.x + 360.0, point.x - 360.0]
            .into_iter()
            .map(|x| (x - self.origin_x) / self.dx)
            .find(|col| *col >= 0.0 && *col <= (self.nx - 1) as f64)
            .map(|col| (col, row))
    }
}

/// One horizontal slice of a field: one valid time, one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSlice {
    pub valid_time: DateTime<Utc>,
    pub level: LevelDescriptor,
    /// Hybrid-height level height in metres (nominal height for single-level fields)
    pub level_height_m: f64,
    /// Hybrid-height sigma coefficient (1.0 at the surface)
    pub sigma: f64,
    /// Values in row-major order
    pub data: Vec<f32>,
}

/// One named quantity inside a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceField {
    /// Stable quantity code (see [`crate::stash`])
    pub code: String,
    pub units: Units,
    pub grid: GridGeometry,
    pub slices: Vec<GridSlice>,
}

/// One fetched model file for one ensemble member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    /// File name, e.g. `enukaa_pd006`
    pub name: String,
    pub issue_time: DateTime<Utc>,
    /// Realization number; absent for the control run
    #[serde(default)]
    pub realization: Option<u32>,
    #[serde(default)]
    pub fields: Vec<SourceField>,
}

impl SourceFile {
    /// Parse a JSON-serialized source file.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| DeriveError::malformed(format!("source file: {}", e)))
    }

    /// Look up a field by quantity code.
    pub fn field(&self, code: &str) -> Result<&SourceField> {
        self.fields
            .iter()
            .find(|f| f.code == code)
            .ok_or_else(|| DeriveError::missing_field(code, &self.name))
    }

    pub fn has_field(&self, code: &str) -> bool {
        self.fields.iter().any(|f| f.code == code)
    }

    pub fn member(&self) -> MemberId {
        MemberId::from_realization(self.realization)
    }
}

/// Per-site inputs shared by every calculator call.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteContext {
    /// Name of the candidate site the values belong to
    pub site: String,
    /// Site location in native grid coordinates
    pub point: SitePoint,
    /// Model surface altitude at the site in metres
    pub surface_altitude_m: f64,
    /// Requested valid-time window
    pub window: TimeWindow,
}

impl SiteContext {
    pub fn new(
        site: impl Into<String>,
        point: SitePoint,
        surface_altitude_m: f64,
        window: TimeWindow,
    ) -> Self {
        Self {
            site: site.into(),
            point,
            surface_altitude_m,
            window,
        }
    }
}

/// Data-quality flag attached to a derived value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityFlag {
    /// Value fell outside its physical range; `original` is the unclipped value.
    OutOfRange { original: f64, min: f64, max: f64 },
}

/// One derived value: one quantity, site, valid time, level, member and file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    pub variable: Variable,
    pub value: f64,
    pub units: Units,
    pub level: LevelDescriptor,
    pub height_agl_ft: f64,
    pub site: String,
    pub realization: Option<u32>,
    /// Source file name
    pub source: String,
    pub issue_time: DateTime<Utc>,
    pub valid_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<QualityFlag>,
}

impl RawField {
    pub fn member(&self) -> MemberId {
        MemberId::from_realization(self.realization)
    }

    pub fn lead(&self) -> ValidTime {
        ValidTime::between(self.issue_time, self.valid_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_from_json() {
        let json = br#"{"name": "enukaa_pd000", "issue_time": "2024-01-15T00:00:00Z"}"#;
        let file = SourceFile::from_json(json).unwrap();
        assert_eq!(file.name, "enukaa_pd000");
        assert_eq!(file.member(), MemberId::Control);
        assert!(file.fields.is_empty());

        assert!(matches!(
            SourceFile::from_json(b"{\"name\": 3}"),
            Err(DeriveError::Malformed(_))
        ));
    }

    #[test]
    fn test_fractional_index_inside() {
        let grid = GridGeometry::new(-1.0, 50.0, 0.5, 0.5, 5, 5);
        let (col, row) = grid.fractional_index(&SitePoint::new(-0.25, 51.0)).unwrap();
        assert!((col - 1.5).abs() < 1e-9);
        assert!((row - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_fractional_index_outside() {
        let grid = GridGeometry::new(-1.0, 50.0, 0.5, 0.5, 5, 5);
        assert!(grid.fractional_index(&SitePoint::new(5.0, 51.0)).is_none());
        assert!(grid.fractional_index(&SitePoint::new(0.0, 49.0)).is_none());
    }

    #[test]
    fn test_fractional_index_wraps_longitude() {
        let grid = GridGeometry::new(358.0, 0.0, 1.0, 1.0, 4, 2);
        let (col, _) = grid.fractional_index(&SitePoint::new(-1.0, 0.5)).unwrap();
        assert!((col - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_field_is_named() {
        let file = SourceFile {
            name: "enukaa_pe006".to_string(),
            issue_time: Utc::now(),
            realization: Some(1),
            fields: vec![],
        };
        let err = file.field("m01s00i408").unwrap_err();
        assert!(err.to_string().contains("m01s00i408"));
        assert!(err.to_string().contains("enukaa_pe006"));
    }
}
