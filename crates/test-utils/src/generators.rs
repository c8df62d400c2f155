//! Generators for synthetic source files and derived fragments.
//!
//! Fields are spatially constant unless a generator says otherwise, so the
//! value at any site point on the grid is known exactly.

use chrono::{DateTime, Duration, Utc};

use met_common::{LevelDescriptor, Units, Variable};
use met_derive::{GridGeometry, GridSlice, RawField, SourceField, SourceFile};

use crate::fixtures;

/// One hybrid-height model level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelLevel {
    pub number: u32,
    pub level_height_m: f64,
    pub sigma: f64,
}

/// `count` model levels numbered from 1, 20 m apart, with sigma decaying
/// from just under 1 at the lowest level.
///
/// # Example
///
/// ```
/// use test_utils::standard_levels;
///
/// let levels = standard_levels(3);
/// assert_eq!(levels[0].number, 1);
/// assert_eq!(levels[2].level_height_m, 60.0);
/// ```
pub fn standard_levels(count: u32) -> Vec<ModelLevel> {
    (1..=count)
        .map(|n| ModelLevel {
            number: n,
            level_height_m: 20.0 * n as f64,
            sigma: (1.0 - 0.05 * n as f64).max(0.0),
        })
        .collect()
}

/// Top-of-hour instants from `start`, `count` hours long.
pub fn hourly_times(start: DateTime<Utc>, count: i64) -> Vec<DateTime<Utc>> {
    (0..count).map(|h| start + Duration::hours(h)).collect()
}

/// Instants every `step_minutes` from `start` up to (not including) `end`.
pub fn stepped_times(start: DateTime<Utc>, end: DateTime<Utc>, step_minutes: i64) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let mut t = start;
    while t < end {
        out.push(t);
        t += Duration::minutes(step_minutes.max(1));
    }
    out
}

/// Creates a grid filled with one value.
pub fn create_constant_grid(grid: &GridGeometry, value: f32) -> Vec<f32> {
    vec![value; grid.len()]
}

/// Creates a grid whose values increase by `step` per column.
///
/// Useful for checking that horizontal interpolation lands between columns.
pub fn create_column_gradient_grid(grid: &GridGeometry, base: f32, step: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(grid.len());
    for _row in 0..grid.ny {
        for col in 0..grid.nx {
            data.push(base + step * col as f32);
        }
    }
    data
}

/// Builder for synthetic [`SourceFile`]s.
///
/// ```
/// use test_utils::{fixtures, SourceFileBuilder};
///
/// let file = SourceFileBuilder::new("enukaa_pd000", fixtures::issue_time(), Some(1))
///     .surface_field("m01s00i033", met_common::Units::Metres, &[fixtures::issue_time()], 120.0)
///     .build();
/// assert!(file.has_field("m01s00i033"));
/// ```
#[derive(Debug, Clone)]
pub struct SourceFileBuilder {
    file: SourceFile,
    grid: GridGeometry,
}

impl SourceFileBuilder {
    pub fn new(name: &str, issue_time: DateTime<Utc>, realization: Option<u32>) -> Self {
        Self {
            file: SourceFile {
                name: name.to_string(),
                issue_time,
                realization,
                fields: Vec::new(),
            },
            grid: fixtures::test_grid(),
        }
    }

    /// Use a different grid for fields added after this call.
    pub fn grid(mut self, grid: GridGeometry) -> Self {
        self.grid = grid;
        self
    }

    /// Add a single-level field with one constant value at every time.
    pub fn surface_field(self, code: &str, units: Units, times: &[DateTime<Utc>], value: f32) -> Self {
        self.surface_field_with(code, units, times, |_| value)
    }

    /// Add a single-level field whose constant value depends on the valid time.
    pub fn surface_field_with(
        mut self,
        code: &str,
        units: Units,
        times: &[DateTime<Utc>],
        value: impl Fn(DateTime<Utc>) -> f32,
    ) -> Self {
        let slices = times
            .iter()
            .map(|t| GridSlice {
                valid_time: *t,
                level: LevelDescriptor::Surface,
                level_height_m: 0.0,
                sigma: 1.0,
                data: create_constant_grid(&self.grid, value(*t)),
            })
            .collect();
        self.push(code, units, slices);
        self
    }

    /// Add a model-level field whose constant value depends on the level number.
    pub fn level_field(
        mut self,
        code: &str,
        units: Units,
        times: &[DateTime<Utc>],
        levels: &[ModelLevel],
        value: impl Fn(u32) -> f32,
    ) -> Self {
        let mut slices = Vec::with_capacity(times.len() * levels.len());
        for t in times {
            for level in levels {
                slices.push(GridSlice {
                    valid_time: *t,
                    level: LevelDescriptor::ModelLevel(level.number),
                    level_height_m: level.level_height_m,
                    sigma: level.sigma,
                    data: create_constant_grid(&self.grid, value(level.number)),
                });
            }
        }
        self.push(code, units, slices);
        self
    }

    /// Add a pre-built field as is.
    pub fn field(mut self, field: SourceField) -> Self {
        self.file.fields.push(field);
        self
    }

    fn push(&mut self, code: &str, units: Units, slices: Vec<GridSlice>) {
        self.file.fields.push(SourceField {
            code: code.to_string(),
            units,
            grid: self.grid,
            slices,
        });
    }

    pub fn build(self) -> SourceFile {
        self.file
    }
}

/// A derived value as the calculators would emit it.
pub fn raw_field(
    variable: Variable,
    realization: Option<u32>,
    valid_time: DateTime<Utc>,
    level: LevelDescriptor,
    height_agl_ft: f64,
    value: f64,
) -> RawField {
    RawField {
        variable,
        value,
        units: variable.output_units(),
        level,
        height_agl_ft,
        site: fixtures::SITE_NAME.to_string(),
        realization,
        source: format!("synthetic_{}", realization.map_or("c".to_string(), |r| r.to_string())),
        issue_time: fixtures::issue_time(),
        valid_time,
        flag: None,
    }
}

/// One surface-level fragment per member at the same valid time.
///
/// Members are numbered from 1 in the order of `values`.
pub fn member_values(variable: Variable, valid_time: DateTime<Utc>, values: &[f64]) -> Vec<RawField> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            raw_field(
                variable,
                Some(i as u32 + 1),
                valid_time,
                LevelDescriptor::Surface,
                0.0,
                *v,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stepped_times_half_open() {
        let start = fixtures::issue_time();
        let times = stepped_times(start, start + Duration::minutes(15), 5);
        assert_eq!(times.len(), 3);
        assert_eq!(times[2], start + Duration::minutes(10));
    }

    #[test]
    fn test_level_field_slices() {
        let times = hourly_times(fixtures::issue_time(), 2);
        let file = SourceFileBuilder::new("f", fixtures::issue_time(), None)
            .level_field("m01s16i004", Units::Kelvin, &times, &standard_levels(3), |n| {
                280.0 - n as f32
            })
            .build();
        let field = file.field("m01s16i004").unwrap();
        assert_eq!(field.slices.len(), 6);
        assert_eq!(field.slices[1].data[0], 278.0);
    }

    #[test]
    fn test_member_values_numbering() {
        let fields = member_values(Variable::WindSpeed, fixtures::issue_time(), &[1.0, 2.0]);
        assert_eq!(fields[0].realization, Some(1));
        assert_eq!(fields[1].realization, Some(2));
    }
}
