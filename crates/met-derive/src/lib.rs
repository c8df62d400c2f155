//! Derived-quantity calculator for ensemble model output.
//!
//! Turns the raw gridded fields of one source file (one ensemble member, one
//! lead-time file) into site-point values of physically meaningful
//! quantities with a height-above-ground vertical coordinate in feet.
//!
//! # Architecture
//!
//! ```text
//! SourceFile (fields by quantity code)
//!      │
//!      ├─► select field by code ─── missing ──► DeriveError::MissingField
//!      │
//!      ├─► filter slices to [start, end) valid-time window
//!      │
//!      ├─► bilinear interpolation to the site's rotated-pole point
//!      │
//!      ├─► unit conversion (knots, Celsius, hPa, mm/hr)
//!      │
//!      ├─► hybrid height -> height above ground (ft)
//!      │
//!      └─► quantity formula (wind speed, RH, spliced profile, ...)
//!               │
//!               ▼
//!          Vec<RawField>
//! ```
//!
//! Every calculator returns a [`Result`]; a failure covers exactly one
//! (variable, member, file) computation and never touches sibling work.
//!
//! # Example
//!
//! ```ignore
//! use met_derive::{calculator, SiteContext};
//!
//! let ctx = SiteContext::new("Leeming", point, orography_m, window);
//! let winds = calculator::wind_speed(&model_file, &ctx)?;
//! ```

pub mod calculator;
pub mod config;
pub mod error;
pub mod interpolation;
pub mod projection;
pub mod stash;
pub mod types;
pub mod vertical;

// Re-export commonly used types at crate root
pub use calculator::{
    orography_at, precipitation_rate, relative_humidity, spliced_temperature, surface_temperature,
    visibility, wind_speed,
};
pub use config::{DeriveConfig, OutOfRangePolicy};
pub use error::{DeriveError, Result};
pub use interpolation::{bilinear_interpolate, linear_interpolate};
pub use projection::RotatedPole;
pub use types::{
    GridGeometry, GridSlice, QualityFlag, RawField, SiteContext, SitePoint, SourceField,
    SourceFile,
};
