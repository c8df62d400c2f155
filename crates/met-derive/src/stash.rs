//! Quantity codes identifying fields inside model source files.
//!
//! Codes follow the Unified Model STASH convention (`m01sSSiIII`).

/// Eastward wind component on model levels (m/s).
pub const U_WIND: &str = "m01s00i002";
/// Northward wind component on model levels (m/s).
pub const V_WIND: &str = "m01s00i003";
/// Specific humidity on model levels (kg/kg).
pub const SPECIFIC_HUMIDITY: &str = "m01s00i010";
/// Surface skin temperature (K).
pub const SURFACE_TEMPERATURE: &str = "m01s00i024";
/// Orography / surface altitude (m).
pub const OROGRAPHY: &str = "m01s00i033";
/// Pressure on model levels (Pa).
pub const PRESSURE: &str = "m01s00i408";
/// Screen-level (1.5 m) temperature (K).
pub const SCREEN_TEMPERATURE: &str = "m01s03i236";
/// Screen-level relative humidity (%).
pub const SCREEN_RELATIVE_HUMIDITY: &str = "m01s03i245";
/// Screen-level visibility (m).
pub const VISIBILITY: &str = "m01s03i281";
/// Large-scale rainfall rate (kg m-2 s-1).
pub const RAIN_RATE: &str = "m01s04i203";
/// Temperature on model levels (K).
pub const MODEL_TEMPERATURE: &str = "m01s16i004";

/// Nominal height of screen-level fields in metres.
pub const SCREEN_HEIGHT_M: f64 = 1.5;
