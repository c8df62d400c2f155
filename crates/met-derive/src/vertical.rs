//! Hybrid-height vertical coordinate.

use met_common::units::metres_to_feet;

/// Absolute altitude (m) of a hybrid-height level above a surface altitude.
pub fn altitude_m(level_height_m: f64, sigma: f64, surface_altitude_m: f64) -> f64 {
    level_height_m + sigma * surface_altitude_m
}

/// Height above ground in feet of a hybrid-height level.
pub fn height_agl_ft(level_height_m: f64, sigma: f64, surface_altitude_m: f64) -> f64 {
    metres_to_feet(altitude_m(level_height_m, sigma, surface_altitude_m) - surface_altitude_m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use met_common::units::M_TO_FT;

    #[test]
    fn test_surface_level_is_nominal_height() {
        // sigma 1.0 cancels the orography exactly
        let h = height_agl_ft(1.5, 1.0, 250.0);
        assert!((h - 1.5 * M_TO_FT).abs() < 1e-9);
    }

    #[test]
    fn test_upper_level_flattens() {
        // sigma 0 means a constant altitude, so AGL shrinks over high ground
        let low = height_agl_ft(3000.0, 0.0, 0.0);
        let high = height_agl_ft(3000.0, 0.0, 500.0);
        assert!((low - high - 500.0 * M_TO_FT).abs() < 1e-6);
    }

    #[test]
    fn test_altitude() {
        assert_eq!(altitude_m(20.0, 0.5, 100.0), 70.0);
    }
}
