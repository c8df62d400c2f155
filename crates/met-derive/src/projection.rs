//! Rotated-pole projection.
//!
//! Limited-area model grids are defined on a spherical coordinate system whose
//! north pole has been moved so the equator runs through the domain. The
//! parameters are the geographic position of the rotated grid's north pole:
//! - Pole latitude (φp)
//! - Pole longitude (λp)
//!
//! The transform is a rigid rotation of the sphere, applied to Cartesian unit
//! vectors so it is exact everywhere except at the poles themselves.

use serde::{Deserialize, Serialize};

use crate::types::SitePoint;

/// Rotated-pole projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotatedPole {
    /// Geographic latitude of the rotated north pole (degrees)
    pub pole_lat: f64,
    /// Geographic longitude of the rotated north pole (degrees)
    pub pole_lon: f64,
}

impl Default for RotatedPole {
    /// The UK ensemble domain pole.
    fn default() -> Self {
        Self {
            pole_lat: 37.5,
            pole_lon: 177.5,
        }
    }
}

impl RotatedPole {
    pub fn new(pole_lat: f64, pole_lon: f64) -> Self {
        Self { pole_lat, pole_lon }
    }

    /// Rotation angles (theta, phi) in radians, from the rotated south pole.
    fn angles(&self) -> (f64, f64) {
        let sp_lat = -self.pole_lat;
        let sp_lon = self.pole_lon - 180.0;
        ((90.0 + sp_lat).to_radians(), sp_lon.to_radians())
    }

    /// Convert geographic (lat, lon) in degrees to rotated grid coordinates.
    pub fn geo_to_rotated(&self, lat: f64, lon: f64) -> SitePoint {
        let (theta, phi) = self.angles();
        let (lat, lon) = (lat.to_radians(), lon.to_radians());

        let x = lon.cos() * lat.cos();
        let y = lon.sin() * lat.cos();
        let z = lat.sin();

        let xr = theta.cos() * phi.cos() * x + theta.cos() * phi.sin() * y + theta.sin() * z;
        let yr = -phi.sin() * x + phi.cos() * y;
        let zr = -theta.sin() * phi.cos() * x - theta.sin() * phi.sin() * y + theta.cos() * z;

        SitePoint::new(
            yr.atan2(xr).to_degrees(),
            zr.clamp(-1.0, 1.0).asin().to_degrees(),
        )
    }

    /// Convert rotated grid coordinates back to geographic (lat, lon) in degrees.
    pub fn rotated_to_geo(&self, point: &SitePoint) -> (f64, f64) {
        let (theta, phi) = self.angles();
        let (lat, lon) = (point.y.to_radians(), point.x.to_radians());

        let xr = lon.cos() * lat.cos();
        let yr = lon.sin() * lat.cos();
        let zr = lat.sin();

        // Inverse rotation is the transpose.
        let x = theta.cos() * phi.cos() * xr - phi.sin() * yr - theta.sin() * phi.cos() * zr;
        let y = theta.cos() * phi.sin() * xr + phi.cos() * yr - theta.sin() * phi.sin() * zr;
        let z = theta.sin() * xr + theta.cos() * zr;

        (
            z.clamp(-1.0, 1.0).asin().to_degrees(),
            y.atan2(x).to_degrees(),
        )
    }
}
