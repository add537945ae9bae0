//! Geographic value types shared by every map provider.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.05112878;

/// Minimum longitude.
pub const MIN_LNG: f64 = -180.0;

/// Maximum longitude.
pub const MAX_LNG: f64 = 180.0;

/// Lowest zoom level accepted by either provider.
pub const MIN_ZOOM: f64 = 0.0;

/// Highest zoom level accepted by either provider.
pub const MAX_ZOOM: f64 = 22.0;

/// Errors produced by coordinate validation and conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be between -90 and 90)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    #[error("Invalid zoom level: {0} (must be between 0 and 22)")]
    InvalidZoom(f64),

    #[error("Invalid bounds: north {north} is south of {south}")]
    InvalidBounds { north: f64, south: f64 },
}

/// A geographic point in degrees.
///
/// This is the canonical coordinate shape handed to callers regardless of
/// which provider produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new point without validation.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Checks that both components are finite and within range.
    pub fn validate(&self) -> Result<(), CoordError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(CoordError::InvalidLatitude(self.lat));
        }
        if !self.lng.is_finite() || !(MIN_LNG..=MAX_LNG).contains(&self.lng) {
            return Err(CoordError::InvalidLongitude(self.lng));
        }
        Ok(())
    }
}

/// Axis-aligned geographic rectangle.
///
/// When `west > east` the box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Validates ranges and ordering of the edges.
    pub fn validate(&self) -> Result<(), CoordError> {
        LatLng::new(self.north, self.east).validate()?;
        LatLng::new(self.south, self.west).validate()?;
        if self.north < self.south {
            return Err(CoordError::InvalidBounds {
                north: self.north,
                south: self.south,
            });
        }
        Ok(())
    }

    /// Returns true if the box crosses the antimeridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Returns true if the point lies inside (or on the edge of) the box.
    pub fn contains(&self, point: LatLng) -> bool {
        if point.lat < self.south || point.lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            point.lng >= self.west || point.lng <= self.east
        } else {
            point.lng >= self.west && point.lng <= self.east
        }
    }

    /// Geographic center of the box.
    pub fn center(&self) -> LatLng {
        let lat = (self.north + self.south) / 2.0;
        let lng = if self.crosses_antimeridian() {
            super::wrap_lng((self.west + self.east + 360.0) / 2.0)
        } else {
            (self.west + self.east) / 2.0
        };
        LatLng::new(lat, lng)
    }
}

/// Current camera of a map: center and zoom.
///
/// Only the latest value matters; no history is kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: LatLng,
    pub zoom: f64,
}

impl ViewState {
    pub const fn new(center: LatLng, zoom: f64) -> Self {
        Self { center, zoom }
    }

    /// Validates the center and zoom.
    pub fn validate(&self) -> Result<(), CoordError> {
        self.center.validate()?;
        validate_zoom(self.zoom)
    }
}

impl Default for ViewState {
    /// Nairobi at zoom 8.
    fn default() -> Self {
        Self {
            center: LatLng::new(-1.2921, 36.8219),
            zoom: 8.0,
        }
    }
}

/// Checks that a zoom level is finite and inside the supported range.
pub fn validate_zoom(zoom: f64) -> Result<(), CoordError> {
    if !zoom.is_finite() || !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
        return Err(CoordError::InvalidZoom(zoom));
    }
    Ok(())
}

/// XYZ tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Row (Y), north to south.
    pub row: u32,
    /// Column (X), west to east.
    pub col: u32,
    /// Zoom level.
    pub zoom: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latlng_validate_ranges() {
        assert!(LatLng::new(0.0, 0.0).validate().is_ok());
        assert!(LatLng::new(90.0, 180.0).validate().is_ok());
        assert_eq!(
            LatLng::new(91.0, 0.0).validate(),
            Err(CoordError::InvalidLatitude(91.0))
        );
        assert_eq!(
            LatLng::new(0.0, -181.0).validate(),
            Err(CoordError::InvalidLongitude(-181.0))
        );
        assert!(LatLng::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_bounds_rejects_inverted_latitudes() {
        let bounds = Bounds::new(-2.0, 1.0, 38.0, 36.0);
        assert!(matches!(
            bounds.validate(),
            Err(CoordError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = Bounds::new(1.0, -3.0, 38.0, 35.0);
        assert!(bounds.contains(LatLng::new(-1.2921, 36.8219)));
        assert!(!bounds.contains(LatLng::new(5.0, 36.0)));
        assert!(!bounds.contains(LatLng::new(0.0, 40.0)));
    }

    #[test]
    fn test_bounds_across_antimeridian() {
        let bounds = Bounds::new(10.0, -10.0, -170.0, 170.0);
        assert!(bounds.crosses_antimeridian());
        assert!(bounds.contains(LatLng::new(0.0, 179.0)));
        assert!(bounds.contains(LatLng::new(0.0, -175.0)));
        assert!(!bounds.contains(LatLng::new(0.0, 0.0)));

        let center = bounds.center();
        assert!((center.lng.abs() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_view_is_nairobi() {
        let view = ViewState::default();
        assert_eq!(view.center, LatLng::new(-1.2921, 36.8219));
        assert_eq!(view.zoom, 8.0);
        assert!(view.validate().is_ok());
    }

    #[test]
    fn test_validate_zoom() {
        assert!(validate_zoom(0.0).is_ok());
        assert!(validate_zoom(22.0).is_ok());
        assert!(validate_zoom(12.5).is_ok());
        assert_eq!(validate_zoom(23.0), Err(CoordError::InvalidZoom(23.0)));
        assert!(validate_zoom(-1.0).is_err());
    }
}
