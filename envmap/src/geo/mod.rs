//! Coordinate conversion module
//!
//! Provides the canonical geographic types used across providers and the
//! Web Mercator math both native map models rely on to answer viewport
//! queries (`getBounds`) consistently.

mod types;

pub use types::{
    validate_zoom, Bounds, CoordError, LatLng, TileCoord, ViewState, MAX_LAT, MAX_LNG, MAX_ZOOM,
    MIN_LAT, MIN_LNG, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Default raster tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Wraps a longitude into `[-180, 180]`.
#[inline]
pub fn wrap_lng(lng: f64) -> f64 {
    if (MIN_LNG..=MAX_LNG).contains(&lng) {
        return lng;
    }
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

/// Clamps a latitude into the Web Mercator range.
#[inline]
pub fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(MIN_LAT, MAX_LAT)
}

/// Size of the world in pixels at the given zoom.
#[inline]
pub fn world_size(zoom: f64, tile_size: u32) -> f64 {
    tile_size as f64 * 2.0_f64.powf(zoom)
}

/// Projects a point to world pixel coordinates at the given zoom.
///
/// Origin is the north-west corner of the world; `y` grows southward.
#[inline]
pub fn project(point: LatLng, zoom: f64, tile_size: u32) -> (f64, f64) {
    let size = world_size(zoom, tile_size);
    let x = (point.lng + 180.0) / 360.0 * size;
    let lat_rad = clamp_lat(point.lat) * PI / 180.0;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * size;
    (x, y)
}

/// Inverse of [`project`]. The returned longitude is not wrapped.
#[inline]
pub fn unproject(x: f64, y: f64, zoom: f64, tile_size: u32) -> LatLng {
    let size = world_size(zoom, tile_size);
    let lng = x / size * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * y / size)).sinh().atan();
    LatLng::new(lat_rad * 180.0 / PI, lng)
}

/// Computes the geographic bounds visible in a viewport.
///
/// # Arguments
///
/// * `view` - Current center and zoom
/// * `width` - Viewport width in pixels
/// * `height` - Viewport height in pixels
/// * `tile_size` - Tile edge used by the provider's zoom scale
pub fn viewport_bounds(view: &ViewState, width: u32, height: u32, tile_size: u32) -> Bounds {
    let size = world_size(view.zoom, tile_size);
    let (cx, cy) = project(view.center, view.zoom, tile_size);
    let half_w = width as f64 / 2.0;
    let half_h = height as f64 / 2.0;

    let top = (cy - half_h).max(0.0);
    let bottom = (cy + half_h).min(size);
    let north = unproject(cx, top, view.zoom, tile_size).lat;
    let south = unproject(cx, bottom, view.zoom, tile_size).lat;

    let (west, east) = if width as f64 >= size {
        (MIN_LNG, MAX_LNG)
    } else {
        let west = unproject(cx - half_w, cy, view.zoom, tile_size).lng;
        let east = unproject(cx + half_w, cy, view.zoom, tile_size).lng;
        (wrap_lng(west), wrap_lng(east))
    };

    Bounds::new(north, south, east, west)
}

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lng` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 22)
#[inline]
pub fn to_tile_coords(lat: f64, lng: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LNG..=MAX_LNG).contains(&lng) {
        return Err(CoordError::InvalidLongitude(lng));
    }
    if zoom as f64 > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom as f64));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = n as u32 - 1;

    let col = (((lng + 180.0) / 360.0 * n) as u32).min(max_index);
    let lat_rad = lat * PI / 180.0;
    let row = (((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32).min(max_index);

    Ok(TileCoord { row, col, zoom })
}

/// Returns the latitude/longitude of a tile's north-west corner.
#[inline]
pub fn tile_to_lat_lng(tile: &TileCoord) -> LatLng {
    let n = 2.0_f64.powi(tile.zoom as i32);
    let lng = tile.col as f64 / n * 360.0 - 180.0;
    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    LatLng::new(lat_rad * 180.0 / PI, lng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_york_city_at_zoom_16() {
        let tile = to_tile_coords(40.7128, -74.0060, 16).unwrap();
        assert_eq!(tile.row, 24640);
        assert_eq!(tile.col, 19295);
        assert_eq!(tile.zoom, 16);
    }

    #[test]
    fn test_invalid_latitude() {
        let result = to_tile_coords(90.0, 0.0, 10);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_east_edge_stays_in_range() {
        let tile = to_tile_coords(0.0, 180.0, 3).unwrap();
        assert_eq!(tile.col, 7);
    }

    #[test]
    fn test_tile_to_lat_lng_northwest_corner() {
        let tile = TileCoord {
            row: 24640,
            col: 19295,
            zoom: 16,
        };
        let corner = tile_to_lat_lng(&tile);
        assert!((corner.lat - 40.713).abs() < 0.01);
        assert!((corner.lng - (-74.007)).abs() < 0.01);
    }

    #[test]
    fn test_wrap_lng() {
        assert_eq!(wrap_lng(0.0), 0.0);
        assert_eq!(wrap_lng(190.0), -170.0);
        assert_eq!(wrap_lng(-190.0), 170.0);
        assert_eq!(wrap_lng(180.0), 180.0);
        assert_eq!(wrap_lng(-180.0), -180.0);
    }

    #[test]
    fn test_project_origin() {
        let (x, y) = project(LatLng::new(0.0, 0.0), 0.0, 256);
        assert!((x - 128.0).abs() < 1e-9);
        assert!((y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_viewport_bounds_surround_center() {
        let view = ViewState::default();
        let bounds = viewport_bounds(&view, 800, 600, DEFAULT_TILE_SIZE);

        assert!(bounds.validate().is_ok());
        assert!(bounds.contains(view.center));
        assert!(bounds.north > view.center.lat);
        assert!(bounds.south < view.center.lat);
        assert!(bounds.east > view.center.lng);
        assert!(bounds.west < view.center.lng);
    }

    #[test]
    fn test_viewport_wider_than_world_spans_all_longitudes() {
        let view = ViewState::new(LatLng::new(0.0, 0.0), 0.0);
        let bounds = viewport_bounds(&view, 1024, 256, DEFAULT_TILE_SIZE);
        assert_eq!(bounds.west, -180.0);
        assert_eq!(bounds.east, 180.0);
    }

    #[test]
    fn test_viewport_crossing_antimeridian() {
        let view = ViewState::new(LatLng::new(0.0, 179.5), 6.0);
        let bounds = viewport_bounds(&view, 800, 600, DEFAULT_TILE_SIZE);
        assert!(bounds.crosses_antimeridian());
        assert!(bounds.contains(LatLng::new(0.0, -179.9)));
    }

    proptest! {
        #[test]
        fn prop_project_unproject_roundtrip(
            lat in -85.0f64..85.0,
            lng in -180.0f64..180.0,
            zoom in 0.0f64..22.0,
        ) {
            let (x, y) = project(LatLng::new(lat, lng), zoom, 256);
            let back = unproject(x, y, zoom, 256);
            prop_assert!((back.lat - lat).abs() < 1e-6);
            prop_assert!((back.lng - lng).abs() < 1e-6);
        }
    }
}
