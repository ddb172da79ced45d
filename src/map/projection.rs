//! Web Mercator math for placing a track on a fixed-size image.
//!
//! Pure functions only; no drawing. Coordinates are "world pixels": the
//! whole globe at zoom `z` is a square of `256 · 2^z` pixels with the origin
//! at the top-left (180°W, ~85°N), matching the OSM tile grid.

use crate::track::LatLon;
use std::f64::consts::PI;

/// Edge length of one raster tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude beyond which Web Mercator is undefined.
const MAX_LATITUDE: f64 = 85.051_128_78;

/// World size in pixels at `zoom`.
pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * f64::from(1u32 << zoom)
}

/// Project a point to world pixels at `zoom`.
pub fn project(point: LatLon, zoom: u8) -> (f64, f64) {
    let size = world_size(zoom);
    let x = (point.lon + 180.0) / 360.0 * size;
    let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    (x, y)
}

/// The visible window of the world at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: u8,
    /// World-pixel coordinates of the image's top-left corner.
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: u32,
    pub height: u32,
}

/// One tile that intersects a viewport and where to draw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePlacement {
    pub zoom: u8,
    /// Tile column, wrapped into `0..2^zoom`.
    pub x: u32,
    pub y: u32,
    /// Image position of the tile's top-left corner (may be negative).
    pub screen_x: i64,
    pub screen_y: i64,
}

impl Viewport {
    /// Pick the closest zoom (≤ `max_zoom`) at which every point fits inside
    /// the image minus `padding` on each side, centred on the points'
    /// bounding box. Returns `None` for an empty slice.
    pub fn fit(
        points: &[LatLon],
        width: u32,
        height: u32,
        padding: u32,
        max_zoom: u8,
    ) -> Option<Self> {
        let first = points.first()?;
        let (mut min_lat, mut max_lat) = (first.lat, first.lat);
        let (mut min_lon, mut max_lon) = (first.lon, first.lon);
        for p in points {
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
            min_lon = min_lon.min(p.lon);
            max_lon = max_lon.max(p.lon);
        }
        let top_left = LatLon {
            lat: max_lat,
            lon: min_lon,
        };
        let bottom_right = LatLon {
            lat: min_lat,
            lon: max_lon,
        };

        let usable_w = f64::from(width.saturating_sub(padding.saturating_mul(2)));
        let usable_h = f64::from(height.saturating_sub(padding.saturating_mul(2)));

        let zoom = (0..=max_zoom)
            .rev()
            .find(|&z| {
                let (x0, y0) = project(top_left, z);
                let (x1, y1) = project(bottom_right, z);
                x1 - x0 <= usable_w && y1 - y0 <= usable_h
            })
            .unwrap_or(0);

        let (x0, y0) = project(top_left, zoom);
        let (x1, y1) = project(bottom_right, zoom);
        let (cx, cy) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        Some(Self {
            zoom,
            origin_x: cx - f64::from(width) / 2.0,
            origin_y: cy - f64::from(height) / 2.0,
            width,
            height,
        })
    }

    /// Image coordinates of a point.
    pub fn to_screen(&self, point: LatLon) -> (f64, f64) {
        let (x, y) = project(point, self.zoom);
        (x - self.origin_x, y - self.origin_y)
    }

    /// Tiles covering the viewport, row by row.
    ///
    /// Columns wrap around the antimeridian; rows outside the world are
    /// left out.
    pub fn tiles(&self) -> Vec<TilePlacement> {
        let count = 1i64 << self.zoom;
        let tile = TILE_SIZE as i64;
        let first_x = (self.origin_x / TILE_SIZE).floor() as i64;
        let first_y = (self.origin_y / TILE_SIZE).floor() as i64;
        let last_x = ((self.origin_x + f64::from(self.width) - 1.0) / TILE_SIZE).floor() as i64;
        let last_y = ((self.origin_y + f64::from(self.height) - 1.0) / TILE_SIZE).floor() as i64;

        let mut tiles = Vec::new();
        for ty in first_y.max(0)..=last_y.min(count - 1) {
            for tx in first_x..=last_x {
                tiles.push(TilePlacement {
                    zoom: self.zoom,
                    x: tx.rem_euclid(count) as u32,
                    y: ty as u32,
                    screen_x: (tx * tile) - self.origin_x.round() as i64,
                    screen_y: (ty * tile) - self.origin_y.round() as i64,
                });
            }
        }
        tiles
    }
}
