//! Rasterize a track onto a static map image.
//!
//! Drawing order: background fill → tiles (if a provider is set) → path →
//! start marker → end marker. Everything is drawn with plain pixel writes on
//! an `image::RgbaImage`; the result is saved as PNG.

use super::projection::Viewport;
use crate::config::{MapConfig, parse_hex_color};
use crate::http::{HttpClient, HttpError};
use crate::track::LatLon;
use image::{ImageFormat, Rgba, RgbaImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("nothing to draw: path is empty")]
    EmptyPath,
    #[error("invalid color {0:?}")]
    InvalidColor(String),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Source of raster map tiles.
pub trait TileProvider {
    /// Fetch tile `x`,`y` at `zoom`. Must return a `256×256` image.
    fn tile(&self, zoom: u8, x: u32, y: u32) -> Result<RgbaImage, MapError>;
}

/// Tiles fetched over HTTP from a `{z}/{x}/{y}` URL template.
pub struct HttpTileProvider<'a> {
    template: String,
    client: &'a HttpClient,
}

impl<'a> HttpTileProvider<'a> {
    pub fn new(template: impl Into<String>, client: &'a HttpClient) -> Self {
        Self {
            template: template.into(),
            client,
        }
    }

    pub fn url(&self, zoom: u8, x: u32, y: u32) -> String {
        self.template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

impl TileProvider for HttpTileProvider<'_> {
    fn tile(&self, zoom: u8, x: u32, y: u32) -> Result<RgbaImage, MapError> {
        let bytes = self.client.get_bytes(&self.url(zoom, x, y))?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }
}

/// Colours and sizes used to draw a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapStyle {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    pub max_zoom: u8,
    pub background: Rgba<u8>,
    pub path_color: Rgba<u8>,
    pub path_width: f32,
    pub start_color: Rgba<u8>,
    pub end_color: Rgba<u8>,
    pub marker_size: f32,
}

fn color(value: &str) -> Result<Rgba<u8>, MapError> {
    parse_hex_color(value)
        .map(|[r, g, b]| Rgba([r, g, b, 255]))
        .ok_or_else(|| MapError::InvalidColor(value.to_string()))
}

impl MapStyle {
    pub fn from_config(config: &MapConfig) -> Result<Self, MapError> {
        Ok(Self {
            width: config.width,
            height: config.height,
            padding: config.padding,
            max_zoom: config.max_zoom,
            background: color(&config.background)?,
            path_color: color(&config.path_color)?,
            path_width: config.path_width,
            start_color: color(&config.start_color)?,
            end_color: color(&config.end_color)?,
            marker_size: config.marker_size,
        })
    }
}

/// Draws tracks as static map images.
pub struct StaticMap<'a> {
    style: MapStyle,
    tiles: Option<&'a dyn TileProvider>,
}

impl<'a> StaticMap<'a> {
    pub fn new(style: MapStyle, tiles: Option<&'a dyn TileProvider>) -> Self {
        Self { style, tiles }
    }

    /// Render `path` with markers at `start` and `end`.
    pub fn render(
        &self,
        path: &[LatLon],
        start: LatLon,
        end: LatLon,
    ) -> Result<RgbaImage, MapError> {
        let style = &self.style;
        let viewport = Viewport::fit(
            path,
            style.width,
            style.height,
            style.padding,
            style.max_zoom,
        )
        .ok_or(MapError::EmptyPath)?;

        let mut canvas = RgbaImage::from_pixel(style.width, style.height, style.background);

        if let Some(provider) = self.tiles {
            for placement in viewport.tiles() {
                match provider.tile(placement.zoom, placement.x, placement.y) {
                    Ok(tile) => image::imageops::overlay(
                        &mut canvas,
                        &tile,
                        placement.screen_x,
                        placement.screen_y,
                    ),
                    Err(e) => tracing::warn!(
                        zoom = placement.zoom,
                        x = placement.x,
                        y = placement.y,
                        error = %e,
                        "map tile unavailable, leaving background"
                    ),
                }
            }
        }

        let radius = f64::from(style.path_width) / 2.0;
        let screen: Vec<(f64, f64)> = path.iter().map(|p| viewport.to_screen(*p)).collect();
        if let [only] = screen.as_slice() {
            fill_circle(&mut canvas, *only, radius, style.path_color);
        }
        for pair in screen.windows(2) {
            draw_line(&mut canvas, pair[0], pair[1], radius, style.path_color);
        }

        let marker = f64::from(style.marker_size) / 2.0;
        draw_marker(&mut canvas, viewport.to_screen(start), marker, style.start_color);
        draw_marker(&mut canvas, viewport.to_screen(end), marker, style.end_color);

        Ok(canvas)
    }
}

/// Save an image as PNG.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), MapError> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

// ============================================================================
// Primitives
// ============================================================================

/// Fill every pixel whose centre lies within `radius` of `centre`.
fn fill_circle(canvas: &mut RgbaImage, centre: (f64, f64), radius: f64, color: Rgba<u8>) {
    let (cx, cy) = centre;
    let r = radius.max(0.5);
    let x_min = (cx - r).floor().max(0.0) as i64;
    let y_min = (cy - r).floor().max(0.0) as i64;
    let x_max = ((cx + r).ceil() as i64).min(i64::from(canvas.width()) - 1);
    let y_max = ((cy + r).ceil() as i64).min(i64::from(canvas.height()) - 1);
    for y in y_min..=y_max {
        for x in x_min..=x_max {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= r * r {
                canvas.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Thick line: stamp discs along the segment at half-pixel steps.
fn draw_line(
    canvas: &mut RgbaImage,
    from: (f64, f64),
    to: (f64, f64),
    radius: f64,
    color: Rgba<u8>,
) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = ((dx.hypot(dy) * 2.0).ceil() as usize).max(1);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        fill_circle(canvas, (from.0 + dx * t, from.1 + dy * t), radius, color);
    }
}

/// Filled disc with a one-pixel dark outline.
fn draw_marker(canvas: &mut RgbaImage, centre: (f64, f64), radius: f64, color: Rgba<u8>) {
    let Rgba([r, g, b, _]) = color;
    let outline = Rgba([r / 3, g / 3, b / 3, 255]);
    fill_circle(canvas, centre, radius, outline);
    fill_circle(canvas, centre, (radius - 1.5).max(0.5), color);
}
