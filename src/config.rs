//! Tool configuration module.
//!
//! Handles loading, validating, and merging `blog-tools.toml`. Stock defaults
//! are serialized to a TOML table and the user's file is merged on top, so a
//! config file only needs the keys it wants to change. CLI flags override
//! the merged result.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [http]
//! user_agent = "blog-tools"
//! timeout_secs = 30
//!
//! [hikes]
//! input_dir = "gpx"          # Walked recursively for *.gpx
//! output_dir = "hikes"       # Maps and hike records land here
//! on_error = "abort"         # "abort" or "skip" a failing file
//! min_moving_speed = 0.5     # m/s; slower stretches don't count as moving
//!
//! [hikes.map]
//! width = 800
//! height = 600
//! padding = 32
//! max_zoom = 17
//! background = "#e5e3df"
//! path_color = "#ff0000"
//! path_width = 4.0
//! start_color = "#00ff00"
//! end_color = "#ff0000"
//! marker_size = 16.0
//! tile_url = "https://tile.openstreetmap.org/{z}/{x}/{y}.png"  # "" = no tiles
//!
//! [hikes.geocoder]
//! endpoint = "https://nominatim.openstreetmap.org/reverse"
//! zoom = 18
//!
//! [posts]
//! source = "micropub"        # Directory, or http(s):// bucket endpoint
//! output_dir = "."
//! on_error = "skip"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// What a pipeline does when a single item (one GPX file, one post) fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and continue with the next item.
    Skip,
    /// Stop the run and return the failure.
    Abort,
}

/// Top-level configuration loaded from `blog-tools.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Settings for outbound HTTP (geocoder, map tiles, bucket store).
    pub http: HttpConfig,
    /// GPX hike importer settings.
    pub hikes: HikesConfig,
    /// Micropub post importer settings.
    pub posts: PostsConfig,
}

impl ToolsConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "http.user_agent must not be empty".into(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "http.timeout_secs must be positive".into(),
            ));
        }
        let speed = self.hikes.min_moving_speed;
        if speed.is_nan() || speed < 0.0 {
            return Err(ConfigError::Validation(
                "hikes.min_moving_speed must be zero or positive".into(),
            ));
        }

        let map = &self.hikes.map;
        if map.width == 0 || map.height == 0 {
            return Err(ConfigError::Validation(
                "hikes.map width and height must be non-zero".into(),
            ));
        }
        if map.padding.saturating_mul(2) >= map.width.min(map.height) {
            return Err(ConfigError::Validation(
                "hikes.map.padding leaves no room to draw".into(),
            ));
        }
        if map.max_zoom > MAX_ZOOM {
            return Err(ConfigError::Validation(format!(
                "hikes.map.max_zoom must be 0-{MAX_ZOOM}"
            )));
        }
        if map.path_width.is_nan()
            || map.path_width <= 0.0
            || map.marker_size.is_nan()
            || map.marker_size <= 0.0
        {
            return Err(ConfigError::Validation(
                "hikes.map path_width and marker_size must be positive".into(),
            ));
        }
        for (key, value) in [
            ("background", &map.background),
            ("path_color", &map.path_color),
            ("start_color", &map.start_color),
            ("end_color", &map.end_color),
        ] {
            if parse_hex_color(value).is_none() {
                return Err(ConfigError::Validation(format!(
                    "hikes.map.{key} must be a #rrggbb color, got {value:?}"
                )));
            }
        }
        if self.hikes.geocoder.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "hikes.geocoder.endpoint must not be empty".into(),
            ));
        }
        if self.posts.source.trim().is_empty() {
            return Err(ConfigError::Validation(
                "posts.source must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Highest zoom level served by standard OSM tile servers.
pub const MAX_ZOOM: u8 = 19;

/// Outbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Sent with every request. Nominatim's usage policy asks for contact details.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "blog-tools".to_string(),
            timeout_secs: 30,
        }
    }
}

/// GPX hike importer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HikesConfig {
    /// Directory walked recursively for `.gpx` files.
    pub input_dir: String,
    /// Directory that receives `{start}_map.png` and `{start}_hike.json`.
    pub output_dir: String,
    /// Failure policy for a single GPX file.
    pub on_error: FailurePolicy,
    /// Minimum speed (m/s) for a stretch of track to count as moving time.
    pub min_moving_speed: f64,
    /// Static map rendering.
    pub map: MapConfig,
    /// Reverse geocoding service.
    pub geocoder: GeocoderConfig,
}

impl Default for HikesConfig {
    fn default() -> Self {
        Self {
            input_dir: "gpx".to_string(),
            output_dir: "hikes".to_string(),
            on_error: FailurePolicy::Abort,
            min_moving_speed: 0.5,
            map: MapConfig::default(),
            geocoder: GeocoderConfig::default(),
        }
    }
}

/// Static map rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
    /// Minimum gap (px) between the track and the image edge.
    pub padding: u32,
    pub max_zoom: u8,
    /// Fill colour where no tile is drawn.
    pub background: String,
    pub path_color: String,
    pub path_width: f32,
    pub start_color: String,
    pub end_color: String,
    /// Marker diameter in pixels.
    pub marker_size: f32,
    /// Raster tile URL template with `{z}`, `{x}`, `{y}`. Empty disables tiles.
    pub tile_url: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            padding: 32,
            max_zoom: 17,
            background: "#e5e3df".to_string(),
            path_color: "#ff0000".to_string(),
            path_width: 4.0,
            start_color: "#00ff00".to_string(),
            end_color: "#ff0000".to_string(),
            marker_size: 16.0,
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
        }
    }
}

/// Reverse geocoding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocoderConfig {
    /// Nominatim-compatible `/reverse` endpoint.
    pub endpoint: String,
    /// Address detail level (18 = building).
    pub zoom: u8,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/reverse".to_string(),
            zoom: 18,
        }
    }
}

/// Micropub post importer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostsConfig {
    /// Directory of microformat JSON files, or an `http(s)://` bucket endpoint.
    pub source: String,
    /// Root of the `{year}/{month}/{day}/{uid}/` post tree.
    pub output_dir: String,
    /// Failure policy for a single post.
    pub on_error: FailurePolicy,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            source: "micropub".to_string(),
            output_dir: ".".to_string(),
            on_error: FailurePolicy::Skip,
        }
    }
}

/// Parse a `#rrggbb` colour into RGB bytes.
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ToolsConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value. `Ok(None)` if it doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `path`, merged over stock defaults and validated.
///
/// A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<ToolsConfig, ConfigError> {
    let merged = match load_raw_config(path)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: ToolsConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `blog-tools.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# blog-tools configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
# Command-line flags override anything set here.

# ---------------------------------------------------------------------------
# Outbound HTTP (reverse geocoder, map tiles, bucket store)
# ---------------------------------------------------------------------------
[http]
# Identifies you to public services. Nominatim and the OSM tile servers
# ask for contact details here, e.g. "blog-tools (you@example.com)".
user_agent = "blog-tools"
timeout_secs = 30

# ---------------------------------------------------------------------------
# Hike importer: GPX tracks -> map image + start/end places
# ---------------------------------------------------------------------------
[hikes]
# Walked recursively for *.gpx files.
input_dir = "gpx"

# Receives {start}_map.png and {start}_hike.json for every track.
output_dir = "hikes"

# What to do when one file fails: "abort" the run or "skip" the file.
on_error = "abort"

# Stretches slower than this (metres per second) don't count as moving time.
min_moving_speed = 0.5

[hikes.map]
width = 800
height = 600

# Minimum gap in pixels between the track and the image edge.
padding = 32

# Closest zoom level used for very short tracks (0-19).
max_zoom = 17

# Colors are #rrggbb.
background = "#e5e3df"
path_color = "#ff0000"
path_width = 4.0
start_color = "#00ff00"
end_color = "#ff0000"
marker_size = 16.0

# Raster tiles drawn under the track. Set to "" to draw on the background only.
tile_url = "https://tile.openstreetmap.org/{z}/{x}/{y}.png"

[hikes.geocoder]
# Nominatim-compatible reverse geocoding endpoint (geocodejson output).
endpoint = "https://nominatim.openstreetmap.org/reverse"
zoom = 18

# ---------------------------------------------------------------------------
# Post importer: Micropub microformats JSON -> static-site posts
# ---------------------------------------------------------------------------
[posts]
# A directory of microformat JSON files, or the http(s):// endpoint of a
# public S3-compatible bucket.
source = "micropub"

# Posts are written to {output_dir}/{year}/{month}/{day}/{uid}/index.md
output_dir = "."

# What to do when one post fails to download or parse: "skip" or "abort".
on_error = "skip"
"##
}
