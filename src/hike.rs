//! GPX hike import: track file → map image + geocoded hike record.
//!
//! For every `.gpx` file below the input directory (recursive, sorted by
//! name, extension matched case-insensitively):
//!
//! 1. parse the GPX and [`summarize`] it
//! 2. render the route to `{output}/{start}_map.png`
//! 3. reverse geocode the first and last points
//! 4. write the [`HikeRecord`] to `{output}/{start}_hike.json` and log it
//!
//! `{start}` is the start time in RFC 3339, e.g. `2024-05-01T10:00:00Z`.
//! A failure in any step fails the file; the run's [`FailurePolicy`] decides
//! whether that ends the run.

use crate::config::FailurePolicy;
use crate::geocode::{GeocodeError, Geocoder, Place};
use crate::gpx::{self, GpxError};
use crate::map::{MapError, StaticMap, save_png};
use crate::track::{LatLon, TrackError, TrackSummary, summarize};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum HikeError {
    #[error("failed to walk {0}: {1}")]
    Walk(PathBuf, #[source] walkdir::Error),
    #[error("failed to create output {0}: {1}")]
    OutputDir(PathBuf, #[source] std::io::Error),
    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: FileError,
    },
}

/// Why a single GPX file was not imported.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid GPX: {0}")]
    Gpx(#[from] GpxError),
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error("map rendering failed: {0}")]
    Map(#[from] MapError),
    #[error("geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),
    #[error("failed to encode hike: {0}")]
    Json(#[from] serde_json::Error),
}

/// A named point at one end of a hike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HikeLocation {
    pub locality: String,
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl HikeLocation {
    pub fn new(place: Place, point: LatLon) -> Self {
        Self {
            locality: place.locality,
            region: place.region,
            country: place.country,
            latitude: point.lat,
            longitude: point.lon,
        }
    }
}

impl fmt::Display for HikeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.locality, self.region)
    }
}

/// Everything worth knowing about one recorded hike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HikeRecord {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    /// Wall-clock seconds from start to end.
    #[serde(rename = "timeTaken")]
    pub time_taken_secs: i64,
    #[serde(rename = "movingTime")]
    pub moving_time_secs: f64,
    pub distance_meters: f64,
    pub ascent: f64,
    pub descent: f64,
    pub start_location: HikeLocation,
    pub end_location: HikeLocation,
}

impl HikeRecord {
    pub fn new(summary: &TrackSummary, start: Place, end: Place) -> Self {
        Self {
            start_time: summary.start_time,
            end_time: summary.end_time,
            time_taken_secs: summary.elapsed_secs(),
            moving_time_secs: summary.moving_time_secs,
            distance_meters: summary.distance_m,
            ascent: summary.ascent_m,
            descent: summary.descent_m,
            start_location: HikeLocation::new(start, summary.first),
            end_location: HikeLocation::new(end, summary.last),
        }
    }

    /// File name stem shared by the map and the record.
    pub fn stem(&self) -> String {
        self.start_time.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn map_file_name(&self) -> String {
        format!("{}_map.png", self.stem())
    }

    pub fn record_file_name(&self) -> String {
        format!("{}_hike.json", self.stem())
    }
}

impl fmt::Display for HikeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "from {} to {}. {:.2} km, {:.2}m ascent, {:.2}m descent in {}",
            self.start_location,
            self.end_location,
            self.distance_meters / 1000.0,
            self.ascent,
            self.descent,
            format_duration(self.time_taken_secs)
        )
    }
}

/// `4h05m30s`, `12m0s`, `42s`.
pub fn format_duration(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{sign}{h}h{m:02}m{s:02}s")
    } else if m > 0 {
        format!("{sign}{m}m{s}s")
    } else {
        format!("{sign}{s}s")
    }
}

/// One successfully imported GPX file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedHike {
    pub source: PathBuf,
    pub map_path: PathBuf,
    pub record_path: PathBuf,
    pub record: HikeRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a hike import run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HikeSummary {
    pub found: usize,
    pub imported: Vec<ImportedHike>,
    pub skipped: Vec<SkippedFile>,
}

/// The per-file pipeline and its collaborators.
pub struct HikeImporter<'a> {
    map: StaticMap<'a>,
    geocoder: &'a dyn Geocoder,
    min_moving_speed: f64,
}

impl<'a> HikeImporter<'a> {
    pub fn new(map: StaticMap<'a>, geocoder: &'a dyn Geocoder, min_moving_speed: f64) -> Self {
        Self {
            map,
            geocoder,
            min_moving_speed,
        }
    }

    /// Import one GPX file, writing its map and record into `output_dir`.
    pub fn process_file(&self, path: &Path, output_dir: &Path) -> Result<ImportedHike, FileError> {
        let xml = fs::read_to_string(path)?;
        let summary = summarize(&gpx::parse(&xml)?, self.min_moving_speed)?;

        let image = self.map.render(&summary.path, summary.first, summary.last)?;

        let start = self.geocoder.reverse(summary.first.lat, summary.first.lon)?;
        let end = self.geocoder.reverse(summary.last.lat, summary.last.lon)?;
        let record = HikeRecord::new(&summary, start, end);

        let map_path = output_dir.join(record.map_file_name());
        save_png(&image, &map_path)?;
        let record_path = output_dir.join(record.record_file_name());
        fs::write(&record_path, serde_json::to_string_pretty(&record)?)?;

        Ok(ImportedHike {
            source: path.to_path_buf(),
            map_path,
            record_path,
            record,
        })
    }
}

/// GPX files below `input_dir`, sorted by path.
pub fn find_gpx_files(input_dir: &Path) -> Result<Vec<PathBuf>, HikeError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(input_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| HikeError::Walk(input_dir.to_path_buf(), e))?;
        let is_gpx = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gpx"));
        if entry.file_type().is_file() && is_gpx {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Import every GPX file below `input_dir` into `output_dir`.
pub fn import_hikes(
    importer: &HikeImporter<'_>,
    input_dir: &Path,
    output_dir: &Path,
    policy: FailurePolicy,
) -> Result<HikeSummary, HikeError> {
    let files = find_gpx_files(input_dir)?;
    tracing::info!(count = files.len(), dir = %input_dir.display(), "found GPX files");
    fs::create_dir_all(output_dir).map_err(|e| HikeError::OutputDir(output_dir.to_path_buf(), e))?;

    let mut summary = HikeSummary {
        found: files.len(),
        ..Default::default()
    };

    for path in files {
        match importer.process_file(&path, output_dir) {
            Ok(hike) => {
                tracing::info!(path = %path.display(), "{}", hike.record);
                summary.imported.push(hike);
            }
            Err(source) => match policy {
                FailurePolicy::Abort => return Err(HikeError::File { path, source }),
                FailurePolicy::Skip => {
                    tracing::warn!(path = %path.display(), error = %source, "skipping GPX file");
                    summary.skipped.push(SkippedFile {
                        path,
                        reason: source.to_string(),
                    });
                }
            },
        }
    }

    Ok(summary)
}
