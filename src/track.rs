//! Track statistics: distance, climb, moving time, time bounds.
//!
//! All calculations are pure functions over a parsed [`Gpx`], so they are
//! unit tested without touching the filesystem.
//!
//! ## Conventions
//!
//! - Distance is 2-D (haversine on a spherical Earth), elevation ignored.
//! - Distance, climb and moving time only accumulate between consecutive
//!   points of the *same* segment; a gap between segments (paused
//!   recording) contributes nothing.
//! - Ascent/descent skip any pair where either point lacks an elevation.

use crate::gpx::{Gpx, TrackPoint};
use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Error, Debug, PartialEq)]
pub enum TrackError {
    #[error("track has no points")]
    EmptyTrack,
    #[error("track has no timestamps")]
    MissingTimestamps,
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl From<&TrackPoint> for LatLon {
    fn from(p: &TrackPoint) -> Self {
        Self {
            lat: p.latitude,
            lon: p.longitude,
        }
    }
}

/// Aggregate view of a recorded track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    /// Every point, in recording order.
    pub path: Vec<LatLon>,
    pub first: LatLon,
    pub last: LatLon,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    /// Seconds spent at or above the moving-speed threshold.
    pub moving_time_secs: f64,
    pub distance_m: f64,
    pub ascent_m: f64,
    pub descent_m: f64,
}

impl TrackSummary {
    /// Wall-clock seconds between the first and last timestamp.
    pub fn elapsed_secs(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }
}

/// Great-circle distance between two points in metres.
pub fn haversine(a: LatLon, b: LatLon) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Summarize a parsed GPX document.
///
/// `min_moving_speed` is in metres per second; pairs of timed points whose
/// average speed is below it count as stopped.
pub fn summarize(gpx: &Gpx, min_moving_speed: f64) -> Result<TrackSummary, TrackError> {
    let path: Vec<LatLon> = gpx.points().map(LatLon::from).collect();
    let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
        return Err(TrackError::EmptyTrack);
    };

    let times: Vec<DateTime<FixedOffset>> = gpx.points().filter_map(|p| p.time).collect();
    let (Some(start_time), Some(end_time)) = (times.iter().min(), times.iter().max()) else {
        return Err(TrackError::MissingTimestamps);
    };

    let mut distance_m = 0.0;
    let mut ascent_m = 0.0;
    let mut descent_m = 0.0;
    let mut moving_time_secs = 0.0;

    for segment in gpx.segments() {
        for pair in segment.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let step = haversine(a.into(), b.into());
            distance_m += step;

            if let (Some(ea), Some(eb)) = (a.elevation, b.elevation) {
                let delta = eb - ea;
                if delta > 0.0 {
                    ascent_m += delta;
                } else {
                    descent_m -= delta;
                }
            }

            if let (Some(ta), Some(tb)) = (a.time, b.time) {
                let secs = (tb - ta).num_milliseconds() as f64 / 1000.0;
                if secs > 0.0 && step / secs >= min_moving_speed {
                    moving_time_secs += secs;
                }
            }
        }
    }

    Ok(TrackSummary {
        path,
        first,
        last,
        start_time: *start_time,
        end_time: *end_time,
        moving_time_secs,
        distance_m,
        ascent_m,
        descent_m,
    })
}
