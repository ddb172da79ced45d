//! Minimal GPX 1.0/1.1 track reader.
//!
//! Only what hike summaries need is read: `trk/trkseg/trkpt` with `lat`,
//! `lon`, and optional `ele` and `time`. Waypoints, routes and extensions
//! (heart rate, cadence, ...) are skipped.
//!
//! ```xml
//! <gpx version="1.1">
//!   <trk><trkseg>
//!     <trkpt lat="50.611904" lon="-3.836313">
//!       <ele>312.4</ele>
//!       <time>2024-05-01T10:03:17Z</time>
//!     </trkpt>
//!   </trkseg></trk>
//! </gpx>
//! ```

use chrono::{DateTime, FixedOffset};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpxError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attr(#[from] AttrError),
    #[error("track point is missing its {0} attribute")]
    MissingCoordinate(&'static str),
    #[error("invalid number for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid timestamp {0:?}")]
    InvalidTime(String),
}

/// A parsed GPX document: tracks, each made of segments of points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gpx {
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: Option<String>,
    pub segments: Vec<Vec<TrackPoint>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Metres above sea level.
    pub elevation: Option<f64>,
    pub time: Option<DateTime<FixedOffset>>,
}

impl Gpx {
    /// All points of all segments of all tracks, in document order.
    pub fn points(&self) -> impl Iterator<Item = &TrackPoint> {
        self.segments().flatten()
    }

    /// Every segment in document order.
    pub fn segments(&self) -> impl Iterator<Item = &Vec<TrackPoint>> {
        self.tracks.iter().flat_map(|t| t.segments.iter())
    }
}

/// Text content we're currently collecting.
#[derive(Clone, Copy, PartialEq)]
enum Field {
    None,
    TrackName,
    Elevation,
    Time,
}

/// Parse a GPX document.
pub fn parse(xml: &str) -> Result<Gpx, GpxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut gpx = Gpx::default();
    let mut point: Option<TrackPoint> = None;
    let mut in_track = false;
    let mut field = Field::None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trk" => {
                    in_track = true;
                    gpx.tracks.push(Track::default());
                }
                b"name" if in_track && point.is_none() => field = Field::TrackName,
                b"trkseg" if in_track => {
                    if let Some(track) = gpx.tracks.last_mut() {
                        track.segments.push(Vec::new());
                    }
                }
                b"trkpt" if in_track => point = Some(start_point(&e)?),
                b"ele" if point.is_some() => field = Field::Elevation,
                b"time" if point.is_some() => field = Field::Time,
                _ => field = Field::None,
            },
            // <trkpt lat=".." lon=".."/> with no children
            Event::Empty(e) if in_track && e.local_name().as_ref() == b"trkpt" => {
                push_point(&mut gpx, start_point(&e)?);
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                let text = text.trim();
                match (field, point.as_mut()) {
                    (Field::Elevation, Some(p)) => p.elevation = Some(parse_number("ele", text)?),
                    (Field::Time, Some(p)) => p.time = Some(parse_time(text)?),
                    (Field::TrackName, _) => {
                        if let Some(track) = gpx.tracks.last_mut() {
                            track.name = Some(text.to_string());
                        }
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"trk" => in_track = false,
                    b"trkpt" => {
                        if let Some(p) = point.take() {
                            push_point(&mut gpx, p);
                        }
                    }
                    _ => {}
                }
                field = Field::None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(gpx)
}

/// Append to the current segment, opening one if the track has none.
fn push_point(gpx: &mut Gpx, point: TrackPoint) {
    if let Some(track) = gpx.tracks.last_mut() {
        if track.segments.is_empty() {
            track.segments.push(Vec::new());
        }
        if let Some(segment) = track.segments.last_mut() {
            segment.push(point);
        }
    }
}

fn start_point(e: &BytesStart<'_>) -> Result<TrackPoint, GpxError> {
    Ok(TrackPoint {
        latitude: coordinate(e, "lat")?,
        longitude: coordinate(e, "lon")?,
        elevation: None,
        time: None,
    })
}

fn coordinate(e: &BytesStart<'_>, name: &'static str) -> Result<f64, GpxError> {
    let attr = e
        .try_get_attribute(name)?
        .ok_or(GpxError::MissingCoordinate(name))?;
    let value = attr.unescape_value()?;
    parse_number(name, value.trim())
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, GpxError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GpxError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_time(value: &str) -> Result<DateTime<FixedOffset>, GpxError> {
    DateTime::parse_from_rfc3339(value).map_err(|_| GpxError::InvalidTime(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gpx_document, sample_gpx};

    #[test]
    fn parse_reads_points_with_elevation_and_time() {
        let gpx = parse(&sample_gpx()).unwrap();
        assert_eq!(gpx.tracks.len(), 1);
        assert_eq!(gpx.tracks[0].name.as_deref(), Some("Test"));
        assert_eq!(gpx.tracks[0].segments.len(), 1);

        let points: Vec<&TrackPoint> = gpx.points().collect();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].latitude, 50.0);
        assert_eq!(points[0].longitude, -3.8);
        assert_eq!(points[1].elevation, Some(110.0));
        assert_eq!(
            points[2].time.unwrap().to_rfc3339(),
            "2024-05-01T10:20:00+00:00"
        );
    }

    #[test]
    fn parse_keeps_segments_and_tracks_apart() {
        let xml = r#"<gpx>
  <trk>
    <trkseg><trkpt lat="1" lon="1"/><trkpt lat="2" lon="2"/></trkseg>
    <trkseg><trkpt lat="3" lon="3"/></trkseg>
  </trk>
  <trk><trkseg><trkpt lat="4" lon="4"></trkpt></trkseg></trk>
</gpx>"#;
        let gpx = parse(xml).unwrap();
        assert_eq!(gpx.tracks.len(), 2);
        assert_eq!(gpx.tracks[0].segments.len(), 2);
        assert_eq!(gpx.tracks[0].segments[0].len(), 2);
        let lats: Vec<f64> = gpx.points().map(|p| p.latitude).collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn parse_ignores_waypoints_and_routes() {
        let xml = r#"<gpx>
  <wpt lat="9" lon="9"><ele>1</ele><name>Cairn</name></wpt>
  <rte><rtept lat="8" lon="8"/></rte>
  <trk><trkseg><trkpt lat="1" lon="2"><ele>5</ele><extensions><hr>120</hr></extensions></trkpt></trkseg></trk>
</gpx>"#;
        let gpx = parse(xml).unwrap();
        let points: Vec<&TrackPoint> = gpx.points().collect();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].elevation, Some(5.0));
    }

    #[test]
    fn parse_point_without_segment_opens_one() {
        let gpx = parse(r#"<gpx><trk><trkpt lat="1" lon="2"/></trk></gpx>"#).unwrap();
        assert_eq!(gpx.tracks[0].segments, vec![vec![TrackPoint {
            latitude: 1.0,
            longitude: 2.0,
            elevation: None,
            time: None,
        }]]);
    }

    #[test]
    fn parse_empty_document_has_no_points() {
        let gpx = parse("<gpx></gpx>").unwrap();
        assert_eq!(gpx.points().count(), 0);
    }

    #[test]
    fn parse_rejects_missing_longitude() {
        let err = parse(r#"<gpx><trk><trkseg><trkpt lat="1"/></trkseg></trk></gpx>"#).unwrap_err();
        assert!(matches!(err, GpxError::MissingCoordinate("lon")));
    }

    #[test]
    fn parse_rejects_bad_numbers() {
        let err = parse(&gpx_document(&[(50.0, f64::NAN, None, None)])).unwrap_err();
        assert!(matches!(err, GpxError::InvalidNumber { field: "lon", .. }));
    }

    #[test]
    fn parse_rejects_bad_time() {
        let err = parse(&gpx_document(&[(50.0, -3.0, None, Some("yesterday"))])).unwrap_err();
        assert!(matches!(err, GpxError::InvalidTime(_)));
    }

    #[test]
    fn parse_rejects_malformed_xml() {
        let err = parse("<gpx><trk></gpx>").unwrap_err();
        assert!(matches!(err, GpxError::Xml(_)));
    }
}
