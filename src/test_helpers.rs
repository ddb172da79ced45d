//! Shared test utilities for the blog-tools test suite.
//!
//! Provides canonical fixtures (an h-entry, a GPX track, a geocoder reply)
//! and stub collaborators so pipeline tests never touch the network.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let post = PostRecord::from_json(CANONICAL_ENTRY.as_bytes()).unwrap();
//! assert_eq!(post, sample_post());
//! ```

use crate::geocode::{GeocodeError, Geocoder, Place};
use crate::post::{PostLocation, PostParams, PostRecord};
use std::cell::RefCell;

// =========================================================================
// Micropub fixtures
// =========================================================================

/// A complete photo h-entry with a geotagged h-adr location.
pub const CANONICAL_ENTRY: &str = r#"{"type":["h-entry"],"properties":{"published":["2024-05-01T11:03:17+01:00"],"category":["ldw","hike"],"photo":["https://media.example/img.jpg"],"content":["caption text"],"uid":["abc123"],"location":[{"type":["h-adr"],"properties":{"locality":["Yelverton"],"region":["Devon"],"country-name":["United Kingdom"],"geo":[{"type":["h-geo"],"properties":{"latitude":["50.611904"],"longitude":["-3.836313"]}}]}}]}}"#;

/// [`CANONICAL_ENTRY`] as a mutable JSON tree, for building broken variants.
pub fn canonical_json() -> serde_json::Value {
    serde_json::from_str(CANONICAL_ENTRY).unwrap()
}

/// The record [`CANONICAL_ENTRY`] extracts to.
pub fn sample_post() -> PostRecord {
    PostRecord {
        published_date: "2024-05-01T11:03:17+01:00".into(),
        tags: vec!["ldw".into(), "hike".into()],
        params: PostParams {
            uid: "abc123".into(),
            photo_url: "https://media.example/img.jpg".into(),
            location: PostLocation {
                locality: "Yelverton".into(),
                region: "Devon".into(),
                country: "United Kingdom".into(),
                latitude: "50.611904".into(),
                longitude: "-3.836313".into(),
            },
            caption: "caption text".into(),
        },
    }
}

/// An h-entry for `uid` published at `published`, otherwise canonical.
pub fn entry_json(uid: &str, published: &str) -> Vec<u8> {
    let mut json = canonical_json();
    json["properties"]["uid"] = serde_json::json!([uid]);
    json["properties"]["published"] = serde_json::json!([published]);
    serde_json::to_vec(&json).unwrap()
}

// =========================================================================
// GPX fixtures
// =========================================================================

/// Build a single-segment GPX document from `(lat, lon, ele, time)` rows.
pub fn gpx_document(points: &[(f64, f64, Option<f64>, Option<&str>)]) -> String {
    let mut doc = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><name>Test</name><trkseg>
"#,
    );
    for (lat, lon, ele, time) in points {
        doc.push_str(&format!(r#"    <trkpt lat="{lat}" lon="{lon}">"#));
        if let Some(ele) = ele {
            doc.push_str(&format!("<ele>{ele}</ele>"));
        }
        if let Some(time) = time {
            doc.push_str(&format!("<time>{time}</time>"));
        }
        doc.push_str("</trkpt>\n");
    }
    doc.push_str("  </trkseg></trk>\n</gpx>\n");
    doc
}

/// A short walk heading north: three points 0.001° apart, 10 minutes each.
pub fn sample_gpx() -> String {
    gpx_document(&[
        (50.0, -3.8, Some(100.0), Some("2024-05-01T10:00:00Z")),
        (50.001, -3.8, Some(110.0), Some("2024-05-01T10:10:00Z")),
        (50.002, -3.8, Some(105.0), Some("2024-05-01T10:20:00Z")),
    ])
}

// =========================================================================
// Geocoder fixtures
// =========================================================================

/// Nominatim geocodejson reply with the given geocoding properties.
pub fn geocodejson(geocoding: serde_json::Value) -> String {
    serde_json::json!({
        "type": "FeatureCollection",
        "geocoding": {"version": "0.1.0", "attribution": "test"},
        "features": [{
            "type": "Feature",
            "properties": {"geocoding": geocoding},
            "geometry": {"type": "Point", "coordinates": [-3.8, 50.0]}
        }]
    })
    .to_string()
}

/// Geocoder that answers every lookup with the same place and records calls.
pub struct StubGeocoder {
    pub place: Place,
    pub calls: RefCell<Vec<(f64, f64)>>,
}

impl StubGeocoder {
    pub fn new(locality: &str, region: &str) -> Self {
        Self {
            place: Place {
                locality: locality.into(),
                region: region.into(),
                country: "United Kingdom".into(),
            },
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl Geocoder for StubGeocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Place, GeocodeError> {
        self.calls.borrow_mut().push((latitude, longitude));
        Ok(self.place.clone())
    }
}
