//! Post records extracted from Micropub h-entry objects.
//!
//! A [`PostRecord`] is the normalized, strongly-shaped form of a photo post.
//! It serializes in the Hugo front-matter layout the blog templates read:
//!
//! ```json
//! {
//!   "date": "2024-05-01T11:03:17+01:00",
//!   "tags": ["ldw", "hike"],
//!   "params": {
//!     "uid": "abc123",
//!     "photo": "https://media.example/img.jpg",
//!     "location": {
//!       "locality": "Yelverton", "region": "Devon", "country": "United Kingdom",
//!       "lat": "50.611904", "lon": "-3.836313"
//!     },
//!     "caption": "caption text"
//!   }
//! }
//! ```
//!
//! Extraction is fail-fast: the first missing or malformed field aborts the
//! whole record and is reported with its property name. Every imported post
//! is geotagged, so a post whose location cannot be resolved is rejected
//! rather than imported with blanks.

use crate::microformats::{FieldError, Microformat, ParseError};
use chrono::{DateTime, Datelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw bytes could not be turned into a [`PostRecord`].
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Decode(#[from] ParseError),
    #[error("invalid post: {0}")]
    Field(#[from] FieldError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// ISO-8601 timestamp from `published`.
    #[serde(rename = "date")]
    pub published_date: String,
    /// Tags from `category`, in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub params: PostParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostParams {
    pub uid: String,
    #[serde(rename = "photo")]
    pub photo_url: String,
    pub location: PostLocation,
    pub caption: String,
}

/// Where a post was made. Coordinates stay strings to keep source precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLocation {
    pub locality: String,
    pub region: String,
    pub country: String,
    #[serde(rename = "lat")]
    pub latitude: String,
    #[serde(rename = "lon")]
    pub longitude: String,
}

/// Zero-padded archive path components of a post's publish date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParts {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl PostRecord {
    /// Build a record from an h-entry.
    ///
    /// Fields are read in a fixed order (`published`, `category`, `photo`,
    /// `content`, `location`, `uid`) and the first failure is returned as-is.
    /// `category` must be present, but an empty list (or one with no string
    /// values) means the post has no tags.
    pub fn from_microformat(mf: &Microformat) -> Result<Self, FieldError> {
        let published_date = mf.first_string("published")?.to_string();
        let tags = match mf.string_slice("category") {
            Ok(tags) => tags,
            Err(FieldError::Empty(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        let photo_url = mf.first_string("photo")?.to_string();
        let caption = mf.first_string("content")?.to_string();
        let location = extract_location(mf, "location")?;
        let uid = mf.first_string("uid")?.to_string();

        Ok(Self {
            published_date,
            tags,
            params: PostParams {
                uid,
                photo_url,
                location,
                caption,
            },
        })
    }

    /// Decode microformat JSON and extract a record in one step.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ExtractError> {
        let mf = Microformat::parse(bytes)?;
        Ok(Self::from_microformat(&mf)?)
    }

    pub fn uid(&self) -> &str {
        &self.params.uid
    }

    /// Year, month and day of the publish date, in the date's own offset.
    ///
    /// `2024-05-01T00:30:00+01:00` is filed under `2024/05/01` even though
    /// it is still April 30th in UTC.
    pub fn date_parts(&self) -> Result<DateParts, chrono::ParseError> {
        let date = DateTime::parse_from_rfc3339(&self.published_date)?;
        Ok(DateParts {
            year: format!("{:04}", date.year()),
            month: format!("{:02}", date.month()),
            day: format!("{:02}", date.day()),
        })
    }
}

/// Read an h-adr (with nested h-geo) into a location. All fields are required.
pub fn extract_location(mf: &Microformat, prop: &str) -> Result<PostLocation, FieldError> {
    let adr = mf.first_microformat(prop)?;
    let locality = adr.first_string("locality")?.to_string();
    let region = adr.first_string("region")?.to_string();
    let country = adr.first_string("country-name")?.to_string();

    let geo = adr.first_microformat("geo")?;
    let latitude = geo.first_string("latitude")?.to_string();
    let longitude = geo.first_string("longitude")?.to_string();

    Ok(PostLocation {
        locality,
        region,
        country,
        latitude,
        longitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{CANONICAL_ENTRY, canonical_json, sample_post};

    fn entry_without(path: &[&str]) -> Vec<u8> {
        let mut json = canonical_json();
        let (last, parents) = path.split_last().unwrap();
        let mut node = &mut json;
        for key in parents {
            node = &mut node["properties"][*key][0];
        }
        node["properties"].as_object_mut().unwrap().remove(*last);
        serde_json::to_vec(&json).unwrap()
    }

    #[test]
    fn canonical_entry_extracts_every_field() {
        let post = PostRecord::from_json(CANONICAL_ENTRY.as_bytes()).unwrap();
        assert_eq!(post.published_date, "2024-05-01T11:03:17+01:00");
        assert_eq!(post.tags, vec!["ldw", "hike"]);
        assert_eq!(post.uid(), "abc123");
        assert_eq!(post.params.photo_url, "https://media.example/img.jpg");
        assert_eq!(post.params.caption, "caption text");
        assert_eq!(post.params.location.locality, "Yelverton");
        assert_eq!(post.params.location.region, "Devon");
        assert_eq!(post.params.location.country, "United Kingdom");
        assert_eq!(post.params.location.latitude, "50.611904");
        assert_eq!(post.params.location.longitude, "-3.836313");
    }

    #[test]
    fn missing_longitude_fails_whole_post() {
        let bytes = entry_without(&["location", "geo", "longitude"]);
        let err = PostRecord::from_json(&bytes).unwrap_err();
        match err {
            ExtractError::Field(e) => assert_eq!(e, FieldError::Missing("longitude".into())),
            other => panic!("expected field error, got {other:?}"),
        }
    }

    #[test]
    fn missing_country_fails_before_geo() {
        let bytes = entry_without(&["location", "country-name"]);
        let mf = Microformat::parse(&bytes).unwrap();
        assert_eq!(
            PostRecord::from_microformat(&mf),
            Err(FieldError::Missing("country-name".into()))
        );
    }

    #[test]
    fn first_failure_wins() {
        // Both photo and uid are missing; photo is read first.
        let mut json = canonical_json();
        let props = json["properties"].as_object_mut().unwrap();
        props.remove("photo");
        props.remove("uid");
        let mf = Microformat::parse(&serde_json::to_vec(&json).unwrap()).unwrap();
        assert_eq!(
            PostRecord::from_microformat(&mf),
            Err(FieldError::Missing("photo".into()))
        );
    }

    #[test]
    fn missing_published_is_reported() {
        let bytes = entry_without(&["published"]);
        let mf = Microformat::parse(&bytes).unwrap();
        assert_eq!(
            PostRecord::from_microformat(&mf).unwrap_err().field(),
            "published"
        );
    }

    #[test]
    fn location_as_plain_string_is_type_mismatch() {
        let mut json = canonical_json();
        json["properties"]["location"] = serde_json::json!(["Yelverton, Devon"]);
        let mf = Microformat::parse(&serde_json::to_vec(&json).unwrap()).unwrap();
        assert_eq!(
            PostRecord::from_microformat(&mf),
            Err(FieldError::TypeMismatch("location".into()))
        );
    }

    #[test]
    fn missing_category_fails_post() {
        let bytes = entry_without(&["category"]);
        let mf = Microformat::parse(&bytes).unwrap();
        assert_eq!(
            PostRecord::from_microformat(&mf),
            Err(FieldError::Missing("category".into()))
        );
    }

    #[test]
    fn empty_category_means_no_tags() {
        for category in [serde_json::json!([]), serde_json::json!([1, null])] {
            let mut json = canonical_json();
            json["properties"]["category"] = category;
            let post = PostRecord::from_json(&serde_json::to_vec(&json).unwrap()).unwrap();
            assert!(post.tags.is_empty());
            assert!(serde_json::to_value(&post).unwrap().get("tags").is_none());
        }
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let err = PostRecord::from_json(b"not json").unwrap_err();
        assert!(matches!(err, ExtractError::Decode(_)));
    }

    #[test]
    fn serializes_in_hugo_layout() {
        let json = serde_json::to_value(sample_post()).unwrap();
        assert_eq!(json["date"], "2024-05-01T11:03:17+01:00");
        assert_eq!(json["params"]["photo"], "https://media.example/img.jpg");
        assert_eq!(json["params"]["location"]["lat"], "50.611904");
        assert_eq!(json["params"]["location"]["lon"], "-3.836313");
    }

    #[test]
    fn empty_tags_are_omitted() {
        let mut post = sample_post();
        post.tags.clear();
        let json = serde_json::to_value(&post).unwrap();
        assert!(json.get("tags").is_none());
        let back: PostRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, post);
    }

    #[test]
    fn serialization_round_trips() {
        let post = sample_post();
        let encoded = serde_json::to_string(&post).unwrap();
        let decoded: PostRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, post);
    }

    #[test]
    fn date_parts_use_timestamp_offset() {
        let mut post = sample_post();
        post.published_date = "2024-05-01T00:30:00+01:00".into();
        let parts = post.date_parts().unwrap();
        assert_eq!(
            parts,
            DateParts {
                year: "2024".into(),
                month: "05".into(),
                day: "01".into(),
            }
        );
    }

    #[test]
    fn date_parts_reject_non_rfc3339() {
        let mut post = sample_post();
        post.published_date = "May 1st".into();
        assert!(post.date_parts().is_err());
    }
}
