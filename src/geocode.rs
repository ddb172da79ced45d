//! Reverse geocoding: coordinates → locality, region, country.
//!
//! The production implementation queries a Nominatim `/reverse` endpoint in
//! `geocodejson` format. OSM address data is patchy outside towns, so each
//! name is resolved from a priority list and the first non-empty value wins:
//!
//! ```text
//! locality: locality → admin level10 → admin level8 → admin level5 → city
//! region:   county → state
//! ```

use crate::config::GeocoderConfig;
use crate::http::{HttpClient, HttpError};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("invalid geocoder endpoint {0}: {1}")]
    Endpoint(String, #[source] url::ParseError),
    #[error("no places found at {0},{1}")]
    NoFeatures(f64, f64),
    #[error("no locality found at {0},{1}")]
    NoLocality(f64, f64),
    #[error("no region found at {0},{1}")]
    NoRegion(f64, f64),
}

/// Human-readable place names for a coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub locality: String,
    pub region: String,
    pub country: String,
}

/// Anything that can name a coordinate.
pub trait Geocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Place, GeocodeError>;
}

// ============================================================================
// geocodejson response
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: FeatureProperties,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub geocoding: Geocoding,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Geocoding {
    pub admin: AdminLevels,
    pub locality: String,
    pub city: String,
    pub county: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminLevels {
    pub level10: String,
    pub level8: String,
    pub level6: String,
    pub level5: String,
    pub level4: String,
}

/// First non-empty candidate. Whitespace counts as a value.
fn first_non_empty<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|s| !s.is_empty())
}

impl Geocoding {
    pub fn locality(&self) -> Option<&str> {
        first_non_empty(&[
            &self.locality,
            &self.admin.level10,
            &self.admin.level8,
            &self.admin.level5,
            &self.city,
        ])
    }

    pub fn region(&self) -> Option<&str> {
        first_non_empty(&[&self.county, &self.state])
    }
}

impl GeocodeResponse {
    /// Resolve the best place names from the first feature.
    pub fn place(&self, latitude: f64, longitude: f64) -> Result<Place, GeocodeError> {
        let geocoding = &self
            .features
            .first()
            .ok_or(GeocodeError::NoFeatures(latitude, longitude))?
            .properties
            .geocoding;
        let locality = geocoding
            .locality()
            .ok_or(GeocodeError::NoLocality(latitude, longitude))?;
        let region = geocoding
            .region()
            .ok_or(GeocodeError::NoRegion(latitude, longitude))?;
        Ok(Place {
            locality: locality.to_string(),
            region: region.to_string(),
            country: geocoding.country.clone(),
        })
    }
}

// ============================================================================
// Nominatim
// ============================================================================

pub struct NominatimGeocoder<'a> {
    endpoint: Url,
    zoom: u8,
    client: &'a HttpClient,
}

impl<'a> NominatimGeocoder<'a> {
    pub fn new(config: &GeocoderConfig, client: &'a HttpClient) -> Result<Self, GeocodeError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| GeocodeError::Endpoint(config.endpoint.clone(), e))?;
        Ok(Self {
            endpoint,
            zoom: config.zoom,
            client,
        })
    }

    pub fn request_url(&self, latitude: f64, longitude: f64) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("format", "geocodejson")
            .append_pair("zoom", &self.zoom.to_string())
            .append_pair("addressdetails", "1")
            .append_pair("lat", &latitude.to_string())
            .append_pair("lon", &longitude.to_string());
        url
    }
}

impl Geocoder for NominatimGeocoder<'_> {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Place, GeocodeError> {
        let url = self.request_url(latitude, longitude);
        tracing::debug!(latitude, longitude, "reverse geocoding");
        let response: GeocodeResponse = self.client.get_json(url.as_str())?;
        response.place(latitude, longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::test_helpers::geocodejson;
    use serde_json::json;

    fn response(geocoding: serde_json::Value) -> GeocodeResponse {
        serde_json::from_str(&geocodejson(geocoding)).unwrap()
    }

    #[test]
    fn locality_prefers_locality_field() {
        let r = response(json!({
            "locality": "Yelverton", "city": "Plymouth",
            "county": "Devon", "country": "United Kingdom"
        }));
        let place = r.place(50.5, -4.0).unwrap();
        assert_eq!(place.locality, "Yelverton");
        assert_eq!(place.region, "Devon");
        assert_eq!(place.country, "United Kingdom");
    }

    #[test]
    fn locality_falls_back_to_admin_level8() {
        let r = response(json!({
            "locality": "",
            "admin": {"level8": "Dartmoor", "level6": "Devon"},
            "city": "Plymouth",
            "state": "England"
        }));
        let geocoding = &r.features[0].properties.geocoding;
        assert_eq!(geocoding.locality(), Some("Dartmoor"));
    }

    #[test]
    fn locality_fallback_order() {
        let r = response(json!({"admin": {"level10": "Postbridge", "level8": "Dartmoor"}}));
        assert_eq!(r.features[0].properties.geocoding.locality(), Some("Postbridge"));

        let r = response(json!({"admin": {"level5": "South West"}, "city": "Exeter"}));
        assert_eq!(r.features[0].properties.geocoding.locality(), Some("South West"));

        let r = response(json!({"city": "Exeter"}));
        assert_eq!(r.features[0].properties.geocoding.locality(), Some("Exeter"));
    }

    #[test]
    fn region_falls_back_to_state() {
        let r = response(json!({"county": "", "state": "England"}));
        assert_eq!(r.features[0].properties.geocoding.region(), Some("England"));
    }

    #[test]
    fn whitespace_locality_is_kept() {
        let r = response(json!({"locality": " ", "city": "Exeter"}));
        assert_eq!(r.features[0].properties.geocoding.locality(), Some(" "));
    }

    #[test]
    fn missing_locality_is_error() {
        let r = response(json!({"county": "Devon"}));
        assert!(matches!(r.place(1.0, 2.0), Err(GeocodeError::NoLocality(..))));
    }

    #[test]
    fn missing_region_is_error() {
        let r = response(json!({"locality": "Yelverton"}));
        assert!(matches!(r.place(1.0, 2.0), Err(GeocodeError::NoRegion(..))));
    }

    #[test]
    fn no_features_is_error() {
        let r: GeocodeResponse =
            serde_json::from_str(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert!(matches!(r.place(1.0, 2.0), Err(GeocodeError::NoFeatures(..))));

        let r: GeocodeResponse = serde_json::from_str(r#"{"error": "Unable to geocode"}"#).unwrap();
        assert!(matches!(r.place(1.0, 2.0), Err(GeocodeError::NoFeatures(..))));
    }

    #[test]
    fn request_url_carries_query() {
        let client = HttpClient::new(&HttpConfig::default());
        let geocoder = NominatimGeocoder::new(&GeocoderConfig::default(), &client).unwrap();
        assert_eq!(
            geocoder.request_url(50.611904, -3.836313).as_str(),
            "https://nominatim.openstreetmap.org/reverse?format=geocodejson&zoom=18&addressdetails=1&lat=50.611904&lon=-3.836313"
        );
    }

    #[test]
    fn invalid_endpoint_is_error() {
        let client = HttpClient::new(&HttpConfig::default());
        let config = GeocoderConfig {
            endpoint: "nominatim".into(),
            zoom: 18,
        };
        assert!(matches!(
            NominatimGeocoder::new(&config, &client),
            Err(GeocodeError::Endpoint(..))
        ));
    }
}
