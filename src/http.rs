//! Blocking HTTP client shared by the geocoder, tile fetcher and bucket store.
//!
//! Public OpenStreetMap services require an identifying `User-Agent`, so one
//! agent is built from [`HttpConfig`] and reused for every request.

use crate::config::HttpConfig;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("failed to read response from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build();
        Self { agent }
    }

    /// GET `url` and return the full response body. Non-2xx is an error.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        tracing::debug!(url, "GET");
        let response = self.agent.get(url).call().map_err(|e| HttpError::Request {
            url: url.to_string(),
            source: Box::new(e),
        })?;
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| HttpError::Body {
                url: url.to_string(),
                source: e,
            })?;
        Ok(body)
    }

    /// GET `url` and decode the body as JSON.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let body = self.get_bytes(url)?;
        serde_json::from_slice(&body).map_err(|e| HttpError::Json {
            url: url.to_string(),
            source: e,
        })
    }
}
