//! Where Micropub objects are fetched from.
//!
//! The post importer only needs two operations, list and download, so the
//! source is an [`ObjectStore`] trait with two implementations:
//!
//! - [`DirectoryStore`]: a local directory (e.g. a synced copy of the bucket)
//! - [`BucketStore`]: a public S3-compatible bucket read over plain HTTP
//!
//! Keys are `/`-separated paths relative to the store root in both cases.

use crate::http::{HttpClient, HttpError};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::Url;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to walk {0}: {1}")]
    Walk(PathBuf, #[source] walkdir::Error),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("invalid bucket listing: {0}")]
    Listing(#[from] quick_xml::Error),
    #[error("invalid bucket endpoint {0}: {1}")]
    Endpoint(String, #[source] url::ParseError),
    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

/// A flat namespace of objects addressed by key.
pub trait ObjectStore {
    /// Every object key, in a stable order.
    fn list(&self) -> Result<Vec<String>, StoreError>;

    /// The full contents of one object.
    fn download(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// Where the post importer reads from, as written in config or on the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostSource {
    Directory(PathBuf),
    Bucket(String),
}

impl PostSource {
    /// `http://` and `https://` values are bucket endpoints, anything else a path.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            PostSource::Bucket(value.to_string())
        } else {
            PostSource::Directory(PathBuf::from(value))
        }
    }
}

// ============================================================================
// Directory store
// ============================================================================

/// Objects are the regular files below `root`, at any depth.
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path, refusing keys that would leave the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for DirectoryStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| StoreError::Walk(self.root.clone(), e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            keys.push(key.join("/"));
        }
        Ok(keys)
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        Ok(fs::read(self.resolve(key)?)?)
    }
}

// ============================================================================
// Bucket store
// ============================================================================

/// A public bucket read with unsigned `ListObjectsV2` and `GET` requests.
///
/// `endpoint` is the bucket's base URL, e.g.
/// `https://my-bucket.s3.eu-west-2.amazonaws.com`.
pub struct BucketStore<'a> {
    endpoint: Url,
    client: &'a HttpClient,
}

/// One page of a `ListObjectsV2` response.
#[derive(Debug, Default, PartialEq)]
pub struct ListingPage {
    pub keys: Vec<String>,
    /// Present when the listing is truncated and more pages follow.
    pub continuation_token: Option<String>,
}

impl<'a> BucketStore<'a> {
    pub fn new(endpoint: &str, client: &'a HttpClient) -> Result<Self, StoreError> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| StoreError::Endpoint(endpoint.to_string(), e))?;
        Ok(Self { endpoint, client })
    }

    fn listing_url(&self, continuation: Option<&str>) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.clear().append_pair("list-type", "2");
            if let Some(token) = continuation {
                query.append_pair("continuation-token", token);
            }
        }
        url
    }

    fn object_url(&self, key: &str) -> Result<Url, StoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidKey(key.to_string()))?
            .pop_if_empty()
            .extend(key.split('/'));
        Ok(url)
    }
}

impl ObjectStore for BucketStore<'_> {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let url = self.listing_url(continuation.as_deref());
            let body = self.client.get_bytes(url.as_str())?;
            let page = parse_listing(&String::from_utf8_lossy(&body))?;
            tracing::debug!(keys = page.keys.len(), "listed bucket page");
            // "folder/" placeholder objects carry no post
            keys.extend(page.keys.into_iter().filter(|k| !k.ends_with('/')));
            match page.continuation_token {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        Ok(keys)
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let url = self.object_url(key)?;
        Ok(self.client.get_bytes(url.as_str())?)
    }
}

/// Parse a `ListBucketResult` document.
///
/// Only `Contents/Key`, `IsTruncated` and `NextContinuationToken` are read.
/// A token is returned only when the listing says it is truncated.
pub fn parse_listing(xml: &str) -> Result<ListingPage, quick_xml::Error> {
    #[derive(Clone, Copy, PartialEq)]
    enum Field {
        None,
        Key,
        Truncated,
        Token,
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut page = ListingPage::default();
    let mut truncated = false;
    let mut token = None;
    let mut in_contents = false;
    let mut field = Field::None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Contents" => in_contents = true,
                b"Key" if in_contents => field = Field::Key,
                b"IsTruncated" => field = Field::Truncated,
                b"NextContinuationToken" => field = Field::Token,
                _ => field = Field::None,
            },
            Event::Text(t) => {
                let text = t.unescape()?;
                match field {
                    Field::Key => page.keys.push(text.into_owned()),
                    Field::Truncated => truncated = text.trim() == "true",
                    Field::Token => token = Some(text.into_owned()),
                    Field::None => {}
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"Contents" {
                    in_contents = false;
                }
                field = Field::None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if truncated {
        page.continuation_token = token;
    }
    Ok(page)
}
