//! Micropub post import: object store → [`PostRecord`] → content tree.
//!
//! Objects are handled one at a time, in listing order. What happens when a
//! single object can't be imported is decided by [`FailurePolicy`]:
//!
//! | Failure                                  | `skip`             | `abort`      |
//! |------------------------------------------|--------------------|--------------|
//! | download, decode, extraction, uid, date  | warn, record, next | return error |
//! | listing, output dir, write               | return error       | return error |
//!
//! A post's uid and date are checked before it is written, so a bad value
//! in one object is an item failure. Write failures are never skipped: once
//! the output tree can't be written every later post would fail the same way.

use crate::config::FailurePolicy;
use crate::post::{ExtractError, PostRecord};
use crate::store::{ObjectStore, StoreError};
use crate::writer::{self, WriteError, write_post};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to list posts: {0}")]
    List(#[source] StoreError),
    #[error("output {0} is not a directory")]
    OutputNotDirectory(PathBuf),
    #[error("failed to create output {0}: {1}")]
    OutputDir(PathBuf, #[source] std::io::Error),
    #[error("{key}: {source}")]
    Item {
        key: String,
        #[source]
        source: ItemError,
    },
    #[error("failed to write {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: WriteError,
    },
}

/// Why a single object was not imported.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("download failed: {0}")]
    Download(#[from] StoreError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("cannot place post: {0}")]
    Invalid(#[source] WriteError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedPost {
    pub key: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub key: String,
    pub reason: String,
}

/// Outcome of an import run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub listed: usize,
    pub imported: Vec<ImportedPost>,
    pub skipped: Vec<SkippedItem>,
}

fn prepare_output(root: &Path) -> Result<(), ImportError> {
    if root.exists() {
        if !root.is_dir() {
            return Err(ImportError::OutputNotDirectory(root.to_path_buf()));
        }
        return Ok(());
    }
    fs::create_dir_all(root).map_err(|e| ImportError::OutputDir(root.to_path_buf(), e))
}

fn fetch_post(store: &dyn ObjectStore, key: &str) -> Result<PostRecord, ItemError> {
    let bytes = store.download(key)?;
    let post = PostRecord::from_json(&bytes)?;
    writer::validate(&post).map_err(ItemError::Invalid)?;
    Ok(post)
}

/// Import every object in `store` into `output_root`.
pub fn import_posts(
    store: &dyn ObjectStore,
    output_root: &Path,
    policy: FailurePolicy,
) -> Result<ImportSummary, ImportError> {
    prepare_output(output_root)?;
    let keys = store.list().map_err(ImportError::List)?;
    tracing::info!(count = keys.len(), "listed posts");

    let mut summary = ImportSummary {
        listed: keys.len(),
        ..Default::default()
    };

    for key in keys {
        let post = match fetch_post(store, &key) {
            Ok(post) => post,
            Err(source) => match policy {
                FailurePolicy::Abort => return Err(ImportError::Item { key, source }),
                FailurePolicy::Skip => {
                    tracing::warn!(key = %key, error = %source, "skipping post");
                    summary.skipped.push(SkippedItem {
                        key,
                        reason: source.to_string(),
                    });
                    continue;
                }
            },
        };

        let path = write_post(output_root, &post).map_err(|source| ImportError::Write {
            key: key.clone(),
            source,
        })?;
        tracing::info!(key = %key, path = %path.display(), "imported post");
        summary.imported.push(ImportedPost { key, path });
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::microformats::FieldError;
    use crate::test_helpers::{CANONICAL_ENTRY, canonical_json, entry_json};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// In-memory store. Unreadable keys are listed but fail to download.
    #[derive(Default)]
    struct MemoryStore {
        objects: BTreeMap<String, Vec<u8>>,
        unreadable: Vec<String>,
    }

    impl MemoryStore {
        fn with(mut self, key: &str, bytes: impl Into<Vec<u8>>) -> Self {
            self.objects.insert(key.into(), bytes.into());
            self
        }
    }

    impl ObjectStore for MemoryStore {
        fn list(&self) -> Result<Vec<String>, StoreError> {
            let mut keys: Vec<String> = self.objects.keys().cloned().collect();
            keys.extend(self.unreadable.iter().cloned());
            Ok(keys)
        }

        fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            self.objects
                .get(key)
                .cloned()
                .ok_or_else(|| StoreError::InvalidKey(key.to_string()))
        }
    }

    struct BrokenListing;

    impl ObjectStore for BrokenListing {
        fn list(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("offline")))
        }

        fn download(&self, _: &str) -> Result<Vec<u8>, StoreError> {
            unreachable!()
        }
    }

    fn without_longitude() -> Vec<u8> {
        let mut json = canonical_json();
        json["properties"]["location"][0]["properties"]["geo"][0]["properties"]
            .as_object_mut()
            .unwrap()
            .remove("longitude");
        serde_json::to_vec(&json).unwrap()
    }

    #[test]
    fn imports_every_post() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default()
            .with("a.json", CANONICAL_ENTRY)
            .with("b.json", entry_json("def456", "2023-12-31T23:59:59-05:00"));

        let summary = import_posts(&store, tmp.path(), FailurePolicy::Skip).unwrap();

        assert_eq!(summary.listed, 2);
        assert!(summary.skipped.is_empty());
        assert_eq!(
            summary.imported,
            vec![
                ImportedPost {
                    key: "a.json".into(),
                    path: tmp.path().join("2024/05/01/abc123/index.md"),
                },
                ImportedPost {
                    key: "b.json".into(),
                    path: tmp.path().join("2023/12/31/def456/index.md"),
                },
            ]
        );
        assert!(tmp.path().join("2023/12/31/def456/index.md").is_file());
    }

    #[test]
    fn skip_policy_records_and_continues() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore {
            unreadable: vec!["gone.json".into()],
            ..Default::default()
        }
        .with("a.json", without_longitude())
        .with("b.json", "not json")
        .with("c.json", CANONICAL_ENTRY);

        let summary = import_posts(&store, tmp.path(), FailurePolicy::Skip).unwrap();

        assert_eq!(summary.listed, 4);
        assert_eq!(summary.imported.len(), 1);
        assert_eq!(summary.imported[0].key, "c.json");
        let skipped: Vec<&str> = summary.skipped.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(skipped, vec!["a.json", "b.json", "gone.json"]);
        assert!(summary.skipped[0].reason.contains("longitude"));
    }

    #[test]
    fn abort_policy_stops_at_first_failure() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default()
            .with("a.json", without_longitude())
            .with("b.json", CANONICAL_ENTRY);

        let err = import_posts(&store, tmp.path(), FailurePolicy::Abort).unwrap_err();

        match err {
            ImportError::Item { key, source } => {
                assert_eq!(key, "a.json");
                assert!(matches!(
                    source,
                    ItemError::Extract(ExtractError::Field(FieldError::Missing(ref f))) if f == "longitude"
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!tmp.path().join("2024").exists());
    }

    #[test]
    fn bad_date_is_skipped_and_later_posts_import() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default()
            .with("a.json", entry_json("abc999", "2024-05-01T11:03:17+0100"))
            .with("b.json", CANONICAL_ENTRY);

        let summary = import_posts(&store, tmp.path(), FailurePolicy::Skip).unwrap();

        assert_eq!(summary.imported.len(), 1);
        assert_eq!(summary.imported[0].key, "b.json");
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].key, "a.json");
        assert!(summary.skipped[0].reason.contains("2024-05-01T11:03:17+0100"));
        assert!(tmp.path().join("2024/05/01/abc123/index.md").is_file());
        assert!(!tmp.path().join("2024/05/01/abc999").exists());
    }

    #[test]
    fn unsafe_uid_follows_policy() {
        let escape = entry_json("../escape", "2024-05-01T11:03:17+01:00");

        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default()
            .with("a.json", escape.clone())
            .with("b.json", CANONICAL_ENTRY);
        let summary = import_posts(&store, tmp.path(), FailurePolicy::Skip).unwrap();
        assert_eq!(summary.skipped[0].key, "a.json");
        assert_eq!(summary.imported[0].key, "b.json");

        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default().with("a.json", escape);
        let err = import_posts(&store, tmp.path(), FailurePolicy::Abort).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Item { ref key, source: ItemError::Invalid(WriteError::InvalidUid(_)) } if key == "a.json"
        ));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_failures_are_fatal_even_when_skipping() {
        let tmp = TempDir::new().unwrap();
        // A plain file where the year directory should go
        fs::write(tmp.path().join("2024"), "").unwrap();
        let store = MemoryStore::default()
            .with("a.json", CANONICAL_ENTRY)
            .with("b.json", entry_json("def456", "2023-12-31T23:59:59-05:00"));

        let err = import_posts(&store, tmp.path(), FailurePolicy::Skip).unwrap_err();
        assert!(matches!(err, ImportError::Write { ref key, source: WriteError::Io(_) } if key == "a.json"));
        assert!(!tmp.path().join("2023").exists());
    }

    #[test]
    fn output_root_is_created() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("site/content/photos");
        let store = MemoryStore::default().with("a.json", CANONICAL_ENTRY);

        let summary = import_posts(&store, &root, FailurePolicy::Skip).unwrap();
        assert_eq!(summary.imported.len(), 1);
        assert!(root.join("2024/05/01/abc123/index.md").is_file());
    }

    #[test]
    fn output_root_must_be_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "").unwrap();

        let err = import_posts(&MemoryStore::default(), &file, FailurePolicy::Skip).unwrap_err();
        assert!(matches!(err, ImportError::OutputNotDirectory(_)));
    }

    #[test]
    fn listing_failure_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = import_posts(&BrokenListing, tmp.path(), FailurePolicy::Skip).unwrap_err();
        assert!(matches!(err, ImportError::List(_)));
    }
}
