//! Writes post records into the static site's date-based content tree.
//!
//! ```text
//! {root}/
//! └── 2024/
//!     ├── _index.md
//!     └── 05/
//!         ├── _index.md
//!         └── 01/
//!             ├── _index.md
//!             └── abc123/
//!                 └── index.md      # compact PostRecord JSON
//! ```
//!
//! The `_index.md` markers make Hugo render list pages for each archive
//! level. They are created empty and never overwritten, so hand-edited
//! section front matter survives re-imports.

use crate::post::{DateParts, PostRecord};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const SECTION_MARKER: &str = "_index.md";
pub const POST_FILE: &str = "index.md";

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid published date {0:?}")]
    InvalidDate(String),
    #[error("invalid uid {0:?}")]
    InvalidUid(String),
    #[error("failed to encode post: {0}")]
    Json(#[from] serde_json::Error),
}

/// A uid becomes a directory name, so it must be a single plain component.
fn check_uid(uid: &str) -> Result<(), WriteError> {
    let mut components = Path::new(uid).components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();
    if uid.trim().is_empty() || !single_normal || uid.contains(['/', '\\']) {
        return Err(WriteError::InvalidUid(uid.to_string()));
    }
    Ok(())
}

/// Check that `post` can be placed in the tree and return its date parts.
///
/// Fails with [`WriteError::InvalidUid`] or [`WriteError::InvalidDate`];
/// never touches the disk.
pub fn validate(post: &PostRecord) -> Result<DateParts, WriteError> {
    check_uid(post.uid())?;
    post.date_parts().map_err(|_| WriteError::InvalidDate(post.published_date.clone()))
}

fn ensure_marker(dir: &Path) -> Result<(), WriteError> {
    let marker = dir.join(SECTION_MARKER);
    if !marker.exists() {
        fs::write(&marker, b"")?;
    }
    Ok(())
}

/// Write `post` under `root` and return the path of its `index.md`.
///
/// The uid and date are validated before anything touches the disk. An
/// existing `index.md` for the same uid is replaced.
pub fn write_post(root: &Path, post: &PostRecord) -> Result<PathBuf, WriteError> {
    let parts = validate(post)?;
    let body = serde_json::to_vec(post)?;

    let year_dir = root.join(&parts.year);
    let month_dir = year_dir.join(&parts.month);
    let day_dir = month_dir.join(&parts.day);
    let post_dir = day_dir.join(post.uid());
    fs::create_dir_all(&post_dir)?;

    for dir in [&year_dir, &month_dir, &day_dir] {
        ensure_marker(dir)?;
    }

    let path = post_dir.join(POST_FILE);
    fs::write(&path, body)?;
    Ok(path)
}
