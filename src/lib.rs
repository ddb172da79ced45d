//! # Blog Tools
//!
//! Two importers that feed a Hugo photo blog:
//!
//! ```text
//! hikes:  gpx/*.gpx  →  parse → summarize → map PNG → reverse geocode → {start}_hike.json
//! posts:  store      →  download → h-entry → PostRecord → {y}/{m}/{d}/{uid}/index.md
//! ```
//!
//! Both run one item at a time. Each item either imports completely or not
//! at all; whether a failed item ends the run is the pipeline's
//! [`config::FailurePolicy`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`microformats`] | Tagged [`microformats::Value`] tree and typed, fail-fast property accessors |
//! | [`post`] | h-entry → [`post::PostRecord`] extraction and Hugo front-matter shape |
//! | [`store`] | [`store::ObjectStore`] trait: local directory or public S3 bucket |
//! | [`writer`] | Date-based content tree with `_index.md` section markers |
//! | [`import`] | Post import run with per-item failure policy |
//! | [`gpx`] | Streaming GPX reader |
//! | [`track`] | Distance, climb, moving time and time bounds of a track |
//! | [`map`] | Web Mercator viewport, raster tiles and static route images |
//! | [`geocode`] | Reverse geocoding with locality/region fallbacks |
//! | [`hike`] | Hike import run: map, geocode and write a [`hike::HikeRecord`] per GPX file |
//! | [`config`] | `blog-tools.toml` loading, merging over stock defaults, validation |
//! | [`http`] | Shared blocking HTTP agent |
//! | [`output`] | CLI output formatting for both importers |
//!
//! # Design Decisions
//!
//! ## No Dynamic Casts Over JSON
//!
//! Micropub objects are decoded once into [`microformats::Value`], a closed
//! enum. Every field read goes through an accessor that returns a
//! [`microformats::FieldError`] naming the property, so a bad post is
//! reported as "property does not exist: longitude" rather than a panic.
//!
//! ## Collaborators Behind Traits
//!
//! The network-facing pieces ([`store::ObjectStore`],
//! [`geocode::Geocoder`], [`map::TileProvider`]) are traits with one real
//! implementation each. Pipelines take `&dyn Trait`, so tests run entirely
//! offline against stubs.

pub mod config;
pub mod geocode;
pub mod gpx;
pub mod hike;
pub mod http;
pub mod import;
pub mod map;
pub mod microformats;
pub mod output;
pub mod post;
pub mod store;
pub mod track;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;
