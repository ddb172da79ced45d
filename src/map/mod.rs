//! Static map rendering in pure Rust, via the `image` crate.
//!
//! The module is split into:
//! - **Projection**: Web Mercator math, viewport fitting and tile placement (unit testable)
//! - **Render**: [`StaticMap`] drawing plus the [`TileProvider`] trait and its HTTP implementation

pub mod projection;
pub mod render;

pub use projection::{TilePlacement, Viewport};
pub use render::{HttpTileProvider, MapError, MapStyle, StaticMap, TileProvider, save_png};
