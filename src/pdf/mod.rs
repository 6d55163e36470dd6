//! Page model, coordinate mapping and selection engine

pub mod cache;
pub mod document;
pub mod geometry;
pub mod highlight;
pub mod interaction;
#[cfg(feature = "pdf")]
pub mod mupdf_backend;
pub mod resolver;
pub mod types;
pub mod view;

pub use cache::{CacheKey, PageCache};
pub use document::{DocError, Document, DocumentBackend, PageContext};
pub use geometry::Rect;
pub use interaction::{Effect, Event, Interaction, Phase};
#[cfg(feature = "pdf")]
pub use mupdf_backend::MupdfBackend;
pub use types::*;
pub use view::{ScrollDirection, ViewState, ZoomChange, ZoomSetting};
