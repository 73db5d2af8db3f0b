//! Decoding and painting of archive images.
//!
//! # Architecture
//!
//! ```text
//! ImageLocator ──▶ ImageFetcher ──▶ RasterDecoder ──▶ RasterCache
//!                                                         │
//!                         SurfaceHandle ◀── ImageRenderer ◀┘
//! ```
//!
//! The decode backend is process-wide: call [`initialize`] once before
//! building any [`ImageRenderer`].

mod backend;
mod cache;
mod decoder;
mod renderer;
mod surface;

pub use backend::{
    backend, initialize, BackendConfig, DecodeBackend, DEFAULT_MAX_DECODE_ALLOC,
    DEFAULT_MAX_DIMENSION,
};
pub use cache::{RasterCache, DEFAULT_RASTER_CACHE_CAPACITY};
pub use decoder::{Raster, RasterDecoder};
pub use renderer::ImageRenderer;
pub use surface::{Canvas, RenderingSurface, SurfaceHandle};
