//! # Study Viewer
//!
//! Resolves imaging studies against a DICOM archive and renders their first
//! image onto a host-owned surface.
//!
//! An exam record supplies a study key; the library resolves the study's
//! Study -> Series -> Instance hierarchy over the archive's REST API, picks
//! the first instance of the first series, fetches and decodes its pixel
//! data and paints it. Exam switches and teardown are handled by a
//! per-surface [`RenderingSession`].
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`archive`] - Archive REST client, study metadata and image locators
//! - [`io`] - Image fetching over the locator scheme
//! - [`mod@format`] - Payload detection and DICOM Part 10 unwrapping
//! - [`render`] - Decode backend, raster cache, surfaces and renderer
//! - [`session`] - Per-exam lifecycle and observable state
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use study_viewer::{
//!     create_http_client, initialize, BackendConfig, Canvas, ExamReference,
//!     HttpArchiveClient, HttpImageFetcher, ImageRenderer, RenderingSession, SurfaceHandle,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     initialize(BackendConfig::default())?;
//!
//!     let http = create_http_client(Duration::from_secs(30))?;
//!     let archive = HttpArchiveClient::new(http.clone(), "http://localhost:8042");
//!     let renderer = ImageRenderer::new(HttpImageFetcher::new(http))?;
//!     let session = RenderingSession::new(archive, renderer);
//!
//!     let canvas = Arc::new(Canvas::new());
//!     session
//!         .mount(ExamReference::new("S1", "Chest CT"), SurfaceHandle::new(canvas.clone()))
//!         .await;
//!     println!("{}", session.state());
//!
//!     session.unmount();
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod render;
pub mod session;


// Re-export commonly used types
pub use archive::{
    build_image_locator, create_http_client, HttpArchiveClient,
    ImageLocator, InstanceId, Series, StudyArchive, StudyMetadata, LOCATOR_SCHEME,
};
pub use config::{ArchiveArgs, CheckConfig, Cli, Command, ShowConfig};
pub use error::{
    ArchiveError, DicomError, ErrorKind, InitError, RenderError, SessionFailure,
};
pub use format::{detect_payload_format, parse_dicom, DicomImage, PayloadFormat};
pub use io::{HttpImageFetcher, ImageFetcher};
pub use render::{
    backend, initialize, BackendConfig, Canvas, ImageRenderer, Raster, RasterCache,
    RasterDecoder, RenderingSurface, SurfaceHandle,
};
pub use session::{ExamReference, MountOutcome, RenderingSession, SessionState};
