//! Rendering surfaces.
//!
//! A [`RenderingSurface`] is a paint target owned by the host. Renderers never
//! hold a surface directly; they hold a [`SurfaceHandle`], which carries the
//! surface's identity and records which renderer currently controls it.
//!
//! Create exactly one handle per surface and clone the handle to share it:
//!
//! ```ignore
//! let canvas = Arc::new(Canvas::new());
//! let handle = SurfaceHandle::new(canvas.clone());
//! ```

use std::fmt;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use image::ImageFormat;

use super::decoder::Raster;

/// Renderer id meaning "no controller".
const UNCLAIMED: u64 = 0;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// A paint target that a renderer can bind to.
pub trait RenderingSurface: Send + Sync {
    /// Called once when a renderer takes control of the surface.
    fn enable(&self) {}

    /// Called once when the controlling renderer releases the surface.
    fn disable(&self) {}

    /// Replace the surface contents with `raster`.
    fn present(&self, raster: &Raster);
}

// =============================================================================
// Surface Handle
// =============================================================================

/// Shared identity of a surface plus its controlling renderer.
#[derive(Clone)]
pub struct SurfaceHandle {
    id: u64,
    target: Arc<dyn RenderingSurface>,
    controller: Arc<AtomicU64>,
}

impl SurfaceHandle {
    pub fn new(surface: Arc<dyn RenderingSurface>) -> Self {
        Self {
            id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
            target: surface,
            controller: Arc::new(AtomicU64::new(UNCLAIMED)),
        }
    }

    /// Unique id of this surface.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn surface(&self) -> &Arc<dyn RenderingSurface> {
        &self.target
    }

    /// Id of the renderer controlling this surface, if any.
    pub fn controller(&self) -> Option<u64> {
        match self.controller.load(Ordering::Acquire) {
            UNCLAIMED => None,
            id => Some(id),
        }
    }

    /// Record `renderer` as the controller.
    ///
    /// Returns the current controller's id if another renderer holds it.
    pub(crate) fn claim(&self, renderer: u64) -> Result<(), u64> {
        match self.controller.compare_exchange(
            UNCLAIMED,
            renderer,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(()),
            Err(current) if current == renderer => Ok(()),
            Err(current) => Err(current),
        }
    }

    /// Clear the controller if it is `renderer`.
    pub(crate) fn release(&self, renderer: u64) -> bool {
        self.controller
            .compare_exchange(renderer, UNCLAIMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl PartialEq for SurfaceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SurfaceHandle {}

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceHandle")
            .field("id", &self.id)
            .field("controller", &self.controller())
            .finish()
    }
}

// =============================================================================
// Canvas
// =============================================================================

/// In-memory surface holding the last presented raster.
///
/// Used headless by the CLI and as the observable surface in tests.
#[derive(Default)]
pub struct Canvas {
    enabled: AtomicBool,
    content: RwLock<Option<Raster>>,
    paints: AtomicUsize,
    enables: AtomicUsize,
    disables: AtomicUsize,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a renderer currently controls the canvas.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// The last presented raster, if any.
    pub fn snapshot(&self) -> Option<Raster> {
        self.content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of rasters presented so far.
    pub fn paint_count(&self) -> usize {
        self.paints.load(Ordering::Acquire)
    }

    pub fn enable_count(&self) -> usize {
        self.enables.load(Ordering::Acquire)
    }

    pub fn disable_count(&self) -> usize {
        self.disables.load(Ordering::Acquire)
    }

    /// Encode the current contents as PNG.
    ///
    /// Returns `None` if nothing has been presented.
    pub fn to_png(&self) -> Option<Result<Vec<u8>, image::ImageError>> {
        let raster = self.snapshot()?;
        let mut buf = Vec::new();
        Some(
            raster
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map(|_| buf),
        )
    }
}

impl RenderingSurface for Canvas {
    fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
        self.enables.fetch_add(1, Ordering::AcqRel);
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
        self.disables.fetch_add(1, Ordering::AcqRel);
    }

    fn present(&self, raster: &Raster) {
        *self
            .content
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(raster.clone());
        self.paints.fetch_add(1, Ordering::AcqRel);
    }
}
