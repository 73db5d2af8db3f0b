//! Image renderer.
//!
//! An [`ImageRenderer`] binds to at most one surface at a time and paints
//! decoded rasters onto it. Fetching goes through an [`ImageFetcher`] and
//! decoded rasters are kept in a [`RasterCache`].
//!
//! # Binding Rules
//!
//! - A renderer controls at most one surface; a surface is controlled by at
//!   most one renderer.
//! - `attach` to the already-attached surface is a no-op.
//! - `detach` never fails and disables the surface exactly once.
//! - A failed load leaves the surface contents untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::archive::ImageLocator;
use crate::error::{InitError, RenderError};
use crate::io::ImageFetcher;

use super::cache::RasterCache;
use super::decoder::{Raster, RasterDecoder};
use super::surface::SurfaceHandle;

static NEXT_RENDERER_ID: AtomicU64 = AtomicU64::new(1);

/// Fetches, decodes and paints images onto one attached surface.
pub struct ImageRenderer<F: ImageFetcher> {
    id: u64,
    fetcher: F,
    decoder: RasterDecoder,
    cache: RasterCache,
    attached: Mutex<Option<SurfaceHandle>>,
}

impl<F: ImageFetcher> ImageRenderer<F> {
    /// Create a renderer with the default raster cache.
    ///
    /// Fails with `NotInitialized` until [`initialize`](super::initialize)
    /// has been called.
    pub fn new(fetcher: F) -> Result<Self, InitError> {
        Self::with_cache(fetcher, RasterCache::new())
    }

    /// Create a renderer with a caller-supplied raster cache.
    pub fn with_cache(fetcher: F, cache: RasterCache) -> Result<Self, InitError> {
        Ok(Self {
            id: NEXT_RENDERER_ID.fetch_add(1, Ordering::Relaxed),
            fetcher,
            decoder: RasterDecoder::new()?,
            cache,
            attached: Mutex::new(None),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn cache(&self) -> &RasterCache {
        &self.cache
    }

    fn lock_attached(&self) -> MutexGuard<'_, Option<SurfaceHandle>> {
        self.attached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Surface binding
    // =========================================================================

    /// Bind to `surface` and enable it.
    pub fn attach(&self, surface: &SurfaceHandle) -> Result<(), RenderError> {
        let mut attached = self.lock_attached();

        if let Some(current) = attached.as_ref() {
            if current == surface {
                return Ok(());
            }
            return Err(RenderError::SurfaceBusy {
                message: format!(
                    "renderer {} is attached to surface {}",
                    self.id,
                    current.id()
                ),
            });
        }

        surface
            .claim(self.id)
            .map_err(|owner| RenderError::SurfaceBusy {
                message: format!(
                    "surface {} is controlled by renderer {}",
                    surface.id(),
                    owner
                ),
            })?;

        surface.surface().enable();
        *attached = Some(surface.clone());
        debug!("Renderer {} attached to surface {}", self.id, surface.id());
        Ok(())
    }

    /// Release `surface` if this renderer is bound to it.
    pub fn detach(&self, surface: &SurfaceHandle) {
        let mut attached = self.lock_attached();
        if attached.as_ref() != Some(surface) {
            return;
        }
        if let Some(handle) = attached.take() {
            Self::release(self.id, &handle);
        }
    }

    fn release(id: u64, handle: &SurfaceHandle) {
        handle.release(id);
        handle.surface().disable();
        debug!("Renderer {} detached from surface {}", id, handle.id());
    }

    pub fn attached_surface(&self) -> Option<SurfaceHandle> {
        self.lock_attached().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.lock_attached().is_some()
    }

    // =========================================================================
    // Loading and painting
    // =========================================================================

    /// Fetch and decode the image at `locator`, without painting.
    pub async fn load(&self, locator: &ImageLocator) -> Result<Raster, RenderError> {
        if let Some(raster) = self.cache.get(locator).await {
            debug!("Raster cache hit for {}", locator);
            return Ok(raster);
        }

        let bytes = self.fetcher.fetch(locator).await.map_err(|e| {
            warn!("Fetch of {} failed: {}", locator, e);
            e
        })?;

        let raster = self.decoder.decode(&bytes).map_err(|e| {
            warn!("Decode of {} failed: {}", locator, e);
            e
        })?;

        self.cache.put(locator.clone(), raster.clone()).await;
        Ok(raster)
    }

    /// Present `raster` on the attached surface.
    pub fn paint(&self, raster: &Raster) -> Result<(), RenderError> {
        let attached = self.lock_attached();
        let handle = attached.as_ref().ok_or(RenderError::NotAttached)?;
        handle.surface().present(raster);
        Ok(())
    }

    /// Load the image at `locator` and paint it on the attached surface.
    ///
    /// On failure the surface keeps whatever it showed before.
    pub async fn load_and_paint(&self, locator: &ImageLocator) -> Result<(), RenderError> {
        if !self.is_attached() {
            return Err(RenderError::NotAttached);
        }
        let raster = self.load(locator).await?;
        self.paint(&raster)
    }
}

impl<F: ImageFetcher> Drop for ImageRenderer<F> {
    fn drop(&mut self) {
        let attached = self
            .attached
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = attached {
            Self::release(self.id, &handle);
        }
    }
}
