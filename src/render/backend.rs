//! Process-wide decode backend.
//!
//! The backend carries the decoding limits shared by every renderer. It must
//! be initialized once, before the first renderer is built:
//!
//! ```ignore
//! use study_viewer::render::{initialize, BackendConfig};
//!
//! initialize(BackendConfig::default())?;
//! ```
//!
//! Re-initializing with an identical configuration is a no-op; a different
//! configuration is rejected with `InitError::Conflicting`.

use std::sync::OnceLock;

use image::Limits;
use tracing::info;

use crate::error::InitError;

/// Default maximum width or height of a decoded image.
pub const DEFAULT_MAX_DIMENSION: u32 = 16_384;

/// Default cap on decoder allocations (512 MiB).
pub const DEFAULT_MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

static BACKEND: OnceLock<DecodeBackend> = OnceLock::new();

/// Configuration of the decode backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendConfig {
    /// Largest accepted image width or height, in pixels
    pub max_dimension: u32,

    /// Largest allocation a decoder may make, in bytes
    pub max_alloc: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_alloc: DEFAULT_MAX_DECODE_ALLOC,
        }
    }
}

impl BackendConfig {
    fn validate(&self) -> Result<(), InitError> {
        if self.max_dimension == 0 {
            return Err(InitError::InvalidConfig(
                "max_dimension must be greater than 0".to_string(),
            ));
        }
        if self.max_alloc == 0 {
            return Err(InitError::InvalidConfig(
                "max_alloc must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// The initialized backend. Obtain it with [`initialize`] or [`backend`].
#[derive(Debug)]
pub struct DecodeBackend {
    config: BackendConfig,
}

impl DecodeBackend {
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Decoder limits derived from the configuration.
    pub fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.config.max_dimension);
        limits.max_image_height = Some(self.config.max_dimension);
        limits.max_alloc = Some(self.config.max_alloc);
        limits
    }

    /// Check decoded dimensions against the configured maximum.
    pub fn accepts_dimensions(&self, width: u32, height: u32) -> bool {
        width <= self.config.max_dimension && height <= self.config.max_dimension
    }
}

/// Initialize the process-wide decode backend.
pub fn initialize(config: BackendConfig) -> Result<&'static DecodeBackend, InitError> {
    config.validate()?;

    let backend = BACKEND.get_or_init(|| {
        info!(
            "Decode backend initialized (max dimension {}, max alloc {} bytes)",
            config.max_dimension, config.max_alloc
        );
        DecodeBackend { config }
    });

    if backend.config != config {
        return Err(InitError::Conflicting);
    }

    Ok(backend)
}

/// The initialized backend, or `NotInitialized`.
pub fn backend() -> Result<&'static DecodeBackend, InitError> {
    BACKEND.get().ok_or(InitError::NotInitialized)
}
