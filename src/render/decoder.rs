//! Raster decoder.
//!
//! Turns fetched payloads into RGBA rasters ready to paint:
//!
//! ```text
//! bytes ──detect──┬── DICOM ──parse──┬── native ────────▶ frame 0 pixels ─┐
//!                 │                  └── encapsulated ──▶ fragment ──┐    │
//!                 ├── JPEG / PNG ───────────────────────────────────▶ image codecs
//!                 └── unknown ──▶ DecodeFailed                            │
//!                                                                   RGBA raster
//! ```

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageReader, RgbaImage};
use tracing::debug;

use crate::error::{InitError, RenderError};
use crate::format::{detect_payload_format, parse_dicom, PayloadFormat, PixelData};

use super::backend::{backend, DecodeBackend};

/// A decoded image, shared between the cache and the surface.
pub type Raster = Arc<RgbaImage>;

/// Stateless decoder bound to the process-wide backend.
#[derive(Debug, Clone, Copy)]
pub struct RasterDecoder {
    backend: &'static DecodeBackend,
}

impl RasterDecoder {
    /// Create a decoder. Fails if the backend has not been initialized.
    pub fn new() -> Result<Self, InitError> {
        Ok(Self {
            backend: backend()?,
        })
    }

    /// Decode a fetched payload into a raster.
    pub fn decode(&self, bytes: &[u8]) -> Result<Raster, RenderError> {
        let format = detect_payload_format(bytes);
        debug!("Decoding {} byte {} payload", bytes.len(), format.name());

        let image = match format {
            PayloadFormat::Dicom => self.decode_dicom(bytes)?,
            PayloadFormat::Jpeg | PayloadFormat::Png => self.decode_codec(bytes)?,
            PayloadFormat::Unknown => {
                return Err(RenderError::DecodeFailed {
                    message: "payload is not a DICOM, JPEG or PNG image".to_string(),
                })
            }
        };

        if !self.backend.accepts_dimensions(image.width(), image.height()) {
            return Err(RenderError::DecodeFailed {
                message: format!(
                    "image {}x{} exceeds the maximum dimension {}",
                    image.width(),
                    image.height(),
                    self.backend.config().max_dimension
                ),
            });
        }

        Ok(Arc::new(image.to_rgba8()))
    }

    fn decode_dicom(&self, bytes: &[u8]) -> Result<DynamicImage, RenderError> {
        let dicom = parse_dicom(bytes)?;

        match &dicom.pixel_data {
            PixelData::Native(_) => {
                if !self.backend.accepts_dimensions(dicom.columns, dicom.rows) {
                    return Err(RenderError::DecodeFailed {
                        message: format!(
                            "image {}x{} exceeds the maximum dimension",
                            dicom.columns, dicom.rows
                        ),
                    });
                }
                Ok(dicom.native_first_frame()?)
            }
            PixelData::Encapsulated { .. } => {
                let frame = dicom.encapsulated_first_frame()?;
                self.decode_codec(&frame)
            }
        }
    }

    /// Decode a bare JPEG or PNG bitstream under the backend limits.
    fn decode_codec(&self, bytes: &[u8]) -> Result<DynamicImage, RenderError> {
        let format = detect_payload_format(bytes)
            .image_format()
            .ok_or_else(|| RenderError::DecodeFailed {
                message: "compressed frame is not a JPEG or PNG bitstream".to_string(),
            })?;

        let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
        reader.limits(self.backend.limits());

        reader.decode().map_err(|e| RenderError::DecodeFailed {
            message: e.to_string(),
        })
    }
}
