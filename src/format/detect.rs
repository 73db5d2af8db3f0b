//! Payload format detection.
//!
//! Fetched image payloads are classified by their leading bytes:
//!
//! - **DICOM Part 10**: 128-byte preamble followed by `DICM`
//! - **JPEG**: starts with SOI (`FF D8`)
//! - **PNG**: starts with the 8-byte PNG signature
//!
//! Anything else is reported as unknown and fails decoding.

use image::ImageFormat;

use super::dicom::is_dicom_file;

/// Start Of Image marker
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Detected payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// DICOM Part 10 file, pixel data must be unwrapped
    Dicom,

    /// Bare JPEG bitstream
    Jpeg,

    /// Bare PNG image
    Png,

    /// Not recognized
    Unknown,
}

impl PayloadFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            PayloadFormat::Dicom => "DICOM",
            PayloadFormat::Jpeg => "JPEG",
            PayloadFormat::Png => "PNG",
            PayloadFormat::Unknown => "unknown",
        }
    }

    /// The `image` codec for raster formats.
    pub fn image_format(&self) -> Option<ImageFormat> {
        match self {
            PayloadFormat::Jpeg => Some(ImageFormat::Jpeg),
            PayloadFormat::Png => Some(ImageFormat::Png),
            PayloadFormat::Dicom | PayloadFormat::Unknown => None,
        }
    }
}

/// Classify a payload by its magic bytes.
pub fn detect_payload_format(bytes: &[u8]) -> PayloadFormat {
    if is_dicom_file(bytes) {
        PayloadFormat::Dicom
    } else if bytes.starts_with(&JPEG_SOI) {
        PayloadFormat::Jpeg
    } else if bytes.starts_with(&PNG_SIGNATURE) {
        PayloadFormat::Png
    } else {
        PayloadFormat::Unknown
    }
}
