//! Payload formats understood by the decoder.
//!
//! # Format Detection
//!
//! Use [`detect::detect_payload_format`] to classify fetched bytes.
//! Currently supported payloads:
//!
//! - **DICOM Part 10**: unwrapped by [`parse_dicom`] via `dicom-object`, frame 0 only
//! - **JPEG / PNG**: decoded directly by the `image` codecs

pub mod detect;
pub mod dicom;

pub use detect::{detect_payload_format, PayloadFormat};
pub use dicom::{is_dicom_file, parse_dicom, DicomImage, PixelData};
