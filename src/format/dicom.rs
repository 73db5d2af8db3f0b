//! DICOM Part 10 unwrapping.
//!
//! The archive's `/instances/{id}/file` endpoint returns the stored DICOM
//! file. Parsing is delegated to `dicom-object`; this module only pulls out
//! the image attributes and the pixel data of frame 0:
//!
//! ```text
//! ┌──────────────┬──────┬───────────────────────┬───────────────────────────┐
//! │ preamble 128 │ DICM │ meta group (0002,xxxx)│ data set ... (7FE0,0010)  │
//! └──────────────┴──────┴───────────────────────┴───────────────────────────┘
//!                 ▲
//!                 └── handed to FileDicomObject::from_reader
//! ```
//!
//! Native pixel data is converted here. Encapsulated (compressed) frames are
//! returned as a bitstream for the `image` codecs. No VOI LUT or windowing is
//! applied.

use std::borrow::Cow;

use dicom::core::value::Value;
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::DefaultDicomObject;
use image::{DynamicImage, GrayImage, RgbImage};
use tracing::debug;

use crate::error::DicomError;

/// Length of the file preamble preceding the magic.
pub const PREAMBLE_LEN: usize = 128;

/// Magic bytes following the preamble.
pub const DICM_MAGIC: &[u8; 4] = b"DICM";

/// Length of the item header counted by basic offset table entries.
const ITEM_HEADER_LEN: u32 = 8;

// =============================================================================
// Parsed file
// =============================================================================

/// Pixel data as stored in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelData {
    /// Uncompressed pixel bytes for all frames, little endian
    Native(Vec<u8>),

    /// Compressed fragments following the basic offset table
    Encapsulated {
        /// Basic offset table entries (may be empty)
        offsets: Vec<u32>,
        /// Fragment payloads in file order
        fragments: Vec<Vec<u8>>,
    },
}

/// Image attributes and pixel data of a DICOM instance.
#[derive(Debug, Clone)]
pub struct DicomImage {
    pub transfer_syntax: String,
    pub rows: u32,
    pub columns: u32,
    pub samples_per_pixel: u32,
    pub bits_allocated: u32,
    pub pixel_representation: u32,
    pub planar_configuration: u32,
    pub number_of_frames: u32,
    pub photometric_interpretation: String,
    pub pixel_data: PixelData,
}

/// Check whether `bytes` start with a Part 10 preamble and magic.
pub fn is_dicom_file(bytes: &[u8]) -> bool {
    bytes.len() >= PREAMBLE_LEN + DICM_MAGIC.len()
        && &bytes[PREAMBLE_LEN..PREAMBLE_LEN + DICM_MAGIC.len()] == DICM_MAGIC
}

/// Parse a Part 10 file and extract what the renderer needs.
pub fn parse_dicom(bytes: &[u8]) -> Result<DicomImage, DicomError> {
    if !is_dicom_file(bytes) {
        return Err(DicomError::InvalidPreamble);
    }

    let object = DefaultDicomObject::from_reader(&bytes[PREAMBLE_LEN..])
        .map_err(|e| DicomError::Parse(e.to_string()))?;

    let transfer_syntax = object.meta().transfer_syntax().to_string();
    debug!("Parsed DICOM file, transfer syntax {}", transfer_syntax);

    let pixel_data = match object.element(tags::PIXEL_DATA) {
        Ok(element) => pixel_data(element.value())?,
        Err(_) => return Err(DicomError::MissingElement("PixelData")),
    };

    Ok(DicomImage {
        transfer_syntax,
        rows: uint_attr(&object, tags::ROWS, "Rows")?
            .ok_or(DicomError::MissingElement("Rows"))?,
        columns: uint_attr(&object, tags::COLUMNS, "Columns")?
            .ok_or(DicomError::MissingElement("Columns"))?,
        samples_per_pixel: uint_attr(&object, tags::SAMPLES_PER_PIXEL, "SamplesPerPixel")?
            .unwrap_or(1),
        bits_allocated: uint_attr(&object, tags::BITS_ALLOCATED, "BitsAllocated")?
            .ok_or(DicomError::MissingElement("BitsAllocated"))?,
        pixel_representation: uint_attr(
            &object,
            tags::PIXEL_REPRESENTATION,
            "PixelRepresentation",
        )?
        .unwrap_or(0),
        planar_configuration: uint_attr(
            &object,
            tags::PLANAR_CONFIGURATION,
            "PlanarConfiguration",
        )?
        .unwrap_or(0),
        number_of_frames: uint_attr(&object, tags::NUMBER_OF_FRAMES, "NumberOfFrames")?
            .unwrap_or(1)
            .max(1),
        photometric_interpretation: str_attr(&object, tags::PHOTOMETRIC_INTERPRETATION)
            .unwrap_or_else(|| "MONOCHROME2".to_string()),
        pixel_data,
    })
}

fn uint_attr(
    object: &DefaultDicomObject,
    tag: Tag,
    name: &'static str,
) -> Result<Option<u32>, DicomError> {
    let Ok(element) = object.element(tag) else {
        return Ok(None);
    };
    element
        .to_int::<u32>()
        .map(Some)
        .map_err(|e| DicomError::InvalidElement {
            name,
            reason: e.to_string(),
        })
}

fn str_attr(object: &DefaultDicomObject, tag: Tag) -> Option<String> {
    let element = object.element(tag).ok()?;
    let value = element.to_str().ok()?;
    let value = value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    (!value.is_empty()).then(|| value.to_string())
}

fn pixel_data<I>(value: &Value<I, Vec<u8>>) -> Result<PixelData, DicomError> {
    match value {
        Value::Primitive(primitive) => Ok(PixelData::Native(primitive.to_bytes().into_owned())),
        Value::PixelSequence(sequence) => Ok(PixelData::Encapsulated {
            offsets: sequence.offset_table().to_vec(),
            fragments: sequence.fragments().to_vec(),
        }),
        _ => Err(DicomError::UnsupportedPixelFormat {
            reason: "pixel data is a sequence of items".to_string(),
        }),
    }
}

// =============================================================================
// Frame extraction
// =============================================================================

impl DicomImage {
    /// Compressed bitstream of frame 0 for encapsulated pixel data.
    ///
    /// Single-frame images concatenate every fragment. Multi-frame images use
    /// the basic offset table when present, and the first fragment otherwise.
    pub fn encapsulated_first_frame(&self) -> Result<Cow<'_, [u8]>, DicomError> {
        let (offsets, fragments) = match &self.pixel_data {
            PixelData::Encapsulated { offsets, fragments } => (offsets, fragments),
            PixelData::Native(_) => {
                return Err(DicomError::UnsupportedPixelFormat {
                    reason: "pixel data is not encapsulated".to_string(),
                })
            }
        };

        let first = fragments
            .first()
            .ok_or(DicomError::MissingElement("PixelData fragment"))?;

        let frame_end = if self.number_of_frames <= 1 {
            u32::MAX
        } else {
            match offsets.get(1) {
                Some(end) => *end,
                None => return Ok(Cow::Borrowed(first)),
            }
        };

        // Offsets count each fragment's item header too
        let mut position = 0u32;
        let mut parts: Vec<&[u8]> = Vec::new();
        for fragment in fragments {
            if position >= frame_end {
                break;
            }
            parts.push(fragment);
            position = position
                .saturating_add(ITEM_HEADER_LEN)
                .saturating_add(fragment.len() as u32);
        }

        if parts.len() == 1 {
            Ok(Cow::Borrowed(parts[0]))
        } else {
            Ok(Cow::Owned(parts.concat()))
        }
    }

    /// Convert native pixel data of frame 0 into a displayable image.
    ///
    /// Monochrome images are min/max normalised to 8 bits, MONOCHROME1 is
    /// inverted. RGB must be 8 bits per sample.
    pub fn native_first_frame(&self) -> Result<DynamicImage, DicomError> {
        let data = match &self.pixel_data {
            PixelData::Native(data) => data,
            PixelData::Encapsulated { .. } => {
                return Err(DicomError::UnsupportedPixelFormat {
                    reason: "pixel data is encapsulated".to_string(),
                })
            }
        };

        let (width, height) = (self.columns, self.rows);
        if width == 0 || height == 0 {
            return Err(DicomError::UnsupportedPixelFormat {
                reason: format!("empty image {}x{}", width, height),
            });
        }

        let pixels = width as usize * height as usize;
        let bytes_per_sample = (self.bits_allocated as usize).div_ceil(8);
        let frame_len = pixels * self.samples_per_pixel as usize * bytes_per_sample;
        if data.len() < frame_len {
            return Err(DicomError::TruncatedPixelData {
                expected: frame_len,
                actual: data.len(),
            });
        }
        let frame = &data[..frame_len];

        let invert = self.photometric_interpretation == "MONOCHROME1";

        match (
            self.samples_per_pixel,
            self.bits_allocated,
            self.photometric_interpretation.as_str(),
        ) {
            (1, 8, "MONOCHROME1" | "MONOCHROME2") => {
                let values = frame.iter().map(|v| *v as i32);
                Ok(DynamicImage::ImageLuma8(gray_from(width, height, values, invert)?))
            }
            (1, 16, "MONOCHROME1" | "MONOCHROME2") => {
                let signed = self.pixel_representation == 1;
                let values = frame.chunks_exact(2).map(|c| {
                    let raw = u16::from_le_bytes([c[0], c[1]]);
                    if signed {
                        raw as i16 as i32
                    } else {
                        raw as i32
                    }
                });
                Ok(DynamicImage::ImageLuma8(gray_from(width, height, values, invert)?))
            }
            (3, 8, "RGB") => {
                let rgb = if self.planar_configuration == 1 {
                    // RRR..GGG..BBB.. -> RGBRGB..
                    let (r, rest) = frame.split_at(pixels);
                    let (g, b) = rest.split_at(pixels);
                    (0..pixels).flat_map(|i| [r[i], g[i], b[i]]).collect()
                } else {
                    frame.to_vec()
                };
                RgbImage::from_raw(width, height, rgb)
                    .map(DynamicImage::ImageRgb8)
                    .ok_or_else(|| DicomError::UnsupportedPixelFormat {
                        reason: "RGB buffer size mismatch".to_string(),
                    })
            }
            (spp, bits, photometric) => Err(DicomError::UnsupportedPixelFormat {
                reason: format!(
                    "{} sample(s), {} bits allocated, {}",
                    spp, bits, photometric
                ),
            }),
        }
    }
}

/// Linearly map sample values onto 0..=255 using their own min and max.
fn gray_from(
    width: u32,
    height: u32,
    values: impl Iterator<Item = i32> + Clone,
    invert: bool,
) -> Result<GrayImage, DicomError> {
    let (min, max) = values
        .clone()
        .fold((i32::MAX, i32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let range = (max - min).max(1) as i64;

    let pixels: Vec<u8> = values
        .map(|v| {
            let scaled = ((v - min) as i64 * 255 / range) as u8;
            if invert {
                255 - scaled
            } else {
                scaled
            }
        })
        .collect();

    GrayImage::from_raw(width, height, pixels).ok_or_else(|| DicomError::UnsupportedPixelFormat {
        reason: "grayscale buffer size mismatch".to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
