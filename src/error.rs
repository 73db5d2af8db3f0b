use std::fmt;

use thiserror::Error;

/// Errors raised while resolving a study against the imaging archive
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// Transport failure or a non-2xx status other than "not found"
    #[error("Archive unreachable: {message}")]
    Unreachable {
        status: Option<u16>,
        message: String,
    },

    /// The archive explicitly reported that the study does not exist
    #[error("Study not found: {study_id}")]
    NotFound { study_id: String },

    /// The response could not be parsed into Study -> Series -> Instance
    #[error("Malformed archive response: {message}")]
    Malformed { message: String },

    /// The study resolved, but has no first series or its first series is empty
    #[error("Study {study_id} has no displayable image")]
    NoDisplayableImage { study_id: String },
}

/// Errors raised by the image decoder/renderer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Network or HTTP error while fetching image bytes
    #[error("Fetch failed{}: {message}", status_suffix(.status))]
    FetchFailed {
        status: Option<u16>,
        message: String,
    },

    /// Bytes were retrieved but are not a displayable image
    #[error("Decode failed: {message}")]
    DecodeFailed { message: String },

    /// The renderer is bound to another surface, or the surface to another renderer
    #[error("Surface busy: {message}")]
    SurfaceBusy { message: String },

    /// `load_and_paint` was invoked with no surface attached
    #[error("No surface attached")]
    NotAttached,
}

/// Errors that can occur when unwrapping a DICOM Part 10 file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DicomError {
    /// Missing 128-byte preamble or `DICM` magic
    #[error("Not a DICOM Part 10 file")]
    InvalidPreamble,

    /// The file meta group or data set could not be read
    #[error("Failed to parse DICOM file: {0}")]
    Parse(String),

    /// Required attribute is missing from the data set
    #[error("Missing required attribute: {0}")]
    MissingElement(&'static str),

    /// Attribute present but not convertible to the expected type
    #[error("Invalid {name} attribute: {reason}")]
    InvalidElement { name: &'static str, reason: String },

    /// Native pixel data shorter than one frame
    #[error("Pixel data holds {actual} bytes, frame 0 needs {expected}")]
    TruncatedPixelData { expected: usize, actual: usize },

    /// Pixel layout outside what the renderer can display
    #[error("Unsupported pixel format: {reason}")]
    UnsupportedPixelFormat { reason: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl From<DicomError> for RenderError {
    fn from(err: DicomError) -> Self {
        RenderError::DecodeFailed {
            message: err.to_string(),
        }
    }
}

/// Errors from the process-wide decode backend initialization
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    /// Backend configuration values are out of range
    #[error("Invalid decoder configuration: {0}")]
    InvalidConfig(String),

    /// The backend was already initialized with a different configuration
    #[error("Decoder backend already initialized with a different configuration")]
    Conflicting,

    /// A renderer was constructed before `initialize` was called
    #[error("Decoder backend not initialized; call render::initialize first")]
    NotInitialized,
}

// =============================================================================
// Session failures
// =============================================================================

/// Flat classification of every failure a session can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ArchiveUnreachable,
    ArchiveNotFound,
    ArchiveMalformed,
    NoDisplayableImage,
    FetchFailed,
    DecodeFailed,
    SurfaceBusy,
    NotAttached,
}

impl ErrorKind {
    /// Stable identifier, suitable for logs and UI test hooks.
    pub const fn name(&self) -> &'static str {
        match self {
            ErrorKind::ArchiveUnreachable => "ArchiveUnreachable",
            ErrorKind::ArchiveNotFound => "ArchiveNotFound",
            ErrorKind::ArchiveMalformed => "ArchiveMalformed",
            ErrorKind::NoDisplayableImage => "NoDisplayableImage",
            ErrorKind::FetchFailed => "FetchFailed",
            ErrorKind::DecodeFailed => "DecodeFailed",
            ErrorKind::SurfaceBusy => "SurfaceBusy",
            ErrorKind::NotAttached => "NotAttached",
        }
    }

    /// Human-readable banner text shown to the user.
    ///
    /// Unreachable, not-found and undecodable images must stay distinguishable.
    pub const fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::ArchiveUnreachable => "Could not reach the imaging archive.",
            ErrorKind::ArchiveNotFound => "The study was not found in the imaging archive.",
            ErrorKind::ArchiveMalformed => "The imaging archive returned an unreadable response.",
            ErrorKind::NoDisplayableImage => "The study contains no image to display.",
            ErrorKind::FetchFailed => "The image could not be downloaded from the archive.",
            ErrorKind::DecodeFailed => "The image could not be decoded.",
            ErrorKind::SurfaceBusy => "The viewer is in use by another exam.",
            ErrorKind::NotAttached => "The viewer is not ready to display images.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&ArchiveError> for ErrorKind {
    fn from(err: &ArchiveError) -> Self {
        match err {
            ArchiveError::Unreachable { .. } => ErrorKind::ArchiveUnreachable,
            ArchiveError::NotFound { .. } => ErrorKind::ArchiveNotFound,
            ArchiveError::Malformed { .. } => ErrorKind::ArchiveMalformed,
            ArchiveError::NoDisplayableImage { .. } => ErrorKind::NoDisplayableImage,
        }
    }
}

impl From<&RenderError> for ErrorKind {
    fn from(err: &RenderError) -> Self {
        match err {
            RenderError::FetchFailed { .. } => ErrorKind::FetchFailed,
            RenderError::DecodeFailed { .. } => ErrorKind::DecodeFailed,
            RenderError::SurfaceBusy { .. } => ErrorKind::SurfaceBusy,
            RenderError::NotAttached => ErrorKind::NotAttached,
        }
    }
}

/// A failure carried by `SessionState::Error`.
///
/// Keeps the specific kind alongside the detailed message from the
/// component that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct SessionFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

impl SessionFailure {
    /// Banner text for the UI.
    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

impl From<ArchiveError> for SessionFailure {
    fn from(err: ArchiveError) -> Self {
        Self {
            kind: ErrorKind::from(&err),
            detail: err.to_string(),
        }
    }
}

impl From<RenderError> for SessionFailure {
    fn from(err: RenderError) -> Self {
        Self {
            kind: ErrorKind::from(&err),
            detail: err.to_string(),
        }
    }
}
