//! Imaging archive (PACS) client.
//!
//! Resolves an exam's study key into its series/instance hierarchy and
//! builds the locator of the image to display.
//!
//! ```text
//! study_id ──GET /studies/{id}──▶ StudyMetadata ──first/first──▶ InstanceId
//!                                                                    │
//!                                          build_image_locator ◀─────┘
//!                                                   │
//!                                                   ▼
//!                          wadouri:{base}/instances/{id}/file
//! ```

mod client;
mod locator;
mod metadata;

pub use client::{create_http_client, HttpArchiveClient, StudyArchive};
pub use locator::{build_image_locator, ImageLocator, LOCATOR_SCHEME};
pub use metadata::{InstanceId, Series, StudyMetadata};
