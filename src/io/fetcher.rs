use async_trait::async_trait;
use bytes::Bytes;

use crate::archive::ImageLocator;
use crate::error::RenderError;

/// Trait for fetching the byte stream addressed by an image locator.
///
/// This is the renderer's only suspension point besides decoding. Failures
/// are reported as `RenderError::FetchFailed`, carrying the HTTP status when
/// one was received.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the complete payload behind `locator`.
    async fn fetch(&self, locator: &ImageLocator) -> Result<Bytes, RenderError>;
}
