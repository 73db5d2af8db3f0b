use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use super::ImageFetcher;
use crate::archive::ImageLocator;
use crate::error::RenderError;

/// HTTP-backed implementation of ImageFetcher.
///
/// Dereferences `wadouri:` locators with a plain GET on the embedded URL.
/// Any other scheme is rejected without touching the network.
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, locator: &ImageLocator) -> Result<Bytes, RenderError> {
        let url = locator.fetch_url().ok_or_else(|| RenderError::FetchFailed {
            status: None,
            message: format!("unsupported locator scheme '{}'", locator.scheme()),
        })?;

        debug!("Fetching {}", url);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RenderError::FetchFailed {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RenderError::FetchFailed {
                status: Some(status.as_u16()),
                message: format!("{} returned {}", url, status),
            });
        }

        let data = resp.bytes().await.map_err(|e| RenderError::FetchFailed {
            status: Some(status.as_u16()),
            message: e.to_string(),
        })?;

        debug!("Fetched {} bytes from {}", data.len(), url);
        Ok(data)
    }
}
