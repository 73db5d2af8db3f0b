use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ArchiveError;

use super::locator::{build_image_locator, ImageLocator};
use super::metadata::{InstanceId, SeriesPayload, StudyMetadata, StudyPayload};

/// Trait for resolving studies against an imaging archive.
///
/// The rendering session only depends on this trait, so tests and other
/// archive flavours can stand in for the HTTP client.
#[async_trait]
pub trait StudyArchive: Send + Sync {
    /// Resolve the Study -> Series -> Instance hierarchy of `study_id`.
    async fn get_study_metadata(&self, study_id: &str) -> Result<StudyMetadata, ArchiveError>;

    /// Base URL that image locators are built against.
    fn base_url(&self) -> &str;

    /// Build the locator for one instance of this archive.
    fn image_locator(&self, instance_id: &InstanceId) -> ImageLocator {
        build_image_locator(self.base_url(), instance_id)
    }
}

/// REST client for the archive.
///
/// Speaks the Orthanc-style JSON API:
/// - `GET {base}/studies` lists study keys
/// - `GET {base}/studies/{id}` returns the study with its `Series`
/// - `GET {base}/series/{id}` returns one series with its `Instances`,
///   requested only for a series reference in first position
#[derive(Clone)]
pub struct HttpArchiveClient {
    client: Client,
    base_url: String,
}

impl HttpArchiveClient {
    /// Create a client for the archive rooted at `base_url`.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// List the study keys known to the archive.
    pub async fn list_studies(&self) -> Result<Vec<String>, ArchiveError> {
        let url = format!("{}/studies", self.base_url);
        let not_found = ArchiveError::Unreachable {
            status: Some(StatusCode::NOT_FOUND.as_u16()),
            message: format!("{} is not a study listing endpoint", url),
        };
        self.get_json(&url, not_found).await
    }

    /// GET `url` and parse the JSON body.
    ///
    /// 404/410 map to `not_found`, other non-2xx statuses and transport
    /// failures to `Unreachable`, unparseable bodies to `Malformed`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        not_found: ArchiveError,
    ) -> Result<T, ArchiveError> {
        debug!("GET {}", url);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ArchiveError::Unreachable {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(not_found);
        }
        if !status.is_success() {
            return Err(ArchiveError::Unreachable {
                status: Some(status.as_u16()),
                message: format!("{} returned {}", url, status),
            });
        }

        let body = resp.bytes().await.map_err(|e| ArchiveError::Unreachable {
            status: Some(status.as_u16()),
            message: e.to_string(),
        })?;

        serde_json::from_slice(&body).map_err(|e| ArchiveError::Malformed {
            message: format!("{}: {}", url, e),
        })
    }

    async fn resolve_series_reference(
        &self,
        study_id: &str,
        series_id: &str,
    ) -> Result<SeriesPayload, ArchiveError> {
        let url = format!(
            "{}/series/{}",
            self.base_url,
            urlencoding::encode(series_id)
        );
        let not_found = ArchiveError::Malformed {
            message: format!(
                "study {} references series {} which the archive does not know",
                study_id, series_id
            ),
        };
        self.get_json(&url, not_found).await
    }
}

#[async_trait]
impl StudyArchive for HttpArchiveClient {
    async fn get_study_metadata(&self, study_id: &str) -> Result<StudyMetadata, ArchiveError> {
        let url = format!(
            "{}/studies/{}",
            self.base_url,
            urlencoding::encode(study_id)
        );
        let not_found = ArchiveError::NotFound {
            study_id: study_id.to_string(),
        };
        let payload: StudyPayload = self.get_json(&url, not_found).await?;

        let first = match payload.first_reference() {
            Some(series_id) => Some(self.resolve_series_reference(study_id, series_id).await?),
            None => None,
        };

        let metadata = payload.into_metadata(study_id, first);
        debug!(
            "Resolved study {}: {} series, {} instances",
            study_id,
            metadata.series.len(),
            metadata.instance_count()
        );
        Ok(metadata)
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Create the HTTP client shared by the archive client and image fetcher.
///
/// The timeout applies to whole requests; expiry surfaces as
/// `ArchiveUnreachable` or `FetchFailed` depending on the caller.
pub fn create_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("study-viewer/", env!("CARGO_PKG_VERSION")))
        .build()
}
