//! Archive client integration tests.
//!
//! Tests verify:
//! - Study resolution for inline series and series references
//! - Only a leading series reference is fetched
//! - Status mapping (404/410 to NotFound, other failures to Unreachable)
//! - Malformed payload handling
//! - Study listing and locator construction

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use study_viewer::{
    create_http_client, ArchiveError, HttpArchiveClient, InstanceId, Series, StudyArchive,
};

use super::test_utils::{MockArchive, MockServer};

fn client(server: &MockServer) -> HttpArchiveClient {
    let http = create_http_client(Duration::from_secs(5)).unwrap();
    HttpArchiveClient::new(http, server.base_url.as_str())
}

// =============================================================================
// Study Resolution
// =============================================================================

#[tokio::test]
async fn test_resolve_inline_study() {
    let server = MockArchive::new()
        .with_inline_study("S1", &[&["I1", "I2"], &["I3"]])
        .start()
        .await;

    let metadata = client(&server).get_study_metadata("S1").await.unwrap();

    assert_eq!(metadata.study_id, "S1");
    assert_eq!(metadata.series.len(), 2);
    assert_eq!(metadata.instance_count(), 3);
    assert_eq!(metadata.displayable_instance().unwrap().as_str(), "I1");
}

#[tokio::test]
async fn test_resolve_series_references() {
    let server = MockArchive::new()
        .with_study("S1", json!({ "ID": "S1", "Series": ["se-a", "se-b"] }))
        .with_series("se-a", json!({ "ID": "se-a", "Instances": ["I7", "I8"] }))
        .with_series("se-b", json!({ "Instances": [{ "ID": "I9" }] }))
        .start()
        .await;

    let metadata = client(&server).get_study_metadata("S1").await.unwrap();

    assert_eq!(metadata.series[0].id.as_deref(), Some("se-a"));
    assert_eq!(
        metadata.series[0].instances,
        vec![InstanceId::from("I7"), InstanceId::from("I8")]
    );
    assert_eq!(metadata.series[1], Series::unresolved("se-b"));
    assert_eq!(metadata.displayable_instance().unwrap().as_str(), "I7");

    // Selection only needs the first series
    assert_eq!(server.archive.hits("/series/se-a"), 1);
    assert_eq!(server.archive.hits("/series/se-b"), 0);
}

#[tokio::test]
async fn test_failing_later_series_does_not_fail_study() {
    let server = MockArchive::new()
        .with_study("S1", json!({ "Series": ["se-a", "se-b"] }))
        .with_series("se-a", json!({ "Instances": ["I1"] }))
        .with_status("/series/se-b", StatusCode::INTERNAL_SERVER_ERROR)
        .start()
        .await;

    let metadata = client(&server).get_study_metadata("S1").await.unwrap();

    assert_eq!(metadata.displayable_instance().unwrap().as_str(), "I1");
    assert_eq!(server.archive.hits("/series/se-b"), 0);
}

#[tokio::test]
async fn test_failing_first_series_fails_study() {
    let server = MockArchive::new()
        .with_study("S1", json!({ "Series": ["se-a", "se-b"] }))
        .with_status("/series/se-a", StatusCode::INTERNAL_SERVER_ERROR)
        .with_series("se-b", json!({ "Instances": ["I2"] }))
        .start()
        .await;

    let result = client(&server).get_study_metadata("S1").await;

    assert!(matches!(
        result,
        Err(ArchiveError::Unreachable {
            status: Some(500),
            ..
        })
    ));
}

#[tokio::test]
async fn test_dangling_series_reference_is_malformed() {
    let server = MockArchive::new()
        .with_study("S1", json!({ "Series": ["se-missing"] }))
        .start()
        .await;

    let result = client(&server).get_study_metadata("S1").await;

    assert!(matches!(result, Err(ArchiveError::Malformed { .. })));
}

#[tokio::test]
async fn test_empty_study_resolves_without_displayable_image() {
    let server = MockArchive::new()
        .with_inline_study("S3", &[])
        .start()
        .await;

    let metadata = client(&server).get_study_metadata("S3").await.unwrap();

    assert_eq!(
        metadata.displayable_instance(),
        Err(ArchiveError::NoDisplayableImage {
            study_id: "S3".to_string()
        })
    );
}

// =============================================================================
// Error Mapping
// =============================================================================

#[tokio::test]
async fn test_missing_study_is_not_found() {
    let server = MockArchive::new().start().await;

    let result = client(&server).get_study_metadata("S2").await;

    assert_eq!(
        result,
        Err(ArchiveError::NotFound {
            study_id: "S2".to_string()
        })
    );
    assert_eq!(server.archive.hits("/studies/S2"), 1);
}

#[tokio::test]
async fn test_gone_study_is_not_found() {
    let server = MockArchive::new()
        .with_status("/studies/S2", StatusCode::GONE)
        .start()
        .await;

    let result = client(&server).get_study_metadata("S2").await;

    assert!(matches!(result, Err(ArchiveError::NotFound { .. })));
}

#[tokio::test]
async fn test_server_error_is_unreachable() {
    let server = MockArchive::new()
        .with_status("/studies/S1", StatusCode::INTERNAL_SERVER_ERROR)
        .start()
        .await;

    let result = client(&server).get_study_metadata("S1").await;

    assert!(matches!(
        result,
        Err(ArchiveError::Unreachable {
            status: Some(500),
            ..
        })
    ));
}

#[tokio::test]
async fn test_unauthorized_is_unreachable() {
    let server = MockArchive::new()
        .with_status("/studies/S1", StatusCode::UNAUTHORIZED)
        .start()
        .await;

    let result = client(&server).get_study_metadata("S1").await;

    assert!(matches!(
        result,
        Err(ArchiveError::Unreachable {
            status: Some(401),
            ..
        })
    ));
}

#[tokio::test]
async fn test_invalid_json_is_malformed() {
    let server = MockArchive::new()
        .with_raw("/studies/S1", b"{\"Series\": [")
        .start()
        .await;

    let result = client(&server).get_study_metadata("S1").await;

    assert!(matches!(result, Err(ArchiveError::Malformed { .. })));
}

#[tokio::test]
async fn test_missing_series_field_is_malformed() {
    let server = MockArchive::new()
        .with_study("S1", json!({ "MainDicomTags": {} }))
        .start()
        .await;

    let result = client(&server).get_study_metadata("S1").await;

    assert!(matches!(result, Err(ArchiveError::Malformed { .. })));
}

#[tokio::test]
async fn test_timeout_is_unreachable() {
    let (archive, _gate) = MockArchive::new()
        .with_inline_study("S1", &[&["I1"]])
        .gated("/studies/S1");
    let server = archive.start().await;

    let http = create_http_client(Duration::from_millis(200)).unwrap();
    let client = HttpArchiveClient::new(http, server.base_url.as_str());
    let result = client.get_study_metadata("S1").await;

    assert!(matches!(
        result,
        Err(ArchiveError::Unreachable { status: None, .. })
    ));
}

// =============================================================================
// Listing and Locators
// =============================================================================

#[tokio::test]
async fn test_list_studies() {
    let server = MockArchive::new()
        .with_json("/studies", json!(["S1", "S2"]))
        .start()
        .await;

    let studies = client(&server).list_studies().await.unwrap();

    assert_eq!(studies, vec!["S1".to_string(), "S2".to_string()]);
}

#[tokio::test]
async fn test_list_studies_without_endpoint_is_unreachable() {
    let server = MockArchive::new().start().await;

    let result = client(&server).list_studies().await;

    assert!(matches!(result, Err(ArchiveError::Unreachable { .. })));
}

#[tokio::test]
async fn test_locator_points_at_instance_file() {
    let server = MockArchive::new().start().await;

    let locator = client(&server).image_locator(&InstanceId::from("I1"));

    assert_eq!(
        locator.as_str(),
        format!("wadouri:{}/instances/I1/file", server.base_url)
    );
    assert_eq!(
        locator.fetch_url(),
        Some(format!("{}/instances/I1/file", server.base_url).as_str())
    );
}
