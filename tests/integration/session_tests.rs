//! End-to-end session tests.
//!
//! Tests verify, against a mock archive over HTTP:
//! - Displaying the first instance of the first series
//! - Error kinds for missing studies, failed fetches and bad payloads
//! - DICOM payloads (native and encapsulated)
//! - Exam switching, stale result suppression and unmount mid-load

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use study_viewer::{
    create_http_client, Canvas, ErrorKind, ExamReference, HttpArchiveClient, HttpImageFetcher,
    ImageRenderer, MountOutcome, RenderingSession, SessionState, SurfaceHandle,
};

use super::test_utils::{
    closed_port, dicom_encapsulated_jpeg, dicom_mono8, init_backend, jpeg_bytes, png_bytes,
    MockArchive, MockServer, BLUE, GREEN, RED,
};

type HttpSession = RenderingSession<HttpArchiveClient, HttpImageFetcher>;

fn session(server: &MockServer) -> HttpSession {
    init_backend();
    let http = create_http_client(Duration::from_secs(5)).unwrap();
    let archive = HttpArchiveClient::new(http.clone(), server.base_url.as_str());
    let renderer = ImageRenderer::new(HttpImageFetcher::new(http)).unwrap();
    RenderingSession::new(archive, renderer)
}

fn new_canvas() -> (Arc<Canvas>, SurfaceHandle) {
    let canvas = Arc::new(Canvas::new());
    let handle = SurfaceHandle::new(canvas.clone());
    (canvas, handle)
}

fn exam(study_id: &str) -> ExamReference {
    ExamReference::new(study_id, "integration exam")
}

// =============================================================================
// Display
// =============================================================================

#[tokio::test]
async fn test_displays_first_instance_only() {
    let server = MockArchive::new()
        .with_inline_study("S1", &[&["I1", "I2"]])
        .with_file("I1", png_bytes(3, 2, RED))
        .with_file("I2", png_bytes(3, 2, GREEN))
        .start()
        .await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    let outcome = session.mount(exam("S1"), handle).await;

    assert_eq!(outcome, MountOutcome::Settled(SessionState::Displayed));
    assert_eq!(session.state(), SessionState::Displayed);

    let shown = canvas.snapshot().unwrap();
    assert_eq!(shown.dimensions(), (3, 2));
    assert_eq!(shown.get_pixel(0, 0), &RED);

    assert_eq!(server.archive.hits(&MockArchive::file_path("I1")), 1);
    assert_eq!(server.archive.hits(&MockArchive::file_path("I2")), 0);
}

#[tokio::test]
async fn test_displays_jpeg_payload() {
    let server = MockArchive::new()
        .with_inline_study("S1", &[&["I1"]])
        .with_file("I1", jpeg_bytes(32, 16))
        .start()
        .await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    session.mount(exam("S1"), handle).await;

    assert_eq!(session.state(), SessionState::Displayed);
    assert_eq!(canvas.snapshot().unwrap().dimensions(), (32, 16));
}

#[tokio::test]
async fn test_displays_native_dicom() {
    let server = MockArchive::new()
        .with_inline_study("S1", &[&["I1"]])
        .with_file("I1", dicom_mono8(2, 2, &[0, 85, 170, 255]))
        .start()
        .await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    session.mount(exam("S1"), handle).await;

    assert_eq!(session.state(), SessionState::Displayed);
    let shown = canvas.snapshot().unwrap();
    assert_eq!(shown.dimensions(), (2, 2));
    assert_eq!(shown.get_pixel(0, 0).0, [0, 0, 0, 255]);
    assert_eq!(shown.get_pixel(1, 1).0, [255, 255, 255, 255]);
}

#[tokio::test]
async fn test_displays_encapsulated_dicom() {
    let server = MockArchive::new()
        .with_inline_study("S1", &[&["I1"]])
        .with_file("I1", dicom_encapsulated_jpeg(16, 24, &jpeg_bytes(24, 16)))
        .start()
        .await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    session.mount(exam("S1"), handle).await;

    assert_eq!(session.state(), SessionState::Displayed);
    assert_eq!(canvas.snapshot().unwrap().dimensions(), (24, 16));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_missing_study_is_archive_not_found() {
    let server = MockArchive::new().start().await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    let outcome = session.mount(exam("S2"), handle).await;

    let state = session.state();
    assert_eq!(state.error_kind(), Some(ErrorKind::ArchiveNotFound));
    assert_eq!(outcome, MountOutcome::Settled(state));
    assert_eq!(canvas.paint_count(), 0);
}

#[tokio::test]
async fn test_unreachable_archive() {
    init_backend();
    let http = create_http_client(Duration::from_secs(2)).unwrap();
    let base_url = format!("http://127.0.0.1:{}", closed_port().await);
    let archive = HttpArchiveClient::new(http.clone(), base_url);
    let renderer = ImageRenderer::new(HttpImageFetcher::new(http)).unwrap();
    let session = RenderingSession::new(archive, renderer);
    let (_, handle) = new_canvas();

    session.mount(exam("S1"), handle).await;

    let state = session.state();
    assert_eq!(state.error_kind(), Some(ErrorKind::ArchiveUnreachable));
    if let SessionState::Error(failure) = state {
        assert_eq!(failure.user_message(), "Could not reach the imaging archive.");
    }
}

#[tokio::test]
async fn test_empty_study_never_fetches() {
    let server = MockArchive::new()
        .with_inline_study("S3", &[])
        .with_inline_study("S4", &[&[], &["I4"]])
        .with_file("I4", png_bytes(1, 1, RED))
        .start()
        .await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    session.mount(exam("S3"), handle.clone()).await;
    assert_eq!(
        session.state().error_kind(),
        Some(ErrorKind::NoDisplayableImage)
    );

    session.mount(exam("S4"), handle).await;
    assert_eq!(
        session.state().error_kind(),
        Some(ErrorKind::NoDisplayableImage)
    );

    assert_eq!(server.archive.file_hits(), 0);
    assert_eq!(canvas.paint_count(), 0);
}

#[tokio::test]
async fn test_fetch_error_keeps_prior_content() {
    let server = MockArchive::new()
        .with_inline_study("S1", &[&["I1"]])
        .with_inline_study("S5", &[&["I5"]])
        .with_file("I1", png_bytes(2, 2, BLUE))
        .with_status(
            &MockArchive::file_path("I5"),
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .start()
        .await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    session.mount(exam("S1"), handle.clone()).await;
    assert_eq!(session.state(), SessionState::Displayed);

    session.mount(exam("S5"), handle).await;

    let state = session.state();
    assert_eq!(state.error_kind(), Some(ErrorKind::FetchFailed));
    if let SessionState::Error(failure) = state {
        assert!(failure.detail.contains("HTTP 500"), "{}", failure.detail);
    }
    assert_eq!(canvas.paint_count(), 1);
    assert_eq!(canvas.snapshot().unwrap().get_pixel(0, 0), &BLUE);
}

#[tokio::test]
async fn test_missing_file_is_fetch_failure() {
    let server = MockArchive::new()
        .with_inline_study("S1", &[&["I1"]])
        .start()
        .await;
    let session = session(&server);
    let (_, handle) = new_canvas();

    session.mount(exam("S1"), handle).await;

    assert_eq!(session.state().error_kind(), Some(ErrorKind::FetchFailed));
}

#[tokio::test]
async fn test_undecodable_file_is_decode_failure() {
    let server = MockArchive::new()
        .with_inline_study("S1", &[&["I1"]])
        .with_file("I1", b"<html>login required</html>".to_vec())
        .start()
        .await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    session.mount(exam("S1"), handle).await;

    let state = session.state();
    assert_eq!(state.error_kind(), Some(ErrorKind::DecodeFailed));
    if let SessionState::Error(failure) = state {
        assert_eq!(failure.user_message(), "The image could not be decoded.");
    }
    assert_eq!(canvas.paint_count(), 0);
}

#[tokio::test]
async fn test_malformed_study_is_archive_malformed() {
    let server = MockArchive::new()
        .with_raw("/studies/S1", b"not json")
        .start()
        .await;
    let session = session(&server);
    let (_, handle) = new_canvas();

    session.mount(exam("S1"), handle).await;

    assert_eq!(
        session.state().error_kind(),
        Some(ErrorKind::ArchiveMalformed)
    );
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_late_resolution_of_superseded_exam_is_dropped() {
    let (archive, gate) = MockArchive::new()
        .with_inline_study("A", &[&["IA"]])
        .with_inline_study("B", &[&["IB"]])
        .with_file("IA", png_bytes(1, 1, RED))
        .with_file("IB", png_bytes(1, 1, GREEN))
        .gated("/studies/A");
    let server = archive.start().await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    let mount_a = session.mount(exam("A"), handle.clone());
    let mount_b = async {
        let outcome = session.mount(exam("B"), handle.clone()).await;
        gate.notify_one();
        outcome
    };

    let (outcome_a, outcome_b) = tokio::join!(mount_a, mount_b);

    assert_eq!(outcome_a, MountOutcome::Superseded);
    assert_eq!(outcome_b, MountOutcome::Settled(SessionState::Displayed));
    assert_eq!(session.state(), SessionState::Displayed);
    assert_eq!(session.current_exam(), Some(exam("B")));
    assert_eq!(canvas.paint_count(), 1);
    assert_eq!(canvas.snapshot().unwrap().get_pixel(0, 0), &GREEN);
    assert_eq!(server.archive.hits(&MockArchive::file_path("IA")), 0);
}

#[tokio::test]
async fn test_late_image_of_superseded_exam_is_not_painted() {
    let (archive, gate) = MockArchive::new()
        .with_inline_study("A", &[&["IA"]])
        .with_inline_study("B", &[&["IB"]])
        .with_file("IA", png_bytes(1, 1, RED))
        .with_file("IB", png_bytes(1, 1, GREEN))
        .gated(&MockArchive::file_path("IA"));
    let server = archive.start().await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();
    let mut states = session.subscribe();

    let mount_a = session.mount(exam("A"), handle.clone());
    let mount_b = async {
        // Switch only once A is waiting on its image
        states
            .wait_for(|state| *state == SessionState::Loading)
            .await
            .unwrap();
        let outcome = session.mount(exam("B"), handle.clone()).await;
        gate.notify_one();
        outcome
    };

    let (outcome_a, outcome_b) = tokio::join!(mount_a, mount_b);

    assert!(outcome_a.is_superseded());
    assert_eq!(outcome_b, MountOutcome::Settled(SessionState::Displayed));
    assert_eq!(canvas.paint_count(), 1);
    assert_eq!(canvas.snapshot().unwrap().get_pixel(0, 0), &GREEN);
}

#[tokio::test]
async fn test_unmount_while_image_is_in_flight() {
    let (archive, gate) = MockArchive::new()
        .with_inline_study("S1", &[&["I1"]])
        .with_file("I1", png_bytes(1, 1, RED))
        .gated(&MockArchive::file_path("I1"));
    let server = archive.start().await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();
    let mut states = session.subscribe();

    let mount = session.mount(exam("S1"), handle.clone());
    let teardown = async {
        states
            .wait_for(|state| *state == SessionState::Loading)
            .await
            .unwrap();
        session.unmount();
        gate.notify_one();
    };

    let (outcome, _) = tokio::join!(mount, teardown);

    assert_eq!(outcome, MountOutcome::Superseded);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(canvas.paint_count(), 0);
    assert!(!canvas.is_enabled());
    assert_eq!(canvas.disable_count(), 1);
    assert_eq!(handle.controller(), None);
}

#[tokio::test]
async fn test_failing_later_series_still_displays() {
    let server = MockArchive::new()
        .with_study("S1", json!({ "Series": ["se-a", "se-b"] }))
        .with_series("se-a", json!({ "Instances": ["I1"] }))
        .with_status("/series/se-b", StatusCode::INTERNAL_SERVER_ERROR)
        .with_file("I1", png_bytes(1, 1, BLUE))
        .start()
        .await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    let outcome = session.mount(exam("S1"), handle).await;

    assert_eq!(outcome, MountOutcome::Settled(SessionState::Displayed));
    assert_eq!(canvas.snapshot().unwrap().get_pixel(0, 0), &BLUE);
}

#[tokio::test]
async fn test_unmount_twice() {
    let server = MockArchive::new()
        .with_inline_study("S1", &[&["I1"]])
        .with_file("I1", png_bytes(1, 1, RED))
        .start()
        .await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    session.mount(exam("S1"), handle.clone()).await;
    assert!(canvas.is_enabled());

    session.unmount();
    session.unmount();

    assert_eq!(session.state(), SessionState::Idle);
    assert!(!canvas.is_enabled());
    assert_eq!(canvas.disable_count(), 1);
    assert_eq!(handle.controller(), None);
}

#[tokio::test]
async fn test_surface_reused_by_next_session() {
    let server = MockArchive::new()
        .with_inline_study("S1", &[&["I1"]])
        .with_file("I1", png_bytes(1, 1, RED))
        .start()
        .await;
    let (canvas, handle) = new_canvas();

    {
        let first = session(&server);
        first.mount(exam("S1"), handle.clone()).await;
    }
    assert!(!canvas.is_enabled());

    let second = session(&server);
    second.mount(exam("S1"), handle).await;

    assert_eq!(second.state(), SessionState::Displayed);
    assert!(canvas.is_enabled());
    assert_eq!(canvas.enable_count(), 2);
    assert_eq!(canvas.disable_count(), 1);
}

#[tokio::test]
async fn test_remount_uses_raster_cache() {
    let server = MockArchive::new()
        .with_inline_study("S1", &[&["I1"]])
        .with_inline_study("S2", &[&["I2"]])
        .with_file("I1", png_bytes(1, 1, RED))
        .with_file("I2", png_bytes(1, 1, GREEN))
        .start()
        .await;
    let session = session(&server);
    let (canvas, handle) = new_canvas();

    session.mount(exam("S1"), handle.clone()).await;
    session.mount(exam("S2"), handle.clone()).await;
    session.mount(exam("S1"), handle).await;

    assert_eq!(session.state(), SessionState::Displayed);
    assert_eq!(canvas.snapshot().unwrap().get_pixel(0, 0), &RED);
    assert_eq!(server.archive.hits(&MockArchive::file_path("I1")), 1);
    assert_eq!(server.archive.hits("/studies/S1"), 2);
}
