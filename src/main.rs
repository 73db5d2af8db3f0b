//! Study Viewer - resolve and render studies from a DICOM archive.
//!
//! This binary wires the archive client, renderer and session together
//! behind the `show` and `check` commands.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use study_viewer::{
    config::{CheckConfig, Cli, Command, ShowConfig},
    create_http_client, initialize, Canvas, ExamReference, HttpArchiveClient, HttpImageFetcher,
    ImageRenderer, MountOutcome, RasterCache, RenderingSession, SessionState, StudyArchive,
    SurfaceHandle,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Show(config) => run_show(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Show Command
// =============================================================================

async fn run_show(config: ShowConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = initialize(config.backend_config()) {
        error!("Decoder initialization failed: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!("  Archive: {}", config.archive.archive_url);
    info!("  Timeout: {}s", config.archive.timeout_secs);
    info!(
        "  Cache: {}MB decoded images, max dimension {}px",
        config.cache_images / (1024 * 1024),
        config.max_dimension
    );

    let http = match create_http_client(config.archive.timeout()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let archive = HttpArchiveClient::new(http.clone(), config.archive.archive_url.as_str());
    let renderer = match ImageRenderer::with_cache(
        HttpImageFetcher::new(http),
        RasterCache::with_capacity(config.cache_images),
    ) {
        Ok(renderer) => renderer,
        Err(e) => {
            error!("Failed to create renderer: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let session = RenderingSession::new(archive, renderer);

    let canvas = Arc::new(Canvas::new());
    let exam = ExamReference::new(config.study.as_str(), config.description.as_str());
    let outcome = session
        .mount(exam.clone(), SurfaceHandle::new(canvas.clone()))
        .await;

    let code = match outcome {
        MountOutcome::Settled(SessionState::Displayed) => {
            report_displayed(&exam, &canvas, &config).await
        }
        MountOutcome::Settled(SessionState::Error(failure)) => {
            println!("✗ {}", failure.user_message());
            println!("  {}", failure);
            ExitCode::FAILURE
        }
        MountOutcome::Settled(state) => {
            error!("Session settled in unexpected state {}", state);
            ExitCode::FAILURE
        }
        MountOutcome::Superseded => {
            error!("Session was superseded before it settled");
            ExitCode::FAILURE
        }
    };

    session.unmount();
    code
}

async fn report_displayed(exam: &ExamReference, canvas: &Canvas, config: &ShowConfig) -> ExitCode {
    println!("✓ Displayed {}", exam);
    if let Some(raster) = canvas.snapshot() {
        println!("  Image: {}x{}", raster.width(), raster.height());
    }

    let Some(path) = config.output.as_ref() else {
        return ExitCode::SUCCESS;
    };

    let png = match canvas.to_png() {
        Some(Ok(png)) => png,
        Some(Err(e)) => {
            error!("Failed to encode PNG: {}", e);
            return ExitCode::FAILURE;
        }
        None => {
            error!("Nothing was painted on the canvas");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::fs::write(path, png).await {
        error!("Failed to write {}: {}", path.display(), e);
        return ExitCode::FAILURE;
    }

    println!("  Saved to {}", path.display());
    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "study_viewer=debug"
    } else {
        "study_viewer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Study Viewer Configuration Check");
    println!("═════════════════════════════════");
    println!();

    match config.validate() {
        Ok(()) => println!("✓ Archive: {}", config.archive.archive_url),
        Err(e) => {
            println!("✗ Archive: {}", e);
            return ExitCode::FAILURE;
        }
    }
    println!("✓ Timeout: {}s", config.archive.timeout_secs);
    println!();

    let http = match create_http_client(config.archive.timeout()) {
        Ok(client) => client,
        Err(e) => {
            println!("✗ HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let archive = HttpArchiveClient::new(http, config.archive.archive_url.as_str());

    print!("Testing archive connection... ");
    let studies = match archive.list_studies().await {
        Ok(studies) => {
            println!("✓ success");
            studies
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - The archive is running and reachable");
            println!("  - The archive URL points at the REST API root");
            return ExitCode::FAILURE;
        }
    };

    if config.list_studies {
        println!();
        println!("Studies in archive:");
        println!("───────────────────");
        if studies.is_empty() {
            println!("  (no studies found)");
        } else {
            for study in &studies {
                println!("  {}", study);
            }
            println!();
            println!("Total: {} study(ies)", studies.len());
        }
    }

    if let Some(ref study_id) = config.test_study {
        println!();
        print!("Testing study '{}'... ", study_id);

        let metadata = match archive.get_study_metadata(study_id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                println!("✗ failed");
                println!();
                println!("  {}", e);
                return ExitCode::FAILURE;
            }
        };

        match metadata.displayable_instance() {
            Ok(instance) => {
                println!("✓ found");
                println!(
                    "  Series: {}, instances: {}",
                    metadata.series.len(),
                    metadata.instance_count()
                );
                println!("  Image: {}", archive.image_locator(instance));
            }
            Err(e) => {
                println!("✗ not displayable");
                println!();
                println!("  {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    println!();
    println!("═════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
