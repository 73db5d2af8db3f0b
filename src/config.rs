//! Configuration management for the study viewer.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `VIEWER_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use study_viewer::config::{Cli, Command};
//! use clap::Parser;
//!
//! match Cli::parse().into_command() {
//!     Command::Show(config) => println!("Showing study {}", config.study),
//!     Command::Check(config) => println!("Checking {}", config.archive.archive_url),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `VIEWER_ARCHIVE_URL` - Base URL of the imaging archive REST API (required)
//! - `VIEWER_TIMEOUT_SECS` - HTTP request timeout in seconds (default: 30)
//! - `VIEWER_CACHE_IMAGES` - Decoded image cache size in bytes (default: 64MB)
//! - `VIEWER_MAX_DIMENSION` - Largest decodable image side in pixels (default: 16384)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::render::{BackendConfig, DEFAULT_MAX_DIMENSION, DEFAULT_RASTER_CACHE_CAPACITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Study viewer - resolve and render studies from a DICOM archive.
#[derive(Parser, Debug, Clone)]
#[command(name = "study-viewer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Resolve a study, render its first image and optionally save it as PNG.
    Show(ShowConfig),

    /// Check archive connectivity and optionally resolve a study.
    Check(CheckConfig),
}

/// Archive connection settings shared by all subcommands.
#[derive(Args, Debug, Clone)]
pub struct ArchiveArgs {
    /// Base URL of the archive REST API (e.g. http://localhost:8042).
    #[arg(long, env = "VIEWER_ARCHIVE_URL")]
    pub archive_url: String,

    /// HTTP request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "VIEWER_TIMEOUT_SECS")]
    pub timeout_secs: u64,
}

impl ArchiveArgs {
    /// Validate the archive settings and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.archive_url.is_empty() {
            return Err(
                "Archive URL is required. Set --archive-url or VIEWER_ARCHIVE_URL".to_string(),
            );
        }

        let url = Url::parse(&self.archive_url)
            .map_err(|e| format!("Invalid archive URL '{}': {}", self.archive_url, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!(
                "Archive URL must use http or https, got '{}'",
                url.scheme()
            ));
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for the `show` command.
#[derive(Args, Debug, Clone)]
pub struct ShowConfig {
    #[command(flatten)]
    pub archive: ArchiveArgs,

    /// Archive key of the study to display.
    #[arg(long)]
    pub study: String,

    /// Display label of the exam.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Write the rendered image to this PNG file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Decoded image cache size in bytes.
    #[arg(long, default_value_t = DEFAULT_RASTER_CACHE_CAPACITY, env = "VIEWER_CACHE_IMAGES")]
    pub cache_images: usize,

    /// Largest decodable image width or height in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, env = "VIEWER_MAX_DIMENSION")]
    pub max_dimension: u32,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ShowConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.archive.validate()?;

        if self.study.trim().is_empty() {
            return Err("Study ID must not be empty".to_string());
        }

        if self.max_dimension == 0 {
            return Err("max_dimension must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Decode backend settings derived from this configuration.
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            max_dimension: self.max_dimension,
            ..BackendConfig::default()
        }
    }
}

/// Configuration for the `check` command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub archive: ArchiveArgs,

    /// List the studies known to the archive.
    #[arg(long, default_value_t = false)]
    pub list_studies: bool,

    /// Resolve a specific study and report its displayable image.
    #[arg(long)]
    pub test_study: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CheckConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.archive.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
