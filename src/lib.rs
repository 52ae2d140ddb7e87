//! # course-dl
//!
//! Concurrent downloader for online course content.
//!
//! A run lists every document of a course, fetches them through a bounded
//! worker pool, and writes them to disk only once every fetch has succeeded.
//! The first failed fetch stops the whole run.
//!
//! ## Layers
//!
//! - [`pool`] - generic fixed-size worker pool with first-error-wins cancellation
//! - [`pipeline`] - catalog -> pool -> sink orchestration
//! - [`api`] and [`course`] - the course platform plugged into the pipeline
//!
//! ## Quick Start
//!
//! ```no_run
//! use course_dl::{Config, download_course};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let shutdown = CancellationToken::new();
//!
//!     let report = download_course(&config, "Grokking Modern Behavioral Interview", shutdown).await?;
//!     println!("saved {} of {} documents", report.saved, report.jobs);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Course platform HTTP client
pub mod api;
/// Configuration types
pub mod config;
/// Course catalog, document fetcher and JSON output
pub mod course;
/// Error types
pub mod error;
/// Catalog -> pool -> sink orchestration
pub mod pipeline;
/// Bounded worker pool
pub mod pool;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use api::ApiClient;
pub use config::{ApiConfig, Config, OutputConfig, PipelineConfig};
pub use course::{CourseCatalog, CourseListing, DocumentFetcher, JsonDirSink, download_course};
pub use error::{Error, FetchError, FetchErrorKind, Result, SaveError};
pub use pipeline::{Catalog, Orchestrator, Sink};
pub use pool::{CancelSignal, Fetcher, WorkerPool};
pub use types::{Event, Job, RunReport};

use tokio_util::sync::CancellationToken;

/// Cancel `shutdown` when the process receives a termination signal.
///
/// - **Unix:** SIGTERM or SIGINT.
/// - **Windows/other:** Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Returns without cancelling if `shutdown` is cancelled first.
///
/// # Example
///
/// ```no_run
/// use course_dl::cancel_on_signal;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() {
/// let shutdown = CancellationToken::new();
/// tokio::spawn(cancel_on_signal(shutdown.clone()));
/// # }
/// ```
pub async fn cancel_on_signal(shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = wait_for_signal() => {
            tracing::info!("shutting down, waiting for in-flight fetches");
            shutdown.cancel();
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT (Ctrl+C)"),
            }
        }
        (Ok(mut only), Err(e)) | (Err(e), Ok(mut only)) => {
            tracing::warn!(error = %e, "could not register every signal handler");
            only.recv().await;
            tracing::info!("received termination signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            // Never resolve, so a listener failure does not look like a signal
            std::future::pending::<()>().await;
        }
    }
}
