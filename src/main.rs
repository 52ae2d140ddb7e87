//! course-dl: download every document of one course as JSON

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use course_dl::{Config, cancel_on_signal, download_course};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Exact title of the course to download.
    #[arg(long)]
    course: String,

    /// Number of concurrent document fetches [default: 3].
    #[arg(long)]
    workers: Option<usize>,

    /// Output directory [default: resources].
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the course platform.
    #[arg(long)]
    base_url: Option<String>,

    /// Save already-fetched documents even if another fetch failed.
    #[arg(long)]
    persist_partial: bool,
}

impl Args {
    fn into_config(self) -> course_dl::Result<(Config, String)> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }
        if let Some(output) = self.output {
            config.output.dir = output;
        }
        if let Some(base_url) = self.base_url {
            config.api.base_url = base_url;
        }
        if self.persist_partial {
            config.pipeline.persist_partial = true;
        }
        config.validate()?;
        Ok((config, self.course))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "course_dl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (config, course) = match Args::parse().into_config() {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            eprint!("{}", render_error_chain(&e));
            return ExitCode::FAILURE;
        }
    };

    info!(
        course = %course,
        workers = config.pipeline.workers,
        output = %config.output.dir.display(),
        "starting download"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let result = download_course(&config, &course, shutdown.clone()).await;
    // Stop the signal listener
    shutdown.cancel();

    match result {
        Ok(report) => {
            if report.save_failures > 0 {
                warn!(
                    failed = report.save_failures,
                    "some documents could not be saved"
                );
            }
            info!(
                documents = report.jobs,
                saved = report.saved,
                output = %config.output.dir.display(),
                "download complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprint!("{}", render_error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

/// Render `err` and its causes, one per line.
///
/// A cause whose text already appears in the message above it is skipped.
fn render_error_chain(err: &dyn std::error::Error) -> String {
    let mut out = format!("error: {err}\n");
    let mut parent = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !parent.contains(&text) {
            out.push_str(&format!("  caused by: {text}\n"));
        }
        parent = text;
        source = cause.source();
    }
    out
}
