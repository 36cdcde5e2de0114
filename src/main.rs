//! # Weekly Updater
//!
//! Collects recent items from configured feeds, has an OpenAI-compatible
//! model summarize them per source style, renders the result as HTML and
//! writes it into one container element of a WordPress page.
//!
//! ## Usage
//!
//! ```sh
//! weekly_updater --sources sources.yaml --template template.html
//! ```
//!
//! ## Architecture
//!
//! One strictly sequential pass:
//! 1. **Config**: sources file plus secrets from the environment
//! 2. **Fetch**: download feeds, keep in-window keyword matches (per-source failures tolerated)
//! 3. **Summarize**: one model request per source, or one aggregate request
//! 4. **Render**: escape and format the summaries into the template's container
//! 5. **Publish**: read the live page, replace the container's inner HTML, write it back
//!
//! Exit status is 0 on success and a stage-specific non-zero code otherwise.

use chrono::{Local, Utc};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod container;
mod error;
mod fetch;
mod models;
mod pipeline;
mod publish;
mod render;
mod summarize;
mod utils;

use api::OpenAiClient;
use cli::Cli;
use config::{PublishMode, Settings, load_sources};
use error::{ConfigError, UpdaterError};
use fetch::HttpFetcher;
use pipeline::{RunInputs, run};
use publish::wordpress::{EndpointPublisher, WordPressStore};
use publish::{DryRun, PagePublisher};
use render::load_template;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "weekly_updater starting up");

    let args = Cli::parse();
    let result = execute(args).await;
    let elapsed = start_time.elapsed();

    match result {
        Ok(()) => {
            info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(stage = e.stage(), error = %e, ?elapsed, "Run failed");
            ExitCode::from(e.exit_code())
        }
    }
}

fn client_error(what: &str, e: reqwest::Error) -> UpdaterError {
    ConfigError::Invalid(format!("building {what} HTTP client: {e}")).into()
}

async fn execute(args: Cli) -> Result<(), UpdaterError> {
    let settings = Settings::from_cli(args)?;
    info!(
        sources = %settings.sources_path.display(),
        template = %settings.template_path.display(),
        target = ?settings.target,
        ai = ?settings.ai,
        mode = ?settings.publish_mode,
        dry_run = settings.dry_run,
        "Settings loaded"
    );

    let config = load_sources(&settings.sources_path)?;
    let template = load_template(&settings.template_path)?;

    let fetcher = HttpFetcher::new(settings.http_timeout).map_err(|e| client_error("feed", e))?;
    let ai = OpenAiClient::new(&settings.ai).map_err(|e| client_error("AI", e))?;

    let now = Utc::now();
    let inputs = RunInputs {
        config: &config,
        template: &template,
        container_id: &settings.target.container_id,
        now,
        today: now.with_timezone(&Local).date_naive(),
    };

    if settings.dry_run {
        let rendered = run(&inputs, &fetcher, &ai, &DryRun).await?;
        println!("{}", rendered.page);
        return Ok(());
    }

    match &settings.publish_mode {
        PublishMode::Page => {
            let store = WordPressStore::new(&settings.target, settings.http_timeout)
                .map_err(|e| client_error("CMS", e))?;
            let publisher = PagePublisher::new(store, settings.target.page_id.clone());
            run(&inputs, &fetcher, &ai, &publisher).await?;
        }
        PublishMode::Endpoint { route } => {
            let publisher = EndpointPublisher::new(&settings.target, route, settings.http_timeout)
                .map_err(|e| client_error("CMS", e))?;
            run(&inputs, &fetcher, &ai, &publisher).await?;
        }
    }
    Ok(())
}
