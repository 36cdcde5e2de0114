//! One update run: fetch → summarize → render → publish.
//!
//! Every collaborator is injected, so the whole run can be exercised with
//! in-memory fakes. Stages run strictly one after another and the publisher
//! is only reached once a complete fragment exists.

use crate::api::AskAsync;
use crate::config::SourcesConfig;
use crate::container::find_container;
use crate::error::UpdaterError;
use crate::fetch::events::fetch_events;
use crate::fetch::{FetchRaw, fetch_all};
use crate::publish::Publish;
use crate::render::{PageMeta, Rendered, render};
use crate::summarize::summarize;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, instrument};

/// Inputs fixed for the duration of a run.
#[derive(Debug, Clone)]
pub struct RunInputs<'a> {
    pub config: &'a SourcesConfig,
    pub template: &'a str,
    pub container_id: &'a str,
    /// Reference point for the lookback windows.
    pub now: DateTime<Utc>,
    /// Date printed on the page.
    pub today: NaiveDate,
}

/// Execute a full run and return what was published.
#[instrument(level = "info", skip_all, fields(container = %inputs.container_id))]
pub async fn run<F, A, P>(
    inputs: &RunInputs<'_>,
    fetcher: &F,
    ai: &A,
    publisher: &P,
) -> Result<Rendered, UpdaterError>
where
    F: FetchRaw,
    A: AskAsync,
    P: Publish,
{
    // A broken template should fail before any tokens are spent.
    find_container(inputs.template, inputs.container_id)
        .map_err(|e| UpdaterError::Template(e.to_string()))?;

    info!(stage = "fetch", "Stage starting");
    let batches = fetch_all(fetcher, inputs.config, inputs.now).await?;
    let events = match &inputs.config.events {
        Some(spec) => fetch_events(fetcher, spec, inputs.today).await,
        None => Vec::new(),
    };

    info!(stage = "summarize", "Stage starting");
    let summaries = summarize(ai, &batches, inputs.config).await?;

    info!(stage = "render", "Stage starting");
    let meta = PageMeta {
        heading: &inputs.config.heading,
        date: inputs.today,
        events: inputs
            .config
            .events
            .as_ref()
            .map(|spec| (spec, events.as_slice())),
        footer: inputs.config.footer.as_deref(),
    };
    let rendered = render(
        inputs.template,
        inputs.container_id,
        &summaries,
        &meta,
    )?;

    info!(stage = "publish", "Stage starting");
    publisher.publish(&rendered.fragment).await?;

    info!(
        sources = batches.len(),
        summaries = summaries.len(),
        bytes = rendered.fragment.html.len(),
        "Run complete"
    );
    Ok(rendered)
}
