//! Content fetching for the configured sources.
//!
//! Each source is fetched in declaration order, one request at a time:
//!
//! 1. **Download**: [`FetchRaw::fetch_raw`] returns the feed body
//! 2. **Parse**: [`feed::parse_feed`] turns RSS/Atom into raw items
//! 3. **Select**: [`filter::select_items`] keeps in-window, keyword-matching items
//!
//! A failing source is logged and skipped. The run only fails here when no
//! source produced a single item.

pub mod events;
pub mod feed;
pub mod filter;

use crate::config::SourcesConfig;
use crate::error::{FetchError, UpdaterError};
use crate::models::{FetchedItem, SourceSpec};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

const USER_AGENT: &str = concat!(
    "weekly_updater/",
    env!("CARGO_PKG_VERSION"),
    " (+scheduled content summary)"
);

/// Retrieves a document body by URL.
pub trait FetchRaw {
    async fn fetch_raw(&self, url: &str) -> Result<String, FetchError>;
}

/// [`FetchRaw`] over HTTP with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl FetchRaw for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_raw(&self, url: &str) -> Result<String, FetchError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.to_string() }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let resp = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.8, */*;q=0.5",
            )
            .send()
            .await
            .map_err(map_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(map_err)
    }
}

/// Items selected from one source.
#[derive(Debug, Clone)]
pub struct SourceBatch<'a> {
    pub spec: &'a SourceSpec,
    pub items: Vec<FetchedItem>,
}

/// Fetch, parse and filter a single source.
#[instrument(level = "info", skip_all, fields(source = %spec.id))]
pub async fn fetch_source<F: FetchRaw>(
    fetcher: &F,
    spec: &SourceSpec,
    now: DateTime<Utc>,
    max_items: usize,
) -> Result<Vec<FetchedItem>, FetchError> {
    let body = fetcher.fetch_raw(&spec.url).await?;
    let raw = feed::parse_feed(&body).map_err(|reason| FetchError::Feed {
        url: spec.url.clone(),
        reason,
    })?;
    let parsed = raw.len();
    let items = filter::select_items(raw, spec, now, max_items);
    debug!(parsed, selected = items.len(), "Filtered feed items");
    Ok(items)
}

/// Fetch every configured source, isolating per-source failures.
///
/// Returns batches in declaration order, leaving out sources that failed or
/// had nothing in their window. Fails with [`UpdaterError::NoContent`] when
/// every source came back empty-handed.
#[instrument(level = "info", skip_all, fields(sources = config.sources.len()))]
pub async fn fetch_all<'a, F: FetchRaw>(
    fetcher: &F,
    config: &'a SourcesConfig,
    now: DateTime<Utc>,
) -> Result<Vec<SourceBatch<'a>>, UpdaterError> {
    let mut batches = Vec::new();
    let mut failed = 0usize;
    let mut empty = 0usize;

    for spec in &config.sources {
        let t0 = Instant::now();
        match fetch_source(fetcher, spec, now, config.max_items_per_source).await {
            Ok(items) if items.is_empty() => {
                empty += 1;
                info!(source = %spec.id, window_days = spec.window_days, "No items in window; omitting source");
            }
            Ok(items) => {
                info!(
                    source = %spec.id,
                    count = items.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Fetched source"
                );
                batches.push(SourceBatch { spec, items });
            }
            Err(e) => {
                failed += 1;
                warn!(source = %spec.id, error = %e, "Fetch failed; omitting source");
            }
        }
    }

    if batches.is_empty() {
        return Err(UpdaterError::NoContent { failed, empty });
    }

    info!(
        succeeded = batches.len(),
        failed,
        empty,
        items = batches.iter().map(|b| b.items.len()).sum::<usize>(),
        "Fetch stage complete"
    );
    Ok(batches)
}
