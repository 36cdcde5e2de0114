//! Data models that flow through one update run.
//!
//! - [`SourceSpec`]: one configured source, loaded once per run
//! - [`FetchedItem`]: an in-window item pulled from a source's feed
//! - [`SummaryResult`]: generated text for one source or for all of them
//! - [`EventsSpec`] / [`UpcomingEvent`]: the optional upcoming-dates block
//! - [`RenderedFragment`]: the HTML that replaces the container's content
//! - [`PublishTarget`]: where and as whom the fragment is written
//!
//! Nothing here outlives the run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A configured source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Unique identifier, also used as the section label on the page.
    pub id: String,
    /// Feed location (RSS 2.0 or Atom).
    pub url: String,
    /// Trailing lookback window in days, always at least 1.
    pub window_days: u32,
    /// Keywords, trimmed and de-duplicated. Empty means "no filtering".
    pub keywords: Vec<String>,
    /// Tone/format instruction handed verbatim to the model.
    pub style: String,
}

/// A single feed item that survived the window and keyword filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedItem {
    pub source_id: String,
    pub published_at: DateTime<Utc>,
    pub title: String,
    /// Plain text; markup is stripped during parsing.
    pub content: String,
    pub url: String,
}

/// How summaries are requested from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMode {
    /// One request and one section per source, in declaration order.
    #[default]
    PerSource,
    /// One request covering every source and a single section.
    Aggregate,
}

/// Which sources a summary covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryScope {
    Source(String),
    Aggregate,
}

impl fmt::Display for SummaryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryScope::Source(id) => f.write_str(id),
            SummaryScope::Aggregate => f.write_str("aggregate"),
        }
    }
}

/// Model output for one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub scope: SummaryScope,
    /// Raw model text. Treated as untrusted when rendered.
    pub text: String,
    pub generated_at: DateTime<Utc>,
}

/// Where the upcoming-events block comes from and how it is labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsSpec {
    /// Listing page whose links carry a `d.m.yyyy` date in their text.
    pub url: String,
    /// Maximum number of events shown.
    pub count: usize,
    pub heading: String,
    /// Shown instead of the list when nothing upcoming was found.
    pub empty_text: String,
}

/// A dated link scraped from the events page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingEvent {
    pub date: NaiveDate,
    pub title: String,
    /// Absolute http(s) URL.
    pub url: String,
}

/// Inner HTML for exactly one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFragment {
    pub container_id: String,
    pub html: String,
}

/// CMS coordinates and credentials. Built once from the environment.
#[derive(Clone)]
pub struct PublishTarget {
    /// Site root without a trailing slash.
    pub base_url: String,
    pub page_id: String,
    pub container_id: String,
    pub username: String,
    pub app_password: String,
}

// Keep the application password out of logs.
impl fmt::Debug for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishTarget")
            .field("base_url", &self.base_url)
            .field("page_id", &self.page_id)
            .field("container_id", &self.container_id)
            .field("username", &self.username)
            .field("app_password", &"<redacted>")
            .finish()
    }
}
