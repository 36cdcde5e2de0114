//! Sources file loading and run settings.
//!
//! The sources file is YAML:
//!
//! ```yaml
//! summary_mode: per_source     # or `aggregate`
//! language: Deutsch
//! heading: Weekly-Updates
//! max_items_per_source: 20
//! sources:
//!   - id: finma
//!     url: https://www.finma.ch/de/rss/news/
//!     window_days: 7
//!     keywords: [Rundschreiben, Sanktion]
//!     style: Nüchtern, höchstens fünf Stichpunkte.
//! events:                      # optional
//!   url: https://iguv.ch/event/
//!   count: 3
//!   heading: Nächste Events
//!   empty_text: Derzeit keine kommenden Termine veröffentlicht.
//! footer: Massgebend sind die verlinkten Originalquellen.   # optional
//! ```
//!
//! Secrets never live in this file; they arrive through [`crate::cli::Cli`]
//! and are gathered into [`Settings`] once, in `main`.

use crate::cli::{Cli, PublishModeArg};
use crate::error::ConfigError;
use crate::models::{EventsSpec, PublishTarget, SourceSpec, SummaryMode};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

const DEFAULT_MAX_ITEMS: usize = 20;
const DEFAULT_EVENTS_COUNT: usize = 3;

/// Parsed and validated sources file.
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub sources: Vec<SourceSpec>,
    pub summary_mode: SummaryMode,
    pub language: String,
    pub heading: String,
    pub max_items_per_source: usize,
    pub events: Option<EventsSpec>,
    /// Closing line under the summaries, rendered as escaped text.
    pub footer: Option<String>,
}

// Every field optional so that missing ones surface as `ConfigError`
// instead of an opaque serde message.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    sources: Vec<RawSource>,
    #[serde(default)]
    summary_mode: SummaryMode,
    language: Option<String>,
    heading: Option<String>,
    max_items_per_source: Option<usize>,
    events: Option<RawEvents>,
    footer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvents {
    url: Option<String>,
    count: Option<usize>,
    heading: Option<String>,
    empty_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    id: Option<String>,
    url: Option<String>,
    window_days: Option<i64>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    style: String,
}

/// Read and validate the sources file at `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_sources(path: &Path) -> Result<SourcesConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config = parse_sources(&text).map_err(|e| match e {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })?;
    info!(count = config.sources.len(), mode = ?config.summary_mode, "Loaded sources");
    Ok(config)
}

/// Parse and validate a sources document.
pub fn parse_sources(text: &str) -> Result<SourcesConfig, ConfigError> {
    let raw: RawConfig = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
        path: "<inline>".to_string(),
        source,
    })?;

    if raw.sources.is_empty() {
        return Err(ConfigError::NoSources);
    }

    let mut seen = HashSet::new();
    let mut sources = Vec::with_capacity(raw.sources.len());
    for (index, src) in raw.sources.into_iter().enumerate() {
        let spec = validate_source(index, src)?;
        if !seen.insert(spec.id.clone()) {
            return Err(ConfigError::DuplicateId(spec.id));
        }
        debug!(id = %spec.id, window_days = spec.window_days, keywords = spec.keywords.len(), "Source accepted");
        sources.push(spec);
    }

    let max_items_per_source = raw.max_items_per_source.unwrap_or(DEFAULT_MAX_ITEMS);
    if max_items_per_source == 0 {
        return Err(ConfigError::Invalid(
            "max_items_per_source must be positive".to_string(),
        ));
    }

    let events = raw.events.map(validate_events).transpose()?;

    Ok(SourcesConfig {
        sources,
        summary_mode: raw.summary_mode,
        language: non_blank(raw.language).unwrap_or_else(|| "English".to_string()),
        heading: non_blank(raw.heading).unwrap_or_else(|| "Weekly Update".to_string()),
        max_items_per_source,
        events,
        footer: non_blank(raw.footer),
    })
}

fn validate_events(raw: RawEvents) -> Result<EventsSpec, ConfigError> {
    let url = non_blank(raw.url)
        .ok_or_else(|| ConfigError::Invalid("events: missing required field `url`".to_string()))?;
    check_url("events", &url)?;
    let count = raw.count.unwrap_or(DEFAULT_EVENTS_COUNT);
    if count == 0 {
        return Err(ConfigError::Invalid("events: count must be positive".to_string()));
    }
    Ok(EventsSpec {
        url,
        count,
        heading: non_blank(raw.heading).unwrap_or_else(|| "Upcoming events".to_string()),
        empty_text: non_blank(raw.empty_text)
            .unwrap_or_else(|| "No upcoming dates published.".to_string()),
    })
}

fn check_url(id: &str, url: &str) -> Result<(), ConfigError> {
    let reason = match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => return Ok(()),
        Ok(parsed) => format!("unsupported scheme `{}`", parsed.scheme()),
        Err(e) => e.to_string(),
    };
    Err(ConfigError::InvalidUrl {
        id: id.to_string(),
        url: url.to_string(),
        reason,
    })
}

fn validate_source(index: usize, src: RawSource) -> Result<SourceSpec, ConfigError> {
    let id = non_blank(src.id).ok_or(ConfigError::MissingField { index, field: "id" })?;
    let url = non_blank(src.url).ok_or(ConfigError::MissingField { index, field: "url" })?;
    let window = src
        .window_days
        .ok_or(ConfigError::MissingField { index, field: "window_days" })?;

    let window_days = u32::try_from(window)
        .ok()
        .filter(|w| *w > 0)
        .ok_or_else(|| ConfigError::NonPositiveWindow {
            id: id.clone(),
            value: window,
        })?;

    check_url(&id, &url)?;

    Ok(SourceSpec {
        id,
        url,
        window_days,
        keywords: clean_keywords(src.keywords),
        style: src.style.trim().to_string(),
    })
}

fn clean_keywords(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .unique_by(|k| k.to_lowercase())
        .collect()
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Settings for the AI endpoint.
#[derive(Clone)]
pub struct AiSettings {
    /// Base URL of an OpenAI-compatible API, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// How the fragment reaches the CMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishMode {
    /// Read the page through the REST API, splice, write it back.
    Page,
    /// Hand the fragment to a plugin route that splices server side.
    Endpoint { route: String },
}

/// Everything a run needs, constructed once at process start.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sources_path: PathBuf,
    pub template_path: PathBuf,
    pub ai: AiSettings,
    pub target: PublishTarget,
    pub publish_mode: PublishMode,
    pub http_timeout: Duration,
    pub dry_run: bool,
}

impl Settings {
    /// Assemble settings from parsed CLI arguments, rejecting missing secrets.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut require = |name: &'static str, value: Option<String>| -> String {
            match non_blank(value) {
                Some(v) => v,
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let api_key = require("OPENAI_API_KEY", cli.openai_api_key);
        let base_url = require("WP_BASE", cli.wp_base);
        let username = require("WP_USERNAME", cli.wp_username);
        let app_password = require("WP_APP_PASSWORD", cli.wp_app_password);
        let page_id = require("WP_PAGE_ID", cli.wp_page_id);
        let container_id = require("WP_CONTAINER_ID", cli.wp_container_id);

        // A dry run never talks to the CMS, so its credentials are optional.
        let missing: Vec<&str> = missing
            .into_iter()
            .filter(|name| !(cli.dry_run && name.starts_with("WP_") && *name != "WP_CONTAINER_ID"))
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "missing environment variables: {}",
                missing.join(", ")
            )));
        }
        if cli.openai_timeout_secs == 0 || cli.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".to_string()));
        }

        let publish_mode = match cli.publish_mode {
            PublishModeArg::Page => PublishMode::Page,
            PublishModeArg::Endpoint => PublishMode::Endpoint {
                route: cli.endpoint_route.trim_matches('/').to_string(),
            },
        };

        Ok(Settings {
            sources_path: cli.sources,
            template_path: cli.template,
            ai: AiSettings {
                base_url: cli.openai_base_url.trim_end_matches('/').to_string(),
                api_key,
                model: cli.openai_model,
                timeout: Duration::from_secs(cli.openai_timeout_secs),
            },
            target: PublishTarget {
                base_url: base_url.trim_end_matches('/').to_string(),
                page_id,
                container_id,
                username,
                app_password,
            },
            publish_mode,
            http_timeout: Duration::from_secs(cli.http_timeout_secs),
            dry_run: cli.dry_run,
        })
    }
}
