//! Error taxonomy for a single update run.
//!
//! Every fatal failure is an [`UpdaterError`]; the variant names the stage
//! that failed and maps onto the process exit code. [`FetchError`] is the
//! only per-source, non-fatal kind: the pipeline logs it and moves on.

use thiserror::Error;

/// Problems with the sources file or the environment-provided settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("source #{index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("source `{id}`: window_days must be positive, got {value}")]
    NonPositiveWindow { id: String, value: i64 },

    #[error("source `{id}`: invalid url `{url}`: {reason}")]
    InvalidUrl {
        id: String,
        url: String,
        reason: String,
    },

    #[error("duplicate source id `{0}`")]
    DuplicateId(String),

    #[error("no sources configured")]
    NoSources,

    #[error("{0}")]
    Invalid(String),
}

/// Failure to obtain items from one source. Never aborts the run on its own.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unreadable feed from {url}: {reason}")]
    Feed { url: String, reason: String },
}

/// Failure of the generation request. Always fatal.
#[derive(Debug, Error)]
pub enum SummarizationError {
    #[error("AI endpoint request failed: {0}")]
    Transport(String),

    #[error("AI endpoint timed out")]
    Timeout,

    #[error("AI endpoint rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("AI endpoint quota exhausted or rate limited")]
    RateLimited,

    #[error("AI endpoint answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed AI response: {0}")]
    Malformed(String),

    #[error("AI response was empty")]
    Empty,
}

/// Fatal error of a run, one variant per stage.
#[derive(Debug, Error)]
pub enum UpdaterError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("no source returned any content ({failed} failed, {empty} empty)")]
    NoContent { failed: usize, empty: usize },

    #[error("summarization: {0}")]
    Summarization(#[from] SummarizationError),

    #[error("template: {0}")]
    Template(String),

    #[error("CMS rejected credentials (HTTP {status})")]
    Auth { status: u16 },

    #[error("container `{container_id}` not found on page {page_id}")]
    ContainerNotFound {
        page_id: String,
        container_id: String,
    },

    #[error("publish: {0}")]
    Publish(String),
}

impl UpdaterError {
    /// Pipeline stage this error belongs to, as it appears in the logs.
    pub fn stage(&self) -> &'static str {
        match self {
            UpdaterError::Config(_) => "config",
            UpdaterError::NoContent { .. } => "fetch",
            UpdaterError::Summarization(_) => "summarize",
            UpdaterError::Template(_) => "render",
            UpdaterError::Auth { .. }
            | UpdaterError::ContainerNotFound { .. }
            | UpdaterError::Publish(_) => "publish",
        }
    }

    /// Process exit code reported to the scheduler. Never zero.
    pub fn exit_code(&self) -> u8 {
        match self {
            UpdaterError::Config(_) => 2,
            UpdaterError::NoContent { .. } => 3,
            UpdaterError::Summarization(_) => 4,
            UpdaterError::Template(_) => 5,
            UpdaterError::Auth { .. } => 6,
            UpdaterError::ContainerNotFound { .. } => 7,
            UpdaterError::Publish(_) => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let errors = [
            UpdaterError::Config(ConfigError::NoSources),
            UpdaterError::NoContent { failed: 1, empty: 0 },
            UpdaterError::Summarization(SummarizationError::Empty),
            UpdaterError::Template("missing".into()),
            UpdaterError::Auth { status: 401 },
            UpdaterError::ContainerNotFound {
                page_id: "42".into(),
                container_id: "weekly".into(),
            },
            UpdaterError::Publish("boom".into()),
        ];
        let mut codes: Vec<u8> = errors.iter().map(|e| e.exit_code()).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn stage_names_the_failing_component() {
        assert_eq!(UpdaterError::NoContent { failed: 2, empty: 0 }.stage(), "fetch");
        assert_eq!(UpdaterError::Auth { status: 403 }.stage(), "publish");
        assert_eq!(
            UpdaterError::Summarization(SummarizationError::RateLimited).stage(),
            "summarize"
        );
    }

    #[test]
    fn container_error_message_names_page_and_container() {
        let e = UpdaterError::ContainerNotFound {
            page_id: "42".into(),
            container_id: "weekly-updates".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("weekly-updates"));
        assert!(msg.contains("42"));
    }
}
