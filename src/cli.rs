//! Command-line interface definitions for the weekly updater.
//!
//! Every secret can be passed as a flag but is normally supplied by the
//! scheduler's environment; see the `env` names below.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for one update run.
///
/// # Examples
///
/// ```sh
/// # Typical scheduled run, secrets in the environment
/// weekly_updater --sources sources.yaml --template template.html
///
/// # Render only, print the filled template instead of publishing
/// weekly_updater -s sources.yaml -t template.html --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// YAML file listing the sources
    #[arg(short, long, env = "UPDATER_SOURCES", default_value = "sources.yaml")]
    pub sources: PathBuf,

    /// HTML template containing the container element
    #[arg(short, long, env = "UPDATER_TEMPLATE", default_value = "template.html")]
    pub template: PathBuf,

    /// Render and print the filled template without touching the CMS
    #[arg(long)]
    pub dry_run: bool,

    /// API key for the summarization endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Model name sent with every generation request
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Timeout for a single generation request, in seconds
    #[arg(long = "openai-timeout", env = "OPENAI_REQUEST_TIMEOUT_S", default_value_t = 120)]
    pub openai_timeout_secs: u64,

    /// Timeout for feed and CMS requests, in seconds
    #[arg(long = "http-timeout", env = "HTTP_TIMEOUT_S", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// WordPress site root, e.g. https://example.org
    #[arg(long, env = "WP_BASE")]
    pub wp_base: Option<String>,

    /// WordPress user owning the application password
    #[arg(long, env = "WP_USERNAME")]
    pub wp_username: Option<String>,

    /// WordPress application password
    #[arg(long, env = "WP_APP_PASSWORD", hide_env_values = true)]
    pub wp_app_password: Option<String>,

    /// Numeric id of the page holding the container
    #[arg(long, env = "WP_PAGE_ID")]
    pub wp_page_id: Option<String>,

    /// `id` attribute of the container element
    #[arg(long, env = "WP_CONTAINER_ID")]
    pub wp_container_id: Option<String>,

    /// How the fragment is written to the CMS
    #[arg(long, env = "PUBLISH_MODE", value_enum, default_value_t = PublishModeArg::Page)]
    pub publish_mode: PublishModeArg,

    /// REST route used by `--publish-mode endpoint`, relative to /wp-json/
    #[arg(long, env = "ENDPOINT_ROUTE", default_value = "updater/v1/container")]
    pub endpoint_route: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishModeArg {
    /// Read-modify-write through the pages API
    Page,
    /// POST the fragment to a plugin route
    Endpoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "weekly_updater",
            "--sources",
            "./sources.yaml",
            "--template",
            "./template.html",
            "--dry-run",
        ]);

        assert_eq!(cli.sources, PathBuf::from("./sources.yaml"));
        assert_eq!(cli.template, PathBuf::from("./template.html"));
        assert!(cli.dry_run);
    }

    #[test]
    fn test_cli_short_flags_and_mode() {
        let cli = Cli::parse_from([
            "weekly_updater",
            "-s",
            "/tmp/s.yaml",
            "-t",
            "/tmp/t.html",
            "--publish-mode",
            "endpoint",
            "--openai-timeout",
            "600",
        ]);

        assert_eq!(cli.sources, PathBuf::from("/tmp/s.yaml"));
        assert_eq!(cli.publish_mode, PublishModeArg::Endpoint);
        assert_eq!(cli.openai_timeout_secs, 600);
    }
}
