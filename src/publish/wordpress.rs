//! WordPress REST API access with application-password authentication.
//!
//! - [`WordPressStore`]: `wp/v2/pages` read (edit context, raw content) and
//!   write, used by [`super::PagePublisher`]
//! - [`EndpointPublisher`]: a single POST to a plugin route that performs
//!   the container replacement on the server

use super::{Page, PageStore, Publish};
use crate::error::UpdaterError;
use crate::models::{PublishTarget, RenderedFragment};
use crate::utils::truncate_for_log;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument, warn};

fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("weekly_updater/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

fn transport_error(action: &str, e: reqwest::Error) -> UpdaterError {
    if e.is_timeout() {
        UpdaterError::Publish(format!("{action}: request timed out"))
    } else {
        UpdaterError::Publish(format!("{action}: {e}"))
    }
}

/// Turn a non-success response into an error; auth failures get their own kind.
async fn reject(action: &str, resp: Response) -> UpdaterError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    warn!(action, status = status.as_u16(), body = %truncate_for_log(&body, 300), "CMS request rejected");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UpdaterError::Auth {
            status: status.as_u16(),
        },
        _ => UpdaterError::Publish(format!(
            "{action}: HTTP {}: {}",
            status.as_u16(),
            truncate_for_log(&body, 300)
        )),
    }
}

#[derive(Deserialize)]
struct WpPage {
    content: WpContent,
}

#[derive(Deserialize)]
struct WpContent {
    raw: Option<String>,
}

/// Pages API client.
#[derive(Debug, Clone)]
pub struct WordPressStore {
    http: Client,
    base_url: String,
    username: String,
    app_password: String,
}

impl WordPressStore {
    pub fn new(target: &PublishTarget, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: target.base_url.clone(),
            username: target.username.clone(),
            app_password: target.app_password.clone(),
        })
    }

    fn page_url(&self, page_id: &str) -> String {
        format!("{}/wp-json/wp/v2/pages/{}", self.base_url, page_id)
    }
}

impl PageStore for WordPressStore {
    #[instrument(level = "info", skip(self))]
    async fn fetch_page(&self, page_id: &str) -> Result<Page, UpdaterError> {
        let resp = self
            .http
            .get(self.page_url(page_id))
            .query(&[("context", "edit")])
            .basic_auth(&self.username, Some(&self.app_password))
            .send()
            .await
            .map_err(|e| transport_error("fetch page", e))?;

        if !resp.status().is_success() {
            return Err(reject("fetch page", resp).await);
        }

        let page: WpPage = resp
            .json()
            .await
            .map_err(|e| UpdaterError::Publish(format!("fetch page: malformed body: {e}")))?;
        let html = page.content.raw.ok_or_else(|| {
            UpdaterError::Publish("fetch page: no raw content (edit context refused?)".to_string())
        })?;

        Ok(Page {
            id: page_id.to_string(),
            html,
        })
    }

    #[instrument(level = "info", skip(self, html), fields(bytes = html.len()))]
    async fn write_page(&self, page_id: &str, html: &str) -> Result<(), UpdaterError> {
        let resp = self
            .http
            .post(self.page_url(page_id))
            .basic_auth(&self.username, Some(&self.app_password))
            .json(&json!({ "content": html }))
            .send()
            .await
            .map_err(|e| transport_error("write page", e))?;

        if !resp.status().is_success() {
            return Err(reject("write page", resp).await);
        }
        info!("Page written");
        Ok(())
    }
}

/// Publisher for a plugin route that replaces the container server side.
///
/// The route receives `{"page_id", "container", "html"}`. A 404 whose body
/// mentions the container means the live page lacks it.
#[derive(Debug, Clone)]
pub struct EndpointPublisher {
    http: Client,
    url: String,
    page_id: String,
    username: String,
    app_password: String,
}

impl EndpointPublisher {
    pub fn new(target: &PublishTarget, route: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: http_client(timeout)?,
            url: format!("{}/wp-json/{}", target.base_url, route),
            page_id: target.page_id.clone(),
            username: target.username.clone(),
            app_password: target.app_password.clone(),
        })
    }
}

impl Publish for EndpointPublisher {
    #[instrument(level = "info", skip_all, fields(url = %self.url, container = %fragment.container_id))]
    async fn publish(&self, fragment: &RenderedFragment) -> Result<(), UpdaterError> {
        let resp = self
            .http
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.app_password))
            .json(&json!({
                "page_id": self.page_id,
                "container": fragment.container_id,
                "html": fragment.html.trim(),
            }))
            .send()
            .await
            .map_err(|e| transport_error("post fragment", e))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            let body = resp.text().await.unwrap_or_default();
            if body.to_lowercase().contains("container") {
                return Err(UpdaterError::ContainerNotFound {
                    page_id: self.page_id.clone(),
                    container_id: fragment.container_id.clone(),
                });
            }
            return Err(UpdaterError::Publish(format!(
                "post fragment: HTTP 404: {}",
                truncate_for_log(&body, 300)
            )));
        }
        if !status.is_success() {
            return Err(reject("post fragment", resp).await);
        }
        info!(status = status.as_u16(), "Fragment accepted by endpoint");
        Ok(())
    }
}
