//! Writing the rendered fragment into the live CMS page.
//!
//! Two ways in:
//!
//! | Mode | Type | How |
//! |------|------|-----|
//! | `page` | [`PagePublisher`] over [`wordpress::WordPressStore`] | read page, splice container, write page |
//! | `endpoint` | [`wordpress::EndpointPublisher`] | POST the fragment, the plugin splices server side |
//! | `--dry-run` | [`DryRun`] | nothing is written; `main` prints a preview |
//!
//! There is no locking and no retry. Runs are weekly and single; a failed
//! publish is reported and the scheduler may re-run the whole job.

pub mod wordpress;

use crate::container::{ContainerError, replace_container};
use crate::error::UpdaterError;
use crate::models::RenderedFragment;
use tracing::{debug, info, instrument};

/// Something that can put a fragment into its container on the live site.
pub trait Publish {
    async fn publish(&self, fragment: &RenderedFragment) -> Result<(), UpdaterError>;
}

/// A page as stored by the CMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: String,
    pub html: String,
}

/// Read/write access to whole pages.
pub trait PageStore {
    async fn fetch_page(&self, page_id: &str) -> Result<Page, UpdaterError>;
    async fn write_page(&self, page_id: &str, html: &str) -> Result<(), UpdaterError>;
}

/// Read-modify-write publisher over any [`PageStore`].
#[derive(Debug)]
pub struct PagePublisher<S> {
    store: S,
    page_id: String,
}

impl<S: PageStore> PagePublisher<S> {
    pub fn new(store: S, page_id: impl Into<String>) -> Self {
        Self {
            store,
            page_id: page_id.into(),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: PageStore> Publish for PagePublisher<S> {
    #[instrument(level = "info", skip_all, fields(page = %self.page_id, container = %fragment.container_id))]
    async fn publish(&self, fragment: &RenderedFragment) -> Result<(), UpdaterError> {
        let page = self.store.fetch_page(&self.page_id).await?;
        debug!(page = %page.id, bytes = page.html.len(), "Fetched live page");
        let updated = replace_container(&page.html, &fragment.container_id, &fragment.html)
            .map_err(|e| match e {
                ContainerError::NotFound(container_id) => UpdaterError::ContainerNotFound {
                    page_id: self.page_id.clone(),
                    container_id,
                },
                other => UpdaterError::Publish(format!("live page {}: {other}", self.page_id)),
            })?;

        if updated == page.html {
            info!("Container already up to date; nothing to write");
            return Ok(());
        }

        self.store.write_page(&self.page_id, &updated).await?;
        info!(bytes = fragment.html.len(), "Container updated");
        Ok(())
    }
}

/// Accepts the fragment without contacting the CMS.
#[derive(Debug, Default)]
pub struct DryRun;

impl Publish for DryRun {
    async fn publish(&self, fragment: &RenderedFragment) -> Result<(), UpdaterError> {
        info!(
            container = %fragment.container_id,
            bytes = fragment.html.len(),
            "Dry run; skipping publish"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// In-memory [`PageStore`] holding a single page.
    pub(crate) struct MemoryStore {
        pub html: RefCell<String>,
        pub writes: RefCell<usize>,
    }

    impl MemoryStore {
        pub(crate) fn new(html: &str) -> Self {
            Self {
                html: RefCell::new(html.to_string()),
                writes: RefCell::new(0),
            }
        }
    }

    impl PageStore for MemoryStore {
        async fn fetch_page(&self, page_id: &str) -> Result<Page, UpdaterError> {
            Ok(Page {
                id: page_id.to_string(),
                html: self.html.borrow().clone(),
            })
        }

        async fn write_page(&self, _page_id: &str, html: &str) -> Result<(), UpdaterError> {
            *self.html.borrow_mut() = html.to_string();
            *self.writes.borrow_mut() += 1;
            Ok(())
        }
    }

    const LIVE: &str = "<p class=\"intro\">Welcome &amp; hello</p>\n\
<div id=\"weekly\"><ul><li>last week</li></ul></div>\n\
<div id=\"events\">  Sibling   content, odd   spacing  </div>";

    fn fragment(html: &str) -> RenderedFragment {
        RenderedFragment {
            container_id: "weekly".into(),
            html: html.into(),
        }
    }

    #[tokio::test]
    async fn siblings_are_preserved_byte_for_byte() {
        let publisher = PagePublisher::new(MemoryStore::new(LIVE), "42");
        publisher.publish(&fragment("<p>this week</p>")).await.unwrap();

        let after = publisher.store().html.borrow().clone();
        let (before_prefix, _) = LIVE.split_once("<ul>").unwrap();
        let (_, before_suffix) = LIVE.split_once("</ul>").unwrap();
        assert!(after.starts_with(before_prefix));
        assert!(after.ends_with(before_suffix));
        assert_eq!(
            after,
            format!("{before_prefix}<p>this week</p>{before_suffix}")
        );
        assert_eq!(*publisher.store().writes.borrow(), 1);
    }

    #[tokio::test]
    async fn missing_container_is_reported_and_nothing_written() {
        let store = MemoryStore::new("<div id=\"other\">x</div>");
        let publisher = PagePublisher::new(store, "42");
        let err = publisher.publish(&fragment("<p>x</p>")).await.unwrap_err();
        assert!(matches!(
            err,
            UpdaterError::ContainerNotFound { ref container_id, .. } if container_id == "weekly"
        ));
        assert_eq!(*publisher.store().writes.borrow(), 0);
    }

    #[tokio::test]
    async fn unchanged_container_skips_write() {
        let publisher = PagePublisher::new(MemoryStore::new(LIVE), "42");
        publisher
            .publish(&fragment("<ul><li>last week</li></ul>"))
            .await
            .unwrap();
        assert_eq!(*publisher.store().writes.borrow(), 0);
    }
}
