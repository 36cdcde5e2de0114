//! Upcoming events scraped from a listing page.
//!
//! Any link whose text contains a `d.m.yyyy` date counts as an event. Past
//! dates are dropped, the rest sorted ascending and capped. A page that
//! cannot be fetched yields no events; the renderer then shows the fallback
//! line instead of failing the run.

use super::FetchRaw;
use crate::models::{EventsSpec, UpcomingEvent};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{info, instrument, warn};
use url::Url;

const MAX_TITLE_CHARS: usize = 200;

static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").expect("event date regex"));

fn date_in(text: &str) -> Option<NaiveDate> {
    let caps = DATE.captures(text)?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Extract events dated `today` or later from an HTML page.
pub fn parse_events(html: &str, page_url: &str, today: NaiveDate, count: usize) -> Vec<UpcomingEvent> {
    let Ok(links) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let base = Url::parse(page_url).ok();
    let doc = Html::parse_document(html);

    let mut events: Vec<UpcomingEvent> = doc
        .select(&links)
        .filter_map(|a| {
            let text = a.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            let date = date_in(&text).filter(|d| *d >= today)?;
            let href = a.value().attr("href")?;
            let url = match &base {
                Some(base) => base.join(href).ok()?,
                None => Url::parse(href).ok()?,
            };
            if !matches!(url.scheme(), "http" | "https") {
                return None;
            }
            Some(UpcomingEvent {
                date,
                title: text.chars().take(MAX_TITLE_CHARS).collect(),
                url: url.to_string(),
            })
        })
        .collect();

    events.sort_by_key(|e| e.date);
    events.truncate(count);
    events
}

/// Fetch the events page and return at most `spec.count` upcoming events.
#[instrument(level = "info", skip_all, fields(url = %spec.url))]
pub async fn fetch_events<F: FetchRaw>(fetcher: &F, spec: &EventsSpec, today: NaiveDate) -> Vec<UpcomingEvent> {
    match fetcher.fetch_raw(&spec.url).await {
        Ok(body) => {
            let events = parse_events(&body, &spec.url, today, spec.count);
            info!(count = events.len(), "Collected upcoming events");
            events
        }
        Err(e) => {
            warn!(error = %e, "Events page unavailable; rendering fallback");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::FakeFetcher;
    use std::collections::HashMap;

    const PAGE: &str = r#"<html><body>
<ul class="events">
  <li><a href="/event/agm/">Generalversammlung   12.11.2026</a></li>
  <li><a href="/event/old/">Lunch 3.9.2026</a></li>
  <li><a href="https://partner.example/forum">Forum 5.11.2026 Bern</a></li>
  <li><a href="/event/today/">Workshop 17.10.2026</a></li>
  <li><a href="/event/bad/">Broken 31.02.2027</a></li>
  <li><a href="javascript:alert(1)">Trap 1.12.2026</a></li>
  <li><a href="/about/">About us</a></li>
  <li><a href="/event/late/">Apéro 4.1.2027</a></li>
</ul></body></html>"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn keeps_upcoming_dates_sorted_and_capped() {
        let events = parse_events(PAGE, "https://iguv.example/event/", today(), 3);
        let dates: Vec<String> = events.iter().map(|e| e.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-10-17", "2026-11-05", "2026-11-12"]);
        assert_eq!(events[0].url, "https://iguv.example/event/today/");
        assert_eq!(events[1].url, "https://partner.example/forum");
        assert_eq!(events[2].title, "Generalversammlung 12.11.2026");
    }

    #[test]
    fn invalid_dates_and_non_http_links_are_skipped() {
        let events = parse_events(PAGE, "https://iguv.example/event/", today(), 10);
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| !e.title.contains("Broken")));
        assert!(events.iter().all(|e| e.url.starts_with("http")));
    }

    #[tokio::test]
    async fn unreachable_page_yields_no_events() {
        let spec = EventsSpec {
            url: "https://iguv.example/event/".into(),
            count: 3,
            heading: "Events".into(),
            empty_text: "None".into(),
        };
        let fetcher = FakeFetcher {
            bodies: HashMap::new(),
        };
        assert!(fetch_events(&fetcher, &spec, today()).await.is_empty());

        let fetcher = FakeFetcher {
            bodies: HashMap::from([(spec.url.clone(), PAGE.to_string())]),
        };
        assert_eq!(fetch_events(&fetcher, &spec, today()).await.len(), 3);
    }
}
