//! Lookback window and keyword selection.
//!
//! Keyword policy: a case-insensitive substring test against the item's
//! title and content. An empty keyword list lets every item through. The
//! same policy runs at fetch time for every source of a run.

use super::feed::RawItem;
use crate::models::{FetchedItem, SourceSpec};
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;

/// Inclusive window check: `now - window_days <= published_at <= now`.
pub fn within_window(published_at: DateTime<Utc>, now: DateTime<Utc>, window_days: u32) -> bool {
    let start = now - Duration::days(i64::from(window_days));
    published_at >= start && published_at <= now
}

/// True when `keywords` is empty or any keyword occurs in title or content.
pub fn matches_keywords(title: &str, content: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = format!("{}\n{}", title, content).to_lowercase();
    keywords
        .iter()
        .any(|k| haystack.contains(&k.to_lowercase()))
}

/// Apply window, keywords, de-duplication and the per-source cap.
///
/// Items are returned newest first. Undated items never pass the window.
pub fn select_items(
    raw: Vec<RawItem>,
    spec: &SourceSpec,
    now: DateTime<Utc>,
    max_items: usize,
) -> Vec<FetchedItem> {
    raw.into_iter()
        .filter_map(|item| {
            let published_at = item.published_at?;
            within_window(published_at, now, spec.window_days).then_some((published_at, item))
        })
        .filter(|(_, item)| matches_keywords(&item.title, &item.content, &spec.keywords))
        .unique_by(|(_, item)| {
            if item.url.is_empty() {
                item.title.clone()
            } else {
                item.url.clone()
            }
        })
        .sorted_by(|a, b| b.0.cmp(&a.0))
        .take(max_items)
        .map(|(published_at, item)| item.into_fetched(&spec.id, published_at))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 6, 0, 0).unwrap()
    }

    fn spec(window_days: u32, keywords: &[&str]) -> SourceSpec {
        SourceSpec {
            id: "src".into(),
            url: "https://feed.example/rss".into(),
            window_days,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            style: String::new(),
        }
    }

    fn raw(days_ago: i64, title: &str, url: &str) -> RawItem {
        RawItem {
            published_at: Some(now() - Duration::days(days_ago)),
            title: title.into(),
            content: format!("{title} body"),
            url: url.into(),
        }
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let n = now();
        assert!(within_window(n, n, 1));
        assert!(within_window(n - Duration::days(7), n, 7));
        assert!(!within_window(n - Duration::days(7) - Duration::seconds(1), n, 7));
        assert!(!within_window(n + Duration::seconds(1), n, 7));
    }

    #[test]
    fn only_in_window_items_survive_for_every_window_size() {
        for window in 1..=30u32 {
            let items: Vec<RawItem> = (0..40)
                .map(|d| raw(d, &format!("item {d}"), &format!("https://x/{d}")))
                .collect();
            let selected = select_items(items, &spec(window, &[]), now(), usize::MAX);
            assert_eq!(selected.len(), window as usize + 1, "window {window}");
            assert!(
                selected
                    .iter()
                    .all(|i| within_window(i.published_at, now(), window))
            );
        }
    }

    #[test]
    fn undated_items_are_dropped() {
        let mut item = raw(0, "undated", "https://x/u");
        item.published_at = None;
        assert!(select_items(vec![item], &spec(7, &[]), now(), 10).is_empty());
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let kws = vec!["SANKTION".to_string()];
        assert!(matches_keywords("Neue Sanktionen gegen", "", &kws));
        assert!(matches_keywords("Title", "the sanktionsliste changed", &kws));
        assert!(!matches_keywords("Rundschreiben", "Eigenmittel", &kws));
    }

    #[test]
    fn empty_keyword_list_passes_everything() {
        assert!(matches_keywords("anything", "at all", &[]));
        let items = vec![raw(1, "a", "https://x/a"), raw(2, "b", "https://x/b")];
        assert_eq!(select_items(items, &spec(7, &[]), now(), 10).len(), 2);
    }

    #[test]
    fn every_selected_item_matches_a_keyword() {
        let items = vec![
            raw(1, "FINMA circular", "https://x/1"),
            raw(1, "Weather report", "https://x/2"),
            raw(2, "OFAC sanctions update", "https://x/3"),
        ];
        let s = spec(7, &["circular", "sanctions"]);
        let selected = select_items(items, &s, now(), 10);
        assert_eq!(selected.len(), 2);
        assert!(
            selected
                .iter()
                .all(|i| matches_keywords(&i.title, &i.content, &s.keywords))
        );
    }

    #[test]
    fn duplicates_removed_sorted_newest_first_and_capped() {
        let items = vec![
            raw(3, "old", "https://x/old"),
            raw(1, "new", "https://x/new"),
            raw(1, "new again", "https://x/new"),
            raw(2, "mid", "https://x/mid"),
        ];
        let selected = select_items(items, &spec(7, &[]), now(), 2);
        let titles: Vec<&str> = selected.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid"]);
        assert!(selected.iter().all(|i| i.source_id == "src"));
    }
}
