//! Small helpers shared by the pipeline stages.
//!
//! - String truncation for log previews
//! - Swiss-style long dates for the rendered "as of" line
//! - Markup-to-text reduction for feed descriptions

use chrono::{Datelike, NaiveDate};
use scraper::Html;

/// Truncate a string for logging purposes.
///
/// Cuts at the last char boundary at or below `max` bytes and appends the
/// number of bytes dropped.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

const MONTHS_DE: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// Format a date the way Swiss German pages write it: `17. Oktober 2026`.
pub fn ch_date_str(d: NaiveDate) -> String {
    format!("{}. {} {}", d.day(), MONTHS_DE[d.month0() as usize], d.year())
}

/// Reduce an HTML snippet to whitespace-normalized text.
///
/// Feed descriptions routinely carry markup (and sometimes entity-escaped
/// markup); the model only needs the words.
pub fn html_to_text(s: &str) -> String {
    if !s.contains('<') && !s.contains('&') {
        return collapse_whitespace(s);
    }
    let fragment = Html::parse_fragment(s);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
