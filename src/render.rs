//! HTML rendering of the summaries into the template's container.
//!
//! Model output is untrusted: every piece of it is escaped before it lands
//! in markup. The only structure recognized in the text is blank-line
//! separated paragraphs and `- ` / `* ` bullet lines.
//!
//! Rendering is a pure function of its inputs; the same template, summaries
//! and date always give the same bytes.

use crate::container::{ContainerError, find_container, replace_container};
use crate::error::UpdaterError;
use crate::models::{EventsSpec, RenderedFragment, SummaryResult, SummaryScope, UpcomingEvent};
use crate::utils::ch_date_str;
use chrono::NaiveDate;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::path::Path;
use tracing::{debug, info, instrument};

const CSS: &str = "<style>\n\
.weekly-update{line-height:1.55}\n\
.weekly-update .meta{color:#666;margin-bottom:.8rem}\n\
.weekly-update h2{margin:1.3rem 0 .5rem}\n\
.weekly-update ul{margin:.5rem 0 1rem 1.2rem}\n\
.weekly-update li{margin:.35rem 0}\n\
.weekly-update .weekly-footer{font-size:.9rem;color:#555;border-top:1px solid #e6e6e6;padding-top:.6rem;margin-top:1rem}\n\
</style>";

/// Everything on the page besides the summaries.
#[derive(Debug, Clone, Copy)]
pub struct PageMeta<'a> {
    pub heading: &'a str,
    /// Printed as the "as of" line.
    pub date: NaiveDate,
    pub events: Option<(&'a EventsSpec, &'a [UpcomingEvent])>,
    pub footer: Option<&'a str>,
}

impl<'a> PageMeta<'a> {
    pub fn new(heading: &'a str, date: NaiveDate) -> Self {
        Self {
            heading,
            date,
            events: None,
            footer: None,
        }
    }
}

/// Output of the render stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// The template with its container filled, for previews.
    pub page: String,
    /// What the publisher writes into the live container.
    pub fragment: RenderedFragment,
}

/// Read the template file.
pub fn load_template(path: &Path) -> Result<String, UpdaterError> {
    std::fs::read_to_string(path)
        .map_err(|e| UpdaterError::Template(format!("reading {}: {e}", path.display())))
}

fn template_error(e: ContainerError) -> UpdaterError {
    UpdaterError::Template(e.to_string())
}

/// Fill the template's container with the rendered summaries.
#[instrument(level = "info", skip_all, fields(container = %container_id, summaries = summaries.len()))]
pub fn render(
    template: &str,
    container_id: &str,
    summaries: &[SummaryResult],
    meta: &PageMeta<'_>,
) -> Result<Rendered, UpdaterError> {
    // Check the marker before doing any work.
    find_container(template, container_id).map_err(template_error)?;
    if summaries.is_empty() {
        return Err(UpdaterError::Template("no summaries to render".to_string()));
    }

    let inner = render_fragment(summaries, meta);
    let page = replace_container(template, container_id, &inner).map_err(template_error)?;
    info!(bytes = inner.len(), "Rendered fragment");

    Ok(Rendered {
        page,
        fragment: RenderedFragment {
            container_id: container_id.to_string(),
            html: inner,
        },
    })
}

/// Inner HTML for the container.
pub fn render_fragment(summaries: &[SummaryResult], meta: &PageMeta<'_>) -> String {
    let mut parts = vec![
        CSS.to_string(),
        "<div class=\"weekly-update\">".to_string(),
        format!("<h1>{}</h1>", encode_text(meta.heading)),
        format!(
            "<div class=\"meta\"><time datetime=\"{}\">{}</time></div>",
            meta.date.format("%Y-%m-%d"),
            ch_date_str(meta.date)
        ),
    ];

    for summary in summaries {
        match &summary.scope {
            SummaryScope::Source(id) => {
                parts.push(format!(
                    "<section class=\"weekly-source\" data-source=\"{}\">",
                    encode_double_quoted_attribute(id)
                ));
                parts.push(format!("<h2>{}</h2>", encode_text(id)));
            }
            SummaryScope::Aggregate => {
                parts.push("<section class=\"weekly-source\">".to_string());
            }
        }
        parts.extend(text_to_html(&summary.text));
        parts.push("</section>".to_string());
        debug!(scope = %summary.scope, generated_at = %summary.generated_at, "Rendered section");
    }

    if let Some((spec, events)) = meta.events {
        parts.extend(events_section(spec, events));
    }
    if let Some(footer) = meta.footer {
        parts.push(format!(
            "<div class=\"weekly-footer\">{}</div>",
            encode_text(footer)
        ));
    }

    parts.push("</div>".to_string());
    parts.join("\n")
}

fn events_section(spec: &EventsSpec, events: &[UpcomingEvent]) -> Vec<String> {
    let mut out = vec![
        "<section class=\"weekly-events\">".to_string(),
        format!("<h2>{}</h2>", encode_text(&spec.heading)),
        "<ul>".to_string(),
    ];
    if events.is_empty() {
        out.push(format!("<li>{}</li>", encode_text(&spec.empty_text)));
    }
    for event in events.iter().take(spec.count) {
        out.push(format!(
            "<li><strong>{}</strong> {} (<a href=\"{}\" target=\"_blank\" rel=\"noopener\">Link</a>)</li>",
            ch_date_str(event.date),
            encode_text(&event.title),
            encode_double_quoted_attribute(&event.url)
        ));
    }
    out.push("</ul>".to_string());
    out.push("</section>".to_string());
    out
}

fn bullet(line: &str) -> Option<&str> {
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
}

/// Escape model text and give it paragraph and list structure.
pub fn text_to_html(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut list: Vec<&str> = Vec::new();

    fn flush_paragraph(out: &mut Vec<String>, paragraph: &mut Vec<&str>) {
        if !paragraph.is_empty() {
            out.push(format!("<p>{}</p>", encode_text(&paragraph.join(" "))));
            paragraph.clear();
        }
    }
    fn flush_list(out: &mut Vec<String>, list: &mut Vec<&str>) {
        if !list.is_empty() {
            out.push("<ul>".to_string());
            for item in list.iter() {
                out.push(format!("<li>{}</li>", encode_text(item)));
            }
            out.push("</ul>".to_string());
            list.clear();
        }
    }

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            flush_paragraph(&mut out, &mut paragraph);
            flush_list(&mut out, &mut list);
        } else if let Some(item) = bullet(line) {
            flush_paragraph(&mut out, &mut paragraph);
            let item = item.trim();
            if !item.is_empty() {
                list.push(item);
            }
        } else {
            flush_list(&mut out, &mut list);
            paragraph.push(line);
        }
    }
    flush_paragraph(&mut out, &mut paragraph);
    flush_list(&mut out, &mut list);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const TEMPLATE: &str = "<html><body>\n<h1>Site</h1>\n<div id=\"weekly\">placeholder</div>\n<footer>f</footer>\n</body></html>";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn summary(scope: SummaryScope, text: &str) -> SummaryResult {
        SummaryResult {
            scope,
            text: text.into(),
            generated_at: Utc.with_ymd_and_hms(2026, 10, 17, 6, 0, 0).unwrap(),
        }
    }

    #[test]
    fn rendering_is_idempotent() {
        let s = vec![
            summary(SummaryScope::Source("finma".into()), "- a\n- b"),
            summary(SummaryScope::Source("seco".into()), "Para one.\n\nPara two."),
        ];
        let first = render(TEMPLATE, "weekly", &s, &PageMeta::new("Weekly", date())).unwrap();
        let second = render(TEMPLATE, "weekly", &s, &PageMeta::new("Weekly", date())).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.page.as_bytes(), second.page.as_bytes());
    }

    #[test]
    fn missing_marker_is_template_error() {
        let s = vec![summary(SummaryScope::Aggregate, "x")];
        let err = render("<div id=\"other\"></div>", "weekly", &s, &PageMeta::new("W", date())).unwrap_err();
        assert!(matches!(err, UpdaterError::Template(_)));
    }

    #[test]
    fn marker_in_different_case_is_template_error() {
        let s = vec![summary(SummaryScope::Aggregate, "x")];
        let err = render("<div id=\"Weekly\"></div>", "weekly", &s, &PageMeta::new("W", date())).unwrap_err();
        assert!(matches!(err, UpdaterError::Template(_)));
    }

    #[test]
    fn fragment_replaces_only_container_content() {
        let s = vec![summary(SummaryScope::Aggregate, "Hello")];
        let r = render(TEMPLATE, "weekly", &s, &PageMeta::new("Weekly", date())).unwrap();
        assert_eq!(r.fragment.container_id, "weekly");
        let expected = TEMPLATE.replace("placeholder", &r.fragment.html);
        assert_eq!(r.page, expected);
        assert!(r.fragment.html.contains("17. Oktober 2026"));
    }

    #[test]
    fn untrusted_text_is_escaped() {
        let s = vec![summary(
            SummaryScope::Source("<b>id</b>".into()),
            "</div><script>alert(1)</script>\n- A & B <i>",
        )];
        let html = render_fragment(&s, &PageMeta::new("Weekly <News>", date()));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("</div><script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<li>A &amp; B &lt;i&gt;</li>"));
        assert!(html.contains("<h1>Weekly &lt;News&gt;</h1>"));
        assert!(html.contains("<h2>&lt;b&gt;id&lt;/b&gt;</h2>"));
        // The escaped fragment still splices cleanly into a page.
        let page = replace_container(TEMPLATE, "weekly", &html).unwrap();
        assert_eq!(find_container(&page, "weekly").unwrap().len(), html.len());
    }

    #[test]
    fn sections_follow_summary_order() {
        let s = vec![
            summary(SummaryScope::Source("b-first".into()), "x"),
            summary(SummaryScope::Source("a-second".into()), "y"),
        ];
        let html = render_fragment(&s, &PageMeta::new("W", date()));
        let b = html.find("data-source=\"b-first\"").unwrap();
        let a = html.find("data-source=\"a-second\"").unwrap();
        assert!(b < a);
    }

    fn events_spec() -> EventsSpec {
        EventsSpec {
            url: "https://iguv.example/event/".into(),
            count: 2,
            heading: "Nächste Events".into(),
            empty_text: "Derzeit keine kommenden Termine.".into(),
        }
    }

    #[test]
    fn events_block_and_footer_follow_summaries() {
        let s = vec![summary(SummaryScope::Source("finma".into()), "- a")];
        let spec = events_spec();
        let events = vec![
            UpcomingEvent {
                date: NaiveDate::from_ymd_opt(2026, 11, 5).unwrap(),
                title: "Forum <Bern> & Apéro".into(),
                url: "https://iguv.example/event/forum?a=1&b=\"2\"".into(),
            },
            UpcomingEvent {
                date: NaiveDate::from_ymd_opt(2026, 11, 12).unwrap(),
                title: "AGM".into(),
                url: "https://iguv.example/event/agm/".into(),
            },
        ];
        let meta = PageMeta {
            events: Some((&spec, events.as_slice())),
            footer: Some("Originals <prevail>."),
            ..PageMeta::new("W", date())
        };
        let html = render_fragment(&s, &meta);

        assert!(html.contains("<h2>Nächste Events</h2>"));
        assert!(html.contains("<strong>5. November 2026</strong> Forum &lt;Bern&gt; &amp; Apéro"));
        assert!(html.contains("href=\"https://iguv.example/event/forum?a=1&amp;b=&quot;2&quot;\""));
        assert!(html.contains("<div class=\"weekly-footer\">Originals &lt;prevail&gt;.</div>"));
        let summary_at = html.find("data-source=\"finma\"").unwrap();
        let events_at = html.find("weekly-events").unwrap();
        let footer_at = html.find("<div class=\"weekly-footer\">").unwrap();
        assert!(summary_at < events_at && events_at < footer_at);
        assert!(!html.contains("Derzeit keine"));
    }

    #[test]
    fn empty_events_show_fallback_line() {
        let s = vec![summary(SummaryScope::Aggregate, "x")];
        let spec = events_spec();
        let none: Vec<UpcomingEvent> = Vec::new();
        let meta = PageMeta {
            events: Some((&spec, none.as_slice())),
            ..PageMeta::new("W", date())
        };
        let html = render_fragment(&s, &meta);
        assert!(html.contains("<ul>\n<li>Derzeit keine kommenden Termine.</li>\n</ul>"));
        assert!(!html.contains("weekly-footer\">"));
    }

    #[test]
    fn text_structure() {
        let parts = text_to_html("Intro line\ncontinues.\n\n- one\n* two\n\nOutro");
        assert_eq!(
            parts,
            vec![
                "<p>Intro line continues.</p>",
                "<ul>",
                "<li>one</li>",
                "<li>two</li>",
                "</ul>",
                "<p>Outro</p>",
            ]
        );
    }
}
