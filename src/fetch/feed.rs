//! RSS 2.0, RSS 1.0 (RDF) and Atom parsing into [`FetchedItem`]s.
//!
//! Parsing is deliberately lenient: items without a usable date are kept
//! with `published_at = None` here and dropped later by the window filter.

use crate::models::FetchedItem;
use crate::utils::html_to_text;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;

// Atom text constructs of `type="xhtml"` carry child elements, not text.
static XHTML_CONSTRUCT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<(content|summary)(\s[^>]*type\s*=\s*["']xhtml["'][^>]*)>(.*?)</(?:content|summary)\s*>"#)
        .expect("xhtml construct regex")
});

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RdfRoot {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<TextNode>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    // `dc:date` and `content:encoded`; elements are matched by local name.
    #[serde(rename = "date")]
    dc_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "encoded")]
    content_encoded: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

// Element whose attributes we do not care about.
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

/// An item before filtering; the date may be missing or unparseable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub published_at: Option<DateTime<Utc>>,
    pub title: String,
    pub content: String,
    pub url: String,
}

impl RawItem {
    pub fn into_fetched(self, source_id: &str, published_at: DateTime<Utc>) -> FetchedItem {
        FetchedItem {
            source_id: source_id.to_string(),
            published_at,
            title: self.title,
            content: self.content,
            url: self.url,
        }
    }
}

/// Parse a feed document. The format is detected from the root element.
pub fn parse_feed(body: &str) -> Result<Vec<RawItem>, String> {
    let xml = scrub_html_entities_for_xml(body);
    let head = root_element_name(&xml).ok_or_else(|| "no root element".to_string())?;

    match head.as_str() {
        "rss" => {
            let rss: Rss = from_str(&xml).map_err(|e| format!("rss: {e}"))?;
            Ok(rss.channel.items.into_iter().map(rss_item).collect())
        }
        "rdf:RDF" | "RDF" => {
            let rdf: RdfRoot = from_str(&xml).map_err(|e| format!("rdf: {e}"))?;
            Ok(rdf.items.into_iter().map(rss_item).collect())
        }
        "feed" => {
            let xml = wrap_xhtml_constructs(&xml);
            let feed: AtomFeed = from_str(&xml).map_err(|e| format!("atom: {e}"))?;
            Ok(feed.entries.into_iter().map(atom_entry).collect())
        }
        other => Err(format!("unsupported root element <{other}>")),
    }
}

fn rss_item(it: RssItem) -> RawItem {
    let published_at = it
        .pub_date
        .as_deref()
        .or(it.dc_date.as_deref())
        .and_then(parse_date);
    let body = it
        .content_encoded
        .filter(|c| !c.trim().is_empty())
        .or(it.description)
        .unwrap_or_default();
    let url = it
        .link
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .or_else(|| {
            it.guid
                .map(|g| g.value.trim().to_string())
                .filter(|g| g.starts_with("http"))
        })
        .unwrap_or_default();

    RawItem {
        published_at,
        title: html_to_text(it.title.as_deref().unwrap_or_default()),
        content: html_to_text(&body),
        url,
    }
}

fn atom_entry(e: AtomEntry) -> RawItem {
    let published_at = e
        .published
        .as_deref()
        .or(e.updated.as_deref())
        .and_then(parse_date);
    let url = e
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or(e.links.first())
        .and_then(|l| l.href.clone())
        .unwrap_or_default();
    let body = e
        .content
        .map(|c| c.value)
        .filter(|c| !c.trim().is_empty())
        .or(e.summary.map(|s| s.value))
        .unwrap_or_default();

    RawItem {
        published_at,
        title: html_to_text(&e.title.map(|t| t.value).unwrap_or_default()),
        content: html_to_text(&body),
        url: url.trim().to_string(),
    }
}

/// Accepts RFC 2822 (RSS) and RFC 3339 (Atom, Dublin Core) timestamps.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn root_element_name(xml: &str) -> Option<String> {
    let mut rest = xml;
    loop {
        let start = rest.find('<')?;
        rest = &rest[start + 1..];
        // Skip the prolog, comments and doctype.
        if rest.starts_with('?') || rest.starts_with('!') {
            continue;
        }
        let end = rest.find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;
        return Some(rest[..end].to_string());
    }
}

/// Turn inline XHTML content into CDATA so it deserializes as text.
fn wrap_xhtml_constructs(xml: &str) -> String {
    XHTML_CONSTRUCT
        .replace_all(xml, |caps: &regex::Captures<'_>| {
            format!(
                "<{tag}{attrs}><![CDATA[{body}]]></{tag}>",
                tag = &caps[1],
                attrs = &caps[2],
                body = caps[3].replace("]]>", "]]]]><![CDATA[>")
            )
        })
        .into_owned()
}

// HTML entities that are not predefined in XML show up in real feeds.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
