//! Locating and replacing a container element by its `id`.
//!
//! Works on the raw markup instead of a parsed DOM so that every byte
//! outside the container's inner content survives unchanged. Attribute
//! names match case-insensitively, the id value matches exactly.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use thiserror::Error;

// Comments and raw-text elements (`script`, `style`, `textarea`) are matched
// whole and carry no capture groups, so their bodies are never read as tags.
static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?s)<!--.*?-->"#,
        r#"|(?i:<script\b[^>]*>.*?</script\s*>)"#,
        r#"|(?i:<style\b[^>]*>.*?</style\s*>)"#,
        r#"|(?i:<textarea\b[^>]*>.*?</textarea\s*>)"#,
        r#"|<(/?)([A-Za-z][A-Za-z0-9:-]*)((?:"[^"]*"|'[^']*'|[^'">])*)>"#,
    ))
    .expect("tag regex")
});

static ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerError {
    #[error("no element with id=\"{0}\"")]
    NotFound(String),

    #[error("{count} elements share id=\"{id}\"")]
    Duplicate { id: String, count: usize },

    #[error("element with id=\"{0}\" is never closed")]
    Unclosed(String),

    #[error("element with id=\"{0}\" is self-closing and cannot hold content")]
    SelfClosing(String),
}

fn id_of(attrs: &str) -> Option<&str> {
    ATTR.captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case("id"))
        .and_then(|caps| {
            if let Some(unquoted) = caps.get(4) {
                return Some(unquoted.as_str().trim_end_matches('/'));
            }
            caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str())
        })
}

/// Byte range of the container's inner content.
pub fn find_container(html: &str, id: &str) -> Result<Range<usize>, ContainerError> {
    let mut opening: Option<(String, usize, bool)> = None;
    let mut count = 0usize;

    for caps in TAG.captures_iter(html) {
        let (Some(name), Some(slash), Some(attrs)) = (caps.get(2), caps.get(1), caps.get(3)) else {
            continue;
        };
        if !slash.as_str().is_empty() || id_of(attrs.as_str()) != Some(id) {
            continue;
        }
        count += 1;
        if opening.is_none() {
            let self_closing = attrs.as_str().trim_end().ends_with('/');
            let end = caps.get(0).map_or(0, |m| m.end());
            opening = Some((name.as_str().to_string(), end, self_closing));
        }
    }

    let (name, inner_start, self_closing) =
        opening.ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
    if count > 1 {
        return Err(ContainerError::Duplicate {
            id: id.to_string(),
            count,
        });
    }
    if self_closing {
        return Err(ContainerError::SelfClosing(id.to_string()));
    }

    let mut depth = 1usize;
    for caps in TAG.captures_iter(&html[inner_start..]) {
        let (Some(tag), Some(slash), Some(attrs)) = (caps.get(2), caps.get(1), caps.get(3)) else {
            continue;
        };
        if !tag.as_str().eq_ignore_ascii_case(&name) {
            continue;
        }
        if slash.as_str().is_empty() {
            if !attrs.as_str().trim_end().ends_with('/') {
                depth += 1;
            }
        } else {
            depth -= 1;
            if depth == 0 {
                let close_start = caps.get(0).map_or(0, |m| m.start());
                return Ok(inner_start..inner_start + close_start);
            }
        }
    }
    Err(ContainerError::Unclosed(id.to_string()))
}

/// Return `html` with the container's inner content replaced by `inner`.
pub fn replace_container(html: &str, id: &str, inner: &str) -> Result<String, ContainerError> {
    let range = find_container(html, id)?;
    let mut out = String::with_capacity(html.len() - range.len() + inner.len());
    out.push_str(&html[..range.start]);
    out.push_str(inner);
    out.push_str(&html[range.end..]);
    Ok(out)
}
