//! Prompt construction and summary generation.
//!
//! The style directive of each source is copied into the request verbatim,
//! under a fixed `Style directive:` label, and never rewritten. Keywords are
//! repeated as a focus hint even though items were already filtered by them.

use crate::api::{AskAsync, Prompt};
use crate::config::SourcesConfig;
use crate::error::SummarizationError;
use crate::fetch::SourceBatch;
use crate::models::{SummaryMode, SummaryResult, SummaryScope};
use chrono::Utc;
use tracing::{info, instrument};

// Per-item body budget in bytes; long articles are cut at a char boundary.
const MAX_ITEM_CHARS: usize = 1_500;

fn system_prompt(language: &str) -> String {
    format!(
        "You are a precise editor writing a short update for a web page. \
         Write in {language}. Use only the items provided; do not invent facts, dates or links. \
         Output plain text only: separate paragraphs with a blank line and start bullet points with \"- \". \
         Do not use HTML or Markdown headings."
    )
}

fn write_source_block(out: &mut String, batch: &SourceBatch<'_>) {
    let spec = batch.spec;
    out.push_str(&format!("Source: {}\n", spec.id));
    if !spec.style.is_empty() {
        out.push_str(&format!("Style directive:\n{}\n", spec.style));
    }
    if !spec.keywords.is_empty() {
        out.push_str(&format!("Focus keywords: {}\n", spec.keywords.join(", ")));
    }
    out.push_str(&format!("Items ({}):\n", batch.items.len()));
    for (i, item) in batch.items.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}] {}\n",
            i + 1,
            item.published_at.format("%Y-%m-%d"),
            item.title
        ));
        if !item.url.is_empty() {
            out.push_str(&format!("   URL: {}\n", item.url));
        }
        if !item.content.is_empty() {
            out.push_str(&format!("   {}\n", clip(&item.content, MAX_ITEM_CHARS)));
        }
    }
}

fn clip(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Prompt for a single source.
pub fn source_prompt(batch: &SourceBatch<'_>, language: &str) -> Prompt {
    let mut user = String::from("Summarize the following items.\n\n");
    write_source_block(&mut user, batch);
    Prompt {
        system: system_prompt(language),
        user,
    }
}

/// Prompt covering every source; each block keeps its own style directive.
pub fn aggregate_prompt(batches: &[SourceBatch<'_>], language: &str) -> Prompt {
    let mut user = String::from(
        "Write one combined summary of the following sources. \
         Follow each source's style directive for the part covering that source.\n",
    );
    for batch in batches {
        user.push('\n');
        write_source_block(&mut user, batch);
    }
    Prompt {
        system: system_prompt(language),
        user,
    }
}

/// Generate summaries for all batches according to the configured mode.
///
/// Per-source results come back in batch (declaration) order. Any failure
/// aborts the stage; partial results are discarded.
#[instrument(level = "info", skip_all, fields(mode = ?config.summary_mode, sources = batches.len()))]
pub async fn summarize<A: AskAsync>(
    ai: &A,
    batches: &[SourceBatch<'_>],
    config: &SourcesConfig,
) -> Result<Vec<SummaryResult>, SummarizationError> {
    match config.summary_mode {
        SummaryMode::PerSource => {
            let mut results = Vec::with_capacity(batches.len());
            for batch in batches {
                let prompt = source_prompt(batch, &config.language);
                let text = ai.ask(&prompt).await?;
                info!(source = %batch.spec.id, bytes = text.len(), "Summarized source");
                results.push(SummaryResult {
                    scope: SummaryScope::Source(batch.spec.id.clone()),
                    text,
                    generated_at: Utc::now(),
                });
            }
            Ok(results)
        }
        SummaryMode::Aggregate => {
            let prompt = aggregate_prompt(batches, &config.language);
            let text = ai.ask(&prompt).await?;
            info!(bytes = text.len(), "Summarized all sources");
            Ok(vec![SummaryResult {
                scope: SummaryScope::Aggregate,
                text,
                generated_at: Utc::now(),
            }])
        }
    }
}
