//! Renders ranked items into a citation-annotated context block

use crate::enrichment::ranking::keyword_match_ratio;
use crate::models::{Citation, ContextStyle, RankedItem};
use std::fmt::Write;

/// Hard ceiling on items rendered into the text block
pub const MAX_RENDERED_ITEMS: usize = 5;

/// Fallback link for items without a URL
const DISCUSSION_URL_BASE: &str = "https://news.ycombinator.com/item?id=";

/// Rendered text plus the matching citation list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormattedContext {
    pub context_text: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone)]
pub struct ContextFormatter {
    max_rendered: usize,
}

impl ContextFormatter {
    pub fn new() -> Self {
        Self {
            max_rendered: MAX_RENDERED_ITEMS,
        }
    }

    /// Citations cover the top `limit` items; the text shows at most
    /// [`MAX_RENDERED_ITEMS`] of them
    pub fn format(
        &self,
        ranked: &[RankedItem],
        keywords: &[String],
        limit: usize,
        style: ContextStyle,
    ) -> FormattedContext {
        let cited = &ranked[..ranked.len().min(limit)];
        if cited.is_empty() {
            return FormattedContext::default();
        }

        let citations: Vec<Citation> = cited
            .iter()
            .enumerate()
            .map(|(i, item)| Citation::from_ranked(i + 1, item))
            .collect();

        let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        let mut text = String::new();

        let _ = writeln!(text, "## Related community discussions");
        if !keywords.is_empty() {
            let _ = writeln!(text, "Search terms: {}", keywords.join(", "));
        }
        text.push('\n');

        for (citation, ranked_item) in citations.iter().zip(cited).take(self.max_rendered) {
            let relevance = (keyword_match_ratio(&ranked_item.item, &lowered) * 100.0).round();
            let _ = writeln!(text, "[{}] {}", citation.id, citation.title);
            let _ = writeln!(
                text,
                "Relevance: {}% | Points: {} | Comments: {} | Posted: {}",
                relevance,
                citation.score,
                citation.comment_count,
                citation.created_at.format("%Y-%m-%d")
            );
            match citation.url {
                Some(ref url) => {
                    let _ = writeln!(text, "URL: {}", url);
                }
                None => {
                    let _ = writeln!(
                        text,
                        "Discussion: {}{}",
                        DISCUSSION_URL_BASE, citation.source_object_id
                    );
                }
            }
            if let Some(ref author) = citation.author {
                let _ = writeln!(text, "Author: {}", author);
            }
            text.push('\n');
        }

        text.push_str(usage_guidelines(style));

        FormattedContext {
            context_text: text,
            citations,
        }
    }
}

impl Default for ContextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed instructions for the downstream consumer of the markers
pub fn usage_guidelines(style: ContextStyle) -> &'static str {
    match style {
        ContextStyle::Integrated => {
            "Usage guidelines:\n\
             - Reference sources inline with their marker, e.g. \"as discussed in [SRC-1]\".\n\
             - Only cite a marker for claims the source actually supports.\n\
             - Treat community discussion as opinion, not established fact.\n"
        }
        ContextStyle::Reference => {
            "Usage guidelines:\n\
             - Place the marker, e.g. [SRC-1], at the end of each sentence that relies on a source.\n\
             - Only cite a marker for claims the source actually supports.\n\
             - Treat community discussion as opinion, not established fact.\n"
        }
        ContextStyle::Appendix => {
            "Usage guidelines:\n\
             - Do not cite inline; end with a \"Further reading\" section listing the [SRC-n] entries used.\n\
             - Only list sources that informed the text.\n\
             - Treat community discussion as opinion, not established fact.\n"
        }
    }
}
