//! Rendered document with block list and statistics.

use crate::model::{BlockKind, ContentBlock};
use serde::{Deserialize, Serialize};

/// Output of one content render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedDocument {
    /// Top-level blocks in document order
    pub blocks: Vec<ContentBlock>,

    /// Text of the first level-1 heading, if any
    pub title: Option<String>,

    /// Render statistics
    pub stats: RenderStats,
}

impl RenderedDocument {
    /// Create a document from blocks, computing statistics.
    pub fn new(blocks: Vec<ContentBlock>, title: Option<String>) -> Self {
        let mut stats = RenderStats::new();
        for block in &blocks {
            stats.add_block(block);
        }
        Self {
            blocks,
            title,
            stats,
        }
    }

    /// Create a document consisting of a single error placeholder.
    pub fn failed(message: &str) -> Self {
        let block = ContentBlock::new(
            0,
            BlockKind::RenderError,
            format!(
                "<div class=\"render-error\">Failed to render document: {}</div>\n",
                crate::model::escape_html(message)
            ),
            message,
        );
        Self::new(vec![block], None)
    }

    /// Concatenated HTML of all blocks.
    pub fn to_html(&self) -> String {
        self.blocks.iter().map(|b| b.to_html()).collect()
    }

    /// Check if the document has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Title, or the given fallback.
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(fallback)
    }

    /// Check if rendering fell back to the error placeholder.
    pub fn is_failed(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| matches!(b.kind, BlockKind::RenderError))
    }
}

/// Statistics collected while rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Number of top-level blocks
    pub block_count: u32,

    /// Number of headings
    pub heading_count: u32,

    /// Number of paragraphs
    pub paragraph_count: u32,

    /// Number of lists
    pub list_count: u32,

    /// Number of list items, nested items included
    pub list_item_count: u32,

    /// Number of tables
    pub table_count: u32,

    /// Number of code blocks (diagrams excluded)
    pub code_block_count: u32,

    /// Number of diagram blocks
    pub diagram_count: u32,

    /// Number of manual page breaks at the top level
    pub page_break_count: u32,

    /// Number of horizontal rules
    pub horizontal_rule_count: u32,

    /// Approximate word count (whitespace-separated tokens)
    pub word_count: u32,

    /// Character count (excluding whitespace)
    pub char_count: u32,
}

impl RenderStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one block.
    pub fn add_block(&mut self, block: &ContentBlock) {
        self.block_count += 1;
        match &block.kind {
            BlockKind::Heading { .. } => self.heading_count += 1,
            BlockKind::Paragraph => self.paragraph_count += 1,
            BlockKind::List { items } => {
                self.list_count += 1;
                self.list_item_count += *items as u32;
            }
            BlockKind::Table { .. } => self.table_count += 1,
            BlockKind::CodeBlock { .. } => self.code_block_count += 1,
            BlockKind::Diagram(_) => self.diagram_count += 1,
            BlockKind::PageBreak => self.page_break_count += 1,
            BlockKind::Rule => self.horizontal_rule_count += 1,
            BlockKind::BlockQuote
            | BlockKind::Html
            | BlockKind::Fixed { .. }
            | BlockKind::RenderError => {}
        }
        self.count_text(&block.text);
    }

    /// Add word and character counts from text.
    pub fn count_text(&mut self, text: &str) {
        self.word_count += text.split_whitespace().count() as u32;
        self.char_count += text.chars().filter(|c| !c.is_whitespace()).count() as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_stats_count_text() {
        let mut stats = RenderStats::new();
        stats.count_text("Hello, world! This is a test.");

        assert_eq!(stats.word_count, 6);
        assert_eq!(stats.char_count, 24);
    }

    #[test]
    fn test_failed_document() {
        let doc = RenderedDocument::failed("boom <here>");
        assert!(doc.is_failed());
        assert!(doc.to_html().contains("class=\"render-error\""));
        assert!(doc.to_html().contains("boom &lt;here&gt;"));
        assert_eq!(doc.title_or("Document"), "Document");
    }

    #[test]
    fn test_stats_from_blocks() {
        let doc = RenderedDocument::new(
            vec![
                ContentBlock::new(0, BlockKind::Heading { level: 1 }, "<h1>T</h1>", "T"),
                ContentBlock::page_break(1),
                ContentBlock::new(2, BlockKind::List { items: 3 }, "", "a b c"),
            ],
            Some("T".to_string()),
        );
        assert_eq!(doc.stats.block_count, 3);
        assert_eq!(doc.stats.heading_count, 1);
        assert_eq!(doc.stats.page_break_count, 1);
        assert_eq!(doc.stats.list_item_count, 3);
        assert_eq!(doc.stats.word_count, 4);
        assert_eq!(doc.title_or("Document"), "T");
    }
}
