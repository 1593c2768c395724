//! Rendered content blocks.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Language tag that marks a fenced code block as a diagram.
pub const DIAGRAM_LANGUAGE: &str = "mermaid";

/// CSS class carried by manual page-break marker elements.
pub const PAGE_BREAK_CLASS: &str = "page-break";

/// Layout box of a block, relative to the container top, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockBox {
    /// Distance from the container top to the block's top border edge
    pub top: f32,
    /// Border-box height
    pub height: f32,
    /// Border-box width
    pub width: f32,
}

impl BlockBox {
    /// Bottom edge relative to the container top.
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Whether the box has a measurable area.
    pub fn is_measurable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// The rendered subtree for one top-level Markdown block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Position in document order (0-indexed)
    pub index: usize,

    /// What kind of block this is
    pub kind: BlockKind,

    /// HTML emitted by the content renderer
    html: String,

    /// Plain text used for text metrics
    pub text: String,

    /// Box written by the most recent layout pass
    #[serde(skip)]
    pub layout: Option<BlockBox>,
}

impl ContentBlock {
    /// Create a block from its kind, HTML and plain text.
    pub fn new(index: usize, kind: BlockKind, html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            html: html.into(),
            text: text.into(),
            layout: None,
        }
    }

    /// Create an opaque block with a known intrinsic height (embedded media, fixtures).
    pub fn fixed(index: usize, height: f32) -> Self {
        Self::new(
            index,
            BlockKind::Fixed { height },
            format!("<div style=\"height: {:.2}px\"></div>\n", height),
            "",
        )
    }

    /// Create a manual page-break marker block.
    pub fn page_break(index: usize) -> Self {
        Self::new(
            index,
            BlockKind::PageBreak,
            format!("<div class=\"{}\"></div>\n", PAGE_BREAK_CLASS),
            "",
        )
    }

    /// Current HTML for this block.
    ///
    /// Diagram blocks are rendered from their node state so in-place updates by
    /// the diagram overlay are reflected without re-rendering.
    pub fn to_html(&self) -> Cow<'_, str> {
        match &self.kind {
            BlockKind::Diagram(node) => Cow::Owned(node.to_html()),
            _ => Cow::Borrowed(&self.html),
        }
    }

    /// Check if this block is a manual page break.
    pub fn is_page_break(&self) -> bool {
        matches!(self.kind, BlockKind::PageBreak)
    }

    /// Check if this block is a diagram.
    pub fn is_diagram(&self) -> bool {
        matches!(self.kind, BlockKind::Diagram(_))
    }

    /// Diagram node if this block is a diagram.
    pub fn diagram(&self) -> Option<&DiagramNode> {
        match &self.kind {
            BlockKind::Diagram(node) => Some(node),
            _ => None,
        }
    }

    /// Mutable diagram node if this block is a diagram.
    pub fn diagram_mut(&mut self) -> Option<&mut DiagramNode> {
        match &mut self.kind {
            BlockKind::Diagram(node) => Some(node),
            _ => None,
        }
    }

    /// Heading level if this block is a heading.
    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            BlockKind::Heading { level } => Some(level),
            _ => None,
        }
    }

    /// Replace the stored HTML (used by export styling).
    pub fn set_html(&mut self, html: String) {
        self.html = html;
    }
}

/// Kinds of top-level blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// A heading (level 1-6)
    Heading { level: u8 },

    /// A paragraph of text
    Paragraph,

    /// An ordered or unordered list
    List {
        /// Number of list items, nested items included
        items: usize,
    },

    /// A block quote
    BlockQuote,

    /// A fenced or indented code block
    CodeBlock {
        /// Declared language, if any
        language: Option<String>,
        /// Number of source lines
        lines: usize,
    },

    /// A diagram placeholder processed by the diagram overlay
    Diagram(DiagramNode),

    /// A table
    Table {
        /// Cell text per row, header row first
        rows: Vec<Vec<String>>,
    },

    /// A horizontal rule
    Rule,

    /// A manual page break
    PageBreak,

    /// Raw HTML
    Html,

    /// Opaque content with a fixed intrinsic height
    Fixed { height: f32 },

    /// Visible placeholder for content that failed to render
    RenderError,
}

/// A diagram source block and its rendering state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramNode {
    /// Per-document diagram identifier
    pub id: usize,

    /// Diagram DSL source
    pub source: String,

    /// Rendering state
    pub state: DiagramState,

    /// Inline error annotation shown next to the diagram
    pub annotation: Option<String>,
}

impl DiagramNode {
    /// Create an unprocessed diagram node.
    pub fn new(id: usize, source: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            state: DiagramState::Pending,
            annotation: None,
        }
    }

    /// Whether the overlay has already handled this node.
    pub fn is_processed(&self) -> bool {
        !matches!(self.state, DiagramState::Pending)
    }

    /// Rendered graphic size, if any.
    pub fn graphic_size(&self) -> Option<(f32, f32)> {
        match &self.state {
            DiagramState::Rendered { width, height, .. } => Some((*width, *height)),
            _ => None,
        }
    }

    /// Clear processed state, rendered output and annotations.
    pub fn reset(&mut self) {
        self.state = DiagramState::Pending;
        self.annotation = None;
    }

    fn to_html(&self) -> String {
        let mut html = match &self.state {
            DiagramState::Pending => format!(
                "<div class=\"{}\" data-diagram=\"{}\">{}</div>\n",
                DIAGRAM_LANGUAGE,
                self.id,
                escape_html(&self.source)
            ),
            DiagramState::Rendered { svg, .. } => format!(
                "<div class=\"{}\" data-diagram=\"{}\" data-processed=\"true\">{}</div>\n",
                DIAGRAM_LANGUAGE, self.id, svg
            ),
            DiagramState::Failed => format!(
                "<div class=\"{}\" data-diagram=\"{}\" data-processed=\"true\"><pre>{}</pre></div>\n",
                DIAGRAM_LANGUAGE,
                self.id,
                escape_html(&self.source)
            ),
        };
        if let Some(ref message) = self.annotation {
            html.push_str(&format!(
                "<div class=\"diagram-error\">{}</div>\n",
                escape_html(message)
            ));
        }
        html
    }
}

/// Rendering state of a diagram node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DiagramState {
    /// Not yet processed
    Pending,
    /// Replaced by a vector graphic
    Rendered {
        svg: String,
        width: f32,
        height: f32,
    },
    /// The engine failed; source is kept visible
    Failed,
}

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
