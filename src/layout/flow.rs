//! Block flow layout.
//!
//! Stands in for the browser's block formatting context: blocks are stacked
//! top to bottom, vertical margins between siblings collapse to the larger
//! of the two, and the first block's top margin is dropped. Box sizes follow
//! the preview stylesheet (heading scales, line heights, paddings).

use super::metrics::FontMetrics;
use crate::model::{BlockBox, BlockKind, ContentBlock, DiagramState};

/// Body line height, in multiples of the font size.
pub const BODY_LINE_HEIGHT: f32 = 1.6;

/// Heading line height, in multiples of the heading font size.
pub const HEADING_LINE_HEIGHT: f32 = 1.25;

/// Code line height, in multiples of the code font size.
pub const CODE_LINE_HEIGHT: f32 = 1.45;

/// Code font size relative to the body.
pub const CODE_SCALE: f32 = 0.85;

/// Heading font scales for levels 1-6.
pub const HEADING_SCALES: [f32; 6] = [2.0, 1.5, 1.25, 1.0, 0.875, 0.85];

const BLOCK_MARGIN: f32 = 16.0;
const HEADING_MARGIN_TOP: f32 = 24.0;
const RULE_MARGIN: f32 = 24.0;
const CODE_PADDING: f32 = 16.0;
const CELL_PADDING_V: f32 = 6.0;
const CELL_PADDING_H: f32 = 13.0;
const ITEM_MARGIN: f32 = 4.0;
const INDENT_EM: f32 = 2.0;
const ANNOTATION_GAP: f32 = 8.0;

/// Vertical margins of a block box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxMargins {
    pub top: f32,
    pub bottom: f32,
}

/// Flow layout engine for a stack of content blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowLayout {
    metrics: FontMetrics,
}

impl FlowLayout {
    /// Create a layout engine for a base font size in pixels.
    pub fn new(font_size: f32) -> Self {
        Self {
            metrics: FontMetrics::new(font_size),
        }
    }

    /// Create a layout engine with custom metrics.
    pub fn with_metrics(metrics: FontMetrics) -> Self {
        Self { metrics }
    }

    /// Font metrics in use.
    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    /// Lay out blocks top to bottom inside `width` pixels.
    ///
    /// Writes each block's box and returns the bottom edge of the last block.
    pub fn flow<'a, I>(&self, blocks: I, width: f32) -> f32
    where
        I: IntoIterator<Item = &'a mut ContentBlock>,
    {
        let mut cursor = 0.0f32;
        let mut pending_margin: Option<f32> = None;
        let mut bottom = 0.0f32;

        for block in blocks {
            let margins = self.margins(&block.kind);
            let top = match pending_margin {
                None => cursor,
                Some(previous) => cursor + previous.max(margins.top),
            };
            let (height, box_width) = self.measure(block, width);

            block.layout = Some(BlockBox {
                top,
                height,
                width: box_width,
            });
            cursor = top + height;
            bottom = cursor;
            pending_margin = Some(margins.bottom);
        }

        bottom
    }

    /// Vertical margins for a block kind.
    pub fn margins(&self, kind: &BlockKind) -> BoxMargins {
        match kind {
            BlockKind::Heading { .. } => BoxMargins {
                top: HEADING_MARGIN_TOP,
                bottom: BLOCK_MARGIN,
            },
            BlockKind::Rule => BoxMargins {
                top: RULE_MARGIN,
                bottom: RULE_MARGIN,
            },
            BlockKind::List { .. } | BlockKind::Table { .. } => BoxMargins {
                top: BLOCK_MARGIN,
                bottom: BLOCK_MARGIN,
            },
            BlockKind::PageBreak | BlockKind::Fixed { .. } => BoxMargins::default(),
            _ => BoxMargins {
                top: 0.0,
                bottom: BLOCK_MARGIN,
            },
        }
    }

    /// Border-box (height, width) of one block.
    pub fn measure(&self, block: &ContentBlock, width: f32) -> (f32, f32) {
        let font_size = self.metrics.font_size;
        let body_line = font_size * BODY_LINE_HEIGHT;

        let height = match &block.kind {
            BlockKind::Heading { level } => {
                let index = (*level as usize).clamp(1, 6) - 1;
                let scale = HEADING_SCALES[index];
                let lines = self.metrics.line_count(&block.text, width, false, scale).max(1);
                let mut height = lines as f32 * font_size * scale * HEADING_LINE_HEIGHT;
                if *level <= 2 {
                    // padding-bottom .3em plus a 1px rule
                    height += 0.3 * font_size * scale + 1.0;
                }
                height
            }
            BlockKind::Paragraph | BlockKind::RenderError => {
                let lines = self.metrics.line_count(&block.text, width, false, 1.0).max(1);
                lines as f32 * body_line
            }
            BlockKind::BlockQuote => {
                let inner = width - 2.0 * font_size;
                let lines = self.metrics.line_count(&block.text, inner, false, 1.0).max(1);
                lines as f32 * body_line
            }
            BlockKind::List { items } => {
                let inner = width - INDENT_EM * font_size;
                let lines = self
                    .metrics
                    .line_count(&block.text, inner, false, 1.0)
                    .max(*items);
                lines as f32 * body_line + items.saturating_sub(1) as f32 * ITEM_MARGIN
            }
            BlockKind::CodeBlock { lines, .. } => self.code_height(*lines),
            BlockKind::Diagram(node) => {
                let (height, graphic_width) = match &node.state {
                    DiagramState::Rendered {
                        width: w,
                        height: h,
                        ..
                    } => {
                        if *w <= 0.0 || *h <= 0.0 {
                            return (0.0, 0.0);
                        }
                        let scale = if *w > width { width / w } else { 1.0 };
                        (h * scale, w * scale)
                    }
                    DiagramState::Pending => {
                        let lines = self.metrics.line_count(&node.source, width, false, 1.0).max(1);
                        (lines as f32 * body_line, width)
                    }
                    DiagramState::Failed => {
                        (self.code_height(node.source.lines().count().max(1)), width)
                    }
                };
                let annotation = if node.annotation.is_some() {
                    ANNOTATION_GAP + body_line
                } else {
                    0.0
                };
                return (height + annotation, graphic_width);
            }
            BlockKind::Table { rows } => self.table_height(rows, width),
            BlockKind::Rule => 1.0,
            BlockKind::PageBreak => 0.0,
            BlockKind::Html => {
                let html = block.to_html();
                let lines = html
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with("<!--"))
                    .count();
                lines as f32 * body_line
            }
            BlockKind::Fixed { height } => height.max(0.0),
        };

        (height, width)
    }

    fn code_height(&self, lines: usize) -> f32 {
        lines as f32 * self.metrics.font_size * CODE_SCALE * CODE_LINE_HEIGHT + 2.0 * CODE_PADDING
    }

    fn table_height(&self, rows: &[Vec<String>], width: f32) -> f32 {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let cell_width = (width / columns as f32 - 2.0 * CELL_PADDING_H).max(1.0);
        let body_line = self.metrics.font_size * BODY_LINE_HEIGHT;

        let content: f32 = rows
            .iter()
            .map(|row| {
                let lines = row
                    .iter()
                    .map(|cell| self.metrics.line_count(cell, cell_width, false, 1.0))
                    .max()
                    .unwrap_or(0)
                    .max(1);
                lines as f32 * body_line + 2.0 * CELL_PADDING_V + 1.0
            })
            .sum();

        // Collapsed borders add one line below the last row
        content + 1.0
    }
}

impl Default for FlowLayout {
    fn default() -> Self {
        Self::with_metrics(FontMetrics::default())
    }
}
