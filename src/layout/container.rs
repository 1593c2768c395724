//! Content container holding rendered blocks and page-break markers.

use super::flow::FlowLayout;
use crate::model::{BlockBox, BreakKind, ContentBlock, DiagramNode, DiagramState, PageBreakMarker};
use crate::render::RenderedDocument;

/// A child of the container.
#[derive(Debug, Clone)]
pub enum Node {
    /// Rendered content in document order
    Block(ContentBlock),
    /// Absolutely positioned page-break indicator; takes no space in the flow
    Marker(PageBreakMarker),
}

impl Node {
    /// Check if this node is a marker.
    pub fn is_marker(&self) -> bool {
        matches!(self, Node::Marker(_))
    }
}

/// Container for rendered content.
///
/// Tracks whether its content changed since the last layout pass so that
/// measurements are only read after layout.
#[derive(Debug, Clone)]
pub struct Container {
    nodes: Vec<Node>,
    flow: FlowLayout,
    dirty: bool,
    laid_out_width: Option<f32>,
    content_height: f32,
    layout_passes: u64,
}

impl Container {
    /// Create an empty container for a base font size.
    pub fn new(font_size: f32) -> Self {
        Self::with_flow(FlowLayout::new(font_size))
    }

    /// Create an empty container with a layout engine.
    pub fn with_flow(flow: FlowLayout) -> Self {
        Self {
            nodes: Vec::new(),
            flow,
            dirty: true,
            laid_out_width: None,
            content_height: 0.0,
            layout_passes: 0,
        }
    }

    /// Create a container filled with a rendered document.
    pub fn from_document(doc: RenderedDocument, font_size: f32) -> Self {
        let mut container = Self::new(font_size);
        container.replace_content(doc.blocks);
        container
    }

    /// Replace all content, discarding every block and marker.
    pub fn replace_content(&mut self, blocks: Vec<ContentBlock>) {
        self.nodes = blocks.into_iter().map(Node::Block).collect();
        self.mark_dirty();
    }

    /// Change the base font size.
    pub fn set_font_size(&mut self, font_size: f32) {
        if self.flow.metrics().font_size != font_size {
            self.flow = FlowLayout::new(font_size);
            self.mark_dirty();
        }
    }

    /// All nodes in order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Content blocks in document order.
    pub fn blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Block(block) => Some(block),
            Node::Marker(_) => None,
        })
    }

    /// Mutable content blocks; marks the container for layout.
    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut ContentBlock> {
        self.dirty = true;
        self.nodes.iter_mut().filter_map(|node| match node {
            Node::Block(block) => Some(block),
            Node::Marker(_) => None,
        })
    }

    /// Diagram nodes in document order.
    pub fn diagrams(&self) -> impl Iterator<Item = &DiagramNode> {
        self.blocks().filter_map(ContentBlock::diagram)
    }

    /// Mutable diagram node by id; marks the container for layout.
    pub fn diagram_mut(&mut self, id: usize) -> Option<&mut DiagramNode> {
        self.blocks_mut()
            .filter_map(ContentBlock::diagram_mut)
            .find(|node| node.id == id)
    }

    /// Page-break markers currently in the container.
    pub fn markers(&self) -> impl Iterator<Item = &PageBreakMarker> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Marker(marker) => Some(marker),
            Node::Block(_) => None,
        })
    }

    /// Number of markers of any kind.
    pub fn marker_count(&self) -> usize {
        self.markers().count()
    }

    /// Number of content blocks.
    pub fn len(&self) -> usize {
        self.blocks().count()
    }

    /// Check if the container has no content blocks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every marker of `kind`, returning how many were removed.
    pub fn remove_markers(&mut self, kind: BreakKind) -> usize {
        let before = self.nodes.len();
        self.nodes
            .retain(|node| !matches!(node, Node::Marker(m) if m.kind == kind));
        before - self.nodes.len()
    }

    /// Insert a marker before the first block that starts at or below its offset.
    pub fn insert_marker(&mut self, marker: PageBreakMarker) {
        let position = self
            .nodes
            .iter()
            .position(|node| match node {
                Node::Block(block) => block.layout.map_or(false, |b| b.top >= marker.offset),
                Node::Marker(_) => false,
            })
            .unwrap_or(self.nodes.len());
        self.nodes.insert(position, Node::Marker(marker));
    }

    /// Force the next measurement to run a layout pass.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Check if content changed since the last layout pass.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Run a layout pass if content or width changed.
    ///
    /// Returns the content height after layout.
    pub fn layout(&mut self, width: f32) -> f32 {
        if !self.dirty && self.laid_out_width == Some(width) {
            return self.content_height;
        }

        let flow = self.flow;
        let blocks = self.nodes.iter_mut().filter_map(|node| match node {
            Node::Block(block) => Some(block),
            Node::Marker(_) => None,
        });
        flow.flow(blocks, width);

        self.dirty = false;
        self.laid_out_width = Some(width);
        self.layout_passes += 1;
        self.content_height = self.measure_content_height();
        log::trace!(
            "Layout pass {} at {:.1}px: content height {:.1}px",
            self.layout_passes,
            width,
            self.content_height
        );
        self.content_height
    }

    /// Bottom edge of the last non-marker child relative to the container top.
    ///
    /// Reads the most recent layout pass; zero before any layout.
    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    /// Width and height of the laid-out content, or zero before layout.
    pub fn bounding_size(&self) -> (f32, f32) {
        match self.laid_out_width {
            Some(width) if !self.dirty && self.content_height > 0.0 => (width, self.content_height),
            _ => (0.0, 0.0),
        }
    }

    /// Check if a clean layout pass placed every block at zero height.
    ///
    /// Such content (a lone page break or comment) has nothing to measure,
    /// and another pass would not change that.
    pub fn is_collapsed(&self) -> bool {
        !self.dirty
            && self.laid_out_width.is_some()
            && self
                .blocks()
                .all(|block| block.layout.map_or(false, |b| b.height == 0.0))
    }

    /// Number of layout passes run so far.
    pub fn layout_passes(&self) -> u64 {
        self.layout_passes
    }

    /// Check if every diagram has either a measurable graphic or failed.
    pub fn diagrams_settled(&self) -> bool {
        self.blocks()
            .filter(|block| block.is_diagram())
            .all(|block| match block.diagram().map(|node| &node.state) {
                Some(DiagramState::Failed) => true,
                Some(DiagramState::Rendered { .. }) => {
                    block.layout.map_or(false, |b| b.is_measurable())
                }
                _ => false,
            })
    }

    /// Preview HTML: blocks with markers positioned over the flow.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"paperdown-preview\" style=\"position: relative;\">\n");
        for node in &self.nodes {
            match node {
                Node::Block(block) => html.push_str(&block.to_html()),
                Node::Marker(marker) => html.push_str(&marker.to_html()),
            }
        }
        html.push_str("</div>\n");
        html
    }

    /// Content HTML without markers.
    pub fn content_html(&self) -> String {
        self.blocks().map(|block| block.to_html()).collect()
    }

    fn measure_content_height(&self) -> f32 {
        self.blocks()
            .filter_map(|block| block.layout)
            .last()
            .map(|b: BlockBox| b.bottom())
            .unwrap_or(0.0)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::with_flow(FlowLayout::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockKind;

    fn filled(heights: &[f32]) -> Container {
        let mut container = Container::new(14.0);
        container.replace_content(
            heights
                .iter()
                .enumerate()
                .map(|(i, h)| ContentBlock::fixed(i, *h))
                .collect(),
        );
        container
    }

    #[test]
    fn test_layout_only_when_dirty() {
        let mut container = filled(&[100.0, 50.0]);
        assert!(container.is_dirty());
        assert_eq!(container.content_height(), 0.0);

        assert_eq!(container.layout(500.0), 150.0);
        assert_eq!(container.layout_passes(), 1);

        container.layout(500.0);
        assert_eq!(container.layout_passes(), 1);

        container.layout(400.0);
        assert_eq!(container.layout_passes(), 2);
    }

    #[test]
    fn test_markers_do_not_count_toward_height() {
        let mut container = filled(&[100.0, 100.0]);
        container.layout(500.0);
        container.insert_marker(PageBreakMarker::automatic(1, 2, 100.0));
        assert_eq!(container.marker_count(), 1);
        assert!(container.nodes()[1].is_marker());

        container.mark_dirty();
        assert_eq!(container.layout(500.0), 200.0);
    }

    #[test]
    fn test_remove_markers_by_kind() {
        let mut container = filled(&[10.0]);
        container.insert_marker(PageBreakMarker::automatic(1, 2, 5.0));
        container.insert_marker(PageBreakMarker::manual(5.0, 1));
        assert_eq!(container.remove_markers(BreakKind::Automatic), 1);
        assert_eq!(container.marker_count(), 1);
    }

    #[test]
    fn test_replace_content_discards_markers() {
        let mut container = filled(&[10.0]);
        container.insert_marker(PageBreakMarker::automatic(1, 2, 5.0));
        container.replace_content(vec![ContentBlock::fixed(0, 20.0)]);
        assert_eq!(container.marker_count(), 0);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_bounding_size_requires_layout() {
        let mut container = filled(&[30.0]);
        assert_eq!(container.bounding_size(), (0.0, 0.0));
        container.layout(200.0);
        assert_eq!(container.bounding_size(), (200.0, 30.0));
    }

    #[test]
    fn test_zero_height_content_is_collapsed() {
        let mut container = filled(&[0.0, 0.0]);
        assert!(!container.is_collapsed());
        container.layout(200.0);
        assert_eq!(container.bounding_size(), (0.0, 0.0));
        assert!(container.is_collapsed());

        let mut tall = filled(&[0.0, 12.0]);
        tall.layout(200.0);
        assert!(!tall.is_collapsed());
    }

    #[test]
    fn test_diagrams_settled() {
        let mut container = Container::new(14.0);
        container.replace_content(vec![ContentBlock::new(
            0,
            BlockKind::Diagram(DiagramNode::new(0, "graph TD")),
            "",
            "graph TD",
        )]);
        container.layout(500.0);
        assert!(!container.diagrams_settled());

        container.diagram_mut(0).unwrap().state = DiagramState::Failed;
        container.layout(500.0);
        assert!(container.diagrams_settled());
    }

    #[test]
    fn test_preview_html_contains_markers() {
        let mut container = filled(&[10.0]);
        container.layout(100.0);
        container.insert_marker(PageBreakMarker::automatic(1, 2, 5.0));
        let html = container.to_html();
        assert!(html.contains("page-break-indicator auto"));
        assert!(!container.content_html().contains("page-break-indicator"));
    }
}
