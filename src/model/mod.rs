//! Document model types shared by rendering, layout and export.
//!
//! Blocks are produced by the content renderer, measured by the layout
//! engine, and consumed by the export assembler. Geometry and templates are
//! plain values carried in [`crate::RenderSettings`].

mod block;
mod geometry;
mod marker;
mod template;

pub use block::{
    escape_html, BlockBox, BlockKind, ContentBlock, DiagramNode, DiagramState, DIAGRAM_LANGUAGE,
    PAGE_BREAK_CLASS,
};
pub use geometry::{
    mm_to_px, Margins, Orientation, PageGeometry, PaperSize, DEFAULT_MARGIN_MM, MM_TO_PX,
};
pub use marker::{BreakKind, PageBreakMarker};
pub use template::{HeaderFooterTemplate, TemplateContext, DATE_FORMAT};
