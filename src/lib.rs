//! # paperdown
//!
//! Markdown to paginated, print-ready HTML.
//!
//! This library renders Markdown into a live preview with estimated page
//! breaks, and assembles a detached, deterministic copy of the document for
//! printing or paged export.
//!
//! ## Quick Start
//!
//! ```no_run
//! use paperdown::{estimate_pages, render_html, RenderSettings};
//!
//! fn main() -> paperdown::Result<()> {
//!     let source = std::fs::read_to_string("notes.md")?;
//!     let settings = RenderSettings::default();
//!
//!     // Render to an HTML fragment
//!     let html = render_html(&source, &settings);
//!     println!("{}", html);
//!
//!     // Estimate the page count on A4 with 10mm margins
//!     let estimate = estimate_pages(&source, &settings)?;
//!     println!("{} page(s)", estimate.total_pages);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **GitHub-flavoured Markdown**: tables, task lists, footnotes, strikethrough
//! - **Manual page breaks**: `<!-- pagebreak -->` on its own line
//! - **Diagrams**: `mermaid` fences rendered through an external engine
//! - **Syntax highlighting**: inline-styled spans via syntect
//! - **Page estimation**: automatic break markers for the chosen paper geometry
//! - **Export**: print-dialog HTML or discrete pages with running headers and footers

pub mod diagram;
pub mod error;
pub mod export;
pub mod layout;
pub mod model;
pub mod render;
pub mod session;

// Re-export commonly used types
pub use diagram::{CommandEngine, DiagramEngine, DiagramError, DiagramOverlay, OverlayOptions};
pub use error::{Error, Result};
pub use export::{
    ExportAssembler, ExportBackend, ExportOptions, ExportReport, ExportStyling,
    PagedDocumentBackend, PrintDocumentBackend,
};
pub use layout::{Container, PageEstimate, PaginationEstimator};
pub use model::{
    BlockKind, ContentBlock, HeaderFooterTemplate, Margins, Orientation, PageGeometry, PaperSize,
};
pub use render::{ContentRenderer, FeatureToggles, HeaderFooter, RenderSettings, RenderedDocument};
pub use session::{Action, Debouncer, KeyChord, PreviewFrame, PreviewSession};

use std::path::Path;

/// Render Markdown to an HTML fragment.
///
/// Never fails: a rendering failure yields a visible error placeholder.
///
/// # Example
///
/// ```
/// use paperdown::{render_html, RenderSettings};
///
/// let html = render_html("# Hello", &RenderSettings::default());
/// assert!(html.contains("<h1>Hello</h1>"));
/// ```
pub fn render_html(source: &str, settings: &RenderSettings) -> String {
    render::to_html(source, settings)
}

/// Render a Markdown file to an HTML fragment.
///
/// # Example
///
/// ```no_run
/// use paperdown::{render_file, RenderSettings};
///
/// let html = render_file("notes.md", &RenderSettings::default()).unwrap();
/// std::fs::write("notes.html", html).unwrap();
/// ```
pub fn render_file<P: AsRef<Path>>(path: P, settings: &RenderSettings) -> Result<String> {
    let source = std::fs::read_to_string(path)?;
    Ok(render_html(&source, settings))
}

/// Estimate the page count of Markdown without rendering diagrams.
///
/// Diagrams keep their source placeholder size.
///
/// # Example
///
/// ```
/// use paperdown::{estimate_pages, RenderSettings};
///
/// let estimate = estimate_pages("Short text.", &RenderSettings::default()).unwrap();
/// assert_eq!(estimate.total_pages, 1);
/// ```
pub fn estimate_pages(source: &str, settings: &RenderSettings) -> Result<PageEstimate> {
    settings.validate()?;
    let doc = ContentRenderer::new().render_document(source, settings);
    let mut container = Container::from_document(doc, settings.font_size_px());
    Ok(PaginationEstimator::new().estimate(&mut container, &settings.geometry))
}

/// Builder for rendering and estimating Markdown documents.
///
/// # Example
///
/// ```no_run
/// use paperdown::{Paperdown, PaperSize, Orientation};
///
/// let result = Paperdown::new()
///     .with_paper(PaperSize::Letter)
///     .with_orientation(Orientation::Landscape)
///     .with_font_size(12)
///     .without_diagrams()
///     .render_file("notes.md")?;
/// println!("{} page(s)", result.estimate()?.total_pages);
/// # Ok::<(), paperdown::Error>(())
/// ```
pub struct Paperdown {
    settings: RenderSettings,
    estimator: PaginationEstimator,
}

impl Paperdown {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::with_settings(RenderSettings::default())
    }

    /// Start from a settings snapshot.
    pub fn with_settings(settings: RenderSettings) -> Self {
        Self {
            settings,
            estimator: PaginationEstimator::new(),
        }
    }

    /// Load settings from a JSON file.
    pub fn from_settings_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::with_settings(RenderSettings::from_file(path)?))
    }

    /// Set paper size.
    pub fn with_paper(mut self, paper: PaperSize) -> Self {
        self.settings = self.settings.with_paper(paper);
        self
    }

    /// Set orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.settings = self.settings.with_orientation(orientation);
        self
    }

    /// Set margins in millimetres.
    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.settings = self.settings.with_margins(margins);
        self
    }

    /// Set body font size in pixels.
    pub fn with_font_size(mut self, px: u32) -> Self {
        self.settings = self.settings.with_font_size(px);
        self
    }

    /// Render diagram fences as code.
    pub fn without_diagrams(mut self) -> Self {
        self.settings = self.settings.with_diagrams(false);
        self
    }

    /// Disable syntax highlighting.
    pub fn without_highlighting(mut self) -> Self {
        self.settings = self.settings.with_highlighting(false);
        self
    }

    /// Set the running header template.
    pub fn with_header(mut self, template: impl Into<String>) -> Self {
        self.settings = self.settings.with_header(template);
        self
    }

    /// Set the running footer template.
    pub fn with_footer(mut self, template: impl Into<String>) -> Self {
        self.settings = self.settings.with_footer(template);
        self
    }

    /// Set the overflow tolerance of the page estimate.
    pub fn with_overflow_tolerance(mut self, px: f32) -> Self {
        self.estimator = self.estimator.with_overflow_tolerance(px);
        self
    }

    /// Settings built so far.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render Markdown source.
    pub fn render(self, source: &str) -> Result<PaperdownResult> {
        self.settings.validate()?;
        let document = ContentRenderer::new().render_document(source, &self.settings);
        Ok(PaperdownResult {
            document,
            settings: self.settings,
            estimator: self.estimator,
        })
    }

    /// Render a Markdown file.
    pub fn render_file<P: AsRef<Path>>(self, path: P) -> Result<PaperdownResult> {
        let source = std::fs::read_to_string(path)?;
        self.render(&source)
    }
}

impl Default for Paperdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of rendering a Markdown document.
pub struct PaperdownResult {
    /// The rendered document
    pub document: RenderedDocument,
    settings: RenderSettings,
    estimator: PaginationEstimator,
}

impl PaperdownResult {
    /// HTML fragment.
    pub fn to_html(&self) -> String {
        self.document.to_html()
    }

    /// Estimate the page count for the configured geometry.
    pub fn estimate(&self) -> Result<PageEstimate> {
        let mut container = self.container();
        Ok(self.estimator.estimate(&mut container, &self.settings.geometry))
    }

    /// Preview HTML with automatic page-break markers.
    pub fn to_preview_html(&self) -> String {
        let mut container = self.container();
        self.estimator.estimate(&mut container, &self.settings.geometry);
        container.to_html()
    }

    /// Settings used for rendering.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    fn container(&self) -> Container {
        Container::from_document(self.document.clone(), self.settings.font_size_px())
    }
}
