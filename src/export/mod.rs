//! Export assembly: a detached, print-ready copy of the document.
//!
//! Every export renders the source again into a private [`ExportSurface`],
//! waits for diagrams and layout with bounded polling, computes the print
//! geometry, and hands the result to an [`ExportBackend`]. The surface is
//! released on every exit path.

mod backend;
mod page;
mod paginate;
mod styles;

pub use backend::{
    AssembledBlock, AssembledDocument, ExportBackend, HandOff, PagedDocumentBackend,
    PrintDocumentBackend, DEFAULT_EXPORT_FILENAME,
};
pub use page::{PrintGeometry, BAND_HEIGHT_MM};
pub use paginate::{Page, PaginatedDocument, Paginator};
pub use styles::{
    apply_inline_styles, base_stylesheet, page_break_style, root_style, scoped_stylesheet,
    ExportStyling, EXPORT_ROOT_CLASS,
};

use crate::diagram::{DiagramEngine, DiagramOverlay, OverlayOptions};
use crate::error::Result;
use crate::layout::Container;
use crate::model::{ContentBlock, TemplateContext};
use crate::render::{ContentRenderer, RenderSettings};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Title used when the document has no level-1 heading.
pub const DEFAULT_TITLE: &str = "Document";

/// Default bound on waiting for diagrams.
pub const DEFAULT_DIAGRAM_WAIT: Duration = Duration::from_millis(5000);

/// Default bound on waiting for fonts and layout.
pub const DEFAULT_LAYOUT_WAIT: Duration = Duration::from_millis(3000);

/// Default polling interval (one display frame).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Export options.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Bound on diagram rendering plus settling
    pub diagram_timeout: Duration,

    /// Bound on font readiness plus layout
    pub layout_timeout: Duration,

    /// Interval between polls
    pub poll_interval: Duration,

    /// Inline or stylesheet styling
    pub styling: ExportStyling,

    /// Diagram overlay options for the export surface
    pub overlay: OverlayOptions,

    /// Date for `{date}`; today when unset
    pub date: Option<NaiveDate>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            diagram_timeout: DEFAULT_DIAGRAM_WAIT,
            layout_timeout: DEFAULT_LAYOUT_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            styling: ExportStyling::Inline,
            overlay: OverlayOptions::new().with_show_errors(false),
            date: None,
        }
    }
}

impl ExportOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the diagram wait bound.
    pub fn with_diagram_timeout(mut self, timeout: Duration) -> Self {
        self.diagram_timeout = timeout;
        self
    }

    /// Set the layout wait bound.
    pub fn with_layout_timeout(mut self, timeout: Duration) -> Self {
        self.layout_timeout = timeout;
        self
    }

    /// Set the polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the styling mode.
    pub fn with_styling(mut self, styling: ExportStyling) -> Self {
        self.styling = styling;
        self
    }

    /// Annotate failed diagrams in the exported document.
    pub fn with_diagram_errors(mut self, show: bool) -> Self {
        self.overlay = self.overlay.with_show_errors(show);
        self
    }

    /// Fix the date used for `{date}`.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Summary of one export.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// Document title used for templates
    pub title: String,

    /// True page count, when the backend paginated
    pub page_count: Option<u32>,

    /// Whether every diagram settled before the timeout
    pub diagrams_ready: bool,

    /// Whether fonts and layout settled before the timeout
    pub layout_ready: bool,

    /// Timeouts and other non-fatal problems
    pub warnings: Vec<String>,

    /// File written by the backend, if any
    pub output: Option<PathBuf>,
}

impl ExportReport {
    /// Check if the export completed without warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// A detached container owned by one export call.
///
/// Counted while alive; dropping it releases the surface.
pub struct ExportSurface {
    container: Container,
    live: Arc<AtomicUsize>,
}

impl ExportSurface {
    fn open(font_size: f32, live: Arc<AtomicUsize>) -> Self {
        let count = live.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("Opened export surface ({} live)", count);
        Self {
            container: Container::new(font_size),
            live,
        }
    }

    /// The surface's container.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// The surface's container, mutably.
    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }
}

impl Drop for ExportSurface {
    fn drop(&mut self) {
        let remaining = self.live.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        log::debug!("Released export surface ({} live)", remaining);
    }
}

/// Builds print-ready documents and hands them to a backend.
pub struct ExportAssembler {
    renderer: ContentRenderer,
    options: ExportOptions,
    live: Arc<AtomicUsize>,
}

impl ExportAssembler {
    /// Create an assembler with default options.
    pub fn new() -> Self {
        Self::with_options(ExportOptions::default())
    }

    /// Create an assembler with options.
    pub fn with_options(options: ExportOptions) -> Self {
        Self {
            renderer: ContentRenderer::new(),
            options,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Options in use.
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Number of export surfaces currently alive.
    pub fn live_surfaces(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Export `source` with `settings` through `backend`.
    pub async fn export<E, B>(
        &self,
        source: &str,
        settings: &RenderSettings,
        engine: &E,
        backend: &B,
    ) -> Result<ExportReport>
    where
        E: DiagramEngine,
        B: ExportBackend,
    {
        settings.validate()?;
        let geometry = PrintGeometry::new(settings)?;
        let width = geometry.content_width_px();
        let mut surface = ExportSurface::open(settings.font_size_px(), Arc::clone(&self.live));
        let mut report = ExportReport::default();

        log::info!(
            "Exporting via {} backend: {} {}",
            backend.name(),
            geometry.paper,
            geometry.orientation
        );

        let doc = self.renderer.render_document(source, settings);
        report.title = doc.title_or(DEFAULT_TITLE).to_string();
        surface.container_mut().replace_content(doc.blocks);

        report.diagrams_ready = true;
        if settings.features.diagrams && surface.container().diagrams().next().is_some() {
            report.diagrams_ready = self
                .settle_diagrams(surface.container_mut(), engine, width)
                .await;
            if !report.diagrams_ready {
                report.warn(format!(
                    "Diagrams did not finish rendering within {}ms; exporting anyway",
                    self.options.diagram_timeout.as_millis()
                ));
            }
        }

        report.layout_ready = self
            .settle_layout(surface.container_mut(), backend, width)
            .await?;
        if !report.layout_ready {
            report.warn(format!(
                "Layout did not settle within {}ms; exporting anyway",
                self.options.layout_timeout.as_millis()
            ));
        }

        let date = self
            .options
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let context = TemplateContext::new(report.title.clone(), date);
        let document = self.assemble(surface.container(), settings, geometry, context);

        match backend.hand_off(&document).await? {
            HandOff::Delegated { output } => {
                let page_tokens = [&document.header_template, &document.footer_template]
                    .into_iter()
                    .flatten()
                    .any(|template| template.uses_page_tokens());
                if page_tokens {
                    log::debug!(
                        "Backend '{}' paginates on its own; page-number tokens left blank",
                        backend.name()
                    );
                }
                report.output = output;
            }
            HandOff::Paginated(mut paged) => {
                paged.stamp(
                    document.header_template.as_ref(),
                    document.footer_template.as_ref(),
                    &document.context,
                );
                report.page_count = Some(paged.page_count());
                report.output = backend.finish(paged).await?;
            }
        }

        log::info!(
            "Export of '{}' finished{}",
            report.title,
            report
                .page_count
                .map(|n| format!(" ({} pages)", n))
                .unwrap_or_default()
        );
        Ok(report)
    }

    /// Render diagrams on the surface, then poll until each has a box.
    async fn settle_diagrams<E: DiagramEngine>(
        &self,
        container: &mut Container,
        engine: &E,
        width: f32,
    ) -> bool {
        let deadline = Instant::now() + self.options.diagram_timeout;
        let overlay = DiagramOverlay::new();

        let pass = overlay.render(container, engine, self.options.overlay);
        if tokio::time::timeout_at(deadline, pass).await.is_err() {
            return false;
        }

        loop {
            container.layout(width);
            if container.diagrams_settled() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Wait for fonts, then poll until the container has a non-zero box
    /// or lays out at zero height.
    async fn settle_layout<B: ExportBackend>(
        &self,
        container: &mut Container,
        backend: &B,
        width: f32,
    ) -> Result<bool> {
        let deadline = Instant::now() + self.options.layout_timeout;

        match tokio::time::timeout_at(deadline, backend.fonts_ready()).await {
            Ok(ready) => ready?,
            Err(_) => return Ok(false),
        }

        loop {
            container.layout(width);
            let (w, h) = container.bounding_size();
            if container.is_empty() || container.is_collapsed() || (w > 0.0 && h > 0.0) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    fn assemble(
        &self,
        container: &Container,
        settings: &RenderSettings,
        geometry: PrintGeometry,
        context: TemplateContext,
    ) -> AssembledDocument {
        let styling = self.options.styling;
        let blocks = container
            .blocks()
            .map(|block: &ContentBlock| {
                let html = block.to_html();
                AssembledBlock {
                    html: match styling {
                        ExportStyling::Inline => apply_inline_styles(&html),
                        ExportStyling::Stylesheet => html.into_owned(),
                    },
                    layout: block.layout.unwrap_or_default(),
                    page_break: block.is_page_break(),
                }
            })
            .collect();

        let mut css = base_stylesheet(settings);
        let root = match styling {
            ExportStyling::Inline => Some(root_style(settings)),
            ExportStyling::Stylesheet => {
                css.push_str(&scoped_stylesheet(settings));
                None
            }
        };

        let header_template = settings.header.active_template().cloned();
        let footer_template = settings.footer.active_template().cloned();

        AssembledDocument {
            title: context.title.clone(),
            blocks,
            geometry,
            styling,
            css,
            root_style: root,
            header: header_template.as_ref().map(|t| t.render(&context)),
            footer: footer_template.as_ref().map(|t| t.render(&context)),
            header_template,
            footer_template,
            context,
        }
    }
}

impl Default for ExportAssembler {
    fn default() -> Self {
        Self::new()
    }
}
