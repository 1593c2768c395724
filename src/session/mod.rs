//! Editor-facing glue: one preview session over a settings snapshot.
//!
//! A [`PreviewSession`] runs the render → diagram → estimate cycle for the
//! live preview and drives exports. Hosts debounce edits with a
//! [`Debouncer`] and map key presses through [`KeyChord::action`].

mod debounce;
mod keymap;

pub use debounce::{DebounceTicket, Debouncer, DEFAULT_DEBOUNCE};
pub use keymap::{Action, KeyChord, Modifiers};

use crate::diagram::{DiagramEngine, DiagramOverlay, OverlayOptions};
use crate::error::{Error, Result};
use crate::export::{ExportAssembler, ExportBackend, ExportOptions, ExportReport};
use crate::layout::{Container, PageEstimate, PaginationEstimator};
use crate::render::{ContentRenderer, RenderSettings, RenderStats};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Output of one preview cycle.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    /// Preview HTML with automatic page-break markers
    pub html: String,

    /// Page count estimate
    pub estimate: PageEstimate,

    /// Whether every diagram rendered
    pub diagrams_ok: bool,

    /// Document statistics
    pub stats: RenderStats,

    /// Title from the first level-1 heading
    pub title: Option<String>,
}

/// Clears the busy flag when an export ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Live preview state for one document.
pub struct PreviewSession {
    settings: RenderSettings,
    renderer: ContentRenderer,
    overlay: DiagramOverlay,
    overlay_options: OverlayOptions,
    estimator: PaginationEstimator,
    container: Container,
    assembler: ExportAssembler,
    source: String,
    busy: AtomicBool,
    notice: Mutex<Option<String>>,
}

impl PreviewSession {
    /// Create a session for a settings snapshot.
    pub fn new(settings: RenderSettings) -> Result<Self> {
        settings.validate()?;
        let container = Container::new(settings.font_size_px());
        Ok(Self {
            settings,
            renderer: ContentRenderer::new(),
            overlay: DiagramOverlay::new(),
            overlay_options: OverlayOptions::new(),
            estimator: PaginationEstimator::new(),
            container,
            assembler: ExportAssembler::new(),
            source: String::new(),
            busy: AtomicBool::new(false),
            notice: Mutex::new(None),
        })
    }

    /// Use export options for [`PreviewSession::export`].
    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.assembler = ExportAssembler::with_options(options);
        self
    }

    /// Use a pagination estimator.
    pub fn with_estimator(mut self, estimator: PaginationEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Set preview diagram options.
    pub fn with_overlay_options(mut self, options: OverlayOptions) -> Self {
        self.overlay_options = options;
        self
    }

    /// Current settings.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// The live preview container.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Handle to the overlay's generation counter.
    ///
    /// Starting a pass through any clone makes earlier passes stale.
    pub fn overlay(&self) -> &DiagramOverlay {
        &self.overlay
    }

    /// Source of the last refresh.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run one full cycle for `source`.
    pub async fn refresh<E: DiagramEngine>(&mut self, source: &str, engine: &E) -> PreviewFrame {
        source.clone_into(&mut self.source);
        self.cycle(engine).await
    }

    /// Replace the settings and run the cycle again on the last source.
    pub async fn update_settings<E: DiagramEngine>(
        &mut self,
        settings: RenderSettings,
        engine: &E,
    ) -> Result<PreviewFrame> {
        settings.validate()?;
        self.container.set_font_size(settings.font_size_px());
        self.settings = settings;
        Ok(self.cycle(engine).await)
    }

    async fn cycle<E: DiagramEngine>(&mut self, engine: &E) -> PreviewFrame {
        let doc = self.renderer.render_document(&self.source, &self.settings);
        let stats = doc.stats.clone();
        let title = doc.title.clone();
        self.container.replace_content(doc.blocks);

        let diagrams_ok = if self.settings.features.diagrams {
            self.overlay
                .render(&mut self.container, engine, self.overlay_options)
                .await
        } else {
            true
        };

        let estimate = self
            .estimator
            .estimate(&mut self.container, &self.settings.geometry);
        log::debug!(
            "Preview refreshed: {} page(s), {} block(s)",
            estimate.total_pages,
            stats.block_count
        );

        PreviewFrame {
            html: self.container.to_html(),
            estimate,
            diagrams_ok,
            stats,
            title,
        }
    }

    /// Map a key press to an action.
    pub fn handle_key(&self, chord: KeyChord) -> Option<Action> {
        chord.action()
    }

    /// Check if an export is running.
    pub fn is_exporting(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Export the last refreshed source.
    ///
    /// A second export while one is running is rejected. On failure a single
    /// notice is recorded for the host to show; the busy flag is cleared on
    /// every path.
    pub async fn export<E, B>(&self, engine: &E, backend: &B) -> Result<ExportReport>
    where
        E: DiagramEngine,
        B: ExportBackend,
    {
        let _busy = BusyGuard::acquire(&self.busy)
            .ok_or_else(|| Error::Export("an export is already running".to_string()))?;
        self.set_notice(None);

        let result = self
            .assembler
            .export(&self.source, &self.settings, engine, backend)
            .await;
        if let Err(ref e) = result {
            log::error!("Export failed: {}", e);
            self.set_notice(Some(format!("Export failed: {}", e)));
        }
        result
    }

    /// Take the pending user-visible notice.
    pub fn take_notice(&self) -> Option<String> {
        self.notice.lock().ok().and_then(|mut n| n.take())
    }

    /// Number of export surfaces alive.
    pub fn live_export_surfaces(&self) -> usize {
        self.assembler.live_surfaces()
    }

    fn set_notice(&self, notice: Option<String>) {
        if let Ok(mut slot) = self.notice.lock() {
            *slot = notice;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::DiagramError;

    struct NoDiagrams;

    impl DiagramEngine for NoDiagrams {
        async fn render(&self, _id: &str, _source: &str) -> std::result::Result<String, DiagramError> {
            Err(DiagramError::Unavailable("test".to_string()))
        }
    }

    #[test]
    fn test_busy_guard_releases() {
        let flag = AtomicBool::new(false);
        {
            let _guard = BusyGuard::acquire(&flag).unwrap();
            assert!(BusyGuard::acquire(&flag).is_none());
        }
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_refresh_estimates_pages() {
        let mut session = PreviewSession::new(RenderSettings::new().with_highlighting(false)).unwrap();
        let source = "# Title\n\nSome text.\n";
        let frame = session.refresh(source, &NoDiagrams).await;
        assert_eq!(frame.estimate.total_pages, 1);
        assert_eq!(frame.title.as_deref(), Some("Title"));
        assert!(frame.html.contains("<h1>Title</h1>"));
        assert_eq!(session.source(), source);
    }

    #[tokio::test]
    async fn test_failed_diagram_reported() {
        let mut session = PreviewSession::new(RenderSettings::new()).unwrap();
        let frame = session
            .refresh("```mermaid\ngraph TD; A-->B\n```\n", &NoDiagrams)
            .await;
        assert!(!frame.diagrams_ok);
        assert!(frame.html.contains("diagram-error"));
    }

    #[tokio::test]
    async fn test_update_settings_rejects_invalid() {
        let mut session = PreviewSession::new(RenderSettings::default()).unwrap();
        let bad = RenderSettings::new().with_font_size(200);
        assert!(session.update_settings(bad, &NoDiagrams).await.is_err());
        assert_eq!(session.settings().font_size, 14);
    }

    #[test]
    fn test_handle_key() {
        let session = PreviewSession::new(RenderSettings::default()).unwrap();
        assert_eq!(session.handle_key(KeyChord::ctrl('s')), Some(Action::Export));
        assert_eq!(session.handle_key(KeyChord::plain('s')), None);
    }
}
