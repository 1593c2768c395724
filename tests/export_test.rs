//! Integration tests for the export assembler and backends.

use std::cell::Cell;
use std::time::Duration;

use chrono::NaiveDate;
use paperdown::diagram::{DiagramEngine, DiagramError};
use paperdown::export::{
    AssembledDocument, ExportAssembler, ExportBackend, ExportOptions, ExportStyling, HandOff,
    PagedDocumentBackend, PrintDocumentBackend,
};
use paperdown::model::Margins;
use paperdown::{Error, RenderSettings};
use tempfile::TempDir;

const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 300 150"></svg>"#;
const EMPTY_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"></svg>"#;

/// Engine returning a fixed SVG and counting calls.
struct FixedEngine {
    svg: &'static str,
    calls: Cell<usize>,
}

impl FixedEngine {
    fn new(svg: &'static str) -> Self {
        Self {
            svg,
            calls: Cell::new(0),
        }
    }
}

impl DiagramEngine for FixedEngine {
    async fn render(&self, _id: &str, _source: &str) -> Result<String, DiagramError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.svg.to_string())
    }
}

/// Engine that never finishes.
struct HangingEngine;

impl DiagramEngine for HangingEngine {
    async fn render(&self, _id: &str, _source: &str) -> Result<String, DiagramError> {
        std::future::pending().await
    }
}

/// Backend whose hand-off always fails.
struct RejectingBackend;

impl ExportBackend for RejectingBackend {
    fn name(&self) -> &str {
        "rejecting"
    }

    async fn hand_off(&self, _document: &AssembledDocument) -> paperdown::Result<HandOff> {
        Err(Error::Backend("print dialog closed".to_string()))
    }
}

/// Backend whose fonts never load.
struct SlowFontsBackend;

impl ExportBackend for SlowFontsBackend {
    fn name(&self) -> &str {
        "slow-fonts"
    }

    async fn fonts_ready(&self) -> paperdown::Result<()> {
        std::future::pending().await
    }

    async fn hand_off(&self, _document: &AssembledDocument) -> paperdown::Result<HandOff> {
        Ok(HandOff::Delegated { output: None })
    }
}

fn options() -> ExportOptions {
    ExportOptions::new().with_date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
}

fn settings() -> RenderSettings {
    RenderSettings::new().with_highlighting(false)
}

const DOC: &str = "# Quarterly Report\n\nIntro paragraph.\n\n<!-- pagebreak -->\n\n## Details\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";

// ==================== Print Backend Tests ====================

#[tokio::test(start_paused = true)]
async fn test_print_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.html");
    let assembler = ExportAssembler::with_options(options());
    let settings = settings()
        .with_header("{title} - {date}")
        .with_footer("Page {pageNumber} of {totalPages}");

    let report = assembler
        .export(DOC, &settings, &FixedEngine::new(SVG), &PrintDocumentBackend::new(&path))
        .await
        .unwrap();

    assert_eq!(report.title, "Quarterly Report");
    assert_eq!(report.page_count, None);
    assert!(report.is_clean());
    assert_eq!(report.output.as_deref(), Some(path.as_path()));

    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("@page { size: A4 portrait; margin: 20mm 10mm 20mm 10mm; }"));
    assert!(html.contains("<div class=\"paperdown-header\">Quarterly Report - 2024-03-09</div>"));
    assert!(html.contains("<div class=\"paperdown-footer\">Page  of </div>"));
    assert!(html.contains("<div class=\"page-break\" style=\"break-before: page;"));
    assert!(html.contains("<h1 style="));
    assert!(html.contains("<table style=\"border-collapse: collapse;"));
    assert!(!html.contains("page-break-indicator"));
}

#[tokio::test(start_paused = true)]
async fn test_default_title() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.html");
    let assembler = ExportAssembler::with_options(options());

    let report = assembler
        .export(
            "## Not a title\n\ntext\n",
            &settings().with_header("{title}"),
            &FixedEngine::new(SVG),
            &PrintDocumentBackend::new(&path),
        )
        .await
        .unwrap();

    assert_eq!(report.title, "Document");
    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("<title>Document</title>"));
}

#[tokio::test(start_paused = true)]
async fn test_stylesheet_styling() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.html");
    let assembler =
        ExportAssembler::with_options(options().with_styling(ExportStyling::Stylesheet));

    assembler
        .export(DOC, &settings(), &FixedEngine::new(SVG), &PrintDocumentBackend::new(&path))
        .await
        .unwrap();

    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains(".paperdown-export h1 {"));
    assert!(html.contains("<h1>Quarterly Report</h1>"));
    assert!(html.contains("<div class=\"paperdown-export\">"));
}

// ==================== Paged Backend Tests ====================

#[tokio::test(start_paused = true)]
async fn test_paged_document_numbers_pages() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("paged.html");
    let assembler = ExportAssembler::with_options(options());
    let settings = settings().with_footer("Page {pageNumber} of {totalPages}");

    let report = assembler
        .export(DOC, &settings, &FixedEngine::new(SVG), &PagedDocumentBackend::new(&path))
        .await
        .unwrap();

    assert_eq!(report.page_count, Some(2));
    let html = std::fs::read_to_string(&path).unwrap();
    assert_eq!(html.matches("<section class=\"paperdown-page\"").count(), 2);
    assert!(html.contains("Page 1 of 2"));
    assert!(html.contains("Page 2 of 2"));
}

#[tokio::test(start_paused = true)]
async fn test_paged_document_overflow() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("paged.html");
    let assembler = ExportAssembler::with_options(options());
    let source = "A line of body text for the paged export.\n\n".repeat(150);

    let report = assembler
        .export(&source, &settings(), &FixedEngine::new(SVG), &PagedDocumentBackend::new(&path))
        .await
        .unwrap();

    assert!(report.page_count.unwrap() > 1);
}

// ==================== Diagram Tests ====================

#[tokio::test(start_paused = true)]
async fn test_diagrams_rendered_before_export() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.html");
    let engine = FixedEngine::new(SVG);
    let assembler = ExportAssembler::with_options(options());

    let report = assembler
        .export(
            "# D\n\n```mermaid\ngraph TD; A-->B\n```\n",
            &settings(),
            &engine,
            &PrintDocumentBackend::new(&path),
        )
        .await
        .unwrap();

    assert!(report.diagrams_ready);
    assert_eq!(engine.calls.get(), 1);
    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("viewBox=\"0 0 300 150\""));
}

#[tokio::test(start_paused = true)]
async fn test_zero_size_diagram_times_out_with_warning() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.html");
    let assembler = ExportAssembler::with_options(options());
    let start = tokio::time::Instant::now();

    let report = assembler
        .export(
            "# D\n\n```mermaid\ngraph TD; A-->B\n```\n",
            &settings(),
            &FixedEngine::new(EMPTY_SVG),
            &PrintDocumentBackend::new(&path),
        )
        .await
        .unwrap();

    assert!(!report.diagrams_ready);
    assert!(report.layout_ready);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("5000ms"));
    assert!(start.elapsed() >= Duration::from_millis(5000));
    assert!(path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_hanging_engine_bounded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.html");
    let assembler = ExportAssembler::with_options(
        options().with_diagram_timeout(Duration::from_millis(250)),
    );

    let report = assembler
        .export(
            "```mermaid\ngraph TD; A-->B\n```\n",
            &settings(),
            &HangingEngine,
            &PrintDocumentBackend::new(&path),
        )
        .await
        .unwrap();

    assert!(!report.diagrams_ready);
    assert!(report.warnings[0].contains("250ms"));
}

#[tokio::test(start_paused = true)]
async fn test_diagrams_disabled_skips_engine() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.html");
    let engine = FixedEngine::new(SVG);
    let assembler = ExportAssembler::with_options(options());

    let report = assembler
        .export(
            "```mermaid\ngraph TD; A-->B\n```\n",
            &settings().with_diagrams(false),
            &engine,
            &PrintDocumentBackend::new(&path),
        )
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(engine.calls.get(), 0);
    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("language-mermaid"));
}

// ==================== Layout Wait Tests ====================

#[tokio::test(start_paused = true)]
async fn test_font_wait_bounded() {
    let assembler = ExportAssembler::with_options(options());

    let report = assembler
        .export(DOC, &settings(), &FixedEngine::new(SVG), &SlowFontsBackend)
        .await
        .unwrap();

    assert!(!report.layout_ready);
    assert!(report.warnings[0].contains("3000ms"));
}

#[tokio::test(start_paused = true)]
async fn test_zero_height_document_settles_immediately() {
    let dir = TempDir::new().unwrap();
    let assembler = ExportAssembler::with_options(options());

    for (i, source) in ["<!-- pagebreak -->\n", "<!-- just a note -->\n"].iter().enumerate() {
        let path = dir.path().join(format!("blank-{}.html", i));
        let start = tokio::time::Instant::now();

        let report = assembler
            .export(source, &settings(), &FixedEngine::new(SVG), &PrintDocumentBackend::new(&path))
            .await
            .unwrap();

        assert!(report.layout_ready);
        assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(path.exists());
    }
}

// ==================== Cleanup Tests ====================

#[tokio::test(start_paused = true)]
async fn test_surface_released_after_success() {
    let dir = TempDir::new().unwrap();
    let assembler = ExportAssembler::with_options(options());

    assembler
        .export(
            DOC,
            &settings(),
            &FixedEngine::new(SVG),
            &PrintDocumentBackend::new(dir.path().join("out.html")),
        )
        .await
        .unwrap();

    assert_eq!(assembler.live_surfaces(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_surface_released_after_backend_failure() {
    let assembler = ExportAssembler::with_options(options());

    let result = assembler
        .export(DOC, &settings(), &FixedEngine::new(SVG), &RejectingBackend)
        .await;

    assert!(matches!(result, Err(Error::Backend(_))));
    assert_eq!(assembler.live_surfaces(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unwritable_output_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("out.html");
    let assembler = ExportAssembler::with_options(options());

    let result = assembler
        .export(DOC, &settings(), &FixedEngine::new(SVG), &PrintDocumentBackend::new(&path))
        .await;

    assert!(matches!(result, Err(Error::Backend(_))));
    assert_eq!(assembler.live_surfaces(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_geometry_rejected() {
    let assembler = ExportAssembler::with_options(options());
    let settings = settings().with_margins(Margins::uniform(150.0));

    let result = assembler
        .export(DOC, &settings, &FixedEngine::new(SVG), &RejectingBackend)
        .await;

    assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    assert_eq!(assembler.live_surfaces(), 0);
}
