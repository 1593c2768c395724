//! Integration tests for content rendering and the preview session.

use std::time::Duration;

use paperdown::diagram::{DiagramEngine, DiagramError};
use paperdown::export::PrintDocumentBackend;
use paperdown::session::{Action, Debouncer, KeyChord, PreviewSession};
use paperdown::{render_html, ContentRenderer, Error, RenderSettings};
use tempfile::TempDir;

struct NullEngine;

impl DiagramEngine for NullEngine {
    async fn render(&self, _id: &str, _source: &str) -> Result<String, DiagramError> {
        Ok(r#"<svg width="120" height="60"></svg>"#.to_string())
    }
}

fn settings() -> RenderSettings {
    RenderSettings::new().with_highlighting(false)
}

// ==================== Renderer Tests ====================

#[test]
fn test_full_document() {
    let source = "\
# Guide

Intro with *emphasis* and `code`.

- [x] done
- [ ] open

| k | v |
|---|---|
| a | 1 |

---

<!-- page-break -->

```rust
fn main() {}
```
";
    let doc = ContentRenderer::new().render_document(source, &settings());
    let stats = &doc.stats;

    assert_eq!(doc.title.as_deref(), Some("Guide"));
    assert_eq!(stats.heading_count, 1);
    assert_eq!(stats.list_count, 1);
    assert_eq!(stats.list_item_count, 2);
    assert_eq!(stats.table_count, 1);
    assert_eq!(stats.horizontal_rule_count, 1);
    assert_eq!(stats.page_break_count, 1);
    assert_eq!(stats.code_block_count, 1);

    let html = doc.to_html();
    assert!(html.contains("<hr />"));
    assert_eq!(html.matches("<div class=\"page-break\"></div>").count(), 1);
    assert!(html.contains("type=\"checkbox\""));
    assert!(html.contains("<code class=\"language-rust\">"));
}

#[test]
fn test_block_indices_follow_document_order() {
    let doc = ContentRenderer::new().render_document("a\n\nb\n\nc\n", &settings());
    let indices: Vec<_> = doc.blocks.iter().map(|b| b.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn test_each_token_one_marker() {
    let html = render_html(
        "<!-- pagebreak -->\n\n<!-- PAGEBREAK -->\n\n<!--  page-break  -->\n",
        &settings(),
    );
    assert_eq!(html.matches("class=\"page-break\"").count(), 3);
}

#[test]
fn test_inline_comment_is_not_a_break() {
    let html = render_html("text <!-- pagebreak --> more\n", &settings());
    assert!(!html.contains("class=\"page-break\""));
}

#[test]
fn test_settings_roundtrip_through_json() {
    let json = r#"{ "paper": "letter", "orientation": "landscape", "font_size": 12,
                    "features": { "diagrams": false },
                    "footer": { "enabled": true, "template": "{pageNumber}" } }"#;
    let settings = RenderSettings::from_json(json).unwrap();
    assert_eq!(settings.font_size, 12);
    assert!(settings.geometry.is_landscape());
    assert!(!settings.features.diagrams);
    assert!(settings.features.highlighting);
    assert!(settings.footer.active_template().is_some());
}

// ==================== Session Tests ====================

#[tokio::test]
async fn test_session_cycle() {
    let mut session = PreviewSession::new(settings()).unwrap();
    let source = format!(
        "# Notes\n\n```mermaid\ngraph TD; A-->B\n```\n\n{}",
        "Filler paragraph text.\n\n".repeat(120)
    );

    let frame = session.refresh(&source, &NullEngine).await;
    assert!(frame.diagrams_ok);
    assert!(frame.estimate.total_pages > 1);
    assert_eq!(
        frame.html.matches("page-break-indicator auto").count() as u32,
        frame.estimate.total_pages - 1
    );
    assert!(frame.html.contains("<svg width=\"120\""));

    let narrow = settings().with_font_size(10);
    let smaller = session.update_settings(narrow, &NullEngine).await.unwrap();
    assert!(smaller.estimate.total_pages <= frame.estimate.total_pages);
}

#[tokio::test]
async fn test_session_export_notice_once() {
    let dir = TempDir::new().unwrap();
    let mut session = PreviewSession::new(settings()).unwrap();
    session.refresh("# Doc\n\ntext\n", &NullEngine).await;

    let bad = PrintDocumentBackend::new(dir.path().join("missing").join("x.html"));
    let result = session.export(&NullEngine, &bad).await;
    assert!(matches!(result, Err(Error::Backend(_))));
    assert!(!session.is_exporting());

    let notice = session.take_notice().unwrap();
    assert!(notice.starts_with("Export failed"));
    assert!(session.take_notice().is_none());

    let good = PrintDocumentBackend::new(dir.path().join("x.html"));
    let report = session.export(&NullEngine, &good).await.unwrap();
    assert_eq!(report.title, "Doc");
    assert!(session.take_notice().is_none());
    assert_eq!(session.live_export_surfaces(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_debounced_edits_render_once() {
    let debouncer = Debouncer::new(Duration::from_millis(300));
    let mut session = PreviewSession::new(settings()).unwrap();
    let mut renders = 0;

    let mut tickets = Vec::new();
    for _ in 0..5 {
        tickets.push(debouncer.schedule());
        tokio::time::advance(Duration::from_millis(50)).await;
    }
    for ticket in tickets {
        if debouncer.settle(ticket).await {
            session.refresh("edited\n", &NullEngine).await;
            renders += 1;
        }
    }

    assert_eq!(renders, 1);
    assert_eq!(session.source(), "edited\n");
}

#[test]
fn test_shortcut_maps_to_export() {
    let session = PreviewSession::new(settings()).unwrap();
    assert_eq!(session.handle_key("Ctrl+S".parse::<KeyChord>().unwrap()), Some(Action::Export));
    assert_eq!(session.handle_key("Cmd+S".parse::<KeyChord>().unwrap()), Some(Action::Export));
}
