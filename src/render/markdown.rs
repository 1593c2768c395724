//! Markdown to HTML content rendering.
//!
//! The source is parsed with `pulldown-cmark` and split into top-level
//! blocks. Each block keeps its HTML and plain text so the layout engine can
//! measure it and the diagram overlay can update diagram blocks in place.

use super::highlight::Highlighter;
use super::options::RenderSettings;
use super::result::RenderedDocument;
use crate::model::{
    escape_html, BlockKind, ContentBlock, DiagramNode, DIAGRAM_LANGUAGE, PAGE_BREAK_CLASS,
};
use pulldown_cmark::{html, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

/// Render Markdown to an HTML fragment with a shared renderer.
pub fn to_html(source: &str, settings: &RenderSettings) -> String {
    ContentRenderer::new().render(source, settings)
}

/// Check if a raw HTML block is a manual page-break token.
///
/// Accepts `<!-- pagebreak -->` and `<!-- page-break -->`, case-insensitive,
/// with any whitespace inside the comment.
pub fn is_page_break_token(html: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?i)^\s*<!--\s*page-?break\s*-->\s*$").expect("page-break pattern")
        })
        .is_match(html)
}

/// Markdown content renderer.
///
/// The highlighter is loaded on first use, so renderers used with
/// highlighting disabled never pay for the syntax set.
pub struct ContentRenderer {
    highlighter: OnceLock<Highlighter>,
}

impl ContentRenderer {
    /// Create a new renderer.
    pub fn new() -> Self {
        Self {
            highlighter: OnceLock::new(),
        }
    }

    /// Create a renderer with a preconfigured highlighter.
    pub fn with_highlighter(highlighter: Highlighter) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(highlighter);
        Self { highlighter: cell }
    }

    /// Render Markdown to an HTML fragment.
    ///
    /// Never fails: an internal failure yields a visible
    /// `<div class="render-error">` placeholder.
    pub fn render(&self, source: &str, settings: &RenderSettings) -> String {
        self.render_document(source, settings).to_html()
    }

    /// Render Markdown to ordered top-level blocks.
    pub fn render_document(&self, source: &str, settings: &RenderSettings) -> RenderedDocument {
        match panic::catch_unwind(AssertUnwindSafe(|| self.render_blocks(source, settings))) {
            Ok(doc) => {
                log::debug!(
                    "Rendered {} blocks ({} diagrams, {} page breaks)",
                    doc.stats.block_count,
                    doc.stats.diagram_count,
                    doc.stats.page_break_count
                );
                doc
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Content rendering failed: {}", message);
                RenderedDocument::failed(&message)
            }
        }
    }

    fn render_blocks(&self, source: &str, settings: &RenderSettings) -> RenderedDocument {
        let parser = Parser::new_ext(source, parser_options(settings));
        let mut blocks: Vec<ContentBlock> = Vec::new();
        let mut title = None;
        let mut diagrams = 0usize;
        let mut group = Vec::new();
        let mut depth = 0usize;

        for event in parser {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                _ => {}
            }
            group.push(event);

            if depth == 0 {
                let events = std::mem::take(&mut group);
                let block = self.build_block(blocks.len(), events, settings, &mut diagrams);
                if title.is_none() && block.heading_level() == Some(1) {
                    title = Some(block.text.clone());
                }
                blocks.push(block);
            }
        }

        if !group.is_empty() {
            let block = self.build_block(blocks.len(), group, settings, &mut diagrams);
            blocks.push(block);
        }

        RenderedDocument::new(blocks, title)
    }

    fn build_block(
        &self,
        index: usize,
        events: Vec<Event<'_>>,
        settings: &RenderSettings,
        diagrams: &mut usize,
    ) -> ContentBlock {
        if let Some(Event::Start(Tag::CodeBlock(kind))) = events.first() {
            let language = code_language(kind);
            let code = collect_text(&events);
            return self.build_code_block(index, language, code, settings, diagrams);
        }

        if matches!(events.first(), Some(Event::Start(Tag::HtmlBlock)))
            && is_page_break_token(&collect_html(&events))
        {
            return ContentBlock::page_break(index);
        }

        let kind = classify(&events);
        let text = plain_text(&events);
        let lowered = self.lower_events(events, settings);
        let mut html_out = String::new();
        html::push_html(&mut html_out, lowered.into_iter());
        ContentBlock::new(index, kind, html_out, text)
    }

    fn build_code_block(
        &self,
        index: usize,
        language: Option<String>,
        code: String,
        settings: &RenderSettings,
        diagrams: &mut usize,
    ) -> ContentBlock {
        if settings.features.diagrams && language.as_deref() == Some(DIAGRAM_LANGUAGE) {
            let source = code.trim_end_matches('\n').to_string();
            let node = DiagramNode::new(*diagrams, source.clone());
            *diagrams += 1;
            return ContentBlock::new(index, BlockKind::Diagram(node), "", source);
        }

        let html_out = self.code_block_html(&code, language.as_deref(), settings);
        let lines = code.lines().count().max(1);
        ContentBlock::new(
            index,
            BlockKind::CodeBlock { language, lines },
            html_out,
            code,
        )
    }

    /// Rewrite events that `push_html` cannot emit the way the preview needs:
    /// nested code blocks are highlighted, nested page-break tokens become
    /// marker elements, and soft breaks become hard breaks.
    fn lower_events<'a>(&self, events: Vec<Event<'a>>, settings: &RenderSettings) -> Vec<Event<'a>> {
        let mut out = Vec::with_capacity(events.len());
        let mut code: Option<(Option<String>, String)> = None;

        for event in events {
            if let Some((language, mut buf)) = code.take() {
                match event {
                    Event::End(TagEnd::CodeBlock) => {
                        let html_out = self.code_block_html(&buf, language.as_deref(), settings);
                        out.push(Event::Html(html_out.into()));
                    }
                    Event::Text(text) => {
                        buf.push_str(&text);
                        code = Some((language, buf));
                    }
                    _ => code = Some((language, buf)),
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    code = Some((code_language(&kind), String::new()));
                }
                Event::SoftBreak => out.push(Event::HardBreak),
                Event::Html(ref raw) if is_page_break_token(raw) => {
                    out.push(Event::Html(page_break_html().into()));
                }
                other => out.push(other),
            }
        }

        out
    }

    fn code_block_html(&self, code: &str, language: Option<&str>, settings: &RenderSettings) -> String {
        let body = if settings.features.highlighting {
            match self.highlighter().highlight(code, language) {
                Ok(highlighted) => highlighted,
                Err(e) => {
                    log::warn!(
                        "Highlighting failed for {} block: {}",
                        language.unwrap_or("unlabelled"),
                        e
                    );
                    escape_html(code)
                }
            }
        } else {
            escape_html(code)
        };

        match language {
            Some(lang) => format!(
                "<pre><code class=\"language-{}\">{}</code></pre>\n",
                escape_html(lang),
                body
            ),
            None => format!("<pre><code>{}</code></pre>\n", body),
        }
    }

    fn highlighter(&self) -> &Highlighter {
        self.highlighter.get_or_init(Highlighter::new)
    }
}

impl Default for ContentRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn parser_options(settings: &RenderSettings) -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    if settings.features.typography {
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
    }
    options
}

fn page_break_html() -> String {
    format!("<div class=\"{}\"></div>\n", PAGE_BREAK_CLASS)
}

fn code_language(kind: &CodeBlockKind<'_>) -> Option<String> {
    match kind {
        CodeBlockKind::Fenced(info) => info
            .split_whitespace()
            .next()
            .map(|lang| lang.to_lowercase()),
        CodeBlockKind::Indented => None,
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn classify(events: &[Event<'_>]) -> BlockKind {
    match events.first() {
        Some(Event::Start(Tag::Heading { level, .. })) => BlockKind::Heading {
            level: heading_level(*level),
        },
        Some(Event::Start(Tag::List(_))) => BlockKind::List {
            items: events
                .iter()
                .filter(|e| matches!(e, Event::Start(Tag::Item)))
                .count(),
        },
        Some(Event::Start(Tag::BlockQuote(_))) => BlockKind::BlockQuote,
        Some(Event::Start(Tag::Table(_))) => BlockKind::Table {
            rows: table_rows(events),
        },
        Some(Event::Start(Tag::HtmlBlock)) => BlockKind::Html,
        Some(Event::Rule) => BlockKind::Rule,
        _ => BlockKind::Paragraph,
    }
}

fn table_rows(events: &[Event<'_>]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut cell: Option<String> = None;

    for event in events {
        match event {
            Event::Start(Tag::TableHead) | Event::Start(Tag::TableRow) => rows.push(Vec::new()),
            Event::Start(Tag::TableCell) => cell = Some(String::new()),
            Event::Text(text) | Event::Code(text) => {
                if let Some(ref mut c) = cell {
                    c.push_str(text);
                }
            }
            Event::End(TagEnd::TableCell) => {
                if let (Some(c), Some(row)) = (cell.take(), rows.last_mut()) {
                    row.push(c);
                }
            }
            _ => {}
        }
    }

    rows
}

fn collect_text(events: &[Event<'_>]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Text(text) => Some(text.as_ref()),
            _ => None,
        })
        .collect()
}

fn collect_html(events: &[Event<'_>]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Html(raw) => Some(raw.as_ref()),
            _ => None,
        })
        .collect()
}

/// Plain text of a block, one line per paragraph, item or row.
fn plain_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();

    for event in events {
        match event {
            Event::Text(t)
            | Event::Code(t)
            | Event::InlineMath(t)
            | Event::DisplayMath(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::TableCell) => text.push(' '),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::TableHead
                | TagEnd::TableRow
                | TagEnd::CodeBlock
                | TagEnd::BlockQuote(_),
            ) => {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }

    text.trim_end().to_string()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown error".to_string()
    }
}
