//! Deterministic styling for the export surface.
//!
//! The exported document must not depend on preview CSS, so every element
//! the renderer emits gets a fixed style, either as a `style` attribute on
//! the element or as a rule in a stylesheet scoped to the export root.

use crate::model::{DIAGRAM_LANGUAGE, PAGE_BREAK_CLASS};
use crate::render::RenderSettings;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Class of the export root element.
pub const EXPORT_ROOT_CLASS: &str = "paperdown-export";

const BODY_FONT: &str =
    "-apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif";
const MONO_FONT: &str = "SFMono-Regular, Consolas, 'Liberation Mono', Menlo, monospace";
const BORDER: &str = "#d0d7de";
const MUTED: &str = "#57606a";
const CODE_BACKGROUND: &str = "#f6f8fa";

/// How export styles are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStyling {
    /// `style` attributes on every element
    #[default]
    Inline,
    /// One `<style>` block scoped to the export root
    Stylesheet,
}

/// Style for the manual page-break element.
pub fn page_break_style() -> &'static str {
    "break-before: page; page-break-before: always; height: 0; margin: 0; border: 0;"
}

/// Style for the export root element.
pub fn root_style(settings: &RenderSettings) -> String {
    format!(
        "font-family: {}; font-size: {}px; line-height: 1.6; color: #1f2328;",
        BODY_FONT, settings.font_size
    )
}

fn heading_style(level: u8) -> String {
    let size = match level {
        1 => "2em",
        2 => "1.5em",
        3 => "1.25em",
        4 => "1em",
        5 => ".875em",
        _ => ".85em",
    };
    let mut style = format!(
        "font-size: {}; line-height: 1.25; font-weight: 600; margin: 24px 0 16px; break-after: avoid; page-break-after: avoid;",
        size
    );
    if level <= 2 {
        style.push_str(&format!(" padding-bottom: .3em; border-bottom: 1px solid {};", BORDER));
    }
    if level == 6 {
        style.push_str(&format!(" color: {};", MUTED));
    }
    style
}

/// Fixed style for an element, by tag name.
fn element_style(tag: &str) -> Option<String> {
    let style = match tag {
        "h1" => heading_style(1),
        "h2" => heading_style(2),
        "h3" => heading_style(3),
        "h4" => heading_style(4),
        "h5" => heading_style(5),
        "h6" => heading_style(6),
        "pre" => format!(
            "background: {}; padding: 16px; border-radius: 6px; line-height: 1.45; white-space: pre-wrap; word-wrap: break-word; break-inside: avoid; page-break-inside: avoid;",
            CODE_BACKGROUND
        ),
        "code" => format!(
            "font-family: {}; font-size: 85%; background: rgba(175, 184, 193, 0.2); padding: .2em .4em; border-radius: 3px;",
            MONO_FONT
        ),
        "table" => "border-collapse: collapse; width: 100%; margin: 16px 0; break-inside: auto;".to_string(),
        "tr" => "break-inside: avoid; page-break-inside: avoid;".to_string(),
        "th" => format!(
            "border: 1px solid {}; padding: 6px 13px; font-weight: 600; background: {};",
            BORDER, CODE_BACKGROUND
        ),
        "td" => format!("border: 1px solid {}; padding: 6px 13px;", BORDER),
        "blockquote" => format!(
            "margin: 0 0 16px; padding: 0 1em; color: {}; border-left: .25em solid {};",
            MUTED, BORDER
        ),
        "a" => "color: #0969da; text-decoration: none;".to_string(),
        "hr" => format!("border: 0; border-top: 1px solid {}; margin: 24px 0;", BORDER),
        "img" => "max-width: 100%; height: auto;".to_string(),
        _ => return None,
    };
    Some(style)
}

fn pre_code_style() -> String {
    format!(
        "font-family: {}; font-size: 85%; background: transparent; padding: 0;",
        MONO_FONT
    )
}

fn diagram_style() -> &'static str {
    "text-align: center; margin: 0 0 16px; break-inside: avoid; page-break-inside: avoid;"
}

/// Add fixed `style` attributes to the elements of an HTML fragment.
///
/// Elements that already carry a `style` attribute (highlighted spans,
/// sized placeholders) are left alone.
pub fn apply_inline_styles(html: &str) -> String {
    static PRE_CODE: OnceLock<Regex> = OnceLock::new();
    static ELEMENT: OnceLock<Regex> = OnceLock::new();
    static MARKED_DIV: OnceLock<Regex> = OnceLock::new();

    let pre_code = PRE_CODE.get_or_init(|| {
        Regex::new(r"<pre>(\s*)<code(\s[^>]*)?>").expect("pre/code pattern")
    });
    let styled = pre_code.replace_all(html, |caps: &Captures| {
        format!(
            "<pre style=\"{}\">{}<code{} style=\"{}\">",
            element_style("pre").unwrap_or_default(),
            &caps[1],
            caps.get(2).map_or("", |m| m.as_str()),
            pre_code_style()
        )
    });

    let element = ELEMENT.get_or_init(|| {
        Regex::new(r"<(h[1-6]|pre|code|table|tr|th|td|blockquote|a|hr|img)(\s[^>]*?)?(\s*/)?>")
            .expect("element pattern")
    });
    let styled = element.replace_all(&styled, |caps: &Captures| {
        let tag = &caps[1];
        let attrs = caps.get(2).map_or("", |m| m.as_str());
        let close = caps.get(3).map_or("", |m| m.as_str());
        match element_style(tag) {
            Some(style) if !attrs.contains("style=") => {
                format!("<{}{} style=\"{}\"{}>", tag, attrs, style, close)
            }
            _ => caps[0].to_string(),
        }
    });

    let marked_div = MARKED_DIV.get_or_init(|| {
        Regex::new(r#"<div class="([a-z-]+)"([^>]*)>"#).expect("div pattern")
    });
    marked_div
        .replace_all(&styled, |caps: &Captures| {
            let class = &caps[1];
            let rest = &caps[2];
            let style = if class == PAGE_BREAK_CLASS {
                page_break_style()
            } else if class == DIAGRAM_LANGUAGE {
                diagram_style()
            } else {
                return caps[0].to_string();
            };
            if rest.contains("style=") {
                return caps[0].to_string();
            }
            format!("<div class=\"{}\"{} style=\"{}\">", class, rest, style)
        })
        .into_owned()
}

/// Stylesheet scoped to the export root, equivalent to the inline styles.
pub fn scoped_stylesheet(settings: &RenderSettings) -> String {
    let root = format!(".{}", EXPORT_ROOT_CLASS);
    let mut css = format!("{} {{ {} }}\n", root, root_style(settings));

    for tag in [
        "h1", "h2", "h3", "h4", "h5", "h6", "pre", "code", "table", "tr", "th", "td",
        "blockquote", "a", "hr", "img",
    ] {
        if let Some(style) = element_style(tag) {
            css.push_str(&format!("{} {} {{ {} }}\n", root, tag, style));
        }
    }
    css.push_str(&format!("{} pre code {{ {} }}\n", root, pre_code_style()));
    css.push_str(&format!(
        "{} .{} {{ {} }}\n",
        root,
        DIAGRAM_LANGUAGE,
        diagram_style()
    ));
    css.push_str(&format!(
        "{} .{} {{ {} }}\n",
        root,
        PAGE_BREAK_CLASS,
        page_break_style()
    ));
    css
}

/// Rules shared by every export document.
pub fn base_stylesheet(settings: &RenderSettings) -> String {
    let mut css = String::from(
        "html, body { margin: 0; padding: 0; }\n\
         .diagram-error { color: #cf222e; font-size: 85%; margin-top: 8px; }\n\
         .paperdown-header, .paperdown-footer { font-size: 9pt; color: #57606a; text-align: center; }\n",
    );
    if settings.features.print_background {
        css.push_str("* { -webkit-print-color-adjust: exact; print-color-adjust: exact; }\n");
    }
    css
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_styled() {
        let html = apply_inline_styles("<h1>Title</h1>\n<h3>Sub</h3>\n");
        assert!(html.contains("<h1 style=\"font-size: 2em;"));
        assert!(html.contains("<h3 style=\"font-size: 1.25em;"));
    }

    #[test]
    fn test_page_break_gets_break_before() {
        let html = apply_inline_styles("<p>a</p>\n<div class=\"page-break\"></div>\n");
        assert!(html.contains("<div class=\"page-break\" style=\"break-before: page;"));
    }

    #[test]
    fn test_pre_code_styled_once() {
        let html =
            apply_inline_styles("<pre><code class=\"language-rust\"><span style=\"color: #000\">x</span></code></pre>");
        assert!(html.starts_with("<pre style=\"background: #f6f8fa;"));
        assert!(html.contains("<code class=\"language-rust\" style=\"font-family:"));
        assert_eq!(html.matches("style=\"font-family").count(), 1);
        assert!(html.contains("<span style=\"color: #000\">"));
    }

    #[test]
    fn test_inline_code_and_links() {
        let html = apply_inline_styles("<p><code>x</code> <a href=\"https://example.com\">l</a></p>");
        assert!(html.contains("<code style=\"font-family:"));
        assert!(html.contains("<a href=\"https://example.com\" style=\"color: #0969da;"));
    }

    #[test]
    fn test_self_closing_elements() {
        let html = apply_inline_styles("<hr />\n<img src=\"a.png\" alt=\"a\" />");
        assert!(html.contains("<hr style=\"border: 0;"));
        assert!(html.contains(" />"));
        assert!(html.contains("<img src=\"a.png\" alt=\"a\" style=\"max-width: 100%;"));
    }

    #[test]
    fn test_tables_and_quotes() {
        let html = apply_inline_styles(
            "<table><thead><tr><th>a</th></tr></thead><tbody><tr><td>1</td></tr></tbody></table><blockquote><p>q</p></blockquote>",
        );
        assert!(html.contains("<table style=\"border-collapse: collapse;"));
        assert!(html.contains("<th style=\"border: 1px solid"));
        assert!(html.contains("<td style=\"border: 1px solid"));
        assert!(html.contains("<blockquote style=\"margin: 0 0 16px;"));
        assert!(html.contains("<tbody>"));
    }

    #[test]
    fn test_scoped_stylesheet() {
        let css = scoped_stylesheet(&RenderSettings::default());
        assert!(css.contains(".paperdown-export h1 { font-size: 2em;"));
        assert!(css.contains(".paperdown-export .page-break { break-before: page;"));
        assert!(css.contains("font-size: 14px"));
    }

    #[test]
    fn test_print_background() {
        let on = base_stylesheet(&RenderSettings::default());
        let off = base_stylesheet(&RenderSettings::new().with_print_background(false));
        assert!(on.contains("print-color-adjust: exact"));
        assert!(!off.contains("print-color-adjust"));
    }
}
