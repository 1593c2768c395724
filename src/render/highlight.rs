//! Syntax highlighting for code blocks.

use crate::error::Result;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// Theme used when the caller does not pick one.
pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Highlights code into inline-styled HTML spans.
///
/// Styles are emitted as `style` attributes so highlighted code looks the
/// same in the live preview and in the detached export document.
pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    /// Create a highlighter with the default syntax set and theme.
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Create a highlighter with a named built-in theme.
    ///
    /// Unknown names fall back to the first available theme.
    pub fn with_theme(name: &str) -> Self {
        let mut themes = ThemeSet::load_defaults();
        let theme = match themes.themes.remove(name) {
            Some(theme) => theme,
            None => {
                log::warn!("Unknown highlighting theme '{}', using fallback", name);
                themes.themes.into_values().next().unwrap_or_default()
            }
        };
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    /// Highlight `code` using the declared language or first-line detection.
    pub fn highlight(&self, code: &str, language: Option<&str>) -> Result<String> {
        let syntax = self.resolve_syntax(code, language);
        let mut lines = HighlightLines::new(syntax, &self.theme);
        let mut output = String::with_capacity(code.len() * 2);

        for line in LinesWithEndings::from(code) {
            let regions = lines.highlight_line(line, &self.syntaxes)?;
            output.push_str(&styled_line_to_highlighted_html(
                &regions[..],
                IncludeBackground::No,
            )?);
        }

        Ok(output)
    }

    /// Name of the syntax that would be used for a block.
    #[cfg(test)]
    pub(crate) fn syntax_name(&self, code: &str, language: Option<&str>) -> &str {
        &self.resolve_syntax(code, language).name
    }

    fn resolve_syntax(&self, code: &str, language: Option<&str>) -> &SyntaxReference {
        language
            .and_then(|lang| {
                self.syntaxes
                    .find_syntax_by_token(lang)
                    .or_else(|| self.syntaxes.find_syntax_by_extension(lang))
            })
            .or_else(|| {
                code.lines()
                    .next()
                    .and_then(|first| self.syntaxes.find_syntax_by_first_line(first))
            })
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_declared_language() {
        let highlighter = Highlighter::new();
        let html = highlighter
            .highlight("fn main() {}\n", Some("rust"))
            .unwrap();
        assert!(html.contains("<span style=\""));
        assert!(html.contains("main"));
        assert_eq!(highlighter.syntax_name("fn main() {}", Some("rust")), "Rust");
    }

    #[test]
    fn test_highlight_escapes_markup() {
        let highlighter = Highlighter::new();
        let html = highlighter.highlight("<b>&</b>\n", Some("txt")).unwrap();
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_first_line_detection() {
        let highlighter = Highlighter::new();
        let name = highlighter.syntax_name("#!/bin/bash\necho hi\n", None);
        assert!(name.contains("Bash") || name.contains("Shell"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain_text() {
        let highlighter = Highlighter::new();
        assert_eq!(
            highlighter.syntax_name("hello", Some("no-such-language")),
            "Plain Text"
        );
    }
}
