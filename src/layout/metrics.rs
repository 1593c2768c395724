//! Font metrics used to estimate text extents.

use unicode_normalization::UnicodeNormalization;

/// Average advance of a proportional glyph, in em.
pub const PROPORTIONAL_ADVANCE_EM: f32 = 0.5;

/// Advance of a monospace glyph, in em.
pub const MONOSPACE_ADVANCE_EM: f32 = 0.6;

/// Advance of a wide (CJK, fullwidth) glyph, in em.
pub const WIDE_ADVANCE_EM: f32 = 1.0;

/// Glyph advance table for a base font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Base font size in pixels
    pub font_size: f32,

    /// Proportional glyph advance in em
    pub proportional_advance: f32,

    /// Monospace glyph advance in em
    pub monospace_advance: f32,

    /// Wide glyph advance in em
    pub wide_advance: f32,
}

impl FontMetrics {
    /// Metrics for a base font size with default advances.
    pub fn new(font_size: f32) -> Self {
        Self {
            font_size,
            proportional_advance: PROPORTIONAL_ADVANCE_EM,
            monospace_advance: MONOSPACE_ADVANCE_EM,
            wide_advance: WIDE_ADVANCE_EM,
        }
    }

    /// Width of `text` in pixels at `scale` times the base size.
    pub fn text_width(&self, text: &str, monospace: bool, scale: f32) -> f32 {
        let em = self.font_size * scale;
        text.nfc().map(|c| self.advance(c, monospace)).sum::<f32>() * em
    }

    /// Number of lines `text` wraps to inside `width` pixels.
    ///
    /// Every hard line takes at least one line. Proportional text wraps at
    /// whitespace; a word wider than the line is broken by glyph. Monospace
    /// text never wraps, matching `white-space: pre`.
    pub fn line_count(&self, text: &str, width: f32, monospace: bool, scale: f32) -> usize {
        if text.is_empty() {
            return 0;
        }
        text.split('\n')
            .map(|line| {
                if monospace {
                    1
                } else {
                    self.wrapped_lines(line, width, scale)
                }
            })
            .sum()
    }

    fn wrapped_lines(&self, line: &str, width: f32, scale: f32) -> usize {
        if width <= 0.0 {
            return 1;
        }
        let space = self.text_width(" ", false, scale);
        let mut lines = 1;
        let mut current = 0.0f32;

        for word in line.split_whitespace() {
            let word_width = self.text_width(word, false, scale);
            let needed = if current > 0.0 {
                current + space + word_width
            } else {
                word_width
            };

            if needed <= width {
                current = needed;
                continue;
            }

            if current > 0.0 {
                lines += 1;
            }
            if word_width > width {
                let extra = (word_width / width).ceil() as usize;
                lines += extra - 1;
                current = word_width - (extra - 1) as f32 * width;
            } else {
                current = word_width;
            }
        }

        lines
    }

    fn advance(&self, c: char, monospace: bool) -> f32 {
        if is_zero_width(c) {
            0.0
        } else if is_wide(c) {
            self.wide_advance
        } else if monospace {
            self.monospace_advance
        } else {
            self.proportional_advance
        }
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::new(crate::render::DEFAULT_FONT_SIZE as f32)
    }
}

/// Check if a character is rendered full width (CJK, Hangul, fullwidth forms).
pub fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD)
}

fn is_zero_width(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x200B..=0x200D | 0xFEFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width() {
        let metrics = FontMetrics::new(10.0);
        assert_eq!(metrics.text_width("abcd", false, 1.0), 20.0);
        assert_eq!(metrics.text_width("abcd", true, 1.0), 24.0);
        assert_eq!(metrics.text_width("abcd", false, 2.0), 40.0);
    }

    #[test]
    fn test_wide_glyphs() {
        let metrics = FontMetrics::new(10.0);
        assert_eq!(metrics.text_width("한글", false, 1.0), 20.0);
        assert_eq!(metrics.text_width("漢字", true, 1.0), 20.0);
        assert!(is_wide('가'));
        assert!(!is_wide('a'));
    }

    #[test]
    fn test_decomposed_text_is_normalized() {
        let metrics = FontMetrics::new(10.0);
        // "e" + combining acute composes to a single glyph
        assert_eq!(metrics.text_width("e\u{301}", false, 1.0), 5.0);
    }

    #[test]
    fn test_line_count_wraps_words() {
        let metrics = FontMetrics::new(10.0);
        // Each word is 25px, a space 5px
        assert_eq!(metrics.line_count("aaaaa bbbbb", 60.0, false, 1.0), 1);
        assert_eq!(metrics.line_count("aaaaa bbbbb", 40.0, false, 1.0), 2);
        assert_eq!(metrics.line_count("one\ntwo", 1000.0, false, 1.0), 2);
        assert_eq!(metrics.line_count("", 100.0, false, 1.0), 0);
    }

    #[test]
    fn test_long_word_breaks() {
        let metrics = FontMetrics::new(10.0);
        // 20 glyphs = 100px in a 30px line
        assert_eq!(metrics.line_count(&"x".repeat(20), 30.0, false, 1.0), 4);
    }

    #[test]
    fn test_monospace_does_not_wrap() {
        let metrics = FontMetrics::new(10.0);
        let code = "let value = some_function(argument);\nreturn value;";
        assert_eq!(metrics.line_count(code, 20.0, true, 1.0), 2);
    }
}
