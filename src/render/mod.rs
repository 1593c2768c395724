//! Content rendering: Markdown source to HTML blocks.

mod highlight;
mod markdown;
mod options;
mod result;

pub use highlight::{Highlighter, DEFAULT_THEME};
pub use markdown::{is_page_break_token, to_html, ContentRenderer};
pub use options::{
    FeatureToggles, HeaderFooter, RenderSettings, DEFAULT_FONT_SIZE, MAX_FONT_SIZE, MIN_FONT_SIZE,
};
pub use result::{RenderStats, RenderedDocument};
