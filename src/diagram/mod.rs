//! Diagram rendering overlay.
//!
//! Diagram blocks are rendered by an external engine after the content
//! render. Each overlay pass captures a [`RenderEpoch`]; results from an
//! older epoch are dropped when they arrive, so a slow render can never
//! overwrite the output of a newer one.

mod command;
mod overlay;

pub use command::{CommandEngine, DEFAULT_DIAGRAM_COMMAND, DEFAULT_DIAGRAM_TIMEOUT};
pub use overlay::{
    summarize_error, CommitStatus, DiagramBatch, DiagramJob, DiagramOutcome, DiagramOverlay,
    OverlayOptions, MAX_ERROR_LENGTH,
};

use regex::Regex;
use std::io;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors reported by a diagram engine.
#[derive(Error, Debug)]
pub enum DiagramError {
    /// The diagram source could not be parsed.
    #[error("{0}")]
    Syntax(String),

    /// The engine could not be started.
    #[error("Diagram engine unavailable: {0}")]
    Unavailable(String),

    /// The engine did not finish in time.
    #[error("Diagram engine timed out after {0}ms")]
    Timeout(u64),

    /// The engine ran but produced no usable output.
    #[error("Diagram engine failed: {0}")]
    Engine(String),

    /// I/O error while exchanging files with the engine.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<DiagramError> for crate::Error {
    fn from(err: DiagramError) -> Self {
        crate::Error::Diagram(err.to_string())
    }
}

/// An external diagram renderer.
///
/// Implementations turn diagram source into an SVG document. Calls are
/// awaited one at a time on a single task.
#[allow(async_fn_in_trait)]
pub trait DiagramEngine {
    /// Render `source` to SVG. `id` is unique within one overlay pass.
    async fn render(&self, id: &str, source: &str) -> Result<String, DiagramError>;
}

/// Generation captured by an overlay pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderEpoch(pub u64);

impl std::fmt::Display for RenderEpoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Intrinsic size of an SVG document in CSS pixels.
///
/// Uses explicit `width`/`height` attributes, then a `max-width` style with
/// the `viewBox` aspect ratio, then the `viewBox` itself.
pub fn svg_size(svg: &str) -> Option<(f32, f32)> {
    static OPEN_TAG: OnceLock<Regex> = OnceLock::new();
    static VIEW_BOX: OnceLock<Regex> = OnceLock::new();
    static MAX_WIDTH: OnceLock<Regex> = OnceLock::new();

    let open_tag = OPEN_TAG.get_or_init(|| Regex::new(r"(?s)<svg\b[^>]*>").expect("svg tag pattern"));
    let tag = open_tag.find(svg)?.as_str();

    let width = length_attribute(tag, "width");
    let height = length_attribute(tag, "height");
    if let (Some(w), Some(h)) = (width, height) {
        return Some((w, h));
    }

    let view_box = VIEW_BOX
        .get_or_init(|| {
            Regex::new(r#"viewBox\s*=\s*["']\s*[-\d.eE]+[\s,]+[-\d.eE]+[\s,]+([\d.eE]+)[\s,]+([\d.eE]+)\s*["']"#)
                .expect("viewBox pattern")
        })
        .captures(tag)
        .and_then(|c| Some((c[1].parse::<f32>().ok()?, c[2].parse::<f32>().ok()?)));

    let max_width = MAX_WIDTH
        .get_or_init(|| Regex::new(r"max-width\s*:\s*([\d.]+)px").expect("max-width pattern"))
        .captures(tag)
        .and_then(|c| c[1].parse::<f32>().ok());

    match (view_box, max_width, width) {
        (Some((vw, vh)), Some(mw), _) if vw > 0.0 => Some((mw, mw * vh / vw)),
        (Some((vw, vh)), None, Some(w)) if vw > 0.0 => Some((w, w * vh / vw)),
        (Some(size), _, _) => Some(size),
        _ => None,
    }
}

fn length_attribute(tag: &str, name: &str) -> Option<f32> {
    static LENGTH: OnceLock<Regex> = OnceLock::new();

    LENGTH
        .get_or_init(|| {
            Regex::new(r#"\s(width|height)\s*=\s*["']\s*([\d.]+)(?:px)?\s*["']"#)
                .expect("length pattern")
        })
        .captures_iter(tag)
        .find(|c| &c[1] == name)?
        .get(2)?
        .as_str()
        .parse()
        .ok()
}
