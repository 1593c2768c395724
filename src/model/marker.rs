//! Page-break markers.

use serde::{Deserialize, Serialize};

/// Origin of a page break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    /// Author-inserted marker in the source; authoritative at export time
    Manual,
    /// Computed by the pagination estimator; preview only
    Automatic,
}

/// A page break positioned in the preview container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBreakMarker {
    /// Manual or automatic
    pub kind: BreakKind,

    /// Vertical offset from the container top, in CSS pixels
    pub offset: f32,

    /// Index of the page that starts at this break (1-indexed page k+1 for break k)
    pub page_index: u32,

    /// Display label (e.g. "1 / 3")
    pub label: String,
}

impl PageBreakMarker {
    /// Create an automatic marker for boundary `k` of `total` pages.
    pub fn automatic(k: u32, total: u32, page_height_px: f32) -> Self {
        Self {
            kind: BreakKind::Automatic,
            offset: k as f32 * page_height_px,
            page_index: k,
            label: format!("{} / {}", k, total),
        }
    }

    /// Create a manual marker at a measured offset.
    #[cfg(test)]
    pub(crate) fn manual(offset: f32, page_index: u32) -> Self {
        Self {
            kind: BreakKind::Manual,
            offset,
            page_index,
            label: String::new(),
        }
    }

    /// Check if this marker was computed by the estimator.
    pub fn is_automatic(&self) -> bool {
        self.kind == BreakKind::Automatic
    }

    /// Preview HTML for the marker: an absolutely positioned indicator line.
    pub fn to_html(&self) -> String {
        let class = match self.kind {
            BreakKind::Manual => "page-break-indicator manual",
            BreakKind::Automatic => "page-break-indicator auto",
        };
        format!(
            "<div class=\"{}\" style=\"position: absolute; left: 0; right: 0; top: {:.2}px;\" data-label=\"{}\"></div>\n",
            class, self.offset, self.label
        )
    }
}
