//! Page count estimation for the continuous-flow preview.

use super::container::Container;
use crate::model::{BreakKind, PageBreakMarker, PageGeometry};
use serde::{Deserialize, Serialize};

/// Overflow below which trailing content is not counted as a new page.
///
/// Absorbs sub-line overflow from the flow model (a final margin, a border,
/// rounding of the mm to px conversion).
pub const DEFAULT_OVERFLOW_TOLERANCE_PX: f32 = 12.0;

/// Result of a pagination estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEstimate {
    /// Estimated number of pages (at least 1)
    pub total_pages: u32,

    /// Vertical offsets of automatic page breaks, in pixels
    pub break_offsets: Vec<f32>,

    /// Page content height in pixels
    pub page_height_px: f32,

    /// Measured content height in pixels
    pub content_height_px: f32,
}

impl PageEstimate {
    /// Check if the content fits on one page.
    pub fn is_single_page(&self) -> bool {
        self.total_pages == 1
    }
}

/// Estimates page count and automatic break offsets.
///
/// Manual page breaks in the content do not change the estimate: the preview
/// approximates continuous-flow pagination and can report fewer pages than
/// the exported document when manual breaks are present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaginationEstimator {
    overflow_tolerance_px: f32,
}

impl PaginationEstimator {
    /// Create an estimator with the default overflow tolerance.
    pub fn new() -> Self {
        Self {
            overflow_tolerance_px: DEFAULT_OVERFLOW_TOLERANCE_PX,
        }
    }

    /// Set the overflow tolerance in pixels.
    pub fn with_overflow_tolerance(mut self, px: f32) -> Self {
        self.overflow_tolerance_px = px.max(0.0);
        self
    }

    /// Overflow tolerance in pixels.
    pub fn overflow_tolerance(&self) -> f32 {
        self.overflow_tolerance_px
    }

    /// Lay out `container` for `geometry`, count pages and replace its
    /// automatic break markers.
    pub fn estimate(&self, container: &mut Container, geometry: &PageGeometry) -> PageEstimate {
        let removed = container.remove_markers(BreakKind::Automatic);
        let content_height = container.layout(geometry.content_width_px());
        let estimate = self.compute(content_height, geometry.content_height_px());

        for k in 1..estimate.total_pages {
            container.insert_marker(PageBreakMarker::automatic(
                k,
                estimate.total_pages,
                estimate.page_height_px,
            ));
        }

        log::debug!(
            "Estimated {} page(s) for {:.1}px of content on {} {} (replaced {} markers)",
            estimate.total_pages,
            content_height,
            geometry.paper,
            geometry.orientation,
            removed
        );
        estimate
    }

    /// Page count and break offsets for a measured content height.
    pub fn compute(&self, content_height_px: f32, page_height_px: f32) -> PageEstimate {
        if page_height_px.is_nan() || page_height_px <= 0.0 {
            log::warn!(
                "Page content height is {:.1}px; reporting a single page",
                page_height_px
            );
            return PageEstimate {
                total_pages: 1,
                break_offsets: Vec::new(),
                page_height_px,
                content_height_px,
            };
        }

        let counted = (content_height_px - self.overflow_tolerance_px).max(0.0);
        let total_pages = ((counted / page_height_px).ceil() as u32).max(1);
        let break_offsets = (1..total_pages)
            .map(|k| k as f32 * page_height_px)
            .collect();

        PageEstimate {
            total_pages,
            break_offsets,
            page_height_px,
            content_height_px,
        }
    }
}

impl Default for PaginationEstimator {
    fn default() -> Self {
        Self::new()
    }
}
