//! Integration tests for page count estimation.

use paperdown::layout::{Container, PaginationEstimator};
use paperdown::model::{
    mm_to_px, BreakKind, ContentBlock, Margins, Orientation, PageGeometry, PaperSize,
};
use paperdown::{estimate_pages, RenderSettings};

fn a4() -> PageGeometry {
    PageGeometry::default()
}

fn fixed(heights: &[f32]) -> Container {
    let mut container = Container::new(14.0);
    container.replace_content(
        heights
            .iter()
            .enumerate()
            .map(|(i, &h)| ContentBlock::fixed(i, h))
            .collect(),
    );
    container
}

// ==================== Page Count Tests ====================

#[test]
fn test_a4_page_height() {
    let geometry = a4();
    assert!((geometry.content_height_px() - mm_to_px(277.0)).abs() < 1e-3);
    assert!((geometry.content_height_px() - 1046.93).abs() < 0.01);
}

#[test]
fn test_two_pages_of_content() {
    let mut container = fixed(&[700.0, 1400.0]);
    let estimate = PaginationEstimator::new().estimate(&mut container, &a4());

    assert_eq!(estimate.content_height_px, 2100.0);
    assert_eq!(estimate.total_pages, 2);
    assert_eq!(estimate.break_offsets.len(), 1);
    assert!((estimate.break_offsets[0] - estimate.page_height_px).abs() < 1e-3);
}

#[test]
fn test_two_and_a_half_pages() {
    let page = a4().content_height_px();
    let mut container = fixed(&[page * 2.5]);
    let estimate = PaginationEstimator::new().estimate(&mut container, &a4());

    assert_eq!(estimate.total_pages, 3);
    assert_eq!(container.marker_count(), 2);
    let labels: Vec<_> = container.markers().map(|m| m.label.clone()).collect();
    assert_eq!(labels, vec!["1 / 3", "2 / 3"]);
}

#[test]
fn test_zero_content_is_one_page() {
    let mut container = Container::new(14.0);
    let estimate = PaginationEstimator::new().estimate(&mut container, &a4());

    assert_eq!(estimate.total_pages, 1);
    assert!(estimate.break_offsets.is_empty());
    assert_eq!(container.marker_count(), 0);
}

#[test]
fn test_small_overflow_absorbed() {
    let page = a4().content_height_px();
    let mut container = fixed(&[page + 5.0]);
    let estimate = PaginationEstimator::new().estimate(&mut container, &a4());
    assert_eq!(estimate.total_pages, 1);

    let strict = PaginationEstimator::new().with_overflow_tolerance(0.0);
    assert_eq!(strict.estimate(&mut container, &a4()).total_pages, 2);
}

// ==================== Marker Tests ====================

#[test]
fn test_estimate_is_idempotent() {
    let mut container = fixed(&[3000.0]);
    let estimator = PaginationEstimator::new();

    let first = estimator.estimate(&mut container, &a4());
    let second = estimator.estimate(&mut container, &a4());

    assert_eq!(first, second);
    assert_eq!(container.marker_count() as u32, first.total_pages - 1);
}

#[test]
fn test_markers_recomputed_after_geometry_change() {
    let mut container = fixed(&[3000.0]);
    let estimator = PaginationEstimator::new();
    let portrait = estimator.estimate(&mut container, &a4());

    let landscape =
        PageGeometry::new(PaperSize::A4, Orientation::Landscape, Margins::default()).unwrap();
    let wide = estimator.estimate(&mut container, &landscape);

    assert!(wide.total_pages > portrait.total_pages);
    assert_eq!(container.marker_count() as u32, wide.total_pages - 1);
    assert!(container.markers().all(|m| m.kind == BreakKind::Automatic));
}

#[test]
fn test_manual_breaks_do_not_change_estimate() {
    let settings = RenderSettings::new().with_highlighting(false);
    let plain = estimate_pages("one\n\ntwo\n", &settings).unwrap();
    let broken = estimate_pages("one\n\n<!-- pagebreak -->\n\ntwo\n", &settings).unwrap();

    assert_eq!(plain.total_pages, 1);
    assert_eq!(broken.total_pages, 1);
}

#[test]
fn test_markers_do_not_contribute_height() {
    let mut container = fixed(&[2500.0]);
    let estimator = PaginationEstimator::new();
    estimator.estimate(&mut container, &a4());
    let before = container.content_height();

    container.mark_dirty();
    estimator.estimate(&mut container, &a4());
    assert_eq!(container.content_height(), before);
}

// ==================== Rendered Content Tests ====================

#[test]
fn test_long_document_spans_pages() {
    let source = "A paragraph of ordinary prose that wraps across the page.\n\n".repeat(200);
    let settings = RenderSettings::new().with_highlighting(false);
    let estimate = estimate_pages(&source, &settings).unwrap();
    assert!(estimate.total_pages > 2);
}

#[test]
fn test_smaller_font_fewer_pages() {
    let source = "Some words to fill the page with text.\n\n".repeat(300);
    let large = estimate_pages(&source, &RenderSettings::new().with_font_size(20)).unwrap();
    let small = estimate_pages(&source, &RenderSettings::new().with_font_size(10)).unwrap();
    assert!(small.total_pages < large.total_pages);
}
