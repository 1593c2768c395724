//! Layout substitute for the browser box model.
//!
//! Rendered blocks live in a [`Container`]; a [`FlowLayout`] pass stacks
//! them using a [`FontMetrics`] table, and the [`PaginationEstimator`]
//! measures the result against a page geometry.

mod container;
mod estimator;
mod flow;
mod metrics;

pub use container::{Container, Node};
pub use estimator::{PageEstimate, PaginationEstimator, DEFAULT_OVERFLOW_TOLERANCE_PX};
pub use flow::{
    BoxMargins, FlowLayout, BODY_LINE_HEIGHT, CODE_LINE_HEIGHT, CODE_SCALE, HEADING_LINE_HEIGHT,
    HEADING_SCALES,
};
pub use metrics::{is_wide, FontMetrics};
