//! Diagram overlay with stale-result suppression.

use super::{svg_size, DiagramEngine, DiagramError, RenderEpoch};
use crate::layout::Container;
use crate::model::DiagramState;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Longest error message shown next to a failed diagram, in characters.
pub const MAX_ERROR_LENGTH: usize = 120;

/// Overlay options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayOptions {
    /// Annotate failed diagrams with an inline error message
    pub show_errors: bool,
}

impl OverlayOptions {
    /// Create options with error annotations enabled.
    pub fn new() -> Self {
        Self { show_errors: true }
    }

    /// Enable or disable inline error annotations.
    pub fn with_show_errors(mut self, show: bool) -> Self {
        self.show_errors = show;
        self
    }
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// One diagram to render.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramJob {
    /// Diagram node id in the container
    pub id: usize,
    /// Diagram source
    pub source: String,
}

/// Diagrams collected by [`DiagramOverlay::prepare`].
#[derive(Debug, Clone)]
pub struct DiagramBatch {
    pub epoch: RenderEpoch,
    pub jobs: Vec<DiagramJob>,
}

impl DiagramBatch {
    /// Check if there is nothing to render.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Engine results for one batch.
#[derive(Debug)]
pub struct DiagramOutcome {
    pub epoch: RenderEpoch,
    pub results: Vec<(usize, Result<String, DiagramError>)>,
}

/// Result of committing an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// Results were written to the container
    Applied { rendered: usize, failed: usize },
    /// A newer pass started; the container was not touched
    Stale,
}

impl CommitStatus {
    /// Check if every diagram in the batch rendered.
    pub fn is_success(&self) -> bool {
        matches!(self, CommitStatus::Applied { failed: 0, .. })
    }
}

/// Replaces diagram placeholders with rendered graphics.
///
/// Clones share the generation counter, so a pass started through any clone
/// invalidates in-flight passes started through the others.
#[derive(Debug, Clone, Default)]
pub struct DiagramOverlay {
    generation: Arc<AtomicU64>,
}

impl DiagramOverlay {
    /// Create an overlay with a fresh generation counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the most recent pass.
    pub fn current_epoch(&self) -> RenderEpoch {
        RenderEpoch(self.generation.load(Ordering::SeqCst))
    }

    /// Check if `epoch` belongs to an older pass.
    pub fn is_stale(&self, epoch: RenderEpoch) -> bool {
        epoch != self.current_epoch()
    }

    /// Start a pass: bump the generation and collect unprocessed diagrams.
    pub fn prepare(&self, container: &Container) -> DiagramBatch {
        let epoch = RenderEpoch(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
        let jobs = container
            .diagrams()
            .filter(|node| !node.is_processed())
            .map(|node| DiagramJob {
                id: node.id,
                source: node.source.clone(),
            })
            .collect();
        DiagramBatch { epoch, jobs }
    }

    /// Render a batch with `engine`.
    ///
    /// Stops early once a newer pass has started; the partial outcome is
    /// still returned and will be rejected at commit.
    pub async fn run<E: DiagramEngine>(&self, batch: DiagramBatch, engine: &E) -> DiagramOutcome {
        let mut results = Vec::with_capacity(batch.jobs.len());

        for job in batch.jobs {
            if self.is_stale(batch.epoch) {
                log::debug!("Diagram pass {} superseded, stopping", batch.epoch);
                break;
            }
            let element_id = format!("paperdown-diagram-{}", job.id);
            let result = engine.render(&element_id, &job.source).await;
            results.push((job.id, result));
        }

        DiagramOutcome {
            epoch: batch.epoch,
            results,
        }
    }

    /// Write an outcome to the container unless a newer pass has started.
    pub fn commit(
        &self,
        container: &mut Container,
        outcome: DiagramOutcome,
        options: OverlayOptions,
    ) -> CommitStatus {
        if self.is_stale(outcome.epoch) {
            log::debug!(
                "Discarding stale diagram results from pass {} (current {})",
                outcome.epoch,
                self.current_epoch()
            );
            return CommitStatus::Stale;
        }

        let mut rendered = 0;
        let mut failed = 0;

        for (id, result) in outcome.results {
            let Some(node) = container.diagram_mut(id) else {
                continue;
            };
            if node.is_processed() {
                continue;
            }

            match result {
                Ok(svg) => {
                    let (width, height) = svg_size(&svg).unwrap_or((0.0, 0.0));
                    node.state = DiagramState::Rendered { svg, width, height };
                    node.annotation = None;
                    rendered += 1;
                }
                Err(e) => {
                    log::warn!("Diagram {} failed to render: {}", id, e);
                    node.state = DiagramState::Failed;
                    node.annotation = options
                        .show_errors
                        .then(|| summarize_error(&e.to_string()));
                    failed += 1;
                }
            }
        }

        CommitStatus::Applied { rendered, failed }
    }

    /// Render every unprocessed diagram in the container.
    ///
    /// Returns true when all attempted diagrams rendered and the results
    /// were not superseded by a newer pass.
    pub async fn render<E: DiagramEngine>(
        &self,
        container: &mut Container,
        engine: &E,
        options: OverlayOptions,
    ) -> bool {
        let batch = self.prepare(container);
        if batch.is_empty() {
            return true;
        }
        let count = batch.jobs.len();
        let outcome = self.run(batch, engine).await;
        let status = self.commit(container, outcome, options);
        log::debug!("Diagram pass over {} diagram(s): {:?}", count, status);
        status.is_success()
    }

    /// Clear processed state, rendered output and annotations of every diagram.
    pub fn reset(&self, container: &mut Container) {
        for block in container.blocks_mut() {
            if let Some(node) = block.diagram_mut() {
                node.reset();
            }
        }
    }
}

/// Short human-readable message for a diagram engine error.
///
/// A `line N` location becomes "Diagram syntax error on line N"; otherwise
/// the first line is capped at [`MAX_ERROR_LENGTH`] characters.
pub fn summarize_error(message: &str) -> String {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let line = LINE.get_or_init(|| Regex::new(r"(?i)\bline\s+(\d+)").expect("line pattern"));

    if let Some(caps) = line.captures(message) {
        return format!("Diagram syntax error on line {}", &caps[1]);
    }

    let first = message.lines().next().unwrap_or("").trim();
    if first.chars().count() <= MAX_ERROR_LENGTH {
        return first.to_string();
    }
    let mut short: String = first.chars().take(MAX_ERROR_LENGTH).collect();
    short.push_str("...");
    short
}
