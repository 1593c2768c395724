//! Trailing-edge debouncing of editor changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default quiet period before a change is processed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A scheduled change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTicket {
    id: u64,
    due: Instant,
}

impl DebounceTicket {
    /// Sequence number of this ticket.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Instant at which the ticket may settle.
    pub fn due(&self) -> Instant {
        self.due
    }
}

/// Collapses bursts of changes into one.
///
/// Every change calls [`Debouncer::schedule`]; only the most recent ticket
/// settles `true` once the quiet period has passed without another change.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    /// Create a debouncer with a quiet period.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a change and return its ticket.
    pub fn schedule(&self) -> DebounceTicket {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        DebounceTicket {
            id,
            due: Instant::now() + self.delay,
        }
    }

    /// Check if no change was scheduled after `ticket`.
    pub fn is_latest(&self, ticket: DebounceTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.id
    }

    /// Wait until the ticket is due; true if it is still the latest change.
    pub async fn settle(&self, ticket: DebounceTicket) -> bool {
        tokio::time::sleep_until(ticket.due).await;
        self.is_latest(ticket)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_single_change_settles() {
        let debouncer = Debouncer::default();
        let ticket = debouncer.schedule();
        let start = Instant::now();
        assert!(debouncer.settle(ticket).await);
        assert!(start.elapsed() >= DEFAULT_DEBOUNCE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_settles_only_last() {
        let debouncer = Debouncer::default();
        let first = debouncer.schedule();
        tokio::time::advance(Duration::from_millis(100)).await;
        let second = debouncer.schedule();
        tokio::time::advance(Duration::from_millis(100)).await;
        let third = debouncer.schedule();

        assert!(!debouncer.settle(first).await);
        assert!(!debouncer.settle(second).await);
        assert!(debouncer.settle(third).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_sequence() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let other = debouncer.clone();
        let ticket = debouncer.schedule();
        other.schedule();
        assert!(!debouncer.settle(ticket).await);
    }
}
