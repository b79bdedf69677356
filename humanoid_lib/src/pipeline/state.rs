use super::DispatchQueue;
use crate::types::PoseSnapshot;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared shutdown flag. Cloning hands out another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters updated by the pipeline threads.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub datagrams_received: AtomicU64,
    pub decode_failures: AtomicU64,
    pub snapshots_dropped: AtomicU64,
    pub cycles_dispatched: AtomicU64,
    pub actuation_failures: AtomicU64,
    pub limbs_skipped: AtomicU64,
    pub motions_played: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub datagrams_received: u64,
    pub decode_failures: u64,
    pub snapshots_dropped: u64,
    pub cycles_dispatched: u64,
    pub actuation_failures: u64,
    pub limbs_skipped: u64,
    pub motions_played: u64,
}

impl PipelineStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            snapshots_dropped: self.snapshots_dropped.load(Ordering::Relaxed),
            cycles_dispatched: self.cycles_dispatched.load(Ordering::Relaxed),
            actuation_failures: self.actuation_failures.load(Ordering::Relaxed),
            limbs_skipped: self.limbs_skipped.load(Ordering::Relaxed),
            motions_played: self.motions_played.load(Ordering::Relaxed),
        }
    }

    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!("Pipeline statistics:");
        info!(
            "  Datagrams: {} received, {} undecodable",
            s.datagrams_received, s.decode_failures
        );
        info!("  Snapshots dropped by backpressure: {}", s.snapshots_dropped);
        info!(
            "  Cycles: {} dispatched, {} actuation failures, {} limbs skipped",
            s.cycles_dispatched, s.actuation_failures, s.limbs_skipped
        );
        info!("  Gait motions played: {}", s.motions_played);
    }
}

/// Everything the receiver and worker threads share.
#[derive(Clone)]
pub struct PipelineState {
    pub queue: Arc<DispatchQueue<PoseSnapshot>>,
    pub cancel: CancelToken,
    pub stats: Arc<PipelineStats>,
}

impl PipelineState {
    pub fn new(queue_capacity: usize) -> Self {
        Self::with_cancel(queue_capacity, CancelToken::new())
    }

    /// State whose shutdown flag is shared with `cancel`.
    pub fn with_cancel(queue_capacity: usize, cancel: CancelToken) -> Self {
        Self {
            queue: Arc::new(DispatchQueue::new(queue_capacity)),
            cancel,
            stats: Arc::new(PipelineStats::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = PipelineStats::default();
        PipelineStats::incr(&stats.datagrams_received);
        PipelineStats::incr(&stats.datagrams_received);
        PipelineStats::incr(&stats.motions_played);

        let s = stats.snapshot();
        assert_eq!(s.datagrams_received, 2);
        assert_eq!(s.motions_played, 1);
        assert_eq!(s.decode_failures, 0);
    }
}
