//! Per-graph observability counters.
//!
//! Counters use relaxed ordering; they are advisory and never used to
//! synchronize graph state.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
#[allow(clippy::struct_field_names)]
pub(crate) struct GraphCounters {
    entrypoint_cas_lost_total: AtomicU64,
    stale_neighbor_skipped_total: AtomicU64,
    prune_total: AtomicU64,
    search_cancelled_total: AtomicU64,
}

impl GraphCounters {
    #[inline]
    pub(crate) fn record_cas_lost(&self) {
        self.entrypoint_cas_lost_total
            .fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_stale_neighbors(&self, count: usize) {
        if count > 0 {
            self.stale_neighbor_skipped_total
                .fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_prune(&self) {
        self.prune_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_cancelled(&self) {
        self.search_cancelled_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            entrypoint_cas_lost_total: self.entrypoint_cas_lost_total.load(Ordering::Relaxed),
            stale_neighbor_skipped_total: self
                .stale_neighbor_skipped_total
                .load(Ordering::Relaxed),
            prune_total: self.prune_total.load(Ordering::Relaxed),
            search_cancelled_total: self.search_cancelled_total.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a graph's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_field_names)]
pub struct CounterSnapshot {
    /// Entrypoint compare-and-swap attempts that lost a race.
    pub entrypoint_cas_lost_total: u64,
    /// Neighbors skipped during traversal because they were deleted.
    pub stale_neighbor_skipped_total: u64,
    /// Edge sets rewritten by neighbor pruning.
    pub prune_total: u64,
    /// Searches aborted by their context.
    pub search_cancelled_total: u64,
}
