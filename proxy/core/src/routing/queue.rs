//! Queue Manager
//!
//! Tracks in-flight request counts per backend, broken down by priority.
//! The router consults the *weighted* depth: higher-priority traffic makes
//! a backend look proportionally busier to lower-priority incoming
//! requests, steering them elsewhere, while a `Critical` request still
//! sees the full depth.
//!
//! # Locking
//!
//! The outer map takes a write lock only when a backend's entry is first
//! created. Counter updates take the per-entry mutex, held just for the
//! arithmetic. Nothing here is held across scoring or backend I/O.

use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::request::Priority;

/// Per-backend in-flight counters.
///
/// Invariants, maintained by [`QueueManager`]: `pending >= 0`, every
/// priority count `>= 0`, and the counts sum to `pending`.
#[derive(Clone, Debug)]
pub struct QueueState {
    /// Total in-flight requests.
    pub pending: u32,
    /// In-flight requests per priority level, indexed by `Priority::index`.
    pub priority_counts: [u32; 4],
    /// When the counters last changed.
    pub last_update: Instant,
}

impl QueueState {
    fn new() -> Self {
        Self {
            pending: 0,
            priority_counts: [0; 4],
            last_update: Instant::now(),
        }
    }
}

/// Process-wide in-flight request tracker.
pub struct QueueManager {
    queues: DashMap<String, Mutex<QueueState>>,
}

impl QueueManager {
    /// Create an empty queue manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queues: DashMap::new(),
        }
    }

    /// Record the start of a request on a backend. Creates the entry on
    /// first use.
    pub fn mark_start(&self, backend_id: &str, priority: Priority) {
        let entry = self
            .queues
            .entry(backend_id.to_string())
            .or_insert_with(|| Mutex::new(QueueState::new()));
        let mut state = entry.lock();
        state.pending += 1;
        state.priority_counts[priority.index()] += 1;
        state.last_update = Instant::now();
    }

    /// Record the end of a request on a backend. Decrements clamp at zero;
    /// a clamp means start/end got unbalanced and is logged, never
    /// surfaced.
    pub fn mark_end(&self, backend_id: &str, priority: Priority) {
        let Some(entry) = self.queues.get(backend_id) else {
            tracing::warn!(backend = %backend_id, "mark_end for unknown backend queue");
            return;
        };
        let mut state = entry.lock();

        if state.pending == 0 || state.priority_counts[priority.index()] == 0 {
            tracing::warn!(
                backend = %backend_id,
                priority = ?priority,
                "Queue counter clamped at zero on release"
            );
            state.last_update = Instant::now();
            return;
        }

        state.pending -= 1;
        state.priority_counts[priority.index()] -= 1;
        state.last_update = Instant::now();
    }

    /// Raw in-flight count for a backend. Unknown backends are empty.
    pub fn depth(&self, backend_id: &str) -> u32 {
        self.queues
            .get(backend_id)
            .map_or(0, |entry| entry.lock().pending)
    }

    /// Priority-weighted depth: `Σ counts[p] · (p+1)` over priorities up
    /// to and including `ceiling`. Traffic above the ceiling is invisible
    /// to the caller — a `Critical` request sees everything, a `Low`
    /// request sees only other `Low` traffic.
    pub fn weighted_depth(&self, backend_id: &str, ceiling: Priority) -> u64 {
        let Some(entry) = self.queues.get(backend_id) else {
            return 0;
        };
        let state = entry.lock();
        state.priority_counts[..=ceiling.index()]
            .iter()
            .enumerate()
            .map(|(p, count)| u64::from(*count) * (p as u64 + 1))
            .sum()
    }

    /// Snapshot of a backend's counters, for introspection and tests.
    pub fn snapshot(&self, backend_id: &str) -> Option<QueueState> {
        self.queues.get(backend_id).map(|entry| entry.lock().clone())
    }
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(state: &QueueState) {
        let sum: u32 = state.priority_counts.iter().sum();
        assert_eq!(sum, state.pending, "priority counts must sum to pending");
    }

    #[test]
    fn test_mark_start_and_end_balance() {
        let queues = QueueManager::new();

        queues.mark_start("npu", Priority::Normal);
        queues.mark_start("npu", Priority::High);
        queues.mark_start("npu", Priority::Normal);
        assert_eq!(queues.depth("npu"), 3);
        assert_invariants(&queues.snapshot("npu").unwrap());

        queues.mark_end("npu", Priority::Normal);
        queues.mark_end("npu", Priority::High);
        queues.mark_end("npu", Priority::Normal);
        assert_eq!(queues.depth("npu"), 0);
        assert_invariants(&queues.snapshot("npu").unwrap());
    }

    #[test]
    fn test_decrement_clamps_at_zero() {
        let queues = QueueManager::new();

        queues.mark_start("npu", Priority::Normal);
        queues.mark_end("npu", Priority::Normal);
        // Double release must not wrap
        queues.mark_end("npu", Priority::Normal);
        queues.mark_end("npu", Priority::Low);

        let state = queues.snapshot("npu").unwrap();
        assert_eq!(state.pending, 0);
        assert_invariants(&state);
    }

    #[test]
    fn test_mismatched_priority_release_clamps() {
        let queues = QueueManager::new();

        queues.mark_start("npu", Priority::High);
        // Release at a priority with a zero count: clamp, leave pending alone
        queues.mark_end("npu", Priority::Low);

        let state = queues.snapshot("npu").unwrap();
        assert_eq!(state.pending, 1);
        assert_eq!(state.priority_counts[Priority::High.index()], 1);
        assert_invariants(&state);
    }

    #[test]
    fn test_unknown_backend_is_empty() {
        let queues = QueueManager::new();
        assert_eq!(queues.depth("gpu"), 0);
        assert_eq!(queues.weighted_depth("gpu", Priority::Critical), 0);
        assert!(queues.snapshot("gpu").is_none());
        // mark_end on unknown id is a logged no-op
        queues.mark_end("gpu", Priority::Normal);
    }

    #[test]
    fn test_weighted_depth_respects_ceiling() {
        let queues = QueueManager::new();

        // 2 Low, 3 Normal, 1 High, 1 Critical
        queues.mark_start("npu", Priority::Low);
        queues.mark_start("npu", Priority::Low);
        for _ in 0..3 {
            queues.mark_start("npu", Priority::Normal);
        }
        queues.mark_start("npu", Priority::High);
        queues.mark_start("npu", Priority::Critical);

        // Low sees only Low: 2*1
        assert_eq!(queues.weighted_depth("npu", Priority::Low), 2);
        // Normal adds 3*2
        assert_eq!(queues.weighted_depth("npu", Priority::Normal), 8);
        // High adds 1*3
        assert_eq!(queues.weighted_depth("npu", Priority::High), 11);
        // Critical sees the full weighted depth: + 1*4
        assert_eq!(queues.weighted_depth("npu", Priority::Critical), 15);
    }

    #[test]
    fn test_invariants_across_random_sequences() {
        let queues = QueueManager::new();
        let priorities = [
            Priority::Low,
            Priority::Normal,
            Priority::High,
            Priority::Critical,
        ];

        // Deterministic pseudo-random walk of starts and ends
        let mut seed = 0x2545_f491_u64;
        for _ in 0..2000 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let priority = priorities[(seed >> 33) as usize % 4];
            if seed % 3 == 0 {
                queues.mark_end("cpu", priority);
            } else {
                queues.mark_start("cpu", priority);
            }
            assert_invariants(&queues.snapshot("cpu").unwrap());
        }
    }
}
