//! Router / Selector
//!
//! The core decision engine. For each incoming request the router filters
//! the registered backends down to a feasible candidate set, scores the
//! survivors with a weight vector parameterized by the effective
//! efficiency mode, and returns the winner wrapped in a queue-tracking
//! adapter.
//!
//! # Decision Flow
//!
//! ```text
//! 1. Cancellation check (no queue mutation on cancel)
//! 2. Explicit target? -> that backend, or TargetUnavailable
//! 3. Filter: health, model support, media type, power/latency ceilings
//! 4. Deadline short-circuit: drop backends whose estimated wait blows it
//! 5. Score candidates, pick argmin, deterministic tie-break
//! 6. Wrap in a RoutedBackend that tracks queue depth for its lifetime
//! ```
//!
//! The router holds no lock while scoring and performs no I/O; everything
//! it reads is a snapshot. Two calls against identical registry, queue,
//! and controller state pick the same backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::queue::QueueManager;
use super::registry::BackendRegistry;
use super::weights::Weights;
use crate::backend::{Backend, BackendError};
use crate::controller::EfficiencyController;
use crate::error::RouteError;
use crate::request::{Annotations, GenerateRequest, GenerateResponse, Priority, StreamChunk};

/// Scores closer than this are considered tied and fall through to the
/// deterministic tie-break chain.
const SCORE_EPSILON: f64 = 1e-12;

/// Scoring penalty for a backend that is not preferred for the model.
const NOT_PREFERRED_PENALTY: f64 = 0.25;

// ============================================================================
// Router
// ============================================================================

/// The request router.
pub struct Router {
    registry: Arc<BackendRegistry>,
    queues: Arc<QueueManager>,
    controller: Arc<EfficiencyController>,
}

/// A filtered candidate with the snapshot data scoring needs.
struct Candidate {
    backend: Arc<dyn Backend>,
    avg_latency_ms: u64,
    power_watts: f64,
    tokens_per_second: u32,
    static_priority: u32,
    weighted_depth: u64,
    pending: u32,
    preferred: bool,
}

impl Candidate {
    /// Queue-wait estimate in milliseconds: crude but stable, it only has
    /// to order backends consistently against a deadline.
    fn estimated_queue_wait_ms(&self) -> u64 {
        let drain_rate = u64::from(self.tokens_per_second / 10).max(1);
        self.weighted_depth * self.avg_latency_ms / drain_rate
    }
}

impl Router {
    /// Create a router over the given registry, queue manager, and
    /// controller.
    #[must_use]
    pub fn new(
        registry: Arc<BackendRegistry>,
        queues: Arc<QueueManager>,
        controller: Arc<EfficiencyController>,
    ) -> Self {
        Self {
            registry,
            queues,
            controller,
        }
    }

    /// Select a backend for the request.
    ///
    /// On success the returned [`RoutedBackend`] has already incremented
    /// the backend's queue depth; the decrement happens exactly once when
    /// the request reaches any terminal state, including being dropped
    /// unused.
    pub fn route(
        &self,
        request: &GenerateRequest,
        annotations: &Annotations,
        cancel: &CancellationToken,
    ) -> Result<RoutedBackend, RouteError> {
        if cancel.is_cancelled() {
            return Err(RouteError::Cancelled);
        }

        // An explicit target bypasses filtering and scoring: the caller
        // asked for this backend, health permitting they get it.
        if let Some(target) = annotations.explicit_target() {
            let routable = self
                .registry
                .health(target)
                .is_some_and(|h| h.routable());
            let Some(backend) = self.registry.get(target).filter(|_| routable) else {
                return Err(RouteError::TargetUnavailable(target.to_string()));
            };
            tracing::debug!(
                request = %request.request_id,
                backend = %target,
                "Routed to explicit target"
            );
            return Ok(self.wrap(backend, annotations.priority));
        }

        let mut eligible = self.registry.routable();
        if eligible.is_empty() {
            return Err(RouteError::NoEligibleBackend);
        }

        // Model support. If this filter alone empties the set, say so.
        eligible.retain(|b| b.supports_model(&request.model));
        if eligible.is_empty() {
            return Err(RouteError::ModelUnsupported(request.model.clone()));
        }

        eligible.retain(|b| b.characteristics().serves_media(annotations.media_type));
        if annotations.max_power_watts > 0.0 {
            eligible.retain(|b| b.characteristics().power_watts <= annotations.max_power_watts);
        }
        if annotations.max_latency_ms > 0 {
            eligible.retain(|b| b.characteristics().avg_latency_ms <= annotations.max_latency_ms);
        }
        if eligible.is_empty() {
            return Err(RouteError::NoEligibleBackend);
        }

        // Snapshot queue state once per candidate; scoring reads no live
        // counters after this point.
        let mut candidates: Vec<Candidate> = eligible
            .into_iter()
            .map(|backend| {
                let chars = backend.characteristics();
                Candidate {
                    avg_latency_ms: chars.avg_latency_ms,
                    power_watts: chars.power_watts,
                    tokens_per_second: chars.max_tokens_per_second,
                    static_priority: chars.priority,
                    weighted_depth: self
                        .queues
                        .weighted_depth(backend.id(), annotations.priority),
                    pending: self.queues.depth(backend.id()),
                    preferred: backend.prefers_model(&request.model),
                    backend,
                }
            })
            .collect();

        if annotations.deadline_ms > 0 {
            candidates.retain(|c| {
                c.avg_latency_ms + c.estimated_queue_wait_ms() <= annotations.deadline_ms
            });
            if candidates.is_empty() {
                return Err(RouteError::NoEligibleBackend);
            }
        }

        let effective = self.controller.effective_mode();
        let weights = Weights::resolve(effective, annotations);
        let chosen = select_best(&candidates, &weights);

        if cancel.is_cancelled() {
            return Err(RouteError::Cancelled);
        }

        tracing::debug!(
            request = %request.request_id,
            backend = %chosen.id(),
            mode = %effective.as_str(),
            candidates = candidates.len(),
            "Routed request"
        );

        Ok(self.wrap(chosen, annotations.priority))
    }

    fn wrap(&self, backend: Arc<dyn Backend>, priority: Priority) -> RoutedBackend {
        let guard = QueueGuard::acquire(Arc::clone(&self.queues), backend.id(), priority);
        RoutedBackend { backend, guard }
    }
}

/// Score all candidates and pick the argmin with the deterministic
/// tie-break chain: lower average latency, then lower pending count, then
/// lower static priority, then lexicographically smaller id. Candidates
/// arrive sorted by id, so equal-on-everything ties keep the first.
fn select_best(candidates: &[Candidate], weights: &Weights) -> Arc<dyn Backend> {
    // Normalizers are maxima over the candidate set. A zero maximum
    // zeroes the corresponding penalty term for every candidate.
    let max_latency = candidates.iter().map(|c| c.avg_latency_ms).max().unwrap_or(0) as f64;
    let max_power = candidates.iter().map(|c| c.power_watts).fold(0.0, f64::max);
    let max_tps = candidates
        .iter()
        .map(|c| c.tokens_per_second)
        .max()
        .unwrap_or(0) as f64;
    let max_static = candidates.iter().map(|c| c.static_priority).max().unwrap_or(0) as f64;
    let max_weighted = candidates.iter().map(|c| c.weighted_depth).max().unwrap_or(0) as f64;

    let score = |c: &Candidate| -> f64 {
        let latency = ratio(c.avg_latency_ms as f64, max_latency);
        let power = ratio(c.power_watts, max_power);
        let throughput = if max_tps > 0.0 {
            1.0 - c.tokens_per_second as f64 / max_tps
        } else {
            0.0
        };
        let queue = c.weighted_depth as f64 / (1.0 + max_weighted);
        let prefer = if c.preferred { 0.0 } else { NOT_PREFERRED_PENALTY };
        let static_priority = ratio(c.static_priority as f64, max_static);

        weights.latency * latency
            + weights.power * power
            + weights.throughput * throughput
            + weights.queue * queue
            + weights.prefer * prefer
            + weights.static_priority * static_priority
    };

    let mut best = &candidates[0];
    let mut best_score = score(best);

    for candidate in &candidates[1..] {
        let candidate_score = score(candidate);
        if candidate_score + SCORE_EPSILON < best_score
            || ((candidate_score - best_score).abs() <= SCORE_EPSILON
                && tie_break_key(candidate) < tie_break_key(best))
        {
            best = candidate;
            best_score = candidate_score;
        }
    }

    Arc::clone(&best.backend)
}

fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

fn tie_break_key(c: &Candidate) -> (u64, u32, u32, &str) {
    (c.avg_latency_ms, c.pending, c.static_priority, c.backend.id())
}

// ============================================================================
// Queue Guard
// ============================================================================

/// Exactly-once queue-depth release.
///
/// Construction runs `mark_start`; [`QueueGuard::release`] (or Drop) runs
/// `mark_end` at most once, whatever combination of explicit release,
/// error path, cancellation, and drop happens.
pub struct QueueGuard {
    queues: Arc<QueueManager>,
    backend_id: String,
    priority: Priority,
    released: AtomicBool,
}

impl QueueGuard {
    fn acquire(queues: Arc<QueueManager>, backend_id: &str, priority: Priority) -> Self {
        queues.mark_start(backend_id, priority);
        Self {
            queues,
            backend_id: backend_id.to_string(),
            priority,
            released: AtomicBool::new(false),
        }
    }

    /// Release the queue slot. Idempotent.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.queues.mark_end(&self.backend_id, self.priority);
        }
    }
}

impl Drop for QueueGuard {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Routed Backend
// ============================================================================

/// The router's result: a borrowed backend whose queue slot is held for
/// the lifetime of the request.
pub struct RoutedBackend {
    backend: Arc<dyn Backend>,
    guard: QueueGuard,
}

impl std::fmt::Debug for RoutedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutedBackend")
            .field("backend_id", &self.backend.id())
            .finish()
    }
}

impl RoutedBackend {
    /// Id of the selected backend.
    #[must_use]
    pub fn id(&self) -> &str {
        self.backend.id()
    }

    /// Run a unary generation. The queue slot is released when the call
    /// returns, success or error.
    pub async fn generate(
        self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendError> {
        let result = self.backend.generate(request).await;
        self.guard.release();
        result
    }

    /// Run a streaming generation. The queue slot travels into the
    /// returned stream and is released when the reader closes, drains, or
    /// drops it.
    pub async fn generate_stream(
        self,
        request: &GenerateRequest,
    ) -> Result<TrackedStream, BackendError> {
        match self.backend.generate_stream(request).await {
            Ok(rx) => Ok(TrackedStream {
                rx,
                guard: self.guard,
            }),
            Err(e) => {
                self.guard.release();
                Err(e)
            }
        }
    }
}

/// A streaming response whose drop or close releases the queue slot.
pub struct TrackedStream {
    rx: mpsc::Receiver<StreamChunk>,
    guard: QueueGuard,
}

impl TrackedStream {
    /// Receive the next chunk. Returns `None` once the backend closes the
    /// stream, at which point the queue slot has been released.
    pub async fn recv(&mut self) -> Option<StreamChunk> {
        let chunk = self.rx.recv().await;
        if chunk.is_none() {
            self.guard.release();
        }
        chunk
    }

    /// Close the reader early. Releases the queue slot.
    pub fn close(&mut self) {
        self.rx.close();
        self.guard.release();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCharacteristics, Health};
    use crate::controller::QuietHours;
    use crate::mode::EfficiencyMode;
    use crate::probe::StaticProbe;
    use crate::request::MediaType;
    use crate::routing::test_utils::StaticBackend;

    struct Fixture {
        registry: Arc<BackendRegistry>,
        queues: Arc<QueueManager>,
        controller: Arc<EfficiencyController>,
        router: Router,
    }

    fn fixture(mode: EfficiencyMode) -> Fixture {
        let registry = Arc::new(BackendRegistry::new());
        let queues = Arc::new(QueueManager::new());
        let controller = Arc::new(EfficiencyController::new(
            Arc::new(StaticProbe::default()),
            QuietHours {
                enabled: false,
                ..Default::default()
            },
            mode,
        ));
        let router = Router::new(
            Arc::clone(&registry),
            Arc::clone(&queues),
            Arc::clone(&controller),
        );
        Fixture {
            registry,
            queues,
            controller,
            router,
        }
    }

    fn npu_chars() -> BackendCharacteristics {
        BackendCharacteristics {
            power_watts: 100.0,
            avg_latency_ms: 200,
            max_tokens_per_second: 50,
            ..Default::default()
        }
    }

    fn cpu_chars() -> BackendCharacteristics {
        BackendCharacteristics {
            power_watts: 20.0,
            avg_latency_ms: 800,
            max_tokens_per_second: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_target_returns_that_backend() {
        let f = fixture(EfficiencyMode::Balanced);
        f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));
        f.registry.register(Arc::new(StaticBackend::new("cpu", cpu_chars())));

        let routed = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new().with_target("cpu"),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(routed.id(), "cpu");
    }

    #[test]
    fn test_down_target_is_unavailable() {
        let f = fixture(EfficiencyMode::Balanced);
        f.registry.register(Arc::new(StaticBackend::new("gpu", npu_chars())));
        f.registry.set_health("gpu", Health::Down);

        let err = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new().with_target("gpu"),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert_eq!(err, RouteError::TargetUnavailable("gpu".to_string()));
    }

    #[test]
    fn test_missing_target_is_unavailable() {
        let f = fixture(EfficiencyMode::Balanced);
        f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));

        let err = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new().with_target("tpu"),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert_eq!(err, RouteError::TargetUnavailable("tpu".to_string()));
    }

    #[test]
    fn test_model_unsupported_is_distinguished() {
        let f = fixture(EfficiencyMode::Balanced);
        let chars = BackendCharacteristics {
            supported: vec!["llama*".to_string()],
            ..npu_chars()
        };
        f.registry.register(Arc::new(StaticBackend::new("npu", chars)));

        let err = f
            .router
            .route(
                &GenerateRequest::new("hi", "mistral:7b"),
                &Annotations::new(),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert_eq!(err, RouteError::ModelUnsupported("mistral:7b".to_string()));
    }

    #[test]
    fn test_ceiling_filters_produce_no_eligible_backend() {
        let f = fixture(EfficiencyMode::Balanced);
        f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));

        // Model matches, but the power ceiling excludes the only backend
        let err = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new().with_max_power_watts(50.0),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert_eq!(err, RouteError::NoEligibleBackend);
    }

    #[test]
    fn test_media_type_filter() {
        let f = fixture(EfficiencyMode::Balanced);
        let image_chars = BackendCharacteristics {
            media_types: vec![MediaType::Text, MediaType::Image],
            ..cpu_chars()
        };
        f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));
        f.registry.register(Arc::new(StaticBackend::new("gpu", image_chars)));

        let routed = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new().with_media_type(MediaType::Image),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(routed.id(), "gpu");
    }

    #[test]
    fn test_cancelled_before_selection_mutates_nothing() {
        let f = fixture(EfficiencyMode::Balanced);
        f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new(),
                &cancel,
            )
            .unwrap_err();
        assert_eq!(err, RouteError::Cancelled);
        assert_eq!(f.queues.depth("npu"), 0);
    }

    #[test]
    fn test_routing_tracks_queue_depth() {
        let f = fixture(EfficiencyMode::Balanced);
        f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));

        let routed = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new(),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(f.queues.depth("npu"), 1);

        // Dropping the wrapper unused still releases the slot, once
        drop(routed);
        assert_eq!(f.queues.depth("npu"), 0);
    }

    #[tokio::test]
    async fn test_generate_releases_exactly_once() {
        let f = fixture(EfficiencyMode::Balanced);
        f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));

        let request = GenerateRequest::new("hi", "llama3");
        let routed = f
            .router
            .route(&request, &Annotations::new(), &CancellationToken::new())
            .unwrap();
        assert_eq!(f.queues.depth("npu"), 1);

        routed.generate(&request).await.unwrap();
        assert_eq!(f.queues.depth("npu"), 0);
    }

    #[tokio::test]
    async fn test_stream_reader_close_releases_exactly_once() {
        let f = fixture(EfficiencyMode::Balanced);
        f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));

        let request = GenerateRequest::new("hi", "llama3");
        let routed = f
            .router
            .route(&request, &Annotations::new(), &CancellationToken::new())
            .unwrap();
        let mut stream = routed.generate_stream(&request).await.unwrap();
        assert_eq!(f.queues.depth("npu"), 1);

        // Close early, then close again: release stays exactly-once
        stream.close();
        assert_eq!(f.queues.depth("npu"), 0);
        stream.close();
        drop(stream);
        assert_eq!(f.queues.depth("npu"), 0);
        assert_eq!(f.queues.snapshot("npu").unwrap().pending, 0);
    }

    #[tokio::test]
    async fn test_drained_stream_releases() {
        let f = fixture(EfficiencyMode::Balanced);
        f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));

        let request = GenerateRequest::new("hi", "llama3");
        let routed = f
            .router
            .route(&request, &Annotations::new(), &CancellationToken::new())
            .unwrap();
        let mut stream = routed.generate_stream(&request).await.unwrap();

        while stream.recv().await.is_some() {}
        assert_eq!(f.queues.depth("npu"), 0);
    }

    #[test]
    fn test_deadline_short_circuit_drops_backlogged_backend() {
        let f = fixture(EfficiencyMode::Performance);
        f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));
        f.registry.register(Arc::new(StaticBackend::new("cpu", cpu_chars())));

        // Back up the npu: weighted depth 10 at Normal, wait = 10*200/5 = 400ms,
        // so 200 + 400 = 600 > 500 while cpu sits at 800 > 500 too.
        for _ in 0..5 {
            f.queues.mark_start("npu", Priority::Normal);
        }

        let err = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new().with_deadline_ms(500),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert_eq!(err, RouteError::NoEligibleBackend);

        // A looser deadline keeps the npu despite its backlog
        let routed = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new().with_deadline_ms(700),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(routed.id(), "npu");
    }

    #[test]
    fn test_tie_break_prefers_lower_latency_then_id() {
        let f = fixture(EfficiencyMode::Balanced);
        // Identical characteristics except latency
        let mut a = cpu_chars();
        a.avg_latency_ms = 400;
        f.registry.register(Arc::new(StaticBackend::new("beta", cpu_chars())));
        f.registry.register(Arc::new(StaticBackend::new("alpha", a)));

        let routed = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new(),
                &CancellationToken::new(),
            )
            .unwrap();
        // Lower latency dominates the score outright here; the point is
        // the choice is stable
        assert_eq!(routed.id(), "alpha");

        // Fully identical backends: lexicographic id decides
        let g = fixture(EfficiencyMode::Balanced);
        g.registry.register(Arc::new(StaticBackend::new("zeta", cpu_chars())));
        g.registry.register(Arc::new(StaticBackend::new("eta", cpu_chars())));
        let routed = g
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new(),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(routed.id(), "eta");
    }

    #[test]
    fn test_route_is_deterministic() {
        for _ in 0..10 {
            let f = fixture(EfficiencyMode::Balanced);
            f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));
            f.registry.register(Arc::new(StaticBackend::new("cpu", cpu_chars())));
            f.queues.mark_start("npu", Priority::High);

            let first = f
                .router
                .route(
                    &GenerateRequest::new("hi", "llama3"),
                    &Annotations::new(),
                    &CancellationToken::new(),
                )
                .unwrap();
            let first_id = first.id().to_string();
            drop(first);

            let second = f
                .router
                .route(
                    &GenerateRequest::new("hi", "llama3"),
                    &Annotations::new(),
                    &CancellationToken::new(),
                )
                .unwrap();
            assert_eq!(first_id, second.id());
        }
    }

    #[test]
    fn test_preferred_backend_wins_close_calls() {
        let f = fixture(EfficiencyMode::Balanced);
        let mut preferred = cpu_chars();
        preferred.preferred = vec!["llama*".to_string()];
        f.registry.register(Arc::new(StaticBackend::new("a", cpu_chars())));
        f.registry.register(Arc::new(StaticBackend::new("b", preferred)));

        let routed = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new(),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(routed.id(), "b");
    }

    #[test]
    fn test_single_candidate_zero_normalizers() {
        // One backend with all-zero characteristics: every normalizer is
        // zero and every term must collapse to 0, not NaN.
        let f = fixture(EfficiencyMode::Balanced);
        f.registry.register(Arc::new(StaticBackend::named("only")));

        let routed = f
            .router
            .route(
                &GenerateRequest::new("hi", "llama3"),
                &Annotations::new(),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(routed.id(), "only");
    }

    #[test]
    fn test_effective_mode_flips_selection() {
        let f = fixture(EfficiencyMode::Performance);
        f.registry.register(Arc::new(StaticBackend::new("npu", npu_chars())));
        f.registry.register(Arc::new(StaticBackend::new("cpu", cpu_chars())));

        let request = GenerateRequest::new("hi", "llama3");
        let fast = f
            .router
            .route(&request, &Annotations::new(), &CancellationToken::new())
            .unwrap();
        assert_eq!(fast.id(), "npu");
        drop(fast);

        f.controller.set_mode(EfficiencyMode::UltraEfficiency);
        let frugal = f
            .router
            .route(&request, &Annotations::new(), &CancellationToken::new())
            .unwrap();
        assert_eq!(frugal.id(), "cpu");
    }
}
