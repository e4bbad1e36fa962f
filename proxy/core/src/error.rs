//! Error Taxonomy
//!
//! Routing and policy errors surfaced to callers. Backend driver failures
//! live in [`crate::backend::BackendError`]; configuration failures in
//! [`crate::config::ConfigError`]. Queue-counter anomalies and probe
//! failures are logged, never surfaced.

use thiserror::Error;

/// Errors returned by [`crate::routing::Router::route`].
///
/// All variants are non-retryable at this layer: the state that produced
/// them will not change within the lifetime of the request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// The explicitly requested backend is missing or marked down.
    #[error("target backend unavailable: {0}")]
    TargetUnavailable(String),

    /// Filtering removed every candidate.
    #[error("no eligible backend for request")]
    NoEligibleBackend,

    /// Filtering removed every candidate, and model support alone did it.
    #[error("no backend supports model: {0}")]
    ModelUnsupported(String),

    /// The caller's cancellation token fired before selection completed.
    /// Queues are untouched.
    #[error("request cancelled before dispatch")]
    Cancelled,

    /// An invariant was violated. Logged with detail; callers see a
    /// generic failure.
    #[error("internal routing error: {0}")]
    Internal(String),
}

/// Errors from the efficiency-mode controller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The supplied mode name is not in the closed set.
    #[error("unknown efficiency mode: {0}")]
    UnknownMode(String),
}
