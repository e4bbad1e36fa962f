//! Backend Capability
//!
//! Trait definitions for inference backends. A backend is one concrete
//! engine on this host (an NPU runtime, a GPU runtime, a CPU fallback),
//! distinguished by its hardware characteristics. The router depends only
//! on this capability set; transports and API formats are the driver's
//! concern.
//!
//! # Model patterns
//!
//! Each backend declares three shell-style glob lists over model names:
//! `supported` (empty = match all), `excluded` (empty = match none), and
//! `preferred` (scoring bonus only, never filters). Matching is
//! case-insensitive.

use async_trait::async_trait;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::request::{GenerateRequest, GenerateResponse, MediaType, StreamChunk};

// ============================================================================
// Health
// ============================================================================

/// Health of a backend, as tracked by the registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Health {
    /// Fully operational.
    #[default]
    Healthy,
    /// Operational but impaired; still routable.
    Degraded,
    /// Not accepting requests. The router never dispatches here.
    Down,
}

impl Health {
    /// Whether the router may dispatch to a backend in this state.
    #[must_use]
    pub fn routable(&self) -> bool {
        !matches!(self, Self::Down)
    }
}

// ============================================================================
// Characteristics
// ============================================================================

/// Static, per-backend hardware characteristics, declared in configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendCharacteristics {
    /// Typical power draw under load, in watts.
    pub power_watts: f64,
    /// Average end-to-end latency for a typical request, in milliseconds.
    pub avg_latency_ms: u64,
    /// Peak generation throughput in tokens per second.
    pub max_tokens_per_second: u32,
    /// Static preference rank. Lower is preferred; used as a scoring term
    /// and as a late tie-breaker.
    pub priority: u32,
    /// Largest model this backend can hold, in gigabytes.
    pub max_model_size_gb: u32,
    /// Media types this backend serves.
    pub media_types: Vec<MediaType>,
    /// Model-name globs this backend supports. Empty matches everything.
    pub supported: Vec<String>,
    /// Model-name globs this backend is preferred for. Scoring only.
    pub preferred: Vec<String>,
    /// Model-name globs this backend refuses. Empty matches nothing.
    pub excluded: Vec<String>,
}

impl Default for BackendCharacteristics {
    fn default() -> Self {
        Self {
            power_watts: 0.0,
            avg_latency_ms: 0,
            max_tokens_per_second: 0,
            priority: 0,
            max_model_size_gb: 0,
            media_types: vec![MediaType::Text],
            supported: Vec::new(),
            preferred: Vec::new(),
            excluded: Vec::new(),
        }
    }
}

impl BackendCharacteristics {
    /// Whether this backend serves the given media type. An unspecified
    /// request media type matches any backend.
    #[must_use]
    pub fn serves_media(&self, media: Option<MediaType>) -> bool {
        match media {
            None => true,
            Some(m) => self.media_types.contains(&m),
        }
    }
}

// ============================================================================
// Model Matcher
// ============================================================================

/// Compiled model-name matcher for one backend.
///
/// Built once at registration from [`BackendCharacteristics`]; matching on
/// the routing hot path is then allocation-free.
#[derive(Debug)]
pub struct ModelMatcher {
    /// `None` means the supported list was empty: match all.
    supported: Option<GlobSet>,
    /// `None` means the preferred list was empty: prefer none.
    preferred: Option<GlobSet>,
    /// `None` means the excluded list was empty: exclude none.
    excluded: Option<GlobSet>,
}

impl ModelMatcher {
    /// Compile the pattern lists of `chars`. Fails on malformed globs.
    pub fn new(chars: &BackendCharacteristics) -> Result<Self, globset::Error> {
        Ok(Self {
            supported: Self::compile(&chars.supported)?,
            preferred: Self::compile(&chars.preferred)?,
            excluded: Self::compile(&chars.excluded)?,
        })
    }

    fn compile(patterns: &[String]) -> Result<Option<GlobSet>, globset::Error> {
        if patterns.is_empty() {
            return Ok(None);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(
                GlobBuilder::new(pattern)
                    .case_insensitive(true)
                    .literal_separator(false)
                    .build()?,
            );
        }
        Ok(Some(builder.build()?))
    }

    /// A model is supported iff it matches at least one `supported` glob
    /// (vacuously true when the list is empty) and no `excluded` glob.
    #[must_use]
    pub fn supports(&self, model: &str) -> bool {
        let supported = match self.supported {
            Some(ref set) => set.is_match(model),
            None => true,
        };
        let excluded = self
            .excluded
            .as_ref()
            .is_some_and(|set| set.is_match(model));
        supported && !excluded
    }

    /// Whether the model matches a `preferred` glob. Never filters.
    #[must_use]
    pub fn prefers(&self, model: &str) -> bool {
        self.preferred
            .as_ref()
            .is_some_and(|set| set.is_match(model))
    }
}

// ============================================================================
// Backend Errors
// ============================================================================

/// Failures from a backend driver.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Could not reach the backend.
    #[error("connection to backend failed: {0}")]
    Connection(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, best effort.
        body: String,
    },

    /// The backend's response could not be decoded.
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

// ============================================================================
// Backend Trait
// ============================================================================

/// The capability set the router needs from an inference backend.
///
/// Implementations must be safe for concurrent invocation; concurrency
/// limits are the backend's own concern. Health *state* is owned by the
/// registry — [`Backend::health_check`] is the active probe it feeds from.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stable backend identifier (e.g. `"npu"`, `"gpu"`, `"cpu"`).
    fn id(&self) -> &str;

    /// Static hardware characteristics.
    fn characteristics(&self) -> &BackendCharacteristics;

    /// Whether this backend can serve the named model.
    fn supports_model(&self, model: &str) -> bool;

    /// Whether this backend is preferred for the named model.
    fn prefers_model(&self, model: &str) -> bool;

    /// Active reachability probe. Drives registry health marking.
    async fn health_check(&self) -> bool;

    /// Run a generation to completion.
    async fn generate(&self, request: &GenerateRequest)
        -> Result<GenerateResponse, BackendError>;

    /// Run a streaming generation. The channel closes when the response
    /// completes or fails.
    async fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<mpsc::Receiver<StreamChunk>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars_with(
        supported: &[&str],
        preferred: &[&str],
        excluded: &[&str],
    ) -> BackendCharacteristics {
        BackendCharacteristics {
            supported: supported.iter().map(|s| s.to_string()).collect(),
            preferred: preferred.iter().map(|s| s.to_string()).collect(),
            excluded: excluded.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_lists_match_all_and_exclude_none() {
        let matcher = ModelMatcher::new(&chars_with(&[], &[], &[])).unwrap();
        assert!(matcher.supports("llama3.2:3b"));
        assert!(matcher.supports("anything-at-all"));
        assert!(!matcher.prefers("llama3.2:3b"));
    }

    #[test]
    fn test_supported_globs() {
        let matcher = ModelMatcher::new(&chars_with(&["llama*", "qwen2.5:*"], &[], &[])).unwrap();
        assert!(matcher.supports("llama3.2:3b"));
        assert!(matcher.supports("qwen2.5:0.5b"));
        assert!(!matcher.supports("mistral:7b"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let matcher = ModelMatcher::new(&chars_with(&["Llama*"], &[], &[])).unwrap();
        assert!(matcher.supports("llama3.2"));
        assert!(matcher.supports("LLAMA3.2"));
    }

    #[test]
    fn test_excluded_wins_over_supported() {
        let matcher = ModelMatcher::new(&chars_with(&["*"], &[], &["*:70b"])).unwrap();
        assert!(matcher.supports("llama3.2:3b"));
        assert!(!matcher.supports("llama3.1:70b"));
    }

    #[test]
    fn test_preferred_does_not_filter() {
        let matcher = ModelMatcher::new(&chars_with(&["qwen*"], &["qwen2.5:*"], &[])).unwrap();
        assert!(matcher.supports("qwen2:7b"));
        assert!(!matcher.prefers("qwen2:7b"));
        assert!(matcher.prefers("qwen2.5:0.5b"));
    }

    #[test]
    fn test_malformed_glob_is_rejected() {
        assert!(ModelMatcher::new(&chars_with(&["[unclosed"], &[], &[])).is_err());
    }

    #[test]
    fn test_health_routable() {
        assert!(Health::Healthy.routable());
        assert!(Health::Degraded.routable());
        assert!(!Health::Down.routable());
    }

    #[test]
    fn test_serves_media() {
        let chars = BackendCharacteristics {
            media_types: vec![MediaType::Text, MediaType::Embedding],
            ..Default::default()
        };
        assert!(chars.serves_media(None));
        assert!(chars.serves_media(Some(MediaType::Text)));
        assert!(!chars.serves_media(Some(MediaType::Image)));
    }
}
