//! Generation Requests and Routing Annotations
//!
//! Per-request types shared between the router and the backend drivers.
//! A [`GenerateRequest`] carries the prompt and model; [`Annotations`]
//! carry the routing hints clients may attach (explicit target, latency
//! and power ceilings, priority, media type). All annotation fields are
//! optional; zero means unset for the numeric ceilings.

use serde::{Deserialize, Serialize};

// ============================================================================
// Priority
// ============================================================================

/// Four-level request priority, ordered `Low < Normal < High < Critical`.
///
/// Encoded as 0..=3 on the wire; out-of-range values are rejected at the
/// boundary via [`Priority::try_from`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    /// Background work, routed last.
    Low = 0,
    /// Interactive default.
    #[default]
    Normal = 1,
    /// Elevated interactive traffic.
    High = 2,
    /// Latency-sensitive traffic that sees the full queue depth.
    Critical = 3,
}

impl Priority {
    /// Index into per-priority counter arrays.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Priority {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Low),
            1 => Ok(Self::Normal),
            2 => Ok(Self::High),
            3 => Ok(Self::Critical),
            other => Err(other),
        }
    }
}

// ============================================================================
// Media Type
// ============================================================================

/// Kind of content a request produces or consumes.
///
/// Backends declare the media types they can serve; a request may pin one.
/// An unspecified media type (`None` at the annotation level) matches any
/// backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    /// Plain text generation.
    Text,
    /// Image generation or understanding.
    Image,
    /// Audio generation or transcription.
    Audio,
    /// Vector embeddings.
    Embedding,
}

// ============================================================================
// Annotations
// ============================================================================

/// Routing hints attached to a single request. All fields optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    /// Explicit backend id. Empty or `"auto"` lets the router decide.
    pub target: String,

    /// Soft hint: this request cares about time-to-response.
    pub latency_critical: bool,

    /// Soft hint: this request prefers low power draw.
    pub prefer_power_efficiency: bool,

    /// Hard ceiling on backend average latency in milliseconds. 0 = unset.
    pub max_latency_ms: u64,

    /// Hard ceiling on backend power draw in watts. 0 = unset.
    pub max_power_watts: f64,

    /// Deadline for completion in milliseconds. 0 = unset. Used only to
    /// drop backends whose estimated wait would blow the deadline; the
    /// router does not enforce it after dispatch.
    pub deadline_ms: u64,

    /// Request priority.
    pub priority: Priority,

    /// Media type the request needs, if any.
    pub media_type: Option<MediaType>,
}

impl Annotations {
    /// Create empty annotations (router decides everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the request to a specific backend id.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Mark the request latency-critical.
    #[must_use]
    pub fn latency_critical(mut self) -> Self {
        self.latency_critical = true;
        self
    }

    /// Mark the request power-conscious.
    #[must_use]
    pub fn prefer_power_efficiency(mut self) -> Self {
        self.prefer_power_efficiency = true;
        self
    }

    /// Set the latency ceiling in milliseconds.
    #[must_use]
    pub fn with_max_latency_ms(mut self, ms: u64) -> Self {
        self.max_latency_ms = ms;
        self
    }

    /// Set the power ceiling in watts.
    #[must_use]
    pub fn with_max_power_watts(mut self, watts: f64) -> Self {
        self.max_power_watts = watts;
        self
    }

    /// Set the completion deadline in milliseconds.
    #[must_use]
    pub fn with_deadline_ms(mut self, ms: u64) -> Self {
        self.deadline_ms = ms;
        self
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the media type.
    #[must_use]
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }

    /// The explicit target, if one is set. Empty and `"auto"` mean none.
    #[must_use]
    pub fn explicit_target(&self) -> Option<&str> {
        if self.target.is_empty() || self.target == "auto" {
            None
        } else {
            Some(&self.target)
        }
    }
}

// ============================================================================
// Generation Request / Response
// ============================================================================

/// A model-generation request, as handed to a backend driver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Unique request ID, for logging and correlation.
    pub request_id: String,
    /// The prompt to complete.
    pub prompt: String,
    /// Model name (backend-specific identifier, e.g. `llama3.2:3b`).
    pub model: String,
    /// Maximum tokens in the response (0 = backend default).
    pub max_tokens: u32,
    /// Sampling temperature (0.0-1.0).
    pub temperature: f32,
    /// System prompt, prepended if set.
    pub system: Option<String>,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            prompt: String::new(),
            model: String::new(),
            max_tokens: 0,
            temperature: 0.7,
            system: None,
        }
    }
}

impl GenerateRequest {
    /// Create a new request with prompt and model.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the response token cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Response from a non-streaming generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The generated text.
    pub content: String,
    /// Model that produced it.
    pub model: String,
    /// Tokens generated, if the backend reports it.
    pub tokens_used: Option<u32>,
    /// End-to-end generation time in milliseconds.
    pub duration_ms: Option<u64>,
}

/// Events on a streaming generation channel.
#[derive(Clone, Debug)]
pub enum StreamChunk {
    /// A token from the response.
    Token(String),
    /// Stream finished successfully.
    Done {
        /// The complete assembled message.
        message: String,
    },
    /// The backend failed mid-stream.
    Error(String),
}
