//! Inference Backends
//!
//! The [`Backend`] capability trait and the HTTP driver for
//! ollama-compatible engines. The routing layer consumes backends only
//! through the trait; adding a new transport means implementing it.

pub mod http;
pub mod traits;

pub use http::HttpBackend;
pub use traits::{Backend, BackendCharacteristics, BackendError, Health, ModelMatcher};
