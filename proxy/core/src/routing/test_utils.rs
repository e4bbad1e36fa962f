//! Test Helpers
//!
//! A canned in-memory backend for exercising the routing layer without a
//! live engine.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::backend::{Backend, BackendCharacteristics, BackendError, ModelMatcher};
use crate::request::{GenerateRequest, GenerateResponse, StreamChunk};

/// In-memory backend with fixed characteristics and canned responses.
pub struct StaticBackend {
    id: String,
    characteristics: BackendCharacteristics,
    matcher: ModelMatcher,
    reachable: bool,
}

impl StaticBackend {
    /// Backend with default characteristics.
    pub fn named(id: impl Into<String>) -> Self {
        Self::new(id, BackendCharacteristics::default())
    }

    /// Backend with the given characteristics. Panics on malformed globs,
    /// which is fine for fixtures.
    pub fn new(id: impl Into<String>, characteristics: BackendCharacteristics) -> Self {
        let matcher = ModelMatcher::new(&characteristics).expect("valid fixture globs");
        Self {
            id: id.into(),
            characteristics,
            matcher,
            reachable: true,
        }
    }

    /// Make `health_check` report failure.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }
}

#[async_trait]
impl Backend for StaticBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn characteristics(&self) -> &BackendCharacteristics {
        &self.characteristics
    }

    fn supports_model(&self, model: &str) -> bool {
        self.matcher.supports(model)
    }

    fn prefers_model(&self, model: &str) -> bool {
        self.matcher.prefers(model)
    }

    async fn health_check(&self) -> bool {
        self.reachable
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendError> {
        Ok(GenerateResponse {
            content: format!("{} answered", self.id),
            model: request.model.clone(),
            tokens_used: Some(2),
            duration_ms: Some(1),
        })
    }

    async fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<mpsc::Receiver<StreamChunk>, BackendError> {
        let (tx, rx) = mpsc::channel(8);
        let id = self.id.clone();
        let _ = request;
        tokio::spawn(async move {
            let _ = tx.send(StreamChunk::Token(id.clone())).await;
            let _ = tx.send(StreamChunk::Token(" answered".to_string())).await;
            let _ = tx
                .send(StreamChunk::Done {
                    message: format!("{id} answered"),
                })
                .await;
        });
        Ok(rx)
    }
}
