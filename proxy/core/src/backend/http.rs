//! HTTP Backend Driver
//!
//! Driver for ollama-compatible inference engines reachable over HTTP.
//! Each hardware runtime on the host (NPU, GPU, CPU) runs its own engine
//! instance on its own port; one [`HttpBackend`] fronts each of them.
//!
//! # Engine API
//!
//! - `POST /api/generate` - completions, streaming (NDJSON) or batch
//! - `GET /api/tags` - model listing, doubles as the health probe

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::traits::{Backend, BackendCharacteristics, BackendError, ModelMatcher};
use crate::request::{GenerateRequest, GenerateResponse, StreamChunk};

/// Channel capacity for streaming tokens.
const STREAM_BUFFER: usize = 100;

/// One NDJSON record from `/api/generate`. The engine interleaves token
/// records (`response` set, `done` false) with a final record carrying
/// `done: true`; stat-only records decode with both fields defaulted.
#[derive(Debug, Deserialize)]
struct EngineChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Backend driver for one ollama-compatible engine endpoint.
pub struct HttpBackend {
    id: String,
    base_url: String,
    characteristics: BackendCharacteristics,
    matcher: ModelMatcher,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a driver for the engine at `base_url` (e.g.
    /// `http://127.0.0.1:11434`), carrying the declared characteristics.
    /// Fails if the model pattern lists contain malformed globs.
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        characteristics: BackendCharacteristics,
    ) -> Result<Self, globset::Error> {
        let matcher = ModelMatcher::new(&characteristics)?;
        Ok(Self {
            id: id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            characteristics,
            matcher,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    fn build_body(&self, request: &GenerateRequest, stream: bool) -> serde_json::Value {
        let mut prompt = String::new();
        if let Some(ref system) = request.system {
            prompt.push_str(system);
            prompt.push_str("\n\n");
        }
        prompt.push_str(&request.prompt);

        let mut body = serde_json::json!({
            "model": request.model,
            "prompt": prompt,
            "stream": stream,
        });

        let mut options = serde_json::Map::new();
        if (request.temperature - 0.7).abs() > f32::EPSILON {
            options.insert("temperature".to_string(), request.temperature.into());
        }
        if request.max_tokens > 0 {
            options.insert("num_predict".to_string(), request.max_tokens.into());
        }
        if !options.is_empty() {
            body["options"] = options.into();
        }

        body
    }
}

#[async_trait]
impl Backend for HttpBackend {
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
        self.client
            .get(self.tags_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendError> {
        let start = Instant::now();
        let body = self.build_body(request, false);

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let chunk: EngineChunk = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        Ok(GenerateResponse {
            content: chunk.response,
            model: request.model.clone(),
            tokens_used: chunk.eval_count,
            duration_ms: Some(start.elapsed().as_millis() as u64),
        })
    }

    async fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<mpsc::Receiver<StreamChunk>, BackendError> {
        let body = self.build_body(request, true);

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let mut byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            // Bytes carried over between HTTP chunks; a record can arrive
            // split anywhere, including mid-token.
            let mut carry: Vec<u8> = Vec::new();
            let mut assembled = String::new();

            while let Some(result) = byte_stream.next().await {
                let bytes = match result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(StreamChunk::Error(e.to_string())).await;
                        return;
                    }
                };
                carry.extend_from_slice(&bytes);

                while let Some(record) = take_record(&mut carry) {
                    // Keep-alive blanks and unrecognized records are skipped;
                    // only token and done records matter here.
                    let Ok(chunk) = serde_json::from_slice::<EngineChunk>(&record) else {
                        continue;
                    };

                    if !chunk.response.is_empty() {
                        assembled.push_str(&chunk.response);
                        if tx.send(StreamChunk::Token(chunk.response)).await.is_err() {
                            // Reader closed early, stop pulling from the engine
                            return;
                        }
                    }

                    if chunk.done {
                        let _ = tx.send(StreamChunk::Done { message: assembled }).await;
                        return;
                    }
                }
            }

            // Engine hung up without a done record; still give the reader
            // a terminal event for whatever arrived.
            if !assembled.is_empty() {
                let _ = tx.send(StreamChunk::Done { message: assembled }).await;
            }
        });

        Ok(rx)
    }
}

/// Split one newline-terminated record off the front of the carry buffer.
/// Returns `None` while the buffer holds only a partial record.
fn take_record(carry: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = carry.iter().position(|&b| b == b'\n')?;
    let mut record: Vec<u8> = carry.drain(..=end).collect();
    record.pop();
    Some(record)
}
