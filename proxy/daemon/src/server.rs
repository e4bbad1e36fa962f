//! Daemon Server
//!
//! Accepts connections on a Unix socket and speaks a line-delimited JSON
//! protocol: each request is one JSON object with an `"op"` field, each
//! response one JSON object with an `"ok"` field. Effective-mode changes
//! are pushed to every connected client as
//! `{"event": "mode_changed", "mode": "..."}` when announcements are
//! enabled in configuration.
//!
//! # Operations
//!
//! | op                   | request fields                      | response |
//! |----------------------|-------------------------------------|----------|
//! | `set_mode`           | `mode`                              | `ok`     |
//! | `get_mode`           |                                     | `mode`   |
//! | `get_effective_mode` |                                     | `mode`   |
//! | `list_modes`         |                                     | `modes`  |
//! | `get_system_state`   |                                     | `state`  |
//! | `generate`           | `prompt`, `model`, `stream`,        | response |
//! |                      | `annotations` (all optional hints)  | or chunks|

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use proxy_core::{
    Annotations, GenerateRequest, MediaType, PolicyFacade, Priority, Router, StreamChunk,
};

/// Shared handles the server dispatches against.
pub struct ProxyState {
    /// The request router.
    pub router: Arc<Router>,
    /// Policy surface.
    pub facade: Arc<PolicyFacade>,
    /// Whether to push mode-change events to clients.
    pub announce_mode_changes: bool,
}

/// The Unix-socket server.
pub struct ProxyServer {
    socket_path: PathBuf,
    state: Arc<ProxyState>,
}

impl ProxyServer {
    /// Create a server bound to nothing yet.
    pub fn new(socket_path: PathBuf, state: Arc<ProxyState>) -> Self {
        Self { socket_path, state }
    }

    /// Accept connections until the shutdown token fires.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("failed to bind {:?}", self.socket_path))?;
        info!(path = ?self.socket_path, "Listening for connections");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutting down server");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let state = Arc::clone(&self.state);
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, state, shutdown).await {
                                    debug!(error = %e, "Connection closed with error");
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "Accept failed"),
                    }
                }
            }
        }

        Ok(())
    }
}

async fn handle_connection(
    stream: UnixStream,
    state: Arc<ProxyState>,
    shutdown: CancellationToken,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut mode_events = state.facade.subscribe_mode_changed();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = mode_events.recv(), if state.announce_mode_changes => {
                let Some(mode) = changed else { break };
                let event = serde_json::json!({
                    "event": "mode_changed",
                    "mode": mode.wire_name(),
                });
                write_line(&mut write_half, &event).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                dispatch_line(&line, &state, &mut write_half, &shutdown).await?;
            }
        }
    }

    Ok(())
}

async fn dispatch_line(
    line: &str,
    state: &ProxyState,
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    shutdown: &CancellationToken,
) -> Result<()> {
    let request: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return write_line(writer, &error_response(format!("invalid JSON: {e}"))).await;
        }
    };

    let op = request.get("op").and_then(|o| o.as_str()).unwrap_or("");
    match op {
        "set_mode" => {
            let mode = request.get("mode").and_then(|m| m.as_str()).unwrap_or("");
            let ok = state.facade.set_mode(mode);
            write_line(writer, &serde_json::json!({ "ok": ok })).await
        }
        "get_mode" => {
            write_line(
                writer,
                &serde_json::json!({ "ok": true, "mode": state.facade.get_mode() }),
            )
            .await
        }
        "get_effective_mode" => {
            write_line(
                writer,
                &serde_json::json!({ "ok": true, "mode": state.facade.get_effective_mode() }),
            )
            .await
        }
        "list_modes" => {
            write_line(
                writer,
                &serde_json::json!({ "ok": true, "modes": state.facade.list_modes() }),
            )
            .await
        }
        "get_system_state" => {
            write_line(
                writer,
                &serde_json::json!({ "ok": true, "state": state.facade.get_system_state() }),
            )
            .await
        }
        "generate" => handle_generate(&request, state, writer, shutdown).await,
        other => {
            write_line(writer, &error_response(format!("unknown op: {other}"))).await
        }
    }
}

async fn handle_generate(
    request: &serde_json::Value,
    state: &ProxyState,
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    shutdown: &CancellationToken,
) -> Result<()> {
    let prompt = request.get("prompt").and_then(|p| p.as_str()).unwrap_or("");
    let model = request.get("model").and_then(|m| m.as_str()).unwrap_or("");
    if model.is_empty() {
        return write_line(writer, &error_response("missing model".to_string())).await;
    }
    let stream = request
        .get("stream")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(true);

    let annotations = match parse_annotations(request.get("annotations")) {
        Ok(a) => a,
        Err(e) => return write_line(writer, &error_response(e)).await,
    };

    let generate_request = GenerateRequest::new(prompt, model);
    let routed = match state
        .router
        .route(&generate_request, &annotations, shutdown)
    {
        Ok(r) => r,
        Err(e) => return write_line(writer, &error_response(e.to_string())).await,
    };
    let backend_id = routed.id().to_string();
    debug!(request = %generate_request.request_id, backend = %backend_id, "Dispatching generation");

    if stream {
        let mut chunks = match routed.generate_stream(&generate_request).await {
            Ok(s) => s,
            Err(e) => return write_line(writer, &error_response(e.to_string())).await,
        };
        while let Some(chunk) = chunks.recv().await {
            let line = match chunk {
                StreamChunk::Token(token) => serde_json::json!({ "token": token }),
                StreamChunk::Done { message } => serde_json::json!({
                    "ok": true,
                    "done": true,
                    "message": message,
                    "backend": backend_id,
                }),
                StreamChunk::Error(e) => error_response(e),
            };
            write_line(writer, &line).await?;
        }
        Ok(())
    } else {
        match routed.generate(&generate_request).await {
            Ok(response) => {
                write_line(
                    writer,
                    &serde_json::json!({
                        "ok": true,
                        "response": response,
                        "backend": backend_id,
                    }),
                )
                .await
            }
            Err(e) => write_line(writer, &error_response(e.to_string())).await,
        }
    }
}

/// Decode the `annotations` object. Priority arrives as 0..=3 and is
/// rejected out of range; everything else is optional.
fn parse_annotations(value: Option<&serde_json::Value>) -> Result<Annotations, String> {
    let Some(value) = value else {
        return Ok(Annotations::new());
    };

    let mut annotations = Annotations::new();
    if let Some(target) = value.get("target").and_then(|t| t.as_str()) {
        annotations.target = target.to_string();
    }
    annotations.latency_critical = value
        .get("latency_critical")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    annotations.prefer_power_efficiency = value
        .get("prefer_power_efficiency")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    if let Some(ms) = value.get("max_latency_ms").and_then(serde_json::Value::as_u64) {
        annotations.max_latency_ms = ms;
    }
    if let Some(watts) = value.get("max_power_watts").and_then(serde_json::Value::as_f64) {
        annotations.max_power_watts = watts;
    }
    if let Some(ms) = value.get("deadline_ms").and_then(serde_json::Value::as_u64) {
        annotations.deadline_ms = ms;
    }
    if let Some(priority) = value.get("priority").and_then(serde_json::Value::as_u64) {
        let raw = u8::try_from(priority).map_err(|_| format!("priority out of range: {priority}"))?;
        annotations.priority =
            Priority::try_from(raw).map_err(|v| format!("priority out of range: {v}"))?;
    }
    if let Some(media) = value.get("media_type").and_then(|m| m.as_str()) {
        annotations.media_type = Some(match media {
            "Text" => MediaType::Text,
            "Image" => MediaType::Image,
            "Audio" => MediaType::Audio,
            "Embedding" => MediaType::Embedding,
            other => return Err(format!("unknown media type: {other}")),
        });
    }

    Ok(annotations)
}

fn error_response(message: String) -> serde_json::Value {
    serde_json::json!({ "ok": false, "error": message })
}

async fn write_line(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    value: &serde_json::Value,
) -> Result<()> {
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    Ok(())
}
