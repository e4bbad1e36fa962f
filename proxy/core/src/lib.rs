//! Proxy Core - Efficiency-Aware Routing for Local Inference
//!
//! This crate is the engine of a local-host inference proxy: it accepts
//! model-generation requests and dispatches each one to the most
//! appropriate of several hardware-distinct backends (NPU, GPU, CPU
//! runtimes), trading speed against energy use under an operator-settable
//! efficiency policy.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        proxy-daemon                           │
//! │        (Unix-socket IPC, signals, background loops)           │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────┐
//! │                         PROXY CORE                            │
//! │                                                               │
//! │  ┌────────────┐   ┌──────────────┐   ┌────────────────────┐  │
//! │  │  Registry  │   │ QueueManager │   │ SystemMonitor      │  │
//! │  │ (backends, │   │ (in-flight   │   │ (battery, thermal, │  │
//! │  │  health)   │   │  tracking)   │   │  fans, clock)      │  │
//! │  └─────┬──────┘   └──────┬───────┘   └─────────┬──────────┘  │
//! │        │                 │                     │             │
//! │        │                 │           ┌─────────┴──────────┐  │
//! │        │                 │           │ EfficiencyController│ │
//! │        │                 │           │ (configured -> eff.)│ │
//! │        │                 │           └─────────┬──────────┘  │
//! │        └────────┬────────┴─────────────────────┘             │
//! │                 ▼                                            │
//! │           ┌──────────┐          ┌──────────────┐             │
//! │           │  Router  │          │ PolicyFacade │             │
//! │           └────┬─────┘          └──────────────┘             │
//! │                ▼                                             │
//! │        RoutedBackend ──> Backend (HTTP drivers)              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Router`]: filters and scores backends per request
//! - [`EfficiencyController`]: owns configured/effective mode state
//! - [`BackendRegistry`] / [`QueueManager`]: live backend set and load
//! - [`SystemMonitor`]: battery/thermal/fan/clock snapshots
//! - [`PolicyFacade`]: the IPC-facing policy surface
//! - [`Backend`]: the capability every driver implements
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use proxy_core::{
//!     Annotations, BackendRegistry, EfficiencyController, GenerateRequest,
//!     HttpBackend, QueueManager, QuietHours, Router, StaticProbe,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! let registry = Arc::new(BackendRegistry::new());
//! registry.register(Arc::new(HttpBackend::new(
//!     "cpu",
//!     "http://127.0.0.1:11434",
//!     Default::default(),
//! )?));
//!
//! let queues = Arc::new(QueueManager::new());
//! let controller = Arc::new(EfficiencyController::new(
//!     Arc::new(StaticProbe::default()),
//!     QuietHours::default(),
//!     Default::default(),
//! ));
//! let router = Router::new(registry, queues, controller);
//!
//! let request = GenerateRequest::new("why is the sky blue?", "llama3.2");
//! let routed = router.route(&request, &Annotations::new(), &CancellationToken::new())?;
//! let response = routed.generate(&request).await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod facade;
pub mod mode;
pub mod probe;
pub mod request;
pub mod routing;

// Re-exports for convenience
pub use backend::{Backend, BackendCharacteristics, BackendError, Health, HttpBackend};
pub use config::{BackendDecl, ConfigError, ConfigSource, FileConfig, ProxyConfig};
pub use controller::{derive_auto, EfficiencyController, QuietHours};
pub use error::{PolicyError, RouteError};
pub use facade::PolicyFacade;
pub use mode::EfficiencyMode;
pub use probe::{StaticProbe, SystemMonitor, SystemStateProbe, SystemStateSnapshot};
pub use request::{
    Annotations, GenerateRequest, GenerateResponse, MediaType, Priority, StreamChunk,
};
pub use routing::{BackendRegistry, QueueManager, RoutedBackend, Router, TrackedStream};
