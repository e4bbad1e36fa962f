//! Proxy Daemon
//!
//! Standalone server process for the inference proxy. Clients (desktop
//! settings, tray toggle, CLIs) connect over a Unix socket and speak the
//! line-delimited JSON protocol in [`server`].
//!
//! # Usage
//!
//! ```bash
//! # Start with default config and socket paths
//! proxy-daemon
//!
//! # Explicit config and socket
//! proxy-daemon --config /etc/inference-proxy/proxy.toml \
//!              --socket /tmp/proxy.sock
//!
//! # With verbose logging
//! RUST_LOG=debug proxy-daemon
//! ```
//!
//! # Files
//!
//! - Socket: `$XDG_RUNTIME_DIR/inference-proxy/proxy.sock`
//!   (or `/tmp/inference-proxy-$UID/proxy.sock`)
//! - PID file: next to the socket
//! - Last-mode state: `$XDG_STATE_HOME/inference-proxy/last-mode`
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: graceful shutdown (removes PID file and socket)

mod server;

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use proxy_core::{
    Backend, BackendRegistry, ConfigSource, EfficiencyController, FileConfig, Health,
    HttpBackend, PolicyFacade, ProxyConfig, QueueManager, Router, SystemMonitor,
};

use server::{ProxyServer, ProxyState};

/// Efficiency-aware local inference proxy daemon.
#[derive(Debug, Parser)]
#[command(name = "proxy-daemon", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Unix socket path override.
    #[arg(long, env = "PROXY_SOCKET")]
    socket: Option<PathBuf>,
}

/// Default socket path: `$XDG_RUNTIME_DIR/inference-proxy/proxy.sock`,
/// falling back to `/tmp/inference-proxy-$UID/proxy.sock`.
fn default_socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir)
            .join("inference-proxy")
            .join("proxy.sock")
    } else {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/inference-proxy-{uid}/proxy.sock"))
    }
}

fn write_pid_file(path: &PathBuf) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let pid = std::process::id();
    let mut file = fs::File::create(path)?;
    writeln!(file, "{pid}")?;
    info!(pid, path = ?path, "PID file created");
    Ok(())
}

fn remove_pid_file(path: &PathBuf) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(error = %e, path = ?path, "Failed to remove PID file");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("proxy_daemon=info".parse()?)
                .add_directive("proxy_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    info!("Starting inference proxy daemon");

    // Configuration
    let config = match args.config {
        Some(path) => ProxyConfig::load_from_path(Some(path))?,
        None => ProxyConfig::load()?,
    };
    let source: Arc<FileConfig> = Arc::new(FileConfig::new(
        config.clone(),
        proxy_core::config::default_state_path(),
    ));

    // Core components
    let registry = Arc::new(BackendRegistry::new());
    for decl in source.backends() {
        let backend = HttpBackend::new(decl.id.clone(), decl.url.clone(), decl.characteristics)
            .with_context(|| format!("backend {} has invalid model patterns", decl.id))?;
        registry.register(Arc::new(backend));
    }
    if registry.is_empty() {
        warn!("No backends configured; all routing will fail until some are added");
    }

    let queues = Arc::new(QueueManager::new());
    let monitor = Arc::new(SystemMonitor::new(config.probe_interval()));
    monitor.refresh();

    let controller = Arc::new(EfficiencyController::from_config(
        monitor.clone(),
        source.clone(),
    ));
    let facade = Arc::new(PolicyFacade::new(controller.clone(), monitor.clone()));
    let router = Arc::new(Router::new(
        Arc::clone(&registry),
        Arc::clone(&queues),
        Arc::clone(&controller),
    ));
    info!(
        mode = facade.get_mode(),
        effective = facade.get_effective_mode(),
        backends = registry.len(),
        "Proxy core ready"
    );

    // Background loops: probe refresh drives Auto re-derivation; the
    // health loop feeds registry marks.
    let _probe_task = Arc::clone(&monitor).spawn_poll_loop({
        let controller = Arc::clone(&controller);
        move || controller.recompute()
    });
    let _health_task = tokio::spawn({
        let registry = Arc::clone(&registry);
        let interval = config.health_interval();
        async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                for backend in registry.list() {
                    let reachable = backend.health_check().await;
                    let mark = if reachable { Health::Healthy } else { Health::Down };
                    registry.set_health(backend.id(), mark);
                }
            }
        }
    });

    // Socket and PID files
    let socket_path = args
        .socket
        .or(config.ipc.socket_path.clone())
        .unwrap_or_else(default_socket_path);
    let pid_path = socket_path.with_extension("pid");

    if let Some(parent) = socket_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create socket directory {parent:?}"))?;
        // Socket dir is per-user
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(parent, fs::Permissions::from_mode(0o700))?;
    }
    if socket_path.exists() {
        warn!(path = ?socket_path, "Removing stale socket file");
        fs::remove_file(&socket_path)
            .with_context(|| format!("failed to remove stale socket at {socket_path:?}"))?;
    }
    write_pid_file(&pid_path)?;

    // Shutdown on SIGINT/SIGTERM
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let ctrl_c = async {
                signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
            };
            let terminate = async {
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to install signal handler")
                    .recv()
                    .await;
            };
            tokio::select! {
                _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
                _ = terminate => info!("Received SIGTERM, shutting down"),
            }
            shutdown.cancel();
        }
    });

    // Serve
    let state = Arc::new(ProxyState {
        router,
        facade,
        announce_mode_changes: source.notify_on_mode_change(),
    });
    let server = ProxyServer::new(socket_path.clone(), state);
    let result = server.run(shutdown).await;

    // Cleanup
    remove_pid_file(&pid_path);
    if socket_path.exists() {
        if let Err(e) = fs::remove_file(&socket_path) {
            warn!(error = %e, "Failed to remove socket file");
        }
    }

    if let Err(ref e) = result {
        error!(error = %e, "Server exited with error");
    } else {
        info!("Proxy daemon stopped cleanly");
    }
    result
}
