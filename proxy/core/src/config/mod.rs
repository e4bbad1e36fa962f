//! TOML Configuration
//!
//! Centralized configuration loading for the proxy, from a TOML file at
//! `$XDG_CONFIG_HOME/inference-proxy/proxy.toml`. Every section is
//! optional; an absent file yields pure defaults so the daemon can start
//! on an unconfigured machine.
//!
//! # Example Configuration
//!
//! ```toml
//! [policy]
//! default_mode = "Auto"
//! remember_last_mode = true
//! notify_on_mode_change = true
//!
//! [policy.quiet_hours]
//! enabled = true
//! start_hour = 22
//! end_hour = 7
//!
//! [probe]
//! poll_interval_secs = 10
//!
//! [health]
//! check_interval_secs = 30
//!
//! [ipc]
//! socket_path = "/run/user/1000/inference-proxy/proxy.sock"
//!
//! [[backend]]
//! id = "npu"
//! url = "http://127.0.0.1:11434"
//! power_watts = 8.0
//! avg_latency_ms = 200
//! max_tokens_per_second = 50
//! priority = 0
//! max_model_size_gb = 4
//! supported = ["qwen2.5:*", "llama3.2:1b"]
//! preferred = ["qwen2.5:0.5b"]
//!
//! [[backend]]
//! id = "cpu"
//! url = "http://127.0.0.1:11435"
//! power_watts = 20.0
//! avg_latency_ms = 800
//! max_tokens_per_second = 10
//! priority = 2
//! ```
//!
//! # Persisted state
//!
//! A single string — the last configured mode — lives in its own file
//! under the XDG state directory. Corrupt or unknown contents are
//! discarded at load; write failures are logged and swallowed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{BackendCharacteristics, ModelMatcher};
use crate::controller::QuietHours;
use crate::mode::EfficiencyMode;

/// Directory name under the XDG config/state roots.
const APP_DIR: &str = "inference-proxy";
/// Config file name.
const CONFIG_FILE: &str = "proxy.toml";
/// Persisted last-mode file name.
const LAST_MODE_FILE: &str = "last-mode";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file at {path}: {source}")]
    Read {
        /// The path that was attempted.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Structurally valid TOML with an invalid value.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

// =============================================================================
// Config Source
// =============================================================================

/// What the controller and daemon need from configuration, abstracted so
/// tests and alternative frontends can inject their own.
pub trait ConfigSource: Send + Sync {
    /// Mode to configure when no valid last-mode is persisted.
    fn initial_mode(&self) -> EfficiencyMode;

    /// Whether the configured mode should survive restarts.
    fn remember_last_mode(&self) -> bool;

    /// Quiet-hours window for the `Auto` derivation.
    fn quiet_hours(&self) -> QuietHours;

    /// Whether mode changes should be announced to desktop consumers.
    fn notify_on_mode_change(&self) -> bool;

    /// Static backend declarations.
    fn backends(&self) -> Vec<BackendDecl>;

    /// Persisted last mode, if any valid one exists.
    fn last_mode(&self) -> Option<EfficiencyMode>;

    /// Persist the configured mode. May be a no-op; never fails loudly.
    fn set_last_mode(&self, mode: EfficiencyMode);
}

// =============================================================================
// TOML Structures
// =============================================================================

/// One `[[backend]]` table: identity, endpoint, and characteristics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendDecl {
    /// Stable backend id.
    pub id: String,
    /// Engine base URL.
    pub url: String,
    /// Hardware characteristics, inlined into the table.
    #[serde(flatten)]
    pub characteristics: BackendCharacteristics,
}

/// `[policy]` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// Mode configured at cold start (subject to last-mode restore).
    pub default_mode: EfficiencyMode,
    /// Persist and restore the configured mode across restarts.
    pub remember_last_mode: bool,
    /// Announce mode changes to desktop consumers.
    pub notify_on_mode_change: bool,
    /// Quiet-hours window.
    pub quiet_hours: QuietHours,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            default_mode: EfficiencyMode::Balanced,
            remember_last_mode: true,
            notify_on_mode_change: true,
            quiet_hours: QuietHours::default(),
        }
    }
}

/// `[probe]` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSection {
    /// System-state poll interval in seconds (clamped to 5..=30 by the
    /// monitor).
    pub poll_interval_secs: u64,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
        }
    }
}

/// `[health]` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSection {
    /// Backend health-check cadence in seconds.
    pub check_interval_secs: u64,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            check_interval_secs: 30,
        }
    }
}

/// `[ipc]` section.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcSection {
    /// Unix socket path override. Defaults to the runtime dir.
    pub socket_path: Option<PathBuf>,
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Efficiency-policy settings.
    pub policy: PolicySection,
    /// System-state probe settings.
    pub probe: ProbeSection,
    /// Backend health-check settings.
    pub health: HealthSection,
    /// IPC settings.
    pub ipc: IpcSection,
    /// Declared backends.
    pub backend: Vec<BackendDecl>,
}

impl ProxyConfig {
    /// Load from the default path, falling back to defaults when the file
    /// does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(default_config_path())
    }

    /// Load from an explicit path. `None`, or a path that does not exist,
    /// yields defaults.
    pub fn load_from_path(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;

        tracing::info!(path = ?path, backends = config.backend.len(), "Loaded configuration");
        Ok(config)
    }

    /// Structural validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let quiet = &self.policy.quiet_hours;
        if quiet.start_hour > 23 || quiet.end_hour > 23 {
            return Err(ConfigError::Validation(format!(
                "quiet hours out of range: start={} end={}",
                quiet.start_hour, quiet.end_hour
            )));
        }
        if self.probe.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "probe poll interval must be positive".to_string(),
            ));
        }
        if self.health.check_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "health check interval must be positive".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for decl in &self.backend {
            if decl.id.is_empty() {
                return Err(ConfigError::Validation("backend with empty id".to_string()));
            }
            if decl.url.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "backend {} has no url",
                    decl.id
                )));
            }
            if !seen.insert(decl.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate backend id: {}",
                    decl.id
                )));
            }
            ModelMatcher::new(&decl.characteristics).map_err(|e| {
                ConfigError::Validation(format!("backend {}: bad model glob: {e}", decl.id))
            })?;
        }

        Ok(())
    }

    /// Probe poll interval as a [`Duration`].
    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe.poll_interval_secs)
    }

    /// Health-check cadence as a [`Duration`].
    #[must_use]
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health.check_interval_secs)
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Default config file location: `$XDG_CONFIG_HOME/inference-proxy/proxy.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Default last-mode file location, under the XDG state directory (falls
/// back to the local data directory).
#[must_use]
pub fn default_state_path() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join(APP_DIR).join(LAST_MODE_FILE))
}

// =============================================================================
// File-backed Config Source
// =============================================================================

/// [`ConfigSource`] over a loaded [`ProxyConfig`] plus the last-mode state
/// file.
pub struct FileConfig {
    config: ProxyConfig,
    state_path: Option<PathBuf>,
}

impl FileConfig {
    /// Wrap a loaded config with a state file path. `None` disables
    /// persistence.
    #[must_use]
    pub fn new(config: ProxyConfig, state_path: Option<PathBuf>) -> Self {
        Self { config, state_path }
    }

    /// Load from the default locations.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self::new(ProxyConfig::load()?, default_state_path()))
    }

    /// The wrapped configuration.
    #[must_use]
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

impl ConfigSource for FileConfig {
    fn initial_mode(&self) -> EfficiencyMode {
        self.config.policy.default_mode
    }

    fn remember_last_mode(&self) -> bool {
        self.config.policy.remember_last_mode
    }

    fn quiet_hours(&self) -> QuietHours {
        self.config.policy.quiet_hours
    }

    fn notify_on_mode_change(&self) -> bool {
        self.config.policy.notify_on_mode_change
    }

    fn backends(&self) -> Vec<BackendDecl> {
        self.config.backend.clone()
    }

    fn last_mode(&self) -> Option<EfficiencyMode> {
        let path = self.state_path.as_ref()?;
        let raw = std::fs::read_to_string(path).ok()?;
        let mode = EfficiencyMode::parse(raw.trim());
        if mode.is_none() {
            tracing::warn!(path = ?path, content = %raw.trim(), "Discarding invalid persisted mode");
        }
        mode
    }

    fn set_last_mode(&self, mode: EfficiencyMode) {
        let Some(ref path) = self.state_path else {
            return;
        };
        if let Err(e) = write_last_mode(path, mode) {
            tracing::warn!(path = ?path, error = %e, "Failed to persist mode");
        }
    }
}

fn write_last_mode(path: &Path, mode: EfficiencyMode) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, mode.as_str())
}
