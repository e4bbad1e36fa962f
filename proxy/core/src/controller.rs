//! Efficiency-Mode Controller
//!
//! Owns the configured mode and derives the *effective* mode that routing
//! actually observes. For every configured mode except `Auto` the two are
//! identical; under `Auto` the effective mode is derived from the system
//! state snapshot and the quiet-hours window, re-evaluated on every
//! `set_mode`, on every probe refresh, and on demand.
//!
//! # Derivation under `Auto`
//!
//! Evaluated top-down, first match wins:
//!
//! ```text
//! quiet hours active                      -> Quiet
//! on battery and charge <= 15 %           -> UltraEfficiency
//! on battery and charge <= 40 %           -> Efficiency
//! on battery                              -> Balanced
//! avg temp >= 85 C or avg fan >= 90 %     -> Efficiency
//! otherwise                               -> Performance
//! ```
//!
//! # Concurrency
//!
//! Mutation is serialized behind a mutex; reads go through two atomics so
//! the routing hot path never takes a lock. After `set_mode` returns, any
//! subsequent read observes the new state and subscribers have been
//! notified (fire-and-forget).

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::ConfigSource;
use crate::error::PolicyError;
use crate::mode::EfficiencyMode;
use crate::probe::{SystemStateProbe, SystemStateSnapshot};

// ============================================================================
// Quiet Hours
// ============================================================================

/// Wall-clock window during which `Auto` forces the `Quiet` mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietHours {
    /// Whether the window is honored at all.
    pub enabled: bool,
    /// Window start hour, 0..=23.
    pub start_hour: u8,
    /// Window end hour, 0..=23. A start past the end wraps past midnight.
    pub end_hour: u8,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: true,
            start_hour: 22,
            end_hour: 7,
        }
    }
}

impl QuietHours {
    /// Whether the window covers the given hour. Start-inclusive,
    /// end-exclusive; `start > end` wraps past midnight.
    #[must_use]
    pub fn active_at(&self, hour: u8) -> bool {
        if !self.enabled {
            return false;
        }
        if self.start_hour <= self.end_hour {
            self.start_hour <= hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// The `Auto` derivation table.
#[must_use]
pub fn derive_auto(state: &SystemStateSnapshot, quiet_hours: &QuietHours) -> EfficiencyMode {
    if quiet_hours.active_at(state.local_hour) {
        return EfficiencyMode::Quiet;
    }
    if state.on_battery {
        if state.battery_percent <= 15 {
            return EfficiencyMode::UltraEfficiency;
        }
        if state.battery_percent <= 40 {
            return EfficiencyMode::Efficiency;
        }
        return EfficiencyMode::Balanced;
    }
    if state.avg_temp_c >= 85.0 || state.avg_fan_percent >= 90 {
        return EfficiencyMode::Efficiency;
    }
    EfficiencyMode::Performance
}

// ============================================================================
// Controller
// ============================================================================

/// Process-wide efficiency-mode state.
pub struct EfficiencyController {
    configured: AtomicU8,
    effective: AtomicU8,
    /// Serializes set_mode/recompute; reads never take it.
    mutate: Mutex<()>,
    quiet_hours: QuietHours,
    probe: Arc<dyn SystemStateProbe>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<EfficiencyMode>>>,
    remember_last_mode: bool,
    persistence: Option<Arc<dyn ConfigSource>>,
}

impl EfficiencyController {
    /// Create a controller with the given initial mode and no persistence.
    #[must_use]
    pub fn new(
        probe: Arc<dyn SystemStateProbe>,
        quiet_hours: QuietHours,
        initial: EfficiencyMode,
    ) -> Self {
        let controller = Self {
            configured: AtomicU8::new(initial.as_u8()),
            effective: AtomicU8::new(initial.as_u8()),
            mutate: Mutex::new(()),
            quiet_hours,
            probe,
            subscribers: Mutex::new(Vec::new()),
            remember_last_mode: false,
            persistence: None,
        };
        controller.recompute();
        controller
    }

    /// Create from a configuration source. The initial mode is the valid
    /// persisted last-mode when `remember_last_mode` is on, otherwise the
    /// configured default. Mode changes are persisted back through the
    /// source.
    #[must_use]
    pub fn from_config(probe: Arc<dyn SystemStateProbe>, source: Arc<dyn ConfigSource>) -> Self {
        let remember = source.remember_last_mode();
        let initial = if remember {
            source.last_mode().unwrap_or_else(|| source.initial_mode())
        } else {
            source.initial_mode()
        };

        let mut controller = Self::new(probe, source.quiet_hours(), initial);
        controller.remember_last_mode = remember;
        controller.persistence = Some(source);
        controller
    }

    /// The configured mode.
    #[must_use]
    pub fn mode(&self) -> EfficiencyMode {
        EfficiencyMode::from_u8(self.configured.load(Ordering::Acquire))
            .unwrap_or(EfficiencyMode::Balanced)
    }

    /// The mode that drives routing right now. Equals the configured mode
    /// unless `Auto` is configured.
    #[must_use]
    pub fn effective_mode(&self) -> EfficiencyMode {
        EfficiencyMode::from_u8(self.effective.load(Ordering::Acquire))
            .unwrap_or(EfficiencyMode::Balanced)
    }

    /// Set the configured mode, recompute the effective mode, notify
    /// subscribers on an effective change, and persist when enabled.
    pub fn set_mode(&self, mode: EfficiencyMode) {
        let _guard = self.mutate.lock();

        self.configured.store(mode.as_u8(), Ordering::Release);
        self.apply_effective(self.derive(mode));

        if self.remember_last_mode {
            if let Some(ref persistence) = self.persistence {
                persistence.set_last_mode(mode);
            }
        }

        tracing::info!(mode = %mode.as_str(), effective = %self.effective_mode().as_str(), "Mode configured");
    }

    /// Parse-and-set for the IPC surface.
    pub fn set_mode_str(&self, name: &str) -> Result<(), PolicyError> {
        let mode =
            EfficiencyMode::parse(name).ok_or_else(|| PolicyError::UnknownMode(name.to_string()))?;
        self.set_mode(mode);
        Ok(())
    }

    /// Re-derive the effective mode from current system state. Called on
    /// every probe refresh; cheap no-op when nothing changed.
    pub fn recompute(&self) {
        let _guard = self.mutate.lock();
        self.apply_effective(self.derive(self.mode()));
    }

    /// Whether quiet hours currently apply.
    #[must_use]
    pub fn quiet_hours_active(&self) -> bool {
        self.quiet_hours.active_at(self.probe.snapshot().local_hour)
    }

    /// Register a mode-change subscriber. Each subscriber gets its own
    /// channel; a slow consumer queues its own messages and never blocks
    /// emission or other subscribers.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<EfficiencyMode> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn derive(&self, configured: EfficiencyMode) -> EfficiencyMode {
        if configured == EfficiencyMode::Auto {
            derive_auto(&self.probe.snapshot(), &self.quiet_hours)
        } else {
            configured
        }
    }

    /// Store the new effective mode and emit iff it changed. Caller holds
    /// the mutation lock.
    fn apply_effective(&self, effective: EfficiencyMode) {
        let previous = self.effective.swap(effective.as_u8(), Ordering::AcqRel);
        if previous == effective.as_u8() {
            return;
        }

        tracing::info!(effective = %effective.as_str(), "Effective mode changed");

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(effective).is_ok());
    }
}
