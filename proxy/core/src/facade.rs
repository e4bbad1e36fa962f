//! Policy Facade
//!
//! The surface exposed to outside consumers (desktop settings panel, tray
//! toggle, CLI) over IPC. The transport lives in the daemon; this module
//! owns the contract: string-encoded modes, a variant map for system
//! state, and the `ModeChanged` signal.
//!
//! Mode strings on this surface use the wire encoding: canonical names,
//! except `UltraEfficiency` which goes out as `"Ultra Efficiency"`. Both
//! forms are accepted on input.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::controller::EfficiencyController;
use crate::mode::EfficiencyMode;
use crate::probe::SystemStateProbe;

/// IPC-facing view over the controller and probe.
pub struct PolicyFacade {
    controller: Arc<EfficiencyController>,
    probe: Arc<dyn SystemStateProbe>,
}

impl PolicyFacade {
    /// Create a facade.
    #[must_use]
    pub fn new(controller: Arc<EfficiencyController>, probe: Arc<dyn SystemStateProbe>) -> Self {
        Self { controller, probe }
    }

    /// Set the configured mode by name. Returns `false` on an unknown
    /// mode, `true` otherwise.
    pub fn set_mode(&self, name: &str) -> bool {
        match self.controller.set_mode_str(name) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected mode change");
                false
            }
        }
    }

    /// The configured mode, wire-encoded.
    #[must_use]
    pub fn get_mode(&self) -> &'static str {
        self.controller.mode().wire_name()
    }

    /// The effective mode, wire-encoded.
    #[must_use]
    pub fn get_effective_mode(&self) -> &'static str {
        self.controller.effective_mode().wire_name()
    }

    /// All known modes, wire-encoded, in canonical order.
    #[must_use]
    pub fn list_modes(&self) -> Vec<&'static str> {
        EfficiencyMode::ALL.iter().map(|m| m.wire_name()).collect()
    }

    /// Current system state as a string-keyed variant map.
    #[must_use]
    pub fn get_system_state(&self) -> serde_json::Map<String, serde_json::Value> {
        let snapshot = self.probe.snapshot();
        let mut map = serde_json::Map::new();
        map.insert("battery_percent".into(), snapshot.battery_percent.into());
        map.insert("on_battery".into(), snapshot.on_battery.into());
        map.insert("avg_temp".into(), f64::from(snapshot.avg_temp_c).into());
        map.insert("avg_fan_speed".into(), snapshot.avg_fan_percent.into());
        map.insert(
            "quiet_hours_active".into(),
            self.controller.quiet_hours_active().into(),
        );
        map
    }

    /// Subscribe to `ModeChanged` signals (effective-mode changes only,
    /// coalesced).
    pub fn subscribe_mode_changed(&self) -> mpsc::UnboundedReceiver<EfficiencyMode> {
        self.controller.subscribe()
    }
}
