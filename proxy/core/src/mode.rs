//! Efficiency Modes
//!
//! The closed set of power/performance trade-offs the proxy understands.
//! A mode is *configured* by the operator (or by the desktop integration
//! over IPC) and drives the weight vector the router scores backends with.
//!
//! `Auto` is the one special member: it is never used for scoring directly.
//! When `Auto` is configured, the [`crate::controller::EfficiencyController`]
//! derives an *effective* mode from battery, thermal, and quiet-hours state,
//! and that derived mode is what routing observes.

use serde::{Deserialize, Serialize};

/// Power/performance trade-off applied to routing decisions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EfficiencyMode {
    /// Favor latency and throughput over power draw.
    Performance,
    /// Middle ground between speed and energy use. Cold-start default.
    #[default]
    Balanced,
    /// Favor low power draw.
    Efficiency,
    /// Minimize fan noise and thermal load.
    Quiet,
    /// Derive the effective mode from live system state.
    Auto,
    /// Aggressive power saving, used when the battery is critical.
    UltraEfficiency,
}

impl EfficiencyMode {
    /// Every mode, in canonical listing order.
    pub const ALL: [EfficiencyMode; 6] = [
        EfficiencyMode::Performance,
        EfficiencyMode::Balanced,
        EfficiencyMode::Efficiency,
        EfficiencyMode::Quiet,
        EfficiencyMode::Auto,
        EfficiencyMode::UltraEfficiency,
    ];

    /// Canonical name, used for persistence and mode lookup.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Performance => "Performance",
            Self::Balanced => "Balanced",
            Self::Efficiency => "Efficiency",
            Self::Quiet => "Quiet",
            Self::Auto => "Auto",
            Self::UltraEfficiency => "UltraEfficiency",
        }
    }

    /// Name emitted on the IPC wire. Identical to [`Self::as_str`] except
    /// `UltraEfficiency`, which goes out in its human-readable spaced form.
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::UltraEfficiency => "Ultra Efficiency",
            other => other.as_str(),
        }
    }

    /// Parse a mode name. Lookup is case-sensitive over the canonical
    /// names; the spaced wire form of `UltraEfficiency` is also accepted.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Performance" => Some(Self::Performance),
            "Balanced" => Some(Self::Balanced),
            "Efficiency" => Some(Self::Efficiency),
            "Quiet" => Some(Self::Quiet),
            "Auto" => Some(Self::Auto),
            "UltraEfficiency" | "Ultra Efficiency" => Some(Self::UltraEfficiency),
            _ => None,
        }
    }

    /// Discriminant for atomic storage.
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Performance => 0,
            Self::Balanced => 1,
            Self::Efficiency => 2,
            Self::Quiet => 3,
            Self::Auto => 4,
            Self::UltraEfficiency => 5,
        }
    }

    /// Inverse of [`Self::as_u8`].
    pub(crate) fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Performance),
            1 => Some(Self::Balanced),
            2 => Some(Self::Efficiency),
            3 => Some(Self::Quiet),
            4 => Some(Self::Auto),
            5 => Some(Self::UltraEfficiency),
            _ => None,
        }
    }
}

impl std::fmt::Display for EfficiencyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}
