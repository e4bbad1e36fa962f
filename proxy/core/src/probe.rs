//! System-State Probe
//!
//! Polls the machine's power and thermal state for the efficiency-mode
//! controller: battery level, AC vs battery, average temperature across
//! sensors, average fan duty cycle, and the local wall-clock hour.
//!
//! Every source is optional. A desktop without a battery, a VM without
//! hwmon, a container without sensors — all degrade to plausible defaults
//! (on AC, 100 %, 35 °C, 0 % fan) so the controller always has a complete
//! snapshot to derive from.
//!
//! Sources on Linux:
//! - `/sys/class/power_supply/*` for battery capacity and AC online state
//! - `/sys/class/thermal/thermal_zone*/temp` for temperature (averaged,
//!   kernel reports millidegrees)
//! - `/sys/class/hwmon/*/pwm*` for fan duty (0-255, averaged, as percent)

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use parking_lot::RwLock;

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Poll interval floor.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Poll interval ceiling.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// Snapshot
// ============================================================================

/// Point-in-time view of the machine's power and thermal state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SystemStateSnapshot {
    /// Battery charge, 0..=100. 100 when no battery exists.
    pub battery_percent: u8,
    /// Whether the machine is running on battery power.
    pub on_battery: bool,
    /// Average temperature across available sensors, in Celsius.
    pub avg_temp_c: f32,
    /// Average fan duty cycle, 0..=100.
    pub avg_fan_percent: u8,
    /// Local wall-clock hour, 0..=23.
    pub local_hour: u8,
}

impl Default for SystemStateSnapshot {
    fn default() -> Self {
        Self {
            battery_percent: 100,
            on_battery: false,
            avg_temp_c: 35.0,
            avg_fan_percent: 0,
            local_hour: 12,
        }
    }
}

// ============================================================================
// Probe Trait
// ============================================================================

/// Source of system-state snapshots.
///
/// The controller reads through this on every derivation; implementations
/// must be cheap (return the latest published snapshot, never poll inline).
pub trait SystemStateProbe: Send + Sync {
    /// Latest snapshot.
    fn snapshot(&self) -> SystemStateSnapshot;
}

/// Probe with a fixed, settable snapshot. Used in tests and wherever a
/// synthetic state needs to be injected.
pub struct StaticProbe {
    state: RwLock<SystemStateSnapshot>,
}

impl StaticProbe {
    /// Create with the given snapshot.
    #[must_use]
    pub fn new(snapshot: SystemStateSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Replace the snapshot.
    pub fn set(&self, snapshot: SystemStateSnapshot) {
        *self.state.write() = snapshot;
    }
}

impl Default for StaticProbe {
    fn default() -> Self {
        Self::new(SystemStateSnapshot::default())
    }
}

impl SystemStateProbe for StaticProbe {
    fn snapshot(&self) -> SystemStateSnapshot {
        *self.state.read()
    }
}

// ============================================================================
// System Monitor
// ============================================================================

/// Live probe backed by sysfs.
///
/// [`SystemMonitor::refresh`] re-reads all sources and publishes a new
/// snapshot atomically; [`SystemStateProbe::snapshot`] is a lock-held copy
/// of the latest published value and never touches the sources.
pub struct SystemMonitor {
    state: RwLock<SystemStateSnapshot>,
    poll_interval: Duration,
    power_supply_root: std::path::PathBuf,
    thermal_root: std::path::PathBuf,
    hwmon_root: std::path::PathBuf,
}

impl SystemMonitor {
    /// Create a monitor polling at `interval`, clamped to [5 s, 30 s].
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            state: RwLock::new(SystemStateSnapshot::default()),
            poll_interval: interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL),
            power_supply_root: "/sys/class/power_supply".into(),
            thermal_root: "/sys/class/thermal".into(),
            hwmon_root: "/sys/class/hwmon".into(),
        }
    }

    /// The clamped poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Re-read all sources and publish a fresh snapshot.
    pub fn refresh(&self) {
        let (battery_percent, on_battery) = self.read_power_supply();
        let avg_temp_c = self.read_avg_temperature();
        let avg_fan_percent = self.read_avg_fan_percent();
        let local_hour = chrono::Local::now().hour() as u8;

        let snapshot = SystemStateSnapshot {
            battery_percent,
            on_battery,
            avg_temp_c,
            avg_fan_percent,
            local_hour,
        };

        tracing::debug!(
            battery = battery_percent,
            on_battery,
            temp = avg_temp_c,
            fan = avg_fan_percent,
            hour = local_hour,
            "System state refreshed"
        );

        *self.state.write() = snapshot;
    }

    /// Spawn the background poll loop. Each tick refreshes the snapshot
    /// and then invokes `on_refresh` (the controller's re-derivation hook).
    pub fn spawn_poll_loop(
        self: Arc<Self>,
        on_refresh: impl Fn() + Send + Sync + 'static,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            loop {
                ticker.tick().await;
                self.refresh();
                on_refresh();
            }
        })
    }

    /// Battery percent and on-battery flag from sysfs. No battery device
    /// means (100, on AC); no mains device means AC is assumed.
    fn read_power_supply(&self) -> (u8, bool) {
        let mut battery_percent = 100u8;
        let mut on_ac: Option<bool> = None;
        let mut have_battery = false;

        let Ok(entries) = std::fs::read_dir(&self.power_supply_root) else {
            return (battery_percent, false);
        };

        for entry in entries.flatten() {
            let path = entry.path();
            match read_trimmed(&path.join("type")).as_deref() {
                Some("Battery") => {
                    if let Some(capacity) =
                        read_trimmed(&path.join("capacity")).and_then(|s| s.parse::<u8>().ok())
                    {
                        battery_percent = capacity.min(100);
                        have_battery = true;
                    }
                }
                Some("Mains") => {
                    if let Some(online) = read_trimmed(&path.join("online")) {
                        on_ac = Some(online == "1");
                    }
                }
                _ => {}
            }
        }

        let on_battery = have_battery && !on_ac.unwrap_or(true);
        (battery_percent, on_battery)
    }

    /// Mean across thermal zones, or the 35 °C default. The kernel
    /// reports millidegrees Celsius.
    fn read_avg_temperature(&self) -> f32 {
        let Ok(entries) = std::fs::read_dir(&self.thermal_root) else {
            return SystemStateSnapshot::default().avg_temp_c;
        };

        let mut temps: Vec<f32> = Vec::new();
        for entry in entries.flatten() {
            if !entry.file_name().to_string_lossy().starts_with("thermal_zone") {
                continue;
            }
            if let Some(raw) =
                read_trimmed(&entry.path().join("temp")).and_then(|s| s.parse::<f32>().ok())
            {
                let temp_c = raw / 1000.0;
                if temp_c.is_finite() && temp_c > 0.0 {
                    temps.push(temp_c);
                }
            }
        }

        if temps.is_empty() {
            SystemStateSnapshot::default().avg_temp_c
        } else {
            temps.iter().sum::<f32>() / temps.len() as f32
        }
    }

    /// Mean fan duty cycle across hwmon pwm files, as a percent.
    fn read_avg_fan_percent(&self) -> u8 {
        let Ok(entries) = std::fs::read_dir(&self.hwmon_root) else {
            return 0;
        };

        let mut duties: Vec<u32> = Vec::new();
        for entry in entries.flatten() {
            let Ok(files) = std::fs::read_dir(entry.path()) else {
                continue;
            };
            for file in files.flatten() {
                let name = file.file_name();
                let name = name.to_string_lossy();
                // pwm1, pwm2, ... but not pwm1_enable etc.
                if name.starts_with("pwm") && !name.contains('_') {
                    if let Some(raw) =
                        read_trimmed(&file.path()).and_then(|s| s.parse::<u32>().ok())
                    {
                        duties.push(raw.min(255) * 100 / 255);
                    }
                }
            }
        }

        if duties.is_empty() {
            0
        } else {
            (duties.iter().sum::<u32>() / duties.len() as u32).min(100) as u8
        }
    }
}

impl SystemStateProbe for SystemMonitor {
    fn snapshot(&self) -> SystemStateSnapshot {
        *self.state.read()
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}
