//! Scoring Weights
//!
//! Each effective mode maps to a weight vector over the router's six
//! penalty terms. Per-request hints then nudge the vector: small additive
//! biases applied after the mode defaults, clamped so no weight goes
//! negative, and renormalized so the vector always sums to 1.

use crate::mode::EfficiencyMode;
use crate::request::{Annotations, Priority};

/// Additive bias applied by a single soft hint.
const HINT_BIAS: f64 = 0.15;

/// Weight vector over the six scoring penalty terms. Lower penalty is
/// better in every term, so a larger weight means the mode cares more
/// about that dimension.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weights {
    /// Average-latency penalty weight.
    pub latency: f64,
    /// Power-draw penalty weight.
    pub power: f64,
    /// Throughput-shortfall penalty weight.
    pub throughput: f64,
    /// Weighted-queue-depth penalty weight.
    pub queue: f64,
    /// Not-preferred-for-model penalty weight.
    pub prefer: f64,
    /// Static-priority-rank penalty weight.
    pub static_priority: f64,
}

impl Weights {
    /// Mode defaults. `Auto` never reaches scoring (the controller always
    /// resolves it to a concrete mode first); it falls back to the
    /// `Balanced` row.
    #[must_use]
    pub fn for_mode(mode: EfficiencyMode) -> Self {
        match mode {
            EfficiencyMode::Performance => Self {
                latency: 0.35,
                power: 0.05,
                throughput: 0.25,
                queue: 0.20,
                prefer: 0.10,
                static_priority: 0.05,
            },
            EfficiencyMode::Balanced | EfficiencyMode::Auto => Self {
                latency: 0.25,
                power: 0.20,
                throughput: 0.15,
                queue: 0.25,
                prefer: 0.10,
                static_priority: 0.05,
            },
            EfficiencyMode::Efficiency => Self {
                latency: 0.10,
                power: 0.45,
                throughput: 0.05,
                queue: 0.25,
                prefer: 0.10,
                static_priority: 0.05,
            },
            EfficiencyMode::UltraEfficiency => Self {
                latency: 0.05,
                power: 0.65,
                throughput: 0.00,
                queue: 0.15,
                prefer: 0.10,
                static_priority: 0.05,
            },
            EfficiencyMode::Quiet => Self {
                latency: 0.10,
                power: 0.40,
                throughput: 0.05,
                queue: 0.30,
                prefer: 0.10,
                static_priority: 0.05,
            },
        }
    }

    /// Mode defaults adjusted by per-request hints.
    ///
    /// `latency_critical` shifts weight from power to latency;
    /// `prefer_power_efficiency` does the reverse. A `Critical` priority
    /// doubles the latency bias and takes the same amount out of the queue
    /// weight, so a critical request chases raw speed rather than avoiding
    /// busy backends.
    #[must_use]
    pub fn resolve(mode: EfficiencyMode, annotations: &Annotations) -> Self {
        let mut weights = Self::for_mode(mode);

        if annotations.latency_critical {
            weights.latency += HINT_BIAS;
            weights.power -= HINT_BIAS;
        }
        if annotations.prefer_power_efficiency {
            weights.power += HINT_BIAS;
            weights.latency -= HINT_BIAS;
        }
        if annotations.priority == Priority::Critical {
            weights.latency += HINT_BIAS;
            weights.queue -= HINT_BIAS;
        }

        weights.clamped().normalized()
    }

    /// Clamp every component at zero.
    fn clamped(mut self) -> Self {
        for w in [
            &mut self.latency,
            &mut self.power,
            &mut self.throughput,
            &mut self.queue,
            &mut self.prefer,
            &mut self.static_priority,
        ] {
            *w = w.max(0.0);
        }
        self
    }

    /// Scale so the components sum to 1.
    fn normalized(self) -> Self {
        let sum = self.sum();
        if sum <= 0.0 {
            // Unreachable with the tables above, but never divide by zero
            return Self::for_mode(EfficiencyMode::Balanced);
        }
        Self {
            latency: self.latency / sum,
            power: self.power / sum,
            throughput: self.throughput / sum,
            queue: self.queue / sum,
            prefer: self.prefer / sum,
            static_priority: self.static_priority / sum,
        }
    }

    /// Sum of all components.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.latency
            + self.power
            + self.throughput
            + self.queue
            + self.prefer
            + self.static_priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_valid(weights: &Weights) {
        for (name, w) in [
            ("latency", weights.latency),
            ("power", weights.power),
            ("throughput", weights.throughput),
            ("queue", weights.queue),
            ("prefer", weights.prefer),
            ("static_priority", weights.static_priority),
        ] {
            assert!(w >= 0.0, "{name} weight went negative: {w}");
        }
        assert!(
            (weights.sum() - 1.0).abs() < EPSILON,
            "weights must sum to 1, got {}",
            weights.sum()
        );
    }

    #[test]
    fn test_mode_tables_sum_to_one() {
        for mode in EfficiencyMode::ALL {
            assert_valid(&Weights::for_mode(mode));
        }
    }

    #[test]
    fn test_all_hint_combinations_stay_valid() {
        let priorities = [
            Priority::Low,
            Priority::Normal,
            Priority::High,
            Priority::Critical,
        ];
        for mode in EfficiencyMode::ALL {
            for latency_critical in [false, true] {
                for prefer_power in [false, true] {
                    for priority in priorities {
                        let mut annotations = Annotations::new().with_priority(priority);
                        annotations.latency_critical = latency_critical;
                        annotations.prefer_power_efficiency = prefer_power;
                        assert_valid(&Weights::resolve(mode, &annotations));
                    }
                }
            }
        }
    }

    #[test]
    fn test_latency_critical_shifts_toward_latency() {
        let base = Weights::resolve(EfficiencyMode::Balanced, &Annotations::new());
        let hinted =
            Weights::resolve(EfficiencyMode::Balanced, &Annotations::new().latency_critical());

        assert!(hinted.latency > base.latency);
        assert!(hinted.power < base.power);
    }

    #[test]
    fn test_power_hint_shifts_toward_power() {
        let base = Weights::resolve(EfficiencyMode::Performance, &Annotations::new());
        let hinted = Weights::resolve(
            EfficiencyMode::Performance,
            &Annotations::new().prefer_power_efficiency(),
        );

        assert!(hinted.power > base.power);
        assert!(hinted.latency < base.latency);
    }

    #[test]
    fn test_ultra_efficiency_latency_clamp() {
        // UltraEfficiency has latency 0.05; the power hint pulls it to -0.10,
        // which must clamp at zero rather than go negative.
        let hinted = Weights::resolve(
            EfficiencyMode::UltraEfficiency,
            &Annotations::new().prefer_power_efficiency(),
        );
        assert_eq!(hinted.latency, 0.0);
        assert_valid(&hinted);
    }

    #[test]
    fn test_critical_priority_doubles_latency_bias() {
        let normal = Weights::resolve(
            EfficiencyMode::Balanced,
            &Annotations::new().latency_critical(),
        );
        let critical = Weights::resolve(
            EfficiencyMode::Balanced,
            &Annotations::new()
                .latency_critical()
                .with_priority(Priority::Critical),
        );

        assert!(critical.latency > normal.latency);
        assert!(critical.queue < normal.queue);
    }
}
