//! Optimizer settings.

use serde::{Deserialize, Serialize};

/// Lowest frequency the 50 GHz grid may be anchored at [THz].
pub const FREQUENCY_FLOOR_THZ: f64 = 186.20;

/// Disjointness required between the two routes of a protected pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DisjointnessPolicy {
    /// Routes share no core (non-terminal) device.
    #[default]
    CoreNodeDisjoint,
    /// Routes share no fiber link in either direction.
    LinkDisjoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Routes kept per add/drop port pair during WDM calculation.
    pub k: usize,
    /// Frequency addressed by ID 1 [THz]; clamped to the grid floor.
    pub lowest_frequency_thz: f64,
    pub disjointness: DisjointnessPolicy,
    /// Priority stamped on compiled switching rules.
    pub rule_priority: u32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            k: 3,
            lowest_frequency_thz: 191.35,
            disjointness: DisjointnessPolicy::default(),
            rule_priority: 100,
        }
    }
}

impl OptimizerConfig {
    /// Configured lowest frequency, held at or above the grid floor.
    pub fn lowest_frequency_thz(&self) -> f64 {
        self.lowest_frequency_thz.max(FREQUENCY_FLOOR_THZ)
    }
}
