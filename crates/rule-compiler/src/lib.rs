//! Wavelength Path Rule Compiler
//!
//! Turns reserved wavelength circuits into the per-device switching rules
//! that realize them: a transponder rule at each end, one rule per route
//! hop, and a final drop rule, with an independently recomputed mirror set
//! for bidirectional circuits. All rules for a group compile into one
//! atomic installable unit.

pub mod caps;
pub mod compiler;
pub mod rule;

pub use caps::{device_caps, DeviceCaps};
pub use compiler::RuleCompiler;
pub use rule::{FlowRule, Selector, TransponderConfig, Treatment};
