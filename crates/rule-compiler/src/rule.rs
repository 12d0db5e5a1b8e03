//! Switching-rule data model.

use serde::{Deserialize, Serialize};

use optical_model::{DeviceId, ModulationFormat, OchSignal, PortNumber, Rate, SignalType};

/// Match side of a rule. Ports are referenced by number only; symbolic
/// port names never reach the switching layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub in_port: PortNumber,
    pub lambda: Option<OchSignal>,
    pub signal_type: Option<SignalType>,
}

impl Selector {
    pub fn in_port(port: &PortNumber) -> Self {
        Selector {
            in_port: port.only_number(),
            lambda: None,
            signal_type: None,
        }
    }

    pub fn with_lambda(mut self, signal: OchSignal, signal_type: SignalType) -> Self {
        self.lambda = Some(signal);
        self.signal_type = Some(signal_type);
        self
    }
}

/// Opaque vendor extension configuring a transponder's line side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransponderConfig {
    pub rate: Rate,
    pub mod_format: ModulationFormat,
}

/// Action side of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Treatment {
    pub output: PortNumber,
    pub mod_lambda: Option<OchSignal>,
    pub transponder: Option<TransponderConfig>,
}

impl Treatment {
    pub fn output(port: &PortNumber) -> Self {
        Treatment {
            output: port.only_number(),
            mod_lambda: None,
            transponder: None,
        }
    }

    pub fn with_mod_lambda(mut self, signal: OchSignal) -> Self {
        self.mod_lambda = Some(signal);
        self
    }

    pub fn with_transponder(mut self, config: TransponderConfig) -> Self {
        self.transponder = Some(config);
        self
    }
}

/// One permanent switching rule on one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowRule {
    pub device: DeviceId,
    pub selector: Selector,
    pub treatment: Treatment,
    pub priority: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_strip_symbolic_port_names() {
        let named = PortNumber::named(7, "LINE-1-TX");
        let selector = Selector::in_port(&named);
        assert_eq!(selector.in_port, PortNumber::new(7));
        assert!(!selector.in_port.has_name());
        let treatment = Treatment::output(&named);
        assert!(!treatment.output.has_name());
    }
}
