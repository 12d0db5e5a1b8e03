//! Route walk producing the switching rules for a circuit.
//!
//! The forward walk starts at the OMS add port and carries the selector
//! from hop to hop: each rule matches the previous hop's input and outputs
//! toward the next device. Transparent devices get no frequency match or
//! relabel; devices that accept no rules are skipped, but the walk state
//! still advances through them. The reverse direction is a fully
//! independent walk over the reversed hop list, not a flipped copy of the
//! forward rules.

use tracing::debug;

use optical_model::{
    ConnectPoint, DeviceId, NetworkInventory, SignalType, WavelengthPath,
};

use crate::caps::{device_caps, DeviceCaps};
use crate::rule::{FlowRule, Selector, TransponderConfig, Treatment};

pub struct RuleCompiler<'a> {
    inventory: &'a NetworkInventory,
    priority: u32,
}

impl<'a> RuleCompiler<'a> {
    pub fn new(inventory: &'a NetworkInventory, priority: u32) -> Self {
        RuleCompiler {
            inventory,
            priority,
        }
    }

    fn caps(&self, device: &DeviceId) -> DeviceCaps {
        device_caps(self.inventory.device_type(device))
    }

    /// Compiles a group of circuits into one atomic installable unit, so a
    /// partially installed group (forward up, reverse down) cannot persist.
    /// Idempotent for the same inputs.
    pub fn compile(&self, paths: &[WavelengthPath], bidirectional: bool) -> Vec<FlowRule> {
        let mut rules = Vec::new();
        for path in paths {
            rules.extend(self.forward_rules(path));
            if bidirectional {
                rules.extend(self.reverse_path_rules(path));
            }
        }
        debug!(paths = paths.len(), rules = rules.len(), "compiled rule unit");
        rules
    }

    fn forward_rules(&self, path: &WavelengthPath) -> Vec<FlowRule> {
        let mut rules = Vec::new();
        if self.caps(&path.src().device).accepts_flow_rules {
            rules.push(self.transponder_rule(path, path.src()));
        }
        rules.extend(self.path_rules(path));
        if self.caps(&path.dst().device).accepts_flow_rules {
            rules.push(self.transponder_rule(path, path.dst()));
        }
        rules
    }

    /// Hop rules from the add port to the drop port, in route order.
    pub fn path_rules(&self, path: &WavelengthPath) -> Vec<FlowRule> {
        let mut rules = Vec::new();
        let mut selector = Selector::in_port(&path.add_port().port);
        let mut current = path.add_port().clone();

        for link in &path.route.links {
            let caps = self.caps(&current.device);
            let mut treatment = Treatment::output(&link.src.port);
            if !caps.transparent {
                treatment = treatment.with_mod_lambda(path.signal);
            }
            if caps.accepts_flow_rules {
                rules.push(FlowRule {
                    device: current.device.clone(),
                    selector,
                    treatment,
                    priority: self.priority,
                });
            }

            current = link.dst.clone();
            selector = Selector::in_port(&link.dst.port);
            if !self.caps(&current.device).transparent {
                selector = selector.with_lambda(path.signal, SignalType::FixedGrid);
            }
        }

        if self.caps(&current.device).accepts_flow_rules {
            rules.push(FlowRule {
                device: current.device.clone(),
                selector,
                treatment: Treatment::output(&path.drop_port().port),
                priority: self.priority,
            });
        }
        rules
    }

    /// Hop rules for the opposite direction, walking the reversed hop
    /// list from the drop port back to the add port.
    pub fn reverse_path_rules(&self, path: &WavelengthPath) -> Vec<FlowRule> {
        let mut rules = Vec::new();
        let mut selector = Selector::in_port(&path.drop_port().port);
        let mut current = path.drop_port().clone();

        for link in path.route.links.iter().rev() {
            let caps = self.caps(&current.device);
            let mut treatment = Treatment::output(&link.dst.port);
            if !caps.transparent {
                treatment = treatment.with_mod_lambda(path.signal);
            }
            if caps.accepts_flow_rules {
                rules.push(FlowRule {
                    device: current.device.clone(),
                    selector,
                    treatment,
                    priority: self.priority,
                });
            }

            current = link.src.clone();
            selector = Selector::in_port(&link.src.port);
            if !self.caps(&current.device).transparent {
                selector = selector.with_lambda(path.signal, SignalType::FixedGrid);
            }
        }

        if self.caps(&current.device).accepts_flow_rules {
            rules.push(FlowRule {
                device: current.device.clone(),
                selector,
                treatment: Treatment::output(&path.add_port().port),
                priority: self.priority,
            });
        }
        rules
    }

    /// Transponder rule at one OCh end: match the wavelength on the client
    /// port, relabel to the assigned frequency and configure rate/format
    /// through the vendor extension. Symmetric, so one rule serves both
    /// directions.
    fn transponder_rule(&self, path: &WavelengthPath, target: &ConnectPoint) -> FlowRule {
        FlowRule {
            device: target.device.clone(),
            selector: Selector::in_port(&target.port)
                .with_lambda(path.signal, SignalType::FixedGrid),
            treatment: Treatment::output(&target.port)
                .with_mod_lambda(path.signal)
                .with_transponder(TransponderConfig {
                    rate: path.rate,
                    mod_format: path.mod_format,
                }),
            priority: self.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use optical_model::{
        Device, DeviceType, Link, ModulationFormat, OchSignal, Port, PortNumber, PortType, Rate,
        RoutePath,
    };

    fn device(inventory: &mut NetworkInventory, id: &str, device_type: DeviceType, ports: &[u64]) {
        inventory.add_device(
            Device {
                id: DeviceId::new(id),
                device_type,
                vendor: "acme".into(),
            },
            ports
                .iter()
                .map(|n| Port {
                    number: PortNumber::new(*n),
                    port_type: PortType::Oms,
                    add_drop: false,
                    enabled: true,
                })
                .collect(),
        );
    }

    /// tp-a -- roadm-a -- amp -- roadm-b -- tp-b
    fn amp_inventory() -> NetworkInventory {
        let mut inventory = NetworkInventory::default();
        device(&mut inventory, "tp-a", DeviceType::Transponder, &[1]);
        device(&mut inventory, "roadm-a", DeviceType::Roadm, &[2, 3]);
        device(&mut inventory, "amp", DeviceType::OpticalAmplifier, &[1, 2]);
        device(&mut inventory, "roadm-b", DeviceType::Roadm, &[2, 3]);
        device(&mut inventory, "tp-b", DeviceType::Transponder, &[1]);
        inventory
    }

    fn amp_path() -> WavelengthPath {
        WavelengthPath {
            id: 1,
            group_id: 1,
            frequency_id: 12,
            signal: OchSignal::dwdm_50ghz(-8),
            ingress_edge: Link::new(ConnectPoint::of("tp-a", 1), ConnectPoint::of("roadm-a", 2)),
            egress_edge: Link::new(ConnectPoint::of("roadm-b", 2), ConnectPoint::of("tp-b", 1)),
            route: RoutePath::new(
                vec![
                    Link::new(ConnectPoint::of("roadm-a", 3), ConnectPoint::of("amp", 1)),
                    Link::new(ConnectPoint::of("amp", 2), ConnectPoint::of("roadm-b", 3)),
                ],
                140_000.0,
            ),
            rate: Rate::R100G,
            mod_format: ModulationFormat::DpQpsk,
            q_value: 7.0,
            q_threshold: 6.0,
            name: "svc-A".into(),
            submitted: false,
        }
    }

    fn reversed_path(path: &WavelengthPath) -> WavelengthPath {
        let mut rev = path.clone();
        rev.ingress_edge = path.egress_edge.reversed();
        rev.egress_edge = path.ingress_edge.reversed();
        rev.route = path.route.reversed();
        rev
    }

    #[test]
    fn transparent_amplifier_is_never_a_matched_hop() {
        let inventory = amp_inventory();
        let compiler = RuleCompiler::new(&inventory, 100);
        let rules = compiler.compile(&[amp_path()], true);

        assert!(
            rules.iter().all(|r| r.device != DeviceId::new("amp")),
            "amplifier must not receive rules"
        );
        // Both ROADMs still match and relabel the assigned frequency.
        for roadm in ["roadm-a", "roadm-b"] {
            assert!(rules
                .iter()
                .any(|r| r.device == DeviceId::new(roadm)
                    && r.treatment.mod_lambda == Some(OchSignal::dwdm_50ghz(-8))));
        }
    }

    #[test]
    fn hop_selector_carries_over_through_skipped_devices() {
        let inventory = amp_inventory();
        let compiler = RuleCompiler::new(&inventory, 100);
        let rules = compiler.path_rules(&amp_path());

        // roadm-a rule (add port in, line port out) and the final roadm-b
        // drop rule; the amp hop is skipped but the walk advanced.
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].device, DeviceId::new("roadm-a"));
        assert_eq!(rules[0].selector.in_port, PortNumber::new(2));
        assert_eq!(rules[0].treatment.output, PortNumber::new(3));
        assert_eq!(rules[1].device, DeviceId::new("roadm-b"));
        assert_eq!(rules[1].selector.in_port, PortNumber::new(3));
        assert_eq!(rules[1].selector.lambda, Some(OchSignal::dwdm_50ghz(-8)));
        assert_eq!(rules[1].treatment.output, PortNumber::new(2));
    }

    #[test]
    fn transponder_ends_get_vendor_extension_rules() {
        let inventory = amp_inventory();
        let compiler = RuleCompiler::new(&inventory, 100);
        let rules = compiler.compile(&[amp_path()], false);

        let tp_rules: Vec<&FlowRule> = rules
            .iter()
            .filter(|r| r.treatment.transponder.is_some())
            .collect();
        assert_eq!(tp_rules.len(), 2);
        for rule in tp_rules {
            assert_eq!(rule.selector.in_port, rule.treatment.output);
            assert_eq!(
                rule.treatment.transponder,
                Some(TransponderConfig {
                    rate: Rate::R100G,
                    mod_format: ModulationFormat::DpQpsk,
                })
            );
        }
    }

    #[test]
    fn reverse_walk_equals_independent_compilation_of_swapped_path() {
        let inventory = amp_inventory();
        let compiler = RuleCompiler::new(&inventory, 100);
        let path = amp_path();

        let reverse: HashSet<(DeviceId, Selector)> = compiler
            .reverse_path_rules(&path)
            .into_iter()
            .map(|r| (r.device, r.selector))
            .collect();
        let swapped: HashSet<(DeviceId, Selector)> = compiler
            .path_rules(&reversed_path(&path))
            .into_iter()
            .map(|r| (r.device, r.selector))
            .collect();
        assert_eq!(reverse, swapped);
    }

    #[test]
    fn bidirectional_unit_contains_both_directions() {
        let inventory = amp_inventory();
        let compiler = RuleCompiler::new(&inventory, 100);
        let path = amp_path();

        let one_way = compiler.compile(&[path.clone()], false);
        let both = compiler.compile(&[path.clone()], true);
        assert_eq!(both.len(), one_way.len() + compiler.reverse_path_rules(&path).len());

        // Same inputs, same unit.
        assert_eq!(both, compiler.compile(&[path], true));
    }
}
