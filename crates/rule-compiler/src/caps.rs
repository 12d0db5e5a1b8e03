//! Device capability lookup.
//!
//! The compiler branches on two facts about a device: whether it is
//! wavelength-transparent (forwards all wavelengths identically, so
//! frequency match/relabel would be meaningless) and whether it accepts
//! switching rules at all. Adding a device category is a one-line change
//! here.

use optical_model::DeviceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCaps {
    pub transparent: bool,
    pub accepts_flow_rules: bool,
}

pub fn device_caps(device_type: DeviceType) -> DeviceCaps {
    match device_type {
        DeviceType::OpticalAmplifier => DeviceCaps {
            transparent: true,
            accepts_flow_rules: false,
        },
        DeviceType::FiberSwitch => DeviceCaps {
            transparent: true,
            accepts_flow_rules: true,
        },
        DeviceType::Roadm
        | DeviceType::RoadmOtn
        | DeviceType::Transponder
        | DeviceType::Other => DeviceCaps {
            transparent: false,
            accepts_flow_rules: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amplifiers_are_transparent_and_ruleless() {
        let caps = device_caps(DeviceType::OpticalAmplifier);
        assert!(caps.transparent);
        assert!(!caps.accepts_flow_rules);
    }

    #[test]
    fn fiber_switches_are_transparent_but_programmable() {
        let caps = device_caps(DeviceType::FiberSwitch);
        assert!(caps.transparent);
        assert!(caps.accepts_flow_rules);
    }

    #[test]
    fn roadms_match_and_relabel_wavelengths() {
        for device_type in [DeviceType::Roadm, DeviceType::RoadmOtn] {
            let caps = device_caps(device_type);
            assert!(!caps.transparent);
            assert!(caps.accepts_flow_rules);
        }
    }
}
