//! Topology change tracking.
//!
//! WDM calculation is expensive, so callers first ask whether anything
//! that can affect fiber-level routes changed since the last run: a link
//! touching a line-side port, or the removal of a wavelength-carrying
//! device. The flag starts raised so the first calculation always runs.

use std::sync::atomic::{AtomicBool, Ordering};

use optical_model::{DeviceType, PortType};

pub struct TopologyChangeDetector {
    changed: AtomicBool,
}

impl Default for TopologyChangeDetector {
    fn default() -> Self {
        TopologyChangeDetector::new()
    }
}

fn line_side(port_type: Option<PortType>) -> bool {
    matches!(port_type, Some(PortType::Oms) | Some(PortType::Fiber))
}

fn carries_wavelengths(device_type: DeviceType) -> bool {
    device_type.is_roadm()
        || matches!(
            device_type,
            DeviceType::OpticalAmplifier | DeviceType::FiberSwitch
        )
}

impl TopologyChangeDetector {
    pub fn new() -> Self {
        TopologyChangeDetector {
            changed: AtomicBool::new(true),
        }
    }

    /// A link touching a line-side port appeared, vanished or flipped state.
    pub fn note_link_change(&self, src_port: Option<PortType>, dst_port: Option<PortType>) {
        if line_side(src_port) || line_side(dst_port) {
            self.changed.store(true, Ordering::SeqCst);
        }
    }

    /// A device was removed from the inventory.
    pub fn note_device_removed(&self, device_type: DeviceType) {
        if carries_wavelengths(device_type) {
            self.changed.store(true, Ordering::SeqCst);
        }
    }

    pub fn wdm_calc_necessary(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    /// Called after a completed WDM calculation.
    pub fn reset(&self) {
        self.changed.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_raised_and_resets_after_calculation() {
        let detector = TopologyChangeDetector::new();
        assert!(detector.wdm_calc_necessary());
        detector.reset();
        assert!(!detector.wdm_calc_necessary());
    }

    #[test]
    fn line_side_link_changes_raise_the_flag() {
        let detector = TopologyChangeDetector::new();
        detector.reset();
        detector.note_link_change(Some(PortType::Och), None);
        assert!(!detector.wdm_calc_necessary());
        detector.note_link_change(Some(PortType::Och), Some(PortType::Oms));
        assert!(detector.wdm_calc_necessary());
    }

    #[test]
    fn only_wavelength_carrying_device_removal_matters() {
        let detector = TopologyChangeDetector::new();
        detector.reset();
        detector.note_device_removed(DeviceType::Transponder);
        assert!(!detector.wdm_calc_necessary());
        detector.note_device_removed(DeviceType::OpticalAmplifier);
        assert!(detector.wdm_calc_necessary());
    }
}
