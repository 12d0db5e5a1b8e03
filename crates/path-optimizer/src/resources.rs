//! Lambda and port resource accounting.
//!
//! Line-side ports register the wavelengths they can carry; reservation
//! claims wavelengths along a route plus the transponder/add/drop ports at
//! its ends, all under the circuit's group ID. A claim is all-or-nothing:
//! every collision is checked before anything is written.

use std::collections::{BTreeSet, HashMap, HashSet};

use parking_lot::RwLock;
use tracing::debug;

use optical_model::{ConnectPoint, OchSignal};

use crate::{OptimizeError, Result};

#[derive(Default)]
struct Ledger {
    /// Wavelengths each port can carry.
    registered: HashMap<ConnectPoint, BTreeSet<OchSignal>>,
    /// Wavelength claims, by owning group.
    lambdas: HashMap<(ConnectPoint, OchSignal), u64>,
    /// Whole-port claims (transponder and add/drop ports), by owning group.
    ports: HashMap<ConnectPoint, u64>,
}

#[derive(Default)]
pub struct ResourceRegistry {
    ledger: RwLock<Ledger>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        ResourceRegistry::default()
    }

    /// Registers the carryable wavelengths of a line-side port.
    pub fn register_lambdas(&self, point: ConnectPoint, signals: impl IntoIterator<Item = OchSignal>) {
        self.ledger
            .write()
            .registered
            .entry(point)
            .or_default()
            .extend(signals);
    }

    /// Wavelengths registered on `point` and not claimed by any group.
    pub fn free_lambdas(&self, point: &ConnectPoint) -> BTreeSet<OchSignal> {
        let ledger = self.ledger.read();
        ledger
            .registered
            .get(point)
            .map(|signals| {
                signals
                    .iter()
                    .filter(|s| !ledger.lambdas.contains_key(&(point.clone(), **s)))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Wavelengths free on every one of the given points.
    pub fn common_free_lambdas<'a>(
        &self,
        points: impl IntoIterator<Item = &'a ConnectPoint>,
    ) -> BTreeSet<OchSignal> {
        let mut common: Option<BTreeSet<OchSignal>> = None;
        for point in points {
            let free = self.free_lambdas(point);
            common = Some(match common {
                None => free,
                Some(current) => current.intersection(&free).copied().collect(),
            });
        }
        common.unwrap_or_default()
    }

    pub fn is_port_available(&self, point: &ConnectPoint) -> bool {
        !self.ledger.read().ports.contains_key(point)
    }

    /// Claims the given ports and wavelengths for `group`, atomically.
    pub fn allocate(
        &self,
        group: u64,
        ports: &[ConnectPoint],
        lambdas: &[(ConnectPoint, OchSignal)],
    ) -> Result<()> {
        let mut ledger = self.ledger.write();
        for point in ports {
            if ledger.ports.contains_key(point) {
                return Err(OptimizeError::PortUnavailable(point.clone()));
            }
        }
        let mut claimed: HashSet<(ConnectPoint, OchSignal)> = HashSet::new();
        for (point, signal) in lambdas {
            let key = (point.clone(), *signal);
            if ledger.lambdas.contains_key(&key) || !claimed.insert(key) {
                return Err(OptimizeError::PortUnavailable(point.clone()));
            }
        }
        for point in ports {
            ledger.ports.insert(point.clone(), group);
        }
        for (point, signal) in lambdas {
            ledger.lambdas.insert((point.clone(), *signal), group);
        }
        debug!(group, ports = ports.len(), lambdas = lambdas.len(), "resources allocated");
        Ok(())
    }

    /// Releases every claim held by `group`.
    pub fn release(&self, group: u64) {
        let mut ledger = self.ledger.write();
        ledger.ports.retain(|_, owner| *owner != group);
        ledger.lambdas.retain(|_, owner| *owner != group);
        debug!(group, "resources released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(device: &str) -> ConnectPoint {
        ConnectPoint::of(device, 3)
    }

    fn signals(range: std::ops::RangeInclusive<i32>) -> Vec<OchSignal> {
        range.map(OchSignal::dwdm_50ghz).collect()
    }

    #[test]
    fn common_free_lambdas_intersect_across_ports() {
        let registry = ResourceRegistry::new();
        registry.register_lambdas(line("roadm-a"), signals(-10..=-5));
        registry.register_lambdas(line("roadm-b"), signals(-8..=-3));

        let points = [line("roadm-a"), line("roadm-b")];
        let common = registry.common_free_lambdas(points.iter());
        assert_eq!(common, signals(-8..=-5).into_iter().collect());
    }

    #[test]
    fn allocation_removes_lambdas_from_the_free_set() {
        let registry = ResourceRegistry::new();
        registry.register_lambdas(line("roadm-a"), signals(-10..=-9));
        registry
            .allocate(1, &[], &[(line("roadm-a"), OchSignal::dwdm_50ghz(-10))])
            .unwrap();
        assert_eq!(
            registry.free_lambdas(&line("roadm-a")),
            [OchSignal::dwdm_50ghz(-9)].into_iter().collect()
        );
    }

    #[test]
    fn conflicting_claims_leave_no_partial_state() {
        let registry = ResourceRegistry::new();
        registry.register_lambdas(line("roadm-a"), signals(-10..=-9));
        registry
            .allocate(1, &[ConnectPoint::of("tp-a", 1)], &[])
            .unwrap();

        // Second claim wants a fresh lambda but a taken port.
        let err = registry
            .allocate(
                2,
                &[ConnectPoint::of("tp-a", 1)],
                &[(line("roadm-a"), OchSignal::dwdm_50ghz(-9))],
            )
            .unwrap_err();
        assert!(matches!(err, OptimizeError::PortUnavailable(_)));
        assert_eq!(registry.free_lambdas(&line("roadm-a")).len(), 2);
    }

    #[test]
    fn release_frees_everything_a_group_held() {
        let registry = ResourceRegistry::new();
        registry.register_lambdas(line("roadm-a"), signals(-10..=-9));
        let port = ConnectPoint::of("tp-a", 1);
        registry
            .allocate(7, &[port.clone()], &[(line("roadm-a"), OchSignal::dwdm_50ghz(-10))])
            .unwrap();
        assert!(!registry.is_port_available(&port));

        registry.release(7);
        assert!(registry.is_port_available(&port));
        assert_eq!(registry.free_lambdas(&line("roadm-a")).len(), 2);
    }
}
