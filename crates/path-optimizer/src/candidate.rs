//! Candidate wavelength circuits produced by optimization.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use optical_model::{DeviceId, Link, ModulationFormat, OchSignal, QValue, Rate, RoutePath};

use crate::config::DisjointnessPolicy;

/// One plannable circuit: a route between an add and a drop port with its
/// transponder edges, the best surviving rate/format, and the wavelengths
/// it could be reserved on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub ingress_edge: Link,
    pub egress_edge: Link,
    pub route: RoutePath,
    pub rate: Rate,
    pub mod_format: ModulationFormat,
    /// Lower of the forward and reverse Q estimates.
    pub q_value: f64,
    pub q_threshold: f64,
    /// Reservable wavelengths keyed by operator-facing frequency ID.
    pub signals: BTreeMap<i32, OchSignal>,
}

impl CandidateEntry {
    pub fn q(&self) -> QValue {
        QValue::new(self.q_value, self.q_threshold)
    }

    pub fn frequency_ids(&self) -> Vec<i32> {
        self.signals.keys().copied().collect()
    }
}

/// An optimizer result: one entry, or two route-disjoint entries when a
/// protected pair was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WavelengthPathCandidate {
    pub entries: Vec<CandidateEntry>,
}

impl WavelengthPathCandidate {
    pub fn single(entry: CandidateEntry) -> Self {
        WavelengthPathCandidate {
            entries: vec![entry],
        }
    }

    pub fn pair(main: CandidateEntry, secondary: CandidateEntry) -> Self {
        WavelengthPathCandidate {
            entries: vec![main, secondary],
        }
    }

    pub fn main(&self) -> &CandidateEntry {
        &self.entries[0]
    }

    pub fn secondary(&self) -> Option<&CandidateEntry> {
        self.entries.get(1)
    }

    /// Ranking key: main Q first, then secondary Q.
    pub fn sort_key(&self) -> (f64, f64) {
        (
            self.main().q_value,
            self.secondary().map(|e| e.q_value).unwrap_or(f64::INFINITY),
        )
    }
}

fn core_devices(route: &RoutePath) -> HashSet<DeviceId> {
    let Some(first) = route.links.first() else {
        return HashSet::new();
    };
    let Some(last) = route.links.last() else {
        return HashSet::new();
    };
    let mut devices = HashSet::new();
    for link in &route.links {
        devices.insert(link.src.device.clone());
        devices.insert(link.dst.device.clone());
    }
    devices.remove(&first.src.device);
    devices.remove(&last.dst.device);
    devices
}

/// Whether two routes may back each other up under the given policy.
pub fn routes_disjoint(policy: DisjointnessPolicy, a: &RoutePath, b: &RoutePath) -> bool {
    match policy {
        DisjointnessPolicy::CoreNodeDisjoint => {
            let core_a = core_devices(a);
            let core_b = core_devices(b);
            // Two direct routes share no core devices trivially, which says
            // nothing about their failure domains.
            if core_a.is_empty() && core_b.is_empty() {
                return false;
            }
            core_a.is_disjoint(&core_b)
        }
        DisjointnessPolicy::LinkDisjoint => {
            let edges_a: HashSet<Link> = a
                .links
                .iter()
                .flat_map(|l| [l.clone(), l.reversed()])
                .collect();
            b.links.iter().all(|l| !edges_a.contains(l))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optical_model::ConnectPoint;

    fn hop(a: &str, b: &str) -> Link {
        Link::new(ConnectPoint::of(a, 3), ConnectPoint::of(b, 3))
    }

    fn route(devices: &[&str]) -> RoutePath {
        let links = devices
            .windows(2)
            .map(|pair| hop(pair[0], pair[1]))
            .collect();
        RoutePath::new(links, 1.0)
    }

    #[test]
    fn core_node_disjointness_ignores_terminals() {
        let policy = DisjointnessPolicy::CoreNodeDisjoint;
        let main = route(&["a", "x", "b"]);
        let safe = route(&["a", "y", "b"]);
        let shared_core = route(&["a", "x", "y", "b"]);
        assert!(routes_disjoint(policy, &main, &safe));
        assert!(!routes_disjoint(policy, &main, &shared_core));
    }

    #[test]
    fn two_direct_routes_are_not_considered_disjoint() {
        let policy = DisjointnessPolicy::CoreNodeDisjoint;
        assert!(!routes_disjoint(policy, &route(&["a", "b"]), &route(&["a", "b"])));
    }

    #[test]
    fn link_disjointness_counts_both_directions() {
        let policy = DisjointnessPolicy::LinkDisjoint;
        let main = route(&["a", "x", "b"]);
        let reverse_overlap = RoutePath::new(vec![hop("x", "a")], 1.0);
        assert!(!routes_disjoint(policy, &main, &reverse_overlap));
        assert!(routes_disjoint(policy, &main, &route(&["a", "y", "b"])));
    }
}
