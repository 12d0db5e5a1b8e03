//! Provisioning units: WDM paths (precomputed fiber routes with per-signal
//! OSNR) and wavelength paths (reserved circuits).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::net::{ConnectPoint, Link, RoutePath};
use crate::optical::{ModulationFormat, OchParam, Rate};
use crate::signal::OchSignal;

/// Forward-direction OSNR [dB] per evaluated rate/format combination.
pub type OsnrMap = BTreeMap<OchParam, f64>;

/// Precomputed fiber route between two OMS add/drop ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WdmPath {
    pub ingress: ConnectPoint,
    pub egress: ConnectPoint,
    pub route: RoutePath,
    pub osnr: OsnrMap,
}

impl WdmPath {
    pub fn new(ingress: ConnectPoint, egress: ConnectPoint, route: RoutePath, osnr: OsnrMap) -> Self {
        WdmPath {
            ingress,
            egress,
            route,
            osnr,
        }
    }

    /// True when `other` is this path traversed the opposite way.
    pub fn is_reverse_of(&self, other: &WdmPath) -> bool {
        self.ingress == other.egress
            && self.egress == other.ingress
            && self.route == other.route.reversed()
    }
}

/// A reserved (and possibly submitted) wavelength circuit.
///
/// The ingress edge connects the source transponder (OCh) port to the OMS
/// add port; the egress edge connects the OMS drop port to the destination
/// transponder. The route covers the OMS-to-OMS fiber hops between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavelengthPath {
    pub id: u64,
    pub group_id: u64,
    pub frequency_id: i32,
    pub signal: OchSignal,
    pub ingress_edge: Link,
    pub egress_edge: Link,
    pub route: RoutePath,
    pub rate: Rate,
    pub mod_format: ModulationFormat,
    pub q_value: f64,
    pub q_threshold: f64,
    pub name: String,
    pub submitted: bool,
}

impl WavelengthPath {
    /// Source transponder (OCh) port.
    pub fn src(&self) -> &ConnectPoint {
        &self.ingress_edge.src
    }

    /// Destination transponder (OCh) port.
    pub fn dst(&self) -> &ConnectPoint {
        &self.egress_edge.dst
    }

    /// OMS add port where the wavelength enters the line.
    pub fn add_port(&self) -> &ConnectPoint {
        &self.ingress_edge.dst
    }

    /// OMS drop port where the wavelength leaves the line.
    pub fn drop_port(&self) -> &ConnectPoint {
        &self.egress_edge.src
    }

    /// Full link sequence: ingress edge, route hops, egress edge.
    pub fn links(&self) -> Vec<Link> {
        let mut links = Vec::with_capacity(self.route.links.len() + 2);
        links.push(self.ingress_edge.clone());
        links.extend(self.route.links.iter().cloned());
        links.push(self.egress_edge.clone());
        links
    }

    pub fn as_submitted(&self) -> WavelengthPath {
        let mut path = self.clone();
        path.submitted = true;
        path
    }
}
