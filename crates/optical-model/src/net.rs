//! Device, port and link identities.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Device identifier, e.g. `netconf:10.0.0.1:830`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        DeviceId(id.into())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Port number with an optional symbolic name.
///
/// Identity (equality, ordering, hashing) is by number only; symbolic names
/// are presentation data and must never split two references to one port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortNumber {
    pub number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PortNumber {
    pub fn new(number: u64) -> Self {
        PortNumber { number, name: None }
    }

    pub fn named(number: u64, name: impl Into<String>) -> Self {
        PortNumber {
            number,
            name: Some(name.into()),
        }
    }

    /// Strips the symbolic name, leaving the numeric identity only.
    pub fn only_number(&self) -> PortNumber {
        PortNumber::new(self.number)
    }

    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }
}

impl PartialEq for PortNumber {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for PortNumber {}

impl PartialOrd for PortNumber {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PortNumber {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.number.cmp(&other.number)
    }
}

impl Hash for PortNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({})", self.number, name),
            None => write!(f, "{}", self.number),
        }
    }
}

/// (device, port) pair identifying any physical port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectPoint {
    pub device: DeviceId,
    pub port: PortNumber,
}

impl ConnectPoint {
    pub fn new(device: DeviceId, port: PortNumber) -> Self {
        ConnectPoint { device, port }
    }

    pub fn of(device: impl Into<String>, port: u64) -> Self {
        ConnectPoint {
            device: DeviceId::new(device),
            port: PortNumber::new(port),
        }
    }
}

impl fmt::Display for ConnectPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Roadm,
    RoadmOtn,
    OpticalAmplifier,
    FiberSwitch,
    Transponder,
    Other,
}

impl DeviceType {
    /// ROADM-class devices terminate wavelength routes at add/drop ports.
    pub fn is_roadm(&self) -> bool {
        matches!(self, DeviceType::Roadm | DeviceType::RoadmOtn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// Line-side wavelength-selective port carrying the full multiplex.
    Oms,
    /// Transponder port carrying a single wavelength.
    Och,
    /// Fiber-transparent port (amplifiers, fiber switches).
    Fiber,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkState {
    Active,
    Inactive,
}

/// Directed topology edge.
///
/// Identity is the (src, dst) endpoint pair; activity state is an attribute
/// and does not participate in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub src: ConnectPoint,
    pub dst: ConnectPoint,
    #[serde(default = "LinkState::active")]
    pub state: LinkState,
}

impl LinkState {
    fn active() -> LinkState {
        LinkState::Active
    }
}

impl Link {
    pub fn new(src: ConnectPoint, dst: ConnectPoint) -> Self {
        Link {
            src,
            dst,
            state: LinkState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == LinkState::Active
    }

    /// The same edge traversed in the opposite direction.
    pub fn reversed(&self) -> Link {
        Link {
            src: self.dst.clone(),
            dst: self.src.clone(),
            state: self.state,
        }
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.src == other.src && self.dst == other.dst
    }
}

impl Eq for Link {}

impl Hash for Link {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.src.hash(state);
        self.dst.hash(state);
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.src, self.dst)
    }
}

/// Ordered device-to-device route produced by route search.
///
/// Equality is by link sequence; the cost is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePath {
    pub links: Vec<Link>,
    pub cost: f64,
}

impl RoutePath {
    pub fn new(links: Vec<Link>, cost: f64) -> Self {
        RoutePath { links, cost }
    }

    /// The route traversed in the opposite direction.
    pub fn reversed(&self) -> RoutePath {
        let links = self.links.iter().rev().map(Link::reversed).collect();
        RoutePath {
            links,
            cost: self.cost,
        }
    }

    /// All distinct connect points touched by the route.
    pub fn connect_points(&self) -> Vec<ConnectPoint> {
        let mut points = Vec::with_capacity(self.links.len() * 2);
        for link in &self.links {
            for point in [&link.src, &link.dst] {
                if !points.contains(point) {
                    points.push(point.clone());
                }
            }
        }
        points
    }
}

impl PartialEq for RoutePath {
    fn eq(&self, other: &Self) -> bool {
        self.links == other.links
    }
}

impl Eq for RoutePath {}

impl Hash for RoutePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.links.hash(state);
    }
}
