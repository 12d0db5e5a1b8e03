//! Read-only network inventory snapshot.
//!
//! Devices, ports and links are owned by an external discovery subsystem;
//! this snapshot is what route search, reservation checks and rule
//! compilation read. Loadable from JSON for tooling and tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::net::{ConnectPoint, DeviceId, DeviceType, Link, PortNumber, PortType};
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub vendor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub number: PortNumber,
    #[serde(rename = "type")]
    pub port_type: PortType,
    /// OMS add/drop ports terminate wavelength routes; line-side OMS ports
    /// carry them between ROADMs.
    #[serde(default)]
    pub add_drop: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct DeviceRecord {
    #[serde(flatten)]
    device: Device,
    #[serde(default)]
    ports: Vec<Port>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawInventory {
    devices: Vec<DeviceRecord>,
    #[serde(default)]
    links: Vec<Link>,
}

/// Snapshot of devices, their ports, and topology links.
#[derive(Debug, Default)]
pub struct NetworkInventory {
    devices: HashMap<DeviceId, Device>,
    ports: HashMap<DeviceId, Vec<Port>>,
    links: Vec<Link>,
}

impl NetworkInventory {
    pub fn new() -> Self {
        NetworkInventory::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawInventory = serde_json::from_str(json)?;
        let mut inventory = NetworkInventory::new();
        for record in raw.devices {
            inventory.ports.insert(record.device.id.clone(), record.ports);
            inventory.devices.insert(record.device.id.clone(), record.device);
        }
        inventory.links = raw.links;
        Ok(inventory)
    }

    pub fn add_device(&mut self, device: Device, ports: Vec<Port>) {
        self.ports.insert(device.id.clone(), ports);
        self.devices.insert(device.id.clone(), device);
    }

    pub fn add_link(&mut self, link: Link) {
        self.links.push(link);
    }

    /// Adds an active link and its reverse twin.
    pub fn add_bidirectional_link(&mut self, src: ConnectPoint, dst: ConnectPoint) {
        let link = Link::new(src, dst);
        self.links.push(link.reversed());
        self.links.push(link);
    }

    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn device_type(&self, id: &DeviceId) -> DeviceType {
        self.devices
            .get(id)
            .map(|d| d.device_type)
            .unwrap_or(DeviceType::Other)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// ROADM-class devices in deterministic (ID) order.
    pub fn roadm_devices(&self) -> Vec<&Device> {
        let mut found: Vec<&Device> = self
            .devices
            .values()
            .filter(|d| d.device_type.is_roadm())
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    pub fn port(&self, point: &ConnectPoint) -> Option<&Port> {
        self.ports
            .get(&point.device)?
            .iter()
            .find(|p| p.number == point.port)
    }

    pub fn port_type(&self, point: &ConnectPoint) -> Option<PortType> {
        self.port(point).map(|p| p.port_type)
    }

    pub fn is_port_enabled(&self, point: &ConnectPoint) -> bool {
        self.port(point).map(|p| p.enabled).unwrap_or(false)
    }

    /// OMS add/drop ports of one device.
    pub fn oms_add_drop_ports(&self, device: &DeviceId) -> Vec<ConnectPoint> {
        self.ports
            .get(device)
            .map(|ports| {
                ports
                    .iter()
                    .filter(|p| p.port_type == PortType::Oms && p.add_drop)
                    .map(|p| ConnectPoint::new(device.clone(), p.number.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_oms_add_drop_port(&self, point: &ConnectPoint) -> bool {
        self.port(point)
            .map(|p| p.port_type == PortType::Oms && p.add_drop)
            .unwrap_or(false)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Links leaving the given port.
    pub fn egress_links(&self, point: &ConnectPoint) -> Vec<&Link> {
        self.links.iter().filter(|l| &l.src == point).collect()
    }

    /// Links arriving at the given port.
    pub fn ingress_links(&self, point: &ConnectPoint) -> Vec<&Link> {
        self.links.iter().filter(|l| &l.dst == point).collect()
    }

    pub fn link(&self, src: &ConnectPoint, dst: &ConnectPoint) -> Option<&Link> {
        self.links.iter().find(|l| &l.src == src && &l.dst == dst)
    }
}
