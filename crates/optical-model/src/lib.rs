//! Optical Network Model Library
//!
//! Shared data model for the wavelength circuit planner: device/port/link
//! identities, DWDM signal grid types, per-link physical models (fiber spans
//! and in-line amplifiers) parsed from hierarchical link configuration, and
//! the read-only network inventory snapshot consumed by route search and
//! rule compilation.

use thiserror::Error;

pub mod inventory;
pub mod net;
pub mod optical;
pub mod path;
pub mod physical;
pub mod signal;

pub use inventory::{Device, NetworkInventory, Port};
pub use net::{ConnectPoint, DeviceId, DeviceType, Link, LinkState, PortNumber, PortType, RoutePath};
pub use optical::{AmpType, FiberType, ModulationFormat, OchParam, QValue, Rate};
pub use path::{OsnrMap, WavelengthPath, WdmPath};
pub use physical::{AmpStage, FiberSpan, LinkModelCatalog, PhysicalElement, PhysicalLink};
pub use signal::{ChannelSpacing, FrequencyConverter, OchSignal, SignalType};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unknown type token: {0}")]
    UnknownToken(String),
    #[error("no physical model for link {0} -> {1}")]
    NoLinkModel(ConnectPoint, ConnectPoint),
    #[error("invalid physical model for link {src} -> {dst}: {reason}")]
    InvalidLinkModel {
        src: ConnectPoint,
        dst: ConnectPoint,
        reason: String,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
