//! Optical Path Optimizer
//!
//! Plans wavelength circuits over a ROADM network: searches
//! fiber-length-minimizing routes between add/drop ports, ranks candidate
//! circuits by estimated quality of transmission, and drives the
//! reserve / submit / remove lifecycle against the wavelength path store.

use thiserror::Error;

use optical_model::{ConnectPoint, ModelError};
use qot_estimator::QotError;
use wavelength_store::StoreError;

pub mod candidate;
pub mod config;
pub mod detector;
pub mod optimizer;
pub mod resources;
pub mod topology;
pub mod weigher;

pub use candidate::{CandidateEntry, WavelengthPathCandidate};
pub use config::{DisjointnessPolicy, OptimizerConfig};
pub use detector::TopologyChangeDetector;
pub use optimizer::PathOptimizer;
pub use resources::ResourceRegistry;
pub use weigher::FiberSpanWeigher;

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("candidate index {index} out of range 1..={len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("expected 1 or 2 port pairs, got {0}")]
    InvalidPortPairCount(usize),
    #[error("{0} is not an OMS add/drop port")]
    NotAddDropPort(ConnectPoint),
    #[error("expected exactly one active edge link at {point}, found {found}")]
    EdgeLinkAmbiguous { point: ConnectPoint, found: usize },
    #[error("port {0} is not available")]
    PortUnavailable(ConnectPoint),
    #[error("frequency id {0} is not offered by the candidate")]
    FrequencyNotOffered(i32),
    #[error("expected {expected} frequency ids and names, got {got}")]
    ReservationArityMismatch { expected: usize, got: usize },
    #[error("no wavelength path group {0}")]
    UnknownGroup(u64),
    #[error("wavelength path group {0} already submitted")]
    AlreadySubmitted(u64),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Qot(#[from] QotError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, OptimizeError>;
