//! Wavelength Path Store
//!
//! In-memory, linearizable stores for the provisioning state of the
//! planner: reserved/submitted wavelength circuits and the precomputed
//! WDM routes they are picked from. Every structural mutation emits an
//! event so listeners can drive re-optimization and UI refresh.

use thiserror::Error;

use optical_model::{ConnectPoint, OchSignal};

pub mod events;
pub mod store;
pub mod wdm;

pub use events::{PathEvent, PathEventKind, WdmEvent, WdmEventKind};
pub use store::WavelengthPathStore;
pub use wdm::WdmPathStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("signal {signal} already reserved on {point}")]
    Conflict {
        point: ConnectPoint,
        signal: OchSignal,
    },
    #[error("no wavelength path with id {0}")]
    NotFound(u64),
}

pub type Result<T> = std::result::Result<T, StoreError>;
