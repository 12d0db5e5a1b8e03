//! Structured lifecycle events emitted by the stores.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use optical_model::{WavelengthPath, WdmPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathEventKind {
    PathAdded,
    PathUpdated,
    PathRemoved,
}

/// One wavelength-path mutation.
///
/// `coupled_ids` holds the IDs of the other paths in the same group touched
/// by the same call, so a listener can treat a bidirectional pair as one
/// logical change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathEvent {
    pub kind: PathEventKind,
    pub path: WavelengthPath,
    pub coupled_ids: BTreeSet<u64>,
    pub at: DateTime<Utc>,
}

impl PathEvent {
    pub fn new(kind: PathEventKind, path: WavelengthPath, coupled_ids: BTreeSet<u64>) -> Self {
        PathEvent {
            kind,
            path,
            coupled_ids,
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WdmEventKind {
    PathsReplaced,
    PathsCleared,
}

/// One WDM-route registry mutation, carrying the full delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WdmEvent {
    pub kind: WdmEventKind,
    pub added: Vec<WdmPath>,
    pub removed: Vec<WdmPath>,
    pub at: DateTime<Utc>,
}

impl WdmEvent {
    pub fn new(kind: WdmEventKind, added: Vec<WdmPath>, removed: Vec<WdmPath>) -> Self {
        WdmEvent {
            kind,
            added,
            removed,
            at: Utc::now(),
        }
    }
}
