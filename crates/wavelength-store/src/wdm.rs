//! Registry of precomputed WDM routes between OMS add/drop port pairs.
//!
//! WDM calculation replaces results wholesale for the endpoint scope it
//! covered; nothing here is ever patched in place.

use parking_lot::RwLock;
use tracing::{debug, info};

use optical_model::{ConnectPoint, WdmPath};

use crate::events::{WdmEvent, WdmEventKind};

type WdmListener = Box<dyn Fn(&WdmEvent) + Send + Sync>;

#[derive(Default)]
pub struct WdmPathStore {
    paths: RwLock<Vec<WdmPath>>,
    listeners: RwLock<Vec<WdmListener>>,
}

fn in_scope(path: &WdmPath, ingress: Option<&ConnectPoint>, egress: Option<&ConnectPoint>) -> bool {
    ingress.map_or(true, |cp| &path.ingress == cp) && egress.map_or(true, |cp| &path.egress == cp)
}

impl WdmPathStore {
    pub fn new() -> Self {
        WdmPathStore::default()
    }

    pub fn add_listener(&self, listener: impl Fn(&WdmEvent) + Send + Sync + 'static) {
        self.listeners.write().push(Box::new(listener));
    }

    fn notify(&self, event: WdmEvent) {
        for listener in self.listeners.read().iter() {
            listener(&event);
        }
    }

    /// Swaps in `paths` for the endpoint scope given by `ingress`/`egress`
    /// (`None` matches any endpoint). Paths outside the scope are kept.
    pub fn replace(
        &self,
        ingress: Option<&ConnectPoint>,
        egress: Option<&ConnectPoint>,
        paths: Vec<WdmPath>,
    ) {
        let mut stored = self.paths.write();
        let mut removed = Vec::new();
        stored.retain(|path| {
            if in_scope(path, ingress, egress) {
                removed.push(path.clone());
                false
            } else {
                true
            }
        });
        stored.extend(paths.iter().cloned());
        drop(stored);

        info!(
            added = paths.len(),
            removed = removed.len(),
            "wdm paths replaced"
        );
        self.notify(WdmEvent::new(WdmEventKind::PathsReplaced, paths, removed));
    }

    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.paths.write());
        debug!(removed = removed.len(), "wdm paths cleared");
        self.notify(WdmEvent::new(WdmEventKind::PathsCleared, Vec::new(), removed));
    }

    pub fn get_paths(
        &self,
        ingress: Option<&ConnectPoint>,
        egress: Option<&ConnectPoint>,
    ) -> Vec<WdmPath> {
        self.paths
            .read()
            .iter()
            .filter(|path| in_scope(path, ingress, egress))
            .cloned()
            .collect()
    }

    /// The stored path that traverses `path`'s route the opposite way.
    pub fn get_reverse_path(&self, path: &WdmPath) -> Option<WdmPath> {
        self.paths
            .read()
            .iter()
            .find(|candidate| candidate.is_reverse_of(path))
            .cloned()
    }

    pub fn size(&self) -> usize {
        self.paths.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.read().is_empty()
    }
}
