//! Store of reserved and submitted wavelength circuits.
//!
//! All state lives behind one lock so a reader never sees a path present in
//! the by-ID index but absent from the group or lambda index. Batch
//! mutations are all-or-nothing. Path IDs and group IDs come from monotonic
//! counters; a group ID can be handed back to the allocator only while no
//! path references it, and only if it was the most recently issued one.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info};

use optical_model::{
    ConnectPoint, Link, ModulationFormat, OchSignal, QValue, Rate, RoutePath, WavelengthPath,
};

use crate::events::{PathEvent, PathEventKind};
use crate::{Result, StoreError};

type PathListener = Box<dyn Fn(&PathEvent) + Send + Sync>;

#[derive(Default)]
struct Indexes {
    paths: HashMap<u64, WavelengthPath>,
    groups: HashMap<u64, BTreeSet<u64>>,
    /// (connect point, signal) -> path ID, over every point the path crosses.
    lambda: HashMap<(ConnectPoint, OchSignal), u64>,
}

impl Indexes {
    fn index(&mut self, path: &WavelengthPath) {
        self.paths.insert(path.id, path.clone());
        self.groups.entry(path.group_id).or_default().insert(path.id);
        for point in lambda_keys(path) {
            self.lambda.insert((point, path.signal), path.id);
        }
    }

    fn unindex(&mut self, path: &WavelengthPath) {
        self.paths.remove(&path.id);
        if let Some(members) = self.groups.get_mut(&path.group_id) {
            members.remove(&path.id);
            if members.is_empty() {
                self.groups.remove(&path.group_id);
            }
        }
        for point in lambda_keys(path) {
            self.lambda.remove(&(point, path.signal));
        }
    }

    fn conflicts(&self, path: &WavelengthPath) -> Option<(ConnectPoint, OchSignal)> {
        lambda_keys(path)
            .into_iter()
            .find(|point| self.lambda.contains_key(&(point.clone(), path.signal)))
            .map(|point| (point, path.signal))
    }
}

/// Every distinct connect point the path's full link sequence crosses.
/// A point can appear as both the dst of one hop and the src of the next;
/// it must be keyed once.
fn lambda_keys(path: &WavelengthPath) -> Vec<ConnectPoint> {
    let mut points = Vec::new();
    for link in path.links() {
        for point in [link.src, link.dst] {
            if !points.contains(&point) {
                points.push(point);
            }
        }
    }
    points
}

pub struct WavelengthPathStore {
    inner: RwLock<Indexes>,
    /// Last issued path ID; IDs are never reused.
    path_id: AtomicU64,
    /// Last issued group ID; reusable only via compare-and-swap release.
    group_id: AtomicU64,
    listeners: RwLock<Vec<PathListener>>,
}

impl Default for WavelengthPathStore {
    fn default() -> Self {
        WavelengthPathStore::new()
    }
}

impl WavelengthPathStore {
    pub fn new() -> Self {
        WavelengthPathStore {
            inner: RwLock::new(Indexes::default()),
            path_id: AtomicU64::new(0),
            group_id: AtomicU64::new(0),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn add_listener(&self, listener: impl Fn(&PathEvent) + Send + Sync + 'static) {
        self.listeners.write().push(Box::new(listener));
    }

    fn notify(&self, events: Vec<PathEvent>) {
        let listeners = self.listeners.read();
        for event in &events {
            for listener in listeners.iter() {
                listener(event);
            }
        }
    }

    /// Pure construction; no ID is assigned and the store is not touched.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        group_id: u64,
        ingress_edge: Link,
        egress_edge: Link,
        route: RoutePath,
        frequency_id: i32,
        signal: OchSignal,
        rate: Rate,
        mod_format: ModulationFormat,
        q: QValue,
        name: impl Into<String>,
    ) -> WavelengthPath {
        WavelengthPath {
            id: 0,
            group_id,
            frequency_id,
            signal,
            ingress_edge,
            egress_edge,
            route,
            rate,
            mod_format,
            q_value: q.value,
            q_threshold: q.threshold,
            name: name.into(),
            submitted: false,
        }
    }

    /// Inserts a batch, assigning each path a fresh unique ID.
    ///
    /// All-or-nothing: if any (connect point, signal) pair in the batch is
    /// already taken, against the store or within the batch itself, nothing
    /// is inserted and the conflict is returned.
    pub fn add_all(&self, paths: Vec<WavelengthPath>) -> Result<Vec<WavelengthPath>> {
        let mut inner = self.inner.write();
        let mut batch_taken: BTreeSet<(ConnectPoint, OchSignal)> = BTreeSet::new();
        for path in &paths {
            if let Some((point, signal)) = inner.conflicts(path) {
                return Err(StoreError::Conflict { point, signal });
            }
            for point in lambda_keys(path) {
                if !batch_taken.insert((point.clone(), path.signal)) {
                    return Err(StoreError::Conflict {
                        point,
                        signal: path.signal,
                    });
                }
            }
        }

        let mut added = Vec::with_capacity(paths.len());
        for mut path in paths {
            path.id = self.path_id.fetch_add(1, Ordering::SeqCst) + 1;
            inner.index(&path);
            added.push(path);
        }
        drop(inner);

        let ids: BTreeSet<u64> = added.iter().map(|p| p.id).collect();
        let events = added
            .iter()
            .map(|path| {
                let coupled = coupled_within(&ids, &added, path);
                info!(id = path.id, group = path.group_id, name = %path.name, "wavelength path added");
                PathEvent::new(PathEventKind::PathAdded, path.clone(), coupled)
            })
            .collect();
        self.notify(events);
        Ok(added)
    }

    /// Replaces the record with the path's ID. Absent IDs are an error;
    /// this never inserts. A replacement whose (connect point, signal)
    /// pairs collide with another live path is rejected and the previous
    /// record kept.
    pub fn update(&self, path: WavelengthPath) -> Result<()> {
        let mut inner = self.inner.write();
        let Some(previous) = inner.paths.get(&path.id).cloned() else {
            return Err(StoreError::NotFound(path.id));
        };
        inner.unindex(&previous);
        if let Some((point, signal)) = inner.conflicts(&path) {
            inner.index(&previous);
            return Err(StoreError::Conflict { point, signal });
        }
        inner.index(&path);
        let coupled = inner
            .groups
            .get(&path.group_id)
            .map(|members| members.iter().copied().filter(|id| *id != path.id).collect())
            .unwrap_or_default();
        drop(inner);

        debug!(id = path.id, group = path.group_id, "wavelength path updated");
        self.notify(vec![PathEvent::new(PathEventKind::PathUpdated, path, coupled)]);
        Ok(())
    }

    pub fn remove(&self, id: u64) -> Result<WavelengthPath> {
        let mut inner = self.inner.write();
        let Some(path) = inner.paths.get(&id).cloned() else {
            return Err(StoreError::NotFound(id));
        };
        inner.unindex(&path);
        self.release_group_locked(&inner, path.group_id);
        drop(inner);

        info!(id, group = path.group_id, "wavelength path removed");
        self.notify(vec![PathEvent::new(
            PathEventKind::PathRemoved,
            path.clone(),
            BTreeSet::new(),
        )]);
        Ok(path)
    }

    /// Removes every path in the group and tries to release its ID.
    pub fn remove_all_in_group(&self, group_id: u64) -> Vec<WavelengthPath> {
        let mut inner = self.inner.write();
        let ids: Vec<u64> = inner
            .groups
            .get(&group_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        let removed: Vec<WavelengthPath> = ids
            .iter()
            .filter_map(|id| inner.paths.get(id).cloned())
            .collect();
        for path in &removed {
            inner.unindex(path);
        }
        self.release_group_locked(&inner, group_id);
        drop(inner);

        self.notify_removed(removed.clone());
        removed
    }

    /// Removes the given records (matched by ID) in one atomic step.
    pub fn remove_all(&self, paths: &[WavelengthPath]) -> Vec<WavelengthPath> {
        let mut inner = self.inner.write();
        let mut removed = Vec::new();
        for path in paths {
            if let Some(stored) = inner.paths.get(&path.id).cloned() {
                inner.unindex(&stored);
                removed.push(stored);
            }
        }
        let groups: BTreeSet<u64> = removed.iter().map(|p| p.group_id).collect();
        for group_id in groups {
            self.release_group_locked(&inner, group_id);
        }
        drop(inner);

        self.notify_removed(removed.clone());
        removed
    }

    /// Removes every path whose endpoints match the given pair.
    pub fn remove_between(
        &self,
        ingress: &ConnectPoint,
        egress: &ConnectPoint,
    ) -> Vec<WavelengthPath> {
        let matched = self.paths_between(ingress, egress);
        self.remove_all(&matched)
    }

    fn notify_removed(&self, removed: Vec<WavelengthPath>) {
        let events = removed
            .iter()
            .map(|path| {
                let coupled = removed
                    .iter()
                    .filter(|p| p.group_id == path.group_id && p.id != path.id)
                    .map(|p| p.id)
                    .collect();
                info!(id = path.id, group = path.group_id, "wavelength path removed");
                PathEvent::new(PathEventKind::PathRemoved, path.clone(), coupled)
            })
            .collect();
        self.notify(events);
    }

    pub fn get(&self, id: u64) -> Option<WavelengthPath> {
        self.inner.read().paths.get(&id).cloned()
    }

    pub fn find_by_group_id(&self, group_id: u64) -> Vec<WavelengthPath> {
        let inner = self.inner.read();
        inner
            .groups
            .get(&group_id)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|id| inner.paths.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn find_by_oms_port_and_lambda(
        &self,
        point: &ConnectPoint,
        signal: OchSignal,
    ) -> Option<WavelengthPath> {
        let inner = self.inner.read();
        inner
            .lambda
            .get(&(point.clone(), signal))
            .and_then(|id| inner.paths.get(id).cloned())
    }

    pub fn group_map(&self) -> HashMap<u64, Vec<WavelengthPath>> {
        let inner = self.inner.read();
        inner
            .groups
            .iter()
            .map(|(group_id, members)| {
                let paths = members
                    .iter()
                    .filter_map(|id| inner.paths.get(id).cloned())
                    .collect();
                (*group_id, paths)
            })
            .collect()
    }

    pub fn paths(&self) -> Vec<WavelengthPath> {
        let mut paths: Vec<WavelengthPath> = self.inner.read().paths.values().cloned().collect();
        paths.sort_by_key(|p| p.id);
        paths
    }

    pub fn paths_between(
        &self,
        ingress: &ConnectPoint,
        egress: &ConnectPoint,
    ) -> Vec<WavelengthPath> {
        let mut paths: Vec<WavelengthPath> = self
            .inner
            .read()
            .paths
            .values()
            .filter(|p| p.src() == ingress && p.dst() == egress)
            .cloned()
            .collect();
        paths.sort_by_key(|p| p.id);
        paths
    }

    pub fn size(&self) -> usize {
        self.inner.read().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().paths.is_empty()
    }

    /// Allocates a new group ID, unique among all live groups.
    pub fn issue_group_id(&self) -> u64 {
        self.group_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Hands `group_id` back to the allocator when no path references it.
    /// Only the most recently issued ID can be taken back, so an ID is
    /// never double-allocated to two live groups.
    pub fn release_group_id_if_possible(&self, group_id: u64) -> bool {
        let inner = self.inner.read();
        self.release_group_locked(&inner, group_id)
    }

    fn release_group_locked(&self, inner: &Indexes, group_id: u64) -> bool {
        if inner.groups.contains_key(&group_id) {
            return false;
        }
        let released = self
            .group_id
            .compare_exchange(group_id, group_id - 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if released {
            debug!(group_id, "group id released");
        }
        released
    }
}

fn coupled_within(
    ids: &BTreeSet<u64>,
    batch: &[WavelengthPath],
    path: &WavelengthPath,
) -> BTreeSet<u64> {
    batch
        .iter()
        .filter(|p| p.group_id == path.group_id && p.id != path.id && ids.contains(&p.id))
        .map(|p| p.id)
        .collect()
}
