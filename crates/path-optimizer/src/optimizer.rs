//! Planner service: WDM calculation, candidate ranking and the
//! reserve / submit / remove lifecycle.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use optical_model::{
    ConnectPoint, DeviceId, FrequencyConverter, Link, LinkModelCatalog, NetworkInventory, OchParam,
    OsnrMap, PhysicalElement, QValue, RoutePath, WavelengthPath, WdmPath,
};
use qot_estimator::QotEstimator;
use rule_compiler::{FlowRule, RuleCompiler};
use wavelength_store::{WavelengthPathStore, WdmPathStore};

use crate::candidate::{routes_disjoint, CandidateEntry, WavelengthPathCandidate};
use crate::config::OptimizerConfig;
use crate::detector::TopologyChangeDetector;
use crate::resources::ResourceRegistry;
use crate::topology::RouteGraph;
use crate::weigher::FiberSpanWeigher;
use crate::{OptimizeError, Result};

/// The planner. Collaborators are injected once at construction; the only
/// state owned here is the last candidate list and the compiled rule units
/// of submitted groups.
pub struct PathOptimizer {
    inventory: Arc<NetworkInventory>,
    catalog: Arc<LinkModelCatalog>,
    estimator: QotEstimator,
    path_store: Arc<WavelengthPathStore>,
    wdm_store: Arc<WdmPathStore>,
    resources: Arc<ResourceRegistry>,
    detector: TopologyChangeDetector,
    config: OptimizerConfig,
    candidates: RwLock<Vec<WavelengthPathCandidate>>,
    compiled: RwLock<HashMap<u64, Vec<FlowRule>>>,
}

impl PathOptimizer {
    pub fn new(
        inventory: Arc<NetworkInventory>,
        catalog: Arc<LinkModelCatalog>,
        estimator: QotEstimator,
        path_store: Arc<WavelengthPathStore>,
        wdm_store: Arc<WdmPathStore>,
        resources: Arc<ResourceRegistry>,
        config: OptimizerConfig,
    ) -> Self {
        PathOptimizer {
            inventory,
            catalog,
            estimator,
            path_store,
            wdm_store,
            resources,
            detector: TopologyChangeDetector::new(),
            config,
            candidates: RwLock::new(Vec::new()),
            compiled: RwLock::new(HashMap::new()),
        }
    }

    pub fn detector(&self) -> &TopologyChangeDetector {
        &self.detector
    }

    pub fn get_wdm_calc_necessary(&self) -> bool {
        self.detector.wdm_calc_necessary()
    }

    /// Last computed candidate list, best candidate first.
    pub fn candidates(&self) -> Vec<WavelengthPathCandidate> {
        self.candidates.read().clone()
    }

    /// Compiled rule unit of a submitted group.
    pub fn compiled_rules(&self, group_id: u64) -> Option<Vec<FlowRule>> {
        self.compiled.read().get(&group_id).cloned()
    }

    /// Recomputes WDM routes between ROADM add/drop ports and swaps them
    /// into the WDM store, scoped to the given ports when supplied.
    pub fn calculate_wdm_paths(
        &self,
        ingress: Option<&ConnectPoint>,
        egress: Option<&ConnectPoint>,
    ) -> Result<usize> {
        for point in [ingress, egress].into_iter().flatten() {
            if !self.inventory.is_oms_add_drop_port(point) {
                return Err(OptimizeError::NotAddDropPort(point.clone()));
            }
        }

        let weigher = FiberSpanWeigher::new(&self.inventory, &self.catalog);
        let graph = RouteGraph::build(&self.inventory, &weigher);
        let pattern = self.estimator.params().evaluation_pattern();

        let mut forward = Vec::new();
        let mut reverse = Vec::new();
        let mut handled: HashSet<(DeviceId, DeviceId)> = HashSet::new();
        let roadms = self.inventory.roadm_devices();
        for a in &roadms {
            if let Some(point) = ingress {
                if point.device != a.id {
                    continue;
                }
            }
            for b in &roadms {
                if a.id == b.id || !handled.insert((a.id.clone(), b.id.clone())) {
                    continue;
                }
                if let Some(point) = egress {
                    if point.device != b.id {
                        continue;
                    }
                }
                // The reverse route covers the opposite device order.
                handled.insert((b.id.clone(), a.id.clone()));

                for route in graph.k_shortest(&a.id, &b.id, self.config.k) {
                    let Some(osnr_fwd) = self.route_osnr(&route, &pattern) else {
                        continue;
                    };
                    let rev_route = route.reversed();
                    let Some(osnr_rev) = self.route_osnr(&rev_route, &pattern) else {
                        continue;
                    };

                    let in_ports = self.scoped_add_drop_ports(&a.id, ingress);
                    let out_ports = self.scoped_add_drop_ports(&b.id, egress);
                    for in_port in &in_ports {
                        for out_port in &out_ports {
                            forward.push(WdmPath::new(
                                in_port.clone(),
                                out_port.clone(),
                                route.clone(),
                                osnr_fwd.clone(),
                            ));
                            reverse.push(WdmPath::new(
                                out_port.clone(),
                                in_port.clone(),
                                rev_route.clone(),
                                osnr_rev.clone(),
                            ));
                        }
                    }
                }
            }
        }

        let count = forward.len() + reverse.len();
        if ingress.is_none() && egress.is_none() {
            forward.extend(reverse);
            self.wdm_store.replace(None, None, forward);
        } else {
            self.wdm_store.replace(ingress, egress, forward);
            self.wdm_store.replace(egress, ingress, reverse);
        }
        self.detector.reset();
        info!(count, "wdm paths calculated");
        Ok(count)
    }

    fn scoped_add_drop_ports(
        &self,
        device: &DeviceId,
        scope: Option<&ConnectPoint>,
    ) -> Vec<ConnectPoint> {
        match scope {
            Some(point) => vec![point.clone()],
            None => self.inventory.oms_add_drop_ports(device),
        }
    }

    /// Forward OSNR of a route per rate/format pattern entry. `None` when
    /// the route has no usable physical model; pattern entries that fail
    /// estimation are dropped individually.
    fn route_osnr(&self, route: &RoutePath, pattern: &[OchParam]) -> Option<OsnrMap> {
        let elements = match self.route_elements(route) {
            Ok(elements) => elements,
            Err(err) => {
                warn!(%err, "route skipped: no usable physical model");
                return None;
            }
        };
        let mut osnr = OsnrMap::new();
        for param in pattern {
            match self
                .estimator
                .total_osnr(&elements, param.rate, param.mod_format)
            {
                Ok(value) => {
                    osnr.insert(*param, value);
                }
                Err(err) => warn!(%param, %err, "pattern entry skipped"),
            }
        }
        Some(osnr)
    }

    fn route_elements(&self, route: &RoutePath) -> optical_model::Result<Vec<PhysicalElement>> {
        let mut elements = Vec::new();
        for link in &route.links {
            let model = self.catalog.link_model(&link.src, &link.dst)?;
            elements.extend(model.elements.iter().cloned());
        }
        Ok(elements)
    }

    /// Builds and ranks candidates for one or two transponder port pairs.
    /// Two pairs yield protected candidates whose routes are disjoint under
    /// the configured policy. Results replace the previous candidate list.
    pub fn calculate_wavelength_paths(
        &self,
        pairs: &[(ConnectPoint, ConnectPoint)],
    ) -> Result<Vec<WavelengthPathCandidate>> {
        if pairs.is_empty() || pairs.len() > 2 {
            return Err(OptimizeError::InvalidPortPairCount(pairs.len()));
        }
        let converter = FrequencyConverter::new(self.config.lowest_frequency_thz());

        let mut per_pair = Vec::with_capacity(pairs.len());
        for (src_och, dst_och) in pairs {
            per_pair.push(self.entries_for_pair(src_och, dst_och, &converter)?);
        }

        let mut candidates: Vec<WavelengthPathCandidate> = match per_pair.len() {
            1 => per_pair
                .remove(0)
                .into_iter()
                .map(WavelengthPathCandidate::single)
                .collect(),
            _ => {
                let secondary_entries = per_pair.pop().unwrap_or_default();
                let main_entries = per_pair.pop().unwrap_or_default();
                let mut paired = Vec::new();
                for main in &main_entries {
                    for secondary in &secondary_entries {
                        if routes_disjoint(self.config.disjointness, &main.route, &secondary.route)
                        {
                            paired.push(WavelengthPathCandidate::pair(
                                main.clone(),
                                secondary.clone(),
                            ));
                        }
                    }
                }
                paired
            }
        };

        // Best candidate first.
        candidates.sort_by(|a, b| {
            b.sort_key()
                .partial_cmp(&a.sort_key())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        info!(count = candidates.len(), "wavelength path candidates computed");
        *self.candidates.write() = candidates.clone();
        Ok(candidates)
    }

    fn entries_for_pair(
        &self,
        src_och: &ConnectPoint,
        dst_och: &ConnectPoint,
        converter: &FrequencyConverter,
    ) -> Result<Vec<CandidateEntry>> {
        let ingress_edge = self.single_active_edge(src_och, true)?;
        let egress_edge = self.single_active_edge(dst_och, false)?;
        let add_port = ingress_edge.dst.clone();
        let drop_port = egress_edge.src.clone();
        for point in [&add_port, &drop_port] {
            if !self.inventory.is_oms_add_drop_port(point) {
                return Err(OptimizeError::NotAddDropPort(point.clone()));
            }
        }
        for point in [src_och, dst_och, &add_port, &drop_port] {
            if !self.resources.is_port_available(point) {
                return Err(OptimizeError::PortUnavailable(point.clone()));
            }
        }

        let src_vendor = self.vendor(&src_och.device);
        let dst_vendor = self.vendor(&dst_och.device);

        let mut entries = Vec::new();
        for wdm in self.wdm_store.get_paths(Some(&add_port), Some(&drop_port)) {
            let Some(rev) = self.wdm_store.get_reverse_path(&wdm) else {
                debug!(ingress = %wdm.ingress, egress = %wdm.egress, "no reverse wdm path, skipped");
                continue;
            };

            let signals = self.reservable_signals(&wdm, converter);
            if signals.is_empty() {
                debug!(ingress = %wdm.ingress, egress = %wdm.egress, "no common free wavelength");
                continue;
            }

            let Some((param, q)) = self.best_combination(&wdm, &rev, &src_vendor, &dst_vendor)
            else {
                continue;
            };
            entries.push(CandidateEntry {
                ingress_edge: ingress_edge.clone(),
                egress_edge: egress_edge.clone(),
                route: wdm.route.clone(),
                rate: param.rate,
                mod_format: param.mod_format,
                q_value: q.value,
                q_threshold: q.threshold,
                signals,
            });
        }
        Ok(entries)
    }

    /// The single active edge link leaving (or entering) a transponder port.
    fn single_active_edge(&self, point: &ConnectPoint, outgoing: bool) -> Result<Link> {
        let links = if outgoing {
            self.inventory.egress_links(point)
        } else {
            self.inventory.ingress_links(point)
        };
        let active: Vec<&&Link> = links.iter().filter(|l| l.is_active()).collect();
        if active.len() != 1 {
            return Err(OptimizeError::EdgeLinkAmbiguous {
                point: point.clone(),
                found: active.len(),
            });
        }
        Ok((*active[0]).clone())
    }

    fn vendor(&self, device: &DeviceId) -> String {
        self.inventory
            .device(device)
            .map(|d| d.vendor.clone())
            .unwrap_or_default()
    }

    /// Wavelengths free on the add/drop ports and on every route point,
    /// keyed by positive frequency ID.
    fn reservable_signals(
        &self,
        wdm: &WdmPath,
        converter: &FrequencyConverter,
    ) -> BTreeMap<i32, optical_model::OchSignal> {
        let mut points = wdm.route.connect_points();
        for point in [&wdm.ingress, &wdm.egress] {
            if !points.contains(point) {
                points.push(point.clone());
            }
        }
        self.resources
            .common_free_lambdas(points.iter())
            .into_iter()
            .filter_map(|signal| {
                let id = converter.channel_id(&signal);
                (id > 0).then_some((id, signal))
            })
            .collect()
    }

    /// Best surviving rate/format: Q taken as the lower of the two
    /// directions, below-threshold combinations rejected, highest rate
    /// preferred, then highest Q. Missing vendor rows degrade the
    /// combination, not the whole search.
    fn best_combination(
        &self,
        forward: &WdmPath,
        reverse: &WdmPath,
        src_vendor: &str,
        dst_vendor: &str,
    ) -> Option<(OchParam, QValue)> {
        let mut best: Option<(OchParam, QValue)> = None;
        for (param, osnr_fwd) in &forward.osnr {
            let Some(osnr_rev) = reverse.osnr.get(param) else {
                continue;
            };
            let q_fwd = match self
                .estimator
                .q_value(src_vendor, param.rate, param.mod_format, *osnr_fwd)
            {
                Ok(q) => q,
                Err(err) => {
                    debug!(%param, %err, "combination skipped");
                    continue;
                }
            };
            let q_rev = match self
                .estimator
                .q_value(dst_vendor, param.rate, param.mod_format, *osnr_rev)
            {
                Ok(q) => q,
                Err(err) => {
                    debug!(%param, %err, "combination skipped");
                    continue;
                }
            };
            let q = if q_rev.value < q_fwd.value { q_rev } else { q_fwd };
            if !q.passes() {
                debug!(%param, q = q.value, threshold = q.threshold, "below threshold");
                continue;
            }
            let better = match &best {
                None => true,
                Some((best_param, best_q)) => {
                    param.rate > best_param.rate
                        || (param.rate == best_param.rate && q.value > best_q.value)
                }
            };
            if better {
                best = Some((*param, q));
            }
        }
        best
    }

    /// Reserves the candidate at 1-based `index` on the given frequency
    /// IDs, inserting its paths into the store under a fresh group ID.
    pub fn reserve_wavelength_path(
        &self,
        index: usize,
        frequency_ids: &[i32],
        names: &[String],
    ) -> Result<Vec<WavelengthPath>> {
        let candidates = self.candidates.read().clone();
        if index == 0 || index > candidates.len() {
            return Err(OptimizeError::IndexOutOfRange {
                index,
                len: candidates.len(),
            });
        }
        let candidate = &candidates[index - 1];
        if frequency_ids.len() != candidate.entries.len() || names.len() != candidate.entries.len()
        {
            return Err(OptimizeError::ReservationArityMismatch {
                expected: candidate.entries.len(),
                got: frequency_ids.len().min(names.len()),
            });
        }

        let group_id = self.path_store.issue_group_id();
        let built = match self.build_reservation(candidate, group_id, frequency_ids, names) {
            Ok(built) => built,
            Err(err) => {
                self.path_store.release_group_id_if_possible(group_id);
                return Err(err);
            }
        };

        let mut ports = Vec::new();
        let mut lambdas = Vec::new();
        for path in &built {
            ports.extend([
                path.src().clone(),
                path.add_port().clone(),
                path.drop_port().clone(),
                path.dst().clone(),
            ]);
            for point in path.route.connect_points() {
                lambdas.push((point, path.signal));
            }
            lambdas.push((path.add_port().clone(), path.signal));
            lambdas.push((path.drop_port().clone(), path.signal));
        }
        if let Err(err) = self.resources.allocate(group_id, &ports, &lambdas) {
            self.path_store.release_group_id_if_possible(group_id);
            return Err(err);
        }

        match self.path_store.add_all(built) {
            Ok(paths) => {
                info!(group_id, count = paths.len(), "wavelength paths reserved");
                Ok(paths)
            }
            Err(err) => {
                self.resources.release(group_id);
                self.path_store.release_group_id_if_possible(group_id);
                Err(err.into())
            }
        }
    }

    fn build_reservation(
        &self,
        candidate: &WavelengthPathCandidate,
        group_id: u64,
        frequency_ids: &[i32],
        names: &[String],
    ) -> Result<Vec<WavelengthPath>> {
        let mut built = Vec::with_capacity(candidate.entries.len());
        for (entry, (frequency_id, name)) in candidate
            .entries
            .iter()
            .zip(frequency_ids.iter().zip(names.iter()))
        {
            let signal = entry
                .signals
                .get(frequency_id)
                .copied()
                .ok_or(OptimizeError::FrequencyNotOffered(*frequency_id))?;
            for point in [&entry.ingress_edge.src, &entry.egress_edge.dst] {
                if !self.inventory.is_port_enabled(point) {
                    return Err(OptimizeError::PortUnavailable(point.clone()));
                }
            }
            built.push(WavelengthPathStore::build(
                group_id,
                entry.ingress_edge.clone(),
                entry.egress_edge.clone(),
                entry.route.clone(),
                *frequency_id,
                signal,
                entry.rate,
                entry.mod_format,
                entry.q(),
                name.clone(),
            ));
        }
        Ok(built)
    }

    /// Compiles the group's circuits into switching rules and marks the
    /// paths submitted. A group can be submitted once.
    pub fn submit_wavelength_path(&self, group_id: u64) -> Result<()> {
        let paths = self.path_store.find_by_group_id(group_id);
        if paths.is_empty() {
            return Err(OptimizeError::UnknownGroup(group_id));
        }
        if paths.iter().any(|p| p.submitted) {
            return Err(OptimizeError::AlreadySubmitted(group_id));
        }

        let compiler = RuleCompiler::new(&self.inventory, self.config.rule_priority);
        let rules = compiler.compile(&paths, true);
        self.compiled.write().insert(group_id, rules);
        for path in paths {
            self.path_store.update(path.as_submitted())?;
        }
        info!(group_id, "wavelength path group submitted");
        Ok(())
    }

    /// Withdraws any compiled rules, releases the group's resources and
    /// removes its paths from the store.
    pub fn remove_wavelength_path(&self, group_id: u64) -> Result<Vec<WavelengthPath>> {
        let paths = self.path_store.find_by_group_id(group_id);
        if paths.is_empty() {
            return Err(OptimizeError::UnknownGroup(group_id));
        }
        if self.compiled.write().remove(&group_id).is_some() {
            debug!(group_id, "compiled rules withdrawn");
        }
        self.resources.release(group_id);
        let removed = self.path_store.remove_all_in_group(group_id);
        info!(group_id, count = removed.len(), "wavelength path group removed");
        Ok(removed)
    }
}
