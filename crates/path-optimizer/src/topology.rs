//! Device-level route graph and K-shortest-path search.
//!
//! The graph has one node per device and one directed edge per viable
//! topology link, weighted by total fiber span length. K-shortest routes
//! come from Yen's algorithm layered over A* (zero heuristic, so plain
//! uniform-cost search); equal-cost routes keep discovery order, no extra
//! tie-break.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use tracing::debug;

use optical_model::{DeviceId, Link, NetworkInventory, RoutePath};

use crate::weigher::FiberSpanWeigher;

#[derive(Debug, Clone)]
struct EdgeCost {
    link: Link,
    cost: f64,
}

pub struct RouteGraph {
    graph: DiGraph<DeviceId, EdgeCost>,
    nodes: HashMap<DeviceId, NodeIndex>,
}

impl RouteGraph {
    /// Builds the searchable graph from the inventory's viable links.
    pub fn build(inventory: &NetworkInventory, weigher: &FiberSpanWeigher<'_>) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<DeviceId, NodeIndex> = HashMap::new();
        for link in inventory.links() {
            let Some(cost) = weigher.weigh(link) else {
                continue;
            };
            let src = *nodes
                .entry(link.src.device.clone())
                .or_insert_with(|| graph.add_node(link.src.device.clone()));
            let dst = *nodes
                .entry(link.dst.device.clone())
                .or_insert_with(|| graph.add_node(link.dst.device.clone()));
            graph.add_edge(src, dst, EdgeCost {
                link: link.clone(),
                cost,
            });
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "route graph built"
        );
        RouteGraph { graph, nodes }
    }

    /// Up to `k` loop-free routes from `src` to `dst`, cheapest first.
    pub fn k_shortest(&self, src: &DeviceId, dst: &DeviceId, k: usize) -> Vec<RoutePath> {
        let (Some(&s), Some(&t)) = (self.nodes.get(src), self.nodes.get(dst)) else {
            return Vec::new();
        };
        if k == 0 || s == t {
            return Vec::new();
        }

        let mut found: Vec<Vec<EdgeIndex>> = Vec::new();
        let mut spares: Vec<Vec<EdgeIndex>> = Vec::new();

        let Some(first) = self.shortest(s, t, &HashSet::new(), &HashSet::new()) else {
            return Vec::new();
        };
        found.push(first);

        while found.len() < k {
            let prev = found.last().cloned().unwrap_or_default();
            for i in 0..prev.len() {
                let root = &prev[..i];
                let spur_node = self.edge_source(prev[i]);

                // Edges already used to leave this root by any found route.
                let mut banned_edges: HashSet<EdgeIndex> = HashSet::new();
                for path in &found {
                    if path.len() > i && path[..i] == *root {
                        banned_edges.insert(path[i]);
                    }
                }
                // Root devices may not reappear downstream of the spur.
                let banned_nodes: HashSet<NodeIndex> =
                    root.iter().map(|e| self.edge_source(*e)).collect();

                if let Some(spur) = self.shortest(spur_node, t, &banned_edges, &banned_nodes) {
                    let mut candidate = root.to_vec();
                    candidate.extend(spur);
                    if !found.contains(&candidate) && !spares.contains(&candidate) {
                        spares.push(candidate);
                    }
                }
            }
            if spares.is_empty() {
                break;
            }
            spares.sort_by(|a, b| {
                self.path_cost(a)
                    .partial_cmp(&self.path_cost(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            found.push(spares.remove(0));
        }

        found.into_iter().map(|edges| self.route(&edges)).collect()
    }

    fn shortest(
        &self,
        src: NodeIndex,
        dst: NodeIndex,
        banned_edges: &HashSet<EdgeIndex>,
        banned_nodes: &HashSet<NodeIndex>,
    ) -> Option<Vec<EdgeIndex>> {
        let filtered = EdgeFiltered::from_fn(&self.graph, |edge| {
            !banned_edges.contains(&edge.id())
                && !banned_nodes.contains(&edge.source())
                && !banned_nodes.contains(&edge.target())
        });
        let (_, nodes) = petgraph::algo::astar(
            &filtered,
            src,
            |node| node == dst,
            |edge| edge.weight().cost,
            |_| 0.0,
        )?;

        // Rebuild the edge sequence, picking the cheapest permitted edge
        // between each consecutive device pair.
        let mut edges = Vec::with_capacity(nodes.len().saturating_sub(1));
        for pair in nodes.windows(2) {
            let edge = self
                .graph
                .edges_connecting(pair[0], pair[1])
                .filter(|e| !banned_edges.contains(&e.id()))
                .min_by(|a, b| {
                    a.weight()
                        .cost
                        .partial_cmp(&b.weight().cost)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })?;
            edges.push(edge.id());
        }
        Some(edges)
    }

    fn edge_source(&self, edge: EdgeIndex) -> NodeIndex {
        self.graph
            .edge_endpoints(edge)
            .map(|(src, _)| src)
            .unwrap_or_else(|| NodeIndex::new(0))
    }

    fn path_cost(&self, edges: &[EdgeIndex]) -> f64 {
        edges.iter().map(|e| self.graph[*e].cost).sum()
    }

    fn route(&self, edges: &[EdgeIndex]) -> RoutePath {
        RoutePath::new(
            edges.iter().map(|e| self.graph[*e].link.clone()).collect(),
            self.path_cost(edges),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optical_model::{
        ConnectPoint, Device, DeviceType, FiberSpan, FiberType, LinkModelCatalog, PhysicalElement,
        PhysicalLink, Port, PortNumber, PortType,
    };

    fn roadm(inv: &mut NetworkInventory, id: &str, line_ports: &[u64]) {
        inv.add_device(
            Device {
                id: DeviceId::new(id),
                device_type: DeviceType::Roadm,
                vendor: "acme".into(),
            },
            line_ports
                .iter()
                .map(|n| Port {
                    number: PortNumber::new(*n),
                    port_type: PortType::Oms,
                    add_drop: false,
                    enabled: true,
                })
                .collect(),
        );
    }

    fn fiber(length_m: f64) -> PhysicalLink {
        PhysicalLink::new(vec![PhysicalElement::Fiber(FiberSpan {
            span_loss_db: 10.0,
            fiber_type: FiberType::Smf,
            srlg_length_m: length_m,
        })])
    }

    fn connect(
        inv: &mut NetworkInventory,
        catalog: &mut LinkModelCatalog,
        a: (&str, u64),
        b: (&str, u64),
        length_m: f64,
    ) {
        let src = ConnectPoint::of(a.0, a.1);
        let dst = ConnectPoint::of(b.0, b.1);
        inv.add_bidirectional_link(src.clone(), dst.clone());
        catalog.insert(src.clone(), dst.clone(), fiber(length_m));
        catalog.insert(dst, src, fiber(length_m));
    }

    /// a - b - c plus a direct (longer) a - c link.
    fn triangle() -> (NetworkInventory, LinkModelCatalog) {
        let mut inv = NetworkInventory::new();
        let mut catalog = LinkModelCatalog::new();
        roadm(&mut inv, "roadm-a", &[3, 4]);
        roadm(&mut inv, "roadm-b", &[3, 4]);
        roadm(&mut inv, "roadm-c", &[3, 4]);
        connect(&mut inv, &mut catalog, ("roadm-a", 3), ("roadm-b", 3), 50_000.0);
        connect(&mut inv, &mut catalog, ("roadm-b", 4), ("roadm-c", 3), 50_000.0);
        connect(&mut inv, &mut catalog, ("roadm-a", 4), ("roadm-c", 4), 150_000.0);
        (inv, catalog)
    }

    #[test]
    fn routes_come_back_cheapest_first() {
        let (inv, catalog) = triangle();
        let weigher = FiberSpanWeigher::new(&inv, &catalog);
        let graph = RouteGraph::build(&inv, &weigher);
        let routes = graph.k_shortest(&DeviceId::new("roadm-a"), &DeviceId::new("roadm-c"), 3);

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].links.len(), 2);
        assert!((routes[0].cost - 100_000.0).abs() < 1.0);
        assert_eq!(routes[1].links.len(), 1);
        assert!((routes[1].cost - 150_000.0).abs() < 1.0);
    }

    #[test]
    fn k_caps_the_result_count() {
        let (inv, catalog) = triangle();
        let weigher = FiberSpanWeigher::new(&inv, &catalog);
        let graph = RouteGraph::build(&inv, &weigher);
        let routes = graph.k_shortest(&DeviceId::new("roadm-a"), &DeviceId::new("roadm-c"), 1);
        assert_eq!(routes.len(), 1);
    }

    #[test]
    fn unknown_devices_have_no_routes() {
        let (inv, catalog) = triangle();
        let weigher = FiberSpanWeigher::new(&inv, &catalog);
        let graph = RouteGraph::build(&inv, &weigher);
        assert!(graph
            .k_shortest(&DeviceId::new("roadm-a"), &DeviceId::new("ghost"), 3)
            .is_empty());
    }

    #[test]
    fn routes_are_loop_free() {
        let (inv, catalog) = triangle();
        let weigher = FiberSpanWeigher::new(&inv, &catalog);
        let graph = RouteGraph::build(&inv, &weigher);
        for route in graph.k_shortest(&DeviceId::new("roadm-a"), &DeviceId::new("roadm-c"), 5) {
            let mut seen = HashSet::new();
            for link in &route.links {
                assert!(seen.insert(link.src.device.clone()));
            }
        }
    }
}
