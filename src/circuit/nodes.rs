//! Node resolution: grouping connected pins into electrical nodes.
//!
//! Every pin starts in its own set; every connection unions the sets of its
//! two pins. Each resulting set is one node, named after its smallest pin.
//! The node map is a pure function of the connection set, so it is memoized
//! by graph revision and only rebuilt when the topology changes.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::graph::CircuitGraph;
use super::types::{NodeId, PinRef};
use super::union_find::UnionFind;
use crate::components::Component;

/// The partition of all pins into electrical nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMap {
    /// Graph revision this map was computed from
    revision: u64,
    pin_to_node: BTreeMap<PinRef, NodeId>,
    /// Members of each node, sorted
    nodes: BTreeMap<NodeId, Vec<PinRef>>,
    /// Reference node, `None` only for an empty circuit
    ground: Option<NodeId>,
}

impl NodeMap {
    /// Compute the node map of a circuit.
    pub fn resolve(graph: &CircuitGraph) -> Self {
        let pins = graph.pins();
        let index: BTreeMap<PinRef, usize> = pins.iter().enumerate().map(|(i, p)| (*p, i)).collect();

        let mut uf = UnionFind::new(pins.len());
        for conn in graph.connections() {
            // The graph guarantees both ends exist
            if let (Some(&a), Some(&b)) = (index.get(&conn.from), index.get(&conn.to)) {
                uf.union(a, b);
            }
        }

        // Pins are sorted, so the first pin seen for a root is the smallest
        let mut root_to_node: BTreeMap<usize, NodeId> = BTreeMap::new();
        let mut pin_to_node = BTreeMap::new();
        let mut nodes: BTreeMap<NodeId, Vec<PinRef>> = BTreeMap::new();
        for (i, pin) in pins.iter().enumerate() {
            let root = uf.find(i);
            let node = *root_to_node.entry(root).or_insert(NodeId(*pin));
            pin_to_node.insert(*pin, node);
            nodes.entry(node).or_default().push(*pin);
        }

        let ground = Self::select_ground(graph, &pin_to_node);

        debug!(
            revision = graph.revision(),
            pins = pins.len(),
            nodes = nodes.len(),
            ground = ?ground,
            "node map resolved"
        );

        Self {
            revision: graph.revision(),
            pin_to_node,
            nodes,
            ground,
        }
    }

    /// Ground is the negative terminal of the first-created battery, or the
    /// first pin of the first-created component when there is no battery.
    fn select_ground(graph: &CircuitGraph, pin_to_node: &BTreeMap<PinRef, NodeId>) -> Option<NodeId> {
        let anchor = graph
            .components()
            .find_map(|c| match c {
                Component::Battery(b) => Some(PinRef::new(b.id, b.negative())),
                _ => None,
            })
            .or_else(|| {
                graph
                    .components()
                    .next()
                    .and_then(|c| c.pin_names().first().map(|p| PinRef::new(c.id(), p)))
            })?;
        pin_to_node.get(&anchor).copied()
    }

    /// Graph revision this map reflects.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The designated reference node.
    pub fn ground(&self) -> Option<NodeId> {
        self.ground
    }

    /// The node a pin belongs to.
    pub fn node_of(&self, pin: &PinRef) -> Option<NodeId> {
        self.pin_to_node.get(pin).copied()
    }

    /// Members of a node, sorted.
    pub fn members(&self, node: &NodeId) -> &[PinRef] {
        self.nodes.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check whether a pin is alone in its node (wired to nothing).
    pub fn is_dangling(&self, pin: &PinRef) -> bool {
        self.node_of(pin).map(|n| self.members(&n).len() <= 1).unwrap_or(true)
    }

    /// All nodes with their members, in node order.
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &Vec<PinRef>)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Owned copy of the partition, for node inspection and tracing.
    pub fn to_map(&self) -> BTreeMap<NodeId, Vec<PinRef>> {
        self.nodes.clone()
    }
}

/// Memoizing front end for [`NodeMap::resolve`].
#[derive(Debug, Default)]
pub struct NodeResolver {
    cached: Option<Arc<NodeMap>>,
}

impl NodeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node map for the graph's current topology, recomputed only if the
    /// graph revision moved since the last call.
    pub fn node_map(&mut self, graph: &CircuitGraph) -> Arc<NodeMap> {
        match &self.cached {
            Some(map) if map.revision() == graph.revision() => Arc::clone(map),
            _ => {
                let map = Arc::new(NodeMap::resolve(graph));
                self.cached = Some(Arc::clone(&map));
                map
            }
        }
    }

    /// Drop the cached map.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
