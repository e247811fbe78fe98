//! Circuit validation.
//!
//! Runs before every solve and never fails: problems are reported as
//! [`Fault`]s and the caller decides what to stamp.
//!
//! Checks, in order:
//! - Floating components (dangling pin, or no path to any source) are
//!   excluded from the solve
//! - Sources whose terminals share a node are short circuits (fatal)
//! - Powered sub-circuits that do not reach ground get a local anchor

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::graph::CircuitGraph;
use super::nodes::NodeMap;
use super::types::{ComponentId, NodeId, PinRef};
use super::union_find::UnionFind;
use crate::components::Component;
use crate::snapshot::{Fault, FaultKind};

/// A connected group of active nodes solved against one reference node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Island {
    /// Reference node held at 0 V
    pub anchor: NodeId,
    /// Active nodes, anchor included
    pub nodes: Vec<NodeId>,
    /// Stamped components
    pub components: Vec<ComponentId>,
    /// Whether the anchor is the circuit's ground node
    pub grounded: bool,
}

/// Outcome of validating a circuit for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub faults: Vec<Fault>,
    /// Components treated as open for this tick
    pub excluded: BTreeSet<ComponentId>,
    /// Set when the solve must be skipped
    pub fatal: bool,
    /// Islands to solve; empty when `fatal` is set
    pub islands: Vec<Island>,
}

impl Validation {
    /// Check whether a component takes part in the solve.
    pub fn is_stamped(&self, id: ComponentId) -> bool {
        !self.fatal && !self.excluded.contains(&id)
    }
}

/// Validate a circuit for simulation.
pub fn validate_circuit(graph: &CircuitGraph, node_map: &NodeMap) -> Validation {
    let mut validation = Validation::default();

    let node_index: BTreeMap<NodeId, usize> = node_map
        .nodes()
        .enumerate()
        .map(|(i, (node, _))| (*node, i))
        .collect();
    let node_ids: Vec<NodeId> = node_map.nodes().map(|(n, _)| *n).collect();
    let pin_node = |pin: PinRef| node_map.node_of(&pin).and_then(|n| node_index.get(&n).copied());

    // Floating: group nodes through every component, then find the groups
    // that contain a source
    let mut reach = UnionFind::new(node_ids.len());
    for comp in graph.components() {
        join_pins(&mut reach, comp, &pin_node);
    }
    let mut powered = BTreeSet::new();
    for comp in graph.components().filter(|c| c.is_source()) {
        if let Some(first) = first_node(comp, &pin_node) {
            powered.insert(reach.find(first));
        }
    }
    for comp in graph.components().filter(|c| !c.is_source()) {
        let dangling = comp
            .pin_names()
            .iter()
            .any(|p| node_map.is_dangling(&PinRef::new(comp.id(), p)));
        let unpowered = first_node(comp, &pin_node)
            .map(|n| !powered.contains(&reach.find(n)))
            .unwrap_or(true);
        if dangling || unpowered {
            debug!(component = %comp.id(), dangling, unpowered, "floating component");
            validation.excluded.insert(comp.id());
            validation
                .faults
                .push(Fault::new(FaultKind::Floating, vec![comp.id()]));
        }
    }

    // Short: a source across a single node
    for comp in graph.components() {
        if let Component::Battery(b) = comp {
            let pos = node_map.node_of(&PinRef::new(b.id, b.positive()));
            let neg = node_map.node_of(&PinRef::new(b.id, b.negative()));
            if pos.is_some() && pos == neg {
                debug!(component = %b.id, "short circuit across source");
                validation.faults.push(Fault::new(FaultKind::Short, vec![b.id]));
                validation.fatal = true;
            }
        }
    }
    if validation.fatal {
        return validation;
    }

    // Islands over the stamped components only
    let mut islands_uf = UnionFind::new(node_ids.len());
    let mut active = BTreeSet::new();
    for comp in graph.components().filter(|c| !validation.excluded.contains(&c.id())) {
        join_pins(&mut islands_uf, comp, &pin_node);
        for pin in comp.pin_names() {
            if let Some(n) = pin_node(PinRef::new(comp.id(), pin)) {
                active.insert(n);
            }
        }
    }

    let mut by_root: BTreeMap<usize, (Vec<NodeId>, Vec<ComponentId>)> = BTreeMap::new();
    for &n in &active {
        by_root.entry(islands_uf.find(n)).or_default().0.push(node_ids[n]);
    }
    for comp in graph.components().filter(|c| !validation.excluded.contains(&c.id())) {
        if let Some(n) = first_node(comp, &pin_node) {
            by_root.entry(islands_uf.find(n)).or_default().1.push(comp.id());
        }
    }

    let ground = node_map.ground();
    for (_, (nodes, components)) in by_root {
        let grounded = ground.map(|g| nodes.contains(&g)).unwrap_or(false);
        let anchor = match (grounded, ground) {
            (true, Some(g)) => g,
            _ => local_anchor(graph, node_map, &components).unwrap_or(nodes[0]),
        };
        if !grounded {
            debug!(anchor = %anchor, components = components.len(), "island without ground path");
            validation
                .faults
                .push(Fault::new(FaultKind::MissingGround, components.clone()));
        }
        validation.islands.push(Island {
            anchor,
            nodes,
            components,
            grounded,
        });
    }

    validation
}

fn join_pins(uf: &mut UnionFind, comp: &Component, pin_node: &impl Fn(PinRef) -> Option<usize>) {
    let mut nodes = comp
        .pin_names()
        .iter()
        .filter_map(|p| pin_node(PinRef::new(comp.id(), p)));
    if let Some(first) = nodes.next() {
        for other in nodes {
            uf.union(first, other);
        }
    }
}

fn first_node(comp: &Component, pin_node: &impl Fn(PinRef) -> Option<usize>) -> Option<usize> {
    comp.pin_names()
        .first()
        .and_then(|p| pin_node(PinRef::new(comp.id(), p)))
}

/// Negative terminal of the lowest-id source in an island.
fn local_anchor(graph: &CircuitGraph, node_map: &NodeMap, components: &[ComponentId]) -> Option<NodeId> {
    components.iter().find_map(|id| match graph.component(*id) {
        Some(Component::Battery(b)) => node_map.node_of(&PinRef::new(b.id, b.negative())),
        _ => None,
    })
}
