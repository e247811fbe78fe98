//! Console connection trace.
//!
//! Renders the wiring of a circuit in three views: the numbered list of
//! connections, the connections of each component, and (given a snapshot)
//! every electrical node with its voltage and the V/I of each member pin.
//!
//! ```text
//! Connections:
//!   1. C0 (battery).positive -> C1 (resistor).pin1
//!
//! Component connection map:
//!   C0 (battery):
//!     → C1.pin1
//!
//! Electrical nodes:
//!   Node N(C0.positive) @ 5.00V:
//!     - C0.positive: V=5.00V, I=-22.73mA
//! ```

use std::fmt;

use crate::circuit::{CircuitGraph, NodeMap, PinRef};
use crate::snapshot::Snapshot;

/// Displayable trace of a circuit's wiring.
pub struct ConnectionTrace<'a> {
    graph: &'a CircuitGraph,
    node_map: &'a NodeMap,
    snapshot: Option<&'a Snapshot>,
}

impl<'a> ConnectionTrace<'a> {
    pub fn new(graph: &'a CircuitGraph, node_map: &'a NodeMap) -> Self {
        Self {
            graph,
            node_map,
            snapshot: None,
        }
    }

    /// Include solved voltages and currents in the node listing.
    pub fn with_snapshot(mut self, snapshot: &'a Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    fn describe(&self, pin: &PinRef) -> String {
        match self.graph.component(pin.component) {
            Some(c) => format!("{} ({}).{}", pin.component, c.kind(), pin.pin),
            None => pin.to_string(),
        }
    }
}

impl fmt::Display for ConnectionTrace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Connections:")?;
        if self.graph.connection_count() == 0 {
            writeln!(f, "  (none)")?;
        }
        for (i, conn) in self.graph.connections().enumerate() {
            writeln!(f, "  {}. {} -> {}", i + 1, self.describe(&conn.from), self.describe(&conn.to))?;
        }

        writeln!(f)?;
        writeln!(f, "Component connection map:")?;
        for comp in self.graph.components() {
            writeln!(f, "  {} ({}):", comp.id(), comp.kind())?;
            for conn in self.graph.connections() {
                let Some(other) = conn.other_end(comp.id()) else {
                    continue;
                };
                let arrow = if conn.from.component == comp.id() { '→' } else { '←' };
                writeln!(f, "    {} {}", arrow, other)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Electrical nodes:")?;
        for (node, members) in self.node_map.nodes() {
            match self.snapshot {
                Some(snap) => writeln!(f, "  Node {} @ {:.2}V:", node, snap.node_voltage(node))?,
                None => writeln!(f, "  Node {}:", node)?,
            }
            if self.node_map.ground() == Some(*node) {
                writeln!(f, "    (ground)")?;
            }
            for pin in members {
                match self.snapshot {
                    Some(snap) => {
                        let current = snap.pin_currents.get(pin).copied().unwrap_or(0.0);
                        writeln!(
                            f,
                            "    - {}: V={:.2}V, I={:.2}mA",
                            pin,
                            snap.pin_voltage(pin),
                            current * 1000.0
                        )?;
                    }
                    None => writeln!(f, "    - {}", pin)?,
                }
            }
        }

        if let Some(snap) = self.snapshot {
            if !snap.faults.is_empty() {
                writeln!(f)?;
                writeln!(f, "Faults:")?;
                for fault in &snap.faults {
                    writeln!(f, "  {}", fault)?;
                }
            }
        }

        Ok(())
    }
}
