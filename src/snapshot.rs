//! Published simulation results.
//!
//! A [`Snapshot`] is the complete solved state of one tick. It is immutable
//! once published and shared as `Arc<Snapshot>`; each tick replaces it
//! wholesale.

use std::collections::BTreeMap;
use std::fmt;

use crate::circuit::{ComponentId, Connection, NodeId, PinRef};

/// Category of a reported fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaultKind {
    /// A component has a dangling pin or no path to any source; it is left
    /// out of the solve
    Floating,
    /// Both terminals of a source sit on the same node
    Short,
    /// A powered sub-circuit has no path to the ground node
    MissingGround,
    /// Nonlinear iteration hit its cap
    NonConvergent,
    /// The assembled system could not be factored
    Singular,
}

impl FaultKind {
    /// Fatal faults skip the solve (or discard its result) for the tick.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FaultKind::Short | FaultKind::NonConvergent | FaultKind::Singular
        )
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultKind::Floating => "floating",
            FaultKind::Short => "short circuit",
            FaultKind::MissingGround => "missing ground",
            FaultKind::NonConvergent => "non-convergent",
            FaultKind::Singular => "singular",
        };
        f.write_str(s)
    }
}

/// A fault together with the components involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub components: Vec<ComponentId>,
}

impl Fault {
    pub fn new(kind: FaultKind, components: Vec<ComponentId>) -> Self {
        Self { kind, components }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.components.is_empty() {
            let ids: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
            write!(f, " [{}]", ids.join(", "))?;
        }
        Ok(())
    }
}

/// Pin colour classes used by the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    Mid,
    High,
}

impl PinLevel {
    pub fn from_voltage(voltage: f64) -> Self {
        if voltage > 4.5 {
            PinLevel::High
        } else if voltage > 0.5 {
            PinLevel::Mid
        } else {
            PinLevel::Low
        }
    }
}

/// Wires carrying no more than this (in amps) are drawn idle.
const WIRE_CURRENT_THRESHOLD: f64 = 0.001;

/// Solved state of one simulation tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Tick counter, starting at 1 for the first solved tick
    pub tick: u64,
    pub node_voltages: BTreeMap<NodeId, f64>,
    pub pin_voltages: BTreeMap<PinRef, f64>,
    /// Current entering the component at each pin
    pub pin_currents: BTreeMap<PinRef, f64>,
    /// Current from first pin to second pin (delivered current for sources)
    pub component_currents: BTreeMap<ComponentId, f64>,
    /// Glow level in [0, 1] for every LED
    pub led_brightness: BTreeMap<ComponentId, f64>,
    pub faults: Vec<Fault>,
    /// Solver iterations spent on this tick (0 if the solve was skipped)
    pub iterations: usize,
}

impl Snapshot {
    /// Voltage of a node, 0 if unknown.
    pub fn node_voltage(&self, node: &NodeId) -> f64 {
        self.node_voltages.get(node).copied().unwrap_or(0.0)
    }

    /// Voltage of a pin, 0 if unknown.
    pub fn pin_voltage(&self, pin: &PinRef) -> f64 {
        self.pin_voltages.get(pin).copied().unwrap_or(0.0)
    }

    /// Current through a component, 0 if unknown.
    pub fn current(&self, component: ComponentId) -> f64 {
        self.component_currents.get(&component).copied().unwrap_or(0.0)
    }

    /// Glow level of a wire in [0, 1], driven by the current at its `from`
    /// pin. Idle wires (1 mA or less) read 0; above that the level starts
    /// at 100/255 and rises by 1/255 per mA until it saturates.
    pub fn wire_intensity(&self, wire: &Connection) -> f64 {
        let amps = self.pin_currents.get(&wire.from).copied().unwrap_or(0.0).abs();
        if amps > WIRE_CURRENT_THRESHOLD {
            ((100.0 + amps * 1000.0) / 255.0).min(1.0)
        } else {
            0.0
        }
    }

    /// Check whether any fault of the given kind was raised.
    pub fn has_fault(&self, kind: FaultKind) -> bool {
        self.faults.iter().any(|f| f.kind == kind)
    }

    /// Faults of a given kind.
    pub fn faults_of(&self, kind: FaultKind) -> impl Iterator<Item = &Fault> {
        self.faults.iter().filter(move |f| f.kind == kind)
    }

    /// Check whether a component is named by any fault.
    pub fn is_faulted(&self, component: ComponentId) -> bool {
        self.faults.iter().any(|f| f.components.contains(&component))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_levels() {
        assert_eq!(PinLevel::from_voltage(5.0), PinLevel::High);
        assert_eq!(PinLevel::from_voltage(2.0), PinLevel::Mid);
        assert_eq!(PinLevel::from_voltage(0.0), PinLevel::Low);
    }

    #[test]
    fn test_fault_display() {
        let f = Fault::new(FaultKind::Short, vec![ComponentId(2)]);
        assert_eq!(f.to_string(), "short circuit [C2]");
        assert!(f.kind.is_fatal());
        assert!(!FaultKind::MissingGround.is_fatal());
    }

    #[test]
    fn test_wire_intensity() {
        use crate::circuit::ConnectionId;

        let wire = Connection {
            id: ConnectionId(0),
            from: PinRef::new(ComponentId(0), "positive"),
            to: PinRef::new(ComponentId(1), "pin1"),
        };
        let mut snap = Snapshot::default();
        assert_eq!(snap.wire_intensity(&wire), 0.0);

        snap.pin_currents.insert(wire.from, 0.0005);
        assert_eq!(snap.wire_intensity(&wire), 0.0);

        // Source pins report current leaving the battery as negative
        snap.pin_currents.insert(wire.from, -0.020);
        assert!((snap.wire_intensity(&wire) - 120.0 / 255.0).abs() < 1e-9);

        snap.pin_currents.insert(wire.from, 0.5);
        assert_eq!(snap.wire_intensity(&wire), 1.0);
    }

    #[test]
    fn test_lookup_defaults_to_zero() {
        let snap = Snapshot::default();
        assert_eq!(snap.current(ComponentId(0)), 0.0);
        assert!(!snap.has_fault(FaultKind::Floating));
    }
}
