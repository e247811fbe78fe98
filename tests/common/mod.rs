#![allow(dead_code)]

use approx::assert_abs_diff_eq;
use breadboard_core::{CircuitGraph, ComponentId, PinRef, Simulator, Snapshot};

pub mod strategies;

/// Tolerance for solved node voltages (volts)
pub const EPSILON_VOLTAGE: f64 = 1e-6;

/// Tolerance for solved currents (amperes)
pub const EPSILON_CURRENT: f64 = 1e-6;

/// Build a simulator from a graph and run a single tick.
pub fn solve_once(graph: CircuitGraph) -> (Simulator, Snapshot) {
    let mut sim = Simulator::new(graph);
    let snapshot = (*sim.tick()).clone();
    (sim, snapshot)
}

/// Asserts the voltage of a named pin.
pub fn assert_pin_voltage(snapshot: &Snapshot, component: ComponentId, pin: &'static str, expected: f64) {
    let actual = snapshot.pin_voltage(&PinRef::new(component, pin));
    assert_abs_diff_eq!(actual, expected, epsilon = EPSILON_VOLTAGE);
}

/// Asserts the current through a component.
pub fn assert_current(snapshot: &Snapshot, component: ComponentId, expected: f64) {
    assert_abs_diff_eq!(snapshot.current(component), expected, epsilon = EPSILON_CURRENT);
}
