//! Main simulator interface.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::circuit::{
    validate_circuit, CircuitGraph, ComponentId, Connection, ConnectionId, NodeId, NodeMap, NodeResolver, PinRef,
};
use crate::components::{Component, ComponentKind};
use crate::error::{BreadboardError, Result};
use crate::snapshot::{Fault, FaultKind, Snapshot};

use super::mna::{Assembly, MnaMatrix, SystemLayout};
use super::{NewtonRaphson, DEFAULT_MAX_ITERATIONS, DEFAULT_TICK_RATE_HZ, DEFAULT_TOLERANCE, MAX_TICK_RATE_HZ};

/// Configuration for the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Ticks per second when driven by the simulation loop.
    pub tick_rate_hz: f64,
    /// Maximum Newton iterations for nonlinear components.
    pub max_iterations: usize,
    /// Convergence tolerance for Newton iteration (volts).
    pub tolerance: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tick rate (in Hz).
    pub fn with_tick_rate(mut self, hz: f64) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    /// Set the maximum Newton iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance (in volts).
    ///
    /// Looser tolerances settle sooner; the piecewise-linear LED model
    /// converges exactly once every LED is on the right segment, so the
    /// default rarely costs extra iterations.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Check that every setting is in range.
    pub fn validate(&self) -> Result<()> {
        check_tick_rate(self.tick_rate_hz)?;
        if self.max_iterations == 0 {
            return Err(BreadboardError::invalid_simulation_param(
                "max_iterations must be at least 1",
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(BreadboardError::invalid_simulation_param(format!(
                "tolerance must be a finite value > 0, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Check a tick rate against the accepted range.
pub(crate) fn check_tick_rate(hz: f64) -> Result<()> {
    if hz.is_finite() && hz > 0.0 && hz <= MAX_TICK_RATE_HZ {
        Ok(())
    } else {
        Err(BreadboardError::invalid_simulation_param(format!(
            "tick rate must be in (0, {MAX_TICK_RATE_HZ}] Hz, got {hz}"
        )))
    }
}

/// The circuit simulator.
///
/// Owns the circuit graph and produces one [`Snapshot`] per call to
/// [`Simulator::tick`]. Numerical trouble never escapes a tick: it is
/// reported as a fault and the previous voltages are held.
#[derive(Debug)]
pub struct Simulator {
    /// The circuit being simulated
    graph: CircuitGraph,
    /// Cached node partition
    resolver: NodeResolver,
    /// Newton solver
    newton: NewtonRaphson,
    config: SimulatorConfig,
    /// Most recent published state
    latest: Arc<Snapshot>,
    /// Ticks run since creation or the last reset
    tick: u64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(CircuitGraph::new())
    }
}

impl Simulator {
    /// Create a new simulator for the given circuit with default configuration.
    pub fn new(graph: CircuitGraph) -> Self {
        Self::with_config(graph, SimulatorConfig::default())
    }

    /// Create a new simulator for the given circuit with custom configuration.
    pub fn with_config(graph: CircuitGraph, config: SimulatorConfig) -> Self {
        let newton = NewtonRaphson::with_config(config.max_iterations, config.tolerance);
        Self {
            graph,
            resolver: NodeResolver::new(),
            newton,
            config,
            latest: Arc::new(Snapshot::default()),
            tick: 0,
        }
    }

    pub fn graph(&self) -> &CircuitGraph {
        &self.graph
    }

    /// Mutable access to the circuit. Topology changes are picked up by
    /// the next tick.
    pub fn graph_mut(&mut self) -> &mut CircuitGraph {
        &mut self.graph
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: SimulatorConfig) -> Result<()> {
        config.validate()?;
        self.newton = NewtonRaphson::with_config(config.max_iterations, config.tolerance);
        self.config = config;
        Ok(())
    }

    pub fn add_component(&mut self, kind: ComponentKind, params: &[(&str, f64)]) -> Result<ComponentId> {
        self.graph.add_component(kind, params)
    }

    pub fn add_battery(&mut self, voltage: f64) -> Result<ComponentId> {
        self.graph.add_battery(voltage)
    }

    pub fn add_resistor(&mut self, resistance: f64) -> Result<ComponentId> {
        self.graph.add_resistor(resistance)
    }

    pub fn add_led(&mut self, forward_voltage: f64) -> Result<ComponentId> {
        self.graph.add_led(forward_voltage)
    }

    pub fn remove_component(&mut self, id: ComponentId) -> Result<Component> {
        self.graph.remove_component(id)
    }

    pub fn add_connection(&mut self, a: (ComponentId, &str), b: (ComponentId, &str)) -> Result<ConnectionId> {
        self.graph.add_connection(a, b)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Result<Connection> {
        self.graph.remove_connection(id)
    }

    pub fn set_parameter(&mut self, id: ComponentId, name: &str, value: f64) -> Result<()> {
        self.graph.set_parameter(id, name, value)
    }

    /// Current node partition, recomputed only after topology changes.
    pub fn node_map(&mut self) -> Arc<NodeMap> {
        self.resolver.node_map(&self.graph)
    }

    /// Debug view of the node partition.
    pub fn node_map_view(&mut self) -> BTreeMap<NodeId, Vec<PinRef>> {
        self.node_map().to_map()
    }

    /// All connections, in creation order.
    pub fn list_connections(&self) -> Vec<&Connection> {
        self.graph.connections().collect()
    }

    pub fn connections_for_component(&self, id: ComponentId) -> Result<Vec<&Connection>> {
        self.graph.connections_for_component(id)
    }

    /// The most recently produced snapshot.
    pub fn latest_snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.latest)
    }

    /// Forget all solved state. The circuit itself is kept.
    pub fn reset(&mut self) {
        self.tick = 0;
        self.latest = Arc::new(Snapshot::default());
        self.resolver.invalidate();
        debug!("simulator reset");
    }

    /// Run one simulation step and publish its snapshot.
    pub fn tick(&mut self) -> Arc<Snapshot> {
        self.tick += 1;
        let node_map = self.resolver.node_map(&self.graph);
        let validation = validate_circuit(&self.graph, &node_map);
        let mut faults = validation.faults.clone();

        let snapshot = if validation.fatal {
            self.held_snapshot(&node_map, faults)
        } else {
            let layout = SystemLayout::new(&self.graph, &validation);
            let assembly = Assembly {
                graph: &self.graph,
                node_map: &node_map,
                layout: &layout,
            };
            let mut matrix = MnaMatrix::new(layout.size());
            let initial = layout.initial_guess(&self.latest.node_voltages);

            match self.newton.solve(&assembly, &mut matrix, &initial) {
                Ok(iterations) => solved_snapshot(self.tick, &assembly, &matrix, faults, iterations),
                Err(err) => {
                    debug!(error = %err, "solve failed");
                    faults.push(numerical_fault(&assembly, &err));
                    self.held_snapshot(&node_map, faults)
                }
            }
        };

        if snapshot.faults != self.latest.faults {
            for fault in &snapshot.faults {
                warn!(tick = self.tick, %fault, "circuit fault");
            }
            if snapshot.faults.is_empty() {
                debug!(tick = self.tick, "faults cleared");
            }
        }

        self.latest = Arc::new(snapshot);
        Arc::clone(&self.latest)
    }

    /// Snapshot for a tick whose solve was skipped or discarded.
    ///
    /// Node and pin voltages are the previous snapshot's, unchanged; pins
    /// new since then read 0 V. Every current is zero.
    fn held_snapshot(&self, node_map: &NodeMap, faults: Vec<Fault>) -> Snapshot {
        let previous = &self.latest;
        let mut snapshot = Snapshot {
            tick: self.tick,
            node_voltages: previous.node_voltages.clone(),
            faults,
            ..Snapshot::default()
        };

        for pin in node_map.nodes().flat_map(|(_, members)| members) {
            snapshot.pin_voltages.insert(*pin, previous.pin_voltage(pin));
            snapshot.pin_currents.insert(*pin, 0.0);
        }

        for comp in self.graph.components() {
            snapshot.component_currents.insert(comp.id(), 0.0);
            if let Component::Led(_) = comp {
                snapshot.led_brightness.insert(comp.id(), 0.0);
            }
        }

        snapshot
    }
}

/// Snapshot built from a converged solution.
fn solved_snapshot(
    tick: u64,
    assembly: &Assembly<'_>,
    matrix: &MnaMatrix,
    faults: Vec<Fault>,
    iterations: usize,
) -> Snapshot {
    let layout = assembly.layout;
    let mut snapshot = Snapshot {
        tick,
        faults,
        iterations,
        ..Snapshot::default()
    };

    // Anchors and inactive nodes sit at 0 V
    for (node, members) in assembly.node_map.nodes() {
        let voltage = matrix.voltage(layout.node_index(node));
        snapshot.node_voltages.insert(*node, voltage);
        for pin in members {
            snapshot.pin_voltages.insert(*pin, voltage);
        }
    }

    for comp in assembly.graph.components() {
        let id = comp.id();
        let stamped = layout.components().binary_search(&id).is_ok();
        let current = if stamped {
            let voltages: Vec<f64> = comp
                .pin_names()
                .iter()
                .map(|p| snapshot.pin_voltage(&PinRef::new(id, p)))
                .collect();
            let branch = layout.branch_index(id).map(|i| matrix.x[i]);
            comp.current_through(&voltages, branch)
        } else {
            0.0
        };
        snapshot.component_currents.insert(id, current);

        // Current entering the component at each pin: a load takes it in at
        // its first pin, a source pushes it out of its first pin
        let entering = if comp.is_source() { -current } else { current };
        let pins = comp.pin_names();
        if let [first, second] = pins {
            snapshot.pin_currents.insert(PinRef::new(id, first), entering);
            snapshot.pin_currents.insert(PinRef::new(id, second), -entering);
        }

        if let Component::Led(d) = comp {
            snapshot.led_brightness.insert(id, d.brightness(current));
        }
    }

    snapshot
}

/// Translate a solver error into the fault reported for the tick.
fn numerical_fault(assembly: &Assembly<'_>, err: &BreadboardError) -> Fault {
    match err {
        BreadboardError::ConvergenceFailure { .. } => {
            let leds = assembly
                .stamped()
                .filter(|c| c.is_nonlinear())
                .map(|c| c.id())
                .collect();
            Fault::new(FaultKind::NonConvergent, leds)
        }
        BreadboardError::SingularMatrix { pivot: index } | BreadboardError::NonFiniteSolution { index } => {
            let mut components = assembly.layout.components_at(assembly.node_map, *index);
            if components.is_empty() {
                components = assembly.layout.components().to_vec();
            }
            Fault::new(FaultKind::Singular, components)
        }
        _ => Fault::new(FaultKind::Singular, assembly.layout.components().to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(sim: &mut Simulator, parts: &[(ComponentId, &'static str, &'static str)]) {
        for pair in parts.windows(2) {
            let (a, _, a_out) = pair[0];
            let (b, b_in, _) = pair[1];
            sim.add_connection((a, a_out), (b, b_in)).unwrap();
        }
        let (first, first_in, _) = parts[0];
        let (last, _, last_out) = parts[parts.len() - 1];
        sim.add_connection((last, last_out), (first, first_in)).unwrap();
    }

    #[test]
    fn test_resistor_current() {
        let mut sim = Simulator::default();
        let bat = sim.add_battery(5.0).unwrap();
        let r = sim.add_resistor(220.0).unwrap();
        series(&mut sim, &[(bat, "negative", "positive"), (r, "pin1", "pin2")]);

        let snap = sim.tick();
        assert_eq!(snap.tick, 1);
        assert_eq!(snap.iterations, 1);
        assert!(snap.faults.is_empty());
        assert!((snap.current(r) - 5.0 / 220.0).abs() < 1e-9);
        assert!((snap.current(bat) - 5.0 / 220.0).abs() < 1e-9);
        assert!((snap.pin_voltage(&PinRef::new(r, "pin1")) - 5.0).abs() < 1e-9);
        assert!(snap.pin_voltage(&PinRef::new(bat, "negative")).abs() < 1e-12);
    }

    #[test]
    fn test_led_circuit_converges() {
        let mut sim = Simulator::default();
        let bat = sim.add_battery(5.0).unwrap();
        let r = sim.add_resistor(220.0).unwrap();
        let led = sim.add_led(2.0).unwrap();
        series(
            &mut sim,
            &[(bat, "negative", "positive"), (r, "pin1", "pin2"), (led, "anode", "cathode")],
        );

        let snap = sim.tick();
        assert!(snap.faults.is_empty(), "{:?}", snap.faults);
        assert!(snap.iterations > 1 && snap.iterations <= DEFAULT_MAX_ITERATIONS);
        let expected = 3.0 / 221.0;
        assert!((snap.current(led) - expected).abs() < 1e-6);
        assert!((snap.current(r) - expected).abs() < 1e-6);
        assert!((snap.pin_voltage(&PinRef::new(led, "anode")) - (2.0 + expected)).abs() < 1e-6);
        assert!(snap.led_brightness[&led] > 0.6);

        // Warm start from the previous snapshot settles immediately
        let again = sim.tick();
        assert_eq!(again.iterations, 1);
    }

    #[test]
    fn test_pin_currents_balance() {
        let mut sim = Simulator::default();
        let bat = sim.add_battery(5.0).unwrap();
        let r = sim.add_resistor(100.0).unwrap();
        series(&mut sim, &[(bat, "negative", "positive"), (r, "pin1", "pin2")]);

        let snap = sim.tick();
        let into_r = snap.pin_currents[&PinRef::new(r, "pin1")];
        let into_bat = snap.pin_currents[&PinRef::new(bat, "positive")];
        assert!((into_r - 0.05).abs() < 1e-9);
        assert!((into_r + into_bat).abs() < 1e-9);
    }

    #[test]
    fn test_short_holds_previous_voltages() {
        let mut sim = Simulator::default();
        let bat = sim.add_battery(5.0).unwrap();
        let r = sim.add_resistor(220.0).unwrap();
        series(&mut sim, &[(bat, "negative", "positive"), (r, "pin1", "pin2")]);
        let good = sim.tick();
        let v_pos = good.pin_voltage(&PinRef::new(bat, "positive"));

        let err = sim.add_connection((bat, "positive"), (bat, "negative")).unwrap_err();
        assert_eq!(err, BreadboardError::SelfConnection { component: bat });

        // Tie both battery terminals together through the resistor's pins
        sim.add_connection((r, "pin2"), (bat, "positive")).unwrap();

        let snap = sim.tick();
        assert_eq!(snap.faults_of(FaultKind::Short).count(), 1);
        assert_eq!(snap.iterations, 0);
        assert_eq!(snap.current(r), 0.0);
        assert_eq!(snap.pin_voltage(&PinRef::new(bat, "positive")), v_pos);
        assert_eq!(snap.node_voltages, good.node_voltages);
    }

    #[test]
    fn test_parallel_batteries_are_singular() {
        let mut sim = Simulator::default();
        let b1 = sim.add_battery(5.0).unwrap();
        let b2 = sim.add_battery(3.0).unwrap();
        let r = sim.add_resistor(220.0).unwrap();
        sim.add_connection((b1, "positive"), (b2, "positive")).unwrap();
        sim.add_connection((b1, "negative"), (b2, "negative")).unwrap();
        sim.add_connection((b1, "positive"), (r, "pin1")).unwrap();
        sim.add_connection((r, "pin2"), (b1, "negative")).unwrap();

        let snap = sim.tick();
        let singular: Vec<&Fault> = snap.faults_of(FaultKind::Singular).collect();
        assert_eq!(singular.len(), 1);
        assert_eq!(singular[0].components, vec![b2]);
        assert!(snap.component_currents.values().all(|i| *i == 0.0));
    }

    #[test]
    fn test_nonconvergence_names_leds() {
        let config = SimulatorConfig::default().with_max_iterations(1);
        let mut sim = Simulator::with_config(CircuitGraph::new(), config);
        let bat = sim.add_battery(5.0).unwrap();
        let r = sim.add_resistor(220.0).unwrap();
        let led = sim.add_led(2.0).unwrap();
        series(
            &mut sim,
            &[(bat, "negative", "positive"), (r, "pin1", "pin2"), (led, "anode", "cathode")],
        );

        let snap = sim.tick();
        let fault = snap.faults_of(FaultKind::NonConvergent).next().unwrap();
        assert_eq!(fault.components, vec![led]);
        assert_eq!(snap.current(led), 0.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(SimulatorConfig::default().validate().is_ok());
        assert!(SimulatorConfig::default().with_tick_rate(0.0).validate().is_err());
        assert!(SimulatorConfig::default().with_tick_rate(1001.0).validate().is_err());
        assert!(SimulatorConfig::default().with_max_iterations(0).validate().is_err());
        assert!(SimulatorConfig::default().with_tolerance(f64::NAN).validate().is_err());

        let mut sim = Simulator::default();
        assert!(sim.set_config(SimulatorConfig::default().with_tolerance(-1.0)).is_err());
        sim.set_config(SimulatorConfig::default().with_tick_rate(60.0)).unwrap();
        assert_eq!(sim.config().tick_rate_hz, 60.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut sim = Simulator::default();
        let bat = sim.add_battery(5.0).unwrap();
        let r = sim.add_resistor(220.0).unwrap();
        series(&mut sim, &[(bat, "negative", "positive"), (r, "pin1", "pin2")]);
        sim.tick();
        sim.tick();
        sim.reset();
        assert_eq!(*sim.latest_snapshot(), Snapshot::default());
        assert_eq!(sim.tick().tick, 1);
        assert_eq!(sim.graph().component_count(), 2);
    }
}
