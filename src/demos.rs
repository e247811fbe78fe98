//! Ready-made circuits.
//!
//! Used by the command-line tool and handy as fixtures: each one is a
//! small breadboard layout exercising one behavior of the engine.

use crate::circuit::CircuitGraph;
use crate::error::Result;

/// A bundled demo circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Demo {
    /// 5 V battery, 220 Ω resistor and a red LED in series
    BatteryLed,
    /// 5 V battery across a 220 Ω resistor
    ResistorOnly,
    /// Battery terminals wired together through a resistor's pins
    ShortCircuit,
    /// Battery and resistor loop plus a resistor hanging off one pin
    FloatingResistor,
    /// Two independent battery/resistor loops
    TwoCircuits,
}

impl Demo {
    pub const ALL: [Demo; 5] = [
        Demo::BatteryLed,
        Demo::ResistorOnly,
        Demo::ShortCircuit,
        Demo::FloatingResistor,
        Demo::TwoCircuits,
    ];

    /// Build the circuit.
    pub fn build(&self) -> Result<CircuitGraph> {
        match self {
            Demo::BatteryLed => battery_led(),
            Demo::ResistorOnly => resistor_only(),
            Demo::ShortCircuit => short_circuit(),
            Demo::FloatingResistor => floating_resistor(),
            Demo::TwoCircuits => two_circuits(),
        }
    }
}

/// Battery(+) → resistor → LED → battery(-).
pub fn battery_led() -> Result<CircuitGraph> {
    let mut graph = CircuitGraph::new();
    let battery = graph.add_battery(5.0)?;
    let resistor = graph.add_resistor(220.0)?;
    let led = graph.add_led(2.0)?;

    graph.add_connection((battery, "positive"), (resistor, "pin1"))?;
    graph.add_connection((resistor, "pin2"), (led, "anode"))?;
    graph.add_connection((led, "cathode"), (battery, "negative"))?;
    Ok(graph)
}

pub fn resistor_only() -> Result<CircuitGraph> {
    let mut graph = CircuitGraph::new();
    let battery = graph.add_battery(5.0)?;
    let resistor = graph.add_resistor(220.0)?;

    graph.add_connection((battery, "positive"), (resistor, "pin1"))?;
    graph.add_connection((resistor, "pin2"), (battery, "negative"))?;
    Ok(graph)
}

pub fn short_circuit() -> Result<CircuitGraph> {
    let mut graph = CircuitGraph::new();
    let battery = graph.add_battery(5.0)?;
    let resistor = graph.add_resistor(220.0)?;

    graph.add_connection((battery, "positive"), (resistor, "pin1"))?;
    graph.add_connection((resistor, "pin1"), (battery, "negative"))?;
    graph.add_connection((resistor, "pin2"), (battery, "negative"))?;
    Ok(graph)
}

pub fn floating_resistor() -> Result<CircuitGraph> {
    let mut graph = CircuitGraph::new();
    let battery = graph.add_battery(5.0)?;
    let resistor = graph.add_resistor(220.0)?;
    let stray = graph.add_resistor(1000.0)?;

    graph.add_connection((battery, "positive"), (resistor, "pin1"))?;
    graph.add_connection((resistor, "pin2"), (battery, "negative"))?;
    graph.add_connection((stray, "pin1"), (battery, "positive"))?;
    Ok(graph)
}

pub fn two_circuits() -> Result<CircuitGraph> {
    let mut graph = resistor_only()?;
    let battery = graph.add_battery(3.0)?;
    let resistor = graph.add_resistor(100.0)?;

    graph.add_connection((battery, "positive"), (resistor, "pin1"))?;
    graph.add_connection((resistor, "pin2"), (battery, "negative"))?;
    Ok(graph)
}
