//! WASM bindings for Breadboard Core.
//!
//! This module provides JavaScript-friendly bindings for driving the engine
//! from a browser canvas. Browsers have no threads to spare for the
//! simulation loop, so the page calls `tick()` from its own timer.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmCircuitSim } from 'breadboard_core';
//!
//! await init();
//!
//! const sim = new WasmCircuitSim();
//! const bat = sim.add_battery(5.0);
//! const r = sim.add_resistor(220.0);
//! const led = sim.add_led(2.0);
//! sim.connect(bat, "positive", r, "pin1");
//! sim.connect(r, "pin2", led, "anode");
//! sim.connect(led, "cathode", bat, "negative");
//!
//! setInterval(() => {
//!   sim.tick();
//!   glow(led, sim.led_brightness(led));
//! }, 1000 / sim.tick_rate);
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::{ComponentId, ConnectionId};
use crate::components::ComponentKind;
use crate::error::BreadboardError;
use crate::snapshot::PinLevel;
use crate::solver::{Simulator, SimulatorConfig};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn js_err(e: BreadboardError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-compatible circuit simulator.
///
/// Components and connections are addressed by their numeric ids.
#[wasm_bindgen]
pub struct WasmCircuitSim {
    simulator: Simulator,
}

impl Default for WasmCircuitSim {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmCircuitSim {
    /// Create an empty workbench.
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmCircuitSim {
        WasmCircuitSim {
            simulator: Simulator::default(),
        }
    }

    /// Create an empty workbench with custom solver settings.
    ///
    /// # Arguments
    /// * `max_iterations` - Maximum Newton iterations per tick (default: 50)
    /// * `tolerance` - Convergence tolerance in volts (default: 1e-6)
    #[wasm_bindgen]
    pub fn with_config(max_iterations: usize, tolerance: f64) -> Result<WasmCircuitSim, JsValue> {
        let config = SimulatorConfig::new()
            .with_max_iterations(max_iterations)
            .with_tolerance(tolerance);
        config.validate().map_err(js_err)?;
        Ok(WasmCircuitSim {
            simulator: Simulator::with_config(Default::default(), config),
        })
    }

    /// Place a component by kind name ("battery", "resistor" or "led")
    /// with default parameters.
    #[wasm_bindgen]
    pub fn add_component(&mut self, kind: &str) -> Result<u32, JsValue> {
        let kind = ComponentKind::parse(kind).ok_or_else(|| {
            js_err(BreadboardError::WasmError {
                message: format!("unknown component kind '{kind}'"),
            })
        })?;
        self.simulator.add_component(kind, &[]).map(|id| id.0).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn add_battery(&mut self, voltage: f64) -> Result<u32, JsValue> {
        self.simulator.add_battery(voltage).map(|id| id.0).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn add_resistor(&mut self, resistance: f64) -> Result<u32, JsValue> {
        self.simulator.add_resistor(resistance).map(|id| id.0).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn add_led(&mut self, forward_voltage: f64) -> Result<u32, JsValue> {
        self.simulator.add_led(forward_voltage).map(|id| id.0).map_err(js_err)
    }

    /// Remove a component together with its wires.
    #[wasm_bindgen]
    pub fn remove_component(&mut self, id: u32) -> Result<(), JsValue> {
        self.simulator
            .remove_component(ComponentId(id))
            .map(|_| ())
            .map_err(js_err)
    }

    /// Wire two pins; returns the connection id.
    #[wasm_bindgen]
    pub fn connect(&mut self, from: u32, from_pin: &str, to: u32, to_pin: &str) -> Result<u32, JsValue> {
        self.simulator
            .add_connection((ComponentId(from), from_pin), (ComponentId(to), to_pin))
            .map(|id| id.0)
            .map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn disconnect(&mut self, connection: u32) -> Result<(), JsValue> {
        self.simulator
            .remove_connection(ConnectionId(connection))
            .map(|_| ())
            .map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn set_parameter(&mut self, id: u32, name: &str, value: f64) -> Result<(), JsValue> {
        self.simulator
            .set_parameter(ComponentId(id), name, value)
            .map_err(js_err)
    }

    /// Run one simulation step. Returns the tick number.
    #[wasm_bindgen]
    pub fn tick(&mut self) -> u64 {
        self.simulator.tick().tick
    }

    /// Forget solved state, keeping the circuit.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.simulator.reset();
    }

    /// Suggested calls to `tick()` per second.
    #[wasm_bindgen(getter)]
    pub fn tick_rate(&self) -> f64 {
        self.simulator.config().tick_rate_hz
    }

    /// Voltage at a pin in the latest snapshot, or `undefined` if the pin
    /// doesn't exist.
    #[wasm_bindgen]
    pub fn pin_voltage(&self, id: u32, pin: &str) -> Option<f64> {
        let pin = self.simulator.graph().pin(ComponentId(id), pin).ok()?;
        Some(self.simulator.latest_snapshot().pin_voltage(&pin))
    }

    /// Colour class of a pin: "high", "mid" or "low".
    #[wasm_bindgen]
    pub fn pin_level(&self, id: u32, pin: &str) -> Option<String> {
        let level = PinLevel::from_voltage(self.pin_voltage(id, pin)?);
        let name = match level {
            PinLevel::High => "high",
            PinLevel::Mid => "mid",
            PinLevel::Low => "low",
        };
        Some(name.to_string())
    }

    /// Current through a component in the latest snapshot.
    #[wasm_bindgen]
    pub fn component_current(&self, id: u32) -> f64 {
        self.simulator.latest_snapshot().current(ComponentId(id))
    }

    /// Wire glow level in [0, 1], or `undefined` if the wire doesn't exist.
    #[wasm_bindgen]
    pub fn wire_intensity(&self, id: u32) -> Option<f64> {
        let wire = self.simulator.graph().connection(ConnectionId(id))?;
        Some(self.simulator.latest_snapshot().wire_intensity(wire))
    }

    /// LED glow level in [0, 1].
    #[wasm_bindgen]
    pub fn led_brightness(&self, id: u32) -> f64 {
        self.simulator
            .latest_snapshot()
            .led_brightness
            .get(&ComponentId(id))
            .copied()
            .unwrap_or(0.0)
    }

    #[wasm_bindgen]
    pub fn fault_count(&self) -> usize {
        self.simulator.latest_snapshot().faults.len()
    }

    /// Faults of the latest snapshot, one per line.
    #[wasm_bindgen]
    pub fn faults(&self) -> String {
        self.simulator
            .latest_snapshot()
            .faults
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
