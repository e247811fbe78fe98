//! # Breadboard Core
//!
//! A real-time circuit simulation engine for an interactive electronics
//! workbench.
//!
//! This library provides:
//! - An editable circuit graph of placed components and pin-to-pin wires
//! - Node resolution (which pins are electrically the same point)
//! - Topology checks for floating parts, shorted sources and missing ground
//! - Modified Nodal Analysis (MNA) based DC solving, with Newton iteration
//!   for LEDs
//! - A timer-driven simulation loop publishing immutable snapshots
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`components`] - Component models (battery, resistor, LED)
//! - [`circuit`] - Circuit graph, node resolution and validation
//! - [`solver`] - MNA matrix assembly and numerical solving
//! - [`runtime`] - The simulation loop
//! - [`snapshot`] - Published results and fault records
//! - [`trace`] - Console connection trace
//! - [`demos`] - Bundled demo circuits
//!
//! ## Usage
//!
//! ### Native
//!
//! ```no_run
//! use breadboard_core::{demos, SimulationLoop, Simulator};
//!
//! let graph = demos::battery_led()?;
//! let mut sim_loop = SimulationLoop::new(Simulator::new(graph));
//! let snapshots = sim_loop.subscribe();
//! sim_loop.start()?;
//! for snapshot in snapshots.iter().take(20) {
//!     println!("tick {}: {} fault(s)", snapshot.tick, snapshot.faults.len());
//! }
//! sim_loop.stop();
//! # Ok::<(), breadboard_core::BreadboardError>(())
//! ```
//!
//! ### CLI
//!
//! ```bash
//! breadboard run battery-led --ticks 5
//! breadboard trace battery-led
//! ```
//!
//! ## Circuit Simulation Method
//!
//! Each tick is a DC operating-point solve of the current circuit:
//!
//! 1. Group connected pins into nodes and pick the ground node
//! 2. Validate the topology; floating parts are left open, shorts skip the solve
//! 3. Assemble the system matrix A and source vector z
//! 4. Solve Ax = z for node voltages and battery currents
//! 5. With LEDs present, re-linearize and repeat until the voltages settle

pub mod circuit;
pub mod components;
pub mod demos;
pub mod error;
pub mod runtime;
pub mod snapshot;
pub mod solver;
pub mod trace;

// Re-export main types for convenience
pub use circuit::{CircuitGraph, ComponentId, ConnectionId, NodeId, PinRef};
pub use components::{Component, ComponentKind};
pub use error::{BreadboardError, Result};
pub use runtime::SimulationLoop;
pub use snapshot::{Fault, FaultKind, PinLevel, Snapshot};
pub use solver::{Simulator, SimulatorConfig};
pub use trace::ConnectionTrace;

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmCircuitSim;
