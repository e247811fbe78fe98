//! MNA (Modified Nodal Analysis) solver.
//!
//! This module provides the numerical engine for circuit simulation.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node voltages and source branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C connect voltage sources to nodes
//! - D is 0 for ideal voltage sources
//! - v is the vector of node voltages
//! - j is the vector of voltage source currents
//! - i is the sum of current sources into each node
//! - e is the vector of voltage source values
//!
//! Each disconnected sub-circuit is solved against its own reference node;
//! the circuit-wide ground is the reference of the sub-circuit containing it.

pub mod mna;
mod newton;
mod simulator;

pub use mna::{Assembly, MnaMatrix, SystemLayout, Unknown};
pub use newton::NewtonRaphson;
pub use simulator::{Simulator, SimulatorConfig};
pub(crate) use simulator::check_tick_rate;

/// Convergence tolerance for nonlinear iteration (volts).
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Maximum nonlinear iterations per tick.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Default simulation rate (ticks per second).
pub const DEFAULT_TICK_RATE_HZ: f64 = 20.0;

/// Highest accepted simulation rate (ticks per second).
pub const MAX_TICK_RATE_HZ: f64 = 1000.0;

/// Minimum conductance to prevent singular matrix.
pub const MIN_CONDUCTANCE: f64 = 1e-12;
