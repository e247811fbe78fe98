//! Circuit graph representation and validation.
//!
//! This module provides the editable representation of a circuit. The
//! [`CircuitGraph`] holds all components and pin-to-pin connections; the
//! [`NodeMap`] groups connected pins into electrical nodes, and
//! [`validate_circuit`] decides, tick by tick, what can be solved.

mod graph;
mod nodes;
mod types;
mod union_find;
mod validate;

pub use graph::CircuitGraph;
pub use nodes::{NodeMap, NodeResolver};
pub use types::*;
pub use validate::{validate_circuit, Island, Validation};
