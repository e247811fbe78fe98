//! Error types for the Breadboard simulation engine.
//!
//! This module provides a unified error type [`BreadboardError`] covering
//! contract violations on the circuit graph, numerical failures inside the
//! solver, and invalid simulation-loop settings.
//!
//! Numerical errors never escape a simulation tick: the simulator converts
//! them into [`Fault`](crate::snapshot::Fault) records on the published
//! snapshot. Graph errors are returned synchronously to the caller that
//! attempted the mutation.

use thiserror::Error;

use crate::circuit::{ComponentId, ConnectionId};

/// Result type alias using [`BreadboardError`].
pub type Result<T> = std::result::Result<T, BreadboardError>;

/// Unified error type for all Breadboard operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BreadboardError {
    // ============ Circuit Graph Errors ============
    /// Component id is not (or no longer) part of the circuit
    #[error("Component {id} not found in circuit")]
    ComponentNotFound { id: ComponentId },

    /// Connection id is not (or no longer) part of the circuit
    #[error("Connection {id} not found in circuit")]
    ConnectionNotFound { id: ConnectionId },

    /// Pin name does not exist on the component
    #[error("Component {component} has no pin named '{pin}'")]
    PinNotFound { component: ComponentId, pin: String },

    /// Both ends of a connection are on the same component
    #[error("Cannot connect component {component} to itself")]
    SelfConnection { component: ComponentId },

    /// Parameter value is out of range for the component
    #[error("Invalid parameter '{param}' for {kind}: {message}")]
    InvalidParameter {
        kind: &'static str,
        param: String,
        message: String,
    },

    /// Parameter name is not understood by the component
    #[error("Unknown parameter '{param}' for {kind}")]
    UnknownParameter { kind: &'static str, param: String },

    // ============ Simulation Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular matrix at unknown {pivot} - circuit may contain parallel sources or an unanchored node")]
    SingularMatrix { pivot: usize },

    /// Iteration for nonlinear components did not converge
    #[error("Nonlinear iteration did not converge after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailure { iterations: usize, residual: f64 },

    /// Solution vector contains NaN or infinite values
    #[error("Solver produced a non-finite value at unknown {index}")]
    NonFiniteSolution { index: usize },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    /// The simulation thread could not be spawned
    #[error("Failed to start simulation loop: {message}")]
    LoopStart { message: String },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl BreadboardError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(
        kind: &'static str,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            kind,
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a convergence failure error
    pub fn convergence_failure(iterations: usize, residual: f64) -> Self {
        Self::ConvergenceFailure {
            iterations,
            residual,
        }
    }

    /// Create an invalid simulation parameter error
    pub fn invalid_simulation_param(message: impl Into<String>) -> Self {
        Self::InvalidSimulationParam {
            message: message.into(),
        }
    }
}
