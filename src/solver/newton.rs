//! Newton iteration for nonlinear components.

use tracing::debug;

use super::mna::{stamp_linear_components, Assembly, MnaMatrix};
use super::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
use crate::components::Component;
use crate::error::{BreadboardError, Result};

/// Newton solver for circuits with nonlinear components.
#[derive(Debug, Clone)]
pub struct NewtonRaphson {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Convergence tolerance on node voltages (volts)
    pub tolerance: f64,
    /// Previous iterate for the convergence check
    x_prev: Vec<f64>,
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self::new()
    }
}

impl NewtonRaphson {
    /// Create a new solver with default settings.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE)
    }

    /// Create a new solver with custom settings.
    pub fn with_config(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            tolerance,
            x_prev: Vec::new(),
        }
    }

    /// Assemble and solve the circuit, iterating while nonlinear components
    /// are present.
    ///
    /// `initial` seeds the operating point of the nonlinear components.
    /// Returns the number of iterations used.
    pub fn solve(&mut self, assembly: &Assembly<'_>, matrix: &mut MnaMatrix, initial: &[f64]) -> Result<usize> {
        if !assembly.has_nonlinear() {
            // Purely linear circuit - solve directly
            matrix.clear();
            stamp_linear_components(assembly, matrix);
            matrix.factor()?;
            matrix.solve()?;
            return Ok(1);
        }

        self.x_prev.clear();
        self.x_prev.extend_from_slice(initial);
        self.x_prev.resize(matrix.size, 0.0);

        let node_unknowns = assembly.layout.node_unknowns();
        let mut max_diff = f64::INFINITY;

        for iter in 0..self.max_iterations {
            let _span = tracing::debug_span!("newton_iter", iter).entered();

            // Clear and rebuild matrix
            matrix.clear();
            stamp_linear_components(assembly, matrix);
            self.stamp_nonlinear_components(assembly, matrix);

            matrix.factor()?;
            matrix.solve()?;

            // Check convergence on node voltages
            max_diff = matrix.x[..node_unknowns]
                .iter()
                .zip(&self.x_prev[..node_unknowns])
                .map(|(new, old)| (new - old).abs())
                .fold(0.0, f64::max);
            if max_diff < self.tolerance {
                debug!(iterations = iter + 1, "newton converged");
                return Ok(iter + 1);
            }

            // Save current solution for next iteration
            self.x_prev.copy_from_slice(&matrix.x);
        }

        Err(BreadboardError::convergence_failure(self.max_iterations, max_diff))
    }

    /// Stamp nonlinear components, linearized around the previous iterate.
    fn stamp_nonlinear_components(&self, assembly: &Assembly<'_>, matrix: &mut MnaMatrix) {
        let voltage = |idx: Option<usize>| idx.map(|i| self.x_prev[i]).unwrap_or(0.0);

        for component in assembly.stamped() {
            match component {
                Component::Led(d) => {
                    let pins = assembly.layout.pin_indices(assembly.node_map, component);
                    let (n_anode, n_cathode) = (pins[0], pins[1]);

                    // Voltage across the LED from the previous iterate
                    let v_d = voltage(n_anode) - voltage(n_cathode);
                    let (g, i_eq) = d.linearize(v_d);

                    // Stamp as conductance + current source
                    matrix.stamp_conductance(n_anode, n_cathode, g);
                    matrix.stamp_current_source(n_anode, n_cathode, i_eq);
                }

                // Linear components already handled
                Component::Battery(_) | Component::Resistor(_) => {}
            }
        }
    }
}
