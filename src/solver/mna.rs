//! MNA matrix assembly and solving.

use std::collections::{BTreeMap, BTreeSet};

use crate::circuit::{CircuitGraph, ComponentId, NodeId, NodeMap, PinRef, Validation};
use crate::components::Component;
use crate::error::{BreadboardError, Result};

use super::MIN_CONDUCTANCE;

/// Pivot magnitude below which the matrix is treated as singular.
const PIVOT_EPSILON: f64 = 1e-15;

/// MNA matrix system Ax = z.
#[derive(Debug)]
pub struct MnaMatrix {
    /// System matrix A (row-major)
    pub a: Vec<f64>,
    /// Source vector z
    pub z: Vec<f64>,
    /// Solution vector x
    pub x: Vec<f64>,
    /// Matrix dimension
    pub size: usize,
    /// LU decomposition of A
    pub lu: Vec<f64>,
    /// Pivot indices for LU decomposition
    pub pivots: Vec<usize>,
}

impl MnaMatrix {
    /// Create a new MNA matrix of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            a: vec![0.0; size * size],
            z: vec![0.0; size],
            x: vec![0.0; size],
            size,
            lu: vec![0.0; size * size],
            pivots: vec![0; size],
        }
    }

    /// Clear the matrix and vectors to zero.
    pub fn clear(&mut self) {
        self.a.fill(0.0);
        self.z.fill(0.0);
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.a[row * self.size + col]
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] += value;
    }

    /// Add to source vector element.
    pub fn add_source(&mut self, row: usize, value: f64) {
        self.z[row] += value;
    }

    /// Stamp a conductance between two nodes.
    /// For a conductance G between nodes n1 and n2:
    ///   A[n1,n1] += G
    ///   A[n2,n2] += G
    ///   A[n1,n2] -= G
    ///   A[n2,n1] -= G
    pub fn stamp_conductance(&mut self, n1: Option<usize>, n2: Option<usize>, g: f64) {
        let g = g.max(MIN_CONDUCTANCE);
        if let Some(i) = n1 {
            self.add(i, i, g);
        }
        if let Some(j) = n2 {
            self.add(j, j, g);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add(i, j, -g);
            self.add(j, i, -g);
        }
    }

    /// Stamp a voltage source between two nodes with branch current at index br.
    /// V[n+] - V[n-] = E
    pub fn stamp_voltage_source(
        &mut self,
        n_pos: Option<usize>,
        n_neg: Option<usize>,
        br: usize,
        voltage: f64,
    ) {
        if let Some(i) = n_pos {
            self.add(br, i, 1.0);
            self.add(i, br, 1.0);
        }
        if let Some(j) = n_neg {
            self.add(br, j, -1.0);
            self.add(j, br, -1.0);
        }
        self.z[br] = voltage;
    }

    /// Stamp a current source between two nodes.
    /// Current flows from n+ to n- through the source's branch.
    pub fn stamp_current_source(&mut self, n_pos: Option<usize>, n_neg: Option<usize>, current: f64) {
        if let Some(i) = n_pos {
            self.add_source(i, -current);
        }
        if let Some(j) = n_neg {
            self.add_source(j, current);
        }
    }

    /// Perform LU decomposition with partial pivoting.
    ///
    /// On failure the error names the column (unknown) with no usable pivot.
    pub fn factor(&mut self) -> Result<()> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);

        for i in 0..n {
            self.pivots[i] = i;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].abs();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val < PIVOT_EPSILON || !max_val.is_finite() {
                return Err(BreadboardError::SingularMatrix { pivot: k });
            }

            // Swap rows if needed
            if max_row != k {
                self.pivots.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= factor * self.lu[k * n + j];
                }
            }
        }

        Ok(())
    }

    /// Solve the system using the pre-computed LU decomposition.
    pub fn solve(&mut self) -> Result<()> {
        let n = self.size;

        // Apply pivot permutation to z
        for i in 0..n {
            self.x[i] = self.z[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
            let diag = self.lu[i * n + i];
            if diag.abs() < PIVOT_EPSILON {
                return Err(BreadboardError::SingularMatrix { pivot: i });
            }
            self.x[i] /= diag;
        }

        if let Some(index) = self.x.iter().position(|v| !v.is_finite()) {
            return Err(BreadboardError::NonFiniteSolution { index });
        }

        Ok(())
    }

    /// Get the value of an unknown, or 0 for a reference node.
    pub fn voltage(&self, node: Option<usize>) -> f64 {
        match node {
            Some(i) => self.x[i],
            None => 0.0,
        }
    }
}

/// What a row/column of the MNA system stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unknown {
    /// Node voltage variable
    Voltage(NodeId),
    /// Branch current variable of a voltage source
    Current(ComponentId),
}

/// Mapping between the circuit and the unknowns of its MNA system.
///
/// Node voltages come first (anchors and inactive nodes excluded), then one
/// branch current per stamped source.
#[derive(Debug, Clone, Default)]
pub struct SystemLayout {
    node_index: BTreeMap<NodeId, usize>,
    references: BTreeSet<NodeId>,
    branch_index: BTreeMap<ComponentId, usize>,
    unknowns: Vec<Unknown>,
    /// Stamped components, in creation order
    components: Vec<ComponentId>,
}

impl SystemLayout {
    /// Lay out the unknowns for the islands of a (non-fatal) validation.
    pub fn new(graph: &CircuitGraph, validation: &Validation) -> Self {
        let mut layout = Self::default();

        for island in &validation.islands {
            layout.references.insert(island.anchor);
            for node in island.nodes.iter().filter(|n| **n != island.anchor) {
                layout.node_index.insert(*node, layout.unknowns.len());
                layout.unknowns.push(Unknown::Voltage(*node));
            }
        }

        layout.components = graph
            .components()
            .map(|c| c.id())
            .filter(|id| validation.is_stamped(*id))
            .collect();

        for comp in graph.components().filter(|c| c.is_source() && validation.is_stamped(c.id())) {
            layout.branch_index.insert(comp.id(), layout.unknowns.len());
            layout.unknowns.push(Unknown::Current(comp.id()));
        }

        layout
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.unknowns.len()
    }

    /// Number of node-voltage unknowns (they occupy the first rows).
    pub fn node_unknowns(&self) -> usize {
        self.node_index.len()
    }

    /// Matrix index of a node voltage; `None` for references and inactive
    /// nodes.
    pub fn node_index(&self, node: &NodeId) -> Option<usize> {
        self.node_index.get(node).copied()
    }

    /// Matrix index of a pin's node voltage.
    pub fn pin_index(&self, node_map: &NodeMap, pin: &PinRef) -> Option<usize> {
        node_map.node_of(pin).and_then(|n| self.node_index(&n))
    }

    /// Matrix index of a source's branch current.
    pub fn branch_index(&self, component: ComponentId) -> Option<usize> {
        self.branch_index.get(&component).copied()
    }

    /// Check whether a node is held at 0 V as an island reference.
    pub fn is_reference(&self, node: &NodeId) -> bool {
        self.references.contains(node)
    }

    /// What the unknown at `index` stands for.
    pub fn unknown(&self, index: usize) -> Option<Unknown> {
        self.unknowns.get(index).copied()
    }

    /// Components stamped into the system.
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Stamped components attached to an unknown, for fault reports.
    pub fn components_at(&self, node_map: &NodeMap, index: usize) -> Vec<ComponentId> {
        match self.unknown(index) {
            Some(Unknown::Current(id)) => vec![id],
            Some(Unknown::Voltage(node)) => {
                let mut ids: Vec<ComponentId> = node_map
                    .members(&node)
                    .iter()
                    .map(|p| p.component)
                    .filter(|id| self.components.binary_search(id).is_ok())
                    .collect();
                ids.dedup();
                ids
            }
            None => Vec::new(),
        }
    }

    /// Warm-start vector taken from previously solved node voltages.
    pub fn initial_guess(&self, previous: &BTreeMap<NodeId, f64>) -> Vec<f64> {
        self.unknowns
            .iter()
            .map(|u| match u {
                Unknown::Voltage(node) => previous.get(node).copied().unwrap_or(0.0),
                Unknown::Current(_) => 0.0,
            })
            .collect()
    }

    /// Matrix indices of a component's pins, in declaration order.
    pub fn pin_indices(&self, node_map: &NodeMap, comp: &Component) -> Vec<Option<usize>> {
        comp.pin_names()
            .iter()
            .map(|p| self.pin_index(node_map, &PinRef::new(comp.id(), p)))
            .collect()
    }
}

/// Everything needed to stamp a circuit into a matrix.
#[derive(Debug, Clone, Copy)]
pub struct Assembly<'a> {
    pub graph: &'a CircuitGraph,
    pub node_map: &'a NodeMap,
    pub layout: &'a SystemLayout,
}

impl<'a> Assembly<'a> {
    /// Stamped components, in creation order.
    pub fn stamped(&self) -> impl Iterator<Item = &'a Component> + 'a {
        let graph = self.graph;
        let layout = self.layout;
        layout
            .components()
            .iter()
            .filter_map(move |id| graph.component(*id))
    }

    /// Check whether any stamped component needs iteration.
    pub fn has_nonlinear(&self) -> bool {
        self.stamped().any(|c| c.is_nonlinear())
    }
}

/// Stamp all linear components into the MNA matrix, plus a minimum
/// conductance from every node unknown to its reference.
pub fn stamp_linear_components(assembly: &Assembly<'_>, matrix: &mut MnaMatrix) {
    for i in 0..assembly.layout.node_unknowns() {
        matrix.add(i, i, MIN_CONDUCTANCE);
    }

    for component in assembly.stamped() {
        let pins = assembly.layout.pin_indices(assembly.node_map, component);
        match component {
            Component::Resistor(r) => {
                matrix.stamp_conductance(pins[0], pins[1], r.conductance());
            }

            Component::Battery(b) => {
                if let Some(br) = assembly.layout.branch_index(b.id) {
                    matrix.stamp_voltage_source(pins[0], pins[1], br, b.voltage);
                }
            }

            // Nonlinear components handled separately
            Component::Led(_) => {}
        }
    }
}
