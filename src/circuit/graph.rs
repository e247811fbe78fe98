//! Circuit graph structure.
//!
//! Components and connections live in flat id-indexed stores. Connections
//! refer to pins by `(ComponentId, pin name)`, so deleting a component is a
//! matter of dropping it and the wires that name it.

use std::collections::BTreeMap;

use tracing::debug;

use super::types::{ComponentId, Connection, ConnectionId, PinRef};
use crate::components::{Component, ComponentKind, LedParams};
use crate::error::{BreadboardError, Result};

/// An editable circuit: the single source of truth for topology.
#[derive(Debug, Clone, Default)]
pub struct CircuitGraph {
    /// All placed components, keyed (and therefore ordered) by id
    components: BTreeMap<ComponentId, Component>,

    /// All wires, keyed by id
    connections: BTreeMap<ConnectionId, Connection>,

    next_component: u32,
    next_connection: u32,

    /// Bumped on every topology change; derived node maps are keyed by it
    revision: u64,
}

impl CircuitGraph {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Topology revision. Changes whenever a component or connection is
    /// added or removed; parameter edits leave it untouched.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Place a component of the given kind, overriding default parameters.
    pub fn add_component(&mut self, kind: ComponentKind, params: &[(&str, f64)]) -> Result<ComponentId> {
        let id = ComponentId(self.next_component);
        let component = Component::from_params(id, kind, params)?;
        self.next_component += 1;
        self.components.insert(id, component);
        self.revision += 1;
        debug!(%id, %kind, "component added");
        Ok(id)
    }

    /// Place a battery with the given voltage.
    pub fn add_battery(&mut self, voltage: f64) -> Result<ComponentId> {
        self.add_component(ComponentKind::Battery, &[("voltage", voltage)])
    }

    /// Place a resistor with the given resistance.
    pub fn add_resistor(&mut self, resistance: f64) -> Result<ComponentId> {
        self.add_component(ComponentKind::Resistor, &[("resistance", resistance)])
    }

    /// Place an LED with the given forward voltage and default remaining
    /// parameters.
    pub fn add_led(&mut self, forward_voltage: f64) -> Result<ComponentId> {
        let defaults = LedParams::default();
        self.add_component(
            ComponentKind::Led,
            &[
                ("forward_voltage", forward_voltage),
                ("on_resistance", defaults.on_resistance),
                ("max_current", defaults.max_current),
            ],
        )
    }

    /// Delete a component and every connection touching it.
    pub fn remove_component(&mut self, id: ComponentId) -> Result<Component> {
        let component = self
            .components
            .remove(&id)
            .ok_or(BreadboardError::ComponentNotFound { id })?;
        let before = self.connections.len();
        self.connections.retain(|_, conn| !conn.touches(id));
        self.revision += 1;
        debug!(%id, dropped_connections = before - self.connections.len(), "component removed");
        Ok(component)
    }

    /// Change a parameter of a placed component.
    pub fn set_parameter(&mut self, id: ComponentId, name: &str, value: f64) -> Result<()> {
        self.components
            .get_mut(&id)
            .ok_or(BreadboardError::ComponentNotFound { id })?
            .set_parameter(name, value)
    }

    /// Resolve `(component, pin name)` to a pin of this circuit.
    pub fn pin(&self, component: ComponentId, name: &str) -> Result<PinRef> {
        let comp = self
            .components
            .get(&component)
            .ok_or(BreadboardError::ComponentNotFound { id: component })?;
        let pin = comp.find_pin(name).ok_or_else(|| BreadboardError::PinNotFound {
            component,
            pin: name.to_string(),
        })?;
        Ok(PinRef::new(component, pin))
    }

    /// Wire two pins together.
    ///
    /// Both pins must exist and sit on different components. A pin may take
    /// part in any number of connections.
    pub fn add_connection(
        &mut self,
        from: (ComponentId, &str),
        to: (ComponentId, &str),
    ) -> Result<ConnectionId> {
        let from = self.pin(from.0, from.1)?;
        let to = self.pin(to.0, to.1)?;
        if from.component == to.component {
            return Err(BreadboardError::SelfConnection {
                component: from.component,
            });
        }

        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.connections.insert(id, Connection { id, from, to });
        self.revision += 1;
        debug!(%id, %from, %to, "connection added");
        Ok(id)
    }

    /// Delete a wire.
    pub fn remove_connection(&mut self, id: ConnectionId) -> Result<Connection> {
        let conn = self
            .connections
            .remove(&id)
            .ok_or(BreadboardError::ConnectionNotFound { id })?;
        self.revision += 1;
        debug!(%id, "connection removed");
        Ok(conn)
    }

    /// All connections touching a component.
    pub fn connections_for_component(&self, id: ComponentId) -> Result<Vec<&Connection>> {
        if !self.components.contains_key(&id) {
            return Err(BreadboardError::ComponentNotFound { id });
        }
        Ok(self.connections.values().filter(|c| c.touches(id)).collect())
    }

    /// Get a component by id.
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Get a connection by id.
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// All components in creation order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// All connections in creation order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Every pin of every component, in (component, pin name) order.
    pub fn pins(&self) -> Vec<PinRef> {
        let mut pins: Vec<PinRef> = self
            .components
            .values()
            .flat_map(|c| c.pin_names().iter().map(move |p| PinRef::new(c.id(), p)))
            .collect();
        pins.sort();
        pins
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
