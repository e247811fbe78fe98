//! Core types for circuit representation.

use std::fmt;

/// A unique identifier for a placed component.
///
/// Ids are allocated in increasing order and never reused, so ordering by id
/// is creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// A unique identifier for a wire between two pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}", self.0)
    }
}

/// A pin, identified by its owning component and its name.
///
/// Pin names are the static names published by the component kind, so a
/// `PinRef` is `Copy` and cheap to use as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinRef {
    pub component: ComponentId,
    pub pin: &'static str,
}

impl PinRef {
    pub fn new(component: ComponentId, pin: &'static str) -> Self {
        Self { component, pin }
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.pin)
    }
}

/// An electrical node.
///
/// A node is named after the smallest pin it contains, which keeps node
/// identity stable for as long as the topology around it is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub PinRef);

impl NodeId {
    /// The pin this node is named after.
    pub fn representative(&self) -> PinRef {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N({})", self.0)
    }
}

/// A wire between two pins on distinct components.
///
/// `from`/`to` record the direction the wire was drawn in; electrically the
/// connection is unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: PinRef,
    pub to: PinRef,
}

impl Connection {
    /// Check whether either end of the wire is on the given component.
    pub fn touches(&self, component: ComponentId) -> bool {
        self.from.component == component || self.to.component == component
    }

    /// The pin at the opposite end from `component`, if the wire touches it.
    pub fn other_end(&self, component: ComponentId) -> Option<PinRef> {
        if self.from.component == component {
            Some(self.to)
        } else if self.to.component == component {
            Some(self.from)
        } else {
            None
        }
    }
}
