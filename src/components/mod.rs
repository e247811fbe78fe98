//! Component models for circuit simulation.
//!
//! This module provides models for all supported circuit components:
//! - Linear: Resistor
//! - Sources: Battery (ideal voltage source)
//! - Nonlinear: LED (piecewise-linear diode)
//!
//! Every component exposes the same capabilities: its pin names, its
//! contribution to the MNA matrix (see [`crate::solver::mna`]) and the
//! current through it once node voltages are known. Dispatch is an
//! exhaustive match over [`Component`], so adding a variant forces every
//! stage of the solver to handle it.

mod diode;
mod linear;
mod sources;

pub use diode::{Led, LedParams, LIT_THRESHOLD};
pub use linear::{Resistor, DEFAULT_RESISTANCE, MIN_RESISTANCE};
pub use sources::{Battery, DEFAULT_VOLTAGE};

use std::fmt;

use crate::circuit::ComponentId;
use crate::error::Result;

/// Type tag of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Battery,
    Resistor,
    Led,
}

impl ComponentKind {
    /// Lowercase name used in errors and traces.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Battery => "battery",
            ComponentKind::Resistor => "resistor",
            ComponentKind::Led => "led",
        }
    }

    /// Pin names of this kind, in declaration order.
    pub fn pin_names(&self) -> &'static [&'static str] {
        match self {
            ComponentKind::Battery => &Battery::PINS,
            ComponentKind::Resistor => &Resistor::PINS,
            ComponentKind::Led => &Led::PINS,
        }
    }

    /// Parse a kind from its name (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "battery" | "source" | "v" => Some(ComponentKind::Battery),
            "resistor" | "r" => Some(ComponentKind::Resistor),
            "led" | "diode" | "d" => Some(ComponentKind::Led),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A circuit component.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Battery(Battery),
    Resistor(Resistor),
    Led(Led),
}

impl Component {
    /// Create a component of the given kind, starting from the default
    /// parameters and applying each `(name, value)` override in turn.
    pub fn from_params(id: ComponentId, kind: ComponentKind, params: &[(&str, f64)]) -> Result<Self> {
        let mut component = match kind {
            ComponentKind::Battery => Component::Battery(Battery::new(id, DEFAULT_VOLTAGE)?),
            ComponentKind::Resistor => Component::Resistor(Resistor::new(id, DEFAULT_RESISTANCE)?),
            ComponentKind::Led => Component::Led(Led::new(id, LedParams::default())?),
        };
        for (name, value) in params {
            component.set_parameter(name, *value)?;
        }
        Ok(component)
    }

    /// Get the component ID.
    pub fn id(&self) -> ComponentId {
        match self {
            Component::Battery(b) => b.id,
            Component::Resistor(r) => r.id,
            Component::Led(d) => d.id,
        }
    }

    /// Get the type tag.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Battery(_) => ComponentKind::Battery,
            Component::Resistor(_) => ComponentKind::Resistor,
            Component::Led(_) => ComponentKind::Led,
        }
    }

    /// Pin names, in declaration order.
    pub fn pin_names(&self) -> &'static [&'static str] {
        self.kind().pin_names()
    }

    /// Look up one of this component's pin names.
    pub fn find_pin(&self, name: &str) -> Option<&'static str> {
        self.pin_names().iter().copied().find(|p| *p == name)
    }

    /// Update a named parameter.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        match self {
            Component::Battery(b) => b.set_parameter(name, value),
            Component::Resistor(r) => r.set_parameter(name, value),
            Component::Led(d) => d.set_parameter(name, value),
        }
    }

    /// Check if this component is an ideal voltage source.
    pub fn is_source(&self) -> bool {
        matches!(self, Component::Battery(_))
    }

    /// Check if this component is nonlinear (requires iteration).
    pub fn is_nonlinear(&self) -> bool {
        matches!(self, Component::Led(_))
    }

    /// Current through the component, flowing from its first pin to its
    /// second (for a battery: delivered out of the positive terminal).
    ///
    /// `pin_voltages` holds one voltage per pin in declaration order;
    /// `branch_current` is the MNA branch unknown for sources.
    pub fn current_through(&self, pin_voltages: &[f64], branch_current: Option<f64>) -> f64 {
        match self {
            Component::Battery(b) => branch_current.map(|i| b.delivered_current(i)).unwrap_or(0.0),
            Component::Resistor(r) => r.current(pin_voltages[0], pin_voltages[1]),
            Component::Led(d) => d.current(pin_voltages[0] - pin_voltages[1]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BreadboardError;

    #[test]
    fn test_from_params_applies_defaults_and_overrides() {
        let c = Component::from_params(ComponentId(3), ComponentKind::Resistor, &[]).unwrap();
        assert_eq!(c, Component::Resistor(Resistor::new(ComponentId(3), 220.0).unwrap()));

        let c = Component::from_params(ComponentId(4), ComponentKind::Battery, &[("voltage", 9.0)]).unwrap();
        match c {
            Component::Battery(b) => assert_eq!(b.voltage, 9.0),
            other => panic!("expected battery, got {other:?}"),
        }
    }

    #[test]
    fn test_from_params_rejects_unknown_names() {
        let err = Component::from_params(ComponentId(0), ComponentKind::Led, &[("colour", 1.0)]).unwrap_err();
        assert_eq!(
            err,
            BreadboardError::UnknownParameter {
                kind: "led",
                param: "colour".to_string()
            }
        );
    }

    #[test]
    fn test_pins_and_current_through() {
        let led = Component::from_params(ComponentId(0), ComponentKind::Led, &[]).unwrap();
        assert_eq!(led.pin_names(), &["anode", "cathode"]);
        assert_eq!(led.find_pin("anode"), Some("anode"));
        assert_eq!(led.find_pin("pin1"), None);
        assert!(led.is_nonlinear());

        let bat = Component::from_params(ComponentId(1), ComponentKind::Battery, &[]).unwrap();
        assert!((bat.current_through(&[5.0, 0.0], Some(-0.02)) - 0.02).abs() < 1e-15);
        assert_eq!(ComponentKind::parse("LED"), Some(ComponentKind::Led));
    }
}
