//! Linear passive components: Resistor.

use crate::circuit::ComponentId;
use crate::error::{BreadboardError, Result};

/// Default resistance for a freshly placed resistor (ohms).
pub const DEFAULT_RESISTANCE: f64 = 220.0;

/// Smallest resistance the solver will stamp (ohms).
pub const MIN_RESISTANCE: f64 = 1e-12;

/// A resistor component.
#[derive(Debug, Clone, PartialEq)]
pub struct Resistor {
    pub id: ComponentId,
    /// Resistance in ohms, already clamped to [`MIN_RESISTANCE`]
    pub resistance: f64,
}

impl Resistor {
    pub const PINS: [&'static str; 2] = ["pin1", "pin2"];

    /// Create a new resistor.
    pub fn new(id: ComponentId, resistance: f64) -> Result<Self> {
        Ok(Self {
            id,
            resistance: Self::check_resistance(resistance)?,
        })
    }

    fn check_resistance(resistance: f64) -> Result<f64> {
        if !resistance.is_finite() || resistance < 0.0 {
            return Err(BreadboardError::invalid_parameter(
                "resistor",
                "resistance",
                format!("expected a finite value >= 0, got {resistance}"),
            ));
        }
        Ok(resistance.max(MIN_RESISTANCE))
    }

    /// Update a named parameter.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "resistance" => {
                self.resistance = Self::check_resistance(value)?;
                Ok(())
            }
            _ => Err(BreadboardError::UnknownParameter {
                kind: "resistor",
                param: name.to_string(),
            }),
        }
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }

    /// Current flowing from pin1 to pin2.
    pub fn current(&self, v_pin1: f64, v_pin2: f64) -> f64 {
        (v_pin1 - v_pin2) / self.resistance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new(ComponentId(0), 1000.0).unwrap();
        assert!((r.conductance() - 0.001).abs() < 1e-10);
        assert!((r.current(5.0, 0.0) - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_zero_resistance_is_clamped() {
        let r = Resistor::new(ComponentId(0), 0.0).unwrap();
        assert_eq!(r.resistance, MIN_RESISTANCE);
        assert!(r.conductance().is_finite());
    }

    #[test]
    fn test_rejects_negative_and_nan() {
        assert!(Resistor::new(ComponentId(0), -1.0).is_err());
        assert!(Resistor::new(ComponentId(0), f64::NAN).is_err());

        let mut r = Resistor::new(ComponentId(0), 10.0).unwrap();
        assert!(r.set_parameter("resistance", f64::INFINITY).is_err());
        assert!(matches!(
            r.set_parameter("ohms", 1.0),
            Err(BreadboardError::UnknownParameter { .. })
        ));
        assert_eq!(r.resistance, 10.0);
    }
}
