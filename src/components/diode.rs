//! LED model.
//!
//! The LED is a piecewise-linear ideal diode:
//!
//! ```text
//!   Vd <= Vf : I = G_off * Vd               (blocking)
//!   Vd >  Vf : I = (Vd - Vf) / R_on         (conducting)
//! ```
//!
//! For Newton iteration we linearize around the current operating point:
//!   I ≈ G * V + I_eq
//!
//! On a piecewise-linear curve the linearization is exact inside each
//! segment, so the iteration settles as soon as every LED sits on the
//! segment its previous iterate predicted.

use crate::circuit::ComponentId;
use crate::error::{BreadboardError, Result};
use crate::solver::MIN_CONDUCTANCE;

/// Current below which an LED is drawn dark (amperes).
pub const LIT_THRESHOLD: f64 = 0.001;

/// Parameters for an LED.
#[derive(Debug, Clone, PartialEq)]
pub struct LedParams {
    /// Forward threshold voltage. Red ~1.8V, Green ~2.2V, Blue ~3.3V
    pub forward_voltage: f64,
    /// Slope resistance once conducting
    pub on_resistance: f64,
    /// Current at which the LED reaches full brightness
    pub max_current: f64,
}

impl Default for LedParams {
    fn default() -> Self {
        Self {
            forward_voltage: 2.0,
            on_resistance: 1.0,
            max_current: 0.020,
        }
    }
}

impl LedParams {
    /// Create parameters for an LED with the given forward voltage.
    pub fn with_forward_voltage(forward_voltage: f64) -> Self {
        Self {
            forward_voltage,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<()> {
        if !self.forward_voltage.is_finite() || self.forward_voltage < 0.0 {
            return Err(BreadboardError::invalid_parameter(
                "led",
                "forward_voltage",
                format!("expected a finite value >= 0, got {}", self.forward_voltage),
            ));
        }
        if !self.on_resistance.is_finite() || self.on_resistance <= 0.0 {
            return Err(BreadboardError::invalid_parameter(
                "led",
                "on_resistance",
                format!("expected a finite value > 0, got {}", self.on_resistance),
            ));
        }
        if !self.max_current.is_finite() || self.max_current <= 0.0 {
            return Err(BreadboardError::invalid_parameter(
                "led",
                "max_current",
                format!("expected a finite value > 0, got {}", self.max_current),
            ));
        }
        Ok(())
    }
}

/// An LED component.
#[derive(Debug, Clone, PartialEq)]
pub struct Led {
    pub id: ComponentId,
    pub params: LedParams,
}

impl Led {
    pub const PINS: [&'static str; 2] = ["anode", "cathode"];

    /// Create a new LED.
    pub fn new(id: ComponentId, params: LedParams) -> Result<Self> {
        params.check()?;
        Ok(Self { id, params })
    }

    /// Update a named parameter.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        let mut params = self.params.clone();
        match name {
            "forward_voltage" => params.forward_voltage = value,
            "on_resistance" => params.on_resistance = value,
            "max_current" => params.max_current = value,
            _ => {
                return Err(BreadboardError::UnknownParameter {
                    kind: "led",
                    param: name.to_string(),
                })
            }
        }
        params.check()?;
        self.params = params;
        Ok(())
    }

    /// Check whether the given anode-cathode voltage is on the conducting
    /// segment.
    pub fn is_conducting(&self, v: f64) -> bool {
        v > self.params.forward_voltage
    }

    /// Calculate the LED current (anode to cathode) at a given voltage.
    pub fn current(&self, v: f64) -> f64 {
        let (g, i_eq) = self.linearize(v);
        g * v + i_eq
    }

    /// Get the linearized model parameters at the given operating point.
    /// Returns (conductance G, equivalent current source I_eq)
    /// such that I = G * V + I_eq
    pub fn linearize(&self, v_op: f64) -> (f64, f64) {
        if self.is_conducting(v_op) {
            let g = 1.0 / self.params.on_resistance;
            (g, -self.params.forward_voltage * g)
        } else {
            (MIN_CONDUCTANCE, 0.0)
        }
    }

    /// Glow level in [0, 1] for a given current.
    pub fn brightness(&self, current: f64) -> f64 {
        if current > LIT_THRESHOLD {
            (current / self.params.max_current).min(1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_led() -> Led {
        Led::new(ComponentId(0), LedParams::default()).unwrap()
    }

    #[test]
    fn test_led_blocks_below_threshold() {
        let d = red_led();
        assert!(d.current(0.0).abs() < 1e-15);
        assert!(d.current(1.9).abs() < 1e-9);
        assert!(d.current(-5.0) < 0.0);
        assert!(d.current(-5.0) > -1e-9);
    }

    #[test]
    fn test_led_conducts_above_threshold() {
        let d = red_led();
        // 10 mV past threshold through 1 ohm
        assert!((d.current(2.01) - 0.01).abs() < 1e-12);

        let (g, i_eq) = d.linearize(2.5);
        assert!((g - 1.0).abs() < 1e-12);
        assert!((i_eq + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_led_brightness() {
        let d = red_led();
        assert_eq!(d.brightness(0.0005), 0.0);
        assert!((d.brightness(0.010) - 0.5).abs() < 1e-12);
        assert_eq!(d.brightness(0.100), 1.0);
    }

    #[test]
    fn test_led_parameter_validation() {
        let mut d = red_led();
        assert!(d.set_parameter("on_resistance", 0.0).is_err());
        assert!(d.set_parameter("max_current", -1.0).is_err());
        d.set_parameter("forward_voltage", 3.3).unwrap();
        assert_eq!(d.params.forward_voltage, 3.3);
        assert!(Led::new(ComponentId(1), LedParams::with_forward_voltage(f64::NAN)).is_err());
    }
}
