//! Ideal voltage source (battery).

use crate::circuit::ComponentId;
use crate::error::{BreadboardError, Result};

/// Default battery voltage (volts).
pub const DEFAULT_VOLTAGE: f64 = 5.0;

/// A battery, modelled as an ideal voltage source.
///
/// Voltage sources require an extra row/column in the MNA matrix for the
/// branch current. The source enforces: V+ - V- = V_source
#[derive(Debug, Clone, PartialEq)]
pub struct Battery {
    pub id: ComponentId,
    pub voltage: f64,
}

impl Battery {
    pub const PINS: [&'static str; 2] = ["positive", "negative"];

    /// Create a new battery.
    pub fn new(id: ComponentId, voltage: f64) -> Result<Self> {
        Ok(Self {
            id,
            voltage: Self::check_voltage(voltage)?,
        })
    }

    fn check_voltage(voltage: f64) -> Result<f64> {
        if !voltage.is_finite() {
            return Err(BreadboardError::invalid_parameter(
                "battery",
                "voltage",
                format!("expected a finite value, got {voltage}"),
            ));
        }
        Ok(voltage)
    }

    /// Update a named parameter.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "voltage" => {
                self.voltage = Self::check_voltage(value)?;
                Ok(())
            }
            _ => Err(BreadboardError::UnknownParameter {
                kind: "battery",
                param: name.to_string(),
            }),
        }
    }

    /// The positive terminal.
    pub fn positive(&self) -> &'static str {
        Self::PINS[0]
    }

    /// The negative (reference) terminal.
    pub fn negative(&self) -> &'static str {
        Self::PINS[1]
    }

    /// Current delivered out of the positive terminal, given the MNA branch
    /// current (which flows from + to - through the source).
    pub fn delivered_current(&self, branch_current: f64) -> f64 {
        -branch_current
    }
}
