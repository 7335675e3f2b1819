use serde::{Deserialize, Serialize};

use crate::error::{BuildError, BuildResult};

/// A named numeric knob that rules read like any other equation.
///
/// The range and step are metadata for whatever surface exposes the knob
/// (sliders, CLI flags); the engine enforces the range on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Unique name, shared with the equation namespace.
    pub name: String,
    /// Unit label, documentation only.
    pub unit: String,
    /// Value assigned at build and restored on reset.
    pub default: f64,
    /// Smallest accepted value.
    pub min: f64,
    /// Largest accepted value.
    pub max: f64,
    /// Suggested increment for interactive controls. 0 = continuous.
    pub step: f64,
}

impl Parameter {
    /// Create a dimensionless parameter.
    pub fn new(name: impl Into<String>, default: f64, min: f64, max: f64, step: f64) -> Self {
        Self {
            name: name.into(),
            unit: "dimensionless".into(),
            default,
            min,
            max,
            step,
        }
    }

    /// Set the unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Returns `true` if `value` lies within `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Check the metadata for consistency.
    pub fn validate(&self) -> BuildResult<()> {
        let ordered = self.min.is_finite() && self.max.is_finite() && self.min <= self.max;
        let step_ok = self.step.is_finite() && self.step >= 0.0;
        if ordered && step_ok && self.contains(self.default) {
            Ok(())
        } else {
            Err(BuildError::InvalidParameter(self.name.clone()))
        }
    }
}
