//! Chemical species descriptors.

use serde::{Deserialize, Serialize};

use crate::error::KernelError;

/// Immutable chemical species.
///
/// Molecules are plain values: two molecules with the same name and mass
/// compare equal. Identity of a species within a simulation comes from the
/// population that carries it, not from the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    name: String,
    mass: f64,
}

impl Molecule {
    /// Create a molecule. Mass must be non-negative and finite.
    pub fn new(name: impl Into<String>, mass: f64) -> Result<Self, KernelError> {
        if !(mass >= 0.0 && mass.is_finite()) {
            return Err(KernelError::InvalidMass(mass));
        }
        Ok(Self {
            name: name.into(),
            mass,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }
}
