//! Error types for the reaction-diffusion kernel.
//!
//! Every variant is a construction-time or call-time contract violation,
//! reported synchronously to the caller. The kernel performs no I/O, so
//! nothing here is transient or worth retrying.

/// Errors raised by manifolds, fields, embeddings, populations and reactions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    #[error("Invalid manifold dimension: {0}")]
    InvalidDimension(String),
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Incompatible field: {0}")]
    IncompatibleField(String),
    #[error("Reaction '{reaction}' has {coefficients} {side} coefficients for {participants} participants")]
    StoichiometryMismatch {
        reaction: String,
        side: &'static str,
        coefficients: usize,
        participants: usize,
    },
    #[error("Time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),
    #[error("Index {index} out of range for field of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Grid spacing must be positive and finite, got {0}")]
    InvalidSpacing(f64),
    #[error("{0} is not orthonormal")]
    NonOrthogonal(&'static str),
    #[error("Moment expansion requires a periodic grid")]
    UnsupportedBoundary,
    #[error("Molecular mass must be non-negative and finite, got {0}")]
    InvalidMass(f64),
    #[error("Diffusion coefficient must be non-negative and finite, got {0}")]
    InvalidDiffusion(f64),
    #[error("Reaction '{reaction}' has invalid stoichiometric coefficient {coefficient}")]
    InvalidStoichiometry { reaction: String, coefficient: f64 },
    #[error("Reaction '{reaction}' has invalid rate constant {rate}")]
    InvalidRateConstant { reaction: String, rate: f64 },
    #[error("Unknown population id {0}")]
    UnknownPopulation(usize),
    #[error("Reaction '{0}' has no participants")]
    EmptyReaction(String),
}

/// Validate a time step shared by populations and reaction complexes.
#[inline]
pub(crate) fn check_time_step(dt: f64) -> Result<(), KernelError> {
    if dt > 0.0 && dt.is_finite() {
        Ok(())
    } else {
        Err(KernelError::InvalidTimeStep(dt))
    }
}
