//! Scalar fields defined over a grid manifold.
//!
//! [`ScalarField`] fixes the capability set shared by every representation.
//! [`Field`] is the tagged variant populations store, so a population can
//! carry either a cell-valued or a moment-expansion field.

use std::sync::Arc;

use crate::error::KernelError;

use super::{DiscretizedScalarField, GridManifold, MomentExpansionScalarField, max_stable_time_step};

/// Capabilities of a discretized scalar field.
///
/// Index accessors address the stored representation (cell values or
/// expansion coefficients). Point accessors, gradients and Laplacians are
/// all derived from that same representation.
pub trait ScalarField {
    /// Grid the field is defined over.
    fn grid(&self) -> &Arc<GridManifold>;

    /// Number of stored values.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored value at an index.
    fn get(&self, index: usize) -> Result<f64, KernelError>;

    /// Overwrite the stored value at an index.
    fn set(&mut self, index: usize, value: f64) -> Result<(), KernelError>;

    /// Field value at an arbitrary point.
    fn value_at(&self, point: &[f64]) -> Result<f64, KernelError>;

    /// In-place sum. `other` is left unchanged.
    fn plus(&mut self, other: &Self) -> Result<(), KernelError>;

    /// In-place element-wise product of the stored representations.
    fn times(&mut self, other: &Self) -> Result<(), KernelError>;

    /// Multiply every stored value by a scalar.
    fn scale(&mut self, factor: f64);

    /// Gradient at an arbitrary point.
    fn gradient(&self, point: &[f64]) -> Result<Vec<f64>, KernelError>;

    /// Laplacian at an arbitrary point.
    fn laplacian(&self, point: &[f64]) -> Result<f64, KernelError>;

    /// Field values at every cell centre of the grid.
    fn nodal_values(&self) -> Vec<f64>;

    /// Add a per-cell increment, expressed at cell centres.
    fn accumulate_nodal(&mut self, delta: &[f64]) -> Result<(), KernelError>;

    /// One explicit Euler step of `∂f/∂t = coefficient Δf`.
    fn diffuse(&mut self, coefficient: f64, dt: f64);

    /// Integral of the field over the grid.
    fn total(&self) -> f64;
}

/// Check a per-cell buffer against a grid.
#[inline]
pub(crate) fn check_nodal(grid: &GridManifold, values: &[f64]) -> Result<(), KernelError> {
    if values.len() == grid.cell_count() {
        Ok(())
    } else {
        Err(KernelError::DimensionMismatch {
            expected: grid.cell_count(),
            actual: values.len(),
        })
    }
}

/// Check an index against a stored length.
#[inline]
pub(crate) fn check_index(index: usize, len: usize) -> Result<(), KernelError> {
    if index < len {
        Ok(())
    } else {
        Err(KernelError::IndexOutOfRange { index, len })
    }
}

/// Check that two grids are compatible for field algebra.
pub(crate) fn check_grids(a: &GridManifold, b: &GridManifold) -> Result<(), KernelError> {
    if a.compatible_with(b) {
        Ok(())
    } else {
        Err(KernelError::IncompatibleField(format!(
            "grid {:?} (h={}) vs {:?} (h={})",
            a.shape(),
            a.spacing(),
            b.shape(),
            b.spacing()
        )))
    }
}

/// A scalar field in either representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Discretized(DiscretizedScalarField),
    Moment(MomentExpansionScalarField),
}

impl Field {
    /// Zero field with the same representation and grid as `self`.
    pub fn zeros_like(&self) -> Self {
        match self {
            Field::Discretized(f) => Field::Discretized(DiscretizedScalarField::zeros(
                Arc::clone(f.grid()),
            )),
            Field::Moment(f) => Field::Moment(f.zeros_like()),
        }
    }

    /// Short representation name for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Field::Discretized(_) => "discretized",
            Field::Moment(_) => "moment",
        }
    }

    /// Largest stable explicit diffusion step for this representation.
    pub fn max_stable_time_step(&self, coefficient: f64) -> f64 {
        match self {
            Field::Discretized(f) => max_stable_time_step(f.grid(), coefficient),
            Field::Moment(f) => f.max_stable_time_step(coefficient),
        }
    }

    fn mismatch(&self, other: &Field) -> KernelError {
        KernelError::IncompatibleField(format!(
            "cannot combine {} field with {} field",
            self.kind(),
            other.kind()
        ))
    }
}

impl From<DiscretizedScalarField> for Field {
    fn from(field: DiscretizedScalarField) -> Self {
        Field::Discretized(field)
    }
}

impl From<MomentExpansionScalarField> for Field {
    fn from(field: MomentExpansionScalarField) -> Self {
        Field::Moment(field)
    }
}

macro_rules! dispatch {
    ($self:expr, $f:ident => $body:expr) => {
        match $self {
            Field::Discretized($f) => $body,
            Field::Moment($f) => $body,
        }
    };
}

impl ScalarField for Field {
    fn grid(&self) -> &Arc<GridManifold> {
        dispatch!(self, f => f.grid())
    }

    fn len(&self) -> usize {
        dispatch!(self, f => f.len())
    }

    fn get(&self, index: usize) -> Result<f64, KernelError> {
        dispatch!(self, f => f.get(index))
    }

    fn set(&mut self, index: usize, value: f64) -> Result<(), KernelError> {
        dispatch!(self, f => f.set(index, value))
    }

    fn value_at(&self, point: &[f64]) -> Result<f64, KernelError> {
        dispatch!(self, f => f.value_at(point))
    }

    fn plus(&mut self, other: &Self) -> Result<(), KernelError> {
        match (self, other) {
            (Field::Discretized(a), Field::Discretized(b)) => a.plus(b),
            (Field::Moment(a), Field::Moment(b)) => a.plus(b),
            (a, b) => Err(a.mismatch(b)),
        }
    }

    fn times(&mut self, other: &Self) -> Result<(), KernelError> {
        match (self, other) {
            (Field::Discretized(a), Field::Discretized(b)) => a.times(b),
            (Field::Moment(a), Field::Moment(b)) => a.times(b),
            (a, b) => Err(a.mismatch(b)),
        }
    }

    fn scale(&mut self, factor: f64) {
        dispatch!(self, f => f.scale(factor))
    }

    fn gradient(&self, point: &[f64]) -> Result<Vec<f64>, KernelError> {
        dispatch!(self, f => f.gradient(point))
    }

    fn laplacian(&self, point: &[f64]) -> Result<f64, KernelError> {
        dispatch!(self, f => f.laplacian(point))
    }

    fn nodal_values(&self) -> Vec<f64> {
        dispatch!(self, f => f.nodal_values())
    }

    fn accumulate_nodal(&mut self, delta: &[f64]) -> Result<(), KernelError> {
        dispatch!(self, f => f.accumulate_nodal(delta))
    }

    fn diffuse(&mut self, coefficient: f64, dt: f64) {
        dispatch!(self, f => f.diffuse(coefficient, dt))
    }

    fn total(&self) -> f64 {
        dispatch!(self, f => f.total())
    }
}
