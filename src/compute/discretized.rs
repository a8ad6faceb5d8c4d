//! Cell-valued scalar fields.
//!
//! One value per grid cell. Point values, gradients and Laplacians are the
//! multilinear interpolation of the nodal quantities, so they coincide with
//! the finite-difference stencils at cell centres.

use std::sync::Arc;

use crate::error::KernelError;

use super::field::{check_grids, check_index, check_nodal};
use super::{GridManifold, ScalarField, central_difference, laplacian_at, laplacian_stencil};

/// Scalar field storing one value per grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscretizedScalarField {
    grid: Arc<GridManifold>,
    values: Vec<f64>,
}

impl DiscretizedScalarField {
    /// Seed a field by evaluating `init` at every cell centre.
    pub fn from_fn<F>(grid: Arc<GridManifold>, init: F) -> Self
    where
        F: Fn(&[f64]) -> f64,
    {
        let values = (0..grid.cell_count())
            .map(|index| init(&grid.cell_position(index)))
            .collect();
        Self { grid, values }
    }

    /// Field of zeros.
    pub fn zeros(grid: Arc<GridManifold>) -> Self {
        let values = vec![0.0; grid.cell_count()];
        Self { grid, values }
    }

    /// Field from explicit cell values.
    pub fn from_values(grid: Arc<GridManifold>, values: Vec<f64>) -> Result<Self, KernelError> {
        check_nodal(&grid, &values)?;
        Ok(Self { grid, values })
    }

    /// Cell values in flat-index order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn check_compatible(&self, other: &Self) -> Result<(), KernelError> {
        check_grids(&self.grid, &other.grid)
    }
}

impl ScalarField for DiscretizedScalarField {
    fn grid(&self) -> &Arc<GridManifold> {
        &self.grid
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, index: usize) -> Result<f64, KernelError> {
        check_index(index, self.values.len())?;
        Ok(self.values[index])
    }

    fn set(&mut self, index: usize, value: f64) -> Result<(), KernelError> {
        check_index(index, self.values.len())?;
        self.values[index] = value;
        Ok(())
    }

    fn value_at(&self, point: &[f64]) -> Result<f64, KernelError> {
        let weights = self.grid.interpolation_weights(point)?;
        Ok(weights.iter().map(|&(i, w)| w * self.values[i]).sum())
    }

    fn plus(&mut self, other: &Self) -> Result<(), KernelError> {
        self.check_compatible(other)?;
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
        Ok(())
    }

    fn times(&mut self, other: &Self) -> Result<(), KernelError> {
        self.check_compatible(other)?;
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a *= b;
        }
        Ok(())
    }

    fn scale(&mut self, factor: f64) {
        for v in &mut self.values {
            *v *= factor;
        }
    }

    fn gradient(&self, point: &[f64]) -> Result<Vec<f64>, KernelError> {
        let weights = self.grid.interpolation_weights(point)?;
        let mut grad = vec![0.0; self.grid.shape().len()];
        for &(index, w) in &weights {
            for (axis, g) in grad.iter_mut().enumerate() {
                *g += w * central_difference(&self.values, &self.grid, index, axis);
            }
        }
        Ok(grad)
    }

    fn laplacian(&self, point: &[f64]) -> Result<f64, KernelError> {
        let weights = self.grid.interpolation_weights(point)?;
        Ok(weights
            .iter()
            .map(|&(index, w)| w * laplacian_at(&self.values, &self.grid, index))
            .sum())
    }

    fn nodal_values(&self) -> Vec<f64> {
        self.values.clone()
    }

    fn accumulate_nodal(&mut self, delta: &[f64]) -> Result<(), KernelError> {
        check_nodal(&self.grid, delta)?;
        for (v, d) in self.values.iter_mut().zip(delta) {
            *v += d;
        }
        Ok(())
    }

    fn diffuse(&mut self, coefficient: f64, dt: f64) {
        if coefficient == 0.0 {
            return;
        }
        let lap = laplacian_stencil(&self.values, &self.grid);
        let factor = coefficient * dt;
        for (v, l) in self.values.iter_mut().zip(&lap) {
            *v += factor * l;
        }
    }

    fn total(&self) -> f64 {
        self.values.iter().sum::<f64>() * self.grid.cell_measure()
    }
}
