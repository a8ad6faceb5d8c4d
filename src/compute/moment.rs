//! Moment-expansion scalar fields.
//!
//! The field is stored as coefficients of a tensor-product real Fourier basis
//! over the periodic grid box. Along an axis of length `L` the basis is
//!
//! ```text
//! j = 0       -> 1
//! j = 2m - 1  -> cos(2π m x / L)
//! j = 2m      -> sin(2π m x / L)      for 1 <= m <= M
//! ```
//!
//! Point values, gradients and Laplacians are evaluated analytically from the
//! coefficient vector. Projection from cell samples uses one FFT per grid line.

use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::KernelError;

use super::field::{check_grids, check_index, check_nodal};
use super::manifold::check_point;
use super::{Boundary, GridManifold, ScalarField};

/// Scalar field stored as truncated Fourier moments.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentExpansionScalarField {
    grid: Arc<GridManifold>,
    /// Highest mode number per axis.
    modes: Vec<usize>,
    /// Coefficients, axis 0 fastest, `2 * modes[a] + 1` per axis.
    coefficients: Vec<f64>,
}

impl MomentExpansionScalarField {
    /// Project `init`, sampled at cell centres, onto modes up to `max_mode`.
    ///
    /// `max_mode` is clamped per axis to `(n - 1) / 2` so no mode aliases on
    /// the grid.
    pub fn from_fn<F>(grid: Arc<GridManifold>, max_mode: usize, init: F) -> Result<Self, KernelError>
    where
        F: Fn(&[f64]) -> f64,
    {
        let mut field = Self::zeros(grid, max_mode)?;
        let samples: Vec<f64> = (0..field.grid.cell_count())
            .map(|index| init(&field.grid.cell_position(index)))
            .collect();
        field.coefficients = field.project(&samples);
        Ok(field)
    }

    /// Field with every coefficient zero.
    pub fn zeros(grid: Arc<GridManifold>, max_mode: usize) -> Result<Self, KernelError> {
        if !grid.shape().is_empty() && grid.boundary() != Boundary::Periodic {
            return Err(KernelError::UnsupportedBoundary);
        }
        let modes: Vec<usize> = grid
            .shape()
            .iter()
            .map(|&n| max_mode.min((n - 1) / 2))
            .collect();
        let len = modes.iter().map(|m| 2 * m + 1).product();
        Ok(Self {
            grid,
            modes,
            coefficients: vec![0.0; len],
        })
    }

    /// Zero field with the same grid and truncation.
    pub fn zeros_like(&self) -> Self {
        Self {
            grid: Arc::clone(&self.grid),
            modes: self.modes.clone(),
            coefficients: vec![0.0; self.coefficients.len()],
        }
    }

    /// Highest retained mode per axis.
    pub fn modes(&self) -> &[usize] {
        &self.modes
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Largest stable explicit Euler step for diffusion: `2 / (D Σ_a (2π m_a / L_a)²)`.
    ///
    /// The highest retained mode decays fastest, so it sets the limit.
    /// Returns infinity when there is nothing to diffuse.
    pub fn max_stable_time_step(&self, coefficient: f64) -> f64 {
        let stiffest: f64 = self
            .modes
            .iter()
            .enumerate()
            .map(|(axis, &m)| (2.0 * PI * m as f64 / self.grid.extent(axis)).powi(2))
            .sum();
        if stiffest == 0.0 || coefficient <= 0.0 {
            return f64::INFINITY;
        }
        2.0 / (coefficient * stiffest)
    }

    /// Basis functions per axis.
    fn basis_len(&self) -> Vec<usize> {
        self.modes.iter().map(|m| 2 * m + 1).collect()
    }

    fn check_compatible(&self, other: &Self) -> Result<(), KernelError> {
        check_grids(&self.grid, &other.grid)?;
        if self.modes != other.modes {
            return Err(KernelError::IncompatibleField(format!(
                "moment truncation {:?} vs {:?}",
                self.modes, other.modes
            )));
        }
        Ok(())
    }

    /// Cell samples to coefficients, one axis at a time.
    fn project(&self, samples: &[f64]) -> Vec<f64> {
        let mut planner = FftPlanner::<f64>::new();
        let mut data = samples.to_vec();
        let mut shape = self.grid.shape().to_vec();

        for (axis, &m) in self.modes.iter().enumerate() {
            let n = shape[axis];
            let fft = planner.plan_fft_forward(n);
            let mut buffer = vec![Complex::new(0.0, 0.0); n];
            data = transform_axis(&data, &mut shape, axis, 2 * m + 1, |line, out| {
                for (b, &v) in buffer.iter_mut().zip(line) {
                    *b = Complex::new(v, 0.0);
                }
                fft.process(&mut buffer);

                let inv_n = 1.0 / n as f64;
                out[0] = buffer[0].re * inv_n;
                for mode in 1..=m {
                    // Cell centres sit half a cell off the FFT sample points
                    let shift = Complex::from_polar(1.0, -PI * mode as f64 * inv_n);
                    let z = buffer[mode] * shift;
                    out[2 * mode - 1] = 2.0 * inv_n * z.re;
                    out[2 * mode] = -2.0 * inv_n * z.im;
                }
            });
        }
        data
    }

    /// Coefficients to cell samples, one axis at a time.
    fn synthesize(&self) -> Vec<f64> {
        let mut data = self.coefficients.clone();
        let mut shape = self.basis_len();

        for axis in 0..self.modes.len() {
            let n = self.grid.shape()[axis];
            let length = self.grid.extent(axis);
            let h = self.grid.spacing();
            let table: Vec<Vec<f64>> = (0..n)
                .map(|i| axis_basis(self.modes[axis], (i as f64 + 0.5) * h, length).0)
                .collect();
            data = transform_axis(&data, &mut shape, axis, n, |line, out| {
                for (o, row) in out.iter_mut().zip(&table) {
                    *o = line.iter().zip(row).map(|(c, b)| c * b).sum();
                }
            });
        }
        data
    }

    /// Sum of coefficients against per-axis basis vectors.
    fn contract(&self, vectors: &[&[f64]]) -> f64 {
        let basis_len = self.basis_len();
        self.coefficients
            .iter()
            .enumerate()
            .map(|(flat, &c)| {
                let mut rest = flat;
                let mut term = c;
                for (vector, &k) in vectors.iter().zip(&basis_len) {
                    term *= vector[rest % k];
                    rest /= k;
                }
                term
            })
            .sum()
    }

    /// Basis values, first and second derivatives at a point.
    fn point_basis(&self, point: &[f64]) -> Result<Vec<AxisBasis>, KernelError> {
        check_point(point, self.modes.len())?;
        Ok(point
            .iter()
            .enumerate()
            .map(|(axis, &x)| axis_basis(self.modes[axis], x, self.grid.extent(axis)))
            .collect())
    }
}

/// Basis values, first and second derivatives along one axis.
type AxisBasis = (Vec<f64>, Vec<f64>, Vec<f64>);

fn axis_basis(modes: usize, x: f64, length: f64) -> AxisBasis {
    let len = 2 * modes + 1;
    let mut value = vec![0.0; len];
    let mut d1 = vec![0.0; len];
    let mut d2 = vec![0.0; len];
    value[0] = 1.0;

    for m in 1..=modes {
        let k = 2.0 * PI * m as f64 / length;
        let (s, c) = (k * x).sin_cos();
        value[2 * m - 1] = c;
        value[2 * m] = s;
        d1[2 * m - 1] = -k * s;
        d1[2 * m] = k * c;
        d2[2 * m - 1] = -k * k * c;
        d2[2 * m] = -k * k * s;
    }
    (value, d1, d2)
}

/// Apply `line_fn` to every line of `data` along `axis`, resizing that axis to `new_len`.
///
/// Layout is axis 0 fastest. `shape` is updated in place.
fn transform_axis<F>(data: &[f64], shape: &mut [usize], axis: usize, new_len: usize, mut line_fn: F) -> Vec<f64>
where
    F: FnMut(&[f64], &mut [f64]),
{
    let n = shape[axis];
    let stride: usize = shape[..axis].iter().product();
    let outer: usize = shape[axis + 1..].iter().product();

    let mut out = vec![0.0; stride * new_len * outer];
    let mut line = vec![0.0; n];
    let mut line_out = vec![0.0; new_len];

    for o in 0..outer {
        for inner in 0..stride {
            let base_in = o * n * stride + inner;
            let base_out = o * new_len * stride + inner;
            for (i, l) in line.iter_mut().enumerate() {
                *l = data[base_in + i * stride];
            }
            line_fn(&line, &mut line_out);
            for (i, &v) in line_out.iter().enumerate() {
                out[base_out + i * stride] = v;
            }
        }
    }

    shape[axis] = new_len;
    out
}

impl ScalarField for MomentExpansionScalarField {
    fn grid(&self) -> &Arc<GridManifold> {
        &self.grid
    }

    fn len(&self) -> usize {
        self.coefficients.len()
    }

    fn get(&self, index: usize) -> Result<f64, KernelError> {
        check_index(index, self.coefficients.len())?;
        Ok(self.coefficients[index])
    }

    fn set(&mut self, index: usize, value: f64) -> Result<(), KernelError> {
        check_index(index, self.coefficients.len())?;
        self.coefficients[index] = value;
        Ok(())
    }

    fn value_at(&self, point: &[f64]) -> Result<f64, KernelError> {
        let basis = self.point_basis(point)?;
        let vectors: Vec<&[f64]> = basis.iter().map(|b| b.0.as_slice()).collect();
        Ok(self.contract(&vectors))
    }

    fn plus(&mut self, other: &Self) -> Result<(), KernelError> {
        self.check_compatible(other)?;
        for (a, b) in self.coefficients.iter_mut().zip(&other.coefficients) {
            *a += b;
        }
        Ok(())
    }

    fn times(&mut self, other: &Self) -> Result<(), KernelError> {
        self.check_compatible(other)?;
        for (a, b) in self.coefficients.iter_mut().zip(&other.coefficients) {
            *a *= b;
        }
        Ok(())
    }

    fn scale(&mut self, factor: f64) {
        for c in &mut self.coefficients {
            *c *= factor;
        }
    }

    fn gradient(&self, point: &[f64]) -> Result<Vec<f64>, KernelError> {
        let basis = self.point_basis(point)?;
        Ok((0..basis.len())
            .map(|axis| {
                let vectors: Vec<&[f64]> = basis
                    .iter()
                    .enumerate()
                    .map(|(a, b)| if a == axis { b.1.as_slice() } else { b.0.as_slice() })
                    .collect();
                self.contract(&vectors)
            })
            .collect())
    }

    fn laplacian(&self, point: &[f64]) -> Result<f64, KernelError> {
        let basis = self.point_basis(point)?;
        Ok((0..basis.len())
            .map(|axis| {
                let vectors: Vec<&[f64]> = basis
                    .iter()
                    .enumerate()
                    .map(|(a, b)| if a == axis { b.2.as_slice() } else { b.0.as_slice() })
                    .collect();
                self.contract(&vectors)
            })
            .sum())
    }

    fn nodal_values(&self) -> Vec<f64> {
        self.synthesize()
    }

    fn accumulate_nodal(&mut self, delta: &[f64]) -> Result<(), KernelError> {
        check_nodal(&self.grid, delta)?;
        let projected = self.project(delta);
        for (c, d) in self.coefficients.iter_mut().zip(&projected) {
            *c += d;
        }
        Ok(())
    }

    fn diffuse(&mut self, coefficient: f64, dt: f64) {
        if coefficient == 0.0 {
            return;
        }
        let basis_len = self.basis_len();
        let wavenumbers: Vec<f64> = (0..self.modes.len())
            .map(|axis| 2.0 * PI / self.grid.extent(axis))
            .collect();

        for (flat, c) in self.coefficients.iter_mut().enumerate() {
            let mut rest = flat;
            let mut eigenvalue = 0.0;
            for (&k, &base) in basis_len.iter().zip(&wavenumbers) {
                let j = rest % k;
                rest /= k;
                let m = j.div_ceil(2) as f64;
                eigenvalue -= (base * m).powi(2);
            }
            *c += dt * coefficient * eigenvalue * *c;
        }
    }

    fn total(&self) -> f64 {
        // Only the constant mode has a non-zero integral over the period
        let volume: f64 = (0..self.modes.len()).map(|a| self.grid.extent(a)).product();
        self.coefficients[0] * volume
    }
}
