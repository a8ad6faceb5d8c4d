//! Manifolds - spatial domains of fixed dimension with a distance metric.
//!
//! [`TinyManifold`] is the trivial Euclidean domain. [`GridManifold`] adds a
//! regular, cell-centred discretization that scalar fields are stored on.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::KernelError;

/// A spatial domain of fixed dimension.
///
/// Implementations must provide a metric: `distance` is symmetric,
/// non-negative and zero iff both points are the same point of the domain.
pub trait Manifold: Debug + Send + Sync {
    /// Number of coordinates of a point.
    fn dimension(&self) -> usize;

    /// Distance between two points of this manifold.
    fn distance(&self, source: &[f64], target: &[f64]) -> Result<f64, KernelError>;
}

/// Check that a point has the expected number of coordinates.
#[inline]
pub(crate) fn check_point(point: &[f64], dimension: usize) -> Result<(), KernelError> {
    if point.len() == dimension {
        Ok(())
    } else {
        Err(KernelError::DimensionMismatch {
            expected: dimension,
            actual: point.len(),
        })
    }
}

/// Minimal Euclidean manifold with no discretization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TinyManifold {
    dimension: usize,
}

impl TinyManifold {
    /// Create a manifold of the given dimension. Negative dimensions are rejected.
    pub fn new(dimension: isize) -> Result<Self, KernelError> {
        let dimension = usize::try_from(dimension)
            .map_err(|_| KernelError::InvalidDimension(format!("{dimension} is negative")))?;
        Ok(Self { dimension })
    }
}

impl Manifold for TinyManifold {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn distance(&self, source: &[f64], target: &[f64]) -> Result<f64, KernelError> {
        check_point(source, self.dimension)?;
        check_point(target, self.dimension)?;
        Ok(source
            .iter()
            .zip(target)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt())
    }
}

/// Boundary treatment of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Boundary {
    /// Opposite faces are identified (torus).
    #[default]
    Periodic,
    /// Zero-flux walls: the ghost cell beyond a face mirrors the face cell.
    Reflecting,
}

/// Regular Cartesian grid of up to three axes with uniform spacing.
///
/// Cells are centred: cell `i` along an axis sits at `(i + 0.5) * spacing`.
/// Flat indices put axis 0 fastest, i.e. `x + nx * (y + ny * z)`.
/// A grid with no axes has a single cell at the empty point and models a
/// well-mixed compartment.
#[derive(Debug, Clone, PartialEq)]
pub struct GridManifold {
    shape: Vec<usize>,
    strides: Vec<usize>,
    spacing: f64,
    boundary: Boundary,
    len: usize,
}

impl GridManifold {
    /// Maximum number of axes.
    pub const MAX_AXES: usize = 3;

    /// Create a grid with the given cell counts per axis.
    pub fn new(shape: Vec<usize>, spacing: f64, boundary: Boundary) -> Result<Self, KernelError> {
        if shape.len() > Self::MAX_AXES {
            return Err(KernelError::InvalidDimension(format!(
                "grids support at most {} axes, got {}",
                Self::MAX_AXES,
                shape.len()
            )));
        }
        if let Some(axis) = shape.iter().position(|&n| n == 0) {
            return Err(KernelError::InvalidDimension(format!(
                "axis {axis} has no cells"
            )));
        }
        if !(spacing > 0.0 && spacing.is_finite()) {
            return Err(KernelError::InvalidSpacing(spacing));
        }

        let mut strides = Vec::with_capacity(shape.len());
        let mut stride = 1;
        for &n in &shape {
            strides.push(stride);
            stride *= n;
        }

        Ok(Self {
            shape,
            strides,
            spacing,
            boundary,
            len: stride,
        })
    }

    /// Single-cell, zero-dimensional compartment with unit measure.
    pub fn compartment() -> Self {
        Self {
            shape: Vec::new(),
            strides: Vec::new(),
            spacing: 1.0,
            boundary: Boundary::Periodic,
            len: 1,
        }
    }

    /// Cell counts per axis.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.len
    }

    /// Length, area or volume of one cell (1 for a compartment).
    #[inline]
    pub fn cell_measure(&self) -> f64 {
        self.spacing.powi(self.shape.len() as i32)
    }

    /// Physical length of an axis.
    #[inline]
    pub fn extent(&self, axis: usize) -> f64 {
        self.shape[axis] as f64 * self.spacing
    }

    /// Two grids are compatible when they share shape, spacing and boundary.
    pub fn compatible_with(&self, other: &GridManifold) -> bool {
        self.shape == other.shape && self.spacing == other.spacing && self.boundary == other.boundary
    }

    /// Flat index of a multi-index.
    #[inline]
    pub fn cell_index(&self, coords: &[usize]) -> usize {
        debug_assert_eq!(coords.len(), self.shape.len());
        coords.iter().zip(&self.strides).map(|(c, s)| c * s).sum()
    }

    /// Multi-index of a flat index.
    pub fn cell_coords(&self, index: usize) -> Vec<usize> {
        self.shape
            .iter()
            .zip(&self.strides)
            .map(|(&n, &s)| (index / s) % n)
            .collect()
    }

    /// Centre of a cell.
    pub fn cell_position(&self, index: usize) -> Vec<f64> {
        self.cell_coords(index)
            .into_iter()
            .map(|c| (c as f64 + 0.5) * self.spacing)
            .collect()
    }

    /// Cell containing a point. Periodic grids wrap, reflecting grids clamp.
    pub fn locate(&self, point: &[f64]) -> Result<usize, KernelError> {
        check_point(point, self.dimension())?;
        let mut index = 0;
        for (axis, &x) in point.iter().enumerate() {
            let n = self.shape[axis] as i64;
            let cell = (x / self.spacing).floor() as i64;
            let cell = match self.boundary {
                Boundary::Periodic => cell.rem_euclid(n),
                Boundary::Reflecting => cell.clamp(0, n - 1),
            };
            index += cell as usize * self.strides[axis];
        }
        Ok(index)
    }

    /// Neighbouring cell along an axis.
    ///
    /// Periodic grids wrap. Reflecting grids return the cell itself beyond a
    /// face, which is the zero-flux ghost of a cell-centred grid.
    #[inline]
    pub fn neighbour(&self, index: usize, axis: usize, forward: bool) -> usize {
        let n = self.shape[axis];
        let stride = self.strides[axis];
        let c = (index / stride) % n;
        let next = match (self.boundary, forward) {
            (Boundary::Periodic, true) => (c + 1) % n,
            (Boundary::Periodic, false) => (c + n - 1) % n,
            (Boundary::Reflecting, true) => (c + 1).min(n - 1),
            (Boundary::Reflecting, false) => c.saturating_sub(1),
        };
        index - c * stride + next * stride
    }

    /// Multilinear interpolation weights of a point over cell centres.
    ///
    /// Returns `(cell, weight)` pairs whose weights sum to one.
    pub(crate) fn interpolation_weights(
        &self,
        point: &[f64],
    ) -> Result<Vec<(usize, f64)>, KernelError> {
        check_point(point, self.dimension())?;

        let mut weights = vec![(0usize, 1.0f64)];
        for (axis, &x) in point.iter().enumerate() {
            let n = self.shape[axis];
            let stride = self.strides[axis];
            let (lo, hi, frac) = self.bracket(x, n);

            let mut next = Vec::with_capacity(weights.len() * 2);
            for &(index, w) in &weights {
                next.push((index + lo * stride, w * (1.0 - frac)));
                if frac > 0.0 {
                    next.push((index + hi * stride, w * frac));
                }
            }
            weights = next;
        }
        Ok(weights)
    }

    /// Bracketing cell centres along one axis and the fractional offset.
    fn bracket(&self, x: f64, n: usize) -> (usize, usize, f64) {
        if n == 1 {
            return (0, 0, 0.0);
        }
        let u = x / self.spacing - 0.5;
        match self.boundary {
            Boundary::Periodic => {
                let base = u.floor();
                let frac = u - base;
                let lo = (base as i64).rem_euclid(n as i64) as usize;
                (lo, (lo + 1) % n, frac)
            }
            Boundary::Reflecting => {
                let u = u.clamp(0.0, (n - 1) as f64);
                let lo = (u.floor() as usize).min(n - 2);
                (lo, lo + 1, u - lo as f64)
            }
        }
    }
}

impl Manifold for GridManifold {
    fn dimension(&self) -> usize {
        self.shape.len()
    }

    fn distance(&self, source: &[f64], target: &[f64]) -> Result<f64, KernelError> {
        check_point(source, self.dimension())?;
        check_point(target, self.dimension())?;

        let mut sum = 0.0;
        for (axis, (a, b)) in source.iter().zip(target).enumerate() {
            let d = match self.boundary {
                Boundary::Reflecting => a - b,
                Boundary::Periodic => {
                    // Minimum image on the torus
                    let length = self.extent(axis);
                    let d = (a - b).abs() % length;
                    d.min(length - d)
                }
            };
            sum += d * d;
        }
        Ok(sum.sqrt())
    }
}
