//! Embeddings - rigid maps from one manifold into another.
//!
//! A point `p` of the domain maps to
//!
//! ```text
//! map(p) = translation + rotation · (projection · p)
//! ```
//!
//! `projection` is a `range × domain` matrix with orthonormal columns, which
//! places the lower-dimensional domain inside the range before the rigid
//! motion. For equal dimensions it is usually the identity. The whole map
//! is an isometry between Euclidean manifolds.

use std::sync::Arc;

use crate::error::KernelError;

use super::Manifold;
use super::manifold::check_point;

/// Tolerance for orthonormality checks.
const ORTHONORMAL_TOLERANCE: f64 = 1e-9;

/// Rigid map from a domain manifold into a range manifold.
#[derive(Debug, Clone)]
pub struct Embedding {
    domain: Arc<dyn Manifold>,
    range: Arc<dyn Manifold>,
    translation: Vec<f64>,
    /// Row-major, `range × range`.
    rotation: Vec<Vec<f64>>,
    /// Row-major, `range × domain`.
    projection: Vec<Vec<f64>>,
}

impl Embedding {
    /// Create an embedding with the canonical injection (first domain axes).
    pub fn new(
        domain: Arc<dyn Manifold>,
        range: Arc<dyn Manifold>,
        translation: Vec<f64>,
        rotation: Vec<Vec<f64>>,
    ) -> Result<Self, KernelError> {
        let projection = canonical_injection(range.dimension(), domain.dimension())?;
        Self::with_projection(domain, range, translation, rotation, projection)
    }

    /// Create an embedding with an explicit projection matrix.
    pub fn with_projection(
        domain: Arc<dyn Manifold>,
        range: Arc<dyn Manifold>,
        translation: Vec<f64>,
        rotation: Vec<Vec<f64>>,
        projection: Vec<Vec<f64>>,
    ) -> Result<Self, KernelError> {
        let dr = range.dimension();
        let dd = domain.dimension();

        check_point(&translation, dr)?;
        check_matrix(&rotation, dr, dr)?;
        check_matrix(&projection, dr, dd)?;
        if !has_orthonormal_columns(&rotation, dr) {
            return Err(KernelError::NonOrthogonal("rotation"));
        }
        if !has_orthonormal_columns(&projection, dd) {
            return Err(KernelError::NonOrthogonal("projection"));
        }

        Ok(Self {
            domain,
            range,
            translation,
            rotation,
            projection,
        })
    }

    /// Identity map of a manifold onto itself.
    pub fn identity(manifold: Arc<dyn Manifold>) -> Self {
        let d = manifold.dimension();
        let eye = identity_matrix(d);
        Self {
            domain: Arc::clone(&manifold),
            range: manifold,
            translation: vec![0.0; d],
            rotation: eye.clone(),
            projection: eye,
        }
    }

    pub fn domain(&self) -> &Arc<dyn Manifold> {
        &self.domain
    }

    pub fn range(&self) -> &Arc<dyn Manifold> {
        &self.range
    }

    pub fn translation(&self) -> &[f64] {
        &self.translation
    }

    pub fn rotation(&self) -> &[Vec<f64>] {
        &self.rotation
    }

    /// Map a domain point into the range.
    pub fn map(&self, point: &[f64]) -> Result<Vec<f64>, KernelError> {
        check_point(point, self.domain.dimension())?;
        let lifted = mat_vec(&self.projection, point);
        let rotated = mat_vec(&self.rotation, &lifted);
        Ok(rotated
            .iter()
            .zip(&self.translation)
            .map(|(r, t)| r + t)
            .collect())
    }
}

/// Square identity matrix.
pub fn identity_matrix(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

/// Injection of the first `cols` axes into `rows` axes.
fn canonical_injection(rows: usize, cols: usize) -> Result<Vec<Vec<f64>>, KernelError> {
    if cols > rows {
        return Err(KernelError::DimensionMismatch {
            expected: rows,
            actual: cols,
        });
    }
    Ok((0..rows)
        .map(|i| (0..cols).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect())
}

fn check_matrix(matrix: &[Vec<f64>], rows: usize, cols: usize) -> Result<(), KernelError> {
    if matrix.len() != rows {
        return Err(KernelError::DimensionMismatch {
            expected: rows,
            actual: matrix.len(),
        });
    }
    for row in matrix {
        check_point(row, cols)?;
    }
    Ok(())
}

fn has_orthonormal_columns(matrix: &[Vec<f64>], cols: usize) -> bool {
    (0..cols).all(|a| {
        (a..cols).all(|b| {
            let dot: f64 = matrix.iter().map(|row| row[a] * row[b]).sum();
            let expected = if a == b { 1.0 } else { 0.0 };
            (dot - expected).abs() < ORTHONORMAL_TOLERANCE
        })
    })
}

fn mat_vec(matrix: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}
