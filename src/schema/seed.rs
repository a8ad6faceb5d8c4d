//! Seed patterns for initial concentrations.

use rand::distributions::Standard;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::compute::{GridManifold, Manifold};
use crate::error::KernelError;

/// Predefined patterns for initial concentrations.
///
/// Positions are fractions of the grid extent along each axis (0.0-1.0) and
/// radii are fractions of the shortest axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Pattern {
    /// Same value in every cell.
    Uniform { value: f64 },
    /// Single Gaussian blob.
    GaussianBlob {
        center: Vec<f64>,
        radius: f64,
        amplitude: f64,
    },
    /// Several Gaussian blobs, summed.
    MultiBlob { blobs: Vec<BlobSpec> },
    /// Annulus with softened edges.
    Ring {
        center: Vec<f64>,
        inner_radius: f64,
        outer_radius: f64,
        amplitude: f64,
    },
    /// Uniform random noise in `[0, amplitude)`.
    Noise { amplitude: f64, seed: u64 },
    /// Explicit `(cell, value)` entries on a zero background.
    Custom { values: Vec<(usize, f64)> },
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::Uniform { value: 0.0 }
    }
}

/// Specification for a single blob in a `MultiBlob` pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobSpec {
    pub center: Vec<f64>,
    pub radius: f64,
    pub amplitude: f64,
}

impl Pattern {
    /// Generate one value per grid cell.
    pub fn generate(&self, grid: &GridManifold) -> Result<Vec<f64>, KernelError> {
        let mut values = vec![0.0; grid.cell_count()];

        match self {
            Pattern::Uniform { value } => values.fill(*value),
            Pattern::GaussianBlob {
                center,
                radius,
                amplitude,
            } => apply_gaussian(&mut values, grid, center, *radius, *amplitude)?,
            Pattern::MultiBlob { blobs } => {
                for blob in blobs {
                    apply_gaussian(&mut values, grid, &blob.center, blob.radius, blob.amplitude)?;
                }
            }
            Pattern::Ring {
                center,
                inner_radius,
                outer_radius,
                amplitude,
            } => apply_ring(
                &mut values,
                grid,
                center,
                *inner_radius,
                *outer_radius,
                *amplitude,
            )?,
            Pattern::Noise { amplitude, seed } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                for v in &mut values {
                    let u: f64 = rng.sample(Standard);
                    *v = amplitude * u;
                }
            }
            Pattern::Custom { values: entries } => {
                for &(cell, v) in entries {
                    if cell < values.len() {
                        values[cell] = v;
                    }
                }
            }
        }

        Ok(values)
    }
}

/// Absolute position of a fractional centre.
fn absolute_center(grid: &GridManifold, center: &[f64]) -> Result<Vec<f64>, KernelError> {
    if center.len() != grid.dimension() {
        return Err(KernelError::DimensionMismatch {
            expected: grid.dimension(),
            actual: center.len(),
        });
    }
    Ok(center
        .iter()
        .enumerate()
        .map(|(axis, f)| f * grid.extent(axis))
        .collect())
}

/// Shortest axis length (1 for a compartment).
fn min_extent(grid: &GridManifold) -> f64 {
    if grid.shape().is_empty() {
        return 1.0;
    }
    (0..grid.shape().len())
        .map(|axis| grid.extent(axis))
        .fold(f64::INFINITY, f64::min)
}

fn apply_gaussian(
    values: &mut [f64],
    grid: &GridManifold,
    center: &[f64],
    radius: f64,
    amplitude: f64,
) -> Result<(), KernelError> {
    let c = absolute_center(grid, center)?;
    let sigma = radius * min_extent(grid) / 2.0;
    let sigma_sq_2 = 2.0 * sigma * sigma;

    for (index, v) in values.iter_mut().enumerate() {
        let d = grid.distance(&grid.cell_position(index), &c)?;
        *v += if sigma_sq_2 > 0.0 {
            amplitude * (-d * d / sigma_sq_2).exp()
        } else if d == 0.0 {
            amplitude
        } else {
            0.0
        };
    }
    Ok(())
}

fn apply_ring(
    values: &mut [f64],
    grid: &GridManifold,
    center: &[f64],
    inner_radius: f64,
    outer_radius: f64,
    amplitude: f64,
) -> Result<(), KernelError> {
    let c = absolute_center(grid, center)?;
    let scale = min_extent(grid);
    let r_in = inner_radius * scale;
    let r_out = outer_radius * scale;
    let edge_width = (r_out - r_in) * 0.2;

    for (index, v) in values.iter_mut().enumerate() {
        let dist = grid.distance(&grid.cell_position(index), &c)?;
        if dist >= r_in && dist <= r_out {
            // Smooth falloff at edges
            let falloff = if edge_width > 0.0 {
                ((dist - r_in) / edge_width)
                    .min((r_out - dist) / edge_width)
                    .min(1.0)
            } else {
                1.0
            };
            *v += amplitude * falloff;
        }
    }
    Ok(())
}
