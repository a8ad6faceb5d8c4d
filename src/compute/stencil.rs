//! Finite-difference stencils on grid manifolds.
//!
//! Second-order central differences for gradients and the `2d + 1` point
//! Laplacian. Boundaries follow the grid's neighbour relation: periodic grids
//! wrap, reflecting grids mirror the face cell into the ghost.

use super::GridManifold;

/// Central-difference derivative along one axis at one cell.
#[inline]
pub fn central_difference(values: &[f64], grid: &GridManifold, index: usize, axis: usize) -> f64 {
    let fwd = values[grid.neighbour(index, axis, true)];
    let bwd = values[grid.neighbour(index, axis, false)];
    (fwd - bwd) / (2.0 * grid.spacing())
}

/// Discrete Laplacian at one cell.
#[inline]
pub fn laplacian_at(values: &[f64], grid: &GridManifold, index: usize) -> f64 {
    let centre = values[index];
    let inv_h2 = 1.0 / (grid.spacing() * grid.spacing());
    (0..grid.shape().len())
        .map(|axis| {
            let fwd = values[grid.neighbour(index, axis, true)];
            let bwd = values[grid.neighbour(index, axis, false)];
            (fwd - 2.0 * centre + bwd) * inv_h2
        })
        .sum()
}

/// Discrete Laplacian of a cell-valued array.
pub fn laplacian_stencil(values: &[f64], grid: &GridManifold) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    laplacian_stencil_into(values, grid, &mut out);
    out
}

/// Discrete Laplacian into a pre-allocated buffer.
#[inline]
pub fn laplacian_stencil_into(values: &[f64], grid: &GridManifold, out: &mut [f64]) {
    for (index, o) in out.iter_mut().enumerate() {
        *o = laplacian_at(values, grid, index);
    }
}

/// Largest stable explicit Euler step for diffusion: `h² / (2 d D)`.
///
/// Returns infinity when there is nothing to diffuse.
pub fn max_stable_time_step(grid: &GridManifold, coefficient: f64) -> f64 {
    let axes = grid.shape().len();
    if axes == 0 || coefficient <= 0.0 {
        return f64::INFINITY;
    }
    grid.spacing() * grid.spacing() / (2.0 * axes as f64 * coefficient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Boundary;

    #[test]
    fn test_gradient_uniform() {
        let grid = GridManifold::new(vec![8, 8], 1.0, Boundary::Periodic).unwrap();
        let values = vec![1.0; grid.cell_count()];
        for index in 0..grid.cell_count() {
            for axis in 0..2 {
                assert!(central_difference(&values, &grid, index, axis).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_gradient_linear_ramp_interior() {
        let grid = GridManifold::new(vec![16], 0.5, Boundary::Reflecting).unwrap();
        let values: Vec<f64> = (0..16).map(|i| grid.cell_position(i)[0] * 3.0).collect();
        for i in 1..15 {
            let grad = central_difference(&values, &grid, i, 0);
            assert!((grad - 3.0).abs() < 1e-12, "grad at {} = {}", i, grad);
        }
    }

    #[test]
    fn test_laplacian_quadratic_interior() {
        let grid = GridManifold::new(vec![12, 10], 0.25, Boundary::Reflecting).unwrap();
        let values: Vec<f64> = (0..grid.cell_count())
            .map(|i| {
                let p = grid.cell_position(i);
                p[0] * p[0] + p[1] * p[1]
            })
            .collect();
        let lap = laplacian_stencil(&values, &grid);
        for index in 0..grid.cell_count() {
            let c = grid.cell_coords(index);
            if c[0] > 0 && c[0] < 11 && c[1] > 0 && c[1] < 9 {
                assert!((lap[index] - 4.0).abs() < 1e-9, "lap at {:?} = {}", c, lap[index]);
            }
        }
    }

    #[test]
    fn test_laplacian_sums_to_zero() {
        for boundary in [Boundary::Periodic, Boundary::Reflecting] {
            let grid = GridManifold::new(vec![7, 5, 3], 1.0, boundary).unwrap();
            let values: Vec<f64> = (0..grid.cell_count())
                .map(|i| ((i * 13) % 17) as f64)
                .collect();
            let total: f64 = laplacian_stencil(&values, &grid).iter().sum();
            assert!(total.abs() < 1e-9, "{:?}: {}", boundary, total);
        }
    }

    #[test]
    fn test_max_stable_time_step() {
        let grid = GridManifold::new(vec![4, 4], 0.5, Boundary::Periodic).unwrap();
        assert!((max_stable_time_step(&grid, 1.0) - 0.0625).abs() < 1e-12);
        assert!(max_stable_time_step(&grid, 0.0).is_infinite());
        assert!(max_stable_time_step(&GridManifold::compartment(), 1.0).is_infinite());
    }
}
