//! Property-based tests for manifolds, fields and embeddings.

use std::sync::Arc;

use proptest::prelude::*;
use reaction_diffusion::compute::{
    Boundary, DiscretizedScalarField, Embedding, GridManifold, Manifold,
    MomentExpansionScalarField, ScalarField, TinyManifold,
};

fn point(dim: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-50.0f64..50.0, dim)
}

fn boundary() -> impl Strategy<Value = Boundary> {
    prop_oneof![Just(Boundary::Periodic), Just(Boundary::Reflecting)]
}

// ── Metric Properties ────────────────────────────────────────────────

proptest! {
    /// Euclidean distance is symmetric, non-negative and zero on the diagonal.
    #[test]
    fn tiny_distance_is_a_metric(
        (a, b) in (1usize..5).prop_flat_map(|d| (point(d), point(d)))
    ) {
        let m = TinyManifold::new(a.len() as isize).unwrap();
        let ab = m.distance(&a, &b).unwrap();
        let ba = m.distance(&b, &a).unwrap();
        prop_assert!(ab >= 0.0);
        prop_assert!((ab - ba).abs() < 1e-12);
        prop_assert_eq!(m.distance(&a, &a).unwrap(), 0.0);
    }

    /// Grid distance obeys the same axioms under either boundary.
    #[test]
    fn grid_distance_is_a_metric(
        shape in prop::collection::vec(2usize..12, 1..4),
        boundary in boundary(),
        seed in 0.0f64..1.0,
    ) {
        let grid = GridManifold::new(shape.clone(), 0.5, boundary).unwrap();
        let a: Vec<f64> = (0..shape.len()).map(|i| grid.extent(i) * seed).collect();
        let b: Vec<f64> = (0..shape.len()).map(|i| grid.extent(i) * (1.0 - seed) * 0.7).collect();
        let ab = grid.distance(&a, &b).unwrap();
        prop_assert!(ab >= 0.0);
        prop_assert!((ab - grid.distance(&b, &a).unwrap()).abs() < 1e-12);
        prop_assert_eq!(grid.distance(&a, &a).unwrap(), 0.0);
    }

    /// A point with the wrong number of coordinates is always rejected.
    #[test]
    fn distance_rejects_wrong_dimension(dim in 1usize..5, extra in 1usize..3) {
        let m = TinyManifold::new(dim as isize).unwrap();
        let good = vec![0.0; dim];
        let bad = vec![0.0; dim + extra];
        prop_assert!(m.distance(&good, &bad).is_err());
        prop_assert!(m.distance(&bad, &good).is_err());
    }
}

// ── Field Properties ─────────────────────────────────────────────────

proptest! {
    /// Reading an index returns the last value written there.
    #[test]
    fn set_then_get(
        n in 2usize..40,
        index in 0usize..40,
        value in -1e6f64..1e6,
    ) {
        let grid = Arc::new(GridManifold::new(vec![n], 1.0, Boundary::Reflecting).unwrap());
        let mut field = DiscretizedScalarField::zeros(grid);
        let index = index % n;
        field.set(index, value).unwrap();
        prop_assert_eq!(field.get(index).unwrap(), value);
        prop_assert!(field.get(n).is_err());
    }

    /// Adding a field then adding its negation restores the original values.
    #[test]
    fn plus_then_minus_restores(
        values in prop::collection::vec(-100.0f64..100.0, 24),
        other in prop::collection::vec(-100.0f64..100.0, 24),
    ) {
        let grid = Arc::new(GridManifold::new(vec![6, 4], 1.0, Boundary::Periodic).unwrap());
        let original = DiscretizedScalarField::from_values(Arc::clone(&grid), values).unwrap();
        let delta = DiscretizedScalarField::from_values(Arc::clone(&grid), other).unwrap();
        let mut negated = delta.clone();
        negated.scale(-1.0);

        let mut field = original.clone();
        field.plus(&delta).unwrap();
        field.plus(&negated).unwrap();
        for (a, b) in field.values().iter().zip(original.values()) {
            prop_assert!((a - b).abs() < 1e-9);
        }
    }

    /// Set/get also holds for expansion coefficients.
    #[test]
    fn moment_set_then_get(
        max_mode in 0usize..6,
        index in 0usize..64,
        value in -1e6f64..1e6,
    ) {
        let grid = Arc::new(GridManifold::new(vec![12, 8], 1.0, Boundary::Periodic).unwrap());
        let mut field = MomentExpansionScalarField::zeros(grid, max_mode).unwrap();
        let len = field.len();
        let index = index % len;
        field.set(index, value).unwrap();
        prop_assert_eq!(field.get(index).unwrap(), value);
        prop_assert!(field.get(len).is_err());
        prop_assert!(field.set(len, value).is_err());
    }

    /// Adding a moment field then its negation restores the original coefficients.
    #[test]
    fn moment_plus_then_minus_restores(
        values in prop::collection::vec(-100.0f64..100.0, 7),
        other in prop::collection::vec(-100.0f64..100.0, 7),
    ) {
        let grid = Arc::new(GridManifold::new(vec![16], 1.0, Boundary::Periodic).unwrap());
        let from_coefficients = |coefficients: &[f64]| {
            let mut field = MomentExpansionScalarField::zeros(Arc::clone(&grid), 3).unwrap();
            for (index, &c) in coefficients.iter().enumerate() {
                field.set(index, c).unwrap();
            }
            field
        };
        let original = from_coefficients(&values);
        let delta = from_coefficients(&other);
        let mut negated = delta.clone();
        negated.scale(-1.0);

        let mut field = original.clone();
        field.plus(&delta).unwrap();
        field.plus(&negated).unwrap();
        for (a, b) in field.coefficients().iter().zip(original.coefficients()) {
            prop_assert!((a - b).abs() < 1e-9);
        }
        // Cell values follow the coefficients
        for (a, b) in field.nodal_values().iter().zip(original.nodal_values()) {
            prop_assert!((a - b).abs() < 1e-8);
        }
    }

    /// Diffusion on a reflecting grid conserves the total amount.
    #[test]
    fn diffusion_conserves_amount_reflecting(
        values in prop::collection::vec(0.0f64..10.0, 64),
        coefficient in 0.01f64..1.0,
        steps in 1usize..20,
    ) {
        let grid = Arc::new(GridManifold::new(vec![8, 8], 1.0, Boundary::Reflecting).unwrap());
        let mut field = DiscretizedScalarField::from_values(grid, values).unwrap();
        let before = field.total();
        let dt = 0.2 / coefficient;
        for _ in 0..steps {
            field.diffuse(coefficient, dt);
        }
        prop_assert!((field.total() - before).abs() < 1e-9 * before.max(1.0));
    }

    /// Diffusion of a moment field conserves the total amount.
    #[test]
    fn diffusion_conserves_amount_moment(
        a in -2.0f64..2.0,
        b in -2.0f64..2.0,
        offset in 0.0f64..5.0,
        coefficient in 0.0f64..2.0,
    ) {
        let grid = Arc::new(GridManifold::new(vec![16], 1.0, Boundary::Periodic).unwrap());
        let k = 2.0 * std::f64::consts::PI / 16.0;
        let mut field = MomentExpansionScalarField::from_fn(grid, 3, |p| {
            offset + a * (k * p[0]).cos() + b * (2.0 * k * p[0]).sin()
        })
        .unwrap();
        let before = field.total();
        field.diffuse(coefficient, 0.5);
        prop_assert!((field.total() - before).abs() < 1e-9);
        prop_assert!((before - offset * 16.0).abs() < 1e-9);
    }
}

// ── Embedding Properties ─────────────────────────────────────────────

proptest! {
    /// Mapping is deterministic and preserves distances for an isometric embedding.
    #[test]
    fn embedding_is_deterministic_and_isometric(
        angle in 0.0f64..std::f64::consts::TAU,
        tx in -10.0f64..10.0,
        ty in -10.0f64..10.0,
        p in point(1),
        q in point(1),
    ) {
        let domain: Arc<dyn Manifold> = Arc::new(TinyManifold::new(1).unwrap());
        let range: Arc<dyn Manifold> = Arc::new(TinyManifold::new(2).unwrap());
        let (s, c) = angle.sin_cos();
        let embedding = Embedding::new(
            Arc::clone(&domain),
            Arc::clone(&range),
            vec![tx, ty],
            vec![vec![c, -s], vec![s, c]],
        )
        .unwrap();

        let mp = embedding.map(&p).unwrap();
        prop_assert_eq!(&mp, &embedding.map(&p).unwrap());
        let mq = embedding.map(&q).unwrap();
        let before = domain.distance(&p, &q).unwrap();
        let after = range.distance(&mp, &mq).unwrap();
        prop_assert!((before - after).abs() < 1e-9);
    }
}
