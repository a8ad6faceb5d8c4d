//! Mass-action reactions between molecular populations.
//!
//! A reaction computes its effect as a [`ReactionUpdate`] from a read-only
//! view of the populations, then applies it. Splitting the two lets a
//! [`ReactionComplex`](super::ReactionComplex) choose between sequential and
//! snapshot updates within a tick.

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::KernelError;

use super::field::{check_grids, check_nodal};
use super::{Embedding, GridManifold, PopulationId, Populations, ScalarField};

/// Which field of a population an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    Concentration,
    Flux,
}

/// Per-cell increments produced by one reaction step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionUpdate {
    changes: Vec<(PopulationId, FieldTarget, Vec<f64>)>,
}

impl ReactionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an increment at cell centres of a population field.
    pub fn push(&mut self, id: PopulationId, target: FieldTarget, delta: Vec<f64>) {
        self.changes.push((id, target, delta));
    }

    pub fn changes(&self) -> &[(PopulationId, FieldTarget, Vec<f64>)] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Apply every increment in recording order.
    ///
    /// Nothing is written unless every increment fits its population.
    pub fn apply(&self, populations: &mut Populations) -> Result<(), KernelError> {
        for (id, _, delta) in &self.changes {
            check_nodal(populations.get(*id)?.grid(), delta)?;
        }
        for (id, target, delta) in &self.changes {
            let population = populations.get_mut(*id)?;
            match target {
                FieldTarget::Concentration => population.accumulate_concentration(delta)?,
                FieldTarget::Flux => population.accumulate_flux(delta)?,
            }
        }
        Ok(())
    }
}

/// A chemical reaction acting on populations.
pub trait Reaction: Debug {
    fn name(&self) -> &str;

    fn rate_constant(&self) -> f64;

    /// Every population this reaction reads or writes.
    fn participants(&self) -> Vec<PopulationId>;

    /// Check that every participant is present in `populations`.
    fn check(&self, populations: &Populations) -> Result<(), KernelError> {
        self.participants()
            .into_iter()
            .try_for_each(|id| populations.check(id))
    }

    /// Compute the update for a step of `dt` from the current state.
    fn compute(&self, populations: &Populations, dt: f64) -> Result<ReactionUpdate, KernelError>;

    /// Compute and immediately apply one step.
    fn step(&self, populations: &mut Populations, dt: f64) -> Result<(), KernelError> {
        let update = self.compute(populations, dt)?;
        update.apply(populations)
    }
}

/// Stoichiometric coefficients of reactants and products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stoichiometry {
    pub reactants: Vec<f64>,
    pub products: Vec<f64>,
}

impl Stoichiometry {
    pub fn new(reactants: Vec<f64>, products: Vec<f64>) -> Self {
        Self {
            reactants,
            products,
        }
    }

    /// Check coefficient counts and values against participant counts.
    fn validate(&self, reaction: &str, reactants: usize, products: usize) -> Result<(), KernelError> {
        for (side, coefficients, participants) in [
            ("reactant", &self.reactants, reactants),
            ("product", &self.products, products),
        ] {
            if coefficients.len() != participants {
                return Err(KernelError::StoichiometryMismatch {
                    reaction: reaction.to_string(),
                    side,
                    coefficients: coefficients.len(),
                    participants,
                });
            }
            if let Some(&bad) = coefficients.iter().find(|c| !(**c >= 0.0 && c.is_finite())) {
                return Err(KernelError::InvalidStoichiometry {
                    reaction: reaction.to_string(),
                    coefficient: bad,
                });
            }
        }
        Ok(())
    }
}

/// Reactant and product populations on one side of a reaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Participants {
    pub reactants: Vec<PopulationId>,
    pub products: Vec<PopulationId>,
}

impl Participants {
    pub fn new(reactants: Vec<PopulationId>, products: Vec<PopulationId>) -> Self {
        Self {
            reactants,
            products,
        }
    }

    fn all(&self) -> impl Iterator<Item = PopulationId> + '_ {
        self.reactants.iter().chain(&self.products).copied()
    }

    fn is_empty(&self) -> bool {
        self.reactants.is_empty() && self.products.is_empty()
    }

    /// Check every handle and return the grid they share.
    fn shared_grid(&self, populations: &Populations) -> Result<Arc<GridManifold>, KernelError> {
        let mut grid: Option<&Arc<GridManifold>> = None;
        for id in self.all() {
            let g = populations.get(id)?.concentration().grid();
            match grid {
                Some(first) => check_grids(first, g)?,
                None => grid = Some(g),
            }
        }
        grid.cloned()
            .ok_or_else(|| KernelError::IncompatibleField("no participants".to_string()))
    }

    /// Check every handle against the grid the reaction was built on.
    fn check_on(&self, populations: &Populations, grid: &GridManifold) -> Result<(), KernelError> {
        for id in self.all() {
            check_grids(grid, populations.get(id)?.grid())?;
        }
        Ok(())
    }
}

/// Cell-centre concentrations of a participant covering exactly `cells` cells.
fn concentrations(populations: &Populations, id: PopulationId, cells: usize) -> Result<Vec<f64>, KernelError> {
    let values = populations.get(id)?.concentration().nodal_values();
    if values.len() != cells {
        return Err(KernelError::IncompatibleField(format!(
            "population {} has {} cells, reaction expects {}",
            id.index(),
            values.len(),
            cells
        )));
    }
    Ok(values)
}

/// `c^ν`, exact for integral coefficients.
#[inline]
fn power(c: f64, nu: f64) -> f64 {
    if nu.fract() == 0.0 && nu <= i32::MAX as f64 {
        c.powi(nu as i32)
    } else {
        c.powf(nu)
    }
}

fn check_rate_constant(reaction: &str, rate: f64) -> Result<(), KernelError> {
    if rate >= 0.0 && rate.is_finite() {
        Ok(())
    } else {
        Err(KernelError::InvalidRateConstant {
            reaction: reaction.to_string(),
            rate,
        })
    }
}

/// Reaction among populations that share one interior grid.
///
/// At each cell, `rate = k Π c_r^ν_r`. Reactants change by `-ν rate dt` and
/// products by `+ν rate dt`.
#[derive(Debug, Clone)]
pub struct InteriorReaction {
    name: String,
    participants: Participants,
    grid: Arc<GridManifold>,
    stoichiometry: Stoichiometry,
    rate_constant: f64,
}

impl InteriorReaction {
    pub fn new(
        name: impl Into<String>,
        populations: &Populations,
        participants: Participants,
        stoichiometry: Stoichiometry,
        rate_constant: f64,
    ) -> Result<Self, KernelError> {
        let name = name.into();
        stoichiometry.validate(
            &name,
            participants.reactants.len(),
            participants.products.len(),
        )?;
        check_rate_constant(&name, rate_constant)?;
        if participants.is_empty() {
            return Err(KernelError::EmptyReaction(name));
        }
        let grid = participants.shared_grid(populations)?;

        Ok(Self {
            name,
            participants,
            grid,
            stoichiometry,
            rate_constant,
        })
    }

    pub fn stoichiometry(&self) -> &Stoichiometry {
        &self.stoichiometry
    }
}

impl Reaction for InteriorReaction {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate_constant(&self) -> f64 {
        self.rate_constant
    }

    fn participants(&self) -> Vec<PopulationId> {
        self.participants.all().collect()
    }

    fn check(&self, populations: &Populations) -> Result<(), KernelError> {
        self.participants.check_on(populations, &self.grid)
    }

    fn compute(&self, populations: &Populations, dt: f64) -> Result<ReactionUpdate, KernelError> {
        let cells = self.grid.cell_count();
        let mut rate = vec![self.rate_constant; cells];
        for (&id, &nu) in self.participants.reactants.iter().zip(&self.stoichiometry.reactants) {
            let values = concentrations(populations, id, cells)?;
            for (r, &c) in rate.iter_mut().zip(&values) {
                *r *= power(c, nu);
            }
        }

        let mut update = ReactionUpdate::new();
        let sides = [
            (&self.participants.reactants, &self.stoichiometry.reactants, -1.0),
            (&self.participants.products, &self.stoichiometry.products, 1.0),
        ];
        for (ids, coefficients, sign) in sides {
            for (&id, &nu) in ids.iter().zip(coefficients) {
                let delta = rate.iter().map(|r| sign * nu * r * dt).collect();
                update.push(id, FieldTarget::Concentration, delta);
            }
        }
        Ok(update)
    }
}

/// Surface reaction coupling interior populations to boundary populations.
///
/// Each boundary cell is mapped through the embedding into the interior grid
/// once, at construction. At boundary cell `b` over interior cell `i(b)`:
///
/// ```text
/// rate = k Π_boundary c(b)^ν Π_interior c(i(b))^ν
/// ```
///
/// Boundary populations change by `∓ν rate dt` directly. Interior populations
/// receive `∓ν rate × (boundary cell measure / interior cell measure)` in their
/// flux field at `i(b)`, which the next population step integrates. Total
/// amount is conserved across the surface.
///
/// Coefficients are laid out interior first: `reactants = [interior..., boundary...]`,
/// and likewise for products.
#[derive(Debug, Clone)]
pub struct BoundaryReaction {
    name: String,
    interior: Participants,
    boundary: Participants,
    stoichiometry: Stoichiometry,
    rate_constant: f64,
    embedding: Embedding,
    interior_grid: Arc<GridManifold>,
    boundary_grid: Arc<GridManifold>,
    /// Interior cell under each boundary cell.
    footprint: Vec<usize>,
    measure_ratio: f64,
}

impl BoundaryReaction {
    pub fn new(
        name: impl Into<String>,
        populations: &Populations,
        embedding: Embedding,
        interior: Participants,
        boundary: Participants,
        stoichiometry: Stoichiometry,
        rate_constant: f64,
    ) -> Result<Self, KernelError> {
        let name = name.into();
        stoichiometry.validate(
            &name,
            interior.reactants.len() + boundary.reactants.len(),
            interior.products.len() + boundary.products.len(),
        )?;
        check_rate_constant(&name, rate_constant)?;
        if interior.is_empty() || boundary.is_empty() {
            return Err(KernelError::EmptyReaction(name));
        }

        let interior_grid = interior.shared_grid(populations)?;
        let boundary_grid = boundary.shared_grid(populations)?;

        let domain_dim = embedding.domain().dimension();
        let range_dim = embedding.range().dimension();
        if domain_dim != boundary_grid.shape().len() {
            return Err(KernelError::DimensionMismatch {
                expected: boundary_grid.shape().len(),
                actual: domain_dim,
            });
        }
        if range_dim != interior_grid.shape().len() {
            return Err(KernelError::DimensionMismatch {
                expected: interior_grid.shape().len(),
                actual: range_dim,
            });
        }

        let footprint = (0..boundary_grid.cell_count())
            .map(|b| {
                let point = embedding.map(&boundary_grid.cell_position(b))?;
                interior_grid.locate(&point)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            stoichiometry,
            rate_constant,
            footprint,
            measure_ratio: boundary_grid.cell_measure() / interior_grid.cell_measure(),
            interior_grid,
            boundary_grid,
            embedding,
            interior,
            boundary,
        })
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    /// Interior cell under each boundary cell.
    pub fn footprint(&self) -> &[usize] {
        &self.footprint
    }

    pub fn stoichiometry(&self) -> &Stoichiometry {
        &self.stoichiometry
    }

    fn interior_coefficients(&self) -> (&[f64], &[f64]) {
        (
            &self.stoichiometry.reactants[..self.interior.reactants.len()],
            &self.stoichiometry.products[..self.interior.products.len()],
        )
    }

    fn boundary_coefficients(&self) -> (&[f64], &[f64]) {
        (
            &self.stoichiometry.reactants[self.interior.reactants.len()..],
            &self.stoichiometry.products[self.interior.products.len()..],
        )
    }
}

impl Reaction for BoundaryReaction {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate_constant(&self) -> f64 {
        self.rate_constant
    }

    fn participants(&self) -> Vec<PopulationId> {
        self.interior.all().chain(self.boundary.all()).collect()
    }

    fn check(&self, populations: &Populations) -> Result<(), KernelError> {
        self.interior.check_on(populations, &self.interior_grid)?;
        self.boundary.check_on(populations, &self.boundary_grid)
    }

    fn compute(&self, populations: &Populations, dt: f64) -> Result<ReactionUpdate, KernelError> {
        let (interior_r, interior_p) = self.interior_coefficients();
        let (boundary_r, boundary_p) = self.boundary_coefficients();
        let interior_cells = self.interior_grid.cell_count();

        let mut rate = vec![self.rate_constant; self.footprint.len()];
        for (&id, &nu) in self.boundary.reactants.iter().zip(boundary_r) {
            let values = concentrations(populations, id, self.footprint.len())?;
            for (r, &c) in rate.iter_mut().zip(&values) {
                *r *= power(c, nu);
            }
        }
        for (&id, &nu) in self.interior.reactants.iter().zip(interior_r) {
            let values = concentrations(populations, id, interior_cells)?;
            for (r, &cell) in rate.iter_mut().zip(&self.footprint) {
                *r *= power(values[cell], nu);
            }
        }

        let mut update = ReactionUpdate::new();

        let boundary_sides = [
            (&self.boundary.reactants, boundary_r, -1.0),
            (&self.boundary.products, boundary_p, 1.0),
        ];
        for (ids, coefficients, sign) in boundary_sides {
            for (&id, &nu) in ids.iter().zip(coefficients) {
                let delta = rate.iter().map(|r| sign * nu * r * dt).collect();
                update.push(id, FieldTarget::Concentration, delta);
            }
        }

        let interior_sides = [
            (&self.interior.reactants, interior_r, -1.0),
            (&self.interior.products, interior_p, 1.0),
        ];
        for (ids, coefficients, sign) in interior_sides {
            for (&id, &nu) in ids.iter().zip(coefficients) {
                let mut delta = vec![0.0; interior_cells];
                for (r, &cell) in rate.iter().zip(&self.footprint) {
                    delta[cell] += sign * nu * r * self.measure_ratio;
                }
                update.push(id, FieldTarget::Flux, delta);
            }
        }
        Ok(update)
    }
}
