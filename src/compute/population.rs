//! Molecular populations and the arena that owns them.
//!
//! A population exclusively owns its concentration and flux fields.
//! Reactions refer to populations through [`PopulationId`] handles issued by
//! [`Populations`], so every field has exactly one owner and the stepping
//! code receives mutable access through a single `&mut Populations`.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, check_time_step};

use super::field::check_grids;
use super::{Field, GridManifold, Molecule, ScalarField};

/// What a population does with negative concentrations after a step.
///
/// Clamping is a modeling choice: it keeps concentrations physical at the
/// cost of exact amount conservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NegativePolicy {
    #[default]
    Allow,
    Clamp,
}

/// Spatial distribution of one chemical species.
#[derive(Debug, Clone)]
pub struct MolecularPopulation {
    molecule: Molecule,
    concentration: Field,
    /// Net boundary exchange rate accumulated since the last step.
    flux: Field,
    diffusion: f64,
    negative_policy: NegativePolicy,
}

impl MolecularPopulation {
    /// Create a population with a zero flux field of the same representation.
    pub fn new(molecule: Molecule, concentration: Field, diffusion: f64) -> Result<Self, KernelError> {
        let flux = concentration.zeros_like();
        Self::with_flux(molecule, concentration, flux, diffusion)
    }

    /// Create a population with an explicit flux field.
    pub fn with_flux(
        molecule: Molecule,
        concentration: Field,
        flux: Field,
        diffusion: f64,
    ) -> Result<Self, KernelError> {
        if !(diffusion >= 0.0 && diffusion.is_finite()) {
            return Err(KernelError::InvalidDiffusion(diffusion));
        }
        check_grids(concentration.grid(), flux.grid())?;
        if concentration.kind() != flux.kind() || concentration.len() != flux.len() {
            return Err(KernelError::IncompatibleField(format!(
                "flux ({}) does not match concentration ({})",
                flux.kind(),
                concentration.kind()
            )));
        }
        Ok(Self {
            molecule,
            concentration,
            flux,
            diffusion,
            negative_policy: NegativePolicy::Allow,
        })
    }

    /// Set the negative-concentration policy.
    pub fn with_negative_policy(mut self, policy: NegativePolicy) -> Self {
        self.negative_policy = policy;
        self
    }

    pub fn molecule(&self) -> &Molecule {
        &self.molecule
    }

    pub fn concentration(&self) -> &Field {
        &self.concentration
    }

    pub fn flux(&self) -> &Field {
        &self.flux
    }

    /// Add a per-cell increment to the concentration.
    ///
    /// Fields are never replaced, so the population stays on the grid it was
    /// created with.
    pub fn accumulate_concentration(&mut self, delta: &[f64]) -> Result<(), KernelError> {
        self.concentration.accumulate_nodal(delta)
    }

    /// Add a per-cell rate to the flux integrated by the next step.
    pub fn accumulate_flux(&mut self, delta: &[f64]) -> Result<(), KernelError> {
        self.flux.accumulate_nodal(delta)
    }

    pub fn diffusion(&self) -> f64 {
        self.diffusion
    }

    pub fn grid(&self) -> &GridManifold {
        self.concentration.grid()
    }

    /// Total amount of the species (integral of concentration).
    pub fn total_amount(&self) -> f64 {
        self.concentration.total()
    }

    /// Advance transport by `dt`: `c += dt (D Δc + flux)`, then clear the flux.
    pub fn step(&mut self, dt: f64) -> Result<(), KernelError> {
        check_time_step(dt)?;

        if self.diffusion > 0.0 {
            let limit = self.concentration.max_stable_time_step(self.diffusion);
            if dt > limit {
                log::warn!(
                    "{}: dt={} exceeds explicit diffusion limit {:.3e}",
                    self.molecule.name(),
                    dt,
                    limit
                );
            }
        }

        self.concentration.diffuse(self.diffusion, dt);

        let mut influx = self.flux.nodal_values();
        for v in &mut influx {
            *v *= dt;
        }
        self.concentration.accumulate_nodal(&influx)?;
        self.flux = self.flux.zeros_like();

        if self.negative_policy == NegativePolicy::Clamp {
            self.clamp_negative()?;
        }
        Ok(())
    }

    fn clamp_negative(&mut self) -> Result<(), KernelError> {
        let correction: Vec<f64> = self
            .concentration
            .nodal_values()
            .iter()
            .map(|&c| if c < 0.0 { -c } else { 0.0 })
            .collect();
        let clamped = correction.iter().filter(|&&c| c > 0.0).count();
        if clamped > 0 {
            log::warn!(
                "{}: clamped {} negative concentrations",
                self.molecule.name(),
                clamped
            );
            self.concentration.accumulate_nodal(&correction)?;
        }
        Ok(())
    }
}

/// Handle to a population inside [`Populations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopulationId(usize);

impl PopulationId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena owning every population of a simulation.
#[derive(Debug, Clone, Default)]
pub struct Populations {
    entries: Vec<MolecularPopulation>,
}

impl Populations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a population and return its handle.
    pub fn insert(&mut self, population: MolecularPopulation) -> PopulationId {
        self.entries.push(population);
        PopulationId(self.entries.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate a handle.
    pub fn check(&self, id: PopulationId) -> Result<(), KernelError> {
        if id.0 < self.entries.len() {
            Ok(())
        } else {
            Err(KernelError::UnknownPopulation(id.0))
        }
    }

    pub fn get(&self, id: PopulationId) -> Result<&MolecularPopulation, KernelError> {
        self.entries
            .get(id.0)
            .ok_or(KernelError::UnknownPopulation(id.0))
    }

    pub fn get_mut(&mut self, id: PopulationId) -> Result<&mut MolecularPopulation, KernelError> {
        self.entries
            .get_mut(id.0)
            .ok_or(KernelError::UnknownPopulation(id.0))
    }

    /// Handle of the first population carrying a molecule with this name.
    pub fn find(&self, name: &str) -> Option<PopulationId> {
        self.entries
            .iter()
            .position(|p| p.molecule().name() == name)
            .map(PopulationId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PopulationId, &MolecularPopulation)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, p)| (PopulationId(i), p))
    }

    /// Step transport of every population.
    ///
    /// Populations own disjoint fields, so they are stepped in parallel on
    /// native targets.
    pub fn step_all(&mut self, dt: f64) -> Result<(), KernelError> {
        check_time_step(dt)?;

        #[cfg(not(target_arch = "wasm32"))]
        {
            self.entries
                .par_iter_mut()
                .try_for_each(|population| population.step(dt))
        }

        #[cfg(target_arch = "wasm32")]
        {
            self.entries
                .iter_mut()
                .try_for_each(|population| population.step(dt))
        }
    }

    /// Total amount across all populations.
    pub fn total_amount(&self) -> f64 {
        self.entries.iter().map(|p| p.total_amount()).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::compute::{Boundary, DiscretizedScalarField, MomentExpansionScalarField};

    fn grid() -> Arc<GridManifold> {
        Arc::new(GridManifold::new(vec![8, 8], 1.0, Boundary::Reflecting).unwrap())
    }

    fn population(diffusion: f64) -> MolecularPopulation {
        let field = DiscretizedScalarField::from_fn(grid(), |p| if p[0] < 4.0 { 1.0 } else { 0.0 });
        MolecularPopulation::new(Molecule::new("A", 1.0).unwrap(), field.into(), diffusion).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        let mut p = population(0.1);
        assert_eq!(p.step(0.0), Err(KernelError::InvalidTimeStep(0.0)));
        assert_eq!(p.step(-0.5), Err(KernelError::InvalidTimeStep(-0.5)));
        assert!(p.step(f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_negative_diffusion() {
        let field = DiscretizedScalarField::zeros(grid());
        assert_eq!(
            MolecularPopulation::new(Molecule::new("A", 1.0).unwrap(), field.into(), -1.0).err(),
            Some(KernelError::InvalidDiffusion(-1.0))
        );
    }

    #[test]
    fn test_flux_must_match_concentration() {
        let periodic = Arc::new(GridManifold::new(vec![8, 8], 1.0, Boundary::Periodic).unwrap());
        let c = DiscretizedScalarField::zeros(Arc::clone(&periodic));
        let f = MomentExpansionScalarField::zeros(periodic, 2).unwrap();
        let result = MolecularPopulation::with_flux(
            Molecule::new("A", 1.0).unwrap(),
            c.into(),
            f.into(),
            0.0,
        );
        assert!(matches!(result, Err(KernelError::IncompatibleField(_))));
    }

    #[test]
    fn test_step_conserves_amount() {
        let mut p = population(0.2);
        let before = p.total_amount();
        for _ in 0..20 {
            p.step(0.5).unwrap();
        }
        assert!((p.total_amount() - before).abs() < 1e-10);
    }

    #[test]
    fn test_flux_is_integrated_then_cleared() {
        let mut p = population(0.0);
        let mut rate = vec![0.0; 64];
        rate[9] = 2.0;
        p.accumulate_flux(&rate).unwrap();
        let before = p.concentration().get(9).unwrap();
        p.step(0.25).unwrap();
        assert!((p.concentration().get(9).unwrap() - before - 0.5).abs() < 1e-12);
        assert_eq!(p.flux().get(9).unwrap(), 0.0);
    }

    #[test]
    fn test_accumulate_keeps_grid() {
        let mut p = population(0.0);
        let before = p.concentration().nodal_values();
        assert_eq!(
            p.accumulate_concentration(&[1.0; 16]),
            Err(KernelError::DimensionMismatch {
                expected: 64,
                actual: 16
            })
        );
        assert!(p.accumulate_flux(&[1.0; 65]).is_err());
        assert_eq!(p.concentration().nodal_values(), before);
        assert_eq!(p.grid().shape(), &[8, 8]);
    }

    #[test]
    fn test_clamp_policy() {
        let mut p = population(0.0).with_negative_policy(NegativePolicy::Clamp);
        let mut rate = vec![0.0; 64];
        rate[60] = -10.0;
        p.accumulate_flux(&rate).unwrap();
        p.step(1.0).unwrap();
        assert_eq!(p.concentration().get(60).unwrap(), 0.0);
    }

    #[test]
    fn test_arena_handles() {
        let mut pops = Populations::new();
        let a = pops.insert(population(0.1));
        assert_eq!(a.index(), 0);
        assert_eq!(pops.find("A"), Some(a));
        assert_eq!(pops.find("B"), None);
        assert!(pops.check(PopulationId(3)).is_err());
        assert!(pops.get(a).is_ok());
    }

    #[test]
    fn test_step_all() {
        let mut pops = Populations::new();
        pops.insert(population(0.1));
        pops.insert(population(0.2));
        let before = pops.total_amount();
        pops.step_all(0.5).unwrap();
        assert!((pops.total_amount() - before).abs() < 1e-10);
        assert!(pops.step_all(0.0).is_err());
    }
}
