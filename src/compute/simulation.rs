//! Simulation driver - builds a scenario and steps it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{KernelError, check_time_step};
use crate::schema::{ConfigError, Representation, ScenarioConfig, SpeciesTerm};

use super::{
    BoundaryReaction, DiscretizedScalarField, Embedding, Field, GridManifold, InteriorReaction,
    Manifold, MolecularPopulation, Molecule, MomentExpansionScalarField, Participants,
    PopulationId, Populations, Reaction, ReactionComplex, ScalarField, Stoichiometry,
    identity_matrix,
};

/// Populations plus the reactions acting on them.
///
/// One step is a Lie splitting: every reaction runs first, then every
/// population integrates diffusion and accumulated boundary flux.
#[derive(Debug)]
pub struct Simulation {
    populations: Populations,
    complex: ReactionComplex,
    dt: f64,
    time: f64,
    steps: u64,
}

impl Simulation {
    /// Pair populations with the reactions acting on them.
    ///
    /// Fails unless every reaction's participants are present in
    /// `populations` on the grids the reaction was built against.
    pub fn new(
        populations: Populations,
        complex: ReactionComplex,
        dt: f64,
    ) -> Result<Self, KernelError> {
        check_time_step(dt)?;
        complex.check(&populations)?;
        Ok(Self {
            populations,
            complex,
            dt,
            time: 0.0,
            steps: 0,
        })
    }

    /// Build grids, populations and reactions from a validated scenario.
    pub fn from_config(config: &ScenarioConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut grids: HashMap<&str, Arc<GridManifold>> = HashMap::new();
        for grid in &config.grids {
            grids.insert(grid.name.as_str(), Arc::new(grid.build()?));
        }
        let lookup_grid = |name: &str| {
            grids
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownGrid(name.into()))
        };

        let mut populations = Populations::new();
        let mut ids: HashMap<&str, PopulationId> = HashMap::new();
        for species in &config.species {
            let grid = lookup_grid(&species.grid)?;
            let values = species.initial.generate(&grid)?;
            let concentration: Field = match species.representation {
                Representation::Discretized => {
                    DiscretizedScalarField::from_values(grid, values)?.into()
                }
                Representation::Moment { max_mode } => {
                    let sampler = Arc::clone(&grid);
                    MomentExpansionScalarField::from_fn(grid, max_mode, |p| {
                        sampler.locate(p).map(|i| values[i]).unwrap_or(0.0)
                    })?
                    .into()
                }
            };
            let population = MolecularPopulation::new(
                Molecule::new(species.name.as_str(), species.mass)?,
                concentration,
                species.diffusion,
            )?
            .with_negative_policy(species.negative_policy);
            ids.insert(species.name.as_str(), populations.insert(population));
        }
        let id = |term: &SpeciesTerm| {
            ids.get(term.species.as_str())
                .copied()
                .ok_or_else(|| ConfigError::UnknownSpecies(term.species.clone()))
        };

        let mut reactions: Vec<Box<dyn Reaction>> = Vec::with_capacity(config.reactions.len());
        for reaction in &config.reactions {
            let Some(embedding_name) = &reaction.embedding else {
                let participants = Participants::new(
                    reaction.reactants.iter().map(id).collect::<Result<_, _>>()?,
                    reaction.products.iter().map(id).collect::<Result<_, _>>()?,
                );
                let stoichiometry = Stoichiometry::new(
                    reaction.reactants.iter().map(|t| t.coefficient).collect(),
                    reaction.products.iter().map(|t| t.coefficient).collect(),
                );
                reactions.push(Box::new(InteriorReaction::new(
                    reaction.name.as_str(),
                    &populations,
                    participants,
                    stoichiometry,
                    reaction.rate_constant,
                )?));
                continue;
            };

            let mapping = config.embedding(embedding_name)?;
            let domain: Arc<dyn Manifold> = lookup_grid(&mapping.domain)?;
            let range: Arc<dyn Manifold> = lookup_grid(&mapping.range)?;
            let dim = range.dimension();
            let translation = mapping.translation.clone().unwrap_or_else(|| vec![0.0; dim]);
            let rotation = mapping.rotation.clone().unwrap_or_else(|| identity_matrix(dim));
            let embedding = match &mapping.projection {
                Some(projection) => Embedding::with_projection(
                    domain,
                    range,
                    translation,
                    rotation,
                    projection.clone(),
                )?,
                None => Embedding::new(domain, range, translation, rotation)?,
            };

            // Interior species live on the range grid, boundary species on the domain
            let on_interior = |term: &SpeciesTerm| -> Result<bool, ConfigError> {
                Ok(config.species(&term.species)?.grid == mapping.range)
            };
            let mut interior = Participants::new(Vec::new(), Vec::new());
            let mut boundary = Participants::new(Vec::new(), Vec::new());
            let mut coefficients = [(Vec::new(), Vec::new()), (Vec::new(), Vec::new())];
            for term in &reaction.reactants {
                let side = if on_interior(term)? { 0 } else { 1 };
                let target = if side == 0 { &mut interior } else { &mut boundary };
                target.reactants.push(id(term)?);
                coefficients[side].0.push(term.coefficient);
            }
            for term in &reaction.products {
                let side = if on_interior(term)? { 0 } else { 1 };
                let target = if side == 0 { &mut interior } else { &mut boundary };
                target.products.push(id(term)?);
                coefficients[side].1.push(term.coefficient);
            }
            let [(mut reactants, mut products), (boundary_reactants, boundary_products)] =
                coefficients;
            reactants.extend(boundary_reactants);
            products.extend(boundary_products);

            reactions.push(Box::new(BoundaryReaction::new(
                reaction.name.as_str(),
                &populations,
                embedding,
                interior,
                boundary,
                Stoichiometry::new(reactants, products),
                reaction.rate_constant,
            )?));
        }

        log::info!(
            "Built simulation: {} grids, {} populations, {} reactions ({:?})",
            grids.len(),
            populations.len(),
            reactions.len(),
            config.update_mode
        );

        let complex = ReactionComplex::new(reactions, config.update_mode);
        Ok(Self::new(populations, complex, config.dt)?)
    }

    /// Advance one step of `dt`.
    pub fn step(&mut self) -> Result<(), KernelError> {
        self.complex.react(&mut self.populations, self.dt)?;
        self.populations.step_all(self.dt)?;
        self.complex.advance(self.dt);
        self.steps += 1;
        self.time += self.dt;

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "step {} t={:.4} total amount={:.6}",
                self.steps,
                self.time,
                self.populations.total_amount()
            );
        }
        Ok(())
    }

    /// Advance `steps` steps.
    pub fn run(&mut self, steps: u64) -> Result<(), KernelError> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    pub fn populations(&self) -> &Populations {
        &self.populations
    }

    pub fn complex(&self) -> &ReactionComplex {
        &self.complex
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn stats(&self) -> SimulationStats {
        SimulationStats::from_simulation(self)
    }
}

/// Per-species summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesStats {
    pub name: String,
    /// Integral of concentration over the grid.
    pub amount: f64,
    /// Smallest cell concentration.
    pub min: f64,
    /// Largest cell concentration.
    pub max: f64,
}

/// Snapshot of a simulation's state.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationStats {
    pub time: f64,
    pub steps: u64,
    pub species: Vec<SpeciesStats>,
    /// Sum of every species' amount.
    pub total_amount: f64,
}

impl SimulationStats {
    pub fn from_simulation(simulation: &Simulation) -> Self {
        let species: Vec<SpeciesStats> = simulation
            .populations
            .iter()
            .map(|(_, population)| {
                let values = population.concentration().nodal_values();
                SpeciesStats {
                    name: population.molecule().name().to_string(),
                    amount: population.total_amount(),
                    min: values.iter().cloned().fold(f64::INFINITY, f64::min),
                    max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                }
            })
            .collect();
        let total_amount = species.iter().map(|s| s.amount).sum();

        Self {
            time: simulation.time,
            steps: simulation.steps,
            species,
            total_amount,
        }
    }

    pub fn get(&self, name: &str) -> Option<&SpeciesStats> {
        self.species.iter().find(|s| s.name == name)
    }
}
