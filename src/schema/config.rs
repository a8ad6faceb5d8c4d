//! Configuration types for reaction-diffusion scenarios.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Pattern;
use crate::compute::{
    Boundary, GridManifold, MomentExpansionScalarField, NegativePolicy, UpdateMode,
    max_stable_time_step,
};
use crate::error::KernelError;

fn default_spacing() -> f64 {
    1.0
}

fn default_mass() -> f64 {
    1.0
}

fn default_coefficient() -> f64 {
    1.0
}

/// Top-level scenario configuration.
///
/// Grids, embeddings and species are referenced by name. Reactions run in
/// the order they are listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Time step size.
    pub dt: f64,
    /// How reactions within one tick see each other's updates.
    #[serde(default)]
    pub update_mode: UpdateMode,
    pub grids: Vec<GridConfig>,
    #[serde(default)]
    pub embeddings: Vec<EmbeddingConfig>,
    pub species: Vec<SpeciesConfig>,
    #[serde(default)]
    pub reactions: Vec<ReactionConfig>,
}

impl Default for ScenarioConfig {
    /// Cytosol with a membrane along its lower edge.
    ///
    /// `A + B -> C` runs in the cytosol, and cytosolic `C` binds membrane
    /// receptors `R` to form `CR`.
    fn default() -> Self {
        Self {
            dt: 0.1,
            update_mode: UpdateMode::Sequential,
            grids: vec![
                GridConfig {
                    name: "cytosol".into(),
                    shape: vec![32, 32],
                    spacing: 1.0,
                    boundary: Boundary::Reflecting,
                },
                GridConfig {
                    name: "membrane".into(),
                    shape: vec![32],
                    spacing: 1.0,
                    boundary: Boundary::Reflecting,
                },
            ],
            embeddings: vec![EmbeddingConfig {
                name: "membrane_to_cytosol".into(),
                domain: "membrane".into(),
                range: "cytosol".into(),
                translation: Some(vec![0.0, 0.5]),
                rotation: None,
                projection: None,
            }],
            species: vec![
                SpeciesConfig {
                    initial: Pattern::GaussianBlob {
                        center: vec![0.5, 0.7],
                        radius: 0.3,
                        amplitude: 2.0,
                    },
                    ..SpeciesConfig::new("A", "cytosol", 1.0)
                },
                SpeciesConfig {
                    initial: Pattern::Uniform { value: 0.5 },
                    ..SpeciesConfig::new("B", "cytosol", 1.0)
                },
                SpeciesConfig::new("C", "cytosol", 0.5),
                SpeciesConfig {
                    initial: Pattern::Uniform { value: 1.0 },
                    ..SpeciesConfig::new("R", "membrane", 0.0)
                },
                SpeciesConfig::new("CR", "membrane", 0.1),
            ],
            reactions: vec![
                ReactionConfig {
                    name: "binding".into(),
                    reactants: vec![SpeciesTerm::new("A"), SpeciesTerm::new("B")],
                    products: vec![SpeciesTerm::new("C")],
                    rate_constant: 0.5,
                    embedding: None,
                },
                ReactionConfig {
                    name: "capture".into(),
                    reactants: vec![SpeciesTerm::new("C"), SpeciesTerm::new("R")],
                    products: vec![SpeciesTerm::new("CR")],
                    rate_constant: 1.0,
                    embedding: Some("membrane_to_cytosol".into()),
                },
            ],
        }
    }
}

/// A named regular grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub name: String,
    /// Cells per axis. Empty for a well-mixed compartment.
    pub shape: Vec<usize>,
    #[serde(default = "default_spacing")]
    pub spacing: f64,
    #[serde(default)]
    pub boundary: Boundary,
}

impl GridConfig {
    /// Build the grid this entry describes.
    pub fn build(&self) -> Result<GridManifold, KernelError> {
        if self.shape.is_empty() {
            Ok(GridManifold::compartment())
        } else {
            GridManifold::new(self.shape.clone(), self.spacing, self.boundary)
        }
    }
}

/// A named embedding of one grid into another.
///
/// Missing translation, rotation or projection default to zero, identity and
/// the canonical injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub name: String,
    /// Grid name of the lower-dimensional manifold.
    pub domain: String,
    /// Grid name of the manifold it sits in.
    pub range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Vec<Vec<f64>>>,
}

/// How a species' concentration is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Representation {
    /// One value per grid cell.
    #[default]
    Discretized,
    /// Truncated Fourier expansion. Needs a periodic grid.
    Moment { max_mode: usize },
}

/// A chemical species and its population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    #[serde(default = "default_mass")]
    pub mass: f64,
    /// Grid the population lives on.
    pub grid: String,
    #[serde(default)]
    pub diffusion: f64,
    #[serde(default)]
    pub representation: Representation,
    #[serde(default)]
    pub negative_policy: NegativePolicy,
    #[serde(default)]
    pub initial: Pattern,
}

impl SpeciesConfig {
    /// Unit-mass discretized species starting at zero.
    pub fn new(name: &str, grid: &str, diffusion: f64) -> Self {
        Self {
            name: name.into(),
            mass: 1.0,
            grid: grid.into(),
            diffusion,
            representation: Representation::Discretized,
            negative_policy: NegativePolicy::Allow,
            initial: Pattern::default(),
        }
    }
}

/// One side entry of a reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTerm {
    pub species: String,
    #[serde(default = "default_coefficient")]
    pub coefficient: f64,
}

impl SpeciesTerm {
    pub fn new(species: &str) -> Self {
        Self {
            species: species.into(),
            coefficient: 1.0,
        }
    }
}

/// A mass-action reaction.
///
/// Without an embedding every species must share one grid. With an embedding
/// each species must live on its domain (boundary side) or its range
/// (interior side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionConfig {
    pub name: String,
    #[serde(default)]
    pub reactants: Vec<SpeciesTerm>,
    #[serde(default)]
    pub products: Vec<SpeciesTerm>,
    pub rate_constant: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<String>,
}

impl ReactionConfig {
    pub fn terms(&self) -> impl Iterator<Item = &SpeciesTerm> {
        self.reactants.iter().chain(&self.products)
    }
}

impl ScenarioConfig {
    /// Parse and validate a JSON scenario.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON scenario file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn grid(&self, name: &str) -> Result<&GridConfig, ConfigError> {
        self.grids
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| ConfigError::UnknownGrid(name.into()))
    }

    pub fn embedding(&self, name: &str) -> Result<&EmbeddingConfig, ConfigError> {
        self.embeddings
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| ConfigError::UnknownEmbedding(name.into()))
    }

    pub fn species(&self, name: &str) -> Result<&SpeciesConfig, ConfigError> {
        self.species
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::UnknownSpecies(name.into()))
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(ConfigError::InvalidTimeStep(self.dt));
        }
        if self.species.is_empty() {
            return Err(ConfigError::NoSpecies);
        }

        check_unique("grid", self.grids.iter().map(|g| g.name.as_str()))?;
        check_unique("embedding", self.embeddings.iter().map(|e| e.name.as_str()))?;
        check_unique("species", self.species.iter().map(|s| s.name.as_str()))?;
        check_unique("reaction", self.reactions.iter().map(|r| r.name.as_str()))?;

        for grid in &self.grids {
            grid.build()?;
        }
        for embedding in &self.embeddings {
            self.grid(&embedding.domain)?;
            self.grid(&embedding.range)?;
        }

        for species in &self.species {
            let grid = self.grid(&species.grid)?.build()?;
            if species.diffusion > 0.0 {
                let limit = match species.representation {
                    Representation::Discretized => max_stable_time_step(&grid, species.diffusion),
                    Representation::Moment { max_mode } => {
                        MomentExpansionScalarField::zeros(Arc::new(grid), max_mode)?
                            .max_stable_time_step(species.diffusion)
                    }
                };
                if self.dt > limit {
                    return Err(ConfigError::UnstableTimeStep {
                        species: species.name.clone(),
                        dt: self.dt,
                        limit,
                    });
                }
            }
        }

        for reaction in &self.reactions {
            let sides = match &reaction.embedding {
                Some(name) => {
                    let embedding = self.embedding(name)?;
                    vec![embedding.domain.as_str(), embedding.range.as_str()]
                }
                None => Vec::new(),
            };
            for term in reaction.terms() {
                let species = self.species(&term.species)?;
                if !sides.is_empty() && !sides.contains(&species.grid.as_str()) {
                    return Err(ConfigError::SpeciesOffEmbedding {
                        reaction: reaction.name.clone(),
                        species: species.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_unique<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateName {
                kind,
                name: name.into(),
            });
        }
    }
    Ok(())
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),
    #[error("Scenario defines no species")]
    NoSpecies,
    #[error("Duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },
    #[error("Unknown grid '{0}'")]
    UnknownGrid(String),
    #[error("Unknown embedding '{0}'")]
    UnknownEmbedding(String),
    #[error("Unknown species '{0}'")]
    UnknownSpecies(String),
    #[error("Reaction '{reaction}': species '{species}' lives on neither side of its embedding")]
    SpeciesOffEmbedding { reaction: String, species: String },
    #[error("Species '{species}': dt={dt} exceeds explicit diffusion limit {limit:.3e}")]
    UnstableTimeStep { species: String, dt: f64, limit: f64 },
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),
}
