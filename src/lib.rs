//! Reaction-diffusion - Spatial chemical kinetics on grids and membranes.
//!
//! Molecular populations live on regular grids as concentration fields and
//! diffuse. Reactions between them follow mass-action kinetics, either inside
//! one grid or across a lower-dimensional boundary embedded in it.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Scenario configuration and seed patterns
//! - `compute`: Manifolds, scalar fields, populations, reactions and the driver
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use reaction_diffusion::compute::{
//!     Boundary, DiscretizedScalarField, GridManifold, InteriorReaction, MolecularPopulation,
//!     Molecule, Participants, Populations, ReactionComplex, Simulation, Stoichiometry,
//! };
//!
//! let grid = Arc::new(GridManifold::new(vec![64, 64], 1.0, Boundary::Reflecting)?);
//! let mut populations = Populations::new();
//! let mut add = |name: &str, value: f64| -> Result<_, reaction_diffusion::KernelError> {
//!     let field = DiscretizedScalarField::from_fn(Arc::clone(&grid), |_| value);
//!     Ok(populations.insert(MolecularPopulation::new(Molecule::new(name, 1.0)?, field.into(), 0.2)?))
//! };
//! let a = add("A", 1.0)?;
//! let b = add("B", 1.0)?;
//! let c = add("C", 0.0)?;
//!
//! let binding = InteriorReaction::new(
//!     "A + B -> C",
//!     &populations,
//!     Participants::new(vec![a, b], vec![c]),
//!     Stoichiometry::new(vec![1.0, 1.0], vec![1.0]),
//!     0.5,
//! )?;
//! let complex = ReactionComplex::builder().reaction(binding).build();
//!
//! let mut simulation = Simulation::new(populations, complex, 0.1)?;
//! simulation.run(100)?;
//!
//! println!("Total amount after 100 steps: {}", simulation.stats().total_amount);
//! # Ok::<(), reaction_diffusion::KernelError>(())
//! ```

pub mod compute;
pub mod error;
pub mod schema;

// Re-export commonly used types
pub use compute::{Populations, ReactionComplex, Simulation, SimulationStats};
pub use error::KernelError;
pub use schema::{ConfigError, Pattern, ScenarioConfig};
