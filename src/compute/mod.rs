//! Compute module - Manifolds, fields, populations and reactions.

mod complex;
mod discretized;
mod embedding;
mod field;
mod manifold;
mod molecule;
mod moment;
mod population;
mod reaction;
mod simulation;
mod stencil;

pub use complex::*;
pub use discretized::*;
pub use embedding::*;
pub use field::*;
pub use manifold::*;
pub use molecule::*;
pub use moment::*;
pub use population::*;
pub use reaction::*;
pub use simulation::*;
pub use stencil::*;
