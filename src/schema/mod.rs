//! Schema module - Scenario configuration and seed patterns.

mod config;
mod seed;

pub use config::*;
pub use seed::*;
