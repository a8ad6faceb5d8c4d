//! Reaction complexes - ordered sets of reactions stepped together.

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, check_time_step};

use super::{Populations, Reaction};

/// How reactions within one tick see each other's updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Each reaction reads the state left by the reactions before it.
    #[default]
    Sequential,
    /// Every reaction reads the tick-start state. Updates apply afterwards,
    /// in construction order.
    Snapshot,
}

/// Ordered, fixed collection of reactions.
///
/// Every call to [`step`](Self::step) runs each reaction exactly once, in
/// construction order.
#[derive(Debug)]
pub struct ReactionComplex {
    reactions: Vec<Box<dyn Reaction>>,
    mode: UpdateMode,
    steps: u64,
    time: f64,
}

impl ReactionComplex {
    pub fn new(reactions: Vec<Box<dyn Reaction>>, mode: UpdateMode) -> Self {
        Self {
            reactions,
            mode,
            steps: 0,
            time: 0.0,
        }
    }

    /// Start an empty complex and add reactions in execution order.
    pub fn builder() -> ReactionComplexBuilder {
        ReactionComplexBuilder {
            reactions: Vec::new(),
            mode: UpdateMode::default(),
        }
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    pub fn reactions(&self) -> &[Box<dyn Reaction>] {
        &self.reactions
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// Number of completed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Accumulated simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Check every reaction against an arena.
    pub fn check(&self, populations: &Populations) -> Result<(), KernelError> {
        self.reactions
            .iter()
            .try_for_each(|reaction| reaction.check(populations))
    }

    /// Advance every reaction by `dt`.
    pub fn step(&mut self, populations: &mut Populations, dt: f64) -> Result<(), KernelError> {
        self.react(populations, dt)?;
        self.advance(dt);
        Ok(())
    }

    /// Run every reaction once without touching the step counters.
    pub(crate) fn react(&self, populations: &mut Populations, dt: f64) -> Result<(), KernelError> {
        check_time_step(dt)?;
        self.check(populations)?;

        match self.mode {
            UpdateMode::Sequential => {
                for reaction in &self.reactions {
                    reaction.step(populations, dt)?;
                }
            }
            UpdateMode::Snapshot => {
                let updates = self
                    .reactions
                    .iter()
                    .map(|reaction| reaction.compute(populations, dt))
                    .collect::<Result<Vec<_>, _>>()?;
                for update in &updates {
                    update.apply(populations)?;
                }
            }
        }
        Ok(())
    }

    /// Record one completed step of `dt`.
    pub(crate) fn advance(&mut self, dt: f64) {
        self.steps += 1;
        self.time += dt;
    }
}

/// Builder for [`ReactionComplex`].
pub struct ReactionComplexBuilder {
    reactions: Vec<Box<dyn Reaction>>,
    mode: UpdateMode,
}

impl ReactionComplexBuilder {
    /// Append a reaction. Reactions run in the order they are added.
    pub fn reaction<R: Reaction + 'static>(mut self, reaction: R) -> Self {
        self.reactions.push(Box::new(reaction));
        self
    }

    pub fn mode(mut self, mode: UpdateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> ReactionComplex {
        ReactionComplex::new(self.reactions, self.mode)
    }
}
