//! Probability constants of the transition model and rollout settings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::error::ModelError;
use super::reward::RewardTable;

/// Probabilities and bounds of the stochastic cells.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransitionParams {
    /// Chance of losing a health point when entering an Enemy cell without the sword.
    pub p_fight: f64,
    /// Chance of losing a health point when entering a Trap.
    pub p_hurt: f64,
    /// Chance of being sent back to Start when entering a Trap.
    pub p_reset: f64,
    /// Maximum number of relocations in one chain reaction.
    pub max_chain: usize,
}

impl TransitionParams {
    /// Checks every probability and the chain bound.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (name, value) in [
            ("p_fight", self.p_fight),
            ("p_hurt", self.p_hurt),
            ("p_reset", self.p_reset),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ModelError::InvalidProbability { name, value });
            }
        }
        if self.p_hurt + self.p_reset > 1.0 {
            return Err(ModelError::ProbabilityMassExceeded {
                p_hurt: self.p_hurt,
                p_reset: self.p_reset,
            });
        }
        if self.max_chain == 0 {
            return Err(ModelError::ZeroChainLength);
        }
        Ok(())
    }
}

impl Default for TransitionParams {
    fn default() -> Self {
        Self {
            p_fight: 0.3,
            p_hurt: 0.1,
            p_reset: 0.3,
            max_chain: 8,
        }
    }
}

/// Everything the rollout simulator needs besides the grid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvironmentConfig {
    pub transition: TransitionParams,
    pub rewards: RewardTable,
    /// Health points at the start of an episode. The agent is critical at 1.
    pub player_health: u32,
}

impl EnvironmentConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        self.transition.validate()?;
        self.rewards.validate()?;
        if self.player_health == 0 {
            return Err(ModelError::ZeroHealth);
        }
        Ok(())
    }

    /// Whether an agent with `health` points dies on its next health loss.
    pub fn is_critical(health: u32) -> bool {
        health <= 1
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            transition: TransitionParams::default(),
            rewards: RewardTable::default(),
            player_health: 1,
        }
    }
}
