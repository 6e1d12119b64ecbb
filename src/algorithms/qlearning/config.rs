//! Configuration for Q-learning training.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::algorithms::{check_unit, SolverError};
use crate::model::EnvironmentConfig;

/// How the exploration probability evolves during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ExplorationSchedule {
    /// ε never changes.
    #[default]
    Constant,
    /// ε shrinks by `epsilon_decay` every episode and is kicked back up when an episode
    /// drags on.
    LinearDecay,
}

impl FromStr for ExplorationSchedule {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constant" => Ok(ExplorationSchedule::Constant),
            "decrease" | "linear-decay" => Ok(ExplorationSchedule::LinearDecay),
            other => Err(SolverError::UnknownExplorationSchedule(other.to_string())),
        }
    }
}

impl fmt::Display for ExplorationSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplorationSchedule::Constant => write!(f, "constant"),
            ExplorationSchedule::LinearDecay => write!(f, "linear-decay"),
        }
    }
}

/// Q-learning hyper-parameters and stopping rules.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QLearningConfig {
    // --- Update rule ---
    /// Learning rate α.
    pub alpha: f64,
    /// Discount factor γ.
    pub gamma: f64,
    /// Initial value of every unseen Q entry.
    pub default_q: f64,

    // --- Exploration ---
    /// Initial probability of a random move.
    pub epsilon: f64,
    pub schedule: ExplorationSchedule,
    /// Per-episode decrease of ε under [`ExplorationSchedule::LinearDecay`].
    pub epsilon_decay: f64,
    /// Episode length after which a decaying ε is kicked back up.
    pub kick_after_steps: usize,
    /// Value ε is kicked back to.
    pub kick_epsilon: f64,

    // --- Stopping ---
    /// Training may stop only after this many episodes.
    pub min_iterations: usize,
    /// Hard cap on episodes.
    pub max_iterations: usize,
    /// Episodes without a kick required before stopping.
    pub quiet_iterations: usize,
    /// Moves after which an episode is abandoned.
    pub max_episode_steps: usize,

    // --- Environment ---
    pub environment: EnvironmentConfig,
    /// Seed for exploration and environment randomness.
    pub seed: u64,
}

impl QLearningConfig {
    /// Rejects out-of-range rates and invalid environment settings.
    pub fn validate(&self) -> Result<(), SolverError> {
        check_unit("alpha", self.alpha)?;
        check_unit("gamma", self.gamma)?;
        check_unit("epsilon", self.epsilon)?;
        check_unit("kick_epsilon", self.kick_epsilon)?;
        if !(self.epsilon_decay >= 0.0 && self.epsilon_decay.is_finite()) {
            return Err(SolverError::InvalidParameter {
                name: "epsilon_decay",
                value: self.epsilon_decay,
            });
        }
        if !self.default_q.is_finite() {
            return Err(SolverError::InvalidParameter {
                name: "default_q",
                value: self.default_q,
            });
        }
        self.environment.validate()?;
        Ok(())
    }
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            default_q: 10.0,
            epsilon: 0.01,
            schedule: ExplorationSchedule::Constant,
            epsilon_decay: 0.001,
            kick_after_steps: 500,
            kick_epsilon: 0.1,
            min_iterations: 20_000,
            max_iterations: 80_000,
            quiet_iterations: 10_000,
            max_episode_steps: 10_000,
            environment: EnvironmentConfig::default(),
            seed: 0,
        }
    }
}
