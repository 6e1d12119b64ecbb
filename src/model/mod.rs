//! Environment model: augmented states, rewards, transitions and the rollout simulator.
//!
//! [`TransitionModel`] and [`RewardTable`] are the single source of dynamics for all three
//! solvers. Planning solvers consume them through per-context [`SliceModel`]s; Q-learning
//! samples them through [`GridEnvironment`].

mod config;
mod environment;
mod error;
mod reward;
mod slice;
mod state;
mod transition;

pub use config::{EnvironmentConfig, TransitionParams};
pub use environment::{EpisodeStatus, GridEnvironment, Hop, StepResult};
pub use error::ModelError;
pub use reward::{ContextRewards, RewardTable, DEFAULT_STEP_REWARD};
pub use slice::{SliceModel, SliceTarget, SliceTerm, SliceTransition};
pub use state::{AugmentedState, InventoryContext};
pub use transition::{ArrivalEffect, Outcome, Successor, Transition, TransitionModel};
