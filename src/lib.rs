//! treasure_mdp - solvers for a stochastic treasure-hunt grid world
//!
//! A grid of typed cells (walls, hazards, collectibles, teleporters, moving platforms) defines
//! a Markov decision process over positions augmented with inventory flags. The crate solves
//! it three ways over one shared transition model:
//!
//! - value iteration and policy iteration, one slice per inventory context,
//! - model-free Q-learning in a rollout simulator.

pub mod algorithms;
pub mod analysis;
pub mod grid;
pub mod model;

pub use algorithms::{
    GreedyPolicy, PlanningConfig, PlanningSolver, PolicyIterationSolver, QLearningConfig,
    QLearningSolver, SolverError, ValueIterationSolver,
};
pub use grid::{Action, CellType, GridWorld, Position};
pub use model::{AugmentedState, InventoryContext};
