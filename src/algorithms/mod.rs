//! Solvers over the grid-world decision process.
//!
//! - [`ValueIterationSolver`]: synchronous Bellman backups, one slice per inventory context.
//! - [`PolicyIterationSolver`]: exact policy evaluation by LU solve plus greedy improvement.
//! - [`QLearningSolver`]: epsilon-greedy temporal-difference learning over full augmented
//!   states, trained in the rollout simulator.
//!
//! Planning solvers implement [`PlanningSolver`]; every solver output implements
//! [`GreedyPolicy`] so it can be rolled out by [`crate::analysis::evaluate`].

mod error;
pub mod policy_iteration;
pub mod qlearning;
mod solution;
pub mod value_iteration;

#[cfg(test)]
mod tests;

use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::grid::{Action, CellMap};
use crate::model::{AugmentedState, InventoryContext, RewardTable, TransitionParams};

pub use error::SolverError;
pub use policy_iteration::PolicyIterationSolver;
pub use qlearning::{ExplorationSchedule, QLearningConfig, QLearningSolver, QTable, TrainingStats};
pub use solution::{ContextSolution, PlanningSolution};
pub use value_iteration::ValueIterationSolver;

/// Action per open position of one context.
pub type Policy = CellMap<Action>;

/// Value per open position of one context.
pub type ValueTable = CellMap<f64>;

/// Upper bounds on the work of one context solve.
///
/// Exhausting the budget is not an error: the solver returns its best result so far with
/// `converged = false`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolveBudget {
    /// Maximum sweeps (value iteration) or improvement rounds (policy iteration).
    pub max_iterations: usize,
    /// Wall-clock limit, checked between iterations.
    pub time_limit: Option<Duration>,
}

impl SolveBudget {
    pub const fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            time_limit: None,
        }
    }

    /// True once `iterations` or the elapsed time since `started` reach the limits.
    pub fn exhausted(&self, iterations: usize, started: Instant) -> bool {
        iterations >= self.max_iterations
            || self
                .time_limit
                .is_some_and(|limit| started.elapsed() >= limit)
    }
}

impl Default for SolveBudget {
    fn default() -> Self {
        Self::with_max_iterations(10_000)
    }
}

/// Parameters shared by value and policy iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanningConfig {
    /// Discount factor γ in `[0, 1]`.
    pub gamma: f64,
    /// Value iteration stops once the sup-norm change of a sweep drops below this.
    pub threshold: f64,
    /// Lookahead values within this distance of the best count as ties.
    pub tie_tolerance: f64,
    pub budget: SolveBudget,
    pub transition: TransitionParams,
    pub rewards: RewardTable,
}

impl PlanningConfig {
    /// Improvement rounds allowed to policy iteration by default.
    pub const POLICY_ROUNDS: usize = 500;

    /// Default configuration with the policy iteration round cap.
    pub fn policy_iteration() -> Self {
        Self {
            budget: SolveBudget::with_max_iterations(Self::POLICY_ROUNDS),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        check_unit("gamma", self.gamma)?;
        if !(self.threshold > 0.0 && self.threshold.is_finite()) {
            return Err(SolverError::InvalidParameter {
                name: "threshold",
                value: self.threshold,
            });
        }
        if !(self.tie_tolerance >= 0.0 && self.tie_tolerance.is_finite()) {
            return Err(SolverError::InvalidParameter {
                name: "tie_tolerance",
                value: self.tie_tolerance,
            });
        }
        self.transition.validate()?;
        self.rewards.validate()?;
        Ok(())
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            threshold: 1e-3,
            tie_tolerance: 1e-6,
            budget: SolveBudget::default(),
            transition: TransitionParams::default(),
            rewards: RewardTable::default(),
        }
    }
}

/// Rejects values outside `[0, 1]`.
pub(crate) fn check_unit(name: &'static str, value: f64) -> Result<(), SolverError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SolverError::InvalidParameter { name, value })
    }
}

/// A solver that produces one policy and value table per inventory context.
pub trait PlanningSolver {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Solves the slice of a single context.
    fn solve_context(&self, context: InventoryContext) -> Result<ContextSolution, SolverError>;

    /// Solves every relevant context.
    fn solve(&self) -> Result<PlanningSolution, SolverError> {
        let mut solution = PlanningSolution::default();
        for context in InventoryContext::all() {
            solution.insert(self.solve_context(context)?);
        }
        tracing::info!(
            solver = self.name(),
            contexts = solution.len(),
            converged = solution.all_converged(),
            "solve finished"
        );
        Ok(solution)
    }
}

/// Anything that picks an action for an augmented state.
pub trait GreedyPolicy {
    /// The action to take in `state`, or `None` if the policy has nothing for it.
    fn action(&self, state: &AugmentedState) -> Option<Action>;
}

/// Greedy choice over per-action lookahead values.
///
/// Returns the first action in [`Action::ALL`] order whose value is within `tolerance` of the
/// best, with that value. `None` entries are invalid actions and never chosen.
pub fn greedy_action(values: &[Option<f64>; 4], tolerance: f64) -> Option<(Action, f64)> {
    let best = values.iter().flatten().copied().reduce(f64::max)?;
    Action::ALL.iter().find_map(|a| {
        values[a.index()]
            .filter(|v| *v >= best - tolerance)
            .map(|v| (*a, v))
    })
}
