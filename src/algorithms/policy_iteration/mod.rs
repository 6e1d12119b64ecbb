//! Policy iteration with exact policy evaluation.
//!
//! Each round solves the linear system of the current policy (see [`linear`]) and then
//! improves every position greedily. An action is only replaced when the best alternative
//! beats it by more than the tie tolerance, which guarantees termination. The returned policy
//! is the priority-order greedy extraction over the final values, the same extraction value
//! iteration uses.

mod linear;

use std::time::Instant;

use tracing::{debug, warn};

use super::value_iteration::extract_policy;
use super::{greedy_action, ContextSolution, PlanningConfig, PlanningSolver, SolverError};
use crate::grid::{Action, GridWorld};
use crate::model::{InventoryContext, SliceModel, TransitionModel};

/// Policy iteration solver.
///
/// # Example
///
/// ```
/// use treasure_mdp::algorithms::{PlanningConfig, PlanningSolver, PolicyIterationSolver};
/// use treasure_mdp::grid::GridWorld;
///
/// let grid: GridWorld = "TKB\nBBS".parse().unwrap();
/// let solver = PolicyIterationSolver::new(&grid, PlanningConfig::policy_iteration()).unwrap();
/// let solution = solver.solve().unwrap();
/// assert_eq!(solution.len(), 12);
/// assert!(solution.all_converged());
/// ```
#[derive(Debug, Clone)]
pub struct PolicyIterationSolver<'a> {
    grid: &'a GridWorld,
    config: PlanningConfig,
}

impl<'a> PolicyIterationSolver<'a> {
    /// Validates `config` and borrows `grid` for the lifetime of the solver.
    pub fn new(grid: &'a GridWorld, config: PlanningConfig) -> Result<Self, SolverError> {
        config.validate()?;
        Ok(Self { grid, config })
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    /// First valid action of every position, in priority order.
    fn initial_policy(slice: &SliceModel) -> Vec<Action> {
        (0..slice.len())
            .map(|i| {
                Action::ALL
                    .into_iter()
                    .find(|a| slice.transition(i, *a).is_some())
                    .unwrap_or(Action::Up)
            })
            .collect()
    }

    fn evaluate(
        &self,
        slice: &SliceModel,
        policy: &[Action],
        context: InventoryContext,
    ) -> Result<Vec<f64>, SolverError> {
        linear::evaluate(slice, policy, self.config.gamma)
            .map_err(|detail| SolverError::SingularSystem { context, detail })
    }

    /// Greedy improvement step. Returns the number of positions whose action changed.
    fn improve(&self, slice: &SliceModel, policy: &mut [Action], values: &[f64]) -> usize {
        let tolerance = self.config.tie_tolerance;
        let mut changed = 0;
        for (i, action) in policy.iter_mut().enumerate() {
            let q = slice.q_values(i, values, self.config.gamma);
            let Some((best, best_value)) = greedy_action(&q, tolerance) else {
                continue;
            };
            let current = q[action.index()].unwrap_or(f64::NEG_INFINITY);
            if best_value > current + tolerance {
                *action = best;
                changed += 1;
            }
        }
        changed
    }
}

impl PlanningSolver for PolicyIterationSolver<'_> {
    fn name(&self) -> &'static str {
        "policy-iteration"
    }

    fn solve_context(&self, context: InventoryContext) -> Result<ContextSolution, SolverError> {
        let model = TransitionModel::new(self.grid, &self.config.transition, &self.config.rewards);
        let slice = SliceModel::build(&model, context);
        let started = Instant::now();

        let mut policy = Self::initial_policy(&slice);
        let mut values = self.evaluate(&slice, &policy, context)?;
        let mut rounds = 0;
        let mut converged = false;

        loop {
            rounds += 1;
            let changed = self.improve(&slice, &mut policy, &values);
            debug!(%context, rounds, changed, "policy iteration round");
            if changed == 0 {
                converged = true;
                break;
            }
            if self.config.budget.exhausted(rounds, started) {
                warn!(
                    %context,
                    rounds,
                    changed,
                    "policy iteration budget exhausted before a stable policy"
                );
                break;
            }
            values = self.evaluate(&slice, &policy, context)?;
        }

        Ok(ContextSolution {
            context,
            policy: extract_policy(&slice, &values, self.config.gamma, self.config.tie_tolerance),
            values: slice.to_table(&values),
            iterations: rounds,
            converged,
            delta: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::SolveBudget;
    use crate::grid::Position;

    #[test]
    fn corridor_policy() {
        let grid: GridWorld = "KBBS".parse().unwrap();
        let solver = PolicyIterationSolver::new(&grid, PlanningConfig::policy_iteration()).unwrap();
        let solution = solver.solve_context(InventoryContext::empty(true)).unwrap();
        assert!(solution.converged);
        for x in 1..4 {
            assert_eq!(solution.policy.get(Position::new(x, 0)), Some(&Action::Left));
        }
    }

    #[test]
    fn values_satisfy_bellman_equation() {
        let grid: GridWorld = "TKB\nBCS".parse().unwrap();
        let config = PlanningConfig::policy_iteration();
        let solver = PolicyIterationSolver::new(&grid, config.clone()).unwrap();
        let context = InventoryContext::empty(false).with_key();
        let solution = solver.solve_context(context).unwrap();

        let model = TransitionModel::new(&grid, &config.transition, &config.rewards);
        let slice = SliceModel::build(&model, context);
        let values = slice.values_from(&solution.values);
        for i in 0..slice.len() {
            let best = slice
                .q_values(i, &values, config.gamma)
                .into_iter()
                .flatten()
                .fold(f64::NEG_INFINITY, f64::max);
            assert!((best - values[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn undiscounted_loop_reports_singular_system() {
        let grid: GridWorld = "SB".parse().unwrap();
        let config = PlanningConfig {
            gamma: 1.0,
            ..PlanningConfig::policy_iteration()
        };
        let solver = PolicyIterationSolver::new(&grid, config).unwrap();
        let context = InventoryContext::empty(false);
        match solver.solve_context(context) {
            Err(SolverError::SingularSystem { context: c, .. }) => assert_eq!(c, context),
            other => panic!("expected a singular system, got {:?}", other),
        }
    }

    #[test]
    fn round_cap_stops_improvement() {
        let grid: GridWorld = "S\nB\nB\nB\nK".parse().unwrap();
        let config = PlanningConfig {
            budget: SolveBudget::with_max_iterations(1),
            ..PlanningConfig::policy_iteration()
        };
        let solver = PolicyIterationSolver::new(&grid, config).unwrap();
        let solution = solver.solve_context(InventoryContext::empty(true)).unwrap();
        assert_eq!(solution.iterations, 1);
        assert!(!solution.converged);
    }
}
