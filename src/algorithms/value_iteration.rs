//! Value iteration over per-context slices.
//!
//! Each sweep computes
//!
//! ```text
//! V_{k+1}(p) = max over valid a of [ R(p, a) + γ · Σ P(t | p, a) · V_k(t) ]
//! ```
//!
//! into a fresh table, where `V_k(t)` is the slice value for an open cell and the constant
//! dead, hurt or won value otherwise. The solve stops when the sup-norm change of a sweep
//! drops below the threshold, or when the budget runs out.

use std::time::Instant;

use tracing::{debug, warn};

use super::{greedy_action, ContextSolution, PlanningConfig, PlanningSolver, Policy, SolverError};
use crate::grid::GridWorld;
use crate::model::{InventoryContext, SliceModel, TransitionModel};

/// Synchronous value iteration.
///
/// # Example
///
/// ```
/// use treasure_mdp::algorithms::{PlanningConfig, PlanningSolver, ValueIterationSolver};
/// use treasure_mdp::grid::{Action, GridWorld, Position};
/// use treasure_mdp::model::InventoryContext;
///
/// let grid: GridWorld = "TKS".parse().unwrap();
/// let solver = ValueIterationSolver::new(&grid, PlanningConfig::default()).unwrap();
/// let solution = solver.solve_context(InventoryContext::empty(true)).unwrap();
/// assert!(solution.converged);
/// assert_eq!(solution.policy.get(Position::new(2, 0)), Some(&Action::Left));
/// ```
#[derive(Debug, Clone)]
pub struct ValueIterationSolver<'a> {
    grid: &'a GridWorld,
    config: PlanningConfig,
}

impl<'a> ValueIterationSolver<'a> {
    /// Validates `config` and borrows `grid` for the lifetime of the solver.
    pub fn new(grid: &'a GridWorld, config: PlanningConfig) -> Result<Self, SolverError> {
        config.validate()?;
        Ok(Self { grid, config })
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    /// Builds the slice of `context` under this solver's model.
    pub fn slice(&self, context: InventoryContext) -> SliceModel {
        let model = TransitionModel::new(self.grid, &self.config.transition, &self.config.rewards);
        SliceModel::build(&model, context)
    }
}

/// One synchronous Bellman sweep. Returns the new values and the sup-norm change.
pub fn sweep(slice: &SliceModel, values: &[f64], gamma: f64) -> (Vec<f64>, f64) {
    let next: Vec<f64> = (0..slice.len())
        .map(|i| {
            slice
                .q_values(i, values, gamma)
                .into_iter()
                .flatten()
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .collect();
    let delta = next
        .iter()
        .zip(values)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    (next, delta)
}

/// Greedy policy over `values`, ties resolved in action priority order.
pub(crate) fn extract_policy(slice: &SliceModel, values: &[f64], gamma: f64, tolerance: f64) -> Policy {
    let (nb_line, nb_col) = slice.shape();
    let mut policy = Policy::new(nb_line, nb_col);
    for (i, position) in slice.positions().iter().enumerate() {
        if let Some((action, _)) = greedy_action(&slice.q_values(i, values, gamma), tolerance) {
            policy.set(*position, action);
        }
    }
    policy
}

impl PlanningSolver for ValueIterationSolver<'_> {
    fn name(&self) -> &'static str {
        "value-iteration"
    }

    fn solve_context(&self, context: InventoryContext) -> Result<ContextSolution, SolverError> {
        let slice = self.slice(context);
        let gamma = self.config.gamma;
        let started = Instant::now();

        let mut values = vec![0.0; slice.len()];
        let mut iterations = 0;
        let mut delta = f64::INFINITY;
        let mut converged = false;

        loop {
            if self.config.budget.exhausted(iterations, started) {
                warn!(
                    %context,
                    iterations,
                    delta,
                    "value iteration budget exhausted before convergence"
                );
                break;
            }
            let (next, change) = sweep(&slice, &values, gamma);
            values = next;
            delta = change;
            iterations += 1;
            debug!(%context, iterations, delta, "value iteration sweep");
            if delta < self.config.threshold {
                converged = true;
                break;
            }
        }

        Ok(ContextSolution {
            context,
            policy: extract_policy(&slice, &values, gamma, self.config.tie_tolerance),
            values: slice.to_table(&values),
            iterations,
            converged,
            delta,
        })
    }
}
