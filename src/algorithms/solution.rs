//! Results of the planning solvers.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{GreedyPolicy, Policy, ValueTable};
use crate::grid::Action;
use crate::model::{AugmentedState, InventoryContext};

/// Policy and values of one inventory context.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContextSolution {
    pub context: InventoryContext,
    pub policy: Policy,
    pub values: ValueTable,
    /// Sweeps (value iteration) or improvement rounds (policy iteration) performed.
    pub iterations: usize,
    /// False when the solve stopped on its budget.
    pub converged: bool,
    /// Sup-norm change of the last sweep; 0 for policy iteration.
    pub delta: f64,
}

/// One [`ContextSolution`] per solved context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanningSolution {
    slices: BTreeMap<InventoryContext, ContextSolution>,
}

impl PlanningSolution {
    pub fn insert(&mut self, solution: ContextSolution) {
        self.slices.insert(solution.context, solution);
    }

    pub fn get(&self, context: &InventoryContext) -> Option<&ContextSolution> {
        self.slices.get(context)
    }

    pub fn policy(&self, context: &InventoryContext) -> Option<&Policy> {
        self.get(context).map(|s| &s.policy)
    }

    /// Value of an augmented state, looked up in its context's slice.
    pub fn value(&self, state: &AugmentedState) -> Option<f64> {
        self.get(&state.inventory)?.values.get(state.position).copied()
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn all_converged(&self) -> bool {
        self.slices.values().all(|s| s.converged)
    }

    /// Solutions in context order.
    pub fn iter(&self) -> impl Iterator<Item = &ContextSolution> {
        self.slices.values()
    }
}

impl GreedyPolicy for PlanningSolution {
    fn action(&self, state: &AugmentedState) -> Option<Action> {
        self.policy(&state.inventory)?.get(state.position).copied()
    }
}
