//! Tabular action values over augmented states.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::algorithms::{greedy_action, GreedyPolicy, Policy};
use crate::grid::{Action, GridWorld};
use crate::model::{AugmentedState, InventoryContext};

/// `Q(s, a)` for every visited state, `default_q` elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    default_q: f64,
    values: HashMap<AugmentedState, [f64; 4]>,
}

impl QTable {
    pub fn new(default_q: f64) -> Self {
        Self {
            default_q,
            values: HashMap::new(),
        }
    }

    /// The action values of `state`.
    pub fn row(&self, state: &AugmentedState) -> [f64; 4] {
        self.values
            .get(state)
            .copied()
            .unwrap_or([self.default_q; 4])
    }

    pub fn get(&self, state: &AugmentedState, action: Action) -> f64 {
        self.row(state)[action.index()]
    }

    /// `max_a Q(state, a)`.
    pub fn max(&self, state: &AugmentedState) -> f64 {
        self.row(state).into_iter().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Moves `Q(state, action)` a fraction `alpha` toward `target`.
    pub fn update(&mut self, state: AugmentedState, action: Action, target: f64, alpha: f64) {
        let default_q = self.default_q;
        let q = &mut self.values.entry(state).or_insert([default_q; 4])[action.index()];
        *q += alpha * (target - *q);
    }

    /// Number of states with an entry.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// States with an entry, in arbitrary order.
    pub fn states(&self) -> impl Iterator<Item = &AugmentedState> + '_ {
        self.values.keys()
    }

    /// Best action, ties broken in priority order.
    pub fn greedy(&self, state: &AugmentedState) -> Action {
        let row = self.row(state).map(Some);
        greedy_action(&row, 0.0)
            .map(|(a, _)| a)
            .unwrap_or(Action::Up)
    }

    /// Best action, ties broken uniformly at random.
    pub fn greedy_random<R: Rng>(&self, state: &AugmentedState, rng: &mut R) -> Action {
        let row = self.row(state);
        let best = row.into_iter().fold(f64::NEG_INFINITY, f64::max);
        let candidates: Vec<Action> = Action::ALL
            .into_iter()
            .filter(|a| row[a.index()] == best)
            .collect();
        candidates.choose(rng).copied().unwrap_or(Action::Up)
    }

    /// Greedy action on every open position of `grid` for a fixed `context`.
    pub fn policy_for(&self, grid: &GridWorld, context: InventoryContext) -> Policy {
        let mut policy = Policy::for_grid(grid);
        for position in grid.open_positions() {
            policy.set(position, self.greedy(&AugmentedState::new(position, context)));
        }
        policy
    }
}

impl GreedyPolicy for QTable {
    fn action(&self, state: &AugmentedState) -> Option<Action> {
        Some(self.greedy(state))
    }
}
