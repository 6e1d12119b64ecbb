//! Per-context projection of the transition model.
//!
//! Value and policy iteration solve one sub-problem per [`InventoryContext`] over grid
//! positions only. Inside a slice the context is fixed: a successor whose flags changed (the
//! agent picked up the key, say) is projected back onto the same position of this slice, so
//! collectibles behave as stationary reward sources. Terminal successors become the constant
//! continuation values `death` (dead), `damage` (survived health loss) and `0` (won).

use std::collections::BTreeMap;

use super::state::{AugmentedState, InventoryContext};
use super::transition::{Outcome, Successor, TransitionModel};
use crate::grid::{Action, CellMap, Position};

/// Continuation target of one slice term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SliceTarget {
    /// Index of an open position of the slice.
    Cell(usize),
    Dead,
    Hurt,
    Won,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceTerm {
    pub target: SliceTarget,
    pub probability: f64,
}

/// A transition restricted to one context.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceTransition {
    pub reward: f64,
    pub terms: Vec<SliceTerm>,
}

/// Every open position of one context with its per-action transitions.
#[derive(Debug, Clone)]
pub struct SliceModel {
    context: InventoryContext,
    positions: Vec<Position>,
    index_of: CellMap<usize>,
    actions: Vec<[Option<SliceTransition>; 4]>,
    death: f64,
    damage: f64,
}

impl SliceModel {
    /// Projects `model` onto `context`.
    ///
    /// Positions where every move is rejected get the stay-in-place transition for all four
    /// actions, so every position has at least one action.
    pub fn build(model: &TransitionModel<'_>, context: InventoryContext) -> Self {
        let grid = model.grid();
        let positions = grid.open_positions();
        let mut index_of = CellMap::for_grid(grid);
        for (i, p) in positions.iter().enumerate() {
            index_of.set(*p, i);
        }

        let rewards = model.rewards().for_context(&context);
        let mut actions = Vec::with_capacity(positions.len());
        for position in &positions {
            let state = AugmentedState::new(*position, context);
            let mut row: [Option<SliceTransition>; 4] = Default::default();
            for action in Action::ALL {
                row[action.index()] = model
                    .successors(&state, action)
                    .map(|(cell, outcomes)| project(rewards.get(cell), &outcomes, &index_of));
            }
            if row.iter().all(Option::is_none) {
                let rejected = model.rejected(&state);
                let stay = project(rejected.reward, &rejected.outcomes, &index_of);
                row = [
                    Some(stay.clone()),
                    Some(stay.clone()),
                    Some(stay.clone()),
                    Some(stay),
                ];
            }
            actions.push(row);
        }

        Self {
            context,
            positions,
            index_of,
            actions,
            death: rewards.death,
            damage: rewards.damage,
        }
    }

    pub fn context(&self) -> InventoryContext {
        self.context
    }

    /// Number of open positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Open positions, row-major. Slice indices refer to this order.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// `(nb_line, nb_col)` of the underlying grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.index_of.nb_line(), self.index_of.nb_col())
    }

    pub fn index_of(&self, position: Position) -> Option<usize> {
        self.index_of.get(position).copied()
    }

    pub fn death(&self) -> f64 {
        self.death
    }

    pub fn damage(&self) -> f64 {
        self.damage
    }

    /// Transition of `action` at slice index `i`; `None` for an invalid action.
    pub fn transition(&self, i: usize, action: Action) -> Option<&SliceTransition> {
        self.actions[i][action.index()].as_ref()
    }

    /// Value of a continuation target under `values`.
    pub fn target_value(&self, target: SliceTarget, values: &[f64]) -> f64 {
        match target {
            SliceTarget::Cell(j) => values[j],
            SliceTarget::Dead => self.death,
            SliceTarget::Hurt => self.damage,
            SliceTarget::Won => 0.0,
        }
    }

    /// One-step lookahead `R + γ·E[V]` of every action at `i`; `None` for invalid actions.
    pub fn q_values(&self, i: usize, values: &[f64], gamma: f64) -> [Option<f64>; 4] {
        let mut q = [None; 4];
        for (slot, transition) in q.iter_mut().zip(self.actions[i].iter()) {
            *slot = transition.as_ref().map(|t| {
                let expected: f64 = t
                    .terms
                    .iter()
                    .map(|term| term.probability * self.target_value(term.target, values))
                    .sum();
                t.reward + gamma * expected
            });
        }
        q
    }

    /// Reads a value table into slice order. Missing positions read as 0.
    pub fn values_from(&self, table: &CellMap<f64>) -> Vec<f64> {
        self.positions
            .iter()
            .map(|p| table.get(*p).copied().unwrap_or(0.0))
            .collect()
    }

    /// Writes slice-ordered values into a grid-shaped table.
    pub fn to_table(&self, values: &[f64]) -> CellMap<f64> {
        let (nb_line, nb_col) = self.shape();
        let mut table = CellMap::new(nb_line, nb_col);
        for (p, v) in self.positions.iter().zip(values) {
            table.set(*p, *v);
        }
        table
    }
}

fn project(reward: f64, outcomes: &[Outcome], index_of: &CellMap<usize>) -> SliceTransition {
    let mut merged: BTreeMap<SliceTarget, f64> = BTreeMap::new();
    for outcome in outcomes {
        let target = match outcome.successor {
            Successor::Alive(s) => match index_of.get(s.position) {
                Some(j) => SliceTarget::Cell(*j),
                None => continue,
            },
            Successor::Hurt(_) => SliceTarget::Hurt,
            Successor::Dead => SliceTarget::Dead,
            Successor::Won => SliceTarget::Won,
        };
        *merged.entry(target).or_default() += outcome.probability;
    }
    SliceTransition {
        reward,
        terms: merged
            .into_iter()
            .map(|(target, probability)| SliceTerm {
                target,
                probability,
            })
            .collect(),
    }
}
