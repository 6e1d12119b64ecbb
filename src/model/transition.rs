//! The canonical transition model shared by every solver.
//!
//! A move is resolved in two layers:
//!
//! 1. [`TransitionModel::arrival`] gives the single-hop distribution of what happens when the
//!    agent lands on a cell ([`ArrivalEffect`]).
//! 2. [`TransitionModel::transition`] folds hops into the final successor distribution. Cells
//!    that relocate the agent (Portal, MovingPlatform, Trap reset) re-trigger arrival on the new
//!    cell, up to [`TransitionParams::max_chain`] relocations. The frontier of each hop is merged
//!    by `(cell, previous cell)` so portal fan-out stays bounded by the grid size.
//!
//! The rollout simulator samples from the same `arrival` distributions, so planning and
//! learning see exactly the same dynamics.

use std::collections::BTreeMap;

use super::config::TransitionParams;
use super::reward::RewardTable;
use super::state::{AugmentedState, InventoryContext};
use crate::grid::{Action, CellType, GridWorld, Position};

/// One possible result of landing on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalEffect {
    /// The agent stays on the cell with this inventory.
    Settle(InventoryContext),
    /// The agent is moved to another cell, whose effect fires in turn.
    Relocate(Position),
    /// Non-fatal health loss.
    Hurt,
    /// Fatal health loss.
    Dead,
    /// Back on Start with the treasure.
    Won,
}

/// Where a transition ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Successor {
    Alive(AugmentedState),
    /// The agent survived a health loss and is now critical.
    Hurt(AugmentedState),
    Dead,
    Won,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub successor: Successor,
    pub probability: f64,
}

/// Distribution over successors of one valid move.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Reward of the first destination cell, with the inventory held before the move.
    pub reward: f64,
    /// Merged outcomes in `Successor` order. Probabilities sum to 1.
    pub outcomes: Vec<Outcome>,
}

impl Transition {
    /// Total probability mass, 1 up to rounding.
    pub fn total_probability(&self) -> f64 {
        self.outcomes.iter().map(|o| o.probability).sum()
    }

    /// Probability of a given successor.
    pub fn probability_of(&self, successor: &Successor) -> f64 {
        self.outcomes
            .iter()
            .filter(|o| &o.successor == successor)
            .map(|o| o.probability)
            .sum()
    }
}

/// Arrival effects and chain reactions over a borrowed grid.
#[derive(Debug, Clone, Copy)]
pub struct TransitionModel<'a> {
    grid: &'a GridWorld,
    params: &'a TransitionParams,
    rewards: &'a RewardTable,
    start: Option<Position>,
}

impl<'a> TransitionModel<'a> {
    /// Creates a model. Parameters are expected to be validated by the caller.
    pub fn new(grid: &'a GridWorld, params: &'a TransitionParams, rewards: &'a RewardTable) -> Self {
        Self {
            grid,
            params,
            rewards,
            start: grid.start(),
        }
    }

    pub fn grid(&self) -> &'a GridWorld {
        self.grid
    }

    pub fn params(&self) -> &'a TransitionParams {
        self.params
    }

    pub fn rewards(&self) -> &'a RewardTable {
        self.rewards
    }

    /// Single-hop distribution of landing on `position` from `came_from` with `inventory`.
    ///
    /// Zero-probability entries are dropped. Effects that would divide by an empty candidate
    /// set (a platform with no open neighbour, no portal target) collapse to no effect.
    pub fn arrival(
        &self,
        position: Position,
        came_from: Option<Position>,
        inventory: InventoryContext,
    ) -> Vec<(ArrivalEffect, f64)> {
        let stay = ArrivalEffect::Settle(inventory);
        let Some(cell) = self.grid.cell(position) else {
            return vec![(stay, 1.0)];
        };
        let loss = if inventory.critical {
            ArrivalEffect::Dead
        } else {
            ArrivalEffect::Hurt
        };

        let effects = match cell {
            CellType::Wall | CellType::Blank => vec![(stay, 1.0)],
            CellType::Start if inventory.has_treasure => vec![(ArrivalEffect::Won, 1.0)],
            CellType::Start => vec![(stay, 1.0)],
            CellType::Key => vec![(ArrivalEffect::Settle(inventory.with_key()), 1.0)],
            CellType::Sword => vec![(ArrivalEffect::Settle(inventory.with_sword()), 1.0)],
            CellType::Treasure if inventory.has_key => {
                vec![(ArrivalEffect::Settle(inventory.with_treasure()), 1.0)]
            }
            CellType::Treasure => vec![(stay, 1.0)],
            CellType::Enemy if inventory.has_sword => vec![(stay, 1.0)],
            CellType::Enemy => with_remainder(vec![(loss, self.params.p_fight)], stay),
            CellType::Crack => vec![(loss, 1.0)],
            CellType::Trap => {
                let mut effects = vec![(loss, self.params.p_hurt)];
                if let Some(start) = self.start {
                    effects.push((ArrivalEffect::Relocate(start), self.params.p_reset));
                }
                with_remainder(effects, stay)
            }
            CellType::Portal => self.portal(stay),
            CellType::MovingPlatform => self.platform(position, came_from, stay),
        };
        effects.into_iter().filter(|(_, p)| *p > 0.0).collect()
    }

    fn portal(&self, stay: ArrivalEffect) -> Vec<(ArrivalEffect, f64)> {
        let targets = self.grid.open_positions();
        if targets.is_empty() {
            return vec![(stay, 1.0)];
        }
        let share = 1.0 / targets.len() as f64;
        let mut dead = 0.0;
        let mut effects = Vec::with_capacity(targets.len());
        for target in targets {
            if self.grid.cell(target) == Some(CellType::Crack) {
                dead += share;
            } else {
                effects.push((ArrivalEffect::Relocate(target), share));
            }
        }
        effects.push((ArrivalEffect::Dead, dead));
        effects
    }

    fn platform(
        &self,
        position: Position,
        came_from: Option<Position>,
        stay: ArrivalEffect,
    ) -> Vec<(ArrivalEffect, f64)> {
        let mut options = self.grid.open_neighbours(position);
        if let Some(from) = came_from {
            if options.len() > 1 {
                options.retain(|p| *p != from);
            }
        }
        if options.is_empty() {
            return vec![(stay, 1.0)];
        }
        let share = 1.0 / options.len() as f64;
        options
            .into_iter()
            .map(|p| (ArrivalEffect::Relocate(p), share))
            .collect()
    }

    /// Successor distribution of taking `action` in `state`, or `None` when the move is
    /// rejected (out of bounds or into a wall).
    pub fn transition(&self, state: &AugmentedState, action: Action) -> Option<Transition> {
        let (cell, outcomes) = self.successors(state, action)?;
        Some(Transition {
            reward: self.rewards.reward(cell, &state.inventory),
            outcomes,
        })
    }

    /// Destination cell and folded successor distribution of a valid move, without reward.
    pub fn successors(
        &self,
        state: &AugmentedState,
        action: Action,
    ) -> Option<(CellType, Vec<Outcome>)> {
        let destination = self.grid.step(state.position, action)?;
        let cell = self.grid.cell(destination)?;
        Some((cell, self.resolve(destination, state.position, state.inventory)))
    }

    /// The stay-in-place transition of a rejected move.
    pub fn rejected(&self, state: &AugmentedState) -> Transition {
        Transition {
            reward: self.rewards.wall(),
            outcomes: vec![Outcome {
                successor: Successor::Alive(*state),
                probability: 1.0,
            }],
        }
    }

    /// Transition of `action`, falling back to [`TransitionModel::rejected`].
    pub fn transition_or_rejected(&self, state: &AugmentedState, action: Action) -> Transition {
        self.transition(state, action)
            .unwrap_or_else(|| self.rejected(state))
    }

    /// Breadth-first fold of the chain reaction started by landing on `arrival`.
    fn resolve(
        &self,
        arrival: Position,
        came_from: Position,
        inventory: InventoryContext,
    ) -> Vec<Outcome> {
        let mut settled: BTreeMap<Successor, f64> = BTreeMap::new();
        let mut frontier: BTreeMap<(Position, Position), f64> = BTreeMap::new();
        frontier.insert((arrival, came_from), 1.0);

        for hop in 0..=self.params.max_chain {
            let mut next: BTreeMap<(Position, Position), f64> = BTreeMap::new();
            for ((position, from), mass) in frontier {
                for (effect, p) in self.arrival(position, Some(from), inventory) {
                    let mass = mass * p;
                    let successor = match effect {
                        ArrivalEffect::Settle(inv) => {
                            Successor::Alive(AugmentedState::new(position, inv))
                        }
                        ArrivalEffect::Hurt => {
                            Successor::Hurt(AugmentedState::new(position, inventory.hurt()))
                        }
                        ArrivalEffect::Dead => Successor::Dead,
                        ArrivalEffect::Won => Successor::Won,
                        ArrivalEffect::Relocate(to) if hop == self.params.max_chain => {
                            Successor::Alive(AugmentedState::new(to, inventory))
                        }
                        ArrivalEffect::Relocate(to) => {
                            *next.entry((to, position)).or_default() += mass;
                            continue;
                        }
                    };
                    *settled.entry(successor).or_default() += mass;
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        settled
            .into_iter()
            .map(|(successor, probability)| Outcome {
                successor,
                probability,
            })
            .collect()
    }
}

/// Appends `rest` with whatever mass `effects` leaves unassigned.
fn with_remainder(
    mut effects: Vec<(ArrivalEffect, f64)>,
    rest: ArrivalEffect,
) -> Vec<(ArrivalEffect, f64)> {
    let assigned: f64 = effects.iter().map(|(_, p)| p).sum();
    effects.push((rest, (1.0 - assigned).max(0.0)));
    effects
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_parts() -> (TransitionParams, RewardTable) {
        (TransitionParams::default(), RewardTable::default())
    }

    fn assert_normalised(t: &Transition) {
        assert!((t.total_probability() - 1.0).abs() < 1e-10, "{:?}", t);
    }

    #[test]
    fn wall_and_edge_moves_are_rejected() {
        let grid: GridWorld = "S_".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let state = AugmentedState::new(Position::new(0, 0), InventoryContext::empty(true));

        assert!(model.transition(&state, Action::Right).is_none());
        assert!(model.transition(&state, Action::Up).is_none());

        let stay = model.transition_or_rejected(&state, Action::Right);
        assert_eq!(stay.reward, -100.0);
        assert_eq!(stay.outcomes.len(), 1);
        assert_eq!(stay.outcomes[0].successor, Successor::Alive(state));
    }

    #[test]
    fn key_pickup_sets_flag() {
        let grid: GridWorld = "SK".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let state = AugmentedState::new(Position::new(0, 0), InventoryContext::empty(false));

        let t = model.transition(&state, Action::Right).unwrap();
        assert_eq!(t.reward, 1000.0);
        let expected =
            AugmentedState::new(Position::new(1, 0), InventoryContext::empty(false).with_key());
        assert_eq!(t.outcomes.len(), 1);
        assert_eq!(t.outcomes[0].successor, Successor::Alive(expected));
    }

    #[test]
    fn treasure_needs_key() {
        let grid: GridWorld = "ST".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let at = Position::new(1, 0);

        let without = model.arrival(at, None, InventoryContext::empty(false));
        assert_eq!(
            without,
            vec![(ArrivalEffect::Settle(InventoryContext::empty(false)), 1.0)]
        );

        let keyed = InventoryContext::empty(false).with_key();
        let with = model.arrival(at, None, keyed);
        assert_eq!(with, vec![(ArrivalEffect::Settle(keyed.with_treasure()), 1.0)]);
    }

    #[test]
    fn start_with_treasure_wins() {
        let grid: GridWorld = "SB".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let carrying = InventoryContext::new(true, false, true, true);
        let state = AugmentedState::new(Position::new(1, 0), carrying);

        let t = model.transition(&state, Action::Left).unwrap();
        assert_eq!(t.reward, 1000.0);
        assert_eq!(t.outcomes, vec![Outcome { successor: Successor::Won, probability: 1.0 }]);
    }

    #[test]
    fn enemy_fight_depends_on_sword_and_health() {
        let grid: GridWorld = "SE".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let enemy = Position::new(1, 0);

        let critical = model.arrival(enemy, None, InventoryContext::empty(true));
        assert!(critical.contains(&(ArrivalEffect::Dead, 0.3)));

        let healthy = model.arrival(enemy, None, InventoryContext::empty(false));
        assert!(healthy.contains(&(ArrivalEffect::Hurt, 0.3)));

        let armed = InventoryContext::empty(true).with_sword();
        assert_eq!(
            model.arrival(enemy, None, armed),
            vec![(ArrivalEffect::Settle(armed), 1.0)]
        );
    }

    #[test]
    fn crack_is_a_health_loss() {
        let grid: GridWorld = "SC".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let start = Position::new(0, 0);

        let critical = AugmentedState::new(start, InventoryContext::empty(true));
        let t = model.transition(&critical, Action::Right).unwrap();
        assert_eq!(t.probability_of(&Successor::Dead), 1.0);

        let healthy = AugmentedState::new(start, InventoryContext::empty(false));
        let t = model.transition(&healthy, Action::Right).unwrap();
        let hurt = AugmentedState::new(Position::new(1, 0), InventoryContext::empty(true));
        assert_eq!(t.probability_of(&Successor::Hurt(hurt)), 1.0);
    }

    #[test]
    fn trap_resets_to_start() {
        let grid: GridWorld = "SBR".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let inventory = InventoryContext::empty(true);
        let state = AugmentedState::new(Position::new(1, 0), inventory);

        let t = model.transition(&state, Action::Right).unwrap();
        assert_normalised(&t);
        assert!((t.probability_of(&Successor::Dead) - 0.1).abs() < 1e-12);
        let at_start = AugmentedState::new(Position::new(0, 0), inventory);
        assert!((t.probability_of(&Successor::Alive(at_start)) - 0.3).abs() < 1e-12);
        let on_trap = AugmentedState::new(Position::new(2, 0), inventory);
        assert!((t.probability_of(&Successor::Alive(on_trap)) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn trap_without_start_keeps_reset_mass_in_place() {
        let grid: GridWorld = "BR".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let inventory = InventoryContext::empty(false);
        let effects = model.arrival(Position::new(1, 0), None, inventory);
        let stay: f64 = effects
            .iter()
            .filter(|(e, _)| *e == ArrivalEffect::Settle(inventory))
            .map(|(_, p)| p)
            .sum();
        assert!((stay - 0.9).abs() < 1e-12);
    }

    #[test]
    fn portal_sends_crack_mass_to_death() {
        let grid: GridWorld = "SPC\nBB_".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let state = AugmentedState::new(Position::new(0, 0), InventoryContext::empty(false));

        let t = model.transition(&state, Action::Right).unwrap();
        assert_normalised(&t);
        // Five open targets, one of which is the crack.
        assert!(t.probability_of(&Successor::Dead) >= 0.2 - 1e-12);
        assert!(t
            .outcomes
            .iter()
            .all(|o| !matches!(o.successor, Successor::Alive(s) if s.position == Position::new(2, 0))));
    }

    #[test]
    fn portal_chain_is_bounded() {
        let grid: GridWorld = "PP\nPS".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let state = AugmentedState::new(Position::new(1, 1), InventoryContext::empty(true));

        let t = model.transition(&state, Action::Up).unwrap();
        assert_normalised(&t);
        for outcome in &t.outcomes {
            match outcome.successor {
                Successor::Alive(s) => assert!(grid.is_open(s.position)),
                other => panic!("unexpected successor {:?}", other),
            }
        }
    }

    #[test]
    fn platform_avoids_previous_cell() {
        let grid: GridWorld = "BMB".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let inventory = InventoryContext::empty(false);

        let effects = model.arrival(Position::new(1, 0), Some(Position::new(0, 0)), inventory);
        assert_eq!(effects, vec![(ArrivalEffect::Relocate(Position::new(2, 0)), 1.0)]);
    }

    #[test]
    fn platform_dead_end_goes_back() {
        let grid: GridWorld = "BM_".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let effects = model.arrival(
            Position::new(1, 0),
            Some(Position::new(0, 0)),
            InventoryContext::empty(false),
        );
        assert_eq!(effects, vec![(ArrivalEffect::Relocate(Position::new(0, 0)), 1.0)]);
    }

    #[test]
    fn isolated_platform_settles() {
        let grid: GridWorld = "_M_".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let inventory = InventoryContext::empty(false);
        assert_eq!(
            model.arrival(Position::new(1, 0), None, inventory),
            vec![(ArrivalEffect::Settle(inventory), 1.0)]
        );
    }

    #[test]
    fn platform_cluster_settles_within_chain_bound() {
        let grid: GridWorld = "SMM\nBMM".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        let state = AugmentedState::new(Position::new(0, 0), InventoryContext::empty(false));

        let t = model.transition(&state, Action::Right).unwrap();
        assert_normalised(&t);
        assert!(t
            .outcomes
            .iter()
            .all(|o| matches!(o.successor, Successor::Alive(_))));
    }

    #[test]
    fn every_open_state_is_normalised() {
        let grid: GridWorld = "SERC\nPMKB\nTWBM".parse().unwrap();
        let (params, rewards) = model_parts();
        let model = TransitionModel::new(&grid, &params, &rewards);
        for context in InventoryContext::all() {
            for position in grid.open_positions() {
                let state = AugmentedState::new(position, context);
                for action in Action::ALL {
                    if let Some(t) = model.transition(&state, action) {
                        assert_normalised(&t);
                        assert!(t.outcomes.iter().all(|o| o.probability > 0.0));
                    }
                }
            }
        }
    }
}
