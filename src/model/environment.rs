//! Stochastic rollout simulator.
//!
//! Samples the same arrival distributions as [`TransitionModel`] but tracks what the planning
//! slices abstract away: a working copy of the grid where collectibles disappear once picked
//! up, and integer health points.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::config::EnvironmentConfig;
use super::error::ModelError;
use super::state::{AugmentedState, InventoryContext};
use super::transition::{ArrivalEffect, TransitionModel};
use crate::grid::{Action, CellType, GridWorld, Position};

/// Whether the current episode is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeStatus {
    Running,
    Won,
    Dead,
}

/// One arrival inside a step: the real move, then one entry per relocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hop {
    /// State on the cell just arrived at, inventory as updated by the arrival.
    pub state: AugmentedState,
    /// `death` if the hop killed the agent. Otherwise the entered cell's reward (inventory
    /// held before the move) on the first hop, and 0 on relocation hops.
    pub reward: f64,
    /// The hop ended the episode.
    pub terminal: bool,
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// False when the move hit a wall or the grid edge.
    pub moved: bool,
    /// At least one hop. A rejected move yields one hop back onto the current state.
    pub hops: Vec<Hop>,
    pub status: EpisodeStatus,
}

impl StepResult {
    /// Sum of hop rewards.
    pub fn reward(&self) -> f64 {
        self.hops.iter().map(|h| h.reward).sum()
    }
}

/// The grid-world rollout environment.
///
/// # Lifecycle
///
/// 1. Call [`GridEnvironment::new`] with a grid, configuration and seed.
/// 2. Call [`GridEnvironment::reset`] to start an episode on the Start cell.
/// 3. Call [`GridEnvironment::step`] until the status is no longer `Running`.
#[derive(Debug, Clone)]
pub struct GridEnvironment {
    base: GridWorld,
    working: GridWorld,
    config: EnvironmentConfig,
    start: Position,
    state: AugmentedState,
    health: u32,
    status: EpisodeStatus,
    steps: usize,
    rng: StdRng,
}

impl GridEnvironment {
    /// Creates an environment positioned on Start.
    ///
    /// # Arguments
    ///
    /// * `grid` - Level layout, cloned into the environment
    /// * `config` - Transition, reward and health settings
    /// * `seed` - Random seed for reproducible episodes
    pub fn new(grid: &GridWorld, config: EnvironmentConfig, seed: u64) -> Result<Self, ModelError> {
        config.validate()?;
        let start = grid.start().ok_or(ModelError::MissingStart)?;
        let health = config.player_health;
        Ok(Self {
            base: grid.clone(),
            working: grid.clone(),
            start,
            state: AugmentedState::new(
                start,
                InventoryContext::empty(EnvironmentConfig::is_critical(health)),
            ),
            health,
            status: EpisodeStatus::Running,
            steps: 0,
            rng: StdRng::seed_from_u64(seed),
            config,
        })
    }

    /// Starts a new episode: fresh grid, full health, empty inventory.
    pub fn reset(&mut self) -> AugmentedState {
        self.working = self.base.clone();
        self.health = self.config.player_health;
        self.state = AugmentedState::new(
            self.start,
            InventoryContext::empty(EnvironmentConfig::is_critical(self.health)),
        );
        self.status = EpisodeStatus::Running;
        self.steps = 0;
        self.state
    }

    pub fn state(&self) -> AugmentedState {
        self.state
    }

    pub fn status(&self) -> EpisodeStatus {
        self.status
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    /// Moves attempted in the current episode.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// The working grid, with consumed collectibles blanked.
    pub fn grid(&self) -> &GridWorld {
        &self.working
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Attempts `action` and resolves the resulting chain reaction.
    pub fn step(&mut self, action: Action) -> StepResult {
        if self.status != EpisodeStatus::Running {
            return StepResult {
                moved: false,
                hops: Vec::new(),
                status: self.status,
            };
        }
        self.steps += 1;

        let Some(destination) = self.working.step(self.state.position, action) else {
            return StepResult {
                moved: false,
                hops: vec![Hop {
                    state: self.state,
                    reward: self.config.rewards.wall(),
                    terminal: false,
                }],
                status: self.status,
            };
        };

        let hops = self.resolve(destination);
        if let Some(last) = hops.last() {
            self.state = last.state;
        }
        StepResult {
            moved: true,
            hops,
            status: self.status,
        }
    }

    fn resolve(&mut self, destination: Position) -> Vec<Hop> {
        let max_chain = self.config.transition.max_chain;
        let mut hops = Vec::new();
        let mut position = destination;
        let mut from = self.state.position;
        let mut inventory = self.state.inventory;

        for hop in 0..=max_chain {
            let cell = self.working.cell(position).unwrap_or(CellType::Blank);
            // Cell rewards are earned by the move; relocations only fire effects.
            let reward = if hop == 0 {
                self.config.rewards.reward(cell, &inventory)
            } else {
                0.0
            };
            let effect = self.sample(position, from, inventory);
            match effect {
                ArrivalEffect::Settle(updated) => {
                    self.consume(position, cell, &inventory, &updated);
                    inventory = updated;
                    hops.push(self.hop(position, inventory, reward, false));
                    break;
                }
                ArrivalEffect::Hurt => {
                    self.health = self.health.saturating_sub(1);
                    inventory.critical = EnvironmentConfig::is_critical(self.health);
                    hops.push(self.hop(position, inventory, reward, false));
                    break;
                }
                ArrivalEffect::Dead => {
                    self.health = 0;
                    self.status = EpisodeStatus::Dead;
                    hops.push(self.hop(position, inventory, self.config.rewards.death, true));
                    break;
                }
                ArrivalEffect::Won => {
                    self.status = EpisodeStatus::Won;
                    hops.push(self.hop(position, inventory, reward, true));
                    break;
                }
                ArrivalEffect::Relocate(to) => {
                    hops.push(self.hop(position, inventory, reward, false));
                    if hop == max_chain {
                        hops.push(self.hop(to, inventory, 0.0, false));
                        break;
                    }
                    from = position;
                    position = to;
                }
            }
        }
        hops
    }

    fn hop(&self, position: Position, inventory: InventoryContext, reward: f64, terminal: bool) -> Hop {
        Hop {
            state: AugmentedState::new(position, inventory),
            reward,
            terminal,
        }
    }

    fn sample(
        &mut self,
        position: Position,
        from: Position,
        inventory: InventoryContext,
    ) -> ArrivalEffect {
        let model = TransitionModel::new(
            &self.working,
            &self.config.transition,
            &self.config.rewards,
        );
        let effects = model.arrival(position, Some(from), inventory);
        match effects.as_slice() {
            [(only, _)] => *only,
            _ => match WeightedIndex::new(effects.iter().map(|(_, p)| *p)) {
                Ok(dist) => effects[dist.sample(&mut self.rng)].0,
                Err(_) => ArrivalEffect::Settle(inventory),
            },
        }
    }

    /// Blanks a collectible on the working grid once its pickup changed the inventory.
    fn consume(
        &mut self,
        position: Position,
        cell: CellType,
        before: &InventoryContext,
        after: &InventoryContext,
    ) {
        let picked = match cell {
            CellType::Key => after.has_key && !before.has_key,
            CellType::Sword => after.has_sword && !before.has_sword,
            CellType::Treasure => after.has_treasure && !before.has_treasure,
            _ => false,
        };
        if picked {
            self.working.set(position, CellType::Blank);
        }
    }
}
