//! Model-free tabular Q-learning.
//!
//! The agent plays episodes in a [`GridEnvironment`] and updates
//!
//! ```text
//! Q(s, a) += α · (r + γ · max_a' Q(s', a') − Q(s, a))
//! ```
//!
//! with the continuation forced to 0 when `s'` is terminal. A move that triggers a chain
//! reaction is one transition whose `s'` is where the chain ends. Portal and platform cells
//! the chain passed through are also updated, for all four actions, since the agent never
//! chooses anything there.
//!
//! # Module Structure
//!
//! - [`config`] - Hyper-parameters and exploration schedules
//! - [`q_table`] - The action-value table and greedy extraction
//! - [`stats`] - Training statistics

mod config;
mod q_table;
mod stats;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

pub use config::{ExplorationSchedule, QLearningConfig};
pub use q_table::QTable;
pub use stats::{TrainingStats, RECENT_WINDOW};

use stats::StatsRecorder;

use super::{Policy, SolverError};
use crate::analysis::ReachabilityGraph;
use crate::grid::{Action, GridWorld};
use crate::model::{AugmentedState, EpisodeStatus, GridEnvironment, InventoryContext, StepResult};

/// Epsilon-greedy Q-learning solver.
///
/// # Example
///
/// ```
/// use treasure_mdp::algorithms::{QLearningConfig, QLearningSolver};
/// use treasure_mdp::grid::GridWorld;
///
/// let grid: GridWorld = "TKS".parse().unwrap();
/// let config = QLearningConfig {
///     min_iterations: 200,
///     max_iterations: 500,
///     quiet_iterations: 100,
///     ..Default::default()
/// };
/// let mut solver = QLearningSolver::new(&grid, config).unwrap();
/// let stats = solver.train();
/// assert!(stats.iterations <= 500);
/// assert!(stats.wins > 0);
/// ```
#[derive(Debug)]
pub struct QLearningSolver {
    grid: GridWorld,
    config: QLearningConfig,
    table: QTable,
    env: GridEnvironment,
    rng: StdRng,
    epsilon: f64,
}

impl QLearningSolver {
    /// Validates `config` and prepares a fresh table.
    ///
    /// # Arguments
    ///
    /// * `grid` - Level to train on; must contain a Start cell
    /// * `config` - Hyper-parameters, stopping rules and environment settings
    pub fn new(grid: &GridWorld, config: QLearningConfig) -> Result<Self, SolverError> {
        config.validate()?;
        let env = GridEnvironment::new(grid, config.environment.clone(), config.seed)?;
        Ok(Self {
            grid: grid.clone(),
            table: QTable::new(config.default_q),
            rng: StdRng::seed_from_u64(config.seed.wrapping_add(1)),
            epsilon: config.epsilon,
            env,
            config,
        })
    }

    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }

    /// Learned action values.
    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn into_table(self) -> QTable {
        self.table
    }

    /// Current exploration probability.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Greedy policy of one inventory context, comparable with a planning slice.
    pub fn policy_for(&self, context: InventoryContext) -> Policy {
        self.table.policy_for(&self.grid, context)
    }

    /// Runs episodes until the stopping rule fires.
    ///
    /// Training stops once more than `min_iterations` episodes were played and ε has not
    /// been kicked during the last `quiet_iterations`, or after `max_iterations` episodes.
    pub fn train(&mut self) -> TrainingStats {
        self.diagnose();
        self.epsilon = self.config.epsilon;
        let mut recorder = StatsRecorder::default();
        let mut iterations = 0;
        let mut last_kick = 0;

        loop {
            if iterations - last_kick > self.config.quiet_iterations
                && iterations > self.config.min_iterations
            {
                break;
            }
            if iterations >= self.config.max_iterations {
                break;
            }
            if self.config.schedule == ExplorationSchedule::LinearDecay {
                self.epsilon = (self.epsilon - self.config.epsilon_decay).max(0.0);
            }
            iterations += 1;

            let (status, kicked, truncated) = self.episode();
            if kicked {
                recorder.epsilon_kicks += 1;
                last_kick = iterations;
            }
            if truncated {
                recorder.truncated_episodes += 1;
            }
            recorder.record(status == EpisodeStatus::Won);

            if iterations % RECENT_WINDOW == 0 {
                debug!(
                    iterations,
                    epsilon = self.epsilon,
                    recent_win_ratio = recorder.recent_win_ratio(),
                    states = self.table.len(),
                    "q-learning progress"
                );
            }
        }

        let stats = recorder.finish(self.epsilon);
        info!(
            iterations = stats.iterations,
            wins = stats.wins,
            win_percentage = stats.win_percentage,
            "q-learning finished"
        );
        stats
    }

    /// Logs whether a win is reachable at all; unwinnable levels run to the iteration cap.
    fn diagnose(&self) {
        match ReachabilityGraph::build(&self.grid, &self.config.environment) {
            Ok(graph) if !graph.can_win() => {
                warn!(states = graph.len(), "no winning path from Start");
            }
            Ok(graph) => debug!(states = graph.len(), "reachable state space"),
            Err(err) => warn!(%err, "reachability analysis failed"),
        }
    }

    /// Plays one episode. Returns its final status, whether ε was kicked and whether it was
    /// cut at the step cap.
    fn episode(&mut self) -> (EpisodeStatus, bool, bool) {
        let mut state = self.env.reset();
        let mut kicked = false;
        let mut steps = 0;

        while self.env.status() == EpisodeStatus::Running {
            if steps >= self.config.max_episode_steps {
                return (self.env.status(), kicked, true);
            }
            if self.config.schedule == ExplorationSchedule::LinearDecay
                && steps > self.config.kick_after_steps
                && !kicked
            {
                self.epsilon = self.config.kick_epsilon;
                kicked = true;
            }

            let action = self.choose(&state);
            let step = self.env.step(action);
            self.learn(state, action, &step);
            state = self.env.state();
            steps += 1;
        }
        (self.env.status(), kicked, false)
    }

    /// Epsilon-greedy behaviour policy, ties broken at random.
    fn choose(&mut self, state: &AugmentedState) -> Action {
        if self.rng.gen::<f64>() < self.epsilon {
            Action::ALL[self.rng.gen_range(0..Action::ALL.len())]
        } else {
            self.table.greedy_random(state, &mut self.rng)
        }
    }

    /// Applies the update of one step.
    ///
    /// The chain reaction counts as a single transition, as in the planning model:
    /// `Q(s, a)` moves toward `r₀ + γ · (Σ relocation rewards + max Q(final))`. A state the
    /// chain passed through without being able to stay on it gets the same remainder for all
    /// four actions. Other mid-chain states (a trap that reset the agent) are left alone,
    /// since the agent may still settle there and act on its own.
    fn learn(&mut self, state: AugmentedState, action: Action, step: &StepResult) {
        let (Some(first), Some(last)) = (step.hops.first(), step.hops.last()) else {
            return;
        };
        let alpha = self.config.alpha;
        let mut remainder = if last.terminal {
            0.0
        } else {
            self.table.max(&last.state)
        };
        for i in (1..step.hops.len()).rev() {
            remainder += step.hops[i].reward;
            let transit = step.hops[i - 1].state;
            let passes_through = self
                .grid
                .cell(transit.position)
                .is_some_and(|cell| cell.always_relocates());
            if passes_through {
                for a in Action::ALL {
                    self.table.update(transit, a, remainder, alpha);
                }
            }
        }
        let target = first.reward + self.config.gamma * remainder;
        self.table.update(state, action, target, alpha);
    }
}
