//! Monte-Carlo evaluation of a greedy policy in the rollout simulator.

use std::fmt;

use crate::algorithms::GreedyPolicy;
use crate::grid::{Action, GridWorld};
use crate::model::{EnvironmentConfig, EpisodeStatus, GridEnvironment, ModelError};

/// Aggregated results of [`evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// Number of episodes rolled out.
    pub episodes: usize,
    pub wins: usize,
    pub deaths: usize,
    /// Episodes cut at the step cap.
    pub truncated: usize,
    /// `wins / episodes`.
    pub win_rate: f64,
    /// Mean moves per episode.
    pub mean_steps: f64,
    /// Mean undiscounted return per episode.
    pub mean_return: f64,
}

/// Rolls `policy` out for `episodes` episodes of at most `max_steps` moves each.
///
/// States the policy has no action for fall back to [`Action::Up`].
///
/// # Arguments
///
/// * `grid` - Level to play; must contain a Start cell
/// * `config` - Environment settings
/// * `policy` - Any greedy policy, planning solution or Q table
/// * `episodes` - Number of episodes
/// * `max_steps` - Move cap per episode
/// * `seed` - Random seed for the environment
pub fn evaluate<P: GreedyPolicy + ?Sized>(
    grid: &GridWorld,
    config: &EnvironmentConfig,
    policy: &P,
    episodes: usize,
    max_steps: usize,
    seed: u64,
) -> Result<EvaluationReport, ModelError> {
    let mut env = GridEnvironment::new(grid, config.clone(), seed)?;
    let mut wins = 0;
    let mut deaths = 0;
    let mut truncated = 0;
    let mut total_steps = 0;
    let mut total_return = 0.0;

    for _ in 0..episodes {
        let mut state = env.reset();
        while env.status() == EpisodeStatus::Running && env.steps() < max_steps {
            let action = policy.action(&state).unwrap_or(Action::Up);
            total_return += env.step(action).reward();
            state = env.state();
        }
        total_steps += env.steps();
        match env.status() {
            EpisodeStatus::Won => wins += 1,
            EpisodeStatus::Dead => deaths += 1,
            EpisodeStatus::Running => truncated += 1,
        }
    }

    let n = episodes.max(1) as f64;
    Ok(EvaluationReport {
        episodes,
        wins,
        deaths,
        truncated,
        win_rate: wins as f64 / n,
        mean_steps: total_steps as f64 / n,
        mean_return: total_return / n,
    })
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Evaluation ({} episodes) ===", self.episodes)?;
        writeln!(f, "  Wins:          {}", self.wins)?;
        writeln!(f, "  Deaths:        {}", self.deaths)?;
        writeln!(f, "  Truncated:     {}", self.truncated)?;
        writeln!(f, "  Win rate:      {:.1}%", self.win_rate * 100.0)?;
        writeln!(f, "  Mean steps:    {:.1}", self.mean_steps)?;
        writeln!(f, "  Mean return:   {:.2}", self.mean_return)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{PlanningConfig, PlanningSolver, ValueIterationSolver};
    use crate::model::AugmentedState;

    struct Always(Action);

    impl GreedyPolicy for Always {
        fn action(&self, _: &AugmentedState) -> Option<Action> {
            Some(self.0)
        }
    }

    #[test]
    fn walking_into_a_crack_always_dies() {
        let grid: GridWorld = "SC".parse().unwrap();
        let report =
            evaluate(&grid, &EnvironmentConfig::default(), &Always(Action::Right), 10, 50, 0)
                .unwrap();
        assert_eq!(report.deaths, 10);
        assert_eq!(report.mean_steps, 1.0);
        assert!((report.mean_return - (-500.0)).abs() < 1e-12);
    }

    #[test]
    fn bumping_walls_truncates() {
        let grid: GridWorld = "SB".parse().unwrap();
        let report =
            evaluate(&grid, &EnvironmentConfig::default(), &Always(Action::Up), 3, 7, 0).unwrap();
        assert_eq!(report.truncated, 3);
        assert_eq!(report.mean_steps, 7.0);
        assert!(report.to_string().contains("3 episodes"));
    }

    #[test]
    fn value_iteration_policy_wins_deterministic_level() {
        let grid: GridWorld = "TKB\nBBS".parse().unwrap();
        let solution = ValueIterationSolver::new(&grid, PlanningConfig::default())
            .unwrap()
            .solve()
            .unwrap();
        let report =
            evaluate(&grid, &EnvironmentConfig::default(), &solution, 5, 100, 1).unwrap();
        assert_eq!(report.wins, 5);
        assert_eq!(report.win_rate, 1.0);
    }
}
