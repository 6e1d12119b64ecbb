//! Training statistics.

use std::collections::VecDeque;
use std::fmt;

/// Episodes considered by [`TrainingStats::recent_win_ratio`].
pub const RECENT_WINDOW: usize = 1000;

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingStats {
    /// Episodes played.
    pub iterations: usize,
    /// Episodes that ended in a win.
    pub wins: usize,
    /// `wins / iterations`, a fraction in `[0, 1]`.
    pub win_percentage: f64,
    /// Win fraction over the last [`RECENT_WINDOW`] episodes.
    pub recent_win_ratio: f64,
    /// Times ε was kicked back up.
    pub epsilon_kicks: usize,
    /// Episodes abandoned at the step cap.
    pub truncated_episodes: usize,
    /// ε at the end of training.
    pub final_epsilon: f64,
}

/// Running counters turned into [`TrainingStats`] at the end of training.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    iterations: usize,
    wins: usize,
    recent: VecDeque<bool>,
    pub(crate) epsilon_kicks: usize,
    pub(crate) truncated_episodes: usize,
}

impl StatsRecorder {
    pub(crate) fn record(&mut self, won: bool) {
        self.iterations += 1;
        if won {
            self.wins += 1;
        }
        self.recent.push_back(won);
        if self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
    }

    pub(crate) fn recent_win_ratio(&self) -> f64 {
        if self.recent.is_empty() {
            return 0.0;
        }
        self.recent.iter().filter(|w| **w).count() as f64 / self.recent.len() as f64
    }

    pub(crate) fn finish(&self, final_epsilon: f64) -> TrainingStats {
        TrainingStats {
            iterations: self.iterations,
            wins: self.wins,
            win_percentage: if self.iterations > 0 {
                self.wins as f64 / self.iterations as f64
            } else {
                0.0
            },
            recent_win_ratio: self.recent_win_ratio(),
            epsilon_kicks: self.epsilon_kicks,
            truncated_episodes: self.truncated_episodes,
            final_epsilon,
        }
    }
}

impl fmt::Display for TrainingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Training Statistics ({} episodes) ===", self.iterations)?;
        writeln!(f, "  Wins:                {}", self.wins)?;
        writeln!(f, "  Win rate:            {:.1}%", self.win_percentage * 100.0)?;
        writeln!(
            f,
            "  Recent win rate:     {:.1}%",
            self.recent_win_ratio * 100.0
        )?;
        writeln!(f, "  Epsilon kicks:       {}", self.epsilon_kicks)?;
        writeln!(f, "  Truncated episodes:  {}", self.truncated_episodes)?;
        writeln!(f, "  Final epsilon:       {:.4}", self.final_epsilon)
    }
}
