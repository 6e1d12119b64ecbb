//! Properties shared by the three solvers.

use super::value_iteration::sweep;
use super::*;
use crate::grid::{GridWorld, Position};
use crate::model::{
    EnvironmentConfig, EpisodeStatus, GridEnvironment, ModelError, Successor, TransitionModel,
};

/// Hazard-free 4×4 level: Treasure (0,0), Key (0,1), Start (3,3).
fn open_level() -> GridWorld {
    "TBBB\nKBBB\nBBBB\nBBBS".parse().unwrap()
}

/// Level mixing every cell type.
fn mixed_level() -> GridWorld {
    "SBPBK\nB_EMB\nRBCMT\nBWB_B".parse().unwrap()
}

mod contraction {
    use super::*;

    #[test]
    fn one_more_sweep_stays_within_threshold() {
        let grid = mixed_level();
        let config = PlanningConfig {
            threshold: 1e-3,
            ..Default::default()
        };
        let gamma = config.gamma;
        let solver = ValueIterationSolver::new(&grid, config).unwrap();
        for context in InventoryContext::all() {
            let solution = solver.solve_context(context).unwrap();
            assert!(solution.converged);
            let slice = solver.slice(context);
            let values = slice.values_from(&solution.values);
            let (_, delta) = sweep(&slice, &values, gamma);
            assert!(delta <= 1e-3, "context {}: delta {}", context, delta);
            assert!(delta <= gamma * solution.delta + 1e-9);
        }
    }
}

mod cross_validation {
    use super::*;

    #[test]
    fn value_and_policy_iteration_agree_on_deterministic_levels() {
        let levels = ["TKBB\nB_CB\nBBWS", "TBBB\nKBBB\nBBBB\nBBBS", "KB_T\nBBBB\n_SBC"];
        for level in levels {
            let grid: GridWorld = level.parse().unwrap();
            let vi = ValueIterationSolver::new(
                &grid,
                PlanningConfig {
                    threshold: 1e-10,
                    ..Default::default()
                },
            )
            .unwrap()
            .solve()
            .unwrap();
            let pi = PolicyIterationSolver::new(&grid, PlanningConfig::policy_iteration())
                .unwrap()
                .solve()
                .unwrap();

            for context in InventoryContext::all() {
                let vi_slice = vi.get(&context).unwrap();
                let pi_slice = pi.get(&context).unwrap();
                assert_eq!(
                    vi_slice.policy, pi_slice.policy,
                    "level {:?}, context {}",
                    level, context
                );
                assert!(vi_slice.values.max_abs_diff(&pi_slice.values) < 1e-6);
            }
        }
    }

    #[test]
    fn values_match_on_stochastic_level() {
        let grid = mixed_level();
        let vi = ValueIterationSolver::new(
            &grid,
            PlanningConfig {
                threshold: 1e-9,
                ..Default::default()
            },
        )
        .unwrap()
        .solve()
        .unwrap();
        let pi = PolicyIterationSolver::new(&grid, PlanningConfig::policy_iteration())
            .unwrap()
            .solve()
            .unwrap();
        for (a, b) in vi.iter().zip(pi.iter()) {
            assert_eq!(a.context, b.context);
            assert!(a.values.max_abs_diff(&b.values) < 1e-6);
        }
    }
}

mod qlearning_convergence {
    use super::*;

    fn greedy_moves_to_win(grid: &GridWorld, table: &QTable) -> Option<usize> {
        let mut env = GridEnvironment::new(grid, EnvironmentConfig::default(), 0).unwrap();
        let mut state = env.reset();
        for moves in 1..=100 {
            env.step(table.greedy(&state));
            state = env.state();
            match env.status() {
                EpisodeStatus::Won => return Some(moves),
                EpisodeStatus::Dead => return None,
                EpisodeStatus::Running => {}
            }
        }
        None
    }

    fn trained_on_open_level() -> QLearningSolver {
        let config = QLearningConfig {
            alpha: 1.0,
            gamma: 0.9,
            epsilon: 0.2,
            min_iterations: 2_000,
            max_iterations: 5_000,
            quiet_iterations: 500,
            seed: 42,
            ..Default::default()
        };
        let mut solver = QLearningSolver::new(&open_level(), config).unwrap();
        let stats = solver.train();
        assert!(stats.wins > 0);
        solver
    }

    #[test]
    fn trained_rollout_takes_the_shortest_route() {
        let grid = open_level();
        let start = Position::new(3, 3);
        let key = Position::new(0, 1);
        let treasure = Position::new(0, 0);
        let shortest = start.manhattan(&key) + key.manhattan(&treasure) + treasure.manhattan(&start);
        assert_eq!(shortest, 12);

        let solver = trained_on_open_level();
        assert_eq!(greedy_moves_to_win(&grid, solver.table()), Some(shortest));
    }

    #[test]
    fn route_actions_are_optimal_in_value_iteration_slices() {
        let grid = open_level();
        let solver = trained_on_open_level();
        let config = PlanningConfig {
            threshold: 1e-10,
            ..Default::default()
        };
        let gamma = config.gamma;
        let vi = ValueIterationSolver::new(&grid, config).unwrap();

        let mut env = GridEnvironment::new(&grid, EnvironmentConfig::default(), 0).unwrap();
        let mut state = env.reset();
        let mut checked = 0;
        while env.status() == EpisodeStatus::Running && checked < 100 {
            let action = solver.table().greedy(&state);
            let context = state.inventory;
            assert_eq!(solver.policy_for(context).get(state.position), Some(&action));

            let slice = vi.slice(context);
            let solution = vi.solve_context(context).unwrap();
            let values = slice.values_from(&solution.values);
            let i = slice.index_of(state.position).unwrap();
            let q = slice.q_values(i, &values, gamma);
            let best = q.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max);
            let chosen = q[action.index()].unwrap();
            assert!(
                chosen >= best - 1e-6,
                "{}: {:?} is worth {} against {}",
                state,
                action,
                chosen,
                best
            );

            env.step(action);
            state = env.state();
            checked += 1;
        }
        assert_eq!(env.status(), EpisodeStatus::Won);
    }

    #[test]
    fn policy_for_covers_every_open_cell() {
        let grid = mixed_level();
        let config = QLearningConfig {
            min_iterations: 100,
            max_iterations: 200,
            quiet_iterations: 50,
            ..Default::default()
        };
        let mut solver = QLearningSolver::new(&grid, config).unwrap();
        solver.train();
        for context in InventoryContext::all() {
            let policy = solver.policy_for(context);
            assert_eq!(policy.defined(), grid.open_positions().len());
        }
    }

    #[test]
    fn learned_states_are_never_walls() {
        let grid = mixed_level();
        let config = QLearningConfig {
            epsilon: 0.5,
            min_iterations: 300,
            max_iterations: 400,
            quiet_iterations: 50,
            ..Default::default()
        };
        let mut solver = QLearningSolver::new(&grid, config).unwrap();
        solver.train();
        assert!(!solver.table().is_empty());
        assert!(solver.table().states().all(|s| grid.is_open(s.position)));
    }
}

mod determinism {
    use super::*;

    #[test]
    fn value_iteration_is_bit_identical() {
        let grid = mixed_level();
        let solve = || {
            ValueIterationSolver::new(&grid, PlanningConfig::default())
                .unwrap()
                .solve()
                .unwrap()
        };
        assert_eq!(solve(), solve());
    }

    #[test]
    fn q_learning_is_reproducible_with_a_seed() {
        let grid = mixed_level();
        let config = QLearningConfig {
            min_iterations: 100,
            max_iterations: 150,
            quiet_iterations: 10,
            seed: 9,
            ..Default::default()
        };
        let train = || {
            let mut solver = QLearningSolver::new(&grid, config.clone()).unwrap();
            let stats = solver.train();
            (stats, solver.into_table())
        };
        assert_eq!(train(), train());
    }
}

mod rewards_and_death {
    use super::*;

    #[test]
    fn key_holder_gets_override_reward() {
        let grid: GridWorld = "SK".parse().unwrap();
        let config = PlanningConfig::default();
        let model = TransitionModel::new(&grid, &config.transition, &config.rewards);
        let keyed = AugmentedState::new(
            Position::new(0, 0),
            InventoryContext::empty(true).with_key(),
        );
        let t = model.transition(&keyed, crate::grid::Action::Right).unwrap();
        assert_eq!(t.reward, -1.0);

        let plain = AugmentedState::new(Position::new(0, 0), InventoryContext::empty(true));
        let t = model.transition(&plain, crate::grid::Action::Right).unwrap();
        assert_eq!(t.reward, 1000.0);
    }

    #[test]
    fn critical_hazards_lead_to_absorbing_death() {
        let grid: GridWorld = "CSE\nBRB".parse().unwrap();
        let config = PlanningConfig::default();
        let model = TransitionModel::new(&grid, &config.transition, &config.rewards);
        let at = |x, y| AugmentedState::new(Position::new(x, y), InventoryContext::empty(true));
        use crate::grid::Action::{Down, Left, Right};

        let crack = model.transition(&at(1, 0), Left).unwrap();
        assert_eq!(crack.probability_of(&Successor::Dead), 1.0);
        let enemy = model.transition(&at(1, 0), Right).unwrap();
        assert!((enemy.probability_of(&Successor::Dead) - 0.3).abs() < 1e-12);
        let trap = model.transition(&at(1, 0), Down).unwrap();
        assert!((trap.probability_of(&Successor::Dead) - 0.1).abs() < 1e-12);

        assert!(config.rewards.death < config.rewards.lowest_ordinary());
    }

    #[test]
    fn values_never_fall_below_death() {
        let grid = mixed_level();
        let config = PlanningConfig::default();
        let death = config.rewards.death;
        let gamma = config.gamma;
        let solution = ValueIterationSolver::new(&grid, config)
            .unwrap()
            .solve()
            .unwrap();
        // Worst case: a wall bump forever, or dying right away.
        let floor = (-100.0 / (1.0 - gamma)).min(death);
        for slice in solution.iter() {
            for (_, v) in slice.values.iter() {
                assert!(*v >= floor - 1e-6);
            }
        }
    }
}

mod singular_systems {
    use super::*;

    #[test]
    fn undiscounted_policy_iteration_reports_context() {
        let grid: GridWorld = "SB\nBB".parse().unwrap();
        let config = PlanningConfig {
            gamma: 1.0,
            ..PlanningConfig::policy_iteration()
        };
        let err = PolicyIterationSolver::new(&grid, config)
            .unwrap()
            .solve()
            .unwrap_err();
        assert!(matches!(err, SolverError::SingularSystem { .. }));
        assert!(err.to_string().contains("Singular linear system"));
    }
}

mod configuration_errors {
    use super::*;

    #[test]
    fn unknown_schedule_name() {
        let err = "softmax".parse::<ExplorationSchedule>().unwrap_err();
        assert_eq!(err, SolverError::UnknownExplorationSchedule("softmax".into()));
    }

    #[test]
    fn invalid_transition_params_surface_as_model_errors() {
        let grid = open_level();
        let mut config = PlanningConfig::default();
        config.transition.p_reset = 1.5;
        assert_eq!(
            ValueIterationSolver::new(&grid, config).unwrap_err(),
            SolverError::Model(ModelError::InvalidProbability {
                name: "p_reset",
                value: 1.5
            })
        );
    }

    #[test]
    fn death_above_ordinary_rewards_rejected() {
        let grid = open_level();
        let mut config = PlanningConfig::policy_iteration();
        config.rewards.death = 0.0;
        assert!(matches!(
            PolicyIterationSolver::new(&grid, config),
            Err(SolverError::Model(ModelError::DeathNotLowest { .. }))
        ));
    }

    #[test]
    fn q_learning_rejects_zero_health() {
        let grid = open_level();
        let config = QLearningConfig {
            environment: EnvironmentConfig {
                player_health: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            QLearningSolver::new(&grid, config).unwrap_err(),
            SolverError::Model(ModelError::ZeroHealth)
        );
    }
}

#[cfg(feature = "serde")]
mod serde_tests {
    use super::*;

    #[test]
    fn planning_config_round_trip() {
        let config = PlanningConfig::policy_iteration();
        let json = serde_json::to_string(&config).unwrap();
        let back: PlanningConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn schedule_uses_kebab_case() {
        let json = serde_json::to_string(&ExplorationSchedule::LinearDecay).unwrap();
        assert_eq!(json, "\"linear-decay\"");
    }
}
