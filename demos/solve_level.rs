// Demonstration: solve a level with one of the three solvers and evaluate the result.
//
// Run from the repo root:
//   cargo run --example solve_level -- --solver vi --episodes 100
//   RUST_LOG=debug cargo run --example solve_level -- --solver ql --schedule decrease
//
// `--level` takes the grid with `/` between lines, e.g. `--level "TKB/B_B/BBS"`.

use std::env;
use std::process;

use tracing_subscriber::EnvFilter;
use treasure_mdp::algorithms::{
    ExplorationSchedule, GreedyPolicy, PlanningConfig, PlanningSolver, PolicyIterationSolver,
    QLearningConfig, QLearningSolver, ValueIterationSolver,
};
use treasure_mdp::analysis::{evaluate, ReachabilityGraph};
use treasure_mdp::grid::GridWorld;
use treasure_mdp::model::{EnvironmentConfig, InventoryContext};

const DEFAULT_LEVEL: &str = "\
SBBE_K
B_RBBB
BPBCMB
WB_BMB
BBBBBT";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let solver_name = arg_value(&args, "--solver").unwrap_or("vi");
    let episodes: usize = arg_value(&args, "--episodes")
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);
    let seed: u64 = arg_value(&args, "--seed")
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    let level = arg_value(&args, "--level")
        .map(|s| s.replace('/', "\n"))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

    let grid: GridWorld = match level.parse() {
        Ok(grid) => grid,
        Err(err) => {
            eprintln!("Invalid level: {}", err);
            process::exit(2);
        }
    };
    println!("Level:\n{}", grid);

    let environment = EnvironmentConfig::default();
    match ReachabilityGraph::build(&grid, &environment) {
        Ok(graph) => println!(
            "Reachable states: {} (winnable: {}, hazardous: {})\n",
            graph.len(),
            graph.can_win(),
            graph.can_die()
        ),
        Err(err) => {
            eprintln!("Cannot analyse level: {}", err);
            process::exit(2);
        }
    }

    let start_context = InventoryContext::empty(true);
    let policy: Box<dyn GreedyPolicy> = match solver_name {
        "vi" | "pi" => {
            let solution = if solver_name == "vi" {
                ValueIterationSolver::new(&grid, PlanningConfig::default())
                    .and_then(|s| s.solve())
            } else {
                PolicyIterationSolver::new(&grid, PlanningConfig::policy_iteration())
                    .and_then(|s| s.solve())
            };
            let solution = solution.unwrap_or_else(|err| {
                eprintln!("Solve failed: {}", err);
                process::exit(1);
            });
            if let Some(slice) = solution.get(&start_context) {
                println!(
                    "Policy for [{}] after {} iterations:\n{}",
                    start_context, slice.iterations, slice.policy
                );
                println!("Values:\n{}", slice.values);
            }
            Box::new(solution)
        }
        "ql" => {
            let schedule: ExplorationSchedule = arg_value(&args, "--schedule")
                .unwrap_or("constant")
                .parse()
                .unwrap_or_else(|err| {
                    eprintln!("{}", err);
                    process::exit(2);
                });
            let config = QLearningConfig {
                schedule,
                epsilon: if schedule == ExplorationSchedule::LinearDecay {
                    1.0
                } else {
                    0.01
                },
                seed,
                ..Default::default()
            };
            let mut solver = QLearningSolver::new(&grid, config).unwrap_or_else(|err| {
                eprintln!("Invalid configuration: {}", err);
                process::exit(2);
            });
            let stats = solver.train();
            println!("{}", stats);
            println!(
                "Greedy policy for [{}]:\n{}",
                start_context,
                solver.policy_for(start_context)
            );
            Box::new(solver.into_table())
        }
        other => {
            eprintln!("Unknown --solver '{}'; expected 'vi', 'pi' or 'ql'.", other);
            process::exit(2);
        }
    };

    match evaluate(&grid, &environment, policy.as_ref(), episodes, 1_000, seed) {
        Ok(report) => println!("{}", report),
        Err(err) => eprintln!("Evaluation failed: {}", err),
    }
}

fn arg_value<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}
