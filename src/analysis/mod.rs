//! Diagnostics over levels and solver outputs.
//!
//! - [`ReachabilityGraph`] explores every augmented state reachable from Start.
//! - [`evaluate`] rolls any [`GreedyPolicy`](crate::algorithms::GreedyPolicy) out in the
//!   simulator.

mod evaluation;
mod reachability;

pub use evaluation::{evaluate, EvaluationReport};
pub use reachability::{ReachabilityGraph, StateNode};
