//! Reachable state graph of a level.

use std::collections::{HashMap, VecDeque};

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::grid::{Action, GridWorld};
use crate::model::{
    AugmentedState, EnvironmentConfig, InventoryContext, ModelError, Successor, TransitionModel,
};

/// Node of the reachability graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateNode {
    State(AugmentedState),
    Dead,
    Won,
}

/// Every augmented state reachable from Start under some policy.
///
/// Edges carry the probability of the transition under one of the actions leading there.
/// Inventory flags are updated by arrival effects, so unlike a planning slice this graph
/// spans contexts.
#[derive(Debug, Clone)]
pub struct ReachabilityGraph {
    graph: DiGraph<StateNode, f64>,
    node_by_state: HashMap<StateNode, NodeIndex>,
    root: NodeIndex,
    dead: NodeIndex,
    won: NodeIndex,
    violations: Vec<AugmentedState>,
}

impl ReachabilityGraph {
    /// Explores the transition model breadth-first from the Start cell.
    pub fn build(grid: &GridWorld, config: &EnvironmentConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let start = grid.start().ok_or(ModelError::MissingStart)?;
        let model = TransitionModel::new(grid, &config.transition, &config.rewards);
        let initial = AugmentedState::new(
            start,
            InventoryContext::empty(EnvironmentConfig::is_critical(config.player_health)),
        );

        let mut graph = DiGraph::new();
        let mut node_by_state = HashMap::new();
        let dead = graph.add_node(StateNode::Dead);
        let won = graph.add_node(StateNode::Won);
        node_by_state.insert(StateNode::Dead, dead);
        node_by_state.insert(StateNode::Won, won);
        let root = graph.add_node(StateNode::State(initial));
        node_by_state.insert(StateNode::State(initial), root);

        let mut violations = Vec::new();
        let mut queue = VecDeque::from([initial]);
        while let Some(state) = queue.pop_front() {
            if !grid.is_open(state.position) {
                violations.push(state);
            }
            let from = node_by_state[&StateNode::State(state)];
            for action in Action::ALL {
                let transition = model.transition_or_rejected(&state, action);
                for outcome in transition.outcomes {
                    let target = match outcome.successor {
                        Successor::Alive(s) | Successor::Hurt(s) => StateNode::State(s),
                        Successor::Dead => StateNode::Dead,
                        Successor::Won => StateNode::Won,
                    };
                    let to = match node_by_state.get(&target) {
                        Some(node) => *node,
                        None => {
                            let node = graph.add_node(target);
                            node_by_state.insert(target, node);
                            if let StateNode::State(s) = target {
                                queue.push_back(s);
                            }
                            node
                        }
                    };
                    graph.update_edge(from, to, outcome.probability);
                }
            }
        }

        Ok(Self {
            graph,
            node_by_state,
            root,
            dead,
            won,
            violations,
        })
    }

    /// Number of reachable augmented states (sinks excluded).
    pub fn len(&self) -> usize {
        self.graph.node_count() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, state: &AugmentedState) -> bool {
        self.node_by_state.contains_key(&StateNode::State(*state))
    }

    /// Reachable states, sorted.
    pub fn states(&self) -> Vec<AugmentedState> {
        let mut states: Vec<AugmentedState> = self
            .graph
            .node_weights()
            .filter_map(|n| match n {
                StateNode::State(s) => Some(*s),
                _ => None,
            })
            .collect();
        states.sort();
        states
    }

    /// Whether some policy can bring the treasure back to Start.
    pub fn can_win(&self) -> bool {
        has_path_connecting(&self.graph, self.root, self.won, None)
    }

    /// Whether some policy can get the agent killed.
    pub fn can_die(&self) -> bool {
        has_path_connecting(&self.graph, self.root, self.dead, None)
    }

    /// Reachable states standing on a wall. Always empty for a consistent model.
    pub fn open_cell_violations(&self) -> &[AugmentedState] {
        &self.violations
    }

    pub fn graph(&self) -> &DiGraph<StateNode, f64> {
        &self.graph
    }
}
