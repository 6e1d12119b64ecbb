use thiserror::Error;

use crate::model::{InventoryContext, ModelError};

/// Errors raised when configuring or running a solver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("Invalid parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Unknown exploration schedule: {0}")]
    UnknownExplorationSchedule(String),

    #[error("Singular linear system for context [{context}]: {detail}")]
    SingularSystem {
        context: InventoryContext,
        detail: String,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}
