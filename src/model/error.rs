use thiserror::Error;

/// Errors raised while validating the environment model configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Probability `{name}` must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("Trap probabilities exceed 1: p_hurt = {p_hurt}, p_reset = {p_reset}")]
    ProbabilityMassExceeded { p_hurt: f64, p_reset: f64 },

    #[error("Maximum chain length must be at least 1")]
    ZeroChainLength,

    #[error("Death value {death} must be strictly below every ordinary reward (lowest is {lowest})")]
    DeathNotLowest { death: f64, lowest: f64 },

    #[error("Player health must be at least 1")]
    ZeroHealth,

    #[error("Grid has no Start cell")]
    MissingStart,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = ModelError::InvalidProbability {
            name: "p_fight",
            value: 1.5,
        };
        assert_eq!(
            err.to_string(),
            "Probability `p_fight` must lie in [0, 1], got 1.5"
        );

        let err = ModelError::DeathNotLowest {
            death: -10.0,
            lowest: -100.0,
        };
        assert!(err.to_string().contains("-100"));
    }
}
