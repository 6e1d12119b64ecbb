use thiserror::Error;

/// Errors raised while building a [`GridWorld`](super::GridWorld).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Grid has no lines or no columns")]
    Empty,

    #[error("Line {line} has {found} cells, expected {expected}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Grid contains no open (non-wall) cell")]
    NoOpenCell,

    #[error("Unknown cell symbol '{symbol}' at line {line}, column {column}")]
    UnknownSymbol {
        symbol: char,
        line: usize,
        column: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_display() {
        let e = GridError::Ragged {
            line: 2,
            expected: 4,
            found: 3,
        };
        assert_eq!(e.to_string(), "Line 2 has 3 cells, expected 4");
    }

    #[test]
    fn unknown_symbol_display() {
        let e = GridError::UnknownSymbol {
            symbol: 'x',
            line: 0,
            column: 1,
        };
        assert!(e.to_string().contains("'x'"));
    }
}
