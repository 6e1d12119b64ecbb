//! The rectangular grid world consumed by every solver.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::cell::CellType;
use super::error::GridError;
use super::position::{Action, Position};

/// An `nb_line × nb_col` matrix of [`CellType`], stored row-major.
///
/// Planning solvers borrow it immutably for the whole solve. The rollout simulator clones
/// it into a working copy and mutates that copy through [`GridWorld::set`] when
/// collectibles are picked up.
///
/// # Example
///
/// ```
/// use treasure_mdp::grid::{CellType, GridWorld, Position};
///
/// let grid: GridWorld = "TKB\nB_B\nBBS".parse().unwrap();
/// assert_eq!(grid.nb_line(), 3);
/// assert_eq!(grid.cell(Position::new(1, 0)), Some(CellType::Key));
/// assert!(!grid.is_open(Position::new(1, 1)));
/// assert_eq!(grid.start(), Some(Position::new(2, 2)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridWorld {
    nb_line: usize,
    nb_col: usize,
    cells: Vec<CellType>,
}

impl GridWorld {
    /// Builds a grid from its lines.
    ///
    /// Requires a non-empty rectangular matrix with at least one non-wall cell.
    pub fn new(rows: Vec<Vec<CellType>>) -> Result<Self, GridError> {
        let nb_line = rows.len();
        let nb_col = rows.first().map(Vec::len).unwrap_or(0);
        if nb_line == 0 || nb_col == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(nb_line * nb_col);
        for (line, row) in rows.into_iter().enumerate() {
            if row.len() != nb_col {
                return Err(GridError::Ragged {
                    line,
                    expected: nb_col,
                    found: row.len(),
                });
            }
            cells.extend(row);
        }

        if cells.iter().all(CellType::is_wall) {
            return Err(GridError::NoOpenCell);
        }

        Ok(Self {
            nb_line,
            nb_col,
            cells,
        })
    }

    /// Number of lines (height).
    pub fn nb_line(&self) -> usize {
        self.nb_line
    }

    /// Number of columns (width).
    pub fn nb_col(&self) -> usize {
        self.nb_col
    }

    /// Total number of cells, walls included.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false: construction rejects empty grids.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row-major index of `position`, if it is inside the grid.
    pub fn index(&self, position: Position) -> Option<usize> {
        (position.x < self.nb_col && position.y < self.nb_line)
            .then(|| position.y * self.nb_col + position.x)
    }

    /// Inverse of [`GridWorld::index`].
    pub fn position(&self, index: usize) -> Position {
        Position::new(index % self.nb_col, index / self.nb_col)
    }

    /// What is at `position`; `None` when out of bounds.
    pub fn cell(&self, position: Position) -> Option<CellType> {
        self.index(position).map(|i| self.cells[i])
    }

    /// True when `position` is in bounds and not a wall.
    pub fn is_open(&self, position: Position) -> bool {
        self.cell(position).is_some_and(|c| !c.is_wall())
    }

    /// Destination of a move, or `None` when the move is rejected (out of bounds or wall).
    pub fn step(&self, from: Position, action: Action) -> Option<Position> {
        from.offset(action, self.nb_line, self.nb_col)
            .filter(|p| self.is_open(*p))
    }

    /// Open orthogonal neighbours of `position`, in [`Action::ALL`] order.
    pub fn open_neighbours(&self, position: Position) -> Vec<Position> {
        Action::ALL
            .iter()
            .filter_map(|a| self.step(position, *a))
            .collect()
    }

    /// Location of the Start cell (the first one found, row-major).
    pub fn start(&self) -> Option<Position> {
        self.find(CellType::Start)
    }

    /// First cell of the given type, row-major.
    pub fn find(&self, cell: CellType) -> Option<Position> {
        self.cells
            .iter()
            .position(|c| *c == cell)
            .map(|i| self.position(i))
    }

    /// Iterates `(position, cell)` pairs row-major.
    pub fn cells(&self) -> impl Iterator<Item = (Position, CellType)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (self.position(i), *c))
    }

    /// All non-wall positions, row-major.
    pub fn open_positions(&self) -> Vec<Position> {
        self.cells()
            .filter(|(_, c)| !c.is_wall())
            .map(|(p, _)| p)
            .collect()
    }

    /// Overwrites a cell. Returns the previous content, or `None` when out of bounds.
    ///
    /// Only the rollout simulator's working copy is mutated this way.
    pub fn set(&mut self, position: Position, cell: CellType) -> Option<CellType> {
        let i = self.index(position)?;
        Some(std::mem::replace(&mut self.cells[i], cell))
    }
}

impl FromStr for GridWorld {
    type Err = GridError;

    /// Parses newline-separated lines of cell symbols. Commas and whitespace inside a line
    /// are ignored and blank lines are skipped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rows = Vec::new();
        for (line, text) in s.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            let mut row = Vec::new();
            for (column, symbol) in text
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .enumerate()
            {
                let cell = CellType::from_symbol(symbol).ok_or(GridError::UnknownSymbol {
                    symbol,
                    line,
                    column,
                })?;
                row.push(cell);
            }
            rows.push(row);
        }
        GridWorld::new(rows)
    }
}

impl fmt::Display for GridWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.nb_col) {
            let line: String = row.iter().map(CellType::symbol).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
