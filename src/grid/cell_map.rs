//! Dense per-position storage used for policies and value tables.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::position::{Action, Position};
use super::world::GridWorld;

/// A value per grid position, `None` where nothing is defined (walls).
///
/// [`Policy`](crate::algorithms::Policy) and [`ValueTable`](crate::algorithms::ValueTable)
/// are aliases of this type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellMap<T> {
    nb_line: usize,
    nb_col: usize,
    cells: Vec<Option<T>>,
}

impl<T> CellMap<T> {
    /// Creates an empty map with the dimensions of `grid`.
    pub fn for_grid(grid: &GridWorld) -> Self {
        Self::new(grid.nb_line(), grid.nb_col())
    }

    /// Creates an empty `nb_line × nb_col` map.
    pub fn new(nb_line: usize, nb_col: usize) -> Self {
        Self {
            nb_line,
            nb_col,
            cells: (0..nb_line * nb_col).map(|_| None).collect(),
        }
    }

    pub fn nb_line(&self) -> usize {
        self.nb_line
    }

    pub fn nb_col(&self) -> usize {
        self.nb_col
    }

    fn index(&self, position: Position) -> Option<usize> {
        (position.x < self.nb_col && position.y < self.nb_line)
            .then(|| position.y * self.nb_col + position.x)
    }

    /// Value stored at `position`.
    pub fn get(&self, position: Position) -> Option<&T> {
        self.index(position).and_then(|i| self.cells[i].as_ref())
    }

    /// Stores `value` at `position`. Out-of-bounds positions are ignored.
    pub fn set(&mut self, position: Position, value: T) {
        if let Some(i) = self.index(position) {
            self.cells[i] = Some(value);
        }
    }

    /// Number of positions holding a value.
    pub fn defined(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Iterates defined `(position, value)` pairs row-major.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> + '_ {
        let nb_col = self.nb_col;
        self.cells.iter().enumerate().filter_map(move |(i, c)| {
            c.as_ref()
                .map(|v| (Position::new(i % nb_col, i / nb_col), v))
        })
    }
}

impl CellMap<f64> {
    /// Largest absolute difference between two value tables over positions defined in both.
    pub fn max_abs_diff(&self, other: &CellMap<f64>) -> f64 {
        self.cells
            .iter()
            .zip(other.cells.iter())
            .filter_map(|(a, b)| Some((a.as_ref()? - b.as_ref()?).abs()))
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for CellMap<Action> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.nb_col.max(1)) {
            let line: Vec<String> = row
                .iter()
                .map(|c| c.map(|a| a.arrow()).unwrap_or('█').to_string())
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

impl fmt::Display for CellMap<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.nb_col.max(1)) {
            let line: Vec<String> = row
                .iter()
                .map(|c| match c {
                    Some(v) => format!("{:>9.2}", v),
                    None => format!("{:>9}", "█"),
                })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
