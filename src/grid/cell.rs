//! Cell types of the grid world.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What occupies a grid cell.
///
/// Each variant has a one-character level symbol (see [`CellType::symbol`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CellType {
    Wall,
    Blank,
    Start,
    Enemy,
    Trap,
    Crack,
    Treasure,
    Sword,
    Key,
    Portal,
    MovingPlatform,
}

impl CellType {
    /// Returns all cell types in declaration order.
    pub fn all() -> [CellType; 11] {
        [
            CellType::Wall,
            CellType::Blank,
            CellType::Start,
            CellType::Enemy,
            CellType::Trap,
            CellType::Crack,
            CellType::Treasure,
            CellType::Sword,
            CellType::Key,
            CellType::Portal,
            CellType::MovingPlatform,
        ]
    }

    /// Position of this variant in [`CellType::all`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Level symbol of this cell type.
    pub fn symbol(&self) -> char {
        match self {
            CellType::Wall => '_',
            CellType::Blank => 'B',
            CellType::Start => 'S',
            CellType::Enemy => 'E',
            CellType::Trap => 'R',
            CellType::Crack => 'C',
            CellType::Treasure => 'T',
            CellType::Sword => 'W',
            CellType::Key => 'K',
            CellType::Portal => 'P',
            CellType::MovingPlatform => 'M',
        }
    }

    /// Parses a level symbol.
    pub fn from_symbol(symbol: char) -> Option<CellType> {
        CellType::all().into_iter().find(|c| c.symbol() == symbol)
    }

    pub fn is_wall(&self) -> bool {
        matches!(self, CellType::Wall)
    }

    /// Cells the agent can never stay on: arriving always moves it on.
    ///
    /// A Trap relocates only part of the time, so it is not one of them.
    pub fn always_relocates(&self) -> bool {
        matches!(self, CellType::Portal | CellType::MovingPlatform)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
