//! Grid world: cell types, coordinates, moves and per-position storage.
//!
//! This is the leaf of the crate. Everything above it only asks two questions of a
//! [`GridWorld`]: what is at `(x, y)`, and is `(x, y)` in bounds and not a wall.

mod cell;
mod cell_map;
mod error;
mod position;
mod world;

pub use cell::CellType;
pub use cell_map::CellMap;
pub use error::GridError;
pub use position::{Action, Position};
pub use world::GridWorld;
