//! Inventory contexts and augmented states.
//!
//! The true state of the decision process is a grid position plus four flags. Value and
//! policy iteration solve one slice per [`InventoryContext`]; Q-learning keys its table by
//! the full [`AugmentedState`].

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::grid::Position;

/// The inventory/health flags carried by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InventoryContext {
    pub has_key: bool,
    pub has_sword: bool,
    pub has_treasure: bool,
    /// One more health loss kills the agent.
    pub critical: bool,
}

impl InventoryContext {
    /// Creates a context from its four flags.
    pub const fn new(has_key: bool, has_sword: bool, has_treasure: bool, critical: bool) -> Self {
        Self {
            has_key,
            has_sword,
            has_treasure,
            critical,
        }
    }

    /// Inventory at the beginning of an episode: nothing collected.
    pub const fn empty(critical: bool) -> Self {
        Self::new(false, false, false, critical)
    }

    /// Every context a planning solver has to cover.
    ///
    /// The treasure can only be picked up with the key, so `has_treasure` without `has_key`
    /// is skipped, leaving 12 contexts.
    pub fn all() -> Vec<InventoryContext> {
        let mut contexts = Vec::with_capacity(12);
        for has_key in [false, true] {
            for has_sword in [false, true] {
                for has_treasure in [false, true] {
                    if has_treasure && !has_key {
                        continue;
                    }
                    for critical in [false, true] {
                        contexts.push(Self::new(has_key, has_sword, has_treasure, critical));
                    }
                }
            }
        }
        contexts
    }

    pub fn with_key(self) -> Self {
        Self {
            has_key: true,
            ..self
        }
    }

    pub fn with_sword(self) -> Self {
        Self {
            has_sword: true,
            ..self
        }
    }

    pub fn with_treasure(self) -> Self {
        Self {
            has_treasure: true,
            ..self
        }
    }

    /// Context after a survived health loss.
    pub fn hurt(self) -> Self {
        Self {
            critical: true,
            ..self
        }
    }
}

impl fmt::Display for InventoryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |b: bool| if b { "yes" } else { "no" };
        write!(
            f,
            "key:{} sword:{} treasure:{} critical:{}",
            flag(self.has_key),
            flag(self.has_sword),
            flag(self.has_treasure),
            flag(self.critical)
        )
    }
}

/// Grid position plus inventory: the state key shared by every value and Q table.
///
/// Invariant: `position` never denotes a wall cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AugmentedState {
    pub position: Position,
    pub inventory: InventoryContext,
}

impl AugmentedState {
    pub const fn new(position: Position, inventory: InventoryContext) -> Self {
        Self {
            position,
            inventory,
        }
    }
}

impl fmt::Display for AugmentedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.position, self.inventory)
    }
}
