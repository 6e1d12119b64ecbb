//! Reward model: base rewards per cell type, inventory overrides, death and damage values.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::error::ModelError;
use super::state::InventoryContext;
use crate::grid::CellType;

/// Reward of a cell type missing from [`RewardTable::base`].
pub const DEFAULT_STEP_REWARD: f64 = -1.0;

/// Immutable reward configuration shared by every solver.
///
/// The reward of a move is looked up on the destination cell. Overrides are applied in the
/// order `with_key`, `with_sword`, `with_treasure`, each only when the matching flag is set;
/// a later override wins. A rejected move (wall or edge) earns the `Wall` entry of `base`.
///
/// # Example
///
/// ```
/// use treasure_mdp::grid::CellType;
/// use treasure_mdp::model::{InventoryContext, RewardTable};
///
/// let rewards = RewardTable::default();
/// let empty = InventoryContext::empty(true);
/// assert_eq!(rewards.reward(CellType::Key, &empty), 1000.0);
/// assert_eq!(rewards.reward(CellType::Key, &empty.with_key()), -1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RewardTable {
    pub base: HashMap<CellType, f64>,
    pub with_key: HashMap<CellType, f64>,
    pub with_sword: HashMap<CellType, f64>,
    pub with_treasure: HashMap<CellType, f64>,
    /// Reward of a fatal transition in rollouts, value of the absorbing dead state in planning.
    pub death: f64,
    /// Planning value of a survived health loss.
    pub damage: f64,
}

impl RewardTable {
    /// Base reward of `cell`, before any override.
    pub fn base_for(&self, cell: CellType) -> f64 {
        self.base
            .get(&cell)
            .copied()
            .unwrap_or(DEFAULT_STEP_REWARD)
    }

    /// Reward for arriving on `cell` while holding `inventory`.
    pub fn reward(&self, cell: CellType, inventory: &InventoryContext) -> f64 {
        let mut reward = self.base_for(cell);
        let overrides = [
            (inventory.has_key, &self.with_key),
            (inventory.has_sword, &self.with_sword),
            (inventory.has_treasure, &self.with_treasure),
        ];
        for (active, table) in overrides {
            if let Some(value) = table.get(&cell).filter(|_| active) {
                reward = *value;
            }
        }
        reward
    }

    /// Reward of a rejected move.
    pub fn wall(&self) -> f64 {
        self.base_for(CellType::Wall)
    }

    /// Materialises the lookup for one inventory context.
    pub fn for_context(&self, inventory: &InventoryContext) -> ContextRewards {
        let mut by_cell = [0.0; 11];
        for cell in CellType::all() {
            by_cell[cell.index()] = self.reward(cell, inventory);
        }
        ContextRewards {
            by_cell,
            death: self.death,
            damage: self.damage,
        }
    }

    /// Lowest ordinary reward: every base and override entry, plus damage.
    pub fn lowest_ordinary(&self) -> f64 {
        [&self.base, &self.with_key, &self.with_sword, &self.with_treasure]
            .into_iter()
            .flat_map(|table| table.values().copied())
            .chain([DEFAULT_STEP_REWARD, self.damage])
            .fold(f64::INFINITY, f64::min)
    }

    /// Death must be the worst outcome of the process.
    pub fn validate(&self) -> Result<(), ModelError> {
        let lowest = self.lowest_ordinary();
        if self.death >= lowest {
            return Err(ModelError::DeathNotLowest {
                death: self.death,
                lowest,
            });
        }
        Ok(())
    }
}

impl Default for RewardTable {
    fn default() -> Self {
        let mut base: HashMap<CellType, f64> = CellType::all()
            .into_iter()
            .map(|c| (c, DEFAULT_STEP_REWARD))
            .collect();
        base.insert(CellType::Wall, -100.0);
        base.insert(CellType::Sword, 500.0);
        base.insert(CellType::Key, 1000.0);

        let mut with_key = HashMap::new();
        with_key.insert(CellType::Treasure, 1000.0);
        with_key.insert(CellType::Key, -1.0);

        let mut with_sword = HashMap::new();
        with_sword.insert(CellType::Sword, -1.0);

        let mut with_treasure = HashMap::new();
        with_treasure.insert(CellType::Start, 1000.0);
        with_treasure.insert(CellType::Treasure, -1.0);

        Self {
            base,
            with_key,
            with_sword,
            with_treasure,
            death: -500.0,
            damage: -2.0,
        }
    }
}

/// Reward lookup for one fixed inventory context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextRewards {
    by_cell: [f64; 11],
    pub death: f64,
    pub damage: f64,
}

impl ContextRewards {
    pub fn get(&self, cell: CellType) -> f64 {
        self.by_cell[cell.index()]
    }
}
