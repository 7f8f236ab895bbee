//! Per-side player state: mana pool and known spells

use crate::core::{Side, SpellId};
use crate::{Result, SpellChessError};
use serde::{Deserialize, Serialize};

/// Bounded, regenerating mana pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaPool {
    pub current: u32,
    pub max: u32,
}

impl ManaPool {
    pub fn new(current: u32, max: u32) -> Self {
        ManaPool {
            current: current.min(max),
            max,
        }
    }

    pub fn can_pay(&self, cost: u32) -> bool {
        self.current >= cost
    }

    /// Deduct `cost`, leaving the pool untouched if it cannot be paid
    pub fn pay(&mut self, cost: u32) -> Result<()> {
        if !self.can_pay(cost) {
            return Err(SpellChessError::InsufficientMana {
                needed: cost,
                available: self.current,
            });
        }
        self.current -= cost;
        Ok(())
    }

    /// Add `amount`, capped at the pool maximum
    pub fn regenerate(&mut self, amount: u32) {
        self.current = self.current.saturating_add(amount).min(self.max);
    }

    pub fn set(&mut self, amount: u32) {
        self.current = amount.min(self.max);
    }
}

/// Represents one side of the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub side: Side,
    pub mana: ManaPool,

    /// Spells this player may cast this game
    pub known_spells: Vec<SpellId>,
}

impl PlayerState {
    pub fn new(side: Side, mana: ManaPool, known_spells: Vec<SpellId>) -> Self {
        PlayerState {
            side,
            mana,
            known_spells,
        }
    }

    pub fn knows(&self, spell: SpellId) -> bool {
        self.known_spells.contains(&spell)
    }
}
