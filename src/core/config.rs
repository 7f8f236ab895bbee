//! Rule-set configuration loaded from JSON

use crate::core::{SpellBook, SpellId, SpellOverride};
use crate::{Result, SpellChessError};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_starting_mana() -> u32 {
    3
}

fn default_mana_regen() -> u32 {
    2
}

fn default_max_mana() -> u32 {
    10
}

/// Tunable rules: mana economy, spell loadout and per-spell overrides
///
/// Every field has a default, so `{}` is a valid configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_starting_mana")]
    pub starting_mana: u32,

    /// Mana gained at the start of each of a side's turns
    #[serde(default = "default_mana_regen")]
    pub mana_regen: u32,

    #[serde(default = "default_max_mana")]
    pub max_mana: u32,

    /// Spells both sides know; `None` means every spell in the table
    #[serde(default)]
    pub loadout: Option<Vec<SpellId>>,

    #[serde(default)]
    pub spell_overrides: Vec<SpellOverride>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            starting_mana: default_starting_mana(),
            mana_regen: default_mana_regen(),
            max_mana: default_max_mana(),
            loadout: None,
            spell_overrides: Vec::new(),
        }
    }
}

impl RulesConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RulesConfig =
            serde_json::from_str(json).map_err(|e| SpellChessError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_mana == 0 {
            return Err(SpellChessError::Config("max_mana must be positive".to_string()));
        }
        if let Some(loadout) = &self.loadout {
            if loadout.is_empty() {
                return Err(SpellChessError::Config(
                    "loadout must name at least one spell (omit it for all spells)".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Build the spell table this configuration describes
    pub fn spell_book(&self) -> SpellBook {
        let mut book = SpellBook::with_overrides(&self.spell_overrides);
        if let Some(loadout) = &self.loadout {
            for id in SpellId::ALL {
                if !loadout.contains(&id) {
                    book.remove(id);
                }
            }
        }
        book
    }

    /// Spells each side starts the game knowing
    pub fn known_spells(&self) -> Vec<SpellId> {
        match &self.loadout {
            Some(loadout) => loadout.clone(),
            None => SpellId::ALL.to_vec(),
        }
    }
}
