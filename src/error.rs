//! Error types for spellchess

use crate::core::Side;
use crate::game::GameStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpellChessError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Action would leave the {0} king in check")]
    WouldCauseSelfCheck(Side),

    #[error("Insufficient mana: need {needed}, have {available}")]
    InsufficientMana { needed: u32, available: u32 },

    #[error("It is not {0}'s turn")]
    NotCurrentTurn(Side),

    #[error("Unknown spell or move: {0}")]
    UnknownSpellOrMove(String),

    #[error("Game is already over: {0}")]
    GameAlreadyOver(GameStatus),

    #[error("A spell has already been cast this turn")]
    SpellAlreadyCast,

    #[error("Rules oracle rejected position: {0}")]
    InvalidPosition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpellChessError>;
