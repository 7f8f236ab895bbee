//! Spell Chess - a rules engine that layers spells over standard chess
//!
//! Standard legality comes from a pluggable rules oracle; this crate adds
//! per-piece metadata, timed effects, fifteen spells, turn and mana control,
//! and a computer opponent that weighs spells against ordinary moves.

pub mod ai;
pub mod board;
pub mod core;
pub mod error;
pub mod game;
pub mod ledger;
pub mod oracle;
pub mod tournament;

pub use error::{Result, SpellChessError};
