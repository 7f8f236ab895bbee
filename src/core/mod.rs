//! Core value types: squares, pieces, effects, spells, players

pub mod config;
pub mod effects;
pub mod entity;
pub mod piece;
pub mod player;
pub mod position;
pub mod spell;
pub mod types;

pub use config::RulesConfig;
pub use effects::{Effect, EffectId, EffectKind, Modifier};
pub use entity::{EntityStore, PieceId};
pub use piece::PieceMeta;
pub use player::{ManaPool, PlayerState};
pub use position::{CastlingRights, Position};
pub use spell::{SpellBook, SpellCast, SpellDef, SpellId, SpellOverride, SummonKind, TargetRule, TargetShape};
pub use types::{Piece, PieceKind, Side, Square};
