//! Timed effects attached to pieces

use crate::core::{PieceKind, SpellId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Unique identifier of an effect instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectId(u32);

impl EffectId {
    pub fn new(id: u32) -> Self {
        EffectId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fx{}", self.0)
    }
}

/// Broad category of an effect, used for the ledger's board-wide index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectKind {
    /// Protective ward (arcane anchor)
    Shield,
    /// Temporary change of piece type (ember crown)
    Transform,
    /// Summoned piece that disappears on expiry (mist clone)
    Summon,
    /// Summoned pawn that promotes to a rook on expiry
    Bonewalker,
    /// Membership in a linked group; the group owns the countdown
    Link,
    /// Mark left by a triggered glyph, resolved at the next tick
    Glyph,
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectKind::Shield => "shield",
            EffectKind::Transform => "transform",
            EffectKind::Summon => "summon",
            EffectKind::Bonewalker => "bonewalker",
            EffectKind::Link => "link",
            EffectKind::Glyph => "glyph",
        };
        write!(f, "{name}")
    }
}

/// Rule modifier carried by an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    /// Enemy moves may not capture this piece
    PreventCapture,
    /// This piece has no legal destinations
    PreventMovement,
    /// The piece's type before a transform, restored when dispelled
    OriginalForm(PieceKind),
}

/// A timed modifier on a piece
///
/// `remaining` is strictly positive while the effect is attached; the ledger
/// detaches it in the same tick that brings it to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub id: EffectId,
    pub kind: EffectKind,
    pub remaining: u32,
    pub origin: SpellId,
    pub modifiers: SmallVec<[Modifier; 2]>,
}

impl Effect {
    pub fn new(id: EffectId, kind: EffectKind, duration: u32, origin: SpellId) -> Self {
        Effect {
            id,
            kind,
            remaining: duration.max(1),
            origin,
            modifiers: SmallVec::new(),
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// Piece type to restore when this effect is removed early
    pub fn original_form(&self) -> Option<PieceKind> {
        self.modifiers.iter().find_map(|m| match m {
            Modifier::OriginalForm(kind) => Some(*kind),
            _ => None,
        })
    }

    /// Count down one turn, returning true when the effect has run out
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}
