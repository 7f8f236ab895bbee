//! Per-piece metadata kept alongside the oracle position

use crate::core::{Effect, EffectId, EffectKind, Modifier, Piece, PieceId, PieceKind, Side, Square};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Everything the engine knows about a piece beyond its chess identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceMeta {
    pub id: PieceId,
    pub kind: PieceKind,
    pub side: Side,

    /// Active effects, in the order they were attached
    pub effects: SmallVec<[Effect; 2]>,

    pub has_moved: bool,

    /// Squares this piece has occupied; the last entry is where it stands now
    pub history: Vec<Square>,
}

impl PieceMeta {
    pub fn new(id: PieceId, kind: PieceKind, side: Side, square: Square) -> Self {
        PieceMeta {
            id,
            kind,
            side,
            effects: SmallVec::new(),
            has_moved: false,
            history: vec![square],
        }
    }

    pub fn piece(&self) -> Piece {
        Piece::new(self.kind, self.side)
    }

    /// Current square (the tail of the history)
    pub fn square(&self) -> Square {
        // history is never empty: constructors seed it with the starting square
        self.history[self.history.len() - 1]
    }

    /// Square occupied `steps` relocations ago, if the history reaches that far
    pub fn square_before(&self, steps: usize) -> Option<Square> {
        self.history
            .len()
            .checked_sub(steps + 1)
            .map(|idx| self.history[idx])
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.effects.iter().any(|e| e.has_modifier(modifier))
    }

    pub fn has_effect_kind(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    pub fn effect(&self, id: EffectId) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id == id)
    }

    pub fn is_immobile(&self) -> bool {
        self.has_modifier(Modifier::PreventMovement)
    }

    pub fn is_shielded(&self) -> bool {
        self.has_modifier(Modifier::PreventCapture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{types::sq, SpellId};

    #[test]
    fn test_history_lookup() {
        let mut meta = PieceMeta::new(PieceId::new(3), PieceKind::Rook, Side::White, sq("a1"));
        meta.history.push(sq("a4"));
        meta.history.push(sq("h4"));

        assert_eq!(meta.square(), sq("h4"));
        assert_eq!(meta.square_before(0), Some(sq("h4")));
        assert_eq!(meta.square_before(2), Some(sq("a1")));
        assert_eq!(meta.square_before(3), None);
    }

    #[test]
    fn test_modifier_queries() {
        let mut meta = PieceMeta::new(PieceId::new(1), PieceKind::Bishop, Side::Black, sq("c8"));
        assert!(!meta.is_immobile());
        meta.effects.push(
            Effect::new(EffectId::new(0), EffectKind::Shield, 3, SpellId::ArcaneAnchor)
                .with_modifier(Modifier::PreventMovement)
                .with_modifier(Modifier::PreventCapture),
        );
        assert!(meta.is_immobile());
        assert!(meta.is_shielded());
        assert!(meta.has_effect_kind(EffectKind::Shield));
    }
}
