//! Spell resolver
//!
//! `cast_spell` checks turn, mana and targets, then dispatches on the
//! `SpellCast` variant to one handler per spell. Handlers mutate a draft copy
//! of the game; any failure discards the draft, so nothing is spent or moved.

use crate::core::{
    Effect, EffectKind, Modifier, PieceId, PieceKind, Side, SpellCast, SpellDef, SpellId, Square, SummonKind, TargetRule,
};
use crate::game::state::{ActionReport, GameState};
use crate::ledger::LinkedGroup;
use crate::oracle::RulesOracle;
use crate::{Result, SpellChessError};
use smallvec::SmallVec;

fn invalid(message: impl Into<String>) -> SpellChessError {
    SpellChessError::InvalidTarget(message.into())
}

/// Whether `kind` could travel from `from` to `to` on an empty board
fn matches_geometry(kind: PieceKind, side: Side, from: Square, to: Square) -> bool {
    let df = (to.file() as i8 - from.file() as i8).abs();
    let dr = to.rank() as i8 - from.rank() as i8;
    let adr = dr.abs();
    if from == to {
        return false;
    }
    match kind {
        PieceKind::Knight => (df == 1 && adr == 2) || (df == 2 && adr == 1),
        PieceKind::Bishop => df == adr,
        PieceKind::Rook => df == 0 || adr == 0,
        PieceKind::Queen => df == adr || df == 0 || adr == 0,
        PieceKind::King => df <= 1 && adr <= 1,
        PieceKind::Pawn => {
            let step = dr * side.forward();
            df == 0 && (step == 1 || (step == 2 && from.rank() == side.pawn_rank()))
        }
    }
}

/// Ranks (0-based) in which `side` may raise a bonewalker
fn own_half(side: Side) -> std::ops::RangeInclusive<u8> {
    match side {
        Side::White => 1..=3,
        Side::Black => 4..=6,
    }
}

impl<O: RulesOracle> GameState<O> {
    /// Cast a spell for `side`
    ///
    /// Checks, in order: game over and turn, one spell per turn, a definition
    /// for the spell, that `side` knows it, mana, then the spell's targets.
    pub fn cast_spell(&mut self, side: Side, cast: SpellCast) -> Result<ActionReport> {
        self.ensure_can_act(side)?;
        if self.turn.spell_cast {
            return Err(SpellChessError::SpellAlreadyCast);
        }
        let id = cast.id();
        let def = self.spellbook.get(id)?.clone();
        if !self.players[side.index()].knows(id) {
            return Err(SpellChessError::UnknownSpellOrMove(format!("{side} does not know {id}")));
        }
        let pool = self.players[side.index()].mana;
        if !pool.can_pay(def.mana_cost) {
            return Err(SpellChessError::InsufficientMana {
                needed: def.mana_cost,
                available: pool.current,
            });
        }

        let mut draft = self.clone();
        draft.check_targets(side, &def, &cast)?;
        draft.resolve(side, &def, &cast)?;
        if draft.oracle.king_in_check(&draft.board_position(side), side) {
            return Err(SpellChessError::WouldCauseSelfCheck(side));
        }
        draft.players[side.index()].mana.pay(def.mana_cost)?;
        draft.turn.spell_cast = true;

        let line = format!("{}. {side} casts {cast}", draft.turn.turn_number);
        draft.move_log.push(line.clone());

        let events = if def.ends_turn {
            draft.finish_turn()?
        } else {
            // The caster stays to move, so the opponent must not be left in check
            if draft.oracle.king_in_check(&draft.board_position(side), side.opponent()) {
                return Err(invalid(format!("{id} cannot give check without ending the turn")));
            }
            draft.sync_oracle(side)?;
            Vec::new()
        };

        *self = draft;
        Ok(ActionReport {
            line,
            turn_ended: def.ends_turn,
            events,
        })
    }

    /// Shape, per-slot ownership rules and distinctness
    fn check_targets(&self, side: Side, def: &SpellDef, cast: &SpellCast) -> Result<()> {
        let squares = cast.target_squares();
        if !def.shape.accepts(squares.len()) {
            return Err(invalid(format!("{} takes {:?} targets, got {}", def.id, def.shape, squares.len())));
        }
        for (slot, square) in squares.iter().enumerate() {
            if squares[..slot].contains(square) {
                return Err(invalid(format!("{square} is targeted twice")));
            }
            let Some(rule) = def.rule_for(slot) else {
                continue;
            };
            let owner = self.board.side_at(*square);
            let ok = match rule {
                TargetRule::OwnPiece => owner == Some(side),
                TargetRule::EnemyPiece => owner == Some(side.opponent()),
                TargetRule::AnyPiece => owner.is_some(),
                TargetRule::EmptySquare => owner.is_none(),
                TargetRule::NotOwnPiece => owner != Some(side),
            };
            if !ok {
                return Err(invalid(format!("{square} does not satisfy {rule:?} for {}", def.id)));
            }
        }
        Ok(())
    }

    fn resolve(&mut self, side: Side, def: &SpellDef, cast: &SpellCast) -> Result<()> {
        match cast {
            SpellCast::AstralSwap { first, second } => self.astral_swap(*first, *second),
            SpellCast::PhantomStep { from, to } => self.phantom_step(side, *from, *to),
            SpellCast::EmberCrown { pawn } => self.ember_crown(*pawn, def),
            SpellCast::ArcaneAnchor { target } => self.arcane_anchor(*target, def),
            SpellCast::MistClone { source, to } => self.mist_clone(side, *source, *to, def),
            SpellCast::ChronoRecall { target } => self.chrono_recall(*target, def),
            SpellCast::RuneGlyph { square } => self.ledger.place_glyph(*square, side, def.duration),
            SpellCast::TwinStride => self.twin_stride(side),
            SpellCast::BloodTithe { pawns, summon } => self.blood_tithe(side, pawns, *summon),
            SpellCast::SoulLink { primary, backups } => self.soul_link(*primary, backups, def),
            SpellCast::DualMarch { first, second } => self.dual_march(side, *first, *second),
            SpellCast::RookWard => {
                self.ledger.set_rook_ward(side, def.duration);
                Ok(())
            }
            SpellCast::Dispel { target } => self.dispel(*target),
            SpellCast::VeilOfMist => {
                self.ledger.set_veil(side, def.duration);
                Ok(())
            }
            SpellCast::RaiseBonewalker { square } => self.raise_bonewalker(side, *square, def),
        }
    }

    fn astral_swap(&mut self, first: Square, second: Square) -> Result<()> {
        for (from, to) in [(first, second), (second, first)] {
            let meta = self
                .board
                .get(from)
                .ok_or_else(|| invalid(format!("no piece on {from}")))?;
            if meta.is_immobile() {
                return Err(invalid(format!("the piece on {from} is anchored")));
            }
            if meta.kind == PieceKind::Pawn && to.is_back_rank() {
                return Err(invalid(format!("a pawn cannot be swapped onto {to}")));
            }
        }
        self.board.swap(first, second)
    }

    fn phantom_step(&mut self, side: Side, from: Square, to: Square) -> Result<()> {
        let meta = self
            .board
            .get(from)
            .ok_or_else(|| invalid(format!("no piece on {from}")))?;
        if meta.is_immobile() {
            return Err(invalid(format!("the piece on {from} is anchored")));
        }
        if !matches_geometry(meta.kind, side, from, to) {
            return Err(invalid(format!("a {} cannot step from {from} to {to}", meta.kind)));
        }
        if meta.kind == PieceKind::Pawn && to.rank() == side.promotion_rank() {
            return Err(invalid("a phantom step cannot promote a pawn"));
        }
        self.board.relocate(from, to)?;
        Ok(())
    }

    fn ember_crown(&mut self, pawn: Square, def: &SpellDef) -> Result<()> {
        let id = match self.board.get(pawn) {
            Some(meta) if meta.kind == PieceKind::Pawn => meta.id,
            _ => return Err(invalid(format!("ember crown needs a pawn, {pawn} has none"))),
        };
        self.board.set_kind(pawn, PieceKind::Queen)?;
        let effect = Effect::new(self.ledger.next_effect_id(), EffectKind::Transform, def.duration, def.id)
            .with_modifier(Modifier::OriginalForm(PieceKind::Pawn));
        self.ledger.attach(&mut self.board, id, effect)
    }

    fn arcane_anchor(&mut self, target: Square, def: &SpellDef) -> Result<()> {
        let meta = self
            .board
            .get(target)
            .ok_or_else(|| invalid(format!("no piece on {target}")))?;
        if meta.kind == PieceKind::King {
            return Err(invalid("the king cannot be anchored"));
        }
        if meta.has_effect_kind(EffectKind::Shield) {
            return Err(invalid(format!("the piece on {target} is already anchored")));
        }
        let id = meta.id;
        let effect = Effect::new(self.ledger.next_effect_id(), EffectKind::Shield, def.duration, def.id)
            .with_modifier(Modifier::PreventMovement)
            .with_modifier(Modifier::PreventCapture);
        self.ledger.attach(&mut self.board, id, effect)
    }

    fn mist_clone(&mut self, side: Side, source: Square, to: Square, def: &SpellDef) -> Result<()> {
        let kind = self
            .board
            .get(source)
            .map(|meta| meta.kind)
            .ok_or_else(|| invalid(format!("no piece on {source}")))?;
        if kind == PieceKind::King {
            return Err(invalid("the king cannot be cloned"));
        }
        if kind == PieceKind::Pawn && to.is_back_rank() {
            return Err(invalid(format!("a pawn clone cannot stand on {to}")));
        }
        let id = self.board.put(to, kind, side);
        let effect = Effect::new(self.ledger.next_effect_id(), EffectKind::Summon, def.duration, def.id);
        self.ledger.attach(&mut self.board, id, effect)
    }

    fn chrono_recall(&mut self, target: Square, def: &SpellDef) -> Result<()> {
        let steps = def.duration.max(1) as usize;
        let meta = self
            .board
            .get(target)
            .ok_or_else(|| invalid(format!("no piece on {target}")))?;
        if meta.is_immobile() {
            return Err(invalid(format!("the piece on {target} is anchored")));
        }
        if meta.history.len() < steps + 1 {
            return Err(invalid(format!(
                "the piece on {target} has only {} recorded squares",
                meta.history.len()
            )));
        }
        let destination = meta
            .square_before(steps)
            .ok_or_else(|| invalid("history too short"))?;
        if destination == target {
            return Err(invalid(format!("the piece already stands on {destination}")));
        }
        if meta.kind == PieceKind::Pawn && destination.is_back_rank() {
            return Err(invalid(format!("a pawn cannot return to {destination}")));
        }
        if !self.board.is_empty_square(destination) {
            return Err(invalid(format!("{destination} is occupied")));
        }
        self.board.relocate(target, destination)?;
        Ok(())
    }

    fn twin_stride(&mut self, side: Side) -> Result<()> {
        self.turn.king_moves_left = 2;
        if self.legal_moves(side).is_empty() {
            return Err(invalid("the king has nowhere to stride"));
        }
        Ok(())
    }

    fn blood_tithe(&mut self, side: Side, pawns: &[Square; 3], summon: SummonKind) -> Result<()> {
        for square in pawns {
            if self.board.get(*square).map(|meta| meta.kind) != Some(PieceKind::Pawn) {
                return Err(invalid(format!("blood tithe needs pawns, {square} holds none")));
            }
        }
        for square in pawns {
            if let Some(id) = self.board.id_at(*square) {
                self.remove_piece(id);
            }
        }
        self.board.put(pawns[0], summon.into(), side);
        Ok(())
    }

    fn soul_link(&mut self, primary: Square, backups: &SmallVec<[Square; 2]>, def: &SpellDef) -> Result<()> {
        let primary_meta = self
            .board
            .get(primary)
            .ok_or_else(|| invalid(format!("no piece on {primary}")))?;
        if !primary_meta.kind.is_major() {
            return Err(invalid("soul link binds a rook or a queen"));
        }
        let primary_id = primary_meta.id;

        let mut backup_ids: SmallVec<[_; 2]> = SmallVec::new();
        for square in backups {
            match self.board.get(*square) {
                Some(meta) if meta.kind == PieceKind::Pawn => backup_ids.push(meta.id),
                _ => return Err(invalid(format!("soul link backups must be pawns, {square} is not"))),
            }
        }
        if backup_ids.is_empty() {
            return Err(invalid("soul link needs at least one pawn"));
        }
        if std::iter::once(primary_id)
            .chain(backup_ids.iter().copied())
            .any(|id| self.ledger.is_linked(id))
        {
            return Err(invalid("a targeted piece is already linked"));
        }

        for id in std::iter::once(primary_id).chain(backup_ids.iter().copied()) {
            let effect = Effect::new(self.ledger.next_effect_id(), EffectKind::Link, def.duration, def.id);
            self.ledger.attach(&mut self.board, id, effect)?;
        }
        self.ledger.add_link(LinkedGroup {
            primary: primary_id,
            backups: backup_ids,
            remaining: def.duration.max(1),
        });
        Ok(())
    }

    fn dual_march(&mut self, side: Side, first: (Square, Square), second: (Square, Square)) -> Result<()> {
        for (leg, (from, to)) in [first, second].into_iter().enumerate() {
            if leg > 0 {
                if self.oracle.king_in_check(&self.board_position(side), side.opponent()) {
                    return Err(invalid("the first march may not give check"));
                }
                self.sync_oracle(side)?;
            }
            let m = self
                .legal_moves(side)
                .into_iter()
                .find(|m| m.from == from && m.to == to && m.promotion.map_or(true, |p| p == PieceKind::Queen))
                .ok_or_else(|| invalid(format!("{from}{to} is not a legal march")))?;
            if m.is_capture() || m.is_castle {
                return Err(invalid(format!("{from}{to} must be a quiet move")));
            }
            self.play_standard_move(side, &m)?;
        }
        Ok(())
    }

    fn dispel(&mut self, target: Square) -> Result<()> {
        let (id, has_effects) = self
            .board
            .get(target)
            .map(|meta| (meta.id, !meta.effects.is_empty()))
            .ok_or_else(|| invalid(format!("no piece on {target}")))?;
        if !has_effects && !self.ledger.is_linked(id) {
            return Err(invalid(format!("the piece on {target} carries no effects")));
        }

        if self.ledger.is_linked(id) {
            self.ledger.unlink(&mut self.board, id);
        }
        let removed = self.ledger.strip(&mut self.board, id);

        for effect in &removed {
            match effect.kind {
                EffectKind::Summon => {
                    self.remove_piece(id);
                    return Ok(());
                }
                EffectKind::Transform => {
                    let original = effect.original_form().unwrap_or(PieceKind::Pawn);
                    if original == PieceKind::Pawn && target.is_back_rank() {
                        self.remove_piece(id);
                        return Ok(());
                    }
                    self.board.set_kind(target, original)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn raise_bonewalker(&mut self, side: Side, square: Square, def: &SpellDef) -> Result<()> {
        if !own_half(side).contains(&square.rank()) {
            return Err(invalid(format!("{square} is outside {side}'s half")));
        }
        let id = self.board.put(square, PieceKind::Pawn, side);
        let effect = Effect::new(self.ledger.next_effect_id(), EffectKind::Bonewalker, def.duration, SpellId::RaiseBonewalker);
        self.ledger.add_bonewalker(&mut self.board, id, effect)
    }

    /// Take a piece off the board, including its link bookkeeping
    fn remove_piece(&mut self, id: PieceId) {
        if let Some(is_primary) = self.ledger.link_of(id).map(|group| group.primary == id) {
            if is_primary {
                self.ledger.unlink(&mut self.board, id);
            } else {
                self.ledger.drop_backup(&mut self.board, id);
            }
        }
        self.board.remove_id(id);
        self.ledger.forget(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::sq;
    use crate::core::{Piece, Position, RulesConfig};
    use crate::game::GameStatus;

    fn rich_game() -> GameState {
        let mut game = GameState::new(RulesConfig::default()).unwrap();
        game.set_mana(Side::White, 10);
        game.set_mana(Side::Black, 10);
        game
    }

    fn sparse(pieces: &[(&str, PieceKind, Side)], turn: Side) -> GameState {
        let mut pos = Position::empty(turn);
        for (name, kind, side) in pieces {
            pos.set(sq(name), Piece::new(*kind, *side));
        }
        let mut game = GameState::from_position(&pos, RulesConfig::default()).unwrap();
        game.set_mana(Side::White, 10);
        game.set_mana(Side::Black, 10);
        game
    }

    #[test]
    fn test_geometry() {
        assert!(matches_geometry(PieceKind::Knight, Side::White, sq("g1"), sq("f3")));
        assert!(matches_geometry(PieceKind::Rook, Side::White, sq("a1"), sq("a7")));
        assert!(!matches_geometry(PieceKind::Bishop, Side::White, sq("c1"), sq("c3")));
        assert!(matches_geometry(PieceKind::Pawn, Side::Black, sq("e7"), sq("e5")));
        assert!(!matches_geometry(PieceKind::Pawn, Side::Black, sq("e6"), sq("e4")));
        assert!(!matches_geometry(PieceKind::Pawn, Side::White, sq("e4"), sq("e3")));
    }

    #[test]
    fn test_one_spell_per_turn() {
        let mut game = rich_game();
        game.cast_spell(Side::White, SpellCast::VeilOfMist).unwrap();
        assert_eq!(game.current_side(), Side::White);
        assert!(matches!(
            game.cast_spell(Side::White, SpellCast::RookWard),
            Err(SpellChessError::SpellAlreadyCast)
        ));
        assert_eq!(game.mana(Side::White), 7);
    }

    #[test]
    fn test_unknown_spell_for_restricted_loadout() {
        let config = RulesConfig {
            loadout: Some(vec![SpellId::Dispel]),
            ..RulesConfig::default()
        };
        let mut game = GameState::new(config).unwrap();
        assert!(matches!(
            game.cast_spell(Side::White, SpellCast::RookWard),
            Err(SpellChessError::UnknownSpellOrMove(_))
        ));
    }

    #[test]
    fn test_phantom_step_jumps_over_pieces() {
        let mut game = rich_game();
        game.cast_spell(Side::White, SpellCast::PhantomStep { from: sq("a1"), to: sq("a3") })
            .unwrap();
        assert_eq!(game.board().get(sq("a3")).unwrap().kind, PieceKind::Rook);
        assert_eq!(game.current_side(), Side::Black);
        assert!(!game.board_snapshot().castling.white_queen_side);

        let mut game = rich_game();
        assert!(game
            .cast_spell(Side::White, SpellCast::PhantomStep { from: sq("c1"), to: sq("c4") })
            .is_err());
    }

    #[test]
    fn test_anchor_rejects_king() {
        let mut game = rich_game();
        assert!(matches!(
            game.cast_spell(Side::White, SpellCast::ArcaneAnchor { target: sq("e1") }),
            Err(SpellChessError::InvalidTarget(_))
        ));
        game.cast_spell(Side::White, SpellCast::ArcaneAnchor { target: sq("d1") })
            .unwrap();
        assert!(game.board().get(sq("d1")).unwrap().is_shielded());
    }

    #[test]
    fn test_mist_clone_vanishes() {
        let mut game = rich_game();
        game.cast_spell(Side::White, SpellCast::MistClone { source: sq("g1"), to: sq("e4") })
            .unwrap();
        assert_eq!(game.board().get(sq("e4")).unwrap().kind, PieceKind::Knight);
        game.end_turn(Side::Black).unwrap();
        assert!(game.board().get(sq("e4")).is_none());
        assert_eq!(game.oracle().position().piece_at(sq("e4")), None);
    }

    #[test]
    fn test_chrono_recall_returns_two_steps() {
        let mut game = rich_game();
        game.move_piece(Side::White, sq("g1"), sq("f3"), None).unwrap();
        game.move_piece(Side::Black, sq("a7"), sq("a6"), None).unwrap();
        game.move_piece(Side::White, sq("f3"), sq("g5"), None).unwrap();
        game.move_piece(Side::Black, sq("a6"), sq("a5"), None).unwrap();

        game.cast_spell(Side::White, SpellCast::ChronoRecall { target: sq("g5") })
            .unwrap();
        let knight = game.board().get(sq("g1")).unwrap();
        assert_eq!(knight.kind, PieceKind::Knight);
        assert_eq!(knight.history, vec![sq("g1"), sq("f3"), sq("g5"), sq("g1")]);

        assert!(game
            .cast_spell(Side::Black, SpellCast::ChronoRecall { target: sq("b8") })
            .is_err());
    }

    #[test]
    fn test_rune_glyph_transforms_enemy() {
        let mut game = rich_game();
        game.cast_spell(Side::White, SpellCast::RuneGlyph { square: sq("f6") })
            .unwrap();
        assert!(matches!(
            game.cast_spell(Side::White, SpellCast::RuneGlyph { square: sq("e2") }),
            Err(SpellChessError::SpellAlreadyCast)
        ));
        game.move_piece(Side::White, sq("e2"), sq("e3"), None).unwrap();
        let report = game.move_piece(Side::Black, sq("g8"), sq("f6"), None).unwrap();
        assert_eq!(report.events.len(), 1);
        assert_eq!(game.board().get(sq("f6")).unwrap().kind, PieceKind::Pawn);
        assert!(game.glyphs().next().is_none());
    }

    #[test]
    fn test_twin_stride_moves_king_twice() {
        let mut game = sparse(
            &[
                ("e1", PieceKind::King, Side::White),
                ("e8", PieceKind::King, Side::Black),
                ("a2", PieceKind::Pawn, Side::White),
            ],
            Side::White,
        );
        game.cast_spell(Side::White, SpellCast::TwinStride).unwrap();
        assert!(game.legal_destinations(sq("a2")).is_empty());

        let first = game.move_piece(Side::White, sq("e1"), sq("e2"), None).unwrap();
        assert!(!first.turn_ended);
        assert_eq!(game.current_side(), Side::White);
        let second = game.move_piece(Side::White, sq("e2"), sq("e3"), None).unwrap();
        assert!(second.turn_ended);
        assert_eq!(game.current_side(), Side::Black);
    }

    #[test]
    fn test_blood_tithe_summons_on_first_pawn() {
        let mut game = rich_game();
        game.cast_spell(
            Side::White,
            SpellCast::BloodTithe {
                pawns: [sq("a2"), sq("b2"), sq("h2")],
                summon: SummonKind::Bishop,
            },
        )
        .unwrap();
        assert_eq!(game.board().get(sq("a2")).unwrap().kind, PieceKind::Bishop);
        assert!(game.board().get(sq("b2")).is_none());
        assert!(game.board().get(sq("h2")).is_none());
        assert_eq!(game.mana(Side::White), 5);
    }

    #[test]
    fn test_soul_link_backup_capture_teleports_primary() {
        let mut game = sparse(
            &[
                ("a1", PieceKind::King, Side::White),
                ("h8", PieceKind::King, Side::Black),
                ("d1", PieceKind::Rook, Side::White),
                ("d4", PieceKind::Pawn, Side::White),
                ("e5", PieceKind::Pawn, Side::Black),
            ],
            Side::White,
        );
        let rook = game.board().id_at(sq("d1")).unwrap();
        game.cast_spell(
            Side::White,
            SpellCast::SoulLink {
                primary: sq("d1"),
                backups: SmallVec::from_slice(&[sq("d4")]),
            },
        )
        .unwrap();
        assert_eq!(game.linked_groups().len(), 1);

        game.move_piece(Side::Black, sq("e5"), sq("d4"), None).unwrap();
        assert!(game.linked_groups().is_empty());
        assert_ne!(game.board().square_of(rook), Some(sq("d1")));
        assert_eq!(game.board().square_of(rook).map(|s| s.distance(sq("d1"))), Some(1));
    }

    #[test]
    fn test_dual_march() {
        let mut game = rich_game();
        game.cast_spell(
            Side::White,
            SpellCast::DualMarch {
                first: (sq("b1"), sq("c3")),
                second: (sq("g1"), sq("f3")),
            },
        )
        .unwrap();
        assert_eq!(game.board().get(sq("c3")).unwrap().kind, PieceKind::Knight);
        assert_eq!(game.board().get(sq("f3")).unwrap().kind, PieceKind::Knight);
        assert_eq!(game.current_side(), Side::Black);
        assert_eq!(game.oracle().position().turn, Side::Black);

        let mut game = rich_game();
        assert!(game
            .cast_spell(
                Side::White,
                SpellCast::DualMarch {
                    first: (sq("b1"), sq("c3")),
                    second: (sq("c3"), sq("e4")),
                },
            )
            .is_err());
        assert_eq!(game.mana(Side::White), 10);
    }

    #[test]
    fn test_rook_ward_blocks_adjacent_squares() {
        let mut game = sparse(
            &[
                ("a1", PieceKind::King, Side::White),
                ("h8", PieceKind::King, Side::Black),
                ("d4", PieceKind::Rook, Side::White),
                ("f6", PieceKind::Knight, Side::Black),
            ],
            Side::White,
        );
        game.cast_spell(Side::White, SpellCast::RookWard).unwrap();
        let dests = game.legal_destinations(sq("f6"));
        assert!(!dests.contains(&sq("e4")));
        assert!(!dests.contains(&sq("d5")));
        assert!(dests.contains(&sq("g4")));
    }

    #[test]
    fn test_dispel_reverts_ember_crown() {
        let mut game = rich_game();
        game.cast_spell(Side::White, SpellCast::EmberCrown { pawn: sq("e2") })
            .unwrap();
        assert_eq!(game.board().get(sq("e2")).unwrap().kind, PieceKind::Queen);

        game.cast_spell(Side::Black, SpellCast::Dispel { target: sq("e2") })
            .unwrap();
        let meta = game.board().get(sq("e2")).unwrap();
        assert_eq!(meta.kind, PieceKind::Pawn);
        assert!(meta.effects.is_empty());

        assert!(game
            .cast_spell(Side::White, SpellCast::Dispel { target: sq("d1") })
            .is_err());
    }

    #[test]
    fn test_veil_hides_distant_pieces() {
        let mut game = rich_game();
        game.cast_spell(Side::White, SpellCast::VeilOfMist).unwrap();
        assert_eq!(game.current_side(), Side::White);
        game.move_piece(Side::White, sq("e2"), sq("e4"), None).unwrap();

        let seen = game.board_snapshot_for(Side::Black);
        assert!(seen.piece_at(sq("e1")).is_none());
        assert!(seen.piece_at(sq("e8")).is_some());
        assert_eq!(game.board_snapshot_for(Side::White), game.board_snapshot());
    }

    #[test]
    fn test_raise_bonewalker_in_own_half() {
        let mut game = rich_game();
        assert!(game
            .cast_spell(Side::White, SpellCast::RaiseBonewalker { square: sq("d5") })
            .is_err());
        game.cast_spell(Side::White, SpellCast::RaiseBonewalker { square: sq("d3") })
            .unwrap();
        assert_eq!(game.board().get(sq("d3")).unwrap().kind, PieceKind::Pawn);

        for side in [Side::Black, Side::White, Side::Black] {
            game.end_turn(side).unwrap();
        }
        assert_eq!(game.board().get(sq("d3")).unwrap().kind, PieceKind::Rook);
        assert_eq!(game.game_status(), GameStatus::Active);
    }
}
