//! Turn controller actions: standard moves, ending the turn, move filtering
//!
//! Every action is validated and applied on a clone of the state; the live
//! state is replaced only when the whole action succeeded.

use crate::core::{PieceId, PieceKind, Side, Square};
use crate::game::state::{ActionReport, GameState, GameStatus};
use crate::ledger::LedgerEvent;
use crate::oracle::{OracleMove, RulesOracle};
use crate::{Result, SpellChessError};

impl<O: RulesOracle> GameState<O> {
    /// Reject actions from the wrong side or after the game is decided
    pub(crate) fn ensure_can_act(&self, side: Side) -> Result<()> {
        let status = self.game_status();
        if status.is_over() {
            return Err(SpellChessError::GameAlreadyOver(status));
        }
        if side != self.turn.to_move {
            return Err(SpellChessError::NotCurrentTurn(side));
        }
        Ok(())
    }

    /// Oracle moves for `side` that survive every active effect
    ///
    /// Empty when it is not `side`'s turn.
    pub fn legal_moves(&self, side: Side) -> Vec<OracleMove> {
        if side != self.turn.to_move || self.oracle.position().turn != side {
            return Vec::new();
        }
        self.oracle
            .legal_moves()
            .into_iter()
            .filter(|m| self.move_allowed(side, m))
            .collect()
    }

    /// Filtered destinations for the piece on `square`
    pub fn legal_destinations(&self, square: Square) -> Vec<Square> {
        let Some(side) = self.board.side_at(square) else {
            return Vec::new();
        };
        let mut out: Vec<Square> = Vec::new();
        for m in self.legal_moves(side) {
            if m.from == square && !out.contains(&m.to) {
                out.push(m.to);
            }
        }
        out
    }

    fn move_allowed(&self, side: Side, m: &OracleMove) -> bool {
        let Some(mover) = self.board.get(m.from) else {
            return false;
        };
        if mover.is_immobile() {
            return false;
        }

        if let Some(target) = m.captured {
            if self.board.get(target).map(|meta| meta.is_shielded()).unwrap_or(false) {
                return false;
            }
            if self.veiled_from(side) && !self.is_visible_to(target, side) {
                return false;
            }
        }

        if let Some(ward) = self.ledger.globals().rook_ward {
            if ward.caster != side {
                let next_to_rook = m.to.neighbors().any(|n| {
                    Some(n) != m.captured
                        && self
                            .board
                            .get(n)
                            .map(|meta| meta.side == ward.caster && meta.kind == PieceKind::Rook)
                            .unwrap_or(false)
                });
                if next_to_rook {
                    return false;
                }
            }
        }

        if self.turn.king_moves_left > 0 {
            if mover.kind != PieceKind::King || m.is_castle {
                return false;
            }
            // the same side keeps the move, so it may not leave the opponent in check
            let mut after = self.board_position(side);
            if let Some(captured) = m.captured {
                after.clear(captured);
            }
            if let Some(king) = after.clear(m.from) {
                after.set(m.to, king);
            }
            if self.oracle.king_in_check(&after, side.opponent()) {
                return false;
            }
        }
        true
    }

    /// Play a standard move for `side`
    ///
    /// The promotion hint defaults to a queen. The turn ends afterwards unless
    /// a twin stride still owes a king move.
    pub fn move_piece(
        &mut self,
        side: Side,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<ActionReport> {
        self.ensure_can_act(side)?;
        let wanted = promotion.unwrap_or(PieceKind::Queen);
        let chosen = self
            .legal_moves(side)
            .into_iter()
            .find(|m| m.from == from && m.to == to && m.promotion.map_or(true, |p| p == wanted))
            .ok_or_else(|| SpellChessError::UnknownSpellOrMove(format!("{from}{to} is not a legal move")))?;

        let mut draft = self.clone();
        let line = draft.play_standard_move(side, &chosen)?;
        draft.move_log.push(line.clone());

        let keeps_turn = if draft.turn.king_moves_left > 0 {
            draft.turn.king_moves_left -= 1;
            draft.turn.king_moves_left > 0
        } else {
            false
        };

        let (turn_ended, events) = if keeps_turn {
            draft.sync_oracle(side)?;
            (false, Vec::new())
        } else {
            (true, draft.finish_turn()?)
        };

        *self = draft;
        Ok(ActionReport {
            line,
            turn_ended,
            events,
        })
    }

    /// End the turn without (further) action
    ///
    /// Refused while the caller's king is in check.
    pub fn end_turn(&mut self, side: Side) -> Result<ActionReport> {
        self.ensure_can_act(side)?;
        if self.oracle.position().turn == side && self.oracle.is_check() {
            return Err(SpellChessError::WouldCauseSelfCheck(side));
        }
        let mut draft = self.clone();
        let line = format!("{}. {side} ends the turn", draft.turn.turn_number);
        draft.move_log.push(line.clone());
        let events = draft.finish_turn()?;
        *self = draft;
        Ok(ActionReport {
            line,
            turn_ended: true,
            events,
        })
    }

    /// Apply an oracle move to oracle and board, then run capture and glyph hooks
    ///
    /// Returns the move-log line.
    pub(crate) fn play_standard_move(&mut self, side: Side, m: &OracleMove) -> Result<String> {
        let kind = self
            .board
            .get(m.from)
            .map(|meta| meta.kind)
            .ok_or_else(|| SpellChessError::InvalidTarget(format!("no piece on {}", m.from)))?;

        let applied = self.oracle.apply_move(m.from, m.to, m.promotion)?;

        let mut captured: Option<PieceId> = None;
        if let Some((square, _)) = applied.captured {
            if let Some(meta) = self.board.remove(square) {
                captured = Some(meta.id);
            }
        }
        self.board.relocate(applied.from, applied.to)?;
        if let Some((rook_from, rook_to)) = applied.castle_rook {
            self.board.relocate(rook_from, rook_to)?;
        }
        if let Some(promoted) = applied.promotion {
            self.board.set_kind(applied.to, promoted)?;
        }
        self.board.synchronize(&self.oracle.position());
        self.ledger.prune(&self.board);

        if let Some(victim) = captured {
            self.resolve_link_capture(side, victim);
            self.ledger.forget(victim);
        }
        self.ledger.trigger_glyph(&mut self.board, applied.to, side);

        let sep = if applied.captured.is_some() { 'x' } else { '-' };
        let promo = applied
            .promotion
            .map(|p| format!("={}", p.letter().to_ascii_uppercase()))
            .unwrap_or_default();
        Ok(format!(
            "{}. {side} {kind} {}{sep}{}{promo}",
            self.turn.turn_number, applied.from, applied.to
        ))
    }

    /// Capture hooks for linked groups
    ///
    /// Taking the primary destroys every backup. Taking a backup teleports the
    /// primary to the nearest free square that does not attack the capturer's king.
    fn resolve_link_capture(&mut self, capturer: Side, victim: PieceId) {
        let Some(group) = self.ledger.link_of(victim).cloned() else {
            return;
        };

        if group.primary == victim {
            self.ledger.unlink(&mut self.board, victim);
            for backup in group.backups {
                self.board.remove_id(backup);
                self.ledger.forget(backup);
            }
            return;
        }

        self.ledger.drop_backup(&mut self.board, victim);
        let Some(origin) = self.board.square_of(group.primary) else {
            return;
        };
        let mut candidates: Vec<Square> = Square::all()
            .filter(|sq| self.board.is_empty_square(*sq))
            .collect();
        candidates.sort_by_key(|sq| (sq.distance(origin), sq.index()));

        for target in candidates {
            let mut after = self.board_position(capturer.opponent());
            if let Some(piece) = after.clear(origin) {
                after.set(target, piece);
            }
            if !self.oracle.king_in_check(&after, capturer) && self.board.relocate(origin, target).is_ok() {
                return;
            }
        }
    }

    /// Tick the ledger, hand the turn over and accrue mana
    pub(crate) fn finish_turn(&mut self) -> Result<Vec<LedgerEvent>> {
        let mover = self.turn.to_move;
        let next = mover.opponent();

        let events = self.ledger.tick(&mut self.board);

        if mover == Side::Black {
            self.turn.turn_number += 1;
        }
        self.turn.to_move = next;
        self.turn.spell_cast = false;
        self.turn.king_moves_left = 0;
        self.players[next.index()].mana.regenerate(self.config.mana_regen);

        if self.oracle.king_in_check(&self.board_position(next), mover) {
            self.outcome = Some(GameStatus::Checkmate { winner: next });
            self.move_log
                .push(format!("{}. {mover}'s king is left exposed", self.turn.turn_number));
            return Ok(events);
        }

        self.sync_oracle(next)?;
        self.position_history.push(self.oracle.position().key());
        Ok(events)
    }

    /// Bring the oracle in line with the board, with `turn` to move
    ///
    /// Nothing is reloaded when layout and side to move already agree, which
    /// keeps the oracle's en passant square and clocks.
    pub(crate) fn sync_oracle(&mut self, turn: Side) -> Result<()> {
        let current = self.oracle.position();
        let diverged = Square::all()
            .any(|sq| current.piece_at(sq) != self.board.get(sq).map(|meta| meta.piece()));
        if !diverged && current.turn == turn {
            return Ok(());
        }
        let position = self.board.to_position(
            turn,
            current.castling,
            None,
            current.halfmoves,
            self.turn.turn_number,
        );
        self.oracle.load(&position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::sq;
    use crate::core::{Effect, EffectKind, Modifier, Piece, Position, RulesConfig, SpellId};

    fn new_game() -> GameState {
        GameState::new(RulesConfig::default()).unwrap()
    }

    #[test]
    fn test_move_rotates_turn_and_mana() {
        let mut game = new_game();
        let report = game.move_piece(Side::White, sq("e2"), sq("e4"), None).unwrap();
        assert!(report.turn_ended);
        assert_eq!(report.line, "1. White pawn e2-e4");
        assert_eq!(game.current_side(), Side::Black);
        assert_eq!(game.mana(Side::Black), 5);
        assert_eq!(game.mana(Side::White), 3);
        assert_eq!(game.board_snapshot().en_passant, None);

        game.move_piece(Side::Black, sq("e7"), sq("e5"), None).unwrap();
        assert_eq!(game.turn_number(), 2);
        assert_eq!(game.mana(Side::White), 5);
        assert_eq!(game.move_log().len(), 2);
    }

    #[test]
    fn test_wrong_side_is_rejected() {
        let mut game = new_game();
        let before = game.board_snapshot();
        assert!(matches!(
            game.move_piece(Side::Black, sq("e7"), sq("e5"), None),
            Err(SpellChessError::NotCurrentTurn(Side::Black))
        ));
        assert!(matches!(
            game.end_turn(Side::Black),
            Err(SpellChessError::NotCurrentTurn(Side::Black))
        ));
        assert_eq!(game.board_snapshot(), before);
    }

    #[test]
    fn test_illegal_move_is_rejected() {
        let mut game = new_game();
        assert!(matches!(
            game.move_piece(Side::White, sq("e2"), sq("e5"), None),
            Err(SpellChessError::UnknownSpellOrMove(_))
        ));
        assert_eq!(game.current_side(), Side::White);
        assert!(game.move_log().is_empty());
    }

    #[test]
    fn test_prevent_movement_empties_destinations() {
        let mut game = new_game();
        let id = game.board.id_at(sq("g1")).unwrap();
        let effect = Effect::new(game.ledger.next_effect_id(), EffectKind::Shield, 3, SpellId::ArcaneAnchor)
            .with_modifier(Modifier::PreventMovement);
        game.ledger.attach(&mut game.board, id, effect).unwrap();

        assert!(game.legal_destinations(sq("g1")).is_empty());
        assert_eq!(game.legal_destinations(sq("b1")).len(), 2);
    }

    #[test]
    fn test_end_turn_passes_and_ticks() {
        let mut game = new_game();
        let report = game.end_turn(Side::White).unwrap();
        assert!(report.turn_ended);
        assert_eq!(game.current_side(), Side::Black);
        assert_eq!(game.oracle().position().turn, Side::Black);
        assert!(!game.legal_moves(Side::Black).is_empty());
        assert!(game.legal_moves(Side::White).is_empty());
    }

    #[test]
    fn test_end_turn_refused_in_check() {
        let mut pos = Position::empty(Side::White);
        pos.set(sq("e1"), Piece::new(PieceKind::King, Side::White));
        pos.set(sq("e8"), Piece::new(PieceKind::King, Side::Black));
        pos.set(sq("e5"), Piece::new(PieceKind::Rook, Side::Black));
        let mut game = GameState::from_position(&pos, RulesConfig::default()).unwrap();
        assert_eq!(game.game_status(), GameStatus::Check);
        assert!(matches!(
            game.end_turn(Side::White),
            Err(SpellChessError::WouldCauseSelfCheck(Side::White))
        ));
    }

    #[test]
    fn test_castling_moves_rook_metadata() {
        let mut pos = Position::empty(Side::White);
        pos.set(sq("e1"), Piece::new(PieceKind::King, Side::White));
        pos.set(sq("h1"), Piece::new(PieceKind::Rook, Side::White));
        pos.set(sq("e8"), Piece::new(PieceKind::King, Side::Black));
        pos.castling.white_king_side = true;
        let mut game = GameState::from_position(&pos, RulesConfig::default()).unwrap();
        let rook = game.board.id_at(sq("h1")).unwrap();

        game.move_piece(Side::White, sq("e1"), sq("g1"), None).unwrap();
        assert_eq!(game.board.id_at(sq("f1")), Some(rook));
        assert_eq!(game.board.piece(rook).unwrap().history, vec![sq("h1"), sq("f1")]);
    }

    #[test]
    fn test_shielded_piece_cannot_be_captured() {
        let mut pos = Position::empty(Side::White);
        pos.set(sq("a1"), Piece::new(PieceKind::King, Side::White));
        pos.set(sq("h8"), Piece::new(PieceKind::King, Side::Black));
        pos.set(sq("d1"), Piece::new(PieceKind::Rook, Side::White));
        pos.set(sq("d5"), Piece::new(PieceKind::Knight, Side::Black));
        let mut game = GameState::from_position(&pos, RulesConfig::default()).unwrap();
        assert!(game.legal_destinations(sq("d1")).contains(&sq("d5")));

        let id = game.board.id_at(sq("d5")).unwrap();
        let effect = Effect::new(game.ledger.next_effect_id(), EffectKind::Shield, 3, SpellId::ArcaneAnchor)
            .with_modifier(Modifier::PreventCapture);
        game.ledger.attach(&mut game.board, id, effect).unwrap();
        assert!(!game.legal_destinations(sq("d1")).contains(&sq("d5")));
        assert!(game.legal_destinations(sq("d1")).contains(&sq("d4")));
    }

    #[test]
    fn test_threefold_repetition_is_draw() {
        let mut game = new_game();
        for _ in 0..2 {
            game.move_piece(Side::White, sq("g1"), sq("f3"), None).unwrap();
            game.move_piece(Side::Black, sq("g8"), sq("f6"), None).unwrap();
            game.move_piece(Side::White, sq("f3"), sq("g1"), None).unwrap();
            game.move_piece(Side::Black, sq("f6"), sq("g8"), None).unwrap();
        }
        assert_eq!(game.repetition_count(), 3);
        assert_eq!(game.game_status(), GameStatus::Draw);
        assert!(matches!(
            game.move_piece(Side::White, sq("e2"), sq("e4"), None),
            Err(SpellChessError::GameAlreadyOver(GameStatus::Draw))
        ));
    }
}
