//! Main game state structure
//!
//! `GameState` is the turn controller: it owns the rules oracle, the board
//! store, the effect ledger, both players and the turn bookkeeping. Action
//! methods live in `turn.rs` (moves, end of turn) and `spells.rs` (casting).
//! It is cheap enough to clone that the opponent agent searches over copies.

use crate::board::BoardStore;
use crate::core::{CastlingRights, ManaPool, PlayerState, Position, RulesConfig, Side, SpellBook, Square};
use crate::ledger::{EffectLedger, GlobalEffects, Glyph, LedgerEvent, LinkedGroup};
use crate::oracle::{RulesOracle, ShakmatyOracle};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Outcome-level view of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Active,
    Check,
    Checkmate { winner: Side },
    Stalemate,
    Draw,
}

impl GameStatus {
    pub fn is_over(&self) -> bool {
        matches!(
            self,
            GameStatus::Checkmate { .. } | GameStatus::Stalemate | GameStatus::Draw
        )
    }

    pub fn winner(&self) -> Option<Side> {
        match self {
            GameStatus::Checkmate { winner } => Some(*winner),
            _ => None,
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Active => write!(f, "active"),
            GameStatus::Check => write!(f, "check"),
            GameStatus::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            GameStatus::Stalemate => write!(f, "stalemate"),
            GameStatus::Draw => write!(f, "draw"),
        }
    }
}

/// Whose turn it is and what has happened during it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    pub to_move: Side,
    /// Full-round counter, starting at 1 and incremented when Black's turn ends
    pub turn_number: u32,
    /// King moves still owed by a twin stride; while non-zero only the king moves
    pub king_moves_left: u8,
    pub spell_cast: bool,
}

/// What an accepted action did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    /// The move-log line recorded for the action
    pub line: String,
    pub turn_ended: bool,
    /// Ledger events from the tick that followed, if the turn ended
    pub events: Vec<LedgerEvent>,
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState<O: RulesOracle = ShakmatyOracle> {
    pub(crate) oracle: O,
    pub(crate) board: BoardStore,
    pub(crate) ledger: EffectLedger,
    pub(crate) players: [PlayerState; 2],
    pub(crate) turn: TurnState,

    /// Repetition keys of every position reached at a turn boundary
    pub(crate) position_history: Vec<String>,

    pub(crate) move_log: Vec<String>,
    pub(crate) spellbook: Arc<SpellBook>,
    pub(crate) config: RulesConfig,

    /// Set when a tick exposes the king of the side that just moved
    pub(crate) outcome: Option<GameStatus>,
}

impl GameState<ShakmatyOracle> {
    /// Standard starting position with the given rules
    pub fn new(config: RulesConfig) -> Result<Self> {
        Self::with_oracle(ShakmatyOracle::new(), config)
    }

    /// Arbitrary starting position
    pub fn from_position(position: &Position, config: RulesConfig) -> Result<Self> {
        Self::with_oracle(ShakmatyOracle::from_position(position)?, config)
    }
}

impl<O: RulesOracle> GameState<O> {
    /// Build a game around an already-loaded oracle
    pub fn with_oracle(oracle: O, config: RulesConfig) -> Result<Self> {
        config.validate()?;
        let position = oracle.position();
        let board = BoardStore::from_position(&position);
        let spellbook = Arc::new(config.spell_book());
        let players = Side::BOTH.map(|side| {
            PlayerState::new(
                side,
                ManaPool::new(config.starting_mana, config.max_mana),
                config.known_spells(),
            )
        });

        Ok(GameState {
            turn: TurnState {
                to_move: position.turn,
                turn_number: position.fullmoves.max(1),
                king_moves_left: 0,
                spell_cast: false,
            },
            position_history: vec![position.key()],
            oracle,
            board,
            ledger: EffectLedger::new(),
            players,
            move_log: Vec::new(),
            spellbook,
            config,
            outcome: None,
        })
    }

    pub fn current_side(&self) -> Side {
        self.turn.to_move
    }

    pub fn mana(&self, side: Side) -> u32 {
        self.players[side.index()].mana.current
    }

    /// Overwrite a side's mana (scenario setup), capped at the pool maximum
    pub fn set_mana(&mut self, side: Side, amount: u32) {
        self.players[side.index()].mana.set(amount);
    }

    pub fn player(&self, side: Side) -> &PlayerState {
        &self.players[side.index()]
    }

    pub fn board(&self) -> &BoardStore {
        &self.board
    }

    pub fn ledger(&self) -> &EffectLedger {
        &self.ledger
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn spellbook(&self) -> &SpellBook {
        &self.spellbook
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn turn_number(&self) -> u32 {
        self.turn.turn_number
    }

    pub fn turn_state(&self) -> &TurnState {
        &self.turn
    }

    pub fn spell_cast_this_turn(&self) -> bool {
        self.turn.spell_cast
    }

    /// Whether a twin stride still owes king moves this turn
    pub fn king_moves_pending(&self) -> bool {
        self.turn.king_moves_left > 0
    }

    /// Ordered human-readable description of every accepted action
    pub fn move_log(&self) -> &[String] {
        &self.move_log
    }

    pub fn position_history(&self) -> &[String] {
        &self.position_history
    }

    pub fn glyphs(&self) -> impl Iterator<Item = (Square, &Glyph)> {
        self.ledger.glyphs()
    }

    pub fn linked_groups(&self) -> &[LinkedGroup] {
        self.ledger.linked_groups()
    }

    pub fn global_effects(&self) -> &GlobalEffects {
        self.ledger.globals()
    }

    /// Full board as a position, with the side to move and castling rights
    pub fn board_snapshot(&self) -> Position {
        let oracle_pos = self.oracle.position();
        self.board.to_position(
            self.turn.to_move,
            oracle_pos.castling,
            oracle_pos.en_passant,
            oracle_pos.halfmoves,
            self.turn.turn_number,
        )
    }

    /// The board as `viewer` sees it: under an enemy veil, enemy pieces not
    /// adjacent to one of the viewer's pieces are hidden
    pub fn board_snapshot_for(&self, viewer: Side) -> Position {
        let mut position = self.board_snapshot();
        if self.veiled_from(viewer) {
            for (square, meta) in self.board.iter() {
                if meta.side != viewer && !self.is_visible_to(square, viewer) {
                    position.clear(square);
                }
            }
        }
        position
    }

    /// Whether an enemy veil of mist currently blinds `viewer`
    pub fn veiled_from(&self, viewer: Side) -> bool {
        self.ledger
            .globals()
            .veil
            .map(|veil| veil.caster != viewer)
            .unwrap_or(false)
    }

    /// Visible under a veil: adjacent to one of the viewer's pieces
    pub(crate) fn is_visible_to(&self, square: Square, viewer: Side) -> bool {
        square
            .neighbors()
            .any(|n| self.board.side_at(n) == Some(viewer))
    }

    /// Piece layout with `turn` to move and no castling or en passant,
    /// for spell simulations
    pub(crate) fn board_position(&self, turn: Side) -> Position {
        self.board.to_position(turn, CastlingRights::none(), None, 0, 1)
    }

    /// Number of times the current position has occurred at a turn boundary
    pub fn repetition_count(&self) -> usize {
        match self.position_history.last() {
            Some(current) => self.position_history.iter().filter(|k| *k == current).count(),
            None => 0,
        }
    }

    /// Game status computed from the effect-filtered move set
    pub fn game_status(&self) -> GameStatus {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let side = self.turn.to_move;
        let in_check = self.oracle.is_check();
        if self.oracle.is_checkmate() || (in_check && self.legal_moves(side).is_empty()) {
            return GameStatus::Checkmate {
                winner: side.opponent(),
            };
        }
        if self.oracle.is_stalemate() {
            return GameStatus::Stalemate;
        }
        if self.oracle.is_draw() || self.repetition_count() >= 3 {
            return GameStatus::Draw;
        }
        if in_check {
            GameStatus::Check
        } else {
            GameStatus::Active
        }
    }

    /// Total material per side, kings excluded
    pub fn material(&self, side: Side) -> i32 {
        self.board
            .side_pieces(side)
            .map(|(_, meta)| meta.kind.value())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::sq;
    use crate::core::{Piece, PieceKind, SpellId};

    #[test]
    fn test_new_game() {
        let game = GameState::new(RulesConfig::default()).unwrap();
        assert_eq!(game.current_side(), Side::White);
        assert_eq!(game.mana(Side::White), 3);
        assert_eq!(game.mana(Side::Black), 3);
        assert_eq!(game.turn_number(), 1);
        assert_eq!(game.game_status(), GameStatus::Active);
        assert_eq!(game.board_snapshot(), Position::starting());
        assert!(game.player(Side::Black).knows(SpellId::VeilOfMist));
        assert_eq!(game.position_history().len(), 1);
    }

    #[test]
    fn test_set_mana_is_capped() {
        let mut game = GameState::new(RulesConfig::default()).unwrap();
        game.set_mana(Side::White, 99);
        assert_eq!(game.mana(Side::White), 10);
    }

    #[test]
    fn test_checkmate_status() {
        let mut pos = Position::empty(Side::Black);
        pos.set(sq("h8"), Piece::new(PieceKind::King, Side::Black));
        pos.set(sq("g7"), Piece::new(PieceKind::Queen, Side::White));
        pos.set(sq("g6"), Piece::new(PieceKind::King, Side::White));
        let game = GameState::from_position(&pos, RulesConfig::default()).unwrap();
        assert_eq!(game.game_status(), GameStatus::Checkmate { winner: Side::White });
        assert!(game.game_status().is_over());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RulesConfig {
            max_mana: 0,
            ..RulesConfig::default()
        };
        assert!(GameState::new(config).is_err());
    }
}
