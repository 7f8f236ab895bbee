//! Side controller trait and game state view
//!
//! This module defines the interface between the match runner and whoever
//! plays a side (the opponent agent, a script, a test double). The runner
//! asks the controller for one action at a time and hands it a read-only
//! view of the game.

use crate::core::{PieceKind, Position, Side, SpellCast, SpellId, Square};
use crate::game::{GameLogger, GameState};
use crate::oracle::OracleMove;
use std::fmt;

/// One thing a side can do on its turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Play a standard chess move
    Move {
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    },

    /// Cast a spell with its targets
    Cast(SpellCast),

    /// Pass the rest of the turn
    EndTurn,
}

impl Action {
    pub fn from_move(m: &OracleMove) -> Self {
        Action::Move {
            from: m.from,
            to: m.to,
            promotion: m.promotion,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move { from, to, promotion } => {
                write!(f, "{from}{to}")?;
                if let Some(kind) = promotion {
                    write!(f, "={}", kind.letter().to_ascii_uppercase())?;
                }
                Ok(())
            }
            Action::Cast(cast) => write!(f, "cast {cast}"),
            Action::EndTurn => write!(f, "end turn"),
        }
    }
}

/// Read-only view of the game for one side
///
/// The board this view reports honors an enemy veil of mist; the full state
/// is still reachable through `game()` for search.
pub struct GameStateView<'a> {
    game: &'a GameState,
    side: Side,
    logger: &'a GameLogger,
}

impl<'a> GameStateView<'a> {
    pub fn new(game: &'a GameState, side: Side, logger: &'a GameLogger) -> Self {
        GameStateView { game, side, logger }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn game(&self) -> &'a GameState {
        self.game
    }

    pub fn logger(&self) -> &'a GameLogger {
        self.logger
    }

    /// The board as this side can see it
    pub fn board(&self) -> Position {
        self.game.board_snapshot_for(self.side)
    }

    pub fn mana(&self) -> u32 {
        self.game.mana(self.side)
    }

    pub fn opponent_mana(&self) -> u32 {
        self.game.mana(self.side.opponent())
    }

    pub fn legal_moves(&self) -> Vec<OracleMove> {
        self.game.legal_moves(self.side)
    }

    /// Known spells this side can currently afford, if it may still cast
    pub fn affordable_spells(&self) -> Vec<SpellId> {
        if self.game.spell_cast_this_turn() || self.game.king_moves_pending() {
            return Vec::new();
        }
        let mana = self.mana();
        self.game
            .spellbook()
            .iter()
            .filter(|def| def.mana_cost <= mana && self.game.player(self.side).knows(def.id))
            .map(|def| def.id)
            .collect()
    }
}

/// Side controller trait
///
/// Implement this to plug an agent into the match runner. `choose_action`
/// is called repeatedly while it is this side's turn; returning `None`
/// means "nothing to do" and the runner ends the turn when it can.
pub trait SideController {
    fn side(&self) -> Side;

    fn name(&self) -> &str {
        "controller"
    }

    fn choose_action(&mut self, view: &GameStateView) -> Option<Action>;

    /// Called when the game ends (for cleanup/logging)
    fn on_game_end(&mut self, _view: &GameStateView, _won: bool) {}
}
