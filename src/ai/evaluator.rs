//! Static position evaluation for the opponent agent
//!
//! Scores a game from one side's point of view:
//! - material by piece type
//! - occupancy of the center and the ring around it
//! - pawn advancement
//! - a large penalty when the position has already been seen this game
//!
//! Under an enemy veil only the enemy pieces `side` can see are counted.
//! Positive values favor `side`. Decided games score `WIN` or `LOSS`.

use crate::core::{PieceKind, Side, Square};
use crate::game::{GameState, GameStatus};
use crate::oracle::{OracleMove, RulesOracle};

/// Score of a game won by the evaluating side
pub const WIN: i32 = 100_000;

/// Score of a game lost by the evaluating side
pub const LOSS: i32 = -WIN;

/// Subtracted when a move leads back to a position reached earlier
pub const REPETITION_PENALTY: i32 = 500;

const CENTER_BONUS: i32 = 30;
const RING_BONUS: i32 = 10;
const PAWN_STEP_BONUS: i32 = 8;

/// Positional bonus for standing on `square`
pub fn square_bonus(square: Square) -> i32 {
    let (file, rank) = (square.file(), square.rank());
    if (3..=4).contains(&file) && (3..=4).contains(&rank) {
        CENTER_BONUS
    } else if (2..=5).contains(&file) && (2..=5).contains(&rank) {
        RING_BONUS
    } else {
        0
    }
}

/// Ranks a pawn has advanced past its starting rank
fn pawn_progress(side: Side, square: Square) -> i32 {
    let progress = match side {
        Side::White => square.rank() as i32 - 1,
        Side::Black => 6 - square.rank() as i32,
    };
    progress.max(0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Evaluator
    }

    /// Static score of `game` for `side`
    pub fn evaluate<O: RulesOracle>(&self, game: &GameState<O>, side: Side) -> i32 {
        match game.game_status() {
            GameStatus::Checkmate { winner } => return if winner == side { WIN } else { LOSS },
            GameStatus::Stalemate | GameStatus::Draw => return 0,
            GameStatus::Active | GameStatus::Check => {}
        }

        let fogged = game.veiled_from(side);
        let mut score = 0;
        for (square, meta) in game.board().iter() {
            if fogged && meta.side != side && !game.is_visible_to(square, side) {
                continue;
            }
            let mut value = meta.kind.value() + square_bonus(square);
            if meta.kind == PieceKind::Pawn {
                value += PAWN_STEP_BONUS * pawn_progress(meta.side, square);
            }
            if meta.side == side {
                score += value;
            } else {
                score -= value;
            }
        }

        if Self::is_repeated(game) {
            score -= REPETITION_PENALTY;
        }
        score
    }

    /// Whether the latest position key already occurred earlier in the game
    pub fn is_repeated<O: RulesOracle>(game: &GameState<O>) -> bool {
        game.repetition_count() > 1
    }

    /// One-ply score of playing `m` for `side`
    ///
    /// The move is simulated on a copy; `None` when the game refuses it.
    pub fn score_move<O: RulesOracle>(&self, game: &GameState<O>, side: Side, m: &OracleMove) -> Option<i32> {
        let mut child = game.clone();
        child.move_piece(side, m.from, m.to, m.promotion).ok()?;
        Some(self.evaluate(&child, side))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::sq;
    use crate::core::RulesConfig;

    #[test]
    fn test_square_bonus() {
        assert_eq!(square_bonus(sq("e4")), 30);
        assert_eq!(square_bonus(sq("c6")), 10);
        assert_eq!(square_bonus(sq("a1")), 0);
        assert_eq!(square_bonus(sq("h5")), 0);
    }

    #[test]
    fn test_starting_position_is_balanced() {
        let game = GameState::new(RulesConfig::default()).unwrap();
        let eval = Evaluator::new();
        assert_eq!(eval.evaluate(&game, Side::White), 0);
        assert_eq!(eval.evaluate(&game, Side::Black), 0);
    }

    #[test]
    fn test_center_pawn_move_scores_higher() {
        let game = GameState::new(RulesConfig::default()).unwrap();
        let eval = Evaluator::new();
        let moves = game.legal_moves(Side::White);
        let e4 = moves.iter().find(|m| m.from == sq("e2") && m.to == sq("e4")).unwrap();
        let a3 = moves.iter().find(|m| m.from == sq("a2") && m.to == sq("a3")).unwrap();
        assert!(eval.score_move(&game, Side::White, e4).unwrap() > eval.score_move(&game, Side::White, a3).unwrap());
    }

    #[test]
    fn test_veiled_side_ignores_hidden_pieces() {
        let mut game = GameState::new(RulesConfig::default()).unwrap();
        game.cast_spell(Side::White, crate::core::SpellCast::VeilOfMist).unwrap();
        game.move_piece(Side::White, sq("e2"), sq("e4"), None).unwrap();

        let eval = Evaluator::new();
        assert_eq!(eval.evaluate(&game, Side::Black), game.material(Side::Black));
        assert!(eval.evaluate(&game, Side::White) > 0);
    }
}
