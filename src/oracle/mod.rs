//! Standard-chess rules oracle
//!
//! The engine never generates chess moves itself. Everything about ordinary
//! legality (move generation, check, mate, stalemate, draws) is answered by a
//! `RulesOracle`. The spell layer only ever *filters* what the oracle allows,
//! and writes whole positions back into it after a spell rearranges the board.

mod shakmaty_oracle;

pub use shakmaty_oracle::ShakmatyOracle;

use crate::core::{Piece, PieceKind, Position, Side, Square};
use crate::Result;
use std::fmt;

/// A legal standard move as reported by the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OracleMove {
    pub from: Square,
    /// Destination of the moving piece (the king's square for castling)
    pub to: Square,
    pub promotion: Option<PieceKind>,
    /// Square of the captured piece, which differs from `to` for en passant
    pub captured: Option<Square>,
    pub is_castle: bool,
}

impl OracleMove {
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }
}

/// Everything the board store needs to mirror a move the oracle just played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedMove {
    pub from: Square,
    pub to: Square,
    pub captured: Option<(Square, Piece)>,
    /// Rook relocation for castling
    pub castle_rook: Option<(Square, Square)>,
    pub promotion: Option<PieceKind>,
}

/// Black-box chess legality engine
pub trait RulesOracle: Clone + Send + fmt::Debug {
    /// Replace the oracle's position
    ///
    /// Fails with `InvalidPosition` when the oracle cannot represent it
    /// (missing king, pawn on a back rank, side not to move in check).
    fn load(&mut self, position: &Position) -> Result<()>;

    /// Snapshot of the current position
    fn position(&self) -> Position;

    /// All legal moves for the side to move
    fn legal_moves(&self) -> Vec<OracleMove>;

    /// Validate and play a move; the promotion hint defaults to a queen
    fn apply_move(&mut self, from: Square, to: Square, promotion: Option<PieceKind>) -> Result<AppliedMove>;

    fn is_check(&self) -> bool;

    fn is_checkmate(&self) -> bool;

    fn is_stalemate(&self) -> bool;

    /// Insufficient material or the fifty-move rule
    fn is_draw(&self) -> bool;

    /// Whether `square` is attacked by `by` in an arbitrary (possibly
    /// illegal) position; used to simulate spells without loading them
    fn is_attacked(&self, position: &Position, square: Square, by: Side) -> bool;

    /// Distinct legal destinations for the piece on `square`
    fn legal_destinations(&self, square: Square) -> Vec<Square> {
        let mut out: Vec<Square> = Vec::new();
        for m in self.legal_moves() {
            if m.from == square && !out.contains(&m.to) {
                out.push(m.to);
            }
        }
        out
    }

    /// Whether `side`'s king is attacked in `position`
    fn king_in_check(&self, position: &Position, side: Side) -> bool {
        match position.king_square(side) {
            Some(king) => self.is_attacked(position, king, side.opponent()),
            None => false,
        }
    }
}
