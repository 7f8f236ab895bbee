//! Oracle-independent position snapshot

use crate::core::{Piece, PieceKind, Side, Square};
use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;

/// Which castling moves are still available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CastlingRights {
    pub white_king_side: bool,
    pub white_queen_side: bool,
    pub black_king_side: bool,
    pub black_queen_side: bool,
}

impl CastlingRights {
    pub fn all() -> Self {
        CastlingRights {
            white_king_side: true,
            white_queen_side: true,
            black_king_side: true,
            black_queen_side: true,
        }
    }

    pub fn none() -> Self {
        CastlingRights::default()
    }

    fn fen(&self) -> String {
        let mut s = String::new();
        if self.white_king_side {
            s.push('K');
        }
        if self.white_queen_side {
            s.push('Q');
        }
        if self.black_king_side {
            s.push('k');
        }
        if self.black_queen_side {
            s.push('q');
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }
}

/// A complete chess position as exchanged with the rules oracle
///
/// This is plain data: nothing here enforces chess legality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    squares: [Option<Piece>; 64],
    pub turn: Side,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmoves: u32,
    pub fullmoves: u32,
}

impl Position {
    pub fn empty(turn: Side) -> Self {
        Position {
            squares: [None; 64],
            turn,
            castling: CastlingRights::none(),
            en_passant: None,
            halfmoves: 0,
            fullmoves: 1,
        }
    }

    /// Standard starting position
    pub fn starting() -> Self {
        const BACK_RANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut pos = Position::empty(Side::White);
        for (file, kind) in BACK_RANK.iter().enumerate() {
            let file = file as u8;
            for (side, back, pawns) in [(Side::White, 0, 1), (Side::Black, 7, 6)] {
                if let (Some(b), Some(p)) = (Square::new(file, back), Square::new(file, pawns)) {
                    pos.set(b, Piece::new(*kind, side));
                    pos.set(p, Piece::new(PieceKind::Pawn, side));
                }
            }
        }
        pos.castling = CastlingRights::all();
        pos
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    pub fn set(&mut self, square: Square, piece: Piece) {
        self.squares[square.index()] = Some(piece);
    }

    pub fn clear(&mut self, square: Square) -> Option<Piece> {
        self.squares[square.index()].take()
    }

    /// Occupied squares, a1 first
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    pub fn king_square(&self, side: Side) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.side == side && p.kind == PieceKind::King)
            .map(|(sq, _)| sq)
    }

    fn placement(&self) -> String {
        let mut out = String::with_capacity(72);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                let piece = Square::new(file, rank).and_then(|sq| self.piece_at(sq));
                match piece {
                    Some(p) => {
                        if empty > 0 {
                            let _ = write!(out, "{empty}");
                            empty = 0;
                        }
                        out.push(p.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                let _ = write!(out, "{empty}");
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }

    /// FEN without the move clocks: two positions with the same key are
    /// the same position for repetition purposes
    pub fn key(&self) -> String {
        let turn = match self.turn {
            Side::White => 'w',
            Side::Black => 'b',
        };
        let ep = self
            .en_passant
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!("{} {} {} {}", self.placement(), turn, self.castling.fen(), ep)
    }

    /// Full FEN
    pub fn fen(&self) -> String {
        format!("{} {} {}", self.key(), self.halfmoves, self.fullmoves)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}
