//! `RulesOracle` backed by the shakmaty move generator

use super::{AppliedMove, OracleMove, RulesOracle};
use crate::core::{CastlingRights, Piece, PieceKind, Position, Side, Square};
use crate::{Result, SpellChessError};
use shakmaty::{
    Bitboard, Board, CastlingMode, CastlingSide, Chess, Color, EnPassantMode, FromSetup, Move,
    Position as ChessPosition, PositionError, Role, Setup,
};
use std::num::NonZeroU32;

fn to_sm_square(square: Square) -> shakmaty::Square {
    shakmaty::Square::new(square.index() as u32)
}

fn from_sm_square(square: shakmaty::Square) -> Square {
    Square::from_index_masked(u32::from(square))
}

fn to_color(side: Side) -> Color {
    match side {
        Side::White => Color::White,
        Side::Black => Color::Black,
    }
}

fn from_color(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

fn to_role(kind: PieceKind) -> Role {
    match kind {
        PieceKind::Pawn => Role::Pawn,
        PieceKind::Knight => Role::Knight,
        PieceKind::Bishop => Role::Bishop,
        PieceKind::Rook => Role::Rook,
        PieceKind::Queen => Role::Queen,
        PieceKind::King => Role::King,
    }
}

fn from_role(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

fn to_sm_piece(piece: Piece) -> shakmaty::Piece {
    shakmaty::Piece {
        color: to_color(piece.side),
        role: to_role(piece.kind),
    }
}

fn from_sm_piece(piece: shakmaty::Piece) -> Piece {
    Piece::new(from_role(piece.role), from_color(piece.color))
}

fn board_from(position: &Position) -> Board {
    let mut board = Board::empty();
    for (square, piece) in position.pieces() {
        board.set_piece_at(to_sm_square(square), to_sm_piece(piece));
    }
    board
}

fn castling_bitboard(rights: CastlingRights) -> Bitboard {
    let mut bb = Bitboard(0);
    for (allowed, rook) in [
        (rights.white_king_side, shakmaty::Square::H1),
        (rights.white_queen_side, shakmaty::Square::A1),
        (rights.black_king_side, shakmaty::Square::H8),
        (rights.black_queen_side, shakmaty::Square::A8),
    ] {
        if allowed {
            bb |= Bitboard::from(rook);
        }
    }
    bb
}

fn castling_side(king: shakmaty::Square, rook: shakmaty::Square) -> CastlingSide {
    if u32::from(rook) < u32::from(king) {
        CastlingSide::QueenSide
    } else {
        CastlingSide::KingSide
    }
}

/// Shakmaty `Chess` position behind the oracle trait
#[derive(Debug, Clone, Default)]
pub struct ShakmatyOracle {
    chess: Chess,
}

impl ShakmatyOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oracle loaded with an arbitrary position
    pub fn from_position(position: &Position) -> Result<Self> {
        let mut oracle = Self::new();
        oracle.load(position)?;
        Ok(oracle)
    }

    fn convert(&self, m: &Move) -> Option<OracleMove> {
        let turn = self.chess.turn();
        match *m {
            Move::Normal {
                from,
                to,
                capture,
                promotion,
                ..
            } => Some(OracleMove {
                from: from_sm_square(from),
                to: from_sm_square(to),
                promotion: promotion.map(from_role),
                captured: capture.map(|_| from_sm_square(to)),
                is_castle: false,
            }),
            Move::EnPassant { from, to } => {
                let from = from_sm_square(from);
                let to = from_sm_square(to);
                Some(OracleMove {
                    from,
                    to,
                    promotion: None,
                    captured: Square::new(to.file(), from.rank()),
                    is_castle: false,
                })
            }
            Move::Castle { king, rook } => Some(OracleMove {
                from: from_sm_square(king),
                to: from_sm_square(castling_side(king, rook).king_to(turn)),
                promotion: None,
                captured: None,
                is_castle: true,
            }),
            Move::Put { .. } => None,
        }
    }
}

impl RulesOracle for ShakmatyOracle {
    fn load(&mut self, position: &Position) -> Result<()> {
        let mut setup = Setup::empty();
        setup.board = board_from(position);
        setup.turn = to_color(position.turn);
        setup.castling_rights = castling_bitboard(position.castling);
        setup.ep_square = position.en_passant.map(to_sm_square);
        setup.halfmoves = position.halfmoves;
        setup.fullmoves = NonZeroU32::new(position.fullmoves.max(1)).unwrap_or(NonZeroU32::MIN);

        let chess = Chess::from_setup(setup, CastlingMode::Standard)
            .or_else(PositionError::ignore_invalid_castling_rights)
            .or_else(PositionError::ignore_invalid_ep_square)
            .or_else(PositionError::ignore_too_much_material)
            .or_else(PositionError::ignore_impossible_check)
            .map_err(|e| SpellChessError::InvalidPosition(format!("{e} ({})", position.fen())))?;

        self.chess = chess;
        Ok(())
    }

    fn position(&self) -> Position {
        let setup = self.chess.clone().into_setup(EnPassantMode::Legal);
        let mut position = Position::empty(from_color(setup.turn));
        for square in Square::all() {
            if let Some(piece) = setup.board.piece_at(to_sm_square(square)) {
                position.set(square, from_sm_piece(piece));
            }
        }
        let rights = setup.castling_rights;
        position.castling = CastlingRights {
            white_king_side: rights.contains(shakmaty::Square::H1),
            white_queen_side: rights.contains(shakmaty::Square::A1),
            black_king_side: rights.contains(shakmaty::Square::H8),
            black_queen_side: rights.contains(shakmaty::Square::A8),
        };
        position.en_passant = setup.ep_square.map(from_sm_square);
        position.halfmoves = setup.halfmoves;
        position.fullmoves = setup.fullmoves.get();
        position
    }

    fn legal_moves(&self) -> Vec<OracleMove> {
        self.chess
            .legal_moves()
            .iter()
            .filter_map(|m| self.convert(m))
            .collect()
    }

    fn apply_move(&mut self, from: Square, to: Square, promotion: Option<PieceKind>) -> Result<AppliedMove> {
        let wanted = promotion.unwrap_or(PieceKind::Queen);
        let moves = self.chess.legal_moves();
        let chosen = moves.iter().find_map(|m| {
            let converted = self.convert(m)?;
            let promotion_matches = match converted.promotion {
                Some(kind) => kind == wanted,
                None => true,
            };
            (converted.from == from && converted.to == to && promotion_matches).then(|| (m.clone(), converted))
        });

        let (m, converted) =
            chosen.ok_or_else(|| SpellChessError::UnknownSpellOrMove(format!("illegal move {from}{to}")))?;

        let captured = converted.captured.and_then(|square| {
            self.chess
                .board()
                .piece_at(to_sm_square(square))
                .map(|piece| (square, from_sm_piece(piece)))
        });

        let castle_rook = match m {
            Move::Castle { king, rook } => {
                let side = castling_side(king, rook);
                Some((from_sm_square(rook), from_sm_square(side.rook_to(self.chess.turn()))))
            }
            _ => None,
        };

        self.chess.play_unchecked(&m);

        Ok(AppliedMove {
            from,
            to,
            captured,
            castle_rook,
            promotion: converted.promotion,
        })
    }

    fn is_check(&self) -> bool {
        self.chess.is_check()
    }

    fn is_checkmate(&self) -> bool {
        self.chess.is_checkmate()
    }

    fn is_stalemate(&self) -> bool {
        self.chess.is_stalemate()
    }

    fn is_draw(&self) -> bool {
        self.chess.is_insufficient_material() || self.chess.halfmoves() >= 100
    }

    fn is_attacked(&self, position: &Position, square: Square, by: Side) -> bool {
        let board = board_from(position);
        board
            .attacks_to(to_sm_square(square), to_color(by), board.occupied())
            .any()
    }
}
