//! Board state store: piece metadata arena plus a square index
//!
//! Every piece on the board has exactly one `PieceMeta` in the arena, keyed by
//! a stable `PieceId`. The square index is the only place that knows where a
//! piece stands "now"; the piece's own history vector records where it has
//! been. Anything that relocates a piece must go through `relocate` or `swap`
//! so the history stays in step with the index.

use crate::core::{CastlingRights, EntityStore, Piece, PieceId, PieceKind, PieceMeta, Position, Side, Square};
use crate::{Result, SpellChessError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardStore {
    pieces: EntityStore<PieceMeta>,
    index: FxHashMap<Square, PieceId>,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh metadata (no effects, one-element history) for every piece in `position`
    pub fn from_position(position: &Position) -> Self {
        let mut board = BoardStore::new();
        for (square, piece) in position.pieces() {
            board.put(square, piece.kind, piece.side);
        }
        board
    }

    pub fn id_at(&self, square: Square) -> Option<PieceId> {
        self.index.get(&square).copied()
    }

    pub fn get(&self, square: Square) -> Option<&PieceMeta> {
        self.id_at(square).and_then(|id| self.pieces.get(id).ok())
    }

    pub fn get_mut(&mut self, square: Square) -> Option<&mut PieceMeta> {
        let id = self.id_at(square)?;
        self.pieces.get_mut(id).ok()
    }

    pub fn piece(&self, id: PieceId) -> Result<&PieceMeta> {
        self.pieces.get(id)
    }

    pub fn piece_mut(&mut self, id: PieceId) -> Result<&mut PieceMeta> {
        self.pieces.get_mut(id)
    }

    pub fn contains(&self, id: PieceId) -> bool {
        self.pieces.contains(id)
    }

    /// Current square of a piece, if it is still on the board
    pub fn square_of(&self, id: PieceId) -> Option<Square> {
        self.pieces.get(id).ok().map(|meta| meta.square())
    }

    pub fn is_empty_square(&self, square: Square) -> bool {
        !self.index.contains_key(&square)
    }

    /// Owner of the piece on `square`
    pub fn side_at(&self, square: Square) -> Option<Side> {
        self.get(square).map(|meta| meta.side)
    }

    /// Place a brand-new piece, replacing whatever stood there
    pub fn put(&mut self, square: Square, kind: PieceKind, side: Side) -> PieceId {
        self.remove(square);
        let id = self.pieces.next_id();
        self.pieces.insert(id, PieceMeta::new(id, kind, side, square));
        self.index.insert(square, id);
        id
    }

    pub fn remove(&mut self, square: Square) -> Option<PieceMeta> {
        let id = self.index.remove(&square)?;
        self.pieces.remove(id)
    }

    pub fn remove_id(&mut self, id: PieceId) -> Option<PieceMeta> {
        let square = self.square_of(id)?;
        self.remove(square)
    }

    /// Move a piece to an empty square, appending to its history
    pub fn relocate(&mut self, from: Square, to: Square) -> Result<PieceId> {
        if !self.is_empty_square(to) {
            return Err(SpellChessError::InvalidTarget(format!("{to} is occupied")));
        }
        let id = self
            .index
            .remove(&from)
            .ok_or_else(|| SpellChessError::InvalidTarget(format!("no piece on {from}")))?;
        self.index.insert(to, id);
        let meta = self.pieces.get_mut(id)?;
        meta.history.push(to);
        meta.has_moved = true;
        Ok(id)
    }

    /// Exchange the pieces on two occupied squares; both histories grow by one
    pub fn swap(&mut self, a: Square, b: Square) -> Result<()> {
        let id_a = self
            .id_at(a)
            .ok_or_else(|| SpellChessError::InvalidTarget(format!("no piece on {a}")))?;
        let id_b = self
            .id_at(b)
            .ok_or_else(|| SpellChessError::InvalidTarget(format!("no piece on {b}")))?;
        self.index.insert(a, id_b);
        self.index.insert(b, id_a);
        for (id, to) in [(id_a, b), (id_b, a)] {
            let meta = self.pieces.get_mut(id)?;
            meta.history.push(to);
            meta.has_moved = true;
        }
        Ok(())
    }

    /// Change the type of a piece in place, keeping identity, effects and history
    pub fn set_kind(&mut self, square: Square, kind: PieceKind) -> Result<()> {
        let meta = self
            .get_mut(square)
            .ok_or_else(|| SpellChessError::InvalidTarget(format!("no piece on {square}")))?;
        meta.kind = kind;
        Ok(())
    }

    /// Occupied squares with their metadata, a1 first
    pub fn iter(&self) -> impl Iterator<Item = (Square, &PieceMeta)> + '_ {
        Square::all().filter_map(move |sq| self.get(sq).map(|meta| (sq, meta)))
    }

    /// Pieces belonging to `side`, a1 first
    pub fn side_pieces(&self, side: Side) -> impl Iterator<Item = (Square, &PieceMeta)> + '_ {
        self.iter().filter(move |(_, meta)| meta.side == side)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn king_square(&self, side: Side) -> Option<Square> {
        self.side_pieces(side)
            .find(|(_, meta)| meta.kind == PieceKind::King)
            .map(|(sq, _)| sq)
    }

    /// Reconcile with an oracle position
    ///
    /// A square whose occupant still has the same owner keeps its metadata
    /// (the type is updated, which covers promotion). Any other occupant gets
    /// fresh metadata, and squares the oracle reports empty are cleared.
    /// Running it twice with the same position changes nothing.
    pub fn synchronize(&mut self, position: &Position) {
        for square in Square::all() {
            let current = self.get(square).map(|meta| (meta.side, meta.kind));
            match (position.piece_at(square), current) {
                (None, Some(_)) => {
                    self.remove(square);
                }
                (Some(piece), Some((side, kind))) if side == piece.side => {
                    if kind != piece.kind {
                        if let Some(meta) = self.get_mut(square) {
                            meta.kind = piece.kind;
                        }
                    }
                }
                (Some(piece), _) => {
                    self.put(square, piece.kind, piece.side);
                }
                (None, None) => {}
            }
        }
    }

    /// Piece layout as an oracle position
    ///
    /// Castling rights survive only while the king and the matching rook are
    /// still unmoved on their home squares.
    pub fn to_position(
        &self,
        turn: Side,
        castling: CastlingRights,
        en_passant: Option<Square>,
        halfmoves: u32,
        fullmoves: u32,
    ) -> Position {
        let mut position = Position::empty(turn);
        for (square, meta) in self.iter() {
            position.set(square, Piece::new(meta.kind, meta.side));
        }

        let unmoved = |name: &str, kind: PieceKind, side: Side| -> bool {
            name.parse::<Square>()
                .ok()
                .and_then(|sq| self.get(sq))
                .map(|meta| meta.kind == kind && meta.side == side && !meta.has_moved)
                .unwrap_or(false)
        };
        let white_king = unmoved("e1", PieceKind::King, Side::White);
        let black_king = unmoved("e8", PieceKind::King, Side::Black);

        position.castling = CastlingRights {
            white_king_side: castling.white_king_side && white_king && unmoved("h1", PieceKind::Rook, Side::White),
            white_queen_side: castling.white_queen_side && white_king && unmoved("a1", PieceKind::Rook, Side::White),
            black_king_side: castling.black_king_side && black_king && unmoved("h8", PieceKind::Rook, Side::Black),
            black_queen_side: castling.black_queen_side && black_king && unmoved("a8", PieceKind::Rook, Side::Black),
        };
        position.en_passant = en_passant;
        position.halfmoves = halfmoves;
        position.fullmoves = fullmoves;
        position
    }
}
