//! Per-spell target selection and value estimates
//!
//! Each proposal picks a target set the resolver should accept and a rough
//! gain in centipawns. Nothing here simulates the cast; the agent verifies
//! the chosen proposal on a copy of the game before committing to it.

use crate::ai::evaluator::square_bonus;
use crate::core::{EffectKind, PieceId, PieceKind, Position, Side, SpellCast, SpellId, Square, SummonKind};
use crate::game::GameState;
use crate::oracle::RulesOracle;
use rand::seq::SliceRandom;
use rand::RngCore;
use smallvec::SmallVec;

/// A castable spell with chosen targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellProposal {
    pub cast: SpellCast,
    pub gain: i32,
}

impl SpellProposal {
    fn new(cast: SpellCast, gain: i32) -> Self {
        SpellProposal { cast, gain }
    }
}

const KNIGHT_HOPS: [(i8, i8); 8] = [(1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2)];

struct Scan<'a, O: RulesOracle> {
    game: &'a GameState<O>,
    side: Side,
    layout: Position,
}

impl<'a, O: RulesOracle> Scan<'a, O> {
    fn new(game: &'a GameState<O>, side: Side) -> Self {
        Scan {
            game,
            side,
            layout: game.board_position(side),
        }
    }

    fn attacked(&self, square: Square) -> bool {
        self.game
            .oracle()
            .is_attacked(&self.layout, square, self.side.opponent())
    }

    fn empty(&self, square: Square) -> bool {
        self.game.board().is_empty_square(square)
    }

    /// Own pieces under attack, most valuable first
    fn threatened(&self) -> Vec<(Square, PieceKind)> {
        let mut out: Vec<(Square, PieceKind)> = self
            .game
            .board()
            .side_pieces(self.side)
            .filter(|(sq, meta)| meta.kind != PieceKind::King && self.attacked(*sq))
            .map(|(sq, meta)| (sq, meta.kind))
            .collect();
        out.sort_by_key(|(sq, kind)| (std::cmp::Reverse(kind.value()), sq.index()));
        out
    }

    fn own_of_kind(&self, kind: PieceKind) -> Vec<Square> {
        self.game
            .board()
            .side_pieces(self.side)
            .filter(|(_, meta)| meta.kind == kind)
            .map(|(sq, _)| sq)
            .collect()
    }

    /// Empty squares, safest and most central first
    fn safe_empty_squares(&self, ranks: std::ops::RangeInclusive<u8>) -> Vec<Square> {
        let mut out: Vec<Square> = Square::all()
            .filter(|sq| ranks.contains(&sq.rank()) && self.empty(*sq) && !self.attacked(*sq))
            .collect();
        out.sort_by_key(|sq| (std::cmp::Reverse(square_bonus(*sq)), sq.index()));
        out
    }
}

/// Best target set and estimated gain for `id`, or `None` when the spell has
/// no sensible use right now
pub fn propose<O: RulesOracle>(
    game: &GameState<O>,
    side: Side,
    id: SpellId,
    rng: &mut dyn RngCore,
) -> Option<SpellProposal> {
    let scan = Scan::new(game, side);
    match id {
        SpellId::AstralSwap => astral_swap(&scan),
        SpellId::PhantomStep => phantom_step(&scan, rng),
        SpellId::EmberCrown => ember_crown(&scan),
        SpellId::ArcaneAnchor => {
            let (target, kind) = scan
                .threatened()
                .into_iter()
                .find(|(sq, _)| game.board().get(*sq).is_some_and(|m| !m.is_shielded()))?;
            Some(SpellProposal::new(SpellCast::ArcaneAnchor { target }, kind.value() / 2))
        }
        SpellId::MistClone => mist_clone(&scan),
        SpellId::ChronoRecall => chrono_recall(&scan),
        SpellId::RuneGlyph => rune_glyph(&scan, rng),
        SpellId::TwinStride => {
            let material: i32 = game.material(side) + game.material(side.opponent());
            (material < 2600).then(|| SpellProposal::new(SpellCast::TwinStride, 20))
        }
        SpellId::BloodTithe => blood_tithe(&scan),
        SpellId::SoulLink => soul_link(&scan),
        SpellId::DualMarch => dual_march(&scan),
        SpellId::RookWard => {
            let rooks = scan.own_of_kind(PieceKind::Rook).len() as i32;
            (rooks > 0 && game.global_effects().rook_ward.is_none())
                .then(|| SpellProposal::new(SpellCast::RookWard, 25 * rooks))
        }
        SpellId::Dispel => dispel(&scan),
        SpellId::VeilOfMist => game
            .global_effects()
            .veil
            .is_none()
            .then(|| SpellProposal::new(SpellCast::VeilOfMist, 30)),
        SpellId::RaiseBonewalker => {
            let ranks = match side {
                Side::White => 1..=3,
                Side::Black => 4..=6,
            };
            let square = *scan.safe_empty_squares(ranks).first()?;
            Some(SpellProposal::new(SpellCast::RaiseBonewalker { square }, 150))
        }
    }
}

/// Trade places between a threatened valuable piece and a cheaper safe one
fn astral_swap<O: RulesOracle>(scan: &Scan<'_, O>) -> Option<SpellProposal> {
    let (target, kind) = *scan.threatened().first()?;
    let partner = scan
        .game
        .board()
        .side_pieces(scan.side)
        .filter(|(sq, meta)| {
            *sq != target
                && meta.kind != PieceKind::King
                && meta.kind.value() < kind.value()
                && !scan.attacked(*sq)
                && !(kind == PieceKind::Pawn && sq.is_back_rank())
                && !(meta.kind == PieceKind::Pawn && target.is_back_rank())
        })
        .min_by_key(|(sq, meta)| (meta.kind.value(), sq.index()))?;
    let gain = (kind.value() - partner.1.kind.value()) / 2;
    Some(SpellProposal::new(
        SpellCast::AstralSwap {
            first: target,
            second: partner.0,
        },
        gain,
    ))
}

/// A random knight hop onto a safe empty square
fn phantom_step<O: RulesOracle>(scan: &Scan<'_, O>, rng: &mut dyn RngCore) -> Option<SpellProposal> {
    let mut hops: Vec<(Square, Square)> = Vec::new();
    for from in scan.own_of_kind(PieceKind::Knight) {
        if scan.game.board().get(from).is_some_and(|m| m.is_immobile()) {
            continue;
        }
        for (df, dr) in KNIGHT_HOPS {
            if let Some(to) = from.offset(df, dr) {
                if scan.empty(to) && !scan.attacked(to) {
                    hops.push((from, to));
                }
            }
        }
    }
    let (from, to) = *hops.choose(rng)?;
    let gain = square_bonus(to) - square_bonus(from) + 20;
    Some(SpellProposal::new(SpellCast::PhantomStep { from, to }, gain))
}

/// Crown the most advanced pawn
fn ember_crown<O: RulesOracle>(scan: &Scan<'_, O>) -> Option<SpellProposal> {
    let pawn = scan
        .own_of_kind(PieceKind::Pawn)
        .into_iter()
        .max_by_key(|sq| match scan.side {
            Side::White => (sq.rank(), std::cmp::Reverse(sq.index())),
            Side::Black => (7 - sq.rank(), std::cmp::Reverse(sq.index())),
        })?;
    let advance = match scan.side {
        Side::White => pawn.rank() as i32,
        Side::Black => 7 - pawn.rank() as i32,
    };
    let gain = 150 + 25 * advance - if scan.attacked(pawn) { 100 } else { 0 };
    Some(SpellProposal::new(SpellCast::EmberCrown { pawn }, gain))
}

/// Copy the most valuable non-king piece onto the best safe square in the middle ranks
fn mist_clone<O: RulesOracle>(scan: &Scan<'_, O>) -> Option<SpellProposal> {
    let (source, kind) = scan
        .game
        .board()
        .side_pieces(scan.side)
        .filter(|(_, meta)| meta.kind != PieceKind::King)
        .map(|(sq, meta)| (sq, meta.kind))
        .max_by_key(|(sq, kind)| (kind.value(), std::cmp::Reverse(sq.index())))?;
    let to = *scan.safe_empty_squares(2..=5).first()?;
    Some(SpellProposal::new(SpellCast::MistClone { source, to }, kind.value() / 4))
}

/// Pull a threatened piece back to where it stood two moves ago
fn chrono_recall<O: RulesOracle>(scan: &Scan<'_, O>) -> Option<SpellProposal> {
    let steps = scan
        .game
        .spellbook()
        .get(SpellId::ChronoRecall)
        .map(|def| def.duration.max(1) as usize)
        .ok()?;
    scan.threatened().into_iter().find_map(|(target, kind)| {
        let meta = scan.game.board().get(target)?;
        let back = meta.square_before(steps)?;
        if meta.is_immobile()
            || back == target
            || !scan.empty(back)
            || scan.attacked(back)
            || (kind == PieceKind::Pawn && back.is_back_rank())
        {
            return None;
        }
        Some(SpellProposal::new(SpellCast::ChronoRecall { target }, kind.value() / 2))
    })
}

/// Trap an empty square an enemy knight can reach
fn rune_glyph<O: RulesOracle>(scan: &Scan<'_, O>, rng: &mut dyn RngCore) -> Option<SpellProposal> {
    let mut squares: Vec<Square> = Vec::new();
    for (from, meta) in scan.game.board().side_pieces(scan.side.opponent()) {
        if meta.kind != PieceKind::Knight {
            continue;
        }
        for (df, dr) in KNIGHT_HOPS {
            if let Some(to) = from.offset(df, dr) {
                if scan.empty(to) && scan.game.ledger().glyph_at(to).is_none() && !squares.contains(&to) {
                    squares.push(to);
                }
            }
        }
    }
    let square = *squares.choose(rng)?;
    Some(SpellProposal::new(SpellCast::RuneGlyph { square }, 40))
}

/// Sacrifice the three least advanced pawns for a knight
fn blood_tithe<O: RulesOracle>(scan: &Scan<'_, O>) -> Option<SpellProposal> {
    let mut pawns = scan.own_of_kind(PieceKind::Pawn);
    if pawns.len() < 3 {
        return None;
    }
    pawns.sort_by_key(|sq| match scan.side {
        Side::White => (sq.rank(), sq.index()),
        Side::Black => (7 - sq.rank(), sq.index()),
    });
    let summon = SummonKind::Knight;
    let gain = PieceKind::from(summon).value() - 3 * PieceKind::Pawn.value();
    Some(SpellProposal::new(
        SpellCast::BloodTithe {
            pawns: [pawns[0], pawns[1], pawns[2]],
            summon,
        },
        gain,
    ))
}

/// Bind the most valuable major piece to nearby pawns
fn soul_link<O: RulesOracle>(scan: &Scan<'_, O>) -> Option<SpellProposal> {
    let ledger = scan.game.ledger();
    let (primary, kind, _) = scan
        .game
        .board()
        .side_pieces(scan.side)
        .filter(|(_, meta)| meta.kind.is_major() && !ledger.is_linked(meta.id))
        .map(|(sq, meta)| (sq, meta.kind, meta.id))
        .max_by_key(|(sq, kind, _)| (kind.value(), std::cmp::Reverse(sq.index())))?;

    let mut pawns: Vec<Square> = scan
        .game
        .board()
        .side_pieces(scan.side)
        .filter(|(_, meta)| meta.kind == PieceKind::Pawn && !ledger.is_linked(meta.id))
        .map(|(sq, _)| sq)
        .collect();
    pawns.sort_by_key(|sq| (sq.distance(primary), sq.index()));
    let backups: SmallVec<[Square; 2]> = pawns.into_iter().take(2).collect();
    if backups.is_empty() {
        return None;
    }
    let gain = if scan.attacked(primary) { kind.value() / 5 } else { 20 };
    Some(SpellProposal::new(SpellCast::SoulLink { primary, backups }, gain))
}

/// Develop two undeveloped minor pieces at once
fn dual_march<O: RulesOracle>(scan: &Scan<'_, O>) -> Option<SpellProposal> {
    let home_rank = match scan.side {
        Side::White => 0,
        Side::Black => 7,
    };
    let mut legs: Vec<(Square, Square)> = Vec::new();
    for m in scan.game.legal_moves(scan.side) {
        if m.is_capture() || m.is_castle || m.from.rank() != home_rank || scan.attacked(m.to) {
            continue;
        }
        let minor = scan
            .game
            .board()
            .get(m.from)
            .is_some_and(|meta| matches!(meta.kind, PieceKind::Knight | PieceKind::Bishop));
        if minor {
            legs.push((m.from, m.to));
        }
    }
    legs.sort_by_key(|(from, to)| (std::cmp::Reverse(square_bonus(*to)), from.index(), to.index()));
    // Knight legs never block each other; other pairings may, and then the cast is rejected
    let first = *legs.first()?;
    let second = *legs.iter().find(|(from, to)| *from != first.0 && *to != first.1)?;
    let gain = square_bonus(first.1) + square_bonus(second.1) + 20;
    Some(SpellProposal::new(SpellCast::DualMarch { first, second }, gain))
}

/// Strip the most damaging effect on an enemy piece
fn dispel<O: RulesOracle>(scan: &Scan<'_, O>) -> Option<SpellProposal> {
    let game = scan.game;
    let ledger = game.ledger();
    let enemy = scan.side.opponent();
    let mut candidates: Vec<PieceId> = [
        EffectKind::Transform,
        EffectKind::Summon,
        EffectKind::Shield,
        EffectKind::Bonewalker,
        EffectKind::Link,
    ]
    .iter()
    .flat_map(|kind| ledger.pieces_with(*kind).iter().copied())
    .collect();
    candidates.sort_unstable();
    candidates.dedup();

    candidates
        .into_iter()
        .filter_map(|id| {
            let meta = game.board().piece(id).ok()?;
            if meta.side != enemy {
                return None;
            }
            let sq = meta.square();
            let mut gain = 0;
            for effect in &meta.effects {
                gain += match effect.kind {
                    EffectKind::Transform => {
                        meta.kind.value() - effect.original_form().unwrap_or(PieceKind::Pawn).value()
                    }
                    EffectKind::Summon => meta.kind.value(),
                    EffectKind::Shield => meta.kind.value() / 4,
                    EffectKind::Bonewalker => 300,
                    EffectKind::Link | EffectKind::Glyph => 0,
                };
            }
            if ledger.is_linked(meta.id) {
                gain += 50;
            }
            (gain > 0).then_some((sq, gain))
        })
        .max_by_key(|(sq, gain)| (*gain, std::cmp::Reverse(sq.index())))
        .map(|(target, gain)| SpellProposal::new(SpellCast::Dispel { target }, gain))
}
