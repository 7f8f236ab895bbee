//! Effect ledger: timed effects, glyphs, linked groups and board-wide fields
//!
//! The ledger is ticked exactly once per turn boundary. A tick never fails:
//! pieces that have left the board are skipped and pruned. The phase order
//! inside `tick` is fixed (bonewalkers, generic effects, linked groups,
//! glyphs) so that a piece carrying several effects is mutated at most once
//! per phase.

use crate::board::BoardStore;
use crate::core::{Effect, EffectId, EffectKind, PieceId, PieceKind, Side, SpellId, Square};
use crate::{Result, SpellChessError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// Delayed trap on a square
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glyph {
    pub caster: Side,
    /// Turns left before an untriggered glyph fades
    pub remaining: u32,
    /// Piece that stepped on the glyph; transformed at the next tick
    pub triggered: Option<PieceId>,
}

/// A major piece bound to one or two pawns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedGroup {
    pub primary: PieceId,
    pub backups: SmallVec<[PieceId; 2]>,
    pub remaining: u32,
}

impl LinkedGroup {
    pub fn contains(&self, id: PieceId) -> bool {
        self.primary == id || self.backups.contains(&id)
    }

    fn members(&self) -> impl Iterator<Item = PieceId> + '_ {
        std::iter::once(self.primary).chain(self.backups.iter().copied())
    }
}

/// A board-wide effect owned by one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEffect {
    pub caster: Side,
    pub remaining: u32,
}

/// Named slots for the board-wide effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GlobalEffects {
    /// Opponent of the caster may not end a move next to the caster's rooks
    pub rook_ward: Option<FieldEffect>,
    /// Opponent of the caster only sees pieces adjacent to its own
    pub veil: Option<FieldEffect>,
}

/// Something a tick did, reported for logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LedgerEvent {
    BonewalkerRisen { square: Square, side: Side },
    EffectExpired { square: Square, kind: EffectKind, origin: SpellId },
    PieceVanished { square: Square, kind: PieceKind, side: Side, origin: SpellId },
    LinkBroken { primary: Square },
    GlyphSprung { square: Square, became: PieceKind },
    GlyphFaded { square: Square },
    FieldExpired { name: &'static str, caster: Side },
}

impl fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerEvent::BonewalkerRisen { square, side } => {
                write!(f, "{side} bonewalker on {square} rises as a rook")
            }
            LedgerEvent::EffectExpired { square, kind, origin } => {
                write!(f, "{kind} from {origin} on {square} expired")
            }
            LedgerEvent::PieceVanished {
                square,
                kind,
                side,
                origin,
            } => write!(f, "{side} {kind} on {square} vanished ({origin} ended)"),
            LedgerEvent::LinkBroken { primary } => write!(f, "soul link of {primary} broke"),
            LedgerEvent::GlyphSprung { square, became } => {
                write!(f, "glyph on {square} sprang: piece became a {became}")
            }
            LedgerEvent::GlyphFaded { square } => write!(f, "glyph on {square} faded"),
            LedgerEvent::FieldExpired { name, caster } => write!(f, "{caster}'s {name} lifted"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectLedger {
    /// Pieces carrying at least one effect of each kind
    index: FxHashMap<EffectKind, Vec<PieceId>>,
    bonewalkers: Vec<PieceId>,
    glyphs: BTreeMap<Square, Glyph>,
    links: Vec<LinkedGroup>,
    globals: GlobalEffects,
    next_effect_id: u32,
}

impl EffectLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_effect_id(&mut self) -> EffectId {
        let id = EffectId::new(self.next_effect_id);
        self.next_effect_id += 1;
        id
    }

    /// Attach an effect to a piece and record it in the index
    pub fn attach(&mut self, board: &mut BoardStore, piece: PieceId, effect: Effect) -> Result<()> {
        let kind = effect.kind;
        board.piece_mut(piece)?.effects.push(effect);
        let ids = self.index.entry(kind).or_default();
        if !ids.contains(&piece) {
            ids.push(piece);
        }
        Ok(())
    }

    /// Remove every effect from a piece, returning what was removed
    pub fn strip(&mut self, board: &mut BoardStore, piece: PieceId) -> Vec<Effect> {
        let removed: Vec<Effect> = match board.piece_mut(piece) {
            Ok(meta) => meta.effects.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        self.forget(piece);
        removed
    }

    /// Drop a piece from every index (it was captured or removed)
    pub fn forget(&mut self, piece: PieceId) {
        for ids in self.index.values_mut() {
            ids.retain(|id| *id != piece);
        }
        self.bonewalkers.retain(|id| *id != piece);
    }

    /// Pieces carrying an effect of `kind`
    pub fn pieces_with(&self, kind: EffectKind) -> &[PieceId] {
        self.index.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Raise a bonewalker: the pawn must already be on the board
    pub fn add_bonewalker(&mut self, board: &mut BoardStore, piece: PieceId, effect: Effect) -> Result<()> {
        self.attach(board, piece, effect)?;
        self.bonewalkers.push(piece);
        Ok(())
    }

    pub fn bonewalkers(&self) -> &[PieceId] {
        &self.bonewalkers
    }

    pub fn place_glyph(&mut self, square: Square, caster: Side, duration: u32) -> Result<()> {
        if self.glyphs.contains_key(&square) {
            return Err(SpellChessError::InvalidTarget(format!("{square} already holds a glyph")));
        }
        self.glyphs.insert(
            square,
            Glyph {
                caster,
                remaining: duration.max(1),
                triggered: None,
            },
        );
        Ok(())
    }

    pub fn glyph_at(&self, square: Square) -> Option<&Glyph> {
        self.glyphs.get(&square)
    }

    pub fn glyphs(&self) -> impl Iterator<Item = (Square, &Glyph)> {
        self.glyphs.iter().map(|(sq, g)| (*sq, g))
    }

    /// Arm the glyph on `square` if `mover` is its caster's opponent
    ///
    /// The piece is marked with a glyph effect; the transformation itself
    /// waits for the next tick. Returns whether the glyph was armed.
    pub fn trigger_glyph(&mut self, board: &mut BoardStore, square: Square, mover: Side) -> bool {
        let piece = match board.id_at(square) {
            Some(id) => id,
            None => return false,
        };
        match self.glyphs.get_mut(&square) {
            Some(glyph) if glyph.caster != mover && glyph.triggered.is_none() => {
                glyph.triggered = Some(piece);
            }
            _ => return false,
        }
        let marker = Effect::new(self.next_effect_id(), EffectKind::Glyph, 1, SpellId::RuneGlyph);
        self.attach(board, piece, marker).is_ok()
    }

    pub fn add_link(&mut self, group: LinkedGroup) {
        self.links.push(group);
    }

    pub fn linked_groups(&self) -> &[LinkedGroup] {
        &self.links
    }

    pub fn link_of(&self, piece: PieceId) -> Option<&LinkedGroup> {
        self.links.iter().find(|g| g.contains(piece))
    }

    pub fn is_linked(&self, piece: PieceId) -> bool {
        self.link_of(piece).is_some()
    }

    /// Dissolve the group containing `piece`, stripping link effects from its members
    pub fn unlink(&mut self, board: &mut BoardStore, piece: PieceId) -> Option<LinkedGroup> {
        let pos = self.links.iter().position(|g| g.contains(piece))?;
        let group = self.links.remove(pos);
        for member in group.members() {
            self.remove_kind(board, member, EffectKind::Link);
        }
        Some(group)
    }

    /// Remove `backup` from its group; the group dissolves when it runs out of backups
    pub fn drop_backup(&mut self, board: &mut BoardStore, backup: PieceId) {
        let Some(pos) = self.links.iter().position(|g| g.backups.contains(&backup)) else {
            return;
        };
        self.links[pos].backups.retain(|id| *id != backup);
        self.remove_kind(board, backup, EffectKind::Link);
        if self.links[pos].backups.is_empty() {
            let primary = self.links[pos].primary;
            self.unlink(board, primary);
        }
    }

    pub fn globals(&self) -> &GlobalEffects {
        &self.globals
    }

    /// Activate (or refresh) the rook ward for `caster`
    pub fn set_rook_ward(&mut self, caster: Side, duration: u32) {
        self.globals.rook_ward = Some(FieldEffect {
            caster,
            remaining: duration.max(1),
        });
    }

    pub fn set_veil(&mut self, caster: Side, duration: u32) {
        self.globals.veil = Some(FieldEffect {
            caster,
            remaining: duration.max(1),
        });
    }

    /// Drop ids of pieces that are no longer on the board
    pub fn prune(&mut self, board: &BoardStore) {
        for ids in self.index.values_mut() {
            ids.retain(|id| board.contains(*id));
        }
        self.bonewalkers.retain(|id| board.contains(*id));
    }

    fn remove_kind(&mut self, board: &mut BoardStore, piece: PieceId, kind: EffectKind) {
        if let Ok(meta) = board.piece_mut(piece) {
            meta.effects.retain(|e| e.kind != kind);
        }
        self.unindex(piece, kind);
    }

    fn unindex(&mut self, piece: PieceId, kind: EffectKind) {
        if let Some(ids) = self.index.get_mut(&kind) {
            ids.retain(|id| *id != piece);
        }
    }

    fn vanish(&mut self, board: &mut BoardStore, piece: PieceId, origin: SpellId, events: &mut Vec<LedgerEvent>) {
        let Some(square) = board.square_of(piece) else {
            return;
        };
        if self.is_linked(piece) {
            if self.links.iter().any(|g| g.primary == piece) {
                self.unlink(board, piece);
            } else {
                self.drop_backup(board, piece);
            }
        }
        if let Some(meta) = board.remove(square) {
            events.push(LedgerEvent::PieceVanished {
                square,
                kind: meta.kind,
                side: meta.side,
                origin,
            });
        }
        self.forget(piece);
    }

    /// Advance every timer by one turn and apply expiries
    pub fn tick(&mut self, board: &mut BoardStore) -> Vec<LedgerEvent> {
        let mut events = Vec::new();
        self.prune(board);
        self.tick_bonewalkers(board, &mut events);
        self.tick_effects(board, &mut events);
        self.tick_links(board, &mut events);
        self.tick_glyphs(board, &mut events);
        events
    }

    fn tick_bonewalkers(&mut self, board: &mut BoardStore, events: &mut Vec<LedgerEvent>) {
        let walkers = std::mem::take(&mut self.bonewalkers);
        for id in walkers {
            let Ok(meta) = board.piece_mut(id) else {
                continue;
            };
            let Some(effect) = meta.effects.iter_mut().find(|e| e.kind == EffectKind::Bonewalker) else {
                continue;
            };
            if !effect.tick() {
                self.bonewalkers.push(id);
                continue;
            }
            meta.effects.retain(|e| e.kind != EffectKind::Bonewalker);
            let square = meta.square();
            let side = meta.side;
            if meta.kind == PieceKind::Pawn {
                meta.kind = PieceKind::Rook;
                events.push(LedgerEvent::BonewalkerRisen { square, side });
            }
            self.unindex(id, EffectKind::Bonewalker);
        }
    }

    fn tick_effects(&mut self, board: &mut BoardStore, events: &mut Vec<LedgerEvent>) {
        let ids: Vec<PieceId> = board.iter().map(|(_, meta)| meta.id).collect();
        for id in ids {
            let mut expired: SmallVec<[Effect; 2]> = SmallVec::new();
            let square = match board.piece_mut(id) {
                Ok(meta) => {
                    let mut kept: SmallVec<[Effect; 2]> = SmallVec::new();
                    for mut effect in meta.effects.drain(..) {
                        let timed = matches!(
                            effect.kind,
                            EffectKind::Shield | EffectKind::Transform | EffectKind::Summon
                        );
                        if timed && effect.tick() {
                            expired.push(effect);
                        } else {
                            kept.push(effect);
                        }
                    }
                    meta.effects = kept;
                    meta.square()
                }
                Err(_) => continue,
            };

            for effect in expired {
                let still_has_kind = board
                    .piece(id)
                    .map(|meta| meta.has_effect_kind(effect.kind))
                    .unwrap_or(false);
                if !still_has_kind {
                    self.unindex(id, effect.kind);
                }
                match effect.kind {
                    EffectKind::Transform | EffectKind::Summon => {
                        self.vanish(board, id, effect.origin, events);
                    }
                    _ => events.push(LedgerEvent::EffectExpired {
                        square,
                        kind: effect.kind,
                        origin: effect.origin,
                    }),
                }
            }
        }

        for (slot, name) in [
            (&mut self.globals.rook_ward, "rook ward"),
            (&mut self.globals.veil, "veil of mist"),
        ] {
            if let Some(field) = slot {
                field.remaining = field.remaining.saturating_sub(1);
                if field.remaining == 0 {
                    events.push(LedgerEvent::FieldExpired {
                        name,
                        caster: field.caster,
                    });
                    *slot = None;
                }
            }
        }
    }

    fn tick_links(&mut self, board: &mut BoardStore, events: &mut Vec<LedgerEvent>) {
        let groups = std::mem::take(&mut self.links);
        for mut group in groups {
            group.backups.retain(|id| board.contains(*id));
            group.remaining = group.remaining.saturating_sub(1);
            let primary_square = board.square_of(group.primary);

            if group.remaining > 0 && !group.backups.is_empty() && primary_square.is_some() {
                for member in group.members() {
                    if let Ok(meta) = board.piece_mut(member) {
                        for effect in meta.effects.iter_mut().filter(|e| e.kind == EffectKind::Link) {
                            effect.remaining = group.remaining;
                        }
                    }
                }
                self.links.push(group);
                continue;
            }

            for member in group.members() {
                self.remove_kind(board, member, EffectKind::Link);
            }
            if let Some(primary) = primary_square {
                events.push(LedgerEvent::LinkBroken { primary });
            }
        }
    }

    fn tick_glyphs(&mut self, board: &mut BoardStore, events: &mut Vec<LedgerEvent>) {
        let glyphs = std::mem::take(&mut self.glyphs);
        for (square, mut glyph) in glyphs {
            let Some(victim) = glyph.triggered else {
                glyph.remaining = glyph.remaining.saturating_sub(1);
                if glyph.remaining == 0 {
                    events.push(LedgerEvent::GlyphFaded { square });
                } else {
                    self.glyphs.insert(square, glyph);
                }
                continue;
            };

            let Ok(meta) = board.piece_mut(victim) else {
                continue;
            };
            if !meta.has_effect_kind(EffectKind::Glyph) {
                continue;
            }
            meta.effects.retain(|e| e.kind != EffectKind::Glyph);
            let at = meta.square();
            if meta.kind != PieceKind::King {
                let became = if at.is_back_rank() {
                    PieceKind::Knight
                } else {
                    PieceKind::Pawn
                };
                meta.kind = became;
                events.push(LedgerEvent::GlyphSprung { square: at, became });
            }
            self.unindex(victim, EffectKind::Glyph);
        }
    }
}
