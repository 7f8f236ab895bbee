//! Spell definitions, target payloads and the static spell table

use crate::core::{PieceKind, Square};
use crate::{Result, SpellChessError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::fmt;
use std::str::FromStr;

/// Identifier of every spell the engine knows how to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellId {
    AstralSwap,
    PhantomStep,
    EmberCrown,
    ArcaneAnchor,
    MistClone,
    ChronoRecall,
    RuneGlyph,
    TwinStride,
    BloodTithe,
    SoulLink,
    DualMarch,
    RookWard,
    Dispel,
    VeilOfMist,
    RaiseBonewalker,
}

impl SpellId {
    pub const ALL: [SpellId; 15] = [
        SpellId::AstralSwap,
        SpellId::PhantomStep,
        SpellId::EmberCrown,
        SpellId::ArcaneAnchor,
        SpellId::MistClone,
        SpellId::ChronoRecall,
        SpellId::RuneGlyph,
        SpellId::TwinStride,
        SpellId::BloodTithe,
        SpellId::SoulLink,
        SpellId::DualMarch,
        SpellId::RookWard,
        SpellId::Dispel,
        SpellId::VeilOfMist,
        SpellId::RaiseBonewalker,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpellId::AstralSwap => "astral_swap",
            SpellId::PhantomStep => "phantom_step",
            SpellId::EmberCrown => "ember_crown",
            SpellId::ArcaneAnchor => "arcane_anchor",
            SpellId::MistClone => "mist_clone",
            SpellId::ChronoRecall => "chrono_recall",
            SpellId::RuneGlyph => "rune_glyph",
            SpellId::TwinStride => "twin_stride",
            SpellId::BloodTithe => "blood_tithe",
            SpellId::SoulLink => "soul_link",
            SpellId::DualMarch => "dual_march",
            SpellId::RookWard => "rook_ward",
            SpellId::Dispel => "dispel",
            SpellId::VeilOfMist => "veil_of_mist",
            SpellId::RaiseBonewalker => "raise_bonewalker",
        }
    }
}

impl fmt::Display for SpellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SpellId {
    type Err = SpellChessError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace(|c: char| c == '-' || c == ' ', "_");
        SpellId::ALL
            .into_iter()
            .find(|id| id.name() == wanted)
            .ok_or_else(|| SpellChessError::UnknownSpellOrMove(s.to_string()))
    }
}

/// How many target squares a spell takes and how they are grouped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetShape {
    None,
    Single,
    /// Between `min` and `max` independent squares
    Multi { min: u8, max: u8 },
    /// `legs` consecutive (source, destination) pairs
    FromTo { legs: u8 },
}

impl TargetShape {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            TargetShape::None => count == 0,
            TargetShape::Single => count == 1,
            TargetShape::Multi { min, max } => (min as usize..=max as usize).contains(&count),
            TargetShape::FromTo { legs } => count == legs as usize * 2,
        }
    }
}

/// Ownership / occupancy requirement for one target slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetRule {
    OwnPiece,
    EnemyPiece,
    AnyPiece,
    EmptySquare,
    /// Empty, or occupied by the enemy
    NotOwnPiece,
}

/// Piece a blood tithe may summon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummonKind {
    Knight,
    Bishop,
}

impl From<SummonKind> for PieceKind {
    fn from(kind: SummonKind) -> Self {
        match kind {
            SummonKind::Knight => PieceKind::Knight,
            SummonKind::Bishop => PieceKind::Bishop,
        }
    }
}

/// A concrete cast request: the spell plus its typed target payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpellCast {
    AstralSwap { first: Square, second: Square },
    PhantomStep { from: Square, to: Square },
    EmberCrown { pawn: Square },
    ArcaneAnchor { target: Square },
    MistClone { source: Square, to: Square },
    ChronoRecall { target: Square },
    RuneGlyph { square: Square },
    TwinStride,
    BloodTithe { pawns: [Square; 3], summon: SummonKind },
    SoulLink { primary: Square, backups: SmallVec<[Square; 2]> },
    DualMarch { first: (Square, Square), second: (Square, Square) },
    RookWard,
    Dispel { target: Square },
    VeilOfMist,
    RaiseBonewalker { square: Square },
}

impl SpellCast {
    pub fn id(&self) -> SpellId {
        match self {
            SpellCast::AstralSwap { .. } => SpellId::AstralSwap,
            SpellCast::PhantomStep { .. } => SpellId::PhantomStep,
            SpellCast::EmberCrown { .. } => SpellId::EmberCrown,
            SpellCast::ArcaneAnchor { .. } => SpellId::ArcaneAnchor,
            SpellCast::MistClone { .. } => SpellId::MistClone,
            SpellCast::ChronoRecall { .. } => SpellId::ChronoRecall,
            SpellCast::RuneGlyph { .. } => SpellId::RuneGlyph,
            SpellCast::TwinStride => SpellId::TwinStride,
            SpellCast::BloodTithe { .. } => SpellId::BloodTithe,
            SpellCast::SoulLink { .. } => SpellId::SoulLink,
            SpellCast::DualMarch { .. } => SpellId::DualMarch,
            SpellCast::RookWard => SpellId::RookWard,
            SpellCast::Dispel { .. } => SpellId::Dispel,
            SpellCast::VeilOfMist => SpellId::VeilOfMist,
            SpellCast::RaiseBonewalker { .. } => SpellId::RaiseBonewalker,
        }
    }

    /// Target squares in slot order, as checked against the spell's `TargetRule`s
    pub fn target_squares(&self) -> SmallVec<[Square; 4]> {
        match self {
            SpellCast::AstralSwap { first, second } => smallvec![*first, *second],
            SpellCast::PhantomStep { from, to } => smallvec![*from, *to],
            SpellCast::EmberCrown { pawn } => smallvec![*pawn],
            SpellCast::ArcaneAnchor { target } => smallvec![*target],
            SpellCast::MistClone { source, to } => smallvec![*source, *to],
            SpellCast::ChronoRecall { target } => smallvec![*target],
            SpellCast::RuneGlyph { square } => smallvec![*square],
            SpellCast::TwinStride | SpellCast::RookWard | SpellCast::VeilOfMist => SmallVec::new(),
            SpellCast::BloodTithe { pawns, .. } => pawns.iter().copied().collect(),
            SpellCast::SoulLink { primary, backups } => {
                let mut squares: SmallVec<[Square; 4]> = smallvec![*primary];
                squares.extend(backups.iter().copied());
                squares
            }
            SpellCast::DualMarch { first, second } => {
                smallvec![first.0, first.1, second.0, second.1]
            }
            SpellCast::Dispel { target } => smallvec![*target],
            SpellCast::RaiseBonewalker { square } => smallvec![*square],
        }
    }
}

impl fmt::Display for SpellCast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets = self.target_squares();
        if targets.is_empty() {
            return write!(f, "{}", self.id());
        }
        let names: Vec<String> = targets.iter().map(|s| s.to_string()).collect();
        write!(f, "{} [{}]", self.id(), names.join(" "))
    }
}

/// Static configuration of one spell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellDef {
    pub id: SpellId,
    pub mana_cost: u32,
    pub shape: TargetShape,
    /// One rule per slot; the last rule repeats for extra slots, and
    /// from-to shapes alternate (source, destination) rules per leg
    pub rules: SmallVec<[TargetRule; 2]>,
    /// Effect duration in turns (or history depth for chrono recall)
    pub duration: u32,
    pub ends_turn: bool,
}

impl SpellDef {
    fn new(
        id: SpellId,
        mana_cost: u32,
        shape: TargetShape,
        rules: &[TargetRule],
        duration: u32,
        ends_turn: bool,
    ) -> Self {
        SpellDef {
            id,
            mana_cost,
            shape,
            rules: rules.iter().copied().collect(),
            duration,
            ends_turn,
        }
    }

    /// Rule governing the target in position `slot`
    pub fn rule_for(&self, slot: usize) -> Option<TargetRule> {
        if self.rules.is_empty() {
            return None;
        }
        let idx = match self.shape {
            TargetShape::FromTo { .. } => slot % 2,
            _ => slot.min(self.rules.len() - 1),
        };
        self.rules.get(idx).copied()
    }
}

/// Per-spell configuration override (see `RulesConfig`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellOverride {
    pub id: SpellId,
    #[serde(default)]
    pub mana_cost: Option<u32>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub ends_turn: Option<bool>,
}

/// The spell definition table, built once per game and shared
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellBook {
    defs: FxHashMap<SpellId, SpellDef>,
}

impl SpellBook {
    /// Default costs, shapes and durations
    pub fn standard() -> Self {
        use TargetRule::*;
        use TargetShape as Shape;

        let defs = [
            SpellDef::new(SpellId::AstralSwap, 4, Shape::Multi { min: 2, max: 2 }, &[OwnPiece], 0, true),
            SpellDef::new(SpellId::PhantomStep, 3, Shape::FromTo { legs: 1 }, &[OwnPiece, EmptySquare], 0, true),
            SpellDef::new(SpellId::EmberCrown, 6, Shape::Single, &[OwnPiece], 3, true),
            SpellDef::new(SpellId::ArcaneAnchor, 3, Shape::Single, &[OwnPiece], 3, true),
            SpellDef::new(SpellId::MistClone, 4, Shape::FromTo { legs: 1 }, &[OwnPiece, EmptySquare], 2, true),
            SpellDef::new(SpellId::ChronoRecall, 5, Shape::Single, &[OwnPiece], 2, true),
            SpellDef::new(SpellId::RuneGlyph, 3, Shape::Single, &[NotOwnPiece], 6, false),
            SpellDef::new(SpellId::TwinStride, 4, Shape::None, &[], 0, false),
            SpellDef::new(SpellId::BloodTithe, 5, Shape::Multi { min: 3, max: 3 }, &[OwnPiece], 0, true),
            SpellDef::new(SpellId::SoulLink, 5, Shape::Multi { min: 2, max: 3 }, &[OwnPiece], 4, true),
            SpellDef::new(SpellId::DualMarch, 6, Shape::FromTo { legs: 2 }, &[OwnPiece, EmptySquare], 0, true),
            SpellDef::new(SpellId::RookWard, 4, Shape::None, &[], 3, true),
            SpellDef::new(SpellId::Dispel, 3, Shape::Single, &[AnyPiece], 0, true),
            SpellDef::new(SpellId::VeilOfMist, 3, Shape::None, &[], 2, false),
            SpellDef::new(SpellId::RaiseBonewalker, 4, Shape::Single, &[EmptySquare], 3, true),
        ];

        SpellBook {
            defs: defs.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    /// Standard table with configured overrides applied
    pub fn with_overrides(overrides: &[SpellOverride]) -> Self {
        let mut book = SpellBook::standard();
        for o in overrides {
            if let Some(def) = book.defs.get_mut(&o.id) {
                if let Some(cost) = o.mana_cost {
                    def.mana_cost = cost;
                }
                if let Some(duration) = o.duration {
                    def.duration = duration;
                }
                if let Some(ends_turn) = o.ends_turn {
                    def.ends_turn = ends_turn;
                }
            }
        }
        book
    }

    pub fn get(&self, id: SpellId) -> Result<&SpellDef> {
        self.defs
            .get(&id)
            .ok_or_else(|| SpellChessError::UnknownSpellOrMove(id.to_string()))
    }

    /// Remove a spell from the table (used by restricted rule sets)
    pub fn remove(&mut self, id: SpellId) -> Option<SpellDef> {
        self.defs.remove(&id)
    }

    /// Definitions in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &SpellDef> {
        SpellId::ALL.into_iter().filter_map(move |id| self.defs.get(&id))
    }
}

impl Default for SpellBook {
    fn default() -> Self {
        Self::standard()
    }
}
