//! Spell rules end-to-end tests
//!
//! Drives a `GameState` through public actions only and checks the rules that
//! hold across spells: atomic rejection, mana accounting, effect lifetimes.

use spellchess::core::{Piece, PieceKind, Position, RulesConfig, Side, SpellCast, SpellId, SpellOverride, Square};
use spellchess::game::GameState;
use spellchess::oracle::RulesOracle;
use spellchess::{Result, SpellChessError};

fn sq(name: &str) -> Square {
    name.parse().unwrap()
}

fn sparse(pieces: &[(&str, PieceKind, Side)], turn: Side) -> GameState {
    let mut pos = Position::empty(turn);
    for (name, kind, side) in pieces {
        pos.set(sq(name), Piece::new(*kind, *side));
    }
    GameState::from_position(&pos, RulesConfig::default()).unwrap()
}

fn history_len(game: &GameState, square: &str) -> usize {
    game.board().get(sq(square)).unwrap().history.len()
}

#[test]
fn test_swap_exchanges_pieces_and_extends_history() -> Result<()> {
    let mut game = GameState::new(RulesConfig::default())?;
    game.set_mana(Side::White, 10);
    let before_b1 = history_len(&game, "b1");
    let before_d1 = history_len(&game, "d1");

    game.cast_spell(Side::White, SpellCast::AstralSwap { first: sq("b1"), second: sq("d1") })?;

    let b1 = game.board().get(sq("b1")).unwrap();
    let d1 = game.board().get(sq("d1")).unwrap();
    assert_eq!((b1.kind, b1.side), (PieceKind::Queen, Side::White));
    assert_eq!((d1.kind, d1.side), (PieceKind::Knight, Side::White));
    assert_eq!(b1.history.len(), before_d1 + 1);
    assert_eq!(d1.history.len(), before_b1 + 1);
    assert_eq!(game.mana(Side::White), 6);
    assert_eq!(game.current_side(), Side::Black);
    Ok(())
}

#[test]
fn test_swap_into_check_is_rejected_without_mutation() {
    let mut game = sparse(
        &[
            ("e1", PieceKind::King, Side::White),
            ("d2", PieceKind::Knight, Side::White),
            ("d8", PieceKind::Rook, Side::Black),
            ("h8", PieceKind::King, Side::Black),
        ],
        Side::White,
    );
    game.set_mana(Side::White, 10);
    let fen = game.board_snapshot().fen();

    let result = game.cast_spell(Side::White, SpellCast::AstralSwap { first: sq("e1"), second: sq("d2") });

    assert!(matches!(result, Err(SpellChessError::WouldCauseSelfCheck(Side::White))));
    assert_eq!(game.board_snapshot().fen(), fen);
    assert_eq!(game.mana(Side::White), 10);
    assert_eq!(history_len(&game, "e1"), 1);
    assert_eq!(game.current_side(), Side::White);
}

#[test]
fn test_insufficient_mana_changes_nothing() {
    let mut game = GameState::new(RulesConfig::default()).unwrap();
    let before = game.clone();
    assert_eq!(game.mana(Side::White), 3);

    let result = game.cast_spell(Side::White, SpellCast::EmberCrown { pawn: sq("e2") });

    assert!(matches!(
        result,
        Err(SpellChessError::InsufficientMana { needed: 6, available: 3 })
    ));
    assert_eq!(game.mana(Side::White), 3);
    assert_eq!(game.board_snapshot(), before.board_snapshot());
    for (square, meta) in game.board().iter() {
        let old = before.board().get(square).unwrap();
        assert_eq!(meta.id, old.id);
        assert_eq!(meta.history, old.history);
        assert!(meta.effects.is_empty());
    }
    assert!(!game.spell_cast_this_turn());
}

#[test]
fn test_anchor_lasts_its_duration() -> Result<()> {
    let mut game = GameState::new(RulesConfig::default())?;
    game.set_mana(Side::White, 10);

    game.cast_spell(Side::White, SpellCast::ArcaneAnchor { target: sq("g1") })?;
    assert!(game.board().get(sq("g1")).unwrap().is_shielded());

    game.end_turn(Side::Black)?;
    assert!(game.board().get(sq("g1")).unwrap().is_shielded());

    game.end_turn(Side::White)?;
    assert!(!game.board().get(sq("g1")).unwrap().is_shielded());
    assert!(game.board().get(sq("g1")).unwrap().effects.is_empty());
    Ok(())
}

#[test]
fn test_anchored_piece_has_no_destinations() -> Result<()> {
    let mut game = GameState::new(RulesConfig::default())?;
    game.set_mana(Side::White, 10);
    assert_eq!(game.legal_destinations(sq("g1")).len(), 2);

    game.cast_spell(Side::White, SpellCast::ArcaneAnchor { target: sq("g1") })?;
    game.move_piece(Side::Black, sq("e7"), sq("e5"), None)?;

    assert!(game.legal_destinations(sq("g1")).is_empty());
    assert!(!game.legal_destinations(sq("b1")).is_empty());
    assert!(game.move_piece(Side::White, sq("g1"), sq("f3"), None).is_err());
    Ok(())
}

#[test]
fn test_ember_crown_queen_vanishes_after_three_ticks() -> Result<()> {
    let mut game = sparse(
        &[
            ("e1", PieceKind::King, Side::White),
            ("a7", PieceKind::Pawn, Side::White),
            ("h8", PieceKind::King, Side::Black),
        ],
        Side::White,
    );
    game.set_mana(Side::White, 10);

    game.cast_spell(Side::White, SpellCast::EmberCrown { pawn: sq("a7") })?;
    assert_eq!(game.board().get(sq("a7")).unwrap().kind, PieceKind::Queen);
    assert_eq!(game.mana(Side::White), 4);

    game.move_piece(Side::Black, sq("h8"), sq("g8"), None)?;
    assert_eq!(game.board().get(sq("a7")).unwrap().kind, PieceKind::Queen);

    game.move_piece(Side::White, sq("e1"), sq("e2"), None)?;
    assert!(game.board().get(sq("a7")).is_none());
    assert_eq!(game.board_snapshot().piece_at(sq("a7")), None);
    Ok(())
}

#[test]
fn test_phantom_step_onto_occupied_square_fails() {
    let mut game = GameState::new(RulesConfig::default()).unwrap();
    game.set_mana(Side::White, 10);

    let result = game.cast_spell(Side::White, SpellCast::PhantomStep { from: sq("g1"), to: sq("e2") });

    assert!(matches!(result, Err(SpellChessError::InvalidTarget(_))));
    assert_eq!(game.mana(Side::White), 10);
    assert_eq!(game.board().get(sq("g1")).unwrap().kind, PieceKind::Knight);
    assert_eq!(game.current_side(), Side::White);
}

#[test]
fn test_actions_out_of_turn_are_refused() {
    let mut game = GameState::new(RulesConfig::default()).unwrap();
    assert!(matches!(
        game.move_piece(Side::Black, sq("e7"), sq("e5"), None),
        Err(SpellChessError::NotCurrentTurn(Side::Black))
    ));
    assert!(matches!(
        game.cast_spell(Side::Black, SpellCast::RookWard),
        Err(SpellChessError::NotCurrentTurn(Side::Black))
    ));
}

#[test]
fn test_mana_regenerates_up_to_the_cap() -> Result<()> {
    let mut game = GameState::new(RulesConfig::default())?;
    game.end_turn(Side::White)?;
    assert_eq!(game.mana(Side::Black), 5);
    game.end_turn(Side::Black)?;
    assert_eq!(game.mana(Side::White), 5);

    game.set_mana(Side::Black, 9);
    game.end_turn(Side::White)?;
    assert_eq!(game.mana(Side::Black), 10);
    Ok(())
}

#[test]
fn test_anchored_piece_cannot_be_swapped() -> Result<()> {
    let mut game = GameState::new(RulesConfig::default())?;
    game.cast_spell(Side::White, SpellCast::ArcaneAnchor { target: sq("b1") })?;
    game.end_turn(Side::Black)?;
    game.set_mana(Side::White, 10);

    let result = game.cast_spell(Side::White, SpellCast::AstralSwap { first: sq("b1"), second: sq("d1") });
    assert!(matches!(result, Err(SpellChessError::InvalidTarget(_))));
    let result = game.cast_spell(Side::White, SpellCast::AstralSwap { first: sq("d1"), second: sq("b1") });
    assert!(matches!(result, Err(SpellChessError::InvalidTarget(_))));

    assert_eq!(game.board().get(sq("b1")).unwrap().kind, PieceKind::Knight);
    assert_eq!(game.board().get(sq("d1")).unwrap().kind, PieceKind::Queen);
    assert_eq!(game.mana(Side::White), 10);
    assert_eq!(game.current_side(), Side::White);
    Ok(())
}

#[test]
fn test_turn_keeping_cast_cannot_give_check() -> Result<()> {
    let mut pos = Position::empty(Side::White);
    for (name, kind, side) in [
        ("a1", PieceKind::King, Side::White),
        ("b2", PieceKind::Rook, Side::White),
        ("g2", PieceKind::Knight, Side::White),
        ("c1", PieceKind::Bishop, Side::White),
        ("g8", PieceKind::King, Side::Black),
    ] {
        pos.set(sq(name), Piece::new(kind, side));
    }
    let config = RulesConfig {
        spell_overrides: vec![SpellOverride {
            id: SpellId::AstralSwap,
            mana_cost: None,
            duration: None,
            ends_turn: Some(false),
        }],
        ..RulesConfig::default()
    };
    let mut game = GameState::from_position(&pos, config)?;
    game.set_mana(Side::White, 10);
    let fen = game.board_snapshot().fen();

    let result = game.cast_spell(Side::White, SpellCast::AstralSwap { first: sq("b2"), second: sq("g2") });
    assert!(matches!(result, Err(SpellChessError::InvalidTarget(_))));
    assert_eq!(game.board_snapshot().fen(), fen);
    assert_eq!(game.mana(Side::White), 10);

    let report = game.cast_spell(Side::White, SpellCast::AstralSwap { first: sq("b2"), second: sq("c1") })?;
    assert!(!report.turn_ended);
    assert_eq!(game.current_side(), Side::White);
    assert_eq!(game.oracle().position().turn, Side::White);
    assert_eq!(game.board().get(sq("c1")).unwrap().kind, PieceKind::Rook);
    assert_eq!(game.mana(Side::White), 6);
    Ok(())
}

#[test]
fn test_ember_crown_needs_own_pawn() {
    let mut game = GameState::new(RulesConfig::default()).unwrap();
    game.set_mana(Side::White, 10);

    for target in ["e7", "b1", "e4"] {
        let result = game.cast_spell(Side::White, SpellCast::EmberCrown { pawn: sq(target) });
        assert!(matches!(result, Err(SpellChessError::InvalidTarget(_))), "target {target}");
    }
    assert_eq!(game.board().get(sq("e7")).unwrap().kind, PieceKind::Pawn);
    assert_eq!(game.board().get(sq("b1")).unwrap().kind, PieceKind::Knight);
    assert_eq!(game.mana(Side::White), 10);
}

#[test]
fn test_chrono_recall_onto_occupied_square_fails() -> Result<()> {
    let mut game = GameState::new(RulesConfig::default())?;
    game.move_piece(Side::White, sq("g1"), sq("f3"), None)?;
    game.move_piece(Side::Black, sq("a7"), sq("a6"), None)?;
    game.move_piece(Side::White, sq("f3"), sq("g5"), None)?;
    game.move_piece(Side::Black, sq("a6"), sq("a5"), None)?;
    game.move_piece(Side::White, sq("h1"), sq("g1"), None)?;
    game.move_piece(Side::Black, sq("a5"), sq("a4"), None)?;
    game.set_mana(Side::White, 10);

    let result = game.cast_spell(Side::White, SpellCast::ChronoRecall { target: sq("g5") });
    assert!(matches!(result, Err(SpellChessError::InvalidTarget(_))));
    assert_eq!(game.board().get(sq("g5")).unwrap().kind, PieceKind::Knight);
    assert_eq!(game.board().get(sq("g1")).unwrap().kind, PieceKind::Rook);
    assert_eq!(game.mana(Side::White), 10);
    Ok(())
}

#[test]
fn test_rune_glyph_cannot_target_own_piece() -> Result<()> {
    let mut game = GameState::new(RulesConfig::default())?;
    game.set_mana(Side::White, 10);

    let result = game.cast_spell(Side::White, SpellCast::RuneGlyph { square: sq("e2") });
    assert!(matches!(result, Err(SpellChessError::InvalidTarget(_))));
    assert!(game.glyphs().next().is_none());
    assert!(!game.spell_cast_this_turn());

    game.cast_spell(Side::White, SpellCast::RuneGlyph { square: sq("e5") })?;
    assert_eq!(game.glyphs().map(|(square, _)| square).collect::<Vec<_>>(), vec![sq("e5")]);
    Ok(())
}
