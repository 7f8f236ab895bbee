//! Opponent agent
//!
//! On its turn the agent scores every filtered standard move (one ply, or an
//! alpha-beta search at the top tier), asks the spell heuristics for the best
//! affordable cast, and prefers the spell only when it beats the best move by
//! a fixed margin. Lower tiers consider spells less often and pick moves more
//! randomly. All randomness comes from an injectable RNG.

use crate::ai::evaluator::{Evaluator, LOSS, WIN};
use crate::ai::spell_heuristics::{propose, SpellProposal};
use crate::core::Side;
use crate::game::{Action, GameLogger, GameState, GameStateView, SideController};
use crate::oracle::OracleMove;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A spell must beat the best move by this much to be cast
pub const SPELL_MARGIN: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum Difficulty {
    Novice,
    Adept,
    Archmage,
}

impl Difficulty {
    /// Chance of considering spells at all on a given turn
    pub fn cast_probability(self) -> f64 {
        match self {
            Difficulty::Novice => 0.2,
            Difficulty::Adept => 0.5,
            Difficulty::Archmage => 0.8,
        }
    }

    /// Chance of ignoring the scores and playing a random move
    fn blunder_probability(self) -> f64 {
        match self {
            Difficulty::Novice => 0.4,
            Difficulty::Adept => 0.1,
            Difficulty::Archmage => 0.0,
        }
    }

    fn search_depth(self) -> u32 {
        match self {
            Difficulty::Novice | Difficulty::Adept => 1,
            Difficulty::Archmage => 3,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Novice => "novice",
            Difficulty::Adept => "adept",
            Difficulty::Archmage => "archmage",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "novice" | "easy" => Ok(Difficulty::Novice),
            "adept" | "medium" => Ok(Difficulty::Adept),
            "archmage" | "hard" => Ok(Difficulty::Archmage),
            _ => Err(format!("unknown difficulty '{s}' (expected novice, adept or archmage)")),
        }
    }
}

/// Computer player for one side
pub struct OpponentAgent {
    side: Side,
    difficulty: Difficulty,
    name: String,
    rng: Box<dyn RngCore + Send>,
    evaluator: Evaluator,
    depth: u32,
    /// Pause before the follow-up move after a spell that keeps the turn
    pacing: Option<Duration>,
}

impl OpponentAgent {
    /// Agent with an entropy-seeded RNG
    pub fn new(side: Side, difficulty: Difficulty) -> Self {
        Self::with_rng(side, difficulty, Box::new(ChaCha12Rng::from_entropy()))
    }

    /// Agent with a seeded RNG (for deterministic testing)
    pub fn with_seed(side: Side, difficulty: Difficulty, seed: u64) -> Self {
        Self::with_rng(side, difficulty, Box::new(ChaCha12Rng::seed_from_u64(seed)))
    }

    pub fn with_rng(side: Side, difficulty: Difficulty, rng: Box<dyn RngCore + Send>) -> Self {
        OpponentAgent {
            side,
            difficulty,
            name: format!("{side} {difficulty}"),
            rng,
            evaluator: Evaluator::new(),
            depth: difficulty.search_depth(),
            pacing: None,
        }
    }

    /// Override the search depth (values below 1 are treated as 1)
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth.max(1);
        self
    }

    pub fn with_pacing(mut self, pause: Duration) -> Self {
        self.pacing = Some(pause);
        self
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Pick the action for the current game state
    pub fn decide(&mut self, game: &GameState, logger: &GameLogger) -> Option<Action> {
        if game.current_side() != self.side || game.game_status().is_over() {
            return None;
        }
        let moves = game.legal_moves(self.side);

        // Follow-up after a spell that kept the turn (or an owed twin-stride move)
        if game.spell_cast_this_turn() || game.king_moves_pending() {
            if let Some(pause) = self.pacing {
                std::thread::sleep(pause);
            }
            return match self.pick_move(game, &moves, logger) {
                Some((m, _)) => Some(Action::from_move(&m)),
                None if game.king_moves_pending() => {
                    logger.agent(&self.name, "no king move available");
                    None
                }
                None => Some(Action::EndTurn),
            };
        }

        let best_move = self.pick_move(game, &moves, logger);
        let spell = if self.rng.gen_bool(self.difficulty.cast_probability()) {
            self.pick_spell(game, logger)
        } else {
            None
        };

        let baseline = self.evaluator.evaluate(game, self.side);
        let move_gain = best_move.map(|(_, score)| score - baseline);
        match (spell, best_move) {
            (Some(proposal), _) if move_gain.map_or(true, |gain| proposal.gain > gain + SPELL_MARGIN) => {
                logger.agent(
                    &self.name,
                    &format!("casting {} (gain {} vs move gain {:?})", proposal.cast, proposal.gain, move_gain),
                );
                Some(Action::Cast(proposal.cast))
            }
            (_, Some((m, _))) => Some(Action::from_move(&m)),
            (_, None) => {
                logger.agent(&self.name, "no action");
                None
            }
        }
    }

    /// Best move and its score, falling back to a random legal move when
    /// every simulation failed
    fn pick_move(&mut self, game: &GameState, moves: &[OracleMove], logger: &GameLogger) -> Option<(OracleMove, i32)> {
        if moves.is_empty() {
            return None;
        }
        if moves.len() == 1 {
            let m = moves[0];
            let score = self.evaluator.score_move(game, self.side, &m).unwrap_or(LOSS);
            return Some((m, score));
        }
        if self.rng.gen_bool(self.difficulty.blunder_probability()) {
            let m = *moves.choose(&mut self.rng)?;
            let score = self.evaluator.score_move(game, self.side, &m).unwrap_or(LOSS);
            logger.agent(&self.name, &format!("playing loosely: {}{}", m.from, m.to));
            return Some((m, score));
        }

        let mut scored: Vec<(OracleMove, i32)> = Vec::with_capacity(moves.len());
        for m in moves {
            let score = if self.depth > 1 {
                self.search_move(game, m)
            } else {
                self.evaluator.score_move(game, self.side, m)
            };
            if let Some(score) = score {
                scored.push((*m, score));
            }
        }

        let Some(best) = scored.iter().map(|(_, s)| *s).max() else {
            logger.agent(&self.name, "every simulation failed, playing a random move");
            let m = *moves.choose(&mut self.rng)?;
            return Some((m, LOSS));
        };
        let top: Vec<(OracleMove, i32)> = scored.into_iter().filter(|(_, s)| *s == best).collect();
        top.choose(&mut self.rng).copied()
    }

    /// Highest-gain affordable spell whose cast the resolver accepts
    fn pick_spell(&mut self, game: &GameState, logger: &GameLogger) -> Option<SpellProposal> {
        let view = GameStateView::new(game, self.side, logger);
        let mut proposals: Vec<SpellProposal> = view
            .affordable_spells()
            .into_iter()
            .filter_map(|id| propose(game, self.side, id, &mut *self.rng))
            .collect();
        proposals.sort_by_key(|p| std::cmp::Reverse(p.gain));

        for proposal in proposals {
            let mut trial = game.clone();
            match trial.cast_spell(self.side, proposal.cast.clone()) {
                Ok(_) => return Some(proposal),
                Err(e) => logger.agent(&self.name, &format!("{} rejected: {e}", proposal.cast)),
            }
        }
        None
    }

    fn search_move(&self, game: &GameState, m: &OracleMove) -> Option<i32> {
        let mut child = game.clone();
        child.move_piece(self.side, m.from, m.to, m.promotion).ok()?;
        Some(self.alpha_beta(&child, self.depth - 1, LOSS - 1, WIN + 1))
    }

    /// Minimax over standard moves with alpha-beta pruning, scored for `self.side`
    fn alpha_beta(&self, game: &GameState, depth: u32, mut alpha: i32, mut beta: i32) -> i32 {
        if depth == 0 || game.game_status().is_over() {
            return self.evaluator.evaluate(game, self.side);
        }
        let mover = game.current_side();
        let moves = game.legal_moves(mover);
        if moves.is_empty() {
            return self.evaluator.evaluate(game, self.side);
        }

        let maximizing = mover == self.side;
        let mut best = if maximizing { LOSS - 1 } else { WIN + 1 };
        for m in &moves {
            let mut child = game.clone();
            if child.move_piece(mover, m.from, m.to, m.promotion).is_err() {
                continue;
            }
            let score = self.alpha_beta(&child, depth - 1, alpha, beta);
            if maximizing {
                best = best.max(score);
                alpha = alpha.max(score);
            } else {
                best = best.min(score);
                beta = beta.min(score);
            }
            if beta <= alpha {
                break;
            }
        }
        best
    }
}

impl SideController for OpponentAgent {
    fn side(&self) -> Side {
        self.side
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn choose_action(&mut self, view: &GameStateView) -> Option<Action> {
        self.decide(view.game(), view.logger())
    }

    fn on_game_end(&mut self, view: &GameStateView, won: bool) {
        let outcome = if won { "won" } else { "did not win" };
        view.logger().agent(&self.name, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::sq;
    use crate::core::{Piece, PieceKind, Position, RulesConfig};

    #[test]
    fn test_difficulty_parsing() {
        assert_eq!("Archmage".parse::<Difficulty>().unwrap(), Difficulty::Archmage);
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Novice);
        assert!("grandmaster".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::Adept.to_string(), "adept");
    }

    #[test]
    fn test_agent_moves_from_start() {
        let game = GameState::new(RulesConfig::default()).unwrap();
        let logger = GameLogger::new();
        let mut agent = OpponentAgent::with_seed(Side::White, Difficulty::Adept, 7);
        let action = agent.decide(&game, &logger).unwrap();
        let mut after = game.clone();
        match action {
            Action::Move { from, to, promotion } => {
                after.move_piece(Side::White, from, to, promotion).unwrap();
            }
            Action::Cast(cast) => {
                after.cast_spell(Side::White, cast).unwrap();
            }
            Action::EndTurn => panic!("agent passed on move one"),
        }
    }

    #[test]
    fn test_agent_waits_for_its_turn() {
        let game = GameState::new(RulesConfig::default()).unwrap();
        let logger = GameLogger::new();
        let mut agent = OpponentAgent::with_seed(Side::Black, Difficulty::Novice, 1);
        assert_eq!(agent.decide(&game, &logger), None);
    }

    #[test]
    fn test_archmage_takes_hanging_queen() {
        let mut pos = Position::empty(Side::White);
        pos.set(sq("a1"), Piece::new(PieceKind::King, Side::White));
        pos.set(sq("h8"), Piece::new(PieceKind::King, Side::Black));
        pos.set(sq("d1"), Piece::new(PieceKind::Rook, Side::White));
        pos.set(sq("d6"), Piece::new(PieceKind::Queen, Side::Black));
        let mut game = GameState::from_position(&pos, RulesConfig::default()).unwrap();
        game.set_mana(Side::White, 0);

        let logger = GameLogger::new();
        let mut agent = OpponentAgent::with_seed(Side::White, Difficulty::Archmage, 11).with_depth(2);
        let action = agent.decide(&game, &logger).unwrap();
        assert_eq!(
            action,
            Action::Move {
                from: sq("d1"),
                to: sq("d6"),
                promotion: None,
            }
        );
    }

    #[test]
    fn test_same_seed_same_choice() {
        let game = GameState::new(RulesConfig::default()).unwrap();
        let logger = GameLogger::new();
        let first = OpponentAgent::with_seed(Side::White, Difficulty::Novice, 42).decide(&game, &logger);
        let second = OpponentAgent::with_seed(Side::White, Difficulty::Novice, 42).decide(&game, &logger);
        assert_eq!(first, second);
    }

    #[test]
    fn test_pacing_delays_follow_up_move() {
        let mut game = GameState::new(RulesConfig::default()).unwrap();
        game.cast_spell(Side::White, crate::core::SpellCast::VeilOfMist).unwrap();
        let logger = GameLogger::new();
        let pause = Duration::from_millis(20);
        let mut agent = OpponentAgent::with_seed(Side::White, Difficulty::Novice, 3).with_pacing(pause);

        let started = std::time::Instant::now();
        let action = agent.decide(&game, &logger);
        assert!(started.elapsed() >= pause);
        assert!(matches!(action, Some(Action::Move { .. })));
    }
}
