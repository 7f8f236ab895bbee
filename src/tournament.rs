//! Tournament mode for running many agent-vs-agent games in parallel
//!
//! Games run concurrently with rayon. Each game derives its agents' seeds from
//! the tournament seed and the game index, so a tournament is reproducible.

use crate::ai::{Difficulty, OpponentAgent};
use crate::core::{RulesConfig, Side};
use crate::game::{GameEndReason, GameLoop, GameState, VerbosityLevel};
use crate::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// Settings for one tournament run
#[derive(Debug, Clone)]
pub struct TourneyConfig {
    pub games: usize,
    pub white: Difficulty,
    pub black: Difficulty,
    pub seed: u64,
    pub max_turns: u32,
    pub rules: RulesConfig,
    /// Search depth override for both agents
    pub depth: Option<u32>,
}

impl Default for TourneyConfig {
    fn default() -> Self {
        TourneyConfig {
            games: 10,
            white: Difficulty::Adept,
            black: Difficulty::Adept,
            seed: 42,
            max_turns: 100,
            rules: RulesConfig::default(),
            depth: None,
        }
    }
}

/// Aggregate results of a tournament
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TournamentStats {
    pub white_wins: usize,
    pub black_wins: usize,
    pub draws: usize,
    pub failed: usize,
    /// Games per end reason
    pub end_reasons: BTreeMap<String, usize>,
    pub total_turns: u64,
}

impl TournamentStats {
    pub fn games(&self) -> usize {
        self.white_wins + self.black_wins + self.draws
    }

    pub fn average_turns(&self) -> f64 {
        match self.games() {
            0 => 0.0,
            n => self.total_turns as f64 / n as f64,
        }
    }
}

/// Seed for one side in one game
fn agent_seed(tourney_seed: u64, game_idx: usize, side: Side) -> u64 {
    let game_seed = tourney_seed.wrapping_add((game_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    match side {
        Side::White => game_seed.wrapping_add(0x1234_5678_9ABC_DEF0),
        Side::Black => game_seed.wrapping_add(0xFEDC_BA98_7654_3210),
    }
}

/// Play one seeded game silently
pub fn play_game(config: &TourneyConfig, game_idx: usize) -> Result<(Option<Side>, u32, GameEndReason)> {
    let mut game = GameState::new(config.rules.clone())?;
    let mut white = OpponentAgent::with_seed(Side::White, config.white, agent_seed(config.seed, game_idx, Side::White));
    let mut black = OpponentAgent::with_seed(Side::Black, config.black, agent_seed(config.seed, game_idx, Side::Black));
    if let Some(depth) = config.depth {
        white = white.with_depth(depth);
        black = black.with_depth(depth);
    }

    let mut game_loop = GameLoop::new(&mut game)
        .with_verbosity(VerbosityLevel::Silent)
        .with_max_turns(config.max_turns);
    let result = game_loop.run_game(&mut white, &mut black)?;
    Ok((result.winner, result.turns_played, result.end_reason))
}

/// Run every game of the tournament in parallel and aggregate the results
pub fn run_tourney(config: &TourneyConfig) -> TournamentStats {
    let results: Vec<Result<(Option<Side>, u32, GameEndReason)>> = (0..config.games)
        .into_par_iter()
        .map(|game_idx| play_game(config, game_idx))
        .collect();

    let mut stats = TournamentStats::default();
    for (game_idx, result) in results.into_iter().enumerate() {
        match result {
            Ok((winner, turns, reason)) => {
                match winner {
                    Some(Side::White) => stats.white_wins += 1,
                    Some(Side::Black) => stats.black_wins += 1,
                    None => stats.draws += 1,
                }
                *stats.end_reasons.entry(format!("{reason:?}")).or_insert(0) += 1;
                stats.total_turns += u64::from(turns);
            }
            Err(e) => {
                eprintln!("Warning: Game {game_idx} failed: {e}");
                stats.failed += 1;
            }
        }
    }
    stats
}

/// Run a tournament and print the statistics
pub fn run_and_report(config: &TourneyConfig) -> TournamentStats {
    println!("=== Spell Chess - Tournament Mode ===\n");
    println!("Running {} games: White={} Black={}", config.games, config.white, config.black);
    println!("Using tournament seed: {}\n", config.seed);

    let start = Instant::now();
    let stats = run_tourney(config);
    let elapsed = start.elapsed();

    println!("=== Tournament Complete ===");
    println!("Total games played: {}", stats.games());
    println!("Elapsed time: {:.2}s", elapsed.as_secs_f64());
    println!("Average length: {:.1} turns\n", stats.average_turns());

    let total = stats.games();
    if total > 0 {
        for (label, count) in [
            ("White wins", stats.white_wins),
            ("Black wins", stats.black_wins),
            ("Draws", stats.draws),
        ] {
            println!("{label}: {count} ({:.1}%)", 100.0 * count as f64 / total as f64);
        }
    }
    println!("\n=== End Reasons ===");
    for (reason, count) in &stats.end_reasons {
        println!("  {reason}: {count}");
    }
    if stats.failed > 0 {
        println!("\n{} games failed", stats.failed);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> TourneyConfig {
        TourneyConfig {
            games: 4,
            white: Difficulty::Novice,
            black: Difficulty::Novice,
            seed: 5,
            max_turns: 6,
            ..TourneyConfig::default()
        }
    }

    #[test]
    fn test_seeds_differ_per_side_and_game() {
        assert_ne!(agent_seed(1, 0, Side::White), agent_seed(1, 0, Side::Black));
        assert_ne!(agent_seed(1, 0, Side::White), agent_seed(1, 1, Side::White));
    }

    #[test]
    fn test_tourney_counts_every_game() {
        let stats = run_tourney(&quick());
        assert_eq!(stats.games() + stats.failed, 4);
        assert_eq!(stats.end_reasons.values().sum::<usize>(), stats.games());
    }

    #[test]
    fn test_tourney_is_reproducible() {
        assert_eq!(run_tourney(&quick()), run_tourney(&quick()));
    }
}
