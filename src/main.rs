//! Spell Chess - Main Binary
//!
//! Agent-vs-agent games, the spell table and tournaments from the command line

use anyhow::Context;
use clap::{Parser, Subcommand};
use spellchess::{
    ai::{Difficulty, OpponentAgent},
    core::{RulesConfig, Side},
    game::{GameLogger, GameLoop, GameState, OutputFormat, VerbosityLevel},
    tournament::{run_and_report, TourneyConfig},
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Verbosity level for game output (custom parser supporting both names and numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(VerbosityLevel::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(VerbosityLevel::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(VerbosityLevel::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(VerbosityLevel::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

impl From<VerbosityArg> for VerbosityLevel {
    fn from(arg: VerbosityArg) -> Self {
        arg.0
    }
}

#[derive(Parser)]
#[command(name = "spellchess")]
#[command(about = "Spell Chess - chess with spells, mana and a computer opponent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one game between two computer agents
    Play {
        /// White agent difficulty
        #[arg(long, value_enum, default_value = "adept")]
        white: Difficulty,

        /// Black agent difficulty
        #[arg(long, value_enum, default_value = "adept")]
        black: Difficulty,

        /// Set random seed for deterministic games
        #[arg(long)]
        seed: Option<u64>,

        /// Stop after this many rounds
        #[arg(long, default_value_t = 100)]
        max_turns: u32,

        /// Verbosity level for game output (0=silent, 1=minimal, 2=normal, 3=verbose)
        #[arg(long, default_value = "normal", short = 'v')]
        verbosity: VerbosityArg,

        /// Rules configuration file (JSON)
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Emit log lines as JSON objects
        #[arg(long)]
        json: bool,

        /// Pause (milliseconds) before an agent's follow-up move after a spell
        #[arg(long, value_name = "MS")]
        pace_ms: Option<u64>,
    },

    /// Print the spell table for a rules configuration
    Spells {
        /// Rules configuration file (JSON)
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
    },

    /// Run many seeded games in parallel and report statistics
    Tourney {
        /// Number of games to run
        #[arg(long, short = 'g', default_value_t = 20)]
        games: usize,

        #[arg(long, value_enum, default_value = "adept")]
        white: Difficulty,

        #[arg(long, value_enum, default_value = "adept")]
        black: Difficulty,

        /// Tournament seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 100)]
        max_turns: u32,

        /// Search depth override for both agents
        #[arg(long)]
        depth: Option<u32>,

        /// Rules configuration file (JSON)
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
    },
}

fn load_rules(path: Option<&Path>) -> anyhow::Result<RulesConfig> {
    match path {
        Some(path) => RulesConfig::load(path).with_context(|| format!("loading rules from {}", path.display())),
        None => Ok(RulesConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            white,
            black,
            seed,
            max_turns,
            verbosity,
            config,
            json,
            pace_ms,
        } => run_play(
            white,
            black,
            seed,
            max_turns,
            verbosity.into(),
            config,
            json,
            pace_ms.map(Duration::from_millis),
        )?,
        Commands::Spells { config } => print_spells(config)?,
        Commands::Tourney {
            games,
            white,
            black,
            seed,
            max_turns,
            depth,
            config,
        } => {
            let rules = load_rules(config.as_deref())?;
            let stats = run_and_report(&TourneyConfig {
                games,
                white,
                black,
                seed,
                max_turns,
                rules,
                depth,
            });
            if stats.failed > 0 {
                anyhow::bail!("{} of {games} games failed", stats.failed);
            }
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_play(
    white: Difficulty,
    black: Difficulty,
    seed: Option<u64>,
    max_turns: u32,
    verbosity: VerbosityLevel,
    config: Option<PathBuf>,
    json: bool,
    pace: Option<Duration>,
) -> anyhow::Result<()> {
    let rules = load_rules(config.as_deref())?;
    let mut game = GameState::new(rules)?;

    let (mut white_agent, mut black_agent) = match seed {
        Some(seed) => (
            OpponentAgent::with_seed(Side::White, white, seed),
            OpponentAgent::with_seed(Side::Black, black, seed.wrapping_add(1)),
        ),
        None => (OpponentAgent::new(Side::White, white), OpponentAgent::new(Side::Black, black)),
    };
    if let Some(pause) = pace {
        white_agent = white_agent.with_pacing(pause);
        black_agent = black_agent.with_pacing(pause);
    }

    let mut logger = GameLogger::with_verbosity(verbosity);
    if json {
        logger.set_output_format(OutputFormat::Json);
    }

    if verbosity >= VerbosityLevel::Minimal && !json {
        println!("=== Spell Chess: {white} (White) vs {black} (Black) ===\n");
    }

    let result = GameLoop::new(&mut game)
        .with_logger(logger)
        .with_max_turns(max_turns)
        .run_game(&mut white_agent, &mut black_agent)?;

    if verbosity >= VerbosityLevel::Minimal && !json {
        println!("\n=== Game Over ===");
        match result.winner {
            Some(winner) => println!("Winner: {winner}"),
            None => println!("No winner"),
        }
        println!("Turns played: {}", result.turns_played);
        println!("Reason: {:?}", result.end_reason);
        println!("\n=== Final Position ===");
        println!("{}", game.board_snapshot().fen());
        println!("Mana: White {} / Black {}", game.mana(Side::White), game.mana(Side::Black));
    }
    Ok(())
}

fn print_spells(config: Option<PathBuf>) -> anyhow::Result<()> {
    let rules = load_rules(config.as_deref())?;
    let book = rules.spell_book();
    println!("{:<18} {:>4}  {:<24} {:>8}  ends turn", "spell", "cost", "targets", "duration");
    for def in book.iter() {
        println!(
            "{:<18} {:>4}  {:<24} {:>8}  {}",
            def.id.to_string(),
            def.mana_cost,
            format!("{:?}", def.shape),
            def.duration,
            if def.ends_turn { "yes" } else { "no" }
        );
    }
    Ok(())
}
