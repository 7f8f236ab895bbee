//! Game state, turn control, spell resolution and the game loop

pub mod controller;
pub mod game_loop;
pub mod logger;
pub mod scripted_controller;
mod spells;
pub mod state;
mod turn;

pub use controller::{Action, GameStateView, SideController};
pub use game_loop::{GameEndReason, GameLoop, GameResult, VerbosityLevel};
pub use logger::{GameLogger, LogEntry, OutputFormat, OutputMode};
pub use scripted_controller::{ScriptedController, ZeroController};
pub use state::{ActionReport, GameState, GameStatus, TurnState};
