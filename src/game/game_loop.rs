//! Game loop implementation
//!
//! Drives a game between two side controllers: asks the side to move for an
//! action, applies it, logs what happened and stops when the game is decided
//! or the turn limit is reached.

use crate::core::Side;
use crate::game::controller::{Action, GameStateView, SideController};
use crate::game::{ActionReport, GameLogger, GameState, GameStatus};
use crate::{Result, SpellChessError};
use serde::Serialize;

/// Verbosity level for game output
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum VerbosityLevel {
    /// Silent - no output during game
    Silent = 0,
    /// Minimal - only game outcome
    Minimal = 1,
    /// Normal - every accepted action (default)
    #[default]
    Normal = 2,
    /// Verbose - effect expiries, rejected actions and agent reasoning
    Verbose = 3,
}

/// Result of running a game to completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameResult {
    /// Winner of the game (None for draws and unfinished games)
    pub winner: Option<Side>,
    /// Number of full rounds started
    pub turns_played: u32,
    pub end_reason: GameEndReason,
}

/// Reason the game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameEndReason {
    Checkmate,
    Stalemate,
    /// Insufficient material, fifty-move rule or threefold repetition
    Draw,
    /// Game reached maximum turn limit
    TurnLimit,
}

/// Rejected actions tolerated from a controller before the loop takes over its turn
const MAX_REJECTIONS: u32 = 3;

/// Game loop manager
pub struct GameLoop<'a> {
    pub game: &'a mut GameState,
    logger: GameLogger,
    max_turns: u32,
}

impl<'a> GameLoop<'a> {
    pub fn new(game: &'a mut GameState) -> Self {
        GameLoop {
            game,
            logger: GameLogger::new(),
            max_turns: 200,
        }
    }

    /// Set maximum rounds before the game is stopped
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_verbosity(mut self, verbosity: VerbosityLevel) -> Self {
        self.logger.set_verbosity(verbosity);
        self
    }

    /// Replace the logger (e.g. one configured for capture or JSON output)
    pub fn with_logger(mut self, logger: GameLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn logger(&self) -> &GameLogger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut GameLogger {
        &mut self.logger
    }

    /// Play until the game is decided or the turn limit is hit
    pub fn run_game(
        &mut self,
        white: &mut dyn SideController,
        black: &mut dyn SideController,
    ) -> Result<GameResult> {
        if white.side() != Side::White || black.side() != Side::Black {
            return Err(SpellChessError::Config(
                "controllers must be passed as (white, black)".to_string(),
            ));
        }

        let result = loop {
            if let Some(result) = self.check_end() {
                break result;
            }
            let side = self.game.current_side();
            let controller: &mut dyn SideController = match side {
                Side::White => &mut *white,
                Side::Black => &mut *black,
            };
            self.run_turn(controller)?;
        };

        self.report(&result);
        self.notify_game_end(white, &result);
        self.notify_game_end(black, &result);
        Ok(result)
    }

    fn notify_game_end(&self, controller: &mut dyn SideController, result: &GameResult) {
        let side = controller.side();
        let view = GameStateView::new(&*self.game, side, &self.logger);
        controller.on_game_end(&view, result.winner == Some(side));
    }

    /// Let `controller` act until its turn ends or the game is decided
    fn run_turn(&mut self, controller: &mut dyn SideController) -> Result<()> {
        let side = controller.side();
        let turn = self.game.turn_number();
        let mut rejections = 0;

        while self.game.current_side() == side && self.game.turn_number() == turn {
            if self.game.game_status().is_over() {
                return Ok(());
            }
            let choice = {
                let view = GameStateView::new(&*self.game, side, &self.logger);
                controller.choose_action(&view)
            };

            let Some(action) = choice else {
                self.logger.agent(controller.name(), "no action");
                return self.take_over(side);
            };

            match self.apply(side, &action) {
                Ok(report) => self.log_report(&action, &report),
                Err(e) => {
                    rejections += 1;
                    self.logger.log(
                        VerbosityLevel::Verbose,
                        Some("rejected"),
                        &format!("{side} {action} rejected: {e}"),
                    );
                    if rejections >= MAX_REJECTIONS {
                        return self.take_over(side);
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply one controller action to the game
    pub fn apply(&mut self, side: Side, action: &Action) -> Result<ActionReport> {
        match action {
            Action::Move { from, to, promotion } => self.game.move_piece(side, *from, *to, *promotion),
            Action::Cast(cast) => self.game.cast_spell(side, cast.clone()),
            Action::EndTurn => self.game.end_turn(side),
        }
    }

    /// Finish a turn the controller could not: end it, or play the first legal move
    fn take_over(&mut self, side: Side) -> Result<()> {
        let action = if self.game.king_moves_pending() || self.game.game_status() == GameStatus::Check {
            match self.game.legal_moves(side).first() {
                Some(m) => Action::from_move(m),
                None => Action::EndTurn,
            }
        } else {
            Action::EndTurn
        };
        let report = self.apply(side, &action)?;
        self.log_report(&action, &report);
        Ok(())
    }

    fn log_report(&self, action: &Action, report: &ActionReport) {
        let category = match action {
            Action::Move { .. } => "move",
            Action::Cast(_) => "spell",
            Action::EndTurn => "turn",
        };
        self.logger.action(category, &report.line);
        for event in &report.events {
            self.logger
                .log(VerbosityLevel::Verbose, Some("effect"), &format!("  {event}"));
        }
    }

    /// Check whether the game has ended or run out of turns
    fn check_end(&self) -> Option<GameResult> {
        let turns_played = self.game.turn_number();
        let status = self.game.game_status();
        let end_reason = match status {
            GameStatus::Checkmate { .. } => GameEndReason::Checkmate,
            GameStatus::Stalemate => GameEndReason::Stalemate,
            GameStatus::Draw => GameEndReason::Draw,
            GameStatus::Active | GameStatus::Check if turns_played > self.max_turns => GameEndReason::TurnLimit,
            GameStatus::Active | GameStatus::Check => return None,
        };
        Some(GameResult {
            winner: status.winner(),
            turns_played,
            end_reason,
        })
    }

    fn report(&self, result: &GameResult) {
        let message = match (result.end_reason, result.winner) {
            (GameEndReason::Checkmate, Some(winner)) => {
                format!("Checkmate after {} turns: {winner} wins", result.turns_played)
            }
            (GameEndReason::TurnLimit, _) => format!("Turn limit of {} reached", self.max_turns),
            (reason, _) => format!("Game drawn by {reason:?} after {} turns", result.turns_played),
        };
        self.logger.minimal(&message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::sq;
    use crate::core::{RulesConfig, SpellCast};
    use crate::game::{ScriptedController, ZeroController};

    fn mv(from: &str, to: &str) -> Action {
        Action::Move {
            from: sq(from),
            to: sq(to),
            promotion: None,
        }
    }

    #[test]
    fn test_fools_mate() {
        let mut game = GameState::new(RulesConfig::default()).unwrap();
        let mut white = ScriptedController::new(Side::White, vec![mv("f2", "f3"), mv("g2", "g4")]);
        let mut black = ScriptedController::new(Side::Black, vec![mv("e7", "e5"), mv("d8", "h4")]);

        let mut game_loop = GameLoop::new(&mut game).with_verbosity(VerbosityLevel::Silent);
        game_loop.logger_mut().enable_capture();
        let result = game_loop.run_game(&mut white, &mut black).unwrap();

        assert_eq!(result.winner, Some(Side::Black));
        assert_eq!(result.end_reason, GameEndReason::Checkmate);
        assert_eq!(game_loop.logger().messages_in("move").len(), 4);
        assert_eq!(game.move_log().len(), 4);
    }

    #[test]
    fn test_turn_limit() {
        let mut game = GameState::new(RulesConfig::default()).unwrap();
        let mut white = ScriptedController::new(Side::White, Vec::new());
        let mut black = ScriptedController::new(Side::Black, Vec::new());

        let mut game_loop = GameLoop::new(&mut game)
            .with_verbosity(VerbosityLevel::Silent)
            .with_max_turns(1);
        let result = game_loop.run_game(&mut white, &mut black).unwrap();

        assert_eq!(result.end_reason, GameEndReason::TurnLimit);
        assert_eq!(result.winner, None);
        assert_eq!(result.turns_played, 2);
    }

    #[test]
    fn test_rejected_actions_are_skipped() {
        let mut game = GameState::new(RulesConfig::default()).unwrap();
        let mut white = ScriptedController::new(
            Side::White,
            vec![
                mv("e2", "e5"),
                Action::Cast(SpellCast::EmberCrown { pawn: sq("e2") }),
                mv("e2", "e4"),
            ],
        );
        let mut black = ZeroController::new(Side::Black);

        let mut game_loop = GameLoop::new(&mut game)
            .with_verbosity(VerbosityLevel::Verbose)
            .with_max_turns(1);
        game_loop.logger_mut().enable_capture();
        game_loop.run_game(&mut white, &mut black).unwrap();

        assert_eq!(game_loop.logger().messages_in("rejected").len(), 2);
        assert!(game.move_log()[0].contains("e2-e4"));
    }

    #[test]
    fn test_controllers_must_match_sides() {
        let mut game = GameState::new(RulesConfig::default()).unwrap();
        let mut a = ZeroController::new(Side::Black);
        let mut b = ZeroController::new(Side::White);
        let mut game_loop = GameLoop::new(&mut game);
        assert!(game_loop.run_game(&mut a, &mut b).is_err());
    }

    /// Script that remembers how the game ended for it
    struct RecordingController {
        script: ScriptedController,
        outcome: Option<bool>,
    }

    impl SideController for RecordingController {
        fn side(&self) -> Side {
            self.script.side()
        }

        fn choose_action(&mut self, view: &GameStateView) -> Option<Action> {
            self.script.choose_action(view)
        }

        fn on_game_end(&mut self, _view: &GameStateView, won: bool) {
            self.outcome = Some(won);
        }
    }

    #[test]
    fn test_both_controllers_hear_the_result() {
        let mut game = GameState::new(RulesConfig::default()).unwrap();
        let mut white = RecordingController {
            script: ScriptedController::new(Side::White, vec![mv("f2", "f3"), mv("g2", "g4")]),
            outcome: None,
        };
        let mut black = RecordingController {
            script: ScriptedController::new(Side::Black, vec![mv("e7", "e5"), mv("d8", "h4")]),
            outcome: None,
        };

        GameLoop::new(&mut game)
            .with_verbosity(VerbosityLevel::Silent)
            .run_game(&mut white, &mut black)
            .unwrap();

        assert_eq!(white.outcome, Some(false));
        assert_eq!(black.outcome, Some(true));
    }
}
