//! Scripted side controller for testing
//!
//! This controller follows a predetermined script of actions, useful for
//! deterministic match tests.

use crate::core::Side;
use crate::game::controller::{Action, GameStateView, SideController};
use std::collections::VecDeque;

/// A controller that follows a predetermined sequence of actions
pub struct ScriptedController {
    side: Side,
    actions: VecDeque<Action>,
}

impl ScriptedController {
    pub fn new(side: Side, actions: Vec<Action>) -> Self {
        ScriptedController {
            side,
            actions: actions.into(),
        }
    }

    /// Actions not yet played
    pub fn remaining(&self) -> usize {
        self.actions.len()
    }
}

impl SideController for ScriptedController {
    fn side(&self) -> Side {
        self.side
    }

    fn name(&self) -> &str {
        "script"
    }

    fn choose_action(&mut self, _view: &GameStateView) -> Option<Action> {
        // Out of script: nothing to do
        self.actions.pop_front()
    }
}

/// A controller that always plays the first legal move
///
/// Useful for running games without interaction and for benchmarking the
/// engine without agent overhead.
pub struct ZeroController {
    side: Side,
}

impl ZeroController {
    pub fn new(side: Side) -> Self {
        ZeroController { side }
    }
}

impl SideController for ZeroController {
    fn side(&self) -> Side {
        self.side
    }

    fn name(&self) -> &str {
        "zero"
    }

    fn choose_action(&mut self, view: &GameStateView) -> Option<Action> {
        view.legal_moves().first().map(Action::from_move)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::sq;
    use crate::core::RulesConfig;
    use crate::game::{GameLogger, GameState};

    #[test]
    fn test_scripted_controller() {
        let game = GameState::new(RulesConfig::default()).unwrap();
        let logger = GameLogger::new();
        let view = GameStateView::new(&game, Side::White, &logger);

        let e4 = Action::Move {
            from: sq("e2"),
            to: sq("e4"),
            promotion: None,
        };
        let mut controller = ScriptedController::new(Side::White, vec![e4.clone(), Action::EndTurn]);

        assert_eq!(controller.choose_action(&view), Some(e4));
        assert_eq!(controller.choose_action(&view), Some(Action::EndTurn));
        assert_eq!(controller.remaining(), 0);
        assert_eq!(controller.choose_action(&view), None);
    }

    #[test]
    fn test_zero_controller_chooses_a_legal_move() {
        let game = GameState::new(RulesConfig::default()).unwrap();
        let logger = GameLogger::new();
        let view = GameStateView::new(&game, Side::White, &logger);

        let mut controller = ZeroController::new(Side::White);
        match controller.choose_action(&view) {
            Some(Action::Move { from, to, .. }) => {
                assert!(game.legal_destinations(from).contains(&to));
            }
            other => panic!("expected a move, got {other:?}"),
        }

        let black_view = GameStateView::new(&game, Side::Black, &logger);
        assert_eq!(ZeroController::new(Side::Black).choose_action(&black_view), None);
    }
}
