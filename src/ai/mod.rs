//! Opponent agent: static evaluation, spell heuristics and move search

pub mod agent;
pub mod evaluator;
pub mod spell_heuristics;

pub use agent::{Difficulty, OpponentAgent};
pub use evaluator::Evaluator;
pub use spell_heuristics::SpellProposal;
