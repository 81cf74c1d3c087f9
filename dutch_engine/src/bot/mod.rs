//! Computer opponents driven by a rule table.
//!
//! This module implements:
//! - RuleTable: ordered, serde-loadable rules per decision event
//! - DecisionMaker: evaluates rules against a seat's memory
//! - Difficulty presets for recall and think time
//!
//! ## Difficulty Presets
//!
//! | Difficulty | Remembers | Think time |
//! |------------|-----------|------------|
//! | Easy       | 70%       | 1.5s ± 1.0s |
//! | Medium     | 80%       | 1.2s ± 0.8s |
//! | Hard       | 90%       | 1.0s ± 0.6s |
//! | Expert     | 100%      | 0.8s ± 0.4s |
//!
//! ## Example
//!
//! ```
//! use dutch_engine::bot::{BotEvent, DecisionMaker, RuleTable};
//! use dutch_engine::game::{Game, Player};
//! use dutch_engine::room::Difficulty;
//!
//! let mut game = Game::new("room");
//! game.players.push(Player::computer("bot", "Bot", Difficulty::Hard));
//!
//! let mut maker = DecisionMaker::new();
//! maker.set_rules(Some(RuleTable::standard()));
//! let decision = maker.decide(BotEvent::DrawCard, &game, "bot");
//! println!("{:?} because {}", decision.action, decision.reasoning);
//! ```

pub mod decision;
pub mod models;
pub mod rules;

pub use decision::{Decision, DecisionAction, DecisionMaker};
pub use models::DifficultyParams;
pub use rules::{BotEvent, Condition, DifficultyWeights, Rule, RuleAction, RuleTable};
