//! # Dutch Engine
//!
//! Authoritative round engine for Dutch/Recall style card games: every
//! player holds four face-down cards, remembers only some of them, and tries
//! to finish a round with the fewest points.
//!
//! The engine owns each room's state, validates and applies actions, runs
//! the timed reaction windows that follow every play (same-rank discards,
//! Jack swaps, Queen peeks), drives computer opponents from a rule table,
//! and only ever broadcasts card identifiers, never hidden faces.
//!
//! ## Core Modules
//!
//! - [`game`]: entities, the turn/phase engine, reaction windows, memory,
//!   views and scoring
//! - [`bot`]: rule tables and the computer decision maker
//! - [`room`]: per-room actors, the game store and outbound callbacks
//!
//! ## Example
//!
//! ```
//! use dutch_engine::game::{Game, Player, RoundEngine, Scheduler};
//! use dutch_engine::room::{Difficulty, RecordingCallbacks, RoomConfig, TimerConfig};
//!
//! let callbacks = RecordingCallbacks::new(TimerConfig::default());
//! let mut engine = RoundEngine::new("room", RoomConfig::default(), callbacks, Scheduler::manual());
//!
//! let mut game = Game::new("room");
//! game.players.push(Player::human("alice", "Alice"));
//! game.players.push(Player::computer("bot", "Bot", Difficulty::Easy));
//!
//! assert!(engine.start_round(&mut game));
//! ```

pub mod bot;
pub mod game;
pub mod room;

pub use game::{ActionError, Game, GameView, Phase, RoundEngine};
pub use room::{RoomCallbacks, RoomConfig, RoomManager};
