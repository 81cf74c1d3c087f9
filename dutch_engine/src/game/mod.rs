//! Round engine for Dutch-style card games.
//!
//! This module implements:
//! - Card, player and game records shared by every room
//! - The turn/phase engine and its reaction windows
//! - Per-seat memory of seen cards
//! - Sanitized views safe to broadcast
//! - End-of-round scoring
//!
//! All mutation of a room's [`Game`] goes through a [`RoundEngine`], which
//! reports rejected actions through the room's callbacks instead of
//! returning errors.

pub mod computer;
pub mod directory;
pub mod engine;
pub mod entities;
pub mod errors;
pub mod memory;
pub mod scoring;
pub mod timers;
pub mod views;
pub mod windows;

pub use engine::{MAX_MISSED_ACTIONS, RoundEngine};
pub use entities::{
    Card, CardId, DrawSource, Game, Phase, Player, PlayerId, PlayerStatus, Rank, RoomId,
    SpecialPower, Suit, TurnAction, TurnEvent, WinType, WinnerRecord,
};
pub use errors::ActionError;
pub use scoring::{PlayerResult, Score};
pub use timers::{FiredTimer, Scheduler, TimerSlot, TimerTask};
pub use views::{CardView, GameView, PlayerView, peek_view, player_view, public_view};
pub use windows::{ReactionWindow, SpecialWindow};
