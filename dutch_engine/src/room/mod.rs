//! Room module providing one async actor per live room.
//!
//! This module implements:
//! - RoomActor: owns a room's engine and timers and processes one message at a time
//! - RoomManager: spawns rooms and tracks their handles
//! - GameStore: room-keyed repository of game state
//! - RoomCallbacks: the outbound notification surface
//!
//! ## Example
//!
//! ```no_run
//! use dutch_engine::room::{RecordingCallbacks, RoomConfig, RoomManager, TimerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let callbacks = RecordingCallbacks::new(TimerConfig::default());
//!     let manager = RoomManager::new(callbacks, None);
//!
//!     let room_id = manager.create_room(RoomConfig::default()).await.unwrap();
//!     let room = manager.get_room(&room_id).await.unwrap();
//!     room.join("alice", "Alice").await.unwrap();
//!     room.add_computer("Bot", None).await.unwrap();
//!     room.start_game().await.unwrap();
//! }
//! ```

pub mod actor;
pub mod callbacks;
pub mod config;
pub mod manager;
pub mod messages;
pub mod store;

pub use actor::{RoomActor, RoomHandle};
pub use callbacks::{
    ChannelCallbacks, PotMetadata, RecordingCallbacks, RoomCallbacks, RoomEvent,
    RoomNotification, TimerConfig,
};
pub use config::{Difficulty, EngineTimings, RoomConfig};
pub use manager::{RoomManager, RoomMetadata};
pub use messages::{RoomMessage, RoomResponse};
pub use store::{GameStore, GameUpdate, StoreError};
