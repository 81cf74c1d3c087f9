//! Outbound notification surface implemented by the transport layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::sync::mpsc;

use crate::game::{
    entities::{PlayerId, RoomId, WinnerRecord},
    scoring::PlayerResult,
    views::GameView,
};

/// External tunables read at the moment a timer would be armed.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TimerConfig {
    /// Deadline for each draw and each play; `None` disables turn timeouts
    pub turn_time_limit: Option<Duration>,
    /// Tutorial mode: no turn or window timeouts at all
    pub show_instructions: bool,
}

/// Coins at stake in a finished round.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PotMetadata {
    pub entry_fee: u32,
    pub pot: u32,
    pub per_winner: u32,
    pub is_practice: bool,
}

/// Callbacks the engine uses to reach room members.
///
/// Implementations must not call back into the engine; they run while the
/// room's state is being mutated.
pub trait RoomCallbacks: Send + Sync {
    fn timer_config(&self) -> TimerConfig;

    /// Broadcast to every room member.
    fn on_game_state_changed(&self, room_id: &str, view: &GameView);

    /// Broadcast to everyone but `player_id`.
    fn broadcast_game_state_except(&self, room_id: &str, player_id: &str, view: &GameView);

    /// Deliver to `player_id` alone.
    fn send_game_state_to_player(&self, room_id: &str, player_id: &str, view: &GameView);

    fn on_action_error(&self, room_id: &str, message: &str, data: &Value);

    /// Called exactly once per round.
    fn on_game_ended(
        &self,
        room_id: &str,
        winners: &[WinnerRecord],
        players: &[PlayerResult],
        pot: &PotMetadata,
    );

    /// `player_id` has missed too many actions and should be removed.
    fn trigger_leave_room(&self, room_id: &str, player_id: &str);
}

/// Everything a room can tell the outside world.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomEvent {
    StateChanged {
        view: GameView,
    },
    StateExcept {
        except: PlayerId,
        view: GameView,
    },
    PrivateState {
        player_id: PlayerId,
        view: GameView,
    },
    ActionError {
        message: String,
        data: Value,
    },
    GameEnded {
        winners: Vec<WinnerRecord>,
        players: Vec<PlayerResult>,
        pot: PotMetadata,
    },
    LeaveRoom {
        player_id: PlayerId,
    },
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RoomNotification {
    pub room_id: RoomId,
    #[serde(flatten)]
    pub event: RoomEvent,
}

/// Forwards every callback as a [`RoomNotification`] over a channel.
pub struct ChannelCallbacks {
    sender: mpsc::UnboundedSender<RoomNotification>,
    timer_config: TimerConfig,
}

impl ChannelCallbacks {
    #[must_use]
    pub fn new(
        sender: mpsc::UnboundedSender<RoomNotification>,
        timer_config: TimerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            sender,
            timer_config,
        })
    }

    fn emit(&self, room_id: &str, event: RoomEvent) {
        let notification = RoomNotification {
            room_id: room_id.to_string(),
            event,
        };
        if self.sender.send(notification).is_err() {
            log::debug!("Room {}: notification receiver dropped", room_id);
        }
    }
}

impl RoomCallbacks for ChannelCallbacks {
    fn timer_config(&self) -> TimerConfig {
        self.timer_config.clone()
    }

    fn on_game_state_changed(&self, room_id: &str, view: &GameView) {
        self.emit(room_id, RoomEvent::StateChanged { view: view.clone() });
    }

    fn broadcast_game_state_except(&self, room_id: &str, player_id: &str, view: &GameView) {
        self.emit(
            room_id,
            RoomEvent::StateExcept {
                except: player_id.to_string(),
                view: view.clone(),
            },
        );
    }

    fn send_game_state_to_player(&self, room_id: &str, player_id: &str, view: &GameView) {
        self.emit(
            room_id,
            RoomEvent::PrivateState {
                player_id: player_id.to_string(),
                view: view.clone(),
            },
        );
    }

    fn on_action_error(&self, room_id: &str, message: &str, data: &Value) {
        self.emit(
            room_id,
            RoomEvent::ActionError {
                message: message.to_string(),
                data: data.clone(),
            },
        );
    }

    fn on_game_ended(
        &self,
        room_id: &str,
        winners: &[WinnerRecord],
        players: &[PlayerResult],
        pot: &PotMetadata,
    ) {
        self.emit(
            room_id,
            RoomEvent::GameEnded {
                winners: winners.to_vec(),
                players: players.to_vec(),
                pot: pot.clone(),
            },
        );
    }

    fn trigger_leave_room(&self, room_id: &str, player_id: &str) {
        self.emit(
            room_id,
            RoomEvent::LeaveRoom {
                player_id: player_id.to_string(),
            },
        );
    }
}

/// Keeps every notification in memory. Used by tests and the simulator.
#[derive(Default)]
pub struct RecordingCallbacks {
    timer_config: Mutex<TimerConfig>,
    events: Mutex<Vec<RoomNotification>>,
}

impl RecordingCallbacks {
    #[must_use]
    pub fn new(timer_config: TimerConfig) -> Arc<Self> {
        Arc::new(Self {
            timer_config: Mutex::new(timer_config),
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn set_timer_config(&self, config: TimerConfig) {
        *lock(&self.timer_config) = config;
    }

    fn push(&self, room_id: &str, event: RoomEvent) {
        lock(&self.events).push(RoomNotification {
            room_id: room_id.to_string(),
            event,
        });
    }

    #[must_use]
    pub fn events(&self) -> Vec<RoomEvent> {
        lock(&self.events).iter().map(|n| n.event.clone()).collect()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RoomEvent::ActionError { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn leave_requests(&self, player_id: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, RoomEvent::LeaveRoom { player_id: p } if p == player_id))
            .count()
    }

    #[must_use]
    pub fn game_endings(&self) -> Vec<(Vec<WinnerRecord>, PotMetadata)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RoomEvent::GameEnded { winners, pot, .. } => Some((winners, pot)),
                _ => None,
            })
            .collect()
    }

    /// Every view a given player received, in delivery order.
    #[must_use]
    pub fn views_seen_by(&self, player_id: &str) -> Vec<GameView> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RoomEvent::StateChanged { view } => Some(view),
                RoomEvent::StateExcept { except, view } if except != player_id => Some(view),
                RoomEvent::PrivateState { player_id: to, view } if to == player_id => Some(view),
                _ => None,
            })
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RoomCallbacks for RecordingCallbacks {
    fn timer_config(&self) -> TimerConfig {
        lock(&self.timer_config).clone()
    }

    fn on_game_state_changed(&self, room_id: &str, view: &GameView) {
        self.push(room_id, RoomEvent::StateChanged { view: view.clone() });
    }

    fn broadcast_game_state_except(&self, room_id: &str, player_id: &str, view: &GameView) {
        self.push(
            room_id,
            RoomEvent::StateExcept {
                except: player_id.to_string(),
                view: view.clone(),
            },
        );
    }

    fn send_game_state_to_player(&self, room_id: &str, player_id: &str, view: &GameView) {
        self.push(
            room_id,
            RoomEvent::PrivateState {
                player_id: player_id.to_string(),
                view: view.clone(),
            },
        );
    }

    fn on_action_error(&self, room_id: &str, message: &str, data: &Value) {
        self.push(
            room_id,
            RoomEvent::ActionError {
                message: message.to_string(),
                data: data.clone(),
            },
        );
    }

    fn on_game_ended(
        &self,
        room_id: &str,
        winners: &[WinnerRecord],
        players: &[PlayerResult],
        pot: &PotMetadata,
    ) {
        self.push(
            room_id,
            RoomEvent::GameEnded {
                winners: winners.to_vec(),
                players: players.to_vec(),
                pot: pot.clone(),
            },
        );
    }

    fn trigger_leave_room(&self, room_id: &str, player_id: &str) {
        self.push(
            room_id,
            RoomEvent::LeaveRoom {
                player_id: player_id.to_string(),
            },
        );
    }
}
