//! Headless room drivers.
//!
//! One dispatcher task fans the shared notification channel out to one
//! inbox per room; each room driver seats computers and plays rounds.

use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use dutch_engine::{
    Phase,
    game::{RoomId, WinnerRecord},
    room::{PotMetadata, RoomEvent, RoomHandle, RoomManager, RoomMessage, RoomNotification},
};
use serde_json::{Value, json};
use tokio::{
    sync::{RwLock, mpsc},
    task::JoinHandle,
};
use tracing::{Instrument, Span};

use crate::config::SimConfig;

type Routes = Arc<RwLock<HashMap<RoomId, mpsc::UnboundedSender<RoomEvent>>>>;

/// Routes notifications to the driver of the room they came from
#[derive(Clone, Default)]
pub struct Dispatcher {
    routes: Routes,
}

impl Dispatcher {
    /// Spawn the routing task over the manager's notification channel
    pub fn spawn(mut rx: mpsc::UnboundedReceiver<RoomNotification>) -> (Self, JoinHandle<()>) {
        let dispatcher = Self::default();
        let routes = dispatcher.routes.clone();
        let task = tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                let inboxes = routes.read().await;
                match inboxes.get(&notification.room_id) {
                    Some(inbox) => {
                        let _ = inbox.send(notification.event);
                    }
                    None => log::trace!(
                        "Room {}: notification without a driver",
                        notification.room_id
                    ),
                }
            }
            log::debug!("Notification channel closed");
        });
        (dispatcher, task)
    }

    /// Open an inbox for `room_id`
    pub async fn register(&self, room_id: &str) -> mpsc::UnboundedReceiver<RoomEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.write().await.insert(room_id.to_string(), tx);
        rx
    }

    pub async fn unregister(&self, room_id: &str) {
        self.routes.write().await.remove(room_id);
    }
}

/// What one finished round looked like
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub round: u32,
    pub winners: Vec<WinnerRecord>,
    pub pot: PotMetadata,
    /// Whether the driver had to call the final round itself
    pub forced_final_round: bool,
}

impl RoundOutcome {
    pub fn to_json(&self) -> Value {
        json!({
            "round": self.round,
            "winners": self.winners,
            "pot": self.pot,
            "forced_final_round": self.forced_final_round,
        })
    }
}

/// Create a room, seat its computers, and play the configured rounds
pub async fn drive_room(
    manager: Arc<RoomManager>,
    dispatcher: Dispatcher,
    config: Arc<SimConfig>,
    index: usize,
) -> anyhow::Result<(RoomId, Vec<RoundOutcome>)> {
    let span = crate::logging::room_span(index);
    async move {
        let room_id = manager
            .create_room(config.room_config(index))
            .await
            .map_err(anyhow::Error::msg)?;
        crate::logging::record_room_id(&Span::current(), &room_id);
        let room = manager
            .get_room(&room_id)
            .await
            .context("room vanished right after creation")?;
        let mut events = dispatcher.register(&room_id).await;

        let result = play_rounds(&room, &mut events, &config).await;

        dispatcher.unregister(&room_id).await;
        if let Err(e) = manager.close_room(&room_id).await {
            log::warn!("Room {}: close failed: {}", room_id, e);
        }
        result.map(|outcomes| (room_id, outcomes))
    }
    .instrument(span)
    .await
}

async fn play_rounds(
    room: &RoomHandle,
    events: &mut mpsc::UnboundedReceiver<RoomEvent>,
    config: &SimConfig,
) -> anyhow::Result<Vec<RoundOutcome>> {
    for seat in 0..config.players_per_room {
        let response = room
            .add_computer(&format!("Bot {}", seat + 1), Some(config.difficulty))
            .await
            .map_err(anyhow::Error::msg)?;
        if let Some(message) = response.error_message() {
            bail!("Room {}: could not seat computer: {}", room.room_id(), message);
        }
    }

    let mut outcomes = Vec::with_capacity(config.rounds as usize);
    for round in 1..=config.rounds {
        let response = room.start_game().await.map_err(anyhow::Error::msg)?;
        if let Some(message) = response.error_message() {
            bail!("Room {}: round {} did not start: {}", room.room_id(), round, message);
        }
        log::info!("Room {}: round {} started", room.room_id(), round);

        let outcome = play_round(room, events, config, round).await?;
        crate::logging::log_round_finished(
            room.room_id(),
            round,
            &outcome
                .winners
                .iter()
                .map(|w| w.player_name.clone())
                .collect::<Vec<_>>(),
            outcome.pot.pot,
        );
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

async fn play_round(
    room: &RoomHandle,
    events: &mut mpsc::UnboundedReceiver<RoomEvent>,
    config: &SimConfig,
    round: u32,
) -> anyhow::Result<RoundOutcome> {
    // Computers never call the final round on their own
    let natural = tokio::select! {
        ended = next_game_end(events) => Some(ended),
        _ = tokio::time::sleep(config.final_round_after) => None,
    };

    let (ended, forced_final_round) = match natural {
        Some(ended) => (ended, false),
        None => {
            call_final_round(room).await?;
            let ended = tokio::time::timeout(config.round_timeout, next_game_end(events))
                .await
                .with_context(|| {
                    format!("Room {}: round {} never ended", room.room_id(), round)
                })?;
            (ended, true)
        }
    };

    let (winners, pot) = ended.context("notification channel closed mid-round")?;
    Ok(RoundOutcome {
        round,
        winners,
        pot,
        forced_final_round,
    })
}

async fn call_final_round(room: &RoomHandle) -> anyhow::Result<()> {
    let view = room
        .view(None)
        .await
        .map_err(anyhow::Error::msg)?
        .context("room has no game")?;
    if view.phase == Phase::GameEnded {
        return Ok(());
    }

    let caller = view
        .players
        .iter()
        .find(|p| p.is_active)
        .map(|p| p.id.clone())
        .context("no active player left to call the final round")?;

    let response = room
        .request(|response| RoomMessage::CallFinalRound {
            player_id: caller.clone(),
            response,
        })
        .await
        .map_err(anyhow::Error::msg)?;
    match response.error_message() {
        // the round may have ended between the view and the call
        Some(message) => log::debug!("Room {}: final round refused: {}", room.room_id(), message),
        None => log::info!("Room {}: {} called the final round", room.room_id(), caller),
    }
    Ok(())
}

/// Wait for the next `GameEnded` event, skipping state broadcasts
async fn next_game_end(
    events: &mut mpsc::UnboundedReceiver<RoomEvent>,
) -> Option<(Vec<WinnerRecord>, PotMetadata)> {
    while let Some(event) = events.recv().await {
        match event {
            RoomEvent::GameEnded { winners, pot, .. } => return Some((winners, pot)),
            RoomEvent::ActionError { message, .. } => log::debug!("Action refused: {}", message),
            RoomEvent::LeaveRoom { player_id } => {
                log::warn!("{} missed too many actions", player_id)
            }
            _ => {}
        }
    }
    None
}

/// Upper bound on how long one room may take overall
pub fn room_budget(config: &SimConfig) -> Duration {
    (config.final_round_after + config.round_timeout) * config.rounds
}
