//! Room actor: the single owner of a room's game while it is live.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::{
    callbacks::RoomCallbacks,
    config::{Difficulty, RoomConfig},
    messages::{RoomMessage, RoomResponse},
    store::{GameStore, GameUpdate},
};
use crate::{
    bot::rules::RuleTable,
    game::{
        engine::RoundEngine,
        entities::{DrawSource, Game, Phase, Player, PlayerId, RoomId},
        timers::{FiredTimer, Scheduler},
        views::{self, GameView},
    },
};

/// Room actor handle for sending messages
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    room_id: RoomId,
    config: Arc<RoomConfig>,
}

impl RoomHandle {
    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    #[must_use]
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Send a message to the room
    pub async fn send(&self, message: RoomMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .await
            .map_err(|_| "Room is closed".to_string())
    }

    /// Send a message built around a fresh response channel and wait.
    pub async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomMessage,
    ) -> Result<T, String> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await
            .map_err(|_| "Room dropped the request".to_string())
    }

    pub async fn join(&self, player_id: &str, name: &str) -> Result<RoomResponse, String> {
        self.request(|response| RoomMessage::Join {
            player_id: player_id.to_string(),
            name: name.to_string(),
            response,
        })
        .await
    }

    pub async fn add_computer(
        &self,
        name: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<RoomResponse, String> {
        self.request(|response| RoomMessage::AddComputer {
            name: name.to_string(),
            difficulty,
            response,
        })
        .await
    }

    pub async fn leave(&self, player_id: &str) -> Result<RoomResponse, String> {
        self.request(|response| RoomMessage::Leave {
            player_id: player_id.to_string(),
            response,
        })
        .await
    }

    pub async fn start_game(&self) -> Result<RoomResponse, String> {
        self.request(|response| RoomMessage::StartGame { response })
            .await
    }

    pub async fn draw(&self, player_id: &str, source: DrawSource) -> Result<RoomResponse, String> {
        self.request(|response| RoomMessage::Draw {
            player_id: player_id.to_string(),
            source,
            response,
        })
        .await
    }

    pub async fn play(&self, player_id: &str, card_id: &str) -> Result<RoomResponse, String> {
        self.request(|response| RoomMessage::Play {
            player_id: player_id.to_string(),
            card_id: card_id.to_string(),
            response,
        })
        .await
    }

    pub async fn view(&self, player_id: Option<&str>) -> Result<Option<GameView>, String> {
        self.request(|response| RoomMessage::GetView {
            player_id: player_id.map(str::to_string),
            response,
        })
        .await
    }
}

/// Room actor owning one room's engine and timers
pub struct RoomActor {
    id: RoomId,
    config: Arc<RoomConfig>,
    store: GameStore,
    engine: RoundEngine,
    inbox: mpsc::Receiver<RoomMessage>,
    timers: mpsc::UnboundedReceiver<FiredTimer>,
    is_closed: bool,
}

impl RoomActor {
    /// Create a room actor. The room's game must already exist in `store`.
    ///
    /// # Returns
    ///
    /// * `(RoomActor, RoomHandle)` - Actor and handle for sending messages
    pub fn new(
        id: impl Into<RoomId>,
        config: RoomConfig,
        store: GameStore,
        callbacks: Arc<dyn RoomCallbacks>,
        rules: Option<RuleTable>,
    ) -> (Self, RoomHandle) {
        let id = id.into();
        let (sender, inbox) = mpsc::channel(100);
        let (timer_tx, timers) = mpsc::unbounded_channel();

        let mut engine =
            RoundEngine::new(id.clone(), config.clone(), callbacks, Scheduler::tokio(timer_tx));
        engine.set_rules(rules);

        let config = Arc::new(config);
        let actor = Self {
            id: id.clone(),
            config: config.clone(),
            store,
            engine,
            inbox,
            timers,
            is_closed: false,
        };
        let handle = RoomHandle {
            sender,
            room_id: id,
            config,
        };
        (actor, handle)
    }

    /// Run the room actor event loop
    pub async fn run(mut self) {
        log::info!("Room {} '{}' starting", self.id, self.config.name);

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        // every handle is gone
                        None => self.close().await,
                    }
                }

                Some(fired) = self.timers.recv() => {
                    if let Some(mut game) = self.store.write(&self.id).await {
                        self.engine.handle_timer(&mut *game, &fired);
                    }
                }
            }

            if self.is_closed {
                break;
            }
        }

        log::info!("Room {} '{}' closed", self.id, self.config.name);
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join {
                player_id,
                name,
                response,
            } => {
                let result = self.handle_join(Player::human(player_id, name)).await;
                let _ = response.send(result);
            }

            RoomMessage::AddComputer {
                name,
                difficulty,
                response,
            } => {
                let difficulty = difficulty.unwrap_or(self.config.computer_difficulty);
                let player_id = format!("computer_{}", Uuid::new_v4().simple());
                let result = self
                    .handle_join(Player::computer(player_id, name, difficulty))
                    .await;
                let _ = response.send(result);
            }

            RoomMessage::Leave {
                player_id,
                response,
            } => {
                let result = self.handle_leave(player_id).await;
                let _ = response.send(result);
            }

            RoomMessage::StartGame { response } => {
                let result = self.apply(Self::start).await;
                let _ = response.send(result);
            }

            RoomMessage::Draw {
                player_id,
                source,
                response,
            } => {
                let result = self
                    .apply(|engine, game| engine.draw_card(game, &player_id, source))
                    .await;
                let _ = response.send(result);
            }

            RoomMessage::Play {
                player_id,
                card_id,
                response,
            } => {
                let result = self
                    .apply(|engine, game| engine.play_card(game, &player_id, &card_id))
                    .await;
                let _ = response.send(result);
            }

            RoomMessage::SameRank {
                player_id,
                card_id,
                response,
            } => {
                let result = self
                    .apply(|engine, game| engine.same_rank_play(game, &player_id, &card_id))
                    .await;
                let _ = response.send(result);
            }

            RoomMessage::Collect {
                player_id,
                response,
            } => {
                let result = self
                    .apply(|engine, game| engine.collect_from_discard(game, &player_id))
                    .await;
                let _ = response.send(result);
            }

            RoomMessage::JackSwap {
                player_id,
                first_card_id,
                first_player_id,
                second_card_id,
                second_player_id,
                response,
            } => {
                let result = self
                    .apply(|engine, game| {
                        engine.jack_swap(
                            game,
                            &player_id,
                            &first_card_id,
                            &first_player_id,
                            &second_card_id,
                            &second_player_id,
                        )
                    })
                    .await;
                let _ = response.send(result);
            }

            RoomMessage::QueenPeek {
                player_id,
                card_id,
                target_player_id,
                response,
            } => {
                let result = self
                    .apply(|engine, game| {
                        engine.queen_peek(game, &player_id, &card_id, &target_player_id)
                    })
                    .await;
                let _ = response.send(result);
            }

            RoomMessage::CallFinalRound {
                player_id,
                response,
            } => {
                let result = self
                    .apply(|engine, game| engine.call_final_round(game, &player_id))
                    .await;
                let _ = response.send(result);
            }

            RoomMessage::CompleteSameRankWindow { response } => {
                let result = self
                    .apply(|engine, game| engine.complete_same_rank_window(game))
                    .await;
                let _ = response.send(result);
            }

            RoomMessage::CompleteSpecialCard { response } => {
                let result = self
                    .apply(|engine, game| engine.complete_special_card(game, None))
                    .await;
                let _ = response.send(result);
            }

            RoomMessage::GetView {
                player_id,
                response,
            } => {
                let view = self.store.get(&self.id).await.map(|game| match &player_id {
                    Some(player_id) => views::player_view(&game, player_id),
                    None => views::public_view(&game),
                });
                let _ = response.send(view);
            }

            RoomMessage::Close { response } => {
                self.close().await;
                let _ = response.send(RoomResponse::Success);
            }
        }
    }

    /// Run one engine operation against the room's game.
    async fn apply<F>(&mut self, operation: F) -> RoomResponse
    where
        F: FnOnce(&mut RoundEngine, &mut Game) -> bool,
    {
        let Some(mut game) = self.store.write(&self.id).await else {
            log::error!("Room {}: game state is missing", self.id);
            return RoomResponse::Error("Room state is missing".to_string());
        };
        if operation(&mut self.engine, &mut *game) {
            RoomResponse::Success
        } else {
            let reason = self
                .engine
                .last_error()
                .map(ToString::to_string)
                .unwrap_or_else(|| "Action could not be applied".to_string());
            RoomResponse::Rejected(reason)
        }
    }

    /// Deal a fresh round after a finished one, then open the first turn.
    fn start(engine: &mut RoundEngine, game: &mut Game) -> bool {
        if game.phase == Phase::GameEnded && !engine.deal(game) {
            return false;
        }
        engine.start_round(game)
    }

    async fn handle_join(&mut self, player: Player) -> RoomResponse {
        let Some(game) = self.store.get(&self.id).await else {
            return RoomResponse::Error("Room state is missing".to_string());
        };
        if game.players.len() >= self.config.max_players {
            return RoomResponse::Rejected("Room is full".to_string());
        }

        let player_id = player.id.clone();
        if let Err(e) = self
            .store
            .merge(&self.id, GameUpdate::add_player(player))
            .await
        {
            return RoomResponse::Rejected(e.to_string());
        }
        log::info!("Room {}: {} joined", self.id, player_id);
        self.notify().await;
        RoomResponse::Success
    }

    async fn handle_leave(&mut self, player_id: PlayerId) -> RoomResponse {
        let Some(game) = self.store.get(&self.id).await else {
            return RoomResponse::Error("Room state is missing".to_string());
        };
        if game.player(&player_id).is_none() {
            return RoomResponse::Rejected(format!("Player {player_id} is not in this room"));
        }

        // between rounds the seat is simply freed
        if matches!(game.phase, Phase::WaitingForPlayers | Phase::GameEnded) {
            let update = GameUpdate {
                remove_players: vec![player_id.clone()],
                ..Default::default()
            };
            return match self.store.merge(&self.id, update).await {
                Ok(()) => {
                    log::info!("Room {}: {} left", self.id, player_id);
                    self.notify().await;
                    RoomResponse::Success
                }
                Err(e) => RoomResponse::Rejected(e.to_string()),
            };
        }

        self.apply(|engine, game| engine.remove_player(game, &player_id))
            .await
    }

    async fn notify(&self) {
        if let Some(game) = self.store.get(&self.id).await {
            self.engine.broadcast(&game);
        }
    }

    async fn close(&mut self) {
        self.engine.cancel_all_timers();
        self.store.remove(&self.id).await;
        self.is_closed = true;
    }

    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.id
    }
}
