//! Room-keyed game repository.

use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::game::entities::{Game, MAX_PLAYERS, Phase, Player, PlayerId, RoomId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    #[error("Room {0} already exists")]
    RoomExists(RoomId),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
}

/// Partial change to a room's seating and modes.
#[derive(Debug, Clone, Default)]
pub struct GameUpdate {
    pub add_players: Vec<Player>,
    pub remove_players: Vec<PlayerId>,
    pub collection_mode: Option<bool>,
    pub practice_mode: Option<bool>,
}

impl GameUpdate {
    #[must_use]
    pub fn add_player(player: Player) -> Self {
        Self {
            add_players: vec![player],
            ..Default::default()
        }
    }

    /// Seating only changes between rounds; ids stay unique and the table
    /// never grows past [`MAX_PLAYERS`].
    pub fn validate(&self, game: &Game) -> Result<(), StoreError> {
        let touches_seats = !self.add_players.is_empty() || !self.remove_players.is_empty();
        let touches_modes = self.collection_mode.is_some() || self.practice_mode.is_some();
        if (touches_seats || touches_modes)
            && !matches!(game.phase, Phase::WaitingForPlayers | Phase::GameEnded)
        {
            return Err(StoreError::InvalidUpdate(format!(
                "cannot change seats or modes during {}",
                game.phase
            )));
        }

        for player_id in &self.remove_players {
            if game.player(player_id).is_none() {
                return Err(StoreError::InvalidUpdate(format!(
                    "player {player_id} is not seated"
                )));
            }
        }

        let mut seated: Vec<&str> = game
            .players
            .iter()
            .map(|p| p.id.as_str())
            .filter(|id| !self.remove_players.iter().any(|r| r == id))
            .collect();
        for player in &self.add_players {
            if seated.contains(&player.id.as_str()) {
                return Err(StoreError::InvalidUpdate(format!(
                    "player {} is already seated",
                    player.id
                )));
            }
            seated.push(&player.id);
        }
        if seated.len() > MAX_PLAYERS {
            return Err(StoreError::InvalidUpdate(format!(
                "at most {MAX_PLAYERS} players per room"
            )));
        }
        Ok(())
    }

    fn apply(self, game: &mut Game) {
        game.players
            .retain(|p| !self.remove_players.contains(&p.id));
        game.players.extend(self.add_players);
        if let Some(mode) = self.collection_mode {
            game.collection_mode = mode;
        }
        if let Some(mode) = self.practice_mode {
            game.practice_mode = mode;
        }
    }
}

/// One room's game, locked independently of every other room.
type GameSlot = Arc<Mutex<Game>>;

/// Shared map of every live room's game.
///
/// The map lock is only held to find a room; mutation locks that room alone.
#[derive(Clone, Default)]
pub struct GameStore {
    games: Arc<RwLock<HashMap<RoomId, GameSlot>>>,
}

impl GameStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, room_id: &str) -> Option<GameSlot> {
        self.games.read().await.get(room_id).cloned()
    }

    pub async fn create(&self, room_id: &str) -> Result<(), StoreError> {
        let mut games = self.games.write().await;
        if games.contains_key(room_id) {
            return Err(StoreError::RoomExists(room_id.to_string()));
        }
        games.insert(
            room_id.to_string(),
            Arc::new(Mutex::new(Game::new(room_id))),
        );
        Ok(())
    }

    /// Snapshot of a room's game.
    pub async fn get(&self, room_id: &str) -> Option<Game> {
        let slot = self.slot(room_id).await?;
        let game = slot.lock().await;
        Some(game.clone())
    }

    pub async fn replace(&self, game: Game) {
        match self.slot(&game.room_id).await {
            Some(slot) => *slot.lock().await = game,
            None => {
                let room_id = game.room_id.clone();
                self.games
                    .write()
                    .await
                    .insert(room_id, Arc::new(Mutex::new(game)));
            }
        }
    }

    pub async fn merge(&self, room_id: &str, update: GameUpdate) -> Result<(), StoreError> {
        let slot = self
            .slot(room_id)
            .await
            .ok_or_else(|| StoreError::RoomNotFound(room_id.to_string()))?;
        let mut game = slot.lock().await;
        update.validate(&game)?;
        update.apply(&mut game);
        Ok(())
    }

    pub async fn remove(&self, room_id: &str) -> Option<Game> {
        let slot = self.games.write().await.remove(room_id)?;
        let game = slot.lock().await;
        Some(game.clone())
    }

    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.games.read().await.keys().cloned().collect()
    }

    /// Exclusive access to one room's game for the duration of the guard.
    /// Other rooms stay free.
    pub async fn write(&self, room_id: &str) -> Option<OwnedMutexGuard<Game>> {
        let slot = self.slot(room_id).await?;
        Some(slot.lock_owned().await)
    }
}
