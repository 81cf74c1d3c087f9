//! Room manager for spawning and tracking room actors.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    actor::{RoomActor, RoomHandle},
    callbacks::RoomCallbacks,
    config::RoomConfig,
    messages::{RoomMessage, RoomResponse},
    store::GameStore,
};
use crate::{
    bot::rules::RuleTable,
    game::entities::{Phase, RoomId},
};

/// Room metadata for discovery
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RoomMetadata {
    pub id: RoomId,
    pub name: String,
    pub player_count: usize,
    pub max_players: usize,
    pub phase: Phase,
    pub collection_mode: bool,
    pub practice_mode: bool,
    pub round_number: u32,
}

/// Room manager for managing multiple room instances
pub struct RoomManager {
    /// Game state for every live room
    store: GameStore,

    /// Active room handles
    rooms: Arc<RwLock<HashMap<RoomId, RoomHandle>>>,

    /// Notifier shared by every room
    callbacks: Arc<dyn RoomCallbacks>,

    /// Computer strategy handed to new rooms
    rules: Option<RuleTable>,
}

impl RoomManager {
    pub fn new(callbacks: Arc<dyn RoomCallbacks>, rules: Option<RuleTable>) -> Self {
        Self {
            store: GameStore::new(),
            rooms: Arc::new(RwLock::new(HashMap::new())),
            callbacks,
            rules,
        }
    }

    #[must_use]
    pub fn store(&self) -> &GameStore {
        &self.store
    }

    /// Create a room and spawn its actor
    ///
    /// # Returns
    ///
    /// * `Result<RoomId, String>` - New room id, or the validation error
    pub async fn create_room(&self, config: RoomConfig) -> Result<RoomId, String> {
        config.validate()?;

        let room_id = format!("room_{}", Uuid::new_v4().simple());
        self.store
            .create(&room_id)
            .await
            .map_err(|e| e.to_string())?;

        let (actor, handle) = RoomActor::new(
            room_id.clone(),
            config,
            self.store.clone(),
            self.callbacks.clone(),
            self.rules.clone(),
        );

        let mut rooms = self.rooms.write().await;
        rooms.insert(room_id.clone(), handle);
        drop(rooms);

        tokio::spawn(async move {
            actor.run().await;
        });

        log::info!("Created and spawned room {}", room_id);
        Ok(room_id)
    }

    pub async fn get_room(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(room_id).cloned()
    }

    pub async fn list_rooms(&self) -> Vec<RoomMetadata> {
        let rooms = self.rooms.read().await;
        let mut metadata_list = Vec::with_capacity(rooms.len());

        for (room_id, handle) in rooms.iter() {
            let Some(game) = self.store.get(room_id).await else {
                continue;
            };
            let config = handle.config();
            metadata_list.push(RoomMetadata {
                id: room_id.clone(),
                name: config.name.clone(),
                player_count: game.players.len(),
                max_players: config.max_players,
                phase: game.phase,
                collection_mode: config.collection_mode,
                practice_mode: config.practice_mode,
                round_number: game.round_number,
            });
        }

        metadata_list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        metadata_list
    }

    /// Stop a room's actor and drop its state
    pub async fn close_room(&self, room_id: &str) -> Result<(), String> {
        let handle = self.rooms.write().await.remove(room_id);
        let Some(handle) = handle else {
            return Err(format!("Room {room_id} not found"));
        };

        match handle
            .request(|response| RoomMessage::Close { response })
            .await
        {
            Ok(RoomResponse::Success) => {}
            Ok(other) => log::warn!("Room {}: close answered {:?}", room_id, other),
            // actor already gone; make sure the state goes too
            Err(e) => {
                log::warn!("Room {}: {}", room_id, e);
                self.store.remove(room_id).await;
            }
        }

        log::info!("Closed room {}", room_id);
        Ok(())
    }

    pub async fn active_room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
