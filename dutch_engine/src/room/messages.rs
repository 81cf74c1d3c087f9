//! Room actor message types.

use tokio::sync::oneshot;

use super::config::Difficulty;
use crate::game::{
    entities::{CardId, DrawSource, PlayerId},
    views::GameView,
};

/// Messages that can be sent to a RoomActor
#[derive(Debug)]
pub enum RoomMessage {
    /// Seat a human player
    Join {
        player_id: PlayerId,
        name: String,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Seat a computer player; the room's difficulty applies when `None`
    AddComputer {
        name: String,
        difficulty: Option<Difficulty>,
        response: oneshot::Sender<RoomResponse>,
    },

    Leave {
        player_id: PlayerId,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Deal (if needed) and open the first turn
    StartGame {
        response: oneshot::Sender<RoomResponse>,
    },

    Draw {
        player_id: PlayerId,
        source: DrawSource,
        response: oneshot::Sender<RoomResponse>,
    },

    Play {
        player_id: PlayerId,
        card_id: CardId,
        response: oneshot::Sender<RoomResponse>,
    },

    SameRank {
        player_id: PlayerId,
        card_id: CardId,
        response: oneshot::Sender<RoomResponse>,
    },

    Collect {
        player_id: PlayerId,
        response: oneshot::Sender<RoomResponse>,
    },

    JackSwap {
        player_id: PlayerId,
        first_card_id: CardId,
        first_player_id: PlayerId,
        second_card_id: CardId,
        second_player_id: PlayerId,
        response: oneshot::Sender<RoomResponse>,
    },

    QueenPeek {
        player_id: PlayerId,
        card_id: CardId,
        target_player_id: PlayerId,
        response: oneshot::Sender<RoomResponse>,
    },

    CallFinalRound {
        player_id: PlayerId,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Close the same-rank window without waiting for its timer
    CompleteSameRankWindow {
        response: oneshot::Sender<RoomResponse>,
    },

    /// Finish the active Jack or Queen window without waiting for its timer
    CompleteSpecialCard {
        response: oneshot::Sender<RoomResponse>,
    },

    /// Public view, or the owner view when `player_id` is set
    GetView {
        player_id: Option<PlayerId>,
        response: oneshot::Sender<Option<GameView>>,
    },

    Close {
        response: oneshot::Sender<RoomResponse>,
    },
}

/// Response from room operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomResponse {
    /// Operation succeeded
    Success,

    /// The engine refused the action; the reason was also sent to the room
    Rejected(String),

    /// The room could not process the request
    Error(String),
}

impl RoomResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, RoomResponse::Success)
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            RoomResponse::Success => None,
            RoomResponse::Rejected(msg) | RoomResponse::Error(msg) => Some(msg),
        }
    }
}
