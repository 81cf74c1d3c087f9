//! Illegal-action errors reported through the room callbacks.

use serde_json::{Value, json};
use thiserror::Error;

use super::entities::{CardId, DrawSource, Phase, PlayerId};

/// Reasons an engine operation was rejected.
///
/// The engine never propagates these to its caller; each one is turned into
/// an `on_action_error` notification and the operation returns `false`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("Game has already ended")]
    GameEnded,

    #[error("Action not allowed during {phase}")]
    WrongPhase { phase: Phase },

    #[error("Player {player_id} not found")]
    UnknownPlayer { player_id: PlayerId },

    #[error("Player {player_id} is no longer active")]
    InactivePlayer { player_id: PlayerId },

    #[error("It is not {player_id}'s turn")]
    NotYourTurn { player_id: PlayerId },

    #[error("Player {player_id} has already drawn this turn")]
    AlreadyDrawn { player_id: PlayerId },

    #[error("Player {player_id} must draw before playing")]
    MustDrawFirst { player_id: PlayerId },

    #[error("No cards left to draw from the {pile}")]
    EmptyPile { pile: DrawSource },

    #[error("No penalty card left for {player_id}; both piles are empty")]
    PenaltyUnavailable { player_id: PlayerId },

    #[error("Card {card_id} is not in {player_id}'s hand")]
    CardNotInHand { player_id: PlayerId, card_id: CardId },

    #[error("Collection cards cannot be played")]
    CollectionCard { card_id: CardId },

    #[error("Unknown card {card_id}")]
    UnknownCard { card_id: CardId },

    #[error("Collection mode is not enabled")]
    CollectionDisabled,

    #[error("Collection is already complete")]
    CollectionFull,

    #[error("Top discard card does not match the collection rank")]
    CollectionMismatch,

    #[error("Top discard card has already been collected")]
    AlreadyCollected,

    #[error("No special card is waiting to be resolved")]
    NoSpecialPending,

    #[error("The pending special card does not grant this power")]
    WrongPower,

    #[error("Only {owner} may use this special card")]
    NotSpecialOwner { owner: PlayerId },

    #[error("A final round has already been called")]
    FinalRoundAlreadyCalled,

    #[error("Not enough players to start ({have}/{need})")]
    NotEnoughPlayers { have: usize, need: usize },
}

impl ActionError {
    /// Structured payload delivered next to the message.
    #[must_use]
    pub fn data(&self) -> Value {
        match self {
            Self::WrongPhase { phase } => json!({ "phase": phase }),
            Self::UnknownPlayer { player_id }
            | Self::InactivePlayer { player_id }
            | Self::NotYourTurn { player_id }
            | Self::AlreadyDrawn { player_id }
            | Self::MustDrawFirst { player_id }
            | Self::PenaltyUnavailable { player_id } => json!({ "player_id": player_id }),
            Self::EmptyPile { pile } => json!({ "pile": pile }),
            Self::CardNotInHand { player_id, card_id } => {
                json!({ "player_id": player_id, "card_id": card_id })
            }
            Self::CollectionCard { card_id } | Self::UnknownCard { card_id } => {
                json!({ "card_id": card_id })
            }
            Self::NotSpecialOwner { owner } => json!({ "owner": owner }),
            Self::NotEnoughPlayers { have, need } => json!({ "have": have, "need": need }),
            _ => Value::Null,
        }
    }
}
