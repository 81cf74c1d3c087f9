//! Sanitized snapshots of a room for delivery to clients.
//!
//! Hands and the draw pile only ever hold card identifiers, so every view
//! starts from identifier-only cards. True values are filled in for exactly
//! two audiences: the owner of a drawn card or remembered card, and a player
//! resolving a Queen peek.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    directory,
    entities::{
        Card, CardId, Game, HIDDEN, KnownCards, Phase, Player, PlayerId, PlayerStatus, Rank,
        RoomId, SpecialCardRecord, TurnEvent, WinnerRecord,
    },
};

/// A card as it appears on the wire.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CardView {
    pub card_id: CardId,
    pub rank: String,
    pub suit: String,
    pub points: u8,
}

impl CardView {
    #[must_use]
    pub fn hidden(card_id: impl Into<CardId>) -> Self {
        Self {
            card_id: card_id.into(),
            rank: HIDDEN.to_string(),
            suit: HIDDEN.to_string(),
            points: 0,
        }
    }

    #[must_use]
    pub fn revealed(card: &Card) -> Self {
        Self {
            card_id: card.card_id.clone(),
            rank: card.rank.as_str().to_string(),
            suit: card.suit.as_str().to_string(),
            points: card.points,
        }
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.rank == HIDDEN && self.suit == HIDDEN && self.points == 0
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub is_human: bool,
    pub is_active: bool,
    pub status: PlayerStatus,
    pub hand: Vec<Option<CardView>>,
    pub card_count: usize,
    pub drawn_card: Option<CardView>,
    pub collection_rank: Option<Rank>,
    /// Collected cards lie face up.
    pub collection_cards: Vec<CardView>,
    /// Only present in the owner's own view.
    pub known_cards: Option<KnownCards>,
}

// Shared pieces are built once per broadcast and reused across viewers.
mod arc_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::sync::Arc;

    pub fn serialize<S, T>(arc: &Arc<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        arc.as_ref().serialize(serializer)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Arc<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        T::deserialize(deserializer).map(Arc::new)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GameView {
    pub room_id: RoomId,
    pub phase: Phase,
    pub current_player: Option<PlayerId>,
    pub draw_pile: Vec<CardView>,
    #[serde(with = "arc_serde")]
    pub discard_pile: Arc<Vec<CardView>>,
    pub players: Vec<PlayerView>,
    #[serde(with = "arc_serde")]
    pub special_queue: Arc<Vec<SpecialCardRecord>>,
    #[serde(with = "arc_serde")]
    pub winners: Arc<Vec<WinnerRecord>>,
    pub final_round_caller: Option<PlayerId>,
    #[serde(with = "arc_serde")]
    pub turn_events: Arc<Vec<TurnEvent>>,
    pub collection_mode: bool,
    pub practice_mode: bool,
    pub round_number: u32,
}

impl GameView {
    #[must_use]
    pub fn player(&self, player_id: &str) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// Every card in the view, hands, drawn slots and piles included.
    pub fn cards(&self) -> impl Iterator<Item = &CardView> {
        self.players
            .iter()
            .flat_map(|p| {
                p.hand
                    .iter()
                    .flatten()
                    .chain(p.drawn_card.iter())
                    .chain(p.collection_cards.iter())
            })
            .chain(self.draw_pile.iter())
            .chain(self.discard_pile.iter())
    }

    /// Reveal `card` wherever it sits in a hand or drawn slot.
    pub fn reveal(&mut self, card: &Card) {
        let revealed = CardView::revealed(card);
        for player in &mut self.players {
            for slot in player.hand.iter_mut().flatten() {
                if slot.card_id == card.card_id {
                    *slot = revealed.clone();
                }
            }
            if let Some(drawn) = player.drawn_card.as_mut()
                && drawn.card_id == card.card_id
            {
                *drawn = revealed.clone();
            }
        }
    }
}

fn hidden_player(player: &Player) -> PlayerView {
    PlayerView {
        id: player.id.clone(),
        name: player.name.clone(),
        is_human: player.is_human,
        is_active: player.is_active,
        status: player.status,
        hand: player
            .hand
            .iter()
            .map(|slot| slot.as_ref().map(CardView::hidden))
            .collect(),
        card_count: player.card_count(),
        drawn_card: player
            .drawn_card
            .as_ref()
            .map(|card| CardView::hidden(card.card_id.clone())),
        collection_rank: player.collection_rank,
        collection_cards: player
            .collection_cards
            .iter()
            .map(CardView::revealed)
            .collect(),
        known_cards: None,
    }
}

/// Identifier-only snapshot safe to broadcast to every seat.
#[must_use]
pub fn public_view(game: &Game) -> GameView {
    GameView {
        room_id: game.room_id.clone(),
        phase: game.phase,
        current_player: game.current_player.clone(),
        draw_pile: game.draw_pile.iter().map(CardView::hidden).collect(),
        discard_pile: Arc::new(game.discard_pile.iter().map(CardView::revealed).collect()),
        players: game.players.iter().map(hidden_player).collect(),
        special_queue: Arc::new(game.special_queue.iter().cloned().collect()),
        winners: Arc::new(game.winners.clone()),
        final_round_caller: game.final_round_caller.clone(),
        turn_events: Arc::new(game.turn_events.clone()),
        collection_mode: game.collection_mode,
        practice_mode: game.practice_mode,
        round_number: game.round_number,
    }
}

/// Snapshot for `viewer`: the public view plus the viewer's drawn card,
/// the own-hand cards they remember, and their memory map.
#[must_use]
pub fn player_view(game: &Game, viewer: &str) -> GameView {
    let mut view = public_view(game);
    let Some(player) = game.player(viewer) else {
        return view;
    };
    let Some(own) = view.players.iter_mut().find(|p| p.id == viewer) else {
        return view;
    };

    if let Some(drawn) = &player.drawn_card {
        own.drawn_card = Some(CardView::revealed(drawn));
    }
    if let Some(remembered) = player.memory_of(viewer) {
        for slot in own.hand.iter_mut().flatten() {
            if let Some(card) = remembered.get(&slot.card_id) {
                *slot = CardView::revealed(card);
            }
        }
    }
    own.known_cards = Some(player.known_cards.clone());
    view
}

/// Targeted snapshot for a Queen peek: the peeker's own view with the
/// peeked card revealed.
#[must_use]
pub fn peek_view(game: &Game, peeker: &str, card_id: &str) -> GameView {
    let mut view = player_view(game, peeker);
    if let Some(card) = directory::card_by_id(game, card_id) {
        view.reveal(card);
    } else {
        log::error!("Room {}: peeked card {} is not in the deck", game.room_id, card_id);
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Player, Suit, build_deck};

    fn dealt_game() -> Game {
        let mut game = Game::new("room");
        game.original_deck = build_deck(true);
        game.players.push(Player::human("p1", "Alice"));
        game.players.push(Player::human("p2", "Bob"));

        let ids: Vec<CardId> = game.original_deck.iter().map(|c| c.card_id.clone()).collect();
        game.players[0].hand = ids[0..4].iter().cloned().map(Some).collect();
        game.players[1].hand = ids[4..8].iter().cloned().map(Some).collect();
        game.discard_pile.push(game.original_deck[8].clone());
        game.draw_pile = ids[9..].to_vec();
        game.phase = Phase::PlayerTurn;
        game
    }

    #[test]
    fn test_public_view_hides_every_hand_card() {
        let mut game = dealt_game();
        let drawn = game.original_deck[20].clone();
        game.players[0].drawn_card = Some(drawn.clone());
        let first = game.original_deck[0].clone();
        game.players[0].remember("p1", first);

        let view = public_view(&game);
        for player in &view.players {
            assert!(player.hand.iter().flatten().all(CardView::is_hidden));
            assert!(player.known_cards.is_none());
        }
        assert!(view.players[0].drawn_card.as_ref().unwrap().is_hidden());
        assert!(view.draw_pile.iter().all(CardView::is_hidden));
        assert!(!view.discard_pile[0].is_hidden());
    }

    #[test]
    fn test_owner_sees_drawn_card_and_remembered_cards() {
        let mut game = dealt_game();
        let drawn = game.original_deck[20].clone();
        game.players[0].drawn_card = Some(drawn.clone());
        let first = game.original_deck[0].clone();
        game.players[0].remember("p1", first.clone());

        let view = player_view(&game, "p1");
        let own = view.player("p1").unwrap();
        assert_eq!(own.drawn_card, Some(CardView::revealed(&drawn)));
        assert_eq!(own.hand[0], Some(CardView::revealed(&first)));
        assert!(own.hand[1].as_ref().unwrap().is_hidden());
        assert!(own.known_cards.is_some());

        let other = player_view(&game, "p2");
        let alice = other.player("p1").unwrap();
        assert!(alice.drawn_card.as_ref().unwrap().is_hidden());
        assert!(alice.hand.iter().flatten().all(CardView::is_hidden));
    }

    #[test]
    fn test_peek_view_reveals_only_target_card() {
        let game = dealt_game();
        let target = game.original_deck[5].clone();

        let view = peek_view(&game, "p1", &target.card_id);
        let revealed: Vec<_> = view.cards().filter(|c| !c.is_hidden()).collect();
        // the peeked card plus the face-up discard
        assert_eq!(revealed.len(), 2);
        assert!(revealed.iter().any(|c| c.card_id == target.card_id));
    }

    #[test]
    fn test_hidden_card_wire_form() {
        let json = serde_json::to_value(CardView::hidden("card_1")).unwrap();
        assert_eq!(json["rank"], "?");
        assert_eq!(json["suit"], "?");
        assert_eq!(json["points"], 0);

        let card = Card::new("card_2", Rank::Queen, Suit::Hearts);
        let json = serde_json::to_value(CardView::revealed(&card)).unwrap();
        assert_eq!(json["rank"], "queen");
        assert_eq!(json["suit"], "hearts");
        assert_eq!(json["points"], 10);
    }
}
