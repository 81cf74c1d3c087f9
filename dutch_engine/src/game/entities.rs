use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
};
use uuid::Uuid;

use crate::room::config::Difficulty;

pub type CardId = String;
pub type PlayerId = String;
pub type RoomId = String;

/// Cards dealt to each player. Hand slots below this index are blanked
/// instead of removed so client positions stay stable.
pub const HAND_SIZE: usize = 4;

/// Collected cards of one rank needed for a four-of-a-kind win.
pub const MAX_COLLECTION_CARDS: usize = 4;

/// Own cards each player memorises during the initial peek.
pub const INITIAL_PEEK_COUNT: usize = 2;

/// Most seats a room can hold.
pub const MAX_PLAYERS: usize = 8;

/// Placeholder rank/suit used for identifier-only cards.
pub const HIDDEN: &str = "?";

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
    Joker,
}

impl Suit {
    pub const STANDARD: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hearts => "hearts",
            Self::Diamonds => "diamonds",
            Self::Clubs => "clubs",
            Self::Spades => "spades",
            Self::Joker => "joker",
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Clubs => "♣",
            Self::Spades => "♠",
            Self::Diamonds => "♦",
            Self::Hearts => "♥",
            Self::Joker => "★",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    #[serde(rename = "ace")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "jack")]
    Jack,
    #[serde(rename = "queen")]
    Queen,
    #[serde(rename = "king")]
    King,
    #[serde(rename = "joker")]
    Joker,
}

impl Rank {
    pub const STANDARD: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Point value: numeric ranks count face value, ace 1, court cards 10,
    /// joker 0.
    #[must_use]
    pub fn points(&self) -> u8 {
        match self {
            Self::Ace => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten => 10,
            Self::Jack | Self::Queen | Self::King => 10,
            Self::Joker => 0,
        }
    }

    #[must_use]
    pub fn power(&self) -> Option<SpecialPower> {
        match self {
            Self::Jack => Some(SpecialPower::JackSwap),
            Self::Queen => Some(SpecialPower::QueenPeek),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ace => "ace",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "jack",
            Self::Queen => "queen",
            Self::King => "king",
            Self::Joker => "joker",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Ace => "A",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
            Self::Joker => "JK",
            other => other.as_str(),
        };
        write!(f, "{repr}")
    }
}

/// Full card definition. Only the room's original deck, the discard pile,
/// drawn-card slots, collections and memories hold these; hands and the
/// draw pile hold identifiers.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Card {
    pub card_id: CardId,
    pub rank: Rank,
    pub suit: Suit,
    pub points: u8,
}

impl Card {
    #[must_use]
    pub fn new(card_id: impl Into<CardId>, rank: Rank, suit: Suit) -> Self {
        Self {
            card_id: card_id.into(),
            rank,
            suit,
            points: rank.points(),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = format!("{}{}", self.rank, self.suit);
        write!(f, "{repr:>4}")
    }
}

/// Build a full deck with fresh opaque identifiers.
#[must_use]
pub fn build_deck(include_jokers: bool) -> Vec<Card> {
    let mut cards = Vec::with_capacity(54);
    for suit in Suit::STANDARD {
        for rank in Rank::STANDARD {
            cards.push(Card::new(new_card_id(), rank, suit));
        }
    }
    if include_jokers {
        for _ in 0..2 {
            cards.push(Card::new(new_card_id(), Rank::Joker, Suit::Joker));
        }
    }
    cards
}

/// Identifiers carry no rank/suit information.
fn new_card_id() -> CardId {
    format!("card_{}", Uuid::new_v4().simple())
}

pub fn shuffle_cards<T, R: Rng + ?Sized>(cards: &mut [T], rng: &mut R) {
    cards.shuffle(rng);
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawSource {
    Deck,
    Discard,
}

impl fmt::Display for DrawSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deck => write!(f, "deck"),
            Self::Discard => write!(f, "discard"),
        }
    }
}

/// Room-level game phase. The serialized strings are part of the client
/// contract.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    WaitingForPlayers,
    PlayerTurn,
    SameRankWindow,
    SpecialPlayWindow,
    GameEnded,
}

impl Phase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingForPlayers => "waiting_for_players",
            Self::PlayerTurn => "player_turn",
            Self::SameRankWindow => "same_rank_window",
            Self::SpecialPlayWindow => "special_play_window",
            Self::GameEnded => "game_ended",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    #[default]
    Waiting,
    DrawingCard,
    PlayingCard,
    SameRankWindow,
    JackSwap,
    QueenPeek,
    Peeking,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::DrawingCard => "drawing_card",
            Self::PlayingCard => "playing_card",
            Self::SameRankWindow => "same_rank_window",
            Self::JackSwap => "jack_swap",
            Self::QueenPeek => "queen_peek",
            Self::Peeking => "peeking",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialPower {
    JackSwap,
    QueenPeek,
}

impl SpecialPower {
    #[must_use]
    pub fn status(&self) -> PlayerStatus {
        match self {
            Self::JackSwap => PlayerStatus::JackSwap,
            Self::QueenPeek => PlayerStatus::QueenPeek,
        }
    }
}

/// Turn-event action types. The serialized strings are part of the client
/// contract.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnAction {
    Draw,
    Play,
    Collect,
    Reposition,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TurnEvent {
    pub card_id: CardId,
    pub action_type: TurnAction,
}

impl TurnEvent {
    #[must_use]
    pub fn new(card_id: impl Into<CardId>, action_type: TurnAction) -> Self {
        Self {
            card_id: card_id.into(),
            action_type,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SpecialCardRecord {
    pub player_id: PlayerId,
    pub card_id: CardId,
    pub rank: Rank,
    pub suit: Suit,
    pub power: SpecialPower,
    pub played_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WinType {
    FourOfAKind,
    EmptyHand,
    LowestPoints,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WinnerRecord {
    pub player_id: PlayerId,
    pub player_name: String,
    pub win_type: WinType,
    pub points: Option<u32>,
    pub card_count: Option<usize>,
}

/// Per-player memory: owner id -> card id -> card.
pub type KnownCards = BTreeMap<PlayerId, BTreeMap<CardId, Card>>;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_human: bool,
    pub status: PlayerStatus,
    /// Ordered slots; `None` is a blank placeholder.
    pub hand: Vec<Option<CardId>>,
    /// Card drawn this turn, visible to the owner only.
    pub drawn_card: Option<Card>,
    pub collection_rank: Option<Rank>,
    pub collection_cards: Vec<Card>,
    pub known_cards: KnownCards,
    pub is_active: bool,
    pub difficulty: Difficulty,
    /// Set once the player has acted during the current turn.
    pub acted_this_turn: bool,
}

impl Player {
    #[must_use]
    pub fn human(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self::new(id.into(), name.into(), true, Difficulty::Expert)
    }

    #[must_use]
    pub fn computer(
        id: impl Into<PlayerId>,
        name: impl Into<String>,
        difficulty: Difficulty,
    ) -> Self {
        Self::new(id.into(), name.into(), false, difficulty)
    }

    fn new(id: PlayerId, name: String, is_human: bool, difficulty: Difficulty) -> Self {
        Self {
            id,
            name,
            is_human,
            status: PlayerStatus::Waiting,
            hand: Vec::with_capacity(HAND_SIZE + 2),
            drawn_card: None,
            collection_rank: None,
            collection_cards: Vec::new(),
            known_cards: BTreeMap::new(),
            is_active: true,
            difficulty,
            acted_this_turn: false,
        }
    }

    /// Clear everything dealt for a round.
    pub fn reset(&mut self) {
        self.status = PlayerStatus::Waiting;
        self.hand.clear();
        self.drawn_card = None;
        self.collection_rank = None;
        self.collection_cards.clear();
        self.known_cards.clear();
        self.acted_this_turn = false;
    }

    #[must_use]
    pub fn hand_position(&self, card_id: &str) -> Option<usize> {
        self.hand
            .iter()
            .position(|slot| slot.as_deref() == Some(card_id))
    }

    #[must_use]
    pub fn holds(&self, card_id: &str) -> bool {
        self.hand_position(card_id).is_some()
    }

    /// Cards in hand, blanks excluded.
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.hand.iter().flatten().count()
    }

    #[must_use]
    pub fn hand_ids(&self) -> Vec<CardId> {
        self.hand.iter().flatten().cloned().collect()
    }

    #[must_use]
    pub fn is_collection_card(&self, card_id: &str) -> bool {
        self.collection_cards.iter().any(|c| c.card_id == card_id)
    }

    /// Take the card out of slot `idx`: slots below [`HAND_SIZE`] become
    /// blank, later slots are removed.
    pub fn take_slot(&mut self, idx: usize) -> Option<CardId> {
        if idx >= self.hand.len() {
            return None;
        }
        if idx < HAND_SIZE {
            self.hand[idx].take()
        } else {
            self.hand.remove(idx)
        }
    }

    /// Cards this player remembers in `owner`'s hand.
    #[must_use]
    pub fn memory_of(&self, owner: &str) -> Option<&BTreeMap<CardId, Card>> {
        self.known_cards.get(owner)
    }

    pub fn remember(&mut self, owner: &str, card: Card) {
        self.known_cards
            .entry(owner.to_string())
            .or_default()
            .insert(card.card_id.clone(), card);
    }

    /// Drop any memory of `card_id`, whoever held it.
    pub fn forget(&mut self, card_id: &str) -> Option<(PlayerId, Card)> {
        let mut forgotten = None;
        for (owner, cards) in self.known_cards.iter_mut() {
            if let Some(card) = cards.remove(card_id) {
                forgotten = Some((owner.clone(), card));
                break;
            }
        }
        self.known_cards.retain(|_, cards| !cards.is_empty());
        forgotten
    }
}

/// Per-room game record.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Game {
    pub room_id: RoomId,
    pub phase: Phase,
    pub current_player: Option<PlayerId>,
    /// Identifier-only cards; the last element is the top.
    pub draw_pile: Vec<CardId>,
    /// Face-up cards; the last element is the top.
    pub discard_pile: Vec<Card>,
    /// Authoritative card definitions for this room.
    pub original_deck: Vec<Card>,
    /// Seating order.
    pub players: Vec<Player>,
    pub special_queue: VecDeque<SpecialCardRecord>,
    pub winners: Vec<WinnerRecord>,
    pub final_round_caller: Option<PlayerId>,
    pub final_round_completed: BTreeSet<PlayerId>,
    pub turn_events: Vec<TurnEvent>,
    pub collection_mode: bool,
    pub practice_mode: bool,
    pub round_number: u32,
    pub round_started_at: Option<DateTime<Utc>>,
}

impl Game {
    #[must_use]
    pub fn new(room_id: impl Into<RoomId>) -> Self {
        Self {
            room_id: room_id.into(),
            phase: Phase::WaitingForPlayers,
            current_player: None,
            draw_pile: Vec::new(),
            discard_pile: Vec::new(),
            original_deck: Vec::new(),
            players: Vec::with_capacity(MAX_PLAYERS),
            special_queue: VecDeque::new(),
            winners: Vec::new(),
            final_round_caller: None,
            final_round_completed: BTreeSet::new(),
            turn_events: Vec::new(),
            collection_mode: false,
            practice_mode: false,
            round_number: 0,
            round_started_at: None,
        }
    }

    #[must_use]
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    #[must_use]
    pub fn player_index(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    #[must_use]
    pub fn discard_top(&self) -> Option<&Card> {
        self.discard_pile.last()
    }

    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_active)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_players().count()
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.phase == Phase::GameEnded
    }

    #[must_use]
    pub fn is_current(&self, player_id: &str) -> bool {
        self.current_player.as_deref() == Some(player_id)
    }

    /// Which player holds `card_id` in hand, and at which slot.
    #[must_use]
    pub fn locate_in_hands(&self, card_id: &str) -> Option<(usize, usize)> {
        self.players
            .iter()
            .enumerate()
            .find_map(|(p, player)| player.hand_position(card_id).map(|slot| (p, slot)))
    }

    pub fn set_all_statuses(&mut self, status: PlayerStatus) {
        for player in self.players.iter_mut().filter(|p| p.is_active) {
            player.status = status;
        }
    }

    /// The next active player after `player_id` in seating order.
    #[must_use]
    pub fn next_active_after(&self, player_id: Option<&str>) -> Option<PlayerId> {
        let n = self.players.len();
        if n == 0 {
            return None;
        }
        let start = player_id
            .and_then(|id| self.player_index(id))
            .map(|idx| idx + 1)
            .unwrap_or(0);
        (0..n)
            .map(|offset| &self.players[(start + offset) % n])
            .find(|p| p.is_active)
            .map(|p| p.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_deck_has_unique_opaque_ids() {
        let deck = build_deck(true);
        assert_eq!(deck.len(), 54);

        let ids: HashSet<_> = deck.iter().map(|c| c.card_id.clone()).collect();
        assert_eq!(ids.len(), 54);

        for card in &deck {
            let suffix = card.card_id.strip_prefix("card_").unwrap();
            assert_eq!(suffix.len(), 32);
            assert!(suffix.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }

        // the same card in another deck gets a fresh id
        let again = build_deck(true);
        assert!(deck
            .iter()
            .zip(&again)
            .all(|(a, b)| a.rank == b.rank && a.suit == b.suit && a.card_id != b.card_id));
        assert!(again.iter().all(|c| !ids.contains(&c.card_id)));
    }

    #[test]
    fn test_deck_without_jokers() {
        let deck = build_deck(false);
        assert_eq!(deck.len(), 52);
        assert!(deck.iter().all(|c| c.rank != Rank::Joker));
    }

    #[test]
    fn test_point_table() {
        assert_eq!(Rank::Ace.points(), 1);
        assert_eq!(Rank::Seven.points(), 7);
        assert_eq!(Rank::Ten.points(), 10);
        assert_eq!(Rank::Jack.points(), 10);
        assert_eq!(Rank::Queen.points(), 10);
        assert_eq!(Rank::King.points(), 10);
        assert_eq!(Rank::Joker.points(), 0);
    }

    #[test]
    fn test_only_jack_and_queen_have_powers() {
        assert_eq!(Rank::Jack.power(), Some(SpecialPower::JackSwap));
        assert_eq!(Rank::Queen.power(), Some(SpecialPower::QueenPeek));
        assert!(Rank::King.power().is_none());
        assert!(Rank::Joker.power().is_none());
    }

    #[test]
    fn test_wire_strings() {
        assert_eq!(
            serde_json::to_string(&Phase::SpecialPlayWindow).unwrap(),
            "\"special_play_window\""
        );
        assert_eq!(
            serde_json::to_string(&PlayerStatus::DrawingCard).unwrap(),
            "\"drawing_card\""
        );
        assert_eq!(
            serde_json::to_string(&TurnAction::Reposition).unwrap(),
            "\"reposition\""
        );
        assert_eq!(serde_json::to_string(&Rank::Seven).unwrap(), "\"7\"");
        assert_eq!(
            serde_json::to_string(&WinType::FourOfAKind).unwrap(),
            "\"four_of_a_kind\""
        );
    }

    #[test]
    fn test_take_slot_blanks_low_slots_and_removes_high_slots() {
        let mut player = Player::human("p1", "Alice");
        player.hand = (0..6).map(|i| Some(format!("c{i}"))).collect();

        assert_eq!(player.take_slot(1), Some("c1".to_string()));
        assert_eq!(player.hand.len(), 6);
        assert!(player.hand[1].is_none());

        assert_eq!(player.take_slot(5), Some("c5".to_string()));
        assert_eq!(player.hand.len(), 5);
        assert_eq!(player.card_count(), 4);
    }

    #[test]
    fn test_forget_prunes_empty_owners() {
        let mut player = Player::computer("p1", "Bot", Difficulty::Easy);
        player.remember("p2", Card::new("c1", Rank::Five, Suit::Clubs));
        assert!(player.memory_of("p2").is_some());

        let forgotten = player.forget("c1");
        assert_eq!(forgotten.map(|(owner, _)| owner), Some("p2".to_string()));
        assert!(player.known_cards.is_empty());
    }

    #[test]
    fn test_next_active_skips_inactive_and_wraps() {
        let mut game = Game::new("room");
        game.players.push(Player::human("a", "A"));
        game.players.push(Player::human("b", "B"));
        game.players.push(Player::human("c", "C"));
        game.players[1].is_active = false;

        assert_eq!(game.next_active_after(Some("a")), Some("c".to_string()));
        assert_eq!(game.next_active_after(Some("c")), Some("a".to_string()));
        assert_eq!(game.next_active_after(None), Some("a".to_string()));
    }
}
