//! Turn and phase engine for a single room.
//!
//! Every operation takes the room's [`Game`] explicitly, applies the change
//! completely, notifies the room and returns `true`, or reports an
//! [`ActionError`] through `on_action_error` and returns `false`. Nothing
//! here panics or propagates errors to the caller.
//!
//! Background work (turn deadlines, reaction windows, computer moves, the
//! settle pause between turns) runs through the room's [`Scheduler`] and
//! re-enters the engine via [`RoundEngine::handle_timer`].

use chrono::Utc;
use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use super::{
    directory,
    entities::{
        Card, CardId, DrawSource, Game, HAND_SIZE, INITIAL_PEEK_COUNT, MAX_COLLECTION_CARDS,
        Phase, PlayerId, PlayerStatus, RoomId, SpecialCardRecord, TurnAction, TurnEvent, WinType,
        WinnerRecord, build_deck, shuffle_cards,
    },
    errors::ActionError,
    memory, scoring,
    timers::{FiredTimer, Scheduler, TimerSlot, TimerTask},
    views,
    windows::ReactionWindow,
};
use crate::{
    bot::{decision::DecisionMaker, rules::{BotEvent, RuleTable}},
    room::{
        callbacks::{PotMetadata, RoomCallbacks},
        config::RoomConfig,
    },
};

/// Consecutive missed draws/plays before a player is asked to leave.
pub const MAX_MISSED_ACTIONS: u32 = 2;

pub struct RoundEngine {
    pub(super) room_id: RoomId,
    pub(super) config: RoomConfig,
    pub(super) callbacks: Arc<dyn RoomCallbacks>,
    pub(super) scheduler: Scheduler,
    pub(super) decisions: DecisionMaker,
    pub(super) rng: StdRng,
    pub(super) window: ReactionWindow,
    /// Computers that still have a same-rank reaction scheduled
    pub(super) pending_reactions: BTreeSet<PlayerId>,
    missed_actions: HashMap<PlayerId, u32>,
    left_room: HashSet<PlayerId>,
    game_end_notified: bool,
    /// Computer moves report failures to the log only
    pub(super) quiet: bool,
    last_error: Option<ActionError>,
}

impl RoundEngine {
    pub fn new(
        room_id: impl Into<RoomId>,
        config: RoomConfig,
        callbacks: Arc<dyn RoomCallbacks>,
        scheduler: Scheduler,
    ) -> Self {
        let delay_scale = config.timings.computer_delay_scale;
        Self {
            room_id: room_id.into(),
            config,
            callbacks,
            scheduler,
            decisions: DecisionMaker::new().with_delay_scale(delay_scale),
            rng: StdRng::from_os_rng(),
            window: ReactionWindow::Idle,
            pending_reactions: BTreeSet::new(),
            missed_actions: HashMap::new(),
            left_room: HashSet::new(),
            game_end_notified: false,
            quiet: false,
            last_error: None,
        }
    }

    /// Deterministic shuffles and decisions.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.decisions = DecisionMaker::with_rules(
            Some(RuleTable::standard()),
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        )
        .with_delay_scale(self.config.timings.computer_delay_scale);
        self
    }

    /// Replace the computer strategy; `None` means draw-then-play.
    pub fn set_rules(&mut self, rules: Option<RuleTable>) {
        self.decisions.set_rules(rules);
    }

    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    #[must_use]
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn window(&self) -> &ReactionWindow {
        &self.window
    }

    /// The most recent rejection, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&ActionError> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub fn missed_actions(&self, player_id: &str) -> u32 {
        self.missed_actions.get(player_id).copied().unwrap_or(0)
    }

    pub(super) fn reject(&mut self, error: ActionError) -> bool {
        log::debug!("Room {}: rejected action: {}", self.room_id, error);
        if !self.quiet {
            self.callbacks
                .on_action_error(&self.room_id, &error.to_string(), &error.data());
        }
        self.last_error = Some(error);
        false
    }

    pub(super) fn timeouts_enabled(&self) -> bool {
        !self.callbacks.timer_config().show_instructions
    }

    /// Broadcast the public view of `game` to the room.
    pub fn broadcast(&self, game: &Game) {
        self.callbacks
            .on_game_state_changed(&self.room_id, &views::public_view(game));
    }

    /// Push the owner-only view to a human player.
    pub(super) fn sync_player(&self, game: &Game, player_id: &str) {
        if game.player(player_id).is_some_and(|p| p.is_human) {
            self.callbacks.send_game_state_to_player(
                &self.room_id,
                player_id,
                &views::player_view(game, player_id),
            );
        }
    }

    /// Common checks for an action by a seated, active player.
    fn check_player(&self, game: &Game, player_id: &str) -> Result<(), ActionError> {
        if game.is_ended() {
            return Err(ActionError::GameEnded);
        }
        match game.player(player_id) {
            None => Err(ActionError::UnknownPlayer {
                player_id: player_id.to_string(),
            }),
            Some(p) if !p.is_active => Err(ActionError::InactivePlayer {
                player_id: player_id.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    fn check_turn(
        &self,
        game: &Game,
        player_id: &str,
        expected: PlayerStatus,
    ) -> Result<(), ActionError> {
        self.check_player(game, player_id)?;
        if game.phase != Phase::PlayerTurn {
            return Err(ActionError::WrongPhase { phase: game.phase });
        }
        if !game.is_current(player_id) {
            return Err(ActionError::NotYourTurn {
                player_id: player_id.to_string(),
            });
        }
        let status = game
            .player(player_id)
            .map(|p| p.status)
            .unwrap_or_default();
        match (expected, status) {
            (PlayerStatus::DrawingCard, PlayerStatus::DrawingCard)
            | (PlayerStatus::PlayingCard, PlayerStatus::PlayingCard) => Ok(()),
            (PlayerStatus::PlayingCard, _) => Err(ActionError::MustDrawFirst {
                player_id: player_id.to_string(),
            }),
            _ => Err(ActionError::AlreadyDrawn {
                player_id: player_id.to_string(),
            }),
        }
    }

    /// Card in `player_id`'s hand that may leave it: (slot, card).
    fn playable_card(
        &self,
        game: &Game,
        player_id: &str,
        card_id: &str,
    ) -> Result<(usize, Card), ActionError> {
        let player = game
            .player(player_id)
            .ok_or_else(|| ActionError::UnknownPlayer {
                player_id: player_id.to_string(),
            })?;
        let slot = player
            .hand_position(card_id)
            .ok_or_else(|| ActionError::CardNotInHand {
                player_id: player_id.to_string(),
                card_id: card_id.to_string(),
            })?;
        if player.is_collection_card(card_id) {
            return Err(ActionError::CollectionCard {
                card_id: card_id.to_string(),
            });
        }
        match directory::resolve(game, card_id) {
            Some(card) => Ok((slot, card)),
            None => {
                log::error!(
                    "Room {}: card {} held by {} is missing from the deck",
                    self.room_id,
                    card_id,
                    player_id
                );
                Err(ActionError::UnknownCard {
                    card_id: card_id.to_string(),
                })
            }
        }
    }

    /// A successful own action clears the missed-action streak.
    pub(super) fn acted(&mut self, game: &mut Game, player_id: &str) {
        self.missed_actions.remove(player_id);
        if let Some(player) = game.player_mut(player_id) {
            player.acted_this_turn = true;
        }
    }

    fn record_miss(&mut self, player_id: &str) {
        let count = self.missed_actions.entry(player_id.to_string()).or_insert(0);
        *count += 1;
        log::info!(
            "Room {}: {} missed an action ({} in a row)",
            self.room_id,
            player_id,
            count
        );
        if *count >= MAX_MISSED_ACTIONS && self.left_room.insert(player_id.to_string()) {
            self.callbacks.trigger_leave_room(&self.room_id, player_id);
        }
    }

    // === Round setup ===

    /// Build and shuffle a fresh deck, deal every active player a hand,
    /// turn one card face up, pin collection ranks in collection mode and
    /// run the initial peek.
    pub fn deal(&mut self, game: &mut Game) -> bool {
        if !matches!(game.phase, Phase::WaitingForPlayers | Phase::GameEnded) {
            return self.reject(ActionError::WrongPhase { phase: game.phase });
        }
        let seated = game.active_count();
        if seated < self.config.min_players {
            return self.reject(ActionError::NotEnoughPlayers {
                have: seated,
                need: self.config.min_players,
            });
        }

        self.scheduler.cancel_all();
        self.window = ReactionWindow::Idle;
        self.pending_reactions.clear();
        self.missed_actions.clear();
        self.left_room.clear();
        self.game_end_notified = false;

        let mut deck = build_deck(self.config.include_jokers);
        shuffle_cards(&mut deck, &mut self.rng);

        game.phase = Phase::WaitingForPlayers;
        game.current_player = None;
        game.draw_pile = deck.iter().map(|c| c.card_id.clone()).collect();
        game.original_deck = deck;
        game.discard_pile.clear();
        game.special_queue.clear();
        game.winners.clear();
        game.final_round_caller = None;
        game.final_round_completed.clear();
        game.turn_events.clear();
        game.collection_mode = self.config.collection_mode;
        game.practice_mode = self.config.practice_mode;
        game.round_number += 1;
        for player in &mut game.players {
            player.reset();
        }

        for _ in 0..HAND_SIZE {
            for player in game.players.iter_mut().filter(|p| p.is_active) {
                match game.draw_pile.pop() {
                    Some(card_id) => player.hand.push(Some(card_id)),
                    None => {
                        log::error!("Room {}: deck ran out while dealing", self.room_id);
                        return false;
                    }
                }
            }
        }

        if let Some(card) = game
            .draw_pile
            .pop()
            .and_then(|id| directory::resolve(game, &id))
        {
            game.discard_pile.push(card);
        }

        if game.collection_mode {
            for idx in 0..game.players.len() {
                if !game.players[idx].is_active {
                    continue;
                }
                let Some(card) = game.players[idx]
                    .hand
                    .first()
                    .cloned()
                    .flatten()
                    .and_then(|id| directory::resolve(game, &id))
                else {
                    continue;
                };
                let player = &mut game.players[idx];
                let owner = player.id.clone();
                player.collection_rank = Some(card.rank);
                player.remember(&owner, card.clone());
                player.collection_cards.push(card);
            }
        }

        log::info!(
            "Room {}: dealt round {} to {} players",
            self.room_id,
            game.round_number,
            seated
        );
        self.initial_peek(game);
        true
    }

    /// Every active player memorises [`INITIAL_PEEK_COUNT`] of their own
    /// cards. Statuses pass through `peeking` until the round starts.
    pub fn initial_peek(&mut self, game: &mut Game) -> bool {
        if game.is_ended() {
            return self.reject(ActionError::GameEnded);
        }
        let ids: Vec<PlayerId> = game.active_players().map(|p| p.id.clone()).collect();
        for player_id in &ids {
            let Some(player) = game.player(player_id) else {
                continue;
            };
            let candidates: Vec<CardId> = player
                .hand
                .iter()
                .flatten()
                .filter(|id| !player.is_collection_card(id))
                .cloned()
                .collect();
            let picked: Vec<Card> = candidates
                .choose_multiple(&mut self.rng, INITIAL_PEEK_COUNT)
                .filter_map(|id| directory::resolve(game, id))
                .collect();

            memory::on_initial_peek(game, player_id, &picked, &mut self.rng);
            if let Some(player) = game.player_mut(player_id) {
                player.status = PlayerStatus::Peeking;
            }
        }

        self.broadcast(game);
        for player_id in &ids {
            self.sync_player(game, player_id);
        }
        true
    }

    /// Open the first turn of a dealt round.
    pub fn start_round(&mut self, game: &mut Game) -> bool {
        if game.is_ended() {
            return self.reject(ActionError::GameEnded);
        }
        if game.phase != Phase::WaitingForPlayers {
            return self.reject(ActionError::WrongPhase { phase: game.phase });
        }
        let seated = game.active_count();
        if seated < self.config.min_players {
            return self.reject(ActionError::NotEnoughPlayers {
                have: seated,
                need: self.config.min_players,
            });
        }
        let dealt = game.active_players().all(|p| !p.hand.is_empty());
        if !dealt && !self.deal(game) {
            return false;
        }

        for player in &mut game.players {
            player.status = PlayerStatus::Waiting;
            player.drawn_card = None;
            player.acted_this_turn = false;
        }
        game.turn_events.clear();
        game.round_started_at = Some(Utc::now());

        let first = if game.practice_mode {
            game.active_players()
                .find(|p| !p.is_human)
                .map(|p| p.id.clone())
        } else {
            None
        };
        let first = first.or_else(|| {
            let ids: Vec<PlayerId> = game.active_players().map(|p| p.id.clone()).collect();
            ids.choose(&mut self.rng).cloned()
        });
        let Some(first) = first else {
            log::error!("Room {}: no player to open the round", self.room_id);
            return false;
        };

        log::info!("Room {}: round {} starts with {}", self.room_id, game.round_number, first);
        game.phase = Phase::PlayerTurn;
        self.open_draw_phase(game, &first);
        true
    }

    pub(super) fn open_draw_phase(&mut self, game: &mut Game, player_id: &str) {
        game.current_player = Some(player_id.to_string());
        let is_human = match game.player_mut(player_id) {
            Some(player) => {
                player.status = PlayerStatus::DrawingCard;
                player.acted_this_turn = false;
                player.is_human
            }
            None => return,
        };

        if is_human {
            self.arm_turn_timeout(TimerTask::DrawTimeout {
                player_id: player_id.to_string(),
            });
        } else {
            self.schedule_computer(game, player_id, BotEvent::DrawCard);
        }
        self.broadcast(game);
    }

    fn arm_turn_timeout(&mut self, task: TimerTask) {
        let config = self.callbacks.timer_config();
        if config.show_instructions {
            return;
        }
        if let Some(limit) = config.turn_time_limit {
            self.scheduler.schedule(TimerSlot::Turn, limit, task);
        }
    }

    // === Piles ===

    /// Top of the draw pile, rebuilt from the discard pile when empty.
    fn pop_draw_pile(&mut self, game: &mut Game) -> Option<Card> {
        if game.draw_pile.is_empty() {
            if game.discard_pile.len() <= 1 {
                log::warn!(
                    "Room {}: draw pile empty and nothing to reshuffle",
                    self.room_id
                );
                return None;
            }
            let top = game.discard_pile.pop()?;
            let mut ids: Vec<CardId> = game.discard_pile.drain(..).map(|c| c.card_id).collect();
            shuffle_cards(&mut ids, &mut self.rng);
            log::info!(
                "Room {}: reshuffled {} discards into the draw pile",
                self.room_id,
                ids.len()
            );
            game.draw_pile = ids;
            game.discard_pile.push(top);
        }

        let card_id = game.draw_pile.pop()?;
        let card = directory::resolve(game, &card_id);
        if card.is_none() {
            log::error!(
                "Room {}: draw pile card {} is missing from the deck",
                self.room_id,
                card_id
            );
        }
        card
    }

    // === Turn actions ===

    pub fn draw_card(&mut self, game: &mut Game, player_id: &str, source: DrawSource) -> bool {
        if let Err(e) = self.check_turn(game, player_id, PlayerStatus::DrawingCard) {
            return self.reject(e);
        }

        let card = match source {
            DrawSource::Deck => self.pop_draw_pile(game),
            DrawSource::Discard => game.discard_pile.pop(),
        };
        let Some(card) = card else {
            return self.reject(ActionError::EmptyPile { pile: source });
        };

        self.scheduler.cancel(&TimerSlot::Turn);
        self.acted(game, player_id);
        let card_id = card.card_id.clone();
        let is_human = match game.player_mut(player_id) {
            Some(player) => {
                player.hand.push(Some(card_id.clone()));
                player.drawn_card = Some(card);
                player.status = PlayerStatus::PlayingCard;
                player.is_human
            }
            None => return false,
        };
        game.turn_events.push(TurnEvent::new(card_id, TurnAction::Draw));
        log::debug!("Room {}: {} drew from the {}", self.room_id, player_id, source);

        if is_human {
            self.arm_turn_timeout(TimerTask::PlayTimeout {
                player_id: player_id.to_string(),
            });
        } else {
            self.schedule_computer(game, player_id, BotEvent::PlayCard);
        }

        // everyone else learns only the identifier; the owner gets the card
        self.callbacks.broadcast_game_state_except(
            &self.room_id,
            player_id,
            &views::public_view(game),
        );
        self.sync_player(game, player_id);
        true
    }

    pub fn play_card(&mut self, game: &mut Game, player_id: &str, card_id: &str) -> bool {
        if let Err(e) = self.check_turn(game, player_id, PlayerStatus::PlayingCard) {
            return self.reject(e);
        }
        let (slot, card) = match self.playable_card(game, player_id, card_id) {
            Ok(found) => found,
            Err(e) => return self.reject(e),
        };
        self.acted(game, player_id);
        self.apply_play(game, player_id, slot, card);
        true
    }

    /// Move `card` from `slot` to the discard pile and settle the drawn card.
    fn apply_play(&mut self, game: &mut Game, player_id: &str, slot: usize, card: Card) {
        self.scheduler.cancel(&TimerSlot::Turn);
        let Some(player) = game.player_mut(player_id) else {
            return;
        };

        let drawn = player.drawn_card.take();
        player.take_slot(slot);
        player.status = PlayerStatus::Waiting;

        let mut kept_drawn = None;
        if let Some(drawn) = drawn
            && drawn.card_id != card.card_id
        {
            match player.hand_position(&drawn.card_id) {
                Some(drawn_slot) => {
                    player.hand.remove(drawn_slot);
                }
                None => log::warn!(
                    "Room {}: drawn card {} had no hand slot",
                    self.room_id,
                    drawn.card_id
                ),
            }
            match player.hand.get_mut(slot) {
                Some(vacated @ None) => *vacated = Some(drawn.card_id.clone()),
                _ => player.hand.push(Some(drawn.card_id.clone())),
            }
            kept_drawn = Some(drawn);
        }

        let empty_hand = player.card_count() == 0;
        game.turn_events
            .push(TurnEvent::new(card.card_id.clone(), TurnAction::Play));
        if let Some(drawn) = &kept_drawn {
            game.turn_events
                .push(TurnEvent::new(drawn.card_id.clone(), TurnAction::Reposition));
        }
        memory::on_card_played(game, player_id, &card.card_id, kept_drawn.as_ref(), &mut self.rng);
        log::debug!("Room {}: {} played {}", self.room_id, player_id, card);

        self.queue_special(game, player_id, &card);
        game.discard_pile.push(card);

        if empty_hand {
            self.declare_empty_hand(game, player_id);
            return;
        }

        self.sync_player(game, player_id);
        self.open_same_rank_window(game);
    }

    pub(super) fn queue_special(&self, game: &mut Game, player_id: &str, card: &Card) {
        if let Some(power) = card.rank.power() {
            game.special_queue.push_back(SpecialCardRecord {
                player_id: player_id.to_string(),
                card_id: card.card_id.clone(),
                rank: card.rank,
                suit: card.suit,
                power,
                played_at: Utc::now(),
            });
        }
    }

    pub(super) fn declare_empty_hand(&mut self, game: &mut Game, player_id: &str) {
        let name = game
            .player(player_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        log::info!("Room {}: {} emptied their hand", self.room_id, player_id);
        game.winners = vec![WinnerRecord {
            player_id: player_id.to_string(),
            player_name: name,
            win_type: WinType::EmptyHand,
            points: Some(0),
            card_count: Some(0),
        }];
        self.end_game(game);
    }

    /// Out-of-turn discard of a card matching the discard top. A wrong rank
    /// costs one penalty card and leaves the window open.
    pub fn same_rank_play(&mut self, game: &mut Game, player_id: &str, card_id: &str) -> bool {
        if let Err(e) = self.check_player(game, player_id) {
            return self.reject(e);
        }
        if game.phase != Phase::SameRankWindow {
            return self.reject(ActionError::WrongPhase { phase: game.phase });
        }
        let (slot, card) = match self.playable_card(game, player_id, card_id) {
            Ok(found) => found,
            Err(e) => return self.reject(e),
        };
        let Some(top_rank) = game.discard_top().map(|c| c.rank) else {
            log::error!("Room {}: same-rank window open on an empty discard", self.room_id);
            return self.reject(ActionError::EmptyPile {
                pile: DrawSource::Discard,
            });
        };
        if card.rank != top_rank {
            // both piles exhausted: the attempt is refused, not penalised
            let Some(penalty) = self.pop_draw_pile(game) else {
                return self.reject(ActionError::PenaltyUnavailable {
                    player_id: player_id.to_string(),
                });
            };
            self.acted(game, player_id);
            log::info!(
                "Room {}: {} tried {} on a {} and takes a penalty",
                self.room_id,
                player_id,
                card.rank,
                top_rank
            );
            if let Some(player) = game.player_mut(player_id) {
                player.hand.push(Some(penalty.card_id.clone()));
            }
            game.turn_events
                .push(TurnEvent::new(penalty.card_id, TurnAction::Draw));
            self.broadcast(game);
            return true;
        }
        self.acted(game, player_id);

        let empty_hand = match game.player_mut(player_id) {
            Some(player) => {
                player.take_slot(slot);
                player.card_count() == 0
            }
            None => return false,
        };
        game.turn_events
            .push(TurnEvent::new(card.card_id.clone(), TurnAction::Play));
        memory::on_card_played(game, player_id, &card.card_id, None, &mut self.rng);
        self.queue_special(game, player_id, &card);
        log::debug!("Room {}: {} matched with {}", self.room_id, player_id, card);
        game.discard_pile.push(card);

        if empty_hand {
            self.declare_empty_hand(game, player_id);
            return true;
        }
        self.broadcast(game);
        true
    }

    /// Claim the discard top into the player's collection.
    pub fn collect_from_discard(&mut self, game: &mut Game, player_id: &str) -> bool {
        if let Err(e) = self.check_player(game, player_id) {
            return self.reject(e);
        }
        if !game.collection_mode {
            return self.reject(ActionError::CollectionDisabled);
        }
        if matches!(game.phase, Phase::SameRankWindow | Phase::SpecialPlayWindow) {
            return self.reject(ActionError::WrongPhase { phase: game.phase });
        }
        let Some(player) = game.player(player_id) else {
            return false;
        };
        if player.collection_cards.len() >= MAX_COLLECTION_CARDS {
            return self.reject(ActionError::CollectionFull);
        }
        let Some(top) = game.discard_top() else {
            return self.reject(ActionError::EmptyPile {
                pile: DrawSource::Discard,
            });
        };
        if player.collection_rank != Some(top.rank) {
            return self.reject(ActionError::CollectionMismatch);
        }
        if player.is_collection_card(&top.card_id) {
            return self.reject(ActionError::AlreadyCollected);
        }

        let Some(card) = game.discard_pile.pop() else {
            return false;
        };
        self.acted(game, player_id);
        let complete = match game.player_mut(player_id) {
            Some(player) => {
                player.hand.push(Some(card.card_id.clone()));
                player.collection_rank = Some(card.rank);
                player.remember(player_id, card.clone());
                player.collection_cards.push(card.clone());
                player.collection_cards.len() >= MAX_COLLECTION_CARDS
            }
            None => return false,
        };
        game.turn_events
            .push(TurnEvent::new(card.card_id.clone(), TurnAction::Collect));
        log::info!("Room {}: {} collected {}", self.room_id, player_id, card);

        if complete {
            let name = game
                .player(player_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            game.winners = vec![WinnerRecord {
                player_id: player_id.to_string(),
                player_name: name,
                win_type: WinType::FourOfAKind,
                points: None,
                card_count: None,
            }];
            self.end_game(game);
            return true;
        }

        self.broadcast(game);
        self.sync_player(game, player_id);
        true
    }

    /// Start the last lap: everyone else gets one more turn.
    pub fn call_final_round(&mut self, game: &mut Game, player_id: &str) -> bool {
        if let Err(e) = self.check_player(game, player_id) {
            return self.reject(e);
        }
        if game.phase == Phase::WaitingForPlayers {
            return self.reject(ActionError::WrongPhase { phase: game.phase });
        }
        if game.final_round_caller.is_some() {
            return self.reject(ActionError::FinalRoundAlreadyCalled);
        }

        self.acted(game, player_id);
        game.final_round_caller = Some(player_id.to_string());
        game.final_round_completed.insert(player_id.to_string());
        log::info!("Room {}: {} called the final round", self.room_id, player_id);

        if self.final_round_complete(game) {
            self.finish_by_points(game);
        } else {
            self.broadcast(game);
        }
        true
    }

    fn final_round_complete(&self, game: &Game) -> bool {
        game.final_round_caller.is_some()
            && game
                .active_players()
                .all(|p| game.final_round_completed.contains(&p.id))
    }

    // === Turn advancement ===

    /// End the current turn; the next one opens after the settle delay.
    pub fn move_to_next_player(&mut self, game: &mut Game) {
        if game.is_ended() {
            return;
        }
        self.scheduler.cancel(&TimerSlot::Turn);
        self.scheduler.schedule(
            TimerSlot::Settle,
            self.config.timings.settle_delay,
            TimerTask::AdvanceTurn,
        );
    }

    /// Open the next active player's draw phase, or score the round when
    /// the final round has gone all the way around.
    pub fn advance_turn(&mut self, game: &mut Game) {
        if game.is_ended() {
            return;
        }
        self.computer_collection_sweep(game);
        if game.is_ended() {
            return;
        }

        let previous = game.current_player.clone();
        for player in &mut game.players {
            player.status = PlayerStatus::Waiting;
            player.acted_this_turn = false;
            player.drawn_card = None;
        }
        game.turn_events.clear();

        if game.final_round_caller.is_some() {
            if let Some(previous) = &previous {
                game.final_round_completed.insert(previous.clone());
            }
            if self.final_round_complete(game) {
                self.finish_by_points(game);
                return;
            }
        }

        if game.active_count() < 2 {
            self.finish_by_points(game);
            return;
        }
        match game.next_active_after(previous.as_deref()) {
            Some(next) => self.open_draw_phase(game, &next),
            None => log::error!("Room {}: no active player to move to", self.room_id),
        }
    }

    pub(super) fn finish_by_points(&mut self, game: &mut Game) {
        game.winners = scoring::lowest_points_winners(game);
        self.end_game(game);
    }

    /// Terminal transition. Cancels every timer and notifies once.
    pub fn end_game(&mut self, game: &mut Game) {
        game.phase = Phase::GameEnded;
        self.scheduler.cancel_all();
        self.window = ReactionWindow::Idle;
        self.pending_reactions.clear();
        for player in &mut game.players {
            player.status = PlayerStatus::Waiting;
            player.drawn_card = None;
        }

        if !self.game_end_notified {
            self.game_end_notified = true;
            let pot = self.pot_metadata(game);
            let results = scoring::final_results(game);
            log::info!(
                "Room {}: round {} over, winners: {:?}",
                self.room_id,
                game.round_number,
                game.winners.iter().map(|w| &w.player_id).collect::<Vec<_>>()
            );
            self.callbacks
                .on_game_ended(&self.room_id, &game.winners, &results, &pot);
        }
        self.broadcast(game);
    }

    fn pot_metadata(&self, game: &Game) -> PotMetadata {
        let is_practice = game.practice_mode;
        let pot = if is_practice {
            0
        } else {
            self.config.pot_for(game.players.len())
        };
        let per_winner = match game.winners.len() {
            0 => 0,
            n => pot / n as u32,
        };
        PotMetadata {
            entry_fee: if is_practice { 0 } else { self.config.entry_fee },
            pot,
            per_winner,
            is_practice,
        }
    }

    // === Seats ===

    /// Take a player out of the round and keep the round moving.
    pub fn remove_player(&mut self, game: &mut Game, player_id: &str) -> bool {
        let Some(player) = game.player(player_id) else {
            return self.reject(ActionError::UnknownPlayer {
                player_id: player_id.to_string(),
            });
        };
        if !player.is_active {
            return self.reject(ActionError::InactivePlayer {
                player_id: player_id.to_string(),
            });
        }

        self.scheduler
            .cancel(&TimerSlot::Computer(player_id.to_string()));
        self.pending_reactions.remove(player_id);

        if game.phase == Phase::WaitingForPlayers && game.round_number == 0 {
            game.players.retain(|p| p.id != player_id);
            self.broadcast(game);
            return true;
        }

        let was_current = game.is_current(player_id);
        if let Some(player) = game.player_mut(player_id) {
            player.is_active = false;
            player.status = PlayerStatus::Waiting;
            player.drawn_card = None;
        }
        log::info!("Room {}: {} left the round", self.room_id, player_id);

        if game.is_ended() || game.phase == Phase::WaitingForPlayers {
            self.broadcast(game);
            return true;
        }
        if game.active_count() < 2 {
            self.finish_by_points(game);
            return true;
        }

        // every pending timer was planned against the old table
        let settling = self.scheduler.is_scheduled(&TimerSlot::Settle);
        self.scheduler.cancel_all();
        self.pending_reactions.clear();

        match game.phase {
            Phase::PlayerTurn if was_current || settling => self.move_to_next_player(game),
            Phase::PlayerTurn => self.resume_turn(game),
            Phase::SameRankWindow => self.open_same_rank_window(game),
            Phase::SpecialPlayWindow => self.reopen_special(game, player_id),
            _ => {}
        }
        self.broadcast(game);
        true
    }

    /// Re-arm the current player's deadline or computer action.
    fn resume_turn(&mut self, game: &mut Game) {
        let Some(current) = game.current_player.clone() else {
            self.move_to_next_player(game);
            return;
        };
        let Some((status, is_human)) = game.player(&current).map(|p| (p.status, p.is_human))
        else {
            self.move_to_next_player(game);
            return;
        };
        match (status, is_human) {
            (PlayerStatus::DrawingCard, true) => self.arm_turn_timeout(TimerTask::DrawTimeout {
                player_id: current,
            }),
            (PlayerStatus::DrawingCard, false) => {
                self.schedule_computer(game, &current, BotEvent::DrawCard);
            }
            (PlayerStatus::PlayingCard, true) => self.arm_turn_timeout(TimerTask::PlayTimeout {
                player_id: current,
            }),
            (PlayerStatus::PlayingCard, false) => {
                self.schedule_computer(game, &current, BotEvent::PlayCard);
            }
            _ => self.move_to_next_player(game),
        }
    }

    // === Timers ===

    /// Run the task of a fired timer. Stale or post-game timers do nothing.
    pub fn handle_timer(&mut self, game: &mut Game, fired: &FiredTimer) -> bool {
        let Some(task) = self.scheduler.take(fired) else {
            return false;
        };
        if game.is_ended() {
            log::debug!("Room {}: ignoring {:?} after game end", self.room_id, task);
            return false;
        }

        match task {
            TimerTask::DrawTimeout { player_id } => {
                if game.is_current(&player_id)
                    && game.phase == Phase::PlayerTurn
                    && game
                        .player(&player_id)
                        .is_some_and(|p| p.status == PlayerStatus::DrawingCard)
                {
                    log::info!("Room {}: {} ran out of time to draw", self.room_id, player_id);
                    self.record_miss(&player_id);
                    self.move_to_next_player(game);
                }
            }
            TimerTask::PlayTimeout { player_id } => {
                if game.is_current(&player_id) && game.phase == Phase::PlayerTurn {
                    log::info!("Room {}: {} ran out of time to play", self.room_id, player_id);
                    self.record_miss(&player_id);
                    self.auto_play_drawn(game, &player_id);
                }
            }
            TimerTask::SameRankExpired => {
                self.complete_same_rank_window(game);
            }
            TimerTask::SpecialCardExpired { card_id } => {
                log::debug!("Room {}: special card {} expired", self.room_id, card_id);
                self.complete_special_card(game, Some(&card_id));
            }
            TimerTask::AdvanceTurn => self.advance_turn(game),
            TimerTask::ComputerAction {
                player_id,
                event,
                action,
            } => self.execute_computer_action(game, &player_id, event, action),
        }
        true
    }

    /// Discard the drawn card for a player who let the clock run out.
    pub(super) fn auto_play_drawn(&mut self, game: &mut Game, player_id: &str) {
        let drawn_id = game
            .player(player_id)
            .and_then(|p| p.drawn_card.as_ref())
            .map(|c| c.card_id.clone());
        let found = drawn_id.and_then(|id| self.playable_card(game, player_id, &id).ok());
        match found {
            Some((slot, card)) => self.apply_play(game, player_id, slot, card),
            None => self.move_to_next_player(game),
        }
    }

    /// Fire the earliest timer on the virtual clock. Manual schedulers only.
    pub fn fire_next_timer(&mut self, game: &mut Game) -> bool {
        match self.scheduler.fire_next() {
            Some(fired) => self.handle_timer(game, &fired),
            None => false,
        }
    }

    /// Fire timers until the round ends, nothing is pending, or `max_steps`
    /// timers have run. Returns the number fired.
    pub fn run_timers(&mut self, game: &mut Game, max_steps: usize) -> usize {
        let mut fired = 0;
        while fired < max_steps && !game.is_ended() {
            let Some(next) = self.scheduler.fire_next() else {
                break;
            };
            self.handle_timer(game, &next);
            fired += 1;
        }
        fired
    }

    pub fn cancel_all_timers(&mut self) {
        self.scheduler.cancel_all();
    }
}
