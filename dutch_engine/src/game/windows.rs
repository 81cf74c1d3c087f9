//! Reaction windows opened after every play.
//!
//! A play opens the same-rank window. When it closes, queued special cards
//! resolve one at a time in play order, then the turn passes on.

use std::time::Duration;

use super::{
    engine::RoundEngine,
    entities::{Game, Phase, PlayerId, PlayerStatus, SpecialCardRecord, SpecialPower},
    errors::ActionError,
    memory,
    timers::{TimerSlot, TimerTask},
    views,
};
use crate::bot::{decision::DecisionAction, rules::BotEvent};

#[derive(Clone, Debug, PartialEq)]
pub enum SpecialWindow {
    /// The owner may use the power
    Active(SpecialCardRecord),
    /// Resolved; waiting for the next queued card
    Closing,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ReactionWindow {
    #[default]
    Idle,
    SameRank,
    Special(SpecialWindow),
}

impl ReactionWindow {
    /// The card whose power is currently usable.
    #[must_use]
    pub fn active_special(&self) -> Option<&SpecialCardRecord> {
        match self {
            Self::Special(SpecialWindow::Active(record)) => Some(record),
            _ => None,
        }
    }

    #[must_use]
    pub fn special_owner(&self) -> Option<&str> {
        self.active_special().map(|r| r.player_id.as_str())
    }
}

impl RoundEngine {
    pub(super) fn open_same_rank_window(&mut self, game: &mut Game) {
        game.phase = Phase::SameRankWindow;
        game.set_all_statuses(PlayerStatus::SameRankWindow);
        self.window = ReactionWindow::SameRank;
        self.pending_reactions.clear();

        let length = self.config.timings.same_rank_window;
        if self.timeouts_enabled() {
            self.scheduler
                .schedule(TimerSlot::SameRankWindow, length, TimerTask::SameRankExpired);
        }

        let computers: Vec<PlayerId> = game
            .active_players()
            .filter(|p| !p.is_human)
            .map(|p| p.id.clone())
            .collect();
        for player_id in computers {
            let decision = self.decisions.decide(BotEvent::SameRankPlay, game, &player_id);
            if decision.action.is_passive() {
                continue;
            }
            log::debug!(
                "Room {}: {} will react ({})",
                self.room_id,
                player_id,
                decision.reasoning
            );
            // react before the window closes
            let delay = decision.delay.min(length.mul_f32(0.8));
            self.scheduler.schedule(
                TimerSlot::Computer(player_id.clone()),
                delay,
                TimerTask::ComputerAction {
                    player_id: player_id.clone(),
                    event: BotEvent::SameRankPlay,
                    action: decision.action,
                },
            );
            self.pending_reactions.insert(player_id);
        }

        self.broadcast(game);
        self.maybe_close_same_rank_early(game);
    }

    /// Without humans to wait for, the window closes once every scheduled
    /// computer reaction has run.
    pub(super) fn maybe_close_same_rank_early(&mut self, game: &mut Game) {
        if self.window != ReactionWindow::SameRank || !self.pending_reactions.is_empty() {
            return;
        }
        if game.active_players().any(|p| p.is_human) {
            return;
        }
        self.complete_same_rank_window(game);
    }

    /// Close the same-rank window and move on to queued special cards.
    /// Returns `false` when no same-rank window was open.
    pub fn complete_same_rank_window(&mut self, game: &mut Game) -> bool {
        if self.window != ReactionWindow::SameRank || game.is_ended() {
            return false;
        }

        self.scheduler.cancel(&TimerSlot::SameRankWindow);
        for player_id in std::mem::take(&mut self.pending_reactions) {
            self.scheduler.cancel(&TimerSlot::Computer(player_id));
        }
        for player in &mut game.players {
            if player.status == PlayerStatus::SameRankWindow {
                player.status = PlayerStatus::Waiting;
            }
        }
        game.phase = Phase::PlayerTurn;
        self.window = ReactionWindow::Idle;
        log::debug!("Room {}: same-rank window closed", self.room_id);

        self.start_next_special(game);
        true
    }

    /// Open the window for the next queued special card whose owner is
    /// still playing, or close out the play when the queue is empty.
    fn start_next_special(&mut self, game: &mut Game) {
        if game.is_ended() {
            return;
        }

        let record = loop {
            match game.special_queue.pop_front() {
                Some(record) if game.player(&record.player_id).is_some_and(|p| p.is_active) => {
                    break Some(record);
                }
                Some(record) => log::debug!(
                    "Room {}: dropping special {} of departed {}",
                    self.room_id,
                    record.card_id,
                    record.player_id
                ),
                None => break None,
            }
        };
        match record {
            Some(record) => self.open_special(game, record),
            None => self.close_special_window(game),
        }
    }

    /// Re-arm the active special after a seat left. A departed owner's card
    /// is skipped; otherwise the owner gets a fresh window and, for a
    /// computer, a fresh decision against the changed table.
    pub(super) fn reopen_special(&mut self, game: &mut Game, departed: &str) {
        match self.window.active_special().cloned() {
            Some(record) if record.player_id == departed => {
                self.complete_special_card(game, None);
            }
            Some(record) => self.open_special(game, record),
            None => self.start_next_special(game),
        }
    }

    fn open_special(&mut self, game: &mut Game, record: SpecialCardRecord) {
        game.phase = Phase::SpecialPlayWindow;
        let owner = record.player_id.clone();
        let power = record.power;
        let card_id = record.card_id.clone();
        let is_human = match game.player_mut(&owner) {
            Some(player) => {
                player.status = power.status();
                player.is_human
            }
            None => false,
        };
        self.window = ReactionWindow::Special(SpecialWindow::Active(record));
        log::info!("Room {}: {} may use {:?}", self.room_id, owner, power);

        if self.timeouts_enabled() {
            self.scheduler.schedule(
                TimerSlot::SpecialWindow,
                self.power_window(power),
                TimerTask::SpecialCardExpired {
                    card_id: card_id.clone(),
                },
            );
        }
        self.broadcast(game);

        if !is_human {
            let event = match power {
                SpecialPower::JackSwap => BotEvent::JackSwap,
                SpecialPower::QueenPeek => BotEvent::QueenPeek,
            };
            let decision = self.decisions.decide(event, game, &owner);
            if decision.action.is_passive() {
                log::debug!("Room {}: {} skips ({})", self.room_id, owner, decision.reasoning);
                self.complete_special_card(game, Some(&card_id));
            } else {
                self.scheduler.schedule(
                    TimerSlot::Computer(owner.clone()),
                    decision.delay,
                    TimerTask::ComputerAction {
                        player_id: owner,
                        event,
                        action: decision.action,
                    },
                );
            }
        }
    }

    fn power_window(&self, power: SpecialPower) -> Duration {
        match power {
            SpecialPower::JackSwap => self.config.timings.jack_swap_window,
            SpecialPower::QueenPeek => self.config.timings.queen_peek_window,
        }
    }

    fn close_special_window(&mut self, game: &mut Game) {
        self.window = ReactionWindow::Idle;
        game.phase = Phase::PlayerTurn;
        // a swap may have emptied a collection
        for player in &mut game.players {
            if player.collection_cards.is_empty() {
                player.collection_rank = None;
            }
        }
        self.move_to_next_player(game);
    }

    /// Finish the active special card. `card_id` guards against a stale
    /// expiry for a card that was already resolved; `None` forces it.
    pub fn complete_special_card(&mut self, game: &mut Game, card_id: Option<&str>) -> bool {
        let Some(active) = self.window.active_special() else {
            return false;
        };
        if card_id.is_some_and(|id| id != active.card_id) {
            return false;
        }
        let owner = active.player_id.clone();

        self.window = ReactionWindow::Special(SpecialWindow::Closing);
        self.scheduler.cancel(&TimerSlot::SpecialWindow);
        self.scheduler.cancel(&TimerSlot::Computer(owner.clone()));
        if let Some(player) = game.player_mut(&owner)
            && player.status != PlayerStatus::Peeking
        {
            player.status = PlayerStatus::Waiting;
        }

        self.start_next_special(game);
        true
    }

    fn check_power(
        &self,
        game: &Game,
        player_id: &str,
        power: SpecialPower,
    ) -> Result<(), ActionError> {
        if game.is_ended() {
            return Err(ActionError::GameEnded);
        }
        if game.phase != Phase::SpecialPlayWindow {
            return Err(ActionError::WrongPhase { phase: game.phase });
        }
        let active = self
            .window
            .active_special()
            .ok_or(ActionError::NoSpecialPending)?;
        if active.power != power {
            return Err(ActionError::WrongPower);
        }
        if active.player_id != player_id {
            return Err(ActionError::NotSpecialOwner {
                owner: active.player_id.clone(),
            });
        }
        Ok(())
    }

    /// Exchange two hand cards between any two seats (Jack power).
    pub fn jack_swap(
        &mut self,
        game: &mut Game,
        player_id: &str,
        first_card_id: &str,
        first_player_id: &str,
        second_card_id: &str,
        second_player_id: &str,
    ) -> bool {
        if let Err(e) = self.check_power(game, player_id, SpecialPower::JackSwap) {
            return self.reject(e);
        }
        let first = match self.hand_slot(game, first_player_id, first_card_id) {
            Ok(found) => found,
            Err(e) => return self.reject(e),
        };
        let second = match self.hand_slot(game, second_player_id, second_card_id) {
            Ok(found) => found,
            Err(e) => return self.reject(e),
        };
        if first == second {
            return self.reject(ActionError::CardNotInHand {
                player_id: second_player_id.to_string(),
                card_id: second_card_id.to_string(),
            });
        }

        let (first_idx, first_slot) = first;
        let (second_idx, second_slot) = second;
        game.players[first_idx].hand[first_slot] = Some(second_card_id.to_string());
        game.players[second_idx].hand[second_slot] = Some(first_card_id.to_string());

        // a swapped card no longer belongs to its old owner's collection
        for (idx, card_id) in [(first_idx, first_card_id), (second_idx, second_card_id)] {
            let player = &mut game.players[idx];
            player.collection_cards.retain(|c| c.card_id != card_id);
        }

        memory::on_cards_swapped(
            game,
            (first_card_id, first_player_id),
            (second_card_id, second_player_id),
            &mut self.rng,
        );
        self.acted(game, player_id);
        log::info!(
            "Room {}: {} swapped {}'s card with {}'s",
            self.room_id,
            player_id,
            first_player_id,
            second_player_id
        );

        self.broadcast(game);
        self.complete_special_card(game, None);
        true
    }

    /// Privately reveal one card to the peeker (Queen power).
    pub fn queen_peek(
        &mut self,
        game: &mut Game,
        player_id: &str,
        card_id: &str,
        target_player_id: &str,
    ) -> bool {
        if let Err(e) = self.check_power(game, player_id, SpecialPower::QueenPeek) {
            return self.reject(e);
        }
        let Some(target) = game.player(target_player_id) else {
            return self.reject(ActionError::UnknownPlayer {
                player_id: target_player_id.to_string(),
            });
        };
        let in_drawn_slot = target
            .drawn_card
            .as_ref()
            .is_some_and(|c| c.card_id == card_id);
        if !target.holds(card_id) && !in_drawn_slot {
            return self.reject(ActionError::CardNotInHand {
                player_id: target_player_id.to_string(),
                card_id: card_id.to_string(),
            });
        }
        let Some(card) = super::directory::resolve(game, card_id) else {
            return self.reject(ActionError::UnknownCard {
                card_id: card_id.to_string(),
            });
        };

        memory::record_sighting(game, player_id, target_player_id, &card, &mut self.rng);
        self.acted(game, player_id);
        if let Some(player) = game.player_mut(player_id) {
            player.status = PlayerStatus::Peeking;
        }
        log::info!(
            "Room {}: {} peeked at a card of {}",
            self.room_id,
            player_id,
            target_player_id
        );

        self.broadcast(game);
        if game.player(player_id).is_some_and(|p| p.is_human) {
            self.callbacks.send_game_state_to_player(
                &self.room_id,
                player_id,
                &views::peek_view(game, player_id, card_id),
            );
        }
        self.complete_special_card(game, None);
        true
    }

    /// Seat index and slot of a card that can take part in a swap.
    fn hand_slot(
        &self,
        game: &Game,
        player_id: &str,
        card_id: &str,
    ) -> Result<(usize, usize), ActionError> {
        let idx = game
            .player_index(player_id)
            .ok_or_else(|| ActionError::UnknownPlayer {
                player_id: player_id.to_string(),
            })?;
        let player = &game.players[idx];
        if !player.is_active {
            return Err(ActionError::InactivePlayer {
                player_id: player_id.to_string(),
            });
        }
        let slot = player
            .hand_position(card_id)
            .ok_or_else(|| ActionError::CardNotInHand {
                player_id: player_id.to_string(),
                card_id: card_id.to_string(),
            })?;
        Ok((idx, slot))
    }
}
