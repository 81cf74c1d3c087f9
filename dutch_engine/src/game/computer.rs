//! Computer seats: turning decisions into engine calls.

use super::{
    engine::RoundEngine,
    entities::{DrawSource, Game, MAX_COLLECTION_CARDS, PlayerId, PlayerStatus},
    timers::{TimerSlot, TimerTask},
    windows::ReactionWindow,
};
use crate::bot::{decision::DecisionAction, rules::BotEvent};

impl RoundEngine {
    /// Decide now, act after the computer's think time.
    pub(super) fn schedule_computer(&mut self, game: &Game, player_id: &str, event: BotEvent) {
        let decision = self.decisions.decide(event, game, player_id);
        log::debug!(
            "Room {}: {} plans {:?} in {:?} ({})",
            self.room_id,
            player_id,
            decision.action,
            decision.delay,
            decision.reasoning
        );
        self.scheduler.schedule(
            TimerSlot::Computer(player_id.to_string()),
            decision.delay,
            TimerTask::ComputerAction {
                player_id: player_id.to_string(),
                event,
                action: decision.action,
            },
        );
    }

    /// Run a computer action whose think time has elapsed. Failures are
    /// logged and replaced by the safe default for the event.
    pub(super) fn execute_computer_action(
        &mut self,
        game: &mut Game,
        player_id: &str,
        event: BotEvent,
        action: DecisionAction,
    ) {
        if !game
            .player(player_id)
            .is_some_and(|p| p.is_active && !p.is_human)
        {
            self.pending_reactions.remove(player_id);
            return;
        }

        self.quiet = true;
        match event {
            BotEvent::DrawCard => self.computer_draw(game, player_id, action),
            BotEvent::PlayCard => self.computer_play(game, player_id, action),
            BotEvent::SameRankPlay => self.computer_react(game, player_id, action),
            BotEvent::JackSwap | BotEvent::QueenPeek => {
                self.computer_special(game, player_id, action);
            }
            BotEvent::CollectFromDiscard => {
                if action == DecisionAction::Collect {
                    self.collect_from_discard(game, player_id);
                }
            }
        }
        self.quiet = false;
    }

    fn holds_turn(game: &Game, player_id: &str, status: PlayerStatus) -> bool {
        game.is_current(player_id)
            && game
                .player(player_id)
                .is_some_and(|p| p.status == status)
    }

    fn computer_draw(&mut self, game: &mut Game, player_id: &str, action: DecisionAction) {
        if !Self::holds_turn(game, player_id, PlayerStatus::DrawingCard) {
            return;
        }
        let source = match action {
            DecisionAction::Draw { source } => source,
            _ => DrawSource::Deck,
        };
        if self.draw_card(game, player_id, source) {
            return;
        }
        if source == DrawSource::Discard && self.draw_card(game, player_id, DrawSource::Deck) {
            return;
        }
        log::warn!("Room {}: {} could not draw, passing the turn", self.room_id, player_id);
        self.move_to_next_player(game);
    }

    fn computer_play(&mut self, game: &mut Game, player_id: &str, action: DecisionAction) {
        if !Self::holds_turn(game, player_id, PlayerStatus::PlayingCard) {
            return;
        }
        if let DecisionAction::Play { card_id } = &action
            && self.play_card(game, player_id, card_id)
        {
            return;
        }
        log::debug!("Room {}: {} falls back to its drawn card", self.room_id, player_id);
        self.auto_play_drawn(game, player_id);
    }

    fn computer_react(&mut self, game: &mut Game, player_id: &str, action: DecisionAction) {
        self.pending_reactions.remove(player_id);
        if self.window != ReactionWindow::SameRank {
            return;
        }
        if let DecisionAction::SameRank { card_id } = &action {
            self.same_rank_play(game, player_id, card_id);
        }
        self.maybe_close_same_rank_early(game);
    }

    fn computer_special(&mut self, game: &mut Game, player_id: &str, action: DecisionAction) {
        if self.window.special_owner() != Some(player_id) {
            return;
        }
        let used = match &action {
            DecisionAction::JackSwap {
                first_card_id,
                first_player_id,
                second_card_id,
                second_player_id,
            } => self.jack_swap(
                game,
                player_id,
                first_card_id,
                first_player_id,
                second_card_id,
                second_player_id,
            ),
            DecisionAction::QueenPeek {
                card_id,
                player_id: target,
            } => self.queen_peek(game, player_id, card_id, target),
            _ => false,
        };
        if !used {
            self.complete_special_card(game, None);
        }
    }

    /// Before a turn opens, computers claim the discard top for their
    /// collection while it matches.
    pub(super) fn computer_collection_sweep(&mut self, game: &mut Game) {
        if !game.collection_mode {
            return;
        }
        let computers: Vec<PlayerId> = game
            .active_players()
            .filter(|p| !p.is_human)
            .map(|p| p.id.clone())
            .collect();

        for _ in 0..computers.len() * MAX_COLLECTION_CARDS {
            let mut collected = false;
            for player_id in &computers {
                if game.is_ended() {
                    return;
                }
                let decision = self
                    .decisions
                    .decide(BotEvent::CollectFromDiscard, game, player_id);
                if decision.action == DecisionAction::Collect {
                    self.quiet = true;
                    collected |= self.collect_from_discard(game, player_id);
                    self.quiet = false;
                }
            }
            if !collected {
                break;
            }
        }
    }
}
