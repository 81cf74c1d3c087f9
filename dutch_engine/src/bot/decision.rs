//! Turns a rule table and a player's memory into concrete actions.

use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    models::DifficultyParams,
    rules::{BotEvent, Knowledge, RuleAction, RuleTable},
};
use crate::game::entities::{CardId, DrawSource, Game, PlayerId};

/// A concrete engine call a computer player wants to make.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DecisionAction {
    Draw {
        source: DrawSource,
    },
    Play {
        card_id: CardId,
    },
    SameRank {
        card_id: CardId,
    },
    Pass,
    JackSwap {
        first_card_id: CardId,
        first_player_id: PlayerId,
        second_card_id: CardId,
        second_player_id: PlayerId,
    },
    QueenPeek {
        card_id: CardId,
        player_id: PlayerId,
    },
    Collect,
    Skip,
}

impl DecisionAction {
    /// Actions that resolve immediately instead of being scheduled.
    #[must_use]
    pub fn is_passive(&self) -> bool {
        matches!(self, Self::Pass | Self::Skip)
    }
}

/// One decision: what to do, how long to "think" first, and why.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub action: DecisionAction,
    pub delay: Duration,
    pub reasoning: String,
}

/// Bot decision maker
pub struct DecisionMaker {
    /// Strategy rules; `None` falls back to draw-then-play
    rules: Option<RuleTable>,
    /// Random number generator
    rng: StdRng,
    /// Multiplier for think times
    delay_scale: f32,
}

impl DecisionMaker {
    /// Create a decision maker with the built-in rules
    pub fn new() -> Self {
        Self::with_rules(Some(RuleTable::standard()), StdRng::from_os_rng())
    }

    pub fn with_rules(rules: Option<RuleTable>, rng: StdRng) -> Self {
        Self {
            rules,
            rng,
            delay_scale: 1.0,
        }
    }

    #[must_use]
    pub fn with_delay_scale(mut self, scale: f32) -> Self {
        self.delay_scale = scale.max(0.0);
        self
    }

    pub fn set_rules(&mut self, rules: Option<RuleTable>) {
        self.rules = rules;
    }

    /// Decide what `player_id` does for `event`.
    ///
    /// Never fails: when the player is missing, no table is loaded, or no
    /// rule fires, the event's fallback is returned.
    pub fn decide(&mut self, event: BotEvent, game: &Game, player_id: &str) -> Decision {
        let Some(me) = game.player(player_id) else {
            return Decision {
                action: DecisionAction::Skip,
                delay: Duration::ZERO,
                reasoning: format!("{player_id} is not seated"),
            };
        };
        let knowledge = Knowledge::new(game, me);
        let delay = DifficultyParams::from_difficulty(me.difficulty)
            .think_time(&mut self.rng, self.delay_scale);

        let rules = match self.rules.as_ref() {
            Some(table) if !table.is_empty() => table.rules_for(event).to_vec(),
            _ => {
                return Decision {
                    action: self.fallback(event, &knowledge),
                    delay,
                    reasoning: format!("{event}: no strategy rules loaded"),
                };
            }
        };

        for rule in &rules {
            if !rule.condition.holds(&knowledge) {
                continue;
            }
            let p = rule.probability.for_difficulty(me.difficulty);
            if !self.rng.random_bool(p) {
                continue;
            }
            if let Some(action) = self.resolve(rule.action, &knowledge) {
                log::debug!("{} chose {:?} via rule '{}'", me.id, action, rule.name);
                return Decision {
                    action,
                    delay,
                    reasoning: format!("{event}: rule '{}'", rule.name),
                };
            }
        }

        Decision {
            action: self.fallback(event, &knowledge),
            delay,
            reasoning: format!("{event}: no rule fired"),
        }
    }

    /// Draw from the deck, play what was drawn, pass on everything else.
    fn fallback(&mut self, event: BotEvent, knowledge: &Knowledge) -> DecisionAction {
        match event {
            BotEvent::DrawCard => DecisionAction::Draw {
                source: DrawSource::Deck,
            },
            BotEvent::PlayCard => self
                .resolve(RuleAction::PlayDrawnCard, knowledge)
                .or_else(|| self.resolve(RuleAction::PlayRandom, knowledge))
                .unwrap_or(DecisionAction::Skip),
            BotEvent::SameRankPlay | BotEvent::CollectFromDiscard => DecisionAction::Pass,
            BotEvent::JackSwap | BotEvent::QueenPeek => DecisionAction::Skip,
        }
    }

    fn resolve(&mut self, action: RuleAction, knowledge: &Knowledge) -> Option<DecisionAction> {
        let me = knowledge.me;
        match action {
            RuleAction::DrawFromDeck => Some(DecisionAction::Draw {
                source: DrawSource::Deck,
            }),
            RuleAction::DrawFromDiscard => knowledge.discard_top().map(|_| DecisionAction::Draw {
                source: DrawSource::Discard,
            }),
            RuleAction::PlayHighestKnown => knowledge
                .known_own()
                .into_iter()
                .max_by_key(|c| c.points)
                .map(|c| DecisionAction::Play {
                    card_id: c.card_id.clone(),
                }),
            RuleAction::PlayDrawnCard => me.drawn_card.as_ref().map(|c| DecisionAction::Play {
                card_id: c.card_id.clone(),
            }),
            RuleAction::PlayKnownSpecial => knowledge
                .known_own()
                .into_iter()
                .find(|c| c.rank.power().is_some())
                .map(|c| DecisionAction::Play {
                    card_id: c.card_id.clone(),
                }),
            RuleAction::PlayRandom => {
                let playable = playable_ids(knowledge);
                playable
                    .choose(&mut self.rng)
                    .map(|id| DecisionAction::Play { card_id: id.clone() })
            }
            RuleAction::PlayMatchingRank => knowledge
                .known_matching_discard()
                .first()
                .map(|c| DecisionAction::SameRank {
                    card_id: c.card_id.clone(),
                }),
            RuleAction::PlayWrongCard => {
                let matching: Vec<&CardId> = knowledge
                    .known_matching_discard()
                    .into_iter()
                    .map(|c| &c.card_id)
                    .collect();
                let candidates: Vec<CardId> = playable_ids(knowledge)
                    .into_iter()
                    .filter(|id| !matching.contains(&id))
                    .collect();
                candidates
                    .choose(&mut self.rng)
                    .map(|id| DecisionAction::SameRank { card_id: id.clone() })
            }
            RuleAction::Pass => Some(DecisionAction::Pass),
            RuleAction::SwapHighestOwnForLowestOpponent => {
                let own = knowledge
                    .known_own()
                    .into_iter()
                    .filter(|c| me.holds(&c.card_id))
                    .max_by_key(|c| c.points)?;
                let (owner, theirs) = knowledge
                    .known_opponent_cards()
                    .into_iter()
                    .min_by_key(|(_, c)| c.points)?;
                (theirs.points < own.points).then(|| DecisionAction::JackSwap {
                    first_card_id: own.card_id.clone(),
                    first_player_id: me.id.clone(),
                    second_card_id: theirs.card_id.clone(),
                    second_player_id: owner.clone(),
                })
            }
            RuleAction::SwapRandom => {
                let own = playable_ids(knowledge).choose(&mut self.rng).cloned()?;
                let targets = opponent_targets(knowledge);
                let (owner, theirs) = targets.choose(&mut self.rng)?;
                Some(DecisionAction::JackSwap {
                    first_card_id: own,
                    first_player_id: me.id.clone(),
                    second_card_id: theirs.clone(),
                    second_player_id: owner.clone(),
                })
            }
            RuleAction::Skip => Some(DecisionAction::Skip),
            RuleAction::PeekUnknownOwn => {
                let unknown = knowledge.unknown_own();
                unknown.choose(&mut self.rng).map(|id| DecisionAction::QueenPeek {
                    card_id: (*id).clone(),
                    player_id: me.id.clone(),
                })
            }
            RuleAction::PeekRandomOpponent => {
                let known: Vec<&CardId> = knowledge
                    .known_opponent_cards()
                    .into_iter()
                    .map(|(_, c)| &c.card_id)
                    .collect();
                let targets: Vec<(PlayerId, CardId)> = opponent_targets(knowledge)
                    .into_iter()
                    .filter(|(_, id)| !known.contains(&id))
                    .collect();
                targets
                    .choose(&mut self.rng)
                    .map(|(owner, id)| DecisionAction::QueenPeek {
                        card_id: id.clone(),
                        player_id: owner.clone(),
                    })
            }
            RuleAction::Collect => knowledge
                .discard_matches_collection()
                .then_some(DecisionAction::Collect),
        }
    }
}

impl Default for DecisionMaker {
    fn default() -> Self {
        Self::new()
    }
}

/// Own hand cards that may legally leave the hand.
fn playable_ids(knowledge: &Knowledge) -> Vec<CardId> {
    let me = knowledge.me;
    me.hand
        .iter()
        .flatten()
        .filter(|id| !me.is_collection_card(id))
        .cloned()
        .collect()
}

/// Every non-collection card held by another active player.
fn opponent_targets(knowledge: &Knowledge) -> Vec<(PlayerId, CardId)> {
    knowledge
        .game
        .active_players()
        .filter(|p| p.id != knowledge.me.id)
        .flat_map(|p| {
            p.hand
                .iter()
                .flatten()
                .filter(|id| !p.is_collection_card(id))
                .map(|id| (p.id.clone(), id.clone()))
        })
        .collect()
}
