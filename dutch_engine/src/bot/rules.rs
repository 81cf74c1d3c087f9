//! Declarative strategy rules for computer opponents.
//!
//! A [`RuleTable`] lists, per decision event, ordered `condition -> action`
//! rules with a firing probability for each difficulty. The table is plain
//! data: an external loader can deserialize it from any serde format, and
//! [`RuleTable::standard`] provides the built-in strategy.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    game::entities::{Card, CardId, Game, Player, PlayerId},
    room::config::Difficulty,
};

/// Decision points a computer player is asked about.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BotEvent {
    DrawCard,
    PlayCard,
    SameRankPlay,
    JackSwap,
    QueenPeek,
    CollectFromDiscard,
}

impl fmt::Display for BotEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::DrawCard => "draw_card",
            Self::PlayCard => "play_card",
            Self::SameRankPlay => "same_rank_play",
            Self::JackSwap => "jack_swap",
            Self::QueenPeek => "queen_peek",
            Self::CollectFromDiscard => "collect_from_discard",
        };
        write!(f, "{repr}")
    }
}

/// Chance that a matching rule fires, per difficulty.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct DifficultyWeights {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
    pub expert: f64,
}

impl DifficultyWeights {
    pub const ALWAYS: Self = Self::uniform(1.0);

    #[must_use]
    pub const fn uniform(p: f64) -> Self {
        Self {
            easy: p,
            medium: p,
            hard: p,
            expert: p,
        }
    }

    #[must_use]
    pub const fn new(easy: f64, medium: f64, hard: f64, expert: f64) -> Self {
        Self {
            easy,
            medium,
            hard,
            expert,
        }
    }

    #[must_use]
    pub fn for_difficulty(&self, difficulty: Difficulty) -> f64 {
        let p = match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
            Difficulty::Expert => self.expert,
        };
        p.clamp(0.0, 1.0)
    }
}

impl Default for DifficultyWeights {
    fn default() -> Self {
        Self::ALWAYS
    }
}

/// Predicate over what the deciding player can legitimately know.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    #[default]
    Always,
    DiscardTopMaxPoints {
        max: u8,
    },
    DrawnCardMinPoints {
        min: u8,
    },
    HasKnownOwnCardAbove {
        points: u8,
    },
    HasKnownOwnSpecialCard,
    HasKnownMatchingRank,
    HasUnknownOwnCard,
    KnowsOpponentCardBelow {
        points: u8,
    },
    DiscardMatchesCollectionRank,
    All {
        conditions: Vec<Condition>,
    },
    Any {
        conditions: Vec<Condition>,
    },
    Not {
        condition: Box<Condition>,
    },
}

impl Condition {
    #[must_use]
    pub fn holds(&self, knowledge: &Knowledge) -> bool {
        match self {
            Self::Always => true,
            Self::DiscardTopMaxPoints { max } => knowledge
                .discard_top()
                .is_some_and(|card| card.points <= *max),
            Self::DrawnCardMinPoints { min } => knowledge
                .me
                .drawn_card
                .as_ref()
                .is_some_and(|card| card.points >= *min),
            Self::HasKnownOwnCardAbove { points } => {
                knowledge.known_own().iter().any(|c| c.points > *points)
            }
            Self::HasKnownOwnSpecialCard => knowledge
                .known_own()
                .iter()
                .any(|c| c.rank.power().is_some()),
            Self::HasKnownMatchingRank => !knowledge.known_matching_discard().is_empty(),
            Self::HasUnknownOwnCard => !knowledge.unknown_own().is_empty(),
            Self::KnowsOpponentCardBelow { points } => knowledge
                .known_opponent_cards()
                .iter()
                .any(|(_, c)| c.points < *points),
            Self::DiscardMatchesCollectionRank => knowledge.discard_matches_collection(),
            Self::All { conditions } => conditions.iter().all(|c| c.holds(knowledge)),
            Self::Any { conditions } => conditions.iter().any(|c| c.holds(knowledge)),
            Self::Not { condition } => !condition.holds(knowledge),
        }
    }
}

/// What a fired rule asks the decision maker to do.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    DrawFromDeck,
    DrawFromDiscard,
    PlayHighestKnown,
    PlayDrawnCard,
    PlayKnownSpecial,
    PlayRandom,
    PlayMatchingRank,
    /// Attempt a same-rank play with a card not known to match.
    PlayWrongCard,
    Pass,
    SwapHighestOwnForLowestOpponent,
    SwapRandom,
    Skip,
    PeekUnknownOwn,
    PeekRandomOpponent,
    Collect,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub condition: Condition,
    pub action: RuleAction,
    #[serde(default)]
    pub probability: DifficultyWeights,
}

impl Rule {
    #[must_use]
    pub fn new(
        name: &str,
        condition: Condition,
        action: RuleAction,
        probability: DifficultyWeights,
    ) -> Self {
        Self {
            name: name.to_string(),
            condition,
            action,
            probability,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RuleTable {
    #[serde(default)]
    pub draw_card: Vec<Rule>,
    #[serde(default)]
    pub play_card: Vec<Rule>,
    #[serde(default)]
    pub same_rank_play: Vec<Rule>,
    #[serde(default)]
    pub jack_swap: Vec<Rule>,
    #[serde(default)]
    pub queen_peek: Vec<Rule>,
    #[serde(default)]
    pub collect_from_discard: Vec<Rule>,
}

impl RuleTable {
    #[must_use]
    pub fn rules_for(&self, event: BotEvent) -> &[Rule] {
        match event {
            BotEvent::DrawCard => &self.draw_card,
            BotEvent::PlayCard => &self.play_card,
            BotEvent::SameRankPlay => &self.same_rank_play,
            BotEvent::JackSwap => &self.jack_swap,
            BotEvent::QueenPeek => &self.queen_peek,
            BotEvent::CollectFromDiscard => &self.collect_from_discard,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.draw_card.is_empty()
            && self.play_card.is_empty()
            && self.same_rank_play.is_empty()
            && self.jack_swap.is_empty()
            && self.queen_peek.is_empty()
            && self.collect_from_discard.is_empty()
    }

    /// Built-in strategy used when no table is supplied by configuration.
    #[must_use]
    pub fn standard() -> Self {
        use Condition::*;
        use RuleAction::*;

        Self {
            draw_card: vec![
                Rule::new(
                    "take_low_discard",
                    DiscardTopMaxPoints { max: 3 },
                    DrawFromDiscard,
                    DifficultyWeights::new(0.3, 0.6, 0.8, 0.9),
                ),
                Rule::new("draw_from_deck", Always, DrawFromDeck, DifficultyWeights::ALWAYS),
            ],
            play_card: vec![
                Rule::new(
                    "use_special_power",
                    HasKnownOwnSpecialCard,
                    PlayKnownSpecial,
                    DifficultyWeights::new(0.2, 0.4, 0.6, 0.7),
                ),
                Rule::new(
                    "dump_highest_known",
                    HasKnownOwnCardAbove { points: 5 },
                    PlayHighestKnown,
                    DifficultyWeights::new(0.5, 0.7, 0.9, 1.0),
                ),
                Rule::new(
                    "play_blind",
                    All {
                        conditions: vec![
                            HasUnknownOwnCard,
                            Not {
                                condition: Box::new(DrawnCardMinPoints { min: 6 }),
                            },
                        ],
                    },
                    PlayRandom,
                    DifficultyWeights::new(0.15, 0.05, 0.0, 0.0),
                ),
                Rule::new("play_drawn", Always, PlayDrawnCard, DifficultyWeights::ALWAYS),
            ],
            same_rank_play: vec![
                Rule::new(
                    "misplay",
                    HasKnownMatchingRank,
                    PlayWrongCard,
                    DifficultyWeights::new(0.10, 0.05, 0.02, 0.0),
                ),
                Rule::new(
                    "match_known_rank",
                    HasKnownMatchingRank,
                    PlayMatchingRank,
                    DifficultyWeights::new(0.6, 0.8, 0.9, 1.0),
                ),
                Rule::new("pass", Always, Pass, DifficultyWeights::ALWAYS),
            ],
            jack_swap: vec![
                Rule::new(
                    "give_away_high",
                    All {
                        conditions: vec![
                            HasKnownOwnCardAbove { points: 6 },
                            KnowsOpponentCardBelow { points: 5 },
                        ],
                    },
                    SwapHighestOwnForLowestOpponent,
                    DifficultyWeights::new(0.4, 0.6, 0.8, 1.0),
                ),
                Rule::new(
                    "random_swap",
                    Always,
                    SwapRandom,
                    DifficultyWeights::new(0.3, 0.3, 0.2, 0.1),
                ),
                Rule::new("skip", Always, Skip, DifficultyWeights::ALWAYS),
            ],
            queen_peek: vec![
                Rule::new(
                    "peek_own",
                    HasUnknownOwnCard,
                    PeekUnknownOwn,
                    DifficultyWeights::new(0.6, 0.7, 0.8, 0.9),
                ),
                Rule::new(
                    "peek_opponent",
                    Always,
                    PeekRandomOpponent,
                    DifficultyWeights::ALWAYS,
                ),
            ],
            collect_from_discard: vec![Rule::new(
                "collect_matching",
                DiscardMatchesCollectionRank,
                Collect,
                DifficultyWeights::new(0.8, 0.9, 1.0, 1.0),
            )],
        }
    }
}

/// What one player can see and remember right now.
#[derive(Clone, Copy, Debug)]
pub struct Knowledge<'a> {
    pub game: &'a Game,
    pub me: &'a Player,
}

impl<'a> Knowledge<'a> {
    #[must_use]
    pub fn new(game: &'a Game, me: &'a Player) -> Self {
        Self { game, me }
    }

    #[must_use]
    pub fn discard_top(&self) -> Option<&'a Card> {
        self.game.discard_top()
    }

    /// Own playable cards whose value is known: remembered hand cards plus
    /// the drawn card.
    #[must_use]
    pub fn known_own(&self) -> Vec<&'a Card> {
        let me = self.me;
        let mut cards: Vec<&Card> = me
            .memory_of(&me.id)
            .map(|known| {
                known
                    .values()
                    .filter(|c| me.holds(&c.card_id) && !me.is_collection_card(&c.card_id))
                    .collect()
            })
            .unwrap_or_default();
        if let Some(drawn) = me.drawn_card.as_ref()
            && !cards.iter().any(|c| c.card_id == drawn.card_id)
        {
            cards.push(drawn);
        }
        cards
    }

    /// Own playable hand cards the player cannot recall.
    #[must_use]
    pub fn unknown_own(&self) -> Vec<&'a CardId> {
        let me = self.me;
        let known = me.memory_of(&me.id);
        let drawn_id = me.drawn_card.as_ref().map(|c| c.card_id.as_str());
        me.hand
            .iter()
            .flatten()
            .filter(|id| !me.is_collection_card(id))
            .filter(|id| Some(id.as_str()) != drawn_id)
            .filter(|id| known.is_none_or(|k| !k.contains_key(*id)))
            .collect()
    }

    #[must_use]
    pub fn known_matching_discard(&self) -> Vec<&'a Card> {
        let Some(top) = self.discard_top() else {
            return Vec::new();
        };
        self.known_own()
            .into_iter()
            .filter(|c| c.rank == top.rank)
            .collect()
    }

    /// Remembered cards still sitting in active opponents' hands.
    #[must_use]
    pub fn known_opponent_cards(&self) -> Vec<(&'a PlayerId, &'a Card)> {
        let game = self.game;
        self.me
            .known_cards
            .iter()
            .filter(|(owner, _)| **owner != self.me.id)
            .filter_map(|(owner, cards)| {
                game.player(owner)
                    .filter(|p| p.is_active)
                    .map(|p| (owner, p, cards))
            })
            .flat_map(|(owner, holder, cards)| {
                cards
                    .values()
                    .filter(move |c| {
                        holder.holds(&c.card_id) && !holder.is_collection_card(&c.card_id)
                    })
                    .map(move |c| (owner, c))
            })
            .collect()
    }

    #[must_use]
    pub fn discard_matches_collection(&self) -> bool {
        match (self.discard_top(), self.me.collection_rank) {
            (Some(top), Some(rank)) => top.rank == rank && !self.me.is_collection_card(&top.card_id),
            _ => false,
        }
    }
}
