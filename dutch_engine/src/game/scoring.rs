//! End-of-round scoring.

use serde::{Deserialize, Serialize};

use super::{
    directory,
    entities::{Card, Game, Player, PlayerId, WinType, WinnerRecord},
};

/// Points and remaining card count for one player.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Score {
    pub points: u32,
    pub card_count: usize,
}

/// The collection set counts once, as the rounded average of its cards;
/// every other hand card counts its own points.
#[must_use]
pub fn score_player(game: &Game, player: &Player) -> Score {
    let collection_points = if player.collection_cards.is_empty() {
        0
    } else {
        let total: u32 = player
            .collection_cards
            .iter()
            .map(|c| u32::from(c.points))
            .sum();
        (f64::from(total) / player.collection_cards.len() as f64).round() as u32
    };

    let hand_points: u32 = player
        .hand
        .iter()
        .flatten()
        .filter(|id| !player.is_collection_card(id))
        .filter_map(|id| match directory::card_by_id(game, id) {
            Some(card) => Some(u32::from(card.points)),
            None => {
                log::error!(
                    "Room {}: card {} in {}'s hand is not in the deck",
                    game.room_id,
                    id,
                    player.id
                );
                None
            }
        })
        .sum();

    Score {
        points: collection_points + hand_points,
        card_count: player.card_count(),
    }
}

/// Lowest score wins, card count breaks ties. A final-round caller inside
/// the tied group wins alone; otherwise the tied players share the win.
#[must_use]
pub fn lowest_points_winners(game: &Game) -> Vec<WinnerRecord> {
    let mut scored: Vec<(&Player, Score)> = game
        .active_players()
        .map(|p| (p, score_player(game, p)))
        .collect();
    scored.sort_by_key(|(_, score)| *score);

    let Some(best) = scored.first().map(|(_, score)| *score) else {
        return Vec::new();
    };
    let tied: Vec<&(&Player, Score)> = scored.iter().filter(|(_, s)| *s == best).collect();

    let caller = game.final_round_caller.as_deref();
    let caller_entry = tied
        .iter()
        .copied()
        .find(|(p, _)| Some(p.id.as_str()) == caller);
    let winners = match caller_entry {
        Some(entry) if tied.len() > 1 => vec![entry],
        _ => tied,
    };

    winners
        .into_iter()
        .map(|(player, score)| WinnerRecord {
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            win_type: WinType::LowestPoints,
            points: Some(score.points),
            card_count: Some(score.card_count),
        })
        .collect()
}

/// A player's hand revealed at the end of a round.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerResult {
    pub player_id: PlayerId,
    pub name: String,
    pub is_active: bool,
    pub points: u32,
    pub card_count: usize,
    pub cards: Vec<Card>,
}

#[must_use]
pub fn final_results(game: &Game) -> Vec<PlayerResult> {
    game.players
        .iter()
        .map(|player| {
            let score = score_player(game, player);
            PlayerResult {
                player_id: player.id.clone(),
                name: player.name.clone(),
                is_active: player.is_active,
                points: score.points,
                card_count: score.card_count,
                cards: player
                    .hand
                    .iter()
                    .flatten()
                    .filter_map(|id| directory::resolve(game, id))
                    .collect(),
            }
        })
        .collect()
}
