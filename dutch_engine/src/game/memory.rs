//! Imperfect-recall bookkeeping for every player's known cards.
//!
//! Each seat keeps a map of cards it has seen, keyed by the current holder.
//! Whenever a tracked card is played, swapped or peeked, each tracker keeps
//! the updated entry only with its difficulty's remember probability. Humans
//! always remember.

use rand::Rng;

use super::entities::{Card, Game, PlayerId};
use crate::bot::models::DifficultyParams;

/// Probability that `player_id` keeps a card it just saw or tracked.
#[must_use]
pub fn remember_probability(game: &Game, player_id: &str) -> f64 {
    match game.player(player_id) {
        Some(player) if player.is_human => 1.0,
        Some(player) => DifficultyParams::from_difficulty(player.difficulty).remember_probability,
        None => 0.0,
    }
}

fn recalls<R: Rng + ?Sized>(game: &Game, player_id: &str, rng: &mut R) -> bool {
    let p = remember_probability(game, player_id).clamp(0.0, 1.0);
    rng.random_bool(p)
}

/// `player_id` looks at `card` held by `owner`.
pub fn record_sighting<R: Rng + ?Sized>(
    game: &mut Game,
    player_id: &str,
    owner: &str,
    card: &Card,
    rng: &mut R,
) -> bool {
    if !recalls(game, player_id, rng) {
        log::debug!("{} failed to memorise {}", player_id, card.card_id);
        return false;
    }
    match game.player_mut(player_id) {
        Some(player) => {
            player.remember(owner, card.clone());
            true
        }
        None => false,
    }
}

/// A card left a hand for the discard pile: nobody tracks it in a hand
/// anymore. When the player kept their drawn card instead, they remember it
/// in its new slot with their usual probability.
pub fn on_card_played<R: Rng + ?Sized>(
    game: &mut Game,
    actor: &str,
    played_card_id: &str,
    kept_drawn: Option<&Card>,
    rng: &mut R,
) {
    for player in &mut game.players {
        player.forget(played_card_id);
    }
    if let Some(drawn) = kept_drawn {
        let owner = actor.to_string();
        record_sighting(game, actor, &owner, drawn, rng);
    }
}

/// Two cards changed hands. Every tracker of either card keeps following
/// it to its new holder with their remember probability, or loses it.
pub fn on_cards_swapped<R: Rng + ?Sized>(
    game: &mut Game,
    first: (&str, &str),
    second: (&str, &str),
    rng: &mut R,
) {
    let (first_card, first_owner) = first;
    let (second_card, second_owner) = second;
    let trackers: Vec<PlayerId> = game.players.iter().map(|p| p.id.clone()).collect();

    for tracker in trackers {
        for (card_id, new_owner) in [(first_card, second_owner), (second_card, first_owner)] {
            let Some(player) = game.player_mut(&tracker) else {
                continue;
            };
            let Some((_, card)) = player.forget(card_id) else {
                continue;
            };
            if recalls(game, &tracker, rng)
                && let Some(player) = game.player_mut(&tracker)
            {
                player.remember(new_owner, card);
            }
        }
    }
}

/// Initial peek: `player_id` memorises the listed own cards.
pub fn on_initial_peek<R: Rng + ?Sized>(
    game: &mut Game,
    player_id: &str,
    cards: &[Card],
    rng: &mut R,
) -> usize {
    let owner = player_id.to_string();
    cards
        .iter()
        .filter(|card| record_sighting(game, player_id, &owner, card, rng))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Player, Rank, Suit};
    use crate::room::config::Difficulty;
    use rand::{SeedableRng, rngs::StdRng};

    fn game() -> Game {
        let mut game = Game::new("room");
        game.players.push(Player::human("human", "Hana"));
        game.players.push(Player::computer("easy", "Bot", Difficulty::Easy));
        game.players.push(Player::computer("expert", "Ace", Difficulty::Expert));
        game
    }

    #[test]
    fn test_remember_probability_by_difficulty() {
        let game = game();
        assert_eq!(remember_probability(&game, "human"), 1.0);
        assert_eq!(remember_probability(&game, "easy"), 0.70);
        assert_eq!(remember_probability(&game, "expert"), 1.0);
        assert_eq!(remember_probability(&game, "nobody"), 0.0);
    }

    #[test]
    fn test_played_card_is_forgotten_by_everyone() {
        let mut game = game();
        let mut rng = StdRng::seed_from_u64(7);
        let card = Card::new("c1", Rank::Six, Suit::Clubs);
        for id in ["human", "easy", "expert"] {
            game.player_mut(id).unwrap().remember("human", card.clone());
        }

        on_card_played(&mut game, "human", "c1", None, &mut rng);
        assert!(game.players.iter().all(|p| p.known_cards.is_empty()));
    }

    #[test]
    fn test_kept_drawn_card_is_remembered_by_certain_players() {
        let mut game = game();
        let mut rng = StdRng::seed_from_u64(7);
        let drawn = Card::new("c2", Rank::Two, Suit::Hearts);

        on_card_played(&mut game, "expert", "c1", Some(&drawn), &mut rng);
        let known = game.player("expert").unwrap().memory_of("expert").unwrap();
        assert!(known.contains_key("c2"));
    }

    #[test]
    fn test_swap_moves_tracked_cards_to_new_owner() {
        let mut game = game();
        let mut rng = StdRng::seed_from_u64(1);
        let a = Card::new("a", Rank::King, Suit::Spades);
        let b = Card::new("b", Rank::Ace, Suit::Spades);
        let expert = game.player_mut("expert").unwrap();
        expert.remember("human", a.clone());
        expert.remember("easy", b.clone());

        on_cards_swapped(&mut game, ("a", "human"), ("b", "easy"), &mut rng);

        let expert = game.player("expert").unwrap();
        assert!(expert.memory_of("easy").unwrap().contains_key("a"));
        assert!(expert.memory_of("human").unwrap().contains_key("b"));
    }

    #[test]
    fn test_easy_players_sometimes_forget() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut remembered = 0;
        for i in 0..500 {
            let mut game = game();
            let card = Card::new(format!("c{i}"), Rank::Four, Suit::Clubs);
            if record_sighting(&mut game, "easy", "human", &card, &mut rng) {
                remembered += 1;
            }
        }
        assert!(remembered > 250 && remembered < 450, "remembered {remembered}");
    }
}
