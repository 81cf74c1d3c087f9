//! Card id lookups against a room's original deck.

use super::entities::{Card, Game};

/// Full definition of `card_id`, if it belongs to this room's deck.
#[must_use]
pub fn card_by_id<'a>(game: &'a Game, card_id: &str) -> Option<&'a Card> {
    game.original_deck.iter().find(|c| c.card_id == card_id)
}

/// Owned variant for callers that need to move the card around.
#[must_use]
pub fn resolve(game: &Game, card_id: &str) -> Option<Card> {
    card_by_id(game, card_id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::build_deck;

    #[test]
    fn test_lookup_uses_original_deck() {
        let mut game = Game::new("room");
        game.original_deck = build_deck(false);
        let wanted = game.original_deck[10].clone();

        assert_eq!(card_by_id(&game, &wanted.card_id), Some(&wanted));
        assert!(card_by_id(&game, "card_missing").is_none());
    }
}
