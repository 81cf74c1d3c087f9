/// Property-based tests for round invariants using proptest
///
/// Every seeded round of computer players is stepped one timer at a time
/// and checked for card conservation and broadcast hygiene.
use dutch_engine::{
    game::{Card, DrawSource, Game, Phase, Player, Rank, RoundEngine, Scheduler, Suit},
    room::{
        Difficulty, EngineTimings, RecordingCallbacks, RoomConfig, RoomEvent, TimerConfig,
    },
};
use proptest::prelude::*;
use std::{collections::HashSet, sync::Arc};

fn difficulty_strategy() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::Easy),
        Just(Difficulty::Medium),
        Just(Difficulty::Hard),
        Just(Difficulty::Expert),
    ]
}

// A seed, the seats, and the room variant
fn table_strategy() -> impl Strategy<Value = (u64, Vec<Difficulty>, bool, bool)> {
    (
        any::<u64>(),
        prop::collection::vec(difficulty_strategy(), 2..=6),
        any::<bool>(),
        any::<bool>(),
    )
}

fn setup(
    seed: u64,
    seats: &[Difficulty],
    collection_mode: bool,
    include_jokers: bool,
) -> (RoundEngine, Game, Arc<RecordingCallbacks>) {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let config = RoomConfig {
        max_players: 8,
        collection_mode,
        include_jokers,
        timings: EngineTimings::instant(),
        ..Default::default()
    };
    let engine =
        RoundEngine::new("room", config, callbacks.clone(), Scheduler::manual()).with_seed(seed);

    let mut game = Game::new("room");
    for (i, difficulty) in seats.iter().enumerate() {
        game.players
            .push(Player::computer(format!("bot_{i}"), format!("Bot {i}"), *difficulty));
    }
    (engine, game, callbacks)
}

/// Every card of the deck sits in exactly one place.
fn conserved(game: &Game) -> Result<(), String> {
    let mut seen = HashSet::new();
    let held = game.players.iter().flat_map(|p| p.hand.iter().flatten());
    for card_id in held.chain(game.draw_pile.iter()) {
        if !seen.insert(card_id.clone()) {
            return Err(format!("{card_id} appears twice"));
        }
    }
    for card in &game.discard_pile {
        if !seen.insert(card.card_id.clone()) {
            return Err(format!("{} appears twice", card.card_id));
        }
    }
    if seen.len() != game.original_deck.len() {
        return Err(format!(
            "{} cards placed, deck has {}",
            seen.len(),
            game.original_deck.len()
        ));
    }
    Ok(())
}

fn play_out(engine: &mut RoundEngine, game: &mut Game) -> Result<(), String> {
    for _ in 0..5000 {
        if game.is_ended() || engine.scheduler().pending_count() == 0 {
            break;
        }
        engine.fire_next_timer(game);
        conserved(game)?;
        for player in &game.players {
            if player.collection_cards.len() > 4 {
                return Err(format!("{} collected too many cards", player.id));
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_round_conserves_cards_and_ends((seed, seats, collection, jokers) in table_strategy()) {
        let (mut engine, mut game, callbacks) = setup(seed, &seats, collection, jokers);
        prop_assert!(engine.start_round(&mut game));
        prop_assert!(conserved(&game).is_ok());

        let caller = game.current_player.clone().unwrap();
        prop_assert!(engine.call_final_round(&mut game, &caller));

        let result = play_out(&mut engine, &mut game);
        prop_assert!(result.is_ok(), "{:?}", result);
        prop_assert!(game.is_ended());
        prop_assert!(!game.winners.is_empty());
        prop_assert_eq!(callbacks.game_endings().len(), 1);
        prop_assert_eq!(engine.scheduler().pending_count(), 0);
    }

    #[test]
    fn test_broadcasts_never_reveal_hands((seed, seats, collection, jokers) in table_strategy()) {
        let (mut engine, mut game, callbacks) = setup(seed, &seats, collection, jokers);
        prop_assert!(engine.start_round(&mut game));
        let caller = game.current_player.clone().unwrap();
        prop_assert!(engine.call_final_round(&mut game, &caller));
        let _ = play_out(&mut engine, &mut game);

        for event in callbacks.events() {
            let view = match event {
                RoomEvent::StateChanged { view } | RoomEvent::StateExcept { view, .. } => view,
                _ => continue,
            };
            prop_assert!(view.draw_pile.iter().all(|c| c.is_hidden()));
            for player in &view.players {
                prop_assert!(player.hand.iter().flatten().all(|c| c.is_hidden()));
                prop_assert!(player.drawn_card.iter().all(|c| c.is_hidden()));
                prop_assert!(player.known_cards.is_none());
            }
        }
    }

    #[test]
    fn test_wrong_rank_always_costs_one_card(seed in any::<u64>(), offset in 1usize..13) {
        let (mut engine, mut game, _) = setup(seed, &[Difficulty::Easy, Difficulty::Easy], false, false);
        // seats flip to humans so nothing reacts on its own
        for player in &mut game.players {
            player.is_human = true;
        }
        prop_assert!(engine.start_round(&mut game));
        let current = game.current_player.clone().unwrap();
        let other = game.next_active_after(Some(&current)).unwrap();

        prop_assert!(engine.draw_card(&mut game, &current, DrawSource::Deck));
        let drawn = game.player(&current).unwrap().drawn_card.clone().unwrap();
        prop_assert!(engine.play_card(&mut game, &current, &drawn.card_id));
        prop_assert_eq!(game.phase, Phase::SameRankWindow);

        // give the other seat a card that cannot match the top
        let top = game.discard_top().unwrap().rank;
        let rank_idx = Rank::STANDARD.iter().position(|r| *r == top).unwrap_or(0);
        let wrong_rank = Rank::STANDARD[(rank_idx + offset) % Rank::STANDARD.len()];
        prop_assume!(wrong_rank != top);
        let wrong = Card::new("wrong", wrong_rank, Suit::Hearts);
        game.original_deck.push(wrong.clone());
        game.player_mut(&other).unwrap().hand.push(Some(wrong.card_id.clone()));

        let before = game.player(&other).unwrap().card_count();
        let discards = game.discard_pile.len();
        prop_assert!(engine.same_rank_play(&mut game, &other, "wrong"));
        prop_assert_eq!(game.player(&other).unwrap().card_count(), before + 1);
        prop_assert!(game.player(&other).unwrap().holds("wrong"));
        prop_assert_eq!(game.discard_pile.len(), discards);
    }
}
