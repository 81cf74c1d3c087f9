//! Rule-level behaviour of the round engine, driven through its public API.

use std::{sync::Arc, time::Duration};

use dutch_engine::{
    game::{
        ActionError, Card, DrawSource, Game, Phase, Player, PlayerStatus, Rank, RoundEngine,
        Scheduler, Suit, TimerSlot, WinType,
    },
    room::{Difficulty, EngineTimings, RecordingCallbacks, RoomConfig, RoomEvent, TimerConfig},
};

fn engine(callbacks: Arc<RecordingCallbacks>, collection_mode: bool) -> RoundEngine {
    let config = RoomConfig {
        collection_mode,
        timings: EngineTimings::instant(),
        ..Default::default()
    };
    RoundEngine::new("room", config, callbacks, Scheduler::manual()).with_seed(42)
}

fn card(id: &str, rank: Rank, suit: Suit) -> Card {
    Card::new(id, rank, suit)
}

/// Humans seated in order, the first one about to draw.
fn rigged(hands: &[(&str, Vec<Card>)], discard: Vec<Card>, draw: Vec<Card>) -> Game {
    let mut game = Game::new("room");
    for (player_id, cards) in hands {
        let mut player = Player::human(*player_id, player_id.to_uppercase());
        player.hand = cards.iter().map(|c| Some(c.card_id.clone())).collect();
        game.original_deck.extend(cards.iter().cloned());
        game.players.push(player);
    }
    game.original_deck.extend(discard.iter().cloned());
    game.original_deck.extend(draw.iter().cloned());
    game.draw_pile = draw.into_iter().map(|c| c.card_id).collect();
    game.discard_pile = discard;
    game.phase = Phase::PlayerTurn;
    game.current_player = Some(hands[0].0.to_string());
    game.players[0].status = PlayerStatus::DrawingCard;
    game
}

fn standard_hands() -> Vec<(&'static str, Vec<Card>)> {
    vec![
        (
            "alice",
            vec![
                card("a1", Rank::Five, Suit::Clubs),
                card("a2", Rank::Nine, Suit::Clubs),
                card("a3", Rank::Two, Suit::Clubs),
                card("a4", Rank::King, Suit::Clubs),
            ],
        ),
        (
            "bob",
            vec![
                card("b1", Rank::Five, Suit::Hearts),
                card("b2", Rank::Eight, Suit::Hearts),
                card("b3", Rank::Ace, Suit::Hearts),
                card("b4", Rank::Four, Suit::Hearts),
            ],
        ),
    ]
}

#[test]
fn test_empty_draw_pile_reshuffles_all_but_top() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks, false);
    let mut game = rigged(
        &standard_hands(),
        vec![
            card("d1", Rank::Three, Suit::Spades),
            card("d2", Rank::Six, Suit::Spades),
        ],
        Vec::new(),
    );

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    let drawn = game.players[0].drawn_card.clone().unwrap();
    assert_eq!(drawn.card_id, "d1");
    assert!(game.draw_pile.is_empty());
    assert_eq!(game.discard_pile.len(), 1);
    assert_eq!(game.discard_pile[0].card_id, "d2");
}

#[test]
fn test_draw_fails_with_single_discard() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks.clone(), false);
    let mut game = rigged(
        &standard_hands(),
        vec![card("d1", Rank::Three, Suit::Spades)],
        Vec::new(),
    );

    assert!(!engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert_eq!(game.discard_pile.len(), 1);
    assert_eq!(game.players[0].status, PlayerStatus::DrawingCard);
    assert_eq!(callbacks.errors().len(), 1);
}

#[test]
fn test_mismatched_same_rank_adds_one_penalty_card() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks, false);
    let mut game = rigged(
        &standard_hands(),
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![
            card("p1", Rank::Queen, Suit::Diamonds),
            card("p2", Rank::Seven, Suit::Diamonds),
            card("p3", Rank::Jack, Suit::Diamonds),
        ],
    );

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert!(engine.play_card(&mut game, "alice", "a1"));
    assert_eq!(game.phase, Phase::SameRankWindow);

    // the top is a five; bob tries his eight
    let before = game.players[1].card_count();
    assert!(engine.same_rank_play(&mut game, "bob", "b2"));
    assert!(game.players[1].holds("b2"));
    assert_eq!(game.players[1].card_count(), before + 1);
    assert_eq!(game.discard_pile.last().unwrap().card_id, "a1");

    // the matching five goes through
    assert!(engine.same_rank_play(&mut game, "bob", "b1"));
    assert!(!game.players[1].holds("b1"));
    assert_eq!(game.discard_pile.last().unwrap().card_id, "b1");
}

#[test]
fn test_wrong_rank_without_penalty_card_is_refused() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks.clone(), false);
    // the only card left to draw is alice's; the five then sits alone
    let mut game = rigged(
        &standard_hands(),
        Vec::new(),
        vec![card("p1", Rank::Six, Suit::Diamonds)],
    );

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert!(engine.play_card(&mut game, "alice", "a1"));
    assert!(game.draw_pile.is_empty());
    assert_eq!(game.discard_pile.len(), 1);

    let before = game.players[1].card_count();
    assert!(!engine.same_rank_play(&mut game, "bob", "b2"));
    assert_eq!(
        engine.last_error(),
        Some(&ActionError::PenaltyUnavailable {
            player_id: "bob".into()
        })
    );
    assert!(game.players[1].holds("b2"));
    assert_eq!(game.players[1].card_count(), before);
    assert_eq!(game.phase, Phase::SameRankWindow);
    assert_eq!(callbacks.errors().len(), 1);
}

#[test]
fn test_collection_cards_cannot_leave_the_hand() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks.clone(), true);
    let mut game = rigged(
        &standard_hands(),
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![card("p1", Rank::Five, Suit::Diamonds)],
    );
    game.collection_mode = true;
    for (idx, rank) in [(0, Rank::Five), (1, Rank::Five)] {
        let first = game.original_deck[idx * 4].clone();
        game.players[idx].collection_rank = Some(rank);
        game.players[idx].collection_cards = vec![first];
    }

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert!(!engine.play_card(&mut game, "alice", "a1"));
    assert!(matches!(
        engine.last_error(),
        Some(ActionError::CollectionCard { .. })
    ));
    assert!(game.players[0].holds("a1"));

    // play the drawn five; bob's five is his collection card
    assert!(engine.play_card(&mut game, "alice", "p1"));
    assert!(!engine.same_rank_play(&mut game, "bob", "b1"));
    assert!(game.players[1].holds("b1"));
    assert!(callbacks.errors().len() >= 2);
}

#[test]
fn test_collect_from_discard_example() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks, true);
    let mut game = rigged(
        &standard_hands(),
        vec![card("c5", Rank::Five, Suit::Spades)],
        vec![card("p1", Rank::Six, Suit::Diamonds)],
    );
    game.collection_mode = true;
    let first = game.original_deck[0].clone();
    game.players[0].collection_rank = Some(Rank::Five);
    game.players[0].collection_cards = vec![first];

    assert!(engine.collect_from_discard(&mut game, "alice"));
    assert!(game.discard_pile.is_empty());
    let alice = &game.players[0];
    assert!(alice.collection_cards.iter().any(|c| c.card_id == "c5"));
    assert_eq!(alice.collection_rank, Some(Rank::Five));
    assert!(alice.holds("c5"));

    // nothing left to collect
    assert!(!engine.collect_from_discard(&mut game, "alice"));
}

#[test]
fn test_collect_rejects_wrong_rank() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks, true);
    let mut game = rigged(
        &standard_hands(),
        vec![card("c7", Rank::Seven, Suit::Spades)],
        Vec::new(),
    );
    game.collection_mode = true;
    game.players[0].collection_rank = Some(Rank::Five);

    assert!(!engine.collect_from_discard(&mut game, "alice"));
    assert_eq!(
        engine.last_error(),
        Some(&ActionError::CollectionMismatch)
    );
    assert_eq!(game.discard_pile.len(), 1);
}

#[test]
fn test_fourth_collected_card_wins_immediately() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks.clone(), true);
    let mut hands = standard_hands();
    hands[0].1.extend([
        card("a5", Rank::Five, Suit::Hearts),
        card("a6", Rank::Five, Suit::Diamonds),
        card("a7", Rank::Queen, Suit::Diamonds),
    ]);
    hands[1].1[0] = card("b1", Rank::Six, Suit::Hearts);
    let mut game = rigged(&hands, vec![card("c5", Rank::Five, Suit::Spades)], Vec::new());
    game.collection_mode = true;
    let fives: Vec<Card> = game
        .original_deck
        .iter()
        .filter(|c| ["a1", "a5", "a6"].contains(&c.card_id.as_str()))
        .cloned()
        .collect();
    game.players[0].collection_rank = Some(Rank::Five);
    game.players[0].collection_cards = fives;

    assert!(engine.collect_from_discard(&mut game, "alice"));
    assert_eq!(game.phase, Phase::GameEnded);
    assert_eq!(game.winners.len(), 1);
    assert_eq!(game.winners[0].player_id, "alice");
    assert_eq!(game.winners[0].win_type, WinType::FourOfAKind);
    assert_eq!(callbacks.game_endings().len(), 1);

    // nothing moves after the end
    assert!(!engine.draw_card(&mut game, "bob", DrawSource::Deck));
    assert_eq!(engine.last_error(), Some(&ActionError::GameEnded));
}

fn play_out_final_round(engine: &mut RoundEngine, game: &mut Game, caller: &str) {
    assert!(engine.call_final_round(game, caller));
    for _ in 0..game.players.len() {
        if game.is_ended() {
            break;
        }
        engine.move_to_next_player(game);
        assert!(engine.fire_next_timer(game));
    }
    assert!(game.is_ended());
}

#[test]
fn test_final_round_caller_wins_a_tie() {
    let callbacks = RecordingCallbacks::new(TimerConfig {
        show_instructions: true,
        ..Default::default()
    });
    let mut engine = engine(callbacks, false);
    let hands = vec![
        ("alice", vec![card("a1", Rank::Four, Suit::Clubs), card("a2", Rank::Two, Suit::Clubs)]),
        ("bob", vec![card("b1", Rank::Four, Suit::Hearts), card("b2", Rank::Two, Suit::Hearts)]),
    ];
    let mut game = rigged(&hands, vec![card("d1", Rank::Three, Suit::Spades)], Vec::new());

    play_out_final_round(&mut engine, &mut game, "bob");
    assert_eq!(game.winners.len(), 1);
    assert_eq!(game.winners[0].player_id, "bob");
    assert_eq!(game.winners[0].win_type, WinType::LowestPoints);
}

#[test]
fn test_tie_without_the_caller_is_a_draw() {
    let callbacks = RecordingCallbacks::new(TimerConfig {
        show_instructions: true,
        ..Default::default()
    });
    let mut engine = engine(callbacks.clone(), false);
    let hands = vec![
        ("alice", vec![card("a1", Rank::Four, Suit::Clubs)]),
        ("bob", vec![card("b1", Rank::Four, Suit::Hearts)]),
        ("carol", vec![card("c1", Rank::King, Suit::Hearts)]),
    ];
    let mut game = rigged(&hands, vec![card("d1", Rank::Three, Suit::Spades)], Vec::new());

    play_out_final_round(&mut engine, &mut game, "carol");
    let mut ids: Vec<_> = game.winners.iter().map(|w| w.player_id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec!["alice", "bob"]);

    let endings = callbacks.game_endings();
    assert_eq!(endings.len(), 1);
    assert_eq!(endings[0].1.per_winner, endings[0].1.pot / 2);
}

#[test]
fn test_two_missed_actions_trigger_one_leave_request() {
    let callbacks = RecordingCallbacks::new(TimerConfig {
        turn_time_limit: Some(Duration::from_secs(1)),
        show_instructions: false,
    });
    let mut engine = engine(callbacks.clone(), false);
    let mut game = rigged(
        &standard_hands(),
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![card("p1", Rank::Six, Suit::Diamonds)],
    );
    // nobody ever acts: every turn ends on its draw deadline
    engine.move_to_next_player(&mut game);

    let fired = engine.run_timers(&mut game, 30);
    assert_eq!(fired, 30);
    assert!(engine.missed_actions("alice") >= 3);
    assert_eq!(callbacks.leave_requests("alice"), 1);
    assert_eq!(callbacks.leave_requests("bob"), 1);
}

#[test]
fn test_play_timeout_discards_the_drawn_card() {
    let callbacks = RecordingCallbacks::new(TimerConfig {
        turn_time_limit: Some(Duration::from_secs(1)),
        show_instructions: false,
    });
    let mut engine = engine(callbacks.clone(), false);
    let mut game = rigged(
        &standard_hands(),
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![card("p1", Rank::Six, Suit::Diamonds)],
    );

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert!(engine.fire_next_timer(&mut game));
    assert_eq!(game.discard_pile.last().unwrap().card_id, "p1");
    assert_eq!(game.players[0].card_count(), 4);
    assert_eq!(engine.missed_actions("alice"), 1);
    assert_eq!(game.phase, Phase::SameRankWindow);
    assert!(callbacks
        .events()
        .iter()
        .all(|e| !matches!(e, RoomEvent::LeaveRoom { .. })));
}

#[test]
fn test_emptying_the_hand_wins() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks.clone(), false);
    let hands = vec![
        ("alice", vec![card("a1", Rank::Four, Suit::Clubs)]),
        ("bob", vec![card("b1", Rank::Four, Suit::Hearts), card("b2", Rank::Nine, Suit::Hearts)]),
    ];
    let mut game = rigged(
        &hands,
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![card("p1", Rank::Four, Suit::Diamonds)],
    );

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert!(engine.play_card(&mut game, "alice", "p1"));
    assert!(engine.same_rank_play(&mut game, "alice", "a1"));

    assert!(game.is_ended());
    assert_eq!(game.winners[0].player_id, "alice");
    assert_eq!(game.winners[0].win_type, WinType::EmptyHand);
    assert_eq!(engine.scheduler().pending_count(), 0);
}

#[test]
fn test_departed_owner_loses_their_special() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks, false);
    let mut hands = standard_hands();
    hands.push((
        "carol",
        vec![card("c1", Rank::Two, Suit::Spades), card("c2", Rank::Nine, Suit::Spades)],
    ));
    let mut game = rigged(
        &hands,
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![card("q1", Rank::Queen, Suit::Diamonds)],
    );

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert!(engine.play_card(&mut game, "alice", "q1"));
    assert!(engine.remove_player(&mut game, "alice"));
    assert!(engine.complete_same_rank_window(&mut game));

    // alice's queen is skipped and the turn moves on
    assert_eq!(game.phase, Phase::PlayerTurn);
    assert!(engine.window().active_special().is_none());
    assert!(engine.fire_next_timer(&mut game));
    assert_eq!(game.current_player.as_deref(), Some("bob"));
}

#[test]
fn test_computer_reacts_inside_the_window() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks, false);
    let mut game = rigged(
        &standard_hands(),
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![card("p1", Rank::Six, Suit::Diamonds)],
    );
    // bob becomes an expert computer who remembers his five
    let bob = &mut game.players[1];
    bob.is_human = false;
    bob.difficulty = Difficulty::Expert;
    bob.remember("bob", card("b1", Rank::Five, Suit::Hearts));

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert!(engine.play_card(&mut game, "alice", "a1"));
    assert!(engine.fire_next_timer(&mut game));
    assert_eq!(game.discard_pile.last().unwrap().card_id, "b1");
    assert!(!game.players[1].holds("b1"));
}

#[test]
fn test_private_views_only_reveal_own_cards() {
    let callbacks = RecordingCallbacks::new(TimerConfig {
        turn_time_limit: Some(Duration::from_secs(1)),
        show_instructions: false,
    });
    let mut engine = engine(callbacks.clone(), false);
    let mut game = Game::new("room");
    game.players.push(Player::human("alice", "Alice"));
    game.players
        .push(Player::computer("bot_1", "Bot 1", Difficulty::Expert));
    game.players
        .push(Player::computer("bot_2", "Bot 2", Difficulty::Easy));

    assert!(engine.start_round(&mut game));
    assert!(engine.call_final_round(&mut game, "bot_1"));
    engine.run_timers(&mut game, 1000);
    assert!(game.is_ended());

    let mut saw_own_card = false;
    for event in callbacks.events() {
        let RoomEvent::PrivateState { player_id, view } = event else {
            continue;
        };
        assert_eq!(player_id, "alice");
        for seat in &view.players {
            let revealed = seat
                .hand
                .iter()
                .flatten()
                .chain(seat.drawn_card.iter())
                .filter(|c| !c.is_hidden())
                .count();
            if seat.id == "alice" {
                saw_own_card |= revealed > 0;
            } else {
                assert_eq!(revealed, 0, "{} leaked to alice", seat.id);
                assert!(seat.known_cards.is_none());
            }
        }
    }
    assert!(saw_own_card);
}

#[test]
fn test_computer_draw_sends_no_private_state() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks.clone(), false);
    let mut hands = standard_hands();
    hands.reverse();
    let mut game = rigged(
        &hands,
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![card("p1", Rank::Six, Suit::Diamonds)],
    );
    game.players[0].is_human = false;

    assert!(engine.draw_card(&mut game, "bob", DrawSource::Deck));
    let private: Vec<_> = callbacks
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RoomEvent::PrivateState { player_id, .. } => Some(player_id),
            _ => None,
        })
        .collect();
    assert!(!private.contains(&"bob".to_string()));
    // alice still hears about the draw
    assert!(!callbacks.views_seen_by("alice").is_empty());
}

#[test]
fn test_leaving_reaction_is_dropped_and_window_rearmed() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks, false);
    let mut hands = standard_hands();
    hands.push((
        "carol",
        vec![card("c1", Rank::Two, Suit::Spades), card("c2", Rank::Nine, Suit::Spades)],
    ));
    let mut game = rigged(
        &hands,
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![card("p1", Rank::Six, Suit::Diamonds)],
    );
    let bob = &mut game.players[1];
    bob.is_human = false;
    bob.difficulty = Difficulty::Expert;
    bob.remember("bob", card("b1", Rank::Five, Suit::Hearts));

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert!(engine.play_card(&mut game, "alice", "a1"));
    let bob_slot = TimerSlot::Computer("bob".to_string());
    assert!(engine.scheduler().is_scheduled(&bob_slot));

    assert!(engine.remove_player(&mut game, "bob"));
    assert_eq!(game.phase, Phase::SameRankWindow);
    assert!(!engine.scheduler().is_scheduled(&bob_slot));
    assert!(engine.scheduler().is_scheduled(&TimerSlot::SameRankWindow));
    assert_eq!(engine.scheduler().pending_count(), 1);

    // the window expires with bob's five still in hand
    assert!(engine.fire_next_timer(&mut game));
    assert_eq!(game.phase, Phase::PlayerTurn);
    assert_eq!(game.discard_pile.last().unwrap().card_id, "a1");
    assert!(engine.fire_next_timer(&mut game));
    assert_eq!(game.current_player.as_deref(), Some("carol"));
    assert_eq!(game.player("carol").unwrap().status, PlayerStatus::DrawingCard);
}

#[test]
fn test_leaving_bystander_keeps_other_reactions_alive() {
    let callbacks = RecordingCallbacks::new(TimerConfig::default());
    let mut engine = engine(callbacks, false);
    let mut hands = standard_hands();
    hands.push((
        "carol",
        vec![card("c1", Rank::Two, Suit::Spades), card("c2", Rank::Nine, Suit::Spades)],
    ));
    let mut game = rigged(
        &hands,
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![card("p1", Rank::Six, Suit::Diamonds)],
    );
    let bob = &mut game.players[1];
    bob.is_human = false;
    bob.difficulty = Difficulty::Expert;
    bob.remember("bob", card("b1", Rank::Five, Suit::Hearts));

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert!(engine.play_card(&mut game, "alice", "a1"));
    assert!(engine.remove_player(&mut game, "carol"));

    // the window and bob's reaction are planned again for two seats
    assert_eq!(game.phase, Phase::SameRankWindow);
    assert!(engine.scheduler().is_scheduled(&TimerSlot::SameRankWindow));
    assert!(engine
        .scheduler()
        .is_scheduled(&TimerSlot::Computer("bob".to_string())));
    assert!(engine.fire_next_timer(&mut game));
    assert_eq!(game.discard_pile.last().unwrap().card_id, "b1");
    assert!(!game.players[1].holds("b1"));
}

#[test]
fn test_leaving_bystander_rearms_the_turn_clock() {
    let callbacks = RecordingCallbacks::new(TimerConfig {
        turn_time_limit: Some(Duration::from_secs(1)),
        show_instructions: false,
    });
    let mut engine = engine(callbacks, false);
    let mut hands = standard_hands();
    hands.push((
        "carol",
        vec![card("c1", Rank::Two, Suit::Spades), card("c2", Rank::Nine, Suit::Spades)],
    ));
    let mut game = rigged(
        &hands,
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![card("p1", Rank::Six, Suit::Diamonds)],
    );

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert!(engine.remove_player(&mut game, "carol"));

    // alice keeps her turn and her play deadline
    assert_eq!(game.current_player.as_deref(), Some("alice"));
    assert_eq!(game.players[0].status, PlayerStatus::PlayingCard);
    assert!(engine.scheduler().is_scheduled(&TimerSlot::Turn));
    assert_eq!(engine.scheduler().pending_count(), 1);
}

#[test]
fn test_tutorial_special_waits_for_an_explicit_close() {
    let callbacks = RecordingCallbacks::new(TimerConfig {
        turn_time_limit: Some(Duration::from_secs(1)),
        show_instructions: true,
    });
    let mut engine = engine(callbacks, false);
    let mut game = rigged(
        &standard_hands(),
        vec![card("d1", Rank::Three, Suit::Spades)],
        vec![card("q1", Rank::Queen, Suit::Diamonds)],
    );

    assert!(engine.draw_card(&mut game, "alice", DrawSource::Deck));
    assert!(engine.play_card(&mut game, "alice", "q1"));
    assert_eq!(game.phase, Phase::SameRankWindow);
    assert_eq!(engine.scheduler().pending_count(), 0);

    assert!(engine.complete_same_rank_window(&mut game));
    assert_eq!(game.phase, Phase::SpecialPlayWindow);
    assert!(engine.window().active_special().is_some());
    // no deadline runs while instructions are shown
    assert_eq!(engine.scheduler().pending_count(), 0);

    assert!(engine.complete_special_card(&mut game, None));
    assert!(engine.window().active_special().is_none());
    assert!(engine.fire_next_timer(&mut game));
    assert_eq!(game.current_player.as_deref(), Some("bob"));
}
