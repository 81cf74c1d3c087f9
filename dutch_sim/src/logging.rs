//! Structured logging for the simulator.
//!
//! Stdout carries one JSON line per room, so every log line goes to stderr.
//! The engine logs through the `log` facade and the subscriber's `tracing-log`
//! bridge picks those records up. Driver records carry their room span.

use tracing::Span;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("warn,dutch_sim={level},dutch_engine={level}")
}

/// Initialize logging to stderr
///
/// `RUST_LOG` wins over `verbose` when set.
pub fn init(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(verbose);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Span carrying the room id for everything one room driver logs
pub fn room_span(index: usize) -> Span {
    tracing::info_span!("room", seat = index + 1, id = tracing::field::Empty)
}

/// Fill in the room id once the manager has assigned it
pub fn record_room_id(span: &Span, room_id: &str) {
    span.record("id", room_id);
}

/// Log the outcome of one round with structured fields
pub fn log_round_finished(room_id: &str, round: u32, winners: &[String], pot: u32) {
    tracing::info!(
        room_id = room_id,
        round = round,
        pot = pot,
        "Room {}: round {} won by {}",
        room_id,
        round,
        winners.join(", ")
    );
}
