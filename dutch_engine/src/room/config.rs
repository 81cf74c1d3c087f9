//! Room configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::entities::{HAND_SIZE, MAX_PLAYERS};

/// Computer opponent difficulty presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
            Difficulty::Expert => write!(f, "expert"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// Durations the engine uses for its reaction windows and turn pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTimings {
    /// How long the same-rank window stays open after a play
    pub same_rank_window: Duration,

    /// Time a player has to resolve a Jack swap
    pub jack_swap_window: Duration,

    /// Time a player has to resolve a Queen peek
    pub queen_peek_window: Duration,

    /// Pause between the end of a turn and the next player's draw phase
    pub settle_delay: Duration,

    /// Multiplier applied to computer think times (1.0 = as configured)
    pub computer_delay_scale: f32,
}

impl Default for EngineTimings {
    fn default() -> Self {
        Self {
            same_rank_window: Duration::from_secs(5),
            jack_swap_window: Duration::from_secs(10),
            queen_peek_window: Duration::from_secs(10),
            settle_delay: Duration::from_millis(500),
            computer_delay_scale: 1.0,
        }
    }
}

impl EngineTimings {
    /// Near-zero timings for headless runs and tests.
    pub fn instant() -> Self {
        Self {
            same_rank_window: Duration::from_millis(50),
            jack_swap_window: Duration::from_millis(50),
            queen_peek_window: Duration::from_millis(50),
            settle_delay: Duration::from_millis(1),
            computer_delay_scale: 0.0,
        }
    }
}

/// Room configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Room name
    pub name: String,

    /// Maximum number of seated players
    pub max_players: usize,

    /// Minimum number of seated players needed to start
    pub min_players: usize,

    /// Collection-mode variant (claim discards matching a personal rank)
    pub collection_mode: bool,

    /// Practice rooms always open with the first computer opponent
    pub practice_mode: bool,

    /// Whether the deck includes the two jokers
    pub include_jokers: bool,

    /// Coins each player puts into the pot
    pub entry_fee: u32,

    /// Default difficulty for computer opponents added without one
    pub computer_difficulty: Difficulty,

    /// Reaction window and pacing durations
    pub timings: EngineTimings,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: "Default Room".to_string(),
            max_players: 4,
            min_players: 2,
            collection_mode: false,
            practice_mode: false,
            include_jokers: true,
            entry_fee: 25,
            computer_difficulty: Difficulty::Medium,
            timings: EngineTimings::default(),
        }
    }
}

impl RoomConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_players < 2 {
            return Err("Min players must be at least 2".to_string());
        }

        if self.max_players < self.min_players {
            return Err("Max players must be at least min players".to_string());
        }

        if self.max_players > MAX_PLAYERS {
            return Err(format!("Max players must be at most {MAX_PLAYERS}"));
        }

        // Every seat is dealt a full hand and one card starts the discard pile
        let deck_size = if self.include_jokers { 54 } else { 52 };
        if self.max_players * HAND_SIZE + 1 > deck_size {
            return Err("Deck is too small for this many players".to_string());
        }

        if self.timings.same_rank_window.is_zero() {
            return Err("Same rank window must be longer than zero".to_string());
        }

        if !(0.0..=10.0).contains(&self.timings.computer_delay_scale) {
            return Err("Computer delay scale must be between 0 and 10".to_string());
        }

        Ok(())
    }

    /// Total coins in play for a round with `players` participants
    pub fn pot_for(&self, players: usize) -> u32 {
        self.entry_fee.saturating_mul(players as u32)
    }
}
