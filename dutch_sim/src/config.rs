//! Simulator configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use dutch_engine::room::{Difficulty, EngineTimings, RoomConfig};
use std::{path::PathBuf, time::Duration};

/// Complete simulator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Rooms played side by side
    pub rooms: usize,
    /// Computer seats per room
    pub players_per_room: usize,
    /// Rounds each room plays before closing
    pub rounds: u32,
    /// Difficulty of every computer seat
    pub difficulty: Difficulty,
    /// Collection-mode variant
    pub collection_mode: bool,
    /// Deck includes jokers
    pub include_jokers: bool,
    /// Optional JSON rule table replacing the built-in strategy
    pub rules_path: Option<PathBuf>,
    /// Multiplier for computer think times
    pub delay_scale: f32,
    /// How long a round runs before someone calls the final round
    pub final_round_after: Duration,
    /// Give up on a round that has not ended after this long
    pub round_timeout: Duration,
}

/// Values given on the command line; each one wins over the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub rooms: Option<usize>,
    pub players: Option<usize>,
    pub rounds: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub collection_mode: bool,
    pub rules_path: Option<PathBuf>,
}

impl SimConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `overrides` - Values from CLI args
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let difficulty = match overrides.difficulty {
            Some(difficulty) => difficulty,
            None => match std::env::var("SIM_DIFFICULTY") {
                Ok(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                    var: "SIM_DIFFICULTY".to_string(),
                    reason,
                })?,
                Err(_) => Difficulty::Medium,
            },
        };

        let rules_path = overrides
            .rules_path
            .or_else(|| std::env::var("SIM_RULES_FILE").ok().map(PathBuf::from));

        Ok(SimConfig {
            rooms: overrides
                .rooms
                .unwrap_or_else(|| parse_env_or("SIM_ROOMS", 1)),
            players_per_room: overrides
                .players
                .unwrap_or_else(|| parse_env_or("SIM_PLAYERS", 4)),
            rounds: overrides
                .rounds
                .unwrap_or_else(|| parse_env_or("SIM_ROUNDS", 1)),
            difficulty,
            collection_mode: overrides.collection_mode
                || parse_env_or("SIM_COLLECTION_MODE", false),
            include_jokers: parse_env_or("SIM_INCLUDE_JOKERS", true),
            rules_path,
            delay_scale: parse_env_or("SIM_DELAY_SCALE", 0.01),
            final_round_after: Duration::from_millis(parse_env_or(
                "SIM_FINAL_ROUND_AFTER_MS",
                2_000,
            )),
            round_timeout: Duration::from_secs(parse_env_or("SIM_ROUND_TIMEOUT_SECS", 120)),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rooms == 0 {
            return Err(ConfigError::Invalid {
                var: "SIM_ROOMS".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.rounds == 0 {
            return Err(ConfigError::Invalid {
                var: "SIM_ROUNDS".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.round_timeout <= self.final_round_after {
            return Err(ConfigError::Invalid {
                var: "SIM_ROUND_TIMEOUT_SECS".to_string(),
                reason: format!(
                    "Must be longer than the final round delay ({:?})",
                    self.final_round_after
                ),
            });
        }

        // Seat limits and timings are the room's own rules
        self.room_config(0)
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "SIM_PLAYERS".to_string(),
                reason,
            })
    }

    /// Room settings for the `index`-th simulated room
    pub fn room_config(&self, index: usize) -> RoomConfig {
        RoomConfig {
            name: format!("Sim Room {}", index + 1),
            max_players: self.players_per_room,
            min_players: 2.min(self.players_per_room),
            collection_mode: self.collection_mode,
            practice_mode: false,
            include_jokers: self.include_jokers,
            computer_difficulty: self.difficulty,
            timings: EngineTimings {
                computer_delay_scale: self.delay_scale,
                ..EngineTimings::default()
            },
            ..Default::default()
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Could not read rule table {path}: {reason}")]
    Rules { path: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimConfig {
        SimConfig {
            rooms: 2,
            players_per_room: 4,
            rounds: 3,
            difficulty: Difficulty::Hard,
            collection_mode: false,
            include_jokers: true,
            rules_path: None,
            delay_scale: 0.01,
            final_round_after: Duration::from_secs(2),
            round_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_default_shape_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_rooms() {
        let config = SimConfig {
            rooms: 0,
            ..config()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "SIM_ROOMS"));
    }

    #[test]
    fn test_config_validation_single_seat() {
        let config = SimConfig {
            players_per_room: 1,
            ..config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_timeout_shorter_than_round() {
        let config = SimConfig {
            round_timeout: Duration::from_secs(1),
            ..config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_room_config_carries_settings() {
        let room = config().room_config(1);
        assert_eq!(room.name, "Sim Room 2");
        assert_eq!(room.max_players, 4);
        assert_eq!(room.computer_difficulty, Difficulty::Hard);
        assert!((room.timings.computer_delay_scale - 0.01).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "SIM_ROOMS".to_string(),
            reason: "Must be at least 1".to_string(),
        };
        assert!(err.to_string().contains("SIM_ROOMS"));
    }
}
