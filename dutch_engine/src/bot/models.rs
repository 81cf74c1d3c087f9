//! Computer opponent tuning per difficulty.

use rand::Rng;
use std::time::Duration;

use crate::room::config::Difficulty;

/// Bot difficulty parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyParams {
    /// Chance of keeping a card in memory after seeing it
    pub remember_probability: f64,

    /// Average thinking time in milliseconds (base)
    pub base_think_time_ms: u64,

    /// Random variance in thinking time (±milliseconds)
    pub think_time_variance_ms: u64,
}

impl DifficultyParams {
    /// Forgetful and slow
    pub fn easy() -> Self {
        Self {
            remember_probability: 0.70,
            base_think_time_ms: 1500,
            think_time_variance_ms: 1000,
        }
    }

    pub fn medium() -> Self {
        Self {
            remember_probability: 0.80,
            base_think_time_ms: 1200,
            think_time_variance_ms: 800,
        }
    }

    pub fn hard() -> Self {
        Self {
            remember_probability: 0.90,
            base_think_time_ms: 1000,
            think_time_variance_ms: 600,
        }
    }

    /// Perfect recall, quick reactions
    pub fn expert() -> Self {
        Self {
            remember_probability: 1.0,
            base_think_time_ms: 800,
            think_time_variance_ms: 400,
        }
    }

    /// Get parameters for a given difficulty
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self::easy(),
            Difficulty::Medium => Self::medium(),
            Difficulty::Hard => Self::hard(),
            Difficulty::Expert => Self::expert(),
        }
    }

    /// Human-like pause before acting, scaled by `scale` (0 = act at once).
    pub fn think_time<R: Rng + ?Sized>(&self, rng: &mut R, scale: f32) -> Duration {
        if scale <= 0.0 {
            return Duration::ZERO;
        }
        let low = self
            .base_think_time_ms
            .saturating_sub(self.think_time_variance_ms);
        let high = self.base_think_time_ms + self.think_time_variance_ms;
        let ms = rng.random_range(low..=high);
        Duration::from_millis(ms).mul_f32(scale)
    }
}
