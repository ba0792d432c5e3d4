use std::env;

use duel_types::Difficulty;

#[derive(Debug, Clone)]
pub struct DuelConfig {
    pub turn_seconds: u64,
    pub turn_grace_millis: u64,
    pub code_length: usize,
    pub code_attempts: u32,
    pub oracle_timeout_seconds: u64,
    pub ai_think_floor_millis: u64,
    pub ai_think_ceiling_millis: u64,
}

impl DuelConfig {
    pub fn new() -> Self {
        Self {
            turn_seconds: env::var("DUEL_TURN_SECONDS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .expect("Invalid DUEL_TURN_SECONDS"),
            turn_grace_millis: env::var("DUEL_TURN_GRACE_MILLIS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .expect("Invalid DUEL_TURN_GRACE_MILLIS"),
            code_length: env::var("DUEL_CODE_LENGTH")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .expect("Invalid DUEL_CODE_LENGTH"),
            code_attempts: env::var("DUEL_CODE_ATTEMPTS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .expect("Invalid DUEL_CODE_ATTEMPTS"),
            oracle_timeout_seconds: env::var("DUEL_ORACLE_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .expect("Invalid DUEL_ORACLE_TIMEOUT_SECONDS"),
            ai_think_floor_millis: env::var("DUEL_AI_THINK_FLOOR_MILLIS")
                .unwrap_or_else(|_| "1200".to_string())
                .parse()
                .expect("Invalid DUEL_AI_THINK_FLOOR_MILLIS"),
            ai_think_ceiling_millis: env::var("DUEL_AI_THINK_CEILING_MILLIS")
                .unwrap_or_else(|_| "2600".to_string())
                .parse()
                .expect("Invalid DUEL_AI_THINK_CEILING_MILLIS"),
        }
    }

    /// Simulated thinking window for an AI opponent, in milliseconds.
    /// Harder opponents deliberate longer.
    pub fn think_bounds(&self, difficulty: Difficulty) -> (u64, u64) {
        let factor = match difficulty {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        };
        (
            self.ai_think_floor_millis * factor,
            self.ai_think_ceiling_millis * factor,
        )
    }
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self::new()
    }
}
