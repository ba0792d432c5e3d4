use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::{PlayerId, PlayerProfile, RoomId};

pub const DEFAULT_ROUNDS: i32 = 5;
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GameMode {
    Theme,
    Longest,
    Chain,
}

/// Room lifecycle. Variant order is the lifecycle order, which is what
/// lets writes compare statuses to refuse moving a room backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameSettings {
    pub theme: Option<String>,
    pub rounds: Option<i32>,
    pub language: Option<String>,
}

impl GameSettings {
    pub fn round_limit(&self) -> i32 {
        self.rounds.unwrap_or(DEFAULT_ROUNDS)
    }

    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TurnRecord {
    pub player_id: PlayerId,
    pub word: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameState {
    pub history: Vec<TurnRecord>,
    /// Lowercased words already played, for duplicate checks.
    pub used_words: Vec<String>,
    pub current_player_id: Option<PlayerId>,
    pub turn_started_at: Option<String>, // ISO 8601 string
    pub scores: HashMap<PlayerId, i32>,
    pub current_round: i32,
    pub last_word: Option<String>,
    pub winner_id: Option<PlayerId>,
    pub game_over_reason: Option<String>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            used_words: Vec::new(),
            current_player_id: None,
            turn_started_at: None,
            scores: HashMap::new(),
            current_round: 1,
            last_word: None,
            winner_id: None,
            game_over_reason: None,
        }
    }

    pub fn has_used(&self, word: &str) -> bool {
        let normalized = word.trim().to_lowercase();
        self.used_words.iter().any(|used| used == &normalized)
    }

    pub fn score_of(&self, player_id: PlayerId) -> i32 {
        self.scores.get(&player_id).copied().unwrap_or(0)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Room {
    pub id: RoomId,
    pub code: String,
    pub host_id: PlayerId,
    pub players: Vec<PlayerProfile>,
    pub is_public: bool,
    pub mode: GameMode,
    pub settings: GameSettings,
    pub status: RoomStatus,
    pub game_state: GameState,
    pub created_at: String, // ISO 8601 string
}

impl Room {
    pub const MAX_PLAYERS: usize = 2;

    pub fn is_member(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= Self::MAX_PLAYERS
    }

    pub fn member(&self, player_id: PlayerId) -> Option<&PlayerProfile> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn opponent_of(&self, player_id: PlayerId) -> Option<&PlayerProfile> {
        self.players.iter().find(|p| p.id != player_id)
    }

    pub fn display_name(&self, player_id: PlayerId) -> String {
        self.member(player_id)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| player_id.to_string())
    }

    /// Whether `player_id` holds the turn in a running game.
    pub fn is_current(&self, player_id: PlayerId) -> bool {
        self.status == RoomStatus::Playing
            && self.game_state.current_player_id == Some(player_id)
    }
}
