use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use duel_core::{generate_code, new_room, reduce, RoomAction};
use duel_types::{DuelError, GameMode, GameSettings, PlayerProfile, Room, RoomStatus};

use crate::config::DuelConfig;
use crate::store::RoomStore;

/// What a player asks matchmaking for.
#[derive(Debug, Clone)]
pub struct MatchPreferences {
    pub mode: GameMode,
    pub settings: GameSettings,
}

impl MatchPreferences {
    pub fn new(mode: GameMode) -> Self {
        Self {
            mode,
            settings: GameSettings::default(),
        }
    }
}

/// How `find_match` seated the player.
#[derive(Debug, Clone)]
pub enum MatchResult {
    /// Seated into an existing public room (the game starts right away).
    Joined { room: Room },
    /// No open room fit, so the player now hosts a fresh public one.
    Created { room: Room },
}

impl MatchResult {
    pub fn room(&self) -> &Room {
        match self {
            MatchResult::Joined { room } | MatchResult::Created { room } => room,
        }
    }
}

/// Seats players: find-or-create for public games, shareable codes for
/// private ones. Stateless besides the store, so any number of peers can
/// run it concurrently against the same room collection.
pub struct Matchmaker {
    store: Arc<dyn RoomStore>,
    config: DuelConfig,
}

impl Matchmaker {
    pub fn new(store: Arc<dyn RoomStore>, config: DuelConfig) -> Self {
        Self { store, config }
    }

    /// Create a room with `host` seated, retrying the code draw while it
    /// collides with live rooms.
    pub async fn create_room(
        &self,
        host: PlayerProfile,
        mode: GameMode,
        settings: GameSettings,
        is_public: bool,
    ) -> Result<Room, DuelError> {
        let host_id = host.id;
        for _ in 0..self.config.code_attempts {
            let code = generate_code(self.config.code_length);
            let room = new_room(host.clone(), mode, settings.clone(), is_public, code);
            match self.store.create(room).await {
                Ok(created) => {
                    info!("Player {} hosts room {}", host_id, created.code);
                    return Ok(created);
                }
                Err(DuelError::CodeTaken { code }) => {
                    debug!("Join code {} already taken, drawing another", code);
                }
                Err(e) => return Err(e),
            }
        }
        Err(DuelError::RoomCreation {
            attempts: self.config.code_attempts,
        })
    }

    /// Join a room by its shareable code. Codes match case-insensitively;
    /// re-joining a room the player already sits in returns it unchanged.
    pub async fn join_by_code(
        &self,
        player: PlayerProfile,
        code: &str,
    ) -> Result<Room, DuelError> {
        let code = code.trim().to_uppercase();
        let Some(room) = self.store.read(&code).await? else {
            return Err(DuelError::RoomNotFound { code });
        };
        self.seat(room, player).await
    }

    /// Find a public waiting room for `preferences`, or host a fresh one
    /// when there is none. Candidates that fill up or vanish between
    /// discovery and join are skipped; losing every race falls back to
    /// hosting.
    pub async fn find_match(
        &self,
        player: PlayerProfile,
        preferences: MatchPreferences,
    ) -> Result<MatchResult, DuelError> {
        for candidate in self.store.find_open(preferences.mode).await? {
            if candidate.is_member(player.id) {
                return Ok(MatchResult::Joined { room: candidate });
            }
            match self.seat(candidate, player.clone()).await {
                Ok(room) => return Ok(MatchResult::Joined { room }),
                Err(DuelError::RoomFull { .. }) | Err(DuelError::RoomNotFound { .. }) => {
                    debug!("Lost the join race, trying the next open room");
                }
                Err(e) => return Err(e),
            }
        }
        let room = self
            .create_room(player, preferences.mode, preferences.settings, true)
            .await?;
        Ok(MatchResult::Created { room })
    }

    async fn seat(&self, room: Room, player: PlayerProfile) -> Result<Room, DuelError> {
        let player_id = player.id;
        let patch = match reduce(&room, RoomAction::Join { player }, Utc::now())? {
            Some(patch) => patch,
            None => return Ok(room), // already seated
        };
        let joined = self.store.update(room.id, patch).await?;
        info!("Player {} joined room {}", player_id, joined.code);

        // Public rooms begin the moment the second seat fills, and the
        // joiner that filled it issues the start.
        if joined.is_public && joined.status == RoomStatus::Waiting && joined.is_full() {
            if let Some(patch) = reduce(&joined, RoomAction::AutoStart, Utc::now())? {
                let started = self.store.update(joined.id, patch).await?;
                info!("Room {} auto-started", started.code);
                return Ok(started);
            }
        }
        Ok(joined)
    }
}
