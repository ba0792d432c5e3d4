use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use duel_types::{PlayerId, Room, RoomStatus};

use crate::config::DuelConfig;

/// Countdown for the turn currently visible through a room subscription.
///
/// Only the peer that is NOT acting arms it, so the slow player cannot
/// suppress their own timeout by going quiet. Firing is advisory: the
/// reducer and the store guards decide whether the expiry still applies.
#[derive(Debug, Default)]
pub struct TurnTimer {
    deadline: Option<Instant>,
    armed_for: Option<(PlayerId, Option<String>)>,
}

impl TurnTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The player the armed deadline counts against.
    pub fn expiring_player(&self) -> Option<PlayerId> {
        self.armed_for.as_ref().map(|(player_id, _)| *player_id)
    }

    /// Reconcile with the latest observed document: arm when the opponent
    /// holds the turn, re-arm when a new turn starts, disarm once the room
    /// is no longer playing. `local` is the player this peer acts for.
    pub fn observe(&mut self, room: &Room, local: PlayerId, config: &DuelConfig) {
        if room.status != RoomStatus::Playing {
            self.disarm();
            return;
        }
        let Some(current) = room.game_state.current_player_id else {
            self.disarm();
            return;
        };
        if current == local {
            // Acting players do not time out their own turn.
            self.disarm();
            return;
        }
        let turn = (current, room.game_state.turn_started_at.clone());
        if self.armed_for.as_ref() == Some(&turn) {
            return;
        }
        debug!("Turn timer armed against {}", current);
        self.deadline = Some(turn_deadline(
            room.game_state.turn_started_at.as_deref(),
            config,
        ));
        self.armed_for = Some(turn);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
        self.armed_for = None;
    }

    /// Resolves once the armed deadline passes; pends forever while
    /// disarmed. Meant for `select!` next to the subscription.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

/// Deadline for a turn that started at `turn_started_at` (RFC 3339),
/// honoring time already burned. A missing or unreadable timestamp counts
/// from now, which restarts the turn instead of instantly forfeiting it.
pub fn turn_deadline(turn_started_at: Option<&str>, config: &DuelConfig) -> Instant {
    let full = Duration::from_secs(config.turn_seconds)
        + Duration::from_millis(config.turn_grace_millis);
    let elapsed = turn_started_at
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|started| {
            (Utc::now() - started.with_timezone(&Utc))
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
        .unwrap_or(Duration::ZERO);
    Instant::now() + full.saturating_sub(elapsed)
}
