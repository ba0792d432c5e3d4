use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{PlayerId, Room};

/// Lifecycle notifications a room session forwards to its owner as the
/// shared document changes underneath it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SessionEvent {
    RoomUpdated { room: Room },
    TurnStarted { player_id: PlayerId },
    GameOver {
        winner_id: Option<PlayerId>,
        reason: String,
    },
    RoomClosed,
}
