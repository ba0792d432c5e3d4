use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::PlayerId;

/// Everything that can go wrong across matchmaking, room play, and the
/// word oracle. Turn-level races are deliberately absent: a write that
/// lost its race is skipped, not failed.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum DuelError {
    #[error("room {code} not found")]
    RoomNotFound { code: String },

    #[error("room {code} is already full")]
    RoomFull { code: String },

    #[error("could not allocate a room code after {attempts} attempts")]
    RoomCreation { attempts: u32 },

    #[error("room code {code} is already taken")]
    CodeTaken { code: String },

    #[error("player {player_id} is not the host")]
    NotHost { player_id: PlayerId },

    #[error("the turn moved on before the action could apply")]
    StaleTurn,

    #[error("word oracle unavailable: {message}")]
    OracleUnavailable { message: String },

    #[error("room store failure: {message}")]
    Store { message: String },
}
