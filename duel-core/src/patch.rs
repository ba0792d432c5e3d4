use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use duel_types::{DuelError, PlayerId, PlayerProfile, Room, RoomStatus, TurnRecord};

/// The turn a conditional write expects the room to still be in. A write
/// carrying one lands only while that exact turn is live, which is what
/// resolves submit-versus-timeout races no matter which side wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnKey {
    pub player_id: PlayerId,
    pub turn_started_at: Option<String>,
}

impl TurnKey {
    pub fn of(room: &Room) -> Option<Self> {
        room.game_state.current_player_id.map(|player_id| Self {
            player_id,
            turn_started_at: room.game_state.turn_started_at.clone(),
        })
    }
}

/// One write against a room document. Set slots are merged field by field;
/// unset slots leave the stored value alone, so concurrent writers only
/// collide on the fields they both touch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomPatch {
    pub status: Option<RoomStatus>,
    pub add_player: Option<PlayerProfile>,
    pub remove_player: Option<PlayerId>,
    pub current_player_id: Option<PlayerId>,
    pub turn_started_at: Option<String>,
    pub push_turn: Option<TurnRecord>,
    pub scores: Option<HashMap<PlayerId, i32>>,
    pub current_round: Option<i32>,
    pub last_word: Option<String>,
    pub winner_id: Option<PlayerId>,
    pub game_over_reason: Option<String>,
    pub expect_turn: Option<TurnKey>,
}

impl RoomPatch {
    /// Merge this patch into `room`, returning whether anything was written.
    ///
    /// Three guards make concurrent writers safe without coordination: a
    /// finished room accepts no further writes, status can only move
    /// forward through the lifecycle, and a patch with a stale `expect_turn`
    /// is skipped. A skipped patch is `Ok(false)`, never an error.
    pub fn apply(&self, room: &mut Room) -> Result<bool, DuelError> {
        if room.status == RoomStatus::Finished {
            return Ok(false);
        }
        if let Some(status) = self.status {
            if status <= room.status {
                return Ok(false);
            }
        }
        if let Some(expect) = &self.expect_turn {
            let turn_is_live = room.status == RoomStatus::Playing
                && room.game_state.current_player_id == Some(expect.player_id)
                && room.game_state.turn_started_at == expect.turn_started_at;
            if !turn_is_live {
                return Ok(false);
            }
        }

        if let Some(player) = &self.add_player {
            if !room.is_member(player.id) {
                if room.status != RoomStatus::Waiting || room.is_full() {
                    return Err(DuelError::RoomFull {
                        code: room.code.clone(),
                    });
                }
                room.players.push(player.clone());
            }
        }
        if let Some(player_id) = self.remove_player {
            room.players.retain(|p| p.id != player_id);
        }
        if let Some(status) = self.status {
            room.status = status;
        }
        if let Some(player_id) = self.current_player_id {
            room.game_state.current_player_id = Some(player_id);
        }
        if let Some(started_at) = &self.turn_started_at {
            room.game_state.turn_started_at = Some(started_at.clone());
        }
        if let Some(record) = &self.push_turn {
            room.game_state
                .used_words
                .push(record.word.trim().to_lowercase());
            room.game_state.history.push(record.clone());
        }
        if let Some(scores) = &self.scores {
            room.game_state.scores = scores.clone();
        }
        if let Some(round) = self.current_round {
            room.game_state.current_round = round;
        }
        if let Some(word) = &self.last_word {
            room.game_state.last_word = Some(word.clone());
        }
        if let Some(winner_id) = self.winner_id {
            room.game_state.winner_id = Some(winner_id);
        }
        if let Some(reason) = &self.game_over_reason {
            room.game_state.game_over_reason = Some(reason.clone());
        }
        Ok(true)
    }
}
