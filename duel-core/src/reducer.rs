use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use duel_types::{
    DuelError, GameMode, GameSettings, GameState, PlayerId, PlayerProfile, Room, RoomStatus,
    TurnRecord,
};

use crate::patch::{RoomPatch, TurnKey};
use crate::rules;

/// Everything that can happen to a room. Remote sessions and the local AI
/// engine both drive state exclusively through these, so the two kinds of
/// match play by byte-identical rules.
#[derive(Debug, Clone)]
pub enum RoomAction {
    Join { player: PlayerProfile },
    /// Host pressed start in a private room.
    Start { requester: PlayerId },
    /// A public room filled its second seat.
    AutoStart,
    /// The current player's word passed validation.
    AcceptWord { player_id: PlayerId, word: String },
    /// The current player's word failed validation; `reason` is the final
    /// game-over reason.
    RejectWord { player_id: PlayerId, reason: String },
    /// The current player's turn timer ran out.
    ExpireTurn { player_id: PlayerId },
    Leave { player_id: PlayerId },
}

/// Build a fresh waiting room with `host` seated.
pub fn new_room(
    host: PlayerProfile,
    mode: GameMode,
    settings: GameSettings,
    is_public: bool,
    code: String,
) -> Room {
    Room {
        id: Uuid::new_v4(),
        code,
        host_id: host.id,
        players: vec![host],
        is_public,
        mode,
        settings,
        status: RoomStatus::Waiting,
        game_state: GameState::new(),
        created_at: Utc::now().to_rfc3339(),
    }
}

/// Decide what `action` does to `room` as of `now`.
///
/// Pure: the room is only read, and the change comes back as a patch for
/// the caller to apply through its store. `Ok(None)` means the action no
/// longer applies (timeout for a turn that already ended, a word from a
/// player whose turn passed) and must be dropped silently.
pub fn reduce(
    room: &Room,
    action: RoomAction,
    now: DateTime<Utc>,
) -> Result<Option<RoomPatch>, DuelError> {
    match action {
        RoomAction::Join { player } => join(room, player),
        RoomAction::Start { requester } => start(room, Some(requester), now),
        RoomAction::AutoStart => start(room, None, now),
        RoomAction::AcceptWord { player_id, word } => accept_word(room, player_id, &word, now),
        RoomAction::RejectWord { player_id, reason } => reject_word(room, player_id, &reason),
        RoomAction::ExpireTurn { player_id } => expire_turn(room, player_id),
        RoomAction::Leave { player_id } => leave(room, player_id),
    }
}

fn join(room: &Room, player: PlayerProfile) -> Result<Option<RoomPatch>, DuelError> {
    if room.is_member(player.id) {
        return Ok(None);
    }
    if room.status != RoomStatus::Waiting || room.is_full() {
        return Err(DuelError::RoomFull {
            code: room.code.clone(),
        });
    }
    Ok(Some(RoomPatch {
        add_player: Some(player),
        ..RoomPatch::default()
    }))
}

fn start(
    room: &Room,
    requester: Option<PlayerId>,
    now: DateTime<Utc>,
) -> Result<Option<RoomPatch>, DuelError> {
    if let Some(requester) = requester {
        if requester != room.host_id {
            return Err(DuelError::NotHost {
                player_id: requester,
            });
        }
    }
    if room.status != RoomStatus::Waiting || room.players.len() < Room::MAX_PLAYERS {
        return Err(DuelError::StaleTurn);
    }
    // The host moves first.
    let first = room.players[0].id;
    Ok(Some(RoomPatch {
        status: Some(RoomStatus::Playing),
        current_player_id: Some(first),
        turn_started_at: Some(now.to_rfc3339()),
        ..RoomPatch::default()
    }))
}

fn accept_word(
    room: &Room,
    player_id: PlayerId,
    word: &str,
    now: DateTime<Utc>,
) -> Result<Option<RoomPatch>, DuelError> {
    if !room.is_current(player_id) {
        debug!("Word from {} arrived after the turn moved on", player_id);
        return Ok(None);
    }
    let Some(opponent) = room.opponent_of(player_id) else {
        return Ok(None);
    };
    let opponent_id = opponent.id;

    // Hard rules hold even when the oracle let the word through.
    if let Some(violation) = rules::hard_rule_violation(room, word) {
        let reason = rules::rejection_reason(room, player_id, word.trim(), Some(&violation));
        return reject_word(room, player_id, &reason);
    }

    let record = TurnRecord {
        player_id,
        word: word.trim().to_string(),
    };
    let expect_turn = TurnKey::of(room);

    // A round is two submissions, one per player.
    let round_complete = (room.game_state.history.len() + 1) % Room::MAX_PLAYERS == 0;
    let next_round = if round_complete {
        room.game_state.current_round + 1
    } else {
        room.game_state.current_round
    };

    let scores = (room.mode == GameMode::Longest).then(|| {
        let mut scores = room.game_state.scores.clone();
        *scores.entry(player_id).or_insert(0) += rules::word_score(word);
        scores
    });

    // Longest mode ends on points once the round counter passes the limit,
    // judged only after both players moved in the round.
    if room.mode == GameMode::Longest
        && round_complete
        && next_round > room.settings.round_limit()
    {
        let totals = scores.clone().unwrap_or_default();
        let mine = totals.get(&player_id).copied().unwrap_or(0);
        let theirs = totals.get(&opponent_id).copied().unwrap_or(0);
        let (winner_id, reason) = if mine > theirs {
            (
                Some(player_id),
                format!("{} wins {} to {}", room.display_name(player_id), mine, theirs),
            )
        } else if theirs > mine {
            (
                Some(opponent_id),
                format!(
                    "{} wins {} to {}",
                    room.display_name(opponent_id),
                    theirs,
                    mine
                ),
            )
        } else {
            (None, format!("draw: both players scored {}", mine))
        };
        return Ok(Some(RoomPatch {
            status: Some(RoomStatus::Finished),
            push_turn: Some(record),
            scores,
            current_round: Some(next_round),
            winner_id,
            game_over_reason: Some(reason),
            expect_turn,
            ..RoomPatch::default()
        }));
    }

    let last_word = (room.mode == GameMode::Chain).then(|| record.word.clone());
    Ok(Some(RoomPatch {
        push_turn: Some(record),
        current_player_id: Some(opponent_id),
        turn_started_at: Some(now.to_rfc3339()),
        current_round: round_complete.then_some(next_round),
        scores,
        last_word,
        expect_turn,
        ..RoomPatch::default()
    }))
}

fn reject_word(
    room: &Room,
    player_id: PlayerId,
    reason: &str,
) -> Result<Option<RoomPatch>, DuelError> {
    if !room.is_current(player_id) {
        return Ok(None);
    }
    let Some(opponent) = room.opponent_of(player_id) else {
        return Ok(None);
    };
    Ok(Some(RoomPatch {
        status: Some(RoomStatus::Finished),
        winner_id: Some(opponent.id),
        game_over_reason: Some(reason.to_string()),
        expect_turn: TurnKey::of(room),
        ..RoomPatch::default()
    }))
}

fn expire_turn(room: &Room, player_id: PlayerId) -> Result<Option<RoomPatch>, DuelError> {
    if !room.is_current(player_id) {
        debug!("Timeout for {} hit a turn that already ended, ignoring", player_id);
        return Ok(None);
    }
    let Some(opponent) = room.opponent_of(player_id) else {
        return Ok(None);
    };
    Ok(Some(RoomPatch {
        status: Some(RoomStatus::Finished),
        winner_id: Some(opponent.id),
        game_over_reason: Some(format!("{} ran out of time", room.display_name(player_id))),
        expect_turn: TurnKey::of(room),
        ..RoomPatch::default()
    }))
}

fn leave(room: &Room, player_id: PlayerId) -> Result<Option<RoomPatch>, DuelError> {
    if !room.is_member(player_id) {
        return Ok(None);
    }
    match room.status {
        RoomStatus::Waiting => Ok(Some(RoomPatch {
            remove_player: Some(player_id),
            ..RoomPatch::default()
        })),
        RoomStatus::Playing => {
            let Some(opponent) = room.opponent_of(player_id) else {
                return Ok(None);
            };
            Ok(Some(RoomPatch {
                status: Some(RoomStatus::Finished),
                winner_id: Some(opponent.id),
                game_over_reason: Some(format!("{} left the game", room.display_name(player_id))),
                ..RoomPatch::default()
            }))
        }
        RoomStatus::Finished => Ok(None),
    }
}
