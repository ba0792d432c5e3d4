use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use duel_core::{reduce, rules, RoomAction};
use duel_types::{
    DuelError, PlayerId, Room, RoomId, RoomStatus, SessionEvent, ValidationRequest,
};

use crate::config::DuelConfig;
use crate::oracle::WordOracle;
use crate::store::{RoomStore, RoomSubscription};
use crate::timer::TurnTimer;

/// What a word submission came to, as seen by the acting player.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The word landed and the turn passed (or the round limit ended the
    /// game on points).
    Accepted { room: Room },
    /// The word was turned down and the match ended in the opponent's
    /// favor.
    Rejected { reason: String, room: Room },
    /// The room moved on while the submission was in flight; nothing was
    /// applied and nothing is owed to the player.
    Superseded,
}

/// A live attachment to one room for one player: owns the subscription and
/// the turn timer, and is the only place either is created or torn down.
/// `leave` (or dropping the session) releases both.
pub struct RoomSession {
    room_id: RoomId,
    local: PlayerId,
    store: Arc<dyn RoomStore>,
    oracle: Arc<dyn WordOracle>,
    subscription: RoomSubscription,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    driver: JoinHandle<()>,
}

impl RoomSession {
    /// Attach `local` to `room`: subscribe to the document and start the
    /// driver that relays changes and runs the opponent-turn countdown.
    pub async fn open(
        store: Arc<dyn RoomStore>,
        oracle: Arc<dyn WordOracle>,
        room: &Room,
        local: PlayerId,
        config: DuelConfig,
    ) -> Result<Self, DuelError> {
        let subscription = store.subscribe(room.id).await?;
        let (events_tx, events) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(
            subscription.clone(),
            store.clone(),
            events_tx,
            room.clone(),
            local,
            config,
        ));
        info!("Session opened on room {} for {}", room.code, local);
        Ok(Self {
            room_id: room.id,
            local,
            store,
            oracle,
            subscription,
            events,
            driver,
        })
    }

    pub fn player_id(&self) -> PlayerId {
        self.local
    }

    /// Latest observed document; `None` once the room is gone.
    pub fn snapshot(&self) -> Option<Room> {
        self.subscription.snapshot()
    }

    /// Next lifecycle event. `None` after the room closed and the queue
    /// drained.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Host-initiated start for a private room. Repeated presses and lost
    /// races are no-ops; only a non-host attempt is an error.
    pub async fn start(&self) -> Result<(), DuelError> {
        let Some(room) = self.snapshot() else {
            return Err(DuelError::RoomNotFound {
                code: self.room_id.to_string(),
            });
        };
        match reduce(
            &room,
            RoomAction::Start {
                requester: self.local,
            },
            Utc::now(),
        ) {
            Ok(Some(patch)) => {
                self.store.update(room.id, patch).await?;
                info!("Room {} started", room.code);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(DuelError::StaleTurn) => {
                debug!("Start on room {} ignored, not ready or already running", room.code);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Submit a word for the local player's turn. The oracle is consulted
    /// first; while that call is in flight the room can move on, in which
    /// case the stale result is discarded and `Superseded` comes back.
    ///
    /// An unavailable oracle is an error and leaves the turn untouched;
    /// the player just tries again.
    pub async fn submit_word(&self, word: &str) -> Result<SubmitOutcome, DuelError> {
        let Some(room) = self.snapshot() else {
            return Ok(SubmitOutcome::Superseded);
        };
        if !room.is_current(self.local) {
            return Ok(SubmitOutcome::Superseded);
        }

        let request = ValidationRequest {
            word: word.trim().to_string(),
            used_words: room.game_state.used_words.clone(),
            language: room.settings.language().to_string(),
            context: rules::rule_context(&room),
        };
        let verdict = self.oracle.validate(&request).await?;

        // Re-reduce against the freshest snapshot; the oracle call may have
        // outlived the turn it was asked about.
        let Some(fresh) = self.snapshot() else {
            return Ok(SubmitOutcome::Superseded);
        };
        let action = if verdict.is_valid {
            RoomAction::AcceptWord {
                player_id: self.local,
                word: request.word.clone(),
            }
        } else {
            let reason = rules::rejection_reason(
                &fresh,
                self.local,
                &request.word,
                verdict.reason.as_deref(),
            );
            RoomAction::RejectWord {
                player_id: self.local,
                reason,
            }
        };
        let patch = match reduce(&fresh, action, Utc::now())? {
            Some(patch) => patch,
            None => return Ok(SubmitOutcome::Superseded),
        };

        let carried_word = patch.push_turn.is_some();
        let finish_reason = patch.game_over_reason.clone();
        let updated = match self.store.update(fresh.id, patch).await {
            Ok(room) => room,
            // The room vanished mid-flight; the submission is moot.
            Err(DuelError::RoomNotFound { .. }) => return Ok(SubmitOutcome::Superseded),
            Err(e) => return Err(e),
        };

        // The store applies guarded patches as no-ops, so whether the write
        // landed is read back off the returned document.
        if carried_word {
            let landed = updated
                .game_state
                .history
                .last()
                .map(|turn| turn.player_id == self.local && turn.word == request.word)
                .unwrap_or(false);
            if landed {
                Ok(SubmitOutcome::Accepted { room: updated })
            } else {
                Ok(SubmitOutcome::Superseded)
            }
        } else if let Some(reason) = finish_reason {
            let landed = updated.status == RoomStatus::Finished
                && updated.game_state.game_over_reason.as_deref() == Some(reason.as_str());
            if landed {
                Ok(SubmitOutcome::Rejected {
                    reason,
                    room: updated,
                })
            } else {
                Ok(SubmitOutcome::Superseded)
            }
        } else {
            Ok(SubmitOutcome::Superseded)
        }
    }

    /// Leave the room and tear the session down. Mid-game this forfeits in
    /// the opponent's favor; in a waiting room it frees the seat, deleting
    /// the document once the last member is gone.
    pub async fn leave(mut self) -> Result<(), DuelError> {
        if let Some(room) = self.snapshot() {
            match reduce(
                &room,
                RoomAction::Leave {
                    player_id: self.local,
                },
                Utc::now(),
            ) {
                Ok(Some(patch)) => match self.store.update(room.id, patch).await {
                    Ok(updated) => {
                        info!("Player {} left room {}", self.local, room.code);
                        if updated.status == RoomStatus::Waiting && updated.players.is_empty() {
                            self.store.delete(room.id).await?;
                        }
                    }
                    // Already torn down elsewhere; nothing left to leave.
                    Err(DuelError::RoomNotFound { .. }) => {}
                    Err(e) => return Err(e),
                },
                Ok(None) => {}
                Err(e) => warn!("Leave on room {} failed to reduce: {}", room.code, e),
            }
        }
        self.shutdown();
        Ok(())
    }

    fn shutdown(&mut self) {
        self.driver.abort();
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Session driver: one task per open session. Forwards document changes as
/// events and runs the opponent-turn countdown, issuing the idempotent
/// timeout when it fires. Ends when the room is deleted or the session is
/// torn down.
async fn drive(
    mut subscription: RoomSubscription,
    store: Arc<dyn RoomStore>,
    events: mpsc::UnboundedSender<SessionEvent>,
    initial: Room,
    local: PlayerId,
    config: DuelConfig,
) {
    let mut timer = TurnTimer::new();
    let mut previous = initial;
    timer.observe(&previous, local, &config);

    loop {
        tokio::select! {
            changed = subscription.changed() => {
                let Some(room) = changed else {
                    debug!("Room gone, session driver for {} stopping", local);
                    let _ = events.send(SessionEvent::RoomClosed);
                    break;
                };
                relay(&events, &previous, &room);
                timer.observe(&room, local, &config);
                previous = room;
            }
            _ = timer.expired(), if timer.is_armed() => {
                let expired = timer.expiring_player();
                timer.disarm();
                if let Some(player_id) = expired {
                    expire_turn(&store, &subscription, player_id).await;
                }
            }
        }
    }
}

/// Translate a document change into the events the owner cares about.
fn relay(events: &mpsc::UnboundedSender<SessionEvent>, previous: &Room, room: &Room) {
    let _ = events.send(SessionEvent::RoomUpdated { room: room.clone() });

    if room.status == RoomStatus::Playing {
        let turn_changed = previous.status != RoomStatus::Playing
            || previous.game_state.current_player_id != room.game_state.current_player_id
            || previous.game_state.turn_started_at != room.game_state.turn_started_at;
        if turn_changed {
            if let Some(player_id) = room.game_state.current_player_id {
                let _ = events.send(SessionEvent::TurnStarted { player_id });
            }
        }
    }

    if room.status == RoomStatus::Finished && previous.status != RoomStatus::Finished {
        let _ = events.send(SessionEvent::GameOver {
            winner_id: room.game_state.winner_id,
            reason: room
                .game_state
                .game_over_reason
                .clone()
                .unwrap_or_default(),
        });
    }
}

/// Issue the timeout the countdown decided on. Losing the race to any other
/// transition is fine: the write lands as a guarded no-op.
async fn expire_turn(store: &Arc<dyn RoomStore>, subscription: &RoomSubscription, player_id: PlayerId) {
    let Some(room) = subscription.snapshot() else {
        return;
    };
    match reduce(&room, RoomAction::ExpireTurn { player_id }, Utc::now()) {
        Ok(Some(patch)) => match store.update(room.id, patch).await {
            Ok(_) => info!("Turn of {} expired in room {}", player_id, room.code),
            Err(e) => warn!("Timeout write for room {} failed: {}", room.code, e),
        },
        Ok(None) => debug!("Timeout in room {} already superseded", room.code),
        Err(e) => warn!("Timeout reduction for room {} failed: {}", room.code, e),
    }
}
