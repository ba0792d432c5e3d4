use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use duel_core::{new_room, reduce, rules, RoomAction};
use duel_types::{
    Difficulty, DuelError, GameMode, GameSettings, PlayerId, PlayerProfile, Room, RoomStatus,
    SuggestionRequest, ValidationRequest,
};

use crate::config::DuelConfig;
use crate::oracle::{SuggestionOracle, WordOracle};
use crate::session::SubmitOutcome;

/// One move the AI produced, or its concession.
#[derive(Debug, Clone)]
pub struct AiMove {
    /// `None` when the AI conceded without playing.
    pub word: Option<String>,
    pub accepted: bool,
    /// The game-over reason when the move ended the match badly for the AI.
    pub note: Option<String>,
}

/// A match against the scripted opponent, run entirely in this process.
///
/// The room document is synthetic and never touches a store, but every
/// move goes through the same reduction a remote game uses, so the AI
/// plays under exactly the rules a human opponent would. There is no turn
/// timer here; the AI paces itself with a simulated thinking delay
/// instead.
pub struct AiMatch {
    room: Room,
    human: PlayerId,
    bot: PlayerId,
    difficulty: Difficulty,
    validator: Arc<dyn WordOracle>,
    suggester: Arc<dyn SuggestionOracle>,
    config: DuelConfig,
}

impl AiMatch {
    pub fn new(
        human: PlayerProfile,
        mode: GameMode,
        settings: GameSettings,
        difficulty: Difficulty,
        validator: Arc<dyn WordOracle>,
        suggester: Arc<dyn SuggestionOracle>,
        config: DuelConfig,
    ) -> Self {
        let human_id = human.id;
        let bot = PlayerProfile {
            id: uuid::Uuid::new_v4(),
            display_name: bot_name(difficulty).to_string(),
            avatar: None,
        };
        let bot_id = bot.id;

        let mut room = new_room(human, mode, settings, false, String::new());
        room.players.push(bot);
        room.status = RoomStatus::Playing;
        room.game_state.current_player_id = Some(human_id);
        room.game_state.turn_started_at = Some(Utc::now().to_rfc3339());
        info!(
            "AI match started: {:?} against {} ({:?})",
            mode,
            room.players[1].display_name,
            difficulty
        );

        Self {
            room,
            human: human_id,
            bot: bot_id,
            difficulty,
            validator,
            suggester,
            config,
        }
    }

    /// The live match document.
    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn bot_id(&self) -> PlayerId {
        self.bot
    }

    pub fn is_over(&self) -> bool {
        self.room.status == RoomStatus::Finished
    }

    pub fn is_humans_turn(&self) -> bool {
        self.room.is_current(self.human)
    }

    /// Submit the human player's word, under the same validation a remote
    /// match runs. An unavailable oracle leaves the turn untouched so the
    /// player can retry.
    pub async fn submit_word(&mut self, word: &str) -> Result<SubmitOutcome, DuelError> {
        if !self.room.is_current(self.human) {
            return Ok(SubmitOutcome::Superseded);
        }
        let request = ValidationRequest {
            word: word.trim().to_string(),
            used_words: self.room.game_state.used_words.clone(),
            language: self.room.settings.language().to_string(),
            context: rules::rule_context(&self.room),
        };
        let verdict = self.validator.validate(&request).await?;

        let action = if verdict.is_valid {
            RoomAction::AcceptWord {
                player_id: self.human,
                word: request.word.clone(),
            }
        } else {
            let reason = rules::rejection_reason(
                &self.room,
                self.human,
                &request.word,
                verdict.reason.as_deref(),
            );
            RoomAction::RejectWord {
                player_id: self.human,
                reason,
            }
        };
        self.apply(action)
    }

    /// Let the AI take its turn: think for a while, ask for a suggestion,
    /// and re-validate it through the same oracle the human faces. Any
    /// failure on the AI's side concedes the match in the human's favor
    /// rather than surfacing an error. `None` when it is not the AI's turn.
    pub async fn ai_move(&mut self) -> Option<AiMove> {
        if !self.room.is_current(self.bot) {
            return None;
        }
        self.think().await;

        let request = SuggestionRequest {
            used_words: self.room.game_state.used_words.clone(),
            language: self.room.settings.language().to_string(),
            difficulty: self.difficulty,
            context: rules::rule_context(&self.room),
        };
        let suggestion = match self.suggester.suggest(&request).await {
            Ok(Some(word)) if !word.trim().is_empty() => word.trim().to_string(),
            Ok(_) => return Some(self.concede("could not think of a word")),
            Err(e) => {
                warn!("AI suggestion failed: {}", e);
                return Some(self.concede("could not think of a word"));
            }
        };

        let validation = ValidationRequest {
            word: suggestion.clone(),
            used_words: self.room.game_state.used_words.clone(),
            language: self.room.settings.language().to_string(),
            context: rules::rule_context(&self.room),
        };
        let verdict = match self.validator.validate(&validation).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("AI validation failed: {}", e);
                return Some(self.concede("could not verify a word"));
            }
        };

        if verdict.is_valid {
            match self.apply(RoomAction::AcceptWord {
                player_id: self.bot,
                word: suggestion.clone(),
            }) {
                Ok(SubmitOutcome::Rejected { reason, .. }) => Some(AiMove {
                    word: Some(suggestion),
                    accepted: false,
                    note: Some(reason),
                }),
                Ok(_) => Some(AiMove {
                    word: Some(suggestion),
                    accepted: true,
                    note: None,
                }),
                Err(e) => {
                    warn!("AI move failed to apply: {}", e);
                    Some(self.concede("could not verify a word"))
                }
            }
        } else {
            let reason =
                rules::rejection_reason(&self.room, self.bot, &suggestion, verdict.reason.as_deref());
            info!("AI played an invalid word '{}' and forfeits", suggestion);
            let _ = self.apply(RoomAction::RejectWord {
                player_id: self.bot,
                reason: reason.clone(),
            });
            Some(AiMove {
                word: Some(suggestion),
                accepted: false,
                note: Some(reason),
            })
        }
    }

    fn apply(&mut self, action: RoomAction) -> Result<SubmitOutcome, DuelError> {
        let patch = match reduce(&self.room, action, Utc::now())? {
            Some(patch) => patch,
            None => return Ok(SubmitOutcome::Superseded),
        };
        let was_rejection =
            patch.status == Some(RoomStatus::Finished) && patch.push_turn.is_none();
        let reason = patch.game_over_reason.clone();
        patch.apply(&mut self.room)?;

        if was_rejection {
            Ok(SubmitOutcome::Rejected {
                reason: reason.unwrap_or_default(),
                room: self.room.clone(),
            })
        } else {
            Ok(SubmitOutcome::Accepted {
                room: self.room.clone(),
            })
        }
    }

    fn concede(&mut self, note: &str) -> AiMove {
        let reason = format!("{} {}", self.room.display_name(self.bot), note);
        info!("AI concedes: {}", reason);
        let _ = self.apply(RoomAction::RejectWord {
            player_id: self.bot,
            reason: reason.clone(),
        });
        AiMove {
            word: None,
            accepted: false,
            note: Some(reason),
        }
    }

    /// Simulated thinking, jittered inside the difficulty's window.
    async fn think(&self) {
        let (floor, ceiling) = self.config.think_bounds(self.difficulty);
        if ceiling == 0 {
            return;
        }
        let millis = if ceiling > floor {
            rand::thread_rng().gen_range(floor..=ceiling)
        } else {
            floor
        };
        debug!("AI thinking for {}ms", millis);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

fn bot_name(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "AI (easy)",
        Difficulty::Medium => "AI (medium)",
        Difficulty::Hard => "AI (hard)",
    }
}
