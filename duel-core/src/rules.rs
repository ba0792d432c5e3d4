use duel_types::{GameMode, PlayerId, Room, RuleContext};

/// Rule context the oracle needs to judge the next word in this room.
pub fn rule_context(room: &Room) -> RuleContext {
    match room.mode {
        GameMode::Theme => RuleContext::Theme {
            theme: room.settings.theme.clone().unwrap_or_default(),
        },
        GameMode::Longest => RuleContext::Longest,
        GameMode::Chain => RuleContext::Chain {
            last_word: room.game_state.last_word.clone(),
        },
    }
}

/// Longest-mode score for a word: one point per character.
pub fn word_score(word: &str) -> i32 {
    word.trim().chars().count() as i32
}

/// The letter the next chain word has to start with, lowercased. `None`
/// when the chain has not started yet.
pub fn chain_initial(last_word: Option<&str>) -> Option<String> {
    last_word
        .and_then(|word| word.trim().chars().last())
        .map(|c| c.to_lowercase().to_string())
}

/// Rules the engine checks locally, whatever the oracle said. Returns the
/// reason the word breaks them, if it does. Duplicates and chain linkage
/// are hard rules: an oracle that waves an offending word through must not
/// be able to corrupt the match.
pub fn hard_rule_violation(room: &Room, word: &str) -> Option<String> {
    let trimmed = word.trim();
    if trimmed.is_empty() {
        return Some("an empty word is not playable".to_string());
    }
    if room.game_state.has_used(trimmed) {
        return Some(format!("'{}' has already been played", trimmed));
    }
    if room.mode == GameMode::Chain {
        if let Some(required) = chain_initial(room.game_state.last_word.as_deref()) {
            let initial = trimmed
                .chars()
                .next()
                .map(|c| c.to_lowercase().to_string());
            if initial.as_deref() != Some(required.as_str()) {
                return Some(format!(
                    "'{}' does not start with '{}'",
                    trimmed, required
                ));
            }
        }
    }
    None
}

/// Game-over reason for a word the rules or the oracle turned down.
pub fn rejection_reason(
    room: &Room,
    player_id: PlayerId,
    word: &str,
    oracle_reason: Option<&str>,
) -> String {
    let name = room.display_name(player_id);
    match oracle_reason {
        Some(reason) => format!("{} played an invalid word '{}': {}", name, word, reason),
        None => format!("{} played an invalid word '{}'", name, word),
    }
}
