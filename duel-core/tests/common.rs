use chrono::Utc;
use duel_core::{new_room, reduce, RoomAction};
use duel_types::{GameMode, GameSettings, PlayerId, PlayerProfile, Room, RoomStatus};

/// Creates a test player with the given display name
pub fn create_test_player(name: &str) -> PlayerProfile {
    PlayerProfile::new(name)
}

/// Reduces an action against a room and applies the resulting patch
pub fn drive(room: &mut Room, action: RoomAction) -> bool {
    match reduce(room, action, Utc::now()).expect("action should reduce") {
        Some(patch) => patch.apply(room).expect("patch should apply"),
        None => false,
    }
}

/// Creates a waiting two-player room for the given mode
pub fn create_room_for_mode(mode: GameMode, settings: GameSettings) -> Room {
    let host = create_test_player("Alice");
    let mut room = new_room(host, mode, settings, false, "TEST42".to_string());
    drive(
        &mut room,
        RoomAction::Join {
            player: create_test_player("Bob"),
        },
    );
    room
}

/// Creates a standard chain-mode room with Alice hosting and Bob seated
pub fn create_standard_room() -> Room {
    create_room_for_mode(GameMode::Chain, GameSettings::default())
}

/// Creates a room already in play, with the host holding the first turn
pub fn create_playing_room(mode: GameMode, settings: GameSettings) -> Room {
    let mut room = create_room_for_mode(mode, settings);
    let requester = room.host_id;
    drive(&mut room, RoomAction::Start { requester });
    room
}

/// Plays a word for whichever player currently holds the turn
pub fn play_current_word(room: &mut Room, word: &str) {
    let player_id = room
        .game_state
        .current_player_id
        .expect("room should have an active turn");
    drive(
        room,
        RoomAction::AcceptWord {
            player_id,
            word: word.to_string(),
        },
    );
}

/// Asserts a room's status and current turn holder
pub fn assert_room_state(room: &Room, expected_status: RoomStatus, expected_turn: Option<PlayerId>) {
    assert_eq!(
        room.status, expected_status,
        "Expected status {:?}, got {:?}",
        expected_status, room.status
    );
    assert_eq!(
        room.game_state.current_player_id, expected_turn,
        "Expected turn holder {:?}, got {:?}",
        expected_turn, room.game_state.current_player_id
    );
}

/// Helper to get a player by display name
pub fn get_player_by_name<'a>(room: &'a Room, name: &str) -> Option<&'a PlayerProfile> {
    room.players.iter().find(|p| p.display_name == name)
}

/// Helper to read a player's score by display name
pub fn score_by_name(room: &Room, name: &str) -> i32 {
    let player = get_player_by_name(room, name).expect("player should be seated");
    room.game_state.score_of(player.id)
}
