use async_trait::async_trait;
use dashmap::{DashMap, Entry};
use tokio::sync::watch;
use tracing::info;

use duel_core::RoomPatch;
use duel_types::{DuelError, GameMode, Room, RoomId, RoomStatus};

/// Live view of one room document. Every delivery carries the full current
/// document; `None` means the room is gone. Intermediate states may be
/// skipped, the latest one never is. Dropping the subscription detaches it.
#[derive(Debug, Clone)]
pub struct RoomSubscription {
    rx: watch::Receiver<Option<Room>>,
}

impl RoomSubscription {
    pub fn new(rx: watch::Receiver<Option<Room>>) -> Self {
        Self { rx }
    }

    /// Latest known document without waiting.
    pub fn snapshot(&self) -> Option<Room> {
        self.rx.borrow().clone()
    }

    /// Wait for the next change and return the document as of that change.
    /// `None` once the room is deleted or the store shut down.
    pub async fn changed(&mut self) -> Option<Room> {
        match self.rx.changed().await {
            Ok(()) => self.rx.borrow_and_update().clone(),
            Err(_) => None,
        }
    }
}

/// The persistence boundary for rooms: a keyed document store with live
/// subscriptions. Implementations apply `update` atomically per document
/// and notify subscribers of every applied change.
#[async_trait]
pub trait RoomStore: Send + Sync + 'static {
    /// Insert a new room. Fails with `CodeTaken` when another live room
    /// already owns the join code.
    async fn create(&self, room: Room) -> Result<Room, DuelError>;

    /// Point read by join code.
    async fn read(&self, code: &str) -> Result<Option<Room>, DuelError>;

    /// Public waiting rooms of the given mode with a free seat.
    async fn find_open(&self, mode: GameMode) -> Result<Vec<Room>, DuelError>;

    /// Apply a patch and return the resulting document. A patch skipped by
    /// its own guards still succeeds; the unchanged document comes back.
    async fn update(&self, id: RoomId, patch: RoomPatch) -> Result<Room, DuelError>;

    /// Remove the room and tell subscribers it is gone. Deleting a missing
    /// room is fine.
    async fn delete(&self, id: RoomId) -> Result<(), DuelError>;

    async fn subscribe(&self, id: RoomId) -> Result<RoomSubscription, DuelError>;
}

struct RoomEntry {
    room: Room,
    tx: watch::Sender<Option<Room>>,
}

/// In-memory `RoomStore`. Patch application happens under the per-room
/// entry lock, which gives it the same atomicity a transactional backend
/// would provide; the shared-document semantics the engine relies on are
/// all exercised against this implementation.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: DashMap<RoomId, RoomEntry>,
    codes: DashMap<String, RoomId>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn create(&self, room: Room) -> Result<Room, DuelError> {
        match self.codes.entry(room.code.clone()) {
            Entry::Occupied(_) => Err(DuelError::CodeTaken {
                code: room.code.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(room.id);
                let (tx, _) = watch::channel(Some(room.clone()));
                self.rooms.insert(
                    room.id,
                    RoomEntry {
                        room: room.clone(),
                        tx,
                    },
                );
                info!("Created room {} ({})", room.code, room.id);
                Ok(room)
            }
        }
    }

    async fn read(&self, code: &str) -> Result<Option<Room>, DuelError> {
        let Some(id) = self.codes.get(code).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.rooms.get(&id).map(|entry| entry.room.clone()))
    }

    async fn find_open(&self, mode: GameMode) -> Result<Vec<Room>, DuelError> {
        Ok(self
            .rooms
            .iter()
            .filter(|entry| {
                let room = &entry.room;
                room.is_public
                    && room.mode == mode
                    && room.status == RoomStatus::Waiting
                    && !room.is_full()
            })
            .map(|entry| entry.room.clone())
            .collect())
    }

    async fn update(&self, id: RoomId, patch: RoomPatch) -> Result<Room, DuelError> {
        let mut entry = self
            .rooms
            .get_mut(&id)
            .ok_or_else(|| DuelError::RoomNotFound {
                code: id.to_string(),
            })?;
        let applied = patch.apply(&mut entry.room)?;
        if applied {
            entry.tx.send_replace(Some(entry.room.clone()));
        }
        Ok(entry.room.clone())
    }

    async fn delete(&self, id: RoomId) -> Result<(), DuelError> {
        if let Some((_, entry)) = self.rooms.remove(&id) {
            self.codes.remove(&entry.room.code);
            entry.tx.send_replace(None);
            info!("Deleted room {} ({})", entry.room.code, id);
        }
        Ok(())
    }

    async fn subscribe(&self, id: RoomId) -> Result<RoomSubscription, DuelError> {
        let entry = self
            .rooms
            .get(&id)
            .ok_or_else(|| DuelError::RoomNotFound {
                code: id.to_string(),
            })?;
        Ok(RoomSubscription::new(entry.tx.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::{new_room, TurnKey};
    use duel_types::{GameSettings, PlayerProfile};

    fn room_with_code(code: &str, is_public: bool) -> Room {
        new_room(
            PlayerProfile::new("Alice"),
            GameMode::Theme,
            GameSettings::default(),
            is_public,
            code.to_string(),
        )
    }

    fn join_patch(name: &str) -> RoomPatch {
        RoomPatch {
            add_player: Some(PlayerProfile::new(name)),
            ..RoomPatch::default()
        }
    }

    fn finish_patch(room: &Room, reason: &str) -> RoomPatch {
        RoomPatch {
            status: Some(RoomStatus::Finished),
            winner_id: Some(room.host_id),
            game_over_reason: Some(reason.to_string()),
            ..RoomPatch::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_read_by_code() {
        let store = MemoryRoomStore::new();
        let created = store.create(room_with_code("AAAA11", true)).await.unwrap();

        let found = store.read("AAAA11").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(store.read("ZZZZ99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let store = MemoryRoomStore::new();
        store.create(room_with_code("AAAA11", true)).await.unwrap();

        let result = store.create(room_with_code("AAAA11", true)).await;
        assert!(matches!(result, Err(DuelError::CodeTaken { .. })));
        assert_eq!(store.room_count(), 1);
    }

    #[tokio::test]
    async fn test_find_open_filters_mode_and_visibility() {
        let store = MemoryRoomStore::new();
        store.create(room_with_code("PUB111", true)).await.unwrap();
        store.create(room_with_code("PRIV11", false)).await.unwrap();
        let mut chain = room_with_code("CHAIN1", true);
        chain.mode = GameMode::Chain;
        store.create(chain).await.unwrap();

        let open = store.find_open(GameMode::Theme).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].code, "PUB111");
    }

    #[tokio::test]
    async fn test_full_rooms_are_not_open() {
        let store = MemoryRoomStore::new();
        let room = store.create(room_with_code("AAAA11", true)).await.unwrap();
        store.update(room.id, join_patch("Bob")).await.unwrap();

        assert!(store.find_open(GameMode::Theme).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_notifies_subscribers() {
        let store = MemoryRoomStore::new();
        let room = store.create(room_with_code("AAAA11", true)).await.unwrap();
        let mut subscription = store.subscribe(room.id).await.unwrap();

        store.update(room.id, join_patch("Bob")).await.unwrap();

        let seen = subscription.changed().await.unwrap();
        assert_eq!(seen.players.len(), 2);
    }

    #[tokio::test]
    async fn test_skipped_patch_does_not_notify() {
        let store = MemoryRoomStore::new();
        let room = store.create(room_with_code("AAAA11", true)).await.unwrap();
        store
            .update(room.id, finish_patch(&room, "over"))
            .await
            .unwrap();
        let mut subscription = store.subscribe(room.id).await.unwrap();

        // Guarded out by the terminal check; subscribers stay silent.
        let after = store
            .update(room.id, join_patch("Carol"))
            .await
            .unwrap();
        assert_eq!(after.players.len(), 1);

        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(50), subscription.changed())
                .await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_delete_delivers_none() {
        let store = MemoryRoomStore::new();
        let room = store.create(room_with_code("AAAA11", true)).await.unwrap();
        let mut subscription = store.subscribe(room.id).await.unwrap();

        store.delete(room.id).await.unwrap();

        assert!(subscription.changed().await.is_none());
        assert!(store.read("AAAA11").await.unwrap().is_none());
        // The code is free again.
        store.create(room_with_code("AAAA11", true)).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_twice_is_fine() {
        let store = MemoryRoomStore::new();
        let room = store.create(room_with_code("AAAA11", true)).await.unwrap();
        store.delete(room.id).await.unwrap();
        store.delete(room.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_to_missing_room_fails() {
        let store = MemoryRoomStore::new();
        let result = store.subscribe(uuid::Uuid::new_v4()).await;
        assert!(matches!(result, Err(DuelError::RoomNotFound { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_joins_seat_exactly_one_player() {
        let store = std::sync::Arc::new(MemoryRoomStore::new());
        let room = store.create(room_with_code("AAAA11", true)).await.unwrap();

        let (bob, carol) = tokio::join!(
            store.update(room.id, join_patch("Bob")),
            store.update(room.id, join_patch("Carol")),
        );

        assert!(bob.is_ok() != carol.is_ok());
        let final_room = store.read("AAAA11").await.unwrap().unwrap();
        assert_eq!(final_room.players.len(), 2);
    }

    #[tokio::test]
    async fn test_racing_finishes_keep_the_first_outcome() {
        let store = MemoryRoomStore::new();
        let mut room = room_with_code("AAAA11", true);
        let bob = PlayerProfile::new("Bob");
        let bob_id = bob.id;
        room.players.push(bob);
        room.status = RoomStatus::Playing;
        room.game_state.current_player_id = Some(room.host_id);
        let room = store.create(room).await.unwrap();

        store
            .update(room.id, finish_patch(&room, "Bob ran out of time"))
            .await
            .unwrap();
        let second = RoomPatch {
            status: Some(RoomStatus::Finished),
            winner_id: Some(bob_id),
            game_over_reason: Some("Alice left the game".to_string()),
            ..RoomPatch::default()
        };
        let after = store.update(room.id, second).await.unwrap();

        assert_eq!(after.game_state.winner_id, Some(room.host_id));
        assert_eq!(
            after.game_state.game_over_reason.as_deref(),
            Some("Bob ran out of time")
        );
    }

    #[tokio::test]
    async fn test_stale_turn_write_is_skipped() {
        let store = MemoryRoomStore::new();
        let mut room = room_with_code("AAAA11", true);
        room.players.push(PlayerProfile::new("Bob"));
        room.status = RoomStatus::Playing;
        room.game_state.current_player_id = Some(room.host_id);
        room.game_state.turn_started_at = Some("2025-01-01T00:00:00Z".to_string());
        let room = store.create(room).await.unwrap();

        let stale = RoomPatch {
            status: Some(RoomStatus::Finished),
            winner_id: Some(room.players[1].id),
            game_over_reason: Some("Alice ran out of time".to_string()),
            expect_turn: Some(TurnKey {
                player_id: room.host_id,
                turn_started_at: Some("2024-12-31T23:59:45Z".to_string()),
            }),
            ..RoomPatch::default()
        };
        let after = store.update(room.id, stale).await.unwrap();

        assert_eq!(after.status, RoomStatus::Playing);
        assert!(after.game_state.winner_id.is_none());
    }
}
