pub mod ai;
pub mod config;
pub mod matchmaking;
pub mod oracle;
pub mod session;
pub mod store;
pub mod timer;

// Re-export main components
pub use ai::{AiMatch, AiMove};
pub use config::DuelConfig;
pub use matchmaking::{MatchPreferences, MatchResult, Matchmaker};
pub use oracle::{GenerativeOracle, SuggestionOracle, WordOracle};
pub use session::{RoomSession, SubmitOutcome};
pub use store::{MemoryRoomStore, RoomStore, RoomSubscription};
pub use timer::{turn_deadline, TurnTimer};
