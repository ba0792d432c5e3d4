pub mod errors;
pub mod messages;
pub mod oracle;
pub mod player;
pub mod room;

// Re-export all types
pub use errors::*;
pub use messages::*;
pub use oracle::*;
pub use player::*;
pub use room::*;

use uuid::Uuid;

pub type RoomId = Uuid;
pub type PlayerId = Uuid;
