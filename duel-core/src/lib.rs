pub mod join_code;
pub mod patch;
pub mod reducer;
pub mod rules;

// Re-export main components
pub use join_code::*;
pub use patch::*;
pub use reducer::*;
