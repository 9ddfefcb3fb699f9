//! Streamed chat conversations with rolling memory

pub mod memory;
pub mod session;
pub mod think;

pub use memory::{ConversationMemory, HistoryStore};
pub use session::{ChatParams, ChatSession, COMPLETED_SENTINEL};
pub use think::split_think;
