//! State management - per-manager evaluation history.

mod history;
mod manager;

pub use history::{History, HistoryEntry};
pub use manager::{CapabilityManager, DEFAULT_HISTORY_CAPACITY};
