//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `ai` - AI operations through the provider selector
//! - `core` - Init and shared utilities (open_db, resolve_owner)
//! - `notes` - Note commands
//! - `serve` - Web server command
//! - `tags` - Tag management and tag reconciliation commands
//! - `tasks` - Task board commands
//! - `users` - Owner and API token commands

pub mod ai;
pub mod core;
pub mod notes;
pub mod serve;
pub mod tags;
pub mod tasks;
pub mod users;

// Re-export command functions for main.rs
pub use ai::*;
pub use core::*;
pub use notes::*;
pub use serve::*;
pub use tags::*;
pub use tasks::*;
pub use users::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
