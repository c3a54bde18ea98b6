//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod ai;
pub mod auth;
pub mod notes;
pub mod tags;
pub mod tasks;

// Re-export all handlers for use in router
pub use ai::*;
pub use auth::*;
pub use notes::*;
pub use tags::*;
pub use tasks::*;
