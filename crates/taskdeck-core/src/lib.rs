//! Taskdeck Core Library
//!
//! Shared functionality for the Taskdeck task and notes service:
//! - Database access and migrations (owners, tokens, tasks, notes, tags)
//! - Tag reconciliation for tasks and notes
//! - Saving AI task drafts as real tasks
//! - AI provider selection across a cloud engine and a local engine
//! - Tag color palette and legacy color normalization
//! - Layered configuration (TOML file + environment)

pub mod ai;
pub mod colors;
pub mod config;
pub mod db;
pub mod drafts;
pub mod error;
pub mod models;
pub mod tags;

/// Test utilities including the mock cloud AI server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIClient, AIError, AIErrorKind, AIInvocation, AIOutput, AIRequest, AIResult, Engine,
    OutputKind, ProviderSelector, TaskDraft,
};
pub use colors::{TagColor, PALETTE};
pub use config::{AiConfig, AppConfig, CloudConfig, ServerSettings};
pub use db::Database;
pub use drafts::save_task_draft;
pub use error::{Error, Result};
pub use tags::{ReconcileRequest, TagReconciler};
