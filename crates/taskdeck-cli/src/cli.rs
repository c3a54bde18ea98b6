//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Taskdeck - Tasks, notes and tags with AI assistance
#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(about = "Self-hosted task and notes service", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to the config file value, then the data dir)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (defaults to ~/.config/taskdeck/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Owner to act as (defaults to the local owner)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TASKDECK_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and the local owner
    Init,

    /// Manage owners
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage API tokens for the HTTP server
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Manage tasks (list by default)
    Tasks {
        #[command(subcommand)]
        action: Option<TasksAction>,
    },

    /// Manage notes (list by default)
    Notes {
        #[command(subcommand)]
        action: Option<NotesAction>,
    },

    /// Manage tags (tree by default)
    Tags {
        #[command(subcommand)]
        action: Option<TagsAction>,
    },

    /// Run an AI operation on some text
    Ai {
        /// Operation: summary, tags, classify, priority, suggest, create
        kind: String,

        /// Text to analyze
        text: String,

        /// Engine: local or cloud (cloud reads GEMINI_API_KEY or the config file)
        #[arg(short, long, default_value = "local")]
        engine: String,

        /// Use the owner's tag names and task titles as hints
        #[arg(long)]
        with_context: bool,

        /// Save the drafted task (create only)
        #[arg(long)]
        save: bool,

        /// Category for a saved task: inbox, doing, todo
        #[arg(short, long, default_value = "inbox", requires = "save")]
        category: String,
    },

    /// Start the web server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// Every request acts as the local owner.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Create an owner
    Add {
        /// Unique owner name
        name: String,
    },
    /// List owners
    List,
}

#[derive(Subcommand)]
pub enum TokenAction {
    /// Create a token for the owner (the secret is shown once)
    Create {
        /// Optional label to tell tokens apart
        #[arg(short, long)]
        label: Option<String>,
    },
    /// List the owner's tokens
    List,
    /// Revoke one of the owner's tokens
    Revoke {
        /// Token ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum TasksAction {
    /// List tasks in board order
    List {
        /// Only this category: inbox, doing, todo
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Add a task at the end of the board
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Category: inbox, doing, todo
        #[arg(short, long, default_value = "inbox")]
        category: String,

        /// Priority: high, medium, low
        #[arg(short, long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },
    /// Mark a task done
    Done {
        /// Task ID
        id: String,
    },
    /// Move a task to another category
    Move {
        /// Task ID
        id: String,

        /// Target category: inbox, doing, todo
        category: String,

        /// Board position (0 = top)
        #[arg(long)]
        position: Option<usize>,
    },
    /// Put the given tasks first, renumbering the board
    Reorder {
        /// Task IDs in the desired order
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Replace a task's tags (names are created on first use)
    Tag {
        /// Task ID
        id: String,

        /// Tag names (none clears the tags)
        tags: Vec<String>,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum NotesAction {
    /// List notes, newest first
    List {
        /// Only this category: general, diary, idea, reference, task_note
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Add a note
    Add {
        /// Note title
        title: String,

        /// Note body
        #[arg(long, default_value = "")]
        content: String,

        /// Category: general, diary, idea, reference, task_note
        #[arg(short, long, default_value = "general")]
        category: String,
    },
    /// Replace a note's tags (names are created on first use)
    Tag {
        /// Note ID
        id: String,

        /// Tag names (none clears the tags)
        tags: Vec<String>,
    },
    /// Delete a note
    Delete {
        /// Note ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum TagsAction {
    /// Show the tag tree
    Tree,
    /// List tags with usage counts
    List,
    /// Create a tag
    Add {
        /// Tag name
        name: String,

        /// Palette name (e.g., emerald) or hex color (e.g., #EC4899)
        #[arg(short, long)]
        color: Option<String>,

        /// Parent tag name
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Rename a tag
    Rename {
        /// Current name
        name: String,
        /// New name
        new_name: String,
    },
    /// Move a tag under another parent
    Move {
        /// Tag name
        name: String,

        /// New parent name (omit to make it a root tag)
        #[arg(long)]
        to: Option<String>,
    },
    /// Delete a tag (children move up, tasks and notes keep existing)
    Delete {
        /// Tag name
        name: String,
    },
    /// Show usage and hierarchy statistics
    Analytics,
}
