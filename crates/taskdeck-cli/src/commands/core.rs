//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `resolve_owner` - Pick the owner commands act as
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use taskdeck_core::db::Database;
use taskdeck_core::models::User;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// The named owner, or the local owner when no name is given
pub fn resolve_owner(db: &Database, name: Option<&str>) -> Result<User> {
    match name {
        None => taskdeck_server::ensure_local_owner(db).context("Failed to load the local owner"),
        Some(name) => db.get_user_by_name(name)?.ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown user '{}'. Create it with: taskdeck user add {}",
                name,
                name
            )
        }),
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let db = open_db(db_path, no_encrypt)?;

    let owner = taskdeck_server::ensure_local_owner(&db).context("Failed to create local owner")?;
    println!("   Local owner: {}", owner.name);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add a task: taskdeck tasks add \"Write the report\"");
    println!("  2. Create an API token: taskdeck token create");
    println!("  3. Start the server: taskdeck serve");

    Ok(())
}
