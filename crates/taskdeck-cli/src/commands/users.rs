//! Owner and API token commands

use anyhow::Result;
use taskdeck_core::db::Database;
use taskdeck_core::models::User;

pub fn cmd_user_add(db: &Database, name: &str) -> Result<()> {
    let user = db.create_user(name)?;
    println!("✅ Created user '{}' (id: {})", user.name, user.id);
    Ok(())
}

pub fn cmd_user_list(db: &Database) -> Result<()> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No users yet. Run 'taskdeck init' to create the local owner.");
        return Ok(());
    }

    println!();
    println!("👤 Users");
    println!("   ─────────────────────────────────────────────");
    for user in users {
        println!(
            "   {} │ {} │ {}",
            user.id,
            user.name,
            user.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

pub fn cmd_token_create(db: &Database, owner: &User, label: Option<&str>) -> Result<()> {
    let (token, secret) = db.create_api_token(&owner.id, label)?;

    println!("🔑 Created token {} for '{}'", token.id, owner.name);
    println!();
    println!("   {}", secret);
    println!();
    println!("   Store it now: the secret is not shown again.");
    println!("   Use it as: Authorization: Bearer <token>");

    Ok(())
}

pub fn cmd_token_list(db: &Database, owner: &User) -> Result<()> {
    let tokens = db.list_api_tokens(&owner.id)?;

    if tokens.is_empty() {
        println!("No tokens for '{}'. Create one with: taskdeck token create", owner.name);
        return Ok(());
    }

    println!();
    println!("🔑 Tokens for {}", owner.name);
    println!("   ─────────────────────────────────────────────────────────────");
    for token in tokens {
        let last_used = token
            .last_used_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "   {} │ {:<16} │ last used: {}",
            token.id,
            token.label.as_deref().unwrap_or("-"),
            last_used
        );
    }

    Ok(())
}

pub fn cmd_token_revoke(db: &Database, owner: &User, id: &str) -> Result<()> {
    db.revoke_api_token(&owner.id, id)?;
    println!("✅ Revoked token {}", id);
    Ok(())
}
