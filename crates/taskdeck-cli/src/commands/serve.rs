//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use taskdeck_core::AppConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    config: &AppConfig,
    no_encrypt: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    let server = &config.server;

    println!("🚀 Starting Taskdeck web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", server.host, server.port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    if server.require_auth {
        println!("   🔒 Authentication: bearer API tokens (taskdeck token create)");
    } else {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    }
    if !server.cors_origins.is_empty() {
        println!("   🌐 CORS origins: {}", server.cors_origins.join(", "));
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let static_dir_str = static_dir
        .map(|p| {
            p.to_str()
                .with_context(|| format!("Static dir path is not valid UTF-8: {}", p.display()))
        })
        .transpose()?;
    taskdeck_server::serve_with_config(db, static_dir_str, config).await?;

    Ok(())
}
