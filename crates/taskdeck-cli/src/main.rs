//! Taskdeck CLI - tasks, notes and tags with AI assistance
//!
//! Usage:
//!   taskdeck init                      Initialize database
//!   taskdeck tasks add "Write report"  Add a task
//!   taskdeck ai priority "Fix prod"    Ask the local AI engine
//!   taskdeck serve --port 3000         Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use taskdeck_core::models::EntityKind;
use taskdeck_core::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(ref path) = cli.db {
        config.db_path = Some(path.clone());
    }
    let db_path = config.db_path();

    match cli.command {
        Commands::Init => commands::cmd_init(&db_path, cli.no_encrypt),
        Commands::User { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            match action {
                UserAction::Add { name } => commands::cmd_user_add(&db, &name),
                UserAction::List => commands::cmd_user_list(&db),
            }
        }
        Commands::Token { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let owner = commands::resolve_owner(&db, cli.user.as_deref())?;
            match action {
                TokenAction::Create { label } => {
                    commands::cmd_token_create(&db, &owner, label.as_deref())
                }
                TokenAction::List => commands::cmd_token_list(&db, &owner),
                TokenAction::Revoke { id } => commands::cmd_token_revoke(&db, &owner, &id),
            }
        }
        Commands::Tasks { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let owner = commands::resolve_owner(&db, cli.user.as_deref())?;
            match action {
                None => commands::cmd_tasks_list(&db, &owner, None),
                Some(TasksAction::List { category }) => {
                    commands::cmd_tasks_list(&db, &owner, category.as_deref())
                }
                Some(TasksAction::Add {
                    title,
                    description,
                    category,
                    priority,
                    due,
                }) => commands::cmd_tasks_add(
                    &db,
                    &owner,
                    &title,
                    description,
                    &category,
                    priority.as_deref(),
                    due.as_deref(),
                ),
                Some(TasksAction::Done { id }) => commands::cmd_tasks_done(&db, &owner, &id),
                Some(TasksAction::Move {
                    id,
                    category,
                    position,
                }) => commands::cmd_tasks_move(&db, &owner, &id, &category, position),
                Some(TasksAction::Reorder { ids }) => {
                    commands::cmd_tasks_reorder(&db, &owner, &ids)
                }
                Some(TasksAction::Tag { id, tags }) => {
                    commands::cmd_set_tags(&db, &owner, EntityKind::Task, &id, &tags)
                }
                Some(TasksAction::Delete { id }) => commands::cmd_tasks_delete(&db, &owner, &id),
            }
        }
        Commands::Notes { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let owner = commands::resolve_owner(&db, cli.user.as_deref())?;
            match action {
                None => commands::cmd_notes_list(&db, &owner, None),
                Some(NotesAction::List { category }) => {
                    commands::cmd_notes_list(&db, &owner, category.as_deref())
                }
                Some(NotesAction::Add {
                    title,
                    content,
                    category,
                }) => commands::cmd_notes_add(&db, &owner, &title, &content, &category),
                Some(NotesAction::Tag { id, tags }) => {
                    commands::cmd_set_tags(&db, &owner, EntityKind::Note, &id, &tags)
                }
                Some(NotesAction::Delete { id }) => commands::cmd_notes_delete(&db, &owner, &id),
            }
        }
        Commands::Tags { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let owner = commands::resolve_owner(&db, cli.user.as_deref())?;
            match action {
                None | Some(TagsAction::Tree) => commands::cmd_tags_tree(&db, &owner),
                Some(TagsAction::List) => commands::cmd_tags_list(&db, &owner),
                Some(TagsAction::Add {
                    name,
                    color,
                    parent,
                }) => commands::cmd_tags_add(
                    &db,
                    &owner,
                    &name,
                    color.as_deref(),
                    parent.as_deref(),
                ),
                Some(TagsAction::Rename { name, new_name }) => {
                    commands::cmd_tags_rename(&db, &owner, &name, &new_name)
                }
                Some(TagsAction::Move { name, to }) => {
                    commands::cmd_tags_move(&db, &owner, &name, to.as_deref())
                }
                Some(TagsAction::Delete { name }) => commands::cmd_tags_delete(&db, &owner, &name),
                Some(TagsAction::Analytics) => commands::cmd_tags_analytics(&db, &owner),
            }
        }
        Commands::Ai {
            kind,
            text,
            engine,
            with_context,
            save,
            category,
        } => {
            let store = if with_context || save {
                let db = commands::open_db(&db_path, cli.no_encrypt)?;
                let owner = commands::resolve_owner(&db, cli.user.as_deref())?;
                Some((db, owner))
            } else {
                None
            };
            let hints = match &store {
                Some((db, owner)) if with_context => Some(commands::context_hints(db, owner)?),
                _ => None,
            };
            let target = match &store {
                Some((db, owner)) if save => Some(commands::SaveTarget {
                    db,
                    owner,
                    category: commands::parse_arg(&category, "category")?,
                }),
                _ => None,
            };
            commands::cmd_ai(&config.ai, &kind, &engine, &text, hints, target).await
        }
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if no_auth {
                config.server.require_auth = false;
            }
            commands::cmd_serve(&db_path, &config, cli.no_encrypt, static_dir.as_deref()).await
        }
    }
}
