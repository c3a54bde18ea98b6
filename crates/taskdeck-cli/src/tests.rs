//! CLI command tests
//!
//! Commands run against in-memory databases; argument parsing is checked
//! through `Cli::try_parse_from`.

use chrono::Datelike;
use clap::Parser;
use taskdeck_core::db::Database;
use taskdeck_core::models::{Category, EntityKind, NoteCategory, Priority, TaskStatus, User};
use taskdeck_core::AiConfig;

use crate::cli::{Cli, Commands, NotesAction, TagsAction, TasksAction};
use crate::commands::{self, truncate};

fn setup_test_db() -> (Database, User) {
    let db = Database::in_memory().unwrap();
    let owner = commands::resolve_owner(&db, None).unwrap();
    (db, owner)
}

fn add_task(db: &Database, owner: &User, title: &str) -> String {
    commands::cmd_tasks_add(db, owner, title, None, "inbox", None, None).unwrap();
    db.list_tasks(&owner.id, None)
        .unwrap()
        .into_iter()
        .find(|t| t.title == title)
        .unwrap()
        .id
}

// ========== Owner Tests ==========

#[test]
fn test_resolve_owner_defaults_to_local() {
    let (db, owner) = setup_test_db();
    assert_eq!(owner.name, "local");

    // Resolving again returns the same owner instead of creating another
    let again = commands::resolve_owner(&db, None).unwrap();
    assert_eq!(again.id, owner.id);
    assert_eq!(db.list_users().unwrap().len(), 1);
}

#[test]
fn test_resolve_owner_unknown_name() {
    let (db, _) = setup_test_db();
    let err = commands::resolve_owner(&db, Some("ghost")).unwrap_err();
    assert!(err.to_string().contains("Unknown user"));
}

#[test]
fn test_cmd_user_add_and_resolve() {
    let (db, _) = setup_test_db();
    commands::cmd_user_add(&db, "alice").unwrap();

    let alice = commands::resolve_owner(&db, Some("alice")).unwrap();
    assert_eq!(alice.name, "alice");
    assert!(commands::cmd_user_list(&db).is_ok());
}

#[test]
fn test_cmd_user_add_duplicate_fails() {
    let (db, _) = setup_test_db();
    commands::cmd_user_add(&db, "alice").unwrap();
    assert!(commands::cmd_user_add(&db, "alice").is_err());
}

#[test]
fn test_cmd_token_create_and_revoke() {
    let (db, owner) = setup_test_db();
    commands::cmd_token_create(&db, &owner, Some("laptop")).unwrap();

    let tokens = db.list_api_tokens(&owner.id).unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].label.as_deref(), Some("laptop"));
    assert!(commands::cmd_token_list(&db, &owner).is_ok());

    commands::cmd_token_revoke(&db, &owner, &tokens[0].id).unwrap();
    assert!(db.list_api_tokens(&owner.id).unwrap().is_empty());
}

#[test]
fn test_cmd_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("taskdeck.db");

    commands::cmd_init(&db_path, true).unwrap();
    assert!(db_path.exists());

    let db = commands::open_db(&db_path, true).unwrap();
    assert!(db.get_user_by_name("local").unwrap().is_some());
}

// ========== Task Tests ==========

#[test]
fn test_cmd_tasks_list_empty() {
    let (db, owner) = setup_test_db();
    assert!(commands::cmd_tasks_list(&db, &owner, None).is_ok());
}

#[test]
fn test_cmd_tasks_add_with_options() {
    let (db, owner) = setup_test_db();
    commands::cmd_tasks_add(
        &db,
        &owner,
        "Ship release",
        Some("Tag and publish".to_string()),
        "doing",
        Some("high"),
        Some("2026-03-15"),
    )
    .unwrap();

    let tasks = db.list_tasks(&owner.id, None).unwrap();
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.category, Category::Doing);
    assert_eq!(task.priority, Some(Priority::High));
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.description.as_deref(), Some("Tag and publish"));

    let due = task.due_date.unwrap();
    assert_eq!((due.year(), due.month(), due.day()), (2026, 3, 15));
}

#[test]
fn test_cmd_tasks_add_rejects_bad_input() {
    let (db, owner) = setup_test_db();

    let err = commands::cmd_tasks_add(&db, &owner, "X", None, "someday", None, None).unwrap_err();
    assert!(err.to_string().contains("Invalid category"));

    let err =
        commands::cmd_tasks_add(&db, &owner, "X", None, "inbox", Some("urgent"), None).unwrap_err();
    assert!(err.to_string().contains("Invalid priority"));

    let err = commands::cmd_tasks_add(&db, &owner, "X", None, "inbox", None, Some("15/03/2026"))
        .unwrap_err();
    assert!(err.to_string().contains("YYYY-MM-DD"));

    assert!(db.list_tasks(&owner.id, None).unwrap().is_empty());
}

#[test]
fn test_cmd_tasks_list_by_category() {
    let (db, owner) = setup_test_db();
    add_task(&db, &owner, "Inbox item");
    assert!(commands::cmd_tasks_list(&db, &owner, Some("inbox")).is_ok());
    assert!(commands::cmd_tasks_list(&db, &owner, Some("bogus")).is_err());
}

#[test]
fn test_cmd_tasks_done() {
    let (db, owner) = setup_test_db();
    let id = add_task(&db, &owner, "Finish it");

    commands::cmd_tasks_done(&db, &owner, &id).unwrap();

    let task = db.get_task(&owner.id, &id).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Done);
}

#[test]
fn test_cmd_tasks_move_with_position() {
    let (db, owner) = setup_test_db();
    let first = add_task(&db, &owner, "First");
    let _second = add_task(&db, &owner, "Second");
    let third = add_task(&db, &owner, "Third");

    commands::cmd_tasks_move(&db, &owner, &third, "todo", Some(0)).unwrap();

    let tasks = db.list_tasks(&owner.id, None).unwrap();
    assert_eq!(tasks[0].id, third);
    assert_eq!(tasks[0].category, Category::Todo);
    assert_eq!(tasks[1].id, first);
    let orders: Vec<i64> = tasks.iter().map(|t| t.task_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[test]
fn test_cmd_tasks_reorder() {
    let (db, owner) = setup_test_db();
    let a = add_task(&db, &owner, "A");
    let b = add_task(&db, &owner, "B");
    let c = add_task(&db, &owner, "C");

    commands::cmd_tasks_reorder(&db, &owner, &[c.clone(), a.clone()]).unwrap();

    let ids: Vec<String> = db
        .list_tasks(&owner.id, None)
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec![c, a, b]);
}

#[test]
fn test_cmd_tasks_delete_other_owner_fails() {
    let (db, owner) = setup_test_db();
    let id = add_task(&db, &owner, "Mine");

    commands::cmd_user_add(&db, "bob").unwrap();
    let bob = commands::resolve_owner(&db, Some("bob")).unwrap();

    assert!(commands::cmd_tasks_delete(&db, &bob, &id).is_err());
    commands::cmd_tasks_delete(&db, &owner, &id).unwrap();
    assert!(db.get_task(&owner.id, &id).unwrap().is_none());
}

// ========== Note Tests ==========

#[test]
fn test_cmd_notes_add_list_delete() {
    let (db, owner) = setup_test_db();
    commands::cmd_notes_add(&db, &owner, "Standup", "Talked about the release", "diary").unwrap();

    let notes = db.list_notes(&owner.id, None).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].category, NoteCategory::Diary);
    assert!(commands::cmd_notes_list(&db, &owner, Some("diary")).is_ok());

    commands::cmd_notes_delete(&db, &owner, &notes[0].id).unwrap();
    assert!(db.list_notes(&owner.id, None).unwrap().is_empty());
}

#[test]
fn test_cmd_notes_add_bad_category() {
    let (db, owner) = setup_test_db();
    let err = commands::cmd_notes_add(&db, &owner, "X", "", "journal").unwrap_err();
    assert!(err.to_string().contains("Invalid note category"));
}

// ========== Tag Tests ==========

#[test]
fn test_cmd_tags_tree_empty() {
    let (db, owner) = setup_test_db();
    assert!(commands::cmd_tags_tree(&db, &owner).is_ok());
    assert!(commands::cmd_tags_list(&db, &owner).is_ok());
}

#[test]
fn test_cmd_tags_add_palette_and_hex_colors() {
    let (db, owner) = setup_test_db();
    commands::cmd_tags_add(&db, &owner, "garden", Some("emerald"), None).unwrap();
    commands::cmd_tags_add(&db, &owner, "urgent", Some("#EC4899"), None).unwrap();

    let garden = db.get_tag_by_name(&owner.id, "garden").unwrap().unwrap();
    assert_eq!(garden.color.color, "rgb(16, 185, 129)");

    let urgent = db.get_tag_by_name(&owner.id, "urgent").unwrap().unwrap();
    assert_eq!(urgent.color.color, "#EC4899");
    assert_eq!(urgent.color.bg, "#EC489915");
}

#[test]
fn test_cmd_tags_add_child_by_parent_name() {
    let (db, owner) = setup_test_db();
    commands::cmd_tags_add(&db, &owner, "work", None, None).unwrap();
    commands::cmd_tags_add(&db, &owner, "meetings", None, Some("work")).unwrap();

    let work = db.get_tag_by_name(&owner.id, "work").unwrap().unwrap();
    let meetings = db.get_tag_by_name(&owner.id, "meetings").unwrap().unwrap();
    assert_eq!(meetings.parent_id, Some(work.id));
}

#[test]
fn test_cmd_tags_add_unknown_parent() {
    let (db, owner) = setup_test_db();
    let err = commands::cmd_tags_add(&db, &owner, "child", None, Some("missing")).unwrap_err();
    assert!(err.to_string().contains("not found"));
    assert!(db.get_tag_by_name(&owner.id, "child").unwrap().is_none());
}

#[test]
fn test_cmd_tags_rename() {
    let (db, owner) = setup_test_db();
    commands::cmd_tags_add(&db, &owner, "wrk", None, None).unwrap();
    commands::cmd_tags_rename(&db, &owner, "wrk", "work").unwrap();

    assert!(db.get_tag_by_name(&owner.id, "wrk").unwrap().is_none());
    assert!(db.get_tag_by_name(&owner.id, "work").unwrap().is_some());
}

#[test]
fn test_cmd_tags_move_and_back_to_root() {
    let (db, owner) = setup_test_db();
    commands::cmd_tags_add(&db, &owner, "home", None, None).unwrap();
    commands::cmd_tags_add(&db, &owner, "garden", None, None).unwrap();

    commands::cmd_tags_move(&db, &owner, "garden", Some("home")).unwrap();
    let garden = db.get_tag_by_name(&owner.id, "garden").unwrap().unwrap();
    assert!(garden.parent_id.is_some());

    commands::cmd_tags_move(&db, &owner, "garden", None).unwrap();
    let garden = db.get_tag_by_name(&owner.id, "garden").unwrap().unwrap();
    assert!(garden.parent_id.is_none());
}

#[test]
fn test_cmd_tags_move_under_descendant_fails() {
    let (db, owner) = setup_test_db();
    commands::cmd_tags_add(&db, &owner, "a", None, None).unwrap();
    commands::cmd_tags_add(&db, &owner, "b", None, Some("a")).unwrap();

    assert!(commands::cmd_tags_move(&db, &owner, "a", Some("b")).is_err());
}

#[test]
fn test_cmd_tags_delete_moves_children_up() {
    let (db, owner) = setup_test_db();
    commands::cmd_tags_add(&db, &owner, "root", None, None).unwrap();
    commands::cmd_tags_add(&db, &owner, "middle", None, Some("root")).unwrap();
    commands::cmd_tags_add(&db, &owner, "leaf", None, Some("middle")).unwrap();

    commands::cmd_tags_delete(&db, &owner, "middle").unwrap();

    let root = db.get_tag_by_name(&owner.id, "root").unwrap().unwrap();
    let leaf = db.get_tag_by_name(&owner.id, "leaf").unwrap().unwrap();
    assert_eq!(leaf.parent_id, Some(root.id));
    assert!(commands::cmd_tags_analytics(&db, &owner).is_ok());
}

#[test]
fn test_cmd_set_tags_creates_and_reuses() {
    let (db, owner) = setup_test_db();
    let task_id = add_task(&db, &owner, "Plan sprint");
    commands::cmd_tags_add(&db, &owner, "work", None, None).unwrap();

    let tags = vec!["work".to_string(), "planning".to_string()];
    commands::cmd_set_tags(&db, &owner, EntityKind::Task, &task_id, &tags).unwrap();

    let task = db.get_task(&owner.id, &task_id).unwrap().unwrap();
    let names: Vec<&str> = task.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["work", "planning"]);
    // "work" was reused rather than duplicated
    assert_eq!(db.list_tags(&owner.id).unwrap().len(), 2);

    commands::cmd_set_tags(&db, &owner, EntityKind::Task, &task_id, &[]).unwrap();
    let task = db.get_task(&owner.id, &task_id).unwrap().unwrap();
    assert!(task.tags.is_empty());
}

#[test]
fn test_cmd_set_tags_on_note() {
    let (db, owner) = setup_test_db();
    commands::cmd_notes_add(&db, &owner, "Idea", "", "idea").unwrap();
    let note_id = db.list_notes(&owner.id, None).unwrap()[0].id.clone();

    commands::cmd_set_tags(&db, &owner, EntityKind::Note, &note_id, &["someday".to_string()])
        .unwrap();

    let note = db.get_note(&owner.id, &note_id).unwrap().unwrap();
    assert_eq!(note.tags.len(), 1);
    assert_eq!(note.tags[0].name, "someday");
}

#[test]
fn test_cmd_set_tags_unknown_task() {
    let (db, owner) = setup_test_db();
    let result =
        commands::cmd_set_tags(&db, &owner, EntityKind::Task, "missing", &["x".to_string()]);
    assert!(result.is_err());
}

// ========== AI Tests ==========

#[tokio::test]
async fn test_cmd_ai_local_engine() {
    let config = AiConfig::default();
    let result =
        commands::cmd_ai(&config, "priority", "local", "Fix the production outage today", None, None)
            .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_ai_with_context_hints() {
    let (db, owner) = setup_test_db();
    add_task(&db, &owner, "Write quarterly report");
    commands::cmd_tags_add(&db, &owner, "finance", None, None).unwrap();

    let hints = commands::context_hints(&db, &owner).unwrap();
    assert_eq!(hints.tags, vec!["finance".to_string()]);
    assert_eq!(hints.tasks, vec!["Write quarterly report".to_string()]);

    let config = AiConfig::default();
    let result =
        commands::cmd_ai(&config, "tags", "local", "Review the finance budget", Some(hints), None)
            .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_ai_errors() {
    let config = AiConfig::default();

    assert!(commands::cmd_ai(&config, "poem", "local", "text", None, None)
        .await
        .is_err());
    assert!(commands::cmd_ai(&config, "summary", "local", "   ", None, None)
        .await
        .is_err());

    // Cloud without a configured key fails before any network call
    let err = commands::cmd_ai(&config, "summary", "cloud", "text", None, None)
        .await
        .unwrap_err();
    let ai_err = err.downcast_ref::<taskdeck_core::AIError>().unwrap();
    assert_eq!(ai_err.kind, taskdeck_core::AIErrorKind::MissingKey);
}

#[tokio::test]
async fn test_cmd_ai_create_saves_task() {
    let (db, owner) = setup_test_db();
    commands::cmd_tags_add(&db, &owner, "schedule", None, None).unwrap();

    let target = commands::SaveTarget {
        db: &db,
        owner: &owner,
        category: Category::Todo,
    };
    commands::cmd_ai(
        &AiConfig::default(),
        "create",
        "local",
        "Book dentist appointment tomorrow\nMorning slot if possible",
        None,
        Some(target),
    )
    .await
    .unwrap();

    let tasks = db.list_tasks(&owner.id, None).unwrap();
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.title, "Book dentist appointment tomorrow");
    assert_eq!(task.description.as_deref(), Some("Morning slot if possible"));
    assert_eq!(task.category, Category::Todo);
    assert!(task.due_date.is_some());
    let names: Vec<&str> = task.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["schedule"]);
    // The existing tag was reused
    assert_eq!(db.list_tags(&owner.id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_cmd_ai_save_requires_create() {
    let (db, owner) = setup_test_db();
    let target = commands::SaveTarget {
        db: &db,
        owner: &owner,
        category: Category::Inbox,
    };
    let result = commands::cmd_ai(
        &AiConfig::default(),
        "summary",
        "local",
        "Book dentist appointment",
        None,
        Some(target),
    )
    .await;
    assert!(result.is_err());
    assert!(db.list_tasks(&owner.id, None).unwrap().is_empty());
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_tasks_add() {
    let cli = Cli::try_parse_from([
        "taskdeck", "tasks", "add", "Write report", "-c", "todo", "-p", "low", "--due",
        "2026-01-02",
    ])
    .unwrap();

    match cli.command {
        Commands::Tasks {
            action:
                Some(TasksAction::Add {
                    title,
                    category,
                    priority,
                    due,
                    ..
                }),
        } => {
            assert_eq!(title, "Write report");
            assert_eq!(category, "todo");
            assert_eq!(priority.as_deref(), Some("low"));
            assert_eq!(due.as_deref(), Some("2026-01-02"));
        }
        _ => panic!("expected tasks add"),
    }
}

#[test]
fn test_parse_bare_subcommands_default_to_listing() {
    let cli = Cli::try_parse_from(["taskdeck", "tasks"]).unwrap();
    assert!(matches!(cli.command, Commands::Tasks { action: None }));

    let cli = Cli::try_parse_from(["taskdeck", "tags"]).unwrap();
    assert!(matches!(cli.command, Commands::Tags { action: None }));
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli =
        Cli::try_parse_from(["taskdeck", "notes", "list", "--user", "alice", "--no-encrypt"])
            .unwrap();
    assert_eq!(cli.user.as_deref(), Some("alice"));
    assert!(cli.no_encrypt);
    assert!(matches!(
        cli.command,
        Commands::Notes {
            action: Some(NotesAction::List { category: None })
        }
    ));
}

#[test]
fn test_parse_tags_move_to_root() {
    let cli = Cli::try_parse_from(["taskdeck", "tags", "move", "garden"]).unwrap();
    match cli.command {
        Commands::Tags {
            action: Some(TagsAction::Move { name, to }),
        } => {
            assert_eq!(name, "garden");
            assert!(to.is_none());
        }
        _ => panic!("expected tags move"),
    }
}

#[test]
fn test_parse_ai_defaults_to_local_engine() {
    let cli = Cli::try_parse_from(["taskdeck", "ai", "summary", "Some text"]).unwrap();
    match cli.command {
        Commands::Ai {
            kind,
            engine,
            with_context,
            ..
        } => {
            assert_eq!(kind, "summary");
            assert_eq!(engine, "local");
            assert!(!with_context);
        }
        _ => panic!("expected ai"),
    }
}

#[test]
fn test_parse_ai_create_with_save() {
    let cli = Cli::try_parse_from([
        "taskdeck", "ai", "create", "Call the bank", "--save", "-c", "doing",
    ])
    .unwrap();
    match cli.command {
        Commands::Ai {
            kind,
            save,
            category,
            ..
        } => {
            assert_eq!(kind, "create");
            assert!(save);
            assert_eq!(category, "doing");
        }
        _ => panic!("expected ai"),
    }

    // A category without --save is rejected
    assert!(Cli::try_parse_from(["taskdeck", "ai", "create", "x", "--category", "todo"]).is_err());
}

#[test]
fn test_parse_reorder_requires_ids() {
    assert!(Cli::try_parse_from(["taskdeck", "tasks", "reorder"]).is_err());
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a long string that exceeds", 10), "a long ...");
    assert_eq!(truncate("exact", 5), "exact");
    assert_eq!(truncate("toolong", 6), "too...");
    assert_eq!(truncate("日本語のテキスト", 5), "日本...");
}
