//! Database tests

use chrono::NaiveDate;

use super::*;
use crate::colors::TagColor;
use crate::models::*;

fn db_with_user() -> (Database, User) {
    let db = Database::in_memory().unwrap();
    let user = db.create_user("alice").unwrap();
    (db, user)
}

fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.list_users().unwrap().is_empty());
}

#[test]
fn test_schema_has_unique_owner_name() {
    let (db, user) = db_with_user();
    let conn = db.conn().unwrap();

    conn.execute(
        "INSERT INTO tags (id, owner_id, name) VALUES ('a', ?, 'dup')",
        [&user.id],
    )
    .unwrap();
    let err = conn
        .execute(
            "INSERT INTO tags (id, owner_id, name) VALUES ('b', ?, 'dup')",
            [&user.id],
        )
        .unwrap_err();
    assert!(Error::is_unique_violation(&err));
}

#[test]
fn test_foreign_keys_enforced_on_every_connection() {
    let db = Database::in_memory().unwrap();
    // Grab several connections so at least one is not the migration connection
    let conns: Vec<_> = (0..3).map(|_| db.conn().unwrap()).collect();
    for conn in &conns {
        let on: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(on, 1);
    }
}

#[test]
fn test_user_names_unique() {
    let (db, _) = db_with_user();
    assert!(matches!(db.create_user("alice"), Err(Error::Conflict(_))));
    assert!(matches!(db.create_user("  "), Err(Error::InvalidData(_))));
}

#[test]
fn test_api_token_roundtrip() {
    let (db, user) = db_with_user();
    let (token, secret) = db.create_api_token(&user.id, Some("laptop")).unwrap();

    assert!(secret.starts_with("tdk_"));
    assert_eq!(token.label.as_deref(), Some("laptop"));

    // Only the digest is persisted
    let conn = db.conn().unwrap();
    let stored: String = conn
        .query_row(
            "SELECT token_hash FROM api_tokens WHERE id = ?",
            [&token.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, hash_token(&secret));
    assert_ne!(stored, secret);
    drop(conn);

    let resolved = db.resolve_token(&secret).unwrap().unwrap();
    assert_eq!(resolved.id, user.id);
    assert!(db.resolve_token("tdk_wrong").unwrap().is_none());

    let tokens = db.list_api_tokens(&user.id).unwrap();
    assert!(tokens[0].last_used_at.is_some());

    db.revoke_api_token(&user.id, &token.id).unwrap();
    assert!(db.resolve_token(&secret).unwrap().is_none());
}

#[test]
fn test_task_crud() {
    let (db, user) = db_with_user();

    let task = db
        .create_task(
            &user.id,
            &NewTask {
                title: "  Buy milk ".into(),
                priority: Some(Priority::High),
                due_date: NaiveDate::from_ymd_opt(2026, 3, 1),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.category, Category::Inbox);
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.task_order, 0);

    let updated = db
        .update_task(
            &user.id,
            &task.id,
            &TaskUpdate {
                status: Some(TaskStatus::Done),
                priority: Some(None),
                description: Some(Some("2 litres".into())),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Done);
    assert_eq!(updated.priority, None);
    assert_eq!(updated.description.as_deref(), Some("2 litres"));
    assert_eq!(updated.due_date, NaiveDate::from_ymd_opt(2026, 3, 1));

    let moved = db
        .update_task_category(&user.id, &task.id, Category::Doing)
        .unwrap();
    assert_eq!(moved.category, Category::Doing);
    assert_eq!(
        db.list_tasks(&user.id, Some(Category::Doing)).unwrap().len(),
        1
    );
    assert!(db
        .list_tasks(&user.id, Some(Category::Inbox))
        .unwrap()
        .is_empty());

    db.delete_task(&user.id, &task.id).unwrap();
    assert!(db.get_task(&user.id, &task.id).unwrap().is_none());
    assert!(matches!(
        db.delete_task(&user.id, &task.id),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_tasks_are_owner_scoped() {
    let (db, alice) = db_with_user();
    let bob = db.create_user("bob").unwrap();
    let task = db.create_task(&alice.id, &new_task("secret")).unwrap();

    assert!(db.get_task(&bob.id, &task.id).unwrap().is_none());
    assert!(db.list_tasks(&bob.id, None).unwrap().is_empty());
    assert!(matches!(
        db.update_task(&bob.id, &task.id, &TaskUpdate::default()),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_empty_title_rejected() {
    let (db, user) = db_with_user();
    assert!(matches!(
        db.create_task(&user.id, &new_task("   ")),
        Err(Error::InvalidData(_))
    ));
}

#[test]
fn test_reorder_is_contiguous() {
    let (db, user) = db_with_user();
    let a = db.create_task(&user.id, &new_task("a")).unwrap();
    let b = db.create_task(&user.id, &new_task("b")).unwrap();
    let c = db.create_task(&user.id, &new_task("c")).unwrap();
    let d = db.create_task(&user.id, &new_task("d")).unwrap();

    let tasks = db
        .reorder_tasks(&user.id, &[c.id.clone(), a.id.clone()])
        .unwrap();

    let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["c", "a", "b", "d"]);
    let orders: Vec<_> = tasks.iter().map(|t| t.task_order).collect();
    assert_eq!(orders, vec![0, 1, 2, 3]);

    let moved = db.move_task(&user.id, &d.id, 0).unwrap();
    assert_eq!(moved.task_order, 0);
    let titles: Vec<_> = db
        .list_tasks(&user.id, None)
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["d", "c", "a", "b"]);

    assert!(matches!(
        db.reorder_tasks(&user.id, &[b.id.clone(), b.id.clone()]),
        Err(Error::InvalidData(_))
    ));
    assert!(matches!(
        db.reorder_tasks(&user.id, &["missing".to_string()]),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_note_crud() {
    let (db, user) = db_with_user();
    let note = db
        .create_note(
            &user.id,
            &NewNote {
                title: "Idea".into(),
                content: "Build a thing".into(),
                category: NoteCategory::Idea,
                priority: None,
            },
        )
        .unwrap();
    assert_eq!(note.category, NoteCategory::Idea);

    let updated = db
        .update_note(
            &user.id,
            &note.id,
            &NoteUpdate {
                content: Some("Build two things".into()),
                priority: Some(Some(Priority::Low)),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.title, "Idea");
    assert_eq!(updated.content, "Build two things");
    assert_eq!(updated.priority, Some(Priority::Low));

    assert_eq!(
        db.list_notes(&user.id, Some(NoteCategory::Idea)).unwrap().len(),
        1
    );
    assert!(db
        .list_notes(&user.id, Some(NoteCategory::Diary))
        .unwrap()
        .is_empty());

    db.delete_note(&user.id, &note.id).unwrap();
    assert!(db.get_note(&user.id, &note.id).unwrap().is_none());
}

#[test]
fn test_deleting_task_keeps_tags() {
    let (db, user) = db_with_user();
    let task = db.create_task(&user.id, &new_task("t")).unwrap();
    let tag = db.create_tag(&user.id, "keep", None, None).unwrap();

    let conn = db.conn().unwrap();
    tags::replace_entity_tags(&conn, EntityKind::Task, &task.id, &[tag.id.clone()]).unwrap();
    drop(conn);

    assert_eq!(db.get_task(&user.id, &task.id).unwrap().unwrap().tags.len(), 1);
    db.delete_task(&user.id, &task.id).unwrap();

    let tags = db.list_tags(&user.id).unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].task_count, 0);
}

#[test]
fn test_legacy_color_normalized_on_read() {
    let (db, user) = db_with_user();
    let conn = db.conn().unwrap();
    conn.execute(
        "INSERT INTO tags (id, owner_id, name, color) VALUES ('old', ?, 'legacy', '\"#EC4899\"')",
        [&user.id],
    )
    .unwrap();
    drop(conn);

    let tag = db.get_tag(&user.id, "old").unwrap().unwrap();
    assert_eq!(
        tag.color,
        TagColor {
            bg: "#EC489915".into(),
            color: "#EC4899".into()
        }
    );
}

#[test]
fn test_tag_update_and_name_conflict() {
    let (db, user) = db_with_user();
    let a = db.create_tag(&user.id, "a", None, None).unwrap();
    db.create_tag(&user.id, "b", None, None).unwrap();

    let renamed = db
        .update_tag(
            &user.id,
            &a.id,
            &TagUpdate {
                name: Some("alpha".into()),
                color: None,
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "alpha");
    assert_eq!(renamed.id, a.id);

    assert!(matches!(
        db.update_tag(
            &user.id,
            &a.id,
            &TagUpdate {
                name: Some("b".into()),
                color: None
            }
        ),
        Err(Error::Conflict(_))
    ));

    // Same name under a different owner is fine
    let bob = db.create_user("bob").unwrap();
    db.create_tag(&bob.id, "b", None, None).unwrap();
}

#[test]
fn test_tag_tree_and_move_cycle() {
    let (db, user) = db_with_user();
    let work = db.create_tag(&user.id, "Work", None, None).unwrap();
    let reports = db
        .create_tag(&user.id, "Reports", None, Some(work.id.as_str()))
        .unwrap();
    let weekly = db
        .create_tag(&user.id, "Weekly", None, Some(reports.id.as_str()))
        .unwrap();

    let tree = db.get_tag_tree(&user.id).unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].children[0].path, "Work / Reports");
    assert_eq!(tree[0].children[0].children[0].depth, 2);

    assert!(matches!(
        db.move_tag(&user.id, &work.id, Some(weekly.id.as_str())),
        Err(Error::InvalidData(_))
    ));
    assert!(matches!(
        db.move_tag(&user.id, &work.id, Some(work.id.as_str())),
        Err(Error::InvalidData(_))
    ));

    let moved = db.move_tag(&user.id, &weekly.id, None).unwrap();
    assert!(moved.parent_id.is_none());
    assert_eq!(db.get_tag_tree(&user.id).unwrap().len(), 2);
}

#[test]
fn test_delete_tag_reparents_children() {
    let (db, user) = db_with_user();
    let root = db.create_tag(&user.id, "root", None, None).unwrap();
    let mid = db.create_tag(&user.id, "mid", None, Some(root.id.as_str())).unwrap();
    let leaf = db.create_tag(&user.id, "leaf", None, Some(mid.id.as_str())).unwrap();

    assert_eq!(db.delete_tag(&user.id, &mid.id).unwrap(), 1);
    let leaf = db.get_tag(&user.id, &leaf.id).unwrap().unwrap();
    assert_eq!(leaf.parent_id.as_deref(), Some(root.id.as_str()));
}

#[test]
fn test_tag_analytics() {
    let (db, user) = db_with_user();
    let task = db.create_task(&user.id, &new_task("t")).unwrap();
    let parent = db.create_tag(&user.id, "parent", None, None).unwrap();
    let child = db
        .create_tag(&user.id, "child", None, Some(parent.id.as_str()))
        .unwrap();

    let conn = db.conn().unwrap();
    tags::replace_entity_tags(&conn, EntityKind::Task, &task.id, &[child.id.clone()]).unwrap();
    drop(conn);

    let analytics = db.tag_analytics(&user.id).unwrap();
    assert_eq!(analytics.total_tags, 2);
    assert_eq!(analytics.total_usage, 1);
    assert_eq!(analytics.top_tags[0].tag.id, child.id);
    assert_eq!(analytics.hierarchy.max_depth, 1);
    assert_eq!(analytics.hierarchy.total_parents, 1);
    assert_eq!(analytics.hierarchy.total_leaves, 1);
    assert!((analytics.hierarchy.avg_depth - 0.5).abs() < f64::EPSILON);
}
