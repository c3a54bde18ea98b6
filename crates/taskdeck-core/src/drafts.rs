//! Turning AI task drafts into stored tasks
//!
//! A draft's tag names go through the [`TagReconciler`], so existing tags are
//! reused and new names are created with the default color. If tagging fails
//! the freshly created task is removed again and the error is returned.

use tracing::{info, warn};

use crate::ai::TaskDraft;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Category, EntityKind, NewTask, Task, TagInput, TaskStatus};
use crate::tags::{ReconcileRequest, TagReconciler};

/// Store a draft as a new task at the end of the owner's board
pub fn save_task_draft(
    db: &Database,
    owner_id: &str,
    draft: &TaskDraft,
    category: Category,
) -> Result<Task> {
    let description = Some(draft.description.trim())
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let task = db.create_task(
        owner_id,
        &NewTask {
            title: draft.title.clone(),
            description,
            category,
            priority: Some(draft.priority),
            status: TaskStatus::Todo,
            due_date: draft.due_date,
        },
    )?;

    let names: Vec<TagInput> = draft
        .tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(TagInput::named)
        .collect();

    if !names.is_empty() {
        let request = ReconcileRequest::new(owner_id, EntityKind::Task, &task.id, names);
        if let Err(e) = TagReconciler::new(db).reconcile(&request) {
            if let Err(cleanup) = db.delete_task(owner_id, &task.id) {
                warn!(task_id = %task.id, "Failed to remove untagged draft task: {}", cleanup);
            }
            return Err(e);
        }
    }

    info!(task_id = %task.id, tags = draft.tags.len(), "Saved task draft");
    db.get_task(owner_id, &task.id)?
        .ok_or_else(|| Error::NotFound(format!("Task {} not found", task.id)))
}
