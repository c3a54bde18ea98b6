//! Task board handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{read_json, AppError, AppState, SuccessResponse};
use taskdeck_core::models::{Category, EntityKind, NewTask, Tag, TagInput, Task, TaskUpdate, User};
use taskdeck_core::{ReconcileRequest, TagReconciler};

/// Query parameters for listing tasks
#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    /// Category filter: inbox, doing, todo
    pub category: Option<String>,
}

/// GET /api/tasks - List the owner's tasks in board order
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(params): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let category = params
        .category
        .as_deref()
        .map(|c| c.parse::<Category>())
        .transpose()
        .map_err(|e| AppError::bad_request(&format!("{}. Valid: inbox, doing, todo", e)))?;

    let tasks = state.db.list_tasks(&user.id, category)?;
    Ok(Json(tasks))
}

/// POST /api/tasks - Create a task at the end of the board
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    request: Request,
) -> Result<Json<Task>, AppError> {
    let new_task: NewTask = read_json(request).await?;
    let task = state.db.create_task(&user.id, &new_task)?;

    info!(user = %user.name, task = %task.id, "Created task");
    Ok(Json(task))
}

/// GET /api/tasks/:id - Get a specific task
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    let task = state
        .db
        .get_task(&user.id, &id)?
        .ok_or_else(|| AppError::not_found("Task not found"))?;

    Ok(Json(task))
}

/// PATCH /api/tasks/:id - Update a task
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Task>, AppError> {
    let update: TaskUpdate = read_json(request).await?;
    let task = state.db.update_task(&user.id, &id, &update)?;
    Ok(Json(task))
}

/// DELETE /api/tasks/:id - Delete a task (its tags survive)
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_task(&user.id, &id)?;

    info!(user = %user.name, task = %id, "Deleted task");
    Ok(Json(SuccessResponse { success: true }))
}

/// Request body for moving a task between board columns
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: Category,
}

/// PATCH /api/tasks/:id/category - Move a task to another column
pub async fn update_task_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Task>, AppError> {
    let req: CategoryRequest = read_json(request).await?;
    let task = state.db.update_task_category(&user.id, &id, req.category)?;
    Ok(Json(task))
}

/// Request body for reordering the board
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<String>,
}

/// POST /api/tasks/reorder - Renumber the board as `0..n`
pub async fn reorder_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    request: Request,
) -> Result<Json<Vec<Task>>, AppError> {
    let req: ReorderRequest = read_json(request).await?;
    let tasks = state.db.reorder_tasks(&user.id, &req.ids)?;
    Ok(Json(tasks))
}

/// Request body for replacing an entity's tags
///
/// `tags` stays optional so a missing list is reported as `bad-request`
/// by the reconciler rather than as a JSON shape error.
#[derive(Debug, Deserialize)]
pub struct SetTagsRequest {
    #[serde(default)]
    pub tags: Option<Vec<TagInput>>,
}

/// Run a reconciliation for the authenticated owner
pub(crate) fn reconcile_tags(
    state: &AppState,
    user: &User,
    kind: EntityKind,
    id: String,
    req: SetTagsRequest,
) -> Result<Vec<Tag>, AppError> {
    let request = ReconcileRequest {
        owner_id: Some(user.id.clone()),
        entity_kind: kind,
        entity_id: id,
        tags: req.tags,
    };
    Ok(TagReconciler::new(&state.db).reconcile(&request)?)
}

/// PUT /api/tasks/:id/tags - Replace a task's tags
pub async fn set_task_tags(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Vec<Tag>>, AppError> {
    let req: SetTagsRequest = read_json(request).await?;
    let tags = reconcile_tags(&state, &user, EntityKind::Task, id, req)?;
    Ok(Json(tags))
}
