//! Note handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;

use super::tasks::{reconcile_tags, SetTagsRequest};
use crate::{read_json, AppError, AppState, SuccessResponse};
use taskdeck_core::models::{EntityKind, NewNote, Note, NoteCategory, NoteUpdate, Tag, User};

/// Query parameters for listing notes
#[derive(Debug, Deserialize)]
pub struct NoteQuery {
    /// Category filter: general, diary, idea, reference, task_note
    pub category: Option<String>,
}

/// GET /api/notes - List the owner's notes, most recently updated first
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(params): Query<NoteQuery>,
) -> Result<Json<Vec<Note>>, AppError> {
    let category = params
        .category
        .as_deref()
        .map(|c| c.parse::<NoteCategory>())
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?;

    Ok(Json(state.db.list_notes(&user.id, category)?))
}

/// POST /api/notes - Create a note
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    request: Request,
) -> Result<Json<Note>, AppError> {
    let new_note: NewNote = read_json(request).await?;
    let note = state.db.create_note(&user.id, &new_note)?;

    info!(user = %user.name, note = %note.id, "Created note");
    Ok(Json(note))
}

/// GET /api/notes/:id - Get a specific note
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Note>, AppError> {
    let note = state
        .db
        .get_note(&user.id, &id)?
        .ok_or_else(|| AppError::not_found("Note not found"))?;

    Ok(Json(note))
}

/// PATCH /api/notes/:id - Update a note
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Note>, AppError> {
    let update: NoteUpdate = read_json(request).await?;
    Ok(Json(state.db.update_note(&user.id, &id, &update)?))
}

/// DELETE /api/notes/:id - Delete a note (its tags survive)
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_note(&user.id, &id)?;

    info!(user = %user.name, note = %id, "Deleted note");
    Ok(Json(SuccessResponse { success: true }))
}

/// PUT /api/notes/:id/tags - Replace a note's tags
pub async fn set_note_tags(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Vec<Tag>>, AppError> {
    let req: SetTagsRequest = read_json(request).await?;
    let tags = reconcile_tags(&state, &user, EntityKind::Note, id, req)?;
    Ok(Json(tags))
}
