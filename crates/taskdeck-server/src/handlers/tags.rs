//! Tag management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{read_json, AppError, AppState};
use taskdeck_core::models::{Tag, TagAnalytics, TagUpdate, TagWithPath, TagWithUsage, User};
use taskdeck_core::TagColor;

/// A color as sent by clients: the `{bg, color}` pair, or a legacy string
///
/// Legacy strings are normalized here and never reach the store.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ColorInput {
    Pair(TagColor),
    Legacy(String),
}

impl ColorInput {
    fn into_color(self) -> TagColor {
        match self {
            ColorInput::Pair(color) => color,
            ColorInput::Legacy(raw) => TagColor::from_legacy(&raw),
        }
    }
}

/// GET /api/tags - List the owner's tags with usage counts
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<TagWithUsage>>, AppError> {
    Ok(Json(state.db.list_tags(&user.id)?))
}

/// GET /api/tags/tree - Get hierarchical tag tree
pub async fn get_tag_tree(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<TagWithPath>>, AppError> {
    Ok(Json(state.db.get_tag_tree(&user.id)?))
}

/// GET /api/tags/analytics - Totals, most used tags, hierarchy shape
pub async fn get_tag_analytics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<TagAnalytics>, AppError> {
    Ok(Json(state.db.tag_analytics(&user.id)?))
}

/// GET /api/tags/:id - Get a specific tag
pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Tag>, AppError> {
    let tag = state
        .db
        .get_tag(&user.id, &id)?
        .ok_or_else(|| AppError::not_found("Tag not found"))?;

    Ok(Json(tag))
}

/// Request body for creating a tag
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: Option<ColorInput>,
    pub parent_id: Option<String>,
}

/// POST /api/tags - Create a new tag
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    request: Request,
) -> Result<Json<Tag>, AppError> {
    let req: CreateTagRequest = read_json(request).await?;
    let color = req.color.map(ColorInput::into_color);

    let tag = state.db.create_tag(
        &user.id,
        &req.name,
        color.as_ref(),
        req.parent_id.as_deref(),
    )?;

    info!(user = %user.name, tag = %tag.id, name = %tag.name, "Created tag");
    Ok(Json(tag))
}

/// Request body for updating a tag
#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    pub color: Option<ColorInput>,
}

/// PATCH /api/tags/:id - Rename or recolor a tag
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Tag>, AppError> {
    let req: UpdateTagRequest = read_json(request).await?;
    let update = TagUpdate {
        name: req.name,
        color: req.color.map(ColorInput::into_color),
    };

    Ok(Json(state.db.update_tag(&user.id, &id, &update)?))
}

/// Request body for re-parenting a tag
#[derive(Debug, Deserialize)]
pub struct MoveTagRequest {
    /// New parent; `null` or absent makes the tag a root
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// PATCH /api/tags/:id/move - Move a tag under another parent
pub async fn move_tag(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Tag>, AppError> {
    let req: MoveTagRequest = read_json(request).await?;
    Ok(Json(state.db.move_tag(&user.id, &id, req.parent_id.as_deref())?))
}

/// Response for tag deletion
#[derive(Debug, Serialize)]
pub struct DeleteTagResponse {
    pub success: bool,
    /// Children moved up to the deleted tag's parent
    pub children_moved: usize,
}

/// DELETE /api/tags/:id - Delete a tag, moving its children up
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<DeleteTagResponse>, AppError> {
    let children_moved = state.db.delete_tag(&user.id, &id)?;

    info!(user = %user.name, tag = %id, children_moved, "Deleted tag");
    Ok(Json(DeleteTagResponse {
        success: true,
        children_moved,
    }))
}
