//! AI invocation handler

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{AppError, AppState, AI_KEY_HEADER, MAX_BODY_SIZE};
use taskdeck_core::ai::{AIError, AIInvocation, AIOutput, AIRequest, OutputKind};
use taskdeck_core::models::{Category, Task, User};
use taskdeck_core::save_task_draft;

/// Request body for an AI call
#[derive(Debug, Deserialize)]
pub struct AiRequestBody {
    pub engine: String,
    /// Missing text is treated as empty so the selector reports it in order
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub existing_tags: Vec<String>,
    #[serde(default)]
    pub existing_tasks: Vec<String>,
    /// Board column for tasks saved from text
    #[serde(default)]
    pub category: Option<Category>,
}

/// Read the caller's key header and body into an invocation
async fn read_invocation(
    kind: OutputKind,
    request: Request,
) -> Result<(AIInvocation, Option<Category>), AppError> {
    let api_key = request
        .headers()
        .get(AI_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AIError::invalid_request("Invalid request body"))?;
    let body: AiRequestBody = serde_json::from_slice(&bytes)
        .map_err(|e| AIError::invalid_request(format!("Invalid JSON: {}", e)))?;

    let invocation = AIInvocation::new(
        &body.engine,
        kind,
        AIRequest {
            text: body.text,
            existing_tags: body.existing_tags,
            existing_tasks: body.existing_tasks,
        },
    )
    .with_api_key(api_key.as_deref());

    Ok((invocation, body.category))
}

/// POST /api/ai/:kind - Run one AI operation
///
/// The cloud credential comes from the `x-api-key` header and is never
/// stored. Failures use the AI error kinds (`missing-key`, `timeout`, ...).
pub async fn invoke_ai(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Extension(user): Extension<User>,
    request: Request,
) -> Result<Json<AIOutput>, AppError> {
    let kind: OutputKind = kind.parse()?;
    let (invocation, _) = read_invocation(kind, request).await?;

    let output = state.selector.invoke(&invocation).await?;

    info!(
        user = %user.name,
        engine = %invocation.engine,
        kind = kind.as_str(),
        "AI request completed"
    );

    Ok(Json(output))
}

/// POST /api/tasks/from-text - Draft a task with AI and save it
///
/// Takes the same body as `/api/ai/create` plus an optional `category`
/// (default `inbox`). Drafted tag names are reconciled against the
/// caller's existing tags.
pub async fn create_task_from_text(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    request: Request,
) -> Result<Json<Task>, AppError> {
    let (mut invocation, category) = read_invocation(OutputKind::Create, request).await?;
    if invocation.request.existing_tags.is_empty() {
        invocation.request.existing_tags = state
            .db
            .list_tags(&user.id)?
            .into_iter()
            .map(|t| t.tag.name)
            .collect();
    }

    let draft = match state.selector.invoke(&invocation).await? {
        AIOutput::Create { task } => task,
        other => {
            return Err(AIError::invalid_response(format!(
                "Expected a task draft, got {}",
                other.kind().as_str()
            ))
            .into())
        }
    };

    let task = save_task_draft(&state.db, &user.id, &draft, category.unwrap_or_default())?;

    info!(
        user = %user.name,
        engine = %invocation.engine,
        task = %task.id,
        "Created task from text"
    );
    Ok(Json(task))
}
