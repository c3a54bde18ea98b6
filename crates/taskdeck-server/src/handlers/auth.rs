//! Authentication-related handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::AppState;
use taskdeck_core::models::User;

/// Response for the /api/health endpoint
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/health - Liveness check (no authentication)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Response for the /api/me endpoint
#[derive(Serialize)]
pub struct MeResponse {
    pub id: String,
    pub name: String,
    /// How the owner was authenticated
    pub auth_method: &'static str,
}

/// GET /api/me - Get the currently authenticated owner
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Json<MeResponse> {
    let auth_method = if state.settings.require_auth {
        "api_token"
    } else {
        "none"
    };

    Json(MeResponse {
        id: user.id,
        name: user.name,
        auth_method,
    })
}
