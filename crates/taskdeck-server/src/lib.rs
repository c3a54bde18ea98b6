//! Taskdeck Web Server
//!
//! Axum-based REST API for the Taskdeck task and notes service.
//!
//! Security features:
//! - Bearer-token authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Request body size limits
//! - Sanitized error responses with a stable `{error, message}` shape

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use taskdeck_core::ai::{AIError, AIErrorKind, ProviderSelector};
use taskdeck_core::db::Database;
use taskdeck_core::models::User;
use taskdeck_core::{AppConfig, ServerSettings};

mod handlers;

/// Maximum JSON request body size (256 KB)
pub const MAX_BODY_SIZE: usize = 256 * 1024;

/// Owner name used for every request when authentication is disabled
pub const LOCAL_OWNER_NAME: &str = "local";

/// Header carrying the caller's cloud AI key
pub const AI_KEY_HEADER: &str = "x-api-key";

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub settings: ServerSettings,
    pub selector: ProviderSelector,
    /// Owner every request acts as when `require_auth` is off
    pub local_owner: Option<User>,
}

/// Authentication middleware - resolves the bearer token to its owner
///
/// On success the owner is inserted as a request extension, so handlers take
/// `Extension<User>`. With authentication disabled the local owner is used.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if !state.settings.require_auth {
        if let Some(owner) = state.local_owner.clone() {
            request.extensions_mut().insert(owner);
        }
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        warn!(path = %request.uri().path(), "Unauthorized request - no bearer token");
        return AppError::unauthorized("Authentication required").into_response();
    };

    match state.db.resolve_token(token) {
        Ok(Some(user)) => {
            info!(user = %user.name, path = %request.uri().path(), "Authenticated via API token");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => {
            warn!(path = %request.uri().path(), "Unauthorized request - unknown token");
            AppError::unauthorized("Invalid API token").into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Get the local owner, creating it on first use
///
/// A concurrent creator may win the insert; the lookup after a conflict picks
/// up its row.
pub fn ensure_local_owner(db: &Database) -> taskdeck_core::Result<User> {
    if let Some(user) = db.get_user_by_name(LOCAL_OWNER_NAME)? {
        return Ok(user);
    }
    match db.create_user(LOCAL_OWNER_NAME) {
        Err(taskdeck_core::Error::Conflict(_)) => db
            .get_user_by_name(LOCAL_OWNER_NAME)?
            .ok_or_else(|| taskdeck_core::Error::NotFound("Local owner vanished".to_string())),
        other => other,
    }
}

/// Read and deserialize a JSON request body
///
/// Failures become `bad-request` with the serde message, keeping the error
/// body shape uniform across handlers.
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, AppError> {
    let bytes: Bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::bad_request(&format!("Invalid JSON: {}", e)))
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(
    db: Database,
    static_dir: Option<&str>,
    config: &AppConfig,
) -> taskdeck_core::Result<Router> {
    let local_owner = if config.server.require_auth {
        None
    } else {
        Some(ensure_local_owner(&db)?)
    };

    let selector = ProviderSelector::new(config.ai.clone());
    info!(
        model = %config.ai.cloud.model,
        timeout_secs = config.ai.timeout.as_secs(),
        "AI provider selector ready (engines: cloud, local)"
    );

    let state = Arc::new(AppState {
        db,
        settings: config.server.clone(),
        selector,
        local_owner,
    });

    let api_routes = Router::new()
        // Auth
        .route("/me", get(handlers::get_me))
        // AI
        .route("/ai/:kind", post(handlers::invoke_ai))
        // Tasks
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route("/tasks/reorder", post(handlers::reorder_tasks))
        .route("/tasks/from-text", post(handlers::create_task_from_text))
        .route(
            "/tasks/:id",
            get(handlers::get_task)
                .patch(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/tasks/:id/category", patch(handlers::update_task_category))
        .route("/tasks/:id/tags", put(handlers::set_task_tags))
        // Notes
        .route(
            "/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        .route(
            "/notes/:id",
            get(handlers::get_note)
                .patch(handlers::update_note)
                .delete(handlers::delete_note),
        )
        .route("/notes/:id/tags", put(handlers::set_note_tags))
        // Tags
        .route("/tags", get(handlers::list_tags).post(handlers::create_tag))
        .route("/tags/tree", get(handlers::get_tag_tree))
        .route("/tags/analytics", get(handlers::get_tag_analytics))
        .route(
            "/tags/:id",
            get(handlers::get_tag)
                .patch(handlers::update_tag)
                .delete(handlers::delete_tag),
        )
        .route("/tags/:id/move", patch(handlers::move_tag))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Health stays reachable without a token
        .route("/health", get(handlers::health));

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let allowed_headers = [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        header::HeaderName::from_static(AI_KEY_HEADER),
    ];
    let cors = if state.settings.cors_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(allowed_headers)
    } else {
        let origins: Vec<HeaderValue> = state
            .settings
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(allowed_headers)
    };

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'; frame-ancestors 'none'"),
        ));

    // Serve a prebuilt frontend if a directory is provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    Ok(app)
}

/// Start the server with the resolved configuration
pub async fn serve_with_config(
    db: Database,
    static_dir: Option<&str>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    if !config.server.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }
    if config.ai.cloud.api_key.is_some() {
        info!("ℹ️  Cloud AI key in config is used by the CLI only; HTTP callers send x-api-key");
    }

    let app = create_router(db, static_dir, config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
///
/// Serialized as `{"error": <kind>, "message": <text>}`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, kind: &'static str, msg: &str) -> Self {
        Self {
            status,
            kind,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad-request", msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not-found", msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Classify an AI failure by its kind
    fn from_ai(err: &AIError) -> Self {
        let status = match err.kind {
            AIErrorKind::MissingKey => StatusCode::UNAUTHORIZED,
            AIErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AIErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AIErrorKind::InvalidResponse | AIErrorKind::NetworkError => StatusCode::BAD_GATEWAY,
            AIErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            AIErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.kind.as_str(), &err.message)
    }

    /// Classify a core library failure
    ///
    /// Storage and I/O failures are logged in full and reported generically.
    fn from_core(err: taskdeck_core::Error) -> Self {
        use taskdeck_core::Error as E;
        match err {
            E::InvalidData(msg) => Self::bad_request(&msg),
            E::NotFound(msg) => Self::not_found(&msg),
            E::Conflict(msg) => Self::conflict(&msg),
            E::Unauthorized(msg) => Self::unauthorized(&msg),
            other => Self {
                internal: Some(other.into()),
                ..Self::internal("An internal error occurred")
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.kind,
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        let err = match err.downcast::<taskdeck_core::Error>() {
            Ok(core) => return Self::from_core(core),
            Err(err) => err,
        };
        if let Some(ai) = err.downcast_ref::<AIError>() {
            return Self::from_ai(ai);
        }
        Self {
            internal: Some(err),
            // Return generic message to client
            ..Self::internal("An internal error occurred")
        }
    }
}
