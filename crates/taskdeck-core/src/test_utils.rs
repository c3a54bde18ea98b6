//! Test utilities for taskdeck-core
//!
//! Provides a mock cloud AI server speaking the Gemini `generateContent`
//! wire format, with scripted replies for exercising error mapping.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use crate::config::{AiConfig, CloudConfig};

/// What the mock answers to every request
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 with this model text as the single candidate part
    Text(String),
    /// Bare status code with a short error body
    Status(u16),
    /// Wait, then answer with the text
    Delayed(Duration, String),
}

#[derive(Clone)]
struct MockState {
    reply: MockReply,
    hits: Arc<AtomicUsize>,
    last_key: Arc<std::sync::Mutex<Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

/// Mock cloud AI server for testing
pub struct MockCloudServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    last_key: Arc<std::sync::Mutex<Option<String>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockCloudServer {
    /// Start the mock server on an available port
    pub async fn start(reply: MockReply) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let last_key = Arc::new(std::sync::Mutex::new(None));
        let state = MockState {
            reply,
            hits: hits.clone(),
            last_key: last_key.clone(),
        };

        // Model and action share one path segment: "gemini-1.5-pro:generateContent"
        let app = Router::new()
            .route("/v1beta/models/:model_action", post(handle_generate))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            hits,
            last_key,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// AI config pointing the cloud engine at this server
    pub fn ai_config(&self, timeout: Duration) -> AiConfig {
        AiConfig {
            timeout,
            cloud: CloudConfig {
                base_url: self.url(),
                ..Default::default()
            },
        }
    }

    /// Number of requests received
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Key presented on the most recent request
    pub fn last_key(&self) -> Option<String> {
        self.last_key.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockCloudServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn candidate(text: &str) -> Response {
    Json(json!({
        "candidates": [
            { "content": { "parts": [ { "text": text } ], "role": "model" } }
        ]
    }))
    .into_response()
}

async fn handle_generate(
    State(state): State<MockState>,
    Query(query): Query<KeyQuery>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last_key.lock().unwrap() = query.key;

    match state.reply {
        MockReply::Text(ref text) => candidate(text),
        MockReply::Status(code) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({ "error": { "code": code, "message": "mock failure" } })),
            )
                .into_response()
        }
        MockReply::Delayed(delay, ref text) => {
            tokio::time::sleep(delay).await;
            candidate(text)
        }
    }
}
