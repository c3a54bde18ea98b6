//! Cloud backend (Gemini `generateContent` REST API)
//!
//! One POST per operation. The key travels as the `key` query parameter and
//! is never logged. HTTP failures are mapped onto [`AIErrorKind`] here so
//! callers only ever see the normalized taxonomy.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CloudConfig;
use crate::models::Priority;

use super::error::{AIError, AIErrorKind, AIResult};
use super::parsing::parse_output;
use super::prompts;
use super::types::{
    AIOutput, AIRequest, Classification, NextTask, OutputKind, SuggestedTag, TaskDraft,
};
use super::AIBackend;

/// Gemini-style cloud backend
#[derive(Clone)]
pub struct CloudBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl std::fmt::Debug for CloudBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl CloudBackend {
    /// Create a backend for one caller's key
    pub fn new(http_client: Client, config: &CloudConfig, api_key: &str) -> Self {
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Send one prompt and return the model's raw text
    async fn generate(&self, prompt: String) -> AIResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            AIError::invalid_response(format!("Unreadable response body: {}", e.without_url()))
        })?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AIError::invalid_response("Response contained no text"))?;

        debug!(model = %self.model, chars = text.len(), "Cloud response received");
        Ok(text)
    }

    async fn run_kind(&self, kind: OutputKind, request: &AIRequest) -> AIResult<AIOutput> {
        let text = self.generate(prompts::render(kind, request)).await?;
        parse_output(kind, &text)
    }
}

/// Map a non-success HTTP status to an error kind
fn status_error(status: StatusCode, body: &str) -> AIError {
    let kind = match status {
        StatusCode::TOO_MANY_REQUESTS => AIErrorKind::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AIErrorKind::MissingKey,
        StatusCode::BAD_REQUEST => AIErrorKind::InvalidRequest,
        _ => AIErrorKind::NetworkError,
    };

    let detail: String = body.chars().take(200).collect();
    let message = match kind {
        AIErrorKind::RateLimited => "Cloud API rate limit exceeded".to_string(),
        AIErrorKind::MissingKey => "Cloud API rejected the API key".to_string(),
        _ if detail.is_empty() => format!("Cloud API returned {}", status),
        _ => format!("Cloud API returned {}: {}", status, detail),
    };
    AIError::new(kind, message)
}

/// Unwrap the expected variant after parsing
fn expect_variant<T>(output: AIOutput, pick: impl FnOnce(AIOutput) -> Option<T>) -> AIResult<T> {
    let kind = output.kind();
    pick(output).ok_or_else(|| {
        AIError::new(
            AIErrorKind::Unknown,
            format!("Parser produced unexpected {} output", kind.as_str()),
        )
    })
}

#[async_trait]
impl AIBackend for CloudBackend {
    async fn summarize(&self, request: &AIRequest) -> AIResult<String> {
        let out = self.run_kind(OutputKind::Summary, request).await?;
        expect_variant(out, |o| match o {
            AIOutput::Summary { text } => Some(text),
            _ => None,
        })
    }

    async fn suggest_tags(&self, request: &AIRequest) -> AIResult<Vec<SuggestedTag>> {
        let out = self.run_kind(OutputKind::Tags, request).await?;
        expect_variant(out, |o| match o {
            AIOutput::Tags { suggested_tags } => Some(suggested_tags),
            _ => None,
        })
    }

    async fn classify(&self, request: &AIRequest) -> AIResult<Classification> {
        let out = self.run_kind(OutputKind::Classify, request).await?;
        expect_variant(out, |o| match o {
            AIOutput::Classify {
                category,
                confidence,
                reason,
            } => Some(Classification {
                category,
                confidence,
                reason,
            }),
            _ => None,
        })
    }

    async fn prioritize(&self, request: &AIRequest) -> AIResult<Priority> {
        let out = self.run_kind(OutputKind::Priority, request).await?;
        expect_variant(out, |o| match o {
            AIOutput::Priority { priority } => Some(priority),
            _ => None,
        })
    }

    async fn suggest_next_task(&self, request: &AIRequest) -> AIResult<NextTask> {
        let out = self.run_kind(OutputKind::Suggest, request).await?;
        expect_variant(out, |o| match o {
            AIOutput::Suggest { next_task } => Some(next_task),
            _ => None,
        })
    }

    async fn draft_task(&self, request: &AIRequest) -> AIResult<TaskDraft> {
        let out = self.run_kind(OutputKind::Create, request).await?;
        expect_variant(out, |o| match o {
            AIOutput::Create { task } => Some(task),
            _ => None,
        })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ========== Wire types ==========

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "").kind,
            AIErrorKind::RateLimited
        );
        assert_eq!(
            status_error(StatusCode::FORBIDDEN, "").kind,
            AIErrorKind::MissingKey
        );
        assert_eq!(
            status_error(StatusCode::BAD_REQUEST, "bad").kind,
            AIErrorKind::InvalidRequest
        );
        assert_eq!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, "").kind,
            AIErrorKind::NetworkError
        );
    }

    #[test]
    fn test_request_wire_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hi".into() }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                max_output_tokens: 1024,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_endpoint_and_debug_hide_key() {
        let backend = CloudBackend::new(
            Client::new(),
            &CloudConfig {
                base_url: "http://localhost:1/".into(),
                ..Default::default()
            },
            "secret-key",
        );
        assert_eq!(
            backend.endpoint(),
            "http://localhost:1/v1beta/models/gemini-1.5-pro:generateContent"
        );
        assert!(!format!("{:?}", backend).contains("secret-key"));
    }

    // ========== Against the mock server ==========

    use std::time::Duration;

    use crate::ai::{AIInvocation, ProviderSelector};
    use crate::test_utils::{MockCloudServer, MockReply};

    fn keyed(kind: OutputKind, text: &str) -> AIInvocation {
        AIInvocation::new("cloud", kind, AIRequest::new(text)).with_api_key(Some("test-key"))
    }

    async fn invoke_against(
        reply: MockReply,
        timeout: Duration,
        kind: OutputKind,
    ) -> (AIResult<AIOutput>, MockCloudServer) {
        let server = MockCloudServer::start(reply).await;
        let selector = ProviderSelector::new(server.ai_config(timeout));
        let result = selector.invoke(&keyed(kind, "Write the quarterly report")).await;
        (result, server)
    }

    #[tokio::test]
    async fn test_tags_from_fenced_reply() {
        let (result, server) = invoke_against(
            MockReply::Text("```json\n{\"tags\": [\"work\", \"reports\", \"work\"]}\n```".into()),
            Duration::from_secs(5),
            OutputKind::Tags,
        )
        .await;

        match result.unwrap() {
            AIOutput::Tags { suggested_tags } => {
                let names: Vec<_> = suggested_tags.iter().map(|t| t.name.as_str()).collect();
                assert_eq!(names, vec!["work", "reports"]);
            }
            other => panic!("unexpected output {:?}", other),
        }
        assert_eq!(server.hits(), 1);
        assert_eq!(server.last_key().as_deref(), Some("test-key"));
    }

    #[tokio::test]
    async fn test_classify_reply() {
        let (result, _server) = invoke_against(
            MockReply::Text(r#"{"category": "doing", "confidence": 0.85, "reason": "due today"}"#.into()),
            Duration::from_secs(5),
            OutputKind::Classify,
        )
        .await;

        let json = serde_json::to_value(result.unwrap()).unwrap();
        assert_eq!(json["kind"], "classify");
        assert_eq!(json["category"], "doing");
        assert_eq!(json["confidence"], 0.85);
    }

    #[tokio::test]
    async fn test_create_reply() {
        let (result, server) = invoke_against(
            MockReply::Text(
                r#"{"title": "Write the quarterly report", "description": "", "priority": "high", "tags": ["work"], "dueDate": "2026-12-31"}"#
                    .into(),
            ),
            Duration::from_secs(5),
            OutputKind::Create,
        )
        .await;

        let json = serde_json::to_value(result.unwrap()).unwrap();
        assert_eq!(json["kind"], "create");
        assert_eq!(json["task"]["title"], "Write the quarterly report");
        assert_eq!(json["task"]["priority"], "high");
        assert_eq!(json["task"]["tags"], serde_json::json!(["work"]));
        assert_eq!(json["task"]["dueDate"], "2026-12-31");
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_never_reaches_server() {
        let server = MockCloudServer::start(MockReply::Text("{}".into())).await;
        let selector = ProviderSelector::new(server.ai_config(Duration::from_secs(5)));

        for kind in OutputKind::ALL {
            let err = selector
                .invoke(&AIInvocation::new("cloud", kind, AIRequest::new("Plan the offsite")))
                .await
                .unwrap_err();
            assert_eq!(err.kind, AIErrorKind::MissingKey);
        }
        assert_eq!(server.hits(), 0);
    }

    #[tokio::test]
    async fn test_http_status_kinds() {
        let cases = [
            (429, AIErrorKind::RateLimited),
            (401, AIErrorKind::MissingKey),
            (400, AIErrorKind::InvalidRequest),
            (503, AIErrorKind::NetworkError),
        ];
        for (status, expected) in cases {
            let (result, server) = invoke_against(
                MockReply::Status(status),
                Duration::from_secs(5),
                OutputKind::Summary,
            )
            .await;
            assert_eq!(result.unwrap_err().kind, expected, "status {}", status);
            assert_eq!(server.hits(), 1);
        }
    }

    #[tokio::test]
    async fn test_slow_reply_times_out() {
        let (result, _server) = invoke_against(
            MockReply::Delayed(Duration::from_secs(2), r#"{"summary": "late"}"#.into()),
            Duration::from_millis(200),
            OutputKind::Summary,
        )
        .await;
        assert_eq!(result.unwrap_err().kind, AIErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_unparseable_replies_are_invalid_response() {
        for (kind, text) in [
            (OutputKind::Tags, "Sure! Here are some ideas."),
            (OutputKind::Classify, r#"{"category": "todo", "confidence": 1.7, "reason": "x"}"#),
            (OutputKind::Classify, r#"{"category": "someday", "confidence": 0.5, "reason": "x"}"#),
        ] {
            let (result, _server) =
                invoke_against(MockReply::Text(text.into()), Duration::from_secs(5), kind).await;
            assert_eq!(result.unwrap_err().kind, AIErrorKind::InvalidResponse, "{}", text);
        }
    }
}
