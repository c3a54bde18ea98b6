//! AI provider selection
//!
//! Routes a typed request to the cloud or the local engine and normalizes the
//! result into one of six output shapes.
//!
//! # Architecture
//!
//! - `AIBackend` trait: the six operations every engine implements
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - `ProviderSelector`: validates the request, builds the client for the
//!   chosen engine, and bounds the call with the configured timeout
//!
//! # Usage
//!
//! ```rust,ignore
//! let selector = ProviderSelector::new(config.ai.clone());
//! let output = selector
//!     .invoke(&AIInvocation::new("local", OutputKind::Priority, AIRequest::new("Fix prod today")))
//!     .await?;
//! ```

mod cloud;
pub mod error;
mod local;
pub mod parsing;
pub mod prompts;
pub mod types;

pub use cloud::CloudBackend;
pub use error::{AIError, AIErrorKind, AIResult};
pub use local::{LocalBackend, PriorityFactors};
pub use types::*;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::models::Priority;

/// Trait defining the interface for all AI engines
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Short summary of the text
    async fn summarize(&self, request: &AIRequest) -> AIResult<String>;

    /// One to five tag suggestions
    async fn suggest_tags(&self, request: &AIRequest) -> AIResult<Vec<SuggestedTag>>;

    /// Board category with confidence
    async fn classify(&self, request: &AIRequest) -> AIResult<Classification>;

    async fn prioritize(&self, request: &AIRequest) -> AIResult<Priority>;

    /// Follow-up task proposal
    async fn suggest_next_task(&self, request: &AIRequest) -> AIResult<NextTask>;

    /// Task drafted from free text, with any due date resolved
    async fn draft_task(&self, request: &AIRequest) -> AIResult<TaskDraft>;

    /// Engine/model name (for logging)
    fn name(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone, Debug)]
pub enum AIClient {
    Cloud(CloudBackend),
    Local(LocalBackend),
}

impl AIClient {
    pub fn engine(&self) -> Engine {
        match self {
            AIClient::Cloud(_) => Engine::Cloud,
            AIClient::Local(_) => Engine::Local,
        }
    }

    /// Run the operation for `kind` and wrap the result in its output shape
    pub async fn run(&self, kind: OutputKind, request: &AIRequest) -> AIResult<AIOutput> {
        Ok(match kind {
            OutputKind::Summary => AIOutput::Summary {
                text: self.summarize(request).await?,
            },
            OutputKind::Tags => AIOutput::Tags {
                suggested_tags: self.suggest_tags(request).await?,
            },
            OutputKind::Classify => self.classify(request).await?.into(),
            OutputKind::Priority => AIOutput::Priority {
                priority: self.prioritize(request).await?,
            },
            OutputKind::Suggest => AIOutput::Suggest {
                next_task: self.suggest_next_task(request).await?,
            },
            OutputKind::Create => AIOutput::Create {
                task: self.draft_task(request).await?,
            },
        })
    }
}

#[async_trait]
impl AIBackend for AIClient {
    async fn summarize(&self, request: &AIRequest) -> AIResult<String> {
        match self {
            AIClient::Cloud(b) => b.summarize(request).await,
            AIClient::Local(b) => b.summarize(request).await,
        }
    }

    async fn suggest_tags(&self, request: &AIRequest) -> AIResult<Vec<SuggestedTag>> {
        match self {
            AIClient::Cloud(b) => b.suggest_tags(request).await,
            AIClient::Local(b) => b.suggest_tags(request).await,
        }
    }

    async fn classify(&self, request: &AIRequest) -> AIResult<Classification> {
        match self {
            AIClient::Cloud(b) => b.classify(request).await,
            AIClient::Local(b) => b.classify(request).await,
        }
    }

    async fn prioritize(&self, request: &AIRequest) -> AIResult<Priority> {
        match self {
            AIClient::Cloud(b) => b.prioritize(request).await,
            AIClient::Local(b) => b.prioritize(request).await,
        }
    }

    async fn suggest_next_task(&self, request: &AIRequest) -> AIResult<NextTask> {
        match self {
            AIClient::Cloud(b) => b.suggest_next_task(request).await,
            AIClient::Local(b) => b.suggest_next_task(request).await,
        }
    }

    async fn draft_task(&self, request: &AIRequest) -> AIResult<TaskDraft> {
        match self {
            AIClient::Cloud(b) => b.draft_task(request).await,
            AIClient::Local(b) => b.draft_task(request).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            AIClient::Cloud(b) => b.name(),
            AIClient::Local(b) => b.name(),
        }
    }
}

/// One AI call as received from a caller
#[derive(Debug, Clone)]
pub struct AIInvocation {
    /// Engine identifier as supplied (validated by the selector)
    pub engine: String,
    pub kind: OutputKind,
    /// Caller-supplied credential for the cloud engine
    pub api_key: Option<String>,
    pub request: AIRequest,
}

impl AIInvocation {
    pub fn new(engine: &str, kind: OutputKind, request: AIRequest) -> Self {
        Self {
            engine: engine.to_string(),
            kind,
            api_key: None,
            request,
        }
    }

    pub fn with_api_key(mut self, key: Option<&str>) -> Self {
        self.api_key = key.map(str::to_string);
        self
    }
}

/// Validates AI calls and routes them to an engine
#[derive(Clone)]
pub struct ProviderSelector {
    config: AiConfig,
    http_client: Client,
}

impl ProviderSelector {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            http_client: Client::new(),
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Build the client for an engine
    ///
    /// Fails with `missing-key` when the cloud engine is chosen without a
    /// non-blank key.
    pub fn client_for(&self, engine: Engine, api_key: Option<&str>) -> AIResult<AIClient> {
        match engine {
            Engine::Cloud => {
                let key = api_key
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .ok_or_else(AIError::missing_key)?;
                Ok(AIClient::Cloud(CloudBackend::new(
                    self.http_client.clone(),
                    &self.config.cloud,
                    key,
                )))
            }
            Engine::Local => Ok(AIClient::Local(LocalBackend::new())),
        }
    }

    /// Validate, dispatch under the timeout, and return the normalized output
    ///
    /// Checks run in this order before any engine is built: engine name,
    /// cloud credential, then non-blank text.
    pub async fn invoke(&self, invocation: &AIInvocation) -> AIResult<AIOutput> {
        let engine: Engine = invocation.engine.parse()?;

        if engine == Engine::Cloud
            && invocation
                .api_key
                .as_deref()
                .map_or(true, |k| k.trim().is_empty())
        {
            return Err(AIError::missing_key());
        }

        if invocation.request.text.trim().is_empty() {
            return Err(AIError::invalid_request("Text must not be empty"));
        }

        let client = self.client_for(engine, invocation.api_key.as_deref())?;
        let kind = invocation.kind;

        debug!(
            engine = engine.as_str(),
            kind = kind.as_str(),
            backend = client.name(),
            "Dispatching AI request"
        );

        let result = match tokio::time::timeout(
            self.config.timeout,
            client.run(kind, &invocation.request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AIError::timeout(format!(
                "{} engine did not answer within {}s",
                engine.as_str(),
                self.config.timeout.as_secs()
            ))),
        };

        if let Err(ref e) = result {
            warn!(
                engine = engine.as_str(),
                kind = kind.as_str(),
                error_kind = e.kind.as_str(),
                "AI request failed: {}",
                e.message
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> ProviderSelector {
        ProviderSelector::new(AiConfig::default())
    }

    #[tokio::test]
    async fn test_unknown_engine_is_invalid_request() {
        let err = selector()
            .invoke(&AIInvocation::new("psychic", OutputKind::Summary, AIRequest::new("x")))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AIErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_cloud_without_key_is_missing_key_for_any_text() {
        for text in ["Buy milk", "", "   "] {
            let err = selector()
                .invoke(&AIInvocation::new("cloud", OutputKind::Tags, AIRequest::new(text)))
                .await
                .unwrap_err();
            assert_eq!(err.kind, AIErrorKind::MissingKey, "text {:?}", text);
        }

        let err = selector()
            .invoke(
                &AIInvocation::new("cloud", OutputKind::Tags, AIRequest::new("Buy milk"))
                    .with_api_key(Some("  ")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, AIErrorKind::MissingKey);
    }

    #[tokio::test]
    async fn test_blank_text_is_invalid_request() {
        let err = selector()
            .invoke(&AIInvocation::new("local", OutputKind::Summary, AIRequest::new(" \n ")))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AIErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_local_produces_every_shape() {
        let sel = selector();
        for kind in OutputKind::ALL {
            let out = sel
                .invoke(&AIInvocation::new(
                    "local",
                    kind,
                    AIRequest::new("Write the quarterly report. Due today."),
                ))
                .await
                .unwrap();
            assert_eq!(out.kind(), kind);
        }
    }

    #[test]
    fn test_client_factory() {
        let sel = selector();
        assert_eq!(
            sel.client_for(Engine::Local, None).unwrap().engine(),
            Engine::Local
        );
        assert_eq!(
            sel.client_for(Engine::Cloud, Some("k")).unwrap().engine(),
            Engine::Cloud
        );
        assert_eq!(
            sel.client_for(Engine::Cloud, None).unwrap_err().kind,
            AIErrorKind::MissingKey
        );
    }
}
