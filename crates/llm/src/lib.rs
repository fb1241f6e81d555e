//! LLM provider abstraction shared by the event detector (C4) and the
//! (external) comment generator.
//!
//! A `LlmProvider` trait with `RateLimited{retry_after_ms}` and
//! `NetworkError(#[from] reqwest::Error)` variants, simplified to a
//! non-streaming `complete_json` contract since §4.4 asks for one
//! strict JSON response per call, not a token stream.

mod gemini;
mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("request refused: {0}")]
    Refused(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// A single non-streaming strict-JSON completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Two providers, one contract: given a built prompt and a target model
/// identifier, return the raw JSON text or a typed provider error.
/// Adapter selection above this trait is a configuration-time match, not
/// a runtime branch scattered through detection logic (§4.4).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete_json(
        &self,
        request: CompletionRequest,
        cancel: Option<CancellationToken>,
    ) -> LlmResult<String>;
}

/// Configuration-time provider selection (§6's `modelProvider` enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProvider {
    Openai,
    Google,
}

impl Default for ModelProvider {
    fn default() -> Self {
        ModelProvider::Openai
    }
}
