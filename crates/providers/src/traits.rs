use std::time::Duration;

use serde::{Deserialize, Serialize};

use mc_domain::stream::{BoxStream, StreamEvent};
use mc_domain::{Result, ToolsConfig};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One conversation message on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `user`, `assistant`, `system`, or `developer`.
    pub role: String,
    pub text: String,
}

/// A provider-agnostic chat request, fully resolved by the engine.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub system_text: String,
    pub developer_text: String,
    /// Ordered conversation history, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Output hints: `text`, `markdown`, or `json`.
    pub text_format: String,
    pub verbosity: String,
    pub effort: String,
    pub summary_auto: bool,
    pub max_output_tokens: u64,
    pub tools: ToolsConfig,
}

/// One model a provider can serve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
}

/// Result of a lightweight liveness/credential check.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResult {
    pub provider: String,
    pub ok: bool,
    pub message: String,
}

/// The event stream a provider returns from [`Provider::stream_chat`].
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every provider adapter implements.
///
/// Streaming contract: at most one `Start` first, then `Delta`s in
/// emission order, at most one `Usage` (typically near the end), then
/// `Done` or `Error`. Dropping the stream aborts the underlying request
/// promptly — that is the engine's cancellation path.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Stable lowercase provider name.
    fn name(&self) -> &str;

    /// Hosts this provider connects to. Empty for local-only providers;
    /// callers gate every listed host through the network policy.
    fn network_hosts(&self) -> Vec<String>;

    /// Liveness/credential check, bounded by `timeout`.
    async fn verify(&self, timeout: Duration) -> Result<VerifyResult>;

    /// List the models this provider can serve.
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Open a streaming chat completion.
    async fn stream_chat(&self, req: ChatRequest) -> Result<EventStream>;
}
