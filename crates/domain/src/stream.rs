use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed async stream, used for LLM streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Events emitted during LLM streaming (provider-agnostic).
///
/// The turn engine consumes these in order: a `Start` (at most one,
/// first), any number of `Delta`s, at most one `Usage` (typically near
/// the end), then `Done` or `Error`. Dropping the stream cancels the
/// underlying request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// The provider accepted the request and began responding.
    #[serde(rename = "start")]
    Start {
        /// Provider-assigned request/response id, when available.
        request_id: Option<String>,
    },

    /// An incremental text chunk. Never empty.
    #[serde(rename = "delta")]
    Delta { text: String },

    /// Token usage reported by the provider.
    #[serde(rename = "usage")]
    Usage(TokenUsage),

    /// Stream is finished.
    #[serde(rename = "done")]
    Done {
        /// Full response text for providers that answer without deltas.
        text: Option<String>,
        finish_reason: Option<String>,
    },

    /// An error occurred during streaming.
    #[serde(rename = "error")]
    Error { message: String },
}

/// Token usage for a completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    /// True when the numbers come from a heuristic, not the provider.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub approximate: bool,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            approximate: false,
        }
    }
}
