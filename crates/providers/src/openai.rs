//! OpenAI-shaped network adapter.
//!
//! Speaks the chat-completions wire contract against a configurable base
//! URL, so it also covers Azure-less OpenAI-compatible endpoints (vLLM,
//! LM Studio, Together). The API key is read from the process
//! environment at call time, never persisted.

use std::time::Duration;

use serde_json::Value;

use mc_domain::stream::{StreamEvent, TokenUsage};
use mc_domain::{Error, Result};

use crate::sse::event_stream;
use crate::traits::{ChatRequest, EventStream, ModelInfo, Provider, VerifyResult};
use crate::util::{from_reqwest, host_of};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_KEY_ENV: &str = "OPENAI_API_KEY";

const LIST_MODELS_TIMEOUT: Duration = Duration::from_secs(25);

pub struct OpenAiProvider {
    name: String,
    base_url: String,
    key_env: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Adapter named `openai` against `base_url` (default
    /// `https://api.openai.com`), key from `OPENAI_API_KEY`.
    pub fn new(base_url: Option<String>) -> Self {
        Self::with_name("openai", base_url, None)
    }

    /// Adapter with a custom registry name, base URL, and key env var —
    /// for OpenAI-compatible endpoints under a different identity.
    pub fn with_name(
        name: &str,
        base_url: Option<String>,
        key_env: Option<String>,
    ) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();
        Self {
            name: name.to_ascii_lowercase(),
            base_url,
            key_env: key_env.unwrap_or_else(|| DEFAULT_KEY_ENV.into()),
            client: reqwest::Client::new(),
        }
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.key_env).map_err(|_| {
            Error::Config(format!(
                "missing API key: set {} in the environment or MEGACHAT/.env",
                self.key_env
            ))
        })
    }

    fn build_chat_body(&self, req: &ChatRequest) -> Value {
        let mut messages: Vec<Value> = Vec::new();
        if !req.system_text.is_empty() {
            messages.push(serde_json::json!({"role": "system", "content": req.system_text}));
        }
        if !req.developer_text.is_empty() {
            messages.push(serde_json::json!({"role": "developer", "content": req.developer_text}));
        }
        for m in &req.messages {
            messages.push(serde_json::json!({"role": m.role, "content": m.text}));
        }

        let mut body = serde_json::json!({
            "model": req.model,
            "messages": messages,
            "stream": true,
            "stream_options": {"include_usage": true},
        });
        if req.max_output_tokens > 0 {
            body["max_completion_tokens"] = serde_json::json!(req.max_output_tokens);
        }
        if req.text_format == "json" {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        if !req.effort.is_empty() {
            body["reasoning_effort"] = Value::String(req.effort.clone());
        }
        if !req.verbosity.is_empty() {
            body["verbosity"] = Value::String(req.verbosity.clone());
        }
        body
    }
}

/// Parse one chat-completions SSE payload into stream events.
///
/// `started` carries the has-Start-been-emitted flag across payloads.
fn parse_chat_payload(payload: &str, started: &mut bool) -> Vec<Result<StreamEvent>> {
    if payload == "[DONE]" {
        return vec![Ok(StreamEvent::Done {
            text: None,
            finish_reason: None,
        })];
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            return vec![Ok(StreamEvent::Error {
                message: format!("malformed stream payload: {e}"),
            })];
        }
    };

    let mut events = Vec::new();
    if !*started {
        *started = true;
        events.push(Ok(StreamEvent::Start {
            request_id: value.get("id").and_then(Value::as_str).map(String::from),
        }));
    }

    if let Some(delta) = value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
    {
        if !delta.is_empty() {
            events.push(Ok(StreamEvent::Delta {
                text: delta.to_string(),
            }));
        }
    }

    if let Some(usage) = value.get("usage").filter(|u| !u.is_null()) {
        let input = usage
            .get("prompt_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let output = usage
            .get("completion_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let total = usage
            .get("total_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(input + output);
        events.push(Ok(StreamEvent::Usage(TokenUsage {
            input_tokens: input,
            output_tokens: output,
            total_tokens: total,
            approximate: false,
        })));
    }

    if let Some(reason) = value
        .pointer("/choices/0/finish_reason")
        .and_then(Value::as_str)
    {
        events.push(Ok(StreamEvent::Done {
            text: None,
            finish_reason: Some(reason.to_string()),
        }));
    }

    events
}

#[async_trait::async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn network_hosts(&self) -> Vec<String> {
        host_of(&self.base_url).into_iter().collect()
    }

    async fn verify(&self, timeout: Duration) -> Result<VerifyResult> {
        let key = self.api_key()?;
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(key)
            .timeout(timeout)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            let count = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("data").and_then(Value::as_array).map(Vec::len));
            Ok(VerifyResult {
                provider: self.name.clone(),
                ok: true,
                message: match count {
                    Some(n) => format!("credentials accepted, {n} models visible"),
                    None => "credentials accepted".into(),
                },
            })
        } else {
            Ok(VerifyResult {
                provider: self.name.clone(),
                ok: false,
                message: format!("{} from {}/v1/models", status, self.base_url),
            })
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let key = self.api_key()?;
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(key)
            .timeout(LIST_MODELS_TIMEOUT)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.name.clone(),
                message: format!("{status} listing models"),
            });
        }

        let value: Value = response.json().await.map_err(from_reqwest)?;
        let mut models: Vec<ModelInfo> = value
            .get("data")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        Some(ModelInfo {
                            id: item.get("id")?.as_str()?.to_string(),
                            owned_by: item
                                .get("owned_by")
                                .and_then(Value::as_str)
                                .map(String::from),
                            created: item.get("created").and_then(Value::as_i64),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(models)
    }

    async fn stream_chat(&self, req: ChatRequest) -> Result<EventStream> {
        let key = self.api_key()?;
        let body = self.build_chat_body(&req);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider {
                provider: self.name.clone(),
                message: format!("{status}: {}", detail.trim()),
            });
        }

        let mut started = false;
        Ok(event_stream(response, move |payload| {
            parse_chat_payload(payload, &mut started)
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
