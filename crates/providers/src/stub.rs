//! Local deterministic stub provider.
//!
//! No network, no credentials: echoes the latest user message back in
//! fixed-size chunks so the full streaming path (deltas, usage, partial
//! files, cancellation) can be exercised offline.

use std::time::Duration;

use mc_domain::stream::{StreamEvent, TokenUsage};
use mc_domain::Result;

use crate::traits::{ChatRequest, EventStream, ModelInfo, Provider, VerifyResult};

const DELTA_CHUNK_CHARS: usize = 24;

pub struct StubProvider;

impl StubProvider {
    pub fn new() -> Self {
        Self
    }

    fn reply_for(req: &ChatRequest) -> String {
        let last_user = req
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.text.as_str())
            .unwrap_or("");
        format!("Stub assistant reply (provider not wired yet).\n\nYou said:\n{last_user}")
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    fn network_hosts(&self) -> Vec<String> {
        Vec::new()
    }

    async fn verify(&self, _timeout: Duration) -> Result<VerifyResult> {
        Ok(VerifyResult {
            provider: "stub".into(),
            ok: true,
            message: "local stub, no network required".into(),
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![
            ModelInfo {
                id: "stub-echo".into(),
                owned_by: Some("local".into()),
                created: None,
            },
            ModelInfo {
                id: "stub-echo-mini".into(),
                owned_by: Some("local".into()),
                created: None,
            },
        ])
    }

    async fn stream_chat(&self, req: ChatRequest) -> Result<EventStream> {
        let reply = Self::reply_for(&req);
        let input_chars: usize = req.messages.iter().map(|m| m.text.chars().count()).sum();

        let stream = async_stream::stream! {
            yield Ok(StreamEvent::Start {
                request_id: Some(format!("stub-{}", uuid::Uuid::new_v4().simple())),
            });

            let chars: Vec<char> = reply.chars().collect();
            for chunk in chars.chunks(DELTA_CHUNK_CHARS) {
                yield Ok(StreamEvent::Delta {
                    text: chunk.iter().collect(),
                });
            }

            yield Ok(StreamEvent::Usage(TokenUsage {
                input_tokens: (input_chars / 4) as u64,
                output_tokens: (chars.len() / 4) as u64,
                total_tokens: ((input_chars + chars.len()) / 4) as u64,
                approximate: true,
            }));

            yield Ok(StreamEvent::Done {
                text: None,
                finish_reason: Some("stop".into()),
            });
        };

        Ok(Box::pin(stream))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ChatMessage;
    use futures_util::StreamExt;

    fn request_with(messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: "stub-echo".into(),
            messages,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn deltas_reassemble_into_the_echo_reply() {
        let stub = StubProvider::new();
        let req = request_with(vec![ChatMessage {
            role: "user".into(),
            text: "hi".into(),
        }]);

        let mut stream = stub.stream_chat(req).await.unwrap();
        let mut text = String::new();
        let mut saw_usage = false;
        let mut saw_done = false;
        while let Some(ev) = stream.next().await {
            match ev.unwrap() {
                StreamEvent::Delta { text: t } => text.push_str(&t),
                StreamEvent::Usage(u) => {
                    saw_usage = true;
                    assert!(u.approximate);
                }
                StreamEvent::Done { .. } => saw_done = true,
                StreamEvent::Start { request_id } => {
                    assert!(request_id.unwrap().starts_with("stub-"));
                }
                StreamEvent::Error { message } => panic!("unexpected error: {message}"),
            }
        }
        assert_eq!(
            text,
            "Stub assistant reply (provider not wired yet).\n\nYou said:\nhi"
        );
        assert!(saw_usage);
        assert!(saw_done);
    }

    #[tokio::test]
    async fn uses_latest_user_message() {
        let stub = StubProvider::new();
        let req = request_with(vec![
            ChatMessage {
                role: "user".into(),
                text: "first".into(),
            },
            ChatMessage {
                role: "assistant".into(),
                text: "reply".into(),
            },
            ChatMessage {
                role: "user".into(),
                text: "second".into(),
            },
        ]);
        assert!(StubProvider::reply_for(&req).ends_with("You said:\nsecond"));
    }

    #[tokio::test]
    async fn verify_always_ok_and_hostless() {
        let stub = StubProvider::new();
        assert!(stub.network_hosts().is_empty());
        let result = stub.verify(Duration::from_secs(1)).await.unwrap();
        assert!(result.ok);
    }
}
