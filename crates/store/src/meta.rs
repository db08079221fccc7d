//! Persisted record types: run args, mutable meta, transcript events,
//! and per-turn metrics.

use serde::{Deserialize, Serialize};

use mc_domain::{Settings, TokenUsage};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run args — creation snapshot, written once
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunArgs {
    pub run_name: String,
    pub title: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub system_text: String,
    #[serde(default)]
    pub developer_text: String,
    pub created_ts: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run meta — the authoritative conversation header
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Mutable conversation header. `turns_n`, `messages_n` and `updated_ts`
/// are monotonically non-decreasing; use the helpers below instead of
/// assigning directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_name: String,
    pub title: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub system_text: String,
    #[serde(default)]
    pub developer_text: String,
    pub created_ts: String,
    pub updated_ts: String,
    #[serde(default)]
    pub messages_n: u64,
    #[serde(default)]
    pub turns_n: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_usage_provider: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_usage_internal: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ttfb_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_total_ms: Option<u64>,
    #[serde(default)]
    pub last_error: String,
}

impl RunMeta {
    /// Advance `updated_ts`. RFC3339-nanos timestamps sort lexically, so
    /// the max of the two strings is the later instant.
    pub fn touch(&mut self, ts: &str) {
        if ts > self.updated_ts.as_str() {
            self.updated_ts = ts.to_string();
        }
    }

    pub fn bump_turns(&mut self, turn: u64) {
        self.turns_n = self.turns_n.max(turn);
    }

    pub fn bump_messages(&mut self, n: u64) {
        self.messages_n = self.messages_n.max(n);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transcript event — one JSON line in transcript.jsonl
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEvent {
    /// `user`, `assistant`, `system`, or `developer`.
    pub role: String,
    pub text: String,
    pub ts: String,
    pub turn: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_provider: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_internal: Option<TokenUsage>,
}

impl TranscriptEvent {
    pub fn user(text: String, ts: String, turn: u64) -> Self {
        Self {
            role: "user".into(),
            text,
            ts,
            turn,
            provider: None,
            model: None,
            usage_provider: None,
            usage_internal: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn metrics — turn_NNN.json
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnMetrics {
    pub run_name: String,
    pub turn: u64,
    pub provider: String,
    pub model: String,
    pub started_ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_byte_ts: Option<String>,
    pub completed_ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttfb_ms: Option<u64>,
    pub total_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_provider: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_internal: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_request_id: Option<String>,
    /// The effective settings the turn actually ran with.
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_never_decreases() {
        let mut meta = RunMeta {
            updated_ts: "2025-06-01T10:00:00.000000000Z".into(),
            ..Default::default()
        };
        meta.touch("2025-06-01T09:00:00.000000000Z");
        assert_eq!(meta.updated_ts, "2025-06-01T10:00:00.000000000Z");
        meta.touch("2025-06-01T11:00:00.000000000Z");
        assert_eq!(meta.updated_ts, "2025-06-01T11:00:00.000000000Z");
    }

    #[test]
    fn counters_are_monotonic() {
        let mut meta = RunMeta::default();
        meta.bump_turns(3);
        meta.bump_turns(1);
        assert_eq!(meta.turns_n, 3);
        meta.bump_messages(6);
        meta.bump_messages(5);
        assert_eq!(meta.messages_n, 6);
    }

    #[test]
    fn transcript_event_serializes_without_empty_options() {
        let ev = TranscriptEvent::user("hi".into(), "2025-06-01T10:00:00Z".into(), 1);
        let json = serde_json::to_string(&ev).unwrap();
        assert!(!json.contains("usage_provider"));
        assert!(!json.contains("provider"));
        assert!(json.contains("\"role\":\"user\""));
    }
}
