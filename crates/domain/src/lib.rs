//! Shared domain types for the megachat service.
//!
//! Everything here is provider- and transport-agnostic: the error type,
//! the non-secret settings model, the network policy, and the streaming
//! event contract that providers emit and the turn engine consumes.

pub mod error;
pub mod policy;
pub mod settings;
pub mod stream;

pub use error::{Error, Result};
pub use policy::NetworkPolicy;
pub use settings::{Settings, ToolsConfig};
pub use stream::{BoxStream, StreamEvent, TokenUsage};

use chrono::{SecondsFormat, Utc};

/// Current UTC time as RFC3339 with nanosecond precision.
///
/// All persisted timestamps (meta, transcript events, turn metrics) use
/// this format so lexical ordering matches chronological ordering.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}
