//! TTL-bounded in-memory cache of provider model lists.
//!
//! Keyed by normalized provider name. The cache only stores; freshness
//! is judged by the caller against `cached_at` with a per-call TTL.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::registry::normalize;
use crate::traits::ModelInfo;

pub const DEFAULT_TTL_SECS: i64 = 300;
pub const MIN_TTL_SECS: i64 = 5;
pub const MAX_TTL_SECS: i64 = 3600;

/// A cached model list with its capture time.
#[derive(Debug, Clone)]
pub struct CachedModels {
    pub models: Vec<ModelInfo>,
    pub cached_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ModelCache {
    inner: Mutex<HashMap<String, CachedModels>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the entry for `provider`, if any.
    pub fn get(&self, provider: &str) -> Option<CachedModels> {
        self.inner.lock().get(&normalize(provider)).cloned()
    }

    /// Store a copy sorted by model id, stamped now.
    pub fn put(&self, provider: &str, models: &[ModelInfo]) {
        let mut sorted = models.to_vec();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        self.inner.lock().insert(
            normalize(provider),
            CachedModels {
                models: sorted,
                cached_at: Utc::now(),
            },
        );
    }

    pub fn clear(&self, provider: &str) {
        self.inner.lock().remove(&normalize(provider));
    }

    pub fn clear_all(&self) {
        self.inner.lock().clear();
    }
}

/// Clamp a caller-supplied TTL: non-positive means the default 300 s,
/// anything else lands in [5 s, 3600 s].
pub fn clamp_ttl(secs: i64) -> Duration {
    let secs = if secs <= 0 {
        DEFAULT_TTL_SECS
    } else {
        secs.clamp(MIN_TTL_SECS, MAX_TTL_SECS)
    };
    Duration::from_secs(secs as u64)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str) -> ModelInfo {
        ModelInfo {
            id: id.into(),
            owned_by: None,
            created: None,
        }
    }

    #[test]
    fn put_sorts_and_get_copies() {
        let cache = ModelCache::new();
        cache.put("openai", &[model("z"), model("a"), model("m")]);

        let entry = cache.get("openai").unwrap();
        let ids: Vec<&str> = entry.models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
    }

    #[test]
    fn keys_are_normalized() {
        let cache = ModelCache::new();
        cache.put("  OpenAI ", &[model("a")]);
        assert!(cache.get("openai").is_some());
        assert!(cache.get("OPENAI").is_some());
    }

    #[test]
    fn clear_and_clear_all() {
        let cache = ModelCache::new();
        cache.put("openai", &[model("a")]);
        cache.put("stub", &[model("b")]);

        cache.clear("openai");
        assert!(cache.get("openai").is_none());
        assert!(cache.get("stub").is_some());

        cache.clear_all();
        assert!(cache.get("stub").is_none());
    }

    #[test]
    fn ttl_clamping() {
        assert_eq!(clamp_ttl(0), Duration::from_secs(300));
        assert_eq!(clamp_ttl(-10), Duration::from_secs(300));
        assert_eq!(clamp_ttl(1), Duration::from_secs(5));
        assert_eq!(clamp_ttl(60), Duration::from_secs(60));
        assert_eq!(clamp_ttl(999_999), Duration::from_secs(3600));
    }
}
