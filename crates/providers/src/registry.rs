//! Provider registry.
//!
//! Holds the configured provider instances keyed by their stable
//! lowercase names. Lookup trims and lowercases; the empty name resolves
//! to the default, which always exists (the local stub backstops it).

use std::collections::HashMap;
use std::sync::Arc;

use mc_domain::{Error, Result};

use crate::openai::OpenAiProvider;
use crate::stub::StubProvider;
use crate::traits::Provider;

pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_name: String,
}

impl ProviderRegistry {
    /// Registry with the built-in providers: the local stub and the
    /// OpenAI adapter. Default is `openai`.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
            default_name: "openai".into(),
        };
        registry.register(Arc::new(StubProvider::new()));
        registry.register(Arc::new(OpenAiProvider::new(None)));
        registry
    }

    /// Empty registry (aside from the stub backstop) for tests and
    /// embedding; `default_name` is resolved at lookup time.
    pub fn with_stub_only() -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
            default_name: "stub".into(),
        };
        registry.register(Arc::new(StubProvider::new()));
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let name = normalize(provider.name());
        tracing::info!(provider = %name, "registered provider");
        self.providers.insert(name, provider);
    }

    pub fn set_default(&mut self, name: &str) {
        self.default_name = normalize(name);
    }

    /// Resolve a provider by name. Empty resolves to the default.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>> {
        let name = normalize(name);
        if name.is_empty() {
            return Ok(self.default());
        }
        self.providers
            .get(&name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("provider {name}")))
    }

    /// The default provider. Never absent: falls back to the stub.
    pub fn default(&self) -> Arc<dyn Provider> {
        if let Some(p) = self.providers.get(&self.default_name) {
            return p.clone();
        }
        self.providers
            .get("stub")
            .cloned()
            .unwrap_or_else(|| Arc::new(StubProvider::new()))
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

pub(crate) fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_trimmed_and_lowercased() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(registry.get("  OpenAI ").unwrap().name(), "openai");
        assert_eq!(registry.get("STUB").unwrap().name(), "stub");
    }

    #[test]
    fn empty_name_resolves_to_default() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(registry.get("").unwrap().name(), "openai");
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = ProviderRegistry::with_defaults();
        match registry.get("nonesuch") {
            Err(Error::NotFound(msg)) => assert!(msg.contains("nonesuch")),
            Ok(p) => panic!("expected NotFound, got Ok({})", p.name()),
            Err(other) => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn default_falls_back_to_stub() {
        let mut registry = ProviderRegistry::with_stub_only();
        registry.set_default("missing");
        assert_eq!(registry.default().name(), "stub");
    }

    #[test]
    fn names_are_sorted() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["openai".to_string(), "stub".to_string()]);
    }
}
