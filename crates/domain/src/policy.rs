//! Network policy gating for provider calls.
//!
//! Providers advertise the hosts they talk to; before any network-using
//! operation (verify, list models, stream chat) the caller checks every
//! host against this policy. Local-only providers advertise no hosts and
//! always pass.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The pair `(net_enabled, allow_domains)` captured at submit time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkPolicy {
    pub net_enabled: bool,
    /// Allowed domains. Empty means "any host" when net is enabled.
    #[serde(default)]
    pub allow_domains: Vec<String>,
}

impl NetworkPolicy {
    pub fn new(net_enabled: bool, allow_domains: Vec<String>) -> Self {
        Self {
            net_enabled,
            allow_domains,
        }
    }

    /// A host matches an allowlist entry when it equals the entry or is
    /// a subdomain of it.
    pub fn host_allowed(&self, host: &str) -> bool {
        if !self.net_enabled {
            return false;
        }
        if self.allow_domains.is_empty() {
            return true;
        }
        let host = host.trim().to_ascii_lowercase();
        self.allow_domains.iter().any(|d| {
            let d = d.trim().to_ascii_lowercase();
            !d.is_empty() && (host == d || host.ends_with(&format!(".{d}")))
        })
    }

    /// Check every host a provider needs. Providers with no hosts are
    /// always allowed.
    pub fn ensure_hosts_allowed(&self, provider: &str, hosts: &[String]) -> Result<()> {
        for host in hosts {
            if !self.net_enabled {
                return Err(Error::Policy(format!(
                    "network disabled; provider {provider} requires host {host}"
                )));
            }
            if !self.host_allowed(host) {
                return Err(Error::Policy(format!(
                    "host {host} not in allowlist for provider {provider}"
                )));
            }
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_disabled_denies_all_hosts() {
        let p = NetworkPolicy::new(false, vec![]);
        assert!(!p.host_allowed("api.openai.com"));
        assert!(p
            .ensure_hosts_allowed("openai", &["api.openai.com".into()])
            .is_err());
    }

    #[test]
    fn net_disabled_allows_hostless_provider() {
        let p = NetworkPolicy::new(false, vec![]);
        assert!(p.ensure_hosts_allowed("stub", &[]).is_ok());
    }

    #[test]
    fn empty_allowlist_allows_any_host() {
        let p = NetworkPolicy::new(true, vec![]);
        assert!(p.host_allowed("api.openai.com"));
        assert!(p.host_allowed("example.com"));
    }

    #[test]
    fn exact_and_subdomain_match() {
        let p = NetworkPolicy::new(true, vec!["openai.com".into()]);
        assert!(p.host_allowed("openai.com"));
        assert!(p.host_allowed("api.openai.com"));
        assert!(!p.host_allowed("notopenai.com"));
        assert!(!p.host_allowed("openai.com.evil.net"));
    }

    #[test]
    fn mismatched_allowlist_denies() {
        let p = NetworkPolicy::new(true, vec!["example.com".into()]);
        let err = p
            .ensure_hosts_allowed("openai", &["api.openai.com".into()])
            .unwrap_err();
        assert!(err.to_string().contains("allowlist"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let p = NetworkPolicy::new(true, vec!["API.OpenAI.com".into()]);
        assert!(p.host_allowed("api.openai.com"));
    }
}
