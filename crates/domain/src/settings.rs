//! Non-secret conversation settings.
//!
//! Stored as JSON at the global level (`MEGACHAT/settings.json`) and per
//! run (`runs/<run>/settings.json`). Secrets (API keys) never live here;
//! providers read them from the process environment.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const TEXT_FORMATS: &[&str] = &["text", "markdown", "json"];
pub const VERBOSITY_LEVELS: &[&str] = &["low", "medium", "high"];
pub const EFFORT_LEVELS: &[&str] = &["minimal", "low", "medium", "high"];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool flags
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub web_search: bool,
    #[serde(default)]
    pub code_interpreter: bool,
    #[serde(default)]
    pub file_search: bool,
    #[serde(default)]
    pub image_generation: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A settings snapshot. Empty strings and zero numerics mean "unset"
/// for layering purposes; booleans always carry a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub system_text: String,
    #[serde(default)]
    pub developer_text: String,
    /// One of `text`, `markdown`, `json`.
    #[serde(default)]
    pub text_format: String,
    /// One of `low`, `medium`, `high`.
    #[serde(default)]
    pub verbosity: String,
    /// One of `minimal`, `low`, `medium`, `high`.
    #[serde(default)]
    pub effort: String,
    #[serde(default = "default_true")]
    pub summary_auto: bool,
    #[serde(default)]
    pub max_output_tokens: u64,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub updated_ts: String,
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// The coded defaults: the bottom layer of every resolution.
    pub fn coded_defaults() -> Self {
        Self {
            provider: String::new(),
            model: String::new(),
            system_text: String::new(),
            developer_text: String::new(),
            text_format: "text".into(),
            verbosity: "high".into(),
            effort: "high".into(),
            summary_auto: true,
            max_output_tokens: 999_999,
            tools: ToolsConfig::default(),
            updated_ts: String::new(),
        }
    }

    /// Reject unknown enum values. Empty strings pass (they mean "unset").
    pub fn validate(&self) -> Result<()> {
        check_enum("text_format", &self.text_format, TEXT_FORMATS)?;
        check_enum("verbosity", &self.verbosity, VERBOSITY_LEVELS)?;
        check_enum("effort", &self.effort, EFFORT_LEVELS)?;
        Ok(())
    }
}

fn check_enum(field: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if value.is_empty() || allowed.contains(&value) {
        return Ok(());
    }
    Err(Error::Validation(format!(
        "unknown {field} {value:?} (expected one of {})",
        allowed.join("|")
    )))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coded_defaults_shape() {
        let s = Settings::coded_defaults();
        assert_eq!(s.text_format, "text");
        assert_eq!(s.verbosity, "high");
        assert_eq!(s.effort, "high");
        assert_eq!(s.max_output_tokens, 999_999);
        assert!(s.summary_auto);
        assert!(!s.tools.web_search);
        assert!(s.provider.is_empty());
    }

    #[test]
    fn validate_accepts_empty_and_known() {
        let mut s = Settings::default();
        assert!(s.validate().is_ok());
        s.text_format = "markdown".into();
        s.verbosity = "low".into();
        s.effort = "minimal".into();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_enum() {
        let mut s = Settings::default();
        s.effort = "extreme".into();
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("effort"));
    }

    #[test]
    fn deserialize_fills_defaults() {
        let s: Settings = serde_json::from_str("{}").unwrap();
        assert!(s.summary_auto);
        assert_eq!(s.max_output_tokens, 0);
        assert!(s.text_format.is_empty());
    }

    #[test]
    fn roundtrip_is_identity() {
        let mut s = Settings::coded_defaults();
        s.provider = "openai".into();
        s.model = "gpt-5".into();
        s.tools.web_search = true;
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
