//! Effective-settings resolution — a pure function.
//!
//! Three layers, field by field: coded defaults, then the global file,
//! then the per-run file. String fields overlay only when non-empty and
//! numerics only when non-zero; booleans (summary_auto, tool flags)
//! overlay wholesale whenever the layer's file exists. On top of the
//! merged view, provider/model/system/developer resolve through their
//! own precedence chains that also consult the run's meta.

use mc_domain::Settings;
use mc_store::RunMeta;

/// The deterministic output of one resolution: everything the worker
/// needs to build a `ChatRequest`, plus the snapshot persisted into the
/// turn's metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub provider_name: String,
    pub model: String,
    pub system_text: String,
    pub developer_text: String,
    /// Fully merged settings with the resolved identity fields filled
    /// in — the immutable per-turn snapshot.
    pub effective: Settings,
}

/// Resolve the effective settings for one turn.
///
/// `global` and `per_run` are `None` when the respective file does not
/// exist. `registry_default` terminates the provider precedence chain.
pub fn resolve_effective(
    global: Option<&Settings>,
    meta: &RunMeta,
    per_run: Option<&Settings>,
    registry_default: &str,
) -> Resolved {
    let mut eff = Settings::coded_defaults();
    if let Some(g) = global {
        overlay(&mut eff, g);
    }
    if let Some(r) = per_run {
        overlay(&mut eff, r);
    }

    // Provider: per-run override → meta → global/effective → registry default.
    let provider_name = first_non_empty(&[
        per_run.map(|r| r.provider.as_str()).unwrap_or(""),
        meta.provider.as_str(),
        eff.provider.as_str(),
        registry_default,
    ]);

    // Model: per-run override → meta → effective.
    let model = first_non_empty(&[
        per_run.map(|r| r.model.as_str()).unwrap_or(""),
        meta.model.as_str(),
        eff.model.as_str(),
    ]);

    let system_text = first_non_empty(&[
        per_run.map(|r| r.system_text.as_str()).unwrap_or(""),
        meta.system_text.as_str(),
        eff.system_text.as_str(),
    ]);

    let developer_text = first_non_empty(&[
        per_run.map(|r| r.developer_text.as_str()).unwrap_or(""),
        meta.developer_text.as_str(),
        eff.developer_text.as_str(),
    ]);

    eff.provider = provider_name.clone();
    eff.model = model.clone();
    eff.system_text = system_text.clone();
    eff.developer_text = developer_text.clone();
    eff.updated_ts = String::new();

    Resolved {
        provider_name,
        model,
        system_text,
        developer_text,
        effective: eff,
    }
}

/// Overlay one settings file onto the accumulator.
fn overlay(eff: &mut Settings, layer: &Settings) {
    overlay_str(&mut eff.provider, &layer.provider);
    overlay_str(&mut eff.model, &layer.model);
    overlay_str(&mut eff.system_text, &layer.system_text);
    overlay_str(&mut eff.developer_text, &layer.developer_text);
    overlay_str(&mut eff.text_format, &layer.text_format);
    overlay_str(&mut eff.verbosity, &layer.verbosity);
    overlay_str(&mut eff.effort, &layer.effort);
    if layer.max_output_tokens != 0 {
        eff.max_output_tokens = layer.max_output_tokens;
    }
    // Booleans have no "unset" sentinel: a present file speaks for them.
    eff.summary_auto = layer.summary_auto;
    eff.tools = layer.tools;
}

fn overlay_str(target: &mut String, value: &str) {
    if !value.is_empty() {
        *target = value.to_string();
    }
}

fn first_non_empty(candidates: &[&str]) -> String {
    candidates
        .iter()
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_with(provider: &str, model: &str) -> RunMeta {
        RunMeta {
            run_name: "20250601_120000Z_chat-deadbeef".into(),
            provider: provider.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_when_nothing_is_configured() {
        let meta = meta_with("", "");
        let r = resolve_effective(None, &meta, None, "openai");
        assert_eq!(r.provider_name, "openai");
        assert_eq!(r.model, "");
        assert_eq!(r.effective.text_format, "text");
        assert_eq!(r.effective.verbosity, "high");
        assert_eq!(r.effective.effort, "high");
        assert_eq!(r.effective.max_output_tokens, 999_999);
        assert!(r.effective.summary_auto);
    }

    #[test]
    fn per_run_override_beats_global_and_meta() {
        // Global: provider=openai, model=gpt-5, effort=low.
        let mut global = Settings::default();
        global.provider = "openai".into();
        global.model = "gpt-5".into();
        global.effort = "low".into();

        let meta = meta_with("openai", "gpt-5");

        // Per-run: model + effort only.
        let mut per_run = Settings::default();
        per_run.model = "gpt-5.2".into();
        per_run.effort = "high".into();

        let r = resolve_effective(Some(&global), &meta, Some(&per_run), "stub");
        assert_eq!(r.provider_name, "openai");
        assert_eq!(r.model, "gpt-5.2");
        assert_eq!(r.effective.effort, "high");
    }

    #[test]
    fn meta_beats_global_for_provider_and_model() {
        let mut global = Settings::default();
        global.provider = "stub".into();
        global.model = "stub-echo".into();

        let meta = meta_with("openai", "gpt-5");
        let r = resolve_effective(Some(&global), &meta, None, "stub");
        assert_eq!(r.provider_name, "openai");
        assert_eq!(r.model, "gpt-5");
    }

    #[test]
    fn global_numeric_zero_does_not_overlay() {
        let mut global = Settings::default();
        global.max_output_tokens = 0;
        let meta = meta_with("", "");
        let r = resolve_effective(Some(&global), &meta, None, "stub");
        assert_eq!(r.effective.max_output_tokens, 999_999);
    }

    #[test]
    fn per_run_behavior_snapshot_applies() {
        let meta = meta_with("openai", "gpt-5");
        let mut per_run = Settings::default();
        per_run.text_format = "text".into(); // equal to the coded default
        per_run.verbosity = "low".into();
        per_run.summary_auto = false;
        per_run.tools.web_search = true;
        per_run.max_output_tokens = 512;

        let mut global = Settings::default();
        global.text_format = "markdown".into();

        let r = resolve_effective(Some(&global), &meta, Some(&per_run), "stub");
        // The per-run snapshot wins even where it matches the default.
        assert_eq!(r.effective.text_format, "text");
        assert_eq!(r.effective.verbosity, "low");
        assert!(!r.effective.summary_auto);
        assert!(r.effective.tools.web_search);
        assert_eq!(r.effective.max_output_tokens, 512);
    }

    #[test]
    fn system_and_developer_precedence() {
        let mut global = Settings::default();
        global.system_text = "global sys".into();

        let mut meta = meta_with("openai", "gpt-5");
        meta.system_text = "meta sys".into();
        meta.developer_text = "meta dev".into();

        let mut per_run = Settings::default();
        per_run.developer_text = "run dev".into();

        let r = resolve_effective(Some(&global), &meta, Some(&per_run), "stub");
        assert_eq!(r.system_text, "meta sys");
        assert_eq!(r.developer_text, "run dev");
    }

    #[test]
    fn resolution_is_deterministic() {
        let mut global = Settings::default();
        global.provider = "openai".into();
        global.effort = "low".into();
        let meta = meta_with("openai", "gpt-5");
        let mut per_run = Settings::default();
        per_run.model = "gpt-5.2".into();

        let a = resolve_effective(Some(&global), &meta, Some(&per_run), "stub");
        let b = resolve_effective(Some(&global), &meta, Some(&per_run), "stub");
        assert_eq!(a, b);
    }
}
