//! The turn engine's public surface.
//!
//! Everything the HTTP layer (or any other caller) touches goes through
//! [`ChatEngine`]: run creation and listing, settings, async turns,
//! job inspection, and policy-gated provider operations. The engine
//! holds no per-turn state of its own — runs live in the store, jobs in
//! the queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use mc_domain::{now_rfc3339, Error, NetworkPolicy, Result, Settings};
use mc_providers::cache::clamp_ttl;
use mc_providers::{ModelCache, ModelInfo, ProviderRegistry, VerifyResult};
use mc_store::{
    envfile, layout, RunArgs, RunMeta, RunStore, SettingsStore, TranscriptEvent,
};

use crate::jobs::{Job, JobQueue, JobStatus, JobUpdate};

use super::worker::{run_turn_worker, WorkerCtx};

pub const DEFAULT_TITLE: &str = "Untitled Conversation";
pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-5";

const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 20;
const DEFAULT_LIST_MODELS_TIMEOUT_SECS: u64 = 25;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / response shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRunRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, alias = "systemText")]
    pub system_text: String,
    #[serde(default, alias = "developerText")]
    pub developer_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRunResponse {
    pub run_name: String,
    pub args: RunArgs,
    pub meta: RunMeta,
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSettingsResult {
    pub run_name: String,
    pub settings: Settings,
    pub found: bool,
    /// Which layer answered: `run`, `global`, or `default`.
    pub source: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunAsyncResponse {
    pub job_id: String,
    pub run_name: String,
    pub turn: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsResult {
    pub provider: String,
    pub models: Vec<ModelInfo>,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age_s: Option<i64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ChatEngine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ChatEngine {
    store: Arc<RunStore>,
    registry: Arc<ProviderRegistry>,
    models: Arc<ModelCache>,
    jobs: Arc<JobQueue>,
    policy: NetworkPolicy,
}

impl ChatEngine {
    pub fn new(
        store: Arc<RunStore>,
        registry: Arc<ProviderRegistry>,
        models: Arc<ModelCache>,
        jobs: Arc<JobQueue>,
        policy: NetworkPolicy,
    ) -> Self {
        Self {
            store,
            registry,
            models,
            jobs,
            policy,
        }
    }

    pub fn policy(&self) -> &NetworkPolicy {
        &self.policy
    }

    /// Best-effort `.env` load. Never fatal; warnings are logged.
    pub fn load_env_best_effort(&self) {
        let path = self.store.layout().env_file_path();
        match envfile::load_env_file(&path, false) {
            Ok(report) if !report.loaded.is_empty() => {
                tracing::debug!(keys = report.loaded.len(), "env file applied");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "env file load failed"),
        }
    }

    // ── Runs ─────────────────────────────────────────────────────────

    pub fn new_run(&self, req: NewRunRequest) -> Result<NewRunResponse> {
        self.load_env_best_effort();

        let title = non_empty_or(req.title, DEFAULT_TITLE);
        let provider = non_empty_or(req.provider, DEFAULT_PROVIDER);
        let model = non_empty_or(req.model, DEFAULT_MODEL);

        let run_name = layout::generate_run_name();
        let ts = now_rfc3339();

        let args = RunArgs {
            run_name: run_name.clone(),
            title: title.clone(),
            provider: provider.clone(),
            model: model.clone(),
            system_text: req.system_text.clone(),
            developer_text: req.developer_text.clone(),
            created_ts: ts.clone(),
        };
        let meta = RunMeta {
            run_name: run_name.clone(),
            title,
            provider,
            model,
            system_text: req.system_text,
            developer_text: req.developer_text,
            created_ts: ts.clone(),
            updated_ts: ts,
            ..Default::default()
        };

        self.store.create_run(&args, &meta)?;

        let settings = self.run_settings_lookup(&run_name)?.settings;
        Ok(NewRunResponse {
            run_name,
            args,
            meta,
            settings,
        })
    }

    pub fn list_runs(&self, limit: usize) -> Result<Vec<RunMeta>> {
        self.store.list_runs(limit)
    }

    pub fn get_run(&self, run_name: &str, tail: usize) -> Result<(RunMeta, Vec<TranscriptEvent>)> {
        validate_run_name(run_name)?;
        let meta = self.store.read_meta(run_name)?;
        let events = self.store.read_transcript_tail(run_name, tail)?;
        Ok((meta, events))
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn config_get(&self) -> Result<(Settings, bool)> {
        self.load_env_best_effort();
        SettingsStore::global(self.store.layout()).read()
    }

    /// Write the posted snapshot wholesale, restamping `updated_ts`.
    pub fn config_set(&self, settings: Settings) -> Result<Settings> {
        settings.validate()?;
        let mut snapshot = settings;
        snapshot.updated_ts = String::new();
        SettingsStore::global(self.store.layout()).write(&snapshot)
    }

    pub fn get_run_settings(&self, run_name: &str) -> Result<RunSettingsResult> {
        validate_run_name(run_name)?;
        self.run_settings_lookup(run_name)
    }

    fn run_settings_lookup(&self, run_name: &str) -> Result<RunSettingsResult> {
        let layout = self.store.layout();
        let (run_settings, run_found) = SettingsStore::for_run(layout, run_name).read()?;
        if run_found {
            return Ok(RunSettingsResult {
                run_name: run_name.into(),
                settings: run_settings,
                found: true,
                source: "run",
            });
        }
        let (global, global_found) = SettingsStore::global(layout).read()?;
        if global_found {
            return Ok(RunSettingsResult {
                run_name: run_name.into(),
                settings: global,
                found: false,
                source: "global",
            });
        }
        Ok(RunSettingsResult {
            run_name: run_name.into(),
            settings: Settings::coded_defaults(),
            found: false,
            source: "default",
        })
    }

    /// Write per-run settings and sync any non-empty identity fields
    /// into meta so listings match what was configured.
    pub fn set_run_settings(&self, run_name: &str, settings: Settings) -> Result<Settings> {
        validate_run_name(run_name)?;
        settings.validate()?;
        let mut meta = self.store.read_meta(run_name)?;

        let mut snapshot = settings;
        snapshot.updated_ts = String::new();
        let written = SettingsStore::for_run(self.store.layout(), run_name).write(&snapshot)?;

        let mut meta_dirty = false;
        for (target, value) in [
            (&mut meta.provider, &written.provider),
            (&mut meta.model, &written.model),
            (&mut meta.system_text, &written.system_text),
            (&mut meta.developer_text, &written.developer_text),
        ] {
            if !value.is_empty() && *target != *value {
                *target = value.clone();
                meta_dirty = true;
            }
        }
        if meta_dirty {
            meta.touch(&now_rfc3339());
            self.store.write_meta(&meta)?;
        }
        Ok(written)
    }

    // ── Async turns ──────────────────────────────────────────────────

    /// Start an asynchronous turn: persist the user side synchronously,
    /// then hand the streaming work to a detached worker.
    pub fn run_async(&self, run_name: &str, message: &str) -> Result<RunAsyncResponse> {
        validate_run_name(run_name)?;
        if message.trim().is_empty() {
            return Err(Error::Validation("message must not be empty".into()));
        }

        // Validates existence before any side effects.
        let mut meta = self.store.read_meta(run_name)?;
        let turn = self.store.next_turn_number(run_name)?;
        let job = self.jobs.create(run_name, turn, None);

        // User side first: clients observing the run see the user turn
        // before the worker produces anything.
        if let Err(e) = self.persist_user_side(run_name, turn, message, &mut meta) {
            let _ = self.jobs.update(
                &job.job_id,
                JobUpdate {
                    status: Some(JobStatus::Error),
                    percent: Some(100),
                    message: Some("error".into()),
                    error: Some(e.to_string()),
                },
            );
            return Err(e);
        }

        let _ = self.jobs.update(
            &job.job_id,
            JobUpdate {
                status: Some(JobStatus::Running),
                percent: Some(1),
                message: Some("running".into()),
                ..Default::default()
            },
        );

        let ctx = WorkerCtx {
            store: self.store.clone(),
            registry: self.registry.clone(),
            jobs: self.jobs.clone(),
            policy: self.policy.clone(),
            run_name: run_name.to_string(),
            turn,
            job_id: job.job_id.clone(),
        };
        tokio::spawn(async move {
            run_turn_worker(ctx).await;
        });

        Ok(RunAsyncResponse {
            job_id: job.job_id,
            run_name: run_name.to_string(),
            turn,
        })
    }

    fn persist_user_side(
        &self,
        run_name: &str,
        turn: u64,
        message: &str,
        meta: &mut RunMeta,
    ) -> Result<()> {
        let ts = now_rfc3339();
        self.store.write_user_turn_text(run_name, turn, message)?;
        self.store.append_transcript_event(
            run_name,
            &TranscriptEvent::user(message.to_string(), ts.clone(), turn),
        )?;
        meta.touch(&ts);
        meta.bump_turns(turn);
        meta.bump_messages(2 * turn - 1);
        meta.last_error = String::new();
        self.store.write_meta(meta)
    }

    // ── Jobs ─────────────────────────────────────────────────────────

    pub fn job_status(&self, job_id: &str) -> Result<Job> {
        self.jobs.get(job_id)
    }

    /// Byte tail of the job's turn output: the final file once it
    /// exists, the partial while streaming.
    pub fn job_tail(&self, job_id: &str, limit: usize) -> Result<String> {
        let job = self.jobs.get(job_id)?;
        self.store.read_turn_tail(&job.run_name, job.turn, limit)
    }

    pub fn cancel_job(&self, job_id: &str) -> Result<Job> {
        self.jobs.cancel(job_id)
    }

    // ── Providers ────────────────────────────────────────────────────

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub async fn verify_provider(
        &self,
        provider: &str,
        timeout_seconds: Option<u64>,
    ) -> Result<VerifyResult> {
        let provider = self.registry.get(provider)?;
        self.policy
            .ensure_hosts_allowed(provider.name(), &provider.network_hosts())?;
        let timeout = Duration::from_secs(timeout_seconds.unwrap_or(DEFAULT_VERIFY_TIMEOUT_SECS));
        provider.verify(timeout).await
    }

    pub async fn list_models(
        &self,
        provider: &str,
        limit: usize,
        timeout_seconds: Option<u64>,
        cache_ttl_seconds: i64,
        no_cache: bool,
    ) -> Result<ModelsResult> {
        let provider = self.registry.get(provider)?;
        let name = provider.name().to_string();
        let ttl = clamp_ttl(cache_ttl_seconds);

        if !no_cache {
            if let Some(entry) = self.models.get(&name) {
                let age = Utc::now()
                    .signed_duration_since(entry.cached_at)
                    .num_seconds();
                if age >= 0 && (age as u64) < ttl.as_secs() {
                    return Ok(ModelsResult {
                        provider: name,
                        models: truncated(entry.models, limit),
                        cached: true,
                        cached_at: Some(
                            entry
                                .cached_at
                                .to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
                        ),
                        cache_age_s: Some(age),
                    });
                }
            }
        }

        self.policy
            .ensure_hosts_allowed(&name, &provider.network_hosts())?;

        let timeout = Duration::from_secs(
            timeout_seconds.unwrap_or(DEFAULT_LIST_MODELS_TIMEOUT_SECS),
        );
        let models = tokio::time::timeout(timeout, provider.list_models())
            .await
            .map_err(|_| Error::Timeout(format!("listing models for {name}")))??;

        self.models.put(&name, &models);
        Ok(ModelsResult {
            provider: name,
            models: truncated(models, limit),
            cached: false,
            cached_at: None,
            cache_age_s: None,
        })
    }

    pub fn clear_model_cache(&self, provider: Option<&str>) {
        match provider {
            Some(p) => self.models.clear(p),
            None => self.models.clear_all(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn validate_run_name(run_name: &str) -> Result<()> {
    if run_name.is_empty() {
        return Err(Error::Validation("run_name must not be empty".into()));
    }
    if !layout::is_valid_run_name(run_name) {
        return Err(Error::Validation(format!("malformed run_name {run_name:?}")));
    }
    Ok(())
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn truncated(mut models: Vec<ModelInfo>, limit: usize) -> Vec<ModelInfo> {
    if limit > 0 && models.len() > limit {
        models.truncate(limit);
    }
    models
}
