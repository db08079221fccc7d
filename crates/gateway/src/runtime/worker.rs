//! The detached turn worker.
//!
//! One worker per `RunAsync` call, independent of the caller's request
//! lifetime. It resolves the effective settings, gates the provider
//! through the network policy, streams the reply — overwriting the
//! partial file per delta and probing for cancellation — and then runs
//! exactly one of the success / canceled / failed finalization
//! sequences.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::StreamExt;

use mc_domain::stream::StreamEvent;
use mc_domain::{Error, NetworkPolicy, Result, Settings, TokenUsage};
use mc_providers::{ChatMessage, ChatRequest, ProviderRegistry};
use mc_store::{RunMeta, RunStore, SettingsStore, TranscriptEvent, TurnMetrics};

use crate::jobs::{JobQueue, JobStatus, JobUpdate};

use super::cancel::CancelToken;
use super::resolve::resolve_effective;
use super::tokens;

/// How much history a turn replays to the provider.
const TRANSCRIPT_WINDOW: usize = 2000;

pub(crate) struct WorkerCtx {
    pub store: Arc<RunStore>,
    pub registry: Arc<ProviderRegistry>,
    pub jobs: Arc<JobQueue>,
    pub policy: NetworkPolicy,
    pub run_name: String,
    pub turn: u64,
    pub job_id: String,
}

/// Everything captured while a turn runs, for metrics and finalization.
struct TurnState {
    started: DateTime<Utc>,
    first_byte_at: Option<DateTime<Utc>>,
    usage_provider: Option<TokenUsage>,
    request_id: Option<String>,
    snapshot: Settings,
    provider_name: String,
    model: String,
    messages: Vec<ChatMessage>,
}

enum Outcome {
    Success { text: String },
    Canceled,
}

pub(crate) async fn run_turn_worker(ctx: WorkerCtx) {
    let mut state = TurnState {
        started: Utc::now(),
        first_byte_at: None,
        usage_provider: None,
        request_id: None,
        snapshot: Settings::coded_defaults(),
        provider_name: String::new(),
        model: String::new(),
        messages: Vec::new(),
    };

    let meta = match ctx.store.read_meta(&ctx.run_name) {
        Ok(meta) => meta,
        Err(e) => {
            tracing::error!(run_name = %ctx.run_name, error = %e, "worker could not read meta");
            let _ = ctx.jobs.update(
                &ctx.job_id,
                JobUpdate {
                    status: Some(JobStatus::Error),
                    percent: Some(100),
                    message: Some("error".into()),
                    error: Some(e.to_string()),
                },
            );
            return;
        }
    };

    match prepare_and_stream(&ctx, &meta, &mut state).await {
        Ok(Outcome::Success { text }) => {
            if let Err(e) = finalize_success(&ctx, &state, &text) {
                tracing::error!(run_name = %ctx.run_name, turn = ctx.turn, error = %e, "final commit failed");
                update_meta_best_effort(&ctx, |meta, ts| {
                    meta.touch(ts);
                    meta.last_error = e.to_string();
                });
                let _ = ctx.jobs.update(
                    &ctx.job_id,
                    JobUpdate {
                        status: Some(JobStatus::Error),
                        percent: Some(100),
                        message: Some("error".into()),
                        error: Some(e.to_string()),
                    },
                );
            }
        }
        Ok(Outcome::Canceled) => finalize_canceled(&ctx, &state),
        Err(e) => finalize_failed(&ctx, &state, &e.to_string()),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn prepare_and_stream(
    ctx: &WorkerCtx,
    meta: &RunMeta,
    state: &mut TurnState,
) -> Result<Outcome> {
    let layout = ctx.store.layout();
    let (global, global_found) = SettingsStore::global(layout).read()?;
    let (per_run, per_run_found) = SettingsStore::for_run(layout, &ctx.run_name).read()?;

    let default_name = ctx.registry.default().name().to_string();
    let resolved = resolve_effective(
        global_found.then_some(&global),
        meta,
        per_run_found.then_some(&per_run),
        &default_name,
    );
    state.snapshot = resolved.effective.clone();
    state.provider_name = resolved.provider_name.clone();
    state.model = resolved.model.clone();

    let provider = ctx.registry.get(&resolved.provider_name)?;
    ctx.policy
        .ensure_hosts_allowed(provider.name(), &provider.network_hosts())?;

    let events = ctx
        .store
        .read_transcript_tail(&ctx.run_name, TRANSCRIPT_WINDOW)?;
    state.messages = events
        .into_iter()
        .filter(|e| !e.text.is_empty())
        .map(|e| ChatMessage {
            role: normalize_role(&e.role),
            text: e.text,
        })
        .collect();

    let request = ChatRequest {
        model: resolved.model,
        system_text: resolved.system_text,
        developer_text: resolved.developer_text,
        messages: state.messages.clone(),
        text_format: state.snapshot.text_format.clone(),
        verbosity: state.snapshot.verbosity.clone(),
        effort: state.snapshot.effort.clone(),
        summary_auto: state.snapshot.summary_auto,
        max_output_tokens: state.snapshot.max_output_tokens,
        tools: state.snapshot.tools,
    };

    tracing::debug!(
        run_name = %ctx.run_name,
        turn = ctx.turn,
        provider = %state.provider_name,
        model = %state.model,
        "streaming turn"
    );

    let cancel = CancelToken::new();
    let mut stream = provider.stream_chat(request).await?;

    let mut buffer = String::new();
    let mut done_text: Option<String> = None;
    let mut stream_error: Option<String> = None;

    while let Some(event) = stream.next().await {
        match event {
            Ok(StreamEvent::Start { request_id }) => {
                if request_id.is_some() {
                    state.request_id = request_id;
                }
            }
            Ok(StreamEvent::Delta { text }) => {
                if cancel.is_cancelled() || ctx.jobs.is_canceled(&ctx.job_id) {
                    // Returning drops the stream, aborting the request.
                    cancel.cancel();
                    return Ok(Outcome::Canceled);
                }
                if state.first_byte_at.is_none() {
                    state.first_byte_at = Some(Utc::now());
                }
                buffer.push_str(&text);
                // Best-effort: a failed partial write never fails the turn.
                if let Err(e) =
                    ctx.store
                        .write_assistant_partial_text(&ctx.run_name, ctx.turn, &buffer)
                {
                    tracing::warn!(run_name = %ctx.run_name, turn = ctx.turn, error = %e, "partial write failed");
                }
                let _ = ctx.jobs.update(
                    &ctx.job_id,
                    JobUpdate {
                        status: Some(JobStatus::Running),
                        percent: Some(50),
                        message: Some("streaming".into()),
                        ..Default::default()
                    },
                );
            }
            Ok(StreamEvent::Usage(usage)) => state.usage_provider = Some(usage),
            Ok(StreamEvent::Done { text, .. }) => {
                if done_text.is_none() {
                    done_text = text;
                }
            }
            // Recorded, not finalized: the post-stream sequencing below
            // decides, and a cancel that raced in still wins.
            Ok(StreamEvent::Error { message }) => stream_error = Some(message),
            Err(e) => {
                stream_error = Some(e.to_string());
                break;
            }
        }
    }

    if ctx.jobs.is_canceled(&ctx.job_id) {
        return Ok(Outcome::Canceled);
    }
    if let Some(message) = stream_error {
        return Err(Error::Provider {
            provider: state.provider_name.clone(),
            message,
        });
    }

    let text = if !buffer.is_empty() {
        buffer
    } else {
        done_text.unwrap_or_default()
    };
    Ok(Outcome::Success { text })
}

fn normalize_role(role: &str) -> String {
    match role {
        "user" | "assistant" | "system" | "developer" => role.to_string(),
        _ => "user".to_string(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Finalization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn finalize_success(ctx: &WorkerCtx, state: &TurnState, text: &str) -> Result<()> {
    let completed = Utc::now();
    let completed_ts = rfc3339(completed);

    ctx.store
        .write_assistant_final_text(&ctx.run_name, ctx.turn, text)?;

    let usage_internal = tokens::internal_usage(
        &state.snapshot.system_text,
        &state.snapshot.developer_text,
        &state.messages,
        text,
    );

    ctx.store.append_transcript_event(
        &ctx.run_name,
        &TranscriptEvent {
            role: "assistant".into(),
            text: text.to_string(),
            ts: completed_ts.clone(),
            turn: ctx.turn,
            provider: Some(state.provider_name.clone()),
            model: Some(state.model.clone()),
            usage_provider: state.usage_provider.clone(),
            usage_internal: Some(usage_internal.clone()),
        },
    )?;

    let metrics = build_metrics(ctx, state, completed, None, Some(usage_internal.clone()));
    ctx.store
        .write_turn_metrics(&ctx.run_name, ctx.turn, &metrics)?;

    let mut meta = ctx.store.read_meta(&ctx.run_name)?;
    meta.touch(&completed_ts);
    meta.bump_turns(ctx.turn);
    meta.bump_messages(2 * ctx.turn);
    meta.last_error = String::new();
    meta.last_usage_provider = state.usage_provider.clone();
    meta.last_usage_internal = Some(usage_internal);
    meta.last_ttfb_ms = metrics.ttfb_ms;
    meta.last_total_ms = Some(metrics.total_ms);
    ctx.store.write_meta(&meta)?;

    let _ = ctx.jobs.update(
        &ctx.job_id,
        JobUpdate {
            status: Some(JobStatus::Done),
            percent: Some(100),
            message: Some("done".into()),
            ..Default::default()
        },
    );
    tracing::info!(run_name = %ctx.run_name, turn = ctx.turn, total_ms = metrics.total_ms, "turn done");
    Ok(())
}

fn finalize_canceled(ctx: &WorkerCtx, state: &TurnState) {
    let completed = Utc::now();
    let metrics = build_metrics(ctx, state, completed, Some("canceled".into()), None);
    if let Err(e) = ctx.store.write_turn_metrics(&ctx.run_name, ctx.turn, &metrics) {
        tracing::warn!(run_name = %ctx.run_name, turn = ctx.turn, error = %e, "metrics write failed");
    }

    update_meta_best_effort(ctx, |meta, ts| {
        meta.touch(ts);
        meta.bump_messages(2 * ctx.turn - 1);
        meta.last_error = "canceled".into();
    });

    // Usually already canceled via the queue; this covers a cancel
    // derived from the request context alone.
    let _ = ctx.jobs.cancel(&ctx.job_id);
    tracing::info!(run_name = %ctx.run_name, turn = ctx.turn, "turn canceled");
}

fn finalize_failed(ctx: &WorkerCtx, state: &TurnState, message: &str) {
    let completed = Utc::now();
    let metrics = build_metrics(ctx, state, completed, Some(message.to_string()), None);
    if let Err(e) = ctx.store.write_turn_metrics(&ctx.run_name, ctx.turn, &metrics) {
        tracing::warn!(run_name = %ctx.run_name, turn = ctx.turn, error = %e, "metrics write failed");
    }

    update_meta_best_effort(ctx, |meta, ts| {
        meta.touch(ts);
        meta.bump_messages(2 * ctx.turn - 1);
        meta.last_error = message.to_string();
    });

    let _ = ctx.jobs.update(
        &ctx.job_id,
        JobUpdate {
            status: Some(JobStatus::Error),
            percent: Some(100),
            message: Some("error".into()),
            error: Some(message.to_string()),
        },
    );
    tracing::warn!(run_name = %ctx.run_name, turn = ctx.turn, error = message, "turn failed");
}

fn build_metrics(
    ctx: &WorkerCtx,
    state: &TurnState,
    completed: DateTime<Utc>,
    error: Option<String>,
    usage_internal: Option<TokenUsage>,
) -> TurnMetrics {
    let ttfb_ms = state
        .first_byte_at
        .map(|t| duration_ms(state.started, t));
    TurnMetrics {
        run_name: ctx.run_name.clone(),
        turn: ctx.turn,
        provider: state.provider_name.clone(),
        model: state.model.clone(),
        started_ts: rfc3339(state.started),
        first_byte_ts: state.first_byte_at.map(rfc3339),
        completed_ts: rfc3339(completed),
        ttfb_ms,
        total_ms: duration_ms(state.started, completed),
        usage_provider: state.usage_provider.clone(),
        usage_internal,
        provider_request_id: state.request_id.clone(),
        settings: state.snapshot.clone(),
        error,
    }
}

fn update_meta_best_effort(ctx: &WorkerCtx, apply: impl FnOnce(&mut RunMeta, &str)) {
    let ts = rfc3339(Utc::now());
    match ctx.store.read_meta(&ctx.run_name) {
        Ok(mut meta) => {
            apply(&mut meta, &ts);
            if let Err(e) = ctx.store.write_meta(&meta) {
                tracing::warn!(run_name = %ctx.run_name, error = %e, "meta write failed");
            }
        }
        Err(e) => {
            tracing::warn!(run_name = %ctx.run_name, error = %e, "meta read failed");
        }
    }
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn duration_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    to.signed_duration_since(from).num_milliseconds().max(0) as u64
}
