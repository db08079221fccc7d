//! The run store — filesystem persistence for conversations.
//!
//! One directory per run under `MEGACHAT/runs/`. The turn engine is the
//! only writer; readers (listing, tails) rely on rename-atomic JSON
//! writes and append-only transcripts.

use std::fs;
use std::io::Write;
use std::path::Path;

use mc_domain::{Error, Result};

use crate::fsio::{write_json_atomic, write_text_atomic};
use crate::layout::{self, ArtifactLayout};
use crate::meta::{RunArgs, RunMeta, TranscriptEvent, TurnMetrics};

pub const DEFAULT_LIST_LIMIT: usize = 200;
pub const MAX_LIST_LIMIT: usize = 2000;

pub const DEFAULT_TAIL_EVENTS: usize = 200;
pub const MAX_TAIL_EVENTS: usize = 5000;

pub const DEFAULT_TAIL_BYTES: usize = 16_384;
pub const MAX_TAIL_BYTES: usize = 2_000_000;

pub struct RunStore {
    layout: ArtifactLayout,
}

impl RunStore {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    // ── Creation ─────────────────────────────────────────────────────

    /// Create a run directory with its args/meta snapshot, an empty
    /// transcript, and an updated latest-run pointer. Fails if the run
    /// already exists.
    pub fn create_run(&self, args: &RunArgs, meta: &RunMeta) -> Result<()> {
        let run_dir = self.layout.run_dir(&args.run_name);
        fs::create_dir_all(self.layout.runs_dir())?;
        if let Err(e) = fs::create_dir(&run_dir) {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                return Err(Error::Validation(format!(
                    "run {} already exists",
                    args.run_name
                )));
            }
            return Err(e.into());
        }

        write_json_atomic(&self.layout.args_path(&args.run_name), args)?;
        write_json_atomic(&self.layout.meta_path(&args.run_name), meta)?;

        // Transcript must exist (possibly empty) from the start.
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.layout.transcript_path(&args.run_name))?;

        write_text_atomic(&self.layout.latest_pointer_path(), &args.run_name, true)?;

        tracing::info!(run_name = %args.run_name, "run created");
        Ok(())
    }

    // ── Meta ─────────────────────────────────────────────────────────

    pub fn read_meta(&self, run_name: &str) -> Result<RunMeta> {
        let path = self.layout.meta_path(run_name);
        if !self.layout.run_dir(run_name).is_dir() {
            return Err(Error::NotFound(format!("run {run_name}")));
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::NotFound(format!("run {run_name}")),
                _ => Error::Io(e),
            })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_meta(&self, meta: &RunMeta) -> Result<()> {
        write_json_atomic(&self.layout.meta_path(&meta.run_name), meta)
    }

    // ── Listing ──────────────────────────────────────────────────────

    /// List run metas, newest `updated_ts` first (`run_name` desc as
    /// tiebreak), truncated to `limit` (0 → default 200, max 2000).
    /// Names that fail the run-name pattern are ignored.
    pub fn list_runs(&self, limit: usize) -> Result<Vec<RunMeta>> {
        let limit = clamp_limit(limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
        let runs_dir = self.layout.runs_dir();
        if !runs_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut metas = Vec::new();
        for entry in fs::read_dir(&runs_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !layout::is_valid_run_name(&name) || !entry.path().is_dir() {
                continue;
            }
            match self.read_meta(&name) {
                Ok(meta) => metas.push(meta),
                Err(e) => {
                    tracing::warn!(run_name = %name, error = %e, "skipping unreadable run meta");
                }
            }
        }

        metas.sort_by(|a, b| {
            b.updated_ts
                .cmp(&a.updated_ts)
                .then_with(|| b.run_name.cmp(&a.run_name))
        });
        metas.truncate(limit);
        Ok(metas)
    }

    // ── Transcript ───────────────────────────────────────────────────

    /// Append exactly one JSON line. Callers serialize per run.
    pub fn append_transcript_event(&self, run_name: &str, event: &TranscriptEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.layout.transcript_path(run_name))?;
        writeln!(file, "{json}")?;
        Ok(())
    }

    /// Last `limit` events (0 → default 200, max 5000). A truncated
    /// final line — a concurrent append in progress — is skipped rather
    /// than surfaced as a malformed event.
    pub fn read_transcript_tail(&self, run_name: &str, limit: usize) -> Result<Vec<TranscriptEvent>> {
        let limit = clamp_limit(limit, DEFAULT_TAIL_EVENTS, MAX_TAIL_EVENTS);
        let path = self.layout.transcript_path(run_name);
        if !self.layout.run_dir(run_name).is_dir() {
            return Err(Error::NotFound(format!("run {run_name}")));
        }
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut events = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TranscriptEvent>(line) {
                Ok(ev) => events.push(ev),
                Err(e) => {
                    tracing::warn!(run_name, error = %e, "skipping malformed transcript line");
                }
            }
        }
        if events.len() > limit {
            events.drain(..events.len() - limit);
        }
        Ok(events)
    }

    // ── Turn files ───────────────────────────────────────────────────

    /// Next 1-based turn number: max over existing `user_turn_NNN.txt`
    /// files plus one.
    pub fn next_turn_number(&self, run_name: &str) -> Result<u64> {
        let run_dir = self.layout.run_dir(run_name);
        if !run_dir.is_dir() {
            return Err(Error::NotFound(format!("run {run_name}")));
        }
        let mut max_turn = 0u64;
        for entry in fs::read_dir(&run_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(caps) = layout::user_turn_re().captures(&name) {
                if let Ok(n) = caps[1].parse::<u64>() {
                    max_turn = max_turn.max(n);
                }
            }
        }
        Ok(max_turn + 1)
    }

    pub fn write_user_turn_text(&self, run_name: &str, turn: u64, text: &str) -> Result<()> {
        write_text_atomic(&self.layout.user_turn_path(run_name, turn), text, true)
    }

    /// Overwrite the monotone-grow partial snapshot. Raw bytes — the
    /// tail must match exactly what streamed so far.
    pub fn write_assistant_partial_text(&self, run_name: &str, turn: u64, text: &str) -> Result<()> {
        write_text_atomic(
            &self.layout.assistant_partial_path(run_name, turn),
            text,
            false,
        )
    }

    pub fn write_assistant_final_text(&self, run_name: &str, turn: u64, text: &str) -> Result<()> {
        write_text_atomic(&self.layout.assistant_final_path(run_name, turn), text, true)
    }

    pub fn write_turn_metrics(&self, run_name: &str, turn: u64, metrics: &TurnMetrics) -> Result<()> {
        write_json_atomic(&self.layout.turn_metrics_path(run_name, turn), metrics)
    }

    /// Byte tail of a turn's output: the final file when it exists,
    /// otherwise the partial, otherwise empty. `limit` 0 → 16384,
    /// clamped to 2,000,000.
    pub fn read_turn_tail(&self, run_name: &str, turn: u64, limit: usize) -> Result<String> {
        let limit = clamp_limit(limit, DEFAULT_TAIL_BYTES, MAX_TAIL_BYTES);
        let final_path = self.layout.assistant_final_path(run_name, turn);
        let partial_path = self.layout.assistant_partial_path(run_name, turn);

        let bytes = if final_path.is_file() {
            fs::read(&final_path)?
        } else if partial_path.is_file() {
            fs::read(&partial_path)?
        } else {
            return Ok(String::new());
        };

        let start = bytes.len().saturating_sub(limit);
        Ok(String::from_utf8_lossy(&bytes[start..]).into_owned())
    }
}

fn clamp_limit(requested: usize, default: usize, max: usize) -> usize {
    if requested == 0 {
        default
    } else {
        requested.min(max)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
