//! Filesystem persistence for megachat runs.
//!
//! Owns the on-disk artifact layout: run directories with args/meta,
//! append-only transcripts, per-turn text and metrics files, the global
//! and per-run settings files, and the best-effort `.env` loader. All
//! JSON writes go through temp-file + rename so readers never observe a
//! partial document.

pub mod envfile;
mod fsio;
pub mod layout;
pub mod meta;
pub mod run_store;
pub mod settings_store;

pub use layout::ArtifactLayout;
pub use meta::{RunArgs, RunMeta, TranscriptEvent, TurnMetrics};
pub use run_store::RunStore;
pub use settings_store::SettingsStore;
