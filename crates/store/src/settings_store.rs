//! Global and per-run settings stores.
//!
//! Both have the same shape: a single JSON file read as `(settings,
//! found)` and written atomically, stamping `updated_ts` when the caller
//! left it empty.

use std::fs;
use std::path::PathBuf;

use mc_domain::{now_rfc3339, Result, Settings};

use crate::fsio::write_json_atomic;
use crate::layout::ArtifactLayout;

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store for `<artifactDir>/MEGACHAT/settings.json`.
    pub fn global(layout: &ArtifactLayout) -> Self {
        Self {
            path: layout.global_settings_path(),
        }
    }

    /// Store for `<artifactDir>/MEGACHAT/runs/<run>/settings.json`.
    pub fn for_run(layout: &ArtifactLayout, run_name: &str) -> Self {
        Self {
            path: layout.run_settings_path(run_name),
        }
    }

    /// Read the snapshot. A missing file yields `(Settings::default(),
    /// false)`; I/O and parse errors propagate.
    pub fn read(&self) -> Result<(Settings, bool)> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((Settings::default(), false));
            }
            Err(e) => return Err(e.into()),
        };
        let settings: Settings = serde_json::from_str(&raw)?;
        Ok((settings, true))
    }

    /// Write atomically, stamping `updated_ts` when empty. Returns the
    /// snapshot as written.
    pub fn write(&self, settings: &Settings) -> Result<Settings> {
        let mut snapshot = settings.clone();
        if snapshot.updated_ts.is_empty() {
            snapshot.updated_ts = now_rfc3339();
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_json_atomic(&self.path, &snapshot)?;
        Ok(snapshot)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
