//! Artifact-directory layout and naming rules.
//!
//! ```text
//! <artifactDir>/
//!   MEGACHAT_latest.txt        most recently created run_name
//!   MEGACHAT/
//!     settings.json            global settings (optional)
//!     .env                     dotenv (optional)
//!     runs/<run_name>/         one directory per conversation
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;

/// `YYYYMMDD_HHMMSSZ_chat-xxxxxxxx` — UTC timestamp plus 8 hex chars.
pub const RUN_NAME_PATTERN: &str = r"^\d{8}_\d{6}Z_chat-[0-9a-f]{8}$";

const USER_TURN_PATTERN: &str = r"^user_turn_(\d{3})\.txt$";

fn run_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(RUN_NAME_PATTERN).expect("run name regex"))
}

pub(crate) fn user_turn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(USER_TURN_PATTERN).expect("user turn regex"))
}

/// True when `name` is a well-formed run name.
pub fn is_valid_run_name(name: &str) -> bool {
    run_name_re().is_match(name)
}

/// Eight lowercase hex chars from a fresh v4 UUID.
pub fn random_hex8() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Mint a new run name from the current UTC clock plus random hex.
pub fn generate_run_name() -> String {
    format!(
        "{}Z_chat-{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        random_hex8()
    )
}

pub fn user_turn_file(turn: u64) -> String {
    format!("user_turn_{turn:03}.txt")
}

pub fn assistant_partial_file(turn: u64) -> String {
    format!("assistant_turn_{turn:03}.partial.txt")
}

pub fn assistant_final_file(turn: u64) -> String {
    format!("assistant_turn_{turn:03}.txt")
}

pub fn turn_metrics_file(turn: u64) -> String {
    format!("turn_{turn:03}.json")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ArtifactLayout
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Resolves every path under one artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    artifact_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
        }
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn megachat_dir(&self) -> PathBuf {
        self.artifact_dir.join("MEGACHAT")
    }

    pub fn latest_pointer_path(&self) -> PathBuf {
        self.artifact_dir.join("MEGACHAT_latest.txt")
    }

    pub fn global_settings_path(&self) -> PathBuf {
        self.megachat_dir().join("settings.json")
    }

    pub fn env_file_path(&self) -> PathBuf {
        self.megachat_dir().join(".env")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.megachat_dir().join("runs")
    }

    pub fn run_dir(&self, run_name: &str) -> PathBuf {
        self.runs_dir().join(run_name)
    }

    pub fn args_path(&self, run_name: &str) -> PathBuf {
        self.run_dir(run_name).join("args.json")
    }

    pub fn meta_path(&self, run_name: &str) -> PathBuf {
        self.run_dir(run_name).join("meta.json")
    }

    pub fn run_settings_path(&self, run_name: &str) -> PathBuf {
        self.run_dir(run_name).join("settings.json")
    }

    pub fn transcript_path(&self, run_name: &str) -> PathBuf {
        self.run_dir(run_name).join("transcript.jsonl")
    }

    pub fn user_turn_path(&self, run_name: &str, turn: u64) -> PathBuf {
        self.run_dir(run_name).join(user_turn_file(turn))
    }

    pub fn assistant_partial_path(&self, run_name: &str, turn: u64) -> PathBuf {
        self.run_dir(run_name).join(assistant_partial_file(turn))
    }

    pub fn assistant_final_path(&self, run_name: &str, turn: u64) -> PathBuf {
        self.run_dir(run_name).join(assistant_final_file(turn))
    }

    pub fn turn_metrics_path(&self, run_name: &str, turn: u64) -> PathBuf {
        self.run_dir(run_name).join(turn_metrics_file(turn))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_run_names_are_valid() {
        for _ in 0..20 {
            let name = generate_run_name();
            assert!(is_valid_run_name(&name), "bad run name: {name}");
        }
    }

    #[test]
    fn rejects_malformed_run_names() {
        assert!(!is_valid_run_name(""));
        assert!(!is_valid_run_name("20250101_120000_chat-deadbeef")); // missing Z
        assert!(!is_valid_run_name("20250101_120000Z_chat-DEADBEEF")); // uppercase hex
        assert!(!is_valid_run_name("20250101_120000Z_chat-abc")); // short hex
        assert!(!is_valid_run_name("20250101_120000Z_chat-deadbeef9")); // long hex
        assert!(is_valid_run_name("20250101_120000Z_chat-deadbeef"));
    }

    #[test]
    fn turn_file_names_are_zero_padded() {
        assert_eq!(user_turn_file(1), "user_turn_001.txt");
        assert_eq!(assistant_partial_file(12), "assistant_turn_012.partial.txt");
        assert_eq!(assistant_final_file(123), "assistant_turn_123.txt");
        assert_eq!(turn_metrics_file(7), "turn_007.json");
    }

    #[test]
    fn layout_paths_nest_under_megachat() {
        let layout = ArtifactLayout::new("/tmp/x");
        let run = "20250101_120000Z_chat-deadbeef";
        assert_eq!(
            layout.transcript_path(run),
            Path::new("/tmp/x/MEGACHAT/runs/20250101_120000Z_chat-deadbeef/transcript.jsonl")
        );
        assert_eq!(
            layout.latest_pointer_path(),
            Path::new("/tmp/x/MEGACHAT_latest.txt")
        );
    }

    #[test]
    fn random_hex8_shape() {
        let h = random_hex8();
        assert_eq!(h.len(), 8);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
