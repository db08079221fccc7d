//! Best-effort `.env` loader.
//!
//! Parses `KEY=VALUE` lines (optionally prefixed with `export `), strips
//! matched surrounding quotes, ignores comments and blanks, and does no
//! variable expansion. Malformed lines become warnings; the operation is
//! never fatal to the caller.

use std::fs;
use std::path::Path;

use mc_domain::Result;

/// What a load attempt did.
#[derive(Debug, Default)]
pub struct EnvReport {
    /// Keys applied to the process environment.
    pub loaded: Vec<String>,
    /// Keys present in the file but skipped (already set, no overwrite).
    pub skipped: Vec<String>,
    pub warnings: Vec<String>,
}

/// Load `path` into the process environment. A missing file is an empty
/// report, not an error.
pub fn load_env_file(path: &Path, overwrite: bool) -> Result<EnvReport> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(EnvReport::default()),
        Err(e) => return Err(e.into()),
    };

    let mut report = EnvReport::default();
    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line).trim_start();

        let Some((key, value)) = line.split_once('=') else {
            report
                .warnings
                .push(format!("line {}: missing '='", lineno + 1));
            continue;
        };
        let key = key.trim();
        if key.is_empty() || !is_valid_key(key) {
            report
                .warnings
                .push(format!("line {}: invalid key {key:?}", lineno + 1));
            continue;
        }

        let value = unquote(value.trim());
        if !overwrite && std::env::var_os(key).is_some() {
            report.skipped.push(key.to_string());
            continue;
        }
        std::env::set_var(key, value);
        report.loaded.push(key.to_string());
    }

    if !report.warnings.is_empty() {
        tracing::warn!(
            path = %path.display(),
            warnings = report.warnings.len(),
            "env file had malformed lines"
        );
    }
    Ok(report)
}

fn is_valid_key(key: &str) -> bool {
    key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Strip one pair of matched single or double quotes.
fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_env(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_file_is_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = load_env_file(&dir.path().join(".env"), false).unwrap();
        assert!(report.loaded.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn parses_plain_export_and_quoted() {
        let (_dir, path) = write_env(
            "# comment\n\
             MC_TEST_PLAIN=value\n\
             export MC_TEST_EXPORTED=ex\n\
             MC_TEST_DQ=\"quoted value\"\n\
             MC_TEST_SQ='single'\n\
             \n",
        );
        let report = load_env_file(&path, true).unwrap();
        assert_eq!(report.loaded.len(), 4);
        assert_eq!(std::env::var("MC_TEST_PLAIN").unwrap(), "value");
        assert_eq!(std::env::var("MC_TEST_EXPORTED").unwrap(), "ex");
        assert_eq!(std::env::var("MC_TEST_DQ").unwrap(), "quoted value");
        assert_eq!(std::env::var("MC_TEST_SQ").unwrap(), "single");
    }

    #[test]
    fn mismatched_quotes_are_kept_verbatim() {
        let (_dir, path) = write_env("MC_TEST_MISMATCH=\"half\n");
        load_env_file(&path, true).unwrap();
        assert_eq!(std::env::var("MC_TEST_MISMATCH").unwrap(), "\"half");
    }

    #[test]
    fn no_variable_expansion() {
        let (_dir, path) = write_env("MC_TEST_NOEXPAND=$HOME/x\n");
        load_env_file(&path, true).unwrap();
        assert_eq!(std::env::var("MC_TEST_NOEXPAND").unwrap(), "$HOME/x");
    }

    #[test]
    fn malformed_lines_become_warnings() {
        let (_dir, path) = write_env("JUSTAWORD\nBAD KEY=x\nMC_TEST_OK2=1\n");
        let report = load_env_file(&path, true).unwrap();
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.loaded, vec!["MC_TEST_OK2".to_string()]);
    }

    #[test]
    fn respects_overwrite_flag() {
        std::env::set_var("MC_TEST_EXISTING", "original");
        let (_dir, path) = write_env("MC_TEST_EXISTING=new\n");

        let report = load_env_file(&path, false).unwrap();
        assert_eq!(report.skipped, vec!["MC_TEST_EXISTING".to_string()]);
        assert_eq!(std::env::var("MC_TEST_EXISTING").unwrap(), "original");

        load_env_file(&path, true).unwrap();
        assert_eq!(std::env::var("MC_TEST_EXISTING").unwrap(), "new");
    }
}
