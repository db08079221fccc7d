//! Atomic file-write helpers.
//!
//! JSON documents are written to a temp sibling and renamed into place
//! so concurrent readers only ever see a complete document. Text files
//! get a single trailing newline when non-empty.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use mc_domain::Result;

use crate::layout::random_hex8;

/// Write `value` as pretty JSON via temp-file + rename.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_bytes_atomic(path, json.as_bytes(), true)
}

/// Write text via temp-file + rename. When `ensure_newline` is set and
/// the content is non-empty, a single trailing `\n` is guaranteed.
pub(crate) fn write_text_atomic(path: &Path, text: &str, ensure_newline: bool) -> Result<()> {
    write_bytes_atomic(path, text.as_bytes(), ensure_newline)
}

fn write_bytes_atomic(path: &Path, bytes: &[u8], ensure_newline: bool) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let tmp = dir.join(format!(".tmp-{}", random_hex8()));

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        if ensure_newline && !bytes.is_empty() && !bytes.ends_with(b"\n") {
            file.write_all(b"\n")?;
        }
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_write_appends_single_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        write_text_atomic(&path, "hello", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");

        write_text_atomic(&path, "hello\n", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn empty_text_stays_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        write_text_atomic(&path, "", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn raw_write_preserves_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.txt");
        write_text_atomic(&path, "AB", false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "AB");
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.json");
        write_json_atomic(&path, &serde_json::json!({"k": 1})).unwrap();
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.json"]);
    }
}
