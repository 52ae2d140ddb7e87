//! Utility functions for file output and path manipulation

use crate::error::SaveError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Indentation used for every JSON file written to disk
const JSON_INDENT: &[u8] = b"    ";

/// Encode a value as pretty-printed JSON with four-space indentation and a trailing newline
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write a value to `path` as pretty-printed JSON, replacing any existing file
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SaveError> {
    let bytes = to_pretty_json(value).map_err(|source| SaveError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Remove a directory tree (if present) and create it again empty
pub async fn recreate_dir(path: &Path) -> Result<(), SaveError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(SaveError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    create_dir(path).await
}

/// Create a directory and all of its parents
pub async fn create_dir(path: &Path) -> Result<(), SaveError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Turn an identifier from remote data into a single safe path component
///
/// Separators and control characters become `_`, and names that would
/// resolve outside the parent directory (`""`, `"."`, `".."`) are replaced,
/// so the result can always be joined onto an output root.
///
/// # Examples
///
/// ```
/// use course_dl::utils::sanitize_component;
///
/// assert_eq!(sanitize_component("grokking-the-interview"), "grokking-the-interview");
/// assert_eq!(sanitize_component("../etc/passwd"), ".._etc_passwd");
/// assert_eq!(sanitize_component(".."), "_");
/// ```
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Join a sanitized `<name>.json` file name onto a directory
pub fn json_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", sanitize_component(name)))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pretty_json_uses_four_spaces() {
        let bytes = to_pretty_json(&json!({ "a": [1] })).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "{\n    \"a\": [\n        1\n    ]\n}\n");
    }

    #[test]
    fn sanitize_strips_separators() {
        assert_eq!(sanitize_component("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_component("  spaced  "), "spaced");
        assert_eq!(sanitize_component("tab\there"), "tab_here");
        assert_eq!(sanitize_component(""), "_");
        assert_eq!(sanitize_component("."), "_");
    }

    #[test]
    fn json_path_stays_inside_dir() {
        let dir = Path::new("/out/documents");
        let path = json_path(dir, "../../secret");
        assert_eq!(path, Path::new("/out/documents/.._.._secret.json"));
        assert_eq!(path.parent(), Some(dir));
    }

    #[tokio::test]
    async fn recreate_dir_clears_contents() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("course");
        std::fs::create_dir_all(dir.join("documents")).unwrap();
        std::fs::write(dir.join("stale.json"), "{}").unwrap();

        recreate_dir(&dir).await.unwrap();

        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn recreate_dir_creates_missing() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("fresh").join("nested");
        recreate_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn write_json_reports_path_on_failure() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("missing-dir").join("file.json");
        let err = write_json(&path, &json!({})).await.unwrap_err();
        assert_eq!(err.path(), path.as_path());
        assert!(matches!(err, SaveError::Io { .. }));
    }
}
