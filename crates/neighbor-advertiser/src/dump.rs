//! Diagnostic JSON snapshots
//!
//! The request slice is written before any negotiation attempt and the
//! service response after a successful one, so a post-mortem can see what
//! was exchanged. Output is indented by four spaces with keys sorted.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use tracing::debug;

use crate::error::{AdvertiserError, Result};

/// Default directory for diagnostic snapshots
pub const DEFAULT_DUMP_DIR: &str = "/tmp/neighbor_advertiser";

/// File name of the request snapshot
pub const REQUEST_SLICE_FILE: &str = "request_slice.json";

/// File name of the response snapshot
pub const RESPONSE_FILE: &str = "response.json";

/// Writer for diagnostic snapshots under one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticDump {
    dir: PathBuf,
}

impl DiagnosticDump {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn request_path(&self) -> PathBuf {
        self.dir.join(REQUEST_SLICE_FILE)
    }

    pub fn response_path(&self) -> PathBuf {
        self.dir.join(RESPONSE_FILE)
    }

    /// Writes the outbound slice snapshot.
    pub fn save_request<T: Serialize>(&self, request: &T) -> Result<PathBuf> {
        let path = self.request_path();
        save_as_json(request, &path)?;
        Ok(path)
    }

    /// Writes the service response snapshot.
    pub fn save_response<T: Serialize>(&self, response: &T) -> Result<PathBuf> {
        let path = self.response_path();
        save_as_json(response, &path)?;
        Ok(path)
    }
}

impl Default for DiagnosticDump {
    fn default() -> Self {
        Self::new(DEFAULT_DUMP_DIR)
    }
}

/// Serializes `value` to `path` as pretty JSON with sorted keys, creating
/// parent directories as needed.
pub fn save_as_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let dump_err = |source: std::io::Error| AdvertiserError::Dump {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(dump_err)?;
    }

    let value = serde_json::to_value(value).map_err(|e| dump_err(e.into()))?;
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    sort_keys(value)
        .serialize(&mut ser)
        .map_err(|e| dump_err(e.into()))?;
    buf.push(b'\n');

    fs::write(path, buf).map_err(dump_err)?;
    debug!(path = %path.display(), "Saved diagnostic snapshot");
    Ok(())
}

/// Rebuilds every object with its keys in lexical order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths() {
        let dump = DiagnosticDump::default();
        assert_eq!(
            dump.request_path(),
            PathBuf::from("/tmp/neighbor_advertiser/request_slice.json")
        );
        assert_eq!(
            dump.response_path(),
            PathBuf::from("/tmp/neighbor_advertiser/response.json")
        );
    }

    #[test]
    fn test_save_creates_directory_and_sorts_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let dump = DiagnosticDump::new(tmp.path().join("nested").join("dir"));

        let path = dump
            .save_response(&json!({"zeta": 1, "alpha": {"y": 2, "b": [{"k": 1, "a": 0}]}}))
            .unwrap();

        let text = fs::read_to_string(path).unwrap();
        let expected = "{\n    \"alpha\": {\n        \"b\": [\n            {\n                \"a\": 0,\n                \"k\": 1\n            }\n        ],\n        \"y\": 2\n    },\n    \"zeta\": 1\n}\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_save_into_file_path_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let dump = DiagnosticDump::new(&blocker);
        let err = dump.save_request(&json!({})).unwrap_err();
        assert!(matches!(err, AdvertiserError::Dump { .. }));
    }
}
