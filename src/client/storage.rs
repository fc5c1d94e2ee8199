use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ClientError;

pub const WORKSPACE_KEY: &str = "copyworx-workspace";
pub const PENDING_IMPORT_KEY: &str = "copyworx-pending-import";
const TOUR_PREFIX: &str = "copyworx-tour-completed-";

/// Extensions staged as base64; everything else is kept as text.
const BINARY_EXTENSIONS: &[&str] = &["docx", "pdf", "doc", "odt", "rtf"];

/// File-backed key/value store standing in for browser local storage.
///
/// Every write rewrites the whole file through a temp file and rename, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl LocalStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable local storage");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(ClientError::Storage(e.to_string())),
        };
        Ok(Self { path, entries })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring malformed stored value");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), ClientError> {
        let value = serde_json::to_value(value).map_err(|e| ClientError::Storage(e.to_string()))?;
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<(), ClientError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), ClientError> {
        let raw = serde_json::to_string_pretty(&self.entries).map_err(|e| ClientError::Storage(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw).map_err(|e| ClientError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| ClientError::Storage(e.to_string()))
    }

    pub fn is_tour_completed(&self, tour: &str) -> bool {
        self.get::<bool>(&format!("{}{}", TOUR_PREFIX, tour)).unwrap_or(false)
    }

    pub fn mark_tour_completed(&mut self, tour: &str) -> Result<(), ClientError> {
        self.set(&format!("{}{}", TOUR_PREFIX, tour), &true)
    }

    /// Stage a file picked before sign-in so it can be imported afterwards.
    pub fn stage_import(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), ClientError> {
        let binary = is_binary(file_name);
        let payload = if binary {
            general_purpose::STANDARD.encode(bytes)
        } else {
            String::from_utf8_lossy(bytes).into_owned()
        };
        self.set(
            PENDING_IMPORT_KEY,
            &PendingImport {
                file_name: file_name.to_string(),
                base64: binary,
                payload,
                staged_at: Utc::now(),
            },
        )
    }

    /// Remove and decode the staged import, if any. A payload that fails to
    /// decode is dropped.
    pub fn take_pending_import(&mut self) -> Result<Option<(String, Vec<u8>)>, ClientError> {
        let pending = self.get::<PendingImport>(PENDING_IMPORT_KEY);
        self.remove(PENDING_IMPORT_KEY)?;
        let Some(pending) = pending else {
            return Ok(None);
        };

        if !pending.base64 {
            return Ok(Some((pending.file_name, pending.payload.into_bytes())));
        }
        match general_purpose::STANDARD.decode(pending.payload.as_bytes()) {
            Ok(bytes) => Ok(Some((pending.file_name, bytes))),
            Err(e) => {
                tracing::warn!(file = %pending.file_name, error = %e, "Dropping corrupt staged import");
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingImport {
    file_name: String,
    base64: bool,
    payload: String,
    staged_at: DateTime<Utc>,
}

fn is_binary(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
