// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Audit Log (`spec.md` §4.6): an append-only JSONL file with a per-entry
//! tamper-evident `integrity_hash`, rotation at 10 MiB, and a privacy
//! discipline that drops or hashes sensitive keys in `data` before they ever
//! touch disk.
//!
//! Canonicalization for hashing: UTF-8, sorted keys (`serde_json::Map`'s
//! default `BTreeMap` backing already sorts), no insignificant whitespace
//! (`serde_json::to_string`, not pretty-printed), and NFC normalization of
//! string values — so the same logical entry hashes identically regardless
//! of how a caller composed its unicode.

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

use vault_domain::error::VaultError;
use vault_domain::services::{AuditEvent, AuditSink};

const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: u32 = 9;

const VERBATIM_KEYS: &[&str] = &[
    "timestamp", "error", "status", "count", "size", "type", "format", "duration", "result", "method", "version",
];
const HASH_ONLY_KEYS: &[&str] = &["filename", "path", "image_id", "tag"];

/// JSONL audit sink guarded by a single mutex, matching the spec's
/// single-writer-single-reader concurrency note for the audit log file.
pub struct JsonlAuditLog {
    path: Mutex<PathBuf>,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Mutex::new(path.into()),
        }
    }

    fn canonicalize_value(value: &str) -> String {
        value.nfc().collect()
    }

    fn filter_data(data: &std::collections::HashMap<String, String>) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in data {
            let normalized = Self::canonicalize_value(value);
            if VERBATIM_KEYS.contains(&key.as_str()) || key.ends_with("_count") || key.ends_with("_size") {
                out.insert(key.clone(), Value::String(normalized));
            } else if HASH_ONLY_KEYS.contains(&key.as_str()) {
                let digest = Sha256::digest(normalized.as_bytes());
                let truncated = hex::encode(&digest[..8]);
                out.insert(format!("{}_hash", key), Value::String(truncated));
            }
        }
        out
    }

    fn build_entry(event: &AuditEvent) -> Map<String, Value> {
        let mut entry = Map::new();
        entry.insert(
            "timestamp".to_string(),
            Value::String(event.timestamp.to_rfc3339()),
        );
        entry.insert(
            "timestamp_unix".to_string(),
            Value::Number(event.timestamp.timestamp().into()),
        );
        entry.insert("event_type".to_string(), Value::String(event.event_type.clone()));
        entry.insert("status".to_string(), Value::String(event.status.clone()));
        if let Some(session_id) = &event.session_id {
            entry.insert("session_id".to_string(), Value::String(session_id.clone()));
        }
        entry.insert("data".to_string(), Value::Object(Self::filter_data(&event.data)));
        entry
    }

    fn hash_entry(entry: &Map<String, Value>) -> String {
        let canonical = serde_json::to_string(entry).unwrap_or_default();
        let digest = Sha256::digest(canonical.as_bytes());
        hex::encode(&digest[..16])
    }

    fn rotate_if_needed(path: &Path) -> Result<(), VaultError> {
        let needs_rotation = std::fs::metadata(path).map(|m| m.len() >= ROTATE_AT_BYTES).unwrap_or(false);
        if !needs_rotation {
            return Ok(());
        }

        for n in (1..MAX_LOG_FILES).rev() {
            let from = rotated_path(path, n);
            let to = rotated_path(path, n + 1);
            if from.exists() {
                let _ = std::fs::rename(&from, &to);
            }
        }
        std::fs::rename(path, rotated_path(path, 1)).map_err(|e| VaultError::io(e.to_string()))?;

        let mut init = std::fs::File::create(path).map_err(|e| VaultError::io(e.to_string()))?;
        let init_event = AuditEvent::new("audit_log_rotated", "ok");
        let entry = Self::build_entry(&init_event);
        writeln!(init, "{}", Self::finalize_entry(entry)).map_err(|e| VaultError::io(e.to_string()))?;
        Ok(())
    }

    fn finalize_entry(mut entry: Map<String, Value>) -> String {
        let hash = Self::hash_entry(&entry);
        entry.insert("integrity_hash".to_string(), Value::String(hash));
        serde_json::to_string(&entry).unwrap_or_default()
    }

    fn all_log_paths(path: &Path) -> Vec<PathBuf> {
        let mut paths = vec![path.to_path_buf()];
        for n in 1..=MAX_LOG_FILES {
            let rotated = rotated_path(path, n);
            if rotated.exists() {
                paths.push(rotated);
            }
        }
        paths
    }
}

fn rotated_path(path: &Path, n: u32) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(format!(".{}", n));
    PathBuf::from(os)
}

#[async_trait::async_trait]
impl AuditSink for JsonlAuditLog {
    async fn append(&self, event: AuditEvent) -> Result<(), VaultError> {
        let path = self.path.lock().clone();
        Self::rotate_if_needed(&path)?;

        let entry = Self::build_entry(&event);
        let line = Self::finalize_entry(entry);

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| VaultError::io(e.to_string()))?;
        writeln!(file, "{}", line).map_err(|e| VaultError::io(e.to_string()))?;
        Ok(())
    }

    async fn verify_integrity(&self) -> Result<u64, VaultError> {
        let path = self.path.lock().clone();
        let mut failures = 0u64;

        for log_path in Self::all_log_paths(&path) {
            let Ok(file) = std::fs::File::open(&log_path) else {
                continue;
            };
            let reader = std::io::BufReader::new(file);
            for line in reader.lines() {
                let Ok(line) = line else {
                    failures += 1;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let Ok(mut entry) = serde_json::from_str::<Map<String, Value>>(&line) else {
                    failures += 1;
                    continue;
                };
                let Some(Value::String(stored_hash)) = entry.remove("integrity_hash") else {
                    failures += 1;
                    continue;
                };
                if Self::hash_entry(&entry) != stored_hash {
                    failures += 1;
                }
            }
        }

        Ok(failures)
    }
}
