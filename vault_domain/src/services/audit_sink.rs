// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port for the Audit Log (`spec.md` §4.6). The domain only knows how to
//! describe an event; privacy filtering, canonicalization, hashing, and
//! rotation are infrastructure concerns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::VaultError;

/// One thing worth recording. `data` is the raw key/value payload before the
/// sink applies its allow-list / hash-only privacy discipline.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub session_id: Option<String>,
    pub data: HashMap<String, String>,
}

impl AuditEvent {
    pub fn new(event_type: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now(),
            status: status.into(),
            session_id: None,
            data: HashMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Attach the session id active when this event was recorded
    /// (`spec.md` §3 `AuthLogEntry`). Distinct from `data`: it is never
    /// subject to the allow-list/hash-only privacy filter, since it is
    /// itself an opaque, rotating identifier rather than caller content.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append `event` to the current log file, rotating first if needed.
    async fn append(&self, event: AuditEvent) -> Result<(), VaultError>;

    /// Walk every entry in every log file and recompute its integrity hash,
    /// returning the count of entries that failed verification.
    async fn verify_integrity(&self) -> Result<u64, VaultError>;
}
