// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `ImageRecord` — one row per stored blob (`spec.md` §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{FileHash, ImageId, MimeType};

/// Metadata for one encrypted image stored in the vault.
///
/// `encrypted_tags` and `encrypted_metadata` are opaque ciphertext — the
/// domain never decrypts them; that capability belongs to the Crypto
/// Controller via the `CryptoService` trait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub name: String,
    pub encrypted_path: String,
    pub original_size: u64,
    pub encrypted_size: u64,
    pub mime_type: MimeType,
    pub file_hash: FileHash,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub encrypted_tags: Vec<u8>,
    pub encrypted_metadata: Vec<u8>,
    pub thumbnail_path: Option<String>,
    pub is_encrypted: bool,
}

impl ImageRecord {
    /// Construct a freshly-ingested record. `is_encrypted` is always `true`
    /// in this version of the vault.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        encrypted_path: String,
        original_size: u64,
        encrypted_size: u64,
        mime_type: MimeType,
        file_hash: FileHash,
        encrypted_tags: Vec<u8>,
        encrypted_metadata: Vec<u8>,
        thumbnail_path: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ImageId::new(),
            name,
            encrypted_path,
            original_size,
            encrypted_size,
            mime_type,
            file_hash,
            date_added: now,
            date_modified: now,
            encrypted_tags,
            encrypted_metadata,
            thumbnail_path,
            is_encrypted: true,
        }
    }

    /// Mark the record as modified "now", e.g. after a tag or metadata
    /// update.
    pub fn touch(&mut self) {
        self.date_modified = Utc::now();
    }
}
