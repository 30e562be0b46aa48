// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `VaultConfig` and `VaultKeyParams` — the two plaintext, single-per-vault
//! entities (`spec.md` §3). Neither holds secrets: `VaultConfig` is policy,
//! `VaultKeyParams` is KDF bookkeeping plus the canary ciphertext used to
//! verify a password without persisting the master key itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vault-wide policy, stored plaintext in `vault.config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub vault_id: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Always `true` in this version of the vault; kept as an explicit field
    /// because it is part of the persisted `vault.config` shape.
    pub encrypted: bool,
    pub compression_enabled: bool,
    pub max_file_size_bytes: u64,
    pub accepted_mime_prefixes: Vec<String>,
    pub security_level: String,
    pub backup_enabled: bool,
    pub audit_logging: bool,
}

impl VaultConfig {
    pub fn new(vault_id: String) -> Self {
        let now = Utc::now();
        Self {
            vault_id,
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: now,
            modified_at: now,
            encrypted: true,
            compression_enabled: false,
            max_file_size_bytes: 100 * 1024 * 1024,
            accepted_mime_prefixes: vec!["image/".to_string()],
            security_level: "high".to_string(),
            backup_enabled: false,
            audit_logging: true,
        }
    }

    pub fn accepts_mime(&self, mime: &str) -> bool {
        self.accepted_mime_prefixes.iter().any(|p| mime.starts_with(p.as_str()))
    }

    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}

/// KDF parameters and AEAD framing constants, stored plaintext in
/// `vault.key` alongside the canary ciphertext used to verify a password
/// across the gateway's stateless invocations (spec.md §9 Open Question 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultKeyParams {
    pub algorithm: String,
    pub key_derivation: String,
    pub iterations: u32,
    pub salt_size: usize,
    pub nonce_size: usize,
    pub tag_size: usize,
    /// Base64-encoded random salt, fixed for the life of the vault.
    pub salt: String,
    /// Base64-encoded `nonce ‖ tag ‖ ciphertext` of a fixed magic string,
    /// encrypted under the file key derived from the correct password.
    pub canary: String,
}

impl VaultKeyParams {
    pub const MIN_ITERATIONS: u32 = 200_000;
    pub const MIN_SALT_SIZE: usize = 32;

    pub fn new(salt_b64: String, canary_b64: String) -> Self {
        Self {
            algorithm: "AES-256-GCM".to_string(),
            key_derivation: "PBKDF2-HMAC-SHA512".to_string(),
            iterations: Self::MIN_ITERATIONS,
            salt_size: Self::MIN_SALT_SIZE,
            nonce_size: 12,
            tag_size: 16,
            salt: salt_b64,
            canary: canary_b64,
        }
    }
}
