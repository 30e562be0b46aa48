// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SHA-512 content hash of plaintext image bytes, used as the
//! duplicate-detection key (`spec.md` §3 `ImageRecord.file_hash`).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fmt;

use crate::error::VaultError;

/// Lowercase hex-encoded SHA-512 digest (128 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHash(String);

const DIGEST_HEX_LEN: usize = 128;

impl FileHash {
    /// Wrap an already-computed digest, validating its shape.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self, VaultError> {
        let hex = hex.into();
        if hex.len() != DIGEST_HEX_LEN || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(VaultError::input("file_hash must be a 128-character hex SHA-512 digest"));
        }
        Ok(Self(hex.to_lowercase()))
    }

    /// Hash `plaintext` directly. Used by ingestion to compute the
    /// duplicate-detection key before a blob is ever encrypted.
    pub fn of_bytes(plaintext: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(plaintext);
        let digest = hasher.finalize();
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_digest() {
        let hex = "a".repeat(DIGEST_HEX_LEN);
        assert!(FileHash::from_hex(hex).is_ok());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(FileHash::from_hex("abc").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let bad = "z".repeat(DIGEST_HEX_LEN);
        assert!(FileHash::from_hex(bad).is_err());
    }

    #[test]
    fn lowercases_input() {
        let hex = "A".repeat(DIGEST_HEX_LEN);
        let hash = FileHash::from_hex(hex).unwrap();
        assert_eq!(hash.as_str(), "a".repeat(DIGEST_HEX_LEN));
    }

    #[test]
    fn of_bytes_is_deterministic_and_well_formed() {
        let a = FileHash::of_bytes(b"hello vault");
        let b = FileHash::of_bytes(b"hello vault");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), DIGEST_HEX_LEN);
    }

    #[test]
    fn of_bytes_differs_for_different_content() {
        let a = FileHash::of_bytes(b"hello vault");
        let b = FileHash::of_bytes(b"goodbye vault");
        assert_ne!(a, b);
    }
}
