// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port for the Crypto Controller (`spec.md` §4.3): key derivation, AEAD
//! seal/open, and canary verification. The domain never sees key bytes.

use async_trait::async_trait;

use crate::error::VaultError;

/// Encrypt-then-store and decrypt-then-serve operations over opaque byte
/// buffers. Implementations hold the derived file key in memory only while
/// the vault is unlocked.
#[async_trait]
pub trait CryptoService: Send + Sync {
    /// Load the persisted salt and canary ciphertext (from `vault.key`)
    /// ahead of any `unlock` call. Does not derive or retain a key.
    async fn load_params(&self, salt_b64: &str, canary_b64: &str) -> Result<(), VaultError>;

    /// Derive the file key from `password` and the vault's persisted salt,
    /// then attempt to open the canary. Returns `Err(VaultError::BadPassword)`
    /// on any failure, including a salt/canary mismatch — callers must not
    /// be able to distinguish "wrong password" from "corrupt canary".
    async fn unlock(&self, password: &str) -> Result<(), VaultError>;

    /// Zeroize the in-memory key and any cached derived material.
    fn lock(&self);

    /// Whether a key is currently held in memory.
    fn is_unlocked(&self) -> bool;

    /// Seal `plaintext` under the current file key, returning
    /// `nonce ‖ tag ‖ ciphertext`.
    async fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError>;

    /// Open a buffer produced by [`Self::seal`].
    async fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, VaultError>;

    /// Derive a fresh salt and canary pair for vault initialization, sealing
    /// the canary under a key derived from `password`.
    async fn initialize(&self, password: &str) -> Result<(String, String), VaultError>;

    /// Seal `plaintext` under the tag key — a domain separate from the file
    /// key, so recovering one key does not expose the other's ciphertexts.
    async fn seal_with_tag_key(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError>;

    /// Open a buffer produced by [`Self::seal_with_tag_key`].
    async fn open_with_tag_key(&self, sealed: &[u8]) -> Result<Vec<u8>, VaultError>;

    /// Stream-encrypt the file at `input_path` to `output_path` under the
    /// file key, returning the encrypted size. Deletes a partial output file
    /// on any error.
    async fn encrypt_stream(&self, input_path: &std::path::Path, output_path: &std::path::Path) -> Result<u64, VaultError>;

    /// Stream-decrypt `input_path` (as produced by [`Self::encrypt_stream`])
    /// to `output_path`. Deletes a partial output file on tag mismatch.
    async fn decrypt_stream_to_file(&self, input_path: &std::path::Path, output_path: &std::path::Path) -> Result<(), VaultError>;

    /// Stream-decrypt `input_path` entirely into memory.
    async fn decrypt_to_memory(&self, input_path: &std::path::Path) -> Result<Vec<u8>, VaultError>;

    /// Streaming SHA-512 of a plaintext file, 8 KiB chunks at a time.
    async fn hash_file(&self, path: &std::path::Path) -> Result<crate::value_objects::FileHash, VaultError>;

    /// Overwrite in-memory key buffers with random bytes, then drop them.
    fn clear_keys(&self);
}
