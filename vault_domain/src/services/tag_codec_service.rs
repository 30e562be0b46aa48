// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port for encoding/decoding the encrypted tag and metadata side channels
//! carried on `ImageRecord`. Kept separate from `CryptoService` because the
//! encoding (JSON) is a domain concern even though the sealing is not.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::VaultError;
use crate::value_objects::TagSet;

#[async_trait]
pub trait TagCodecService: Send + Sync {
    /// Seal a normalized tag set into the ciphertext stored as
    /// `ImageRecord::encrypted_tags`.
    async fn encode_tags(&self, tags: &TagSet) -> Result<Vec<u8>, VaultError>;

    /// Recover a tag set previously produced by [`Self::encode_tags`].
    async fn decode_tags(&self, sealed: &[u8]) -> Result<TagSet, VaultError>;

    /// Seal a free-form metadata map into the ciphertext stored as
    /// `ImageRecord::encrypted_metadata`.
    async fn encode_metadata(&self, metadata: &HashMap<String, String>) -> Result<Vec<u8>, VaultError>;

    /// Recover a metadata map previously produced by [`Self::encode_metadata`].
    async fn decode_metadata(&self, sealed: &[u8]) -> Result<HashMap<String, String>, VaultError>;
}
