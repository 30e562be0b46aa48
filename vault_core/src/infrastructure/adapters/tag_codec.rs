// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Tag Codec (`spec.md` §4.1 "separate domain" note): JSON-encodes tags and
//! seals them under the tag key, and JSON-encodes metadata and seals it
//! under the file key — the same two-key split the rest of the vault
//! observes, so compromising one key never exposes ciphertext sealed under
//! the other.

use std::collections::HashMap;
use std::sync::Arc;

use vault_domain::error::VaultError;
use vault_domain::services::{CryptoService, TagCodecService};
use vault_domain::value_objects::TagSet;

pub struct JsonTagCodec {
    crypto: Arc<dyn CryptoService>,
}

impl JsonTagCodec {
    pub fn new(crypto: Arc<dyn CryptoService>) -> Self {
        Self { crypto }
    }
}

#[async_trait::async_trait]
impl TagCodecService for JsonTagCodec {
    async fn encode_tags(&self, tags: &TagSet) -> Result<Vec<u8>, VaultError> {
        let json = serde_json::to_vec(tags.as_slice())?;
        self.crypto.seal_with_tag_key(&json).await
    }

    async fn decode_tags(&self, sealed: &[u8]) -> Result<TagSet, VaultError> {
        let json = self.crypto.open_with_tag_key(sealed).await?;
        let raw: Vec<String> = serde_json::from_slice(&json)?;
        Ok(TagSet::from_raw(raw))
    }

    async fn encode_metadata(&self, metadata: &HashMap<String, String>) -> Result<Vec<u8>, VaultError> {
        let json = serde_json::to_vec(metadata)?;
        self.crypto.seal(&json).await
    }

    async fn decode_metadata(&self, sealed: &[u8]) -> Result<HashMap<String, String>, VaultError> {
        let json = self.crypto.open(sealed).await?;
        Ok(serde_json::from_slice(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::CryptoController;

    async fn codec() -> JsonTagCodec {
        let crypto = Arc::new(CryptoController::new());
        crypto.initialize("pw").await.unwrap();
        JsonTagCodec::new(crypto)
    }

    #[tokio::test]
    async fn tags_round_trip() {
        let codec = codec().await;
        let tags = TagSet::from_raw(vec!["Beach".to_string(), " sun ".to_string()]);
        let sealed = codec.encode_tags(&tags).await.unwrap();
        let decoded = codec.decode_tags(&sealed).await.unwrap();
        assert_eq!(decoded.as_slice(), tags.as_slice());
    }

    #[tokio::test]
    async fn metadata_round_trips() {
        let codec = codec().await;
        let mut meta = HashMap::new();
        meta.insert("camera".to_string(), "Pixel 8".to_string());
        let sealed = codec.encode_metadata(&meta).await.unwrap();
        let decoded = codec.decode_metadata(&sealed).await.unwrap();
        assert_eq!(decoded, meta);
    }
}
