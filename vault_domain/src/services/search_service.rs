// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port for Search (`spec.md` §4.7). The engine never sees ciphertext: it
//! scores already-decrypted projections supplied by the caller.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::entities::ImageRecord;
use crate::error::VaultError;
use crate::value_objects::TagSet;

/// A decrypted projection of one record, as handed to the search engine by
/// the orchestrator after Crypto/Tag Codec have done their work.
#[derive(Debug, Clone)]
pub struct SearchProjection {
    pub record: ImageRecord,
    pub tags: TagSet,
    pub metadata: HashMap<String, String>,
}

/// A parsed query string, ready for matching. Construction (grammar parsing,
/// wildcard compilation) is the infrastructure implementation's job.
pub struct SearchQuery {
    pub raw: String,
}

impl SearchQuery {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

#[async_trait]
pub trait SearchService: Send + Sync {
    /// Score and rank `projections` against `query`, breaking ties by
    /// `date_added` descending.
    async fn search(
        &self,
        query: &SearchQuery,
        projections: &[SearchProjection],
    ) -> Result<Vec<ImageRecord>, VaultError>;
}
