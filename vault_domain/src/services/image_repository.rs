// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port for the Metadata Store (`spec.md` §4.2): CRUD and lookup over
//! `ImageRecord`, modeled after the pipeline domain's `Repository<T>` port.

use async_trait::async_trait;

use crate::entities::ImageRecord;
use crate::error::VaultError;
use crate::value_objects::{FileHash, ImageId};

#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn insert(&self, record: &ImageRecord) -> Result<(), VaultError>;

    async fn find_by_id(&self, id: ImageId) -> Result<Option<ImageRecord>, VaultError>;

    /// Used by ingestion to reject duplicate content before writing a blob.
    async fn find_by_hash(&self, hash: &FileHash) -> Result<Option<ImageRecord>, VaultError>;

    async fn list_paginated(&self, offset: u32, limit: u32) -> Result<Vec<ImageRecord>, VaultError>;

    async fn update(&self, record: &ImageRecord) -> Result<(), VaultError>;

    async fn delete(&self, id: ImageId) -> Result<bool, VaultError>;

    async fn count(&self) -> Result<u64, VaultError>;

    async fn total_original_size(&self) -> Result<u64, VaultError>;

    async fn total_encrypted_size(&self) -> Result<u64, VaultError>;
}
