// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed `ImageRepository` (`spec.md` §4.2 Storage Engine).
//!
//! Every write goes through a single transaction; `insert` relies on the
//! `file_hash UNIQUE` constraint to make duplicate-content rejection atomic
//! even under concurrent adds of identical plaintext.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use vault_domain::error::VaultError;
use vault_domain::services::ImageRepository;
use vault_domain::value_objects::{FileHash, ImageId, MimeType};
use vault_domain::ImageRecord;

pub struct SqliteImageRepository {
    pool: SqlitePool,
}

impl SqliteImageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<ImageRecord, VaultError> {
        let id: String = row.try_get("id").map_err(db_err)?;
        let mime: String = row.try_get("mime_type").map_err(db_err)?;
        let hash: String = row.try_get("file_hash").map_err(db_err)?;
        let date_added: String = row.try_get("date_added").map_err(db_err)?;
        let date_modified: String = row.try_get("date_modified").map_err(db_err)?;

        Ok(ImageRecord {
            id: ImageId::from_str(&id)?,
            name: row.try_get("name").map_err(db_err)?,
            encrypted_path: row.try_get("encrypted_path").map_err(db_err)?,
            original_size: row.try_get::<i64, _>("original_size").map_err(db_err)? as u64,
            encrypted_size: row.try_get::<i64, _>("encrypted_size").map_err(db_err)? as u64,
            mime_type: MimeType::parse(mime)?,
            file_hash: FileHash::from_hex(hash)?,
            date_added: parse_timestamp(&date_added)?,
            date_modified: parse_timestamp(&date_modified)?,
            encrypted_tags: row.try_get("encrypted_tags").map_err(db_err)?,
            encrypted_metadata: row.try_get("encrypted_metadata").map_err(db_err)?,
            thumbnail_path: row.try_get("thumbnail_path").map_err(db_err)?,
            is_encrypted: row.try_get::<i64, _>("is_encrypted").map_err(db_err)? != 0,
        })
    }
}

fn db_err(e: sqlx::Error) -> VaultError {
    VaultError::storage(e.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, VaultError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| VaultError::storage(format!("corrupt timestamp: {}", e)))
}

#[async_trait::async_trait]
impl ImageRepository for SqliteImageRepository {
    async fn insert(&self, record: &ImageRecord) -> Result<(), VaultError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM images WHERE file_hash = ?")
            .bind(record.file_hash.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(VaultError::DuplicateContent);
        }

        sqlx::query(
            "INSERT INTO images (id, name, encrypted_path, original_size, encrypted_size, mime_type, \
             file_hash, date_added, date_modified, encrypted_tags, encrypted_metadata, thumbnail_path, is_encrypted) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.name)
        .bind(&record.encrypted_path)
        .bind(record.original_size as i64)
        .bind(record.encrypted_size as i64)
        .bind(record.mime_type.as_str())
        .bind(record.file_hash.as_str())
        .bind(record.date_added.to_rfc3339())
        .bind(record.date_modified.to_rfc3339())
        .bind(&record.encrypted_tags)
        .bind(&record.encrypted_metadata)
        .bind(&record.thumbnail_path)
        .bind(record.is_encrypted as i64)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: ImageId) -> Result<Option<ImageRecord>, VaultError> {
        let row = sqlx::query("SELECT * FROM images WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn find_by_hash(&self, hash: &FileHash) -> Result<Option<ImageRecord>, VaultError> {
        let row = sqlx::query("SELECT * FROM images WHERE file_hash = ?")
            .bind(hash.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn list_paginated(&self, offset: u32, limit: u32) -> Result<Vec<ImageRecord>, VaultError> {
        let rows = sqlx::query("SELECT * FROM images ORDER BY date_added DESC LIMIT ? OFFSET ?")
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(Self::row_to_record).collect()
    }

    async fn update(&self, record: &ImageRecord) -> Result<(), VaultError> {
        let result = sqlx::query(
            "UPDATE images SET name = ?, encrypted_tags = ?, encrypted_metadata = ?, \
             thumbnail_path = ?, date_modified = ? WHERE id = ?",
        )
        .bind(&record.name)
        .bind(&record.encrypted_tags)
        .bind(&record.encrypted_metadata)
        .bind(&record.thumbnail_path)
        .bind(record.date_modified.to_rfc3339())
        .bind(record.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(VaultError::input(format!("no image with id {}", record.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: ImageId) -> Result<bool, VaultError> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, VaultError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count as u64)
    }

    async fn total_original_size(&self) -> Result<u64, VaultError> {
        let total: Option<i64> = sqlx::query_scalar("SELECT SUM(original_size) FROM images")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(total.unwrap_or(0) as u64)
    }

    async fn total_encrypted_size(&self) -> Result<u64, VaultError> {
        let total: Option<i64> = sqlx::query_scalar("SELECT SUM(encrypted_size) FROM images")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(total.unwrap_or(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::schema::initialize_database;
    use tempfile::tempdir;

    async fn repo() -> (SqliteImageRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("vault.db");
        let url = format!("sqlite://{}", db_path.display());
        let pool = initialize_database(&url).await.unwrap();
        (SqliteImageRepository::new(pool), dir)
    }

    fn sample() -> ImageRecord {
        ImageRecord::new(
            "beach.jpg".to_string(),
            "data/ab/cd.bin".to_string(),
            100,
            128,
            MimeType::parse("image/jpeg").unwrap(),
            FileHash::of_bytes(b"beach photo bytes"),
            vec![1, 2, 3],
            vec![4, 5, 6],
            None,
        )
    }

    #[tokio::test]
    async fn insert_then_find_by_id_round_trips() {
        let (repo, _dir) = repo().await;
        let record = sample();
        repo.insert(&record).await.unwrap();
        let found = repo.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.name, record.name);
        assert_eq!(found.file_hash, record.file_hash);
    }

    #[tokio::test]
    async fn duplicate_hash_is_rejected() {
        let (repo, _dir) = repo().await;
        let a = sample();
        let mut b = sample();
        b.id = ImageId::new();
        repo.insert(&a).await.unwrap();
        let result = repo.insert(&b).await;
        assert!(matches!(result, Err(VaultError::DuplicateContent)));
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let (repo, _dir) = repo().await;
        let record = sample();
        repo.insert(&record).await.unwrap();
        assert!(repo.delete(record.id).await.unwrap());
        assert!(repo.find_by_id(record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn totals_accumulate_across_records() {
        let (repo, _dir) = repo().await;
        let mut a = sample();
        a.file_hash = FileHash::of_bytes(b"a");
        let mut b = sample();
        b.id = ImageId::new();
        b.file_hash = FileHash::of_bytes(b"b");
        repo.insert(&a).await.unwrap();
        repo.insert(&b).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.total_original_size().await.unwrap(), 200);
    }
}
