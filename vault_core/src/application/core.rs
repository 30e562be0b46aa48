// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Core Facade (`spec.md` §4.9): thin orchestration over the crypto
//! controller, storage, intake, tag codec, audit log, and search engine.
//! Enforces that no data-plane operation runs unless the vault is
//! unlocked, and that every state-changing operation emits an audit event.
//!
//! Dependency direction follows §9's source-pattern re-architecture note:
//! `Crypto ← Tag Codec ← Intake ← Storage ← Core`, one-directional, with the
//! Audit Log injected as a sink rather than a back-reference.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vault_domain::error::VaultError;
use vault_domain::services::{AuditEvent, AuditSink, CryptoService, ImageRepository, SearchQuery, SearchService, TagCodecService};
use vault_domain::{ImageRecord, VaultConfig};

use crate::application::SessionManager;
use crate::infrastructure::adapters::{CryptoController, JsonTagCodec};
use crate::infrastructure::audit::JsonlAuditLog;
use crate::infrastructure::intake::{ImageIntake, IntakeRequest};
use crate::infrastructure::repositories::schema::initialize_database;
use crate::infrastructure::repositories::SqliteImageRepository;
use crate::infrastructure::search::RegexSearchEngine;
use crate::infrastructure::vault_manager::{IntegrityReport, VaultManager, VaultStats};

/// Response shape for `get_image`: either the decrypted bytes alongside the
/// record, or the record alone when the caller didn't ask to decrypt.
pub enum ImageLookup {
    Decrypted { record: ImageRecord, bytes: Vec<u8> },
    MetadataOnly(ImageRecord),
}

/// Policy knobs the gateway binary resolves from CLI flags or defaults
/// before opening a `Core`.
#[derive(Debug, Clone, Copy)]
pub struct CorePolicy {
    pub idle_timeout: Duration,
    pub max_failed_attempts: u32,
    pub lockout_duration: Duration,
}

pub struct Core {
    vault_manager: VaultManager,
    session: SessionManager,
    crypto: Arc<dyn CryptoService>,
    repository: Arc<dyn ImageRepository>,
    tag_codec: Arc<dyn TagCodecService>,
    audit: Arc<dyn AuditSink>,
    intake: ImageIntake,
    search: RegexSearchEngine,
    pool: sqlx::SqlitePool,
}

fn db_err(e: sqlx::Error) -> VaultError {
    VaultError::storage(e.to_string())
}

impl Core {
    /// Creates a fresh vault tree, derives keys under `password`, and
    /// persists `vault.config`/`vault.key`. Fails if a vault already exists.
    pub async fn initialize(root: impl Into<PathBuf>, password: &str) -> Result<VaultConfig, VaultError> {
        let vault_manager = VaultManager::new(root.into());
        let crypto = CryptoController::new();
        let (salt, canary) = crypto.initialize(password).await?;
        let params = vault_domain::VaultKeyParams::new(salt, canary);
        let config = vault_manager.create_vault(&params)?;

        let db_url = format!("sqlite://{}", vault_manager.database_path().display());
        let pool = initialize_database(&db_url).await.map_err(db_err)?;
        let audit = JsonlAuditLog::new(vault_manager.audit_log_path());

        set_meta(&pool, "vault_id", &config.vault_id).await?;
        set_meta(&pool, "version", &config.version).await?;
        set_meta(&pool, "created_at", &config.created_at.to_rfc3339()).await?;
        set_meta(&pool, "last_opened", &config.created_at.to_rfc3339()).await?;

        sanity_check(&pool).await?;
        audit.append(AuditEvent::new("sanity_check", "ok")).await?;

        audit
            .append(AuditEvent::new("initialize", "ok").with("vault_id", config.vault_id.as_str()))
            .await?;
        drop(pool);

        Ok(config)
    }

    pub fn vault_exists(root: impl AsRef<Path>) -> bool {
        VaultManager::new(root.as_ref()).vault_exists()
    }

    /// Opens an existing vault: connects the database, loads KDF params
    /// into the crypto controller (still locked), and restores the
    /// lockout counters persisted in `vault_meta`.
    pub async fn open(root: impl Into<PathBuf>, policy: CorePolicy) -> Result<Self, VaultError> {
        let vault_manager = VaultManager::new(root.into());
        if !vault_manager.vault_exists() {
            return Err(VaultError::NotInitialized);
        }

        let key_params = vault_manager.get_key_params()?;
        let crypto: Arc<dyn CryptoService> = Arc::new(CryptoController::new());
        crypto.load_params(&key_params.salt, &key_params.canary).await?;

        let db_url = format!("sqlite://{}", vault_manager.database_path().display());
        let pool = initialize_database(&db_url).await.map_err(db_err)?;

        let repository: Arc<dyn ImageRepository> = Arc::new(SqliteImageRepository::new(pool.clone()));
        let tag_codec: Arc<dyn TagCodecService> = Arc::new(JsonTagCodec::new(crypto.clone()));
        let audit: Arc<dyn AuditSink> = Arc::new(JsonlAuditLog::new(vault_manager.audit_log_path()));
        let config = vault_manager.get_config()?;

        let intake = ImageIntake::new(
            crypto.clone(),
            tag_codec.clone(),
            repository.clone(),
            vault_manager.data_dir(),
            vault_manager.thumbnails_dir(),
            config.max_file_size_bytes,
            config.accepted_mime_prefixes.clone(),
        );

        let session = SessionManager::new(
            crypto.clone(),
            policy.idle_timeout,
            policy.max_failed_attempts,
            policy.lockout_duration,
        );
        let (failed_attempts, lockout_until) = load_lockout(&pool).await?;
        session.seed_lockout(failed_attempts, lockout_until);

        Ok(Self {
            vault_manager,
            session,
            crypto,
            repository,
            tag_codec,
            audit,
            intake,
            search: RegexSearchEngine::new(),
            pool,
        })
    }

    pub fn is_locked(&self) -> bool {
        !self.session.is_unlocked()
    }

    pub async fn unlock(&self, password: &str) -> Result<(), VaultError> {
        let result = self.session.unlock(password).await;
        let (failed_attempts, lockout_until) = self.session.lockout_snapshot();
        save_lockout(&self.pool, failed_attempts, lockout_until).await?;
        if result.is_ok() {
            set_meta(&self.pool, "last_opened", &Utc::now().to_rfc3339()).await?;
        }

        let status = if result.is_ok() { "ok" } else { "failed" };
        self.audit
            .append(
                AuditEvent::new("unlock", status)
                    .with("failed_attempts", failed_attempts.to_string())
                    .with_session(self.session.session_id()),
            )
            .await?;
        result
    }

    pub async fn lock(&self) -> Result<(), VaultError> {
        let session_id = self.session.session_id();
        self.session.lock();
        self.vault_manager.cleanup_temp()?;
        self.audit.append(AuditEvent::new("lock", "ok").with_session(session_id)).await?;
        Ok(())
    }

    pub async fn add_image(
        &self,
        plaintext: Vec<u8>,
        original_filename: String,
        tags: Vec<String>,
        extra_metadata: HashMap<String, String>,
    ) -> Result<ImageRecord, VaultError> {
        self.session.require_unlocked()?;
        let result = self
            .intake
            .add_image(IntakeRequest {
                plaintext,
                original_filename,
                tags,
                extra_metadata,
            })
            .await;

        let status = if result.is_ok() { "ok" } else { "failed" };
        self.audit
            .append(AuditEvent::new("add_image", status).with_session(self.session.session_id()))
            .await?;
        result
    }

    pub async fn get_image(&self, id: vault_domain::value_objects::ImageId, decrypt: bool) -> Result<ImageLookup, VaultError> {
        self.session.require_unlocked()?;
        let record = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| VaultError::input("image not found"))?;

        if !decrypt {
            return Ok(ImageLookup::MetadataOnly(record));
        }
        let bytes = self.crypto.decrypt_to_memory(Path::new(&record.encrypted_path)).await?;
        Ok(ImageLookup::Decrypted { record, bytes })
    }

    pub async fn get_all_images(&self, offset: u32, limit: u32) -> Result<Vec<ImageRecord>, VaultError> {
        self.session.require_unlocked()?;
        self.repository.list_paginated(offset, limit).await
    }

    pub async fn search_images(&self, query: &str) -> Result<Vec<ImageRecord>, VaultError> {
        self.session.require_unlocked()?;

        let mut projections = Vec::new();
        let mut offset = 0u32;
        const PAGE: u32 = 500;
        loop {
            let page = self.repository.list_paginated(offset, PAGE).await?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len();
            for record in page {
                let tags = self.tag_codec.decode_tags(&record.encrypted_tags).await?;
                let metadata = self.tag_codec.decode_metadata(&record.encrypted_metadata).await?;
                projections.push(vault_domain::services::SearchProjection { record, tags, metadata });
            }
            if page_len < PAGE as usize {
                break;
            }
            offset += PAGE;
        }

        self.search.search(&SearchQuery::new(query), &projections).await
    }

    pub async fn delete_image(&self, id: vault_domain::value_objects::ImageId) -> Result<(), VaultError> {
        self.session.require_unlocked()?;
        let result = self.intake.delete_image(id).await;
        let status = if result.is_ok() { "ok" } else { "failed" };
        self.audit
            .append(
                AuditEvent::new("delete_image", status)
                    .with("image_id", id.to_string())
                    .with_session(self.session.session_id()),
            )
            .await?;
        result
    }

    pub async fn get_stats(&self) -> Result<VaultStats, VaultError> {
        self.session.require_unlocked()?;
        self.vault_manager.get_stats(self.repository.as_ref()).await
    }

    pub async fn validate_integrity(&self) -> Result<IntegrityReport, VaultError> {
        self.vault_manager.validate_integrity(self.repository.as_ref()).await
    }

    pub async fn verify_audit_integrity(&self) -> Result<u64, VaultError> {
        self.audit.verify_integrity().await
    }

    /// Decrypts the tag set and metadata map carried by a record, for
    /// callers that need the plaintext view rather than raw ciphertext.
    pub async fn decode_tags_and_metadata(
        &self,
        record: &ImageRecord,
    ) -> Result<(vault_domain::value_objects::TagSet, HashMap<String, String>), VaultError> {
        let tags = self.tag_codec.decode_tags(&record.encrypted_tags).await?;
        let metadata = self.tag_codec.decode_metadata(&record.encrypted_metadata).await?;
        Ok((tags, metadata))
    }

    pub fn vault_config(&self) -> Result<VaultConfig, VaultError> {
        self.vault_manager.get_config()
    }
}

async fn set_meta(pool: &sqlx::SqlitePool, key: &str, value: &str) -> Result<(), VaultError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO vault_meta (key, value, last_updated) VALUES (?, ?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, last_updated = excluded.last_updated",
    )
    .bind(key)
    .bind(value)
    .bind(&now)
    .execute(pool)
    .await
    .map_err(db_err)?;
    Ok(())
}

/// Writes and reads back a throwaway `vault_meta` row, failing initialization
/// loudly if the freshly created database cannot round-trip a value.
async fn sanity_check(pool: &sqlx::SqlitePool) -> Result<(), VaultError> {
    set_meta(pool, "sanity_check", "ok").await?;
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM vault_meta WHERE key = 'sanity_check'")
        .fetch_optional(pool)
        .await
        .map_err(db_err)?;
    if value.as_deref() != Some("ok") {
        return Err(VaultError::storage("sanity check failed: vault_meta did not round-trip"));
    }
    Ok(())
}

async fn load_lockout(pool: &sqlx::SqlitePool) -> Result<(u32, Option<DateTime<Utc>>), VaultError> {
    let failed: Option<String> = sqlx::query_scalar("SELECT value FROM vault_meta WHERE key = 'failed_attempts'")
        .fetch_optional(pool)
        .await
        .map_err(db_err)?;
    let lockout: Option<String> = sqlx::query_scalar("SELECT value FROM vault_meta WHERE key = 'lockout_until'")
        .fetch_optional(pool)
        .await
        .map_err(db_err)?;

    let failed_attempts = failed.and_then(|v| v.parse().ok()).unwrap_or(0);
    let lockout_until = lockout.and_then(|v| DateTime::parse_from_rfc3339(&v).ok()).map(|dt| dt.with_timezone(&Utc));
    Ok((failed_attempts, lockout_until))
}

async fn save_lockout(pool: &sqlx::SqlitePool, failed_attempts: u32, lockout_until: Option<DateTime<Utc>>) -> Result<(), VaultError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO vault_meta (key, value, last_updated) VALUES ('failed_attempts', ?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, last_updated = excluded.last_updated",
    )
    .bind(failed_attempts.to_string())
    .bind(&now)
    .execute(pool)
    .await
    .map_err(db_err)?;

    let lockout_value = lockout_until.map(|dt| dt.to_rfc3339()).unwrap_or_default();
    sqlx::query(
        "INSERT INTO vault_meta (key, value, last_updated) VALUES ('lockout_until', ?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, last_updated = excluded.last_updated",
    )
    .bind(lockout_value)
    .bind(&now)
    .execute(pool)
    .await
    .map_err(db_err)?;

    Ok(())
}
