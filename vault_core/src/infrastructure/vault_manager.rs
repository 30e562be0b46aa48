// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Vault Manager (`spec.md` §4.3): owns the on-disk tree layout, the
//! plaintext `vault.config`/`vault.key` files, and integrity validation
//! across the blob store and the database.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use vault_domain::error::VaultError;
use vault_domain::services::ImageRepository;
use vault_domain::{VaultConfig, VaultKeyParams};

const CONFIG_FILE: &str = "vault.config";
const KEY_FILE: &str = "vault.key";

/// Aggregate byte/file counts reported by `get_stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultStats {
    pub image_count: u64,
    pub total_original_bytes: u64,
    pub total_encrypted_bytes: u64,
    pub thumbnail_count: u64,
}

/// `{valid, issues[]}` as returned by `validate_integrity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// Owns `<vault>/` and every mandatory entry beneath it.
pub struct VaultManager {
    root: PathBuf,
}

impl VaultManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.root.join("thumbnails")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join("metadata")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    pub fn database_dir(&self) -> PathBuf {
        self.root.join("database")
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_dir().join("vault.db")
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join("audit.log")
    }

    fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    fn key_path(&self) -> PathBuf {
        self.root.join(KEY_FILE)
    }

    /// Creates the directory tree and writes `vault.config`/`vault.key`.
    /// Fails if a vault already exists at this root.
    pub fn create_vault(&self, key_params: &VaultKeyParams) -> Result<VaultConfig, VaultError> {
        if self.vault_exists() {
            return Err(VaultError::input("vault already initialized at this path"));
        }

        for dir in [
            self.data_dir(),
            self.thumbnails_dir(),
            self.metadata_dir(),
            self.temp_dir(),
            self.backups_dir(),
            self.database_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| VaultError::io(e.to_string()))?;
        }

        let config = VaultConfig::new(Uuid::new_v4().to_string());
        self.write_config(&config)?;
        self.write_key_params(key_params)?;
        Ok(config)
    }

    /// All mandatory entries present and `vault.config` parses.
    pub fn vault_exists(&self) -> bool {
        let mandatory = [
            self.config_path(),
            self.key_path(),
            self.data_dir(),
            self.thumbnails_dir(),
            self.database_dir(),
        ];
        if !mandatory.iter().all(|p| p.exists()) {
            return false;
        }
        self.get_config().is_ok()
    }

    fn write_config(&self, config: &VaultConfig) -> Result<(), VaultError> {
        let json = serde_json::to_vec_pretty(config)?;
        std::fs::write(self.config_path(), json).map_err(|e| VaultError::io(e.to_string()))
    }

    fn write_key_params(&self, params: &VaultKeyParams) -> Result<(), VaultError> {
        let json = serde_json::to_vec_pretty(params)?;
        std::fs::write(self.key_path(), json).map_err(|e| VaultError::io(e.to_string()))
    }

    pub fn get_config(&self) -> Result<VaultConfig, VaultError> {
        let bytes = std::fs::read(self.config_path()).map_err(|e| VaultError::io(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn get_key_params(&self) -> Result<VaultKeyParams, VaultError> {
        let bytes = std::fs::read(self.key_path()).map_err(|e| VaultError::io(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read-modify-write `vault.config`, touching `modified_at`.
    pub fn update_config(&self, mutate: impl FnOnce(&mut VaultConfig)) -> Result<VaultConfig, VaultError> {
        let mut config = self.get_config()?;
        mutate(&mut config);
        config.touch();
        self.write_config(&config)?;
        Ok(config)
    }

    /// Removes every entry under `temp/`, called on lock.
    pub fn cleanup_temp(&self) -> Result<(), VaultError> {
        let temp = self.temp_dir();
        if !temp.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&temp).map_err(|e| VaultError::io(e.to_string()))? {
            let entry = entry.map_err(|e| VaultError::io(e.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path).map_err(|e| VaultError::io(e.to_string()))?;
            } else {
                std::fs::remove_file(&path).map_err(|e| VaultError::io(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn count_dir(dir: &Path) -> std::io::Result<(u64, u64)> {
        if !dir.exists() {
            return Ok((0, 0));
        }
        let mut count = 0u64;
        let mut bytes = 0u64;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                count += 1;
                bytes += entry.metadata()?.len();
            }
        }
        Ok((count, bytes))
    }

    /// File counts and byte totals across the blob store, computed from the
    /// database rather than the filesystem for original/encrypted sizes, and
    /// from the filesystem for the thumbnail count.
    pub async fn get_stats(&self, repository: &dyn ImageRepository) -> Result<VaultStats, VaultError> {
        let image_count = repository.count().await?;
        let total_original_bytes = repository.total_original_size().await?;
        let total_encrypted_bytes = repository.total_encrypted_size().await?;
        let (thumbnail_count, _) =
            Self::count_dir(&self.thumbnails_dir()).map_err(|e| VaultError::io(e.to_string()))?;

        Ok(VaultStats {
            image_count,
            total_original_bytes,
            total_encrypted_bytes,
            thumbnail_count,
        })
    }

    /// Enumerates missing mandatory entries and orphan blobs under `data/`
    /// that no database row references.
    pub async fn validate_integrity(&self, repository: &dyn ImageRepository) -> Result<IntegrityReport, VaultError> {
        let mut issues = Vec::new();

        for (label, path) in [
            ("vault.config", self.config_path()),
            ("vault.key", self.key_path()),
            ("data/", self.data_dir()),
            ("thumbnails/", self.thumbnails_dir()),
            ("database/vault.db", self.database_path()),
        ] {
            if !path.exists() {
                issues.push(format!("missing required entry: {}", label));
            }
        }

        if self.data_dir().exists() {
            let mut referenced = std::collections::HashSet::new();
            let page_size = 500u32;
            let mut offset = 0u32;
            loop {
                let page = repository.list_paginated(offset, page_size).await?;
                if page.is_empty() {
                    break;
                }
                for record in &page {
                    referenced.insert(PathBuf::from(&record.encrypted_path));
                }
                if page.len() < page_size as usize {
                    break;
                }
                offset += page_size;
            }

            if let Ok(entries) = std::fs::read_dir(self.data_dir()) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_file() && !referenced.contains(&path) {
                        issues.push(format!("orphan blob not referenced by any row: {}", path.display()));
                    }
                }
            }
        }

        Ok(IntegrityReport {
            valid: issues.is_empty(),
            issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_params() -> VaultKeyParams {
        VaultKeyParams::new("c2FsdA==".to_string(), "Y2FuYXJ5".to_string())
    }

    #[test]
    fn create_vault_lays_out_mandatory_tree() {
        let dir = tempdir().unwrap();
        let manager = VaultManager::new(dir.path());
        manager.create_vault(&sample_params()).unwrap();

        assert!(manager.data_dir().exists());
        assert!(manager.thumbnails_dir().exists());
        assert!(manager.database_dir().exists());
        assert!(manager.vault_exists());
    }

    #[test]
    fn create_vault_twice_fails() {
        let dir = tempdir().unwrap();
        let manager = VaultManager::new(dir.path());
        manager.create_vault(&sample_params()).unwrap();
        assert!(manager.create_vault(&sample_params()).is_err());
    }

    #[test]
    fn vault_exists_is_false_before_creation() {
        let dir = tempdir().unwrap();
        let manager = VaultManager::new(dir.path());
        assert!(!manager.vault_exists());
    }

    #[test]
    fn update_config_persists_and_touches_modified_at() {
        let dir = tempdir().unwrap();
        let manager = VaultManager::new(dir.path());
        manager.create_vault(&sample_params()).unwrap();
        let original = manager.get_config().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let updated = manager
            .update_config(|c| c.max_file_size_bytes = 42)
            .unwrap();

        assert_eq!(updated.max_file_size_bytes, 42);
        assert!(updated.modified_at >= original.modified_at);
        assert_eq!(manager.get_config().unwrap().max_file_size_bytes, 42);
    }

    #[test]
    fn cleanup_temp_removes_scratch_files() {
        let dir = tempdir().unwrap();
        let manager = VaultManager::new(dir.path());
        manager.create_vault(&sample_params()).unwrap();
        std::fs::write(manager.temp_dir().join("scratch.bin"), b"x").unwrap();

        manager.cleanup_temp().unwrap();
        assert_eq!(std::fs::read_dir(manager.temp_dir()).unwrap().count(), 0);
    }
}
