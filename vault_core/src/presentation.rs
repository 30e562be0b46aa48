// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Command Gateway (`spec.md` §4.8/§6): translates one validated CLI
//! invocation into a `Core` call and renders the result as the fixed
//! `{success, …payload, error?, details?}` JSON envelope.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde_json::{json, Value};
use std::str::FromStr;

use vault_bootstrap::{ValidatedCli, ValidatedCommand};
use vault_domain::error::VaultError;
use vault_domain::value_objects::ImageId;
use vault_domain::ImageRecord;

use crate::application::core::{Core, CorePolicy, ImageLookup};

fn error_envelope(err: &VaultError) -> Value {
    let mut body = json!({
        "success": false,
        "error": err.public_message(),
    });
    if let VaultError::LockedOut { remaining_secs } = err {
        body["details"] = json!({ "lockout_remaining_seconds": remaining_secs });
    }
    body
}

async fn image_record_json(core: &Core, record: &ImageRecord) -> Result<Value, VaultError> {
    let (tags, metadata) = core.decode_tags_and_metadata(record).await?;
    Ok(json!({
        "id": record.id.to_string(),
        "name": record.name,
        "original_size": record.original_size,
        "encrypted_size": record.encrypted_size,
        "mime_type": record.mime_type.as_str(),
        "file_hash": record.file_hash.as_str(),
        "date_added": record.date_added,
        "date_modified": record.date_modified,
        "tags": tags.as_slice(),
        "metadata": metadata,
        "thumbnail_path": record.thumbnail_path,
        "is_encrypted": record.is_encrypted,
    }))
}

fn parse_image_id(raw: &str) -> Result<ImageId, VaultError> {
    ImageId::from_str(raw)
}

/// Runs the command named by `cli.command` against the vault rooted at
/// `cli.vault_path`, returning the response envelope. Never panics: every
/// failure path renders as `{success: false, error, details?}`.
pub async fn dispatch(cli: ValidatedCli, policy: CorePolicy) -> Value {
    match run(cli, policy).await {
        Ok(payload) => payload,
        Err(err) => error_envelope(&err),
    }
}

async fn run(cli: ValidatedCli, policy: CorePolicy) -> Result<Value, VaultError> {
    let vault_path = cli.vault_path.clone();

    match cli.command {
        ValidatedCommand::Initialize { password } => {
            let config = Core::initialize(vault_path, &password).await?;
            Ok(json!({
                "success": true,
                "message": format!("vault initialized: {}", config.vault_id),
            }))
        }

        ValidatedCommand::VaultExists => Ok(json!({
            "success": true,
            "data": { "exists": Core::vault_exists(&vault_path) },
        })),

        ValidatedCommand::GetVaultStatus => {
            let exists = Core::vault_exists(&vault_path);
            let is_locked = if exists {
                match Core::open(vault_path.clone(), policy).await {
                    Ok(core) => core.is_locked(),
                    Err(_) => true,
                }
            } else {
                true
            };
            Ok(json!({
                "success": true,
                "vault_exists": exists,
                "is_locked": is_locked,
                "vault_path": vault_path.display().to_string(),
                "message": if exists { "vault present" } else { "no vault at this path" },
            }))
        }

        ValidatedCommand::Unlock { password } => {
            let core = Core::open(vault_path, policy).await?;
            match core.unlock(&password).await {
                Ok(()) => Ok(json!({ "success": true, "message": "unlocked" })),
                Err(err) => Ok(error_envelope(&err)),
            }
        }

        ValidatedCommand::Lock => {
            let core = Core::open(vault_path, policy).await?;
            core.lock().await?;
            Ok(json!({ "success": true, "message": "locked" }))
        }

        ValidatedCommand::AddImage { file_contents, tags, metadata } => {
            let core = Core::open(vault_path, policy).await?;
            let original_filename =
                metadata.get("original_filename").cloned().unwrap_or_else(|| "upload".to_string());

            let record = core.add_image(file_contents, original_filename, tags, metadata).await?;
            Ok(json!({
                "success": true,
                "image_id": record.id.to_string(),
                "data": {
                    "id": record.id.to_string(),
                    "name": record.name,
                    "size": record.original_size,
                    "mime_type": record.mime_type.as_str(),
                },
            }))
        }

        ValidatedCommand::GetImage { image_id, decrypt } => {
            let core = Core::open(vault_path, policy).await?;
            let id = parse_image_id(&image_id)?;
            match core.get_image(id, decrypt).await? {
                ImageLookup::Decrypted { bytes, .. } => Ok(json!({
                    "success": true,
                    "image_data": B64.encode(bytes),
                })),
                ImageLookup::MetadataOnly(record) => {
                    let view = image_record_json(&core, &record).await?;
                    Ok(json!({ "success": true, "image_record": view }))
                }
            }
        }

        ValidatedCommand::GetAllImages { limit, offset } => {
            let core = Core::open(vault_path, policy).await?;
            let offset = offset.unwrap_or(0);
            let limit = limit.unwrap_or(100);
            let records = core.get_all_images(offset, limit).await?;

            let mut images = Vec::with_capacity(records.len());
            for record in &records {
                images.push(image_record_json(&core, record).await?);
            }
            let total_count = core.get_stats().await?.image_count;

            Ok(json!({ "success": true, "images": images, "total_count": total_count }))
        }

        ValidatedCommand::SearchImages { query, tags } => {
            let core = Core::open(vault_path, policy).await?;
            let full_query = if tags.is_empty() {
                query
            } else {
                format!(
                    "{} {}",
                    query,
                    tags.iter().map(|t| format!("tag:{}", t)).collect::<Vec<_>>().join(" ")
                )
            };

            let records = core.search_images(&full_query).await?;
            let mut results = Vec::with_capacity(records.len());
            for record in &records {
                results.push(image_record_json(&core, record).await?);
            }

            Ok(json!({ "success": true, "total_results": results.len(), "results": results }))
        }

        ValidatedCommand::DeleteImage { image_id } => {
            let core = Core::open(vault_path, policy).await?;
            let id = parse_image_id(&image_id)?;
            core.delete_image(id).await?;
            Ok(json!({ "success": true, "message": format!("deleted {}", image_id) }))
        }

        ValidatedCommand::GetStats => {
            let core = Core::open(vault_path, policy).await?;
            let stats = core.get_stats().await?;
            Ok(json!({ "success": true, "statistics": stats }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;
    use vault_bootstrap::ValidatedCli;

    fn policy() -> CorePolicy {
        CorePolicy {
            idle_timeout: chrono::Duration::minutes(30),
            max_failed_attempts: 3,
            lockout_duration: chrono::Duration::minutes(15),
        }
    }

    fn cli(vault_path: PathBuf, command: ValidatedCommand) -> ValidatedCli {
        ValidatedCli { command, verbose: false, config: None, vault_path }
    }

    #[tokio::test]
    async fn initialize_then_status_round_trip() {
        let dir = tempdir().unwrap();
        let init = dispatch(
            cli(dir.path().to_path_buf(), ValidatedCommand::Initialize { password: "pw".to_string() }),
            policy(),
        )
        .await;
        assert_eq!(init["success"], json!(true));

        let status = dispatch(cli(dir.path().to_path_buf(), ValidatedCommand::GetVaultStatus), policy()).await;
        assert_eq!(status["vault_exists"], json!(true));
        assert_eq!(status["is_locked"], json!(true));
    }

    #[tokio::test]
    async fn unlock_with_wrong_password_reports_failure_envelope() {
        let dir = tempdir().unwrap();
        dispatch(
            cli(dir.path().to_path_buf(), ValidatedCommand::Initialize { password: "right".to_string() }),
            policy(),
        )
        .await;

        let result = dispatch(
            cli(dir.path().to_path_buf(), ValidatedCommand::Unlock { password: "wrong".to_string() }),
            policy(),
        )
        .await;
        assert_eq!(result["success"], json!(false));
        assert!(result["error"].is_string());
    }

    #[tokio::test]
    async fn vault_exists_false_before_initialize() {
        let dir = tempdir().unwrap();
        let result = dispatch(cli(dir.path().to_path_buf(), ValidatedCommand::VaultExists), policy()).await;
        assert_eq!(result["data"]["exists"], json!(false));
    }
}
