// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse()                 │  `command` + `--vault-path` via clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. read_payload()                  │  Everything else via stdin JSON
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  4. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! Only `command` and `--vault-path` are ever passed as process arguments
//! (`spec.md` §4.8/§6) — the master password and every other payload field
//! travel in a single JSON object read from stdin, so they never appear in
//! `ps` output or shell history.
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli};
pub use validator::{ParseError, SecureArgParser};

use std::collections::HashMap;
use std::io::Read as _;
use std::path::PathBuf;

/// Validated CLI configuration
///
/// This structure holds all CLI arguments after security validation.
/// Existing paths are canonicalized; paths for not-yet-created vaults are
/// pattern-checked but left relative to the caller's working directory.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub vault_path: PathBuf,
}

/// Validated command variants, one per gateway command (spec.md §6)
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Initialize {
        password: String,
    },
    Unlock {
        password: String,
    },
    Lock,
    GetVaultStatus,
    VaultExists,
    AddImage {
        file_contents: Vec<u8>,
        tags: Vec<String>,
        metadata: HashMap<String, String>,
    },
    GetImage {
        image_id: String,
        decrypt: bool,
    },
    GetAllImages {
        limit: Option<u32>,
        offset: Option<u32>,
    },
    SearchImages {
        query: String,
        tags: Vec<String>,
    },
    DeleteImage {
        image_id: String,
    },
    GetStats,
}

/// The stdin payload (`spec.md` §6): everything about a command beyond its
/// name and the vault path. Every field is optional here; each command
/// variant in [`validate_cli`] checks for the fields it actually needs.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RequestPayload {
    pub password: Option<String>,
    pub file_contents: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<HashMap<String, String>>,
    pub image_id: Option<String>,
    pub decrypt: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub query: Option<String>,
}

/// Reads the stdin payload (spec.md §6). Commands that need no payload
/// (`lock`, `get_vault_status`, `vault_exists`, `get_stats`) may be invoked
/// with an empty stdin; that deserializes to an all-`None` payload.
fn read_payload() -> Result<RequestPayload, ParseError> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .map_err(|e| ParseError::InvalidValue { arg: "stdin".to_string(), reason: e.to_string() })?;

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(RequestPayload::default());
    }

    serde_json::from_str(trimmed)
        .map_err(|e| ParseError::InvalidValue { arg: "stdin".to_string(), reason: e.to_string() })
}

/// Parse and validate CLI arguments plus the stdin payload
///
/// 1. Parse `command` + `--vault-path` with clap
/// 2. Read the stdin JSON payload
/// 3. Validate all paths and payload fields with `SecureArgParser`
/// 4. Return `ValidatedCli` on success
///
/// # Errors
///
/// Returns `ParseError` if parsing, stdin deserialization, or validation fails
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    let payload = read_payload()?;
    validate_cli(cli, payload)
}

fn require_password(payload: &RequestPayload) -> Result<String, ParseError> {
    match &payload.password {
        Some(p) if !p.is_empty() => Ok(p.clone()),
        _ => Err(ParseError::MissingArgument("password".to_string())),
    }
}

fn validate_tag_list(tags: Option<Vec<String>>) -> Result<Vec<String>, ParseError> {
    tags.unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .map(|t| {
            SecureArgParser::validate_argument(&t)?;
            Ok(t)
        })
        .collect()
}

fn validate_metadata(metadata: Option<HashMap<String, String>>) -> Result<HashMap<String, String>, ParseError> {
    let metadata = metadata.unwrap_or_default();
    for value in metadata.values() {
        SecureArgParser::validate_argument(value)?;
    }
    Ok(metadata)
}

/// Validate the parsed CLI arguments and stdin payload together
///
/// # Errors
///
/// Returns `ParseError` if any validation fails
fn validate_cli(cli: Cli, payload: RequestPayload) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        SecureArgParser::validate_argument(&path.to_string_lossy())?;
        Some(path.clone())
    } else {
        None
    };

    let vault_path = match cli.vault_path {
        Some(path) => SecureArgParser::validate_new_path(&path.to_string_lossy())?,
        None => PathBuf::from("."),
    };

    let command = match cli.command.as_str() {
        "initialize" => ValidatedCommand::Initialize { password: require_password(&payload)? },
        "unlock" => ValidatedCommand::Unlock { password: require_password(&payload)? },
        "lock" => ValidatedCommand::Lock,
        "get_vault_status" | "get-vault-status" => ValidatedCommand::GetVaultStatus,
        "vault_exists" | "vault-exists" => ValidatedCommand::VaultExists,
        "add_image" | "add-image" => {
            let encoded = payload.file_contents.ok_or_else(|| ParseError::MissingArgument("file_contents".to_string()))?;
            use base64::engine::general_purpose::STANDARD as B64;
            use base64::Engine as _;
            let file_contents = B64
                .decode(encoded.as_bytes())
                .map_err(|e| ParseError::InvalidValue { arg: "file_contents".to_string(), reason: e.to_string() })?;

            let tags = validate_tag_list(payload.tags)?;
            let metadata = validate_metadata(payload.metadata)?;

            ValidatedCommand::AddImage { file_contents, tags, metadata }
        }
        "get_image" | "get-image" => {
            let image_id = payload.image_id.ok_or_else(|| ParseError::MissingArgument("image_id".to_string()))?;
            SecureArgParser::validate_argument(&image_id)?;
            ValidatedCommand::GetImage { image_id, decrypt: payload.decrypt.unwrap_or(false) }
        }
        "get_all_images" | "get-all-images" => {
            if let Some(limit) = payload.limit {
                if limit == 0 {
                    return Err(ParseError::InvalidValue {
                        arg: "limit".to_string(),
                        reason: "must be greater than 0".to_string(),
                    });
                }
            }
            ValidatedCommand::GetAllImages { limit: payload.limit, offset: payload.offset }
        }
        "search_images" | "search-images" => {
            let query = payload.query.ok_or_else(|| ParseError::MissingArgument("query".to_string()))?;
            SecureArgParser::validate_argument(&query)?;
            let tags = validate_tag_list(payload.tags)?;
            ValidatedCommand::SearchImages { query, tags }
        }
        "delete_image" | "delete-image" => {
            let image_id = payload.image_id.ok_or_else(|| ParseError::MissingArgument("image_id".to_string()))?;
            SecureArgParser::validate_argument(&image_id)?;
            ValidatedCommand::DeleteImage { image_id }
        }
        "get_stats" | "get-stats" => ValidatedCommand::GetStats,
        other => return Err(ParseError::InvalidValue { arg: "command".to_string(), reason: format!("unknown command `{other}`") }),
    };

    Ok(ValidatedCli { command, verbose: cli.verbose, config, vault_path })
}
