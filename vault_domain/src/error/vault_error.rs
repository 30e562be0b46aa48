// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Vault Error
//!
//! The error hierarchy shared by every layer of the vault. Variants mirror
//! the taxonomy of state, authentication, storage, I/O, and integrity
//! failures a single-user encrypted vault can hit, and translate cleanly
//! into the gateway's `{success, error, details?}` envelope.
//!
//! `BadPassword` and `AuthenticationTagMismatch` render with identical text
//! on purpose — the wire representation must not let a caller distinguish a
//! wrong password from a tampered canary.

use thiserror::Error;

/// Errors produced anywhere in the vault domain, application, or
/// infrastructure layers.
#[derive(Error, Debug, Clone)]
pub enum VaultError {
    /// Malformed arguments, unknown command, unsupported MIME, file too large.
    #[error("invalid input: {0}")]
    InputError(String),

    /// No vault tree found at the configured path.
    #[error("vault is not initialized")]
    NotInitialized,

    /// A data-plane operation was attempted while the vault is locked.
    #[error("vault is not unlocked")]
    NotUnlocked,

    /// Too many consecutive failed unlock attempts.
    #[error("vault is locked out for {remaining_secs} more seconds")]
    LockedOut { remaining_secs: u64 },

    /// The unlocked session's idle timeout elapsed.
    #[error("session expired")]
    SessionExpired,

    /// Wrong master password: the derived key failed to open the canary.
    /// Reported to the caller with the same wording as
    /// `AuthenticationTagMismatch` to avoid an authentication oracle; the
    /// two are recorded distinctly in the audit log for forensics.
    #[error("authentication failed")]
    BadPassword,

    /// AEAD tag verification failed on an already-unlocked data-plane
    /// operation (a tampered blob, tag ciphertext, or metadata ciphertext)
    /// rather than during password verification itself. Same public
    /// wording as `BadPassword`, distinct audit-log category.
    #[error("authentication failed")]
    AuthenticationTagMismatch,

    /// DB I/O, schema mismatch, or constraint violation.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Attempted to add a file whose content hash already exists.
    #[error("duplicate content: an image with this content already exists")]
    DuplicateContent,

    /// Filesystem error: permissions, missing path, disk full.
    #[error("i/o error: {0}")]
    IoError(String),

    /// Audit-log hash mismatch, orphan blob, or corrupted entry.
    #[error("integrity error: {0}")]
    IntegrityError(String),

    /// Any unreachable path; surfaced to the caller as a generic failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VaultError {
    pub fn input(msg: impl Into<String>) -> Self {
        VaultError::InputError(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        VaultError::StorageError(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        VaultError::IoError(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        VaultError::IntegrityError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        VaultError::Internal(msg.into())
    }

    /// Wire-facing message. `BadPassword` and tag-mismatch both return
    /// exactly this string so no caller can use wording to distinguish them.
    pub fn public_message(&self) -> String {
        match self {
            VaultError::BadPassword | VaultError::AuthenticationTagMismatch => "authentication failed".to_string(),
            other => other.to_string(),
        }
    }

    /// Coarse category, used for audit-log classification (never surfaced
    /// verbatim to the gateway caller — see `public_message`).
    pub fn category(&self) -> &'static str {
        match self {
            VaultError::InputError(_) => "input",
            VaultError::NotInitialized | VaultError::NotUnlocked | VaultError::SessionExpired => "state",
            VaultError::LockedOut { .. } => "state",
            VaultError::BadPassword => "auth_bad_password",
            VaultError::AuthenticationTagMismatch => "auth_tag_mismatch",
            VaultError::StorageError(_) | VaultError::DuplicateContent => "storage",
            VaultError::IoError(_) => "io",
            VaultError::IntegrityError(_) => "integrity",
            VaultError::Internal(_) => "internal",
        }
    }

    /// Whether the caller can reasonably retry (e.g. after waiting out a
    /// lockout or restoring disk space), as opposed to a hard failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VaultError::LockedOut { .. } | VaultError::SessionExpired | VaultError::IoError(_)
        )
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::StorageError(format!("json: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_password_and_tag_mismatch_render_identically() {
        let bad_password = VaultError::BadPassword;
        let tag_mismatch = VaultError::AuthenticationTagMismatch;
        assert_eq!(bad_password.public_message(), tag_mismatch.public_message());
    }

    #[test]
    fn bad_password_and_tag_mismatch_have_distinct_audit_categories() {
        assert_ne!(VaultError::BadPassword.category(), VaultError::AuthenticationTagMismatch.category());
    }

    #[test]
    fn category_groups_state_errors() {
        assert_eq!(VaultError::NotUnlocked.category(), "state");
        assert_eq!(VaultError::LockedOut { remaining_secs: 5 }.category(), "state");
    }

    #[test]
    fn lockout_and_idle_are_recoverable() {
        assert!(VaultError::LockedOut { remaining_secs: 1 }.is_recoverable());
        assert!(VaultError::SessionExpired.is_recoverable());
        assert!(!VaultError::BadPassword.is_recoverable());
    }
}
