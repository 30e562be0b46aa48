//! # Vault Domain
//!
//! Core business logic for the encrypted image vault. Entities, value
//! objects, domain services (ports), and the error taxonomy live here,
//! independent of any database, filesystem, or wire format.
//!
//! ## Entities
//!
//! Objects with identity that change state over time:
//!
//! - `ImageRecord`: one stored blob's metadata
//! - `SessionState`: the Locked/Unlocked/LockedOut state machine
//! - `VaultConfig`: vault-wide policy
//! - `VaultKeyParams`: KDF parameters and the password-verification canary
//!
//! ## Value Objects
//!
//! Immutable, self-validating types with no identity:
//!
//! - `ImageId`: a UUID-backed stable identifier
//! - `FileHash`: a validated SHA-512 hex digest
//! - `MimeType`: a validated `image/*` MIME string
//! - `TagSet`: a normalized, sorted, deduplicated tag collection
//!
//! The nonce/ciphertext framing prefixed to stored blobs is an
//! infrastructure concern (`vault_core`'s `CryptoController::seal_under`/
//! `open_under`), not a domain value object: the `aes-gcm` crate's combined
//! output is `nonce ‖ ciphertext-with-appended-tag`, so there is no
//! fixed-offset header to parse ahead of the ciphertext.
//!
//! ## Domain Services
//!
//! Ports the infrastructure layer implements — `CryptoService`,
//! `TagCodecService`, `ImageRepository`, `AuditSink`, `SearchService`. The
//! domain depends only on these traits, never on a concrete adapter.
//!
//! ## Error Handling
//!
//! `VaultError` covers the full failure taxonomy: input validation, session
//! state, authentication, storage, I/O, and integrity failures. Password and
//! AEAD-tag-mismatch failures render identically via `public_message()` to
//! avoid giving callers an authentication oracle.

pub mod entities;
pub mod error;
pub mod services;
pub mod value_objects;

pub use entities::{ImageRecord, SessionState, VaultConfig, VaultKeyParams};
pub use error::VaultError;
pub use value_objects::{FileHash, ImageId, MimeType, TagSet};
