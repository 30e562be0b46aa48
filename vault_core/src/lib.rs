// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Vault Core
//!
//! Application and infrastructure layers for a local, single-user encrypted
//! image vault. Pure business rules live in `vault-domain`; this crate
//! supplies the concrete adapters for crypto, storage, audit, search, and
//! image intake, the `Core` facade that orchestrates them, and the
//! command-gateway binary that exposes `Core` to a CLI caller as a JSON
//! envelope.
//!
//! ## Layers
//!
//! - [`application`] — the `Core` facade and the `SessionManager` that
//!   couples the domain's lock/session state machine to the crypto
//!   controller's key lifecycle.
//! - [`infrastructure`] — `CryptoController` (AES-256-GCM + PBKDF2-HMAC-SHA512),
//!   `SqliteImageRepository`, `JsonlAuditLog`, `RegexSearchEngine`,
//!   `ImageIntake`, and `VaultManager` (on-disk tree layout).
//! - [`presentation`] — envelope construction and command dispatch for the
//!   `vault` binary (`src/main.rs`).
//!
//! Dependency direction is one-directional: `Crypto ← Tag Codec ← Intake ←
//! Storage ← Core`, with the audit log injected into `Core` as a sink.

pub mod application;
pub mod infrastructure;
pub mod presentation;

// Tests are organized as:
// - Unit tests: #[cfg(test)] modules within each source file
// - Integration tests: separate files in tests/ directory

pub use crate::application::{Core, SessionManager};
pub use vault_domain::{ImageRecord, SessionState, VaultConfig, VaultError, VaultKeyParams};
