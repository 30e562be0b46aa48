// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the enterprise application layers
//! (domain, application, infrastructure) and provides the entry-point
//! concerns for the `vault` command-gateway binary:
//!
//! - **Argument parsing** - secure, validated CLI argument handling
//! - **Configuration** - vault-wide policy defaults (PBKDF2 iterations,
//!   idle timeout, lockout duration, max failed attempts)
//! - **Exit codes** - BSD `sysexits.h`-style mapping for the CLI-parse
//!   failure path
//!
//! ## Architecture Position
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          BOOTSTRAP (This Module)            │
//! │  - Entry Point                              │
//! │  - Secure Arg Parsing                       │
//! │  - Exit Code Mapping                        │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │         vault-core (application +           │
//! │         infrastructure + presentation)      │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │           vault-domain                      │
//! │  - Business Logic                           │
//! │  - Domain Services                          │
//! │  - Entities & Value Objects                 │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Each invocation of the `vault` binary is a short-lived, one-shot process:
//! it parses one command, dispatches it, prints one JSON envelope, and
//! exits. There is no long-running server loop to shut down gracefully and
//! no OS-abstraction surface beyond what `std` already provides, so this
//! module stays limited to argument parsing, configuration defaults, and
//! exit-code mapping. The async runtime lives one layer up, in `vault-core`'s
//! `main`, where the parsed `ValidatedCli` is actually dispatched.
//!
//! ## Usage Example
//!
//! ```no_run
//! use vault_bootstrap::{bootstrap_cli, ExitCode as BootstrapExitCode};
//!
//! fn main() -> std::process::ExitCode {
//!     let validated_cli = match bootstrap_cli() {
//!         Ok(cli) => cli,
//!         Err(e) => {
//!             eprintln!("CLI Error: {}", e);
//!             return std::process::ExitCode::from(BootstrapExitCode::UsageError.as_i32() as u8);
//!         }
//!     };
//!
//!     // Dispatch `validated_cli` against the Core facade here.
//!     std::process::ExitCode::SUCCESS
//! }
//! ```
//!
//! ## Module Structure
//!
//! - `cli` - secure argument parsing (raw clap parser + validator)
//! - `config` - vault-wide policy defaults
//! - `exit_code` - BSD `sysexits.h`-style exit code enumeration

pub mod cli; // Now a module directory with parser and validator
pub mod config;
pub mod exit_code;

// Re-export commonly used types
pub use cli::{parse_and_validate, RequestPayload, ValidatedCli, ValidatedCommand};
pub use exit_code::{map_error_to_exit_code, result_to_exit_code, ExitCode};

/// Bootstrap and parse CLI arguments
///
/// This is the main entry point for the bootstrap layer.
/// It handles:
/// 1. CLI parsing with clap
/// 2. Security validation
/// 3. Returns validated configuration
///
/// # Errors
///
/// Returns `cli::ParseError` if CLI parsing or validation fails.
/// Clap will handle --help and --version automatically and exit the process.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
