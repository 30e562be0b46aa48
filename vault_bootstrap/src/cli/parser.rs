// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Structure
//!
//! Defines the raw `clap`-parsed command line (`spec.md` §4.8/§6): only
//! `command` and `--vault-path` travel as argv. Every other payload field
//! (`password`, `file_contents`, `tags`, `metadata`, `image_id`, `decrypt`,
//! `limit`, `offset`, `query`) arrives as one JSON object read from stdin,
//! so it never shows up in `ps` output or shell history.

use clap::Parser;
use std::path::PathBuf;

/// Encrypted image vault command-line interface
#[derive(Parser, Debug)]
#[command(name = "vault", version, about = "Local encrypted image vault")]
pub struct Cli {
    /// Gateway command name (e.g. `initialize`, `add-image`, `get-stats`)
    pub command: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to an optional vault configuration override file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Vault directory (defaults to the current directory)
    #[arg(long, global = true)]
    pub vault_path: Option<PathBuf>,
}

/// Parse CLI arguments
///
/// # Panics
///
/// Clap exits the process with a usage message if parsing fails.
pub fn parse_cli() -> Cli {
    Cli::parse()
}
