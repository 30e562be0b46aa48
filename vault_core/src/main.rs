// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Command-gateway entry point (`spec.md` §6). Parses and validates one CLI
//! invocation, dispatches it to the `Core` facade, and writes exactly one
//! JSON document to stdout. Exit code is `0` iff the envelope's `success` is
//! `true`, `1` otherwise — tracing and diagnostics go to stderr only.

use std::process::ExitCode;

use vault_bootstrap::config::{
    DEFAULT_IDLE_TIMEOUT_MINUTES, DEFAULT_LOCKOUT_DURATION_MINUTES, DEFAULT_MAX_FAILED_ATTEMPTS,
};
use vault_bootstrap::exit_code::ExitCode as BootstrapExitCode;
use vault_bootstrap::{bootstrap_cli, ValidatedCli};
use vault_core::application::core::CorePolicy;
use vault_core::presentation::dispatch;

fn init_tracing(verbose: bool) {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN })
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn default_policy() -> CorePolicy {
    CorePolicy {
        idle_timeout: chrono::Duration::minutes(DEFAULT_IDLE_TIMEOUT_MINUTES as i64),
        max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
        lockout_duration: chrono::Duration::minutes(DEFAULT_LOCKOUT_DURATION_MINUTES as i64),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli: ValidatedCli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("argument error: {}", err);
            return ExitCode::from(BootstrapExitCode::UsageError.as_i32() as u8);
        }
    };

    init_tracing(cli.verbose);
    tracing::debug!(vault_path = %cli.vault_path.display(), "dispatching command");

    let envelope = dispatch(cli, default_policy()).await;
    let success = envelope.get("success").and_then(|v| v.as_bool()).unwrap_or(false);

    match serde_json::to_writer(std::io::stdout(), &envelope) {
        Ok(()) => println!(),
        Err(err) => {
            eprintln!("failed to serialize response: {}", err);
            return ExitCode::from(1);
        }
    }

    ExitCode::from(if success { 0 } else { 1 })
}
