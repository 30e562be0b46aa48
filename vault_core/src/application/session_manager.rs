// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Session Manager (`spec.md` §4.4): couples the domain's `SessionState`
//! machine to the crypto controller's key lifecycle so a lockout, idle
//! expiry, or explicit lock always wipes key material along with the state
//! transition.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use vault_domain::entities::LockState;
use vault_domain::error::VaultError;
use vault_domain::services::CryptoService;
use vault_domain::SessionState;

pub struct SessionManager {
    crypto: Arc<dyn CryptoService>,
    state: Mutex<SessionState>,
    idle_timeout: Duration,
    max_failed_attempts: u32,
    lockout_duration: Duration,
}

impl SessionManager {
    pub fn new(
        crypto: Arc<dyn CryptoService>,
        idle_timeout: Duration,
        max_failed_attempts: u32,
        lockout_duration: Duration,
    ) -> Self {
        Self {
            crypto,
            state: Mutex::new(SessionState::new()),
            idle_timeout,
            max_failed_attempts,
            lockout_duration,
        }
    }

    pub fn session_id(&self) -> String {
        self.state.lock().session_id.clone()
    }

    pub fn failed_attempts(&self) -> u32 {
        self.state.lock().failed_attempts
    }

    /// Attempts to unlock. On success the crypto controller holds live keys
    /// and the session transitions to `Unlocked`; on failure the attempt is
    /// recorded and may trip a lockout.
    pub async fn unlock(&self, password: &str) -> Result<(), VaultError> {
        {
            let mut state = self.state.lock();
            state.clear_expired_lockout();
            if let Some(remaining) = state.lockout_remaining_secs() {
                return Err(VaultError::LockedOut { remaining_secs: remaining });
            }
        }

        match self.crypto.unlock(password).await {
            Ok(()) => {
                self.state.lock().unlock_succeeded();
                Ok(())
            }
            Err(err) => {
                self.state.lock().unlock_failed(self.max_failed_attempts, self.lockout_duration);
                Err(err)
            }
        }
    }

    /// Explicit lock: wipes key material and transitions to `Locked`.
    pub fn lock(&self) {
        self.crypto.lock();
        self.state.lock().lock();
    }

    /// Applies idle-expiry and lockout-clearing checks, then confirms the
    /// crypto controller still holds live keys. Refreshes the idle timer on
    /// success.
    pub fn require_unlocked(&self) -> Result<(), VaultError> {
        let mut state = self.state.lock();
        state.require_unlocked(self.idle_timeout)?;
        if !self.crypto.is_unlocked() {
            state.lock();
            return Err(VaultError::NotUnlocked);
        }
        state.touch();
        Ok(())
    }

    pub fn is_unlocked(&self) -> bool {
        self.crypto.is_unlocked()
    }

    /// Restores lockout bookkeeping persisted from a prior gateway
    /// invocation. Must run before any `unlock` call on this instance.
    pub fn seed_lockout(&self, failed_attempts: u32, lockout_until: Option<DateTime<Utc>>) {
        let mut state = self.state.lock();
        state.failed_attempts = failed_attempts;
        state.lockout_until = lockout_until;
        if lockout_until.is_some_and(|until| until > Utc::now()) {
            state.state = LockState::LockedOut;
        }
    }

    /// The counters to persist after an `unlock` attempt so lockout survives
    /// across gateway invocations, even though key material never does.
    pub fn lockout_snapshot(&self) -> (u32, Option<DateTime<Utc>>) {
        let state = self.state.lock();
        (state.failed_attempts, state.lockout_until)
    }
}
