// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `SessionState` — the Session Manager's in-memory state machine
//! (`spec.md` §4.4):
//!
//! ```text
//! Locked ──unlock(pw ok)──▶ Unlocked
//! Locked ──unlock(pw bad, attempts<max)──▶ Locked (attempts+=1)
//! Locked ──unlock(pw bad, attempts=max)──▶ LockedOut(until = now + lockout_duration)
//! LockedOut ──now ≥ until──▶ Locked (attempts=0)
//! Unlocked ──activity──▶ Unlocked (reset idle timer)
//! Unlocked ──idle > timeout──▶ Locked (keys zeroized)
//! Unlocked ──explicit lock──▶ Locked (keys zeroized)
//! ```

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// Vault lock state. Key material lives only in the infrastructure layer
/// while `Unlocked`; this type tracks the bookkeeping the domain needs to
/// decide transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    Locked,
    Unlocked,
    LockedOut,
}

/// In-memory session bookkeeping (`spec.md` §3 `SessionState`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub state: LockState,
    pub start_time: DateTime<Utc>,
    pub last_activity_time: DateTime<Utc>,
    pub failed_attempts: u32,
    pub lockout_until: Option<DateTime<Utc>>,
    pub session_id_issued_at: DateTime<Utc>,
}

/// How long a session id is valid before `require_unlocked` reissues it.
fn session_id_reissue_interval() -> Duration {
    Duration::hours(1)
}

fn random_session_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl SessionState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: random_session_id(),
            state: LockState::Locked,
            start_time: now,
            last_activity_time: now,
            failed_attempts: 0,
            lockout_until: None,
            session_id_issued_at: now,
        }
    }

    /// Reissue the session identifier, preserving all other state. Called
    /// hourly while unlocked for forward secrecy of the session id.
    pub fn reissue_session_id(&mut self) {
        self.session_id = random_session_id();
        self.session_id_issued_at = Utc::now();
    }

    /// Reissue the session id if it has been held for longer than
    /// [`session_id_reissue_interval`]. No-op otherwise.
    pub fn reissue_session_id_if_due(&mut self) {
        if Utc::now() - self.session_id_issued_at >= session_id_reissue_interval() {
            self.reissue_session_id();
        }
    }

    /// Record a successful unlock.
    pub fn unlock_succeeded(&mut self) {
        self.state = LockState::Unlocked;
        self.failed_attempts = 0;
        self.lockout_until = None;
        self.touch();
    }

    /// Record a failed unlock attempt, transitioning to `LockedOut` once
    /// `max_failed_attempts` is reached.
    pub fn unlock_failed(&mut self, max_failed_attempts: u32, lockout_duration: Duration) {
        self.failed_attempts += 1;
        if self.failed_attempts >= max_failed_attempts {
            self.state = LockState::LockedOut;
            self.lockout_until = Some(Utc::now() + lockout_duration);
        }
    }

    /// Explicit lock: zeroizing key material is the infrastructure layer's
    /// job; this only updates the state machine.
    pub fn lock(&mut self) {
        self.state = LockState::Locked;
    }

    /// Refresh the idle timer on activity.
    pub fn touch(&mut self) {
        self.last_activity_time = Utc::now();
    }

    /// Whether the idle timeout has elapsed since the last activity.
    pub fn is_idle_expired(&self, timeout: Duration) -> bool {
        self.state == LockState::Unlocked && Utc::now() - self.last_activity_time > timeout
    }

    /// If `LockedOut` and the lockout window has elapsed, transition back to
    /// `Locked` with a reset attempt counter.
    pub fn clear_expired_lockout(&mut self) {
        if self.state == LockState::LockedOut {
            if let Some(until) = self.lockout_until {
                if Utc::now() >= until {
                    self.state = LockState::Locked;
                    self.failed_attempts = 0;
                    self.lockout_until = None;
                }
            }
        }
    }

    /// Seconds remaining in an active lockout, or `None` if not locked out.
    pub fn lockout_remaining_secs(&self) -> Option<u64> {
        match (self.state, self.lockout_until) {
            (LockState::LockedOut, Some(until)) => {
                let remaining = until - Utc::now();
                Some(remaining.num_seconds().max(0) as u64)
            }
            _ => None,
        }
    }

    /// Ensure an operation requiring an unlocked vault is permitted,
    /// applying idle-expiry and lockout-clearing checks first.
    pub fn require_unlocked(&mut self, idle_timeout: Duration) -> Result<(), VaultError> {
        self.clear_expired_lockout();
        if self.is_idle_expired(idle_timeout) {
            self.lock();
            return Err(VaultError::SessionExpired);
        }
        match self.state {
            LockState::Unlocked => {
                self.reissue_session_id_if_due();
                Ok(())
            }
            LockState::LockedOut => Err(VaultError::LockedOut {
                remaining_secs: self.lockout_remaining_secs().unwrap_or(0),
            }),
            LockState::Locked => Err(VaultError::NotUnlocked),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_out_after_max_attempts() {
        let mut session = SessionState::new();
        for _ in 0..3 {
            session.unlock_failed(3, Duration::minutes(15));
        }
        assert_eq!(session.state, LockState::LockedOut);
        assert!(session.lockout_remaining_secs().unwrap() > 0);
    }

    #[test]
    fn fewer_than_max_attempts_stays_locked() {
        let mut session = SessionState::new();
        session.unlock_failed(3, Duration::minutes(15));
        session.unlock_failed(3, Duration::minutes(15));
        assert_eq!(session.state, LockState::Locked);
        assert_eq!(session.failed_attempts, 2);
    }

    #[test]
    fn successful_unlock_resets_attempts() {
        let mut session = SessionState::new();
        session.unlock_failed(3, Duration::minutes(15));
        session.unlock_succeeded();
        assert_eq!(session.state, LockState::Unlocked);
        assert_eq!(session.failed_attempts, 0);
    }

    #[test]
    fn idle_expiry_locks_and_reports_session_expired() {
        let mut session = SessionState::new();
        session.unlock_succeeded();
        session.last_activity_time = Utc::now() - Duration::minutes(31);
        let result = session.require_unlocked(Duration::minutes(30));
        assert!(matches!(result, Err(VaultError::SessionExpired)));
        assert_eq!(session.state, LockState::Locked);
    }

    #[test]
    fn expired_lockout_clears_on_next_check() {
        let mut session = SessionState::new();
        session.state = LockState::LockedOut;
        session.lockout_until = Some(Utc::now() - Duration::seconds(1));
        session.clear_expired_lockout();
        assert_eq!(session.state, LockState::Locked);
        assert_eq!(session.failed_attempts, 0);
    }

    #[test]
    fn require_unlocked_reissues_session_id_after_an_hour() {
        let mut session = SessionState::new();
        session.unlock_succeeded();
        let original_id = session.session_id.clone();
        session.session_id_issued_at = Utc::now() - Duration::hours(2);

        session.require_unlocked(Duration::minutes(30)).unwrap();
        assert_ne!(session.session_id, original_id);
    }

    #[test]
    fn require_unlocked_leaves_recent_session_id_untouched() {
        let mut session = SessionState::new();
        session.unlock_succeeded();
        let original_id = session.session_id.clone();

        session.require_unlocked(Duration::minutes(30)).unwrap();
        assert_eq!(session.session_id, original_id);
    }

    #[test]
    fn locked_state_reports_not_unlocked() {
        let mut session = SessionState::new();
        assert!(matches!(
            session.require_unlocked(Duration::minutes(30)),
            Err(VaultError::NotUnlocked)
        ));
    }
}
