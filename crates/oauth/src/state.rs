//! In-flight authorization attempts, keyed by an unguessable state token.
//!
//! Single-process and in-memory: under a multi-instance deployment this
//! must be replaced by a shared store with the same atomic
//! consume-on-read and TTL semantics. The orchestrator only touches the
//! public surface here, so swapping the backend stays local to this file.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use crate::{error::AuthError, pkce};

/// Default time an authorization attempt stays valid.
pub const DEFAULT_ATTEMPT_TTL: Duration = Duration::from_secs(10 * 60);

/// Abandoned attempts above this count are evicted oldest-first on create.
const MAX_PENDING: usize = 1024;

struct PendingAttempt {
    verifier: String,
    created_at: Instant,
}

/// Tracks pending PKCE handshakes with single-use consumption and TTL.
///
/// Lookups never suspend; the map is guarded by a plain mutex and held
/// only for the duration of one operation.
pub struct PkceStateStore {
    entries: Mutex<HashMap<String, PendingAttempt>>,
    ttl: Duration,
}

impl PkceStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Register a new attempt, returning its freshly minted state token.
    pub fn create(&self, verifier: String) -> String {
        let state = pkce::generate_state();
        let mut entries = self.lock();

        Self::evict_expired(&mut entries, self.ttl);
        if entries.len() >= MAX_PENDING
            && let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, a)| a.created_at)
                .map(|(k, _)| k.clone())
        {
            entries.remove(&oldest);
        }

        entries.insert(state.clone(), PendingAttempt {
            verifier,
            created_at: Instant::now(),
        });
        state
    }

    /// Atomically look up and remove the attempt for `state`.
    ///
    /// Absent, already-consumed, and expired entries are all reported as
    /// [`AuthError::InvalidOrExpiredState`] so callers cannot enumerate
    /// which case occurred. An entry is gone after the first `consume`,
    /// whether or not the exchange it authorizes later succeeds.
    pub fn consume(&self, state: &str) -> Result<String, AuthError> {
        let attempt = self
            .lock()
            .remove(state)
            .ok_or(AuthError::InvalidOrExpiredState)?;

        // Expiry holds even if no sweep ever ran.
        if attempt.created_at.elapsed() > self.ttl {
            return Err(AuthError::InvalidOrExpiredState);
        }
        Ok(attempt.verifier)
    }

    /// Number of live (possibly expired, not yet swept) attempts.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn evict_expired(entries: &mut HashMap<String, PendingAttempt>, ttl: Duration) {
        entries.retain(|_, a| a.created_at.elapsed() <= ttl);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingAttempt>> {
        // A poisoned map of pending handshakes is still safe to reuse: the
        // worst outcome is an attempt the user has to restart.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PkceStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPT_TTL)
    }
}
