//! # Lock Manager
//!
//! Time-boxed, non-blocking mutual exclusion keyed by entity id, plus the
//! optimistic-concurrency version check.
//!
//! ## Lock Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lock Lifecycle                                   │
//! │                                                                         │
//! │  acquire(id) ──► held? ──no──────────────────────► insert, return token │
//! │                   │                                                     │
//! │                   yes ──► age > TTL? ──yes──► evict, insert, return     │
//! │                                 │                                       │
//! │                                 no ──► LockConflict (immediately)       │
//! │                                                                         │
//! │  release(id, token) ──► token matches? ──yes──► remove                  │
//! │                               │                                         │
//! │                               no ──► InvalidToken, lock untouched       │
//! │                                                                         │
//! │  cleanup_expired_locks() ──► sweep every entry older than TTL           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! The table lives behind a single `Mutex`. The expiry check and the insert
//! happen while that mutex is held, so two racing acquirers can never both
//! see the slot as free. Nothing in this module waits for a holder: callers
//! that want "wait until free" build their own backoff on top.
//!
//! A lock becomes acquirable again at most `TTL` after it was taken, even if
//! its holder never releases it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::LockSettings;
use crate::error::{LockConflict, LockError};

/// Default lock time-to-live.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_millis(30_000);

// =============================================================================
// Lock Token
// =============================================================================

/// Opaque credential proving ownership of one lock instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockToken(String);

impl LockToken {
    fn generate() -> Self {
        LockToken(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LockToken {
    fn from(s: &str) -> Self {
        LockToken(s.to_string())
    }
}

// =============================================================================
// Lock Grant
// =============================================================================

/// Successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockGrant {
    pub entity_id: String,
    #[serde(rename = "lockToken")]
    pub token: LockToken,
    pub version: u64,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct LockEntry {
    token: LockToken,
    version: u64,
    acquired_at: DateTime<Utc>,
}

// =============================================================================
// Lock Manager
// =============================================================================

/// Process-local lock table.
#[derive(Debug)]
pub struct LockManager {
    locks: Mutex<HashMap<String, LockEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl LockManager {
    /// Creates a lock manager with the default 30 s TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_LOCK_TTL)
    }

    /// Creates a lock manager with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Creates a lock manager reading time from `clock`.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        LockManager {
            locks: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Creates a lock manager from the `[locks]` config section.
    pub fn from_settings(settings: &LockSettings) -> Self {
        Self::with_ttl(settings.ttl())
    }

    /// Returns the configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the current time of the manager's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Every critical section leaves the map consistent, so a poisoned
    /// mutex is safe to keep using.
    fn table(&self) -> MutexGuard<'_, HashMap<String, LockEntry>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &LockEntry, now: DateTime<Utc>) -> bool {
        match (now - entry.acquired_at).to_std() {
            Ok(age) => age > self.ttl,
            // Clock stepped backwards: the lock is younger than zero.
            Err(_) => false,
        }
    }

    /// Tries to take the lock for `entity_id`. Never blocks.
    ///
    /// The grant carries `current_version`, or `1` when none is given.
    ///
    /// ## Example
    /// ```rust
    /// use orderline_engine::lock::LockManager;
    ///
    /// let locks = LockManager::new();
    /// let grant = locks.acquire("order1", Some(1)).unwrap();
    ///
    /// let conflict = locks.acquire("order1", Some(1)).unwrap_err();
    /// assert!(conflict.to_string().contains("currently being modified"));
    ///
    /// locks.release("order1", &grant.token).unwrap();
    /// assert!(locks.acquire("order1", Some(1)).is_ok());
    /// ```
    pub fn acquire(
        &self,
        entity_id: &str,
        current_version: Option<u64>,
    ) -> Result<LockGrant, LockConflict> {
        let now = self.clock.now();
        let mut locks = self.table();

        match locks.get(entity_id) {
            Some(existing) if !self.is_expired(existing, now) => {
                warn!(
                    entity_id,
                    locked_by = %existing.token,
                    locked_at = %existing.acquired_at,
                    "Lock acquisition refused"
                );
                return Err(LockConflict {
                    entity_id: entity_id.to_string(),
                    locked_by: existing.token.to_string(),
                    locked_at: existing.acquired_at,
                });
            }
            Some(existing) => {
                debug!(
                    entity_id,
                    expired_token = %existing.token,
                    "Evicting expired lock"
                );
            }
            None => {}
        }

        let entry = LockEntry {
            token: LockToken::generate(),
            version: current_version.unwrap_or(1),
            acquired_at: now,
        };
        let grant = LockGrant {
            entity_id: entity_id.to_string(),
            token: entry.token.clone(),
            version: entry.version,
            acquired_at: entry.acquired_at,
        };
        locks.insert(entity_id.to_string(), entry);

        debug!(entity_id, version = grant.version, "Lock acquired");
        Ok(grant)
    }

    /// Like [`acquire`](Self::acquire), but returns a guard that releases
    /// the lock when dropped.
    pub fn acquire_guard(
        &self,
        entity_id: &str,
        current_version: Option<u64>,
    ) -> Result<LockGuard<'_>, LockConflict> {
        let grant = self.acquire(entity_id, current_version)?;
        Ok(LockGuard {
            manager: self,
            grant,
            released: false,
        })
    }

    /// Releases the lock for `entity_id` if `token` belongs to its holder.
    ///
    /// A mismatched token leaves the lock in place. This happens when a lock
    /// expired and someone else acquired it in the meantime.
    pub fn release(&self, entity_id: &str, token: &LockToken) -> Result<(), LockError> {
        let mut locks = self.table();

        match locks.get(entity_id).map(|entry| entry.token == *token) {
            None => Err(LockError::NotLocked {
                entity_id: entity_id.to_string(),
            }),
            Some(false) => {
                warn!(entity_id, "Release refused: token does not match holder");
                Err(LockError::InvalidToken {
                    entity_id: entity_id.to_string(),
                })
            }
            Some(true) => {
                locks.remove(entity_id);
                debug!(entity_id, "Lock released");
                Ok(())
            }
        }
    }

    /// Optimistic-concurrency check. Pure: touches no lock state.
    pub fn validate_version(
        &self,
        entity_id: &str,
        provided: u64,
        current: u64,
    ) -> Result<(), LockError> {
        if provided == current {
            return Ok(());
        }
        warn!(entity_id, provided, current, "Version conflict");
        Err(LockError::VersionConflict {
            entity_id: entity_id.to_string(),
            provided,
            current,
        })
    }

    /// Evicts every lock older than the TTL. Returns how many were evicted.
    pub fn cleanup_expired_locks(&self) -> usize {
        let now = self.clock.now();
        let mut locks = self.table();
        let before = locks.len();
        locks.retain(|_, entry| !self.is_expired(entry, now));
        let evicted = before - locks.len();
        if evicted > 0 {
            debug!(evicted, remaining = locks.len(), "Swept expired locks");
        }
        evicted
    }

    /// Checks if `entity_id` is held by an unexpired lock.
    pub fn is_locked(&self, entity_id: &str) -> bool {
        let now = self.clock.now();
        self.table()
            .get(entity_id)
            .is_some_and(|entry| !self.is_expired(entry, now))
    }

    /// Number of unexpired locks.
    pub fn active_locks(&self) -> usize {
        let now = self.clock.now();
        self.table()
            .values()
            .filter(|entry| !self.is_expired(entry, now))
            .count()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Lock Guard
// =============================================================================

/// Holds a lock until dropped or explicitly released.
///
/// Drop runs on early returns, `?` propagation and panics alike, so a lock
/// taken through a guard cannot leak past its scope.
#[must_use = "dropping the guard releases the lock immediately"]
#[derive(Debug)]
pub struct LockGuard<'a> {
    manager: &'a LockManager,
    grant: LockGrant,
    released: bool,
}

impl LockGuard<'_> {
    /// The acquisition this guard holds.
    pub fn grant(&self) -> &LockGrant {
        &self.grant
    }

    /// Releases now and reports the outcome.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        self.manager
            .release(&self.grant.entity_id, &self.grant.token)
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self
            .manager
            .release(&self.grant.entity_id, &self.grant.token)
        {
            // Expired and taken over: the new holder keeps its lock.
            debug!(entity_id = %self.grant.entity_id, error = %e, "Guard release skipped");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
