//! # Engine Error Types
//!
//! Error types for lock coordination and order mutation.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Concurrency    │  │     Domain      │  │     Configuration       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  LockConflict   │  │  OrderNotFound  │  │  InvalidConfig          │ │
//! │  │  VersionConflict│  │  InvalidStatus- │  │  ConfigLoadFailed       │ │
//! │  │  NotLocked      │  │    Transition   │  │  ConfigSaveFailed       │ │
//! │  │  InvalidToken   │  │  Processing     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lock and version conflicts are ordinary outcomes under concurrency. The
//! orchestrator turns them into `ProcessOutcome` data so the calling service
//! picks the retry policy.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use orderline_core::{CoreError, OrderStatus};

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Lock Errors
// =============================================================================

/// Another holder owns the lock for this entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("'{entity_id}' is currently being modified (locked at {locked_at})")]
pub struct LockConflict {
    pub entity_id: String,
    /// Token of the current holder.
    pub locked_by: String,
    pub locked_at: DateTime<Utc>,
}

/// Failures of the lock table's operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// Acquisition found an unexpired lock.
    #[error(transparent)]
    Conflict(#[from] LockConflict),

    /// Release of an entity nobody holds (never acquired, released, or expired).
    #[error("No lock held for '{entity_id}'")]
    NotLocked { entity_id: String },

    /// Release with a token that does not match the current holder's.
    #[error("Invalid lock token for '{entity_id}'")]
    InvalidToken { entity_id: String },

    /// The caller's expected version is stale.
    #[error("Version conflict for '{entity_id}': provided {provided}, current {current}")]
    VersionConflict {
        entity_id: String,
        provided: u64,
        current: u64,
    },
}

// =============================================================================
// Engine Error
// =============================================================================

/// Engine error type covering orchestration and configuration failures.
#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Concurrency Errors
    // =========================================================================
    #[error(transparent)]
    Lock(#[from] LockError),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No order with this id is in the working set.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Status change out of a terminal state.
    #[error("Order {order_id} is {from}, cannot move to {to}")]
    InvalidStatusTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Unexpected failure inside the locked mutation step.
    #[error("Processing failed: {0}")]
    Processing(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// Failed to read or write a JSON payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<LockConflict> for EngineError {
    fn from(err: LockConflict) -> Self {
        EngineError::Lock(LockError::Conflict(err))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::SerializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl EngineError {
    /// Returns true if the caller may retry.
    ///
    /// ## Retryable Errors
    /// - Lock conflicts (retry after a backoff)
    /// - Version conflicts (refetch, then retry with the new version)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Lock(LockError::Conflict(_))
                | EngineError::Lock(LockError::VersionConflict { .. })
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidConfig(_)
                | EngineError::ConfigLoadFailed(_)
                | EngineError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message() {
        let err = LockConflict {
            entity_id: "order1".into(),
            locked_by: "tok".into(),
            locked_at: Utc::now(),
        };
        assert!(err.to_string().contains("currently being modified"));
        assert!(err.to_string().contains("order1"));
    }

    #[test]
    fn test_retryable_errors() {
        let conflict = LockConflict {
            entity_id: "order1".into(),
            locked_by: "tok".into(),
            locked_at: Utc::now(),
        };
        assert!(EngineError::from(conflict).is_retryable());
        assert!(EngineError::Lock(LockError::VersionConflict {
            entity_id: "order1".into(),
            provided: 1,
            current: 2,
        })
        .is_retryable());

        assert!(!EngineError::OrderNotFound("o9".into()).is_retryable());
        assert!(!EngineError::Processing("boom".into()).is_retryable());
        assert!(EngineError::InvalidConfig("ttl".into()).is_config_error());
    }

    #[test]
    fn test_version_conflict_display() {
        let err = LockError::VersionConflict {
            entity_id: "order1".into(),
            provided: 1,
            current: 2,
        };
        assert_eq!(
            err.to_string(),
            "Version conflict for 'order1': provided 1, current 2"
        );
    }
}
