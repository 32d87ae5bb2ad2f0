//! # Error Types
//!
//! Domain-specific error types for orderline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  orderline-core (this file)                                            │
//! │  ├── CoreError          - Identity index failures                      │
//! │  ├── ValidationError    - One rejected field (rendered into reports)   │
//! │  └── ValidationWarning  - Admissible but suspicious input              │
//! │                                                                         │
//! │  orderline-engine (separate crate)                                     │
//! │  └── EngineError        - Lock / version conflicts, processing         │
//! │                                                                         │
//! │  Flow: ValidationError → ValidationReport.errors → ProcessOutcome      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation never stops at the first problem, so `ValidationError` values
//! are collected and rendered to strings instead of being returned through `?`.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised by stateful core structures (the identity index).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A menu item identifier is already taken by another item.
    ///
    /// ## User Workflow
    /// ```text
    /// Create "item1"
    ///      │
    ///      ▼
    /// Index already holds "item1"
    ///      │
    ///      ▼
    /// DuplicateIdentifier { id: "item1", suggested: "item1_1" }
    ///      │
    ///      ▼
    /// UI offers "item1_1" as the new id
    /// ```
    #[error("Menu item id '{id}' already exists (suggested: '{suggested}')")]
    DuplicateIdentifier { id: String, suggested: String },

    /// Menu item cannot be found in the index.
    #[error("Menu item not found: {0}")]
    MenuItemNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single rule violation found while validating an order or menu item.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The payload is not a JSON object.
    #[error("{what} must be an object")]
    NotAnObject { what: String },

    /// A required field is missing, null or empty.
    #[error("Missing required field: {field}")]
    Required { field: String },

    /// Field has the wrong JSON type.
    #[error("{field} must be {expected}")]
    InvalidType { field: String, expected: String },

    /// Value must be strictly positive.
    #[error("{field} must be greater than 0")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// An order line is not an object.
    #[error("Item {index}: must be an object")]
    ItemNotObject { index: usize },

    /// An order line lacks a required field.
    #[error("Item {index}: missing {field}")]
    ItemMissingField { index: usize, field: String },

    /// An order line field has a type that cannot serve as text.
    #[error("Item {index}: {field} must be a string or number")]
    ItemInvalidField { index: usize, field: String },

    /// An order line has a missing, non-numeric or negative price.
    #[error("Item {index}: price must be a non-negative number")]
    ItemInvalidPrice { index: usize },

    /// An order line has a missing, non-numeric or non-positive quantity.
    #[error("Item {index}: quantity must be a positive number")]
    ItemInvalidQuantity { index: usize },

    /// Supplied total disagrees with the sum of the lines.
    #[error("Total mismatch: calculated {calculated:.2}, provided {provided:.2}")]
    TotalMismatch { calculated: f64, provided: f64 },

    /// Duplicate value (e.g., duplicate menu item id).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_type(field: &str, expected: &str) -> Self {
        ValidationError::InvalidType {
            field: field.to_string(),
            expected: expected.to_string(),
        }
    }
}

// =============================================================================
// Validation Warning
// =============================================================================

/// Non-fatal findings. The payload stays admissible.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationWarning {
    #[error("Order has no items")]
    EmptyItems,

    #[error("{field} is longer than {max} characters")]
    TooLong { field: String, max: usize },

    /// Free identifier proposed after a collision.
    #[error("Suggested id: {0}")]
    SuggestedId(String),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
