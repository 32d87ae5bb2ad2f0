//! # orderline-core: Pure Admission Logic for Orderline
//!
//! This crate decides whether an order or menu-item mutation may enter the
//! system at all. It contains every structural, type and business rule as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Orderline Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Order-management service (HTTP, storage)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ raw serde_json::Value                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 orderline-engine (locks, orchestration)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ orderline-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │validation │  │ sanitize  │  │ identity  │  │   │
//! │  │   │  Order    │  │  errors   │  │  coerce   │  │  unique   │  │   │
//! │  │   │ MenuItem  │  │ warnings  │  │  stamps   │  │  menu ids │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, OrderItem, MenuItem, OrderStatus)
//! - [`validation`] - Field validation producing errors and warnings
//! - [`sanitize`] - Coercion of loosely typed payloads into typed records
//! - [`identity`] - Uniqueness index over menu-item identifiers
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use orderline_core::{sanitize_order, validate_order};
//! use serde_json::json;
//!
//! let raw = json!({
//!     "id": "o1",
//!     "table_number": 4,
//!     "items": [{ "id": "i1", "name": "Tea", "price": 10, "quantity": 2 }],
//!     "total": 20
//! });
//!
//! let report = validate_order(&raw);
//! assert!(report.valid);
//!
//! let order = sanitize_order(&raw);
//! assert_eq!(order.table_number, 4);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod identity;
pub mod sanitize;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError, ValidationWarning};
pub use identity::IdentityIndex;
pub use sanitize::{sanitize_menu_item, sanitize_order, sanitize_order_at};
pub use types::*;
pub use validation::{
    validate_menu_item, validate_menu_item_with, validate_order, validate_order_with,
    ValidationReport, ValidationRules,
};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest accepted gap between a supplied order total and the sum of its lines.
pub const TOTAL_TOLERANCE: f64 = 0.01;

/// Menu item names longer than this produce a warning.
pub const MENU_NAME_MAX_LEN: usize = 100;

/// Menu item descriptions longer than this produce a warning.
pub const MENU_DESCRIPTION_MAX_LEN: usize = 500;
