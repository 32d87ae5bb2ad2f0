//! # Domain Types
//!
//! Typed records produced by the sanitizer once a raw payload has passed
//! validation.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderItem     │   │    MenuItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id (unique)    │       │
//! │  │  table_number   │──►│  name           │   │  name           │       │
//! │  │  items          │   │  price          │   │  price          │       │
//! │  │  total?         │   │  quantity       │   │  description?   │       │
//! │  │  version        │   │  notes?         │   │  category?      │       │
//! │  │  status         │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  OrderStatus: pending → preparing → ready → completed | cancelled       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Version Stamping
//! `Order::version` starts at 0 and is bumped exactly once per successful
//! mutation by the engine. Callers persist the stamped record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Order Status
// =============================================================================

/// Kitchen lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted, not yet picked up by the kitchen.
    #[default]
    Pending,
    /// Being cooked.
    Preparing,
    /// Waiting at the pass.
    Ready,
    /// Served and closed.
    Completed,
    /// Voided before completion.
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled orders accept no further status changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    /// Menu item identifier.
    pub id: String,

    /// Display name printed on the KOT.
    pub name: String,

    /// Unit price in major currency units.
    pub price: f64,

    /// Portions ordered.
    pub quantity: f64,

    /// Free-text kitchen note ("no onions").
    #[serde(default)]
    pub notes: Option<String>,
}

impl OrderItem {
    /// Calculates the line total (price × quantity).
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity
    }
}

// =============================================================================
// Order
// =============================================================================

/// A validated, typed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub items: Vec<OrderItem>,
    pub table_number: i64,
    /// Total as supplied by the client, if any.
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub last_modified: DateTime<Utc>,
    /// Set by the engine when the order passes through the mutation pipeline.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Sum of all line totals.
    pub fn calculated_total(&self) -> f64 {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// Checks if the order has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Menu Item
// =============================================================================

/// An entry in the menu catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MenuItem {
    /// Globally unique identifier within the catalog.
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Whether the item can currently be ordered.
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl MenuItem {
    /// Creates an available menu item without description or category.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        MenuItem {
            id: id.into(),
            name: name.into(),
            price,
            description: None,
            category: None,
            available: true,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
