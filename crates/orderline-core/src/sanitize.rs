//! # Sanitize Module
//!
//! Turns a raw payload into a typed record.
//!
//! Sanitizing never fails: bad prices become `0`, bad quantities become `1`,
//! missing timestamps become "now". That is only safe because the engine
//! never sanitizes a payload that [`crate::validation`] rejected.
//!
//! ```text
//! raw Value ──► validate_order ──(valid)──► sanitize_order ──► Order
//!                     │
//!                     └──(invalid)──► errors returned, nothing coerced
//! ```
//!
//! Running the sanitizer over its own output changes nothing:
//! `sanitize(to_value(sanitize(x))) == sanitize(x)`.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::{MenuItem, Order, OrderItem, OrderStatus};
use crate::validation::identifier;

/// Sanitizes a raw order, stamping missing timestamps with the current time.
pub fn sanitize_order(raw: &Value) -> Order {
    sanitize_order_at(raw, Utc::now())
}

/// Sanitizes a raw order, stamping missing timestamps with `now`.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use orderline_core::sanitize::sanitize_order_at;
/// use serde_json::json;
///
/// let now = Utc::now();
/// let order = sanitize_order_at(
///     &json!({ "id": 7, "table_number": "4", "items": [{ "id": "i1", "name": "Tea", "price": "2.5" }] }),
///     now,
/// );
///
/// assert_eq!(order.id, "7");
/// assert_eq!(order.table_number, 4);
/// assert_eq!(order.items[0].price, 2.5);
/// assert_eq!(order.items[0].quantity, 1.0);
/// assert_eq!(order.created_at, now);
/// ```
pub fn sanitize_order_at(raw: &Value, now: DateTime<Utc>) -> Order {
    let items = match raw.get("items") {
        Some(Value::Array(lines)) => lines.iter().map(sanitize_line).collect(),
        _ => Vec::new(),
    };

    Order {
        id: raw.get("id").and_then(identifier).unwrap_or_default(),
        items,
        table_number: coerce_number(raw.get("table_number"))
            .map(|n| n.trunc() as i64)
            .unwrap_or(0),
        total: coerce_number(raw.get("total")),
        version: coerce_number(raw.get("version"))
            .filter(|v| *v >= 0.0)
            .map(|v| v.trunc() as u64)
            .unwrap_or(0),
        status: raw
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<OrderStatus>().ok())
            .unwrap_or_default(),
        created_at: coerce_timestamp(raw.get("created_at")).unwrap_or(now),
        last_modified: coerce_timestamp(raw.get("last_modified")).unwrap_or(now),
        processed_at: coerce_timestamp(raw.get("processed_at")),
    }
}

fn sanitize_line(raw: &Value) -> OrderItem {
    OrderItem {
        id: raw.get("id").and_then(identifier).unwrap_or_default(),
        name: raw.get("name").and_then(identifier).unwrap_or_default(),
        price: coerce_number(raw.get("price")).unwrap_or(0.0),
        quantity: coerce_number(raw.get("quantity")).unwrap_or(1.0),
        notes: coerce_text(raw.get("notes")),
    }
}

/// Sanitizes a raw menu item.
pub fn sanitize_menu_item(raw: &Value) -> MenuItem {
    MenuItem {
        id: raw.get("id").and_then(identifier).unwrap_or_default(),
        name: raw.get("name").and_then(identifier).unwrap_or_default(),
        price: coerce_number(raw.get("price")).unwrap_or(0.0),
        description: coerce_text(raw.get("description")),
        category: coerce_text(raw.get("category")),
        available: raw
            .get("available")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    }
}

// =============================================================================
// Coercion Helpers
// =============================================================================

/// Numbers pass through, numeric strings are parsed, everything else is `None`.
fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn coerce_text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn coerce_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let text = value?.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_coerces_loose_types() {
        let order = sanitize_order_at(
            &json!({
                "id": "o1",
                "table_number": " 12 ",
                "total": "25.50",
                "items": [
                    { "id": 3, "name": "Tea", "price": "abc", "quantity": "x" },
                    { "id": "i2", "name": "Bun", "price": 5, "quantity": "2", "notes": "warm" }
                ]
            }),
            fixed_now(),
        );

        assert_eq!(order.table_number, 12);
        assert_eq!(order.total, Some(25.5));
        assert_eq!(order.items[0].id, "3");
        assert_eq!(order.items[0].price, 0.0);
        assert_eq!(order.items[0].quantity, 1.0);
        assert_eq!(order.items[1].quantity, 2.0);
        assert_eq!(order.items[1].notes.as_deref(), Some("warm"));
    }

    #[test]
    fn test_fills_missing_timestamps_and_defaults() {
        let order = sanitize_order_at(&json!({ "id": "o1", "items": [] }), fixed_now());
        assert_eq!(order.created_at, fixed_now());
        assert_eq!(order.last_modified, fixed_now());
        assert_eq!(order.processed_at, None);
        assert_eq!(order.version, 0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, None);
    }

    #[test]
    fn test_keeps_existing_timestamps_version_and_status() {
        let order = sanitize_order_at(
            &json!({
                "id": "o1",
                "items": [],
                "version": 4,
                "status": "ready",
                "created_at": "2026-01-01T08:00:00Z"
            }),
            fixed_now(),
        );
        assert_eq!(order.version, 4);
        assert_eq!(order.status, OrderStatus::Ready);
        assert_eq!(
            order.created_at,
            Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let first = sanitize_order(&json!({
            "id": "o1",
            "table_number": 2,
            "total": 12.5,
            "items": [{ "id": "i1", "name": "Tea", "price": 6.25, "quantity": 2 }]
        }));
        let again = sanitize_order(&serde_json::to_value(&first).unwrap());
        assert_eq!(first, again);
    }

    #[test]
    fn test_sanitize_menu_item() {
        let item = sanitize_menu_item(&json!({
            "id": "m1",
            "name": "Masala Chai",
            "price": "3.5",
            "category": "drinks"
        }));
        assert_eq!(item.price, 3.5);
        assert_eq!(item.category.as_deref(), Some("drinks"));
        assert!(item.available);
        assert_eq!(item.description, None);
    }
}
