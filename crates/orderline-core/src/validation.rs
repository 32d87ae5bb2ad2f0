//! # Validation Module
//!
//! Field validation for raw order and menu-item payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Order Validation Rules                             │
//! │                                                                         │
//! │  Required     id, items, table_number present                          │
//! │  Types        table_number integer, items array, total number          │
//! │  Business     table_number > 0, empty items → warning only             │
//! │  Per line     id, name, price ≥ 0, quantity > 0 (index-qualified)      │
//! │  Total        |Σ price×quantity − total| ≤ 0.01                         │
//! │                                                                         │
//! │  Every rule runs. Nothing short-circuits: the caller gets the full     │
//! │  list of problems in one round trip.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Numbers must arrive as JSON numbers. A `table_number` of `"5"` is a type
//! error no matter what it would parse to; coercion belongs to
//! [`crate::sanitize`], which only ever runs after validation has passed.
//!
//! ## Usage
//! ```rust
//! use orderline_core::validation::validate_order;
//! use serde_json::json;
//!
//! let report = validate_order(&json!({ "id": "o1", "items": [] }));
//! assert!(!report.valid);
//! assert!(report.errors.iter().any(|e| e.contains("table_number")));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::error::{CoreError, ValidationError, ValidationWarning};
use crate::identity::IdentityIndex;
use crate::{MENU_DESCRIPTION_MAX_LEN, MENU_NAME_MAX_LEN, TOTAL_TOLERANCE};

const REQUIRED_ORDER_FIELDS: [&str; 3] = ["id", "items", "table_number"];
const REQUIRED_MENU_FIELDS: [&str; 3] = ["id", "name", "price"];

// =============================================================================
// Validation Report
// =============================================================================

/// Outcome of validating one payload.
///
/// `valid` is false exactly when `errors` is non-empty. Warnings never
/// affect admissibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Creates an empty, valid report.
    pub fn new() -> Self {
        ValidationReport {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Records an error and marks the report invalid.
    pub fn error(&mut self, err: ValidationError) {
        self.valid = false;
        self.errors.push(err.to_string());
    }

    /// Records a warning.
    pub fn warn(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning.to_string());
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Validation Rules
// =============================================================================

/// Tunable thresholds. The engine reads these from its `[validation]`
/// config section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    /// Allowed gap between a supplied total and the sum of the lines.
    pub total_tolerance: f64,
    pub menu_name_max_len: usize,
    pub menu_description_max_len: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        ValidationRules {
            total_tolerance: TOTAL_TOLERANCE,
            menu_name_max_len: MENU_NAME_MAX_LEN,
            menu_description_max_len: MENU_DESCRIPTION_MAX_LEN,
        }
    }
}

// =============================================================================
// Order Validation
// =============================================================================

/// Validates a raw order with the default rules.
pub fn validate_order(raw: &Value) -> ValidationReport {
    validate_order_with(raw, &ValidationRules::default())
}

/// Validates a raw order.
///
/// ## Example
/// ```rust
/// use orderline_core::validation::{validate_order_with, ValidationRules};
/// use serde_json::json;
///
/// let raw = json!({
///     "id": "o1",
///     "table_number": 1,
///     "items": [
///         { "id": "i1", "name": "Tea", "price": 10, "quantity": 2 },
///         { "id": "i2", "name": "Bun", "price": 5, "quantity": 1 }
///     ],
///     "total": 30
/// });
///
/// let report = validate_order_with(&raw, &ValidationRules::default());
/// assert!(!report.valid);
/// assert!(report.errors[0].contains("calculated 25.00"));
/// ```
pub fn validate_order_with(raw: &Value, rules: &ValidationRules) -> ValidationReport {
    let mut report = ValidationReport::new();

    let Some(order) = raw.as_object() else {
        report.error(ValidationError::NotAnObject {
            what: "order".to_string(),
        });
        return report;
    };

    for field in REQUIRED_ORDER_FIELDS {
        if !is_present(order.get(field)) {
            report.error(ValidationError::required(field));
        }
    }
    check_text_field(order, "id", &mut report);

    if let Some(version) = non_null(order, "version") {
        if !as_integer(version).is_some_and(|v| v >= 0) {
            report.error(ValidationError::invalid_type(
                "version",
                "a non-negative integer",
            ));
        }
    }

    if let Some(table) = non_null(order, "table_number") {
        match as_integer(table) {
            Some(n) if n <= 0 => report.error(ValidationError::MustBePositive {
                field: "table_number".to_string(),
            }),
            Some(_) => {}
            None => report.error(ValidationError::invalid_type("table_number", "an integer")),
        }
    }

    let lines = match non_null(order, "items") {
        Some(Value::Array(lines)) => {
            if lines.is_empty() {
                report.warn(ValidationWarning::EmptyItems);
            }
            check_lines(lines, &mut report);
            Some(lines)
        }
        Some(_) => {
            report.error(ValidationError::invalid_type("items", "an array"));
            None
        }
        None => None,
    };

    if let Some(total) = non_null(order, "total") {
        match total.as_f64() {
            Some(provided) => {
                if let Some(lines) = lines {
                    let calculated = calculated_total(lines);
                    if (calculated - provided).abs() > rules.total_tolerance {
                        report.error(ValidationError::TotalMismatch {
                            calculated,
                            provided,
                        });
                    }
                }
            }
            None => report.error(ValidationError::invalid_type("total", "a number")),
        }
    }

    report
}

fn check_lines(lines: &[Value], report: &mut ValidationReport) {
    for (index, line) in lines.iter().enumerate() {
        let Some(line) = line.as_object() else {
            report.error(ValidationError::ItemNotObject { index });
            continue;
        };

        for field in ["id", "name"] {
            let value = line.get(field);
            if !is_present(value) {
                report.error(ValidationError::ItemMissingField {
                    index,
                    field: field.to_string(),
                });
            } else if value.and_then(identifier).is_none() {
                report.error(ValidationError::ItemInvalidField {
                    index,
                    field: field.to_string(),
                });
            }
        }

        match line.get("price").and_then(Value::as_f64) {
            Some(price) if price >= 0.0 => {}
            _ => report.error(ValidationError::ItemInvalidPrice { index }),
        }

        match line.get("quantity").and_then(Value::as_f64) {
            Some(quantity) if quantity > 0.0 => {}
            _ => report.error(ValidationError::ItemInvalidQuantity { index }),
        }
    }
}

/// Σ price×quantity over lines whose price and quantity are both numbers.
fn calculated_total(lines: &[Value]) -> f64 {
    lines
        .iter()
        .filter_map(|line| {
            let price = line.get("price")?.as_f64()?;
            let quantity = line.get("quantity")?.as_f64()?;
            Some(price * quantity)
        })
        .sum()
}

// =============================================================================
// Menu Item Validation
// =============================================================================

/// Validates a raw menu item with the default rules.
pub fn validate_menu_item(
    raw: &Value,
    index: &IdentityIndex,
    is_update: bool,
    original_id: Option<&str>,
) -> ValidationReport {
    validate_menu_item_with(raw, index, is_update, original_id, &ValidationRules::default())
}

/// Validates a raw menu item against the catalog's identity index.
///
/// ## Identifier Collisions
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  id already in index?                                                   │
/// │       │                                                                 │
/// │       ├── no  → OK                                                      │
/// │       │                                                                 │
/// │       ├── yes, is_update && original_id == id → OK (self-update)       │
/// │       │                                                                 │
/// │       └── yes, otherwise → error "id 'x' already exists"               │
/// │                            warning "Suggested id: x_1"                 │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_menu_item_with(
    raw: &Value,
    index: &IdentityIndex,
    is_update: bool,
    original_id: Option<&str>,
    rules: &ValidationRules,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    let Some(item) = raw.as_object() else {
        report.error(ValidationError::NotAnObject {
            what: "menu item".to_string(),
        });
        return report;
    };

    for field in REQUIRED_MENU_FIELDS {
        if !is_present(item.get(field)) {
            report.error(ValidationError::required(field));
        }
    }
    check_text_field(item, "id", &mut report);
    check_text_field(item, "name", &mut report);

    if let Some(price) = non_null(item, "price") {
        match price.as_f64() {
            Some(p) if p < 0.0 => report.error(ValidationError::Negative {
                field: "price".to_string(),
            }),
            Some(_) => {}
            None => report.error(ValidationError::invalid_type("price", "a number")),
        }
    }

    if let Some(name) = item.get("name").and_then(Value::as_str) {
        if name.chars().count() > rules.menu_name_max_len {
            report.warn(ValidationWarning::TooLong {
                field: "name".to_string(),
                max: rules.menu_name_max_len,
            });
        }
    }

    if let Some(description) = item.get("description").and_then(Value::as_str) {
        if description.chars().count() > rules.menu_description_max_len {
            report.warn(ValidationWarning::TooLong {
                field: "description".to_string(),
                max: rules.menu_description_max_len,
            });
        }
    }

    if let Some(id) = item.get("id").and_then(identifier) {
        if let Err(CoreError::DuplicateIdentifier { id, suggested }) =
            index.check_identifier(&id, is_update, original_id)
        {
            report.error(ValidationError::Duplicate {
                field: "id".to_string(),
                value: id,
            });
            report.warn(ValidationWarning::SuggestedId(suggested));
        }
    }

    report
}

// =============================================================================
// Value Helpers
// =============================================================================

/// Present means: not absent, not null, not a blank string.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// A present value that is neither a string nor a number is a type error.
fn check_text_field(object: &Map<String, Value>, field: &str, report: &mut ValidationReport) {
    if let Some(value) = object.get(field) {
        if is_present(Some(value)) && identifier(value).is_none() {
            report.error(ValidationError::invalid_type(field, "a string or number"));
        }
    }
}

fn non_null<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    object.get(field).filter(|v| !v.is_null())
}

/// Integer-valued JSON number (`4` and `4.0` both qualify, `"4"` does not).
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Identifiers may arrive as strings or numbers.
pub(crate) fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
