//! Formatting helpers for bound values.

use std::collections::BTreeMap;

use bindkit_core::BoundValue;
use serde_json::{Map, Value};

/// Truncate a string to a maximum length, adding "..." if truncated.
///
/// Counts characters, not bytes.
///
/// ```
/// use bindkit_cli::ui::format::truncate_str;
///
/// assert_eq!(truncate_str("hello", 10), "hello");
/// assert_eq!(truncate_str("hello world", 8), "hello...");
/// ```
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// One-line summary of a bound value for tables.
pub fn summarize_value(value: &BoundValue) -> String {
    match value {
        BoundValue::DateTime(dt) => {
            format!("{} {}", dt.variant().type_name(), dt.value().to_rfc3339())
        }
        BoundValue::Service(service) => format!("service {}", service.type_name()),
        BoundValue::Object(object) => format!("{} {}", object.class(), fields(object.properties())),
        BoundValue::Entity(entity) => match &entity.key {
            Some(key) if !entity.is_new_record => {
                format!("{}#{} {}", entity.class, scalar(key), fields(&entity.attributes))
            }
            _ => format!("{} (new) {}", entity.class, fields(&entity.attributes)),
        },
        BoundValue::Filter(filter) => {
            let count = filter.conditions().len();
            format!(
                "{} filter, {} condition{}",
                filter.class(),
                count,
                if count == 1 { "" } else { "s" }
            )
        }
        other => other.to_json().to_string(),
    }
}

fn fields(values: &BTreeMap<String, BoundValue>) -> String {
    let map: Map<String, Value> = values
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();
    Value::Object(map).to_string()
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
