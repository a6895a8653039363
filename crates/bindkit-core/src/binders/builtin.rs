//! Scalar and array coercion.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::context::BindingContext;
use crate::descriptor::TargetDescriptor;
use crate::errors::BindResult;
use crate::value::{json_type_name, BindingResult, BoundValue};

use super::{presence, Binder, Presence};

static INT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("Invalid regex"));

static FLOAT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("Invalid regex")
});

/// Binds `int`, `float`, `bool`, `string`, `array`, `mixed` and untyped
/// targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTypeBinder;

impl Binder for BuiltinTypeBinder {
    fn bind_model(
        &self,
        target: &TargetDescriptor<'_>,
        _context: &BindingContext<'_>,
    ) -> BindResult<Option<BindingResult>> {
        let type_name = match target.type_hint() {
            None => None,
            Some(hint) if hint.is_builtin() => Some(hint.name()),
            Some(_) => return Ok(None),
        };

        let raw = match presence(target) {
            Presence::Settled(outcome) => return Ok(outcome),
            Presence::Value(raw) => raw,
        };

        let converted = match type_name {
            None | Some("mixed") => Some(BoundValue::from_json(raw.clone())),
            Some("int") => to_int(raw),
            Some("float") => to_float(raw),
            Some("bool") => to_bool(raw),
            Some("string") => to_string(raw),
            Some("array") => Some(to_array(raw)),
            Some(_) => None,
        };

        let Some(value) = converted else {
            trace!(
                target_name = target.name(),
                raw_type = json_type_name(raw),
                "builtin binder cannot convert value"
            );
            return Ok(None);
        };

        let raw_type = json_type_name(raw);
        let result = BindingResult::new(value);
        Ok(Some(match type_name {
            Some(wanted) if wanted != "mixed" && wanted != raw_type && !widens(raw_type, wanted) => {
                result.with_message(format!("coerced {raw_type} to {wanted}"))
            }
            _ => result,
        }))
    }
}

/// JSON shapes that satisfy a type without a coercion note.
fn widens(raw_type: &str, wanted: &str) -> bool {
    matches!((raw_type, wanted), ("int", "float") | ("object", "array"))
}

fn to_int(raw: &Value) -> Option<BoundValue> {
    match raw {
        Value::Number(n) => n.as_i64().map(BoundValue::Int),
        Value::String(s) if INT_PATTERN.is_match(s) => s.parse::<i64>().ok().map(BoundValue::Int),
        _ => None,
    }
}

fn to_float(raw: &Value) -> Option<BoundValue> {
    match raw {
        Value::Number(n) => n.as_f64().map(BoundValue::Float),
        Value::String(s) if FLOAT_PATTERN.is_match(s) => {
            s.parse::<f64>().ok().filter(|f| f.is_finite()).map(BoundValue::Float)
        }
        _ => None,
    }
}

fn to_bool(raw: &Value) -> Option<BoundValue> {
    let parsed = match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed.map(BoundValue::Bool)
}

fn to_string(raw: &Value) -> Option<BoundValue> {
    match raw {
        Value::String(s) => Some(BoundValue::String(s.clone())),
        Value::Number(n) => Some(BoundValue::String(n.to_string())),
        Value::Bool(true) => Some(BoundValue::String("1".to_string())),
        Value::Bool(false) => Some(BoundValue::String(String::new())),
        _ => None,
    }
}

fn to_array(raw: &Value) -> BoundValue {
    match raw {
        Value::Array(_) | Value::Object(_) => BoundValue::Array(raw.clone()),
        scalar => BoundValue::Array(Value::Array(vec![scalar.clone()])),
    }
}
