//! Bound values and binder results.
//!
//! [`BoundValue`] is what a binder hands back once it claims a target. It is
//! typed (an `int` target yields [`BoundValue::Int`], never a string) and can
//! be rendered back to JSON for display.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::filter::DataFilter;
use crate::schema::TypeHint;

// ============================================================================
// DateTimeValue
// ============================================================================

/// Which date/time type a target asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateTimeVariant {
    /// `DateTime`.
    Mutable,
    /// `DateTimeImmutable` (also used for `DateTimeInterface`).
    Immutable,
}

impl DateTimeVariant {
    /// Map a declared type name to the variant it asks for.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "DateTime" => Some(Self::Mutable),
            "DateTimeImmutable" | "DateTimeInterface" => Some(Self::Immutable),
            _ => None,
        }
    }

    /// The concrete type name of the variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Mutable => "DateTime",
            Self::Immutable => "DateTimeImmutable",
        }
    }
}

/// A parsed date/time of a specific variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeValue {
    variant: DateTimeVariant,
    value: DateTime<FixedOffset>,
    matched_format: String,
}

impl DateTimeValue {
    /// Create a date/time value.
    pub fn new(
        variant: DateTimeVariant,
        value: DateTime<FixedOffset>,
        matched_format: impl Into<String>,
    ) -> Self {
        Self {
            variant,
            value,
            matched_format: matched_format.into(),
        }
    }

    /// The variant this value was bound as.
    pub fn variant(&self) -> DateTimeVariant {
        self.variant
    }

    /// The underlying timestamp.
    pub fn value(&self) -> &DateTime<FixedOffset> {
        &self.value
    }

    /// The input format that parsed successfully.
    pub fn matched_format(&self) -> &str {
        &self.matched_format
    }

    /// Render with a chrono format string.
    pub fn format(&self, fmt: &str) -> String {
        self.value.format(fmt).to_string()
    }
}

// ============================================================================
// ServiceInstance
// ============================================================================

/// A service resolved from the service locator.
///
/// Equality is identity: two instances are equal when they share the same
/// allocation.
#[derive(Clone)]
pub struct ServiceInstance {
    type_name: String,
    instance: Arc<dyn Any + Send + Sync>,
}

impl ServiceInstance {
    /// Wrap a service value.
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<String>, instance: T) -> Self {
        Self::from_arc(type_name, Arc::new(instance))
    }

    /// Wrap an already shared service.
    pub fn from_arc(type_name: impl Into<String>, instance: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            type_name: type_name.into(),
            instance,
        }
    }

    /// The type name the service was registered under.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Borrow the service as a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ServiceInstance {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && Arc::ptr_eq(&self.instance, &other.instance)
    }
}

// ============================================================================
// ObjectValue / EntityValue
// ============================================================================

/// A constructed plain object or form model.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    class: String,
    properties: BTreeMap<String, BoundValue>,
}

impl ObjectValue {
    /// Create an object of `class` with the given property values.
    pub fn new(class: impl Into<String>, properties: BTreeMap<String, BoundValue>) -> Self {
        Self {
            class: class.into(),
            properties,
        }
    }

    /// The class name.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// A property value.
    pub fn get(&self, name: &str) -> Option<&BoundValue> {
        self.properties.get(name)
    }

    /// All property values.
    pub fn properties(&self) -> &BTreeMap<String, BoundValue> {
        &self.properties
    }
}

/// A domain entity, either loaded by key or newly instantiated.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityValue {
    /// The entity class.
    pub class: String,
    /// Primary key value; `None` for new records.
    pub key: Option<Value>,
    /// Attribute values.
    pub attributes: BTreeMap<String, BoundValue>,
    /// Whether the record has not been persisted yet.
    pub is_new_record: bool,
}

impl EntityValue {
    /// A record loaded from storage.
    pub fn existing(
        class: impl Into<String>,
        key: Value,
        attributes: BTreeMap<String, BoundValue>,
    ) -> Self {
        Self {
            class: class.into(),
            key: Some(key),
            attributes,
            is_new_record: false,
        }
    }

    /// A record that does not exist in storage yet.
    pub fn new_record(class: impl Into<String>, attributes: BTreeMap<String, BoundValue>) -> Self {
        Self {
            class: class.into(),
            key: None,
            attributes,
            is_new_record: true,
        }
    }

    /// An attribute value.
    pub fn get(&self, name: &str) -> Option<&BoundValue> {
        self.attributes.get(name)
    }
}

// ============================================================================
// BoundValue
// ============================================================================

/// A value produced by a binder.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    /// A legitimately bound null (distinct from "no binder matched").
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    /// A list or mapping, kept as JSON.
    Array(Value),
    DateTime(DateTimeValue),
    Service(ServiceInstance),
    Object(ObjectValue),
    Entity(EntityValue),
    Filter(DataFilter),
}

impl BoundValue {
    /// Convert a raw JSON value without any coercion.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::String(s),
            value @ (Value::Array(_) | Value::Object(_)) => Self::Array(value),
        }
    }

    /// The natural zero value of a declared type.
    ///
    /// Nullable, untyped and class types start out as null.
    pub fn zero_for(hint: Option<&TypeHint>) -> Self {
        match hint {
            Some(hint) if !hint.is_nullable() => match hint.name() {
                "int" => Self::Int(0),
                "float" => Self::Float(0.0),
                "bool" => Self::Bool(false),
                "string" => Self::String(String::new()),
                "array" => Self::Array(json!([])),
                _ => Self::Null,
            },
            _ => Self::Null,
        }
    }

    /// Render as JSON for display and serialization.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Int(i) => json!(i),
            Self::Float(f) => json!(f),
            Self::Bool(b) => json!(b),
            Self::String(s) => json!(s),
            Self::Array(v) => v.clone(),
            Self::DateTime(dt) => json!({
                "type": dt.variant().type_name(),
                "value": dt.value().to_rfc3339(),
            }),
            Self::Service(service) => json!({ "service": service.type_name() }),
            Self::Object(object) => {
                let mut map = Map::new();
                map.insert("class".to_string(), json!(object.class()));
                let props: Map<String, Value> = object
                    .properties()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                map.insert("properties".to_string(), Value::Object(props));
                Value::Object(map)
            }
            Self::Entity(entity) => {
                let attributes: Map<String, Value> = entity
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                json!({
                    "class": entity.class,
                    "key": entity.key,
                    "isNewRecord": entity.is_new_record,
                    "attributes": attributes,
                })
            }
            Self::Filter(filter) => filter.to_json(),
        }
    }

    /// A short name for the kind of value, used in tables and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::DateTime(_) => "datetime",
            Self::Service(_) => "service",
            Self::Object(_) => "object",
            Self::Entity(_) => "entity",
            Self::Filter(_) => "filter",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<&DateTimeValue> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityValue> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_filter(&self) -> Option<&DataFilter> {
        match self {
            Self::Filter(filter) => Some(filter),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceInstance> {
        match self {
            Self::Service(service) => Some(service),
            _ => None,
        }
    }
}

impl Serialize for BoundValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// JSON type name of a raw value.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// BindingResult
// ============================================================================

/// A binder's claim on a target: the bound value plus an optional note.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingResult {
    /// The bound value.
    pub value: BoundValue,
    /// Informational message (e.g., a coercion note).
    pub message: Option<String>,
}

impl BindingResult {
    /// Create a result without a message.
    pub fn new(value: BoundValue) -> Self {
        Self {
            value,
            message: None,
        }
    }

    /// Attach an informational message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// A bound null.
    pub fn null() -> Self {
        Self::new(BoundValue::Null)
    }
}
