//! Target descriptors: a uniform view over "the thing whose value must be
//! supplied", be it a method parameter or an object property.

use serde_json::Value;

use crate::schema::{ParameterSchema, PropertySchema, TypeHint};

/// The schema entry a descriptor was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetHandle<'a> {
    Parameter(&'a ParameterSchema),
    Property(&'a PropertySchema),
}

impl TargetHandle<'_> {
    /// `"parameter"` or `"property"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parameter(_) => "parameter",
            Self::Property(_) => "property",
        }
    }
}

/// Read-only metadata for one bind attempt, plus the raw value looked up for
/// it.
///
/// `raw_value` is `None` when the key was absent from the source mapping and
/// `Some(Value::Null)` for an explicit null.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDescriptor<'a> {
    handle: TargetHandle<'a>,
    raw_value: Option<&'a Value>,
    allows_null: bool,
}

impl<'a> TargetDescriptor<'a> {
    /// Describe a method parameter.
    pub fn for_parameter(param: &'a ParameterSchema, raw_value: Option<&'a Value>) -> Self {
        Self::new(TargetHandle::Parameter(param), raw_value)
    }

    /// Describe an object property.
    pub fn for_property(property: &'a PropertySchema, raw_value: Option<&'a Value>) -> Self {
        Self::new(TargetHandle::Property(property), raw_value)
    }

    fn new(handle: TargetHandle<'a>, raw_value: Option<&'a Value>) -> Self {
        let (hint, default) = match handle {
            TargetHandle::Parameter(p) => (p.type_hint.as_ref(), p.default.as_ref()),
            TargetHandle::Property(p) => (p.type_hint.as_ref(), p.default.as_ref()),
        };
        Self {
            handle,
            raw_value,
            allows_null: compute_allows_null(hint, default),
        }
    }

    /// The parameter or property name.
    pub fn name(&self) -> &'a str {
        match self.handle {
            TargetHandle::Parameter(p) => &p.name,
            TargetHandle::Property(p) => &p.name,
        }
    }

    /// The declared type, if any.
    pub fn type_hint(&self) -> Option<&'a TypeHint> {
        match self.handle {
            TargetHandle::Parameter(p) => p.type_hint.as_ref(),
            TargetHandle::Property(p) => p.type_hint.as_ref(),
        }
    }

    /// The declared type name; `None` means untyped.
    pub fn declared_type(&self) -> Option<&'a str> {
        self.type_hint().map(TypeHint::name)
    }

    pub fn is_array(&self) -> bool {
        self.type_hint().is_some_and(TypeHint::is_array)
    }

    pub fn is_builtin(&self) -> bool {
        self.type_hint().is_some_and(TypeHint::is_builtin)
    }

    /// Whether null is an acceptable value.
    ///
    /// True for explicit nullable hints, `array` and `mixed` types, a `null`
    /// default, and untyped targets without a default.
    pub fn allows_null(&self) -> bool {
        self.allows_null
    }

    pub fn has_default(&self) -> bool {
        self.default_value().is_some()
    }

    pub fn default_value(&self) -> Option<&'a Value> {
        match self.handle {
            TargetHandle::Parameter(p) => p.default.as_ref(),
            TargetHandle::Property(p) => p.default.as_ref(),
        }
    }

    /// The raw inbound value.
    pub fn raw_value(&self) -> Option<&'a Value> {
        self.raw_value
    }

    /// Whether the key was absent from the source mapping.
    pub fn is_absent(&self) -> bool {
        self.raw_value.is_none()
    }

    /// The underlying schema entry.
    pub fn handle(&self) -> TargetHandle<'a> {
        self.handle
    }
}

fn compute_allows_null(hint: Option<&TypeHint>, default: Option<&Value>) -> bool {
    let null_default = matches!(default, Some(Value::Null));
    match hint {
        Some(hint) => hint.is_nullable() || hint.is_array() || hint.name() == "mixed" || null_default,
        None => default.is_none() || null_default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn param(name: &str, hint: &str) -> ParameterSchema {
        ParameterSchema::parse(name, hint).unwrap()
    }

    #[test]
    fn test_descriptor_reads_schema() {
        let p = param("age", "int").with_default(json!(18));
        let raw = json!("42");
        let target = TargetDescriptor::for_parameter(&p, Some(&raw));

        assert_eq!(target.name(), "age");
        assert_eq!(target.declared_type(), Some("int"));
        assert!(target.is_builtin());
        assert!(!target.is_array());
        assert!(target.has_default());
        assert_eq!(target.default_value(), Some(&json!(18)));
        assert_eq!(target.raw_value(), Some(&json!("42")));
        assert_eq!(target.handle().kind(), "parameter");
    }

    #[test]
    fn test_allows_null_sources() {
        assert!(!TargetDescriptor::for_parameter(&param("a", "int"), None).allows_null());
        assert!(TargetDescriptor::for_parameter(&param("a", "?int"), None).allows_null());
        assert!(TargetDescriptor::for_parameter(&param("a", "array"), None).allows_null());

        let null_default = param("a", "int").with_default(Value::Null);
        assert!(TargetDescriptor::for_parameter(&null_default, None).allows_null());

        let untyped = ParameterSchema::untyped("a");
        assert!(TargetDescriptor::for_parameter(&untyped, None).allows_null());

        let untyped_default = ParameterSchema::untyped("a").with_default(json!(1));
        assert!(!TargetDescriptor::for_parameter(&untyped_default, None).allows_null());
    }

    #[test]
    fn test_date_time_is_not_builtin() {
        let p = param("when", "DateTime");
        let target = TargetDescriptor::for_parameter(&p, None);
        assert!(!target.is_builtin());
        assert!(target.is_absent());
    }

    #[test]
    fn test_property_descriptor() {
        let prop = PropertySchema::parse("x", "int").unwrap();
        let raw = Value::Null;
        let target = TargetDescriptor::for_property(&prop, Some(&raw));
        assert_eq!(target.handle().kind(), "property");
        assert!(!target.is_absent());
        assert!(!target.allows_null());
    }
}
