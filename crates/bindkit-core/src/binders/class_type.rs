//! Plain object graphs.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{trace, warn};

use crate::context::BindingContext;
use crate::descriptor::TargetDescriptor;
use crate::errors::BindResult;
use crate::schema::ClassKind;
use crate::value::{BindingResult, BoundValue, ObjectValue};

use super::{bind_property, initial_value, presence, registered_class, Binder, Presence};

/// Binds registered `plain` classes from a nested mapping.
///
/// Each settable property is bound through the full chain. A property no
/// binder claims keeps its default, or its type's zero value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassTypeBinder;

impl Binder for ClassTypeBinder {
    fn bind_model(
        &self,
        target: &TargetDescriptor<'_>,
        context: &BindingContext<'_>,
    ) -> BindResult<Option<BindingResult>> {
        let Some(class) = registered_class(target, context, ClassKind::Plain) else {
            return Ok(None);
        };

        let raw = match presence(target) {
            Presence::Settled(outcome) => return Ok(outcome),
            Presence::Value(raw) => raw,
        };
        let Value::Object(source) = raw else {
            trace!(class = %class.name, "plain class expects a mapping");
            return Ok(None);
        };

        let Some(nested) = context.nested() else {
            warn!(
                class = %class.name,
                depth = context.depth(),
                "binding depth limit reached, declining nested object"
            );
            return Ok(None);
        };

        let mut properties = BTreeMap::new();
        for property in class.settable_properties() {
            let value = match bind_property(property, source, &nested)? {
                Some(value) => value,
                None => initial_value(property),
            };
            properties.insert(property.name.clone(), value);
        }

        Ok(Some(BindingResult::new(BoundValue::Object(ObjectValue::new(
            &class.name,
            properties,
        )))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binders::test_support::bind_one;
    use crate::schema::{ClassSchema, PropertySchema, TypeRegistry};
    use serde_json::json;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_class(
                ClassSchema::new("Point", ClassKind::Plain)
                    .with_property(PropertySchema::parse("x", "int").unwrap())
                    .with_property(PropertySchema::parse("y", "int").unwrap()),
            )
            .with_class(
                ClassSchema::new("Segment", ClassKind::Plain)
                    .with_property(PropertySchema::parse("from", "Point").unwrap())
                    .with_property(PropertySchema::parse("to", "?Point").unwrap())
                    .with_property(PropertySchema::parse("label", "string").unwrap().with_default(json!("segment")))
                    .with_property(PropertySchema::parse("secret", "string").unwrap().as_read_only()),
            )
            .with_class(
                ClassSchema::new("Node", ClassKind::Plain)
                    .with_property(PropertySchema::parse("value", "int").unwrap())
                    .with_property(PropertySchema::parse("child", "?Node").unwrap()),
            )
    }

    fn object(hint: &str, raw: Value) -> Option<ObjectValue> {
        bind_one(&ClassTypeBinder, &registry(), hint, Some(raw))
            .unwrap()
            .map(|r| r.value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_binds_properties_recursively() {
        let point = object("Point", json!({"x": "25", "y": "35"})).unwrap();
        assert_eq!(point.class(), "Point");
        assert_eq!(point.get("x"), Some(&BoundValue::Int(25)));
        assert_eq!(point.get("y"), Some(&BoundValue::Int(35)));
    }

    #[test]
    fn test_unbound_properties_take_defaults_or_zero() {
        let point = object("Point", json!({"x": "nope"})).unwrap();
        assert_eq!(point.get("x"), Some(&BoundValue::Int(0)));
        assert_eq!(point.get("y"), Some(&BoundValue::Int(0)));

        let segment = object("Segment", json!({"from": {"x": 1, "y": 2}})).unwrap();
        let from = segment.get("from").and_then(BoundValue::as_object).unwrap();
        assert_eq!(from.get("y"), Some(&BoundValue::Int(2)));
        assert_eq!(segment.get("to"), Some(&BoundValue::Null));
        assert_eq!(segment.get("label"), Some(&BoundValue::String("segment".into())));
        assert!(segment.get("secret").is_none());
    }

    #[test]
    fn test_requires_mapping() {
        assert_eq!(object("Point", json!("1,2")), None);
        assert_eq!(object("Point", json!([1, 2])), None);
        assert_eq!(object("Unknown", json!({"x": 1})), None);
    }

    #[test]
    fn test_depth_limit_declines() {
        use crate::composite::CompositeModelBinder;
        use crate::context::{Action, RawParams};
        use crate::schema::ParameterSchema;

        let registry = registry();
        let param = ParameterSchema::parse("node", "Node").unwrap();
        let raw = json!({"value": 1, "child": {"value": 2, "child": {"value": 3}}});
        let params = RawParams::new();
        let chain = CompositeModelBinder::with_defaults();
        let action = Action::inline("SiteController", "index");
        let context = BindingContext::new(&params, &chain, &action, &registry).with_max_depth(1);

        let node = ClassTypeBinder
            .bind_model(&TargetDescriptor::for_parameter(&param, Some(&raw)), &context)
            .unwrap()
            .unwrap();
        let node = node.value.as_object().unwrap();
        assert_eq!(node.get("value"), Some(&BoundValue::Int(1)));
        // The second level would exceed the limit, so the child falls back to null.
        assert_eq!(node.get("child"), Some(&BoundValue::Null));
    }
}
