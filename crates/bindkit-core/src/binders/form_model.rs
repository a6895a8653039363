//! Form models: mass assignment of safe attributes.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::context::BindingContext;
use crate::descriptor::TargetDescriptor;
use crate::errors::BindResult;
use crate::schema::{ClassKind, ClassSchema};
use crate::value::{BindingResult, BoundValue, ObjectValue};

use super::{bind_property, initial_value, presence, registered_class, Binder, Presence};

/// Binds registered `model` classes.
///
/// Input is the parameter's own mapping or, when the parameter is absent,
/// the request entry named after the model's form name. A mapping that
/// holds the form name as a key is unwrapped first, so `{"LoginForm": {...}}`
/// and `{...}` load the same way. Only safe attributes are assigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormModelBinder;

impl Binder for FormModelBinder {
    fn bind_model(
        &self,
        target: &TargetDescriptor<'_>,
        context: &BindingContext<'_>,
    ) -> BindResult<Option<BindingResult>> {
        let Some(class) = registered_class(target, context, ClassKind::Model) else {
            return Ok(None);
        };

        let data = match target.raw_value() {
            Some(Value::Object(map)) => Some(map),
            None | Some(Value::Null) => match context.param(class.form_name()) {
                Some(Value::Object(map)) => Some(map),
                _ => None,
            },
            Some(_) => None,
        };

        let Some(data) = data else {
            return Ok(match presence(target) {
                Presence::Settled(outcome) => outcome,
                Presence::Value(_) => None,
            });
        };

        load(class, scoped(class, data), context)
    }
}

/// Unwrap `{form_name: {...}}`.
fn scoped<'v>(class: &ClassSchema, data: &'v Map<String, Value>) -> &'v Map<String, Value> {
    match data.get(class.form_name()) {
        Some(Value::Object(inner)) => inner,
        _ => data,
    }
}

fn load(
    class: &ClassSchema,
    data: &Map<String, Value>,
    context: &BindingContext<'_>,
) -> BindResult<Option<BindingResult>> {
    let Some(nested) = context.nested() else {
        warn!(
            class = %class.name,
            depth = context.depth(),
            "binding depth limit reached, declining form model"
        );
        return Ok(None);
    };

    let mut properties = BTreeMap::new();
    for property in class.settable_properties() {
        let bound = if property.safe && data.contains_key(&property.name) {
            bind_property(property, data, &nested)?
        } else {
            None
        };
        properties.insert(
            property.name.clone(),
            bound.unwrap_or_else(|| initial_value(property)),
        );
    }

    let ignored: Vec<&str> = data
        .keys()
        .filter(|key| {
            class
                .property(key)
                .is_none_or(|property| !property.safe || !property.is_settable())
        })
        .map(String::as_str)
        .collect();

    let result = BindingResult::new(BoundValue::Object(ObjectValue::new(&class.name, properties)));
    if ignored.is_empty() {
        return Ok(Some(result));
    }
    debug!(class = %class.name, ignored = ?ignored, "ignored unsafe attributes");
    Ok(Some(result.with_message(format!(
        "ignored unsafe attributes: {}",
        ignored.join(", ")
    ))))
}
