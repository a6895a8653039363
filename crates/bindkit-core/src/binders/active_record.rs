//! Domain entity lookup and instantiation.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::context::BindingContext;
use crate::descriptor::TargetDescriptor;
use crate::errors::BindResult;
use crate::schema::{ClassKind, ClassSchema};
use crate::value::{BindingResult, BoundValue, EntityValue};

use super::{bind_property, presence, registered_class, Binder, Presence};

/// Binds registered `active_record` classes.
///
/// - A scalar raw value is a primary key: the entity is looked up, and a miss
///   declines.
/// - A mapping carrying the primary key is looked up the same way, then the
///   other provided attributes are applied on top.
/// - A mapping without a key instantiates a new record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveRecordBinder;

impl Binder for ActiveRecordBinder {
    fn bind_model(
        &self,
        target: &TargetDescriptor<'_>,
        context: &BindingContext<'_>,
    ) -> BindResult<Option<BindingResult>> {
        let Some(class) = registered_class(target, context, ClassKind::ActiveRecord) else {
            return Ok(None);
        };

        let raw = match presence(target) {
            Presence::Settled(outcome) => return Ok(outcome),
            Presence::Value(raw) => raw,
        };

        match raw {
            Value::Object(source) => bind_from_mapping(class, source, context),
            key if is_key(key) => Ok(find(class, key, context).map(entity_result)),
            _ => {
                trace!(class = %class.name, "active record expects a key or a mapping");
                Ok(None)
            }
        }
    }
}

fn bind_from_mapping(
    class: &ClassSchema,
    source: &Map<String, Value>,
    context: &BindingContext<'_>,
) -> BindResult<Option<BindingResult>> {
    let Some(nested) = context.nested() else {
        warn!(
            class = %class.name,
            depth = context.depth(),
            "binding depth limit reached, declining entity"
        );
        return Ok(None);
    };

    let pk = class.primary_key();
    let key = source.get(pk).filter(|key| is_key(key));

    let mut attributes = BTreeMap::new();
    for property in class.settable_properties() {
        if property.name == pk || !source.contains_key(&property.name) {
            continue;
        }
        if let Some(value) = bind_property(property, source, &nested)? {
            attributes.insert(property.name.clone(), value);
        }
    }

    let entity = match key {
        Some(key) => {
            let Some(mut entity) = find(class, key, context) else {
                return Ok(None);
            };
            entity.attributes.extend(attributes);
            entity
        }
        None => {
            debug!(class = %class.name, "instantiating new record");
            context.entities().instantiate(class, attributes)
        }
    };
    Ok(Some(entity_result(entity)))
}

fn find(class: &ClassSchema, key: &Value, context: &BindingContext<'_>) -> Option<EntityValue> {
    let found = context.entities().find_by_key(class, key);
    if found.is_none() {
        trace!(class = %class.name, key = %key, "entity not found");
    }
    found
}

fn entity_result(entity: EntityValue) -> BindingResult {
    BindingResult::new(BoundValue::Entity(entity))
}

fn is_key(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Number(_) => true,
        _ => false,
    }
}
