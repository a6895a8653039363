//! Individual binders and the contract they share.
//!
//! Every binder answers one question for a [`TargetDescriptor`]: "is this
//! mine, and if so what is its value?". Returning `Ok(None)` declines the
//! target, which is not an error: the composite binder simply asks the next
//! binder in line.
//!
//! ## Available Binders
//!
//! | Key | Binder | Owns |
//! |-----|--------|------|
//! | `builtin` | [`BuiltinTypeBinder`] | `int`, `float`, `bool`, `string`, `array`, untyped |
//! | `active_record` | [`ActiveRecordBinder`] | `active_record` classes |
//! | `model` | [`FormModelBinder`] | `model` classes |
//! | `data_filter` | [`DataFilterBinder`] | `data_filter` classes |
//! | `date_time` | [`DateTimeBinder`] | `DateTime`, `DateTimeImmutable` |
//! | `container` | [`ContainerBinder`] | types the service locator resolves |
//! | `class_type` | [`ClassTypeBinder`] | `plain` classes |

mod active_record;
mod builtin;
mod class_type;
mod container;
mod data_filter;
mod date_time;
mod form_model;

pub use active_record::ActiveRecordBinder;
pub use builtin::BuiltinTypeBinder;
pub use class_type::ClassTypeBinder;
pub use container::ContainerBinder;
pub use data_filter::DataFilterBinder;
pub use date_time::{DateTimeBinder, DEFAULT_DATE_TIME_FORMATS, RFC3339_FORMAT};
pub use form_model::FormModelBinder;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::BindingConfig;
use crate::context::BindingContext;
use crate::descriptor::TargetDescriptor;
use crate::errors::BindResult;
use crate::schema::{ClassKind, ClassSchema, PropertySchema};
use crate::value::{BindingResult, BoundValue};

/// A single-responsibility binder.
pub trait Binder: Send + Sync {
    /// Claim `target` with a value, or decline with `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Only for input the binder owns but cannot use (malformed filters), or
    /// errors propagated from nested binding.
    fn bind_model(
        &self,
        target: &TargetDescriptor<'_>,
        context: &BindingContext<'_>,
    ) -> BindResult<Option<BindingResult>>;
}

// ============================================================================
// BinderKind
// ============================================================================

/// The built-in binder implementations, addressable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinderKind {
    Builtin,
    ActiveRecord,
    Model,
    DataFilter,
    DateTime,
    Container,
    ClassType,
}

impl BinderKind {
    /// The default chain, in precedence order.
    pub const DEFAULT_ORDER: [BinderKind; 7] = [
        Self::Builtin,
        Self::ActiveRecord,
        Self::Model,
        Self::DataFilter,
        Self::DateTime,
        Self::Container,
        Self::ClassType,
    ];

    /// The default registration key of this binder.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::ActiveRecord => "active_record",
            Self::Model => "model",
            Self::DataFilter => "data_filter",
            Self::DateTime => "date_time",
            Self::Container => "container",
            Self::ClassType => "class_type",
        }
    }

    /// The kind registered under a default key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::DEFAULT_ORDER.into_iter().find(|kind| kind.key() == key)
    }

    /// Construct the binder with options from `config`.
    pub fn instantiate(&self, config: &BindingConfig) -> Arc<dyn Binder> {
        match self {
            Self::Builtin => Arc::new(BuiltinTypeBinder),
            Self::ActiveRecord => Arc::new(ActiveRecordBinder),
            Self::Model => Arc::new(FormModelBinder),
            Self::DataFilter => Arc::new(DataFilterBinder::new(config.data_filter.key.clone())),
            Self::DateTime => Arc::new(DateTimeBinder::new(config.date_time.formats.clone())),
            Self::Container => Arc::new(ContainerBinder),
            Self::ClassType => Arc::new(ClassTypeBinder),
        }
    }
}

impl fmt::Display for BinderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Outcome of the null/absence check every binder starts with.
pub(crate) enum Presence<'v> {
    /// A non-null raw value to convert.
    Value(&'v Value),
    /// Decided without looking at the type: bound null or decline.
    Settled(Option<BindingResult>),
}

/// Apply the shared null/absence rule.
///
/// Absent with a default declines so the caller substitutes the default.
/// Absent or null on a nullable target binds null. Anything else null-ish
/// declines.
pub(crate) fn presence<'v>(target: &TargetDescriptor<'v>) -> Presence<'v> {
    match target.raw_value() {
        None if target.has_default() => Presence::Settled(None),
        None | Some(Value::Null) if target.allows_null() => {
            Presence::Settled(Some(BindingResult::null()))
        }
        None | Some(Value::Null) => Presence::Settled(None),
        Some(value) => Presence::Value(value),
    }
}

/// The registered class of `kind` a target is declared as, if any.
pub(crate) fn registered_class<'c>(
    target: &TargetDescriptor<'_>,
    context: &BindingContext<'c>,
    kind: ClassKind,
) -> Option<&'c ClassSchema> {
    let hint = target.type_hint()?;
    if hint.is_builtin() {
        return None;
    }
    context.registry().get_kind(hint.name(), kind)
}

/// Bind one property from a nested mapping through the full chain.
pub(crate) fn bind_property(
    property: &PropertySchema,
    source: &Map<String, Value>,
    context: &BindingContext<'_>,
) -> BindResult<Option<BoundValue>> {
    let target = TargetDescriptor::for_property(property, source.get(&property.name));
    Ok(context.bind(&target)?.map(|result| result.value))
}

/// Initial value of a property that was not bound.
pub(crate) fn initial_value(property: &PropertySchema) -> BoundValue {
    match &property.default {
        Some(default) => BoundValue::from_json(default.clone()),
        None => BoundValue::zero_for(property.type_hint.as_ref()),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by binder tests.

    use serde_json::Value;

    use crate::composite::CompositeModelBinder;
    use crate::context::{Action, BindingContext, RawParams};
    use crate::descriptor::TargetDescriptor;
    use crate::errors::BindResult;
    use crate::schema::{ParameterSchema, TypeRegistry};
    use crate::value::BindingResult;

    use super::Binder;

    /// Bind a single parameter declared as `hint` with `raw` as its value.
    pub fn bind_one(
        binder: &dyn Binder,
        registry: &TypeRegistry,
        hint: &str,
        raw: Option<Value>,
    ) -> BindResult<Option<BindingResult>> {
        let param = ParameterSchema::parse("target", hint).unwrap();
        bind_param(binder, registry, &param, raw)
    }

    /// Bind `param` with `raw` as its value, using the default chain for
    /// recursion.
    pub fn bind_param(
        binder: &dyn Binder,
        registry: &TypeRegistry,
        param: &ParameterSchema,
        raw: Option<Value>,
    ) -> BindResult<Option<BindingResult>> {
        let mut params = RawParams::new();
        if let Some(raw) = raw {
            params.insert(param.name.clone(), raw);
        }
        let chain = CompositeModelBinder::with_defaults();
        let action = Action::inline("TestController", "index");
        let context = BindingContext::new(&params, &chain, &action, registry);
        let target = TargetDescriptor::for_parameter(param, params.get(&param.name));
        binder.bind_model(&target, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParameterSchema;
    use serde_json::json;

    #[test]
    fn test_default_order_keys() {
        let keys: Vec<&str> = BinderKind::DEFAULT_ORDER.iter().map(BinderKind::key).collect();
        assert_eq!(
            keys,
            vec![
                "builtin",
                "active_record",
                "model",
                "data_filter",
                "date_time",
                "container",
                "class_type"
            ]
        );
        assert_eq!(BinderKind::from_key("date_time"), Some(BinderKind::DateTime));
        assert_eq!(BinderKind::from_key("nope"), None);
    }

    #[test]
    fn test_presence_rules() {
        let required = ParameterSchema::parse("a", "int").unwrap();
        let nullable = ParameterSchema::parse("a", "?int").unwrap();
        let defaulted = ParameterSchema::parse("a", "?int")
            .unwrap()
            .with_default(json!(3));
        let null = Value::Null;
        let five = json!(5);

        let check = |p: &ParameterSchema, raw: Option<&Value>| -> Option<Option<BindingResult>> {
            match presence(&TargetDescriptor::for_parameter(p, raw)) {
                Presence::Settled(outcome) => Some(outcome),
                Presence::Value(_) => None,
            }
        };

        assert_eq!(check(&required, None), Some(None));
        assert_eq!(check(&required, Some(&null)), Some(None));
        assert_eq!(check(&nullable, None), Some(Some(BindingResult::null())));
        assert_eq!(check(&nullable, Some(&null)), Some(Some(BindingResult::null())));
        assert_eq!(check(&defaulted, None), Some(None));
        assert_eq!(check(&defaulted, Some(&null)), Some(Some(BindingResult::null())));
        assert_eq!(check(&required, Some(&five)), None);
    }
}
