//! Query filter DTOs.

use serde_json::Value;
use tracing::{debug, trace};

use crate::context::BindingContext;
use crate::descriptor::TargetDescriptor;
use crate::errors::{BindResult, BindingError};
use crate::filter::DataFilter;
use crate::schema::ClassKind;
use crate::value::{BindingResult, BoundValue};

use super::{registered_class, Binder};

/// Binds registered `data_filter` classes.
///
/// The payload is read from the parameter's own value, or from the request
/// entry named by `source_key` when one is configured. A present payload
/// that is not a valid filter is an error, not a decline. A missing payload
/// follows the usual null rule: nullable filters bind null, others decline.
#[derive(Debug, Clone, Default)]
pub struct DataFilterBinder {
    source_key: Option<String>,
}

impl DataFilterBinder {
    pub fn new(source_key: Option<String>) -> Self {
        Self { source_key }
    }

    /// The fixed request key payloads are read from, if any.
    pub fn source_key(&self) -> Option<&str> {
        self.source_key.as_deref()
    }
}

impl Binder for DataFilterBinder {
    fn bind_model(
        &self,
        target: &TargetDescriptor<'_>,
        context: &BindingContext<'_>,
    ) -> BindResult<Option<BindingResult>> {
        let Some(class) = registered_class(target, context, ClassKind::DataFilter) else {
            return Ok(None);
        };

        let payload = match &self.source_key {
            Some(key) => context.param(key),
            None => target.raw_value(),
        };
        let payload = match payload {
            None if target.has_default() => return Ok(None),
            None | Some(Value::Null) if target.allows_null() => {
                return Ok(Some(BindingResult::null()));
            }
            None | Some(Value::Null) => {
                trace!(class = %class.name, "no filter payload");
                return Ok(None);
            }
            Some(payload) => payload,
        };

        let filter = DataFilter::parse(class, payload)
            .map_err(|reason| BindingError::malformed_filter(target.name(), reason))?;
        debug!(
            class = %class.name,
            conditions = filter.conditions().len(),
            "bound data filter"
        );
        Ok(Some(BindingResult::new(BoundValue::Filter(filter))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::CompositeModelBinder;
    use crate::context::{Action, RawParams};
    use crate::filter::{FilterCondition, FilterOperator};
    use crate::schema::{ClassSchema, ParameterSchema, PropertySchema, TypeRegistry};
    use serde_json::json;

    fn registry() -> TypeRegistry {
        TypeRegistry::new().with_class(
            ClassSchema::new("UserSearch", ClassKind::DataFilter)
                .with_property(PropertySchema::parse("name", "string").unwrap())
                .with_property(PropertySchema::parse("age", "int").unwrap()),
        )
    }

    fn bind(binder: &DataFilterBinder, params: Value) -> BindResult<Option<BindingResult>> {
        bind_as(binder, "UserSearch", params)
    }

    fn bind_as(
        binder: &DataFilterBinder,
        hint: &str,
        params: Value,
    ) -> BindResult<Option<BindingResult>> {
        let registry = registry();
        let Value::Object(params) = params else { unreachable!() };
        let params: RawParams = params;
        let param = ParameterSchema::parse("search", hint).unwrap();
        let chain = CompositeModelBinder::with_defaults();
        let action = Action::inline("UserController", "index");
        let context = BindingContext::new(&params, &chain, &action, &registry);
        binder.bind_model(
            &TargetDescriptor::for_parameter(&param, params.get("search")),
            &context,
        )
    }

    #[test]
    fn test_reads_payload_by_parameter_name() {
        let binder = DataFilterBinder::default();
        let result = bind(&binder, json!({"search": {"age": {"gte": 18}}}))
            .unwrap()
            .unwrap();
        let filter = result.value.as_filter().unwrap();
        assert_eq!(filter.class(), "UserSearch");
        assert_eq!(
            filter.conditions(),
            &[FilterCondition::Compare {
                attribute: "age".into(),
                operator: FilterOperator::Gte,
                value: json!(18),
            }]
        );

        // The legacy key is ignored unless configured.
        assert_eq!(bind(&binder, json!({"filter": {"age": 1}})).unwrap(), None);
    }

    #[test]
    fn test_fixed_source_key() {
        let binder = DataFilterBinder::new(Some("filter".to_string()));
        let result = bind(&binder, json!({"filter": {"name": "ana"}, "search": "ignored"}))
            .unwrap()
            .unwrap();
        assert_eq!(result.value.as_filter().unwrap().conditions().len(), 1);
        assert_eq!(binder.source_key(), Some("filter"));
    }

    #[test]
    fn test_absent_or_null_declines() {
        let binder = DataFilterBinder::default();
        assert_eq!(bind(&binder, json!({})).unwrap(), None);
        assert_eq!(bind(&binder, json!({"search": null})).unwrap(), None);
    }

    #[test]
    fn test_nullable_filter_binds_null() {
        let binder = DataFilterBinder::default();
        let absent = bind_as(&binder, "?UserSearch", json!({})).unwrap().unwrap();
        assert_eq!(absent.value, BoundValue::Null);
        let null = bind_as(&binder, "?UserSearch", json!({"search": null}))
            .unwrap()
            .unwrap();
        assert_eq!(null.value, BoundValue::Null);

        // The configured source key is what counts as absent.
        let keyed = DataFilterBinder::new(Some("filter".to_string()));
        let result = bind_as(&keyed, "?UserSearch", json!({"search": {"age": 1}}))
            .unwrap()
            .unwrap();
        assert_eq!(result.value, BoundValue::Null);
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let binder = DataFilterBinder::default();
        let err = bind(&binder, json!({"search": "age>3"})).unwrap_err();
        assert!(matches!(err, BindingError::MalformedFilter { ref parameter, .. } if parameter == "search"));

        let err = bind(&binder, json!({"search": {"password": "x"}})).unwrap_err();
        assert!(err.is_request_error());
    }
}
