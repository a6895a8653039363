//! Integration tests for action parameter binding.
//!
//! These tests drive `ActionParameterBinder` end to end:
//! - Scalar coercion and declines surfacing as missing parameters
//! - Date/time, nested objects, form models, entities, filters, services
//! - Result invariants, defaults, precedence and idempotence

use std::sync::Arc;

use bindkit_core::{
    Action, ActionParameterBinder, ArgumentValue, Binder, BindingConfig, BindingContext,
    BindingError, BindingResult, BoundValue, ClassKind, ClassSchema, CompositeModelBinder,
    InMemoryRepository, MethodSchema, ParameterSchema, PropertySchema, RawParams,
    ServiceContainer, TargetDescriptor, TypeRegistry,
};
use serde_json::{json, Value};

struct Mailer {
    from: &'static str,
}

fn params(value: Value) -> RawParams {
    match value {
        Value::Object(map) => map,
        other => panic!("params must be an object, got {other}"),
    }
}

fn param(name: &str, hint: &str) -> ParameterSchema {
    ParameterSchema::parse(name, hint).expect("valid type hint")
}

fn property(name: &str, hint: &str) -> PropertySchema {
    PropertySchema::parse(name, hint).expect("valid type hint")
}

/// A registry with one controller action per scenario plus supporting classes.
fn registry() -> TypeRegistry {
    let controller = ClassSchema::new("SiteController", ClassKind::Controller)
        .with_method(MethodSchema::new("actionAge", vec![param("age", "int")]))
        .with_method(MethodSchema::new("actionToggle", vec![param("active", "bool")]))
        .with_method(MethodSchema::new("actionSchedule", vec![param("when", "DateTime")]))
        .with_method(MethodSchema::new("actionDraw", vec![param("model", "Point")]))
        .with_method(MethodSchema::new(
            "actionList",
            vec![
                param("page", "int").with_default(json!(1)),
                param("sort", "string").with_default(json!("id")),
                param("tags", "array").with_default(Value::Null),
            ],
        ))
        .with_method(MethodSchema::new(
            "actionSearch",
            vec![param("search", "UserSearch"), param("limit", "?int")],
        ))
        .with_method(MethodSchema::new(
            "actionNotify",
            vec![param("mailer", "Mailer"), param("message", "string")],
        ))
        .with_method(MethodSchema::new("actionLogin", vec![param("form", "LoginForm")]))
        .with_method(MethodSchema::new("actionPost", vec![param("post", "Post")]))
        .with_method(MethodSchema::new(
            "actionMixed",
            vec![
                ParameterSchema::untyped("anything"),
                param("items", "array"),
                param("note", "?string"),
            ],
        ));

    TypeRegistry::new()
        .with_class(controller)
        .with_class(
            ClassSchema::new("Point", ClassKind::Plain)
                .with_property(property("x", "int"))
                .with_property(property("y", "int")),
        )
        .with_class(
            ClassSchema::new("UserSearch", ClassKind::DataFilter)
                .with_property(property("name", "string"))
                .with_property(property("age", "int")),
        )
        .with_class(
            ClassSchema::new("LoginForm", ClassKind::Model)
                .with_property(property("username", "string"))
                .with_property(property("password", "string")),
        )
        .with_class(
            ClassSchema::new("Post", ClassKind::ActiveRecord)
                .with_property(property("id", "int"))
                .with_property(property("title", "string")),
        )
}

fn binder() -> ActionParameterBinder {
    let services = ServiceContainer::new().with_service(
        "Mailer",
        Mailer {
            from: "noreply@example.com",
        },
    );
    let entities = InMemoryRepository::new().with_record(
        "Post",
        params(json!({"id": 10, "title": "First"})),
    );
    ActionParameterBinder::new(Arc::new(registry()))
        .with_services(Arc::new(services))
        .with_entities(Arc::new(entities))
}

fn bind(action: &str, raw: Value) -> bindkit_core::ActionBindingResult {
    binder()
        .bind_action_params(&Action::inline("SiteController", action), &params(raw))
        .expect("binding should not fail")
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_int_string_binds_as_integer() {
    let result = bind("age", json!({"age": "42"}));
    assert_eq!(result.argument("age"), Some(&ArgumentValue::Bound(BoundValue::Int(42))));
    assert!(result.missing().is_empty());
}

#[test]
fn test_bool_off_binds_false() {
    let result = bind("toggle", json!({"active": "off"}));
    assert_eq!(result.value("active"), Some(&BoundValue::Bool(false)));
}

#[test]
fn test_bool_maybe_is_missing() {
    let result = bind("toggle", json!({"active": "maybe"}));
    assert_eq!(result.missing(), &["active".to_string()]);
    assert_eq!(result.argument("active"), Some(&ArgumentValue::Unresolved));
}

#[test]
fn test_date_formats_back() {
    let result = bind("schedule", json!({"when": "2020-01-01"}));
    let when = result
        .value("when")
        .and_then(BoundValue::as_date_time)
        .expect("date/time bound");
    assert_eq!(when.format("%Y-%m-%d"), "2020-01-01");
}

#[test]
fn test_bad_date_is_missing() {
    let result = bind("schedule", json!({"when": "not-a-date"}));
    assert_eq!(result.missing(), &["when".to_string()]);
}

#[test]
fn test_plain_object_binds_integer_fields() {
    let result = bind("draw", json!({"model": {"x": "25", "y": "35"}}));
    let point = result
        .value("model")
        .and_then(BoundValue::as_object)
        .expect("object bound");
    assert_eq!(point.get("x"), Some(&BoundValue::Int(25)));
    assert_eq!(point.get("y"), Some(&BoundValue::Int(35)));
}

// ============================================================================
// Invariants and boundaries
// ============================================================================

#[test]
fn test_arguments_match_parameters() {
    for (action, raw) in [
        ("age", json!({})),
        ("list", json!({"page": "x"})),
        ("mixed", json!({"anything": 1})),
        ("notify", json!({"message": ["not", "a", "string"]})),
    ] {
        let result = bind(action, raw);
        let mut names: Vec<&str> = result.parameters().iter().map(|p| p.name.as_str()).collect();
        let mut keys: Vec<&str> = result.arguments().keys().map(String::as_str).collect();
        names.sort_unstable();
        keys.sort_unstable();
        assert_eq!(names, keys, "action {action}");

        for (name, argument) in result.ordered_arguments() {
            assert_eq!(
                argument.is_unresolved(),
                result.missing().iter().any(|m| m == name),
                "action {action}, parameter {name}"
            );
        }
    }
}

#[test]
fn test_only_defaults_with_empty_params() {
    let result = bind("list", json!({}));
    assert!(result.missing().is_empty());
    assert_eq!(
        result.argument("page"),
        Some(&ArgumentValue::Defaulted(BoundValue::Int(1)))
    );
    assert_eq!(
        result.argument("sort"),
        Some(&ArgumentValue::Defaulted(BoundValue::String("id".into())))
    );
    // Absent with a default always declines, even when null is allowed.
    assert_eq!(result.argument("tags"), Some(&ArgumentValue::Defaulted(BoundValue::Null)));
}

#[test]
fn test_unconvertible_value_with_default_uses_default() {
    let result = bind("list", json!({"page": "abc", "sort": "name"}));
    assert_eq!(
        result.argument("page"),
        Some(&ArgumentValue::Defaulted(BoundValue::Int(1)))
    );
    assert_eq!(result.value("sort"), Some(&BoundValue::String("name".into())));
}

#[test]
fn test_array_null_is_bound_not_missing() {
    let result = bind("mixed", json!({"items": null}));
    assert_eq!(result.argument("items"), Some(&ArgumentValue::Bound(BoundValue::Null)));
    assert_eq!(result.argument("note"), Some(&ArgumentValue::Bound(BoundValue::Null)));
    assert_eq!(result.argument("anything"), Some(&ArgumentValue::Bound(BoundValue::Null)));
    assert!(result.is_complete());
}

#[test]
fn test_lookup_is_exact_name() {
    let result = bind("age", json!({"Age": "42", "age ": "1"}));
    assert_eq!(result.missing(), &["age".to_string()]);
}

#[test]
fn test_binding_is_idempotent() {
    let binder = binder();
    let action = Action::inline("SiteController", "draw");
    let raw = params(json!({"model": {"x": "1", "y": 2}}));
    let first = binder.bind_action_params(&action, &raw).unwrap();
    let second = binder.bind_action_params(&action, &raw).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Collaborators and other binders
// ============================================================================

#[test]
fn test_service_resolved_from_container() {
    let result = bind("notify", json!({"message": 5}));
    let mailer = result
        .value("mailer")
        .and_then(BoundValue::as_service)
        .and_then(|s| s.downcast_ref::<Mailer>())
        .expect("mailer resolved");
    assert_eq!(mailer.from, "noreply@example.com");
    assert_eq!(result.value("message"), Some(&BoundValue::String("5".into())));
}

#[test]
fn test_entity_lookup_and_miss() {
    let found = bind("post", json!({"post": "10"}));
    let post = found.value("post").and_then(BoundValue::as_entity).unwrap();
    assert_eq!(post.get("title"), Some(&BoundValue::String("First".into())));

    let missing = bind("post", json!({"post": "11"}));
    assert_eq!(missing.missing(), &["post".to_string()]);
}

#[test]
fn test_form_model_from_form_name() {
    let result = bind("login", json!({"LoginForm": {"username": "ana", "password": "pw"}}));
    let form = result.value("form").and_then(BoundValue::as_object).unwrap();
    assert_eq!(form.get("username"), Some(&BoundValue::String("ana".into())));
}

#[test]
fn test_filter_binding_and_malformed_error() {
    let result = bind("search", json!({"search": {"name": {"like": "an"}}, "limit": "5"}));
    assert_eq!(result.value("search").and_then(BoundValue::as_filter).map(|f| f.conditions().len()), Some(1));
    assert_eq!(result.value("limit"), Some(&BoundValue::Int(5)));

    let err = binder()
        .bind_action_params(
            &Action::inline("SiteController", "search"),
            &params(json!({"search": ["name"]})),
        )
        .unwrap_err();
    assert!(matches!(err, BindingError::MalformedFilter { .. }));
    assert!(err.is_request_error());
}

#[test]
fn test_legacy_filter_key() {
    let mut config = BindingConfig::default();
    config.data_filter.key = Some("filter".into());
    let binder = ActionParameterBinder::from_config(Arc::new(registry()), config);
    let result = binder
        .bind_action_params(
            &Action::inline("SiteController", "search"),
            &params(json!({"filter": {"age": 30}})),
        )
        .unwrap();
    assert!(result.value("search").and_then(BoundValue::as_filter).is_some());
}

// ============================================================================
// Precedence
// ============================================================================

/// Claims `Point` targets before the class binder gets to them.
struct PointShortcut;

impl Binder for PointShortcut {
    fn bind_model(
        &self,
        target: &TargetDescriptor<'_>,
        _context: &BindingContext<'_>,
    ) -> bindkit_core::BindResult<Option<BindingResult>> {
        Ok((target.declared_type() == Some("Point"))
            .then(|| BindingResult::new(BoundValue::String("shortcut".into()))))
    }
}

#[test]
fn test_custom_binder_precedence() {
    let chain = CompositeModelBinder::with_defaults().with_binder("date_time", Arc::new(PointShortcut));
    let binder = ActionParameterBinder::new(Arc::new(registry())).with_binder(Arc::new(chain));

    let action = Action::inline("SiteController", "draw");
    let raw = params(json!({"model": {"x": 1, "y": 2}}));
    for _ in 0..3 {
        let result = binder.bind_action_params(&action, &raw).unwrap();
        assert_eq!(result.value("model"), Some(&BoundValue::String("shortcut".into())));
    }

    // The replaced date/time binder no longer claims dates.
    let result = binder
        .bind_action_params(
            &Action::inline("SiteController", "schedule"),
            &params(json!({"when": "2020-01-01"})),
        )
        .unwrap();
    assert_eq!(result.missing(), &["when".to_string()]);
}

#[test]
fn test_standalone_and_unknown_actions() {
    let registry = registry()
        .with_class(
            ClassSchema::new("ExportController", ClassKind::Controller).with_action("csv", "CsvAction"),
        )
        .with_class(
            ClassSchema::new("CsvAction", ClassKind::Action)
                .with_method(MethodSchema::new("run", vec![param("rows", "int")])),
        );
    registry.validate().unwrap();

    let action = registry.action("ExportController", "csv").unwrap();
    let binder = ActionParameterBinder::new(Arc::new(registry));
    let result = binder.bind_action_params(&action, &params(json!({"rows": "3"}))).unwrap();
    assert_eq!(result.value("rows"), Some(&BoundValue::Int(3)));

    let err = binder
        .bind_action_params(&Action::inline("ExportController", "pdf"), &RawParams::new())
        .unwrap_err();
    assert!(matches!(err, BindingError::MethodNotFound { .. }));
}
