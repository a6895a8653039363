//! Type metadata for classes, methods, parameters and properties.
//!
//! Binders never see language reflection. Everything they need to know about
//! a target (its declared type, default, visibility) is declared here as
//! plain data, either built in code or deserialized from a manifest:
//!
//! ```yaml
//! classes:
//!   - name: SiteController
//!     kind: controller
//!     methods:
//!       - name: actionView
//!         parameters:
//!           - { name: id, type: int }
//!           - { name: mode, type: "?string", default: null }
//!   - name: Point
//!     properties:
//!       - { name: x, type: int }
//!       - { name: y, type: int }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::context::Action;
use crate::errors::{BindResult, BindingError};

/// Type names treated as builtin scalars/containers.
///
/// Date/time types are deliberately absent: they have their own binder.
pub const BUILTIN_TYPES: &[&str] = &["int", "float", "bool", "string", "array", "mixed"];

/// Method invoked for standalone (class-based) actions.
pub const STANDALONE_ACTION_METHOD: &str = "run";

/// Primary key attribute used when a record class does not declare one.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

// ============================================================================
// TypeHint
// ============================================================================

/// A parsed, normalized declared type.
///
/// Accepts `T`, `?T` and `T|null`. Aliases (`integer`, `double`, `boolean`)
/// are normalized and a leading namespace separator is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeHint {
    name: String,
    nullable: bool,
}

impl TypeHint {
    /// Parse a declared type string.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidTypeHint`] for empty strings, bare
    /// `null`, and unions of more than one non-null type.
    pub fn parse(raw: &str) -> BindResult<Self> {
        let trimmed = raw.trim();
        let (body, mut nullable) = match trimmed.strip_prefix('?') {
            Some(rest) => (rest, true),
            None => (trimmed, false),
        };

        let mut names = Vec::new();
        for part in body.split('|').map(str::trim) {
            if part.eq_ignore_ascii_case("null") {
                nullable = true;
            } else if !part.is_empty() {
                names.push(part);
            }
        }

        match names.as_slice() {
            [] => Err(BindingError::invalid_type_hint(raw, "no type name")),
            [name] => Ok(Self {
                name: normalize_type_name(name),
                nullable,
            }),
            _ => Err(BindingError::invalid_type_hint(
                raw,
                "union types are not supported",
            )),
        }
    }

    /// Create a non-nullable hint from an already normalized name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: normalize_type_name(&name.into()),
            nullable: false,
        }
    }

    /// Return a nullable copy of this hint.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// The normalized type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the hint was explicitly marked nullable.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the type is one of [`BUILTIN_TYPES`].
    pub fn is_builtin(&self) -> bool {
        BUILTIN_TYPES.contains(&self.name.as_str())
    }

    /// Whether the type is the `array` container.
    pub fn is_array(&self) -> bool {
        self.name == "array"
    }
}

fn normalize_type_name(name: &str) -> String {
    let name = name.trim().trim_start_matches('\\');
    match name.to_ascii_lowercase().as_str() {
        "int" | "integer" => "int".to_string(),
        "float" | "double" => "float".to_string(),
        "bool" | "boolean" => "bool".to_string(),
        "string" => "string".to_string(),
        "array" => "array".to_string(),
        "mixed" => "mixed".to_string(),
        _ => name.to_string(),
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "?{}", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl std::str::FromStr for TypeHint {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TypeHint {
    type Error = BindingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TypeHint> for String {
    fn from(hint: TypeHint) -> Self {
        hint.to_string()
    }
}

/// Deserialize a present field (including an explicit `null`) as `Some`.
///
/// Combined with `#[serde(default)]` this separates "no default declared"
/// from "default is null".
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn default_true() -> bool {
    true
}

// ============================================================================
// ParameterSchema / PropertySchema / MethodSchema
// ============================================================================

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name, matched exactly against request keys.
    pub name: String,

    /// Declared type; `None` means untyped.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<TypeHint>,

    /// Default value, if the parameter is optional.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
}

impl ParameterSchema {
    /// Create an untyped parameter.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default: None,
        }
    }

    /// Create a typed parameter.
    pub fn typed(name: impl Into<String>, hint: TypeHint) -> Self {
        Self {
            name: name.into(),
            type_hint: Some(hint),
            default: None,
        }
    }

    /// Create a parameter from a type string.
    pub fn parse(name: impl Into<String>, hint: &str) -> BindResult<Self> {
        Ok(Self::typed(name, TypeHint::parse(hint)?))
    }

    /// Set the default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// A declared object property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    /// Property name, matched exactly against nested mapping keys.
    pub name: String,

    /// Declared type; `None` means untyped.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<TypeHint>,

    /// Initial value of the property.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,

    /// Public properties are visible to binders.
    #[serde(default = "default_true")]
    pub public: bool,

    /// Read-only properties are never assigned.
    #[serde(default, alias = "read_only")]
    pub read_only: bool,

    /// Whether a form model accepts this attribute from user input.
    #[serde(default = "default_true")]
    pub safe: bool,
}

impl PropertySchema {
    /// Create a public, settable, safe property.
    pub fn new(name: impl Into<String>, type_hint: Option<TypeHint>) -> Self {
        Self {
            name: name.into(),
            type_hint,
            default: None,
            public: true,
            read_only: false,
            safe: true,
        }
    }

    /// Create a property from a type string.
    pub fn parse(name: impl Into<String>, hint: &str) -> BindResult<Self> {
        Ok(Self::new(name, Some(TypeHint::parse(hint)?)))
    }

    /// Set the initial value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Mark the attribute as unsafe for mass assignment.
    pub fn unsafe_attribute(mut self) -> Self {
        self.safe = false;
        self
    }

    /// Mark the property read-only.
    pub fn as_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Whether binders may assign this property.
    pub fn is_settable(&self) -> bool {
        self.public && !self.read_only
    }
}

/// A declared method and its parameters, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSchema {
    /// Method name.
    pub name: String,

    /// Parameters in declaration order.
    #[serde(default)]
    pub parameters: Vec<ParameterSchema>,
}

impl MethodSchema {
    /// Create a method.
    pub fn new(name: impl Into<String>, parameters: Vec<ParameterSchema>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

// ============================================================================
// ClassSchema
// ============================================================================

/// What a class represents, which decides the binder that owns it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// A plain object graph, bound property by property.
    #[default]
    Plain,
    /// A form model with safe attributes and a form name.
    Model,
    /// A persisted entity looked up by primary key.
    ActiveRecord,
    /// A query filter object.
    DataFilter,
    /// A controller holding inline action methods.
    Controller,
    /// A standalone action class with a `run` method.
    Action,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Model => write!(f, "model"),
            Self::ActiveRecord => write!(f, "active_record"),
            Self::DataFilter => write!(f, "data_filter"),
            Self::Controller => write!(f, "controller"),
            Self::Action => write!(f, "action"),
        }
    }
}

/// Metadata for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchema {
    /// Class name as used in type hints.
    pub name: String,

    /// What the class represents.
    #[serde(default)]
    pub kind: ClassKind,

    /// Properties in declaration order.
    #[serde(default)]
    pub properties: Vec<PropertySchema>,

    /// Methods (action methods for controllers, `run` for actions).
    #[serde(default)]
    pub methods: Vec<MethodSchema>,

    /// Primary key attribute for active records.
    #[serde(default, alias = "primary_key", skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,

    /// Form name scoping the input of a form model.
    #[serde(default, alias = "form_name", skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,

    /// Standalone actions of a controller: action id → action class.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, String>,
}

impl ClassSchema {
    /// Create an empty class of the given kind.
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: Vec::new(),
            methods: Vec::new(),
            primary_key: None,
            form_name: None,
            actions: BTreeMap::new(),
        }
    }

    /// Add a property.
    pub fn with_property(mut self, property: PropertySchema) -> Self {
        self.properties.push(property);
        self
    }

    /// Add a method.
    pub fn with_method(mut self, method: MethodSchema) -> Self {
        self.methods.push(method);
        self
    }

    /// Set the primary key attribute.
    pub fn with_primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    /// Set the form name.
    pub fn with_form_name(mut self, form_name: impl Into<String>) -> Self {
        self.form_name = Some(form_name.into());
        self
    }

    /// Map an action id to a standalone action class.
    pub fn with_action(mut self, id: impl Into<String>, class: impl Into<String>) -> Self {
        self.actions.insert(id.into(), class.into());
        self
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<&MethodSchema> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Properties binders may assign, in declaration order.
    pub fn settable_properties(&self) -> impl Iterator<Item = &PropertySchema> {
        self.properties.iter().filter(|p| p.is_settable())
    }

    /// The primary key attribute.
    pub fn primary_key(&self) -> &str {
        self.primary_key.as_deref().unwrap_or(DEFAULT_PRIMARY_KEY)
    }

    /// The form name: explicit, or the short class name.
    pub fn form_name(&self) -> &str {
        match &self.form_name {
            Some(name) => name,
            None => self.name.rsplit('\\').next().unwrap_or(&self.name),
        }
    }
}

// ============================================================================
// TypeRegistry
// ============================================================================

/// Registry of class metadata, keyed by class name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    classes: HashMap<String, ClassSchema>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a class.
    pub fn insert(&mut self, class: ClassSchema) -> &mut Self {
        let key = class.name.trim_start_matches('\\').to_string();
        self.classes.insert(key, class);
        self
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_class(mut self, class: ClassSchema) -> Self {
        self.insert(class);
        self
    }

    /// Look up a class by name.
    pub fn get(&self, name: &str) -> Option<&ClassSchema> {
        self.classes.get(name.trim_start_matches('\\'))
    }

    /// Look up a class of a specific kind.
    pub fn get_kind(&self, name: &str, kind: ClassKind) -> Option<&ClassSchema> {
        self.get(name).filter(|class| class.kind == kind)
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Registered class names, sorted.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the action handle for `controller/id`.
    ///
    /// Ids listed in the controller's `actions` map become standalone actions;
    /// every other id is an inline action.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::UnknownClass`] if the controller is not registered.
    pub fn action(&self, controller: &str, id: &str) -> BindResult<Action> {
        let class = self
            .get(controller)
            .ok_or_else(|| BindingError::UnknownClass(controller.to_string()))?;
        Ok(match class.actions.get(id) {
            Some(action_class) => Action::standalone(&class.name, id, action_class),
            None => Action::inline(&class.name, id),
        })
    }

    /// Resolve the method an action reflects.
    ///
    /// Inline actions use the controller method named by convention (or the
    /// explicit method on the handle); standalone actions use the action
    /// class's `run` method.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::UnknownClass`] or [`BindingError::MethodNotFound`].
    pub fn resolve_method(&self, action: &Action) -> BindResult<&MethodSchema> {
        let (class_name, method_name) = action.method_target();
        let class = self
            .get(class_name)
            .ok_or_else(|| BindingError::UnknownClass(class_name.to_string()))?;
        class
            .method(&method_name)
            .ok_or_else(|| BindingError::MethodNotFound {
                class: class.name.clone(),
                method: method_name.clone(),
                action: action.unique_id(),
            })
    }

    /// Check the registry for inconsistent declarations.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidSchema`] for duplicate parameter or
    /// property names, active records whose primary key is not a property,
    /// and standalone actions whose class is missing or has no `run` method.
    pub fn validate(&self) -> BindResult<()> {
        for class in self.classes.values() {
            let mut seen = HashSet::new();
            for property in &class.properties {
                if !seen.insert(property.name.as_str()) {
                    return Err(BindingError::invalid_schema(
                        &class.name,
                        format!("duplicate property `{}`", property.name),
                    ));
                }
            }

            for method in &class.methods {
                let mut seen = HashSet::new();
                for param in &method.parameters {
                    if !seen.insert(param.name.as_str()) {
                        return Err(BindingError::invalid_schema(
                            &class.name,
                            format!(
                                "duplicate parameter `{}` in `{}`",
                                param.name, method.name
                            ),
                        ));
                    }
                }
            }

            if class.kind == ClassKind::ActiveRecord && class.property(class.primary_key()).is_none()
            {
                return Err(BindingError::invalid_schema(
                    &class.name,
                    format!("primary key `{}` is not a property", class.primary_key()),
                ));
            }

            for (id, action_class) in &class.actions {
                let valid = self
                    .get(action_class)
                    .is_some_and(|c| c.method(STANDALONE_ACTION_METHOD).is_some());
                if !valid {
                    return Err(BindingError::invalid_schema(
                        &class.name,
                        format!(
                            "action `{}` maps to `{}`, which has no `{}` method",
                            id, action_class, STANDALONE_ACTION_METHOD
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
