//! Action-level binding: the entry point of the pipeline.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::composite::CompositeModelBinder;
use crate::config::BindingConfig;
use crate::context::{Action, BindingContext, RawParams};
use crate::descriptor::TargetDescriptor;
use crate::errors::BindResult;
use crate::repository::{EntityRepository, NoEntities};
use crate::schema::{MethodSchema, TypeRegistry};
use crate::services::{NoServices, ServiceLocator};
use crate::value::BoundValue;

// ============================================================================
// ArgumentValue
// ============================================================================

/// The resolved argument of one declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    /// A binder claimed the parameter (possibly with a bound null).
    Bound(BoundValue),
    /// Every binder declined and the declared default was used.
    Defaulted(BoundValue),
    /// Every binder declined and there is no default.
    Unresolved,
}

impl ArgumentValue {
    /// The value to pass to the action, if any.
    pub fn value(&self) -> Option<&BoundValue> {
        match self {
            Self::Bound(value) | Self::Defaulted(value) => Some(value),
            Self::Unresolved => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }

    /// `bound`, `default` or `missing`.
    pub fn source(&self) -> &'static str {
        match self {
            Self::Bound(_) => "bound",
            Self::Defaulted(_) => "default",
            Self::Unresolved => "missing",
        }
    }

    /// The argument as JSON; unresolved arguments render as null.
    pub fn to_json(&self) -> Value {
        self.value().map_or(Value::Null, BoundValue::to_json)
    }
}

impl Serialize for ArgumentValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ============================================================================
// ParameterInfo
// ============================================================================

/// Snapshot of the descriptor built for one declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterInfo {
    pub name: String,
    /// Declared type as written (`?int`), `None` when untyped.
    #[serde(rename = "type")]
    pub declared_type: Option<String>,
    pub is_builtin: bool,
    pub is_array: bool,
    pub allows_null: bool,
    pub has_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// The raw request value; `None` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<Value>,
}

impl ParameterInfo {
    fn from_descriptor(target: &TargetDescriptor<'_>) -> Self {
        Self {
            name: target.name().to_string(),
            declared_type: target.type_hint().map(ToString::to_string),
            is_builtin: target.is_builtin(),
            is_array: target.is_array(),
            allows_null: target.allows_null(),
            has_default: target.has_default(),
            default_value: target.default_value().cloned(),
            raw_value: target.raw_value().cloned(),
        }
    }
}

// ============================================================================
// ActionBindingResult
// ============================================================================

/// Outcome of binding every parameter of one action.
///
/// `arguments` holds an entry for every declared parameter, and a name is
/// listed in `missing` exactly when its argument is
/// [`ArgumentValue::Unresolved`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBindingResult {
    parameters: Vec<ParameterInfo>,
    arguments: HashMap<String, ArgumentValue>,
    missing: Vec<String>,
    messages: BTreeMap<String, String>,
}

impl ActionBindingResult {
    /// Declared parameters, in declaration order.
    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    /// Arguments by parameter name.
    pub fn arguments(&self) -> &HashMap<String, ArgumentValue> {
        &self.arguments
    }

    /// The argument of one parameter.
    pub fn argument(&self, name: &str) -> Option<&ArgumentValue> {
        self.arguments.get(name)
    }

    /// The bound or defaulted value of one parameter.
    pub fn value(&self, name: &str) -> Option<&BoundValue> {
        self.argument(name).and_then(ArgumentValue::value)
    }

    /// Names no binder could resolve, in declaration order.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Informational binder messages by parameter name.
    pub fn messages(&self) -> &BTreeMap<String, String> {
        &self.messages
    }

    /// Arguments in declaration order.
    pub fn ordered_arguments(&self) -> Vec<(&str, &ArgumentValue)> {
        self.parameters
            .iter()
            .filter_map(|p| {
                self.arguments
                    .get(&p.name)
                    .map(|argument| (p.name.as_str(), argument))
            })
            .collect()
    }

    /// Whether every parameter was resolved.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Render as JSON.
    pub fn to_json(&self) -> Value {
        let mut arguments = Map::new();
        let mut sources = Map::new();
        for (name, argument) in self.ordered_arguments() {
            arguments.insert(name.to_string(), argument.to_json());
            sources.insert(name.to_string(), json!(argument.source()));
        }
        json!({
            "parameters": self.parameters,
            "arguments": arguments,
            "sources": sources,
            "missing": self.missing,
            "messages": self.messages,
        })
    }
}

impl Serialize for ActionBindingResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ============================================================================
// ActionParameterBinder
// ============================================================================

/// Binds the parameters of controller actions.
///
/// Holds the type registry, the binder chain and the collaborators binders
/// may consult. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct ActionParameterBinder {
    registry: Arc<TypeRegistry>,
    binder: Arc<CompositeModelBinder>,
    services: Arc<dyn ServiceLocator>,
    entities: Arc<dyn EntityRepository>,
}

impl ActionParameterBinder {
    /// Create a binder with the default chain and no collaborators.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::from_config(registry, BindingConfig::default())
    }

    /// Create a binder whose chain is built from `config`.
    pub fn from_config(registry: Arc<TypeRegistry>, config: BindingConfig) -> Self {
        Self {
            registry,
            binder: Arc::new(CompositeModelBinder::new(config)),
            services: Arc::new(NoServices),
            entities: Arc::new(NoEntities),
        }
    }

    /// Use an existing binder chain.
    pub fn with_binder(mut self, binder: Arc<CompositeModelBinder>) -> Self {
        self.binder = binder;
        self
    }

    pub fn with_services(mut self, services: Arc<dyn ServiceLocator>) -> Self {
        self.services = services;
        self
    }

    pub fn with_entities(mut self, entities: Arc<dyn EntityRepository>) -> Self {
        self.entities = entities;
        self
    }

    /// The binder chain.
    pub fn composite(&self) -> &CompositeModelBinder {
        &self.binder
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The method whose signature `action` binds.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::UnknownClass`](crate::BindingError::UnknownClass)
    /// or [`BindingError::MethodNotFound`](crate::BindingError::MethodNotFound).
    pub fn resolve_method(&self, action: &Action) -> BindResult<&MethodSchema> {
        self.registry.resolve_method(action)
    }

    /// Describe the parameters of `action` without binding them.
    ///
    /// # Errors
    ///
    /// Same as [`resolve_method`](Self::resolve_method).
    pub fn describe(&self, action: &Action) -> BindResult<Vec<ParameterInfo>> {
        let method = self.resolve_method(action)?;
        Ok(method
            .parameters
            .iter()
            .map(|param| ParameterInfo::from_descriptor(&TargetDescriptor::for_parameter(param, None)))
            .collect())
    }

    /// Bind every declared parameter of `action` from `params`.
    ///
    /// Parameters no binder claims fall back to their default; those without
    /// one are reported in [`ActionBindingResult::missing`] rather than as an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error when the action's method cannot be resolved, or when
    /// a binder rejects input it owns (a malformed filter).
    pub fn bind_action_params(
        &self,
        action: &Action,
        params: &RawParams,
    ) -> BindResult<ActionBindingResult> {
        let method = self.resolve_method(action)?;
        debug!(
            action = %action,
            method = %method.name,
            parameters = method.parameters.len(),
            "Binding action parameters"
        );

        let context = BindingContext::new(params, self.binder.as_ref(), action, &self.registry)
            .with_services(self.services.as_ref())
            .with_entities(self.entities.as_ref())
            .with_max_depth(self.binder.config().max_depth);

        let mut parameters = Vec::with_capacity(method.parameters.len());
        let mut arguments = HashMap::with_capacity(method.parameters.len());
        let mut missing = Vec::new();
        let mut messages = BTreeMap::new();

        for param in &method.parameters {
            let target = TargetDescriptor::for_parameter(param, params.get(&param.name));
            parameters.push(ParameterInfo::from_descriptor(&target));

            let argument = match context.bind(&target)? {
                Some(result) => {
                    if let Some(message) = result.message {
                        messages.insert(param.name.clone(), message);
                    }
                    ArgumentValue::Bound(result.value)
                }
                None => match target.default_value() {
                    Some(default) => ArgumentValue::Defaulted(BoundValue::from_json(default.clone())),
                    None => {
                        missing.push(param.name.clone());
                        ArgumentValue::Unresolved
                    }
                },
            };
            arguments.insert(param.name.clone(), argument);
        }

        if !missing.is_empty() {
            debug!(action = %action, missing = ?missing, "Unresolved action parameters");
        }

        Ok(ActionBindingResult {
            parameters,
            arguments,
            missing,
            messages,
        })
    }
}

impl std::fmt::Debug for ActionParameterBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionParameterBinder")
            .field("classes", &self.registry.len())
            .field("binder", &self.binder)
            .finish_non_exhaustive()
    }
}
