//! Actions and the per-call binding context.

use std::fmt;

use serde_json::{Map, Value};

use crate::binders::Binder;
use crate::config::DEFAULT_MAX_DEPTH;
use crate::descriptor::TargetDescriptor;
use crate::errors::BindResult;
use crate::repository::{EntityRepository, NoEntities};
use crate::schema::{TypeRegistry, STANDALONE_ACTION_METHOD};
use crate::services::{NoServices, ServiceLocator};
use crate::value::BindingResult;

/// Raw request parameters (query, body and route parameters merged).
pub type RawParams = Map<String, Value>;

// ============================================================================
// Action
// ============================================================================

/// How an action is implemented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// A controller method; `method` overrides the naming convention.
    Inline { method: Option<String> },
    /// A class whose `run` method is the action.
    Standalone { class: String },
}

/// Identifies the action being bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Action id (`view-profile`).
    pub id: String,
    /// Controller class name.
    pub controller: String,
    pub kind: ActionKind,
}

impl Action {
    /// An inline action whose method follows the naming convention.
    pub fn inline(controller: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            controller: controller.into(),
            kind: ActionKind::Inline { method: None },
        }
    }

    /// An inline action backed by an explicitly named method.
    pub fn inline_method(
        controller: impl Into<String>,
        id: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            controller: controller.into(),
            kind: ActionKind::Inline {
                method: Some(method.into()),
            },
        }
    }

    /// A standalone action implemented by `class`.
    pub fn standalone(
        controller: impl Into<String>,
        id: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            controller: controller.into(),
            kind: ActionKind::Standalone {
                class: class.into(),
            },
        }
    }

    /// `controller/id`.
    pub fn unique_id(&self) -> String {
        format!("{}/{}", self.controller, self.id)
    }

    /// The class and method whose signature is reflected.
    pub fn method_target(&self) -> (&str, String) {
        match &self.kind {
            ActionKind::Inline {
                method: Some(method),
            } => (self.controller.as_str(), method.clone()),
            ActionKind::Inline { method: None } => {
                (self.controller.as_str(), inline_method_name(&self.id))
            }
            ActionKind::Standalone { class } => {
                (class.as_str(), STANDALONE_ACTION_METHOD.to_string())
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.controller, self.id)
    }
}

/// Convention for inline action methods: `view-profile` → `actionViewProfile`.
pub fn inline_method_name(id: &str) -> String {
    let mut name = String::from("action");
    for segment in id.split('-').filter(|s| !s.is_empty()) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    name
}

// ============================================================================
// BindingContext
// ============================================================================

/// Shared, read-only state for one `bind_action_params` call.
///
/// Nested binders get a child context from [`nested`](Self::nested) that
/// shares every reference and tracks depth.
#[derive(Clone, Copy)]
pub struct BindingContext<'a> {
    params: &'a RawParams,
    binder: &'a dyn Binder,
    action: &'a Action,
    registry: &'a TypeRegistry,
    services: &'a dyn ServiceLocator,
    entities: &'a dyn EntityRepository,
    depth: usize,
    max_depth: usize,
}

impl<'a> BindingContext<'a> {
    /// Create a top-level context without services or entities.
    pub fn new(
        params: &'a RawParams,
        binder: &'a dyn Binder,
        action: &'a Action,
        registry: &'a TypeRegistry,
    ) -> Self {
        Self {
            params,
            binder,
            action,
            registry,
            services: &NoServices,
            entities: &NoEntities,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_services(mut self, services: &'a dyn ServiceLocator) -> Self {
        self.services = services;
        self
    }

    pub fn with_entities(mut self, entities: &'a dyn EntityRepository) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// All raw request parameters.
    pub fn params(&self) -> &'a RawParams {
        self.params
    }

    /// One raw request parameter, by exact name.
    pub fn param(&self, name: &str) -> Option<&'a Value> {
        self.params.get(name)
    }

    /// The resolver chain, for recursive binding.
    pub fn binder(&self) -> &'a dyn Binder {
        self.binder
    }

    pub fn action(&self) -> &'a Action {
        self.action
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn services(&self) -> &'a dyn ServiceLocator {
        self.services
    }

    pub fn entities(&self) -> &'a dyn EntityRepository {
        self.entities
    }

    /// Nesting depth (0 for action parameters).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// A child context one level deeper, or `None` past the depth limit.
    pub fn nested(&self) -> Option<Self> {
        if self.depth >= self.max_depth {
            return None;
        }
        Some(Self {
            depth: self.depth + 1,
            ..*self
        })
    }

    /// Run the full binder chain on `target`.
    pub fn bind(&self, target: &TargetDescriptor<'_>) -> BindResult<Option<BindingResult>> {
        self.binder.bind_model(target, self)
    }
}

impl fmt::Debug for BindingContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContext")
            .field("action", &self.action.unique_id())
            .field("params", &self.params.len())
            .field("depth", &self.depth)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}
