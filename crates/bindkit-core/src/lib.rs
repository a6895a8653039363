//! # bindkit-core
//!
//! **Action parameter binding** – maps raw request parameters onto the typed
//! parameters of controller actions.
//!
//! Each declared parameter is described by a [`TargetDescriptor`] and handed
//! to a chain of binders ([`CompositeModelBinder`]). The first binder that
//! claims the parameter supplies its value; a parameter every binder declines
//! falls back to its default or is reported as missing. Missing parameters
//! are data, not errors: the dispatcher decides what they mean.
//!
//! ## Main Types
//!
//! - [`ActionParameterBinder`] – the entry point, one per application
//! - [`ActionBindingResult`] – arguments, parameter metadata, missing names
//! - [`TypeRegistry`] – class and method metadata binders consult
//! - [`Binder`] – the trait every binder implements
//! - [`BindingError`] – hard failures (malformed filters, schema mistakes)
//!
//! ## Modules
//!
//! - [`schema`] – type hints and class/method/property metadata
//! - [`binders`] – the individual binders
//! - [`composite`] – the ordered binder chain
//! - [`action`] – action-level binding and its result
//! - [`config`] – binding configuration (YAML)
//! - [`manifest`] – YAML application descriptions
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bindkit_core::{Action, ActionParameterBinder, ClassKind, ClassSchema, MethodSchema,
//!     ParameterSchema, TypeRegistry};
//!
//! let registry = TypeRegistry::new().with_class(
//!     ClassSchema::new("SiteController", ClassKind::Controller).with_method(MethodSchema::new(
//!         "actionView",
//!         vec![ParameterSchema::parse("id", "int")?],
//!     )),
//! );
//! let binder = ActionParameterBinder::new(Arc::new(registry));
//!
//! let mut params = serde_json::Map::new();
//! params.insert("id".into(), "42".into());
//! let result = binder.bind_action_params(&Action::inline("SiteController", "view"), &params)?;
//! assert!(result.is_complete());
//! ```

// Modules
pub mod action;
pub mod binders;
pub mod composite;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod errors;
pub mod filter;
pub mod manifest;
pub mod repository;
pub mod schema;
pub mod services;
pub mod value;

// Re-exports for convenience
pub use action::{ActionBindingResult, ActionParameterBinder, ArgumentValue, ParameterInfo};
pub use binders::{
    ActiveRecordBinder, Binder, BinderKind, BuiltinTypeBinder, ClassTypeBinder, ContainerBinder,
    DataFilterBinder, DateTimeBinder, FormModelBinder,
};
pub use composite::CompositeModelBinder;
pub use config::{BinderOverride, BindingConfig, DEFAULT_MAX_DEPTH};
pub use context::{inline_method_name, Action, ActionKind, BindingContext, RawParams};
pub use descriptor::{TargetDescriptor, TargetHandle};
pub use errors::{BindResult, BindingError};
pub use filter::{DataFilter, FilterCondition, FilterOperator};
pub use manifest::{AppManifest, DeclaredService};
pub use repository::{EntityRepository, InMemoryRepository, NoEntities};
pub use schema::{
    ClassKind, ClassSchema, MethodSchema, ParameterSchema, PropertySchema, TypeHint, TypeRegistry,
};
pub use services::{NoServices, ServiceContainer, ServiceLocator};
pub use value::{
    BindingResult, BoundValue, DateTimeValue, DateTimeVariant, EntityValue, ObjectValue,
    ServiceInstance,
};
