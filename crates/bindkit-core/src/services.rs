//! Service locator seam used by the container binder.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::value::ServiceInstance;

/// Resolves service instances by declared type name.
///
/// Binders only read from the locator.
pub trait ServiceLocator: Send + Sync {
    /// Resolve a service, or `None` if the type is not registered.
    fn resolve(&self, type_name: &str) -> Option<ServiceInstance>;

    /// Whether the type can be resolved.
    fn has(&self, type_name: &str) -> bool {
        self.resolve(type_name).is_some()
    }
}

/// A locator that resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoServices;

impl ServiceLocator for NoServices {
    fn resolve(&self, _type_name: &str) -> Option<ServiceInstance> {
        None
    }
}

/// In-process service registry.
#[derive(Debug, Clone, Default)]
pub struct ServiceContainer {
    services: HashMap<String, ServiceInstance>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under a type name.
    pub fn register<T: Any + Send + Sync>(
        &mut self,
        type_name: impl Into<String>,
        instance: T,
    ) -> &mut Self {
        let type_name = type_name.into();
        self.services
            .insert(type_name.clone(), ServiceInstance::new(type_name, instance));
        self
    }

    /// Register an already shared service.
    pub fn register_shared(
        &mut self,
        type_name: impl Into<String>,
        instance: Arc<dyn Any + Send + Sync>,
    ) -> &mut Self {
        let type_name = type_name.into();
        self.services.insert(
            type_name.clone(),
            ServiceInstance::from_arc(type_name, instance),
        );
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_service<T: Any + Send + Sync>(
        mut self,
        type_name: impl Into<String>,
        instance: T,
    ) -> Self {
        self.register(type_name, instance);
        self
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceLocator for ServiceContainer {
    fn resolve(&self, type_name: &str) -> Option<ServiceInstance> {
        self.services
            .get(type_name.trim_start_matches('\\'))
            .cloned()
    }
}
