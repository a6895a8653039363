//! Application manifests.
//!
//! A manifest describes an application in YAML: its classes, the services
//! the container provides, fixture entities, and binding options. It is how
//! the CLI (and tests) assemble an [`ActionParameterBinder`] without code.
//!
//! ```yaml
//! classes:
//!   - name: SiteController
//!     kind: controller
//!     methods:
//!       - name: actionView
//!         parameters:
//!           - { name: id, type: int }
//!           - { name: when, type: "?DateTime" }
//! services:
//!   - Mailer
//! entities:
//!   Post:
//!     - { id: 1, title: Hello }
//! binding:
//!   maxDepth: 8
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::action::ActionParameterBinder;
use crate::config::BindingConfig;
use crate::errors::{BindResult, BindingError};
use crate::repository::InMemoryRepository;
use crate::schema::{ClassSchema, TypeRegistry};
use crate::services::ServiceContainer;

/// Stand-in instance for a service declared by name in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredService {
    pub type_name: String,
}

/// A YAML application description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppManifest {
    /// Class metadata: controllers, actions, models, entities, filters.
    #[serde(default)]
    pub classes: Vec<ClassSchema>,

    /// Service type names the container resolves.
    #[serde(default)]
    pub services: Vec<String>,

    /// Fixture records by entity class.
    #[serde(default)]
    pub entities: HashMap<String, Vec<Map<String, Value>>>,

    /// Binding options.
    #[serde(default)]
    pub binding: BindingConfig,
}

impl AppManifest {
    /// Load a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidManifest`] if the file is missing,
    /// unreadable or not valid YAML, and configuration errors from the
    /// `binding` section.
    pub fn from_path(path: &Path) -> BindResult<Self> {
        let invalid = |message: String| BindingError::InvalidManifest {
            path: path.to_path_buf(),
            message,
        };

        if !path.exists() {
            return Err(invalid("file not found".to_string()));
        }
        let content =
            fs::read_to_string(path).map_err(|e| invalid(format!("failed to read: {e}")))?;
        let manifest = Self::from_yaml_str(&content).map_err(|e| match e {
            BindingError::Yaml(e) => invalid(format!("failed to parse: {e}")),
            other => other,
        })?;

        debug!(
            path = %path.display(),
            classes = manifest.classes.len(),
            services = manifest.services.len(),
            "Loaded manifest"
        );
        Ok(manifest)
    }

    /// Parse a manifest from YAML and validate its binding section.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::Yaml`] for syntax errors and
    /// [`BindingError::InvalidConfiguration`] for invalid binding options.
    pub fn from_yaml_str(content: &str) -> BindResult<Self> {
        let manifest: Self = serde_yaml::from_str(content)?;
        for warning in manifest.binding.validate()? {
            warn!("Config warning: {}", warning);
        }
        Ok(manifest)
    }

    /// Build and validate the type registry.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidSchema`] for inconsistent classes.
    pub fn registry(&self) -> BindResult<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        for class in &self.classes {
            registry.insert(class.clone());
        }
        registry.validate()?;
        Ok(registry)
    }

    /// A container resolving every declared service to a [`DeclaredService`].
    pub fn service_container(&self) -> ServiceContainer {
        let mut container = ServiceContainer::new();
        for type_name in &self.services {
            container.register(
                type_name.as_str(),
                DeclaredService {
                    type_name: type_name.clone(),
                },
            );
        }
        container
    }

    /// A repository holding the fixture entities.
    pub fn repository(&self) -> InMemoryRepository {
        let mut repository = InMemoryRepository::new();
        for (class, records) in &self.entities {
            for record in records {
                repository.insert(class.as_str(), record.clone());
            }
        }
        repository
    }

    /// Assemble a binder over this manifest.
    ///
    /// # Errors
    ///
    /// Same as [`registry`](Self::registry).
    pub fn into_binder(self) -> BindResult<ActionParameterBinder> {
        let registry = Arc::new(self.registry()?);
        let services = Arc::new(self.service_container());
        let entities = Arc::new(self.repository());
        Ok(ActionParameterBinder::from_config(registry, self.binding)
            .with_services(services)
            .with_entities(entities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Action;
    use crate::schema::ClassKind;
    use crate::services::ServiceLocator;
    use crate::value::BoundValue;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MANIFEST: &str = r#"
classes:
  - name: PostController
    kind: controller
    methods:
      - name: actionView
        parameters:
          - { name: post, type: Post }
          - { name: mailer, type: Mailer }
          - { name: page, type: int, default: 1 }
  - name: Post
    kind: active_record
    properties:
      - { name: id, type: int }
      - { name: title, type: string }
services:
  - Mailer
entities:
  Post:
    - { id: 5, title: Hi }
binding:
  max_depth: 4
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = AppManifest::from_yaml_str(MANIFEST).unwrap();
        assert_eq!(manifest.classes.len(), 2);
        assert_eq!(manifest.classes[1].kind, ClassKind::ActiveRecord);
        assert_eq!(manifest.binding.max_depth, 4);

        let container = manifest.service_container();
        let mailer = container.resolve("Mailer").unwrap();
        assert_eq!(mailer.downcast_ref::<DeclaredService>().unwrap().type_name, "Mailer");
        assert_eq!(manifest.repository().count("Post"), 1);
    }

    #[test]
    fn test_into_binder_binds_actions() {
        let binder = AppManifest::from_yaml_str(MANIFEST)
            .unwrap()
            .into_binder()
            .unwrap();
        let Value::Object(params) = json!({"post": "5"}) else {
            unreachable!()
        };
        let result = binder
            .bind_action_params(&Action::inline("PostController", "view"), &params)
            .unwrap();

        assert!(result.is_complete());
        let post = result.value("post").and_then(BoundValue::as_entity).unwrap();
        assert_eq!(post.get("title"), Some(&BoundValue::String("Hi".into())));
        assert_eq!(result.value("mailer").unwrap().kind(), "service");
        assert_eq!(result.value("page"), Some(&BoundValue::Int(1)));
    }

    #[test]
    fn test_from_path_errors() {
        let err = AppManifest::from_path(Path::new("/nonexistent/app.yaml")).unwrap_err();
        assert!(matches!(err, BindingError::InvalidManifest { .. }));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "classes: {{").unwrap();
        let err = AppManifest::from_path(file.path()).unwrap_err();
        assert!(matches!(err, BindingError::InvalidManifest { .. }));
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let manifest = AppManifest::from_yaml_str(
            "classes:\n  - name: Post\n    kind: active_record\n    properties:\n      - { name: title, type: string }\n",
        )
        .unwrap();
        assert!(matches!(
            manifest.registry().unwrap_err(),
            BindingError::InvalidSchema { .. }
        ));
    }
}
