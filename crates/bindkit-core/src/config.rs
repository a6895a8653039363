//! Binding configuration.
//!
//! Configuration is read from YAML. Every section is optional; a missing file
//! yields the defaults.
//!
//! ```yaml
//! maxDepth: 32
//! binders:
//!   - key: container
//!     disabled: true
//!   - key: legacy_dates
//!     kind: date_time
//! dataFilter:
//!   key: filter
//! dateTime:
//!   formats:
//!     - rfc3339
//!     - "%Y-%m-%d"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::binders::{BinderKind, DEFAULT_DATE_TIME_FORMATS, RFC3339_FORMAT};
use crate::errors::{BindResult, BindingError};

/// Default limit on nested object binding.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Depth above which validation warns.
const MAX_DEPTH_WARNING: usize = 256;

// ============================================================================
// BindingConfig
// ============================================================================

/// Top-level binding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingConfig {
    /// Overrides merged into the default binder chain, in order.
    #[serde(default)]
    pub binders: Vec<BinderOverride>,

    /// Maximum nesting depth for object graphs.
    #[serde(default = "default_max_depth", alias = "max_depth")]
    pub max_depth: usize,

    /// Data filter options.
    #[serde(default, alias = "data_filter")]
    pub data_filter: DataFilterConfig,

    /// Date/time options.
    #[serde(default, alias = "date_time")]
    pub date_time: DateTimeConfig,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            binders: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            data_filter: DataFilterConfig::default(),
            date_time: DateTimeConfig::default(),
        }
    }
}

impl BindingConfig {
    /// Load configuration from a YAML file.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidConfiguration`] if the file cannot be
    /// read or parsed, or fails validation.
    pub fn from_path(path: &Path) -> BindResult<Self> {
        if !path.exists() {
            debug!(
                "Binding config not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            BindingError::invalid_configuration(
                format!("Failed to read {}: {}", path.display(), e),
                "Check that the file is readable",
            )
        })?;
        let config = Self::from_yaml_str(&content).map_err(|e| match e {
            BindingError::Yaml(e) => BindingError::invalid_configuration(
                format!("Failed to parse {}: {}", path.display(), e),
                "Fix the YAML syntax",
            ),
            other => other,
        })?;

        Ok(config)
    }

    /// Parse and validate configuration from a YAML string, logging warnings.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::Yaml`] for syntax errors and
    /// [`BindingError::InvalidConfiguration`] for invalid values.
    pub fn from_yaml_str(content: &str) -> BindResult<Self> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };

        for warning in config.validate()? {
            warn!("Config warning: {}", warning);
        }
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidConfiguration`] when `maxDepth` is 0,
    /// no date/time format is configured, a format is not a valid chrono
    /// pattern, the data filter key is empty, or a binder override names
    /// neither a default key nor a kind.
    ///
    /// # Warnings
    ///
    /// - `maxDepth > 256`: deep graphs are unusual and costly
    /// - `dataFilter.key` set: every filter parameter reads the same entry
    /// - duplicate override keys: the last one wins
    pub fn validate(&self) -> BindResult<Vec<String>> {
        let mut warnings = Vec::new();

        if self.max_depth == 0 {
            return Err(BindingError::invalid_configuration(
                "maxDepth cannot be 0",
                format!("Set maxDepth to at least 1 (default: {DEFAULT_MAX_DEPTH})"),
            ));
        }
        if self.max_depth > MAX_DEPTH_WARNING {
            warnings.push(format!(
                "maxDepth={} is very large; deeply nested input will be expensive to bind",
                self.max_depth
            ));
        }

        warnings.extend(self.data_filter.validate()?);
        self.date_time.validate()?;

        let mut seen = HashSet::new();
        for binder in &self.binders {
            binder.validate()?;
            if !seen.insert(binder.key.as_str()) {
                warnings.push(format!(
                    "binders: key `{}` is listed more than once; the last entry wins",
                    binder.key
                ));
            }
        }

        Ok(warnings)
    }
}

// ============================================================================
// BinderOverride
// ============================================================================

/// One entry of the `binders` list.
///
/// An entry whose key matches a default binder replaces it in place; other
/// keys are appended after the defaults. `disabled: true` removes the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinderOverride {
    /// Registration key.
    pub key: String,

    /// Binder implementation; defaults to the kind registered under `key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<BinderKind>,

    /// Remove the key from the chain.
    #[serde(default)]
    pub disabled: bool,
}

impl BinderOverride {
    /// Replace or add `key` with a binder of `kind`.
    pub fn new(key: impl Into<String>, kind: BinderKind) -> Self {
        Self {
            key: key.into(),
            kind: Some(kind),
            disabled: false,
        }
    }

    /// Remove `key` from the chain.
    pub fn disable(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: None,
            disabled: true,
        }
    }

    /// The binder kind this entry installs.
    pub fn resolved_kind(&self) -> Option<BinderKind> {
        self.kind.or_else(|| BinderKind::from_key(&self.key))
    }

    fn validate(&self) -> BindResult<()> {
        if self.key.trim().is_empty() {
            return Err(BindingError::invalid_configuration(
                "binders: entry with an empty key",
                "Give every binder entry a key",
            ));
        }
        if !self.disabled && self.resolved_kind().is_none() {
            return Err(BindingError::invalid_configuration(
                format!("binders: `{}` is not a default binder and has no kind", self.key),
                format!(
                    "Set kind to one of: {}",
                    BinderKind::DEFAULT_ORDER
                        .iter()
                        .map(BinderKind::key)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// DataFilterConfig / DateTimeConfig
// ============================================================================

/// Data filter options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFilterConfig {
    /// Read every filter payload from this request key instead of the
    /// parameter's own name. `filter` reproduces the legacy behavior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl DataFilterConfig {
    fn validate(&self) -> BindResult<Vec<String>> {
        let mut warnings = Vec::new();
        if let Some(key) = &self.key {
            if key.trim().is_empty() {
                return Err(BindingError::invalid_configuration(
                    "dataFilter.key cannot be empty",
                    "Remove dataFilter.key to read payloads by parameter name",
                ));
            }
            warnings.push(format!(
                "dataFilter.key=`{key}` reads every filter parameter from the same request key"
            ));
        }
        Ok(warnings)
    }
}

/// Date/time options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeConfig {
    /// Input formats tried in order: chrono patterns or `rfc3339`.
    #[serde(default = "default_date_time_formats")]
    pub formats: Vec<String>,
}

fn default_date_time_formats() -> Vec<String> {
    DEFAULT_DATE_TIME_FORMATS.iter().map(|f| f.to_string()).collect()
}

impl Default for DateTimeConfig {
    fn default() -> Self {
        Self {
            formats: default_date_time_formats(),
        }
    }
}

impl DateTimeConfig {
    fn validate(&self) -> BindResult<()> {
        if self.formats.is_empty() {
            return Err(BindingError::invalid_configuration(
                "dateTime.formats cannot be empty",
                "Remove dateTime.formats to use the defaults",
            ));
        }
        for format in &self.formats {
            if format == RFC3339_FORMAT {
                continue;
            }
            if format.is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(BindingError::invalid_configuration(
                    format!("dateTime.formats: `{format}` is not a valid format"),
                    "Use chrono strftime patterns such as %Y-%m-%d, or rfc3339",
                ));
            }
        }
        Ok(())
    }
}
