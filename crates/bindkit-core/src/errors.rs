//! Error types for bindkit-core.
//!
//! A binder that declines a target does not produce an error: declines are
//! `Ok(None)` values. The variants here cover the cases that must stop a
//! binding run: malformed payloads for a binder that claimed the target, and
//! configuration or schema mistakes.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for binding operations.
pub type BindResult<T> = Result<T, BindingError>;

/// Errors raised by the binding pipeline.
#[derive(Error, Debug)]
pub enum BindingError {
    // =========================================================================
    // Request-time errors
    // =========================================================================
    /// A filter payload was present but structurally invalid.
    #[error("Malformed filter for parameter `{parameter}`: {reason}")]
    MalformedFilter {
        /// The parameter the payload was bound for.
        parameter: String,
        /// What was wrong with the payload.
        reason: String,
    },

    // =========================================================================
    // Schema errors
    // =========================================================================
    /// A class referenced by an action is not registered.
    #[error("Class `{0}` is not registered.")]
    UnknownClass(String),

    /// The method backing an action could not be found.
    #[error("Method `{class}::{method}` not found for action `{action}`.")]
    MethodNotFound {
        /// The class searched.
        class: String,
        /// The method name derived from the action.
        method: String,
        /// The action unique id (`controller/action`).
        action: String,
    },

    /// A declared type could not be parsed.
    #[error("Invalid type hint `{hint}`: {reason}")]
    InvalidTypeHint {
        /// The raw type string.
        hint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The type registry contains inconsistent declarations.
    #[error("Invalid schema for `{class}`: {reason}")]
    InvalidSchema {
        /// The class with the problem.
        class: String,
        /// Description of the problem.
        reason: String,
    },

    // =========================================================================
    // Configuration errors
    // =========================================================================
    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// An application manifest could not be read or parsed.
    #[error("Manifest invalid at `{path}`: {message}")]
    InvalidManifest {
        /// Path to the manifest file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An error raised by a user-supplied binder.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BindingError {
    /// Create a malformed filter error.
    pub fn malformed_filter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedFilter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid type hint error.
    pub fn invalid_type_hint(hint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTypeHint {
            hint: hint.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid schema error.
    pub fn invalid_schema(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            class: class.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Whether this error was caused by request data rather than by setup.
    ///
    /// The dispatcher maps these to client errors.
    pub fn is_request_error(&self) -> bool {
        matches!(self, Self::MalformedFilter { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_filter_message() {
        let err = BindingError::malformed_filter("filter", "expected an object");
        assert_eq!(
            err.to_string(),
            "Malformed filter for parameter `filter`: expected an object"
        );
        assert!(err.is_request_error());
    }

    #[test]
    fn test_configuration_errors_are_not_request_errors() {
        let err = BindingError::invalid_configuration("maxDepth must be positive", "Set it to 32");
        assert!(!err.is_request_error());
        assert!(err.to_string().contains("Set it to 32"));
    }
}
