//! The ordered binder chain.
//!
//! [`CompositeModelBinder`] owns the chain of binders and asks each in turn;
//! the first one to claim a target wins. Binder instances are built once, on
//! first use, and reused for the lifetime of the composite.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, trace};

use crate::binders::{Binder, BinderKind};
use crate::config::{BinderOverride, BindingConfig};
use crate::context::BindingContext;
use crate::descriptor::TargetDescriptor;
use crate::errors::BindResult;
use crate::value::BindingResult;

type Registration = (String, Arc<dyn Binder>);

/// Chain of responsibility over the configured binders.
///
/// The default precedence is `builtin`, `active_record`, `model`,
/// `data_filter`, `date_time`, `container`, `class_type`. Overrides from
/// configuration are applied first, then binders added with
/// [`with_binder`](Self::with_binder). An override replaces a binder with
/// the same key in place or is appended after the existing ones.
pub struct CompositeModelBinder {
    config: BindingConfig,
    custom: Vec<Registration>,
    binders: OnceLock<Vec<Registration>>,
}

impl CompositeModelBinder {
    /// Create a composite for `config`. Nothing is instantiated yet.
    pub fn new(config: BindingConfig) -> Self {
        Self {
            config,
            custom: Vec::new(),
            binders: OnceLock::new(),
        }
    }

    /// The default chain with default options.
    pub fn with_defaults() -> Self {
        Self::new(BindingConfig::default())
    }

    /// Register a custom binder under `key`.
    ///
    /// Using a default key (e.g. `date_time`) replaces that binder.
    pub fn with_binder(mut self, key: impl Into<String>, binder: Arc<dyn Binder>) -> Self {
        self.custom.push((key.into(), binder));
        self.binders = OnceLock::new();
        self
    }

    /// The configuration the chain is built from.
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Whether the chain has been materialized.
    pub fn is_ready(&self) -> bool {
        self.binders.get().is_some()
    }

    /// Effective binder keys in precedence order.
    pub fn binder_keys(&self) -> Vec<&str> {
        self.binders().iter().map(|(key, _)| key.as_str()).collect()
    }

    fn binders(&self) -> &[Registration] {
        self.binders.get_or_init(|| self.materialize())
    }

    fn materialize(&self) -> Vec<Registration> {
        let mut chain: Vec<Registration> = BinderKind::DEFAULT_ORDER
            .iter()
            .map(|kind| (kind.key().to_string(), kind.instantiate(&self.config)))
            .collect();

        for entry in &self.config.binders {
            apply_override(&mut chain, entry, &self.config);
        }
        for (key, binder) in &self.custom {
            register(&mut chain, key, Arc::clone(binder));
        }

        debug!(
            binders = ?chain.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>(),
            "Materialized binder chain"
        );
        chain
    }
}

fn apply_override(chain: &mut Vec<Registration>, entry: &BinderOverride, config: &BindingConfig) {
    if entry.disabled {
        chain.retain(|(key, _)| key != &entry.key);
        return;
    }
    // Entries without a resolvable kind are rejected by validation.
    if let Some(kind) = entry.resolved_kind() {
        register(chain, &entry.key, kind.instantiate(config));
    }
}

fn register(chain: &mut Vec<Registration>, key: &str, binder: Arc<dyn Binder>) {
    match chain.iter_mut().find(|(existing, _)| existing == key) {
        Some(slot) => slot.1 = binder,
        None => chain.push((key.to_string(), binder)),
    }
}

impl Default for CompositeModelBinder {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Binder for CompositeModelBinder {
    fn bind_model(
        &self,
        target: &TargetDescriptor<'_>,
        context: &BindingContext<'_>,
    ) -> BindResult<Option<BindingResult>> {
        for (key, binder) in self.binders() {
            if let Some(result) = binder.bind_model(target, context)? {
                debug!(
                    binder = %key,
                    target_name = target.name(),
                    kind = result.value.kind(),
                    depth = context.depth(),
                    "Binder claimed target"
                );
                return Ok(Some(result));
            }
        }
        trace!(target_name = target.name(), "All binders declined");
        Ok(None)
    }
}

impl fmt::Debug for CompositeModelBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeModelBinder")
            .field("config", &self.config)
            .field(
                "custom",
                &self.custom.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>(),
            )
            .field("ready", &self.is_ready())
            .finish()
    }
}
