//! Service locator resolution.

use tracing::trace;

use crate::context::BindingContext;
use crate::descriptor::TargetDescriptor;
use crate::errors::BindResult;
use crate::value::{BindingResult, BoundValue};

use super::Binder;

/// Binds targets whose declared type the context's service locator can
/// resolve. The raw request value is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerBinder;

impl Binder for ContainerBinder {
    fn bind_model(
        &self,
        target: &TargetDescriptor<'_>,
        context: &BindingContext<'_>,
    ) -> BindResult<Option<BindingResult>> {
        let Some(hint) = target.type_hint().filter(|hint| !hint.is_builtin()) else {
            return Ok(None);
        };

        match context.services().resolve(hint.name()) {
            Some(service) => Ok(Some(BindingResult::new(BoundValue::Service(service)))),
            None => {
                trace!(type_name = hint.name(), "type not registered in service locator");
                Ok(None)
            }
        }
    }
}
