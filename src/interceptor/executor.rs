use std::any::Any;
use std::cell::Cell;

use tracing::{debug, warn};

use super::interceptor::{ErasedNext, Flow, Target};
use super::registry::InterceptorRegistry;
use crate::error::HandlerError;
use crate::handler::{BoundHandler, ErasedHandler, Handler};
use crate::model::{Request, TypeKey};

/// Tracing target for interceptor and filter pipelines.
pub(crate) const PIPELINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pipeline");

/// Runs the interceptor phases for one dispatch.
///
/// ```text
/// before(1) -> before(2) -> around(1) { around(2) { handler } }
///                                  |
///             ok:  after_return(2) -> after_return(1)
///             err: after_throwing(2) -> after_throwing(1)
/// ```
#[derive(Debug, Default)]
pub struct InterceptorExecutor {
    registry: InterceptorRegistry,
}

impl InterceptorExecutor {
    pub fn new(registry: InterceptorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &InterceptorRegistry {
        &self.registry
    }

    /// Run every interceptor bound to `Q` or `H` around `handler`.
    ///
    /// Returns `Ok(false)` without touching the handler when no interceptor
    /// applies; the caller is then responsible for invoking it. `Ok(true)`
    /// means the pipeline ran, whether it completed or stopped early.
    pub fn execute<Q, H>(
        &self,
        request: &Q,
        response: &mut H::Response,
        handler: &H,
    ) -> Result<bool, HandlerError>
    where
        Q: Request,
        H: Handler<Q> + 'static,
    {
        let bound = BoundHandler::<Q, _>::borrowed(handler);
        let target =
            |request: &dyn Any, response: &mut dyn Any| bound.handle_erased(request, response);
        self.execute_erased(
            request,
            response,
            TypeKey::of::<Q>(),
            TypeKey::of::<H>(),
            &target,
        )
    }

    pub(crate) fn execute_erased(
        &self,
        request: &dyn Any,
        response: &mut dyn Any,
        request_type: TypeKey,
        handler: TypeKey,
        target: &Target<'_>,
    ) -> Result<bool, HandlerError> {
        if self.registry.is_empty() {
            return Ok(false);
        }
        let chain = self.registry.chain_for(request_type, handler);
        if chain.is_empty() {
            return Ok(false);
        }

        for interceptor in &chain {
            if interceptor.erased().before(request, response)?.is_stop() {
                debug!(
                    target: PIPELINE_TARGET,
                    interceptor = interceptor.name(),
                    request = request_type.name(),
                    "before phase stopped the pipeline"
                );
                return Ok(true);
            }
        }

        // An around that drops its `Next` skips the handler just like `Stop`.
        let target_ran = Cell::new(false);
        let tracked = |request: &dyn Any, response: &mut dyn Any| {
            target_ran.set(true);
            target(request, response)
        };
        match ErasedNext::new(&chain, &tracked).proceed(request, response) {
            Ok(Flow::Stop) => {
                debug!(
                    target: PIPELINE_TARGET,
                    request = request_type.name(),
                    "around phase stopped the pipeline"
                );
            }
            Ok(Flow::Continue) if !target_ran.get() => {
                debug!(
                    target: PIPELINE_TARGET,
                    request = request_type.name(),
                    "around phase returned without proceeding; treating as stop"
                );
            }
            Ok(Flow::Continue) => {
                for interceptor in chain.iter().rev() {
                    if interceptor.erased().after_return(request, response)?.is_stop() {
                        debug!(
                            target: PIPELINE_TARGET,
                            interceptor = interceptor.name(),
                            "after-return phase stopped"
                        );
                        break;
                    }
                }
            }
            Err(error) => {
                for interceptor in chain.iter().rev() {
                    let flow = interceptor
                        .erased()
                        .after_throwing(request, response, &error)?;
                    if flow.is_stop() {
                        warn!(
                            target: PIPELINE_TARGET,
                            interceptor = interceptor.name(),
                            request = request_type.name(),
                            error = %error,
                            "error suppressed by interceptor"
                        );
                        return Ok(true);
                    }
                }
                return Err(error);
            }
        }
        Ok(true)
    }
}
