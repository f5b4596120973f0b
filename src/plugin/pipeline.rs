//! Per-request interception: validate, invoke, serialize, validate again.
//!
//! Every wrapped route runs through [`OpenApiPlugin::intercept`]. The pass
//! ends in one of four ways: the response flows through, the request is
//! rejected before the handler runs, the response is replaced because the
//! handler broke its contract, or a handler failure is converted to an
//! error response. Only a short-circuit return skips all of it.

use super::OpenApiPlugin;
use crate::handler::{
    Handler, HandlerError, HandlerResponse, HandlerResult, HandlerReturn, Payload, RequestContext,
};
use crate::translate::{to_abstract_request, to_abstract_response};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};

impl OpenApiPlugin {
    pub(crate) fn intercept(&self, ctx: &mut RequestContext, inner: &dyn Handler) -> HandlerResult {
        let abstract_req = Arc::new(to_abstract_request(ctx));

        if self.config.validate_requests {
            let validation = self.request_validator.validate(&abstract_req);
            if !validation.is_valid() {
                warn!(
                    pattern = %abstract_req.full_path_pattern,
                    method = %abstract_req.method,
                    error_count = validation.errors.len(),
                    "request rejected by contract validation"
                );
                return Ok(HandlerReturn::Response((self.request_error_handler)(
                    ctx,
                    &validation,
                )));
            }
        }

        // The attachment lives exactly as long as the handler call; panics
        // must not leave it populated.
        ctx.openapi = Some(Arc::clone(&abstract_req));
        let outcome = catch_unwind(AssertUnwindSafe(|| inner.handle(ctx)));
        ctx.openapi = None;

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                let err = anyhow::anyhow!("handler panicked: {}", panic_message(panic.as_ref()));
                error!(rule = %ctx.rule, error = %err, "handler panicked");
                return Ok(HandlerReturn::Response((self.exception_handler)(ctx, &err)));
            }
        };

        let response = match result {
            Ok(ret) => self.normalize(ret),
            Err(HandlerError::ShortCircuit(resp)) => {
                return Err(HandlerError::ShortCircuit(resp));
            }
            Err(HandlerError::Internal(err)) => {
                error!(rule = %ctx.rule, error = %err, "handler failed");
                return Ok(HandlerReturn::Response((self.exception_handler)(ctx, &err)));
            }
        };

        if self.config.validate_responses {
            let abstract_resp = to_abstract_response(&response);
            let validation = self
                .response_validator
                .validate(&abstract_req, &abstract_resp);
            if !validation.is_valid() {
                error!(
                    pattern = %abstract_req.full_path_pattern,
                    status = abstract_resp.status_code,
                    error_count = validation.errors.len(),
                    "response violates the declared contract"
                );
                return Ok(HandlerReturn::Response((self.response_error_handler)(
                    ctx,
                    &response,
                    &validation,
                )));
            }
        }

        Ok(HandlerReturn::Response(response))
    }

    /// Fold the handler's tagged result into one concrete response.
    ///
    /// With auto-serialization on, structured payloads get the JSON content
    /// type here; the bytes are produced by the writer. Already-serialized
    /// payloads are never touched.
    fn normalize(&self, ret: HandlerReturn) -> HandlerResponse {
        match ret {
            HandlerReturn::Structured(value) => {
                let mut resp = HandlerResponse::json(value);
                if self.config.auto_serialize {
                    resp.set_header("content-type", "application/json");
                }
                resp
            }
            HandlerReturn::Response(mut resp) => {
                if self.config.auto_serialize && matches!(resp.body, Payload::Structured(_)) {
                    resp.set_header("content-type", "application/json");
                }
                resp
            }
            HandlerReturn::Passthrough(bytes) => HandlerResponse::new(200, Payload::Bytes(bytes)),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
