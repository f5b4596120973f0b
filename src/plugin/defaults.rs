//! Default failure handlers and their payload shapes.
//!
//! All three are plain functions so custom handlers can wrap or replace
//! them wholesale on the builder.

use crate::handler::{HandlerResponse, Payload, RequestContext};
use crate::validation::{
    RequestValidation, ResponseValidation, ValidationError, ValidationErrorKind,
};
use serde_json::json;

/// `{"status": "error", "message": ...}` with an explicit JSON content type.
#[must_use]
pub(crate) fn error_response(status: u16, message: &str) -> HandlerResponse {
    let mut resp = HandlerResponse::new(
        status,
        Payload::Structured(json!({ "status": "error", "message": message })),
    );
    resp.set_header("content-type", "application/json");
    resp
}

/// `{"status": "error", "errors": [...]}` with stringified errors.
#[must_use]
pub(crate) fn validation_error_response(status: u16, errors: &[ValidationError]) -> HandlerResponse {
    let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
    let mut resp = HandlerResponse::new(
        status,
        Payload::Structured(json!({ "status": "error", "errors": rendered })),
    );
    resp.set_header("content-type", "application/json");
    resp
}

/// Map request validation errors to a status and reject the request.
///
/// A security error wins outright and answers 401 without consulting the
/// rest. Otherwise every error is scanned in order and the last mapping
/// sticks: operation-not-found 405, path-not-found 404, unsupported media
/// type 415; plain schema violations leave the default 400.
#[must_use]
pub fn default_request_error_handler(
    _ctx: &RequestContext,
    validation: &RequestValidation,
) -> HandlerResponse {
    let mut status = 400;
    for error in &validation.errors {
        match error.kind {
            ValidationErrorKind::Security => {
                return error_response(401, "Authentication Required!");
            }
            ValidationErrorKind::OperationNotFound => status = 405,
            ValidationErrorKind::PathNotFound => status = 404,
            ValidationErrorKind::UnsupportedMediaType => status = 415,
            ValidationErrorKind::Schema => {}
        }
    }
    validation_error_response(status, &validation.errors)
}

/// A response violating its own declared contract is a server fault.
#[must_use]
pub fn default_response_error_handler(
    _ctx: &RequestContext,
    _response: &HandlerResponse,
    validation: &ResponseValidation,
) -> HandlerResponse {
    validation_error_response(500, &validation.errors)
}

/// Summarize a handler failure; the error chain is rendered, never a trace.
#[must_use]
pub fn default_exception_handler(_ctx: &RequestContext, error: &anyhow::Error) -> HandlerResponse {
    error_response(500, &format!("{error:#}"))
}
