//! Request and response validation against a loaded contract.
//!
//! Both validators treat the contract as read-only and carry no per-request
//! state; the interception pipeline owns when they run and what happens to
//! their findings.

mod error;
mod params;
mod request;
mod response;

pub use error::{ValidationError, ValidationErrorKind};
pub use params::decode_param_value;
pub use request::{CoercedParameters, RequestValidation, RequestValidator};
pub use response::{ResponseValidation, ResponseValidator};

/// Body payloads are only parsed for schema validation when they are JSON.
pub(crate) fn is_json_mimetype(mimetype: &str) -> bool {
    mimetype == "application/json" || mimetype.ends_with("+json")
}
