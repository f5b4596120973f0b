use super::error::{ValidationError, ValidationErrorKind};
use super::is_json_mimetype;
use crate::contract::{Contract, OperationLookup};
use crate::translate::{AbstractRequest, AbstractResponse};
use serde_json::Value;
use std::sync::Arc;

/// Outcome of one response validation pass.
#[derive(Debug, Default)]
pub struct ResponseValidation {
    pub errors: Vec<ValidationError>,
}

impl ResponseValidation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn reject(kind: ValidationErrorKind, message: String) -> Self {
        Self {
            errors: vec![ValidationError::new(kind, "", message)],
        }
    }
}

/// Validates outgoing responses against the operation they answer.
///
/// A failure here means the handler broke its own declared contract, which
/// the pipeline reports as a server fault.
pub struct ResponseValidator {
    contract: Arc<Contract>,
}

impl ResponseValidator {
    #[must_use]
    pub fn new(contract: Arc<Contract>) -> Self {
        Self { contract }
    }

    /// Validate a response against the declared response for its status.
    ///
    /// The operation is looked up again from the paired request: with request
    /// validation disabled this pass may be the first to notice an undeclared
    /// path or method.
    #[must_use]
    pub fn validate(&self, req: &AbstractRequest, resp: &AbstractResponse) -> ResponseValidation {
        let operation = match self
            .contract
            .find_operation(&req.full_path_pattern, &req.method)
        {
            OperationLookup::Found(op) => op,
            OperationLookup::MethodNotAllowed => {
                return ResponseValidation::reject(
                    ValidationErrorKind::OperationNotFound,
                    format!(
                        "operation not found: {} {}",
                        req.method.to_ascii_uppercase(),
                        req.full_path_pattern
                    ),
                );
            }
            OperationLookup::PathNotFound => {
                return ResponseValidation::reject(
                    ValidationErrorKind::PathNotFound,
                    format!("path not found: {}", req.full_path_pattern),
                );
            }
        };

        let mut result = ResponseValidation::default();
        let Some(response_meta) = operation.response_for(resp.status_code) else {
            result.errors.push(ValidationError::schema(
                "response",
                format!("no response declared for status {}", resp.status_code),
            ));
            return result;
        };

        if response_meta.content.is_empty() {
            return result;
        }
        let Some(media) = response_meta.content.get(&resp.mimetype) else {
            result.errors.push(ValidationError::new(
                ValidationErrorKind::UnsupportedMediaType,
                "response",
                format!(
                    "content type {:?} is not declared for status {}",
                    resp.mimetype, resp.status_code
                ),
            ));
            return result;
        };

        if !is_json_mimetype(&resp.mimetype) {
            return result;
        }
        let Some(compiled) = &media.compiled else {
            return result;
        };
        let parsed: Value = match serde_json::from_slice(&resp.data) {
            Ok(v) => v,
            Err(e) => {
                result.errors.push(ValidationError::schema(
                    "body",
                    format!("response body is not valid JSON: {e}"),
                ));
                return result;
            }
        };
        for err in compiled.iter_errors(&parsed) {
            result
                .errors
                .push(ValidationError::schema("body", err.to_string()));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::RequestParameters;
    use serde_json::json;

    fn contract() -> Arc<Contract> {
        let doc = json!({
            "openapi": "3.0.0",
            "info": { "title": "Test API", "version": "1.0.0" },
            "paths": {
                "/foobar": {
                    "post": {
                        "responses": {
                            "201": {
                                "description": "created",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/FooObject" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/anything": {
                    "get": {
                        "responses": {
                            "default": {
                                "description": "whatever",
                                "content": {
                                    "application/json": {
                                        "schema": { "type": "object" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "FooObject": {
                        "type": "object",
                        "required": ["one", "two"],
                        "properties": {
                            "one": { "type": "number" },
                            "two": { "type": "string" },
                            "three": { "type": "object" }
                        }
                    }
                }
            }
        });
        Arc::new(Contract::from_document(doc, None, true).expect("contract loads"))
    }

    fn request(pattern: &str, method: &str) -> AbstractRequest {
        AbstractRequest {
            full_path_pattern: pattern.to_string(),
            method: method.to_string(),
            parameters: RequestParameters::default(),
            body: Vec::new(),
            mimetype: String::new(),
        }
    }

    fn response(status: u16, mimetype: &str, body: Value) -> AbstractResponse {
        AbstractResponse {
            data: serde_json::to_vec(&body).expect("serializes"),
            status_code: status,
            mimetype: mimetype.to_string(),
        }
    }

    #[test]
    fn test_conforming_response_is_valid() {
        let validator = ResponseValidator::new(contract());
        let body = json!({ "one": 1.0, "two": "???", "three": { "foo": "bar" } });
        let result = validator.validate(
            &request("/foobar", "post"),
            &response(201, "application/json", body),
        );
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_undeclared_status_is_rejected() {
        let validator = ResponseValidator::new(contract());
        let result = validator.validate(
            &request("/foobar", "post"),
            &response(200, "application/json", json!({})),
        );
        assert!(!result.is_valid());
        assert!(result.errors[0].to_string().contains("status 200"));
    }

    #[test]
    fn test_schema_violation_is_reported() {
        let validator = ResponseValidator::new(contract());
        let result = validator.validate(
            &request("/foobar", "post"),
            &response(201, "application/json", json!({ "one": 1.0 })),
        );
        assert!(result
            .errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::Schema));
    }

    #[test]
    fn test_undeclared_content_type_is_rejected() {
        let validator = ResponseValidator::new(contract());
        let result = validator.validate(
            &request("/foobar", "post"),
            &AbstractResponse {
                data: b"<foo/>".to_vec(),
                status_code: 201,
                mimetype: "text/xml".to_string(),
            },
        );
        assert_eq!(
            result.errors[0].kind,
            ValidationErrorKind::UnsupportedMediaType
        );
    }

    #[test]
    fn test_default_response_covers_any_status() {
        let validator = ResponseValidator::new(contract());
        let result = validator.validate(
            &request("/anything", "get"),
            &response(503, "application/json", json!({})),
        );
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_unknown_path_when_request_validation_skipped() {
        let validator = ResponseValidator::new(contract());
        let result = validator.validate(
            &request("/nope", "get"),
            &response(200, "application/json", json!({})),
        );
        assert_eq!(result.errors[0].kind, ValidationErrorKind::PathNotFound);
    }
}
