use super::error::{ValidationError, ValidationErrorKind};
use super::is_json_mimetype;
use super::params::decode_param_value;
use crate::contract::{Contract, MediaTypeMeta, OperationLookup, OperationMeta, ParameterLocation};
use crate::security::{credentials_present, SecurityProvider, SecurityRequest};
use crate::translate::AbstractRequest;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Parameter values that passed coercion and schema validation, by location.
#[derive(Debug, Clone, Default)]
pub struct CoercedParameters {
    pub path: HashMap<String, Value>,
    pub query: HashMap<String, Value>,
    pub header: HashMap<String, Value>,
    pub cookie: HashMap<String, Value>,
}

impl CoercedParameters {
    fn slot_mut(&mut self, location: &ParameterLocation) -> &mut HashMap<String, Value> {
        match location {
            ParameterLocation::Path => &mut self.path,
            ParameterLocation::Query => &mut self.query,
            ParameterLocation::Header => &mut self.header,
            ParameterLocation::Cookie => &mut self.cookie,
        }
    }
}

/// Outcome of one request validation pass.
///
/// Errors keep the order they were detected in; the coerced parameters and
/// parsed body cover whatever validated cleanly, even when other parts of the
/// request did not.
#[derive(Debug, Default)]
pub struct RequestValidation {
    pub errors: Vec<ValidationError>,
    pub parameters: CoercedParameters,
    pub body: Option<Value>,
}

impl RequestValidation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn reject(kind: ValidationErrorKind, location: &str, message: String) -> Self {
        Self {
            errors: vec![ValidationError::new(kind, location, message)],
            ..Self::default()
        }
    }
}

/// Validates abstract requests against a contract.
///
/// Bound to the contract at construction and stateless per request, so one
/// instance serves all concurrent validations.
pub struct RequestValidator {
    contract: Arc<Contract>,
    providers: HashMap<String, Arc<dyn SecurityProvider>>,
}

impl RequestValidator {
    #[must_use]
    pub fn new(contract: Arc<Contract>) -> Self {
        Self {
            contract,
            providers: HashMap::new(),
        }
    }

    /// Attach per-scheme security providers. Schemes without one fall back
    /// to a credential presence check.
    #[must_use]
    pub fn with_providers(
        contract: Arc<Contract>,
        providers: HashMap<String, Arc<dyn SecurityProvider>>,
    ) -> Self {
        Self {
            contract,
            providers,
        }
    }

    /// Validate a request, collecting every detectable violation.
    ///
    /// Checks run in a fixed order: operation lookup, security, content type,
    /// parameters, body. Lookup failures end the pass early since nothing
    /// else can be checked without an operation.
    #[must_use]
    pub fn validate(&self, req: &AbstractRequest) -> RequestValidation {
        let operation = match self
            .contract
            .find_operation(&req.full_path_pattern, &req.method)
        {
            OperationLookup::Found(op) => op,
            OperationLookup::MethodNotAllowed => {
                return RequestValidation::reject(
                    ValidationErrorKind::OperationNotFound,
                    "",
                    format!(
                        "operation not found: {} {}",
                        req.method.to_ascii_uppercase(),
                        req.full_path_pattern
                    ),
                );
            }
            OperationLookup::PathNotFound => {
                return RequestValidation::reject(
                    ValidationErrorKind::PathNotFound,
                    "",
                    format!("path not found: {}", req.full_path_pattern),
                );
            }
        };

        let mut result = RequestValidation::default();
        self.check_security(&operation, req, &mut result);
        let media = self.check_media_type(&operation, req, &mut result);
        self.check_parameters(&operation, req, &mut result);
        if let Some(media) = media {
            Self::check_body(media, req, &mut result);
        }
        result
    }

    /// One satisfied requirement authorizes the request; within a
    /// requirement every scheme must pass.
    fn check_security(
        &self,
        operation: &OperationMeta,
        req: &AbstractRequest,
        result: &mut RequestValidation,
    ) {
        if operation.security.is_empty() {
            return;
        }
        let sec_req = SecurityRequest {
            headers: &req.parameters.header,
            query: &req.parameters.query,
            cookies: &req.parameters.cookie,
        };
        let mut authorized = false;
        'outer: for requirement in &operation.security {
            let mut ok = true;
            for (scheme_name, scopes) in &requirement.0 {
                let Some(scheme) = self.contract.security_schemes().get(scheme_name) else {
                    ok = false;
                    break;
                };
                let passed = match self.providers.get(scheme_name) {
                    Some(provider) => provider.validate(scheme, scopes, &sec_req),
                    None => credentials_present(scheme, &sec_req),
                };
                if !passed {
                    ok = false;
                    break;
                }
            }
            if ok {
                authorized = true;
                break 'outer;
            }
        }
        if !authorized {
            result.errors.push(ValidationError::new(
                ValidationErrorKind::Security,
                "security",
                "no declared security requirement was satisfied".to_string(),
            ));
        }
    }

    /// Check the payload's media type against the declared content map.
    /// Returns the matched media type entry for the later body pass.
    fn check_media_type<'op>(
        &self,
        operation: &'op OperationMeta,
        req: &AbstractRequest,
        result: &mut RequestValidation,
    ) -> Option<&'op MediaTypeMeta> {
        let body_meta = operation.request_body.as_ref()?;
        if req.body.is_empty() {
            if body_meta.required {
                result
                    .errors
                    .push(ValidationError::schema("body", "required request body is missing"));
            }
            return None;
        }
        if !body_meta.content.is_empty() && !body_meta.content.contains_key(&req.mimetype) {
            result.errors.push(ValidationError::new(
                ValidationErrorKind::UnsupportedMediaType,
                "body",
                format!("content type {:?} is not declared", req.mimetype),
            ));
            return None;
        }
        body_meta.content.get(&req.mimetype)
    }

    fn check_body(media: &MediaTypeMeta, req: &AbstractRequest, result: &mut RequestValidation) {
        if !is_json_mimetype(&req.mimetype) {
            return;
        }
        let parsed: Value = match serde_json::from_slice(&req.body) {
            Ok(v) => v,
            Err(e) => {
                result.errors.push(ValidationError::schema(
                    "body",
                    format!("request body is not valid JSON: {e}"),
                ));
                return;
            }
        };
        if let Some(compiled) = &media.compiled {
            for err in compiled.iter_errors(&parsed) {
                result
                    .errors
                    .push(ValidationError::schema("body", err.to_string()));
            }
        }
        result.body = Some(parsed);
    }

    fn check_parameters(
        &self,
        operation: &OperationMeta,
        req: &AbstractRequest,
        result: &mut RequestValidation,
    ) {
        for param in &operation.parameters {
            let raw = match param.location {
                ParameterLocation::Path => req.parameters.path.get(&param.name),
                ParameterLocation::Query => req.parameters.query.get(&param.name),
                // header names are stored lowercased
                ParameterLocation::Header => {
                    req.parameters.header.get(&param.name.to_ascii_lowercase())
                }
                ParameterLocation::Cookie => req.parameters.cookie.get(&param.name),
            };
            let location = format!("{}.{}", param.location, param.name);
            let Some(raw) = raw else {
                if param.required {
                    result
                        .errors
                        .push(ValidationError::schema(location, "missing required parameter"));
                }
                continue;
            };
            let value =
                decode_param_value(raw, param.schema.as_ref(), param.style, param.explode);
            let mut violations = Vec::new();
            if let Some(compiled) = &param.compiled {
                for err in compiled.iter_errors(&value) {
                    violations.push(ValidationError::schema(location.clone(), err.to_string()));
                }
            }
            if violations.is_empty() {
                result
                    .parameters
                    .slot_mut(&param.location)
                    .insert(param.name.clone(), value);
            } else {
                result.errors.extend(violations);
            }
        }
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
                "/baz": {
                    "get": {
                        "parameters": [{
                            "name": "qParam",
                            "in": "query",
                            "required": true,
                            "schema": { "type": "integer" }
                        }],
                        "responses": { "200": { "description": "ok" } }
                    }
                },
                "/foobar": {
                    "post": {
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "required": ["one"],
                                        "properties": {
                                            "one": { "type": "number" },
                                            "two": { "type": "string" }
                                        }
                                    }
                                }
                            }
                        },
                        "responses": { "201": { "description": "created" } }
                    }
                },
                "/secure": {
                    "get": {
                        "security": [{ "ApiKeyAuth": [] }],
                        "responses": { "200": { "description": "ok" } }
                    }
                }
            },
            "components": {
                "securitySchemes": {
                    "ApiKeyAuth": { "type": "apiKey", "in": "header", "name": "X-API-Key" }
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

    #[test]
    fn test_unknown_path_reports_path_not_found() {
        let validator = RequestValidator::new(contract());
        let result = validator.validate(&request("/nope", "get"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ValidationErrorKind::PathNotFound);
    }

    #[test]
    fn test_unknown_method_reports_operation_not_found() {
        let validator = RequestValidator::new(contract());
        let result = validator.validate(&request("/baz", "delete"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ValidationErrorKind::OperationNotFound);
    }

    #[test]
    fn test_missing_required_query_parameter() {
        let validator = RequestValidator::new(contract());
        let result = validator.validate(&request("/baz", "get"));
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].kind, ValidationErrorKind::Schema);
        assert!(result.errors[0].to_string().contains("qParam"));
    }

    #[test]
    fn test_query_parameter_coerced_and_recorded() {
        let validator = RequestValidator::new(contract());
        let mut req = request("/baz", "get");
        req.parameters
            .query
            .insert("qParam".to_string(), "7".to_string());
        let result = validator.validate(&req);
        assert!(result.is_valid(), "errors: {:?}", result.errors);
        assert_eq!(result.parameters.query.get("qParam"), Some(&json!(7)));
    }

    #[test]
    fn test_query_parameter_type_violation() {
        let validator = RequestValidator::new(contract());
        let mut req = request("/baz", "get");
        req.parameters
            .query
            .insert("qParam".to_string(), "seven".to_string());
        let result = validator.validate(&req);
        assert!(!result.is_valid());
        assert!(result.parameters.query.is_empty());
    }

    #[test]
    fn test_missing_required_body() {
        let validator = RequestValidator::new(contract());
        let result = validator.validate(&request("/foobar", "post"));
        assert!(result
            .errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::Schema && e.location == "body"));
    }

    #[test]
    fn test_undeclared_content_type() {
        let validator = RequestValidator::new(contract());
        let mut req = request("/foobar", "post");
        req.body = b"one=1".to_vec();
        req.mimetype = "application/x-www-form-urlencoded".to_string();
        let result = validator.validate(&req);
        assert_eq!(
            result.errors[0].kind,
            ValidationErrorKind::UnsupportedMediaType
        );
    }

    #[test]
    fn test_body_schema_violation() {
        let validator = RequestValidator::new(contract());
        let mut req = request("/foobar", "post");
        req.body = serde_json::to_vec(&json!({ "two": "no one" })).expect("serializes");
        req.mimetype = "application/json".to_string();
        let result = validator.validate(&req);
        assert!(result
            .errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::Schema && e.location == "body"));
    }

    #[test]
    fn test_valid_body_parsed_into_result() {
        let validator = RequestValidator::new(contract());
        let mut req = request("/foobar", "post");
        req.body = serde_json::to_vec(&json!({ "one": 1.0, "two": "x" })).expect("serializes");
        req.mimetype = "application/json".to_string();
        let result = validator.validate(&req);
        assert!(result.is_valid(), "errors: {:?}", result.errors);
        assert_eq!(result.body, Some(json!({ "one": 1.0, "two": "x" })));
    }

    #[test]
    fn test_security_presence_check() {
        let validator = RequestValidator::new(contract());
        let mut req = request("/secure", "get");
        let result = validator.validate(&req);
        assert_eq!(result.errors[0].kind, ValidationErrorKind::Security);

        req.parameters
            .header
            .insert("x-api-key".to_string(), "abc".to_string());
        let result = validator.validate(&req);
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_registered_provider_overrides_presence_check() {
        struct DenyAll;
        impl SecurityProvider for DenyAll {
            fn validate(
                &self,
                _scheme: &crate::contract::SecurityScheme,
                _scopes: &[String],
                _req: &SecurityRequest,
            ) -> bool {
                false
            }
        }
        let mut providers: HashMap<String, Arc<dyn SecurityProvider>> = HashMap::new();
        providers.insert("ApiKeyAuth".to_string(), Arc::new(DenyAll));
        let validator = RequestValidator::with_providers(contract(), providers);
        let mut req = request("/secure", "get");
        req.parameters
            .header
            .insert("x-api-key".to_string(), "abc".to_string());
        let result = validator.validate(&req);
        assert_eq!(result.errors[0].kind, ValidationErrorKind::Security);
    }
}
