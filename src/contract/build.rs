use super::types::{
    CompiledSchema, MediaTypeMeta, OperationMeta, ParameterLocation, ParameterMeta,
    RequestBodyMeta, ResponseMeta,
};
use oas3::spec::{MediaTypeExamples, ObjectOrReference, Parameter};
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Expansion stops here so a cyclic `$ref` chain cannot loop forever.
const MAX_REF_DEPTH: usize = 32;

/// Resolve a `#/components/schemas/...` reference to its schema object.
pub fn resolve_schema_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::ObjectSchema> {
    if let Some(name) = ref_path.strip_prefix("#/components/schemas/") {
        spec.components
            .as_ref()?
            .schemas
            .get(name)
            .and_then(|schema_ref| match schema_ref {
                ObjectOrReference::Object(schema) => Some(schema),
                _ => None,
            })
    } else {
        None
    }
}

fn resolve_parameter_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::Parameter> {
    if let Some(name) = ref_path.strip_prefix("#/components/parameters/") {
        spec.components
            .as_ref()?
            .parameters
            .get(name)
            .and_then(|param_ref| match param_ref {
                ObjectOrReference::Object(param) => Some(param),
                _ => None,
            })
    } else {
        None
    }
}

/// Replace local `$ref` nodes with their resolved schemas, recursively.
///
/// Extracted schemas are validated detached from the document, so references
/// must be inlined before compilation.
pub fn expand_schema_refs(spec: &OpenApiV3Spec, value: &mut Value) {
    expand_refs_inner(spec, value, 0);
}

fn expand_refs_inner(spec: &OpenApiV3Spec, value: &mut Value, depth: usize) {
    if depth > MAX_REF_DEPTH {
        return;
    }
    match value {
        Value::Object(obj) => {
            if let Some(ref_path) = obj.get("$ref").and_then(|v| v.as_str()) {
                if let Some(schema) = resolve_schema_ref(spec, ref_path) {
                    if let Ok(mut new_val) = serde_json::to_value(schema) {
                        expand_refs_inner(spec, &mut new_val, depth + 1);
                        *value = new_val;
                        return;
                    }
                }
            }
            for v in obj.values_mut() {
                expand_refs_inner(spec, v, depth + 1);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_refs_inner(spec, v, depth + 1);
            }
        }
        _ => {}
    }
}

fn compile_schema(schema: &Value, location: &str) -> anyhow::Result<CompiledSchema> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| anyhow::anyhow!("invalid schema at {location}: {e}"))?;
    Ok(Arc::new(validator))
}

fn schema_value(
    spec: &OpenApiV3Spec,
    schema_ref: &ObjectOrReference<oas3::spec::ObjectSchema>,
) -> Option<Value> {
    let mut val = match schema_ref {
        ObjectOrReference::Object(schema_obj) => serde_json::to_value(schema_obj).ok(),
        ObjectOrReference::Ref { ref_path, .. } => {
            resolve_schema_ref(spec, ref_path).and_then(|s| serde_json::to_value(s).ok())
        }
    }?;
    expand_schema_refs(spec, &mut val);
    Some(val)
}

/// Resolve declared parameters (inline or `#/components/parameters` refs)
/// and compile their schemas.
pub fn extract_parameters(
    spec: &OpenApiV3Spec,
    params: &Vec<ObjectOrReference<Parameter>>,
    location: &str,
) -> anyhow::Result<Vec<ParameterMeta>> {
    let mut out = Vec::new();
    for p in params {
        let param = match p {
            ObjectOrReference::Object(obj) => Some(obj),
            ObjectOrReference::Ref { ref_path, .. } => resolve_parameter_ref(spec, ref_path),
        };

        if let Some(param) = param {
            let schema = param.schema.as_ref().and_then(|s| schema_value(spec, s));
            let compiled = match &schema {
                Some(s) => Some(compile_schema(
                    s,
                    &format!("{location} parameter {}", param.name),
                )?),
                None => None,
            };

            out.push(ParameterMeta {
                name: param.name.clone(),
                location: ParameterLocation::from(param.location),
                required: param.required.unwrap_or(false),
                schema,
                compiled,
                style: param.style.map(super::types::ParameterStyle::from),
                explode: param.explode,
            });
        }
    }
    Ok(out)
}

fn media_type_meta(
    spec: &OpenApiV3Spec,
    media: &oas3::spec::MediaType,
    location: &str,
) -> anyhow::Result<MediaTypeMeta> {
    let schema = media.schema.as_ref().and_then(|s| schema_value(spec, s));
    let compiled = match &schema {
        Some(s) => Some(compile_schema(s, location)?),
        None => None,
    };
    let example = match &media.examples {
        Some(MediaTypeExamples::Example { example }) => Some(example.clone()),
        Some(MediaTypeExamples::Examples { examples }) => {
            examples.iter().find_map(|(_, v)| match v {
                ObjectOrReference::Object(obj) => obj.value.clone(),
                _ => None,
            })
        }
        None => None,
    };
    Ok(MediaTypeMeta {
        schema,
        compiled,
        example,
    })
}

/// Extract the request body declaration with one entry per media type.
///
/// Every declared media type is kept, not just `application/json`; the
/// request validator needs the whole content map to reject undeclared
/// content types.
pub fn extract_request_body(
    spec: &OpenApiV3Spec,
    operation: &oas3::spec::Operation,
    location: &str,
) -> anyhow::Result<Option<RequestBodyMeta>> {
    let Some(ObjectOrReference::Object(req_body)) = operation.request_body.as_ref() else {
        return Ok(None);
    };
    let mut content = HashMap::new();
    for (mt, media) in &req_body.content {
        let meta = media_type_meta(spec, media, &format!("{location} requestBody {mt}"))?;
        content.insert(mt.clone(), meta);
    }
    Ok(Some(RequestBodyMeta {
        required: req_body.required.unwrap_or(false),
        content,
    }))
}

/// Extract all declared responses keyed by status, plus the `default` entry.
pub fn extract_responses(
    spec: &OpenApiV3Spec,
    operation: &oas3::spec::Operation,
    location: &str,
) -> anyhow::Result<(HashMap<u16, ResponseMeta>, Option<ResponseMeta>)> {
    let mut by_status: HashMap<u16, ResponseMeta> = HashMap::new();
    let mut default_response = None;

    if let Some(responses_map) = operation.responses.as_ref() {
        for (status_str, resp_ref) in responses_map {
            let ObjectOrReference::Object(resp_obj) = resp_ref else {
                continue;
            };
            let mut content = HashMap::new();
            for (mt, media) in &resp_obj.content {
                let meta =
                    media_type_meta(spec, media, &format!("{location} response {status_str} {mt}"))?;
                content.insert(mt.clone(), meta);
            }
            let meta = ResponseMeta { content };
            if status_str == "default" {
                default_response = Some(meta);
            } else if let Ok(status) = status_str.parse::<u16>() {
                by_status.insert(status, meta);
            }
        }
    }

    Ok((by_status, default_response))
}

/// Security schemes declared under `components.securitySchemes`.
pub fn extract_security_schemes(
    spec: &OpenApiV3Spec,
) -> HashMap<String, super::SecurityScheme> {
    spec.components
        .as_ref()
        .map(|c| {
            c.security_schemes
                .iter()
                .filter_map(|(name, scheme)| match scheme {
                    ObjectOrReference::Object(obj) => Some((name.clone(), obj.clone())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Path component of the document's first server URL, `/` when absent.
///
/// Relative server URLs (allowed by the spec) get a dummy host so the `url`
/// crate can parse them.
pub fn default_base_path(spec: &OpenApiV3Spec) -> String {
    let path = spec
        .servers
        .first()
        .and_then(|server| {
            let url_str = &server.url;
            url::Url::parse(url_str)
                .or_else(|_| url::Url::parse(&format!("http://dummy{url_str}")))
                .ok()
                .map(|u| u.path().trim_end_matches('/').to_string())
        })
        .unwrap_or_default();
    if path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

fn join_base(base: &str, path: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.is_empty() {
        path.to_string()
    } else {
        format!("{trimmed}{path}")
    }
}

/// Build the operation table for every path + method in the document.
///
/// Schemas are compiled here, once; an uncompilable schema fails the whole
/// load rather than surfacing later on the request path.
pub fn build_operations(
    spec: &OpenApiV3Spec,
    base_path: &str,
) -> anyhow::Result<Vec<Arc<OperationMeta>>> {
    let mut operations = Vec::new();

    if let Some(paths_map) = spec.paths.as_ref() {
        for (path, item) in paths_map {
            for (method_str, operation) in item.methods() {
                let method = method_str.clone();
                let location = format!("{method} {path}");

                let mut parameters = extract_parameters(spec, &item.parameters, &location)?;
                parameters.extend(extract_parameters(spec, &operation.parameters, &location)?);

                let request_body = extract_request_body(spec, operation, &location)?;
                let (responses, default_response) = extract_responses(spec, operation, &location)?;

                let security = if !operation.security.is_empty() {
                    operation.security.clone()
                } else {
                    spec.security.clone()
                };

                operations.push(Arc::new(OperationMeta {
                    method,
                    path_pattern: path.clone(),
                    full_pattern: join_base(base_path, path),
                    operation_id: operation.operation_id.clone(),
                    parameters,
                    request_body,
                    responses,
                    default_response,
                    security,
                }));
            }
        }
    }

    Ok(operations)
}
