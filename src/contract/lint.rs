//! # Document Lint
//!
//! Structural checks over a raw OpenAPI 3.0 document, run before the
//! contract is parsed. Error findings are fatal at load time; warnings and
//! info findings are logged and kept.
//!
//! ## Checks performed
//!
//! 1. **Version field** - `openapi` present and `3.x`
//! 2. **Info block** - `info.title` and `info.version` present
//! 3. **Paths** - object with `/`-prefixed keys, valid verbs, balanced templates
//! 4. **Parameters** - `name` present, `in` valid, path parameters required
//! 5. **References** - local `$ref`s resolve inside the document
//! 6. **Security** - requirements name declared `securitySchemes`

use serde_json::Value;
use std::collections::HashSet;

const HTTP_VERBS: [&str; 8] = [
    "get", "post", "put", "delete", "patch", "options", "head", "trace",
];

const PATH_ITEM_KEYS: [&str; 5] = ["summary", "description", "servers", "parameters", "$ref"];

/// Severity level for lint findings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Error - the contract loader refuses the document
    Error,
    /// Warning - suspicious but loadable
    Warning,
    /// Info - best practice suggestion
    Info,
}

impl std::fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LintSeverity::Error => write!(f, "ERROR"),
            LintSeverity::Warning => write!(f, "WARNING"),
            LintSeverity::Info => write!(f, "INFO"),
        }
    }
}

/// A finding produced by the document lint
#[derive(Debug, Clone)]
pub struct LintIssue {
    /// Where the finding occurred (e.g., `paths:/pets/{petId}:get`)
    pub location: String,
    /// Severity of the finding
    pub severity: LintSeverity,
    /// Machine-readable kind (e.g., `unresolved_ref`, `missing_version`)
    pub kind: String,
    /// Human-readable description
    pub message: String,
    /// Optional suggestion for how to fix it
    pub suggestion: Option<String>,
}

impl LintIssue {
    pub fn new(
        location: impl Into<String>,
        severity: LintSeverity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LintIssue {
            location: location.into(),
            severity,
            kind: kind.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Lint a raw document. Never fails; the caller decides what error
/// findings mean (the contract loader treats any as fatal).
#[must_use]
pub fn lint_document(doc: &Value) -> Vec<LintIssue> {
    let mut issues = Vec::new();

    check_version(doc, &mut issues);
    check_info(doc, &mut issues);
    check_paths(doc, &mut issues);
    check_refs(doc, &mut issues);
    check_security(doc, &mut issues);

    issues
}

/// Count of error-severity findings.
#[must_use]
pub fn error_count(issues: &[LintIssue]) -> usize {
    issues
        .iter()
        .filter(|i| i.severity == LintSeverity::Error)
        .count()
}

/// One line per finding, for fatal-load error messages.
#[must_use]
pub fn format_report(issues: &[LintIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("[{}] {} ({}): {}", i.severity, i.location, i.kind, i.message))
        .collect::<Vec<_>>()
        .join("\n")
}

fn check_version(doc: &Value, issues: &mut Vec<LintIssue>) {
    match doc.get("openapi").and_then(|v| v.as_str()) {
        None => issues.push(LintIssue::new(
            "openapi",
            LintSeverity::Error,
            "missing_version",
            "document has no `openapi` version field",
        )),
        Some(v) if !v.starts_with("3.") => issues.push(
            LintIssue::new(
                "openapi",
                LintSeverity::Error,
                "unsupported_version",
                format!("unsupported OpenAPI version `{v}`"),
            )
            .with_suggestion("this middleware validates OpenAPI 3.x documents"),
        ),
        Some(_) => {}
    }
}

fn check_info(doc: &Value, issues: &mut Vec<LintIssue>) {
    let Some(info) = doc.get("info") else {
        issues.push(LintIssue::new(
            "info",
            LintSeverity::Error,
            "missing_info",
            "document has no `info` block",
        ));
        return;
    };
    for field in ["title", "version"] {
        if info.get(field).and_then(|v| v.as_str()).is_none() {
            issues.push(LintIssue::new(
                format!("info.{field}"),
                LintSeverity::Error,
                "missing_info_field",
                format!("`info.{field}` is required"),
            ));
        }
    }
}

fn check_paths(doc: &Value, issues: &mut Vec<LintIssue>) {
    let Some(paths) = doc.get("paths") else {
        issues.push(LintIssue::new(
            "paths",
            LintSeverity::Error,
            "missing_paths",
            "document has no `paths` object",
        ));
        return;
    };
    let Some(paths) = paths.as_object() else {
        issues.push(LintIssue::new(
            "paths",
            LintSeverity::Error,
            "invalid_paths",
            "`paths` must be an object",
        ));
        return;
    };

    for (path, item) in paths {
        let location = format!("paths:{path}");
        if !path.starts_with('/') {
            issues.push(LintIssue::new(
                &location,
                LintSeverity::Error,
                "invalid_path_key",
                "path keys must start with `/`",
            ));
        }
        check_template(path, &location, issues);

        let Some(item) = item.as_object() else {
            issues.push(LintIssue::new(
                &location,
                LintSeverity::Error,
                "invalid_path_item",
                "path item must be an object",
            ));
            continue;
        };

        for (key, op) in item {
            let lk = key.to_ascii_lowercase();
            if HTTP_VERBS.contains(&lk.as_str()) {
                check_operation(op, &format!("{location}:{lk}"), issues);
            } else if key == "parameters" {
                check_parameters(op, &location, issues);
            } else if !PATH_ITEM_KEYS.contains(&key.as_str()) && !key.starts_with("x-") {
                issues.push(LintIssue::new(
                    format!("{location}:{key}"),
                    LintSeverity::Warning,
                    "unknown_path_item_key",
                    format!("`{key}` is not a path item key and will be ignored"),
                ));
            }
        }
    }
}

fn check_template(path: &str, location: &str, issues: &mut Vec<LintIssue>) {
    for segment in path.split('/') {
        let opens = segment.matches('{').count();
        let closes = segment.matches('}').count();
        let balanced = opens == closes
            && (opens == 0 || (segment.starts_with('{') && segment.ends_with('}') && opens == 1));
        if !balanced {
            issues.push(LintIssue::new(
                location,
                LintSeverity::Error,
                "malformed_template",
                format!("path segment `{segment}` has a malformed parameter template"),
            ));
        }
    }
}

fn check_operation(op: &Value, location: &str, issues: &mut Vec<LintIssue>) {
    if !op.is_object() {
        issues.push(LintIssue::new(
            location,
            LintSeverity::Error,
            "invalid_operation",
            "operation must be an object",
        ));
        return;
    }
    if let Some(params) = op.get("parameters") {
        check_parameters(params, location, issues);
    }
    if op.get("responses").is_none() {
        issues.push(LintIssue::new(
            location,
            LintSeverity::Warning,
            "missing_responses",
            "operation declares no responses; response validation will reject everything",
        ));
    }
}

fn check_parameters(params: &Value, location: &str, issues: &mut Vec<LintIssue>) {
    let Some(params) = params.as_array() else {
        issues.push(LintIssue::new(
            location,
            LintSeverity::Error,
            "invalid_parameters",
            "`parameters` must be an array",
        ));
        return;
    };
    for param in params {
        if param.get("$ref").is_some() {
            continue;
        }
        let name = param.get("name").and_then(|v| v.as_str());
        if name.is_none() {
            issues.push(LintIssue::new(
                location,
                LintSeverity::Error,
                "parameter_missing_name",
                "parameter has no `name`",
            ));
        }
        match param.get("in").and_then(|v| v.as_str()) {
            Some("path") => {
                if param.get("required").and_then(|v| v.as_bool()) != Some(true) {
                    issues.push(LintIssue::new(
                        format!("{location}:{}", name.unwrap_or("?")),
                        LintSeverity::Error,
                        "path_parameter_not_required",
                        "path parameters must set `required: true`",
                    ));
                }
            }
            Some("query" | "header" | "cookie") => {}
            Some(other) => issues.push(LintIssue::new(
                format!("{location}:{}", name.unwrap_or("?")),
                LintSeverity::Error,
                "invalid_parameter_location",
                format!("`in: {other}` is not a valid parameter location"),
            )),
            None => issues.push(LintIssue::new(
                format!("{location}:{}", name.unwrap_or("?")),
                LintSeverity::Error,
                "parameter_missing_location",
                "parameter has no `in` field",
            )),
        }
    }
}

fn check_refs(doc: &Value, issues: &mut Vec<LintIssue>) {
    walk_refs(doc, doc, "#", issues);
}

fn walk_refs(doc: &Value, node: &Value, location: &str, issues: &mut Vec<LintIssue>) {
    match node {
        Value::Object(obj) => {
            if let Some(ref_path) = obj.get("$ref").and_then(|v| v.as_str()) {
                if let Some(pointer) = ref_path.strip_prefix('#') {
                    if doc.pointer(pointer).is_none() {
                        issues.push(LintIssue::new(
                            location,
                            LintSeverity::Error,
                            "unresolved_ref",
                            format!("`{ref_path}` does not resolve"),
                        ));
                    }
                } else {
                    issues.push(
                        LintIssue::new(
                            location,
                            LintSeverity::Warning,
                            "external_ref",
                            format!("`{ref_path}` is external and will not be dereferenced"),
                        )
                        .with_suggestion("inline external schemas before loading"),
                    );
                }
            }
            for (k, v) in obj {
                walk_refs(doc, v, &format!("{location}/{k}"), issues);
            }
        }
        Value::Array(arr) => {
            for (i, v) in arr.iter().enumerate() {
                walk_refs(doc, v, &format!("{location}/{i}"), issues);
            }
        }
        _ => {}
    }
}

fn check_security(doc: &Value, issues: &mut Vec<LintIssue>) {
    let declared: HashSet<&str> = doc
        .pointer("/components/securitySchemes")
        .and_then(|v| v.as_object())
        .map(|m| m.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let mut check_block = |block: Option<&Value>, location: &str| {
        let Some(reqs) = block.and_then(|v| v.as_array()) else {
            return;
        };
        for req in reqs {
            if let Some(obj) = req.as_object() {
                for scheme in obj.keys() {
                    if !declared.contains(scheme.as_str()) {
                        issues.push(LintIssue::new(
                            location,
                            LintSeverity::Error,
                            "undeclared_security_scheme",
                            format!("security requirement names undeclared scheme `{scheme}`"),
                        ));
                    }
                }
            }
        }
    };

    check_block(doc.get("security"), "security");
    if let Some(paths) = doc.get("paths").and_then(|v| v.as_object()) {
        for (path, item) in paths {
            if let Some(item) = item.as_object() {
                for (verb, op) in item {
                    if HTTP_VERBS.contains(&verb.to_ascii_lowercase().as_str()) {
                        check_block(op.get("security"), &format!("paths:{path}:{verb}"));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_doc() -> Value {
        json!({
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "paths": {}
        })
    }

    #[test]
    fn test_clean_document_passes() {
        let issues = lint_document(&minimal_doc());
        assert_eq!(error_count(&issues), 0);
    }

    #[test]
    fn test_missing_version_is_error() {
        let doc = json!({"info": {"title": "t", "version": "1"}, "paths": {}});
        let issues = lint_document(&doc);
        assert!(issues.iter().any(|i| i.kind == "missing_version"));
        assert!(error_count(&issues) > 0);
    }

    #[test]
    fn test_wrong_major_version_is_error() {
        let mut doc = minimal_doc();
        doc["openapi"] = json!("2.0");
        let issues = lint_document(&doc);
        assert!(issues.iter().any(|i| i.kind == "unsupported_version"));
    }

    #[test]
    fn test_unresolved_ref_is_error() {
        let mut doc = minimal_doc();
        doc["paths"] = json!({
            "/a": {"get": {"responses": {"200": {
                "description": "ok",
                "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Nope"}}}
            }}}}
        });
        let issues = lint_document(&doc);
        assert!(issues.iter().any(|i| i.kind == "unresolved_ref"));
    }

    #[test]
    fn test_external_ref_is_warning() {
        let mut doc = minimal_doc();
        doc["paths"] = json!({
            "/a": {"get": {"responses": {"200": {
                "description": "ok",
                "content": {"application/json": {"schema": {"$ref": "https://x/y.json"}}}
            }}}}
        });
        let issues = lint_document(&doc);
        let issue = issues.iter().find(|i| i.kind == "external_ref").unwrap();
        assert_eq!(issue.severity, LintSeverity::Warning);
        assert_eq!(error_count(&issues), 0);
    }

    #[test]
    fn test_path_parameter_must_be_required() {
        let mut doc = minimal_doc();
        doc["paths"] = json!({
            "/a/{id}": {"get": {
                "parameters": [{"name": "id", "in": "path", "schema": {"type": "string"}}],
                "responses": {"200": {"description": "ok"}}
            }}
        });
        let issues = lint_document(&doc);
        assert!(issues
            .iter()
            .any(|i| i.kind == "path_parameter_not_required"));
    }

    #[test]
    fn test_undeclared_security_scheme() {
        let mut doc = minimal_doc();
        doc["security"] = json!([{"ghost": []}]);
        let issues = lint_document(&doc);
        assert!(issues
            .iter()
            .any(|i| i.kind == "undeclared_security_scheme"));
    }

    #[test]
    fn test_malformed_template_segment() {
        let mut doc = minimal_doc();
        doc["paths"] = json!({
            "/a/{id": {"get": {"responses": {"200": {"description": "ok"}}}}
        });
        let issues = lint_document(&doc);
        assert!(issues.iter().any(|i| i.kind == "malformed_template"));
    }

    #[test]
    fn test_base_path_key_is_tolerated() {
        let mut doc = minimal_doc();
        doc["basePath"] = json!("/v1");
        let issues = lint_document(&doc);
        assert_eq!(error_count(&issues), 0);
    }
}
