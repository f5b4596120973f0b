use super::build::{build_operations, default_base_path, extract_security_schemes};
use super::lint::{error_count, format_report, lint_document, LintSeverity};
use super::types::OperationMeta;
use super::SecurityScheme;
use oas3::OpenApiV3Spec;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Immutable handle over a loaded OpenAPI document.
///
/// Owns the retained document (served by the schema endpoint), the extracted
/// operation table with compiled schemas, the declared security schemes and
/// the effective base path. Built once at startup; the request and response
/// validators borrow it through an `Arc`.
pub struct Contract {
    document: Value,
    title: String,
    base_path: String,
    operations: Vec<Arc<OperationMeta>>,
    routes: Vec<(Regex, Arc<OperationMeta>)>,
    security_schemes: HashMap<String, SecurityScheme>,
}

/// Outcome of matching a request template against the operation table.
#[derive(Debug, Clone)]
pub enum OperationLookup {
    Found(Arc<OperationMeta>),
    /// Some operation matched the path but not the method.
    MethodNotAllowed,
    PathNotFound,
}

impl Contract {
    /// Load a contract from an in-memory document.
    ///
    /// `base_path_override`, when given, is written into the retained
    /// document under `basePath` before anything else reads it, and becomes
    /// the effective base path. With `lint` enabled, any error-severity
    /// finding refuses the document.
    ///
    /// # Errors
    ///
    /// Fails on lint errors, on documents `oas3` cannot parse, and on
    /// schemas `jsonschema` cannot compile.
    pub fn from_document(
        document: Value,
        base_path_override: Option<&str>,
        lint: bool,
    ) -> anyhow::Result<Self> {
        let mut document = document;
        if let Some(bp) = base_path_override {
            if let Some(obj) = document.as_object_mut() {
                obj.insert("basePath".to_string(), Value::String(bp.to_string()));
            }
        }

        if lint {
            let issues = lint_document(&document);
            for issue in &issues {
                match issue.severity {
                    LintSeverity::Error => error!(
                        location = %issue.location,
                        kind = %issue.kind,
                        message = %issue.message,
                        "Contract lint error"
                    ),
                    LintSeverity::Warning => warn!(
                        location = %issue.location,
                        kind = %issue.kind,
                        message = %issue.message,
                        "Contract lint warning"
                    ),
                    LintSeverity::Info => debug!(
                        location = %issue.location,
                        kind = %issue.kind,
                        message = %issue.message,
                        "Contract lint note"
                    ),
                }
            }
            if error_count(&issues) > 0 {
                anyhow::bail!(
                    "contract document failed lint:\n{}",
                    format_report(&issues)
                );
            }
        }

        // `basePath` is this crate's own retained key, not an OpenAPI 3.0
        // field; strip it (and unknown verbs) before handing the document
        // to oas3.
        let mut parse_doc = document.clone();
        if let Some(obj) = parse_doc.as_object_mut() {
            obj.remove("basePath");
        }
        strip_unknown_verbs(&mut parse_doc);
        let spec: OpenApiV3Spec = serde_json::from_value(parse_doc)?;

        let title = spec.info.title.clone();
        let base_path = match base_path_override {
            Some(bp) => bp.to_string(),
            None => default_base_path(&spec),
        };

        let operations = build_operations(&spec, &base_path)?;
        let mut routes = Vec::with_capacity(operations.len());
        for op in &operations {
            let regex = pattern_to_regex(&op.full_pattern)?;
            routes.push((regex, Arc::clone(op)));
        }
        let security_schemes = extract_security_schemes(&spec);

        info!(
            title = %title,
            base_path = %base_path,
            operation_count = operations.len(),
            security_scheme_count = security_schemes.len(),
            "Contract loaded"
        );

        Ok(Self {
            document,
            title,
            base_path,
            operations,
            routes,
            security_schemes,
        })
    }

    /// Load a contract from a YAML or JSON file, sniffed by extension.
    ///
    /// # Errors
    ///
    /// Fails on IO errors, unparseable content, and everything
    /// [`Contract::from_document`] fails on.
    pub fn from_file(
        file_path: &str,
        base_path_override: Option<&str>,
        lint: bool,
    ) -> anyhow::Result<Self> {
        Self::from_document(read_document(file_path)?, base_path_override, lint)
    }

    /// The retained document, exactly as the schema endpoint serves it.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Effective base path: override, else the document's default server
    /// URL path, else `/`.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn operations(&self) -> &[Arc<OperationMeta>] {
        &self.operations
    }

    #[must_use]
    pub fn security_schemes(&self) -> &HashMap<String, SecurityScheme> {
        &self.security_schemes
    }

    /// Match a normalized request template (`/pets/{id}`) and lowercase
    /// method against the operation table.
    #[must_use]
    pub fn find_operation(&self, pattern: &str, method: &str) -> OperationLookup {
        let mut path_matched = false;
        for (regex, op) in &self.routes {
            if regex.is_match(pattern) {
                path_matched = true;
                if op.method.as_str().eq_ignore_ascii_case(method) {
                    return OperationLookup::Found(Arc::clone(op));
                }
            }
        }
        if path_matched {
            OperationLookup::MethodNotAllowed
        } else {
            OperationLookup::PathNotFound
        }
    }
}

/// Read a document from a YAML or JSON file, sniffed by extension.
///
/// # Errors
///
/// Fails on IO errors and unparseable content.
pub fn read_document(file_path: &str) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(file_path)?;
    let document: Value = if file_path.ends_with(".yaml") || file_path.ends_with(".yml") {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(document)
}

/// Compile a brace template (`/pets/{petId}`) to an anchored regex where
/// each placeholder segment matches one non-empty segment.
fn pattern_to_regex(path: &str) -> anyhow::Result<Regex> {
    if path == "/" {
        return Ok(Regex::new(r"^/$")?);
    }

    let mut pattern = String::with_capacity(path.len() + 5);
    pattern.push('^');
    for segment in path.split('/') {
        if segment.starts_with('{') && segment.ends_with('}') {
            pattern.push_str("/([^/]+)");
        } else if !segment.is_empty() {
            pattern.push('/');
            pattern.push_str(&regex::escape(segment));
        }
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| anyhow::anyhow!("invalid path template `{path}`: {e}"))
}

/// Drop path item keys oas3 would refuse. Documents in the wild carry
/// tooling-specific keys next to the verbs.
fn strip_unknown_verbs(val: &mut Value) {
    const METHODS: [&str; 8] = [
        "get", "post", "put", "delete", "patch", "options", "head", "trace",
    ];

    if let Some(paths) = val.get_mut("paths") {
        if let Value::Object(paths_map) = paths {
            for item in paths_map.values_mut() {
                if let Value::Object(obj) = item {
                    let keys: Vec<String> = obj.keys().cloned().collect();
                    for k in keys {
                        let lk = k.to_ascii_lowercase();
                        let keep = match lk.as_str() {
                            "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                            m if METHODS.contains(&m) => true,
                            _ => k.starts_with("x-"),
                        };
                        if !keep {
                            obj.remove(&k);
                        }
                    }
                }
            }
        }
    }
}
