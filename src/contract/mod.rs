//! Contract loading: document lint, base path resolution, operation table
//! extraction and schema compilation.

mod build;
pub mod lint;
mod load;
mod types;

pub use build::{
    build_operations, default_base_path, expand_schema_refs, extract_parameters,
    extract_request_body, extract_responses, extract_security_schemes, resolve_schema_ref,
};
pub use lint::{lint_document, LintIssue, LintSeverity};
pub use load::{read_document, Contract, OperationLookup};
pub use types::{
    CompiledSchema, MediaTypeMeta, OperationMeta, ParameterLocation, ParameterMeta,
    ParameterStyle, RequestBodyMeta, ResponseMeta,
};

pub use oas3::spec::{SecurityRequirement, SecurityScheme};
