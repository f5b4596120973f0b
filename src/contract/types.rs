use super::SecurityRequirement;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Schema validator compiled once at contract load time.
pub type CompiledSchema = Arc<jsonschema::Validator>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl From<oas3::spec::ParameterStyle> for ParameterStyle {
    fn from(style: oas3::spec::ParameterStyle) -> Self {
        use oas3::spec::ParameterStyle as PS;
        match style {
            PS::Matrix => ParameterStyle::Matrix,
            PS::Label => ParameterStyle::Label,
            PS::Form => ParameterStyle::Form,
            PS::Simple => ParameterStyle::Simple,
            PS::SpaceDelimited => ParameterStyle::SpaceDelimited,
            PS::PipeDelimited => ParameterStyle::PipeDelimited,
            PS::DeepObject => ParameterStyle::DeepObject,
        }
    }
}

impl From<oas3::spec::ParameterIn> for ParameterLocation {
    fn from(loc: oas3::spec::ParameterIn) -> Self {
        match loc {
            oas3::spec::ParameterIn::Path => ParameterLocation::Path,
            oas3::spec::ParameterIn::Query => ParameterLocation::Query,
            oas3::spec::ParameterIn::Header => ParameterLocation::Header,
            oas3::spec::ParameterIn::Cookie => ParameterLocation::Cookie,
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
        }
    }
}

/// A declared parameter, resolved and with its schema compiled.
#[derive(Debug, Clone)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Option<Value>,
    pub compiled: Option<CompiledSchema>,
    pub style: Option<ParameterStyle>,
    pub explode: Option<bool>,
}

/// Schema and example for one media type of a request or response body.
#[derive(Debug, Clone)]
pub struct MediaTypeMeta {
    pub schema: Option<Value>,
    pub compiled: Option<CompiledSchema>,
    pub example: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct RequestBodyMeta {
    pub required: bool,
    pub content: HashMap<String, MediaTypeMeta>,
}

#[derive(Debug, Clone, Default)]
pub struct ResponseMeta {
    pub content: HashMap<String, MediaTypeMeta>,
}

/// One declared operation (path + method) with everything the validators
/// need at request time. Built once at load, shared via `Arc`.
#[derive(Debug, Clone)]
pub struct OperationMeta {
    pub method: Method,
    /// Path as declared in the document, e.g. `/pets/{petId}`.
    pub path_pattern: String,
    /// Base path joined with `path_pattern`; what request templates match against.
    pub full_pattern: String,
    pub operation_id: Option<String>,
    pub parameters: Vec<ParameterMeta>,
    pub request_body: Option<RequestBodyMeta>,
    pub responses: HashMap<u16, ResponseMeta>,
    /// The `default` response entry, used when no status matches.
    pub default_response: Option<ResponseMeta>,
    pub security: Vec<SecurityRequirement>,
}

impl OperationMeta {
    /// Look up the declared response for a status code, falling back to `default`.
    #[must_use]
    pub fn response_for(&self, status: u16) -> Option<&ResponseMeta> {
        self.responses
            .get(&status)
            .or(self.default_response.as_ref())
    }

    /// First example declared for a 2xx `application/json` response, if any.
    /// Used by stub handlers in the demo binary.
    #[must_use]
    pub fn success_example(&self) -> Option<&Value> {
        let mut statuses: Vec<u16> = self.responses.keys().copied().collect();
        statuses.sort_unstable();
        statuses
            .iter()
            .filter(|s| (200..300).contains(*s))
            .find_map(|s| {
                self.responses
                    .get(s)
                    .and_then(|r| r.content.get("application/json"))
                    .and_then(|m| m.example.as_ref())
            })
    }

    /// Status of the lowest declared 2xx response, defaulting to 200.
    #[must_use]
    pub fn success_status(&self) -> u16 {
        let mut statuses: Vec<u16> = self
            .responses
            .keys()
            .copied()
            .filter(|s| (200..300).contains(s))
            .collect();
        statuses.sort_unstable();
        statuses.first().copied().unwrap_or(200)
    }
}
