use crate::translate::AbstractRequest;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-request context handed to handlers.
///
/// Built fresh by the server for every request; nothing in it outlives the
/// request. `openapi` is populated by the validation pipeline before the
/// handler runs, and only for routes the contract covers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Concrete request path, query string stripped.
    pub path: String,
    /// The matched route rule, framework syntax (`/pets/<id:int>`).
    pub rule: String,
    /// Route name, when the route was registered with one.
    pub route_name: Option<String>,
    /// Values captured by the rule's placeholders.
    pub url_args: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    /// Raw body bytes, read from the socket exactly once.
    pub body: Vec<u8>,
    /// Deployment mount prefix, empty for an unmounted app.
    pub script_root: String,
    /// The translated request, attached while a covered handler runs.
    pub openapi: Option<Arc<AbstractRequest>>,
}

impl RequestContext {
    /// Parse the body as JSON. Parsed on demand; the context keeps bytes.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// Header lookup by lowercased name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Response body payload, either still structured or already serialized.
///
/// The distinction drives auto-serialization: structured payloads may be
/// encoded by the pipeline, byte payloads are never touched.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Structured(Value),
    Bytes(Vec<u8>),
}

/// A full response a handler (or failure handler) produced.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: u16,
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
    pub body: Payload,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, body: Payload) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// 200 response around a structured value.
    #[must_use]
    pub fn json(value: Value) -> Self {
        Self::new(200, Payload::Structured(value))
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

/// What a handler hands back on success.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerReturn {
    /// A structured value; the pipeline may serialize it to JSON.
    Structured(Value),
    /// A full response with status and headers under handler control.
    Response(HandlerResponse),
    /// Literal bytes, returned as the body untouched.
    Passthrough(Vec<u8>),
}

/// Failure side of a handler invocation.
#[derive(Debug)]
pub enum HandlerError {
    /// A framework-level early response. Passes through the pipeline
    /// untouched: never validated, never rewritten.
    ShortCircuit(HandlerResponse),
    /// Anything else; routed to the exception handler.
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::Internal(err)
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerError::ShortCircuit(resp) => write!(f, "short circuit ({})", resp.status),
            HandlerError::Internal(err) => write!(f, "{err}"),
        }
    }
}

pub type HandlerResult = Result<HandlerReturn, HandlerError>;

/// A route handler. Implemented for plain closures.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut RequestContext) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut RequestContext) -> HandlerResult + Send + Sync,
{
    fn handle(&self, ctx: &mut RequestContext) -> HandlerResult {
        self(ctx)
    }
}
