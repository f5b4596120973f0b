//! Conversions between the hosting framework's request/response shapes and
//! the flat forms the validators consume.

use crate::handler::{HandlerResponse, Payload, RequestContext};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// `/<name>` or `/<name:filter>` placeholders in a route rule.
static RULE_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/<(.+?)(:.+?)?>").expect("rule placeholder regex compiles"));

/// Framework-independent view of a request, matched against the contract.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractRequest {
    /// Route template in brace form (`/pets/{id}`), type filters stripped.
    pub full_path_pattern: String,
    /// Lowercased HTTP method.
    pub method: String,
    pub parameters: RequestParameters,
    /// Raw body bytes.
    pub body: Vec<u8>,
    /// Content type up to the first `;`, empty when the header is absent.
    pub mimetype: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParameters {
    pub path: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub header: HashMap<String, String>,
    pub cookie: HashMap<String, String>,
}

/// Framework-independent view of a response about to leave the app.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractResponse {
    /// Serialized body bytes.
    pub data: Vec<u8>,
    pub status_code: u16,
    pub mimetype: String,
}

/// Rewrite a framework route rule into a brace template.
///
/// The only place rule syntax is interpreted; everything downstream sees
/// brace templates.
#[must_use]
pub fn normalize_rule(rule: &str) -> String {
    RULE_PARAM_RE.replace_all(rule, "/{${1}}").into_owned()
}

/// Content type with parameters stripped (`application/json; charset=utf-8`
/// becomes `application/json`). Absent content type maps to empty string.
#[must_use]
pub fn mimetype_of(content_type: Option<&str>) -> String {
    content_type
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .to_string()
}

/// Build the abstract request for a matched route.
///
/// The body is whatever the server read from the socket; reading happened
/// exactly once, before this call.
#[must_use]
pub fn to_abstract_request(ctx: &RequestContext) -> AbstractRequest {
    AbstractRequest {
        full_path_pattern: normalize_rule(&ctx.rule),
        method: ctx.method.as_str().to_ascii_lowercase(),
        parameters: RequestParameters {
            path: ctx.url_args.clone(),
            query: ctx.query.clone(),
            header: ctx.headers.clone(),
            cookie: ctx.cookies.clone(),
        },
        body: ctx.body.clone(),
        mimetype: mimetype_of(ctx.headers.get("content-type").map(String::as_str)),
    }
}

/// Flatten a produced response for validation.
#[must_use]
pub fn to_abstract_response(resp: &HandlerResponse) -> AbstractResponse {
    let data = match &resp.body {
        Payload::Structured(value) => serde_json::to_vec(value).unwrap_or_default(),
        Payload::Bytes(bytes) => bytes.clone(),
    };
    AbstractResponse {
        data,
        status_code: resp.status,
        mimetype: mimetype_of(resp.content_type()),
    }
}
