use crate::handler::{HandlerResponse, Payload};
use may_minihttp::Response;
use serde_json::Value;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        415 => "Unsupported Media Type",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Write a handler response to the wire.
///
/// The content type comes from the response when set, otherwise it follows
/// the payload: structured values go out as JSON, strings and raw bytes as
/// plain text.
pub fn write_response(res: &mut Response, handler_resp: &HandlerResponse) {
    res.status_code(handler_resp.status as usize, status_reason(handler_resp.status));

    let content_type = handler_resp
        .content_type()
        .map(str::to_string)
        .unwrap_or_else(|| match &handler_resp.body {
            Payload::Structured(Value::String(_)) => "text/plain".to_string(),
            Payload::Structured(_) => "application/json".to_string(),
            Payload::Bytes(_) => "text/plain".to_string(),
        });
    write_content_type(res, &content_type);

    for (name, value) in &handler_resp.headers {
        if name == "content-type" {
            continue;
        }
        let header = format!("{name}: {value}").into_boxed_str();
        res.header(Box::leak(header));
    }

    let bytes = match &handler_resp.body {
        Payload::Structured(Value::String(s)) => s.clone().into_bytes(),
        Payload::Structured(other) => serde_json::to_vec(other).unwrap_or_default(),
        Payload::Bytes(bytes) => bytes.clone(),
    };
    res.body_vec(bytes);
}

/// Write a framework-level JSON error, bypassing any handler machinery.
pub fn write_json_error(res: &mut Response, status: u16, body: Value) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(body.to_string().into_bytes());
}

// The common types avoid leaking a header allocation per request.
fn write_content_type(res: &mut Response, content_type: &str) {
    match content_type {
        "application/json" => res.header("Content-Type: application/json"),
        "text/plain" => res.header("Content-Type: text/plain"),
        "text/html" => res.header("Content-Type: text/html"),
        other => {
            let header = format!("Content-Type: {other}").into_boxed_str();
            res.header(Box::leak(header))
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(405), "Method Not Allowed");
        assert_eq!(status_reason(415), "Unsupported Media Type");
        assert_eq!(status_reason(999), "OK");
    }
}
