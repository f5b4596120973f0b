//! HTTP tests for the plugin's own endpoints: the served schema document
//! and the Swagger UI console.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::http::{parse_response_parts, send_request};
use common::test_server::setup_may_runtime;
use http::Method;
use serde_json::{json, Value};
use specguard::handler::{HandlerReturn, RequestContext};
use specguard::plugin::OpenApiPlugin;
use specguard::server::{App, HttpServer, ServerHandle};
use std::fs;
use std::net::{SocketAddr, TcpListener};

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><title>API Docs</title></head>
<body>
<div id="swagger-ui"></div>
<script src="swagger-ui-bundle.js"></script>
<script>
window.ui = SwaggerUIBundle({
    url: "{{ spec_url }}",
    dom_id: "#swagger-ui",
    validatorUrl: {{ validator_url }},
});
</script>
</body>
</html>
"#;

fn contract_document() -> Value {
    json!({
        "openapi": "3.0.0",
        "info": { "title": "Docs API", "version": "1.0.0" },
        "servers": [{ "url": "/v1" }],
        "paths": {
            "/pets": {
                "get": { "responses": { "200": { "description": "ok" } } }
            }
        }
    })
}

struct DocsTestServer {
    // owns the on-disk UI bundle for the server's lifetime
    _assets: tempfile::TempDir,
    handle: Option<ServerHandle>,
    addr: SocketAddr,
}

#[derive(Default)]
struct Options<'a> {
    mount: Option<&'a str>,
    base_path_override: Option<&'a str>,
    validator_url: Option<&'a str>,
}

impl DocsTestServer {
    fn new() -> Self {
        Self::start(Options::default())
    }

    /// App mounted under `/svc`, contract base path forced to `/v1` so the
    /// retained document carries a `basePath` field to rewrite.
    fn mounted() -> Self {
        Self::start(Options {
            mount: Some("/svc"),
            base_path_override: Some("/v1"),
            validator_url: None,
        })
    }

    fn with_validator_badge(url: &str) -> Self {
        Self::start(Options {
            validator_url: Some(url),
            ..Options::default()
        })
    }

    fn start(options: Options<'_>) -> Self {
        setup_may_runtime();

        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("assets");
        fs::create_dir(&assets).unwrap();
        fs::write(assets.join("index.html"), INDEX_TEMPLATE).unwrap();
        fs::write(assets.join("app.css"), "body { margin: 0 }").unwrap();
        // bait one level above the served directory
        fs::write(dir.path().join("secret.txt"), "top secret").unwrap();

        let mut builder = OpenApiPlugin::builder(contract_document())
            .serve_ui(true)
            .ui_assets_dir(&assets);
        if let Some(base) = options.base_path_override {
            builder = builder.base_path(base);
        }
        if let Some(url) = options.validator_url {
            builder = builder.ui_validator_url(url);
        }
        let plugin = builder.build().unwrap();

        let mut app = App::new();
        if let Some(mount) = options.mount {
            app.mount(mount);
        }
        app.route(Method::GET, "/v1/pets", |_ctx: &mut RequestContext| {
            Ok(HandlerReturn::Structured(json!([])))
        });
        app.install(plugin);

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let handle = HttpServer(app.into_service()).start(addr).unwrap();
        handle.wait_ready().unwrap();

        Self {
            _assets: dir,
            handle: Some(handle),
            addr,
        }
    }

    fn get(&self, path: &str) -> String {
        send_request(
            &self.addr,
            &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"),
        )
    }
}

impl Drop for DocsTestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

#[test]
fn test_schema_endpoint_serves_the_document() {
    let server = DocsTestServer::new();
    // the contract never declares /openapi.json; serving it anyway proves
    // the endpoint is exempt from validation
    let resp = server.get("/v1/openapi.json");
    let (status, ct, body) = parse_response_parts(&resp);
    assert_eq!(status, 200);
    assert_eq!(ct, "application/json");
    let doc: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(doc["openapi"], "3.0.0");
    assert_eq!(doc["info"]["title"], "Docs API");
    assert!(doc.get("basePath").is_none());
}

#[test]
fn test_schema_endpoint_is_byte_identical_across_requests() {
    let server = DocsTestServer::new();
    let first = parse_response_parts(&server.get("/v1/openapi.json")).2;
    let second = parse_response_parts(&server.get("/v1/openapi.json")).2;
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_schema_base_path_rewritten_under_mount() {
    let server = DocsTestServer::mounted();
    let resp = server.get("/v1/openapi.json");
    let (status, _, body) = parse_response_parts(&resp);
    assert_eq!(status, 200);
    let doc: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(doc["basePath"], "/svc/v1");
}

#[test]
fn test_ui_index_renders_with_spec_url() {
    let server = DocsTestServer::new();
    let resp = server.get("/v1/ui/");
    let (status, ct, body) = parse_response_parts(&resp);
    assert_eq!(status, 200);
    assert_eq!(ct, "text/html");
    assert!(body.contains("SwaggerUIBundle"));
    assert!(body.contains(r#"url: "/v1/openapi.json""#));
    assert!(body.contains("validatorUrl: null"));
}

#[test]
fn test_ui_index_under_mount_points_at_mounted_schema() {
    let server = DocsTestServer::mounted();
    let resp = server.get("/v1/ui/");
    let (status, _, body) = parse_response_parts(&resp);
    assert_eq!(status, 200);
    assert!(body.contains(r#"url: "/svc/v1/openapi.json""#));
}

#[test]
fn test_validator_badge_url_is_json_encoded() {
    let server = DocsTestServer::with_validator_badge("https://validator.example.com");
    let resp = server.get("/v1/ui/");
    let (_, _, body) = parse_response_parts(&resp);
    assert!(body.contains(r#"validatorUrl: "https://validator.example.com""#));
}

#[test]
fn test_ui_asset_served_with_content_type() {
    let server = DocsTestServer::new();
    let resp = server.get("/v1/ui/app.css");
    let (status, ct, body) = parse_response_parts(&resp);
    assert_eq!(status, 200);
    assert_eq!(ct, "text/css");
    assert_eq!(body, "body { margin: 0 }");
}

#[test]
fn test_missing_asset_is_404() {
    let server = DocsTestServer::new();
    let resp = server.get("/v1/ui/missing.js");
    let (status, _, body) = parse_response_parts(&resp);
    assert_eq!(status, 404);
    let payload: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["message"], "Not Found");
}

#[test]
fn test_asset_traversal_is_refused() {
    let server = DocsTestServer::new();
    let resp = server.get("/v1/ui/../secret.txt");
    let (status, _, body) = parse_response_parts(&resp);
    assert_eq!(status, 404);
    assert!(!body.contains("top secret"));
}
