//! The plugin's own HTTP surface: schema document and documentation UI.
//!
//! These routes are registered during install and exempted from validation
//! by the scope check, so the contract never has to declare them.

use super::defaults::error_response;
use super::OpenApiPlugin;
use crate::handler::{HandlerResponse, HandlerResult, HandlerReturn, Payload, RequestContext};
use crate::server::App;
use crate::static_files::StaticFiles;
use http::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

impl OpenApiPlugin {
    /// Register the schema and UI routes on the app.
    ///
    /// Runs before any route is wrapped, so these routes go through the
    /// same scope check as everything else and come out exempt.
    pub(crate) fn register_routes(self: &Arc<Self>, app: &mut App) {
        if self.config.serve_schema {
            let rule = self.schema_rule();
            let name = self.config.schema_route_name.clone();
            let plugin = Arc::clone(self);
            app.route_named(Method::GET, &rule, &name, move |ctx: &mut RequestContext| {
                plugin.serve_schema_document(ctx)
            });
        }
        if self.config.serve_ui {
            let ui_base = self.ui_base_rule();
            let index_name = self.config.ui_route_name.clone();
            let plugin = Arc::clone(self);
            app.route_named(
                Method::GET,
                &ui_base,
                &index_name,
                move |ctx: &mut RequestContext| plugin.serve_ui_index(ctx),
            );

            let prefix = if ui_base.ends_with('/') {
                ui_base
            } else {
                format!("{ui_base}/")
            };
            let assets_rule = format!("{prefix}<asset:path>");
            let assets_name = format!("{}_assets", self.config.ui_route_name);
            let plugin = Arc::clone(self);
            app.route_named(
                Method::GET,
                &assets_rule,
                &assets_name,
                move |ctx: &mut RequestContext| plugin.serve_ui_asset(ctx),
            );
        }
    }

    /// Serve the retained document, with `basePath` recomputed from the
    /// current mount point when adjustment is on.
    fn serve_schema_document(&self, ctx: &RequestContext) -> HandlerResult {
        let mut document = self.contract.document().clone();
        if self.config.adjust_base_path {
            if let Some(base) = document.get_mut("basePath") {
                *base = Value::String(mounted(&ctx.script_root, self.contract.base_path()));
            }
        }
        Ok(HandlerReturn::Structured(document))
    }

    fn serve_ui_index(&self, ctx: &RequestContext) -> HandlerResult {
        let spec_url = self.resolve_spec_url(ctx);
        if spec_url.is_empty() {
            warn!("documentation UI is serving without a schema URL");
        }
        // validator_url lands in a script as a JSON value, `null` when unset
        let validator_url = match &self.config.ui_validator_url {
            Some(source) => Value::String(source.resolve(ctx)).to_string(),
            None => "null".to_string(),
        };
        let context = serde_json::json!({
            "spec_url": spec_url,
            "validator_url": validator_url,
        });
        let assets = StaticFiles::new(&self.config.ui_assets_dir);
        let (bytes, content_type) = assets
            .load("index.html", Some(&context))
            .map_err(|e| anyhow::anyhow!("documentation page failed to render: {e}"))?;
        Ok(HandlerReturn::Response(
            HandlerResponse::new(200, Payload::Bytes(bytes))
                .with_header("content-type", content_type),
        ))
    }

    fn serve_ui_asset(&self, ctx: &RequestContext) -> HandlerResult {
        let Some(asset) = ctx.url_args.get("asset") else {
            return Ok(HandlerReturn::Response(error_response(404, "Not Found")));
        };
        let assets = StaticFiles::new(&self.config.ui_assets_dir);
        match assets.load(asset, None) {
            Ok((bytes, content_type)) => Ok(HandlerReturn::Response(
                HandlerResponse::new(200, Payload::Bytes(bytes))
                    .with_header("content-type", content_type),
            )),
            Err(e) => {
                debug!(asset = %asset, error = %e, "documentation asset not served");
                Ok(HandlerReturn::Response(error_response(404, "Not Found")))
            }
        }
    }

    /// Schema URL the UI page points at: configured source first, else the
    /// schema endpoint under the current mount, else empty.
    fn resolve_spec_url(&self, ctx: &RequestContext) -> String {
        match &self.config.ui_schema_url {
            Some(source) => source.resolve(ctx),
            None if self.config.serve_schema => mounted(&ctx.script_root, &self.schema_rule()),
            None => String::new(),
        }
    }
}

/// Join the deployment mount prefix with an app-absolute path.
fn mounted(script_root: &str, path: &str) -> String {
    if script_root.is_empty() {
        return path.to_string();
    }
    let joined = format!("{}{}", script_root.trim_end_matches('/'), path);
    if joined.len() > 1 && joined.ends_with('/') {
        joined.trim_end_matches('/').to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn ctx(script_root: &str) -> RequestContext {
        RequestContext {
            method: Method::GET,
            path: "/openapi.json".to_string(),
            rule: "/openapi.json".to_string(),
            route_name: None,
            url_args: HashMap::new(),
            query: HashMap::new(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            body: Vec::new(),
            script_root: script_root.to_string(),
            openapi: None,
        }
    }

    fn document() -> Value {
        json!({
            "openapi": "3.0.0",
            "info": { "title": "Docs API", "version": "1.0.0" },
            "paths": {
                "/pets": {
                    "get": { "responses": { "200": { "description": "ok" } } }
                }
            }
        })
    }

    #[test]
    fn test_mounted_prefix_join() {
        assert_eq!(mounted("", "/v1"), "/v1");
        assert_eq!(mounted("/api", "/v1"), "/api/v1");
        assert_eq!(mounted("/api/", "/"), "/api");
        assert_eq!(mounted("", "/"), "/");
    }

    #[test]
    fn test_schema_document_served_verbatim_without_base_path_field() {
        let plugin = Arc::new(
            OpenApiPlugin::builder(document())
                .build()
                .expect("plugin builds"),
        );
        let result = plugin.serve_schema_document(&ctx("/api"));
        match result {
            Ok(HandlerReturn::Structured(doc)) => {
                assert_eq!(&doc, plugin.contract().document());
            }
            other => panic!("expected the document, got {other:?}"),
        }
    }

    #[test]
    fn test_base_path_rewrite_follows_mount() {
        // the override writes `basePath` into the retained document
        let plugin = Arc::new(
            OpenApiPlugin::builder(document())
                .base_path("/v1")
                .build()
                .expect("plugin builds"),
        );
        let result = plugin.serve_schema_document(&ctx("/api"));
        match result {
            Ok(HandlerReturn::Structured(doc)) => {
                assert_eq!(doc["basePath"], "/api/v1");
            }
            other => panic!("expected the document, got {other:?}"),
        }
        // the handle itself is never mutated
        assert_eq!(plugin.contract().document()["basePath"], "/v1");
    }

    #[test]
    fn test_spec_url_resolution_order() {
        let configured = Arc::new(
            OpenApiPlugin::builder(document())
                .ui_schema_url("https://example.com/spec.json")
                .build()
                .expect("plugin builds"),
        );
        assert_eq!(
            configured.resolve_spec_url(&ctx("")),
            "https://example.com/spec.json"
        );

        let derived = Arc::new(
            OpenApiPlugin::builder(document())
                .build()
                .expect("plugin builds"),
        );
        assert_eq!(derived.resolve_spec_url(&ctx("/api")), "/api/openapi.json");

        let degenerate = Arc::new(
            OpenApiPlugin::builder(document())
                .serve_schema(false)
                .build()
                .expect("plugin builds"),
        );
        assert_eq!(degenerate.resolve_spec_url(&ctx("")), "");
    }

    #[test]
    fn test_callable_spec_url_sees_the_request() {
        let plugin = Arc::new(
            OpenApiPlugin::builder(document())
                .ui_schema_url_fn(|ctx| format!("{}/custom.json", ctx.script_root))
                .build()
                .expect("plugin builds"),
        );
        assert_eq!(plugin.resolve_spec_url(&ctx("/api")), "/api/custom.json");
    }
}
