//! # Plugin Module
//!
//! The contract enforcement plugin an [`App`](crate::server::App) installs.
//!
//! One plugin instance wraps every route whose rule falls under the
//! contract's base path. Wrapped routes get the full interception pipeline:
//! request validation, handler invocation, auto-serialization, response
//! validation, with failures routed to pluggable handlers. Routes outside the
//! base path, the schema endpoint and the documentation UI stay unwrapped.
//!
//! ## Example
//!
//! ```rust,ignore
//! use specguard::plugin::OpenApiPluginBuilder;
//!
//! let plugin = OpenApiPluginBuilder::from_file("doc/petstore.yaml")?
//!     .serve_ui(true)
//!     .build()?;
//! app.install(plugin);
//! ```

mod defaults;
mod endpoints;
mod pipeline;

pub use defaults::{
    default_exception_handler, default_request_error_handler, default_response_error_handler,
};

use crate::contract::{read_document, Contract};
use crate::handler::{Handler, HandlerResponse, RequestContext};
use crate::security::SecurityProvider;
use crate::validation::{
    RequestValidation, RequestValidator, ResponseValidation, ResponseValidator,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Handles a request the contract rejected. Its response goes straight to
/// the client; the route handler never runs.
pub type RequestErrorHandler =
    Arc<dyn Fn(&RequestContext, &RequestValidation) -> HandlerResponse + Send + Sync>;

/// Handles a response that violates the contract. Receives the offending
/// response; its own response replaces it.
pub type ResponseErrorHandler =
    Arc<dyn Fn(&RequestContext, &HandlerResponse, &ResponseValidation) -> HandlerResponse + Send + Sync>;

/// Handles a handler failure (error return or panic).
pub type ExceptionHandler =
    Arc<dyn Fn(&RequestContext, &anyhow::Error) -> HandlerResponse + Send + Sync>;

/// Where a documentation UI URL comes from: fixed at build time or computed
/// per request.
#[derive(Clone)]
pub enum UrlSource {
    Static(String),
    Callable(Arc<dyn Fn(&RequestContext) -> String + Send + Sync>),
}

impl UrlSource {
    pub(crate) fn resolve(&self, ctx: &RequestContext) -> String {
        match self {
            UrlSource::Static(url) => url.clone(),
            UrlSource::Callable(f) => f(ctx),
        }
    }
}

impl std::fmt::Debug for UrlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlSource::Static(url) => f.debug_tuple("Static").field(url).finish(),
            UrlSource::Callable(_) => f.debug_tuple("Callable").finish(),
        }
    }
}

/// Options fixed at build time. Read-only afterwards.
#[derive(Debug)]
pub(crate) struct PluginConfig {
    pub validate_requests: bool,
    pub validate_responses: bool,
    pub auto_serialize: bool,
    pub serve_schema: bool,
    pub schema_suburl: String,
    pub schema_route_name: String,
    pub serve_ui: bool,
    pub ui_suburl: String,
    pub ui_route_name: String,
    pub ui_schema_url: Option<UrlSource>,
    pub ui_validator_url: Option<UrlSource>,
    pub adjust_base_path: bool,
    pub ui_assets_dir: PathBuf,
}

/// The installed plugin. Immutable; shared across requests via `Arc`.
pub struct OpenApiPlugin {
    contract: Arc<Contract>,
    config: PluginConfig,
    request_validator: RequestValidator,
    response_validator: ResponseValidator,
    request_error_handler: RequestErrorHandler,
    response_error_handler: ResponseErrorHandler,
    exception_handler: ExceptionHandler,
}

impl OpenApiPlugin {
    /// Start a builder from an in-memory document.
    #[must_use]
    pub fn builder(document: Value) -> OpenApiPluginBuilder {
        OpenApiPluginBuilder::new(document)
    }

    #[must_use]
    pub fn contract(&self) -> &Arc<Contract> {
        &self.contract
    }

    /// Route rule of the schema endpoint.
    #[must_use]
    pub fn schema_rule(&self) -> String {
        join_url(self.contract.base_path(), &self.config.schema_suburl)
    }

    /// Route rule prefix of the documentation UI.
    #[must_use]
    pub fn ui_base_rule(&self) -> String {
        join_url(self.contract.base_path(), &self.config.ui_suburl)
    }

    /// Wrap a route handler with the interception pipeline.
    ///
    /// The scope decision happens here, once per route: rules outside the
    /// base path and the plugin's own endpoints come back unwrapped.
    #[must_use]
    pub fn apply(self: &Arc<Self>, rule: &str, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        if !self.in_scope(rule) {
            return inner;
        }
        let plugin = Arc::clone(self);
        Arc::new(move |ctx: &mut RequestContext| plugin.intercept(ctx, inner.as_ref()))
    }

    fn in_scope(&self, rule: &str) -> bool {
        if !rule.starts_with(self.contract.base_path()) {
            return false;
        }
        if self.config.serve_schema && rule == self.schema_rule() {
            return false;
        }
        if self.config.serve_ui && rule.starts_with(&self.ui_base_rule()) {
            return false;
        }
        true
    }
}

/// Join a base path and a sub-URL with exactly one separating slash.
pub(crate) fn join_url(base: &str, sub: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), sub.trim_start_matches('/'))
}

/// Builder for [`OpenApiPlugin`] with a fluent API.
///
/// Defaults: lint on, request and response validation on, auto-serialization
/// on, schema served at `<base>/openapi.json`, UI off.
pub struct OpenApiPluginBuilder {
    document: Value,
    base_path: Option<String>,
    lint: bool,
    validate_requests: bool,
    validate_responses: bool,
    auto_serialize: bool,
    serve_schema: bool,
    schema_suburl: String,
    schema_route_name: String,
    serve_ui: bool,
    ui_suburl: String,
    ui_route_name: String,
    ui_schema_url: Option<UrlSource>,
    ui_validator_url: Option<UrlSource>,
    adjust_base_path: bool,
    ui_assets_dir: PathBuf,
    request_error_handler: RequestErrorHandler,
    response_error_handler: ResponseErrorHandler,
    exception_handler: ExceptionHandler,
    security_providers: HashMap<String, Arc<dyn SecurityProvider>>,
}

impl OpenApiPluginBuilder {
    #[must_use]
    pub fn new(document: Value) -> Self {
        Self {
            document,
            base_path: None,
            lint: true,
            validate_requests: true,
            validate_responses: true,
            auto_serialize: true,
            serve_schema: true,
            schema_suburl: "/openapi.json".to_string(),
            schema_route_name: "openapi_schema".to_string(),
            serve_ui: false,
            ui_suburl: "/ui/".to_string(),
            ui_route_name: "openapi_ui".to_string(),
            ui_schema_url: None,
            ui_validator_url: None,
            adjust_base_path: true,
            ui_assets_dir: PathBuf::from("doc/swagger-ui"),
            request_error_handler: Arc::new(default_request_error_handler),
            response_error_handler: Arc::new(default_response_error_handler),
            exception_handler: Arc::new(default_exception_handler),
            security_providers: HashMap::new(),
        }
    }

    /// Start a builder from a YAML or JSON document file.
    ///
    /// # Errors
    ///
    /// Fails on IO errors and unparseable content; lint runs later, in
    /// [`build`](Self::build).
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        Ok(Self::new(read_document(path)?))
    }

    /// Force the contract base path, superseding what the document declares.
    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Lint the document before loading it. On by default; a document with
    /// error-severity findings fails `build`.
    #[must_use]
    pub fn lint(mut self, enabled: bool) -> Self {
        self.lint = enabled;
        self
    }

    #[must_use]
    pub fn validate_requests(mut self, enabled: bool) -> Self {
        self.validate_requests = enabled;
        self
    }

    #[must_use]
    pub fn validate_responses(mut self, enabled: bool) -> Self {
        self.validate_responses = enabled;
        self
    }

    /// Serialize structured handler results to JSON bodies. On by default.
    #[must_use]
    pub fn auto_serialize(mut self, enabled: bool) -> Self {
        self.auto_serialize = enabled;
        self
    }

    #[must_use]
    pub fn serve_schema(mut self, enabled: bool) -> Self {
        self.serve_schema = enabled;
        self
    }

    #[must_use]
    pub fn schema_suburl(mut self, suburl: impl Into<String>) -> Self {
        self.schema_suburl = suburl.into();
        self
    }

    #[must_use]
    pub fn schema_route_name(mut self, name: impl Into<String>) -> Self {
        self.schema_route_name = name.into();
        self
    }

    /// Serve the documentation UI. Off by default.
    #[must_use]
    pub fn serve_ui(mut self, enabled: bool) -> Self {
        self.serve_ui = enabled;
        self
    }

    #[must_use]
    pub fn ui_suburl(mut self, suburl: impl Into<String>) -> Self {
        self.ui_suburl = suburl.into();
        self
    }

    #[must_use]
    pub fn ui_route_name(mut self, name: impl Into<String>) -> Self {
        self.ui_route_name = name.into();
        self
    }

    /// Fixed schema URL for the UI page. Without one the UI points at the
    /// schema endpoint.
    #[must_use]
    pub fn ui_schema_url(mut self, url: impl Into<String>) -> Self {
        self.ui_schema_url = Some(UrlSource::Static(url.into()));
        self
    }

    /// Per-request schema URL for the UI page.
    #[must_use]
    pub fn ui_schema_url_fn(
        mut self,
        f: impl Fn(&RequestContext) -> String + Send + Sync + 'static,
    ) -> Self {
        self.ui_schema_url = Some(UrlSource::Callable(Arc::new(f)));
        self
    }

    /// External validator badge URL for the UI page. Unset renders `null`.
    #[must_use]
    pub fn ui_validator_url(mut self, url: impl Into<String>) -> Self {
        self.ui_validator_url = Some(UrlSource::Static(url.into()));
        self
    }

    #[must_use]
    pub fn ui_validator_url_fn(
        mut self,
        f: impl Fn(&RequestContext) -> String + Send + Sync + 'static,
    ) -> Self {
        self.ui_validator_url = Some(UrlSource::Callable(Arc::new(f)));
        self
    }

    /// Rewrite the served document's `basePath` per request from the
    /// deployment mount point. On by default; only applies when the document
    /// carries a `basePath` field.
    #[must_use]
    pub fn adjust_base_path(mut self, enabled: bool) -> Self {
        self.adjust_base_path = enabled;
        self
    }

    /// Directory the UI assets are served from.
    #[must_use]
    pub fn ui_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ui_assets_dir = dir.into();
        self
    }

    #[must_use]
    pub fn request_error_handler(
        mut self,
        f: impl Fn(&RequestContext, &RequestValidation) -> HandlerResponse + Send + Sync + 'static,
    ) -> Self {
        self.request_error_handler = Arc::new(f);
        self
    }

    #[must_use]
    pub fn response_error_handler(
        mut self,
        f: impl Fn(&RequestContext, &HandlerResponse, &ResponseValidation) -> HandlerResponse
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.response_error_handler = Arc::new(f);
        self
    }

    #[must_use]
    pub fn exception_handler(
        mut self,
        f: impl Fn(&RequestContext, &anyhow::Error) -> HandlerResponse + Send + Sync + 'static,
    ) -> Self {
        self.exception_handler = Arc::new(f);
        self
    }

    /// Register a security provider for a scheme name. Schemes without one
    /// fall back to a credential presence check.
    #[must_use]
    pub fn security_provider(
        mut self,
        scheme_name: impl Into<String>,
        provider: Arc<dyn SecurityProvider>,
    ) -> Self {
        self.security_providers.insert(scheme_name.into(), provider);
        self
    }

    /// Load the contract and assemble the plugin.
    ///
    /// # Errors
    ///
    /// Fails on everything [`Contract::from_document`] fails on: lint
    /// findings, unparseable documents, uncompilable schemas.
    pub fn build(self) -> anyhow::Result<OpenApiPlugin> {
        let contract = Arc::new(Contract::from_document(
            self.document,
            self.base_path.as_deref(),
            self.lint,
        )?);
        let request_validator =
            RequestValidator::with_providers(Arc::clone(&contract), self.security_providers);
        let response_validator = ResponseValidator::new(Arc::clone(&contract));
        Ok(OpenApiPlugin {
            contract,
            config: PluginConfig {
                validate_requests: self.validate_requests,
                validate_responses: self.validate_responses,
                auto_serialize: self.auto_serialize,
                serve_schema: self.serve_schema,
                schema_suburl: self.schema_suburl,
                schema_route_name: self.schema_route_name,
                serve_ui: self.serve_ui,
                ui_suburl: self.ui_suburl,
                ui_route_name: self.ui_route_name,
                ui_schema_url: self.ui_schema_url,
                ui_validator_url: self.ui_validator_url,
                adjust_base_path: self.adjust_base_path,
                ui_assets_dir: self.ui_assets_dir,
            },
            request_validator,
            response_validator,
            request_error_handler: self.request_error_handler,
            response_error_handler: self.response_error_handler,
            exception_handler: self.exception_handler,
        })
    }
}
