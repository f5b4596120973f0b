//! # specguard
//!
//! **specguard** is a coroutine-powered [OpenAPI 3.0](https://spec.openapis.org/oas/v3.0.3)
//! enforcement layer for Rust HTTP services: every request and response on a
//! contract-covered route is validated against the contract before and after
//! the handler runs.
//!
//! ## Overview
//!
//! specguard turns an OpenAPI document into a live gate in front of your
//! handlers. Install the plugin on an [`App`](server::App) and every route
//! under the contract's base path gets request validation (security, path,
//! parameters, body), response validation (status, media type, body schema),
//! automatic JSON serialization of structured handler output, and panic
//! containment. The contract document itself is served over HTTP, optionally
//! alongside a Swagger UI console, so the running service and its
//! documentation can never drift apart.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`contract`]** - OpenAPI 3.0 document loading, linting, and operation table construction
//! - **[`server`]** - Route table, HTTP service, and server lifecycle built on `may_minihttp`
//! - **[`handler`]** - Request context and handler traits routes are written against
//! - **[`plugin`]** - The enforcement plugin: interception pipeline, error handlers, doc endpoints
//! - **[`validation`]** - Request and response validators backed by compiled JSON Schemas
//! - **[`security`]** - Security scheme credential checks and the provider trait
//! - **[`static_files`]** - Swagger UI asset serving with template rendering
//!
//! ### Request Interception Flow
//!
//! When a request arrives for a wrapped route, it flows through the plugin
//! before and after the handler:
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as AppService<br/>(may_minihttp)
//!     participant Plugin as OpenApiPlugin
//!     participant ReqVal as RequestValidator
//!     participant Handler as Route Handler
//!     participant RespVal as ResponseValidator
//!
//!     Client->>Server: HTTP Request<br/>POST /foobar
//!     Server->>Server: Parse headers, cookies,<br/>query, body
//!     Server->>Plugin: intercept(ctx, handler)
//!
//!     Plugin->>ReqVal: validate(request)
//!     ReqVal->>ReqVal: Security requirements
//!     ReqVal->>ReqVal: Path and operation lookup
//!     ReqVal->>ReqVal: Parameter decode + schema
//!     ReqVal->>ReqVal: Body media type + schema
//!
//!     alt Request Rejected
//!         Plugin-->>Client: 400/401/404/405/415<br/>(request error handler)
//!     end
//!
//!     Plugin->>Handler: handle(ctx)<br/>ctx.openapi populated
//!
//!     alt Handler Panics or Fails
//!         Plugin->>Plugin: catch_unwind
//!         Plugin-->>Client: 500 (exception handler)
//!     end
//!
//!     Handler-->>Plugin: HandlerReturn
//!     Plugin->>Plugin: Auto-serialize<br/>structured output
//!
//!     Plugin->>RespVal: validate(request, response)
//!     RespVal->>RespVal: Declared status + media type
//!     RespVal->>RespVal: Body schema
//!
//!     alt Response Rejected
//!         Plugin-->>Client: 500 (response error handler)
//!     end
//!
//!     Plugin-->>Client: HTTP Response
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use specguard::plugin::OpenApiPluginBuilder;
//! use specguard::server::{App, HttpServer};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut app = App::new();
//! // ... app.route(...) for each operation ...
//!
//! let plugin = OpenApiPluginBuilder::from_file("doc/petstore.yaml")?
//!     .serve_ui(true)
//!     .build()?;
//! app.install(plugin);
//!
//! let handle = HttpServer(app.into_service()).start("0.0.0.0:8080")?;
//! handle.join().ok();
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Contract-First**: The OpenAPI document is the single source of truth for what is valid
//! - **Coroutine-Powered**: Built on the `may` runtime for efficient concurrency
//! - **Fail-Fast Validation**: Requests are rejected before handlers run; handlers only see valid input
//! - **Response Enforcement**: A handler that violates its own contract produces a 500, not silent drift
//! - **Security Checks**: API key, HTTP bearer/basic, OAuth2, and OpenID Connect credential presence,
//!   with a provider trait for real verification
//! - **Pluggable Error Handling**: Swap the request, response, and exception error handlers per plugin
//! - **Self-Documenting**: Serves the contract document and an optional Swagger UI console
//!
//! ## Runtime Considerations
//!
//! specguard uses the `may` coroutine runtime, not tokio or async-std. This means:
//!
//! - All handlers run in coroutines (lightweight threads)
//! - Stack size is configurable via the `SPECGUARD_STACK_SIZE` environment variable
//! - The runtime is incompatible with tokio-based libraries without bridging
//! - Blocking operations should use `may`'s blocking facilities

pub mod contract;
pub mod handler;
pub mod plugin;
pub mod runtime_config;
pub mod security;
pub mod server;
pub mod static_files;
pub mod translate;
pub mod validation;

pub use contract::{read_document, Contract, ParameterLocation, ParameterMeta, SecurityScheme};
pub use handler::{Handler, HandlerError, HandlerResponse, HandlerResult, HandlerReturn, Payload, RequestContext};
pub use plugin::{OpenApiPlugin, OpenApiPluginBuilder};
pub use security::{SecurityProvider, SecurityRequest};
pub use validation::{RequestValidation, ResponseValidation, ValidationError, ValidationErrorKind};
