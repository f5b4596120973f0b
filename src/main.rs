//! Demo server: loads a contract, registers a stub route per operation, and
//! serves with validation enforced. Stubs answer with the declared success
//! example, so every response the demo produces passes its own contract.

use clap::{Parser, ValueEnum};
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use specguard::handler::{HandlerResponse, HandlerReturn, Payload, RequestContext};
use specguard::plugin::OpenApiPluginBuilder;
use specguard::runtime_config::RuntimeConfig;
use specguard::server::{App, HttpServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// `{name}` placeholders in a contract path template.
static BRACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("brace placeholder regex compiles"));

#[derive(Parser)]
#[command(name = "specguard")]
#[command(about = "Contract-enforcing demo server", long_about = None)]
struct Cli {
    /// Path to the OpenAPI contract (YAML or JSON)
    #[arg(short, long, default_value = "doc/petstore.yaml")]
    spec: PathBuf,

    /// Address and port to bind the server to
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: String,

    /// Serve the Swagger UI console under the contract base path
    #[arg(long, default_value_t = false)]
    ui: bool,

    /// Directory holding the Swagger UI assets
    #[arg(long, default_value = "doc/swagger-ui")]
    ui_dir: PathBuf,

    /// Skip request validation
    #[arg(long, default_value_t = false)]
    no_request_validation: bool,

    /// Skip response validation
    #[arg(long, default_value_t = false)]
    no_response_validation: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Rewrite a contract path template into the route rule syntax
/// (`/pets/{petId}` becomes `/pets/<petId>`).
fn rule_from_pattern(pattern: &str) -> String {
    BRACE_RE.replace_all(pattern, "<$1>").into_owned()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = RuntimeConfig::from_env();
    may::config().set_stack_size(config.stack_size);

    let spec_path = cli
        .spec
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("invalid UTF-8 in spec path"))?;
    let plugin = OpenApiPluginBuilder::from_file(spec_path)?
        .serve_ui(cli.ui)
        .ui_assets_dir(cli.ui_dir.clone())
        .validate_requests(!cli.no_request_validation)
        .validate_responses(!cli.no_response_validation)
        .build()?;
    let contract = Arc::clone(plugin.contract());

    let mut app = App::new();

    // Health endpoint outside the contract base path, exempt from validation.
    app.route(Method::GET, "/health", |_ctx: &mut RequestContext| {
        Ok(HandlerReturn::Passthrough(b"ok".to_vec()))
    });

    for op in contract.operations() {
        let rule = rule_from_pattern(&op.full_pattern);
        let status = op.success_status();
        let example = op.success_example().cloned();
        if example.is_none() {
            info!(method = %op.method, rule = %rule, "operation has no success example; stub answers with an empty body");
        }
        app.route(op.method.clone(), &rule, move |_ctx: &mut RequestContext| {
            let body = match &example {
                Some(value) => Payload::Structured(value.clone()),
                None => Payload::Bytes(Vec::new()),
            };
            Ok(HandlerReturn::Response(HandlerResponse::new(status, body)))
        });
    }

    app.install(plugin);

    info!(
        title = contract.title(),
        base_path = contract.base_path(),
        addr = %cli.addr,
        stack_size = config.stack_size,
        "starting demo server"
    );
    let handle = HttpServer(app.into_service()).start(cli.addr.as_str())?;
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server terminated: {e:?}"))?;
    Ok(())
}
