//! Hosting framework: route table, request parsing, response writing and
//! the coroutine HTTP server.

mod app;
pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use app::{App, Route};
pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_cookies, parse_query_params, parse_request, ParsedRequest};
pub use response::{write_json_error, write_response};
pub use service::AppService;
