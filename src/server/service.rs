use super::app::{match_route, Route};
use super::request::{parse_request, ParsedRequest};
use super::response::{write_json_error, write_response};
use crate::handler::{
    HandlerError, HandlerResponse, HandlerReturn, Payload, RequestContext,
};
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::{debug, error};

/// The request service an [`App`](super::App) freezes into.
///
/// Holds the route table behind an `Arc`; cloning per connection is cheap
/// and every clone serves from the same table.
#[derive(Clone)]
pub struct AppService {
    routes: Arc<Vec<Route>>,
    script_root: String,
}

impl AppService {
    pub(crate) fn new(routes: Arc<Vec<Route>>, script_root: String) -> Self {
        Self {
            routes,
            script_root,
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let ParsedRequest {
            method,
            path,
            headers,
            cookies,
            query_params,
            body,
        } = parse_request(req);

        let Ok(method) = method.parse::<Method>() else {
            write_json_error(res, 400, json!({ "status": "error", "message": "Bad Request" }));
            return Ok(());
        };

        let matched = match_route(&self.routes, &method, &path).map(|(route, url_args)| {
            (
                route.rule.clone(),
                route.name.clone(),
                Arc::clone(&route.handler),
                url_args,
            )
        });
        let Some((rule, route_name, handler, url_args)) = matched else {
            debug!(method = %method, path = %path, "no route matched");
            write_json_error(res, 404, json!({ "status": "error", "message": "Not Found" }));
            return Ok(());
        };

        let mut ctx = RequestContext {
            method,
            path,
            rule,
            route_name,
            url_args,
            query: query_params,
            headers,
            cookies,
            body,
            script_root: self.script_root.clone(),
            openapi: None,
        };

        match handler.handle(&mut ctx) {
            Ok(HandlerReturn::Response(resp)) => write_response(res, &resp),
            Ok(HandlerReturn::Structured(value)) => {
                write_response(res, &HandlerResponse::json(value));
            }
            Ok(HandlerReturn::Passthrough(bytes)) => {
                write_response(res, &HandlerResponse::new(200, Payload::Bytes(bytes)));
            }
            // a short circuit is a finished response, written as given
            Err(HandlerError::ShortCircuit(resp)) => write_response(res, &resp),
            Err(HandlerError::Internal(err)) => {
                error!(rule = %ctx.rule, error = %err, "handler failed");
                write_json_error(
                    res,
                    500,
                    json!({ "status": "error", "message": err.to_string() }),
                );
            }
        }
        Ok(())
    }
}
