use crate::handler::Handler;
use crate::plugin::OpenApiPlugin;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::AppService;

/// `<name>` or `<name:filter>` placeholders in a route rule.
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([a-zA-Z_][a-zA-Z0-9_]*)(?::([a-z]+))?>").expect("placeholder regex compiles")
});

/// One registered route: rule, compiled matcher, handler.
pub struct Route {
    pub method: Method,
    /// The rule as registered, e.g. `/pets/<petId>`.
    pub rule: String,
    pub name: Option<String>,
    pub(crate) regex: Regex,
    pub(crate) param_names: Vec<String>,
    pub(crate) handler: Arc<dyn Handler>,
}

/// Ordered route table a plugin installs into.
///
/// Rules use angle-bracket placeholders with optional filters: `<id>`
/// matches one segment, `<id:int>` an integer, `<rest:path>` anything
/// including slashes. The first matching route wins.
#[derive(Default)]
pub struct App {
    routes: Vec<Route>,
    script_root: String,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route.
    pub fn route(
        &mut self,
        method: Method,
        rule: &str,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.push_route(method, rule, None, Arc::new(handler));
        self
    }

    /// Register a named route. Names identify routes to installed plugins.
    pub fn route_named(
        &mut self,
        method: Method,
        rule: &str,
        name: &str,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.push_route(method, rule, Some(name.to_string()), Arc::new(handler));
        self
    }

    fn push_route(
        &mut self,
        method: Method,
        rule: &str,
        name: Option<String>,
        handler: Arc<dyn Handler>,
    ) {
        let (regex, param_names) = rule_to_regex(rule);
        self.routes.push(Route {
            method,
            rule: rule.to_string(),
            name,
            regex,
            param_names,
            handler,
        });
    }

    /// Record the deployment mount prefix handlers and plugins see as the
    /// script root. Empty for an app served at the origin.
    pub fn mount(&mut self, script_root: impl Into<String>) {
        self.script_root = script_root.into();
    }

    /// Install a plugin: it registers its own routes, then wraps every
    /// route registered so far. Install after the app's routes.
    pub fn install(&mut self, plugin: OpenApiPlugin) {
        let plugin = Arc::new(plugin);
        plugin.register_routes(self);
        for route in &mut self.routes {
            route.handler = plugin.apply(&route.rule, Arc::clone(&route.handler));
        }
        info!(
            base_path = %plugin.contract().base_path(),
            route_count = self.routes.len(),
            "plugin installed"
        );
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn script_root(&self) -> &str {
        &self.script_root
    }

    /// Freeze the table into a shareable request service.
    #[must_use]
    pub fn into_service(self) -> AppService {
        AppService::new(Arc::new(self.routes), self.script_root)
    }
}

/// First route matching both method and path, with captured placeholders.
pub(crate) fn match_route<'a>(
    routes: &'a [Route],
    method: &Method,
    path: &str,
) -> Option<(&'a Route, HashMap<String, String>)> {
    for route in routes {
        if route.method != *method {
            continue;
        }
        if let Some(caps) = route.regex.captures(path) {
            let url_args = route
                .param_names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    caps.get(i + 1)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect();
            return Some((route, url_args));
        }
    }
    None
}

/// Compile a rule to an anchored regex plus its placeholder names.
///
/// Rules are fixed in source; an uncompilable rule is a programming error
/// caught at registration, never at request time.
fn rule_to_regex(rule: &str) -> (Regex, Vec<String>) {
    let mut pattern = String::with_capacity(rule.len() + 8);
    pattern.push('^');
    let mut names = Vec::new();
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(rule) {
        let m = caps.get(0).expect("capture zero always present");
        pattern.push_str(&regex::escape(&rule[last..m.start()]));
        names.push(caps[1].to_string());
        pattern.push_str(match caps.get(2).map(|f| f.as_str()) {
            Some("int") => r"(-?\d+)",
            Some("float") => r"(-?[0-9]*\.?[0-9]+)",
            Some("path") => r"(.+)",
            _ => r"([^/]+)",
        });
        last = m.end();
    }
    pattern.push_str(&regex::escape(&rule[last..]));
    pattern.push('$');
    let regex = Regex::new(&pattern).expect("rule regex compiles");
    (regex, names)
}
