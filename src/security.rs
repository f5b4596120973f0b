//! # Security Module
//!
//! Credential checks for the security requirements a contract declares.
//!
//! The request validator consults this module when an operation carries
//! security requirements. A registered [`SecurityProvider`] owns the decision
//! for its scheme; without one, [`credentials_present`] applies, which only
//! asks whether the declared credential location is populated. Actual
//! authentication stays with the application: a failed check here routes to
//! the 401 error path, nothing more.

use crate::contract::SecurityScheme;
use std::collections::HashMap;

/// Credential sources extracted from a request.
pub struct SecurityRequest<'a> {
    /// HTTP headers, lowercased names
    pub headers: &'a HashMap<String, String>,
    /// Query parameters
    pub query: &'a HashMap<String, String>,
    /// Cookies
    pub cookies: &'a HashMap<String, String>,
}

/// Per-scheme validation hook.
///
/// Register implementations on the plugin builder keyed by scheme name to
/// replace the presence check with real verification.
pub trait SecurityProvider: Send + Sync {
    /// Validate a request against a security scheme.
    ///
    /// # Arguments
    ///
    /// * `scheme` - The declared security scheme
    /// * `scopes` - Scopes the operation requires (OAuth2/OpenID)
    /// * `req` - Extracted credential sources
    ///
    /// # Returns
    ///
    /// `true` if the request satisfies the scheme, `false` otherwise
    fn validate(&self, scheme: &SecurityScheme, scopes: &[String], req: &SecurityRequest) -> bool;
}

/// Whether the credential location a scheme declares is populated.
///
/// The fallback when no provider is registered for a scheme. Mirrors what
/// extraction-level validation can know: the credential is there, not that
/// it is genuine.
#[must_use]
pub fn credentials_present(scheme: &SecurityScheme, req: &SecurityRequest) -> bool {
    match scheme {
        SecurityScheme::ApiKey { name, location, .. } if location == "header" => {
            req.headers.contains_key(&name.to_ascii_lowercase())
        }
        SecurityScheme::ApiKey { name, location, .. } if location == "query" => {
            req.query.contains_key(name)
        }
        SecurityScheme::ApiKey { name, location, .. } if location == "cookie" => {
            req.cookies.contains_key(name)
        }
        SecurityScheme::Http { scheme, .. } if scheme.eq_ignore_ascii_case("bearer") => req
            .headers
            .get("authorization")
            .is_some_and(|h| h.starts_with("Bearer ")),
        SecurityScheme::Http { scheme, .. } if scheme.eq_ignore_ascii_case("basic") => req
            .headers
            .get("authorization")
            .is_some_and(|h| h.starts_with("Basic ")),
        SecurityScheme::OAuth2 { .. } | SecurityScheme::OpenIdConnect { .. } => req
            .headers
            .get("authorization")
            .is_some_and(|h| h.starts_with("Bearer ")),
        _ => false,
    }
}
