use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, LOCATION};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::{debug, warn};

use super::{Claims, TokenService};
use crate::cache::CacheHandle;
use crate::web::{accepts_html, HttpError};

pub const TOKEN_COOKIE: &str = "token";
pub const LOGIN_PAGE: &str = "/login.html";

/// Cache key marking a token as revoked.
pub fn blocklist_key(token: &str) -> String {
    format!("blocklist:{}", token)
}

/// Shared state of the [`authenticate`] layer.
#[derive(Clone)]
pub struct AuthState {
    tokens: Arc<TokenService>,
    cache: CacheHandle,
    public_routes: Arc<HashSet<String>>,
}

impl AuthState {
    pub fn new(tokens: Arc<TokenService>, cache: CacheHandle, public_routes: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens,
            cache,
            public_routes: Arc::new(public_routes.into_iter().collect()),
        }
    }

    async fn is_blocklisted(&self, token: &str) -> bool {
        let Some(client) = self.cache.client() else {
            return false;
        };
        match client.get(&blocklist_key(token)).await {
            Ok(Some(value)) => !value.is_empty(),
            Ok(None) => false,
            Err(err) => {
                warn!(error = %err, "blocklist lookup failed, rejecting token");
                true
            }
        }
    }
}

fn token_from(req: &Request) -> Option<String> {
    let jar = CookieJar::from_headers(req.headers());
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn reject(html: bool, status: StatusCode, message: &str) -> Response {
    if html {
        (StatusCode::FOUND, [(LOCATION, LOGIN_PAGE)]).into_response()
    } else {
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Request guard for `axum::middleware::from_fn_with_state`.
///
/// Public routes pass untouched. Otherwise a valid, non-revoked token from
/// the `token` cookie or a bearer header is required; its claims are stored
/// as a request extension.
pub async fn authenticate(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    if state.public_routes.contains(req.uri().path()) {
        return next.run(req).await;
    }

    let html = accepts_html(req.headers());
    let Some(token) = token_from(&req) else {
        debug!(path = req.uri().path(), "no token provided");
        return reject(html, StatusCode::UNAUTHORIZED, "No token provided");
    };

    if state.is_blocklisted(&token).await {
        debug!(path = req.uri().path(), "token is blocklisted");
        return reject(html, StatusCode::FORBIDDEN, "Invalid token");
    }

    match state.tokens.verify(&token) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(err) => {
            debug!(path = req.uri().path(), error = %err, "token validation failed");
            reject(html, StatusCode::FORBIDDEN, "Invalid token")
        }
    }
}

/// Passes when the caller holds at least one of `allowed`.
pub fn authorize(allowed: &[String], user: Option<&Claims>) -> Result<(), HttpError> {
    let Some(roles) = user.and_then(|u| u.roles.as_ref()) else {
        return Err(HttpError::forbidden("Access denied: No user roles found"));
    };
    if allowed.iter().any(|role| roles.contains(role)) {
        Ok(())
    } else {
        Err(HttpError::forbidden("Access denied: Insufficient permissions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(roles: Option<Vec<&str>>) -> Claims {
        Claims {
            id: "1".to_string(),
            username: "u".to_string(),
            roles: roles.map(|r| r.into_iter().map(String::from).collect()),
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn authorize_needs_one_matching_role() {
        let allowed = vec!["admin".to_string(), "editor".to_string()];
        assert!(authorize(&allowed, Some(&claims(Some(vec!["editor"])))).is_ok());

        let err = authorize(&allowed, Some(&claims(Some(vec!["viewer"])))).unwrap_err();
        assert_eq!(err.message(), "Access denied: Insufficient permissions");

        let err = authorize(&allowed, Some(&claims(None))).unwrap_err();
        assert_eq!(err.message(), "Access denied: No user roles found");
        assert!(authorize(&allowed, None).is_err());
    }

    #[test]
    fn browsers_are_sent_to_the_login_page_with_found() {
        let response = reject(true, StatusCode::FORBIDDEN, "Invalid token");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], LOGIN_PAGE);

        let response = reject(false, StatusCode::FORBIDDEN, "Invalid token");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
