//! The reply object handed to handlers as their context parameter.

use std::sync::Arc;

use axum::http::header::{ACCEPT, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use parking_lot::Mutex;
use serde_json::Value;

use crate::auth::Claims;
use crate::container::RequestScope;

/// Read-only view of the incoming request.
pub struct RequestInfo {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    cookies: CookieJar,
    user: Option<Claims>,
    scope: RequestScope,
}

impl RequestInfo {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, user: Option<Claims>, scope: RequestScope) -> Self {
        let cookies = CookieJar::from_headers(&headers);
        Self {
            method,
            uri,
            headers,
            cookies,
            user,
            scope,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).map(|c| c.value().to_string())
    }

    /// Claims of the authenticated caller, when the request passed authentication.
    pub fn user(&self) -> Option<&Claims> {
        self.user.as_ref()
    }

    /// Whether the client prefers an HTML answer.
    pub fn accepts_html(&self) -> bool {
        accepts_html(&self.headers)
    }

    /// Scope for request-scoped services.
    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }
}

pub(crate) fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false)
}

#[derive(Default)]
struct ReplyState {
    status: Option<StatusCode>,
    headers: HeaderMap,
    cookies: Vec<Cookie<'static>>,
    redirect: Option<String>,
}

/// Mutable response context shared between the dispatcher and a handler.
///
/// Clones share state: a status or cookie set through any clone shows up in
/// the rendered response.
#[derive(Clone)]
pub struct Reply {
    state: Arc<Mutex<ReplyState>>,
    request: Arc<RequestInfo>,
}

impl Reply {
    pub fn new(request: RequestInfo) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReplyState::default())),
            request: Arc::new(request),
        }
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// Sets the response status code.
    pub fn code(&self, status: StatusCode) -> &Self {
        self.state.lock().status = Some(status);
        self
    }

    pub fn header(&self, name: HeaderName, value: HeaderValue) -> &Self {
        self.state.lock().headers.insert(name, value);
        self
    }

    pub fn set_cookie(&self, cookie: Cookie<'static>) -> &Self {
        self.state.lock().cookies.push(cookie);
        self
    }

    /// Expires the cookie `name` on the client.
    pub fn clear_cookie(&self, name: &str, path: &str) -> &Self {
        let mut cookie = Cookie::build((name.to_string(), String::new()))
            .path(path.to_string())
            .build();
        cookie.make_removal();
        self.set_cookie(cookie)
    }

    /// Answers with a redirect to `location` instead of the handler's value.
    pub fn redirect(&self, location: impl Into<String>) -> &Self {
        self.state.lock().redirect = Some(location.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.state.lock().status.unwrap_or(StatusCode::OK)
    }

    /// Cookies queued on this reply so far.
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.state.lock().cookies.clone()
    }

    /// Whether both handles refer to the same reply.
    pub fn ptr_eq(a: &Reply, b: &Reply) -> bool {
        Arc::ptr_eq(&a.state, &b.state)
    }

    /// Renders `body` with the status, headers and cookies accumulated on the reply.
    pub(crate) fn render(&self, body: Value) -> Response {
        let state = self.state.lock();

        let mut response = match &state.redirect {
            Some(location) => {
                let mut response = StatusCode::FOUND.into_response();
                if let Ok(value) = HeaderValue::from_str(location) {
                    response.headers_mut().insert(LOCATION, value);
                }
                response
            }
            None => {
                let mut response = Json(body).into_response();
                *response.status_mut() = state.status.unwrap_or(StatusCode::OK);
                response
            }
        };

        for (name, value) in state.headers.iter() {
            response.headers_mut().insert(name.clone(), value.clone());
        }
        for cookie in &state.cookies {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(err) => tracing::warn!(cookie = cookie.name(), error = %err, "dropping unencodable cookie"),
            }
        }
        response
    }
}
