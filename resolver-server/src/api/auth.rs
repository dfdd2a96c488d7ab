//! Access gate.
//!
//! Resolution routes accept either the `X-API-Key` header or the
//! `douyin_access` cookie. Admin routes require the `douyin_admin` cookie.
//! Both cookies carry the access password.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};

use crate::api::error::ApiError;
use crate::api::server::AppState;

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const ACCESS_COOKIE: &str = "douyin_access";
pub const ADMIN_COOKIE: &str = "douyin_admin";

/// Value of cookie `name` in the request's `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Appends access and admin cookies for `password` to `response`.
pub fn set_session_cookies(response: &mut Response, password: &str) {
    for name in [ACCESS_COOKIE, ADMIN_COOKIE] {
        match HeaderValue::from_str(&format!("{name}={password}; Path=/; HttpOnly; SameSite=Lax")) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Password is not a valid cookie value"),
        }
    }
}

pub fn has_access(state: &AppState, headers: &HeaderMap) -> bool {
    let by_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|key| state.access.api_key_matches(key));
    by_key
        || cookie_value(headers, ACCESS_COOKIE)
            .is_some_and(|password| state.access.password_matches(password))
}

pub fn is_admin(state: &AppState, headers: &HeaderMap) -> bool {
    cookie_value(headers, ADMIN_COOKIE).is_some_and(|password| state.access.password_matches(password))
}

/// Middleware for resolution and info routes.
pub async fn require_access(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if has_access(&state, request.headers()) {
        return Ok(next.run(request).await);
    }
    tracing::warn!(path = %request.uri().path(), "Rejected request without valid API key or session");
    Err(ApiError::unauthorized("Invalid API key"))
}

/// Middleware for admin routes.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_admin(&state, request.headers()) {
        return Ok(next.run(request).await);
    }
    tracing::warn!(path = %request.uri().path(), "Rejected admin request");
    Err(ApiError::unauthorized("Unauthorized"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_cookie_among_several() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; douyin_access=pw; b=2"));
        assert_eq!(cookie_value(&headers, ACCESS_COOKIE), Some("pw"));
        assert_eq!(cookie_value(&headers, ADMIN_COOKIE), None);
    }

    #[test]
    fn session_cookies_are_http_only() {
        let mut response = Response::new(axum::body::Body::empty());
        set_session_cookies(&mut response, "pw");
        let cookies: Vec<_> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("douyin_access=pw;"));
        assert!(cookies[1].starts_with("douyin_admin=pw;"));
        assert!(cookies.iter().all(|c| c.contains("HttpOnly")));
    }
}
