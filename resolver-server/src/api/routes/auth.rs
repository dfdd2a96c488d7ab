//! Password login.

use axum::{
    Form, Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::auth::set_session_cookies;
use crate::api::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub password: String,
}

/// On success, sets the session cookies and redirects to `/`.
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    if !state.access.password_matches(&form.password) {
        tracing::warn!("Login attempt with wrong password");
        let body = json!({"status": "error", "msg": "密码错误，请重试"});
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }

    let mut response = (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response();
    set_session_cookies(&mut response, &form.password);
    response
}
