//! Admin routes: view and update the access configuration, mint API keys.

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Request, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::api::auth::set_session_cookies;
use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::config::AccessConfig;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/config", get(get_config).post(update_config))
        .route("/generate-api-key", get(generate_api_key))
}

/// New access configuration, as a form or as JSON.
#[derive(Debug)]
pub struct ConfigUpdate(pub AccessConfig);

impl<S: Send + Sync> FromRequest<S> for ConfigUpdate {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let config = if is_json {
            Json::<AccessConfig>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?
                .0
        } else {
            Form::<AccessConfig>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?
                .0
        };

        let empty: Vec<&str> = [
            ("access_password", &config.access_password),
            ("api_key", &config.api_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();
        if !empty.is_empty() {
            return Err(
                ApiError::bad_request("access_password and api_key must not be empty")
                    .with_details(json!({"empty_fields": empty})),
            );
        }
        Ok(Self(config))
    }
}

pub async fn get_config(State(state): State<AppState>) -> Json<AccessConfig> {
    Json(state.access.snapshot())
}

/// Persists the new values, applies them immediately and re-issues the
/// session cookies under the new password.
pub async fn update_config(
    State(state): State<AppState>,
    ConfigUpdate(config): ConfigUpdate,
) -> ApiResult<Response> {
    state.store.save(&config)?;
    state.access.replace(config.clone());
    info!(path = %state.store.path().display(), "Access config updated");

    let mut response = Json(json!({"status": "success", "data": config})).into_response();
    set_session_cookies(&mut response, &config.access_password);
    Ok(response)
}

pub async fn generate_api_key() -> Json<serde_json::Value> {
    Json(json!({"api_key": Uuid::new_v4().to_string()}))
}
