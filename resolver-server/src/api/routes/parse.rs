//! Share-link resolution.
//!
//! Always answers 200 with a `status` field; the diagnostic trace is part of
//! every response, success or failure.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use shortlink_resolver::{ResolutionResult, ResolutionTrace, ResolveError};
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;

/// Create the parse router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/parse", get(parse_url))
        .route("/parse-douyin", get(parse_url))
}

#[derive(Debug, Deserialize)]
pub struct ParseQuery {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<&'static str>,
    pub data: ParseData,
}

#[derive(Debug, Serialize)]
pub struct ParseData {
    pub video_url: Option<String>,
    pub title: Option<String>,
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// Provenance of `video_url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub debug_info: DebugInfo,
}

#[derive(Debug, Serialize)]
pub struct DebugInfo {
    pub original_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub attempts: ResolutionTrace,
}

fn failure_message(reason: ResolveError) -> &'static str {
    match reason {
        ResolveError::NoIdentifierFound => "无法从URL中提取视频ID",
        ResolveError::AllStrategiesExhausted => "无法获取视频信息",
        ResolveError::DeadlineExceeded => "解析超时",
    }
}

impl From<ResolutionResult> for ParseResponse {
    fn from(result: ResolutionResult) -> Self {
        match result {
            ResolutionResult::Success(resolved) => {
                let title = resolved.display_title();
                Self {
                    status: "success",
                    msg: None,
                    data: ParseData {
                        video_url: Some(resolved.media_url),
                        title: Some(title),
                        cover_image: resolved.cover_image,
                        video_id: Some(resolved.video_id.to_string()),
                        method: Some(resolved.provenance),
                        debug_info: DebugInfo {
                            original_url: resolved.original_url,
                            reason: None,
                            attempts: resolved.trace,
                        },
                    },
                }
            }
            ResolutionResult::Failure(unresolved) => Self {
                status: "error",
                msg: Some(failure_message(unresolved.reason)),
                data: ParseData {
                    video_url: None,
                    title: None,
                    cover_image: None,
                    video_id: unresolved.video_id.map(|id| id.to_string()),
                    method: None,
                    debug_info: DebugInfo {
                        original_url: unresolved.original_url,
                        reason: Some(unresolved.reason.code()),
                        attempts: unresolved.trace,
                    },
                },
            },
        }
    }
}

pub async fn parse_url(
    State(state): State<AppState>,
    Query(query): Query<ParseQuery>,
) -> ApiResult<Json<ParseResponse>> {
    let url = query
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required query parameter: url"))?;
    debug!(%url, "Parsing share link");

    let result = state.resolver.resolve(&url).await;
    Ok(Json(result.into()))
}
