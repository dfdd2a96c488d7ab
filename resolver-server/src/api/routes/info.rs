use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};

use crate::api::server::AppState;

/// Routes behind the access gate.
pub fn gated_router() -> Router<AppState> {
    Router::new().route("/api", get(api_info))
}

/// Routes open to anyone.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/test", get(liveness))
}

/// Endpoint overview and usage.
pub async fn api_info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "抖音视频解析API已启动，欢迎使用！",
        "endpoints": {
            "/parse": "解析抖音视频链接，获取下载地址",
            "/parse-douyin": "同 /parse",
            "/api": "当前API信息页面",
            "/login": "密码登录",
            "/admin/config": "管理员设置",
            "/generate-api-key": "生成新的API密钥"
        },
        "usage": "访问 /parse?url=抖音链接 来解析视频，需要在请求头中添加 X-API-Key",
        "uptime_secs": state.start_time.elapsed().as_secs()
    }))
}

pub async fn liveness() -> Json<Value> {
    Json(json!({"message": "API is working!"}))
}

#[cfg(test)]
mod tests {
    use crate::api::routes::{create_router, test_state};
    use crate::config::DEFAULT_API_KEY;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_route_is_public() {
        let app = create_router(test_state());
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "API is working!");
    }

    #[tokio::test]
    async fn api_info_requires_access() {
        let app = create_router(test_state());
        let request = Request::builder().uri("/api").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api")
            .header("X-API-Key", DEFAULT_API_KEY)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
