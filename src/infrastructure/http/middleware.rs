//! HTTP Middleware
//!
//! - 当前用户提取（`X-User-Id` 请求头）
//! - HTTP 状态码错误日志

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use super::error::ApiError;

/// 标识当前用户的请求头
pub const USER_ID_HEADER: &str = "x-user-id";

/// 当前用户
///
/// 认证由前置网关完成，这里只读取其注入的用户 ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|user_id| !user_id.is_empty())
            .map(|user_id| CurrentUser(user_id.to_string()))
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))
    }
}

/// HTTP 状态码错误日志中间件
///
/// 业务错误（errno != 0）在 ApiError::into_response() 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            "HTTP client error"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::util::ServiceExt;

    async fn whoami(CurrentUser(user_id): CurrentUser) -> String {
        user_id
    }

    async fn not_found_handler() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    fn create_test_router() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route("/not-found", get(not_found_handler))
            .layer(axum::middleware::from_fn(error_logging_middleware))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_current_user_from_header() {
        let request = HttpRequest::builder()
            .uri("/whoami")
            .header("X-User-Id", " alice ")
            .body(Body::empty())
            .unwrap();

        let response = create_test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "alice");
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let request = HttpRequest::builder()
            .uri("/whoami")
            .body(Body::empty())
            .unwrap();

        let response = create_test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["errno"], 401);
    }

    #[tokio::test]
    async fn test_client_error_passes_through() {
        let request = HttpRequest::builder()
            .uri("/not-found")
            .body(Body::empty())
            .unwrap();

        let response = create_test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
