//! Assistant HTTP Handlers - 写作助手对话与创作建议

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::{Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

use crate::application::ports::{StreamChunk, TextStream};
use crate::application::SuggestionRequest;
use crate::infrastructure::http::dto::{
    ApiResponse, ChatRequest, ExpandedBackgroundResponse, SuggestionRequestBody,
    TitleSuggestionsResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::middleware::CurrentUser;
use crate::infrastructure::http::state::AppState;

/// 流结束标记
const DONE_MARKER: &str = "[DONE]";

fn data_event(data: impl AsRef<str>) -> Result<Event, Infallible> {
    Ok(Event::default().data(data))
}

/// 将文本流转换为 SSE 事件
///
/// `{"content":..}`* 之后以 `[DONE]` 结束；出错时发送 `{"error":"Stream failed"}` 并终止
fn chat_events(stream: TextStream) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let mut stream = stream;
        while let Some(item) = stream.next().await {
            match item {
                Ok(StreamChunk::Text(content)) => {
                    if !content.is_empty() {
                        yield data_event(json!({ "content": content }).to_string());
                    }
                }
                Ok(StreamChunk::Finished { .. }) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Assistant stream failed");
                    yield data_event(json!({ "error": "Stream failed" }).to_string());
                    return;
                }
            }
        }
        yield data_event(DONE_MARKER);
    }
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let stream = state
        .assistant
        .chat(&user_id, req.novel_id, req.message, req.previous_content)
        .await?;
    Ok(Sse::new(chat_events(stream)).keep_alive(KeepAlive::default()))
}

fn suggestion_request(body: SuggestionRequestBody) -> SuggestionRequest {
    SuggestionRequest {
        genre: body.genre,
        style: body.style,
        background: body.background,
    }
}

pub async fn suggest_titles(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<SuggestionRequestBody>,
) -> Result<Json<ApiResponse<TitleSuggestionsResponse>>, ApiError> {
    let suggestions = state
        .assistant
        .suggest_titles(&user_id, suggestion_request(body))
        .await?;
    Ok(Json(ApiResponse::success(TitleSuggestionsResponse {
        titles: suggestions.titles,
        content: suggestions.content,
    })))
}

pub async fn expand_background(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<SuggestionRequestBody>,
) -> Result<Json<ApiResponse<ExpandedBackgroundResponse>>, ApiError> {
    let background = state
        .assistant
        .expand_background(&user_id, suggestion_request(body))
        .await?;
    Ok(Json(ApiResponse::success(ExpandedBackgroundResponse {
        background,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::LlmError;
    use futures_util::stream;

    async fn collect_sse(stream: TextStream) -> String {
        use axum::response::IntoResponse;

        let response = Sse::new(chat_events(stream)).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_chat_events_end_with_done() {
        let source: TextStream = Box::pin(stream::iter(vec![
            Ok(StreamChunk::Text("你".to_string())),
            Ok(StreamChunk::Text("好".to_string())),
            Ok(StreamChunk::Finished { tokens_used: None }),
        ]));

        let body = collect_sse(source).await;
        assert!(body.contains(r#"data: {"content":"你"}"#));
        assert!(body.contains(r#"data: {"content":"好"}"#));
        assert!(body.trim_end().ends_with("data: [DONE]"));
    }

    #[tokio::test]
    async fn test_chat_events_error_stops_stream() {
        let source: TextStream = Box::pin(stream::iter(vec![
            Ok(StreamChunk::Text("partial".to_string())),
            Err(LlmError::Network("reset".to_string())),
            Ok(StreamChunk::Text("never".to_string())),
        ]));

        let body = collect_sse(source).await;
        assert!(body.contains(r#"data: {"error":"Stream failed"}"#));
        assert!(!body.contains("never"));
        assert!(!body.contains("[DONE]"));
    }
}
