//! Novel HTTP Handlers - 小说 / 人物 / 大纲版本

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::{Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{
    CreateCharacter, CreateNovel, CreateOutlineVersion, DeleteCharacter, DeleteNovel, GetNovel,
    ListCharacters, ListNovels, ListOutlineVersions, OutlineStreamEvent, RollbackOutline,
    ToggleOutlineLock, UpdateNovel,
};
use crate::application::services::OutlineEventStream;
use crate::infrastructure::http::dto::{
    ApiResponse, CharacterResponse, CreateCharacterRequest, CreateNovelRequest,
    CreateOutlineVersionRequest, Empty, NovelResponse, OutlineStreamQuery,
    OutlineVersionResponse, ToggleLockRequest, UpdateNovelRequest,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::middleware::CurrentUser;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// Novels
// ============================================================================

pub async fn list_novels(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<Vec<NovelResponse>>>, ApiError> {
    let novels = state
        .list_novels_handler
        .handle(ListNovels { user_id })
        .await?;
    Ok(Json(ApiResponse::success(
        novels.into_iter().map(Into::into).collect(),
    )))
}

pub async fn get_novel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
) -> Result<Json<ApiResponse<NovelResponse>>, ApiError> {
    let novel = state
        .get_novel_handler
        .handle(GetNovel { user_id, novel_id })
        .await?;
    Ok(Json(ApiResponse::success(novel.into())))
}

pub async fn create_novel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CreateNovelRequest>,
) -> Result<Json<ApiResponse<NovelResponse>>, ApiError> {
    let novel = state
        .create_novel_handler
        .handle(CreateNovel {
            user_id,
            title: req.title,
            genre: req.genre,
            style: req.style,
            target_audience: req.target_audience,
            target_words: req.target_words,
            min_chapter_words: req.min_chapter_words,
            background: req.background,
            world_settings: req.world_settings,
        })
        .await?;
    Ok(Json(ApiResponse::success(novel.into())))
}

pub async fn update_novel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
    Json(req): Json<UpdateNovelRequest>,
) -> Result<Json<ApiResponse<NovelResponse>>, ApiError> {
    let novel = state
        .update_novel_handler
        .handle(UpdateNovel {
            user_id,
            novel_id,
            title: req.title,
            genre: req.genre,
            style: req.style,
            target_audience: req.target_audience,
            target_words: req.target_words,
            min_chapter_words: req.min_chapter_words,
            background: req.background,
            world_settings: req.world_settings,
            status: req.status,
        })
        .await?;
    Ok(Json(ApiResponse::success(novel.into())))
}

pub async fn delete_novel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_novel_handler
        .handle(DeleteNovel { user_id, novel_id })
        .await?;
    Ok(Json(ApiResponse::ok()))
}

// ============================================================================
// Characters
// ============================================================================

pub async fn list_characters(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<CharacterResponse>>>, ApiError> {
    let characters = state
        .list_characters_handler
        .handle(ListCharacters { user_id, novel_id })
        .await?;
    Ok(Json(ApiResponse::success(
        characters.into_iter().map(Into::into).collect(),
    )))
}

pub async fn create_character(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
    Json(req): Json<CreateCharacterRequest>,
) -> Result<Json<ApiResponse<CharacterResponse>>, ApiError> {
    let character = state
        .create_character_handler
        .handle(CreateCharacter {
            user_id,
            novel_id,
            name: req.name,
            role: req.role,
            personality: req.personality,
            abilities: req.abilities,
            relationships: req.relationships,
            current_state: req.current_state,
        })
        .await?;
    Ok(Json(ApiResponse::success(character.into())))
}

pub async fn delete_character(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path((novel_id, character_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_character_handler
        .handle(DeleteCharacter {
            user_id,
            novel_id,
            character_id,
        })
        .await?;
    Ok(Json(ApiResponse::ok()))
}

// ============================================================================
// Outline versions
// ============================================================================

pub async fn list_outline_versions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<OutlineVersionResponse>>>, ApiError> {
    let versions = state
        .list_outline_versions_handler
        .handle(ListOutlineVersions { user_id, novel_id })
        .await?;
    Ok(Json(ApiResponse::success(
        versions.into_iter().map(Into::into).collect(),
    )))
}

pub async fn create_outline_version(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
    Json(req): Json<CreateOutlineVersionRequest>,
) -> Result<Json<ApiResponse<OutlineVersionResponse>>, ApiError> {
    let version = state
        .create_outline_version_handler
        .handle(CreateOutlineVersion {
            user_id,
            novel_id,
            content: req.content,
            mode: req.mode,
            context: req.context,
        })
        .await?;
    Ok(Json(ApiResponse::success(version.into())))
}

pub async fn toggle_outline_lock(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path((novel_id, version_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ToggleLockRequest>,
) -> Result<Json<ApiResponse<OutlineVersionResponse>>, ApiError> {
    let version = state
        .toggle_outline_lock_handler
        .handle(ToggleOutlineLock {
            user_id,
            novel_id,
            version_id,
            is_locked: req.is_locked,
        })
        .await?;
    Ok(Json(ApiResponse::success(version.into())))
}

pub async fn rollback_outline(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path((novel_id, version_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<OutlineVersionResponse>>, ApiError> {
    let version = state
        .rollback_outline_handler
        .handle(RollbackOutline {
            user_id,
            novel_id,
            version_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(version.into())))
}

/// 大纲流事件转为 SSE
///
/// `{"type":"chunk","content":..}`* 之后是 `{"type":"done"}` 或 `{"type":"error","error":..}`
fn outline_events(events: OutlineEventStream) -> impl Stream<Item = Result<Event, Infallible>> {
    events.map(|event| {
        let payload = match event {
            OutlineStreamEvent::Chunk(content) => json!({"type": "chunk", "content": content}),
            OutlineStreamEvent::Done(version) => {
                json!({"type": "done", "versionId": version.id, "version": version.version})
            }
            OutlineStreamEvent::Error(error) => json!({"type": "error", "error": error}),
        };
        Ok::<_, Infallible>(Event::default().data(payload.to_string()))
    })
}

pub async fn stream_outline(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
    Query(query): Query<OutlineStreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let events = state
        .outline_stream
        .open(&user_id, novel_id, query.mode, query.existing_outline)
        .await?;

    Ok(Sse::new(outline_events(events)).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::OutlineVersionRecord;
    use crate::domain::novel::GenerationMode;
    use chrono::Utc;
    use futures_util::stream;

    async fn collect_sse(events: Vec<OutlineStreamEvent>) -> Vec<serde_json::Value> {
        use axum::response::IntoResponse;

        let source: OutlineEventStream = Box::pin(stream::iter(events));
        let response = Sse::new(outline_events(source)).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .map(|data| serde_json::from_str(data).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_outline_events_chunks_then_done() {
        let version = OutlineVersionRecord {
            id: Uuid::new_v4(),
            novel_id: Uuid::new_v4(),
            version: 3,
            content: "第一幕".into(),
            generation_mode: GenerationMode::Initial,
            generation_context: None,
            is_locked: false,
            created_at: Utc::now(),
        };
        let payloads = collect_sse(vec![
            OutlineStreamEvent::Chunk("第一".into()),
            OutlineStreamEvent::Chunk("幕".into()),
            OutlineStreamEvent::Done(version.clone()),
        ])
        .await;

        assert_eq!(payloads.len(), 3);
        assert_eq!(payloads[0], json!({"type": "chunk", "content": "第一"}));
        assert_eq!(payloads[1], json!({"type": "chunk", "content": "幕"}));
        assert_eq!(
            payloads[2],
            json!({"type": "done", "versionId": version.id, "version": 3})
        );
    }

    #[tokio::test]
    async fn test_outline_events_error_payload() {
        let payloads = collect_sse(vec![
            OutlineStreamEvent::Chunk("半".into()),
            OutlineStreamEvent::Error("API error (500): reset".into()),
        ])
        .await;

        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[1]["type"], "error");
        assert_eq!(payloads[1]["error"], "API error (500): reset");
    }
}
