//! Generation / Task HTTP Handlers
//!
//! 每种生成类型一个提交端点；创建 Task 后立即返回（status=queued），
//! 进度通过 WebSocket 推送，或轮询 `/api/tasks/:task_id`。

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{CancelTask, GetTask, ListNovelTasks, SubmitGeneration};
use crate::domain::task::TaskType;
use crate::infrastructure::http::dto::{ApiResponse, GenerateRequest, TaskResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::middleware::CurrentUser;
use crate::infrastructure::http::state::AppState;

type TaskResult = Result<Json<ApiResponse<TaskResponse>>, ApiError>;

/// 请求体可省略；空体按无 input 处理
fn input_of(body: Option<Json<GenerateRequest>>) -> Option<serde_json::Value> {
    body.and_then(|Json(req)| req.input)
}

async fn submit(
    state: &AppState,
    user_id: String,
    novel_id: Uuid,
    chapter_id: Option<Uuid>,
    task_type: TaskType,
    body: Option<Json<GenerateRequest>>,
) -> TaskResult {
    let task = state
        .submit_generation_handler
        .handle(SubmitGeneration {
            user_id,
            novel_id,
            chapter_id,
            task_type,
            input: input_of(body),
        })
        .await?;
    Ok(Json(ApiResponse::success(task.into())))
}

// ============================================================================
// Novel-level generation
// ============================================================================

pub async fn generate_outline(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
    body: Option<Json<GenerateRequest>>,
) -> TaskResult {
    submit(&state, user_id, novel_id, None, TaskType::Outline, body).await
}

pub async fn generate_titles(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
    body: Option<Json<GenerateRequest>>,
) -> TaskResult {
    submit(&state, user_id, novel_id, None, TaskType::Title, body).await
}

pub async fn generate_chapter_plan(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
    body: Option<Json<GenerateRequest>>,
) -> TaskResult {
    submit(
        &state,
        user_id,
        novel_id,
        None,
        TaskType::ChapterPlanning,
        body,
    )
    .await
}

// ============================================================================
// Chapter-level generation
// ============================================================================

pub async fn generate_content(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path((novel_id, chapter_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<GenerateRequest>>,
) -> TaskResult {
    submit(
        &state,
        user_id,
        novel_id,
        Some(chapter_id),
        TaskType::Content,
        body,
    )
    .await
}

pub async fn generate_chapter_outline(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path((novel_id, chapter_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<GenerateRequest>>,
) -> TaskResult {
    submit(
        &state,
        user_id,
        novel_id,
        Some(chapter_id),
        TaskType::ChapterOutline,
        body,
    )
    .await
}

pub async fn generate_chapter_detail(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path((novel_id, chapter_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<GenerateRequest>>,
) -> TaskResult {
    submit(
        &state,
        user_id,
        novel_id,
        Some(chapter_id),
        TaskType::ChapterDetail,
        body,
    )
    .await
}

pub async fn check_consistency(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path((novel_id, chapter_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<GenerateRequest>>,
) -> TaskResult {
    submit(
        &state,
        user_id,
        novel_id,
        Some(chapter_id),
        TaskType::ConsistencyCheck,
        body,
    )
    .await
}

// ============================================================================
// Tasks
// ============================================================================

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(task_id): Path<Uuid>,
) -> TaskResult {
    let task = state
        .get_task_handler
        .handle(GetTask { user_id, task_id })
        .await?;
    Ok(Json(ApiResponse::success(task.into())))
}

pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(task_id): Path<Uuid>,
) -> TaskResult {
    let task = state
        .cancel_task_handler
        .handle(CancelTask { user_id, task_id })
        .await?;
    Ok(Json(ApiResponse::success(task.into())))
}

pub async fn list_novel_tasks(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<TaskResponse>>>, ApiError> {
    let tasks = state
        .list_novel_tasks_handler
        .handle(ListNovelTasks { user_id, novel_id })
        .await?;
    Ok(Json(ApiResponse::success(
        tasks.into_iter().map(Into::into).collect(),
    )))
}
