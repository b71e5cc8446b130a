//! HTTP Routes
//!
//! API Endpoints（除 /api/ping 外均需 `X-User-Id` 请求头）:
//! - /api/ping                                          GET    健康检查
//! - /api/novels                                        GET/POST
//! - /api/novels/:novel_id                              GET/PATCH/DELETE
//! - /api/novels/:novel_id/characters                   GET/POST
//! - /api/novels/:novel_id/characters/:character_id     DELETE
//! - /api/novels/:novel_id/outline/versions             GET/POST
//! - /api/novels/:novel_id/outline/versions/:version_id/lock      PATCH
//! - /api/novels/:novel_id/outline/versions/:version_id/rollback  POST
//! - /api/novels/:novel_id/generate/outline/stream      GET    大纲流式生成（SSE）
//! - /api/novels/:novel_id/generate/{outline,titles,chapters}     POST  提交任务
//! - /api/novels/:novel_id/chapters                     GET    按卷分组的章节
//! - /api/novels/:novel_id/chapters/:chapter_id/generate[/outline|/detail|/consistency] POST
//! - /api/novels/:novel_id/tasks                        GET
//! - /api/chapters/:chapter_id                          GET/PATCH/DELETE
//! - /api/knowledge/:novel_id                           GET/POST
//! - /api/knowledge/:novel_id/:kb_id                    DELETE
//! - /api/knowledge/:novel_id/:kb_id/documents          GET/POST
//! - /api/ai-config                                     GET/POST
//! - /api/ai-config/:config_id                          PATCH/DELETE
//! - /api/tasks/:task_id                                GET
//! - /api/tasks/:task_id/cancel                         POST
//! - /api/chat                                          POST   助手对话（SSE）
//! - /api/suggestions/{titles,expand-background}        POST
//! - /ws                                                WS     任务进度 / 小说变更事件

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws", get(handlers::websocket_handler))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/novels", novel_routes())
        .nest("/chapters", chapter_routes())
        .nest("/knowledge", knowledge_routes())
        .nest("/ai-config", ai_config_routes())
        .nest("/tasks", task_routes())
        .route("/chat", post(handlers::chat))
        .route("/suggestions/titles", post(handlers::suggest_titles))
        .route(
            "/suggestions/expand-background",
            post(handlers::expand_background),
        )
}

/// Novel 路由（含人物、大纲版本、生成提交）
fn novel_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::list_novels).post(handlers::create_novel))
        .route(
            "/:novel_id",
            get(handlers::get_novel)
                .patch(handlers::update_novel)
                .delete(handlers::delete_novel),
        )
        // Characters
        .route(
            "/:novel_id/characters",
            get(handlers::list_characters).post(handlers::create_character),
        )
        .route(
            "/:novel_id/characters/:character_id",
            delete(handlers::delete_character),
        )
        // Outline versions
        .route(
            "/:novel_id/outline/versions",
            get(handlers::list_outline_versions).post(handlers::create_outline_version),
        )
        .route(
            "/:novel_id/outline/versions/:version_id/lock",
            patch(handlers::toggle_outline_lock),
        )
        .route(
            "/:novel_id/outline/versions/:version_id/rollback",
            post(handlers::rollback_outline),
        )
        // Generation
        .route(
            "/:novel_id/generate/outline/stream",
            get(handlers::stream_outline),
        )
        .route(
            "/:novel_id/generate/outline",
            post(handlers::generate_outline),
        )
        .route("/:novel_id/generate/titles", post(handlers::generate_titles))
        .route(
            "/:novel_id/generate/chapters",
            post(handlers::generate_chapter_plan),
        )
        // Chapters
        .route("/:novel_id/chapters", get(handlers::list_chapters))
        .route(
            "/:novel_id/chapters/:chapter_id/generate",
            post(handlers::generate_content),
        )
        .route(
            "/:novel_id/chapters/:chapter_id/generate/outline",
            post(handlers::generate_chapter_outline),
        )
        .route(
            "/:novel_id/chapters/:chapter_id/generate/detail",
            post(handlers::generate_chapter_detail),
        )
        .route(
            "/:novel_id/chapters/:chapter_id/generate/consistency",
            post(handlers::check_consistency),
        )
        // Tasks
        .route("/:novel_id/tasks", get(handlers::list_novel_tasks))
}

/// Chapter 路由
fn chapter_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/:chapter_id",
        get(handlers::get_chapter)
            .patch(handlers::update_chapter)
            .delete(handlers::delete_chapter),
    )
}

/// Knowledge 路由
fn knowledge_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/:novel_id",
            get(handlers::list_knowledge_bases).post(handlers::create_knowledge_base),
        )
        .route(
            "/:novel_id/:kb_id",
            delete(handlers::delete_knowledge_base),
        )
        .route(
            "/:novel_id/:kb_id/documents",
            get(handlers::list_knowledge_documents).post(handlers::add_knowledge_document),
        )
}

/// AI Config 路由
fn ai_config_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::list_ai_configs).post(handlers::create_ai_config),
        )
        .route(
            "/:config_id",
            patch(handlers::update_ai_config).delete(handlers::delete_ai_config),
        )
}

/// Task 路由
fn task_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:task_id", get(handlers::get_task))
        .route("/:task_id/cancel", post(handlers::cancel_task))
}
