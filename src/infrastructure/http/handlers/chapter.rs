//! Chapter / Knowledge HTTP Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::ChapterEdit;
use crate::application::{
    AddKnowledgeDocument, CreateKnowledgeBase, DeleteChapter, DeleteKnowledgeBase, GetChapter,
    ListChapters, ListKnowledgeBases, ListKnowledgeDocuments, UpdateChapter,
};
use crate::infrastructure::http::dto::{
    AddDocumentRequest, ApiResponse, ChapterResponse, CreateKnowledgeBaseRequest, Empty,
    KnowledgeBaseResponse, KnowledgeDocumentResponse, UpdateChapterRequest, VolumeResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::middleware::CurrentUser;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// Chapters
// ============================================================================

/// 按卷分组的章节列表
pub async fn list_chapters(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<VolumeResponse>>>, ApiError> {
    let volumes = state
        .list_chapters_handler
        .handle(ListChapters { user_id, novel_id })
        .await?;
    Ok(Json(ApiResponse::success(
        volumes.into_iter().map(Into::into).collect(),
    )))
}

pub async fn get_chapter(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(chapter_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ChapterResponse>>, ApiError> {
    let chapter = state
        .get_chapter_handler
        .handle(GetChapter {
            user_id,
            chapter_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(chapter.into())))
}

pub async fn update_chapter(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(chapter_id): Path<Uuid>,
    Json(req): Json<UpdateChapterRequest>,
) -> Result<Json<ApiResponse<ChapterResponse>>, ApiError> {
    let chapter = state
        .update_chapter_handler
        .handle(UpdateChapter {
            user_id,
            chapter_id,
            edit: ChapterEdit {
                title: req.title,
                outline: req.outline,
                detail_outline: req.detail_outline,
                content: req.content,
            },
        })
        .await?;
    Ok(Json(ApiResponse::success(chapter.into())))
}

pub async fn delete_chapter(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(chapter_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_chapter_handler
        .handle(DeleteChapter {
            user_id,
            chapter_id,
        })
        .await?;
    Ok(Json(ApiResponse::ok()))
}

// ============================================================================
// Knowledge bases
// ============================================================================

pub async fn list_knowledge_bases(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<KnowledgeBaseResponse>>>, ApiError> {
    let bases = state
        .list_knowledge_bases_handler
        .handle(ListKnowledgeBases { user_id, novel_id })
        .await?;
    Ok(Json(ApiResponse::success(
        bases.into_iter().map(Into::into).collect(),
    )))
}

pub async fn create_knowledge_base(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(novel_id): Path<Uuid>,
    Json(req): Json<CreateKnowledgeBaseRequest>,
) -> Result<Json<ApiResponse<KnowledgeBaseResponse>>, ApiError> {
    let base = state
        .create_knowledge_base_handler
        .handle(CreateKnowledgeBase {
            user_id,
            novel_id,
            name: req.name,
            kind: req.kind,
            description: req.description,
        })
        .await?;
    Ok(Json(ApiResponse::success(base.into())))
}

pub async fn delete_knowledge_base(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path((novel_id, knowledge_base_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_knowledge_base_handler
        .handle(DeleteKnowledgeBase {
            user_id,
            novel_id,
            knowledge_base_id,
        })
        .await?;
    Ok(Json(ApiResponse::ok()))
}

pub async fn list_knowledge_documents(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path((novel_id, knowledge_base_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Vec<KnowledgeDocumentResponse>>>, ApiError> {
    let documents = state
        .list_knowledge_documents_handler
        .handle(ListKnowledgeDocuments {
            user_id,
            novel_id,
            knowledge_base_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(
        documents.into_iter().map(Into::into).collect(),
    )))
}

pub async fn add_knowledge_document(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path((novel_id, knowledge_base_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<AddDocumentRequest>,
) -> Result<Json<ApiResponse<KnowledgeDocumentResponse>>, ApiError> {
    let document = state
        .add_knowledge_document_handler
        .handle(AddKnowledgeDocument {
            user_id,
            novel_id,
            knowledge_base_id,
            title: req.title,
            content: req.content,
            file_type: req.file_type,
        })
        .await?;
    Ok(Json(ApiResponse::success(document.into())))
}
