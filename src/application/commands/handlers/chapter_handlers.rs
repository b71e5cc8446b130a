//! Chapter / Knowledge Command Handlers

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{
    AddKnowledgeDocument, CreateKnowledgeBase, DeleteChapter, DeleteKnowledgeBase, UpdateChapter,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ChapterRecord, ChapterRepositoryPort, KnowledgeBaseRecord, KnowledgeDocumentRecord,
    KnowledgeRepositoryPort, NovelRepositoryPort,
};
use crate::application::services::load_owned_novel;

/// 读取章节并校验其小说归属
pub(crate) async fn load_owned_chapter(
    novel_repo: &dyn NovelRepositoryPort,
    chapter_repo: &dyn ChapterRepositoryPort,
    chapter_id: Uuid,
    user_id: &str,
) -> Result<ChapterRecord, ApplicationError> {
    let chapter = chapter_repo
        .find_by_id(chapter_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("Chapter", chapter_id))?;
    load_owned_novel(novel_repo, chapter.novel_id, user_id)
        .await
        .map_err(|_| ApplicationError::not_found("Chapter", chapter_id))?;
    Ok(chapter)
}

// ============================================================================
// Chapters
// ============================================================================

/// UpdateChapter Handler - 手动编辑，正文变更时重算字数
pub struct UpdateChapterHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
}

impl UpdateChapterHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            chapter_repo,
        }
    }

    pub async fn handle(&self, cmd: UpdateChapter) -> Result<ChapterRecord, ApplicationError> {
        load_owned_chapter(
            self.novel_repo.as_ref(),
            self.chapter_repo.as_ref(),
            cmd.chapter_id,
            &cmd.user_id,
        )
        .await?;
        if cmd.edit.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ApplicationError::validation("Chapter title cannot be empty"));
        }

        self.chapter_repo
            .apply_edit(cmd.chapter_id, &cmd.edit)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Chapter", cmd.chapter_id))
    }
}

pub struct DeleteChapterHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
}

impl DeleteChapterHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            chapter_repo,
        }
    }

    pub async fn handle(&self, cmd: DeleteChapter) -> Result<(), ApplicationError> {
        load_owned_chapter(
            self.novel_repo.as_ref(),
            self.chapter_repo.as_ref(),
            cmd.chapter_id,
            &cmd.user_id,
        )
        .await?;
        self.chapter_repo.delete(cmd.chapter_id).await?;
        Ok(())
    }
}

// ============================================================================
// Knowledge bases
// ============================================================================

pub struct CreateKnowledgeBaseHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    knowledge_repo: Arc<dyn KnowledgeRepositoryPort>,
}

impl CreateKnowledgeBaseHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        knowledge_repo: Arc<dyn KnowledgeRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            knowledge_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateKnowledgeBase,
    ) -> Result<KnowledgeBaseRecord, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), cmd.novel_id, &cmd.user_id).await?;
        if cmd.name.trim().is_empty() {
            return Err(ApplicationError::validation("Knowledge base name cannot be empty"));
        }

        let now = Utc::now();
        let base = KnowledgeBaseRecord {
            id: Uuid::new_v4(),
            novel_id: cmd.novel_id,
            name: cmd.name.trim().to_string(),
            kind: cmd.kind,
            description: cmd.description,
            created_at: now,
            updated_at: now,
        };
        self.knowledge_repo.save_base(&base).await?;
        Ok(base)
    }
}

pub struct DeleteKnowledgeBaseHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    knowledge_repo: Arc<dyn KnowledgeRepositoryPort>,
}

impl DeleteKnowledgeBaseHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        knowledge_repo: Arc<dyn KnowledgeRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            knowledge_repo,
        }
    }

    pub async fn handle(&self, cmd: DeleteKnowledgeBase) -> Result<(), ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), cmd.novel_id, &cmd.user_id).await?;
        if !self
            .knowledge_repo
            .delete_base(cmd.novel_id, cmd.knowledge_base_id)
            .await?
        {
            return Err(ApplicationError::not_found(
                "KnowledgeBase",
                cmd.knowledge_base_id,
            ));
        }
        Ok(())
    }
}

/// AddKnowledgeDocument Handler - 仅支持纯文本文档
pub struct AddKnowledgeDocumentHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    knowledge_repo: Arc<dyn KnowledgeRepositoryPort>,
}

impl AddKnowledgeDocumentHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        knowledge_repo: Arc<dyn KnowledgeRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            knowledge_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: AddKnowledgeDocument,
    ) -> Result<KnowledgeDocumentRecord, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), cmd.novel_id, &cmd.user_id).await?;
        self.knowledge_repo
            .find_base(cmd.knowledge_base_id)
            .await?
            .filter(|base| base.novel_id == cmd.novel_id)
            .ok_or_else(|| ApplicationError::not_found("KnowledgeBase", cmd.knowledge_base_id))?;

        if cmd.title.trim().is_empty() || cmd.content.trim().is_empty() {
            return Err(ApplicationError::validation(
                "Document title and content are required",
            ));
        }

        let document = KnowledgeDocumentRecord {
            id: Uuid::new_v4(),
            knowledge_base_id: cmd.knowledge_base_id,
            title: cmd.title.trim().to_string(),
            content: cmd.content,
            file_type: cmd.file_type,
            created_at: Utc::now(),
        };
        self.knowledge_repo.add_document(&document).await?;
        Ok(document)
    }
}
