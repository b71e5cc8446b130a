//! Novel Query Handlers

use std::sync::Arc;

use crate::application::commands::handlers::load_owned_chapter;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ChapterRecord, ChapterRepositoryPort, CharacterRecord, CharacterRepositoryPort,
    KnowledgeBaseRecord, KnowledgeDocumentRecord, KnowledgeRepositoryPort, NovelRecord,
    NovelRepositoryPort, OutlineRepositoryPort, OutlineVersionRecord, VolumeRecord,
};
use crate::application::queries::{
    GetChapter, GetNovel, ListChapters, ListCharacters, ListKnowledgeBases,
    ListKnowledgeDocuments, ListNovels, ListOutlineVersions,
};
use crate::application::services::load_owned_novel;

// ============================================================================
// Response types
// ============================================================================

/// 卷及其章节
#[derive(Debug, Clone)]
pub struct VolumeWithChapters {
    pub volume: VolumeRecord,
    pub chapters: Vec<ChapterRecord>,
}

// ============================================================================
// Novels
// ============================================================================

/// GetNovel Handler
pub struct GetNovelHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
}

impl GetNovelHandler {
    pub fn new(novel_repo: Arc<dyn NovelRepositoryPort>) -> Self {
        Self { novel_repo }
    }

    pub async fn handle(&self, query: GetNovel) -> Result<NovelRecord, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), query.novel_id, &query.user_id).await
    }
}

/// ListNovels Handler
pub struct ListNovelsHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
}

impl ListNovelsHandler {
    pub fn new(novel_repo: Arc<dyn NovelRepositoryPort>) -> Self {
        Self { novel_repo }
    }

    pub async fn handle(&self, query: ListNovels) -> Result<Vec<NovelRecord>, ApplicationError> {
        Ok(self.novel_repo.find_by_user(&query.user_id).await?)
    }
}

pub struct ListCharactersHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl ListCharactersHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        character_repo: Arc<dyn CharacterRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            character_repo,
        }
    }

    pub async fn handle(
        &self,
        query: ListCharacters,
    ) -> Result<Vec<CharacterRecord>, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), query.novel_id, &query.user_id).await?;
        Ok(self.character_repo.find_by_novel(query.novel_id).await?)
    }
}

// ============================================================================
// Chapters
// ============================================================================

/// ListChapters Handler - 按卷序号分组，卷内按章序号排序
pub struct ListChaptersHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
}

impl ListChaptersHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            chapter_repo,
        }
    }

    pub async fn handle(
        &self,
        query: ListChapters,
    ) -> Result<Vec<VolumeWithChapters>, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), query.novel_id, &query.user_id).await?;

        let volumes = self.chapter_repo.find_volumes_by_novel(query.novel_id).await?;
        let mut chapters = self.chapter_repo.find_by_novel(query.novel_id).await?;

        Ok(volumes
            .into_iter()
            .map(|volume| {
                let (own, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut chapters)
                    .into_iter()
                    .partition(|c| c.volume_id == volume.id);
                chapters = rest;
                VolumeWithChapters {
                    volume,
                    chapters: own,
                }
            })
            .collect())
    }
}

pub struct GetChapterHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
}

impl GetChapterHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            chapter_repo,
        }
    }

    pub async fn handle(&self, query: GetChapter) -> Result<ChapterRecord, ApplicationError> {
        load_owned_chapter(
            self.novel_repo.as_ref(),
            self.chapter_repo.as_ref(),
            query.chapter_id,
            &query.user_id,
        )
        .await
    }
}

// ============================================================================
// Outline versions
// ============================================================================

pub struct ListOutlineVersionsHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    outline_repo: Arc<dyn OutlineRepositoryPort>,
}

impl ListOutlineVersionsHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        outline_repo: Arc<dyn OutlineRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            outline_repo,
        }
    }

    pub async fn handle(
        &self,
        query: ListOutlineVersions,
    ) -> Result<Vec<OutlineVersionRecord>, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), query.novel_id, &query.user_id).await?;
        Ok(self.outline_repo.find_by_novel(query.novel_id).await?)
    }
}

// ============================================================================
// Knowledge bases
// ============================================================================

pub struct ListKnowledgeBasesHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    knowledge_repo: Arc<dyn KnowledgeRepositoryPort>,
}

impl ListKnowledgeBasesHandler {
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
        query: ListKnowledgeBases,
    ) -> Result<Vec<KnowledgeBaseRecord>, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), query.novel_id, &query.user_id).await?;
        Ok(self.knowledge_repo.find_bases_by_novel(query.novel_id).await?)
    }
}

pub struct ListKnowledgeDocumentsHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    knowledge_repo: Arc<dyn KnowledgeRepositoryPort>,
}

impl ListKnowledgeDocumentsHandler {
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
        query: ListKnowledgeDocuments,
    ) -> Result<Vec<KnowledgeDocumentRecord>, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), query.novel_id, &query.user_id).await?;
        self.knowledge_repo
            .find_base(query.knowledge_base_id)
            .await?
            .filter(|base| base.novel_id == query.novel_id)
            .ok_or_else(|| ApplicationError::not_found("KnowledgeBase", query.knowledge_base_id))?;
        Ok(self.knowledge_repo.find_documents(query.knowledge_base_id).await?)
    }
}
