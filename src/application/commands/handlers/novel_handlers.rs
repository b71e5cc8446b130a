//! Novel Command Handlers - 小说与人物

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{
    CreateCharacter, CreateNovel, DeleteCharacter, DeleteNovel, UpdateNovel,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    CharacterRecord, CharacterRepositoryPort, NovelRecord, NovelRepositoryPort,
};
use crate::application::services::load_owned_novel;

fn require_positive(field: &str, value: Option<u32>) -> Result<(), ApplicationError> {
    match value {
        Some(0) => Err(ApplicationError::validation(format!(
            "{} must be greater than 0",
            field
        ))),
        _ => Ok(()),
    }
}

// ============================================================================
// CreateNovel
// ============================================================================

/// CreateNovel Handler - 创建草稿小说
pub struct CreateNovelHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
}

impl CreateNovelHandler {
    pub fn new(novel_repo: Arc<dyn NovelRepositoryPort>) -> Self {
        Self { novel_repo }
    }

    pub async fn handle(&self, cmd: CreateNovel) -> Result<NovelRecord, ApplicationError> {
        let title = cmd.title.trim();
        if title.is_empty() {
            return Err(ApplicationError::validation("Title cannot be empty"));
        }
        require_positive("targetWords", cmd.target_words)?;
        require_positive("minChapterWords", cmd.min_chapter_words)?;

        let mut novel = NovelRecord::draft(cmd.user_id, title);
        novel.genre = cmd.genre;
        novel.style = cmd.style;
        novel.target_audience = cmd.target_audience;
        if let Some(words) = cmd.target_words {
            novel.target_words = words;
        }
        if let Some(words) = cmd.min_chapter_words {
            novel.min_chapter_words = words;
        }
        novel.background = cmd.background;
        novel.world_settings = cmd.world_settings;

        self.novel_repo.save(&novel).await?;

        tracing::info!(novel_id = %novel.id, title = %novel.title, "Novel created");

        Ok(novel)
    }
}

// ============================================================================
// UpdateNovel
// ============================================================================

pub struct UpdateNovelHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
}

impl UpdateNovelHandler {
    pub fn new(novel_repo: Arc<dyn NovelRepositoryPort>) -> Self {
        Self { novel_repo }
    }

    pub async fn handle(&self, cmd: UpdateNovel) -> Result<NovelRecord, ApplicationError> {
        let mut novel =
            load_owned_novel(self.novel_repo.as_ref(), cmd.novel_id, &cmd.user_id).await?;
        require_positive("targetWords", cmd.target_words)?;
        require_positive("minChapterWords", cmd.min_chapter_words)?;

        if let Some(title) = cmd.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ApplicationError::validation("Title cannot be empty"));
            }
            novel.title = title.to_string();
        }
        if let Some(genre) = cmd.genre {
            novel.genre = genre;
        }
        if let Some(style) = cmd.style {
            novel.style = style;
        }
        if let Some(audience) = cmd.target_audience {
            novel.target_audience = audience;
        }
        if let Some(words) = cmd.target_words {
            novel.target_words = words;
        }
        if let Some(words) = cmd.min_chapter_words {
            novel.min_chapter_words = words;
        }
        if let Some(background) = cmd.background {
            novel.background = Some(background);
        }
        if let Some(settings) = cmd.world_settings {
            novel.world_settings = Some(settings);
        }
        if let Some(status) = cmd.status {
            novel.status = status;
        }
        novel.updated_at = Utc::now();

        self.novel_repo.save(&novel).await?;
        Ok(novel)
    }
}

// ============================================================================
// DeleteNovel
// ============================================================================

/// DeleteNovel Handler - 级联删除全部下属实体（含任务记录）
pub struct DeleteNovelHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
}

impl DeleteNovelHandler {
    pub fn new(novel_repo: Arc<dyn NovelRepositoryPort>) -> Self {
        Self { novel_repo }
    }

    pub async fn handle(&self, cmd: DeleteNovel) -> Result<(), ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), cmd.novel_id, &cmd.user_id).await?;
        self.novel_repo.delete(cmd.novel_id).await?;

        tracing::info!(novel_id = %cmd.novel_id, "Novel deleted");
        Ok(())
    }
}

// ============================================================================
// Characters
// ============================================================================

pub struct CreateCharacterHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl CreateCharacterHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        character_repo: Arc<dyn CharacterRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            character_repo,
        }
    }

    pub async fn handle(&self, cmd: CreateCharacter) -> Result<CharacterRecord, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), cmd.novel_id, &cmd.user_id).await?;
        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(ApplicationError::validation("Character name cannot be empty"));
        }

        let now = Utc::now();
        let character = CharacterRecord {
            id: Uuid::new_v4(),
            novel_id: cmd.novel_id,
            name: name.to_string(),
            role: cmd.role,
            personality: cmd.personality,
            abilities: cmd.abilities,
            relationships: cmd.relationships,
            current_state: cmd.current_state,
            created_at: now,
            updated_at: now,
        };
        self.character_repo.save(&character).await?;
        Ok(character)
    }
}

pub struct DeleteCharacterHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl DeleteCharacterHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        character_repo: Arc<dyn CharacterRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            character_repo,
        }
    }

    pub async fn handle(&self, cmd: DeleteCharacter) -> Result<(), ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), cmd.novel_id, &cmd.user_id).await?;
        if !self
            .character_repo
            .delete(cmd.novel_id, cmd.character_id)
            .await?
        {
            return Err(ApplicationError::not_found("Character", cmd.character_id));
        }
        Ok(())
    }
}
