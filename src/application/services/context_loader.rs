//! Agent 上下文加载

use std::sync::Arc;
use uuid::Uuid;

use crate::application::agents::AgentContext;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    CharacterRepositoryPort, KnowledgeRepositoryPort, NovelRecord, NovelRepositoryPort,
    RepositoryError,
};

pub struct ContextLoader {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    character_repo: Arc<dyn CharacterRepositoryPort>,
    knowledge_repo: Arc<dyn KnowledgeRepositoryPort>,
}

impl ContextLoader {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        character_repo: Arc<dyn CharacterRepositoryPort>,
        knowledge_repo: Arc<dyn KnowledgeRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            character_repo,
            knowledge_repo,
        }
    }

    /// 为已加载的小说补充人物和知识库
    pub async fn enrich(&self, novel: NovelRecord) -> Result<AgentContext, RepositoryError> {
        let characters = self.character_repo.find_by_novel(novel.id).await?;
        let knowledge = self.knowledge_repo.flattened_texts(novel.id).await?;
        Ok(AgentContext::new(novel)
            .with_characters(characters)
            .with_knowledge(knowledge))
    }

    /// 加载属于该用户的小说上下文
    pub async fn load_owned(
        &self,
        novel_id: Uuid,
        user_id: &str,
    ) -> Result<AgentContext, ApplicationError> {
        let novel = load_owned_novel(self.novel_repo.as_ref(), novel_id, user_id).await?;
        Ok(self.enrich(novel).await?)
    }
}

/// 读取小说并校验归属；不属于该用户时视为不存在
pub async fn load_owned_novel(
    novel_repo: &dyn NovelRepositoryPort,
    novel_id: Uuid,
    user_id: &str,
) -> Result<NovelRecord, ApplicationError> {
    novel_repo
        .find_by_id(novel_id)
        .await?
        .filter(|novel| novel.user_id == user_id)
        .ok_or_else(|| ApplicationError::not_found("Novel", novel_id))
}
