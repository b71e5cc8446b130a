//! Task Query Handlers
//!
//! 只读：重复读取同一任务返回相同结果

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    AiConfigRecord, AiConfigRepositoryPort, NovelRepositoryPort, TaskRecord, TaskStorePort,
};
use crate::application::queries::{GetTask, ListAiConfigs, ListNovelTasks};
use crate::application::services::load_owned_novel;

/// GetTask Handler
pub struct GetTaskHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    task_store: Arc<dyn TaskStorePort>,
}

impl GetTaskHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        task_store: Arc<dyn TaskStorePort>,
    ) -> Self {
        Self {
            novel_repo,
            task_store,
        }
    }

    pub async fn handle(&self, query: GetTask) -> Result<TaskRecord, ApplicationError> {
        let task = self
            .task_store
            .find_by_id(query.task_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Task", query.task_id))?;
        load_owned_novel(self.novel_repo.as_ref(), task.novel_id, &query.user_id)
            .await
            .map_err(|_| ApplicationError::not_found("Task", query.task_id))?;
        Ok(task)
    }
}

pub struct ListNovelTasksHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    task_store: Arc<dyn TaskStorePort>,
}

impl ListNovelTasksHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        task_store: Arc<dyn TaskStorePort>,
    ) -> Self {
        Self {
            novel_repo,
            task_store,
        }
    }

    pub async fn handle(&self, query: ListNovelTasks) -> Result<Vec<TaskRecord>, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), query.novel_id, &query.user_id).await?;
        Ok(self.task_store.find_by_novel(query.novel_id).await?)
    }
}

pub struct ListAiConfigsHandler {
    ai_config_repo: Arc<dyn AiConfigRepositoryPort>,
}

impl ListAiConfigsHandler {
    pub fn new(ai_config_repo: Arc<dyn AiConfigRepositoryPort>) -> Self {
        Self { ai_config_repo }
    }

    pub async fn handle(
        &self,
        query: ListAiConfigs,
    ) -> Result<Vec<AiConfigRecord>, ApplicationError> {
        Ok(self.ai_config_repo.find_by_user(&query.user_id).await?)
    }
}
