//! Generation Command Handlers
//!
//! 创建任务记录与入队是同一个逻辑步骤：入队失败时任务记录被标记为 failed

use std::sync::Arc;

use crate::application::commands::{CancelTask, SubmitGeneration};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ChapterRepositoryPort, GenerationJob, JobQueuePort, NewTask, NovelRepositoryPort, TaskRecord,
    TaskStorePort, TaskTransition,
};
use crate::application::services::load_owned_novel;
use crate::domain::task::{
    non_blank, parse_input, ConsistencyInput, ContentInput, OutlineInput, PlanningInput,
    TaskStatus, TaskType, TitleInput,
};

/// 提交前校验任务输入的形状
fn validate_input(cmd: &SubmitGeneration) -> Result<(), ApplicationError> {
    let input = cmd.input.as_ref();
    let invalid = |e: serde_json::Error| {
        ApplicationError::validation(format!("Invalid {} input: {}", cmd.task_type, e))
    };

    match cmd.task_type {
        TaskType::Outline => {
            let parsed: OutlineInput = parse_input(input).map_err(invalid)?;
            if parsed.mode.rewrites_existing()
                && non_blank(parsed.existing_outline.as_deref()).is_none()
            {
                return Err(ApplicationError::validation(format!(
                    "existingOutline is required for mode {}",
                    parsed.mode.as_str()
                )));
            }
        }
        TaskType::Title => {
            parse_input::<TitleInput>(input).map_err(invalid)?;
        }
        TaskType::ChapterPlanning => {
            parse_input::<PlanningInput>(input).map_err(invalid)?;
        }
        TaskType::Content => {
            parse_input::<ContentInput>(input).map_err(invalid)?;
        }
        TaskType::ConsistencyCheck => {
            let parsed: ConsistencyInput = parse_input(input).map_err(invalid)?;
            if cmd.chapter_id.is_none() && non_blank(parsed.content.as_deref()).is_none() {
                return Err(ApplicationError::validation(
                    "consistency_check requires chapterId or input.content",
                ));
            }
        }
        TaskType::ChapterOutline | TaskType::ChapterDetail => {}
    }
    Ok(())
}

// ============================================================================
// SubmitGeneration
// ============================================================================

/// SubmitGeneration Handler - 创建任务并入队
pub struct SubmitGenerationHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
    task_store: Arc<dyn TaskStorePort>,
    job_queue: Arc<dyn JobQueuePort>,
}

impl SubmitGenerationHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
        task_store: Arc<dyn TaskStorePort>,
        job_queue: Arc<dyn JobQueuePort>,
    ) -> Self {
        Self {
            novel_repo,
            chapter_repo,
            task_store,
            job_queue,
        }
    }

    pub async fn handle(&self, cmd: SubmitGeneration) -> Result<TaskRecord, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), cmd.novel_id, &cmd.user_id).await?;

        if cmd.task_type.requires_chapter() && cmd.chapter_id.is_none() {
            return Err(ApplicationError::validation(format!(
                "chapterId is required for {} tasks",
                cmd.task_type
            )));
        }
        if let Some(chapter_id) = cmd.chapter_id {
            self.chapter_repo
                .find_by_id(chapter_id)
                .await?
                .filter(|chapter| chapter.novel_id == cmd.novel_id)
                .ok_or_else(|| ApplicationError::not_found("Chapter", chapter_id))?;
        }
        validate_input(&cmd)?;

        let task = self
            .task_store
            .create(NewTask {
                novel_id: cmd.novel_id,
                chapter_id: cmd.chapter_id,
                task_type: cmd.task_type,
                input: cmd.input,
            })
            .await?;

        if let Err(e) = self.job_queue.enqueue(GenerationJob::from(&task)) {
            tracing::error!(task_id = %task.id, error = %e, "Failed to enqueue task");
            let marked = self
                .task_store
                .transition(task.id, TaskTransition::failed(format!("Failed to enqueue task: {}", e)))
                .await;
            if let Err(store_err) = marked {
                tracing::error!(task_id = %task.id, error = %store_err, "Failed to mark task failed");
            }
            return Err(e.into());
        }

        tracing::info!(
            task_id = %task.id,
            novel_id = %task.novel_id,
            chapter_id = ?task.chapter_id,
            task_type = %task.task_type,
            "Generation task submitted"
        );

        Ok(task)
    }
}

// ============================================================================
// CancelTask
// ============================================================================

/// CancelTask Handler - 取消排队中或运行中的任务
pub struct CancelTaskHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    task_store: Arc<dyn TaskStorePort>,
    job_queue: Arc<dyn JobQueuePort>,
}

impl CancelTaskHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        task_store: Arc<dyn TaskStorePort>,
        job_queue: Arc<dyn JobQueuePort>,
    ) -> Self {
        Self {
            novel_repo,
            task_store,
            job_queue,
        }
    }

    pub async fn handle(&self, cmd: CancelTask) -> Result<TaskRecord, ApplicationError> {
        let task = self
            .task_store
            .find_by_id(cmd.task_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Task", cmd.task_id))?;
        load_owned_novel(self.novel_repo.as_ref(), task.novel_id, &cmd.user_id).await?;
        if task.status.is_terminal() {
            return Err(ApplicationError::invalid_state(format!(
                "Task {} is already {}",
                task.id, task.status
            )));
        }

        // 标记先于状态转换：Worker 在任何写入前都能观察到取消
        self.job_queue.cancel(task.id);
        let applied = match self
            .task_store
            .transition(task.id, TaskTransition::cancelled())
            .await
        {
            Ok(applied) => applied,
            Err(e) => {
                self.job_queue.forget(task.id);
                return Err(e.into());
            }
        };
        if !applied {
            let current = self.task_store.find_by_id(task.id).await?;
            let status = current.map(|t| t.status).unwrap_or(task.status);
            // 任务已以其他方式结束，不留下悬空标记
            if status != TaskStatus::Cancelled {
                self.job_queue.forget(task.id);
            }
            return Err(ApplicationError::invalid_state(format!(
                "Task {} is already {}",
                task.id, status
            )));
        }

        tracing::info!(task_id = %task.id, previous = %task.status, "Task cancelled");

        self.task_store
            .find_by_id(task.id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Task", task.id))
    }
}
