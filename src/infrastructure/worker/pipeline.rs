//! Generation Pipeline - 单个生成任务的执行流程
//!
//! running -> 加载上下文 -> 解析 Provider -> 按任务类型生成 -> 持久化 -> completed；
//! 任一步骤出错转为 failed，只保存错误信息文本。
//! 步骤之间检查取消标记；每次领域写入前再核对任务记录仍为 running，
//! 观察到取消时不再提交任何领域数据。

use futures_util::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::application::agents::{
    self, AgentContext, AgentOutput, ChapterDetailAgent, ChapterOutlineAgent,
    ChapterPlanningAgent, ConsistencyAgent, ContentAgent, OutlineAgent, TaskResult, TitleAgent,
    parse_titles,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ChapterRecord, ChapterRepositoryPort, GenerationJob, JobQueuePort, LlmError, LlmProviderPort,
    NewOutlineVersion, NovelRepositoryPort, OutlineRepositoryPort, RepositoryError, StreamChunk,
    TaskMetadata, TaskStorePort, TaskTransition,
};
use crate::application::services::{generation_context, ContextLoader, ProviderResolver};
use crate::domain::novel::{word_count, ChapterPlan, ConsistencyReport, NovelError};
use crate::domain::task::{
    non_blank, parse_input, ConsistencyInput, ContentInput, OutlineInput, PlanningInput,
    TaskStatus, TaskType, TitleInput,
};
use crate::domain::{extract_json, StructuredOutputError};
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::memory::ChapterLocks;

/// 进度节点
const PROGRESS_CONTEXT_LOADED: u8 = 10;
const PROGRESS_PROVIDER_READY: u8 = 20;
const PROGRESS_GENERATED: u8 = 70;
const PROGRESS_PERSISTING: u8 = 90;

/// Pipeline 错误，Display 文本即 Task.error
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Novel not found")]
    NovelNotFound,

    #[error("Chapter not found")]
    ChapterNotFound,

    #[error("Invalid task input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    MissingInput(&'static str),

    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    StructuredOutput(#[from] StructuredOutputError),

    #[error(transparent)]
    InvalidPlan(#[from] NovelError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Consistency check failed: {}", .0.join("; "))]
    ConsistencyRejected(Vec<String>),

    #[error("Task cancelled")]
    Cancelled,
}

/// 生成任务执行器
pub struct GenerationPipeline {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
    outline_repo: Arc<dyn OutlineRepositoryPort>,
    task_store: Arc<dyn TaskStorePort>,
    job_queue: Arc<dyn JobQueuePort>,
    loader: Arc<ContextLoader>,
    resolver: Arc<ProviderResolver>,
    event_publisher: Arc<EventPublisher>,
    chapter_locks: Arc<ChapterLocks>,
}

impl GenerationPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
        outline_repo: Arc<dyn OutlineRepositoryPort>,
        task_store: Arc<dyn TaskStorePort>,
        job_queue: Arc<dyn JobQueuePort>,
        loader: Arc<ContextLoader>,
        resolver: Arc<ProviderResolver>,
        event_publisher: Arc<EventPublisher>,
        chapter_locks: Arc<ChapterLocks>,
    ) -> Self {
        Self {
            novel_repo,
            chapter_repo,
            outline_repo,
            task_store,
            job_queue,
            loader,
            resolver,
            event_publisher,
            chapter_locks,
        }
    }

    /// 执行一个任务；所有错误都在这里转为任务状态，不向外抛出
    pub async fn run(&self, job: GenerationJob) {
        let task_id = job.task_id;

        // 同一章节的任务串行执行
        let guard = match job.chapter_id {
            Some(chapter_id) => Some(self.chapter_locks.acquire(chapter_id).await),
            None => None,
        };

        if self.claim(&job).await {
            tracing::info!(
                task_id = %task_id,
                novel_id = %job.novel_id,
                task_type = job.task_type.as_str(),
                "Generation task started"
            );
            self.event_publisher
                .publish_progress(task_id, TaskStatus::Running, 0);

            match self.execute(&job).await {
                Ok(result) => self.complete(&job, result).await,
                Err(PipelineError::Cancelled) => {
                    tracing::info!(task_id = %task_id, "Generation task cancelled");
                    self.event_publisher
                        .publish_progress(task_id, TaskStatus::Cancelled, 0);
                }
                Err(e) => self.fail(task_id, &e.to_string()).await,
            }
        }

        drop(guard);
        self.chapter_locks.prune();
        self.job_queue.forget(task_id);
        self.event_publisher.close_task(task_id);
    }

    /// 出队后确认任务仍可执行，并置为 running
    async fn claim(&self, job: &GenerationJob) -> bool {
        let task_id = job.task_id;

        if self.job_queue.is_cancelled(task_id) {
            tracing::debug!(task_id = %task_id, "Task cancelled, skipping");
            return false;
        }

        match self.task_store.find_by_id(task_id).await {
            Ok(Some(task)) if task.status == TaskStatus::Queued => {}
            Ok(Some(task)) => {
                tracing::debug!(
                    task_id = %task_id,
                    status = task.status.as_str(),
                    "Task no longer queued, skipping"
                );
                return false;
            }
            Ok(None) => {
                tracing::warn!(task_id = %task_id, "Task not found, skipping");
                return false;
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Failed to load task");
                return false;
            }
        }

        match self
            .task_store
            .transition(task_id, TaskTransition::running())
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!(task_id = %task_id, "Task left queued state, skipping");
                false
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Failed to mark task running");
                false
            }
        }
    }

    async fn complete(&self, job: &GenerationJob, result: TaskResult) {
        let task_id = job.task_id;
        let metadata = TaskMetadata {
            model: Some(result.model.clone()),
            tokens_used: result.tokens_used,
        };
        let value = match serde_json::to_value(&result) {
            Ok(value) => value,
            Err(e) => {
                self.fail(task_id, &format!("Failed to encode task result: {}", e))
                    .await;
                return;
            }
        };

        match self
            .task_store
            .transition(task_id, TaskTransition::completed(value.clone(), metadata))
            .await
        {
            Ok(true) => {
                tracing::info!(
                    task_id = %task_id,
                    task_type = job.task_type.as_str(),
                    model = %result.model,
                    tokens_used = ?result.tokens_used,
                    "Generation task completed"
                );
                self.event_publisher
                    .publish_progress(task_id, TaskStatus::Completed, 100);
                self.event_publisher.publish_completed(task_id, value);
                self.event_publisher.publish_novel_updated(job.novel_id);
            }
            Ok(false) => {
                tracing::warn!(task_id = %task_id, "Task left running state before completion");
                if let Ok(Some(task)) = self.task_store.find_by_id(task_id).await {
                    if task.status == TaskStatus::Cancelled {
                        self.event_publisher
                            .publish_progress(task_id, TaskStatus::Cancelled, 0);
                    }
                }
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Failed to store task result");
            }
        }
    }

    async fn fail(&self, task_id: Uuid, message: &str) {
        tracing::warn!(task_id = %task_id, error = %message, "Generation task failed");

        match self
            .task_store
            .transition(task_id, TaskTransition::failed(message))
            .await
        {
            Ok(true) => self.event_publisher.publish_failed(task_id, message),
            Ok(false) => {
                tracing::debug!(task_id = %task_id, "Task already terminal, failure not recorded");
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Failed to mark task failed");
            }
        }
    }

    /// 取消检查点
    fn checkpoint(&self, task_id: Uuid) -> Result<(), PipelineError> {
        if self.job_queue.is_cancelled(task_id) {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    /// 领域写入前的提交点：取消标记和任务记录都必须表明任务仍在运行
    async fn commit_point(&self, task_id: Uuid) -> Result<(), PipelineError> {
        self.checkpoint(task_id)?;
        match self.task_store.find_by_id(task_id).await? {
            Some(task) if task.status == TaskStatus::Running => Ok(()),
            Some(task) => {
                tracing::debug!(
                    task_id = %task_id,
                    status = task.status.as_str(),
                    "Task left running state, discarding output"
                );
                Err(PipelineError::Cancelled)
            }
            None => Err(PipelineError::Cancelled),
        }
    }

    async fn report_progress(&self, task_id: Uuid, progress: u8) {
        if let Err(e) = self.task_store.update_progress(task_id, progress).await {
            tracing::warn!(task_id = %task_id, error = %e, "Failed to update task progress");
        }
        self.event_publisher
            .publish_progress(task_id, TaskStatus::Running, progress);
    }

    async fn execute(&self, job: &GenerationJob) -> Result<TaskResult, PipelineError> {
        let task_id = job.task_id;

        let novel = self
            .novel_repo
            .find_by_id(job.novel_id)
            .await?
            .ok_or(PipelineError::NovelNotFound)?;
        let ctx = self.loader.enrich(novel).await?;
        self.checkpoint(task_id)?;
        self.report_progress(task_id, PROGRESS_CONTEXT_LOADED).await;

        let provider = self.resolver.resolve(&ctx.novel.user_id).await?;
        self.report_progress(task_id, PROGRESS_PROVIDER_READY).await;

        match job.task_type {
            TaskType::Outline => self.generate_outline(job, ctx, provider.as_ref()).await,
            TaskType::Title => self.generate_titles(job, ctx, provider.as_ref()).await,
            TaskType::ChapterPlanning => self.plan_chapters(job, ctx, provider.as_ref()).await,
            TaskType::ChapterOutline => {
                self.generate_chapter_outline(job, ctx, provider.as_ref())
                    .await
            }
            TaskType::ChapterDetail => {
                self.generate_chapter_detail(job, ctx, provider.as_ref())
                    .await
            }
            TaskType::Content => self.generate_content(job, ctx, provider.as_ref()).await,
            TaskType::ConsistencyCheck => {
                self.check_consistency(job, ctx, provider.as_ref()).await
            }
        }
    }

    // ========================================================================
    // Task types
    // ========================================================================

    async fn generate_outline(
        &self,
        job: &GenerationJob,
        ctx: AgentContext,
        provider: &dyn LlmProviderPort,
    ) -> Result<TaskResult, PipelineError> {
        let input: OutlineInput = input_of(job)?;
        let mode = input.mode;
        let agent = OutlineAgent::new(mode, input.existing_outline);

        let response = agents::execute(provider, &agent, &ctx).await?;
        self.checkpoint(job.task_id)?;
        self.report_progress(job.task_id, PROGRESS_PERSISTING).await;

        self.commit_point(job.task_id).await?;
        let version = self
            .outline_repo
            .create_next_version(NewOutlineVersion {
                novel_id: ctx.novel.id,
                content: response.content.clone(),
                mode,
                context: Some(generation_context(&ctx, mode)),
            })
            .await?;

        Ok(TaskResult {
            output: AgentOutput::Outline {
                content: response.content,
                version: version.version,
            },
            model: response.model,
            tokens_used: response.tokens_used,
        })
    }

    async fn generate_titles(
        &self,
        job: &GenerationJob,
        ctx: AgentContext,
        provider: &dyn LlmProviderPort,
    ) -> Result<TaskResult, PipelineError> {
        let input: TitleInput = input_of(job)?;
        let outline = self
            .outline_text(ctx.novel.id, input.outline.as_deref())
            .await?;

        let response = agents::execute(provider, &TitleAgent::new(outline), &ctx).await?;
        let titles = parse_titles(&response.content);

        Ok(TaskResult {
            output: AgentOutput::Titles {
                content: response.content,
                titles,
            },
            model: response.model,
            tokens_used: response.tokens_used,
        })
    }

    async fn plan_chapters(
        &self,
        job: &GenerationJob,
        ctx: AgentContext,
        provider: &dyn LlmProviderPort,
    ) -> Result<TaskResult, PipelineError> {
        let input: PlanningInput = input_of(job)?;
        let outline = self
            .outline_text(ctx.novel.id, input.outline.as_deref())
            .await?;
        let agent = ChapterPlanningAgent::new(outline, input.additional_requirements);

        let response = agents::execute(provider, &agent, &ctx).await?;
        self.report_progress(job.task_id, PROGRESS_GENERATED).await;

        // 写入前完整解析并校验
        let plan: ChapterPlan = extract_json(&response.content)?;
        plan.validate()?;
        self.commit_point(job.task_id).await?;

        let applied = self.chapter_repo.apply_plan(ctx.novel.id, &plan).await?;
        tracing::info!(
            task_id = %job.task_id,
            novel_id = %ctx.novel.id,
            volumes = applied.volumes,
            chapters = applied.chapters,
            "Chapter plan applied"
        );

        Ok(TaskResult {
            output: AgentOutput::ChapterPlan {
                content: response.content,
                plan,
                applied,
            },
            model: response.model,
            tokens_used: response.tokens_used,
        })
    }

    async fn generate_chapter_outline(
        &self,
        job: &GenerationJob,
        ctx: AgentContext,
        provider: &dyn LlmProviderPort,
    ) -> Result<TaskResult, PipelineError> {
        let chapter = self.load_chapter(job).await?;
        let ctx = ctx.with_previous_content(self.previous_content(&chapter).await?);
        let agent = ChapterOutlineAgent {
            order: chapter.order,
            title: chapter.title.clone(),
            summary: chapter.outline.clone(),
        };

        let response = agents::execute(provider, &agent, &ctx).await?;
        self.commit_point(job.task_id).await?;
        self.chapter_repo
            .update_outline(chapter.id, &response.content)
            .await?;

        Ok(TaskResult {
            output: AgentOutput::ChapterOutline {
                content: response.content,
            },
            model: response.model,
            tokens_used: response.tokens_used,
        })
    }

    async fn generate_chapter_detail(
        &self,
        job: &GenerationJob,
        ctx: AgentContext,
        provider: &dyn LlmProviderPort,
    ) -> Result<TaskResult, PipelineError> {
        let chapter = self.load_chapter(job).await?;
        let outline = non_blank(chapter.outline.as_deref())
            .ok_or(PipelineError::MissingInput(
                "Chapter has no outline; generate the chapter outline first",
            ))?
            .to_string();

        let response =
            agents::execute(provider, &ChapterDetailAgent { outline }, &ctx).await?;
        self.commit_point(job.task_id).await?;
        self.chapter_repo
            .update_detail_outline(chapter.id, &response.content)
            .await?;

        Ok(TaskResult {
            output: AgentOutput::ChapterDetail {
                content: response.content,
            },
            model: response.model,
            tokens_used: response.tokens_used,
        })
    }

    async fn generate_content(
        &self,
        job: &GenerationJob,
        ctx: AgentContext,
        provider: &dyn LlmProviderPort,
    ) -> Result<TaskResult, PipelineError> {
        let task_id = job.task_id;
        let input: ContentInput = input_of(job)?;
        let chapter = self.load_chapter(job).await?;

        // 修改后的大纲 > 细纲 > 大纲 > 标题
        let outline = non_blank(input.modified_outline.as_deref())
            .or_else(|| non_blank(chapter.detail_outline.as_deref()))
            .or_else(|| non_blank(chapter.outline.as_deref()))
            .unwrap_or(&chapter.title)
            .to_string();
        let ctx = ctx.with_previous_content(self.previous_content(&chapter).await?);
        let agent = ContentAgent::new(outline, input.additional_instructions);

        let mut stream = agents::execute_stream(provider, &agent, &ctx);
        let mut content = String::new();
        let mut stream_tokens = None;
        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::Text(text) => {
                    self.checkpoint(task_id)?;
                    self.event_publisher.publish_chunk(task_id, &text);
                    content.push_str(&text);
                }
                StreamChunk::Finished { tokens_used } => {
                    stream_tokens = tokens_used;
                    break;
                }
            }
        }
        self.checkpoint(task_id)?;
        self.report_progress(task_id, PROGRESS_GENERATED).await;

        let review = agents::execute(provider, &ConsistencyAgent::new(content.clone()), &ctx).await?;
        let report: ConsistencyReport = extract_json(&review.content)?;
        if !report.passed {
            return Err(PipelineError::ConsistencyRejected(report.issues));
        }
        self.checkpoint(task_id)?;
        self.report_progress(task_id, PROGRESS_PERSISTING).await;

        let words = u32::try_from(word_count(&content)).unwrap_or(u32::MAX);
        self.commit_point(task_id).await?;
        self.chapter_repo
            .complete_content(chapter.id, &content, words)
            .await?;

        Ok(TaskResult {
            output: AgentOutput::Content {
                content,
                word_count: words,
                consistency: Some(report),
            },
            model: provider.model().to_string(),
            tokens_used: sum_tokens(stream_tokens, review.tokens_used),
        })
    }

    async fn check_consistency(
        &self,
        job: &GenerationJob,
        ctx: AgentContext,
        provider: &dyn LlmProviderPort,
    ) -> Result<TaskResult, PipelineError> {
        let input: ConsistencyInput = input_of(job)?;
        let content = match non_blank(input.content.as_deref()) {
            Some(content) => content.to_string(),
            None => {
                let chapter = self.load_chapter(job).await?;
                non_blank(chapter.content.as_deref())
                    .ok_or(PipelineError::MissingInput("Chapter has no content to check"))?
                    .to_string()
            }
        };

        let response = agents::execute(provider, &ConsistencyAgent::new(content), &ctx).await?;
        let report: ConsistencyReport = extract_json(&response.content)?;

        Ok(TaskResult {
            output: AgentOutput::Consistency {
                content: response.content,
                report,
            },
            model: response.model,
            tokens_used: response.tokens_used,
        })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load_chapter(&self, job: &GenerationJob) -> Result<ChapterRecord, PipelineError> {
        let chapter_id = job.chapter_id.ok_or(PipelineError::ChapterNotFound)?;
        self.chapter_repo
            .find_by_id(chapter_id)
            .await?
            .filter(|chapter| chapter.novel_id == job.novel_id)
            .ok_or(PipelineError::ChapterNotFound)
    }

    async fn previous_content(
        &self,
        chapter: &ChapterRecord,
    ) -> Result<Option<String>, PipelineError> {
        Ok(self
            .chapter_repo
            .find_previous(chapter)
            .await?
            .and_then(|previous| previous.content))
    }

    /// 任务输入中的大纲，缺省时取最新大纲版本
    async fn outline_text(
        &self,
        novel_id: Uuid,
        supplied: Option<&str>,
    ) -> Result<String, PipelineError> {
        if let Some(outline) = non_blank(supplied) {
            return Ok(outline.to_string());
        }
        self.outline_repo
            .find_latest(novel_id)
            .await?
            .map(|version| version.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(PipelineError::MissingInput(
                "No outline available; generate an outline first",
            ))
    }
}

fn input_of<T>(job: &GenerationJob) -> Result<T, PipelineError>
where
    T: serde::de::DeserializeOwned + Default,
{
    parse_input(job.input.as_ref()).map_err(|e| PipelineError::InvalidInput(e.to_string()))
}

fn sum_tokens(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        NewTask, NovelRecord, ProviderConfig, ProviderKind, TaskRecord,
    };
    use crate::domain::novel::ChapterStatus;
    use crate::infrastructure::adapters::{FakeLlmFactory, FakeLlmProvider, FakeReply};
    use crate::infrastructure::events::WsEvent;
    use crate::infrastructure::memory::InMemoryJobQueue;
    use crate::infrastructure::persistence::{
        create_pool, run_migrations, DatabaseConfig, SqliteAiConfigRepository,
        SqliteChapterRepository, SqliteCharacterRepository, SqliteKnowledgeRepository,
        SqliteNovelRepository, SqliteOutlineRepository, SqliteTaskStore,
    };
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    struct Harness {
        pipeline: GenerationPipeline,
        novel_repo: Arc<SqliteNovelRepository>,
        chapter_repo: Arc<SqliteChapterRepository>,
        outline_repo: Arc<SqliteOutlineRepository>,
        task_store: Arc<SqliteTaskStore>,
        queue: Arc<InMemoryJobQueue>,
        events: Arc<EventPublisher>,
        provider: Arc<FakeLlmProvider>,
        factory: Arc<FakeLlmFactory>,
        novel: NovelRecord,
        _rx: mpsc::Receiver<GenerationJob>,
    }

    async fn harness(replies: Vec<FakeReply>, fallback: Option<ProviderConfig>) -> Harness {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let novel_repo = Arc::new(SqliteNovelRepository::new(pool.clone()));
        let chapter_repo = Arc::new(SqliteChapterRepository::new(pool.clone()));
        let outline_repo = Arc::new(SqliteOutlineRepository::new(pool.clone()));
        let task_store = Arc::new(SqliteTaskStore::new(pool.clone()));
        let (queue, rx) = InMemoryJobQueue::new(8);
        let queue = Arc::new(queue);
        let events = EventPublisher::new(64).arc();
        let provider = Arc::new(FakeLlmProvider::new(replies));
        let factory = Arc::new(FakeLlmFactory::new(provider.clone()));

        let loader = Arc::new(ContextLoader::new(
            novel_repo.clone(),
            Arc::new(SqliteCharacterRepository::new(pool.clone())),
            Arc::new(SqliteKnowledgeRepository::new(pool.clone())),
        ));
        let resolver = Arc::new(ProviderResolver::new(
            Arc::new(SqliteAiConfigRepository::new(pool.clone())),
            factory.clone(),
            fallback,
        ));

        let novel = NovelRecord::draft("alice", "长夜");
        novel_repo.save(&novel).await.unwrap();

        let pipeline = GenerationPipeline::new(
            novel_repo.clone(),
            chapter_repo.clone(),
            outline_repo.clone(),
            task_store.clone(),
            queue.clone(),
            loader,
            resolver,
            events.clone(),
            Arc::new(ChapterLocks::new()),
        );

        Harness {
            pipeline,
            novel_repo,
            chapter_repo,
            outline_repo,
            task_store,
            queue,
            events,
            provider,
            factory,
            novel,
            _rx: rx,
        }
    }

    fn env_config() -> Option<ProviderConfig> {
        Some(ProviderConfig::new(ProviderKind::OpenAi, "fake-model", "sk-env"))
    }

    impl Harness {
        async fn submit(
            &self,
            task_type: TaskType,
            chapter_id: Option<Uuid>,
            input: Option<Value>,
        ) -> TaskRecord {
            self.task_store
                .create(NewTask {
                    novel_id: self.novel.id,
                    chapter_id,
                    task_type,
                    input,
                })
                .await
                .unwrap()
        }

        async fn run(&self, task: &TaskRecord) -> TaskRecord {
            self.pipeline.run(GenerationJob::from(task)).await;
            self.task_store.find_by_id(task.id).await.unwrap().unwrap()
        }

        async fn planned_chapter(&self) -> ChapterRecord {
            let plan = ChapterPlan {
                volumes: vec![crate::domain::novel::PlannedVolume {
                    title: "第一卷".into(),
                    chapters: vec![crate::domain::novel::PlannedChapter {
                        title: "开端".into(),
                        summary: "主角离家".into(),
                    }],
                }],
            };
            self.chapter_repo
                .apply_plan(self.novel.id, &plan)
                .await
                .unwrap();
            self.chapter_repo
                .find_by_novel(self.novel.id)
                .await
                .unwrap()
                .remove(0)
        }
    }

    #[tokio::test]
    async fn test_outline_task_creates_first_version() {
        let h = harness(vec![FakeReply::text("第一幕：出发")], env_config()).await;
        let task = h.submit(TaskType::Outline, None, None).await;
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.progress, 0);

        let done = h.run(&task).await;
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.progress, 100);
        assert_eq!(done.result.as_ref().unwrap()["version"], 1);

        let versions = h.outline_repo.find_by_novel(h.novel.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, 1);
        assert_eq!(versions[0].content, "第一幕：出发");

        let novel = h.novel_repo.find_by_id(h.novel.id).await.unwrap().unwrap();
        assert_eq!(novel.current_outline_version, 1);
    }

    #[tokio::test]
    async fn test_rejected_consistency_keeps_chapter_content() {
        let h = harness(
            vec![
                FakeReply::Chunks(vec!["夜".into(), "色".into()]),
                FakeReply::text(r#"{"passed": false, "issues": ["时间线矛盾"]}"#),
            ],
            env_config(),
        )
        .await;
        let chapter = h.planned_chapter().await;
        let task = h.submit(TaskType::Content, Some(chapter.id), None).await;

        let done = h.run(&task).await;
        assert_eq!(done.status, TaskStatus::Failed);
        assert!(done.error.as_deref().unwrap().contains("时间线矛盾"));

        let after = h.chapter_repo.find_by_id(chapter.id).await.unwrap().unwrap();
        assert_eq!(after.content, chapter.content);
        assert_eq!(after.status, ChapterStatus::Pending);
    }

    #[tokio::test]
    async fn test_content_task_persists_character_count() {
        let h = harness(
            vec![
                FakeReply::Chunks(vec!["天地".into(), "玄黄，".into(), "ab".into()]),
                FakeReply::text("```json\n{\"passed\": true, \"issues\": []}\n```"),
            ],
            env_config(),
        )
        .await;
        let chapter = h.planned_chapter().await;
        let task = h
            .submit(
                TaskType::Content,
                Some(chapter.id),
                Some(json!({"modifiedOutline": "改写的大纲"})),
            )
            .await;

        let done = h.run(&task).await;
        assert_eq!(done.status, TaskStatus::Completed);

        let after = h.chapter_repo.find_by_id(chapter.id).await.unwrap().unwrap();
        assert_eq!(after.content.as_deref(), Some("天地玄黄，ab"));
        assert_eq!(after.word_count, 7);
        assert_eq!(after.status, ChapterStatus::Completed);

        // 修改后的大纲优先于章节自带大纲
        let content_prompt = &h.provider.requests()[0][1].content;
        assert!(content_prompt.contains("改写的大纲"));
    }

    #[tokio::test]
    async fn test_planning_task_orders_volumes_and_chapters() {
        let plan = json!({
            "volumes": [
                {"title": "卷一", "chapters": [
                    {"title": "一", "summary": "a"},
                    {"title": "二", "summary": "b"},
                    {"title": "三", "summary": "c"}
                ]},
                {"title": "卷二", "chapters": [
                    {"title": "四", "summary": "d"},
                    {"title": "五", "summary": "e"}
                ]}
            ]
        });
        let h = harness(vec![FakeReply::text(plan.to_string())], env_config()).await;
        let task = h
            .submit(
                TaskType::ChapterPlanning,
                None,
                Some(json!({"outline": "大纲"})),
            )
            .await;

        let done = h.run(&task).await;
        assert_eq!(done.status, TaskStatus::Completed);

        let volumes = h.chapter_repo.find_volumes_by_novel(h.novel.id).await.unwrap();
        assert_eq!(volumes.iter().map(|v| v.order).collect::<Vec<_>>(), vec![1, 2]);

        let chapters = h.chapter_repo.find_by_novel(h.novel.id).await.unwrap();
        assert_eq!(chapters.len(), 5);
        assert_eq!(
            chapters.iter().map(|c| c.order).collect::<Vec<_>>(),
            vec![1, 2, 3, 1, 2]
        );
        assert!(chapters.iter().all(|c| c.status == ChapterStatus::Pending));
        assert_eq!(chapters[0].outline.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_malformed_plan_writes_nothing() {
        let h = harness(vec![FakeReply::text("抱歉，无法生成")], env_config()).await;
        let task = h
            .submit(
                TaskType::ChapterPlanning,
                None,
                Some(json!({"outline": "大纲"})),
            )
            .await;

        let done = h.run(&task).await;
        assert_eq!(done.status, TaskStatus::Failed);
        assert!(h
            .chapter_repo
            .find_volumes_by_novel(h.novel.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_missing_configuration_fails_without_provider_call() {
        let h = harness(vec![FakeReply::text("不会用到")], None).await;
        let task = h.submit(TaskType::Outline, None, None).await;

        let done = h.run(&task).await;
        assert_eq!(done.status, TaskStatus::Failed);
        assert!(done
            .error
            .as_deref()
            .unwrap()
            .contains("No AI configuration found"));
        assert_eq!(h.factory.created_count(), 0);
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_chunks_in_order() {
        let h = harness(
            vec![
                FakeReply::Chunks(vec!["一".into(), "二".into(), "三".into()]),
                FakeReply::text(r#"{"passed": true}"#),
            ],
            env_config(),
        )
        .await;
        let chapter = h.planned_chapter().await;
        let task = h.submit(TaskType::Content, Some(chapter.id), None).await;

        let mut first = h.events.subscribe_task(task.id);
        let mut second = h.events.subscribe_task(task.id);
        h.run(&task).await;

        for rx in [&mut first, &mut second] {
            let mut chunks = Vec::new();
            let mut completed = false;
            while let Ok(event) = rx.recv().await {
                match event {
                    WsEvent::TaskChunk { chunk, .. } => chunks.push(chunk),
                    WsEvent::TaskCompleted { .. } => completed = true,
                    _ => {}
                }
            }
            assert_eq!(chunks, vec!["一", "二", "三"]);
            assert!(completed);
        }
        assert_eq!(h.events.task_channel_count(), 0);
    }

    #[tokio::test]
    async fn test_job_for_deleted_novel_is_skipped() {
        let h = harness(vec![], env_config()).await;
        let task = h.submit(TaskType::Title, None, None).await;
        h.novel_repo.delete(h.novel.id).await.unwrap();

        // 级联删除后任务行也不存在
        h.pipeline.run(GenerationJob::from(&task)).await;
        assert!(h.task_store.find_by_id(task.id).await.unwrap().is_none());
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_title_task_without_outline_fails() {
        let h = harness(vec![], env_config()).await;
        let task = h.submit(TaskType::Title, None, None).await;

        let done = h.run(&task).await;
        assert_eq!(done.status, TaskStatus::Failed);
        assert!(done.error.as_deref().unwrap().contains("No outline available"));
    }

    #[tokio::test]
    async fn test_title_task_uses_latest_outline() {
        let h = harness(vec![FakeReply::text("1. 《星海》\n2. 夜航")], env_config()).await;
        h.outline_repo
            .create_next_version(NewOutlineVersion {
                novel_id: h.novel.id,
                content: "最新的大纲".into(),
                mode: Default::default(),
                context: None,
            })
            .await
            .unwrap();
        let task = h.submit(TaskType::Title, None, None).await;

        let done = h.run(&task).await;
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.result.unwrap()["titles"], json!(["星海", "夜航"]));
        assert!(h.provider.requests()[0][1].content.contains("最新的大纲"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_is_skipped() {
        let h = harness(vec![FakeReply::text("不会用到")], env_config()).await;
        let task = h.submit(TaskType::Outline, None, None).await;
        h.task_store
            .transition(task.id, TaskTransition::cancelled())
            .await
            .unwrap();
        h.queue.cancel(task.id);

        let done = h.run(&task).await;
        assert_eq!(done.status, TaskStatus::Cancelled);
        assert_eq!(h.provider.call_count(), 0);
        assert!(!h.queue.is_cancelled(task.id));
    }

    #[tokio::test]
    async fn test_chapter_outline_updates_chapter() {
        let h = harness(vec![FakeReply::text("详细大纲")], env_config()).await;
        let chapter = h.planned_chapter().await;
        let task = h
            .submit(TaskType::ChapterOutline, Some(chapter.id), None)
            .await;

        let done = h.run(&task).await;
        assert_eq!(done.status, TaskStatus::Completed);
        let after = h.chapter_repo.find_by_id(chapter.id).await.unwrap().unwrap();
        assert_eq!(after.outline.as_deref(), Some("详细大纲"));
    }

    #[tokio::test]
    async fn test_provider_error_fails_task() {
        let h = harness(
            vec![FakeReply::FailAfter(vec!["半".into()], "rate limited".into())],
            env_config(),
        )
        .await;
        let chapter = h.planned_chapter().await;
        let task = h.submit(TaskType::Content, Some(chapter.id), None).await;

        let done = h.run(&task).await;
        assert_eq!(done.status, TaskStatus::Failed);
        assert!(done.error.as_deref().unwrap().contains("rate limited"));
        let after = h.chapter_repo.find_by_id(chapter.id).await.unwrap().unwrap();
        assert!(after.content.is_none());
    }

    /// 运行任务，同时在收到第一个正文片段时执行 `on_first_chunk`，返回观察到的事件
    async fn run_with_interruption<F, Fut>(
        h: &Harness,
        task: &TaskRecord,
        on_first_chunk: F,
    ) -> Vec<WsEvent>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let mut rx = h.events.subscribe_task(task.id);
        let watcher = async move {
            let mut seen = Vec::new();
            let mut on_first_chunk = Some(on_first_chunk);
            while let Ok(event) = rx.recv().await {
                let is_chunk = matches!(event, WsEvent::TaskChunk { .. });
                seen.push(event);
                if is_chunk {
                    if let Some(action) = on_first_chunk.take() {
                        action().await;
                    }
                }
            }
            seen
        };
        let (_, seen) = tokio::join!(h.pipeline.run(GenerationJob::from(task)), watcher);
        seen
    }

    fn content_replies() -> Vec<FakeReply> {
        vec![
            FakeReply::Chunks(vec![
                "一".into(),
                "二".into(),
                "三".into(),
                "四".into(),
                "五".into(),
            ]),
            FakeReply::text(r#"{"passed": true}"#),
        ]
    }

    fn saw_cancelled(events: &[WsEvent]) -> bool {
        events.iter().any(|e| {
            matches!(
                e,
                WsEvent::TaskProgress {
                    status: TaskStatus::Cancelled,
                    ..
                }
            )
        })
    }

    #[tokio::test]
    async fn test_cancel_flag_mid_stream_discards_content() {
        let h = harness(content_replies(), env_config()).await;
        let chapter = h.planned_chapter().await;
        let task = h.submit(TaskType::Content, Some(chapter.id), None).await;

        let queue = h.queue.clone();
        let task_store = h.task_store.clone();
        let task_id = task.id;
        let events = run_with_interruption(&h, &task, move || async move {
            queue.cancel(task_id);
            task_store
                .transition(task_id, TaskTransition::cancelled())
                .await
                .unwrap();
        })
        .await;

        let done = h.task_store.find_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Cancelled);
        assert!(done.result.is_none());

        let after = h.chapter_repo.find_by_id(chapter.id).await.unwrap().unwrap();
        assert!(after.content.is_none());
        assert_eq!(after.status, ChapterStatus::Pending);

        // 只有第一个片段被推送，之后不再推送片段
        let chunks = events
            .iter()
            .filter(|e| matches!(e, WsEvent::TaskChunk { .. }))
            .count();
        assert_eq!(chunks, 1);
        assert!(saw_cancelled(&events));
        assert!(!events.iter().any(|e| matches!(e, WsEvent::TaskCompleted { .. })));
        assert!(!h.queue.is_cancelled(task.id));
    }

    #[tokio::test]
    async fn test_cancelled_task_row_blocks_content_write() {
        let h = harness(content_replies(), env_config()).await;
        let chapter = h.planned_chapter().await;
        let task = h.submit(TaskType::Content, Some(chapter.id), None).await;

        // 只改任务记录，不设置取消标记
        let task_store = h.task_store.clone();
        let task_id = task.id;
        let events = run_with_interruption(&h, &task, move || async move {
            assert!(task_store
                .transition(task_id, TaskTransition::cancelled())
                .await
                .unwrap());
        })
        .await;

        let done = h.task_store.find_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Cancelled);

        let after = h.chapter_repo.find_by_id(chapter.id).await.unwrap().unwrap();
        assert!(after.content.is_none());
        assert_eq!(after.word_count, chapter.word_count);
        assert_eq!(after.status, ChapterStatus::Pending);

        assert!(saw_cancelled(&events));
        assert!(!events.iter().any(|e| matches!(e, WsEvent::TaskCompleted { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_task_row_blocks_outline_version() {
        let h = harness(vec![FakeReply::text("第一幕")], env_config()).await;
        let task = h.submit(TaskType::Outline, None, None).await;
        assert!(h
            .task_store
            .transition(task.id, TaskTransition::running())
            .await
            .unwrap());
        assert!(h
            .task_store
            .transition(task.id, TaskTransition::cancelled())
            .await
            .unwrap());

        // 直接执行，跳过出队时的状态确认
        let result = h.pipeline.execute(&GenerationJob::from(&task)).await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(h
            .outline_repo
            .find_by_novel(h.novel.id)
            .await
            .unwrap()
            .is_empty());
    }
}
