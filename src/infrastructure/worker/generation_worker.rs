//! Generation Worker - 后台生成任务消费者

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use super::pipeline::GenerationPipeline;
use crate::application::ports::{
    GenerationJob, JobQueuePort, QueueError, RepositoryError, TaskStorePort, TaskTransition,
};
use crate::domain::task::TaskStatus;

/// 重启时中断任务的错误信息
pub const INTERRUPTED_BY_RESTART: &str = "Task interrupted by server restart";

/// Worker 配置
#[derive(Debug, Clone)]
pub struct GenerationWorkerConfig {
    /// 最大并发任务数
    pub max_concurrent: usize,
}

impl Default for GenerationWorkerConfig {
    fn default() -> Self {
        Self { max_concurrent: 2 }
    }
}

/// 启动恢复结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub interrupted: usize,
    pub requeued: usize,
}

/// 生成 Worker
///
/// 从队列消费任务，每个任务在独立的 tokio 任务中执行，semaphore 控制并发
pub struct GenerationWorker {
    config: GenerationWorkerConfig,
    queue_receiver: mpsc::Receiver<GenerationJob>,
    pipeline: Arc<GenerationPipeline>,
}

impl GenerationWorker {
    pub fn new(
        config: GenerationWorkerConfig,
        queue_receiver: mpsc::Receiver<GenerationJob>,
        pipeline: Arc<GenerationPipeline>,
    ) -> Self {
        Self {
            config,
            queue_receiver,
            pipeline,
        }
    }

    /// 启动 Worker，队列关闭后返回
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent,
            "GenerationWorker started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));

        while let Some(job) = self.queue_receiver.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Failed to acquire semaphore permit");
                    continue;
                }
            };

            let pipeline = self.pipeline.clone();
            tokio::spawn(async move {
                let _permit = permit; // 持有 permit 直到任务完成
                pipeline.run(job).await;
            });
        }

        tracing::info!("GenerationWorker stopped");
    }
}

/// 启动恢复：running 的任务标记为失败，queued 的任务重新入队
pub async fn recover_tasks(
    task_store: &dyn TaskStorePort,
    job_queue: &dyn JobQueuePort,
) -> Result<RecoveryReport, RepositoryError> {
    let mut report = RecoveryReport::default();

    for task in task_store.find_by_status(TaskStatus::Running).await? {
        if task_store
            .transition(task.id, TaskTransition::failed(INTERRUPTED_BY_RESTART))
            .await?
        {
            report.interrupted += 1;
        }
    }

    for task in task_store.find_by_status(TaskStatus::Queued).await? {
        match job_queue.enqueue(GenerationJob::from(&task)) {
            Ok(()) => report.requeued += 1,
            Err(QueueError::Full) => {
                tracing::warn!(
                    task_id = %task.id,
                    "Queue full during recovery, marking task failed"
                );
                task_store
                    .transition(task.id, TaskTransition::failed(QueueError::Full.to_string()))
                    .await?;
            }
            Err(QueueError::Closed) => break,
        }
    }

    if report.interrupted > 0 || report.requeued > 0 {
        tracing::info!(
            interrupted = report.interrupted,
            requeued = report.requeued,
            "Recovered tasks from previous run"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{NewTask, NovelRecord, NovelRepositoryPort};
    use crate::domain::task::TaskType;
    use crate::infrastructure::memory::InMemoryJobQueue;
    use crate::infrastructure::persistence::{
        create_pool, run_migrations, DatabaseConfig, SqliteNovelRepository, SqliteTaskStore,
    };

    #[tokio::test]
    async fn test_recover_tasks() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let novel = NovelRecord::draft("alice", "长夜");
        SqliteNovelRepository::new(pool.clone())
            .save(&novel)
            .await
            .unwrap();

        let store = SqliteTaskStore::new(pool);
        let new_task = || NewTask {
            novel_id: novel.id,
            chapter_id: None,
            task_type: TaskType::Outline,
            input: None,
        };
        let interrupted = store.create(new_task()).await.unwrap();
        store
            .transition(interrupted.id, TaskTransition::running())
            .await
            .unwrap();
        let waiting = store.create(new_task()).await.unwrap();
        let finished = store.create(new_task()).await.unwrap();
        store
            .transition(finished.id, TaskTransition::cancelled())
            .await
            .unwrap();

        let (queue, mut rx) = InMemoryJobQueue::new(8);
        let report = recover_tasks(&store, &queue).await.unwrap();
        assert_eq!(
            report,
            RecoveryReport {
                interrupted: 1,
                requeued: 1
            }
        );

        let task = store.find_by_id(interrupted.id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some(INTERRUPTED_BY_RESTART));

        assert_eq!(rx.recv().await.unwrap().task_id, waiting.id);
        assert!(rx.try_recv().is_err());
    }
}
