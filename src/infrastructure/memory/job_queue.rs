//! In-Memory Job Queue Implementation
//!
//! 有界 mpsc 通道 + 取消标记表。任务记录表才是持久化的事实来源，
//! 进程重启后由 Worker 根据任务表重建队列。

use dashmap::DashSet;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::application::ports::{GenerationJob, JobQueuePort, QueueError};

/// 内存任务队列
pub struct InMemoryJobQueue {
    /// 任务队列发送端
    sender: mpsc::Sender<GenerationJob>,
    /// 已取消的 task_id
    cancelled: DashSet<Uuid>,
}

impl InMemoryJobQueue {
    /// 创建队列，返回消费端交给 Worker
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<GenerationJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let queue = Self {
            sender,
            cancelled: DashSet::new(),
        };
        (queue, receiver)
    }
}

impl JobQueuePort for InMemoryJobQueue {
    fn enqueue(&self, job: GenerationJob) -> Result<(), QueueError> {
        let task_id = job.task_id;
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Closed(_) => QueueError::Closed,
        })?;

        tracing::debug!(task_id = %task_id, "Job enqueued");
        Ok(())
    }

    fn cancel(&self, task_id: Uuid) {
        self.cancelled.insert(task_id);
        tracing::debug!(task_id = %task_id, "Job cancellation requested");
    }

    fn is_cancelled(&self, task_id: Uuid) -> bool {
        self.cancelled.contains(&task_id)
    }

    fn forget(&self, task_id: Uuid) {
        self.cancelled.remove(&task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::TaskType;

    fn job() -> GenerationJob {
        GenerationJob {
            task_id: Uuid::new_v4(),
            novel_id: Uuid::new_v4(),
            chapter_id: None,
            task_type: TaskType::Title,
            input: None,
        }
    }

    #[tokio::test]
    async fn test_enqueue_in_order() {
        let (queue, mut rx) = InMemoryJobQueue::new(4);
        let first = job();
        let second = job();
        queue.enqueue(first.clone()).unwrap();
        queue.enqueue(second.clone()).unwrap();

        assert_eq!(rx.recv().await.unwrap(), first);
        assert_eq!(rx.recv().await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_full_and_closed() {
        let (queue, rx) = InMemoryJobQueue::new(1);
        queue.enqueue(job()).unwrap();
        assert!(matches!(queue.enqueue(job()), Err(QueueError::Full)));

        drop(rx);
        assert!(matches!(queue.enqueue(job()), Err(QueueError::Closed)));
    }

    #[test]
    fn test_cancel_flags() {
        let (queue, _rx) = InMemoryJobQueue::new(1);
        let id = Uuid::new_v4();
        assert!(!queue.is_cancelled(id));

        queue.cancel(id);
        assert!(queue.is_cancelled(id));

        queue.forget(id);
        assert!(!queue.is_cancelled(id));
    }
}
