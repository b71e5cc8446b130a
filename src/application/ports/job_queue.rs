//! Job Queue Port - 生成任务队列
//!
//! 一个 Job 对应一个 Task，Worker 只执行一次

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::task_store::TaskRecord;
use crate::domain::task::TaskType;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Job queue is full")]
    Full,

    #[error("Job queue is closed")]
    Closed,
}

/// 队列负载 `{taskId, novelId, chapterId?, type, input?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub task_id: Uuid,
    pub novel_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

impl From<&TaskRecord> for GenerationJob {
    fn from(task: &TaskRecord) -> Self {
        Self {
            task_id: task.id,
            novel_id: task.novel_id,
            chapter_id: task.chapter_id,
            task_type: task.task_type,
            input: task.input.clone(),
        }
    }
}

/// Job Queue Port
pub trait JobQueuePort: Send + Sync {
    /// 入队
    fn enqueue(&self, job: GenerationJob) -> Result<(), QueueError>;

    /// 标记取消（排队中的任务被跳过，运行中的任务在步骤间观察到）
    fn cancel(&self, task_id: Uuid);

    fn is_cancelled(&self, task_id: Uuid) -> bool;

    /// 任务结束后清理取消标记
    fn forget(&self, task_id: Uuid);
}
