//! Task Store Port - 生成任务记录
//!
//! 任务记录是持久化的单一事实来源，具体实现在 infrastructure/persistence 层

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::repositories::RepositoryError;
use crate::domain::task::{TaskStatus, TaskType};

/// 任务元数据（模型名、token 用量）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

/// 任务记录
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub chapter_id: Option<Uuid>,
    pub task_type: TaskType,
    pub status: TaskStatus,
    /// 0-100
    pub progress: u8,
    /// 提交时的任务输入（用于重启后重建队列）
    pub input: Option<Value>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub metadata: Option<TaskMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建任务
#[derive(Debug, Clone)]
pub struct NewTask {
    pub novel_id: Uuid,
    pub chapter_id: Option<Uuid>,
    pub task_type: TaskType,
    pub input: Option<Value>,
}

/// 状态迁移
#[derive(Debug, Clone)]
pub struct TaskTransition {
    pub status: TaskStatus,
    pub progress: Option<u8>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub metadata: Option<TaskMetadata>,
}

impl TaskTransition {
    pub fn running() -> Self {
        Self {
            status: TaskStatus::Running,
            progress: Some(0),
            result: None,
            error: None,
            metadata: None,
        }
    }

    pub fn completed(result: Value, metadata: TaskMetadata) -> Self {
        Self {
            status: TaskStatus::Completed,
            progress: Some(100),
            result: Some(result),
            error: None,
            metadata: Some(metadata),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            progress: None,
            result: None,
            error: Some(error.into()),
            metadata: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: TaskStatus::Cancelled,
            progress: None,
            result: None,
            error: None,
            metadata: None,
        }
    }
}

/// Task Store Port
#[async_trait]
pub trait TaskStorePort: Send + Sync {
    /// 创建任务：status=queued, progress=0
    async fn create(&self, task: NewTask) -> Result<TaskRecord, RepositoryError>;

    /// 执行状态迁移
    ///
    /// 仅当当前状态允许迁移到目标状态时生效，返回是否生效。
    /// 终态不会被重新打开。
    async fn transition(
        &self,
        id: Uuid,
        transition: TaskTransition,
    ) -> Result<bool, RepositoryError>;

    /// 更新运行中任务的进度
    async fn update_progress(&self, id: Uuid, progress: u8) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TaskRecord>, RepositoryError>;

    /// 按创建时间倒序
    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<TaskRecord>, RepositoryError>;

    /// 按创建时间正序
    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<TaskRecord>, RepositoryError>;
}
