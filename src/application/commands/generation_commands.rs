//! Generation Commands - 生成任务提交 / 取消

use serde_json::Value;
use uuid::Uuid;

use crate::domain::task::TaskType;

/// 提交生成任务命令
#[derive(Debug, Clone)]
pub struct SubmitGeneration {
    pub user_id: String,
    pub novel_id: Uuid,
    pub chapter_id: Option<Uuid>,
    pub task_type: TaskType,
    pub input: Option<Value>,
}

/// 取消任务命令
#[derive(Debug, Clone)]
pub struct CancelTask {
    pub user_id: String,
    pub task_id: Uuid,
}
