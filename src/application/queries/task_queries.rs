//! Task Queries - 任务轮询 / AI 配置

use uuid::Uuid;

/// 按 ID 读取任务（轮询兜底）
#[derive(Debug, Clone)]
pub struct GetTask {
    pub user_id: String,
    pub task_id: Uuid,
}

/// 小说的全部任务（新任务在前）
#[derive(Debug, Clone)]
pub struct ListNovelTasks {
    pub user_id: String,
    pub novel_id: Uuid,
}

/// 用户的 AI 配置
#[derive(Debug, Clone)]
pub struct ListAiConfigs {
    pub user_id: String,
}
