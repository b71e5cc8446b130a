//! Task Context - 生成任务限界上下文
//!
//! 任务类型与状态机:
//! queued -> running -> completed | failed
//! queued | running -> cancelled
//! 终态不可重新打开

mod input;

pub use input::{
    non_blank, parse_input, ConsistencyInput, ContentInput, OutlineInput, PlanningInput,
    TitleInput,
};

use serde::{Deserialize, Serialize};

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Outline,
    Title,
    ChapterPlanning,
    ChapterOutline,
    ChapterDetail,
    Content,
    ConsistencyCheck,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Outline => "outline",
            TaskType::Title => "title",
            TaskType::ChapterPlanning => "chapter_planning",
            TaskType::ChapterOutline => "chapter_outline",
            TaskType::ChapterDetail => "chapter_detail",
            TaskType::Content => "content",
            TaskType::ConsistencyCheck => "consistency_check",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "outline" => Some(TaskType::Outline),
            "title" => Some(TaskType::Title),
            "chapter_planning" => Some(TaskType::ChapterPlanning),
            "chapter_outline" => Some(TaskType::ChapterOutline),
            "chapter_detail" => Some(TaskType::ChapterDetail),
            "content" => Some(TaskType::Content),
            "consistency_check" => Some(TaskType::ConsistencyCheck),
            _ => None,
        }
    }

    /// 是否必须指定目标章节
    pub fn requires_chapter(&self) -> bool {
        matches!(
            self,
            TaskType::ChapterOutline | TaskType::ChapterDetail | TaskType::Content
        )
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(TaskStatus::Queued),
            "running" => Some(TaskStatus::Running),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// 状态机允许的迁移
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Queued, TaskStatus::Running)
                | (TaskStatus::Queued, TaskStatus::Failed)
                | (TaskStatus::Queued, TaskStatus::Cancelled)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
                | (TaskStatus::Running, TaskStatus::Cancelled)
        )
    }

    /// 可以迁移到 `next` 的所有前置状态（用于条件更新）
    pub fn predecessors_of(next: TaskStatus) -> Vec<TaskStatus> {
        [TaskStatus::Queued, TaskStatus::Running]
            .into_iter()
            .filter(|s| s.can_transition_to(next))
            .collect()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
