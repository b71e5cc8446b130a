//! Outline Commands - 大纲版本

use serde_json::Value;
use uuid::Uuid;

use crate::domain::novel::GenerationMode;

/// 手动创建大纲版本
#[derive(Debug, Clone)]
pub struct CreateOutlineVersion {
    pub user_id: String,
    pub novel_id: Uuid,
    pub content: String,
    /// 缺省为 manual
    pub mode: Option<GenerationMode>,
    pub context: Option<Value>,
}

/// 锁定 / 解锁版本
#[derive(Debug, Clone)]
pub struct ToggleOutlineLock {
    pub user_id: String,
    pub novel_id: Uuid,
    pub version_id: Uuid,
    pub is_locked: bool,
}

/// 回滚到历史版本（复制为新版本）
#[derive(Debug, Clone)]
pub struct RollbackOutline {
    pub user_id: String,
    pub novel_id: Uuid,
    pub version_id: Uuid,
}
