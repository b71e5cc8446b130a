//! Chapter / Knowledge / AI Config Commands

use uuid::Uuid;

use crate::application::ports::{ChapterEdit, ProviderKind, SamplingParameters};

/// 手动编辑章节
#[derive(Debug, Clone)]
pub struct UpdateChapter {
    pub user_id: String,
    pub chapter_id: Uuid,
    pub edit: ChapterEdit,
}

#[derive(Debug, Clone)]
pub struct DeleteChapter {
    pub user_id: String,
    pub chapter_id: Uuid,
}

/// 创建知识库
#[derive(Debug, Clone)]
pub struct CreateKnowledgeBase {
    pub user_id: String,
    pub novel_id: Uuid,
    pub name: String,
    pub kind: Option<String>,
    pub description: Option<String>,
}

/// 删除知识库
#[derive(Debug, Clone)]
pub struct DeleteKnowledgeBase {
    pub user_id: String,
    pub novel_id: Uuid,
    pub knowledge_base_id: Uuid,
}

/// 添加文本文档
#[derive(Debug, Clone)]
pub struct AddKnowledgeDocument {
    pub user_id: String,
    pub novel_id: Uuid,
    pub knowledge_base_id: Uuid,
    pub title: String,
    pub content: String,
    pub file_type: Option<String>,
}

/// 创建 AI 配置
#[derive(Debug, Clone)]
pub struct CreateAiConfig {
    pub user_id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub parameters: SamplingParameters,
    pub is_default: bool,
}

/// 更新 AI 配置（None 表示不修改）
#[derive(Debug, Clone, Default)]
pub struct UpdateAiConfig {
    pub user_id: String,
    pub config_id: Uuid,
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub parameters: Option<SamplingParameters>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct DeleteAiConfig {
    pub user_id: String,
    pub config_id: Uuid,
}
