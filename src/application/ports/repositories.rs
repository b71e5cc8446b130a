//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（如 SQLite）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::llm_provider::ProviderKind;
use crate::domain::novel::{
    ChapterPlan, ChapterStatus, CharacterAbility, CharacterRelation, GenerationMode, NovelStatus,
    WorldSettings,
};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Novel Repository
// ============================================================================

/// 小说实体（用于持久化）
#[derive(Debug, Clone)]
pub struct NovelRecord {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub genre: Vec<String>,
    pub style: Vec<String>,
    pub target_audience: Vec<String>,
    pub target_words: u32,
    pub min_chapter_words: u32,
    pub background: Option<String>,
    pub world_settings: Option<WorldSettings>,
    /// 0 表示尚无大纲版本
    pub current_outline_version: u32,
    pub status: NovelStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_TARGET_WORDS: u32 = 100_000;
pub const DEFAULT_MIN_CHAPTER_WORDS: u32 = 3000;

impl NovelRecord {
    /// 新建草稿小说
    pub fn draft(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.into(),
            genre: Vec::new(),
            style: Vec::new(),
            target_audience: Vec::new(),
            target_words: DEFAULT_TARGET_WORDS,
            min_chapter_words: DEFAULT_MIN_CHAPTER_WORDS,
            background: None,
            world_settings: None,
            current_outline_version: 0,
            status: NovelStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Novel Repository Port
#[async_trait]
pub trait NovelRepositoryPort: Send + Sync {
    /// 保存小说（插入或更新）
    async fn save(&self, novel: &NovelRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找小说
    async fn find_by_id(&self, id: Uuid) -> Result<Option<NovelRecord>, RepositoryError>;

    /// 获取用户的所有小说
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<NovelRecord>, RepositoryError>;

    /// 删除小说（级联删除所有下属实体）
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

// ============================================================================
// Character Repository
// ============================================================================

#[derive(Debug, Clone)]
pub struct CharacterRecord {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub name: String,
    pub role: Option<String>,
    pub personality: Vec<String>,
    pub abilities: Vec<CharacterAbility>,
    pub relationships: Vec<CharacterRelation>,
    pub current_state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait CharacterRepositoryPort: Send + Sync {
    async fn save(&self, character: &CharacterRecord) -> Result<(), RepositoryError>;

    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<CharacterRecord>, RepositoryError>;

    /// 删除人物，返回是否存在
    async fn delete(&self, novel_id: Uuid, id: Uuid) -> Result<bool, RepositoryError>;
}

// ============================================================================
// Knowledge Repository
// ============================================================================

#[derive(Debug, Clone)]
pub struct KnowledgeBaseRecord {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub name: String,
    /// world / character / reference
    pub kind: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct KnowledgeDocumentRecord {
    pub id: Uuid,
    pub knowledge_base_id: Uuid,
    pub title: String,
    pub content: String,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait KnowledgeRepositoryPort: Send + Sync {
    async fn save_base(&self, base: &KnowledgeBaseRecord) -> Result<(), RepositoryError>;

    async fn find_base(&self, id: Uuid) -> Result<Option<KnowledgeBaseRecord>, RepositoryError>;

    async fn find_bases_by_novel(
        &self,
        novel_id: Uuid,
    ) -> Result<Vec<KnowledgeBaseRecord>, RepositoryError>;

    async fn delete_base(&self, novel_id: Uuid, id: Uuid) -> Result<bool, RepositoryError>;

    async fn add_document(&self, document: &KnowledgeDocumentRecord) -> Result<(), RepositoryError>;

    async fn find_documents(
        &self,
        knowledge_base_id: Uuid,
    ) -> Result<Vec<KnowledgeDocumentRecord>, RepositoryError>;

    /// 小说全部知识文档，拍平为 "{title}:\n{content}"
    async fn flattened_texts(&self, novel_id: Uuid) -> Result<Vec<String>, RepositoryError>;
}

// ============================================================================
// Outline Repository
// ============================================================================

/// 大纲版本（不可变快照）
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineVersionRecord {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub version: u32,
    pub content: String,
    pub generation_mode: GenerationMode,
    pub generation_context: Option<serde_json::Value>,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
}

/// 新建大纲版本
#[derive(Debug, Clone)]
pub struct NewOutlineVersion {
    pub novel_id: Uuid,
    pub content: String,
    pub mode: GenerationMode,
    pub context: Option<serde_json::Value>,
}

#[async_trait]
pub trait OutlineRepositoryPort: Send + Sync {
    /// 在单个事务内：读取最大版本号 -> 插入 max+1 -> 更新小说当前版本号
    async fn create_next_version(
        &self,
        new_version: NewOutlineVersion,
    ) -> Result<OutlineVersionRecord, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OutlineVersionRecord>, RepositoryError>;

    /// 按版本号倒序
    async fn find_by_novel(
        &self,
        novel_id: Uuid,
    ) -> Result<Vec<OutlineVersionRecord>, RepositoryError>;

    async fn find_latest(
        &self,
        novel_id: Uuid,
    ) -> Result<Option<OutlineVersionRecord>, RepositoryError>;

    async fn set_locked(
        &self,
        id: Uuid,
        is_locked: bool,
    ) -> Result<Option<OutlineVersionRecord>, RepositoryError>;
}

// ============================================================================
// Volume / Chapter Repository
// ============================================================================

#[derive(Debug, Clone)]
pub struct VolumeRecord {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub title: String,
    /// 1-based
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRecord {
    pub id: Uuid,
    pub volume_id: Uuid,
    pub novel_id: Uuid,
    pub title: String,
    /// 卷内 1-based 序号
    pub order: u32,
    pub outline: Option<String>,
    pub detail_outline: Option<String>,
    pub content: Option<String>,
    pub word_count: u32,
    pub status: ChapterStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 章节手动编辑
#[derive(Debug, Clone, Default)]
pub struct ChapterEdit {
    pub title: Option<String>,
    pub outline: Option<String>,
    pub detail_outline: Option<String>,
    pub content: Option<String>,
}

/// 章节编排写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedPlan {
    pub volumes: usize,
    pub chapters: usize,
}

#[async_trait]
pub trait ChapterRepositoryPort: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepositoryError>;

    async fn find_volumes_by_novel(
        &self,
        novel_id: Uuid,
    ) -> Result<Vec<VolumeRecord>, RepositoryError>;

    /// 按 (卷序号, 章序号) 排序
    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<ChapterRecord>, RepositoryError>;

    /// 同卷内紧邻的前一章
    async fn find_previous(
        &self,
        chapter: &ChapterRecord,
    ) -> Result<Option<ChapterRecord>, RepositoryError>;

    async fn update_outline(&self, id: Uuid, outline: &str) -> Result<(), RepositoryError>;

    async fn update_detail_outline(
        &self,
        id: Uuid,
        detail_outline: &str,
    ) -> Result<(), RepositoryError>;

    /// 写入正文、字数，状态置为 completed
    async fn complete_content(
        &self,
        id: Uuid,
        content: &str,
        word_count: u32,
    ) -> Result<(), RepositoryError>;

    /// 手动编辑，正文变更时重算字数
    async fn apply_edit(
        &self,
        id: Uuid,
        edit: &ChapterEdit,
    ) -> Result<Option<ChapterRecord>, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// 单事务写入全部卷和章节
    async fn apply_plan(
        &self,
        novel_id: Uuid,
        plan: &ChapterPlan,
    ) -> Result<AppliedPlan, RepositoryError>;
}

// ============================================================================
// AI Config Repository
// ============================================================================

/// 采样参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// 用户 AI 配置
#[derive(Debug, Clone)]
pub struct AiConfigRecord {
    pub id: Uuid,
    pub user_id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub parameters: SamplingParameters,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait AiConfigRepositoryPort: Send + Sync {
    /// 保存配置；is_default 为真时清除该用户其他配置的默认标记
    async fn save(&self, config: &AiConfigRecord) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AiConfigRecord>, RepositoryError>;

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<AiConfigRecord>, RepositoryError>;

    /// 优先默认配置，其次最早创建的配置
    async fn find_preferred(&self, user_id: &str)
        -> Result<Option<AiConfigRecord>, RepositoryError>;

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError>;
}
