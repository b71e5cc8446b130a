//! Data Transfer Objects
//!
//! 请求体 / 响应体，JSON 字段统一 camelCase

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::application::ports::{
    AiConfigRecord, ChapterRecord, CharacterRecord, KnowledgeBaseRecord, KnowledgeDocumentRecord,
    NovelRecord, OutlineVersionRecord, ProviderKind, SamplingParameters, TaskMetadata,
    TaskRecord, VolumeRecord,
};
use crate::application::VolumeWithChapters;
use crate::domain::novel::{
    CharacterAbility, CharacterRelation, ChapterStatus, GenerationMode, NovelStatus,
    WorldSettings,
};
use crate::domain::task::{TaskStatus, TaskType};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self::success(Empty {})
    }
}

// ============================================================================
// Novel DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNovelRequest {
    pub title: String,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub style: Vec<String>,
    #[serde(default)]
    pub target_audience: Vec<String>,
    pub target_words: Option<u32>,
    pub min_chapter_words: Option<u32>,
    pub background: Option<String>,
    pub world_settings: Option<WorldSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNovelRequest {
    pub title: Option<String>,
    pub genre: Option<Vec<String>>,
    pub style: Option<Vec<String>>,
    pub target_audience: Option<Vec<String>>,
    pub target_words: Option<u32>,
    pub min_chapter_words: Option<u32>,
    pub background: Option<String>,
    pub world_settings: Option<WorldSettings>,
    pub status: Option<NovelStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelResponse {
    pub id: Uuid,
    pub title: String,
    pub genre: Vec<String>,
    pub style: Vec<String>,
    pub target_audience: Vec<String>,
    pub target_words: u32,
    pub min_chapter_words: u32,
    pub background: Option<String>,
    pub world_settings: Option<WorldSettings>,
    pub current_outline_version: u32,
    pub status: NovelStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NovelRecord> for NovelResponse {
    fn from(novel: NovelRecord) -> Self {
        Self {
            id: novel.id,
            title: novel.title,
            genre: novel.genre,
            style: novel.style,
            target_audience: novel.target_audience,
            target_words: novel.target_words,
            min_chapter_words: novel.min_chapter_words,
            background: novel.background,
            world_settings: novel.world_settings,
            current_outline_version: novel.current_outline_version,
            status: novel.status,
            created_at: novel.created_at,
            updated_at: novel.updated_at,
        }
    }
}

// ============================================================================
// Character DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCharacterRequest {
    pub name: String,
    pub role: Option<String>,
    #[serde(default)]
    pub personality: Vec<String>,
    #[serde(default)]
    pub abilities: Vec<CharacterAbility>,
    #[serde(default)]
    pub relationships: Vec<CharacterRelation>,
    pub current_state: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterResponse {
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

impl From<CharacterRecord> for CharacterResponse {
    fn from(c: CharacterRecord) -> Self {
        Self {
            id: c.id,
            novel_id: c.novel_id,
            name: c.name,
            role: c.role,
            personality: c.personality,
            abilities: c.abilities,
            relationships: c.relationships,
            current_state: c.current_state,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

// ============================================================================
// Outline DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutlineVersionRequest {
    pub content: String,
    pub mode: Option<GenerationMode>,
    pub context: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLockRequest {
    pub is_locked: bool,
}

/// SSE 大纲生成参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineStreamQuery {
    #[serde(default)]
    pub mode: GenerationMode,
    pub existing_outline: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineVersionResponse {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub version: u32,
    pub content: String,
    pub generation_mode: GenerationMode,
    pub generation_context: Option<Value>,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<OutlineVersionRecord> for OutlineVersionResponse {
    fn from(v: OutlineVersionRecord) -> Self {
        Self {
            id: v.id,
            novel_id: v.novel_id,
            version: v.version,
            content: v.content,
            generation_mode: v.generation_mode,
            generation_context: v.generation_context,
            is_locked: v.is_locked,
            created_at: v.created_at,
        }
    }
}

// ============================================================================
// Volume / Chapter DTOs
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChapterRequest {
    pub title: Option<String>,
    pub outline: Option<String>,
    pub detail_outline: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterResponse {
    pub id: Uuid,
    pub volume_id: Uuid,
    pub novel_id: Uuid,
    pub title: String,
    pub order: u32,
    pub outline: Option<String>,
    pub detail_outline: Option<String>,
    pub content: Option<String>,
    pub word_count: u32,
    pub status: ChapterStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChapterRecord> for ChapterResponse {
    fn from(c: ChapterRecord) -> Self {
        Self {
            id: c.id,
            volume_id: c.volume_id,
            novel_id: c.novel_id,
            title: c.title,
            order: c.order,
            outline: c.outline,
            detail_outline: c.detail_outline,
            content: c.content,
            word_count: c.word_count,
            status: c.status,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeResponse {
    pub id: Uuid,
    pub title: String,
    pub order: u32,
    pub created_at: DateTime<Utc>,
    pub chapters: Vec<ChapterResponse>,
}

impl From<VolumeWithChapters> for VolumeResponse {
    fn from(entry: VolumeWithChapters) -> Self {
        let VolumeRecord {
            id,
            title,
            order,
            created_at,
            ..
        } = entry.volume;
        Self {
            id,
            title,
            order,
            created_at,
            chapters: entry.chapters.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Knowledge DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKnowledgeBaseRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDocumentRequest {
    pub title: String,
    pub content: String,
    pub file_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseResponse {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<KnowledgeBaseRecord> for KnowledgeBaseResponse {
    fn from(b: KnowledgeBaseRecord) -> Self {
        Self {
            id: b.id,
            novel_id: b.novel_id,
            name: b.name,
            kind: b.kind,
            description: b.description,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeDocumentResponse {
    pub id: Uuid,
    pub knowledge_base_id: Uuid,
    pub title: String,
    pub content: String,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<KnowledgeDocumentRecord> for KnowledgeDocumentResponse {
    fn from(d: KnowledgeDocumentRecord) -> Self {
        Self {
            id: d.id,
            knowledge_base_id: d.knowledge_base_id,
            title: d.title,
            content: d.content,
            file_type: d.file_type,
            created_at: d.created_at,
        }
    }
}

// ============================================================================
// Task DTOs
// ============================================================================

/// 生成任务提交体；各任务类型的 input 形状在提交时校验
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub input: Option<Value>,
}

/// Task 行原样输出
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: Uuid,
    pub novel_id: Uuid,
    pub chapter_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub progress: u8,
    pub input: Option<Value>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub metadata: Option<TaskMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskRecord> for TaskResponse {
    fn from(t: TaskRecord) -> Self {
        Self {
            id: t.id,
            novel_id: t.novel_id,
            chapter_id: t.chapter_id,
            task_type: t.task_type,
            status: t.status,
            progress: t.progress,
            input: t.input,
            result: t.result,
            error: t.error,
            metadata: t.metadata,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

// ============================================================================
// AI Config DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAiConfigRequest {
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub parameters: SamplingParameters,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAiConfigRequest {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub parameters: Option<SamplingParameters>,
    pub is_default: Option<bool>,
}

/// API Key 只返回掩码
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfigResponse {
    pub id: Uuid,
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub parameters: SamplingParameters,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AiConfigRecord> for AiConfigResponse {
    fn from(c: AiConfigRecord) -> Self {
        Self {
            id: c.id,
            provider: c.provider,
            model: c.model,
            api_key: mask_api_key(&c.api_key),
            base_url: c.base_url,
            parameters: c.parameters,
            is_default: c.is_default,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// 保留末尾 4 位，其余替换为 *
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

// ============================================================================
// Assistant DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub novel_id: Uuid,
    pub message: String,
    pub previous_content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequestBody {
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub style: Vec<String>,
    pub background: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleSuggestionsResponse {
    pub titles: Vec<String>,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedBackgroundResponse {
    pub background: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("sk-1234567890abcd"), "*************abcd");
        assert_eq!(mask_api_key("short"), "*****");
        assert_eq!(mask_api_key(""), "");
    }

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(json["errno"], 0);
        assert_eq!(json["error"], "");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_outline_stream_query_defaults() {
        let query: OutlineStreamQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.mode, GenerationMode::default());
        assert!(query.existing_outline.is_none());
    }
}
