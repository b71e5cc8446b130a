//! Novel Context - Value Objects

use serde::{Deserialize, Serialize};

/// 小说生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NovelStatus {
    Draft,
    Generating,
    Completed,
    Archived,
}

impl NovelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NovelStatus::Draft => "draft",
            NovelStatus::Generating => "generating",
            NovelStatus::Completed => "completed",
            NovelStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(NovelStatus::Draft),
            "generating" => Some(NovelStatus::Generating),
            "completed" => Some(NovelStatus::Completed),
            "archived" => Some(NovelStatus::Archived),
            _ => None,
        }
    }
}

impl Default for NovelStatus {
    fn default() -> Self {
        NovelStatus::Draft
    }
}

/// 章节状态
///
/// 只有正文生成任务成功时才推进到 completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl ChapterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterStatus::Pending => "pending",
            ChapterStatus::Generating => "generating",
            ChapterStatus::Completed => "completed",
            ChapterStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ChapterStatus::Pending),
            "generating" => Some(ChapterStatus::Generating),
            "completed" => Some(ChapterStatus::Completed),
            "failed" => Some(ChapterStatus::Failed),
            _ => None,
        }
    }
}

impl Default for ChapterStatus {
    fn default() -> Self {
        ChapterStatus::Pending
    }
}

/// 大纲生成模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Initial,
    Expand,
    AdjustPaceFast,
    AdjustPaceSlow,
    StrengthenConflict,
    PreserveCharacters,
    Manual,
    Rollback,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Initial => "initial",
            GenerationMode::Expand => "expand",
            GenerationMode::AdjustPaceFast => "adjust_pace_fast",
            GenerationMode::AdjustPaceSlow => "adjust_pace_slow",
            GenerationMode::StrengthenConflict => "strengthen_conflict",
            GenerationMode::PreserveCharacters => "preserve_characters",
            GenerationMode::Manual => "manual",
            GenerationMode::Rollback => "rollback",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "initial" => Some(GenerationMode::Initial),
            "expand" => Some(GenerationMode::Expand),
            "adjust_pace_fast" => Some(GenerationMode::AdjustPaceFast),
            "adjust_pace_slow" => Some(GenerationMode::AdjustPaceSlow),
            "strengthen_conflict" => Some(GenerationMode::StrengthenConflict),
            "preserve_characters" => Some(GenerationMode::PreserveCharacters),
            "manual" => Some(GenerationMode::Manual),
            "rollback" => Some(GenerationMode::Rollback),
            _ => None,
        }
    }

    /// 是否基于已有大纲改写（需要 existingOutline）
    pub fn rewrites_existing(&self) -> bool {
        matches!(
            self,
            GenerationMode::Expand
                | GenerationMode::AdjustPaceFast
                | GenerationMode::AdjustPaceSlow
                | GenerationMode::StrengthenConflict
                | GenerationMode::PreserveCharacters
        )
    }
}

impl Default for GenerationMode {
    fn default() -> Self {
        GenerationMode::Initial
    }
}

/// 世界观设定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_background: Option<String>,
    #[serde(default)]
    pub world_rules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_system: Option<String>,
    #[serde(default)]
    pub forbidden_rules: Vec<String>,
}

impl WorldSettings {
    pub fn is_empty(&self) -> bool {
        self.time_background.as_deref().map_or(true, str::is_empty)
            && self.world_rules.is_empty()
            && self.power_system.as_deref().map_or(true, str::is_empty)
            && self.forbidden_rules.is_empty()
    }
}

/// 人物能力
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterAbility {
    pub name: String,
    #[serde(default)]
    pub level: i64,
}

/// 人物关系
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRelation {
    pub character_id: String,
    pub relation: String,
}

/// 章节字数：最终文本的字符数（非 token、非分词计数）
pub fn word_count(text: &str) -> usize {
    text.chars().count()
}
