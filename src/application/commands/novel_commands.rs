//! Novel Commands - 小说与人物

use uuid::Uuid;

use crate::domain::novel::{CharacterAbility, CharacterRelation, NovelStatus, WorldSettings};

/// 创建小说命令
#[derive(Debug, Clone, Default)]
pub struct CreateNovel {
    pub user_id: String,
    pub title: String,
    pub genre: Vec<String>,
    pub style: Vec<String>,
    pub target_audience: Vec<String>,
    pub target_words: Option<u32>,
    pub min_chapter_words: Option<u32>,
    pub background: Option<String>,
    pub world_settings: Option<WorldSettings>,
}

/// 更新小说命令（None 表示不修改）
#[derive(Debug, Clone, Default)]
pub struct UpdateNovel {
    pub user_id: String,
    pub novel_id: Uuid,
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

/// 删除小说命令
#[derive(Debug, Clone)]
pub struct DeleteNovel {
    pub user_id: String,
    pub novel_id: Uuid,
}

/// 创建人物命令
#[derive(Debug, Clone, Default)]
pub struct CreateCharacter {
    pub user_id: String,
    pub novel_id: Uuid,
    pub name: String,
    pub role: Option<String>,
    pub personality: Vec<String>,
    pub abilities: Vec<CharacterAbility>,
    pub relationships: Vec<CharacterRelation>,
    pub current_state: Option<String>,
}

/// 删除人物命令
#[derive(Debug, Clone)]
pub struct DeleteCharacter {
    pub user_id: String,
    pub novel_id: Uuid,
    pub character_id: Uuid,
}
