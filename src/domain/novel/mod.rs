//! Novel Context - 小说创作限界上下文
//!
//! 职责:
//! - 小说、章节生命周期状态
//! - 大纲生成模式
//! - 章节编排与一致性校验的结构化结果

mod errors;
mod planning;
mod value_objects;

pub use errors::NovelError;
pub use planning::{
    estimated_chapter_count, ChapterPlan, ConsistencyReport, PlannedChapter, PlannedVolume,
};
pub use value_objects::{
    word_count, CharacterAbility, CharacterRelation, ChapterStatus, GenerationMode, NovelStatus,
    WorldSettings,
};
