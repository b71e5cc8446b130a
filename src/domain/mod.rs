//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Novel Context: 小说创作（状态、大纲模式、章节编排）
//! - Task Context: 生成任务状态机

pub mod novel;
pub mod task;

// 模型结构化输出提取
mod structured_output;

pub use structured_output::{extract_json, StructuredOutputError};
