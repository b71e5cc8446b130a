//! SQLite Persistence - SQLite 数据库持久化实现

mod ai_config_repo;
mod chapter_repo;
mod character_repo;
mod database;
mod knowledge_repo;
mod novel_repo;
mod outline_repo;
mod task_repo;

pub use ai_config_repo::*;
pub use chapter_repo::*;
pub use character_repo::*;
pub use database::*;
pub use knowledge_repo::*;
pub use novel_repo::*;
pub use outline_repo::*;
pub use task_repo::*;
