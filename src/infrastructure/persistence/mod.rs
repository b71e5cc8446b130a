//! Persistence Layer - 数据持久化
//!
//! SQLite 存储实现（任务记录与领域实体共用一个连接池）

pub mod sqlite;

pub use self::sqlite::{
    create_pool, run_migrations, DatabaseConfig, DbPool, SqliteAiConfigRepository,
    SqliteChapterRepository, SqliteCharacterRepository, SqliteKnowledgeRepository,
    SqliteNovelRepository, SqliteOutlineRepository, SqliteTaskStore,
};
