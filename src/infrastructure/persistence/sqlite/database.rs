//! SQLite Database - 数据库连接和迁移

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::application::ports::RepositoryError;

/// 数据库配置
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 数据库连接串
    pub database_url: String,
    /// 最大连接数
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/daer.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl AsRef<Path>, max_connections: u32) -> Self {
        Self {
            database_url: format!("sqlite:{}?mode=rwc", path.as_ref().display()),
            max_connections,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }
}

/// 数据库连接池
pub type DbPool = Pool<Sqlite>;

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    // 外键约束按连接生效，需在连接参数中开启
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    // 启用 WAL 模式，允许并发读写
    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await?;

    // 设置同步模式为 NORMAL（平衡性能和安全性）
    sqlx::query("PRAGMA synchronous=NORMAL")
        .execute(&pool)
        .await?;

    tracing::info!("SQLite pool created with WAL mode, foreign keys and busy_timeout=5000ms");

    Ok(pool)
}

/// 运行数据库迁移（幂等）
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    // 创建 novels 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS novels (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            genre TEXT NOT NULL DEFAULT '[]',
            style TEXT NOT NULL DEFAULT '[]',
            target_audience TEXT NOT NULL DEFAULT '[]',
            target_words INTEGER NOT NULL DEFAULT 100000,
            min_chapter_words INTEGER NOT NULL DEFAULT 3000,
            background TEXT,
            world_settings TEXT,
            current_outline_version INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'draft',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 characters 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS characters (
            id TEXT PRIMARY KEY,
            novel_id TEXT NOT NULL,
            name TEXT NOT NULL,
            role TEXT,
            personality TEXT NOT NULL DEFAULT '[]',
            abilities TEXT NOT NULL DEFAULT '[]',
            relationships TEXT NOT NULL DEFAULT '[]',
            current_state TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 knowledge_bases / knowledge_documents 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_bases (
            id TEXT PRIMARY KEY,
            novel_id TEXT NOT NULL,
            name TEXT NOT NULL,
            kind TEXT,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_documents (
            id TEXT PRIMARY KEY,
            knowledge_base_id TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            file_type TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (knowledge_base_id) REFERENCES knowledge_bases(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 outline_versions 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS outline_versions (
            id TEXT PRIMARY KEY,
            novel_id TEXT NOT NULL,
            version INTEGER NOT NULL,
            content TEXT NOT NULL,
            generation_mode TEXT NOT NULL,
            generation_context TEXT,
            is_locked INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE,
            UNIQUE (novel_id, version)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 volumes / chapters 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS volumes (
            id TEXT PRIMARY KEY,
            novel_id TEXT NOT NULL,
            title TEXT NOT NULL,
            volume_order INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chapters (
            id TEXT PRIMARY KEY,
            volume_id TEXT NOT NULL,
            novel_id TEXT NOT NULL,
            title TEXT NOT NULL,
            chapter_order INTEGER NOT NULL,
            outline TEXT,
            detail_outline TEXT,
            content TEXT,
            word_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (volume_id) REFERENCES volumes(id) ON DELETE CASCADE,
            FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 tasks 表（input 用于重启后重建队列）
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            novel_id TEXT NOT NULL,
            chapter_id TEXT,
            task_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued',
            progress INTEGER NOT NULL DEFAULT 0,
            input TEXT,
            result TEXT,
            error TEXT,
            metadata TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE,
            FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建 ai_configs 表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ai_configs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            provider TEXT NOT NULL,
            model TEXT NOT NULL,
            api_key TEXT NOT NULL,
            base_url TEXT,
            parameters TEXT NOT NULL DEFAULT '{}',
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建索引
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_novels_user_id ON novels(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_characters_novel_id ON characters(novel_id)",
        "CREATE INDEX IF NOT EXISTS idx_knowledge_bases_novel_id ON knowledge_bases(novel_id)",
        "CREATE INDEX IF NOT EXISTS idx_knowledge_documents_base_id ON knowledge_documents(knowledge_base_id)",
        "CREATE INDEX IF NOT EXISTS idx_volumes_novel_id ON volumes(novel_id)",
        "CREATE INDEX IF NOT EXISTS idx_chapters_volume_id ON chapters(volume_id)",
        "CREATE INDEX IF NOT EXISTS idx_chapters_novel_id ON chapters(novel_id)",
        "CREATE INDEX IF NOT EXISTS idx_tasks_novel_id ON tasks(novel_id)",
        "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
        "CREATE INDEX IF NOT EXISTS idx_ai_configs_user_id ON ai_configs(user_id)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

// ============================================================================
// Column codecs
// ============================================================================

/// 时间戳统一为微秒精度 RFC3339（字符串比较即时间顺序）
pub(crate) fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_time(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

pub(crate) fn decode_uuid(value: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

pub(crate) fn decode_json<T: DeserializeOwned>(value: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(value).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

pub(crate) fn decode_json_opt<T: DeserializeOwned>(
    value: Option<&str>,
) -> Result<Option<T>, RepositoryError> {
    value.map(decode_json).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_db() {
        let config = DatabaseConfig::in_memory();
        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        // 迁移可重复执行
        run_migrations(&pool).await.unwrap();
    }

    #[test]
    fn test_time_codec_sorts_lexicographically() {
        let earlier = decode_time(&encode_time(&Utc::now())).unwrap();
        let later = earlier + chrono::Duration::microseconds(1);
        assert!(encode_time(&earlier) < encode_time(&later));
        assert_eq!(decode_time(&encode_time(&earlier)).unwrap(), earlier);
    }
}
