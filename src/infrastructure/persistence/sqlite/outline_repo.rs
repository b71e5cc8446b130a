//! SQLite Outline Repository - 大纲版本
//!
//! 版本号在单个事务内分配：读取最大版本号 -> 插入 max+1 -> 更新小说当前版本号。
//! (novel_id, version) 唯一约束兜底并发写入。

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{decode_json_opt, decode_time, decode_uuid, encode_json, encode_time};
use super::DbPool;
use crate::application::ports::{
    NewOutlineVersion, OutlineRepositoryPort, OutlineVersionRecord, RepositoryError,
};
use crate::domain::novel::GenerationMode;

const OUTLINE_COLUMNS: &str =
    "id, novel_id, version, content, generation_mode, generation_context, is_locked, created_at";

pub struct SqliteOutlineRepository {
    pool: DbPool,
}

impl SqliteOutlineRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct OutlineVersionRow {
    id: String,
    novel_id: String,
    version: i64,
    content: String,
    generation_mode: String,
    generation_context: Option<String>,
    is_locked: bool,
    created_at: String,
}

impl TryFrom<OutlineVersionRow> for OutlineVersionRecord {
    type Error = RepositoryError;

    fn try_from(row: OutlineVersionRow) -> Result<Self, Self::Error> {
        Ok(OutlineVersionRecord {
            id: decode_uuid(&row.id)?,
            novel_id: decode_uuid(&row.novel_id)?,
            version: row.version as u32,
            content: row.content,
            generation_mode: GenerationMode::from_str(&row.generation_mode).ok_or_else(|| {
                RepositoryError::SerializationError(format!(
                    "unknown generation mode: {}",
                    row.generation_mode
                ))
            })?,
            generation_context: decode_json_opt(row.generation_context.as_deref())?,
            is_locked: row.is_locked,
            created_at: decode_time(&row.created_at)?,
        })
    }
}

#[async_trait]
impl OutlineRepositoryPort for SqliteOutlineRepository {
    async fn create_next_version(
        &self,
        new_version: NewOutlineVersion,
    ) -> Result<OutlineVersionRecord, RepositoryError> {
        let context = new_version
            .context
            .as_ref()
            .map(encode_json)
            .transpose()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let novel_exists: Option<(String,)> = sqlx::query_as("SELECT id FROM novels WHERE id = ?")
            .bind(new_version.novel_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        if novel_exists.is_none() {
            return Err(RepositoryError::NotFound(format!(
                "Novel {}",
                new_version.novel_id
            )));
        }

        let (max_version,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(version), 0) FROM outline_versions WHERE novel_id = ?",
        )
        .bind(new_version.novel_id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let record = OutlineVersionRecord {
            id: Uuid::new_v4(),
            novel_id: new_version.novel_id,
            version: max_version as u32 + 1,
            content: new_version.content,
            generation_mode: new_version.mode,
            generation_context: new_version.context,
            is_locked: false,
            created_at: Utc::now().trunc_subsecs(6),
        };

        sqlx::query(
            r#"
            INSERT INTO outline_versions (id, novel_id, version, content, generation_mode,
                generation_context, is_locked, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.novel_id.to_string())
        .bind(record.version as i64)
        .bind(&record.content)
        .bind(record.generation_mode.as_str())
        .bind(context)
        .bind(encode_time(&record.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Duplicate(
                format!("outline version {} of novel {}", record.version, record.novel_id),
            ),
            other => RepositoryError::DatabaseError(other.to_string()),
        })?;

        sqlx::query("UPDATE novels SET current_outline_version = ?, updated_at = ? WHERE id = ?")
            .bind(record.version as i64)
            .bind(encode_time(&record.created_at))
            .bind(record.novel_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(
            novel_id = %record.novel_id,
            version = record.version,
            mode = record.generation_mode.as_str(),
            "Outline version created"
        );

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OutlineVersionRecord>, RepositoryError> {
        let row: Option<OutlineVersionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM outline_versions WHERE id = ?",
            OUTLINE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(OutlineVersionRecord::try_from).transpose()
    }

    async fn find_by_novel(
        &self,
        novel_id: Uuid,
    ) -> Result<Vec<OutlineVersionRecord>, RepositoryError> {
        let rows: Vec<OutlineVersionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM outline_versions WHERE novel_id = ? ORDER BY version DESC",
            OUTLINE_COLUMNS
        ))
        .bind(novel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(OutlineVersionRecord::try_from).collect()
    }

    async fn find_latest(
        &self,
        novel_id: Uuid,
    ) -> Result<Option<OutlineVersionRecord>, RepositoryError> {
        let row: Option<OutlineVersionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM outline_versions WHERE novel_id = ? ORDER BY version DESC LIMIT 1",
            OUTLINE_COLUMNS
        ))
        .bind(novel_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(OutlineVersionRecord::try_from).transpose()
    }

    async fn set_locked(
        &self,
        id: Uuid,
        is_locked: bool,
    ) -> Result<Option<OutlineVersionRecord>, RepositoryError> {
        let result = sqlx::query("UPDATE outline_versions SET is_locked = ? WHERE id = ?")
            .bind(is_locked)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{NovelRecord, NovelRepositoryPort};
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteNovelRepository,
    };

    async fn setup() -> (SqliteNovelRepository, SqliteOutlineRepository, NovelRecord) {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let novels = SqliteNovelRepository::new(pool.clone());
        let novel = NovelRecord::draft("alice", "长夜");
        novels.save(&novel).await.unwrap();
        (novels, SqliteOutlineRepository::new(pool), novel)
    }

    fn version(novel_id: Uuid, content: &str) -> NewOutlineVersion {
        NewOutlineVersion {
            novel_id,
            content: content.to_string(),
            mode: GenerationMode::Initial,
            context: Some(serde_json::json!({"mode": "initial"})),
        }
    }

    #[tokio::test]
    async fn test_versions_are_dense_and_track_current() {
        let (novels, repo, novel) = setup().await;

        for (i, content) in ["一", "二", "三"].iter().enumerate() {
            let created = repo.create_next_version(version(novel.id, content)).await.unwrap();
            assert_eq!(created.version, i as u32 + 1);
            assert_eq!(repo.find_by_id(created.id).await.unwrap(), Some(created));
        }

        let stored = novels.find_by_id(novel.id).await.unwrap().unwrap();
        assert_eq!(stored.current_outline_version, 3);

        let versions: Vec<u32> = repo
            .find_by_novel(novel.id)
            .await
            .unwrap()
            .iter()
            .map(|v| v.version)
            .collect();
        assert_eq!(versions, vec![3, 2, 1]);
        assert_eq!(repo.find_latest(novel.id).await.unwrap().unwrap().content, "三");
    }

    #[tokio::test]
    async fn test_unknown_novel_is_not_found() {
        let (_, repo, _) = setup().await;
        let err = repo
            .create_next_version(version(Uuid::new_v4(), "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_set_locked() {
        let (_, repo, novel) = setup().await;
        let created = repo.create_next_version(version(novel.id, "一")).await.unwrap();

        let locked = repo.set_locked(created.id, true).await.unwrap().unwrap();
        assert!(locked.is_locked);
        assert!(repo.set_locked(Uuid::new_v4(), true).await.unwrap().is_none());
    }
}
