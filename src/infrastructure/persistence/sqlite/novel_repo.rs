//! SQLite Novel Repository

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{decode_json, decode_json_opt, decode_time, decode_uuid, encode_json, encode_time};
use super::DbPool;
use crate::application::ports::{NovelRecord, NovelRepositoryPort, RepositoryError};
use crate::domain::novel::NovelStatus;

const NOVEL_COLUMNS: &str = "id, user_id, title, genre, style, target_audience, target_words, \
     min_chapter_words, background, world_settings, current_outline_version, status, created_at, updated_at";

/// SQLite Novel Repository
pub struct SqliteNovelRepository {
    pool: DbPool,
}

impl SqliteNovelRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct NovelRow {
    id: String,
    user_id: String,
    title: String,
    genre: String,
    style: String,
    target_audience: String,
    target_words: i64,
    min_chapter_words: i64,
    background: Option<String>,
    world_settings: Option<String>,
    current_outline_version: i64,
    status: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<NovelRow> for NovelRecord {
    type Error = RepositoryError;

    fn try_from(row: NovelRow) -> Result<Self, Self::Error> {
        Ok(NovelRecord {
            id: decode_uuid(&row.id)?,
            user_id: row.user_id,
            title: row.title,
            genre: decode_json(&row.genre)?,
            style: decode_json(&row.style)?,
            target_audience: decode_json(&row.target_audience)?,
            target_words: row.target_words as u32,
            min_chapter_words: row.min_chapter_words as u32,
            background: row.background,
            world_settings: decode_json_opt(row.world_settings.as_deref())?,
            current_outline_version: row.current_outline_version as u32,
            status: NovelStatus::from_str(&row.status).unwrap_or_default(),
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl NovelRepositoryPort for SqliteNovelRepository {
    async fn save(&self, novel: &NovelRecord) -> Result<(), RepositoryError> {
        let world_settings = novel.world_settings.as_ref().map(encode_json).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO novels (id, user_id, title, genre, style, target_audience, target_words,
                min_chapter_words, background, world_settings, current_outline_version, status,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                genre = excluded.genre,
                style = excluded.style,
                target_audience = excluded.target_audience,
                target_words = excluded.target_words,
                min_chapter_words = excluded.min_chapter_words,
                background = excluded.background,
                world_settings = excluded.world_settings,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(novel.id.to_string())
        .bind(&novel.user_id)
        .bind(&novel.title)
        .bind(encode_json(&novel.genre)?)
        .bind(encode_json(&novel.style)?)
        .bind(encode_json(&novel.target_audience)?)
        .bind(novel.target_words as i64)
        .bind(novel.min_chapter_words as i64)
        .bind(&novel.background)
        .bind(world_settings)
        .bind(novel.current_outline_version as i64)
        .bind(novel.status.as_str())
        .bind(encode_time(&novel.created_at))
        .bind(encode_time(&novel.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<NovelRecord>, RepositoryError> {
        let row: Option<NovelRow> =
            sqlx::query_as(&format!("SELECT {} FROM novels WHERE id = ?", NOVEL_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(NovelRecord::try_from).transpose()
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<NovelRecord>, RepositoryError> {
        let rows: Vec<NovelRow> = sqlx::query_as(&format!(
            "SELECT {} FROM novels WHERE user_id = ? ORDER BY updated_at DESC",
            NOVEL_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(NovelRecord::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        // 外键级联删除人物、知识库、大纲版本、卷、章节、任务
        sqlx::query("DELETE FROM novels WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::novel::WorldSettings;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn repo() -> SqliteNovelRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteNovelRepository::new(pool)
    }

    #[tokio::test]
    async fn test_save_and_find_roundtrip_fields() {
        let repo = repo().await;
        let mut novel = NovelRecord::draft("alice", "长夜");
        novel.genre = vec!["玄幻".into()];
        novel.world_settings = Some(WorldSettings {
            world_rules: vec!["灵力守恒".into()],
            ..Default::default()
        });
        repo.save(&novel).await.unwrap();

        let stored = repo.find_by_id(novel.id).await.unwrap().unwrap();
        assert_eq!(stored.user_id, "alice");
        assert_eq!(stored.genre, vec!["玄幻".to_string()]);
        assert_eq!(stored.world_settings, novel.world_settings);
        assert_eq!(stored.current_outline_version, 0);

        assert_eq!(repo.find_by_user("alice").await.unwrap().len(), 1);
        assert!(repo.find_by_user("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_does_not_reset_outline_version() {
        let repo = repo().await;
        let novel = NovelRecord::draft("alice", "长夜");
        repo.save(&novel).await.unwrap();
        sqlx::query("UPDATE novels SET current_outline_version = 4 WHERE id = ?")
            .bind(novel.id.to_string())
            .execute(&repo.pool)
            .await
            .unwrap();

        repo.save(&novel).await.unwrap();
        let stored = repo.find_by_id(novel.id).await.unwrap().unwrap();
        assert_eq!(stored.current_outline_version, 4);
    }
}
