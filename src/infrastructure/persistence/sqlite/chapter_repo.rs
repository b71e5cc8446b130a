//! SQLite Chapter Repository - 卷与章节

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{decode_time, decode_uuid, encode_time};
use super::DbPool;
use crate::application::ports::{
    AppliedPlan, ChapterEdit, ChapterRecord, ChapterRepositoryPort, RepositoryError, VolumeRecord,
};
use crate::domain::novel::{word_count, ChapterPlan, ChapterStatus};

const CHAPTER_COLUMNS: &str = "c.id, c.volume_id, c.novel_id, c.title, c.chapter_order, c.outline, \
     c.detail_outline, c.content, c.word_count, c.status, c.created_at, c.updated_at";

/// SQLite Chapter Repository
pub struct SqliteChapterRepository {
    pool: DbPool,
}

impl SqliteChapterRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn touch(&self, sql: &str, value: &str, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(sql)
            .bind(value)
            .bind(encode_time(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Chapter {}", id)));
        }
        Ok(())
    }
}

#[derive(FromRow)]
struct VolumeRow {
    id: String,
    novel_id: String,
    title: String,
    volume_order: i64,
    created_at: String,
}

impl TryFrom<VolumeRow> for VolumeRecord {
    type Error = RepositoryError;

    fn try_from(row: VolumeRow) -> Result<Self, Self::Error> {
        Ok(VolumeRecord {
            id: decode_uuid(&row.id)?,
            novel_id: decode_uuid(&row.novel_id)?,
            title: row.title,
            order: row.volume_order as u32,
            created_at: decode_time(&row.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct ChapterRow {
    id: String,
    volume_id: String,
    novel_id: String,
    title: String,
    chapter_order: i64,
    outline: Option<String>,
    detail_outline: Option<String>,
    content: Option<String>,
    word_count: i64,
    status: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ChapterRow> for ChapterRecord {
    type Error = RepositoryError;

    fn try_from(row: ChapterRow) -> Result<Self, Self::Error> {
        Ok(ChapterRecord {
            id: decode_uuid(&row.id)?,
            volume_id: decode_uuid(&row.volume_id)?,
            novel_id: decode_uuid(&row.novel_id)?,
            title: row.title,
            order: row.chapter_order as u32,
            outline: row.outline,
            detail_outline: row.detail_outline,
            content: row.content,
            word_count: row.word_count as u32,
            status: ChapterStatus::from_str(&row.status).unwrap_or_default(),
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl ChapterRepositoryPort for SqliteChapterRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepositoryError> {
        let row: Option<ChapterRow> = sqlx::query_as(&format!(
            "SELECT {} FROM chapters c WHERE c.id = ?",
            CHAPTER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(ChapterRecord::try_from).transpose()
    }

    async fn find_volumes_by_novel(
        &self,
        novel_id: Uuid,
    ) -> Result<Vec<VolumeRecord>, RepositoryError> {
        let rows: Vec<VolumeRow> = sqlx::query_as(
            "SELECT id, novel_id, title, volume_order, created_at FROM volumes WHERE novel_id = ? ORDER BY volume_order ASC",
        )
        .bind(novel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(VolumeRecord::try_from).collect()
    }

    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<ChapterRecord>, RepositoryError> {
        let rows: Vec<ChapterRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM chapters c
            JOIN volumes v ON v.id = c.volume_id
            WHERE c.novel_id = ?
            ORDER BY v.volume_order ASC, c.chapter_order ASC
            "#,
            CHAPTER_COLUMNS
        ))
        .bind(novel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ChapterRecord::try_from).collect()
    }

    async fn find_previous(
        &self,
        chapter: &ChapterRecord,
    ) -> Result<Option<ChapterRecord>, RepositoryError> {
        if chapter.order <= 1 {
            return Ok(None);
        }

        let row: Option<ChapterRow> = sqlx::query_as(&format!(
            "SELECT {} FROM chapters c WHERE c.volume_id = ? AND c.chapter_order = ?",
            CHAPTER_COLUMNS
        ))
        .bind(chapter.volume_id.to_string())
        .bind(chapter.order as i64 - 1)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(ChapterRecord::try_from).transpose()
    }

    async fn update_outline(&self, id: Uuid, outline: &str) -> Result<(), RepositoryError> {
        self.touch(
            "UPDATE chapters SET outline = ?, updated_at = ? WHERE id = ?",
            outline,
            id,
        )
        .await
    }

    async fn update_detail_outline(
        &self,
        id: Uuid,
        detail_outline: &str,
    ) -> Result<(), RepositoryError> {
        self.touch(
            "UPDATE chapters SET detail_outline = ?, updated_at = ? WHERE id = ?",
            detail_outline,
            id,
        )
        .await
    }

    async fn complete_content(
        &self,
        id: Uuid,
        content: &str,
        word_count: u32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE chapters SET content = ?, word_count = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(content)
        .bind(word_count as i64)
        .bind(ChapterStatus::Completed.as_str())
        .bind(encode_time(&Utc::now()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Chapter {}", id)));
        }
        Ok(())
    }

    async fn apply_edit(
        &self,
        id: Uuid,
        edit: &ChapterEdit,
    ) -> Result<Option<ChapterRecord>, RepositoryError> {
        let Some(mut chapter) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        if let Some(title) = &edit.title {
            chapter.title = title.clone();
        }
        if let Some(outline) = &edit.outline {
            chapter.outline = Some(outline.clone());
        }
        if let Some(detail_outline) = &edit.detail_outline {
            chapter.detail_outline = Some(detail_outline.clone());
        }
        if let Some(content) = &edit.content {
            chapter.word_count = word_count(content) as u32;
            chapter.content = Some(content.clone());
        }
        chapter.updated_at = Utc::now().trunc_subsecs(6);

        sqlx::query(
            r#"
            UPDATE chapters
            SET title = ?, outline = ?, detail_outline = ?, content = ?, word_count = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&chapter.title)
        .bind(&chapter.outline)
        .bind(&chapter.detail_outline)
        .bind(&chapter.content)
        .bind(chapter.word_count as i64)
        .bind(encode_time(&chapter.updated_at))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(Some(chapter))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM chapters WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_plan(
        &self,
        novel_id: Uuid,
        plan: &ChapterPlan,
    ) -> Result<AppliedPlan, RepositoryError> {
        plan.validate()
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let now = encode_time(&Utc::now());
        for (v_index, volume) in plan.volumes.iter().enumerate() {
            let volume_id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO volumes (id, novel_id, title, volume_order, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&volume_id)
            .bind(novel_id.to_string())
            .bind(&volume.title)
            .bind(v_index as i64 + 1)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

            for (c_index, chapter) in volume.chapters.iter().enumerate() {
                let outline = Some(chapter.summary.as_str()).filter(|s| !s.trim().is_empty());
                sqlx::query(
                    r#"
                    INSERT INTO chapters (id, volume_id, novel_id, title, chapter_order, outline,
                        word_count, status, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&volume_id)
                .bind(novel_id.to_string())
                .bind(&chapter.title)
                .bind(c_index as i64 + 1)
                .bind(outline)
                .bind(ChapterStatus::Pending.as_str())
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(AppliedPlan {
            volumes: plan.volumes.len(),
            chapters: plan.chapter_count(),
        })
    }
}
