//! SQLite Knowledge Repository - 知识库与文本文档

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{decode_time, decode_uuid, encode_time};
use super::DbPool;
use crate::application::ports::{
    KnowledgeBaseRecord, KnowledgeDocumentRecord, KnowledgeRepositoryPort, RepositoryError,
};

pub struct SqliteKnowledgeRepository {
    pool: DbPool,
}

impl SqliteKnowledgeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct KnowledgeBaseRow {
    id: String,
    novel_id: String,
    name: String,
    kind: Option<String>,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<KnowledgeBaseRow> for KnowledgeBaseRecord {
    type Error = RepositoryError;

    fn try_from(row: KnowledgeBaseRow) -> Result<Self, Self::Error> {
        Ok(KnowledgeBaseRecord {
            id: decode_uuid(&row.id)?,
            novel_id: decode_uuid(&row.novel_id)?,
            name: row.name,
            kind: row.kind,
            description: row.description,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct KnowledgeDocumentRow {
    id: String,
    knowledge_base_id: String,
    title: String,
    content: String,
    file_type: Option<String>,
    created_at: String,
}

impl TryFrom<KnowledgeDocumentRow> for KnowledgeDocumentRecord {
    type Error = RepositoryError;

    fn try_from(row: KnowledgeDocumentRow) -> Result<Self, Self::Error> {
        Ok(KnowledgeDocumentRecord {
            id: decode_uuid(&row.id)?,
            knowledge_base_id: decode_uuid(&row.knowledge_base_id)?,
            title: row.title,
            content: row.content,
            file_type: row.file_type,
            created_at: decode_time(&row.created_at)?,
        })
    }
}

#[async_trait]
impl KnowledgeRepositoryPort for SqliteKnowledgeRepository {
    async fn save_base(&self, base: &KnowledgeBaseRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO knowledge_bases (id, novel_id, name, kind, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                description = excluded.description,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(base.id.to_string())
        .bind(base.novel_id.to_string())
        .bind(&base.name)
        .bind(&base.kind)
        .bind(&base.description)
        .bind(encode_time(&base.created_at))
        .bind(encode_time(&base.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_base(&self, id: Uuid) -> Result<Option<KnowledgeBaseRecord>, RepositoryError> {
        let row: Option<KnowledgeBaseRow> = sqlx::query_as(
            "SELECT id, novel_id, name, kind, description, created_at, updated_at FROM knowledge_bases WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(KnowledgeBaseRecord::try_from).transpose()
    }

    async fn find_bases_by_novel(
        &self,
        novel_id: Uuid,
    ) -> Result<Vec<KnowledgeBaseRecord>, RepositoryError> {
        let rows: Vec<KnowledgeBaseRow> = sqlx::query_as(
            "SELECT id, novel_id, name, kind, description, created_at, updated_at FROM knowledge_bases WHERE novel_id = ? ORDER BY created_at ASC",
        )
        .bind(novel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(KnowledgeBaseRecord::try_from).collect()
    }

    async fn delete_base(&self, novel_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM knowledge_bases WHERE id = ? AND novel_id = ?")
            .bind(id.to_string())
            .bind(novel_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_document(&self, document: &KnowledgeDocumentRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO knowledge_documents (id, knowledge_base_id, title, content, file_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document.id.to_string())
        .bind(document.knowledge_base_id.to_string())
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.file_type)
        .bind(encode_time(&document.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_documents(
        &self,
        knowledge_base_id: Uuid,
    ) -> Result<Vec<KnowledgeDocumentRecord>, RepositoryError> {
        let rows: Vec<KnowledgeDocumentRow> = sqlx::query_as(
            "SELECT id, knowledge_base_id, title, content, file_type, created_at FROM knowledge_documents WHERE knowledge_base_id = ? ORDER BY created_at ASC",
        )
        .bind(knowledge_base_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(KnowledgeDocumentRecord::try_from).collect()
    }

    async fn flattened_texts(&self, novel_id: Uuid) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT d.title, d.content
            FROM knowledge_documents d
            JOIN knowledge_bases b ON b.id = d.knowledge_base_id
            WHERE b.novel_id = ?
            ORDER BY b.created_at ASC, d.created_at ASC
            "#,
        )
        .bind(novel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(title, content)| format!("{}:\n{}", title, content))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{NovelRecord, NovelRepositoryPort};
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteNovelRepository,
    };
    use chrono::Utc;

    #[tokio::test]
    async fn test_flattened_texts_and_cascade() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let novels = SqliteNovelRepository::new(pool.clone());
        let repo = SqliteKnowledgeRepository::new(pool);

        let novel = NovelRecord::draft("alice", "长夜");
        novels.save(&novel).await.unwrap();
        assert!(repo.flattened_texts(novel.id).await.unwrap().is_empty());

        let now = Utc::now();
        let base = KnowledgeBaseRecord {
            id: Uuid::new_v4(),
            novel_id: novel.id,
            name: "设定集".into(),
            kind: Some("world".into()),
            description: None,
            created_at: now,
            updated_at: now,
        };
        repo.save_base(&base).await.unwrap();
        repo.add_document(&KnowledgeDocumentRecord {
            id: Uuid::new_v4(),
            knowledge_base_id: base.id,
            title: "地理".into(),
            content: "三大洲".into(),
            file_type: Some("txt".into()),
            created_at: now,
        })
        .await
        .unwrap();

        assert_eq!(
            repo.flattened_texts(novel.id).await.unwrap(),
            vec!["地理:\n三大洲".to_string()]
        );

        novels.delete(novel.id).await.unwrap();
        assert!(repo.find_base(base.id).await.unwrap().is_none());
        assert!(repo.find_documents(base.id).await.unwrap().is_empty());
    }
}
