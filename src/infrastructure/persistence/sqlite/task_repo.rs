//! SQLite Task Store - 生成任务记录
//!
//! 状态迁移使用条件更新（WHERE status IN 前置状态），
//! 保证终态不会被迟到的写入重新打开。

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{decode_json_opt, decode_time, decode_uuid, encode_json, encode_time};
use super::DbPool;
use crate::application::ports::{
    NewTask, RepositoryError, TaskRecord, TaskStorePort, TaskTransition,
};
use crate::domain::task::{TaskStatus, TaskType};

const TASK_COLUMNS: &str = "id, novel_id, chapter_id, task_type, status, progress, input, result, \
     error, metadata, created_at, updated_at";

/// SQLite Task Store
pub struct SqliteTaskStore {
    pool: DbPool,
}

impl SqliteTaskStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: String,
    novel_id: String,
    chapter_id: Option<String>,
    task_type: String,
    status: String,
    progress: i64,
    input: Option<String>,
    result: Option<String>,
    error: Option<String>,
    metadata: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TaskRow> for TaskRecord {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let task_type = TaskType::from_str(&row.task_type).ok_or_else(|| {
            RepositoryError::SerializationError(format!("unknown task type: {}", row.task_type))
        })?;
        let status = TaskStatus::from_str(&row.status).ok_or_else(|| {
            RepositoryError::SerializationError(format!("unknown task status: {}", row.status))
        })?;

        Ok(TaskRecord {
            id: decode_uuid(&row.id)?,
            novel_id: decode_uuid(&row.novel_id)?,
            chapter_id: row.chapter_id.as_deref().map(decode_uuid).transpose()?,
            task_type,
            status,
            progress: row.progress.clamp(0, 100) as u8,
            input: decode_json_opt(row.input.as_deref())?,
            result: decode_json_opt(row.result.as_deref())?,
            error: row.error,
            metadata: decode_json_opt(row.metadata.as_deref())?,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl TaskStorePort for SqliteTaskStore {
    async fn create(&self, task: NewTask) -> Result<TaskRecord, RepositoryError> {
        let now = Utc::now().trunc_subsecs(6);
        let record = TaskRecord {
            id: Uuid::new_v4(),
            novel_id: task.novel_id,
            chapter_id: task.chapter_id,
            task_type: task.task_type,
            status: TaskStatus::Queued,
            progress: 0,
            input: task.input,
            result: None,
            error: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO tasks (id, novel_id, chapter_id, task_type, status, progress, input,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.novel_id.to_string())
        .bind(record.chapter_id.map(|id| id.to_string()))
        .bind(record.task_type.as_str())
        .bind(record.status.as_str())
        .bind(record.input.as_ref().map(encode_json).transpose()?)
        .bind(encode_time(&record.created_at))
        .bind(encode_time(&record.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(
            task_id = %record.id,
            novel_id = %record.novel_id,
            task_type = record.task_type.as_str(),
            "Task created"
        );

        Ok(record)
    }

    async fn transition(
        &self,
        id: Uuid,
        transition: TaskTransition,
    ) -> Result<bool, RepositoryError> {
        let predecessors = TaskStatus::predecessors_of(transition.status);
        if predecessors.is_empty() {
            return Ok(false);
        }

        let placeholders = vec!["?"; predecessors.len()].join(", ");
        let sql = format!(
            r#"
            UPDATE tasks SET
                status = ?,
                progress = COALESCE(?, progress),
                result = COALESCE(?, result),
                error = COALESCE(?, error),
                metadata = COALESCE(?, metadata),
                updated_at = ?
            WHERE id = ? AND status IN ({})
            "#,
            placeholders
        );

        let mut query = sqlx::query(&sql)
            .bind(transition.status.as_str())
            .bind(transition.progress.map(i64::from))
            .bind(transition.result.as_ref().map(encode_json).transpose()?)
            .bind(transition.error)
            .bind(transition.metadata.as_ref().map(encode_json).transpose()?)
            .bind(encode_time(&Utc::now()))
            .bind(id.to_string());
        for status in &predecessors {
            query = query.bind(status.as_str());
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_progress(&self, id: Uuid, progress: u8) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE tasks SET progress = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(i64::from(progress.min(100)))
            .bind(encode_time(&Utc::now()))
            .bind(id.to_string())
            .bind(TaskStatus::Running.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TaskRecord>, RepositoryError> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(TaskRecord::try_from).transpose()
    }

    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<TaskRecord>, RepositoryError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tasks WHERE novel_id = ? ORDER BY created_at DESC",
            TASK_COLUMNS
        ))
        .bind(novel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(TaskRecord::try_from).collect()
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<TaskRecord>, RepositoryError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tasks WHERE status = ? ORDER BY created_at ASC",
            TASK_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(TaskRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{NovelRecord, NovelRepositoryPort, TaskMetadata};
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteNovelRepository,
    };
    use serde_json::json;

    async fn setup() -> (SqliteTaskStore, NovelRecord) {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let novel = NovelRecord::draft("alice", "长夜");
        SqliteNovelRepository::new(pool.clone())
            .save(&novel)
            .await
            .unwrap();
        (SqliteTaskStore::new(pool), novel)
    }

    fn new_task(novel_id: Uuid) -> NewTask {
        NewTask {
            novel_id,
            chapter_id: None,
            task_type: TaskType::Title,
            input: Some(json!({"outline": "大纲"})),
        }
    }

    #[tokio::test]
    async fn test_create_starts_queued() {
        let (store, novel) = setup().await;
        let task = store.create(new_task(novel.id)).await.unwrap();
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.progress, 0);
        assert_eq!(store.find_by_id(task.id).await.unwrap(), Some(task));
    }

    #[tokio::test]
    async fn test_happy_path_transitions() {
        let (store, novel) = setup().await;
        let task = store.create(new_task(novel.id)).await.unwrap();

        assert!(store.transition(task.id, TaskTransition::running()).await.unwrap());
        store.update_progress(task.id, 40).await.unwrap();
        assert_eq!(store.find_by_id(task.id).await.unwrap().unwrap().progress, 40);

        let metadata = TaskMetadata {
            model: Some("gpt-4o".into()),
            tokens_used: Some(12),
        };
        assert!(store
            .transition(task.id, TaskTransition::completed(json!({"ok": true}), metadata.clone()))
            .await
            .unwrap());

        let done = store.find_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.progress, 100);
        assert_eq!(done.result, Some(json!({"ok": true})));
        assert_eq!(done.metadata, Some(metadata));
        assert!(done.error.is_none());
    }

    #[tokio::test]
    async fn test_terminal_state_is_never_reopened() {
        let (store, novel) = setup().await;
        let task = store.create(new_task(novel.id)).await.unwrap();

        assert!(store.transition(task.id, TaskTransition::cancelled()).await.unwrap());
        assert!(!store.transition(task.id, TaskTransition::running()).await.unwrap());
        assert!(!store
            .transition(task.id, TaskTransition::failed("late"))
            .await
            .unwrap());

        // 非运行中的任务不接受进度更新
        store.update_progress(task.id, 70).await.unwrap();
        let stored = store.find_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Cancelled);
        assert_eq!(stored.progress, 0);
        assert!(stored.error.is_none());
    }

    #[tokio::test]
    async fn test_find_by_status_and_novel() {
        let (store, novel) = setup().await;
        let first = store.create(new_task(novel.id)).await.unwrap();
        let second = store.create(new_task(novel.id)).await.unwrap();
        store.transition(second.id, TaskTransition::running()).await.unwrap();

        let queued = store.find_by_status(TaskStatus::Queued).await.unwrap();
        assert_eq!(queued.iter().map(|t| t.id).collect::<Vec<_>>(), vec![first.id]);
        assert_eq!(store.find_by_novel(novel.id).await.unwrap().len(), 2);
    }
}
