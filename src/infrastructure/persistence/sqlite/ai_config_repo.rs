//! SQLite AI Config Repository

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{decode_json, decode_time, decode_uuid, encode_json, encode_time};
use super::DbPool;
use crate::application::ports::{
    AiConfigRecord, AiConfigRepositoryPort, ProviderKind, RepositoryError,
};

const AI_CONFIG_COLUMNS: &str =
    "id, user_id, provider, model, api_key, base_url, parameters, is_default, created_at, updated_at";

pub struct SqliteAiConfigRepository {
    pool: DbPool,
}

impl SqliteAiConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AiConfigRow {
    id: String,
    user_id: String,
    provider: String,
    model: String,
    api_key: String,
    base_url: Option<String>,
    parameters: String,
    is_default: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AiConfigRow> for AiConfigRecord {
    type Error = RepositoryError;

    fn try_from(row: AiConfigRow) -> Result<Self, Self::Error> {
        let provider = ProviderKind::from_str(&row.provider).ok_or_else(|| {
            RepositoryError::SerializationError(format!("unknown provider: {}", row.provider))
        })?;

        Ok(AiConfigRecord {
            id: decode_uuid(&row.id)?,
            user_id: row.user_id,
            provider,
            model: row.model,
            api_key: row.api_key,
            base_url: row.base_url,
            parameters: decode_json(&row.parameters)?,
            is_default: row.is_default,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl AiConfigRepositoryPort for SqliteAiConfigRepository {
    async fn save(&self, config: &AiConfigRecord) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        // 每个用户至多一个默认配置
        if config.is_default {
            sqlx::query("UPDATE ai_configs SET is_default = 0 WHERE user_id = ? AND id != ?")
                .bind(&config.user_id)
                .bind(config.id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        }

        sqlx::query(
            r#"
            INSERT INTO ai_configs (id, user_id, provider, model, api_key, base_url, parameters,
                is_default, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                provider = excluded.provider,
                model = excluded.model,
                api_key = excluded.api_key,
                base_url = excluded.base_url,
                parameters = excluded.parameters,
                is_default = excluded.is_default,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(config.id.to_string())
        .bind(&config.user_id)
        .bind(config.provider.as_str())
        .bind(&config.model)
        .bind(&config.api_key)
        .bind(&config.base_url)
        .bind(encode_json(&config.parameters)?)
        .bind(config.is_default)
        .bind(encode_time(&config.created_at))
        .bind(encode_time(&config.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AiConfigRecord>, RepositoryError> {
        let row: Option<AiConfigRow> = sqlx::query_as(&format!(
            "SELECT {} FROM ai_configs WHERE id = ?",
            AI_CONFIG_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(AiConfigRecord::try_from).transpose()
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<AiConfigRecord>, RepositoryError> {
        let rows: Vec<AiConfigRow> = sqlx::query_as(&format!(
            "SELECT {} FROM ai_configs WHERE user_id = ? ORDER BY created_at ASC",
            AI_CONFIG_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(AiConfigRecord::try_from).collect()
    }

    async fn find_preferred(
        &self,
        user_id: &str,
    ) -> Result<Option<AiConfigRecord>, RepositoryError> {
        let row: Option<AiConfigRow> = sqlx::query_as(&format!(
            "SELECT {} FROM ai_configs WHERE user_id = ? ORDER BY is_default DESC, created_at ASC LIMIT 1",
            AI_CONFIG_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(AiConfigRecord::try_from).transpose()
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM ai_configs WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::SamplingParameters;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};
    use chrono::{Duration, Utc};

    async fn repo() -> SqliteAiConfigRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteAiConfigRepository::new(pool)
    }

    fn config(user_id: &str, model: &str, is_default: bool, age_secs: i64) -> AiConfigRecord {
        let created = Utc::now() - Duration::seconds(age_secs);
        AiConfigRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            provider: ProviderKind::OpenAi,
            model: model.to_string(),
            api_key: "sk-test".to_string(),
            base_url: None,
            parameters: SamplingParameters {
                temperature: Some(0.3),
                ..Default::default()
            },
            is_default,
            created_at: created,
            updated_at: created,
        }
    }

    #[tokio::test]
    async fn test_preferred_falls_back_to_oldest() {
        let repo = repo().await;
        assert!(repo.find_preferred("alice").await.unwrap().is_none());

        repo.save(&config("alice", "newer", false, 10)).await.unwrap();
        repo.save(&config("alice", "older", false, 100)).await.unwrap();

        let preferred = repo.find_preferred("alice").await.unwrap().unwrap();
        assert_eq!(preferred.model, "older");
        assert_eq!(preferred.parameters.temperature, Some(0.3));
    }

    #[tokio::test]
    async fn test_single_default_per_user() {
        let repo = repo().await;
        let first = config("alice", "first", true, 100);
        let second = config("alice", "second", true, 10);
        let other_user = config("bob", "bob", true, 10);
        repo.save(&first).await.unwrap();
        repo.save(&other_user).await.unwrap();
        repo.save(&second).await.unwrap();

        let defaults: Vec<String> = repo
            .find_by_user("alice")
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.is_default)
            .map(|c| c.model)
            .collect();
        assert_eq!(defaults, vec!["second".to_string()]);
        assert_eq!(repo.find_preferred("alice").await.unwrap().unwrap().model, "second");
        assert!(repo.find_preferred("bob").await.unwrap().unwrap().is_default);

        assert!(!repo.delete("bob", first.id).await.unwrap());
        assert!(repo.delete("alice", first.id).await.unwrap());
    }
}
