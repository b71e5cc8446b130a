//! SQLite Character Repository

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{decode_json, decode_time, decode_uuid, encode_json, encode_time};
use super::DbPool;
use crate::application::ports::{CharacterRecord, CharacterRepositoryPort, RepositoryError};

pub struct SqliteCharacterRepository {
    pool: DbPool,
}

impl SqliteCharacterRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CharacterRow {
    id: String,
    novel_id: String,
    name: String,
    role: Option<String>,
    personality: String,
    abilities: String,
    relationships: String,
    current_state: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<CharacterRow> for CharacterRecord {
    type Error = RepositoryError;

    fn try_from(row: CharacterRow) -> Result<Self, Self::Error> {
        Ok(CharacterRecord {
            id: decode_uuid(&row.id)?,
            novel_id: decode_uuid(&row.novel_id)?,
            name: row.name,
            role: row.role,
            personality: decode_json(&row.personality)?,
            abilities: decode_json(&row.abilities)?,
            relationships: decode_json(&row.relationships)?,
            current_state: row.current_state,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl CharacterRepositoryPort for SqliteCharacterRepository {
    async fn save(&self, character: &CharacterRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO characters (id, novel_id, name, role, personality, abilities, relationships,
                current_state, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                role = excluded.role,
                personality = excluded.personality,
                abilities = excluded.abilities,
                relationships = excluded.relationships,
                current_state = excluded.current_state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(character.id.to_string())
        .bind(character.novel_id.to_string())
        .bind(&character.name)
        .bind(&character.role)
        .bind(encode_json(&character.personality)?)
        .bind(encode_json(&character.abilities)?)
        .bind(encode_json(&character.relationships)?)
        .bind(&character.current_state)
        .bind(encode_time(&character.created_at))
        .bind(encode_time(&character.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<CharacterRecord>, RepositoryError> {
        let rows: Vec<CharacterRow> = sqlx::query_as(
            r#"
            SELECT id, novel_id, name, role, personality, abilities, relationships, current_state,
                created_at, updated_at
            FROM characters WHERE novel_id = ? ORDER BY created_at ASC
            "#,
        )
        .bind(novel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(CharacterRecord::try_from).collect()
    }

    async fn delete(&self, novel_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM characters WHERE id = ? AND novel_id = ?")
            .bind(id.to_string())
            .bind(novel_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
