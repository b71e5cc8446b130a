//! Outline Command Handlers
//!
//! 版本号由仓储在单个事务内分配（max + 1），历史版本不可变

use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{CreateOutlineVersion, RollbackOutline, ToggleOutlineLock};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    NewOutlineVersion, NovelRepositoryPort, OutlineRepositoryPort, OutlineVersionRecord,
};
use crate::application::services::load_owned_novel;
use crate::domain::novel::GenerationMode;

// ============================================================================
// CreateOutlineVersion
// ============================================================================

pub struct CreateOutlineVersionHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    outline_repo: Arc<dyn OutlineRepositoryPort>,
}

impl CreateOutlineVersionHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        outline_repo: Arc<dyn OutlineRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            outline_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateOutlineVersion,
    ) -> Result<OutlineVersionRecord, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), cmd.novel_id, &cmd.user_id).await?;
        if cmd.content.trim().is_empty() {
            return Err(ApplicationError::validation("Outline content cannot be empty"));
        }

        let version = self
            .outline_repo
            .create_next_version(NewOutlineVersion {
                novel_id: cmd.novel_id,
                content: cmd.content,
                mode: cmd.mode.unwrap_or(GenerationMode::Manual),
                context: cmd.context,
            })
            .await?;

        tracing::info!(
            novel_id = %cmd.novel_id,
            version = version.version,
            mode = version.generation_mode.as_str(),
            "Outline version created"
        );

        Ok(version)
    }
}

// ============================================================================
// ToggleOutlineLock
// ============================================================================

pub struct ToggleOutlineLockHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    outline_repo: Arc<dyn OutlineRepositoryPort>,
}

impl ToggleOutlineLockHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        outline_repo: Arc<dyn OutlineRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            outline_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: ToggleOutlineLock,
    ) -> Result<OutlineVersionRecord, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), cmd.novel_id, &cmd.user_id).await?;
        find_version(self.outline_repo.as_ref(), cmd.novel_id, cmd.version_id).await?;

        self.outline_repo
            .set_locked(cmd.version_id, cmd.is_locked)
            .await?
            .ok_or_else(|| ApplicationError::not_found("OutlineVersion", cmd.version_id))
    }
}

// ============================================================================
// RollbackOutline
// ============================================================================

/// 回滚：以目标版本内容创建新版本，上下文记录 rollbackFrom
pub struct RollbackOutlineHandler {
    novel_repo: Arc<dyn NovelRepositoryPort>,
    outline_repo: Arc<dyn OutlineRepositoryPort>,
}

impl RollbackOutlineHandler {
    pub fn new(
        novel_repo: Arc<dyn NovelRepositoryPort>,
        outline_repo: Arc<dyn OutlineRepositoryPort>,
    ) -> Self {
        Self {
            novel_repo,
            outline_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: RollbackOutline,
    ) -> Result<OutlineVersionRecord, ApplicationError> {
        load_owned_novel(self.novel_repo.as_ref(), cmd.novel_id, &cmd.user_id).await?;
        let target = find_version(self.outline_repo.as_ref(), cmd.novel_id, cmd.version_id).await?;

        let context = match target.generation_context.clone() {
            Some(Value::Object(mut map)) => {
                map.insert("rollbackFrom".to_string(), json!(target.version));
                Value::Object(map)
            }
            _ => json!({ "rollbackFrom": target.version }),
        };

        let version = self
            .outline_repo
            .create_next_version(NewOutlineVersion {
                novel_id: cmd.novel_id,
                content: target.content.clone(),
                mode: GenerationMode::Rollback,
                context: Some(context),
            })
            .await?;

        tracing::info!(
            novel_id = %cmd.novel_id,
            from = target.version,
            to = version.version,
            "Outline rolled back"
        );

        Ok(version)
    }
}

async fn find_version(
    outline_repo: &dyn OutlineRepositoryPort,
    novel_id: Uuid,
    version_id: Uuid,
) -> Result<OutlineVersionRecord, ApplicationError> {
    outline_repo
        .find_by_id(version_id)
        .await?
        .filter(|version| version.novel_id == novel_id)
        .ok_or_else(|| ApplicationError::not_found("OutlineVersion", version_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::NovelRecord;
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteNovelRepository,
        SqliteOutlineRepository,
    };

    async fn setup() -> (
        Arc<SqliteNovelRepository>,
        Arc<SqliteOutlineRepository>,
        NovelRecord,
    ) {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let novel_repo = Arc::new(SqliteNovelRepository::new(pool.clone()));
        let novel = NovelRecord::draft("alice", "长夜");
        novel_repo.save(&novel).await.unwrap();
        (novel_repo, Arc::new(SqliteOutlineRepository::new(pool)), novel)
    }

    #[tokio::test]
    async fn test_versions_increase_from_one_regardless_of_mode() {
        let (novel_repo, outline_repo, novel) = setup().await;
        let handler = CreateOutlineVersionHandler::new(novel_repo.clone(), outline_repo.clone());

        let modes = [
            None,
            Some(GenerationMode::Expand),
            Some(GenerationMode::Initial),
        ];
        let mut versions = Vec::new();
        for (i, mode) in modes.into_iter().enumerate() {
            let created = handler
                .handle(CreateOutlineVersion {
                    user_id: "alice".into(),
                    novel_id: novel.id,
                    content: format!("大纲{}", i),
                    mode,
                    context: None,
                })
                .await
                .unwrap();
            versions.push(created.version);
        }
        assert_eq!(versions, vec![1, 2, 3]);

        let stored = novel_repo.find_by_id(novel.id).await.unwrap().unwrap();
        assert_eq!(stored.current_outline_version, 3);
    }

    #[tokio::test]
    async fn test_rollback_copies_forward_without_mutating_target() {
        let (novel_repo, outline_repo, novel) = setup().await;
        let create = CreateOutlineVersionHandler::new(novel_repo.clone(), outline_repo.clone());
        let rollback = RollbackOutlineHandler::new(novel_repo.clone(), outline_repo.clone());

        let first = create
            .handle(CreateOutlineVersion {
                user_id: "alice".into(),
                novel_id: novel.id,
                content: "初版".into(),
                mode: Some(GenerationMode::Initial),
                context: Some(json!({"mode": "initial"})),
            })
            .await
            .unwrap();
        create
            .handle(CreateOutlineVersion {
                user_id: "alice".into(),
                novel_id: novel.id,
                content: "改版".into(),
                mode: None,
                context: None,
            })
            .await
            .unwrap();

        let rolled = rollback
            .handle(RollbackOutline {
                user_id: "alice".into(),
                novel_id: novel.id,
                version_id: first.id,
            })
            .await
            .unwrap();

        assert_eq!(rolled.version, 3);
        assert_eq!(rolled.content, first.content);
        assert_eq!(rolled.generation_mode, GenerationMode::Rollback);
        let context = rolled.generation_context.unwrap();
        assert_eq!(context["rollbackFrom"], 1);
        assert_eq!(context["mode"], "initial");

        let target = outline_repo.find_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(target, first);
    }

    #[tokio::test]
    async fn test_toggle_lock_scoped_to_novel() {
        let (novel_repo, outline_repo, novel) = setup().await;
        let create = CreateOutlineVersionHandler::new(novel_repo.clone(), outline_repo.clone());
        let toggle = ToggleOutlineLockHandler::new(novel_repo.clone(), outline_repo.clone());

        let version = create
            .handle(CreateOutlineVersion {
                user_id: "alice".into(),
                novel_id: novel.id,
                content: "大纲".into(),
                mode: None,
                context: None,
            })
            .await
            .unwrap();

        let locked = toggle
            .handle(ToggleOutlineLock {
                user_id: "alice".into(),
                novel_id: novel.id,
                version_id: version.id,
                is_locked: true,
            })
            .await
            .unwrap();
        assert!(locked.is_locked);

        let other = NovelRecord::draft("alice", "另一部");
        novel_repo.save(&other).await.unwrap();
        let err = toggle
            .handle(ToggleOutlineLock {
                user_id: "alice".into(),
                novel_id: other.id,
                version_id: version.id,
                is_locked: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { .. }));
    }
}
