//! 大纲流式生成（SSE）
//!
//! 不经过任务队列：请求内直接调用模型，完成后写入新的大纲版本。
//! 配置类错误在流打开之前返回；流内错误以 Error 事件结束。

use futures_util::{Stream, StreamExt};
use serde_json::{json, Value};
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

use super::context_loader::ContextLoader;
use super::provider_resolver::ProviderResolver;
use crate::application::agents::{self, AgentContext, OutlineAgent};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    NewOutlineVersion, OutlineRepositoryPort, OutlineVersionRecord, StreamChunk,
};
use crate::domain::novel::GenerationMode;

/// 流事件
#[derive(Debug, Clone, PartialEq)]
pub enum OutlineStreamEvent {
    Chunk(String),
    Done(OutlineVersionRecord),
    Error(String),
}

pub type OutlineEventStream = Pin<Box<dyn Stream<Item = OutlineStreamEvent> + Send>>;

/// 大纲版本的生成上下文快照
pub fn generation_context(ctx: &AgentContext, mode: GenerationMode) -> Value {
    json!({
        "mode": mode.as_str(),
        "title": ctx.novel.title,
        "genre": ctx.novel.genre,
        "style": ctx.novel.style,
        "targetWords": ctx.novel.target_words,
        "worldSettings": ctx.novel.world_settings.as_ref().is_some_and(|w| !w.is_empty()),
        "knowledgeBases": ctx.knowledge.len(),
    })
}

pub struct OutlineStreamService {
    loader: Arc<ContextLoader>,
    resolver: Arc<ProviderResolver>,
    outline_repo: Arc<dyn OutlineRepositoryPort>,
}

impl OutlineStreamService {
    pub fn new(
        loader: Arc<ContextLoader>,
        resolver: Arc<ProviderResolver>,
        outline_repo: Arc<dyn OutlineRepositoryPort>,
    ) -> Self {
        Self {
            loader,
            resolver,
            outline_repo,
        }
    }

    pub async fn open(
        &self,
        user_id: &str,
        novel_id: Uuid,
        mode: GenerationMode,
        existing_outline: Option<String>,
    ) -> Result<OutlineEventStream, ApplicationError> {
        if mode.rewrites_existing()
            && existing_outline.as_deref().map_or(true, |s| s.trim().is_empty())
        {
            return Err(ApplicationError::validation(format!(
                "existingOutline is required for mode {}",
                mode.as_str()
            )));
        }

        let ctx = self.loader.load_owned(novel_id, user_id).await?;
        let provider = self.resolver.resolve(user_id).await?;

        let agent = OutlineAgent::new(mode, existing_outline);
        let mut chunks = agents::execute_stream(provider.as_ref(), &agent, &ctx);
        let context = generation_context(&ctx, mode);
        let outline_repo = Arc::clone(&self.outline_repo);

        tracing::info!(
            novel_id = %novel_id,
            mode = mode.as_str(),
            model = provider.model(),
            "Outline stream opened"
        );

        Ok(Box::pin(async_stream::stream! {
            let mut content = String::new();
            let mut failure = None;

            while let Some(item) = chunks.next().await {
                match item {
                    Ok(StreamChunk::Text(text)) => {
                        content.push_str(&text);
                        yield OutlineStreamEvent::Chunk(text);
                    }
                    Ok(StreamChunk::Finished { .. }) => break,
                    Err(e) => {
                        failure = Some(e.to_string());
                        break;
                    }
                }
            }

            if let Some(error) = failure {
                tracing::warn!(novel_id = %novel_id, error = %error, "Outline stream failed");
                yield OutlineStreamEvent::Error(error);
            } else {
                let new_version = NewOutlineVersion {
                    novel_id,
                    content,
                    mode,
                    context: Some(context),
                };
                match outline_repo.create_next_version(new_version).await {
                    Ok(version) => {
                        tracing::info!(
                            novel_id = %novel_id,
                            version = version.version,
                            "Outline version saved from stream"
                        );
                        yield OutlineStreamEvent::Done(version);
                    }
                    Err(e) => yield OutlineStreamEvent::Error(e.to_string()),
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{NovelRecord, NovelRepositoryPort, ProviderConfig, ProviderKind};
    use crate::infrastructure::adapters::{FakeLlmFactory, FakeLlmProvider, FakeReply};
    use crate::infrastructure::persistence::{
        create_pool, run_migrations, DatabaseConfig, SqliteAiConfigRepository,
        SqliteCharacterRepository, SqliteKnowledgeRepository, SqliteNovelRepository,
        SqliteOutlineRepository,
    };

    struct Fixture {
        service: OutlineStreamService,
        outline_repo: Arc<SqliteOutlineRepository>,
        provider: Arc<FakeLlmProvider>,
        novel: NovelRecord,
    }

    async fn fixture(replies: Vec<FakeReply>) -> Fixture {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let novel_repo = Arc::new(SqliteNovelRepository::new(pool.clone()));
        let outline_repo = Arc::new(SqliteOutlineRepository::new(pool.clone()));
        let provider = Arc::new(FakeLlmProvider::new(replies));
        let loader = Arc::new(ContextLoader::new(
            novel_repo.clone(),
            Arc::new(SqliteCharacterRepository::new(pool.clone())),
            Arc::new(SqliteKnowledgeRepository::new(pool.clone())),
        ));
        let resolver = Arc::new(ProviderResolver::new(
            Arc::new(SqliteAiConfigRepository::new(pool.clone())),
            Arc::new(FakeLlmFactory::new(provider.clone())),
            Some(ProviderConfig::new(ProviderKind::OpenAi, "fake-model", "sk-env")),
        ));

        let novel = NovelRecord::draft("alice", "长夜");
        novel_repo.save(&novel).await.unwrap();

        Fixture {
            service: OutlineStreamService::new(loader, resolver, outline_repo.clone()),
            outline_repo,
            provider,
            novel,
        }
    }

    #[tokio::test]
    async fn test_chunks_then_done_saves_one_version() {
        let fx = fixture(vec![FakeReply::Chunks(vec!["第一幕".into(), "：出发".into()])]).await;

        let events: Vec<_> = fx
            .service
            .open("alice", fx.novel.id, GenerationMode::Initial, None)
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], OutlineStreamEvent::Chunk("第一幕".into()));
        assert_eq!(events[1], OutlineStreamEvent::Chunk("：出发".into()));
        let OutlineStreamEvent::Done(version) = &events[2] else {
            panic!("expected Done, got {:?}", events[2]);
        };
        assert_eq!(version.version, 1);
        assert_eq!(version.content, "第一幕：出发");

        let stored = fx.outline_repo.find_by_novel(fx.novel.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content, "第一幕：出发");
    }

    #[tokio::test]
    async fn test_stream_failure_ends_with_error_and_saves_nothing() {
        let fx = fixture(vec![FakeReply::FailAfter(
            vec!["半截".into()],
            "connection reset".into(),
        )])
        .await;

        let events: Vec<_> = fx
            .service
            .open("alice", fx.novel.id, GenerationMode::Initial, None)
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events[0], OutlineStreamEvent::Chunk("半截".into()));
        assert!(matches!(
            events.last(),
            Some(OutlineStreamEvent::Error(e)) if e.contains("connection reset")
        ));
        assert!(!events
            .iter()
            .any(|e| matches!(e, OutlineStreamEvent::Done(_))));
        assert!(fx
            .outline_repo
            .find_by_novel(fx.novel.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_without_existing_outline_rejected_before_stream() {
        let fx = fixture(vec![FakeReply::text("不会用到")]).await;

        for existing in [None, Some("   ".to_string())] {
            let result = fx
                .service
                .open("alice", fx.novel.id, GenerationMode::Expand, existing)
                .await;
            assert!(matches!(result, Err(ApplicationError::ValidationError(_))));
        }
        assert_eq!(fx.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_other_users_novel_is_not_found() {
        let fx = fixture(vec![FakeReply::text("不会用到")]).await;

        let result = fx
            .service
            .open("mallory", fx.novel.id, GenerationMode::Initial, None)
            .await;
        assert!(matches!(result, Err(ApplicationError::NotFound { .. })));
        assert_eq!(fx.provider.call_count(), 0);
    }
}
