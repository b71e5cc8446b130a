//! Daer - AI 辅助连载小说创作后端
//!
//! 启动流程：配置 → 日志 → 数据库 → 服务装配 → 任务恢复 → Worker → HTTP

use std::sync::Arc;

use daer::application::{ContextLoader, ProviderResolver};
use daer::config::{load_config, print_config};
use daer::infrastructure::adapters::HttpLlmProviderFactory;
use daer::infrastructure::events::EventPublisher;
use daer::infrastructure::http::{AppState, HttpServer, Repositories, ServerConfig};
use daer::infrastructure::memory::{ChapterLocks, InMemoryJobQueue};
use daer::infrastructure::persistence::{
    create_pool, run_migrations, DatabaseConfig, SqliteAiConfigRepository,
    SqliteChapterRepository, SqliteCharacterRepository, SqliteKnowledgeRepository,
    SqliteNovelRepository, SqliteOutlineRepository, SqliteTaskStore,
};
use daer::infrastructure::worker::{
    recover_tasks, GenerationPipeline, GenerationWorker, GenerationWorkerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!(
        "{},daer={},tower_http=debug",
        config.log.level, config.log.level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Daer - AI 辅助连载小说创作后端");
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 创建 Repository 适配器
    let repos = Repositories {
        novel: Arc::new(SqliteNovelRepository::new(pool.clone())),
        character: Arc::new(SqliteCharacterRepository::new(pool.clone())),
        knowledge: Arc::new(SqliteKnowledgeRepository::new(pool.clone())),
        outline: Arc::new(SqliteOutlineRepository::new(pool.clone())),
        chapter: Arc::new(SqliteChapterRepository::new(pool.clone())),
        task: Arc::new(SqliteTaskStore::new(pool.clone())),
        ai_config: Arc::new(SqliteAiConfigRepository::new(pool)),
    };

    // 创建任务队列与事件发布器
    let (job_queue, job_rx) = InMemoryJobQueue::new(config.worker.queue_capacity);
    let job_queue = Arc::new(job_queue);
    let event_publisher = EventPublisher::new(config.worker.event_buffer).arc();

    // 创建 LLM 工厂与共享服务
    let fallback = config.ai.fallback_provider();
    if fallback.is_none() {
        tracing::warn!("No fallback AI provider configured; users must create their own AI config");
    }
    let llm_factory = Arc::new(HttpLlmProviderFactory::new(
        daer::infrastructure::adapters::DEFAULT_LLM_TIMEOUT_SECS,
    )?);
    let resolver = Arc::new(ProviderResolver::new(
        repos.ai_config.clone(),
        llm_factory,
        fallback,
    ));
    let loader = Arc::new(ContextLoader::new(
        repos.novel.clone(),
        repos.character.clone(),
        repos.knowledge.clone(),
    ));

    // 恢复重启前遗留的任务
    recover_tasks(repos.task.as_ref(), job_queue.as_ref()).await?;

    // 创建并启动 GenerationWorker
    let pipeline = Arc::new(GenerationPipeline::new(
        repos.novel.clone(),
        repos.chapter.clone(),
        repos.outline.clone(),
        repos.task.clone(),
        job_queue.clone(),
        loader.clone(),
        resolver.clone(),
        event_publisher.clone(),
        Arc::new(ChapterLocks::new()),
    ));
    let worker = GenerationWorker::new(
        GenerationWorkerConfig {
            max_concurrent: config.worker.max_concurrent,
        },
        job_rx,
        pipeline,
    );
    tokio::spawn(worker.run());

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let state = AppState::new(repos, job_queue, loader, resolver, event_publisher);
    let server = HttpServer::new(server_config, state);

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
