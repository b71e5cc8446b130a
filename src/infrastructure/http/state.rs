//! Application State
//!
//! 包含所有 Command/Query Handlers 与请求级服务的应用状态

use std::sync::Arc;

use crate::application::ports::{
    AiConfigRepositoryPort, ChapterRepositoryPort, CharacterRepositoryPort, JobQueuePort,
    KnowledgeRepositoryPort, NovelRepositoryPort, OutlineRepositoryPort, TaskStorePort,
};
use crate::application::{
    // Command handlers
    AddKnowledgeDocumentHandler, CancelTaskHandler, CreateAiConfigHandler,
    CreateCharacterHandler, CreateKnowledgeBaseHandler, CreateNovelHandler,
    CreateOutlineVersionHandler, DeleteAiConfigHandler, DeleteChapterHandler,
    DeleteCharacterHandler, DeleteKnowledgeBaseHandler, DeleteNovelHandler,
    RollbackOutlineHandler, SubmitGenerationHandler, ToggleOutlineLockHandler,
    UpdateAiConfigHandler, UpdateChapterHandler, UpdateNovelHandler,
    // Query handlers
    GetChapterHandler, GetNovelHandler, GetTaskHandler, ListAiConfigsHandler,
    ListChaptersHandler, ListCharactersHandler, ListKnowledgeBasesHandler,
    ListKnowledgeDocumentsHandler, ListNovelTasksHandler, ListNovelsHandler,
    ListOutlineVersionsHandler,
    // Services
    AssistantService, ContextLoader, OutlineStreamService, ProviderResolver,
};
use crate::infrastructure::events::EventPublisher;

/// 仓储集合
#[derive(Clone)]
pub struct Repositories {
    pub novel: Arc<dyn NovelRepositoryPort>,
    pub character: Arc<dyn CharacterRepositoryPort>,
    pub knowledge: Arc<dyn KnowledgeRepositoryPort>,
    pub outline: Arc<dyn OutlineRepositoryPort>,
    pub chapter: Arc<dyn ChapterRepositoryPort>,
    pub task: Arc<dyn TaskStorePort>,
    pub ai_config: Arc<dyn AiConfigRepositoryPort>,
}

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub event_publisher: Arc<EventPublisher>,

    // ========== Command Handlers ==========
    pub create_novel_handler: CreateNovelHandler,
    pub update_novel_handler: UpdateNovelHandler,
    pub delete_novel_handler: DeleteNovelHandler,
    pub create_character_handler: CreateCharacterHandler,
    pub delete_character_handler: DeleteCharacterHandler,
    pub create_outline_version_handler: CreateOutlineVersionHandler,
    pub toggle_outline_lock_handler: ToggleOutlineLockHandler,
    pub rollback_outline_handler: RollbackOutlineHandler,
    pub update_chapter_handler: UpdateChapterHandler,
    pub delete_chapter_handler: DeleteChapterHandler,
    pub create_knowledge_base_handler: CreateKnowledgeBaseHandler,
    pub delete_knowledge_base_handler: DeleteKnowledgeBaseHandler,
    pub add_knowledge_document_handler: AddKnowledgeDocumentHandler,
    pub create_ai_config_handler: CreateAiConfigHandler,
    pub update_ai_config_handler: UpdateAiConfigHandler,
    pub delete_ai_config_handler: DeleteAiConfigHandler,
    pub submit_generation_handler: SubmitGenerationHandler,
    pub cancel_task_handler: CancelTaskHandler,

    // ========== Query Handlers ==========
    pub get_novel_handler: GetNovelHandler,
    pub list_novels_handler: ListNovelsHandler,
    pub list_characters_handler: ListCharactersHandler,
    pub list_outline_versions_handler: ListOutlineVersionsHandler,
    pub list_chapters_handler: ListChaptersHandler,
    pub get_chapter_handler: GetChapterHandler,
    pub list_knowledge_bases_handler: ListKnowledgeBasesHandler,
    pub list_knowledge_documents_handler: ListKnowledgeDocumentsHandler,
    pub get_task_handler: GetTaskHandler,
    pub list_novel_tasks_handler: ListNovelTasksHandler,
    pub list_ai_configs_handler: ListAiConfigsHandler,

    // ========== Services ==========
    pub outline_stream: OutlineStreamService,
    pub assistant: AssistantService,
}

impl AppState {
    /// 创建应用状态
    pub fn new(
        repos: Repositories,
        job_queue: Arc<dyn JobQueuePort>,
        loader: Arc<ContextLoader>,
        resolver: Arc<ProviderResolver>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        let Repositories {
            novel,
            character,
            knowledge,
            outline,
            chapter,
            task,
            ai_config,
        } = repos;

        Self {
            event_publisher,

            // Command handlers
            create_novel_handler: CreateNovelHandler::new(novel.clone()),
            update_novel_handler: UpdateNovelHandler::new(novel.clone()),
            delete_novel_handler: DeleteNovelHandler::new(novel.clone()),
            create_character_handler: CreateCharacterHandler::new(
                novel.clone(),
                character.clone(),
            ),
            delete_character_handler: DeleteCharacterHandler::new(
                novel.clone(),
                character.clone(),
            ),
            create_outline_version_handler: CreateOutlineVersionHandler::new(
                novel.clone(),
                outline.clone(),
            ),
            toggle_outline_lock_handler: ToggleOutlineLockHandler::new(
                novel.clone(),
                outline.clone(),
            ),
            rollback_outline_handler: RollbackOutlineHandler::new(novel.clone(), outline.clone()),
            update_chapter_handler: UpdateChapterHandler::new(novel.clone(), chapter.clone()),
            delete_chapter_handler: DeleteChapterHandler::new(novel.clone(), chapter.clone()),
            create_knowledge_base_handler: CreateKnowledgeBaseHandler::new(
                novel.clone(),
                knowledge.clone(),
            ),
            delete_knowledge_base_handler: DeleteKnowledgeBaseHandler::new(
                novel.clone(),
                knowledge.clone(),
            ),
            add_knowledge_document_handler: AddKnowledgeDocumentHandler::new(
                novel.clone(),
                knowledge.clone(),
            ),
            create_ai_config_handler: CreateAiConfigHandler::new(ai_config.clone()),
            update_ai_config_handler: UpdateAiConfigHandler::new(ai_config.clone()),
            delete_ai_config_handler: DeleteAiConfigHandler::new(ai_config.clone()),
            submit_generation_handler: SubmitGenerationHandler::new(
                novel.clone(),
                chapter.clone(),
                task.clone(),
                job_queue.clone(),
            ),
            cancel_task_handler: CancelTaskHandler::new(novel.clone(), task.clone(), job_queue),

            // Query handlers
            get_novel_handler: GetNovelHandler::new(novel.clone()),
            list_novels_handler: ListNovelsHandler::new(novel.clone()),
            list_characters_handler: ListCharactersHandler::new(novel.clone(), character),
            list_outline_versions_handler: ListOutlineVersionsHandler::new(
                novel.clone(),
                outline.clone(),
            ),
            list_chapters_handler: ListChaptersHandler::new(novel.clone(), chapter.clone()),
            get_chapter_handler: GetChapterHandler::new(novel.clone(), chapter),
            list_knowledge_bases_handler: ListKnowledgeBasesHandler::new(
                novel.clone(),
                knowledge.clone(),
            ),
            list_knowledge_documents_handler: ListKnowledgeDocumentsHandler::new(
                novel.clone(),
                knowledge,
            ),
            get_task_handler: GetTaskHandler::new(novel.clone(), task.clone()),
            list_novel_tasks_handler: ListNovelTasksHandler::new(novel, task),
            list_ai_configs_handler: ListAiConfigsHandler::new(ai_config),

            // Services
            outline_stream: OutlineStreamService::new(loader.clone(), resolver.clone(), outline),
            assistant: AssistantService::new(loader, resolver),
        }
    }
}
