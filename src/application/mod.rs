//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（LlmProvider、Repository、TaskStore、JobQueue）
//! - agents: 每种生成目的一个提示词构建器 + 统一执行函数
//! - services: Provider 解析、上下文加载、请求级流式生成
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod agents;
pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;
pub mod services;

// Re-exports
pub use commands::{
    // Generation commands
    CancelTask,
    SubmitGeneration,
    // Outline commands
    CreateOutlineVersion,
    RollbackOutline,
    ToggleOutlineLock,
    // Novel commands
    CreateCharacter,
    CreateNovel,
    DeleteCharacter,
    DeleteNovel,
    UpdateNovel,
    // Chapter / knowledge / AI config commands
    AddKnowledgeDocument,
    CreateAiConfig,
    CreateKnowledgeBase,
    DeleteAiConfig,
    DeleteChapter,
    DeleteKnowledgeBase,
    UpdateAiConfig,
    UpdateChapter,
    // Handlers
    handlers::{
        AddKnowledgeDocumentHandler, CancelTaskHandler, CreateAiConfigHandler,
        CreateCharacterHandler, CreateKnowledgeBaseHandler, CreateNovelHandler,
        CreateOutlineVersionHandler, DeleteAiConfigHandler, DeleteChapterHandler,
        DeleteCharacterHandler, DeleteKnowledgeBaseHandler, DeleteNovelHandler,
        RollbackOutlineHandler, SubmitGenerationHandler, ToggleOutlineLockHandler,
        UpdateAiConfigHandler, UpdateChapterHandler, UpdateNovelHandler,
    },
};

pub use error::{ApplicationError, NO_AI_CONFIGURATION};

pub use queries::{
    GetChapter,
    GetNovel,
    GetTask,
    ListAiConfigs,
    ListChapters,
    ListCharacters,
    ListKnowledgeBases,
    ListKnowledgeDocuments,
    ListNovelTasks,
    ListNovels,
    ListOutlineVersions,
    // Handlers
    handlers::{
        GetChapterHandler, GetNovelHandler, GetTaskHandler, ListAiConfigsHandler,
        ListChaptersHandler, ListCharactersHandler, ListKnowledgeBasesHandler,
        ListKnowledgeDocumentsHandler, ListNovelTasksHandler, ListNovelsHandler,
        ListOutlineVersionsHandler, VolumeWithChapters,
    },
};

pub use services::{
    AssistantService, ContextLoader, OutlineStreamEvent, OutlineStreamService, ProviderResolver,
    SuggestionRequest,
};
