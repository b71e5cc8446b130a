//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod job_queue;
mod llm_provider;
mod repositories;
mod task_store;

pub use job_queue::{GenerationJob, JobQueuePort, QueueError};
pub use llm_provider::{
    ChatMessage, ChatResponse, ChatRole, LlmError, LlmProviderFactoryPort, LlmProviderPort,
    ProviderConfig, ProviderKind, StreamChunk, TextStream, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE, DEFAULT_TOP_P,
};
pub use repositories::{
    AiConfigRecord, AiConfigRepositoryPort, AppliedPlan, ChapterEdit, ChapterRecord,
    ChapterRepositoryPort, CharacterRecord, CharacterRepositoryPort, KnowledgeBaseRecord,
    KnowledgeDocumentRecord, KnowledgeRepositoryPort, NewOutlineVersion, NovelRecord,
    NovelRepositoryPort, OutlineRepositoryPort, OutlineVersionRecord, RepositoryError,
    SamplingParameters, VolumeRecord, DEFAULT_MIN_CHAPTER_WORDS, DEFAULT_TARGET_WORDS,
};
pub use task_store::{NewTask, TaskMetadata, TaskRecord, TaskStorePort, TaskTransition};
