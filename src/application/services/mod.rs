//! 应用服务
//!
//! 跨命令复用的编排逻辑：Provider 解析、上下文加载、请求级流式生成

mod assistant;
mod context_loader;
mod outline_stream;
mod provider_resolver;

pub use assistant::{AssistantService, SuggestionRequest, TitleSuggestions};
pub use context_loader::{load_owned_novel, ContextLoader};
pub use outline_stream::{
    generation_context, OutlineEventStream, OutlineStreamEvent, OutlineStreamService,
};
pub use provider_resolver::ProviderResolver;
