//! Agent Layer - 提示词构建 + 模型调用
//!
//! 每种生成目的一个 Agent 值，只负责把领域上下文转换为 (system, user) 提示词；
//! 模型调用统一走 `execute` / `execute_stream`。
//! 可选上下文（人物、知识库、前文）缺失时省略对应段落，不报错。

mod assist;
mod chapter;
mod consistency;
mod content;
mod outline;
mod output;
mod planning;
mod sections;
mod title;

pub use assist::{AssistAgent, BackgroundExpansionAgent, TitleSuggestionAgent};
pub use chapter::{ChapterDetailAgent, ChapterOutlineAgent};
pub use consistency::ConsistencyAgent;
pub use content::ContentAgent;
pub use outline::OutlineAgent;
pub use output::{parse_titles, AgentOutput, TaskResult};
pub use planning::ChapterPlanningAgent;
pub use title::TitleAgent;

use crate::application::ports::{
    ChatMessage, ChatResponse, CharacterRecord, LlmError, LlmProviderPort, NovelRecord,
    TextStream,
};

/// Agent 上下文
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub novel: NovelRecord,
    pub characters: Vec<CharacterRecord>,
    /// 拍平后的知识库文本
    pub knowledge: Vec<String>,
    pub previous_content: Option<String>,
}

impl AgentContext {
    pub fn new(novel: NovelRecord) -> Self {
        Self {
            novel,
            characters: Vec::new(),
            knowledge: Vec::new(),
            previous_content: None,
        }
    }

    pub fn with_characters(mut self, characters: Vec<CharacterRecord>) -> Self {
        self.characters = characters;
        self
    }

    pub fn with_knowledge(mut self, knowledge: Vec<String>) -> Self {
        self.knowledge = knowledge;
        self
    }

    pub fn with_previous_content(mut self, previous: Option<String>) -> Self {
        self.previous_content = previous.filter(|text| !text.trim().is_empty());
        self
    }
}

/// 提示词对
#[derive(Debug, Clone, PartialEq)]
pub struct Prompts {
    pub system: String,
    pub user: String,
}

impl Prompts {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system), ChatMessage::user(self.user)]
    }
}

/// Agent 能力接口
pub trait Agent: Send + Sync {
    fn name(&self) -> &'static str;

    fn build_prompts(&self, ctx: &AgentContext) -> Prompts;
}

/// 同步执行 Agent
pub async fn execute(
    provider: &dyn LlmProviderPort,
    agent: &dyn Agent,
    ctx: &AgentContext,
) -> Result<ChatResponse, LlmError> {
    let messages = agent.build_prompts(ctx).into_messages();
    tracing::debug!(agent = agent.name(), model = provider.model(), "Executing agent");
    provider.chat(&messages).await
}

/// 流式执行 Agent
pub fn execute_stream(
    provider: &dyn LlmProviderPort,
    agent: &dyn Agent,
    ctx: &AgentContext,
) -> TextStream {
    let messages = agent.build_prompts(ctx).into_messages();
    tracing::debug!(agent = agent.name(), model = provider.model(), "Streaming agent");
    provider.stream_chat(messages)
}
