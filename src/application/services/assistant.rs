//! 写作助手与创作建议
//!
//! 纯请求级调用，不创建任务记录

use std::sync::Arc;
use uuid::Uuid;

use super::context_loader::ContextLoader;
use super::provider_resolver::ProviderResolver;
use crate::application::agents::{
    self, parse_titles, AgentContext, AssistAgent, BackgroundExpansionAgent, TitleSuggestionAgent,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{NovelRecord, TextStream};

/// 建议请求（不依赖已存在的小说）
#[derive(Debug, Clone, Default)]
pub struct SuggestionRequest {
    pub genre: Vec<String>,
    pub style: Vec<String>,
    pub background: Option<String>,
}

impl SuggestionRequest {
    fn draft_context(&self, user_id: &str) -> AgentContext {
        let mut novel = NovelRecord::draft(user_id, "");
        novel.genre = self.genre.clone();
        novel.style = self.style.clone();
        novel.background = self.background.clone();
        AgentContext::new(novel)
    }
}

#[derive(Debug, Clone)]
pub struct TitleSuggestions {
    pub titles: Vec<String>,
    pub content: String,
}

pub struct AssistantService {
    loader: Arc<ContextLoader>,
    resolver: Arc<ProviderResolver>,
}

impl AssistantService {
    pub fn new(loader: Arc<ContextLoader>, resolver: Arc<ProviderResolver>) -> Self {
        Self { loader, resolver }
    }

    /// 助手对话流
    pub async fn chat(
        &self,
        user_id: &str,
        novel_id: Uuid,
        message: String,
        previous_content: Option<String>,
    ) -> Result<TextStream, ApplicationError> {
        if message.trim().is_empty() {
            return Err(ApplicationError::validation("message is required"));
        }
        let ctx = self
            .loader
            .load_owned(novel_id, user_id)
            .await?
            .with_previous_content(previous_content.clone());
        let provider = self.resolver.resolve(user_id).await?;

        tracing::info!(novel_id = %novel_id, model = provider.model(), "Assistant chat started");

        let agent = AssistAgent {
            message,
            previous_content,
        };
        Ok(agents::execute_stream(provider.as_ref(), &agent, &ctx))
    }

    pub async fn suggest_titles(
        &self,
        user_id: &str,
        request: SuggestionRequest,
    ) -> Result<TitleSuggestions, ApplicationError> {
        let provider = self.resolver.resolve(user_id).await?;
        let response =
            agents::execute(provider.as_ref(), &TitleSuggestionAgent, &request.draft_context(user_id))
                .await?;
        Ok(TitleSuggestions {
            titles: parse_titles(&response.content),
            content: response.content,
        })
    }

    pub async fn expand_background(
        &self,
        user_id: &str,
        request: SuggestionRequest,
    ) -> Result<String, ApplicationError> {
        if request.background.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(ApplicationError::validation("background is required"));
        }
        let provider = self.resolver.resolve(user_id).await?;
        let response = agents::execute(
            provider.as_ref(),
            &BackgroundExpansionAgent,
            &request.draft_context(user_id),
        )
        .await?;
        Ok(response.content)
    }
}
