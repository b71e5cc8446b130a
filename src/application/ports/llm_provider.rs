//! LLM Provider Port - 大模型调用抽象
//!
//! 统一的同步对话 / 流式对话接口，每个后端一个适配器实现。
//! 错误不在本层重试。

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// LLM 错误
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported AI provider: {0}")]
    UnsupportedProvider(String),
}

/// 后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    DeepSeek,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::DeepSeek => "deepseek",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAi),
            "anthropic" => Some(ProviderKind::Anthropic),
            "deepseek" => Some(ProviderKind::DeepSeek),
            _ => None,
        }
    }

    /// 未配置 base_url 时使用的地址
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::DeepSeek => "https://api.deepseek.com/v1",
        }
    }
}

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TOP_P: f32 = 1.0;

/// 统一的 Provider 配置
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl ProviderConfig {
    pub fn new(provider: ProviderKind, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: api_key.into(),
            base_url: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
        }
    }

    /// 实际请求地址（去掉末尾斜杠）
    pub fn endpoint_base(&self) -> String {
        self.base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// 对话响应
///
/// 部分后端的流式响应不返回 token 用量，此时 tokens_used 为 None
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    pub model: String,
}

/// 流式片段
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Text(String),
    Finished { tokens_used: Option<u32> },
}

/// 文本片段流
pub type TextStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LlmError>> + Send>>;

/// LLM Provider Port
#[async_trait]
pub trait LlmProviderPort: Send + Sync {
    fn model(&self) -> &str;

    /// 同步对话
    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError>;

    /// 流式对话：按生成顺序产出文本片段，以 Finished 结束
    fn stream_chat(&self, messages: Vec<ChatMessage>) -> TextStream;
}

/// Provider 工厂
pub trait LlmProviderFactoryPort: Send + Sync {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProviderPort>, LlmError>;
}
