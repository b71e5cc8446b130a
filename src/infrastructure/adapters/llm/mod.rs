//! LLM Adapters - 大模型后端适配器
//!
//! 每个后端一个实现 LlmProviderPort 的适配器，由工厂按配置创建

mod anthropic;
mod factory;
mod fake;
mod openai;
mod sse;

pub use anthropic::AnthropicProvider;
pub use factory::{HttpLlmProviderFactory, DEFAULT_LLM_TIMEOUT_SECS};
pub use fake::{FakeLlmFactory, FakeLlmProvider, FakeReply};
pub use openai::OpenAiCompatibleProvider;
pub use sse::SseDecoder;

use crate::application::ports::LlmError;

fn map_request_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else if e.is_connect() {
        LlmError::Network(format!("Cannot connect to AI provider: {}", e))
    } else {
        LlmError::Network(e.to_string())
    }
}

async fn read_api_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    tracing::warn!(status, message = %message, "AI provider returned an error");
    LlmError::Api { status, message }
}
