//! Fake LLM Provider - 用于测试的脚本化 Provider
//!
//! 按顺序返回预设回复，不发起任何网络请求；记录收到的消息便于断言提示词

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::application::ports::{
    ChatMessage, ChatResponse, LlmError, LlmProviderFactoryPort, LlmProviderPort, ProviderConfig,
    StreamChunk, TextStream,
};

/// 预设回复
#[derive(Debug, Clone)]
pub enum FakeReply {
    /// 完整文本（流式时作为单个片段）
    Text(String),
    /// 流式片段
    Chunks(Vec<String>),
    /// 先输出片段再报错
    FailAfter(Vec<String>, String),
    /// 直接报错
    Fail(String),
}

impl FakeReply {
    pub fn text(text: impl Into<String>) -> Self {
        FakeReply::Text(text.into())
    }
}

/// Fake LLM Provider
pub struct FakeLlmProvider {
    model: String,
    replies: Mutex<VecDeque<FakeReply>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakeLlmProvider {
    pub fn new(replies: impl IntoIterator<Item = FakeReply>) -> Self {
        Self {
            model: "fake-model".to_string(),
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, reply: FakeReply) {
        lock(&self.replies).push_back(reply);
    }

    /// 已收到的全部请求消息
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    fn next_reply(&self, messages: &[ChatMessage]) -> Result<FakeReply, LlmError> {
        lock(&self.requests).push(messages.to_vec());
        lock(&self.replies)
            .pop_front()
            .ok_or_else(|| LlmError::InvalidResponse("no scripted reply left".to_string()))
    }
}

fn api_error(message: String) -> LlmError {
    LlmError::Api {
        status: 500,
        message,
    }
}

#[async_trait]
impl LlmProviderPort for FakeLlmProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError> {
        let content = match self.next_reply(messages)? {
            FakeReply::Text(text) => text,
            FakeReply::Chunks(chunks) => chunks.concat(),
            FakeReply::FailAfter(_, error) | FakeReply::Fail(error) => return Err(api_error(error)),
        };

        Ok(ChatResponse {
            tokens_used: Some(content.chars().count() as u32),
            content,
            model: self.model.clone(),
        })
    }

    fn stream_chat(&self, messages: Vec<ChatMessage>) -> TextStream {
        let reply = self.next_reply(&messages);

        Box::pin(async_stream::stream! {
            let (chunks, error) = match reply {
                Ok(FakeReply::Text(text)) => (vec![text], None),
                Ok(FakeReply::Chunks(chunks)) => (chunks, None),
                Ok(FakeReply::FailAfter(chunks, error)) => (chunks, Some(api_error(error))),
                Ok(FakeReply::Fail(error)) => (Vec::new(), Some(api_error(error))),
                Err(e) => (Vec::new(), Some(e)),
            };

            for chunk in chunks {
                tokio::task::yield_now().await;
                yield Ok(StreamChunk::Text(chunk));
            }
            match error {
                Some(e) => yield Err(e),
                None => yield Ok(StreamChunk::Finished { tokens_used: None }),
            }
        })
    }
}

/// Fake Provider 工厂，统计创建次数以证明没有发起调用
pub struct FakeLlmFactory {
    provider: Arc<FakeLlmProvider>,
    created: AtomicUsize,
}

impl FakeLlmFactory {
    pub fn new(provider: Arc<FakeLlmProvider>) -> Self {
        Self {
            provider,
            created: AtomicUsize::new(0),
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl LlmProviderFactoryPort for FakeLlmFactory {
    fn create(&self, _config: &ProviderConfig) -> Result<Arc<dyn LlmProviderPort>, LlmError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.provider.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_replies_in_order() {
        let provider = FakeLlmProvider::new([
            FakeReply::text("一"),
            FakeReply::Chunks(vec!["二".into(), "三".into()]),
        ]);

        let first = provider.chat(&[ChatMessage::user("a")]).await.unwrap();
        assert_eq!(first.content, "一");

        let chunks: Vec<_> = provider
            .stream_chat(vec![ChatMessage::user("b")])
            .collect()
            .await;
        assert_eq!(chunks.len(), 3);
        assert!(matches!(chunks[2], Ok(StreamChunk::Finished { .. })));

        assert!(provider.chat(&[ChatMessage::user("c")]).await.is_err());
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.requests()[1][0].content, "b");
    }
}
