//! Anthropic 适配器
//!
//! system 消息单独放在请求体顶层；流式事件取 `content_block_delta` 的文本，
//! `message_start` / `message_delta` 携带 token 用量。

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::sse::SseDecoder;
use super::{map_request_error, read_api_error};
use crate::application::ports::{
    ChatMessage, ChatResponse, ChatRole, LlmError, LlmProviderPort, ProviderConfig, StreamChunk,
    TextStream,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<MessageUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MessageUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// 只解析用得到的流式事件，其余类型落到 Other
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart {
        message: StreamMessage,
    },
    ContentBlockDelta {
        delta: BlockDelta,
    },
    MessageDelta {
        #[serde(default)]
        usage: Option<MessageUsage>,
    },
    MessageStop,
    Error {
        error: StreamError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    #[serde(default)]
    usage: Option<MessageUsage>,
}

#[derive(Debug, Deserialize)]
struct BlockDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(default)]
    message: String,
}

/// Anthropic Provider
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.config.endpoint_base())
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage], stream: bool) -> MessagesRequest<'a> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();

        MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages
                .iter()
                .filter_map(|m| match m.role {
                    ChatRole::System => None,
                    ChatRole::User => Some(AnthropicMessage {
                        role: "user",
                        content: &m.content,
                    }),
                    ChatRole::Assistant => Some(AnthropicMessage {
                        role: "assistant",
                        content: &m.content,
                    }),
                })
                .collect(),
            stream,
        }
    }
}

fn authorized(builder: RequestBuilder, api_key: &str) -> RequestBuilder {
    builder
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
}

#[async_trait]
impl LlmProviderPort for AnthropicProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError> {
        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            "Sending Anthropic messages request"
        );

        let response = authorized(self.client.post(self.messages_url()), &self.config.api_key)
            .json(&self.request_body(messages, false))
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(read_api_error(response).await);
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content: String = body.content.into_iter().filter_map(|b| b.text).collect();

        Ok(ChatResponse {
            content,
            tokens_used: body.usage.map(|u| u.input_tokens + u.output_tokens),
            model: body.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    fn stream_chat(&self, messages: Vec<ChatMessage>) -> TextStream {
        let request = authorized(self.client.post(self.messages_url()), &self.config.api_key)
            .json(&self.request_body(&messages, true));

        Box::pin(async_stream::stream! {
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(map_request_error(e));
                    return;
                }
            };

            if !response.status().is_success() {
                yield Err(read_api_error(response).await);
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut input_tokens = 0u32;
            let mut output_tokens = 0u32;

            while let Some(chunk) = byte_stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(map_request_error(e));
                        return;
                    }
                };

                for data in decoder.push(&bytes) {
                    let event: StreamEvent = match serde_json::from_str(&data) {
                        Ok(event) => event,
                        Err(e) => {
                            yield Err(LlmError::InvalidResponse(format!("bad stream event: {}", e)));
                            return;
                        }
                    };

                    match event {
                        StreamEvent::MessageStart { message } => {
                            if let Some(usage) = message.usage {
                                input_tokens = usage.input_tokens;
                            }
                        }
                        StreamEvent::ContentBlockDelta { delta } => {
                            if let Some(text) = delta.text.filter(|t| !t.is_empty()) {
                                yield Ok(StreamChunk::Text(text));
                            }
                        }
                        StreamEvent::MessageDelta { usage } => {
                            if let Some(usage) = usage {
                                output_tokens = usage.output_tokens;
                            }
                        }
                        StreamEvent::MessageStop => {
                            yield Ok(StreamChunk::Finished {
                                tokens_used: Some(input_tokens + output_tokens),
                            });
                            return;
                        }
                        StreamEvent::Error { error } => {
                            yield Err(LlmError::InvalidResponse(error.message));
                            return;
                        }
                        StreamEvent::Other => {}
                    }
                }
            }

            yield Ok(StreamChunk::Finished {
                tokens_used: (input_tokens + output_tokens > 0).then_some(input_tokens + output_tokens),
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ProviderKind;
    use futures_util::TryStreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AnthropicProvider {
        let mut config = ProviderConfig::new(ProviderKind::Anthropic, "claude-test", "ak-test");
        config.base_url = Some(format!("{}/v1", server.uri()));
        AnthropicProvider::new(Client::new(), config)
    }

    #[test]
    fn test_system_messages_are_lifted() {
        let config = ProviderConfig::new(ProviderKind::Anthropic, "claude-test", "k");
        let provider = AnthropicProvider::new(Client::new(), config);
        let messages = [ChatMessage::system("规则"), ChatMessage::user("写一章")];

        let body = serde_json::to_value(provider.request_body(&messages, false)).unwrap();
        assert_eq!(body["system"], "规则");
        assert_eq!(body["messages"], json!([{"role": "user", "content": "写一章"}]));
        assert!(body.get("stream").is_none());
    }

    #[tokio::test]
    async fn test_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ak-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "你好"}],
                "usage": {"input_tokens": 3, "output_tokens": 4}
            })))
            .mount(&server)
            .await;

        let response = provider(&server).chat(&[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(response.content, "你好");
        assert_eq!(response.tokens_used, Some(7));
        assert_eq!(response.model, "claude-test");
    }

    #[tokio::test]
    async fn test_stream_chat() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"usage\":{\"input_tokens\":5}}}\n\n",
            "event: content_block_start\n",
            "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"天地\"}}\n\n",
            "event: ping\n",
            "data: {\"type\":\"ping\"}\n\n",
            "event: message_delta\n",
            "data: {\"type\":\"message_delta\",\"delta\":{},\"usage\":{\"output_tokens\":2}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let chunks: Vec<StreamChunk> = provider(&server)
            .stream_chat(vec![ChatMessage::user("写")])
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            chunks,
            vec![
                StreamChunk::Text("天地".into()),
                StreamChunk::Finished {
                    tokens_used: Some(7)
                },
            ]
        );
    }
}
