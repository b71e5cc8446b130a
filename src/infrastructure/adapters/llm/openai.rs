//! OpenAI 兼容适配器
//!
//! OpenAI 与 DeepSeek 共用 `/chat/completions` 协议，只有默认地址不同。
//!
//! 流式响应为 SSE：
//! `data: {"choices":[{"delta":{"content":"..."}}]}` ... `data: [DONE]`

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::sse::SseDecoder;
use super::{map_request_error, read_api_error};
use crate::application::ports::{
    ChatMessage, ChatResponse, LlmError, LlmProviderPort, ProviderConfig, StreamChunk, TextStream,
};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI 兼容 Provider
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiCompatibleProvider {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint_base())
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage], stream: bool) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }
}

#[async_trait]
impl LlmProviderPort for OpenAiCompatibleProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError> {
        tracing::debug!(
            provider = self.config.provider.as_str(),
            model = %self.config.model,
            messages = messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(messages, false))
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(read_api_error(response).await);
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response contains no choices".to_string()))?;

        Ok(ChatResponse {
            content,
            tokens_used: body.usage.map(|u| u.total_tokens),
            model: body.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    fn stream_chat(&self, messages: Vec<ChatMessage>) -> TextStream {
        let client = self.client.clone();
        let url = self.completions_url();
        let api_key = self.config.api_key.clone();
        let body = serde_json::to_value(self.request_body(&messages, true));

        Box::pin(async_stream::stream! {
            let body = match body {
                Ok(body) => body,
                Err(e) => {
                    yield Err(LlmError::InvalidResponse(e.to_string()));
                    return;
                }
            };

            let response = match client.post(&url).bearer_auth(&api_key).json(&body).send().await {
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
            let mut tokens_used = None;

            while let Some(chunk) = byte_stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(map_request_error(e));
                        return;
                    }
                };

                for data in decoder.push(&bytes) {
                    if data == "[DONE]" {
                        yield Ok(StreamChunk::Finished { tokens_used });
                        return;
                    }
                    match parse_chunk(&data) {
                        Ok((text, usage)) => {
                            if usage.is_some() {
                                tokens_used = usage;
                            }
                            if let Some(text) = text {
                                yield Ok(StreamChunk::Text(text));
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            for data in decoder.finish() {
                if data == "[DONE]" {
                    break;
                }
                if let Ok((Some(text), _)) = parse_chunk(&data) {
                    yield Ok(StreamChunk::Text(text));
                }
            }
            yield Ok(StreamChunk::Finished { tokens_used });
        })
    }
}

/// 解析一个流式事件：(文本片段, token 用量)
fn parse_chunk(data: &str) -> Result<(Option<String>, Option<u32>), LlmError> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| LlmError::InvalidResponse(format!("bad stream event: {}", e)))?;

    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty());

    Ok((text, chunk.usage.map(|u| u.total_tokens)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ProviderKind;
    use futures_util::TryStreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiCompatibleProvider {
        let mut config = ProviderConfig::new(ProviderKind::OpenAi, "gpt-4o-mini", "sk-test");
        config.base_url = Some(format!("{}/v1", server.uri()));
        OpenAiCompatibleProvider::new(Client::new(), config)
    }

    #[test]
    fn test_parse_chunk() {
        let (text, usage) =
            parse_chunk(r#"{"choices":[{"delta":{"content":"天"}}]}"#).unwrap();
        assert_eq!(text.as_deref(), Some("天"));
        assert!(usage.is_none());

        let (text, usage) = parse_chunk(r#"{"choices":[],"usage":{"total_tokens":42}}"#).unwrap();
        assert!(text.is_none());
        assert_eq!(usage, Some(42));

        assert!(parse_chunk("not json").is_err());
    }

    #[tokio::test]
    async fn test_chat_sends_openai_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "temperature": 0.7,
                "max_tokens": 4000,
                "messages": [{"role": "system", "content": "sys"}, {"role": "user", "content": "hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o-mini-2024",
                "choices": [{"message": {"role": "assistant", "content": "你好"}}],
                "usage": {"total_tokens": 17}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server)
            .chat(&[ChatMessage::system("sys"), ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(response.content, "你好");
        assert_eq!(response.tokens_used, Some(17));
        assert_eq!(response.model, "gpt-4o-mini-2024");
    }

    #[tokio::test]
    async fn test_chat_maps_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .chat(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 401, ref message } if message.contains("invalid api key")));
    }

    #[tokio::test]
    async fn test_stream_chat_yields_fragments_in_order() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"天地\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"玄黄\"}}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"total_tokens\":9}}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
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
                StreamChunk::Text("玄黄".into()),
                StreamChunk::Finished {
                    tokens_used: Some(9)
                },
            ]
        );
    }
}
