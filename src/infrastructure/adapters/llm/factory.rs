//! HTTP LLM Provider Factory

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use super::{AnthropicProvider, OpenAiCompatibleProvider};
use crate::application::ports::{
    LlmError, LlmProviderFactoryPort, LlmProviderPort, ProviderConfig, ProviderKind,
};

/// 长篇正文生成可能持续数分钟
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 300;

/// 按配置创建 HTTP 适配器，所有适配器共享一个连接池
pub struct HttpLlmProviderFactory {
    client: Client,
}

impl HttpLlmProviderFactory {
    pub fn new(timeout_secs: u64) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { client })
    }
}

impl LlmProviderFactoryPort for HttpLlmProviderFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProviderPort>, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::UnsupportedProvider(format!(
                "{} configuration has no API key",
                config.provider.as_str()
            )));
        }

        let provider: Arc<dyn LlmProviderPort> = match config.provider {
            ProviderKind::OpenAi | ProviderKind::DeepSeek => Arc::new(
                OpenAiCompatibleProvider::new(self.client.clone(), config.clone()),
            ),
            ProviderKind::Anthropic => {
                Arc::new(AnthropicProvider::new(self.client.clone(), config.clone()))
            }
        };

        tracing::debug!(
            provider = config.provider.as_str(),
            model = %config.model,
            "LLM provider created"
        );
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_per_kind() {
        let factory = HttpLlmProviderFactory::new(5).unwrap();
        for kind in [ProviderKind::OpenAi, ProviderKind::DeepSeek, ProviderKind::Anthropic] {
            let provider = factory.create(&ProviderConfig::new(kind, "m", "k")).unwrap();
            assert_eq!(provider.model(), "m");
        }
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let factory = HttpLlmProviderFactory::new(5).unwrap();
        let config = ProviderConfig::new(ProviderKind::OpenAi, "m", " ");
        assert!(factory.create(&config).is_err());
    }
}
