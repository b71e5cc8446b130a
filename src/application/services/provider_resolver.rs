//! Provider 解析
//!
//! 优先用户默认配置 -> 最早创建的配置 -> 进程级环境变量兜底；
//! 都没有时在任何模型调用之前返回配置错误。

use std::sync::Arc;

use crate::application::error::{ApplicationError, NO_AI_CONFIGURATION};
use crate::application::ports::{
    AiConfigRecord, AiConfigRepositoryPort, LlmProviderFactoryPort, LlmProviderPort,
    ProviderConfig, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P,
};

impl From<&AiConfigRecord> for ProviderConfig {
    fn from(record: &AiConfigRecord) -> Self {
        Self {
            provider: record.provider,
            model: record.model.clone(),
            api_key: record.api_key.clone(),
            base_url: record.base_url.clone().filter(|url| !url.is_empty()),
            temperature: record.parameters.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: record.parameters.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            top_p: record.parameters.top_p.unwrap_or(DEFAULT_TOP_P),
        }
    }
}

pub struct ProviderResolver {
    ai_config_repo: Arc<dyn AiConfigRepositoryPort>,
    factory: Arc<dyn LlmProviderFactoryPort>,
    fallback: Option<ProviderConfig>,
}

impl ProviderResolver {
    pub fn new(
        ai_config_repo: Arc<dyn AiConfigRepositoryPort>,
        factory: Arc<dyn LlmProviderFactoryPort>,
        fallback: Option<ProviderConfig>,
    ) -> Self {
        Self {
            ai_config_repo,
            factory,
            fallback,
        }
    }

    /// 解析用户的 Provider 配置
    pub async fn resolve_config(&self, user_id: &str) -> Result<ProviderConfig, ApplicationError> {
        if let Some(record) = self.ai_config_repo.find_preferred(user_id).await? {
            tracing::debug!(
                user_id = %user_id,
                config_id = %record.id,
                provider = record.provider.as_str(),
                "Using stored AI configuration"
            );
            return Ok(ProviderConfig::from(&record));
        }

        match &self.fallback {
            Some(config) => {
                tracing::debug!(
                    user_id = %user_id,
                    provider = config.provider.as_str(),
                    "Using environment AI configuration"
                );
                Ok(config.clone())
            }
            None => Err(ApplicationError::configuration(NO_AI_CONFIGURATION)),
        }
    }

    /// 解析并构造 Provider
    pub async fn resolve(&self, user_id: &str) -> Result<Arc<dyn LlmProviderPort>, ApplicationError> {
        let config = self.resolve_config(user_id).await?;
        Ok(self.factory.create(&config)?)
    }
}
