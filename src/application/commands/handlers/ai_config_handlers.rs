//! AI Config Command Handlers
//!
//! is_default 的唯一性由仓储在保存时维护

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::{CreateAiConfig, DeleteAiConfig, UpdateAiConfig};
use crate::application::error::ApplicationError;
use crate::application::ports::{AiConfigRecord, AiConfigRepositoryPort};

pub struct CreateAiConfigHandler {
    ai_config_repo: Arc<dyn AiConfigRepositoryPort>,
}

impl CreateAiConfigHandler {
    pub fn new(ai_config_repo: Arc<dyn AiConfigRepositoryPort>) -> Self {
        Self { ai_config_repo }
    }

    pub async fn handle(&self, cmd: CreateAiConfig) -> Result<AiConfigRecord, ApplicationError> {
        if cmd.model.trim().is_empty() || cmd.api_key.trim().is_empty() {
            return Err(ApplicationError::validation("model and apiKey are required"));
        }

        let now = Utc::now();
        let record = AiConfigRecord {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            provider: cmd.provider,
            model: cmd.model.trim().to_string(),
            api_key: cmd.api_key,
            base_url: cmd.base_url.filter(|url| !url.trim().is_empty()),
            parameters: cmd.parameters,
            is_default: cmd.is_default,
            created_at: now,
            updated_at: now,
        };
        self.ai_config_repo.save(&record).await?;

        tracing::info!(
            config_id = %record.id,
            provider = record.provider.as_str(),
            is_default = record.is_default,
            "AI configuration created"
        );
        Ok(record)
    }
}

pub struct UpdateAiConfigHandler {
    ai_config_repo: Arc<dyn AiConfigRepositoryPort>,
}

impl UpdateAiConfigHandler {
    pub fn new(ai_config_repo: Arc<dyn AiConfigRepositoryPort>) -> Self {
        Self { ai_config_repo }
    }

    pub async fn handle(&self, cmd: UpdateAiConfig) -> Result<AiConfigRecord, ApplicationError> {
        let mut record = self
            .ai_config_repo
            .find_by_id(cmd.config_id)
            .await?
            .filter(|record| record.user_id == cmd.user_id)
            .ok_or_else(|| ApplicationError::not_found("AiConfig", cmd.config_id))?;

        if let Some(provider) = cmd.provider {
            record.provider = provider;
        }
        if let Some(model) = cmd.model.filter(|m| !m.trim().is_empty()) {
            record.model = model;
        }
        if let Some(key) = cmd.api_key.filter(|k| !k.trim().is_empty()) {
            record.api_key = key;
        }
        if let Some(url) = cmd.base_url {
            record.base_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(parameters) = cmd.parameters {
            record.parameters = parameters;
        }
        if let Some(is_default) = cmd.is_default {
            record.is_default = is_default;
        }
        record.updated_at = Utc::now();

        self.ai_config_repo.save(&record).await?;
        Ok(record)
    }
}

pub struct DeleteAiConfigHandler {
    ai_config_repo: Arc<dyn AiConfigRepositoryPort>,
}

impl DeleteAiConfigHandler {
    pub fn new(ai_config_repo: Arc<dyn AiConfigRepositoryPort>) -> Self {
        Self { ai_config_repo }
    }

    pub async fn handle(&self, cmd: DeleteAiConfig) -> Result<(), ApplicationError> {
        if !self.ai_config_repo.delete(&cmd.user_id, cmd.config_id).await? {
            return Err(ApplicationError::not_found("AiConfig", cmd.config_id));
        }
        Ok(())
    }
}
