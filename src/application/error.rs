//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;
use uuid::Uuid;

use crate::application::ports::{LlmError, QueueError, RepositoryError};
use crate::domain::StructuredOutputError;

/// 未找到可用 AI 配置时的提示
pub const NO_AI_CONFIGURATION: &str =
    "No AI configuration found. Please configure AI settings or set DAER_AI__API_KEY in environment.";

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: Uuid,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 配置缺失或无效（AI 配置等）
    #[error("{0}")]
    ConfigurationError(String),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 外部服务错误（LLM Provider）
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 模型结构化输出无法解析
    #[error(transparent)]
    StructuredOutput(#[from] StructuredOutputError),

    /// 任务队列不可用
    #[error("Queue error: {0}")]
    QueueError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: Uuid) -> Self {
        Self::NotFound { resource_type, id }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建配置错误
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        Self::RepositoryError(err.to_string())
    }
}

impl From<LlmError> for ApplicationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::UnsupportedProvider(_) => Self::ConfigurationError(err.to_string()),
            _ => Self::ExternalServiceError(err.to_string()),
        }
    }
}

impl From<QueueError> for ApplicationError {
    fn from(err: QueueError) -> Self {
        Self::QueueError(err.to_string())
    }
}
