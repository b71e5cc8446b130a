//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

use crate::application::ports::{ProviderConfig, ProviderKind, DEFAULT_TEMPERATURE};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 后台任务配置
    #[serde(default)]
    pub worker: WorkerConfig,

    /// 全局兜底 AI 配置
    #[serde(default)]
    pub ai: AiConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8002
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/daer.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 后台任务配置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// 同时执行的任务数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// 队列容量，超出后提交失败
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 每个事件频道的缓冲条数
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_max_concurrent() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_event_buffer() -> usize {
    1024
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            queue_capacity: default_queue_capacity(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// 全局兜底 AI 配置
///
/// 用户没有默认配置时使用；api_key 为空表示不启用
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_provider")]
    pub provider: String,

    #[serde(default = "default_ai_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_ai_temperature")]
    pub temperature: f32,
}

fn default_ai_provider() -> String {
    "openai".to_string()
}

fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ai_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            model: default_ai_model(),
            api_key: String::new(),
            base_url: None,
            temperature: default_ai_temperature(),
        }
    }
}

impl AiConfig {
    /// 转换为 Provider 配置；未设置 api_key 或后端不受支持时返回 None
    pub fn fallback_provider(&self) -> Option<ProviderConfig> {
        if self.api_key.trim().is_empty() {
            return None;
        }
        let kind = ProviderKind::from_str(&self.provider)?;

        let mut config = ProviderConfig::new(kind, self.model.clone(), self.api_key.clone());
        config.base_url = self.base_url.clone().filter(|url| !url.trim().is_empty());
        config.temperature = self.temperature;
        Some(config)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8002");
        assert_eq!(config.database.database_url(), "sqlite:data/daer.db?mode=rwc");
        assert_eq!(config.worker.max_concurrent, 2);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_fallback_requires_api_key() {
        let mut ai = AiConfig::default();
        assert!(ai.fallback_provider().is_none());

        ai.api_key = "sk-env".into();
        ai.provider = "deepseek".into();
        ai.base_url = Some(" ".into());
        let provider = ai.fallback_provider().unwrap();
        assert_eq!(provider.provider, ProviderKind::DeepSeek);
        assert_eq!(provider.api_key, "sk-env");
        assert!(provider.base_url.is_none());

        ai.provider = "mystery".into();
        assert!(ai.fallback_provider().is_none());
    }
}
