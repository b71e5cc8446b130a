//! Configuration Loader
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml / config.local.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;
use crate::application::ports::ProviderKind;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "DAER";

/// 加载应用配置
///
/// # 环境变量示例
/// - `DAER_SERVER__PORT=8080`
/// - `DAER_DATABASE__PATH=/data/daer.db`
/// - `DAER_WORKER__MAX_CONCURRENT=4`
/// - `DAER_AI__PROVIDER=anthropic`
/// - `DAER_AI__API_KEY=sk-...`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时搜索工作目录下的默认配置文件
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8002)?
        .set_default("database.path", "data/daer.db")?
        .set_default("database.max_connections", 5)?
        .set_default("worker.max_concurrent", 2)?
        .set_default("worker.queue_capacity", 1000)?
        .set_default("worker.event_buffer", 1024)?
        .set_default("log.level", "info")?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 层级分隔符为双下划线，例如 DAER_AI__BASE_URL
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let app_config: AppConfig = builder.build()?.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.database.path.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    if config.worker.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "worker.max_concurrent must be at least 1".to_string(),
        ));
    }

    if !config.ai.api_key.trim().is_empty() && ProviderKind::from_str(&config.ai.provider).is_none()
    {
        return Err(ConfigError::ValidationError(format!(
            "Unsupported AI provider: {}",
            config.ai.provider
        )));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Worker Concurrency: {}", config.worker.max_concurrent);
    tracing::info!("Queue Capacity: {}", config.worker.queue_capacity);
    if config.ai.api_key.trim().is_empty() {
        tracing::info!("Fallback AI: disabled");
    } else {
        tracing::info!(
            "Fallback AI: {} / {}",
            config.ai.provider,
            config.ai.model
        );
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_default_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_db_path() {
        let mut config = AppConfig::default();
        config.database.path = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_concurrency() {
        let mut config = AppConfig::default();
        config.worker.max_concurrent = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_unknown_provider_only_matters_with_key() {
        let mut config = AppConfig::default();
        config.ai.provider = "mystery".into();
        assert!(validate_config(&config).is_ok());

        config.ai.api_key = "sk-env".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[worker]
max_concurrent = 4

[ai]
provider = "anthropic"
model = "claude-test"
api_key = "sk-file"
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.worker.max_concurrent, 4);
        assert_eq!(config.worker.queue_capacity, 1000);

        let fallback = config.ai.fallback_provider().unwrap();
        assert_eq!(fallback.provider, ProviderKind::Anthropic);
        assert_eq!(fallback.model, "claude-test");
    }

    #[test]
    fn test_missing_required_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            load_config_from_path(Some(&missing)),
            Err(ConfigError::LoadError(_))
        ));
    }
}
